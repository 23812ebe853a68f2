//! Authenticated API client.
//!
//! Every authenticated request carries the stored access token as a bearer
//! credential. When the server answers 401 to a request that has not yet been
//! retried, the client performs one refresh-and-retry:
//!
//! ```text
//! SENDING    -> (2xx / 4xx != 401 / 5xx) -> DONE
//! SENDING    -> (401, first attempt)     -> REFRESHING
//! REFRESHING -> (refresh ok)             -> RETRYING -> DONE
//! REFRESHING -> (refresh fails)          -> FAILED   (store cleared, Expired emitted)
//! RETRYING   -> (any outcome)            -> DONE
//! ```
//!
//! There is no backoff, no queue and no coalescing: two requests that both
//! hit 401 each refresh on their own.

mod request;


pub use request::{ApiRequest, ApiResponse, AuthMode, RequestContext, RequestOptions};

use std::sync::Arc;

use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{Instrument, debug, error, info, info_span, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, ClientError, ClientResult};
use crate::session::{SessionStore, TokenPair};
use crate::types::{AccessToken, RefreshToken};

pub const REFRESH_PATH: &str = "/api/auth/refresh";

const REQUEST_ID_HEADER: &str = "X-Request-Id";
const EVENT_CAPACITY: usize = 16;

/// Session changes the hosting application may react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A refresh succeeded and new tokens were stored.
    Refreshed,
    /// The session could not be recovered and was cleared; the user must
    /// log in again.
    Expired,
}

/// HTTP client for the rental backend.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    store: Arc<dyn SessionStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: Arc<dyn SessionStore>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            http,
            config: Arc::new(config),
            store,
            events,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Subscribe to session events (refresh, expiry).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Send an authenticated request with optional query and JSON body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> ClientResult<ApiResponse> {
        self.execute(ApiRequest::new(method, path).with_options(options))
            .await
    }

    /// Execute a request and deserialize a successful body.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        self.execute(request).await?.json()
    }

    /// Execute a request, applying the refresh protocol for `AuthMode::Bearer`.
    ///
    /// Non-2xx outcomes are returned as a normalized [`ClientError::Api`].
    pub async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let ctx = RequestContext::first();
        let span = info_span!(
            "api_request",
            method = %request.method,
            path = %request.path,
            request_id = %ctx.request_id,
        );

        self.run(&request, ctx).instrument(span).await
    }

    async fn run(&self, request: &ApiRequest, ctx: RequestContext) -> ClientResult<ApiResponse> {
        let token = match request.auth {
            AuthMode::Anonymous => None,
            AuthMode::Bearer | AuthMode::BearerOnce => self.store.access_token()?,
        };

        let response = self.send(request, &ctx, token.as_ref()).await?;

        let refreshable = response.status == StatusCode::UNAUTHORIZED
            && request.auth == AuthMode::Bearer
            && ctx.can_retry();
        if !refreshable {
            return self.finish(response);
        }

        warn!(attempt = ctx.attempt, "Received 401, attempting token refresh");
        let unauthorized = self.normalize(&response);

        let Some(refresh_token) = self.store.refresh_token()? else {
            warn!("No refresh token stored; session must be re-established");
            self.expire_session();
            return Err(ClientError::Api(unauthorized));
        };

        let tokens = match self.refresh(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!("Token refresh failed: {}", e);
                self.expire_session();
                return Err(e);
            }
        };

        // Never leave the new access token next to an already rotated refresh token.
        if let Err(e) = self.store.save_tokens(&tokens) {
            error!("Failed to store refreshed tokens: {}", e);
            self.expire_session();
            return Err(e.into());
        }
        info!(
            "Token refreshed (access token {} chars)",
            tokens.access_token.len()
        );
        let _ = self.events.send(SessionEvent::Refreshed);

        let retry = ctx.retry();
        let response = self
            .send(request, &retry, Some(&tokens.access_token))
            .await?;
        self.finish(response)
    }

    /// Exchange the refresh token for a new pair.
    ///
    /// Goes straight to the wire, outside the refresh protocol, so a rejected
    /// refresh can never trigger another refresh.
    async fn refresh(&self, refresh_token: &RefreshToken) -> ClientResult<TokenPair> {
        let request = ApiRequest::post(REFRESH_PATH)
            .json(&serde_json::json!({ "refresh_token": refresh_token.expose() }))?
            .anonymous();
        let ctx = RequestContext::first();

        debug!(request_id = %ctx.request_id, "Calling refresh endpoint");
        let response = self.send(&request, &ctx, None).await?;
        let response = self.finish(response)?;

        let tokens: TokenPair = response.json()?;
        if tokens.access_token.is_empty() || tokens.refresh_token.is_empty() {
            return Err(ClientError::Decode(
                "refresh response carried an empty token".to_string(),
            ));
        }
        Ok(tokens)
    }

    async fn send(
        &self,
        request: &ApiRequest,
        ctx: &RequestContext,
        token: Option<&AccessToken>,
    ) -> ClientResult<ApiResponse> {
        let url = self.url_for(request)?;

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(REQUEST_ID_HEADER, ctx.request_id.to_string());
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(attempt = ctx.attempt, authenticated = token.is_some(), "Sending request");

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?
            .to_vec();

        debug!(attempt = ctx.attempt, status = status.as_u16(), "Received response");
        Ok(ApiResponse { status, body })
    }

    fn finish(&self, response: ApiResponse) -> ClientResult<ApiResponse> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(ClientError::Api(self.normalize(&response)))
        }
    }

    fn normalize(&self, response: &ApiResponse) -> ApiError {
        ApiError::from_response(
            response.status.as_u16(),
            &response.body,
            &self.config.fallback_message,
        )
    }

    /// Clear the three session keys and tell the host to send the user to login.
    fn expire_session(&self) {
        if let Err(e) = self.store.clear_session() {
            error!("Failed to clear session store: {}", e);
        }
        let _ = self.events.send(SessionEvent::Expired);
    }

    fn url_for(&self, request: &ApiRequest) -> ClientResult<Url> {
        let path = &request.path;
        let mut url = self
            .config
            .base_url
            .join(path)
            .map_err(|e| ClientError::InvalidRequest(format!("{}: {}", path, e)))?;

        if !request.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| ClientError::InvalidRequest(format!("{}: not a base URL", path)))?
                .extend(&request.segments);
        }
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                request
                    .query
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            );
        }
        Ok(url)
    }
}
