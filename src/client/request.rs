//! Outbound request description and the per-request context.

use http::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

/// How an outbound request is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Attach the stored access token; a 401 triggers one refresh-and-retry.
    #[default]
    Bearer,
    /// Attach the stored access token, but never refresh on 401.
    BearerOnce,
    /// No credentials. Used for login, registration and refresh itself.
    Anonymous,
}

/// Query and body for [`ApiClient::request`](super::ApiClient::request).
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// A request to one backend endpoint, independent of any attempt.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    /// Appended to `path` one at a time, each percent-encoded as a single segment.
    pub(crate) segments: Vec<String>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<Value>,
    pub(crate) auth: AuthMode,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            segments: Vec::new(),
            query: Vec::new(),
            body: None,
            auth: AuthMode::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.query = options.query;
        self.body = options.body;
        self
    }

    /// Append one path segment, such as a resource id. Reserved characters
    /// (`/`, `?`, `#`, `%`) in it are encoded rather than interpreted.
    pub fn segment(mut self, segment: impl ToString) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter only when the value is present.
    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> ClientResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::InvalidRequest(format!("body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    pub fn anonymous(self) -> Self {
        self.auth(AuthMode::Anonymous)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth
    }
}

/// Per-attempt bookkeeping carried through one logical request.
///
/// Each logical request owns its context, so one request being retried never
/// affects whether another may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Stable across the original attempt and its retry; sent as `X-Request-Id`.
    pub request_id: Uuid,
    /// 1 for the original send, 2 for the single retry.
    pub attempt: u32,
}

impl RequestContext {
    /// Highest attempt number a request can reach.
    pub const MAX_ATTEMPTS: u32 = 2;

    pub fn first() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            attempt: 1,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.attempt > 1
    }

    pub fn can_retry(&self) -> bool {
        self.attempt < Self::MAX_ATTEMPTS
    }

    /// Context for the retry of this request.
    pub fn retry(&self) -> Self {
        Self {
            request_id: self.request_id,
            attempt: self.attempt + 1,
        }
    }
}

/// A received response with its body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Deserialize the body. An empty body is read as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        let body: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_to_bearer() {
        let req = ApiRequest::get("/api/equipment");
        assert_eq!(req.auth_mode(), AuthMode::Bearer);
        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.path(), "/api/equipment");
    }

    #[test]
    fn test_segments_are_kept_apart_from_path() {
        let req = ApiRequest::put("/api/admin/users").segment(42).segment("block");
        assert_eq!(req.path(), "/api/admin/users");
        assert_eq!(req.segments, vec!["42".to_string(), "block".to_string()]);
    }

    #[test]
    fn test_query_opt_skips_none() {
        let req = ApiRequest::get("/api/equipment")
            .query("page", 2)
            .query_opt("search", None::<String>)
            .query_opt("category", Some("drilling"));
        assert_eq!(
            req.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("category".to_string(), "drilling".to_string()),
            ]
        );
    }

    #[test]
    fn test_json_body() {
        let req = ApiRequest::post("/api/auth/refresh")
            .json(&serde_json::json!({"refresh_token": "r1"}))
            .unwrap()
            .anonymous();
        assert_eq!(req.body.unwrap()["refresh_token"], "r1");
        assert_eq!(req.auth, AuthMode::Anonymous);
    }

    #[test]
    fn test_with_options() {
        let req = ApiRequest::get("/api/rentals").with_options(RequestOptions {
            query: vec![("status".to_string(), "active".to_string())],
            body: None,
        });
        assert_eq!(req.query.len(), 1);
    }

    #[test]
    fn test_context_retry_keeps_id() {
        let ctx = RequestContext::first();
        assert!(!ctx.is_retry());
        assert!(ctx.can_retry());

        let retry = ctx.retry();
        assert_eq!(retry.request_id, ctx.request_id);
        assert_eq!(retry.attempt, 2);
        assert!(retry.is_retry());
        assert!(!retry.can_retry());
    }

    #[test]
    fn test_contexts_are_independent() {
        let a = RequestContext::first();
        let b = RequestContext::first();
        assert_ne!(a.request_id, b.request_id);
        let _ = a.retry();
        assert!(!b.is_retry());
    }

    #[test]
    fn test_response_json() {
        let resp = ApiResponse {
            status: StatusCode::OK,
            body: br#"{"pages": 3}"#.to_vec(),
        };
        let v: Value = resp.json().unwrap();
        assert_eq!(v["pages"], 3);
        assert!(resp.is_success());
    }

    #[test]
    fn test_response_empty_body_is_null() {
        let resp = ApiResponse {
            status: StatusCode::NO_CONTENT,
            body: Vec::new(),
        };
        let v: Option<Value> = resp.json().unwrap();
        assert!(v.is_none());
    }

    #[test]
    fn test_response_decode_error() {
        let resp = ApiResponse {
            status: StatusCode::OK,
            body: b"oops".to_vec(),
        };
        let err = resp.json::<Value>().unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        assert_eq!(resp.text(), "oops");
    }
}
