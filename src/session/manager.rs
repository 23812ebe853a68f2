//! Session lifecycle - login, registration, logout and restore on startup

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::{AuthApi, RegisterResponse};
use crate::client::{ApiClient, SessionEvent};
use crate::error::{ClientError, ClientResult};
use crate::session::profile::{AuthResponse, CurrentUser, UserProfile};
use crate::session::store::SessionStore;
use crate::types::ProviderToken;
use crate::validation::{Credentials, RegisterForm};

/// Result of re-validating a persisted session.
#[derive(Debug, Clone)]
pub enum RestoreOutcome {
    /// No access token was stored.
    Anonymous,
    /// The server accepted the token; the profile was re-cached.
    Authenticated(CurrentUser),
    /// The token was rejected and could not be refreshed. The store has been
    /// cleared and the user must log in again.
    Expired(ClientError),
    /// "Who am I" failed for another reason (server down, timeout). Tokens are
    /// left in place; `cached` is the last known profile, if any.
    Deferred {
        cached: Option<CurrentUser>,
        error: ClientError,
    },
}

/// Owns the session state machine on top of an [`ApiClient`].
#[derive(Clone)]
pub struct SessionManager {
    client: ApiClient,
}

impl SessionManager {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.client.subscribe()
    }

    fn store(&self) -> &Arc<dyn SessionStore> {
        self.client.store()
    }

    fn auth(&self) -> AuthApi {
        self.client.auth()
    }

    /// Sign in with email and password.
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<CurrentUser> {
        let response = self.auth().login(credentials).await?;
        self.establish(response)
    }

    /// Sign in with a Google ID token.
    pub async fn federated_login(&self, token: &ProviderToken) -> ClientResult<CurrentUser> {
        info!("Signing in with Google (token {} chars)", token.len());
        let response = self.auth().google_login(token).await?;
        self.establish(response)
    }

    /// Validate and submit a registration.
    ///
    /// An invalid form is rejected locally without contacting the server.
    pub async fn register(&self, form: &RegisterForm) -> ClientResult<UserProfile> {
        let registration = form.validate().map_err(ClientError::Validation)?;

        match self.auth().register(&registration).await? {
            RegisterResponse::LoggedIn(response) => {
                let user = self.establish(response)?;
                Ok(user.profile)
            }
            RegisterResponse::Created(profile) => {
                info!("Registered {} (id {})", profile.email, profile.id);
                Ok(profile)
            }
        }
    }

    fn establish(&self, response: AuthResponse) -> ClientResult<CurrentUser> {
        let store = self.store();
        store.save_tokens(&response.tokens())?;
        store.save_profile(&response.user)?;

        info!(
            "Signed in as {} (role {}, access token {} chars)",
            response.user.email,
            response.user.role,
            response.access_token.len()
        );
        Ok(CurrentUser::from(response.user))
    }

    /// End the session.
    ///
    /// The server call is best-effort: its failure is logged and ignored.
    /// Local state is always cleared, so calling this twice is harmless.
    pub async fn logout(&self) -> ClientResult<()> {
        let store = self.store();
        let has_access = store.access_token().unwrap_or_else(|e| {
            warn!("Could not read access token during logout: {}", e);
            None
        });
        let refresh = store.refresh_token().unwrap_or_else(|e| {
            warn!("Could not read refresh token during logout: {}", e);
            None
        });

        if has_access.is_some() || refresh.is_some() {
            if let Err(e) = self.auth().logout(refresh.as_ref()).await {
                warn!("Logout request failed, clearing local session anyway: {}", e);
            }
        } else {
            debug!("No stored session, skipping logout request");
        }

        store.clear_session()?;
        info!("Logged out");
        Ok(())
    }

    /// The cached profile, if a session is established.
    pub fn current_user(&self) -> ClientResult<Option<CurrentUser>> {
        Ok(self.store().profile()?.map(CurrentUser::from))
    }

    pub fn is_authenticated(&self) -> ClientResult<bool> {
        Ok(self.store().access_token()?.is_some())
    }

    /// Re-validate a persisted session against the server.
    pub async fn restore(&self) -> ClientResult<RestoreOutcome> {
        if self.store().access_token()?.is_none() {
            debug!("No stored access token");
            return Ok(RestoreOutcome::Anonymous);
        }

        match self.auth().me().await {
            Ok(profile) => {
                self.store().save_profile(&profile)?;
                info!("Session restored for {}", profile.email);
                Ok(RestoreOutcome::Authenticated(CurrentUser::from(profile)))
            }
            Err(error) => {
                // The client clears the store only when the session is
                // unrecoverable.
                if self.store().access_token()?.is_none() {
                    warn!("Stored session expired: {}", error);
                    return Ok(RestoreOutcome::Expired(error));
                }

                warn!("Could not verify stored session, keeping it: {}", error);
                let cached = self.store().profile().unwrap_or_else(|e| {
                    warn!("Ignoring unreadable cached profile: {}", e);
                    None
                });
                Ok(RestoreOutcome::Deferred {
                    cached: cached.map(CurrentUser::from),
                    error,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::{MemoryStore, USER_KEY};

    // Nothing listens on the discard port, so any request that slips through
    // fails as a transport error.
    fn offline_manager() -> (SessionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let client =
            ApiClient::new(ClientConfig::with_base_url("http://127.0.0.1:9").unwrap(), store.clone())
                .unwrap();
        (SessionManager::new(client), store)
    }

    #[tokio::test]
    async fn test_invalid_registration_not_sent() {
        let (manager, _) = offline_manager();
        let err = manager.register(&RegisterForm::default()).await.unwrap_err();
        match err {
            ClientError::Validation(errors) => {
                assert!(errors.contains("email"));
                assert!(!errors.contains("confirm"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_restore_without_token_is_anonymous() {
        let (manager, _) = offline_manager();
        let outcome = manager.restore().await.unwrap();
        assert!(matches!(outcome, RestoreOutcome::Anonymous));
    }

    #[tokio::test]
    async fn test_logout_without_session_is_local_only() {
        let (manager, store) = offline_manager();
        manager.logout().await.unwrap();
        manager.logout().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_logout_offline_still_clears() {
        let (manager, store) = offline_manager();
        store.set("access_token", "t1").unwrap();
        store.set("refresh_token", "r1").unwrap();
        store.set(USER_KEY, r#"{"id":1,"email":"test@example.com","role":"user"}"#).unwrap();

        manager.logout().await.unwrap();

        assert!(store.is_empty());
        assert!(manager.current_user().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_offline_is_deferred() {
        let (manager, store) = offline_manager();
        store.set("access_token", "t1").unwrap();
        store.set(USER_KEY, r#"{"id":1,"email":"test@example.com","role":"admin"}"#).unwrap();

        match manager.restore().await.unwrap() {
            RestoreOutcome::Deferred { cached, error } => {
                assert!(cached.unwrap().is_admin);
                assert!(matches!(error, ClientError::Transport(_)));
            }
            other => panic!("expected deferred restore, got {:?}", other),
        }
        assert_eq!(store.get("access_token").unwrap().as_deref(), Some("t1"));
    }

    #[test]
    fn test_current_user_from_cache() {
        let (manager, store) = offline_manager();
        assert!(manager.current_user().unwrap().is_none());
        assert!(!manager.is_authenticated().unwrap());

        store.set(USER_KEY, r#"{"id":1,"email":"test@example.com","role":"user"}"#).unwrap();
        let user = manager.current_user().unwrap().unwrap();
        assert!(!user.is_admin);
        assert_eq!(user.profile.email, "test@example.com");
    }
}
