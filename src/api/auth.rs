use serde::Deserialize;
use tracing::info;

use crate::client::{ApiClient, ApiRequest, AuthMode};
use crate::error::ClientResult;
use crate::session::{AuthResponse, UserProfile};
use crate::types::{ProviderToken, RefreshToken};
use crate::validation::{Credentials, Registration};

/// Registration answers with the created profile; some deployments log the
/// user in directly and answer with a full token response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RegisterResponse {
    LoggedIn(AuthResponse),
    Created(UserProfile),
}

impl RegisterResponse {
    pub fn profile(&self) -> &UserProfile {
        match self {
            Self::LoggedIn(auth) => &auth.user,
            Self::Created(profile) => profile,
        }
    }
}

/// `/api/auth/*`.
///
/// Credential exchanges are sent without a bearer token, so a 401 from them
/// (bad password) is reported as-is and never triggers a refresh.
#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, credentials: &Credentials) -> ClientResult<AuthResponse> {
        info!("Logging in as {}", credentials.email);
        let request = ApiRequest::post("/api/auth/login")
            .json(credentials)?
            .anonymous();
        self.client.execute_json(request).await
    }

    pub async fn register(&self, registration: &Registration) -> ClientResult<RegisterResponse> {
        info!("Registering {}", registration.email);
        let request = ApiRequest::post("/api/auth/register")
            .json(registration)?
            .anonymous();
        self.client.execute_json(request).await
    }

    /// Exchange a Google ID token for a session.
    pub async fn google_login(&self, token: &ProviderToken) -> ClientResult<AuthResponse> {
        let request = ApiRequest::post("/api/auth/google")
            .json(&serde_json::json!({ "token": token.expose() }))?
            .anonymous();
        self.client.execute_json(request).await
    }

    pub async fn me(&self) -> ClientResult<UserProfile> {
        self.client.execute_json(ApiRequest::get("/api/auth/me")).await
    }

    /// Tell the server the session is over. Never refreshes: an expired
    /// access token here just means there is nothing left to revoke.
    pub async fn logout(&self, refresh_token: Option<&RefreshToken>) -> ClientResult<()> {
        let body = serde_json::json!({ "refresh_token": refresh_token.map(RefreshToken::expose) });
        let request = ApiRequest::post("/api/auth/logout")
            .json(&body)?
            .auth(AuthMode::BearerOnce);
        self.client.execute(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_response_created() {
        let json = r#"{"id": 5, "email": "anna@example.com", "first_name": "Anna",
            "last_name": "Nowak", "role": "customer", "is_verified": false,
            "created_at": "2025-06-01T10:00:00"}"#;
        let resp: RegisterResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(resp, RegisterResponse::Created(_)));
        assert_eq!(resp.profile().id, 5);
    }

    #[test]
    fn test_register_response_logged_in() {
        let json = r#"{"access_token": "t1", "refresh_token": "r1",
            "user": {"id": 5, "email": "anna@example.com", "role": "customer"}}"#;
        let resp: RegisterResponse = serde_json::from_str(json).unwrap();
        match resp {
            RegisterResponse::LoggedIn(auth) => assert_eq!(auth.access_token.expose(), "t1"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
