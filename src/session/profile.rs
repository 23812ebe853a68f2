//! Session credentials and the cached user profile.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccessToken, RefreshToken, Role};

/// Access/refresh pair as issued by the auth service.
///
/// Both are always written and cleared together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

/// Denormalized snapshot of the signed-in user.
///
/// Advisory only: the server-side principal behind the access token is
/// authoritative. Optional fields are omitted when serialized so a profile
/// read back from the store has the same structure it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
}

impl UserProfile {
    /// "First Last", falling back to whichever part exists, then the email.
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("").trim_end();
        let last = self.last_name.as_deref().unwrap_or("").trim_start();

        match (first.is_empty(), last.is_empty()) {
            (false, false) => format!("{} {}", first, last),
            (false, true) => first.to_string(),
            (true, false) => last.to_string(),
            (true, true) => self.email.clone(),
        }
    }
}

/// The profile as exposed to the application, with the derived admin flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

impl From<UserProfile> for CurrentUser {
    fn from(profile: UserProfile) -> Self {
        let is_admin = profile.role.is_admin();
        Self { profile, is_admin }
    }
}

/// Body returned by login, federated login and (optionally) registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: UserProfile,
}

impl AuthResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

/// Unverified claims read out of an access token's payload.
///
/// Display only. The client never decides to refresh based on these; it
/// refreshes when the server says 401.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
}

impl TokenClaims {
    /// Decode the middle segment of a JWT without checking its signature.
    ///
    /// Returns `None` for opaque (non-JWT) tokens.
    pub fn peek(token: &AccessToken) -> Option<Self> {
        let payload = token.expose().split('.').nth(1)?;
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: &str) -> UserProfile {
        UserProfile {
            id: 1,
            email: "test@example.com".to_string(),
            first_name: None,
            last_name: None,
            role: Role::new(role),
            auth_provider: None,
            phone: None,
            is_verified: None,
        }
    }

    fn jwt_with_payload(payload: &str) -> AccessToken {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        AccessToken::new(format!(
            "{}.{}.sig",
            engine.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            engine.encode(payload)
        ))
    }

    #[test]
    fn test_is_admin_iff_role_admin() {
        assert!(CurrentUser::from(profile("admin")).is_admin);
        assert!(!CurrentUser::from(profile("customer")).is_admin);
        assert!(!CurrentUser::from(profile("user")).is_admin);
    }

    #[test]
    fn test_minimal_profile_round_trip() {
        let json = r#"{"id":1,"email":"test@example.com","role":"user"}"#;
        let parsed: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, profile("user"));

        let written = serde_json::to_string(&parsed).unwrap();
        assert_eq!(written, json);
    }

    #[test]
    fn test_current_user_serializes_flag() {
        let user = CurrentUser::from(profile("admin"));
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["isAdmin"], true);
        assert_eq!(json["email"], "test@example.com");
    }

    #[test]
    fn test_display_name() {
        let mut p = profile("customer");
        assert_eq!(p.display_name(), "test@example.com");

        p.first_name = Some("Anna ".to_string());
        assert_eq!(p.display_name(), "Anna");

        p.last_name = Some(" Nowak".to_string());
        assert_eq!(p.display_name(), "Anna Nowak");

        p.first_name = None;
        assert_eq!(p.display_name(), "Nowak");
    }

    #[test]
    fn test_auth_response_tokens() {
        let json = r#"{
            "access_token": "t1",
            "refresh_token": "r1",
            "token_type": "bearer",
            "user": {"id": 1, "email": "test@example.com", "role": "user"}
        }"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        let tokens = resp.tokens();
        assert_eq!(tokens.access_token.expose(), "t1");
        assert_eq!(tokens.refresh_token.expose(), "r1");
        assert_eq!(resp.token_type.as_deref(), Some("bearer"));
    }

    #[test]
    fn test_token_claims_peek() {
        let token = jwt_with_payload(r#"{"sub":"42","exp":1700000000,"type":"access"}"#);
        let claims = TokenClaims::peek(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert_eq!(claims.token_type.as_deref(), Some("access"));
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_700_000_000);

        let later = DateTime::from_timestamp(1_700_000_001, 0).unwrap();
        assert!(claims.is_expired_at(later));
    }

    #[test]
    fn test_token_claims_opaque_token() {
        assert!(TokenClaims::peek(&AccessToken::new("t1")).is_none());
        assert!(TokenClaims::peek(&AccessToken::new("a.!!!.c")).is_none());
    }
}
