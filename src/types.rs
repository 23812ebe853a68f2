//! NewType wrappers for strong typing throughout the client.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing a refresh token where an access token is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Same as `newtype_string!` but for credentials: no `Display`, and `Debug`
/// only reveals the length.
macro_rules! secret_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the raw credential for putting on the wire.
            pub fn expose(&self) -> &str {
                &self.0
            }

            /// Length of the credential, safe to log.
            pub fn len(&self) -> usize {
                self.0.len()
            }

            /// Whether the credential is an empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(<{} chars>)", stringify!($name), self.0.len())
            }
        }
    };
}

secret_string!(
    /// Short-lived bearer credential authorizing API calls.
    AccessToken
);

secret_string!(
    /// Longer-lived credential exchanged for a new access/refresh pair.
    RefreshToken
);

secret_string!(
    /// Token issued by a federated identity provider (Google ID token).
    ProviderToken
);

newtype_string!(
    /// Role of a user as reported by the server.
    ///
    /// Kept as an open string: the backend knows "admin" and "customer",
    /// but older accounts and test fixtures carry other values ("user").
    Role
);

impl Role {
    pub const ADMIN: &'static str = "admin";

    /// Whether this role grants access to the admin dashboard.
    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN
    }
}

newtype_string!(
    /// Identifier of a payment intent at the card processor
    /// (e.g. "pi_3Nf...").
    PaymentIntentId
);

newtype_string!(
    /// Three-letter lower-case currency code (e.g. "pln").
    Currency
);

impl Default for Currency {
    fn default() -> Self {
        Self::new("pln")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_is_admin() {
        assert!(Role::new("admin").is_admin());
        assert!(!Role::new("customer").is_admin());
        assert!(!Role::new("user").is_admin());
        assert!(!Role::new("Admin").is_admin());
    }

    #[test]
    fn test_role_serde_transparent() {
        let role = Role::new("customer");
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"customer\"");

        let parsed: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, role);
    }

    #[test]
    fn test_secret_debug_hides_value() {
        let token = AccessToken::new("eyJhbGciOiJIUzI1NiJ9.secret");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret"));
        assert_eq!(debug, "AccessToken(<27 chars>)");
        assert_eq!(token.expose(), "eyJhbGciOiJIUzI1NiJ9.secret");
    }

    #[test]
    fn test_secret_serde() {
        let token: RefreshToken = serde_json::from_str("\"r1\"").unwrap();
        assert_eq!(token.expose(), "r1");
        assert_eq!(token.len(), 2);
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"r1\"");
    }

    #[test]
    fn test_payment_intent_id() {
        let id: PaymentIntentId = "pi_123".into();
        assert_eq!(id.as_str(), "pi_123");
        assert_eq!(id.to_string(), "pi_123");
        assert_eq!(id.into_inner(), "pi_123".to_string());
    }

    #[test]
    fn test_currency_default() {
        assert_eq!(Currency::default().as_str(), "pln");
    }
}
