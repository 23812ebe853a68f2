//! Error types for client operations.
//!
//! Every failed exchange is normalized at the client boundary so that UI
//! code only ever sees one shape, [`ApiError`]: a human-readable message and
//! the HTTP status when there was one.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::StoreError;
use crate::validation::ValidationErrors;

/// Normalized `{message, status}` error handed to UI code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    /// HTTP status of the failed response; `None` when no response arrived.
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    /// Build from a non-2xx response body.
    ///
    /// Prefers the server's `detail` field, then `message`, then `fallback`.
    /// Validation failures from the backend carry `detail` as a list of
    /// `{msg, loc}` objects; their messages are joined.
    pub fn from_response(status: u16, body: &[u8], fallback: &str) -> Self {
        let message = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|json| extract_message(&json))
            .unwrap_or_else(|| fallback.to_string());

        Self::new(message, Some(status))
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == Some(403)
    }
}

fn extract_message(json: &Value) -> Option<String> {
    match json.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => return Some(detail.clone()),
        Some(Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }

    json.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Errors that can occur when talking to the rental backend.
#[derive(Debug, Clone)]
pub enum ClientError {
    /// The server answered with a non-2xx status.
    Api(ApiError),
    /// No response was received (connect failure, reset, timeout).
    Transport(String),
    /// A 2xx response body did not have the expected shape.
    Decode(String),
    /// The session store could not be read or written.
    Storage(StoreError),
    /// The request could not be built (bad path, unserializable body).
    InvalidRequest(String),
    /// Client-side form validation failed; nothing was sent.
    Validation(ValidationErrors),
    /// The card processor rejected the payment confirmation.
    Payment(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(err) => write!(f, "{}", err),
            Self::Transport(msg) => write!(f, "Network error: {}", msg),
            Self::Decode(msg) => write!(f, "Unexpected response: {}", msg),
            Self::Storage(err) => write!(f, "Session storage error: {}", err),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::Validation(errors) => write!(f, "Validation failed: {}", errors),
            Self::Payment(msg) => write!(f, "Payment failed: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err)
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// HTTP status of the underlying response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => err.status,
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Collapse into the single `{message, status}` shape shown to users.
    ///
    /// Server errors keep their message; transport failures get the generic
    /// `fallback` message and no status.
    pub fn to_api_error(&self, fallback: &str) -> ApiError {
        match self {
            Self::Api(err) => err.clone(),
            Self::Transport(_) | Self::Decode(_) | Self::Storage(_) | Self::InvalidRequest(_) => {
                ApiError::new(fallback, None)
            }
            Self::Validation(errors) => ApiError::new(errors.to_string(), None),
            Self::Payment(msg) => ApiError::new(msg.clone(), None),
        }
    }
}
