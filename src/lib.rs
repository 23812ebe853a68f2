// Core modules
mod config;
mod error;
mod types;
mod utils;

pub mod api;
pub mod client;
pub mod model;
pub mod session;
pub mod validation;

// Re-export key types and functions
pub use client::{ApiClient, ApiRequest, ApiResponse, AuthMode, RequestOptions, SessionEvent};
pub use config::{ClientConfig, resolve_session_dir};
pub use error::{ApiError, ClientError, ClientResult};
pub use session::{
    CurrentUser, FileStore, MemoryStore, RestoreOutcome, SessionManager, SessionStore, TokenClaims,
    UserProfile,
};
pub use types::{AccessToken, Currency, PaymentIntentId, ProviderToken, RefreshToken, Role};
pub use utils::parse_timestamp;

use std::path::Path;
use std::sync::Arc;

/// Convenience function to build a client and session manager over a
/// file-backed store in `session_dir`.
pub fn create_session(config: ClientConfig, session_dir: &Path) -> ClientResult<SessionManager> {
    let store = FileStore::open(session_dir)?;
    let client = ApiClient::new(config, Arc::new(store))?;
    Ok(SessionManager::new(client))
}
