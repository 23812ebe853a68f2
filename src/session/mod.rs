//! Client-side session: persisted tokens, the cached profile and the
//! login/logout lifecycle built on top of them.

mod manager;
mod profile;
mod store;

pub use manager::{RestoreOutcome, SessionManager};
pub use profile::{AuthResponse, CurrentUser, TokenClaims, TokenPair, UserProfile};
pub use store::{
    ACCESS_TOKEN_KEY, FileStore, MemoryStore, REFRESH_TOKEN_KEY, SessionStore, StoreError,
    StoreResult, USER_KEY,
};
