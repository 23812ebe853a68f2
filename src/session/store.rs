//! Persistent key/value storage for the session.
//!
//! The store is process-wide shared state with three keys in use:
//! [`ACCESS_TOKEN_KEY`], [`REFRESH_TOKEN_KEY`] and [`USER_KEY`]. Writes are
//! atomic per key only; the token pair is written as two separate keys.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::session::profile::{TokenPair, UserProfile};
use crate::types::{AccessToken, RefreshToken};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_KEY: &str = "user";

const SESSION_FILE: &str = "session.json";

/// Errors raised by a session store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Reading or writing the backing medium failed.
    Io(String),
    /// A stored value could not be parsed.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
            Self::Corrupt(msg) => write!(f, "Corrupt session data: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key/value storage surviving restarts, shared by the API client and the
/// session manager.
///
/// Implementors provide the raw string operations; the typed accessors for
/// tokens and the cached profile are provided on top of them.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove one key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Remove every key.
    fn clear(&self) -> StoreResult<()>;

    fn access_token(&self) -> StoreResult<Option<AccessToken>> {
        Ok(self.get(ACCESS_TOKEN_KEY)?.map(AccessToken::from))
    }

    fn refresh_token(&self) -> StoreResult<Option<RefreshToken>> {
        Ok(self.get(REFRESH_TOKEN_KEY)?.map(RefreshToken::from))
    }

    /// Overwrite both tokens.
    fn save_tokens(&self, tokens: &TokenPair) -> StoreResult<()> {
        self.set(ACCESS_TOKEN_KEY, tokens.access_token.expose())?;
        self.set(REFRESH_TOKEN_KEY, tokens.refresh_token.expose())
    }

    fn profile(&self) -> StoreResult<Option<UserProfile>> {
        match self.get(USER_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", USER_KEY, e))),
            None => Ok(None),
        }
    }

    fn save_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        let raw = serde_json::to_string(profile)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", USER_KEY, e)))?;
        self.set(USER_KEY, &raw)
    }

    /// Tear the session down: both tokens and the cached profile.
    fn clear_session(&self) -> StoreResult<()> {
        self.remove(ACCESS_TOKEN_KEY)?;
        self.remove(REFRESH_TOKEN_KEY)?;
        self.remove(USER_KEY)
    }
}

/// In-memory store, used by tests and short-lived embeddings.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.lock().clear();
        Ok(())
    }
}

/// File-backed store: one JSON object in `<dir>/session.json`.
///
/// Every mutation rewrites the whole file through a temporary file and a
/// rename, so a reader never sees a partially written document.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) the store inside `dir`.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|e| StoreError::Io(format!("create {}: {}", dir.display(), e)))?;

        let path = dir.join(SESSION_FILE);
        debug!("Session store at {}", path.display());

        Ok(Self {
            path,
            guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StoreResult<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StoreError::Io(format!("read {}: {}", self.path.display(), e))),
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            warn!("Session file {} is not valid JSON", self.path.display());
            StoreError::Corrupt(e.to_string())
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)
            .map_err(|e| StoreError::Io(format!("write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::Io(format!("rename to {}: {}", self.path.display(), e)))
    }

    fn update<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> StoreResult<()> {
        self.update(|entries| entries.clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn sample_profile() -> UserProfile {
        UserProfile {
            id: 7,
            email: "jan@example.com".to_string(),
            first_name: Some("Jan".to_string()),
            last_name: Some("Kowalski".to_string()),
            role: Role::new("customer"),
            auth_provider: Some("local".to_string()),
            phone: None,
            is_verified: None,
        }
    }

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: AccessToken::new(access),
            refresh_token: RefreshToken::new(refresh),
        }
    }

    #[test]
    fn test_memory_store_tokens() {
        let store = MemoryStore::new();
        assert!(store.access_token().unwrap().is_none());

        store.save_tokens(&pair("t1", "r1")).unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("t1"));
        assert_eq!(store.refresh_token().unwrap().unwrap().expose(), "r1");
    }

    #[test]
    fn test_profile_round_trip() {
        let store = MemoryStore::new();
        let profile = sample_profile();
        store.save_profile(&profile).unwrap();

        let loaded = store.profile().unwrap().unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn test_corrupt_profile_reported() {
        let store = MemoryStore::new();
        store.set(USER_KEY, "{not json").unwrap();
        assert!(matches!(store.profile(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_clear_session_removes_three_keys() {
        let store = MemoryStore::new();
        store.save_tokens(&pair("t1", "r1")).unwrap();
        store.save_profile(&sample_profile()).unwrap();
        store.set("unrelated", "kept").unwrap();

        store.clear_session().unwrap();

        assert!(store.access_token().unwrap().is_none());
        assert!(store.refresh_token().unwrap().is_none());
        assert!(store.profile().unwrap().is_none());
        assert_eq!(store.get("unrelated").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_clear_session_when_empty_is_noop() {
        let store = MemoryStore::new();
        store.clear_session().unwrap();
        store.clear_session().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = FileStore::open(dir.path()).unwrap();
            store.save_tokens(&pair("t1", "r1")).unwrap();
            store.save_profile(&sample_profile()).unwrap();
        }

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.access_token().unwrap().unwrap().expose(), "t1");
        assert_eq!(reopened.profile().unwrap().unwrap(), sample_profile());
        assert!(reopened.path().ends_with("session.json"));
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).unwrap();
        assert!(store.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        store.remove(ACCESS_TOKEN_KEY).unwrap();
    }

    #[test]
    fn test_file_store_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.save_tokens(&pair("t1", "r1")).unwrap();
        store.clear().unwrap();
        assert!(store.refresh_token().unwrap().is_none());
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SESSION_FILE), "[1, 2").unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(store.get(USER_KEY), Err(StoreError::Corrupt(_))));
    }
}
