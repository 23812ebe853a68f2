use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, time::Duration};
use url::Url;

/// Backend origin used when `RENTAL_API_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Overall per-request ceiling, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Shown when a failed response carries no human-readable detail.
pub const DEFAULT_FALLBACK_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin every endpoint path is joined onto.
    pub base_url: Url,
    /// Overall timeout for one HTTP exchange. Exceeding it is a transport error.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub user_agent: String,
    /// Message used when the server gives no `detail`/`message`.
    pub fallback_message: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let base_url = env::var("RENTAL_API_URL")
            .ok()
            .and_then(|raw| Url::parse(&raw).ok())
            .unwrap_or_else(default_base_url);
        let timeout = env::var("RENTAL_API_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            base_url,
            timeout: Duration::from_secs(timeout),
            user_agent: format!("rental-client/{}", env!("CARGO_PKG_VERSION")),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at an explicit origin, everything else default.
    pub fn with_base_url(base_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            ..Default::default()
        })
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL")
}

/// Directory holding the persisted session (`access_token`, `refresh_token`, `user`).
///
/// Resolution order: `RENTAL_SESSION_DIR`, `$XDG_CONFIG_HOME/rental-client`,
/// `$HOME/.config/rental-client`, then `./.rental-client`.
pub fn resolve_session_dir() -> PathBuf {
    if let Ok(p) = env::var("RENTAL_SESSION_DIR") {
        return PathBuf::from(p);
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("rental-client");
    }

    if let Ok(home) = env::var("HOME") {
        return PathBuf::from(home).join(".config").join("rental-client");
    }

    PathBuf::from(".rental-client")
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_url() {
        let cfg = ClientConfig::with_base_url("http://127.0.0.1:9000").unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(cfg.fallback_message, DEFAULT_FALLBACK_MESSAGE);
    }

    #[test]
    fn test_with_base_url_rejects_garbage() {
        assert!(ClientConfig::with_base_url("not a url").is_err());
    }

    #[test]
    fn test_timeout_override() {
        let cfg = ClientConfig::with_base_url("http://localhost:8000")
            .unwrap()
            .timeout(Duration::from_millis(250));
        assert_eq!(cfg.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_config_serializes_timeout_as_seconds() {
        let cfg = ClientConfig::with_base_url("http://localhost:8000")
            .unwrap()
            .timeout(Duration::from_secs(7));
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["timeout"], 7);
        assert_eq!(json["base_url"], "http://localhost:8000/");
    }
}
