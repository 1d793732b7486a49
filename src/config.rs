//! Environment-driven configuration.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `SOULNET_DATA_DIR` — storage root for snapshots and registry records
//! - `SOULNET_EPHEMERAL` / `VERCEL` — when set and no data dir is given, use `/tmp/soulnet-data`
//! - `OPENROUTER_API_KEY` — completion backend key (chat disabled when absent)
//! - `OPENROUTER_MODEL` — default `deepseek/deepseek-chat`
//! - `OPENROUTER_SITE_URL` — default `http://localhost:3000`
//! - `OPENROUTER_APP_NAME` — default `SoulNet MVP`
//! - `SOULNET_API_URL` — base URL used by the HTTP clients (default `http://localhost:8080`)

use std::env;
use std::path::{Path, PathBuf};

/// Default request timeout for HTTP clients.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Storage root on hosts with an ephemeral, writable `/tmp` only.
pub const EPHEMERAL_DATA_ROOT: &str = "/tmp/soulnet-data";

/// Where the file-system stores keep their files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the root from the environment.
    pub fn from_env() -> Self {
        Self::resolve(
            env::var("SOULNET_DATA_DIR").ok(),
            env::var_os("SOULNET_EPHEMERAL").is_some() || env::var_os("VERCEL").is_some(),
        )
    }

    fn resolve(explicit: Option<String>, ephemeral: bool) -> Self {
        match explicit.filter(|s| !s.trim().is_empty()) {
            Some(dir) => Self::new(dir),
            None if ephemeral => Self::new(EPHEMERAL_DATA_ROOT),
            None => Self::new(
                env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join("data"),
            ),
        }
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    pub fn chain_dir(&self) -> PathBuf {
        self.root.join("chain")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Credentials and defaults for the OpenRouter completion API.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub model: String,
    pub site_url: String,
    pub app_name: String,
    pub base_url: String,
}

impl OpenRouterConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://openrouter.ai/api/v1";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "deepseek/deepseek-chat".to_string(),
            site_url: "http://localhost:3000".to_string(),
            app_name: "SoulNet MVP".to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// `None` when `OPENROUTER_API_KEY` is unset or empty.
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("OPENROUTER_API_KEY").ok().filter(|k| !k.is_empty())?;
        let mut config = Self::new(api_key);
        if let Ok(model) = env::var("OPENROUTER_MODEL") {
            config.model = model;
        }
        if let Ok(site_url) = env::var("OPENROUTER_SITE_URL") {
            config.site_url = site_url;
        }
        if let Ok(app_name) = env::var("OPENROUTER_APP_NAME") {
            config.app_name = app_name;
        }
        Some(config)
    }
}

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub data: DataPaths,
    pub openrouter: Option<OpenRouterConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
        Self {
            bind_addr: format!("0.0.0.0:{}", port),
            data: DataPaths::from_env(),
            openrouter: OpenRouterConfig::from_env(),
        }
    }
}

/// Settings shared by the reqwest-based clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without trailing slash, e.g. `http://localhost:8080`.
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn from_env() -> Self {
        Self::new(env::var("SOULNET_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()))
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn build_http(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_data_dir_wins() {
        let paths = DataPaths::resolve(Some("/srv/soul".to_string()), true);
        assert_eq!(paths.root, PathBuf::from("/srv/soul"));
        assert_eq!(paths.snapshots_dir(), PathBuf::from("/srv/soul/snapshots"));
        assert_eq!(paths.chain_dir(), PathBuf::from("/srv/soul/chain"));
    }

    #[test]
    fn test_ephemeral_host_uses_tmp() {
        let paths = DataPaths::resolve(None, true);
        assert_eq!(paths.root, PathBuf::from(EPHEMERAL_DATA_ROOT));
    }

    #[test]
    fn test_default_is_local_data_dir() {
        let paths = DataPaths::resolve(Some("  ".to_string()), false);
        assert!(paths.root.ends_with("data"));
    }

    #[test]
    fn test_client_config_trims_trailing_slash() {
        let config = ClientConfig::new("http://127.0.0.1:9000/").with_timeout_ms(500);
        assert_eq!(config.url("/api/chain/last"), "http://127.0.0.1:9000/api/chain/last");
        assert_eq!(config.timeout_ms, 500);
    }

    #[test]
    fn test_openrouter_defaults() {
        let config = OpenRouterConfig::new("k");
        assert_eq!(config.model, "deepseek/deepseek-chat");
        assert_eq!(config.app_name, "SoulNet MVP");
    }
}
