//! Configuration file loading
//!
//! Precedence: CLI args > env vars > config file > defaults. The file is
//! optional unless named explicitly via `--config` or `CONFIG_PATH`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "zotify-auth.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub oauth: OAuthFileConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[oauth]` section
#[derive(Debug, Deserialize)]
pub struct OAuthFileConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// `[storage]` section
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
}

fn default_timeout() -> u64 {
    30
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

impl Default for OAuthFileConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            redirect_uri: None,
            proxy: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
        }
    }
}

impl OAuthFileConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the named config, or the default file if present, or defaults.
    pub fn discover(cli_path: Option<&Path>) -> common::Result<Self> {
        if let Some(path) = Self::resolve_path(cli_path) {
            return Self::load(&path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            return Self::load(fallback);
        }
        Ok(Self::default())
    }

    /// Explicit config path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(p.to_path_buf());
        }
        std::env::var("CONFIG_PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    fn validate(&self) -> common::Result<()> {
        if let Some(uri) = &self.oauth.redirect_uri {
            if !is_http_url(uri) {
                return Err(common::Error::Config(format!(
                    "redirect_uri must start with http:// or https://, got: {uri}"
                )));
            }
        }

        // Proxy URLs may hold credentials, keep them out of the message
        if let Some(proxy) = &self.oauth.proxy {
            if !is_http_url(proxy) {
                return Err(common::Error::Config(
                    "proxy must start with http:// or https://".into(),
                ));
            }
        }

        if self.oauth.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
