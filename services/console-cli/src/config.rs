//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Tokens never live in the TOML; they are kept in the credential file
//! pointed to by `session.credentials_path`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "smartgas-console.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Back-office API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_timeout(),
            refresh_timeout_secs: default_refresh_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

/// Where the session tokens are persisted
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_refresh_timeout() -> u64 {
    5
}

fn default_credentials_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("smartgas-console").join("credentials.json"),
        None => PathBuf::from(".smartgas-console/credentials.json"),
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| common::Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Like `load`, but a missing file yields the defaults.
    ///
    /// Used for the implicit default path; an explicitly requested file
    /// must exist.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Config::default().finish()
        }
    }

    fn finish(mut self) -> common::Result<Self> {
        if let Ok(url) = std::env::var("SMARTGAS_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(path) = std::env::var("SMARTGAS_CREDENTIALS_PATH") {
            self.session.credentials_path = PathBuf::from(path);
        }
        self.session.credentials_path = expand_tilde(&self.session.credentials_path);
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> common::Result<()> {
        if self.api.base_url.is_empty() {
            return Err(common::Error::Config(
                "api.base_url is required (or set SMARTGAS_API_URL)".into(),
            ));
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(common::Error::invalid(
                "api.base_url",
                format!("must start with http:// or https://, got: {}", self.api.base_url),
            ));
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::invalid(
                "api.timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.api.refresh_timeout_secs == 0 {
            return Err(common::Error::invalid(
                "api.refresh_timeout_secs",
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    ///
    /// Returns the path and whether it was explicitly requested.
    pub fn resolve_path(cli_path: Option<&Path>) -> (PathBuf, bool) {
        if let Some(p) = cli_path {
            return (p.to_path_buf(), true);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return (PathBuf::from(p), true);
        }
        (PathBuf::from(DEFAULT_CONFIG_FILE), false)
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
