//! Configuration loading
//!
//! Base URL resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CARDFEED_BASE_URL`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Example `config.toml`:
//!
//! ```toml
//! base_url = "http://127.0.0.1:8000"
//! events_path = "/events"
//! highlight_ms = 1000
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Environment variable overriding the server base URL
pub const ENV_BASE_URL: &str = "CARDFEED_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_ACTION_PATH: &str = "/actions/button";
pub const DEFAULT_EVENTS_PATH: &str = "/events";
pub const DEFAULT_PDF_PATH: &str = "/generate-pdf";
pub const DEFAULT_HIGHLIGHT_MS: u64 = 1000;
pub const DEFAULT_OBJECT_URL_TTL_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Contents of a TOML config file; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub base_url: Option<String>,
    pub action_path: Option<String>,
    pub events_path: Option<String>,
    pub pdf_path: Option<String>,
    pub highlight_ms: Option<u64>,
    pub object_url_ttl_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
}

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub action_path: String,
    pub events_path: String,
    pub pdf_path: String,
    /// How long a new card stays highlighted
    pub highlight_ms: u64,
    /// How long a fetched PDF's object URL stays valid
    pub object_url_ttl_ms: u64,
    /// Timeout for one-shot requests and for opening the push stream
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            action_path: DEFAULT_ACTION_PATH.to_string(),
            events_path: DEFAULT_EVENTS_PATH.to_string(),
            pdf_path: DEFAULT_PDF_PATH.to_string(),
            highlight_ms: DEFAULT_HIGHLIGHT_MS,
            object_url_ttl_ms: DEFAULT_OBJECT_URL_TTL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    /// Config pointing at `base_url` with every other setting defaulted
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn action_url(&self) -> String {
        self.endpoint(&self.action_path)
    }

    pub fn events_url(&self) -> String {
        self.endpoint(&self.events_path)
    }

    pub fn pdf_url(&self) -> String {
        self.endpoint(&self.pdf_path)
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    pub fn object_url_ttl(&self) -> Duration {
        Duration::from_millis(self.object_url_ttl_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check URL scheme and endpoint paths
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        for (name, path) in [
            ("action_path", &self.action_path),
            ("events_path", &self.events_path),
            ("pdf_path", &self.pdf_path),
        ] {
            if !path.starts_with('/') {
                return Err(Error::Config(format!(
                    "{} must start with '/', got '{}'",
                    name, path
                )));
            }
        }

        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Overlay the keys present in a TOML file
    fn apply(&mut self, toml: TomlConfig) {
        if let Some(base_url) = toml.base_url {
            self.base_url = base_url;
        }
        if let Some(path) = toml.action_path {
            self.action_path = path;
        }
        if let Some(path) = toml.events_path {
            self.events_path = path;
        }
        if let Some(path) = toml.pdf_path {
            self.pdf_path = path;
        }
        if let Some(ms) = toml.highlight_ms {
            self.highlight_ms = ms;
        }
        if let Some(ms) = toml.object_url_ttl_ms {
            self.object_url_ttl_ms = ms;
        }
        if let Some(ms) = toml.request_timeout_ms {
            self.request_timeout_ms = ms;
        }
    }
}

/// Default config file location: `<config_dir>/cardfeed/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cardfeed").join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Resolves a [`ClientConfig`] from CLI, environment, file and defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_base_url: Option<String>,
    config_file: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base URL given on the command line
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.cli_base_url = base_url;
        self
    }

    /// Explicit config file; unlike the default location it must exist
    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    pub fn resolve(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::default();

        // Priority 3: TOML config file
        match &self.config_file {
            Some(path) => {
                let toml = load_toml_config(path).map_err(|e| {
                    Error::Config(format!("Failed to load {}: {}", path.display(), e))
                })?;
                info!("Loaded config from {}", path.display());
                config.apply(toml);
            }
            None => {
                if let Some(path) = default_config_path().filter(|p| p.exists()) {
                    match load_toml_config(&path) {
                        Ok(toml) => {
                            info!("Loaded config from {}", path.display());
                            config.apply(toml);
                        }
                        Err(e) => {
                            warn!("Ignoring config file {}: {} (using defaults)", path.display(), e);
                        }
                    }
                } else {
                    debug!("No config file found, using defaults");
                }
            }
        }

        // Priority 2: Environment variable
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            if !base_url.is_empty() {
                config.base_url = base_url;
            }
        }

        // Priority 1: Command-line argument
        if let Some(base_url) = &self.cli_base_url {
            config.base_url = base_url.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
