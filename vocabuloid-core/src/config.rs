//! Client configuration.
//!
//! Configuration is read from `vocabuloid.toml` in the platform config
//! directory (or an explicit path). Every field has a default, so a missing
//! file yields a usable configuration apart from the consumer credentials,
//! which must be supplied by the file or the environment.
//!
//! # Example
//!
//! ```toml
//! [service]
//! base_url = "https://vocabulario.me"
//! consumer_key = "dpf43f3p2l4k3l03"
//! consumer_secret = "kd94hf93k423kf44"
//!
//! [transport]
//! timeout_secs = 20
//!
//! [credentials]
//! kind = "keyring"
//!
//! [messages]
//! no_translations = "Keine Übersetzungen"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::oauth::Consumer;
use crate::store::{Secret, StoreBackend};

/// Environment variable overriding `service.base_url`.
pub const ENV_BASE_URL: &str = "VOCABULOID_BASE_URL";
/// Environment variable overriding `service.consumer_key`.
pub const ENV_CONSUMER_KEY: &str = "VOCABULOID_CONSUMER_KEY";
/// Environment variable overriding `service.consumer_secret`.
pub const ENV_CONSUMER_SECRET: &str = "VOCABULOID_CONSUMER_SECRET";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub service: ServiceConfig,
    pub transport: TransportConfig,
    pub credentials: StoreBackend,
    pub messages: Messages,

    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,
}

/// Remote service endpoints and consumer credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL every resource and OAuth path is appended to.
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: Secret,
    pub request_token_path: String,
    pub access_token_path: String,
    pub authorize_path: String,
    /// `oauth_callback` sent with the request-token call. `oob` means the
    /// service shows the verifier to the user instead of redirecting.
    pub callback: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://vocabulario.me".to_string(),
            consumer_key: String::new(),
            consumer_secret: Secret::new(""),
            request_token_path: "/oauth/request_token".to_string(),
            access_token_path: "/oauth/access_token".to_string(),
            authorize_path: "/oauth/authorize".to_string(),
            callback: "oob".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Consumer credentials used for every signature.
    pub fn consumer(&self) -> Consumer {
        Consumer::new(self.consumer_key.clone(), self.consumer_secret.clone())
    }

    /// Join a service-relative path onto the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        let joined = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        Url::parse(&joined).map_err(|e| ConfigError::Invalid {
            message: format!("invalid URL {:?}: {}", joined, e),
        })
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("vocabuloid/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// User-facing strings the core hands back to presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Placeholder for a vocabulary without translations.
    pub no_translations: String,
    /// Placeholder for a verb without conjugations.
    pub no_conjugations: String,
    /// First heading of a verb list card.
    pub infinitive: String,
    pub no_vocabularies: String,
    pub offline: String,
    pub signed_in: String,
    pub signed_out: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            no_translations: "No translations available".to_string(),
            no_conjugations: "No conjugations available".to_string(),
            infinitive: "infinitive".to_string(),
            no_vocabularies: "This list has no vocabularies".to_string(),
            offline: "You are offline".to_string(),
            signed_in: "Signed in".to_string(),
            signed_out: "Signed out".to_string(),
        }
    }
}

impl ClientConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.config_path = origin.to_path_buf();
        Ok(config)
    }

    /// Apply overrides from a variable lookup, normally [`std::env::var`].
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.service.base_url = base_url;
        }
        if let Some(key) = lookup(ENV_CONSUMER_KEY) {
            self.service.consumer_key = key;
        }
        if let Some(secret) = lookup(ENV_CONSUMER_SECRET) {
            self.service.consumer_secret = Secret::new(secret);
        }
    }

    /// Check the values the core cannot work without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.endpoint("/")?;

        if self.service.consumer_key.is_empty() {
            return Err(ConfigError::Invalid {
                message: format!(
                    "service.consumer_key is empty (set it in the config file or {})",
                    ENV_CONSUMER_KEY
                ),
            });
        }

        if self.transport.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "transport.timeout_secs must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            transport: TransportConfig::default(),
            credentials: StoreBackend::default(),
            messages: Messages::default(),
            log_level: default_log_level(),
            config_path: PathBuf::new(),
        }
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join("vocabuloid.toml"))
        .unwrap_or_else(|| PathBuf::from("vocabuloid.toml"))
}

/// Load configuration from `path` (or the default location), apply
/// environment overrides and validate.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        ClientConfig::from_toml_str(&contents, &config_path)?
    } else {
        tracing::debug!("No config file at {:?}, using defaults", config_path);
        ClientConfig {
            config_path,
            ..ClientConfig::default()
        }
    };

    config.apply_overrides(|name| std::env::var(name).ok());
    config.validate()?;

    Ok(config)
}

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("me", "vocabulario", "vocabuloid")
}
