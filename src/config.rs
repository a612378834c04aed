use crate::error::AppResult;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// HTTP listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Slack app configuration
#[derive(Deserialize, Clone)]
pub struct SlackConfig {
    /// Shared secret used to sign every inbound request
    #[serde(default)]
    pub signing_secret: String,
    /// Public base URL of this app (the reinstall link points here)
    pub app_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Maximum age of a signed request before it counts as a replay
    #[serde(default = "default_timestamp_tolerance")]
    pub timestamp_tolerance_secs: u64,
    /// Disables signature checks entirely. Test harnesses only.
    #[serde(default)]
    pub skip_signature_validation: bool,
}

fn default_api_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_timestamp_tolerance() -> u64 {
    300
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("signing_secret", &"<redacted>")
            .field("app_url", &self.app_url)
            .field("api_url", &self.api_url)
            .field("timestamp_tolerance_secs", &self.timestamp_tolerance_secs)
            .field("skip_signature_validation", &self.skip_signature_validation)
            .finish()
    }
}

/// Which backend holds encrypted secrets and team tokens
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Non-persistent, for local development
    Memory,
}

/// Secret store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Expiry applied to stored secrets; none by default
    #[serde(default)]
    pub secret_ttl_secs: Option<u64>,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            secret_ttl_secs: None,
        }
    }
}

/// Outbound call settings
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Root application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub slack: SlackConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SECRETMESSAGE_SLACK__SIGNING_SECRET, SECRETMESSAGE_SERVER__PORT
            .add_source(
                Environment::with_prefix("SECRETMESSAGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Initialize the global config singleton
    pub fn init() -> AppResult<&'static Self> {
        let config = Self::load()?;
        Ok(CONFIG.get_or_init(|| config))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.slack.signing_secret.is_empty() && !self.slack.skip_signature_validation {
            return Err(ConfigError::Message(
                "slack.signing_secret must be set".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "http.timeout_secs must be greater than zero".to_string(),
            ));
        }
        // Redis rejects `EX 0`
        if self.store.secret_ttl_secs == Some(0) {
            return Err(ConfigError::Message(
                "store.secret_ttl_secs must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl SlackConfig {
    pub fn reinstall_url(&self) -> String {
        format!("{}/auth/slack", self.app_url.trim_end_matches('/'))
    }
}
