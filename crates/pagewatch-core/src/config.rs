use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WAKE_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_RENDERER_URL: &str = "http://127.0.0.1:9222";
pub const DEFAULT_MAX_SEND_ATTEMPTS: u32 = 5;
pub const DEFAULT_SEND_RETRY_DELAY_MS: u64 = 50;
pub const DEFAULT_RESPONSE_MARGIN_SECS: u64 = 5;

/// Top-level config (pagewatch.toml + PAGEWATCH_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PagewatchConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Renderer sidecar — the service that owns actual page loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_renderer_url")]
    pub base_url: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            base_url: default_renderer_url(),
        }
    }
}

/// Collect-handshake tuning. The defaults match the extraction side's
/// listener-registration window and rarely need changing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_max_send_attempts")]
    pub max_send_attempts: u32,
    #[serde(default = "default_send_retry_delay_ms")]
    pub send_retry_delay_ms: u64,
    /// Headroom kept between the response deadline and the session timeout.
    #[serde(default = "default_response_margin_secs")]
    pub response_margin_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_send_attempts: default_max_send_attempts(),
            send_retry_delay_ms: default_send_retry_delay_ms(),
            response_margin_secs: default_response_margin_secs(),
        }
    }
}

/// Where extracted payloads are POSTed. The endpoint scheme is re-validated
/// at every submission, not only here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SubmissionConfig {
    #[serde(default)]
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_wake_interval_secs")]
    pub wake_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            wake_interval_secs: default_wake_interval_secs(),
        }
    }
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.pagewatch/pagewatch.db", home)
}
fn default_renderer_url() -> String {
    DEFAULT_RENDERER_URL.to_string()
}
fn default_max_send_attempts() -> u32 {
    DEFAULT_MAX_SEND_ATTEMPTS
}
fn default_send_retry_delay_ms() -> u64 {
    DEFAULT_SEND_RETRY_DELAY_MS
}
fn default_response_margin_secs() -> u64 {
    DEFAULT_RESPONSE_MARGIN_SECS
}
fn default_wake_interval_secs() -> u64 {
    DEFAULT_WAKE_INTERVAL_SECS
}

impl PagewatchConfig {
    /// Load config from a TOML file with PAGEWATCH_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.pagewatch/pagewatch.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: PagewatchConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PAGEWATCH_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.pagewatch/pagewatch.toml", home)
}
