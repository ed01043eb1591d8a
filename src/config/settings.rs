use serde::Deserialize;

use crate::utils::constants::{
    DEFAULT_CHARS_PER_TOKEN, DEFAULT_ENVIRONMENT, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_MAX_TOKENS,
};

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    #[serde(default = "default_environment")]
    pub default_environment: String,
    /// per-attempt timeout, not per logical call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub shaping: ShapingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub logging: Option<LoggingConfig>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            default_environment: default_environment(),
            timeout_ms: default_timeout_ms(),
            retry: None,
            shaping: ShapingConfig::default(),
            metrics: MetricsConfig::default(),
            server: ServerConfig::default(),
            logging: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RetryConfig {
    pub max_retries: Option<u32>,
    pub retryable_status_codes: Option<Vec<u16>>,
    /// will be mutiply by 2 on every retry until max_delay_ms
    pub base_delay_ms: Option<u64>,
    /// invariant: >= base_delay_ms
    pub max_delay_ms: Option<u64>,
    pub retry_network_errors: Option<bool>,
}

/// ================================
/// Response size governance
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ShapingConfig {
    /// budget for one collection response, in estimated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            chars_per_token: default_chars_per_token(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            is_enabled: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "compact".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}

fn default_chars_per_token() -> usize {
    DEFAULT_CHARS_PER_TOKEN
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> String {
    "9100".to_string()
}
