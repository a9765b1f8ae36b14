//! Service configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;

/// Origins allowed when `ALLOWED_ORIGINS` is unset.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Listeners ===
    /// API service port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Web service port.
    #[serde(default = "default_web_port")]
    pub web_port: u16,

    /// Bind address for both services.
    #[serde(default = "default_host")]
    pub host: String,

    // === CORS ===
    /// Comma-separated CORS allow-list.
    #[serde(default)]
    pub allowed_origins: Option<String>,

    // === Reporting ===
    /// Environment name reported by health checks.
    #[serde(default = "default_app_env")]
    pub app_env: String,

    /// Version reported by the web health check.
    #[serde(default = "default_app_version")]
    pub app_version: String,

    // === Request handling ===
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Key rate-limit buckets by the first `X-Forwarded-For` entry.
    #[serde(default)]
    pub trust_forwarded_for: bool,

    /// Apply the rate limiter to health routes as well.
    #[serde(default = "default_true")]
    pub rate_limit_health: bool,

    /// Seconds between sweeps of expired rate-limit records.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    // === Observability ===
    /// Expose Prometheus metrics on `/metrics`.
    #[serde(default)]
    pub metrics_enabled: bool,

    /// Log output format: "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_port() -> u16 {
    3001
}

fn default_web_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_body_limit() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            web_port: default_web_port(),
            host: default_host(),
            allowed_origins: None,
            app_env: default_app_env(),
            app_version: default_app_version(),
            body_limit_bytes: default_body_limit(),
            trust_forwarded_for: false,
            rate_limit_health: default_true(),
            sweep_interval_secs: default_sweep_interval(),
            metrics_enabled: false,
            log_format: default_log_format(),
            rust_log: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("PORT must be non-zero".to_string());
        }

        if self.web_port == 0 {
            return Err("WEB_PORT must be non-zero".to_string());
        }

        if self.body_limit_bytes == 0 {
            return Err("BODY_LIMIT_BYTES must be greater than 0".to_string());
        }

        if self.sweep_interval_secs == 0 {
            return Err("SWEEP_INTERVAL_SECS must be greater than 0".to_string());
        }

        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            return Err(format!(
                "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                self.log_format
            ));
        }

        for origin in self.cors_origins() {
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                return Err(format!("ALLOWED_ORIGINS entry '{}' must be an http(s) URL", origin));
            }
        }

        Ok(())
    }

    /// Parsed CORS allow-list, falling back to the localhost defaults.
    pub fn cors_origins(&self) -> Vec<String> {
        match &self.allowed_origins {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Sweeper period as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Check if JSON log output is requested.
    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }
}
