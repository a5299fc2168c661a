//! Server configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/galley | Working directory (database, logs) |
//! | HTTP_PORT | 3000 | HTTP API port |
//! | LOCK_TTL_MS | 90000 | Editing-lock expiry |
//! | GATEWAY_TIMEOUT_MS | 15000 | Gateway call timeout |
//! | GATEWAY_STATUS_RETRIES | 3 | Status re-queries after a timeout |
//! | NUMBER_RANGE_SPAN | 500 | Check numbers reserved per grant |
//! | ENVIRONMENT | development | Deployment environment name |
//!
//! The lock TTL must cover a normal edit session while keeping an
//! abandoned check editable within a human-noticeable window; it is a
//! tuning knob, not a correctness one.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the database and logs
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Editing-lock time to live
    pub lock_ttl: Duration,
    /// Gateway call timeout
    pub gateway_timeout: Duration,
    /// Status re-queries after a gateway timeout
    pub gateway_status_retries: u32,
    /// Check numbers reserved per range grant
    pub number_range_span: u64,
    /// development | staging | production
    pub environment: String,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables, with defaults for
    /// anything unset
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/galley".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            lock_ttl: Duration::from_millis(env_parse("LOCK_TTL_MS", 90_000)),
            gateway_timeout: Duration::from_millis(env_parse("GATEWAY_TIMEOUT_MS", 15_000)),
            gateway_status_retries: env_parse("GATEWAY_STATUS_RETRIES", 3),
            number_range_span: env_parse("NUMBER_RANGE_SPAN", 500),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Path of the check store database
    pub fn db_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("checks.redb")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
