use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub scanner: ScannerConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Expiry scan schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Seconds between scan cycles (default: one hour)
    pub interval_secs: u64,
    /// Look-ahead window in days (default: 7)
    pub window_days: i64,
    /// Upper bound on a single store query
    pub query_timeout_secs: u64,
}

impl ScannerConfig {
    /// Longest look-ahead accepted for the scan window
    pub const MAX_WINDOW_DAYS: i64 = 365;

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Interval and query timeout must be non-zero; the window must lie in
    /// `1..=MAX_WINDOW_DAYS`.
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(AppError::Config(
                "EXPIRY_SCAN_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if !(1..=Self::MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(AppError::Config(format!(
                "EXPIRY_WINDOW_DAYS must be between 1 and {}, got {}",
                Self::MAX_WINDOW_DAYS,
                self.window_days
            )));
        }
        if self.query_timeout_secs == 0 {
            return Err(AppError::Config(
                "EXPIRY_QUERY_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            window_days: 7,
            query_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let scanner_defaults = ScannerConfig::default();

        let config = Config {
            app: AppConfig {
                env: env_or("APP_ENV", "development"),
                host: env_or("APP_HOST", "0.0.0.0"),
                port: parse_env("APP_PORT", 3000)?,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").map_err(|_| {
                    AppError::Config("DATABASE_URL environment variable not set".to_string())
                })?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 5)?,
                connect_timeout_secs: parse_env("DATABASE_CONNECT_TIMEOUT_SECS", 5)?,
            },
            scanner: ScannerConfig {
                interval_secs: parse_env("EXPIRY_SCAN_INTERVAL_SECS", scanner_defaults.interval_secs)?,
                window_days: parse_env("EXPIRY_WINDOW_DAYS", scanner_defaults.window_days)?,
                query_timeout_secs: parse_env(
                    "EXPIRY_QUERY_TIMEOUT_SECS",
                    scanner_defaults.query_timeout_secs,
                )?,
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(&env_or(
                    "CORS_ALLOWED_ORIGINS",
                    "http://localhost:3000,http://localhost:5000",
                )),
            },
        };

        config.scanner.validate()?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Missing variables fall back to `default`; present but malformed ones are an error.
fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("failed to parse {}={:?}", key, raw))),
        Err(_) => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
