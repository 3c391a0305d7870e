//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use domain::HoldPolicy;
use engine::EngineConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset runs in memory
/// - `SEED_FILE`: JSON catalog and user directory loaded at startup
/// - `HOLD_POLICY`: `soft` or `hard` (default: `soft`)
/// - `MOTIVE_MIN_LENGTH`: minimum motive length (default: `10`)
/// - `COMMIT_ATTEMPTS`: validate-then-commit attempts (default: `3`)
///
/// Values that fail to parse fall back to their default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub hold_policy: HoldPolicy,
    pub motive_min_length: usize,
    pub commit_attempts: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: non_empty("DATABASE_URL"),
            seed_file: non_empty("SEED_FILE").map(PathBuf::from),
            hold_policy: non_empty("HOLD_POLICY")
                .and_then(|p| p.trim().to_ascii_lowercase().parse().ok())
                .unwrap_or(defaults.hold_policy),
            motive_min_length: non_empty("MOTIVE_MIN_LENGTH")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.motive_min_length),
            commit_attempts: non_empty("COMMIT_ATTEMPTS")
                .and_then(|p| p.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.commit_attempts),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_hold_policy(self.hold_policy)
            .with_min_motive_length(self.motive_min_length)
            .with_max_commit_attempts(self.commit_attempts)
    }
}

impl Default for Config {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            seed_file: None,
            hold_policy: engine.hold_policy,
            motive_min_length: engine.min_motive_length,
            commit_attempts: engine.max_commit_attempts,
        }
    }
}
