//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Application configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the libSQL database file.
    pub db_path: PathBuf,
    /// Signed-in user whose records are loaded.
    pub user_id: String,
    /// Directory for the local key-value cache.
    pub cache_dir: PathBuf,
    /// Refresh and retry policy for remote collections.
    pub sync: SyncConfig,
}

/// Timing policy for remote fetches and realtime refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Attempts per fetch before giving up on a transport failure.
    pub fetch_attempts: u32,
    /// Fixed delay between fetch attempts.
    pub retry_delay: Duration,
    /// Unforced refreshes inside this window are skipped.
    pub refresh_window: Duration,
    /// Quiet period that coalesces bursts of change notifications.
    pub debounce: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_attempts: 3,
            retry_delay: Duration::from_millis(500),
            refresh_window: Duration::from_secs(30),
            debounce: Duration::from_millis(300),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/lifetracker.db"),
            user_id: "local".to_string(),
            cache_dir: PathBuf::from("./data/cache"),
            sync: SyncConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let db_path = std::env::var("LIFETRACKER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let user_id = std::env::var("LIFETRACKER_USER_ID")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.user_id);

        let cache_dir = std::env::var("LIFETRACKER_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let base = defaults.sync;
        let sync = SyncConfig {
            fetch_attempts: env_number("LIFETRACKER_FETCH_ATTEMPTS", base.fetch_attempts as u64)?
                .max(1) as u32,
            retry_delay: Duration::from_millis(env_number(
                "LIFETRACKER_RETRY_DELAY_MS",
                base.retry_delay.as_millis() as u64,
            )?),
            refresh_window: Duration::from_secs(env_number(
                "LIFETRACKER_REFRESH_WINDOW_SECS",
                base.refresh_window.as_secs(),
            )?),
            debounce: Duration::from_millis(env_number(
                "LIFETRACKER_DEBOUNCE_MS",
                base.debounce.as_millis() as u64,
            )?),
        };

        Ok(Self {
            db_path,
            user_id,
            cache_dir,
            sync,
        })
    }
}

/// Read a numeric variable. Unset means `default`; garbage is an error.
fn env_number(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_number(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?} is not a non-negative integer ({e})"),
        })
}
