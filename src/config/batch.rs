//! Batch scheduler configuration structures.
//!
//! Configuration comes either from JSON or from `BATCH_*` environment
//! variables (optionally loaded from a `.env` file):
//!
//! | variable                        | meaning                                   |
//! |---------------------------------|-------------------------------------------|
//! | `BATCH_CAPACITY`                | `one`, `unbounded` or a slot count        |
//! | `BATCH_JOB_TIMEOUT_SECS`        | per-job timeout                           |
//! | `BATCH_MAX_JOBS_PER_USER`       | per-user queue depth                      |
//! | `BATCH_DISCOVERY_INTERVAL_SECS` | periodic discovery; unset disables it     |
//! | `BATCH_PUBLISHER_BUFFER`        | events buffered per subscriber            |
//! | `BATCH_QUEUE_PATH`              | file-backed queue directory               |
//! | `BATCH_STORE_PATH`              | file-backed job store directory           |

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Capacity strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapacityConfig {
    /// One dispatch at a time across all users.
    One,
    /// No limit on concurrent dispatches.
    Unbounded,
    /// Constant number of slots.
    Fixed {
        /// Slot count.
        slots: u32,
    },
}

impl FromStr for CapacityConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one" => Ok(Self::One),
            "unbounded" | "infinity" => Ok(Self::Unbounded),
            other => other
                .parse::<u32>()
                .map(|slots| Self::Fixed { slots })
                .map_err(|_| format!("unknown capacity `{s}`")),
        }
    }
}

/// Queue backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueBackendConfig {
    /// In-memory queue for development/testing.
    InMemory,
    /// File-backed queue (Yaque-style JSON lines).
    File {
        /// Directory holding the queue file.
        path: PathBuf,
    },
}

/// Job store backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// In-memory store.
    InMemory,
    /// File-backed store.
    File {
        /// Directory holding the store file.
        path: PathBuf,
    },
}

/// Root batch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Capacity strategy.
    pub capacity: CapacityConfig,
    /// Per-job timeout in seconds.
    pub job_timeout_secs: u64,
    /// Maximum queued jobs per user before rejection.
    pub max_jobs_per_user: usize,
    /// Period of background discovery; `None` disables it.
    pub discovery_interval_secs: Option<u64>,
    /// Events buffered per subscriber before it lags.
    pub publisher_buffer: usize,
    /// Queue backend.
    pub queue: QueueBackendConfig,
    /// Job store backend.
    pub store: StoreBackendConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            capacity: CapacityConfig::One,
            job_timeout_secs: 7200,
            max_jobs_per_user: 64,
            discovery_interval_secs: None,
            publisher_buffer: 256,
            queue: QueueBackendConfig::InMemory,
            store: StoreBackendConfig::InMemory,
        }
    }
}

impl BatchConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.job_timeout_secs == 0 {
            return Err("job_timeout_secs must be greater than 0".into());
        }
        if self.max_jobs_per_user == 0 {
            return Err("max_jobs_per_user must be greater than 0".into());
        }
        if self.discovery_interval_secs == Some(0) {
            return Err("discovery_interval_secs must be greater than 0 when set".into());
        }
        if self.publisher_buffer == 0 {
            return Err("publisher_buffer must be greater than 0".into());
        }
        if let QueueBackendConfig::File { path } = &self.queue {
            if path.as_os_str().is_empty() {
                return Err("queue path must not be empty".into());
            }
        }
        if let StoreBackendConfig::File { path } = &self.store {
            if path.as_os_str().is_empty() {
                return Err("store path must not be empty".into());
            }
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `.env` if present, then read `BATCH_*` variables over the
    /// defaults.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `BATCH_*` settings through `lookup` over the defaults and
    /// validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(raw) = lookup("BATCH_CAPACITY") {
            cfg.capacity = raw.parse()?;
        }
        if let Some(raw) = lookup("BATCH_JOB_TIMEOUT_SECS") {
            cfg.job_timeout_secs = parse_var("BATCH_JOB_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("BATCH_MAX_JOBS_PER_USER") {
            cfg.max_jobs_per_user = parse_var("BATCH_MAX_JOBS_PER_USER", &raw)?;
        }
        if let Some(raw) = lookup("BATCH_DISCOVERY_INTERVAL_SECS") {
            cfg.discovery_interval_secs = Some(parse_var("BATCH_DISCOVERY_INTERVAL_SECS", &raw)?);
        }
        if let Some(raw) = lookup("BATCH_PUBLISHER_BUFFER") {
            cfg.publisher_buffer = parse_var("BATCH_PUBLISHER_BUFFER", &raw)?;
        }
        if let Some(path) = lookup("BATCH_QUEUE_PATH") {
            cfg.queue = QueueBackendConfig::File { path: path.into() };
        }
        if let Some(path) = lookup("BATCH_STORE_PATH") {
            cfg.store = StoreBackendConfig::File { path: path.into() };
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("{key}: cannot parse `{raw}`"))
}
