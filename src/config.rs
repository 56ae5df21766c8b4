//! Layered configuration for the queue/store/worker stack.
//!
//! Configuration can be loaded from:
//! 1. Built-in defaults.
//! 2. A TOML file (conventionally `taskrunner.toml`).
//! 3. Environment variables with the `TASKRUNNER_` prefix.
//!
//! Environment variables override the TOML file, which overrides
//! defaults (§6 "Configuration surface").

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TaskRunnerError;

/// Which backend a [`crate::queue::Queue`] or [`crate::store::ResultStore`]
/// is constructed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process backend.
    Memory,
    /// Redis-backed backend.
    Remote,
}

/// Resolved configuration for one deployment.
///
/// Construct via [`Config::load`] (file + env) or [`Config::default`]
/// (defaults only), then pass explicitly to component constructors --
/// there is no global mutable configuration singleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `QUEUE_TYPE`: which backend the queue uses.
    pub queue_type: BackendKind,

    /// `REDIS_URL`: remote queue endpoint. Required when `queue_type == Remote`.
    pub redis_url: Option<String>,

    /// `RESULT_STORE_TYPE`: which backend the result store uses.
    pub result_store_type: BackendKind,

    /// `RESULT_STORE_TTL`: seconds a result survives before reclamation.
    pub result_store_ttl_secs: u64,

    /// `RESULT_STORE_REDIS_URL`: remote result-store endpoint (may differ
    /// from the queue's).
    pub result_store_redis_url: Option<String>,

    /// `API_WORKERS`: worker-pool size.
    pub api_workers: usize,

    /// How long `Queue::pop` blocks before returning absent, in milliseconds.
    pub poll_timeout_ms: u64,

    /// Per-task handler execution deadline, in milliseconds. `None` means
    /// no deadline.
    pub execution_deadline_ms: Option<u64>,

    /// Max attempts for `ResultStore::put` with bounded exponential backoff.
    pub publish_max_attempts: u32,

    /// Initial backoff before the first retry, in milliseconds.
    pub publish_backoff_initial_ms: u64,

    /// Backoff cap, in milliseconds.
    pub publish_backoff_cap_ms: u64,

    /// How often the memory result store's reaper scans for expired
    /// records, in milliseconds.
    pub reaper_interval_ms: u64,

    /// Key prefix used by remote backends (`<prefix>:result:<id>`,
    /// `<prefix>:queue`).
    pub key_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_type: BackendKind::Memory,
            redis_url: None,
            result_store_type: BackendKind::Memory,
            result_store_ttl_secs: 3600,
            result_store_redis_url: None,
            api_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            poll_timeout_ms: 1000,
            execution_deadline_ms: None,
            publish_max_attempts: 5,
            publish_backoff_initial_ms: 100,
            publish_backoff_cap_ms: 5000,
            reaper_interval_ms: 60_000,
            key_prefix: "taskrunner".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration following the documented precedence: defaults,
    /// then `path` (if it exists), then environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TaskRunnerError> {
        let mut config = if let Ok(contents) = std::fs::read_to_string(path.as_ref()) {
            Self::from_toml(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parses configuration from TOML content, falling back to defaults
    /// for any field the file omits.
    pub fn from_toml(content: &str) -> Result<Self, TaskRunnerError> {
        toml::from_str(content).map_err(|e| TaskRunnerError::Config {
            reason: e.to_string(),
        })
    }

    /// Applies `TASKRUNNER_*` environment variable overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TASKRUNNER_QUEUE_TYPE") {
            if let Some(kind) = parse_backend_kind(&v) {
                self.queue_type = kind;
            }
        }
        if let Ok(v) = std::env::var("TASKRUNNER_REDIS_URL") {
            self.redis_url = Some(v);
        }
        if let Ok(v) = std::env::var("TASKRUNNER_RESULT_STORE_TYPE") {
            if let Some(kind) = parse_backend_kind(&v) {
                self.result_store_type = kind;
            }
        }
        if let Ok(v) = std::env::var("TASKRUNNER_RESULT_STORE_TTL") {
            if let Ok(n) = v.parse() {
                self.result_store_ttl_secs = n;
            }
        }
        if let Ok(v) = std::env::var("TASKRUNNER_RESULT_STORE_REDIS_URL") {
            self.result_store_redis_url = Some(v);
        }
        if let Ok(v) = std::env::var("TASKRUNNER_API_WORKERS") {
            if let Ok(n) = v.parse() {
                self.api_workers = n;
            }
        }
        if let Ok(v) = std::env::var("TASKRUNNER_POLL_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.poll_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("TASKRUNNER_EXECUTION_DEADLINE_MS") {
            self.execution_deadline_ms = v.parse().ok();
        }
    }
}

fn parse_backend_kind(s: &str) -> Option<BackendKind> {
    match s.to_ascii_lowercase().as_str() {
        "memory" => Some(BackendKind::Memory),
        "remote" => Some(BackendKind::Remote),
        _ => None,
    }
}
