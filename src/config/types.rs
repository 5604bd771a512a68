//! Configuration data model.
//!
//! Struct/enum definitions plus default values. Parsing, precedence and
//! validation live in the sibling loader modules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::defaults::{
    DEFAULT_ABORT_PATH, DEFAULT_API_TIMEOUT_SECS, DEFAULT_APPROVAL_REQUEST_DELAY_MS,
    DEFAULT_APPROVAL_WINDOW_SECS, DEFAULT_APPROVE_PATH, DEFAULT_CONTEXT, DEFAULT_HEALTH_PATH,
    DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS, DEFAULT_START_PATH,
    DEFAULT_TICK_INTERVAL_MS,
};
use crate::run::{DEFAULT_HISTORY_LIMIT, DEFAULT_RUN_LOG_CAPACITY};
use crate::stream::BackoffPolicy;

/// Which driver an orchestrator runs. Fixed for the orchestrator's lifetime.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleMode {
    #[default]
    Simulated,
    Backend,
}

impl ConsoleMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::Backend => "backend",
        }
    }
}

impl fmt::Display for ConsoleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsoleMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulated" | "simulation" | "sim" | "fake" => Ok(Self::Simulated),
            "backend" => Ok(Self::Backend),
            other => Err(format!(
                "unknown console mode `{other}` (expected `simulated` or `backend`)"
            )),
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub console: ConsoleConfig,
    pub simulation: SimulationConfig,
    pub backend: BackendConfig,
    pub stream: StreamConfig,
    pub log: LogConfig,
}

/// Resolved `[console]` settings.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub mode: ConsoleMode,
    /// Label stored on every run.
    pub context: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            mode: ConsoleMode::Simulated,
            context: DEFAULT_CONTEXT.to_string(),
        }
    }
}

/// Simulated-mode pacing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub tick_interval_ms: u64,
    pub approval_request_delay_ms: u64,
    pub approval_window_secs: u64,
    /// JSON scenario file; the built-in scenario is used when unset.
    pub scenario_file: Option<PathBuf>,
}

impl SimulationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn approval_request_delay(&self) -> Duration {
        Duration::from_millis(self.approval_request_delay_ms)
    }

    pub fn approval_window(&self) -> Duration {
        Duration::from_secs(self.approval_window_secs)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            approval_request_delay_ms: DEFAULT_APPROVAL_REQUEST_DELAY_MS,
            approval_window_secs: DEFAULT_APPROVAL_WINDOW_SECS,
            scenario_file: None,
        }
    }
}

/// Backend endpoints and credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    #[serde(alias = "base_url")]
    pub api_base_url: String,
    pub ws_url: String,
    /// Non-empty replaces the stream URL path.
    pub ws_path: String,
    pub start_path: String,
    pub approve_path: String,
    pub abort_path: String,
    pub health_path: String,
    pub timeout_secs: u64,
    pub auth_token: Option<String>,
    /// Env var holding the bearer token; defaults to `TAYKA_TOKEN`.
    pub auth_token_env: Option<String>,
}

impl BackendConfig {
    /// Stream URL from `ws_url`/`api_base_url`/`ws_path`, if derivable.
    pub fn stream_url(&self) -> Option<String> {
        crate::stream::resolve_stream_url(&self.ws_url, &self.api_base_url, &self.ws_path)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            ws_url: String::new(),
            ws_path: String::new(),
            start_path: DEFAULT_START_PATH.to_string(),
            approve_path: DEFAULT_APPROVE_PATH.to_string(),
            abort_path: DEFAULT_ABORT_PATH.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            auth_token: None,
            auth_token_env: None,
        }
    }
}

/// Reconnect backoff bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl StreamConfig {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial: Duration::from_millis(self.initial_backoff_ms),
            max: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

/// Retention bounds for run logs and history.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub run_log_capacity: usize,
    pub history_limit: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            run_log_capacity: DEFAULT_RUN_LOG_CAPACITY,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Compatibility diagnostics emitted while loading config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    /// Deprecation warnings users should act on.
    pub deprecations: Vec<String>,
}

/// Loaded config plus diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub diagnostics: ConfigDiagnostics,
}

/// `[console]` as written in the file; the mode string is validated during
/// resolution so a typo reports a readable error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileConsoleSection {
    pub(super) mode: Option<String>,
    pub(super) context: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileConfig {
    pub(super) console: FileConsoleSection,
    pub(super) simulation: SimulationConfig,
    pub(super) backend: BackendConfig,
    pub(super) stream: StreamConfig,
    pub(super) log: LogConfig,
}
