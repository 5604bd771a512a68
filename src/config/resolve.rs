//! File-config resolution and validation.

use crate::error::ConfigError;

use super::defaults::DEFAULT_CONTEXT;
use super::{Config, ConsoleConfig, ConsoleMode, FileConfig};

pub(super) fn resolve_config_from_file_config(parsed: FileConfig) -> Result<Config, ConfigError> {
    let mode = match normalized_option(&parsed.console.mode) {
        Some(raw) => raw
            .parse::<ConsoleMode>()
            .map_err(|e| ConfigError::Invalid(format!("console.mode: {e}")))?,
        None => ConsoleMode::default(),
    };
    let context =
        normalized_option(&parsed.console.context).unwrap_or_else(|| DEFAULT_CONTEXT.to_string());

    Ok(Config {
        console: ConsoleConfig { mode, context },
        simulation: parsed.simulation,
        backend: parsed.backend,
        stream: parsed.stream,
        log: parsed.log,
    })
}

/// Reject values that would stall timers or disable bounded buffers.
pub(super) fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.simulation.tick_interval_ms == 0 {
        return Err(invalid("simulation.tick_interval_ms must be at least 1"));
    }
    if config.simulation.approval_window_secs == 0 {
        return Err(invalid("simulation.approval_window_secs must be at least 1"));
    }
    if config.stream.initial_backoff_ms == 0 {
        return Err(invalid("stream.initial_backoff_ms must be at least 1"));
    }
    if config.stream.max_backoff_ms < config.stream.initial_backoff_ms {
        return Err(invalid(
            "stream.max_backoff_ms must not be smaller than stream.initial_backoff_ms",
        ));
    }
    if config.log.run_log_capacity == 0 {
        return Err(invalid("log.run_log_capacity must be at least 1"));
    }
    if config.log.history_limit == 0 {
        return Err(invalid("log.history_limit must be at least 1"));
    }
    Ok(())
}

/// Trimmed non-empty string, else `None`.
pub(super) fn normalized_option(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
