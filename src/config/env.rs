//! Environment override and legacy env-alias handling.
//!
//! Canonical `TAYKA_*` variables take precedence. Legacy `VITE_*` names from
//! the web console deployment are accepted and surfaced via diagnostics.

use crate::error::ConfigError;

use super::defaults::DEFAULT_TOKEN_ENV;
use super::{BackendConfig, Config, ConfigDiagnostics, ConsoleMode};

/// Canonical/legacy env pairs.
const LEGACY_ENV_ALIASES: &[(&str, &str)] = &[
    ("TAYKA_MODE", "VITE_SIM_MODE"),
    ("TAYKA_API_URL", "VITE_API_URL"),
    ("TAYKA_WS_URL", "VITE_WS_URL"),
    ("TAYKA_WS_PATH", "VITE_WS_PATH"),
];

pub(super) fn apply_runtime_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(mode) = env_with_legacy(env_lookup, "TAYKA_MODE", "VITE_SIM_MODE") {
        config.console.mode = mode
            .parse::<ConsoleMode>()
            .map_err(|e| ConfigError::Invalid(format!("TAYKA_MODE: {e}")))?;
    }
    if let Some(url) = env_with_legacy(env_lookup, "TAYKA_API_URL", "VITE_API_URL") {
        config.backend.api_base_url = url;
    }
    if let Some(url) = env_with_legacy(env_lookup, "TAYKA_WS_URL", "VITE_WS_URL") {
        config.backend.ws_url = url;
    }
    if let Some(path) = env_with_legacy(env_lookup, "TAYKA_WS_PATH", "VITE_WS_PATH") {
        config.backend.ws_path = path;
    }
    if let Some(timeout) = env_lookup("TAYKA_API_TIMEOUT_SECS") {
        // Clamp to at least 1 second to avoid "no-timeout" accidental behavior.
        let parsed = timeout.trim().parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid TAYKA_API_TIMEOUT_SECS value `{timeout}`: expected positive integer seconds"
            ))
        })?;
        config.backend.timeout_secs = parsed.max(1);
    }
    Ok(())
}

/// Inline token wins; otherwise read the configured (or default) token env var.
pub(super) fn resolve_auth_token<FEnv>(backend: &mut BackendConfig, env_lookup: &FEnv)
where
    FEnv: Fn(&str) -> Option<String>,
{
    let inline = backend
        .auth_token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if inline.is_some() {
        return;
    }
    let env_name = backend
        .auth_token_env
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_TOKEN_ENV);
    backend.auth_token = env_lookup(env_name)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());
}

/// Resolve a value from canonical env var or, if absent, its legacy alias.
pub(super) fn env_with_legacy<FEnv>(
    env_lookup: &FEnv,
    canonical: &str,
    legacy: &str,
) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(canonical).or_else(|| env_lookup(legacy))
}

/// Record diagnostics for legacy env alias usage when canonical vars are absent.
pub(super) fn collect_legacy_env_warnings<FEnv>(
    diagnostics: &mut ConfigDiagnostics,
    env_lookup: &FEnv,
) where
    FEnv: Fn(&str) -> Option<String>,
{
    for (canonical, legacy) in LEGACY_ENV_ALIASES {
        if env_lookup(canonical).is_none() && env_lookup(legacy).is_some() {
            diagnostics.deprecations.push(format!(
                "Detected legacy env var `{legacy}`. Use {canonical} instead."
            ));
        }
    }
}

/// Sort and deduplicate diagnostic strings for stable output.
pub(super) fn dedupe_diagnostics(diagnostics: &mut ConfigDiagnostics) {
    diagnostics.deprecations.sort();
    diagnostics.deprecations.dedup();
}
