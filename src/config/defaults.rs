//! Default configuration constants and the bundled config template.
//!
//! Keeping defaults in one module lets types, tests and the template agree
//! without duplicating literals.

/// Embedded default `tayka.toml` template printed by `tayka --print-config`.
pub(super) const DEFAULT_TAYKA_CONFIG_TEMPLATE: &str = include_str!("../templates/tayka.toml");
/// Run context label used when none is configured.
pub(super) const DEFAULT_CONTEXT: &str = "Simulation";
/// Interval between scripted scenario steps.
pub(super) const DEFAULT_TICK_INTERVAL_MS: u64 = 1500;
/// Delay between a simulated start and the approval request.
pub(super) const DEFAULT_APPROVAL_REQUEST_DELAY_MS: u64 = 1200;
/// Approval decision window.
pub(super) const DEFAULT_APPROVAL_WINDOW_SECS: u64 = 15;
pub(super) const DEFAULT_START_PATH: &str = "/api/sim/start";
pub(super) const DEFAULT_APPROVE_PATH: &str = "/api/sim/approve";
pub(super) const DEFAULT_ABORT_PATH: &str = "/api/sim/abort";
pub(super) const DEFAULT_HEALTH_PATH: &str = "/health";
/// Timeout for backend control calls.
pub(super) const DEFAULT_API_TIMEOUT_SECS: u64 = 20;
/// Env var read for the bearer token when `auth_token_env` is unset.
pub(super) const DEFAULT_TOKEN_ENV: &str = "TAYKA_TOKEN";
pub(super) const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1000;
pub(super) const DEFAULT_MAX_BACKOFF_MS: u64 = 15_000;
