//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`TAYKA_MODE`, `TAYKA_API_URL`, `TAYKA_WS_URL`,
//!    `TAYKA_WS_PATH`, `TAYKA_API_TIMEOUT_SECS`) with legacy `VITE_*` fallback.
//! 2. TOML file specified via --config CLI flag
//! 3. ./tayka.toml in the current directory
//! 4. $XDG_CONFIG_HOME/tayka/tayka.toml (or ~/.config/tayka/tayka.toml)
//! 5. Built-in defaults

mod defaults;
mod env;
mod loader;
mod resolve;
mod sources;
mod types;

pub use loader::{load_config, load_config_with_diagnostics};
pub use sources::{config_root_dir, default_global_config_path};
pub use types::{
    BackendConfig, Config, ConfigDiagnostics, ConsoleConfig, ConsoleMode, LoadedConfig, LogConfig,
    SimulationConfig, StreamConfig,
};

use types::FileConfig;

/// Commented default config file contents.
pub fn default_config_template() -> &'static str {
    defaults::DEFAULT_TAYKA_CONFIG_TEMPLATE
}
