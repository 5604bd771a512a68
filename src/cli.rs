//! CLI argument parsing via clap.

use clap::Parser;
use tayka::config::ConsoleMode;

/// Operator console for the Tayka defense simulation.
#[derive(Debug, Parser)]
#[command(name = "tayka", version)]
pub struct Args {
    /// Path to config file (default: ./tayka.toml or ~/.config/tayka/tayka.toml).
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Console mode: `simulated` (scripted scenario) or `backend`.
    #[arg(long = "mode")]
    pub mode: Option<ConsoleMode>,

    /// Override the backend HTTP base URL.
    #[arg(long = "api-url")]
    pub api_url: Option<String>,

    /// Override the backend event-stream URL.
    #[arg(long = "ws-url")]
    pub ws_url: Option<String>,

    /// Context label recorded on every run.
    #[arg(long = "context")]
    pub context: Option<String>,

    /// Start a run immediately, optionally with a seed.
    #[arg(long = "start", num_args = 0..=1, value_name = "SEED")]
    pub start: Option<Option<String>>,

    /// Also show connection chatter and event-record updates.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Print runtime events as JSON lines instead of rendering them.
    #[arg(long = "json")]
    pub json: bool,

    /// Disable color output.
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Print the default config template and exit.
    #[arg(long = "print-config")]
    pub print_config: bool,
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;
    use tayka::config::ConsoleMode;

    #[test]
    fn mode_accepts_aliases() {
        let args = Args::parse_from(["tayka", "--mode", "backend"]);
        assert_eq!(args.mode, Some(ConsoleMode::Backend));
        let args = Args::parse_from(["tayka", "--mode", "sim"]);
        assert_eq!(args.mode, Some(ConsoleMode::Simulated));
        assert!(Args::try_parse_from(["tayka", "--mode", "live"]).is_err());
    }

    #[test]
    fn start_without_seed_is_distinguished_from_absent() {
        let args = Args::parse_from(["tayka", "--start"]);
        assert_eq!(args.start, Some(None));
        let args = Args::parse_from(["tayka", "--start", "42"]);
        assert_eq!(args.start, Some(Some("42".to_string())));
        let args = Args::parse_from(["tayka"]);
        assert_eq!(args.start, None);
    }

    #[test]
    fn overrides_parse_together() {
        let args = Args::parse_from([
            "tayka",
            "-c",
            "/tmp/t.toml",
            "--api-url",
            "http://localhost:8080",
            "--ws-url",
            "ws://localhost:8080/ws",
            "--json",
            "--no-color",
        ]);
        assert_eq!(args.config.as_deref(), Some("/tmp/t.toml"));
        assert_eq!(args.api_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(args.ws_url.as_deref(), Some("ws://localhost:8080/ws"));
        assert!(args.json && args.no_color);
    }
}
