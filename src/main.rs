//! CLI entry point for the tayka operator console.

mod cli;
mod cli_event_renderer;
mod console_input;

use clap::Parser;
use std::io::IsTerminal;
use tayka::config::{default_config_template, load_config_with_diagnostics, Config};
use tayka::render::{RenderSink, Renderer};
use tayka::runtime::{spawn_orchestrator, ConsoleHandle, RuntimeEventEnvelope, RuntimeEventStream};
use tayka::types::Scalar;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli_event_renderer::{process_runtime_events, render_view, RuntimeEventRenderContext};
use console_input::{parse_console_input, ConsoleInput, HELP_TEXT};

#[tokio::main]
async fn main() {
    init_tracing();
    let args = cli::Args::parse();

    if args.print_config {
        print!("{}", default_config_template());
        return;
    }

    let loaded = match load_config_with_diagnostics(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    let renderer = Renderer::new(!args.no_color && std::io::stderr().is_terminal());
    for warning in &loaded.diagnostics.deprecations {
        renderer.warn(warning);
    }

    let mut config = loaded.config;
    apply_cli_overrides(&mut config, &args);

    let (console, events) = match spawn_orchestrator(&config) {
        Ok(spawned) => spawned,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if let Some(seed) = &args.start {
        let seed = seed.as_deref().and_then(Scalar::parse);
        if let Err(e) = console.start(seed).await {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }

    let options = LoopOptions {
        json: args.json,
        verbose: args.verbose,
    };
    if let Err(e) = run_console_loop(&console, events, &renderer, options).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr; `TAYKA_LOG` takes `RUST_LOG`-style directives.
fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var("TAYKA_LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init();
}

fn apply_cli_overrides(config: &mut Config, args: &cli::Args) {
    if let Some(mode) = args.mode {
        config.console.mode = mode;
    }
    if let Some(url) = &args.api_url {
        config.backend.api_base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(url) = &args.ws_url {
        config.backend.ws_url = url.trim().to_string();
    }
    if let Some(context) = &args.context {
        let context = context.trim();
        if !context.is_empty() {
            config.console.context = context.to_string();
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LoopOptions {
    json: bool,
    verbose: bool,
}

async fn run_console_loop(
    console: &ConsoleHandle,
    mut events: RuntimeEventStream,
    renderer: &Renderer,
    options: LoopOptions,
) -> Result<(), String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut announced_run = None;
    let mut pending: Vec<RuntimeEventEnvelope> = Vec::new();

    if !options.json {
        renderer.activity(HELP_TEXT);
    }

    loop {
        tokio::select! {
            envelope = events.recv() => {
                // Closed after the orchestrator stops.
                let Some(envelope) = envelope else { break };
                pending.push(envelope);
                while let Ok(more) = events.try_recv() {
                    pending.push(more);
                }
                if options.json {
                    print_json_events(&mut pending);
                } else {
                    let mut ctx = RuntimeEventRenderContext {
                        renderer,
                        verbose: options.verbose,
                        announced_run: &mut announced_run,
                    };
                    process_runtime_events(&mut pending, &mut ctx);
                }
            }
            line = lines.next_line(), if stdin_open => {
                let quit = match line {
                    Ok(Some(line)) => handle_input_line(console, renderer, &line).await?,
                    Ok(None) => true,
                    Err(e) => {
                        renderer.error(&format!("stdin: {e}"));
                        true
                    }
                };
                if quit {
                    stdin_open = false;
                    console.shutdown().await?;
                } else if !options.json {
                    renderer.prompt();
                }
            }
        }
    }
    Ok(())
}

/// Returns `true` when the operator asked to quit.
async fn handle_input_line(
    console: &ConsoleHandle,
    renderer: &Renderer,
    line: &str,
) -> Result<bool, String> {
    let input = match parse_console_input(line) {
        Ok(input) => input,
        Err(message) => {
            renderer.warn(&message);
            return Ok(false);
        }
    };
    match input {
        ConsoleInput::Empty => {}
        ConsoleInput::Start(seed) => console.start(seed).await?,
        ConsoleInput::Approve(module) => console.approve(module).await?,
        ConsoleInput::End => console.end().await?,
        ConsoleInput::Health => console.health().await?,
        ConsoleInput::Status => render_view(renderer, &console.view()),
        ConsoleInput::Help => renderer.activity(HELP_TEXT),
        ConsoleInput::Quit => return Ok(true),
    }
    Ok(false)
}

fn print_json_events(pending: &mut Vec<RuntimeEventEnvelope>) {
    for envelope in pending.drain(..) {
        match serde_json::to_string(&envelope) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, seq = envelope.seq, "event serialization failed"),
        }
    }
}
