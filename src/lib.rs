//! Tayka: control-plane core for a defense-simulation operator console.
//!
//! The crate tracks timed runs, parses backend telemetry into a live status,
//! keeps a reconnecting event stream alive, enforces a time-bounded approval
//! window, and ties it together in an orchestrator that runs either against a
//! scripted scenario or a live backend.
//!
//! # Quick start
//!
//! ```no_run
//! use tayka::config::load_config;
//! use tayka::runtime::spawn_orchestrator;
//! use tayka::types::Module;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config(None)?;
//! let (console, mut events) = spawn_orchestrator(&config)?;
//! console.start(None).await?;
//! console.approve(Module::Boran).await?;
//! while let Some(envelope) = events.recv().await {
//!     println!("{:?}", envelope.event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod approval;
pub mod clock;
pub mod config;
pub mod error;
pub mod render;
pub mod run;
pub mod runtime;
pub mod scenario;
pub mod stream;
pub mod telemetry;
#[cfg(test)]
pub mod testsupport;
pub mod timers;
pub mod types;
