//! Console orchestrator actor and schema facade.
//!
//! Command/event types live in `schema`. This module hosts the actor that
//! owns all console state, gates operator commands, and routes timer, stream
//! and control-call inputs to the mode's [`driver::RunDriver`].

use std::sync::Arc;
use tokio::sync::{mpsc, watch};

mod backend;
mod driver;
mod schema;
mod simulated;
mod state;

pub use schema::*;

use crate::api::{ControlApi, HttpControlApi};
use crate::approval::ApprovalTimer;
use crate::clock::{system_clock, Clock};
use crate::config::{Config, ConsoleMode};
use crate::error::ConfigError;
use crate::run::RunTracker;
use crate::scenario::{load_scenario, Scenario};
use crate::stream::{Transport, WsTransport};
use crate::types::{Module, Outcome, Scalar};
use backend::{BackendDriver, BACKEND_TIMEOUT_REASON};
use driver::{DriverInput, RunDriver};
use simulated::SimulatedDriver;
use state::{ConsoleState, ConsoleStateParts};

/// Fail-silent reason recorded when the simulated decision window lapses.
const SIMULATED_TIMEOUT_REASON: &str = "approval timeout";

/// Handle for sending commands to a spawned orchestrator.
#[derive(Clone)]
pub struct ConsoleHandle {
    pub commands: mpsc::Sender<RuntimeCommand>,
    view: watch::Receiver<ConsoleView>,
}

impl ConsoleHandle {
    /// Send one command to the orchestrator actor.
    pub async fn send(&self, command: RuntimeCommand) -> Result<(), String> {
        self.commands
            .send(command)
            .await
            .map_err(|_| "runtime command channel closed".to_string())
    }

    pub async fn start(&self, seed: Option<Scalar>) -> Result<(), String> {
        self.send(RuntimeCommand::Start { seed }).await
    }

    pub async fn approve(&self, module: Module) -> Result<(), String> {
        self.send(RuntimeCommand::Approve { module }).await
    }

    pub async fn end(&self) -> Result<(), String> {
        self.send(RuntimeCommand::End).await
    }

    pub async fn health(&self) -> Result<(), String> {
        self.send(RuntimeCommand::Health).await
    }

    pub async fn shutdown(&self) -> Result<(), String> {
        self.send(RuntimeCommand::Shutdown).await
    }

    /// Latest published snapshot.
    pub fn view(&self) -> ConsoleView {
        self.view.borrow().clone()
    }

    /// Independent receiver for snapshot changes.
    pub fn subscribe_view(&self) -> watch::Receiver<ConsoleView> {
        self.view.clone()
    }
}

/// Event stream receiver returned by [`spawn_orchestrator`].
pub type RuntimeEventStream = mpsc::UnboundedReceiver<RuntimeEventEnvelope>;

/// Collaborators the orchestrator talks to. Swapped out in tests.
pub struct OrchestratorDeps {
    pub clock: Arc<dyn Clock>,
    pub transport: Arc<dyn Transport>,
    pub api: Arc<dyn ControlApi>,
    pub scenario: Scenario,
}

impl OrchestratorDeps {
    /// Production collaborators for `config`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let scenario = match &config.simulation.scenario_file {
            Some(path) => load_scenario(path)?,
            None => Scenario::builtin(),
        };
        Ok(Self {
            clock: system_clock(),
            transport: Arc::new(WsTransport),
            api: Arc::new(HttpControlApi::new(&config.backend)),
            scenario,
        })
    }
}

/// Spawn an orchestrator with production collaborators.
pub fn spawn_orchestrator(
    config: &Config,
) -> Result<(ConsoleHandle, RuntimeEventStream), ConfigError> {
    let deps = OrchestratorDeps::from_config(config)?;
    Ok(spawn_orchestrator_with(config, deps))
}

/// Spawn an orchestrator around explicit collaborators.
pub fn spawn_orchestrator_with(
    config: &Config,
    deps: OrchestratorDeps,
) -> (ConsoleHandle, RuntimeEventStream) {
    let (command_tx, mut command_rx) = mpsc::channel::<RuntimeCommand>(64);
    let (event_tx, event_rx) = mpsc::unbounded_channel::<RuntimeEventEnvelope>();
    let (inputs_tx, mut inputs_rx) = mpsc::unbounded_channel::<DriverInput>();
    let (approval, mut approval_rx) = ApprovalTimer::new(config.simulation.approval_window());
    let mode = config.console.mode;
    let (view_tx, view_rx) = watch::channel(ConsoleView {
        mode,
        ..ConsoleView::default()
    });

    let state = ConsoleState::new(ConsoleStateParts {
        mode,
        context: config.console.context.clone(),
        clock: deps.clock,
        tracker: RunTracker::new(config.log.run_log_capacity, config.log.history_limit),
        approval,
        event_tx,
        view: view_tx,
        inputs: inputs_tx,
    });
    let (driver, timeout_reason): (Box<dyn RunDriver>, &'static str) = match mode {
        ConsoleMode::Simulated => (
            Box::new(SimulatedDriver::new(deps.scenario, &config.simulation)),
            SIMULATED_TIMEOUT_REASON,
        ),
        ConsoleMode::Backend => (
            Box::new(BackendDriver::new(
                deps.api,
                deps.transport,
                config.backend.stream_url(),
                config.stream.backoff_policy(),
            )),
            BACKEND_TIMEOUT_REASON,
        ),
    };

    tokio::spawn(async move {
        let mut actor = Orchestrator {
            state,
            driver,
            timeout_reason,
        };
        actor
            .state
            .emit(RuntimeEvent::Lifecycle(LifecycleEvent::Started { mode }));
        tracing::info!(mode = %mode, "orchestrator started");
        actor.driver.attach(&mut actor.state);
        actor.state.publish_view();

        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    let Some(command) = command else {
                        // Every handle is gone.
                        actor.stop().await;
                        break;
                    };
                    if actor.handle_command(command).await == Flow::Stop {
                        break;
                    }
                }
                Some(signal) = approval_rx.recv() => {
                    actor.state.on_approval_signal(signal, actor.timeout_reason);
                }
                Some(input) = inputs_rx.recv() => {
                    actor.driver.on_input(&mut actor.state, input);
                }
            }
            actor.state.publish_view();
        }
    });

    (
        ConsoleHandle {
            commands: command_tx,
            view: view_rx,
        },
        event_rx,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct Orchestrator {
    state: ConsoleState,
    driver: Box<dyn RunDriver>,
    timeout_reason: &'static str,
}

impl Orchestrator {
    async fn handle_command(&mut self, command: RuntimeCommand) -> Flow {
        match command {
            RuntimeCommand::Start { seed } => self.start(seed),
            RuntimeCommand::Approve { module } => self.approve(module),
            RuntimeCommand::End => self.end(),
            RuntimeCommand::Health => self.driver.on_health(&mut self.state),
            RuntimeCommand::Shutdown => {
                self.stop().await;
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn start(&mut self, seed: Option<Scalar>) {
        if self.state.is_active() {
            self.reject(Operation::Start, "a run is already active");
            return;
        }
        let Some(run_id) = self.state.begin_run(seed.clone()) else {
            self.reject(Operation::Start, "a run is already active");
            return;
        };
        self.driver.on_start(&mut self.state, run_id, seed);
    }

    fn approve(&mut self, module: Module) {
        if !self.state.is_active() {
            self.reject(Operation::Approve, "no active run");
            return;
        }
        if !self.state.approval_permitted() {
            let window = self.state.approval_window();
            let reason = if window.expired {
                "approval window expired (fail-silent)"
            } else if window.consumed {
                "approval already consumed"
            } else {
                "no approval requested"
            };
            self.reject(Operation::Approve, reason);
            return;
        }
        if self.state.consume_approval(module) {
            self.driver.on_approve(&mut self.state, module);
        }
    }

    fn end(&mut self) {
        let Some(run_id) = self.state.active_id() else {
            self.reject(Operation::End, "no active run");
            return;
        };
        self.driver.on_abort(&mut self.state, run_id);
        self.state.finish_run(Outcome::Failure, Some("Abort"));
    }

    async fn stop(&mut self) {
        self.driver.teardown(&mut self.state).await;
        self.state.cancel_timers();
        self.state
            .emit(RuntimeEvent::Lifecycle(LifecycleEvent::Stopped));
        self.state.publish_view();
        tracing::info!("orchestrator stopped");
    }

    fn reject(&mut self, operation: Operation, reason: &str) {
        tracing::warn!(operation = %operation, reason, "operation rejected");
        self.state.emit(RuntimeEvent::Rejected(RejectedEvent {
            operation,
            reason: reason.to_string(),
        }));
    }
}
