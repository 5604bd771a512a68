//! Mode-specific run driving.
//!
//! The actor owns the gates (one active run, approval permitted, run active
//! for end) and the generic state changes. A [`RunDriver`] adds what differs
//! between the scripted simulation and a live backend.

use async_trait::async_trait;
use std::future::Future;
use tokio::sync::mpsc;

use super::state::ConsoleState;
use crate::api::ControlAck;
use crate::error::ApiError;
use crate::stream::StreamEvent;
use crate::types::{Module, Scalar};

/// Control call whose completion is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlOp {
    Start,
    Approve(Module),
    Abort,
    Health,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ControlReply {
    pub(crate) op: ControlOp,
    /// Run that was active when the call was issued.
    pub(crate) run_id: Option<u64>,
    pub(crate) result: Result<ControlAck, String>,
}

/// Everything a driver's timers, stream and background calls feed back.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DriverInput {
    Tick { run_id: u64 },
    Stream(StreamEvent),
    Control(ControlReply),
}

#[async_trait]
pub(crate) trait RunDriver: Send {
    /// Called once before the first command.
    fn attach(&mut self, _state: &mut ConsoleState) {}

    /// A run was just opened by an operator start.
    fn on_start(&mut self, state: &mut ConsoleState, run_id: u64, seed: Option<Scalar>);

    /// The approval window was just consumed for `module`.
    fn on_approve(&mut self, state: &mut ConsoleState, module: Module);

    /// The operator ended the run; called before it is closed.
    fn on_abort(&mut self, state: &mut ConsoleState, run_id: u64);

    fn on_health(&mut self, state: &mut ConsoleState);

    fn on_input(&mut self, state: &mut ConsoleState, input: DriverInput);

    /// Release timers and connections. No callback may fire afterwards.
    async fn teardown(&mut self, state: &mut ConsoleState);
}

/// Run a control call in the background and report its result as input.
pub(crate) fn spawn_control_call<F>(
    inputs: &mpsc::UnboundedSender<DriverInput>,
    op: ControlOp,
    run_id: Option<u64>,
    call: F,
) where
    F: Future<Output = Result<ControlAck, ApiError>> + Send + 'static,
{
    let inputs = inputs.clone();
    tokio::spawn(async move {
        let result = call.await.map_err(|err| {
            tracing::error!(op = ?op, error = %err, "control call failed");
            err.operator_message()
        });
        let _ = inputs.send(DriverInput::Control(ControlReply { op, run_id, result }));
    });
}
