//! Actor-owned console state.
//!
//! Every mutation of the run, status, connection and approval window goes
//! through [`ConsoleState`], which emits the matching event as it goes. The
//! actor and the drivers receive it by `&mut`; nothing else holds it.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use super::driver::DriverInput;
use super::schema::{
    ConnectionState, ConsoleView, ErrorEvent, EventRecord, LogEvent, RecordStatus, RuntimeEvent,
    RuntimeEventEnvelope, WarningEvent,
};
use crate::approval::{ApprovalSignal, ApprovalTimer, ApprovalTransition};
use crate::clock::Clock;
use crate::config::ConsoleMode;
use crate::run::{LogLine, Run, RunPatch, RunTracker, StartResult};
use crate::telemetry::{Recommendation, StatusPatch};
use crate::types::{Module, Outcome, Scalar};

/// Event-record kind used for every run.
pub(crate) const RECORD_KIND: &str = "Simulation";

pub(crate) struct ConsoleState {
    mode: ConsoleMode,
    context: String,
    clock: Arc<dyn Clock>,
    tracker: RunTracker,
    approval: ApprovalTimer,
    status: StatusPatch,
    connection: ConnectionState,
    record: Option<EventRecord>,
    recommendation: Option<Recommendation>,
    event_tx: mpsc::UnboundedSender<RuntimeEventEnvelope>,
    seq: u64,
    view: watch::Sender<ConsoleView>,
    /// Feed for driver-owned timers, streams and control-call completions.
    pub(crate) inputs: mpsc::UnboundedSender<DriverInput>,
}

pub(crate) struct ConsoleStateParts {
    pub(crate) mode: ConsoleMode,
    pub(crate) context: String,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) tracker: RunTracker,
    pub(crate) approval: ApprovalTimer,
    pub(crate) event_tx: mpsc::UnboundedSender<RuntimeEventEnvelope>,
    pub(crate) view: watch::Sender<ConsoleView>,
    pub(crate) inputs: mpsc::UnboundedSender<DriverInput>,
}

impl ConsoleState {
    pub(crate) fn new(parts: ConsoleStateParts) -> Self {
        Self {
            mode: parts.mode,
            context: parts.context,
            clock: parts.clock,
            tracker: parts.tracker,
            approval: parts.approval,
            status: StatusPatch::default(),
            connection: ConnectionState::Idle,
            record: None,
            recommendation: None,
            event_tx: parts.event_tx,
            seq: 0,
            view: parts.view,
            inputs: parts.inputs,
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn emit(&mut self, event: RuntimeEvent) {
        let _ = self
            .event_tx
            .send(RuntimeEventEnvelope::new(self.seq, event));
        self.seq = self.seq.saturating_add(1);
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        self.emit(RuntimeEvent::Warning(WarningEvent {
            message: message.into(),
        }));
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.emit(RuntimeEvent::Error(ErrorEvent {
            message: message.into(),
        }));
    }

    pub(crate) fn active_id(&self) -> Option<u64> {
        self.tracker.active_id()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.tracker.is_active()
    }

    pub(crate) fn active_run(&self) -> Option<&Run> {
        self.tracker.active_run()
    }

    // ---------------------------------------------------------------------
    // Run lifecycle
    // ---------------------------------------------------------------------

    /// Open a run and clear per-run state. `None` if one is already active.
    pub(crate) fn begin_run(&mut self, seed: Option<Scalar>) -> Option<u64> {
        let now = self.now();
        let context = self.context.clone();
        let StartResult::Started(id) = self.tracker.start(&context, seed, now) else {
            return None;
        };
        self.approval.reset();
        self.record = None;
        tracing::info!(run_id = id, mode = %self.mode, "run started");
        self.emit_run_changed();
        self.emit_approval_changed();
        Some(id)
    }

    /// Close the active run. A fallback reason applies only when no
    /// fail-silent reason was recorded earlier.
    pub(crate) fn finish_run(&mut self, outcome: Outcome, fallback_reason: Option<&str>) -> bool {
        let existing = self
            .tracker
            .active_run()
            .and_then(|run| run.fail_silent_reason.clone());
        let reason = existing.or_else(|| fallback_reason.map(str::to_string));
        self.close_run(outcome, reason)
    }

    /// Close the active run as Failure with `reason`, replacing any earlier one.
    pub(crate) fn fail_run(&mut self, reason: &str) -> bool {
        self.close_run(Outcome::Failure, Some(reason.to_string()))
    }

    fn close_run(&mut self, outcome: Outcome, reason: Option<String>) -> bool {
        if !self.tracker.is_active() {
            return false;
        }
        self.approval.close();
        let now = self.now();
        let patch = RunPatch {
            outcome: Some(outcome),
            fail_silent_reason: reason,
            ..RunPatch::default()
        };
        let Some(run) = self.tracker.end(patch, now) else {
            return false;
        };
        tracing::info!(
            run_id = run.id,
            outcome = %outcome,
            duration_sec = run.duration_sec,
            reason = run.fail_silent_reason.as_deref().unwrap_or(""),
            "run closed"
        );
        if let Some(record) = self.record.as_mut() {
            if record.status != RecordStatus::Resolved {
                record.status = RecordStatus::Resolved;
                let record = record.clone();
                self.emit(RuntimeEvent::EventRecord(record));
            }
        }
        self.emit(RuntimeEvent::RunChanged(run.summary()));
        self.emit_approval_changed();
        true
    }

    pub(crate) fn capture_telemetry(&mut self, ammo: Option<Scalar>, energy: Option<Scalar>) {
        let now = self.now();
        if self.tracker.capture_telemetry(ammo, energy, now) {
            self.emit_run_changed();
        }
    }

    fn emit_run_changed(&mut self) {
        if let Some(summary) = self.tracker.latest().map(Run::summary) {
            self.emit(RuntimeEvent::RunChanged(summary));
        }
    }

    // ---------------------------------------------------------------------
    // Logs and output
    // ---------------------------------------------------------------------

    /// Append to the global log (and the active run's log).
    pub(crate) fn log(&mut self, message: impl Into<String>) {
        let line = LogLine::new(self.now(), message);
        let run_id = self.tracker.active_id();
        self.tracker.append_log(line.clone());
        self.emit(RuntimeEvent::LogAppended(LogEvent { run_id, line }));
    }

    pub(crate) fn output(&mut self, message: impl Into<String>) {
        let line = LogLine::new(self.now(), message);
        self.emit(RuntimeEvent::Output(line));
    }

    /// Log and show to the operator.
    pub(crate) fn log_and_output(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.log(message.clone());
        self.output(message);
    }

    // ---------------------------------------------------------------------
    // Status, connection, record, recommendation
    // ---------------------------------------------------------------------

    pub(crate) fn apply_patch(&mut self, patch: StatusPatch) {
        if patch.is_empty() {
            return;
        }
        self.status.merge(&patch);
        self.emit(RuntimeEvent::StatusPatch(patch));
    }

    pub(crate) fn set_connection(&mut self, connection: ConnectionState) {
        if self.connection == connection {
            return;
        }
        self.connection = connection;
        self.emit(RuntimeEvent::ConnectionChanged(connection));
    }

    pub(crate) fn record(&self) -> Option<&EventRecord> {
        self.record.as_ref()
    }

    pub(crate) fn set_record(&mut self, record: EventRecord) {
        if self.record.as_ref() == Some(&record) {
            return;
        }
        self.record = Some(record.clone());
        self.emit(RuntimeEvent::EventRecord(record));
    }

    pub(crate) fn set_recommendation(&mut self, recommendation: Recommendation) {
        self.recommendation = Some(recommendation.clone());
        self.emit(RuntimeEvent::Recommendation(recommendation));
    }

    // ---------------------------------------------------------------------
    // Approval window
    // ---------------------------------------------------------------------

    pub(crate) fn approval_permitted(&self) -> bool {
        self.approval.is_permitted()
    }

    pub(crate) fn approval_window(&self) -> crate::approval::ApprovalWindow {
        self.approval.window()
    }

    pub(crate) fn schedule_approval_request(&mut self, delay: std::time::Duration) {
        self.approval.schedule_request(delay);
    }

    /// Open the approval window now. Only effective while a run is active.
    pub(crate) fn request_approval(&mut self) -> bool {
        if !self.tracker.is_active() {
            return false;
        }
        let now = self.now();
        if !self.approval.request(now) {
            return false;
        }
        self.on_approval_requested();
        true
    }

    /// Expire a pending request immediately.
    pub(crate) fn expire_approval(&mut self, reason: &str) -> bool {
        if !self.approval.expire_now() {
            return false;
        }
        self.on_approval_expired(reason);
        true
    }

    pub(crate) fn on_approval_signal(&mut self, signal: ApprovalSignal, reason: &str) {
        let now = self.now();
        match self.approval.on_signal(signal, now) {
            ApprovalTransition::Requested => self.on_approval_requested(),
            ApprovalTransition::Expired => self.on_approval_expired(reason),
            ApprovalTransition::None => {}
        }
    }

    /// Mark the window consumed and record the chosen module on the run.
    pub(crate) fn consume_approval(&mut self, module: Module) -> bool {
        if !self.approval.consume() {
            return false;
        }
        let now = self.now();
        self.tracker.set_approved_module(module, now);
        if let Some(mut record) = self.record.clone() {
            record.source = module.as_str().to_string();
            self.set_record(record);
        }
        tracing::info!(module = %module, "approval consumed");
        self.emit_approval_changed();
        self.emit_run_changed();
        true
    }

    fn on_approval_requested(&mut self) {
        let secs = self.approval.decision_window().as_secs();
        tracing::info!(window_secs = secs, "approval requested");
        self.log_and_output(format!(
            "Approval requested: choose a module within {secs}s ({})",
            module_choices()
        ));
        self.emit_approval_changed();
    }

    fn on_approval_expired(&mut self, reason: &str) {
        let now = self.now();
        self.tracker.set_fail_silent_reason(reason, now);
        tracing::warn!(reason, "approval window expired");
        self.log_and_output("Approval window expired: run is fail-silent");
        self.warn(format!("approval window expired ({reason})"));
        self.emit_approval_changed();
        self.emit_run_changed();
    }

    fn emit_approval_changed(&mut self) {
        let window = self.approval.window();
        self.emit(RuntimeEvent::ApprovalChanged(window));
    }

    /// Drop every pending approval timer and withdraw an open request.
    pub(crate) fn cancel_timers(&mut self) {
        self.approval.close();
    }

    // ---------------------------------------------------------------------
    // View
    // ---------------------------------------------------------------------

    pub(crate) fn publish_view(&self) {
        let view = ConsoleView {
            mode: self.mode,
            connection: self.connection,
            run: self.tracker.latest().map(Run::summary),
            run_active: self.tracker.is_active(),
            status: self.status.clone(),
            approval: self.approval.window(),
            approval_permitted: self.approval.is_permitted(),
            fail_silent: self.approval.is_expired(),
            recommendation: self.recommendation.clone(),
            record: self.record.clone(),
        };
        self.view.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

fn module_choices() -> String {
    Module::ALL
        .iter()
        .map(|module| module.as_str())
        .collect::<Vec<_>>()
        .join("/")
}
