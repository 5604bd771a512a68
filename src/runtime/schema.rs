//! Orchestrator command/event schema.
//!
//! This is the contract between the orchestrator actor and its frontends:
//! commands flow in through [`RuntimeCommand`], everything observable flows
//! out as [`RuntimeEventEnvelope`]s.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::approval::ApprovalWindow;
use crate::config::ConsoleMode;
use crate::run::{LogLine, RunSummary};
use crate::telemetry::{Recommendation, StatusPatch};
use crate::types::{Module, Scalar};

/// Commands accepted by the orchestrator actor.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCommand {
    Start { seed: Option<Scalar> },
    Approve { module: Module },
    /// Explicit end/abort of the active run.
    End,
    Health,
    Shutdown,
}

/// Operator operation named in a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Start,
    Approve,
    End,
    Health,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Approve => "approve",
            Self::End => "end",
            Self::Health => "health",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic envelope for orchestrator events.
///
/// `seq` is assigned by the actor; `ts_unix_ms` is wall-clock capture time.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuntimeEventEnvelope {
    pub seq: u64,
    pub ts_unix_ms: u64,
    pub event: RuntimeEvent,
}

impl RuntimeEventEnvelope {
    pub fn new(seq: u64, event: RuntimeEvent) -> Self {
        Self {
            seq,
            ts_unix_ms: now_unix_millis(),
            event,
        }
    }
}

/// Typed orchestrator event families.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum RuntimeEvent {
    Lifecycle(LifecycleEvent),
    /// Delta merged into the live status; absent fields are unchanged.
    StatusPatch(StatusPatch),
    RunChanged(RunSummary),
    LogAppended(LogEvent),
    /// Operator-facing output line (scenario steps, backend logs, call results).
    Output(LogLine),
    ConnectionChanged(ConnectionState),
    ApprovalChanged(ApprovalWindow),
    EventRecord(EventRecord),
    Recommendation(Recommendation),
    Rejected(RejectedEvent),
    Warning(WarningEvent),
    Error(ErrorEvent),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Started { mode: ConsoleMode },
    Stopped,
}

/// One appended log line and the run it was recorded into, if any.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LogEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u64>,
    pub line: LogLine,
}

/// Stream connection state as seen by the operator.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Error,
    Reconnecting { attempt: u32, delay_ms: u64 },
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
            Self::Reconnecting { .. } => "reconnecting",
        }
    }
}

/// Progress of the current run's event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordStatus {
    Detected,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Detected => "Detected",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        }
    }
}

/// Single row describing the current run for an event list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventRecord {
    pub id: u64,
    /// Run start; not moved by later updates.
    pub time: DateTime<Utc>,
    pub kind: String,
    pub level: String,
    pub status: RecordStatus,
    pub source: String,
}

/// Operation refused because of current state. Not an error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RejectedEvent {
    pub operation: Operation,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WarningEvent {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorEvent {
    pub message: String,
}

/// Read-only snapshot of orchestrator state.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ConsoleView {
    pub mode: ConsoleMode,
    pub connection: ConnectionState,
    /// Active run, else the most recently closed one.
    pub run: Option<RunSummary>,
    pub run_active: bool,
    pub status: StatusPatch,
    pub approval: ApprovalWindow,
    /// Core approval gate: a request is pending and unconsumed.
    pub approval_permitted: bool,
    /// The approval window lapsed without a decision.
    pub fail_silent: bool,
    pub recommendation: Option<Recommendation>,
    pub record: Option<EventRecord>,
}

fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
