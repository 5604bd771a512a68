//! Run record data model.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::VecDeque;

use crate::types::{Module, Outcome, Scalar};

/// Default bound on per-run log lines.
pub const DEFAULT_RUN_LOG_CAPACITY: usize = 5000;

/// One appended log line. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub time: DateTime<Utc>,
    pub message: String,
}

impl LogLine {
    pub fn new(time: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            time,
            message: message.into(),
        }
    }
}

/// Append-only ring of the most recent log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBuffer {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::new(),
            capacity,
        }
    }

    /// Append a line, evicting the oldest when full.
    pub fn push(&mut self, line: LogLine) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn first(&self) -> Option<&LogLine> {
        self.lines.front()
    }

    pub fn last(&self) -> Option<&LogLine> {
        self.lines.back()
    }
}

impl Serialize for LogBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.lines.iter())
    }
}

/// One timed operation/simulation session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub id: u64,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<Scalar>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub outcome: Option<Outcome>,
    pub fail_silent_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_module: Option<Module>,
    pub ammo: Option<Scalar>,
    pub energy: Option<Scalar>,
    pub duration_sec: u64,
    pub logs: LogBuffer,
}

impl Run {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            id: self.id,
            context: self.context.clone(),
            seed: self.seed.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            outcome: self.outcome,
            fail_silent_reason: self.fail_silent_reason.clone(),
            approved_module: self.approved_module,
            ammo: self.ammo.clone(),
            energy: self.energy.clone(),
            duration_sec: self.duration_sec,
            log_count: self.logs.len(),
        }
    }
}

/// Run fields without the log buffer, for cheap view snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub id: u64,
    pub context: String,
    pub seed: Option<Scalar>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub outcome: Option<Outcome>,
    pub fail_silent_reason: Option<String>,
    pub approved_module: Option<Module>,
    pub ammo: Option<Scalar>,
    pub energy: Option<Scalar>,
    pub duration_sec: u64,
    pub log_count: usize,
}

/// Caller-supplied fields applied when a run closes.
///
/// `Some` fields overwrite the computed/accumulated values; `None` leaves them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunPatch {
    pub outcome: Option<Outcome>,
    pub fail_silent_reason: Option<String>,
    pub ammo: Option<Scalar>,
    pub energy: Option<Scalar>,
}
