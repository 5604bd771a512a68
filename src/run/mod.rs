//! Run tracker: the current run, its bounded log, and recent history.
//!
//! At most one run is active at a time. Starting while one is active returns
//! the existing id; ending with nothing active does nothing. Closed runs stay
//! in history (newest first) and are never deleted except by the history cap.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

mod types;

pub use types::{LogBuffer, LogLine, Run, RunPatch, RunSummary, DEFAULT_RUN_LOG_CAPACITY};

use crate::types::{Module, Scalar};

/// Default number of runs kept in history.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Result of [`RunTracker::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartResult {
    Started(u64),
    AlreadyActive(u64),
}

impl StartResult {
    pub fn run_id(self) -> u64 {
        match self {
            Self::Started(id) | Self::AlreadyActive(id) => id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunTracker {
    history: VecDeque<Run>,
    active: Option<u64>,
    last_id: u64,
    log_capacity: usize,
    history_limit: usize,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new(DEFAULT_RUN_LOG_CAPACITY, DEFAULT_HISTORY_LIMIT)
    }
}

impl RunTracker {
    pub fn new(log_capacity: usize, history_limit: usize) -> Self {
        Self {
            history: VecDeque::new(),
            active: None,
            last_id: 0,
            log_capacity: log_capacity.max(1),
            history_limit: history_limit.max(1),
        }
    }

    /// Open a run unless one is already active.
    pub fn start(&mut self, context: &str, seed: Option<Scalar>, now: DateTime<Utc>) -> StartResult {
        if let Some(id) = self.active {
            return StartResult::AlreadyActive(id);
        }
        // Ids are creation timestamps, bumped to stay strictly increasing.
        let now_ms = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = now_ms.max(self.last_id.saturating_add(1));
        self.last_id = id;

        self.history.push_front(Run {
            id,
            context: context.to_string(),
            seed,
            started_at: now,
            ended_at: None,
            updated_at: now,
            outcome: None,
            fail_silent_reason: None,
            approved_module: None,
            ammo: None,
            energy: None,
            duration_sec: 0,
            logs: LogBuffer::with_capacity(self.log_capacity),
        });
        self.history.truncate(self.history_limit);
        self.active = Some(id);
        StartResult::Started(id)
    }

    /// Close the active run. Returns the closed snapshot, or `None` if idle.
    pub fn end(&mut self, patch: RunPatch, now: DateTime<Utc>) -> Option<Run> {
        let id = self.active.take()?;
        let run = self.history.iter_mut().find(|run| run.id == id)?;

        let elapsed_ms = now.signed_duration_since(run.started_at).num_milliseconds();
        if elapsed_ms >= 0 {
            run.duration_sec = (elapsed_ms as f64 / 1000.0).round() as u64;
        }
        if let Some(outcome) = patch.outcome {
            run.outcome = Some(outcome);
        }
        if let Some(reason) = patch.fail_silent_reason {
            run.fail_silent_reason = Some(reason);
        }
        if let Some(ammo) = patch.ammo {
            run.ammo = Some(ammo);
        }
        if let Some(energy) = patch.energy {
            run.energy = Some(energy);
        }
        run.ended_at = Some(now);
        run.updated_at = now;
        Some(run.clone())
    }

    /// Append a line; archived into the active run when there is one.
    pub fn append_log(&mut self, line: LogLine) -> bool {
        let time = line.time;
        match self.active_run_mut() {
            Some(run) => {
                run.logs.push(line);
                run.updated_at = time;
                true
            }
            None => false,
        }
    }

    pub fn set_fail_silent_reason(&mut self, reason: &str, now: DateTime<Utc>) -> bool {
        let Some(run) = self.active_run_mut() else {
            return false;
        };
        if run.fail_silent_reason.is_some() {
            return false;
        }
        run.fail_silent_reason = Some(reason.to_string());
        run.updated_at = now;
        true
    }

    pub fn set_approved_module(&mut self, module: Module, now: DateTime<Utc>) -> bool {
        let Some(run) = self.active_run_mut() else {
            return false;
        };
        run.approved_module = Some(module);
        run.updated_at = now;
        true
    }

    /// Record telemetry carried by backend events on the active run.
    pub fn capture_telemetry(
        &mut self,
        ammo: Option<Scalar>,
        energy: Option<Scalar>,
        now: DateTime<Utc>,
    ) -> bool {
        if ammo.is_none() && energy.is_none() {
            return false;
        }
        let Some(run) = self.active_run_mut() else {
            return false;
        };
        if ammo.is_some() {
            run.ammo = ammo;
        }
        if energy.is_some() {
            run.energy = energy;
        }
        run.updated_at = now;
        true
    }

    pub fn active_id(&self) -> Option<u64> {
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_run(&self) -> Option<&Run> {
        let id = self.active?;
        self.history.iter().find(|run| run.id == id)
    }

    /// Most recently started run, active or not.
    pub fn latest(&self) -> Option<&Run> {
        self.history.front()
    }

    /// Runs newest first.
    pub fn history(&self) -> impl Iterator<Item = &Run> {
        self.history.iter()
    }

    fn active_run_mut(&mut self) -> Option<&mut Run> {
        let id = self.active?;
        self.history.iter_mut().find(|run| run.id == id)
    }
}
