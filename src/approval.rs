//! Approval decision window.
//!
//! `Idle -> Requested -> {Consumed | Expired}`. The terminal states stick until
//! [`ApprovalTimer::reset`] at the next run start. Deadline and delayed-request
//! timers deliver [`ApprovalSignal`]s into the owner's channel; each signal
//! carries the generation it was armed in, so a signal that outlived a
//! cancel/reset is ignored.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::timers::{self, TimerHandle};

/// Default decision window.
pub const DEFAULT_APPROVAL_WINDOW: Duration = Duration::from_secs(15);

/// Timer message routed back to [`ApprovalTimer::on_signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalSignal {
    Request { generation: u64 },
    Expire { generation: u64 },
}

/// Observable effect of an operation or signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalTransition {
    None,
    Requested,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Requested { deadline: DateTime<Utc> },
    Consumed,
    Expired,
}

/// Read-only copy of the window handed to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalWindow {
    pub requested: bool,
    pub consumed: bool,
    pub expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

pub struct ApprovalTimer {
    window: Duration,
    phase: Phase,
    generation: u64,
    signals: mpsc::UnboundedSender<ApprovalSignal>,
    pending_request: Option<TimerHandle>,
    deadline_timer: Option<TimerHandle>,
}

impl ApprovalTimer {
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<ApprovalSignal>) {
        let (signals, rx) = mpsc::unbounded_channel();
        (
            Self {
                window,
                phase: Phase::Idle,
                generation: 0,
                signals,
                pending_request: None,
                deadline_timer: None,
            },
            rx,
        )
    }

    pub fn decision_window(&self) -> Duration {
        self.window
    }

    /// Raise the request after `delay`, unless something else moves the
    /// window out of `Idle` first.
    pub fn schedule_request(&mut self, delay: Duration) {
        if self.phase != Phase::Idle {
            return;
        }
        let signal = ApprovalSignal::Request {
            generation: self.generation,
        };
        self.pending_request = Some(timers::once(delay, self.signals.clone(), signal));
    }

    /// Enter `Requested` now and arm the deadline. Only valid from `Idle`.
    pub fn request(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        self.pending_request = None;
        let deadline = now
            + chrono::Duration::from_std(self.window).unwrap_or_else(|_| chrono::Duration::zero());
        self.phase = Phase::Requested { deadline };
        let signal = ApprovalSignal::Expire {
            generation: self.generation,
        };
        self.deadline_timer = Some(timers::once(self.window, self.signals.clone(), signal));
        true
    }

    pub fn on_signal(&mut self, signal: ApprovalSignal, now: DateTime<Utc>) -> ApprovalTransition {
        match signal {
            ApprovalSignal::Request { generation } if generation == self.generation => {
                if self.request(now) {
                    ApprovalTransition::Requested
                } else {
                    ApprovalTransition::None
                }
            }
            ApprovalSignal::Expire { generation } if generation == self.generation => {
                if self.expire_now() {
                    ApprovalTransition::Expired
                } else {
                    ApprovalTransition::None
                }
            }
            _ => ApprovalTransition::None,
        }
    }

    /// Force expiry of a pending request. Only valid from `Requested`.
    pub fn expire_now(&mut self) -> bool {
        if !matches!(self.phase, Phase::Requested { .. }) {
            return false;
        }
        self.deadline_timer = None;
        self.phase = Phase::Expired;
        true
    }

    /// Accept the decision. Only valid from `Requested`.
    pub fn consume(&mut self) -> bool {
        if !matches!(self.phase, Phase::Requested { .. }) {
            return false;
        }
        self.deadline_timer = None;
        self.phase = Phase::Consumed;
        true
    }

    /// Drop all pending timers; the phase is kept.
    pub fn cancel(&mut self) {
        self.pending_request = None;
        self.deadline_timer = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Cancel for a closing run. An open request is withdrawn back to
    /// `Idle`; `Consumed` and `Expired` stay visible.
    pub fn close(&mut self) {
        self.cancel();
        if matches!(self.phase, Phase::Requested { .. }) {
            self.phase = Phase::Idle;
        }
    }

    /// Cancel and return to `Idle` for a new run.
    pub fn reset(&mut self) {
        self.cancel();
        self.phase = Phase::Idle;
    }

    pub fn is_permitted(&self) -> bool {
        matches!(self.phase, Phase::Requested { .. })
    }

    pub fn is_expired(&self) -> bool {
        self.phase == Phase::Expired
    }

    pub fn window(&self) -> ApprovalWindow {
        match self.phase {
            Phase::Idle => ApprovalWindow::default(),
            Phase::Requested { deadline } => ApprovalWindow {
                requested: true,
                deadline: Some(deadline),
                ..ApprovalWindow::default()
            },
            Phase::Consumed => ApprovalWindow {
                consumed: true,
                ..ApprovalWindow::default()
            },
            Phase::Expired => ApprovalWindow {
                expired: true,
                ..ApprovalWindow::default()
            },
        }
    }
}
