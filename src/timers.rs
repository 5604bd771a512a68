//! Cancellable one-shot and periodic timers.
//!
//! Timers deliver a message into an unbounded channel. The only way to stop
//! one is to drop (or `cancel`) its [`TimerHandle`]; no raw task ids leak out.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Owned timer; aborts its task on drop.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Deliver `message` once after `delay`.
pub fn once<T: Send + 'static>(
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
    message: T,
) -> TimerHandle {
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = tx.send(message);
    });
    TimerHandle { task }
}

/// Deliver `message` every `period`, first delivery immediately.
pub fn every<T: Clone + Send + 'static>(
    period: Duration,
    tx: mpsc::UnboundedSender<T>,
    message: T,
) -> TimerHandle {
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if tx.send(message.clone()).is_err() {
                break;
            }
        }
    });
    TimerHandle { task }
}
