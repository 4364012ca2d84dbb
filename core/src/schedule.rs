//! Timer scheduling: when must the next `tick` be delivered?
//!
//! RULES:
//!   - A timer is armed only while the safe is closed with a deadline.
//!   - Re-arming always cancels the pending wait first, so at most one
//!     wake is ever outstanding.
//!   - A deadline already in the past fires immediately.
//!   - Waking early is harmless: `tick` before the deadline is a no-op
//!     and the dispatch that follows re-arms.

use crate::{
    snapshot::{SafeSnapshot, SafeState},
    types::Timestamp,
};
use std::time::Duration;
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};

/// Why the dispatch loop is being woken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The armed deadline has been reached.
    Deadline,
    /// The application regained focus or visibility.
    Resumed,
}

/// The deadline the scheduler should be armed for, if any.
pub fn next_deadline(snapshot: &SafeSnapshot) -> Option<Timestamp> {
    match snapshot.runtime.state {
        SafeState::Closed => snapshot.runtime.destruct_at,
        _ => None,
    }
}

pub trait TimerScheduler {
    /// Arm for `deadline`, replacing any pending wait.
    fn arm(&mut self, deadline: Timestamp, now: Timestamp);

    fn cancel(&mut self);

    /// The currently armed deadline.
    fn armed(&self) -> Option<Timestamp>;

    /// Cancel, then arm again from the snapshot's current deadline.
    fn rearm(&mut self, snapshot: &SafeSnapshot, now: Timestamp) {
        self.cancel();
        if let Some(deadline) = next_deadline(snapshot) {
            self.arm(deadline, now);
        }
    }
}

// ── Manual timer ───────────────────────────────────────────────────

/// Records the armed deadline; the caller decides when time has passed.
#[derive(Debug, Default, Clone)]
pub struct ManualTimer {
    deadline: Option<Timestamp>,
    arm_count: u32,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// If the armed deadline is due at `now`, disarm and return true.
    pub fn take_due(&mut self, now: Timestamp) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// How many times `arm` has been called. Used by tests.
    pub fn arm_count(&self) -> u32 {
        self.arm_count
    }
}

impl TimerScheduler for ManualTimer {
    fn arm(&mut self, deadline: Timestamp, _now: Timestamp) {
        self.deadline = Some(deadline);
        self.arm_count += 1;
    }

    fn cancel(&mut self) {
        self.deadline = None;
    }

    fn armed(&self) -> Option<Timestamp> {
        self.deadline
    }
}

// ── Tokio timer ────────────────────────────────────────────────────

/// Sleeps on the tokio runtime and sends `Wake::Deadline` when done.
/// Must be armed from within a runtime context.
pub struct TokioTimer {
    wake_tx:  UnboundedSender<Wake>,
    pending:  Option<JoinHandle<()>>,
    deadline: Option<Timestamp>,
}

impl TokioTimer {
    pub fn new(wake_tx: UnboundedSender<Wake>) -> Self {
        Self { wake_tx, pending: None, deadline: None }
    }
}

impl TimerScheduler for TokioTimer {
    fn arm(&mut self, deadline: Timestamp, now: Timestamp) {
        self.cancel();

        let delay = Duration::from_millis(deadline.saturating_sub(now).max(0) as u64);
        let tx = self.wake_tx.clone();
        log::debug!("timer armed for {deadline} (in {delay:?})");

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the shell is shutting down.
            let _ = tx.send(Wake::Deadline);
        }));
        self.deadline = Some(deadline);
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.deadline = None;
    }

    fn armed(&self) -> Option<Timestamp> {
        self.deadline
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
