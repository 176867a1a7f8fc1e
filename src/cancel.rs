// ABOUTME: Cooperative cancellation for install runs.
// ABOUTME: A shared interrupt flag plus an optional deadline, checked between commands.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Why a run was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The user interrupted the run (SIGINT/SIGTERM or an explicit cancel).
    Interrupted,
    /// The run deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Interrupted => f.write_str("interrupted"),
            CancelReason::DeadlineExceeded => f.write_str("run deadline exceeded"),
        }
    }
}

/// Cancellation signal shared between the install loop and whoever may stop it.
///
/// Clones share the same flag. Nothing here interrupts a command already
/// running; the installer polls [`Cancellation::check`] before each command.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    interrupted: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also cancel once `limit` has elapsed from now.
    ///
    /// A limit too far out to represent as an instant means no deadline.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.deadline = Instant::now().checked_add(limit);
        if self.deadline.is_none() {
            tracing::debug!("run timeout {:?} is unreachable; ignoring it", limit);
        }
        self
    }

    pub fn cancel(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    /// The reason to stop, if any. An interrupt wins over the deadline.
    pub fn check(&self) -> Option<CancelReason> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Some(CancelReason::Interrupted);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.check().is_some()
    }
}
