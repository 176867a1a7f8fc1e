// ABOUTME: Installer state machine states.
// ABOUTME: Idle, running a phase, or one of three terminal outcomes.

use crate::config::Phase;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "phase", rename_all = "snake_case")]
pub enum InstallState {
    /// Connected, nothing run yet.
    Idle,
    /// Executing commands of a phase.
    Running(Phase),
    Succeeded,
    Failed,
    Cancelled,
}

impl InstallState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InstallState::Succeeded | InstallState::Failed | InstallState::Cancelled
        )
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallState::Idle => f.write_str("idle"),
            InstallState::Running(phase) => write!(f, "running {phase}"),
            InstallState::Succeeded => f.write_str("succeeded"),
            InstallState::Failed => f.write_str("failed"),
            InstallState::Cancelled => f.write_str("cancelled"),
        }
    }
}
