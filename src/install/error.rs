// ABOUTME: Installer error types with SNAFU pattern.
// ABOUTME: Separates command failures, transport failures, and cancellation.

use snafu::Snafu;

use crate::cancel::CancelReason;
use crate::config::Phase;
use crate::ssh;

/// Why an install run stopped before completing every phase.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum InstallError {
    #[snafu(display(
        "phase '{phase}' command '{command}' failed with exit code {exit_code}{}",
        output_suffix(output)
    ))]
    CommandFailed {
        phase: Phase,
        command: String,
        exit_code: u32,
        output: String,
    },

    #[snafu(display(
        "phase '{phase}' command '{command}' failed: {source}{}",
        output_suffix(output)
    ))]
    Execution {
        phase: Phase,
        command: String,
        output: String,
        source: ssh::Error,
    },

    #[snafu(display("phase '{phase}' command '{command}' could not start: {source}"))]
    Channel {
        phase: Phase,
        command: String,
        source: ssh::Error,
    },

    #[snafu(display("installation {reason} before phase '{phase}' command '{command}'"))]
    Cancelled {
        phase: Phase,
        command: String,
        reason: CancelReason,
    },

    #[snafu(display("installer has already run"))]
    AlreadyRun,

    #[snafu(display("installer session is closed"))]
    SessionClosed,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallErrorKind {
    /// A command exited non-zero.
    CommandFailed,
    /// The transport failed while a command ran.
    Execution,
    /// No channel could be opened for a command.
    Channel,
    /// Stopped by interrupt or deadline.
    Cancelled,
    /// The installer was reused or closed early.
    Misuse,
}

impl InstallError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> InstallErrorKind {
        match self {
            InstallError::CommandFailed { .. } => InstallErrorKind::CommandFailed,
            InstallError::Execution { .. } => InstallErrorKind::Execution,
            InstallError::Channel { .. } => InstallErrorKind::Channel,
            InstallError::Cancelled { .. } => InstallErrorKind::Cancelled,
            InstallError::AlreadyRun | InstallError::SessionClosed => InstallErrorKind::Misuse,
        }
    }

    /// Remote exit code, when the command ran to completion.
    pub fn exit_code(&self) -> Option<u32> {
        match self {
            InstallError::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Phase the run stopped in.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            InstallError::CommandFailed { phase, .. }
            | InstallError::Execution { phase, .. }
            | InstallError::Channel { phase, .. }
            | InstallError::Cancelled { phase, .. } => Some(*phase),
            InstallError::AlreadyRun | InstallError::SessionClosed => None,
        }
    }
}

fn output_suffix(output: &str) -> String {
    let trimmed = output.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\noutput:\n{trimmed}")
    }
}
