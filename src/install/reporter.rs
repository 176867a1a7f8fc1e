// ABOUTME: Reporting interface for install progress and results.
// ABOUTME: Keeps terminal rendering out of the installer so it can run headless.

use super::InstallState;
use crate::config::Phase;
use crate::progress::Progress;

/// Receives install events from the single execution path.
pub trait Reporter: Send {
    /// Called once before the first command.
    fn started(&mut self, _progress: &Progress) {}

    /// Called after each step advance, before the command runs.
    fn advanced(&mut self, progress: &Progress);

    /// Output of a command, delivered only in debug mode.
    fn command_output(&mut self, phase: Phase, command: &str, output: &str);

    /// Called once with the terminal state.
    fn finished(&mut self, state: InstallState, progress: &Progress);
}
