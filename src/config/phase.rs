// ABOUTME: The three ordered command phases of an installation.
// ABOUTME: Phase order is fixed: pre-installation, installation, post-installation.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PreInstall,
    Install,
    PostInstall,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 3] = [Phase::PreInstall, Phase::Install, Phase::PostInstall];

    /// Human-readable name used in progress lines and failure details.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::PreInstall => "Pre-installation",
            Phase::Install => "Installation",
            Phase::PostInstall => "Post-installation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
