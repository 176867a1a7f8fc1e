// ABOUTME: Remote execution trait used by the installer.
// ABOUTME: Implemented by the SSH session; test doubles implement it too.

use crate::ssh::{self, CommandResult, Session};
use async_trait::async_trait;

/// Runs commands on a remote host, one at a time.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a command to completion.
    ///
    /// `Err` means the command never started. Failures after start are
    /// carried in the returned [`CommandResult`].
    async fn execute(&self, command: &str) -> ssh::Result<CommandResult>;

    /// Release the underlying connection.
    async fn close(&mut self) -> ssh::Result<()>;
}

#[async_trait]
impl RemoteExecutor for Session {
    async fn execute(&self, command: &str) -> ssh::Result<CommandResult> {
        Session::execute(self, command).await
    }

    async fn close(&mut self) -> ssh::Result<()> {
        self.disconnect().await
    }
}
