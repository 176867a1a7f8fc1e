// ABOUTME: Phased installer driving commands over one remote session.
// ABOUTME: Owns ordering, cancellation checks, failure policy, and session teardown.

mod error;
mod executor;
mod reporter;
mod state;

pub use error::{InstallError, InstallErrorKind};
pub use executor::RemoteExecutor;
pub use reporter::Reporter;
pub use state::InstallState;

use crate::cancel::Cancellation;
use crate::config::Config;
use crate::progress::Progress;
use crate::ssh::{self, Session, SessionConfig};

/// Runs the pre-install, install, and post-install phases in order.
///
/// Commands run strictly one after another on a single connection. The
/// first failed command ends the run; nothing already applied is undone.
pub struct Installer<E: RemoteExecutor = Session> {
    executor: Option<E>,
    config: Config,
    progress: Progress,
    state: InstallState,
    reporter: Box<dyn Reporter>,
}

impl Installer<Session> {
    /// Connect to the remote host and prepare an installer for `config`.
    pub async fn connect(
        session_config: SessionConfig,
        config: Config,
        reporter: Box<dyn Reporter>,
    ) -> crate::error::Result<Self> {
        let session = Session::connect(session_config).await?;
        Ok(Self::new(session, config, reporter))
    }
}

impl<E: RemoteExecutor> Installer<E> {
    pub fn new(executor: E, config: Config, reporter: Box<dyn Reporter>) -> Self {
        let progress = Progress::new(config.total_steps());
        Self {
            executor: Some(executor),
            config,
            progress,
            state: InstallState::Idle,
            reporter,
        }
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True until the session has been released.
    pub fn is_connected(&self) -> bool {
        self.executor.is_some()
    }

    /// Execute every phase, then close the session whatever the outcome.
    pub async fn install(&mut self, cancel: &Cancellation) -> Result<(), InstallError> {
        if self.state != InstallState::Idle {
            return Err(InstallError::AlreadyRun);
        }
        if self.executor.is_none() {
            return Err(InstallError::SessionClosed);
        }

        tracing::info!("starting installation: {} steps", self.progress.total_steps());
        self.reporter.started(&self.progress);

        let result = self.run_phases(cancel).await;

        match &result {
            Ok(()) => {
                self.state = InstallState::Succeeded;
                self.progress
                    .finish(true, "Installation completed successfully");
                tracing::info!("installation succeeded");
            }
            Err(e) if e.kind() == InstallErrorKind::Cancelled => {
                self.state = InstallState::Cancelled;
                self.progress.finish(false, e.to_string());
                tracing::warn!("{}", e);
            }
            Err(e) => {
                self.state = InstallState::Failed;
                self.progress.finish(false, e.to_string());
                tracing::error!("{}", e);
            }
        }
        self.reporter.finished(self.state, &self.progress);

        if let Err(e) = self.close().await {
            tracing::warn!("SSH disconnect failed: {}", e);
        }

        result
    }

    async fn run_phases(&mut self, cancel: &Cancellation) -> Result<(), InstallError> {
        let Some(executor) = self.executor.as_ref() else {
            return Err(InstallError::SessionClosed);
        };

        for (phase, commands) in self.config.phases() {
            if commands.is_empty() {
                continue;
            }
            self.state = InstallState::Running(phase);
            tracing::debug!("entering {} ({} commands)", phase, commands.len());

            for command in commands {
                if let Some(reason) = cancel.check() {
                    return Err(InstallError::Cancelled {
                        phase,
                        command: command.clone(),
                        reason,
                    });
                }

                self.progress.advance(phase.name(), command);
                self.reporter.advanced(&self.progress);

                let result =
                    executor
                        .execute(command)
                        .await
                        .map_err(|source| InstallError::Channel {
                            phase,
                            command: command.clone(),
                            source,
                        })?;
                tracing::debug!(
                    "sent {:?}: exit code {}, {} bytes of output",
                    result.command,
                    result.exit_code,
                    result.output.len()
                );

                let output = result.output_text();
                if self.config.debug && !output.is_empty() {
                    self.reporter.command_output(phase, command, &output);
                }

                if let Some(source) = result.error {
                    return Err(InstallError::Execution {
                        phase,
                        command: command.clone(),
                        output,
                        source,
                    });
                }

                if result.exit_code != 0 {
                    return Err(InstallError::CommandFailed {
                        phase,
                        command: command.clone(),
                        exit_code: result.exit_code,
                        output,
                    });
                }
            }
        }

        Ok(())
    }

    /// Release the session. Only the first call reaches the remote side.
    pub async fn close(&mut self) -> ssh::Result<()> {
        match self.executor.take() {
            Some(mut executor) => executor.close().await,
            None => Ok(()),
        }
    }
}

impl<E: RemoteExecutor> Drop for Installer<E> {
    fn drop(&mut self) {
        if self.executor.is_some() {
            // Dropping the session handle tears the connection down.
            tracing::debug!("installer dropped without close; releasing connection");
        }
    }
}
