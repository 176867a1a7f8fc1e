// ABOUTME: Test support utilities.
// ABOUTME: Provides a scripted remote executor, a recording reporter, and config builders.

// Each test binary only uses some of these helpers.
#![allow(dead_code)]

pub mod ssh_server;

use async_trait::async_trait;
use parking_lot::Mutex;
use provisio::cancel::Cancellation;
use provisio::config::{Config, Phase};
use provisio::install::{InstallState, RemoteExecutor, Reporter};
use provisio::progress::Progress;
use provisio::ssh::{self, CommandResult};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("provisio=debug".parse().unwrap())
            .add_directive("russh=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Path to a file under tests/fixtures.
#[allow(dead_code)]
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// A config with the given command lists and no environment.
#[allow(dead_code)]
pub fn config(pre: &[&str], install: &[&str], post: &[&str]) -> Config {
    let owned = |cmds: &[&str]| cmds.iter().map(|c| c.to_string()).collect();
    Config {
        private_key: PathBuf::from("/keys/id_ed25519"),
        pre_install: owned(pre),
        install: owned(install),
        post_install: owned(post),
        environment: BTreeMap::new(),
        debug: false,
        command_timeout: None,
        run_timeout: None,
    }
}

/// Scripted behaviour for one command.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Reply {
    Exit { code: u32, output: String },
    /// Transport broke mid-command.
    Broken { output: String },
    /// No channel could be opened.
    NoChannel,
}

/// What a [`FakeRemote`] saw, readable after the installer owns it.
#[derive(Debug, Clone, Default)]
pub struct Activity {
    executed: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl Activity {
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// In-memory stand-in for an SSH session.
#[derive(Default)]
pub struct FakeRemote {
    replies: HashMap<String, Reply>,
    cancel_after: Option<(String, Cancellation)>,
    activity: Activity,
}

#[allow(dead_code)]
impl FakeRemote {
    pub fn new() -> (Self, Activity) {
        let remote = Self::default();
        let activity = remote.activity.clone();
        (remote, activity)
    }

    pub fn reply(mut self, command: &str, code: u32, output: &str) -> Self {
        self.replies.insert(
            command.to_string(),
            Reply::Exit {
                code,
                output: output.to_string(),
            },
        );
        self
    }

    pub fn broken(mut self, command: &str, output: &str) -> Self {
        self.replies.insert(
            command.to_string(),
            Reply::Broken {
                output: output.to_string(),
            },
        );
        self
    }

    pub fn no_channel(mut self, command: &str) -> Self {
        self.replies.insert(command.to_string(), Reply::NoChannel);
        self
    }

    /// Fire `cancel` once `command` has finished, as an interrupt would.
    pub fn cancel_after(mut self, command: &str, cancel: Cancellation) -> Self {
        self.cancel_after = Some((command.to_string(), cancel));
        self
    }
}

#[async_trait]
impl RemoteExecutor for FakeRemote {
    async fn execute(&self, command: &str) -> ssh::Result<CommandResult> {
        let reply = self.replies.get(command).cloned().unwrap_or(Reply::Exit {
            code: 0,
            output: String::new(),
        });

        if matches!(reply, Reply::NoChannel) {
            return Err(ssh::Error::ChannelOpen("administratively prohibited".into()));
        }

        self.activity.executed.lock().push(command.to_string());

        if let Some((after, cancel)) = &self.cancel_after {
            if after == command {
                cancel.cancel();
            }
        }

        let result = match reply {
            Reply::Exit { code, output } => CommandResult {
                command: command.to_string(),
                output: output.into_bytes(),
                exit_code: code,
                error: None,
            },
            Reply::Broken { output } => CommandResult {
                command: command.to_string(),
                output: output.into_bytes(),
                exit_code: 0,
                error: Some(ssh::Error::ChannelClosed),
            },
            Reply::NoChannel => unreachable!(),
        };
        Ok(result)
    }

    async fn close(&mut self) -> ssh::Result<()> {
        self.activity.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Everything a reporter was told.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum Event {
    Started {
        total: usize,
    },
    Advanced {
        step: usize,
        percent: usize,
        phase: String,
        action: String,
    },
    Output {
        phase: Phase,
        command: String,
        output: String,
    },
    Finished {
        state: InstallState,
        success: bool,
        detail: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<Event>>>,
}

#[allow(dead_code)]
impl RecordingReporter {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn outputs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Output { output, .. } => Some(output),
                _ => None,
            })
            .collect()
    }

    pub fn percentages(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Advanced { percent, .. } => Some(percent),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn started(&mut self, progress: &Progress) {
        self.events.lock().push(Event::Started {
            total: progress.total_steps(),
        });
    }

    fn advanced(&mut self, progress: &Progress) {
        self.events.lock().push(Event::Advanced {
            step: progress.current_step(),
            percent: progress.percentage(),
            phase: progress.phase().to_string(),
            action: progress.action().to_string(),
        });
    }

    fn command_output(&mut self, phase: Phase, command: &str, output: &str) {
        self.events.lock().push(Event::Output {
            phase,
            command: command.to_string(),
            output: output.to_string(),
        });
    }

    fn finished(&mut self, state: InstallState, progress: &Progress) {
        let completion = progress.completion();
        self.events.lock().push(Event::Finished {
            state,
            success: completion.map(|c| c.success).unwrap_or(false),
            detail: completion.map(|c| c.detail.clone()).unwrap_or_default(),
        });
    }
}
