// ABOUTME: SSH client module for remote command execution.
// ABOUTME: Authenticates with a private key file; one channel per command.

mod client;
mod error;

pub use client::{
    CommandResult, DEFAULT_CONNECT_TIMEOUT, HostKeyPolicy, Session, SessionConfig,
    load_private_key, with_environment,
};
pub use error::{Error, KeyFormatKind, Result};
