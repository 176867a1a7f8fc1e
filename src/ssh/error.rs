// ABOUTME: SSH-specific error types.
// ABOUTME: Covers key loading, connection, channel, and command execution failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read private key {path}: {source}")]
    KeyRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse private key {path}: {kind}: {reason}")]
    KeyFormat {
        path: PathBuf,
        kind: KeyFormatKind,
        reason: String,
    },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("connection to {host}:{port} timed out after {timeout:?}")]
    ConnectTimeout {
        host: String,
        port: u16,
        timeout: Duration,
    },

    #[error("authentication failed: server rejected the private key")]
    AuthenticationFailed,

    #[error("failed to open channel: {0}")]
    ChannelOpen(String),

    #[error("failed to exec command: {0}")]
    Exec(String),

    #[error("command timed out after {0:?}")]
    CommandTimeout(Duration),

    #[error("command terminated by signal {0}")]
    Signal(String),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),
}

/// Why a private key could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormatKind {
    /// The file holds no key in a format the parser understands.
    UnrecognizedType,
    /// The key is protected by a passphrase.
    Encrypted,
    /// The key was recognised but its contents are invalid.
    Corrupt,
}

impl std::fmt::Display for KeyFormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            KeyFormatKind::UnrecognizedType => {
                "unrecognized key type (expected an OpenSSH or PEM private key)"
            }
            KeyFormatKind::Encrypted => "key is passphrase protected",
            KeyFormatKind::Corrupt => "key data is corrupt",
        };
        f.write_str(s)
    }
}

impl From<&russh::keys::Error> for KeyFormatKind {
    fn from(err: &russh::keys::Error) -> Self {
        match err {
            russh::keys::Error::CouldNotReadKey
            | russh::keys::Error::UnsupportedKeyType { .. } => KeyFormatKind::UnrecognizedType,
            russh::keys::Error::KeyIsEncrypted => KeyFormatKind::Encrypted,
            _ => KeyFormatKind::Corrupt,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
