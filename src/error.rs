// ABOUTME: Application-wide error types for provisio.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::install::{InstallError, InstallErrorKind};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file must have .yml or .yaml extension: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Ssh(#[from] crate::ssh::Error),

    #[error(transparent)]
    Install(#[from] InstallError),
}

impl Error {
    /// True when the run stopped because of an interrupt or deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Install(e) if e.kind() == InstallErrorKind::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
