// ABOUTME: Configuration types and parsing for installation YAML files.
// ABOUTME: Handles extension checks, YAML parsing, and validation.

mod deserialize;
mod phase;

pub use phase::Phase;

use crate::error::{Error, Result};
use crate::ssh::SessionConfig;
use deserialize::{deserialize_environment, null_as_default};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extensions accepted by [`Config::load`], compared case-insensitively.
pub const CONFIG_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(
        rename = "private_key_path",
        default,
        deserialize_with = "null_as_default"
    )]
    pub private_key: PathBuf,

    #[serde(
        rename = "pre_install_commands",
        default,
        deserialize_with = "null_as_default"
    )]
    pub pre_install: Vec<String>,

    #[serde(
        rename = "installation_commands",
        default,
        deserialize_with = "null_as_default"
    )]
    pub install: Vec<String>,

    #[serde(
        rename = "post_install_commands",
        default,
        deserialize_with = "null_as_default"
    )]
    pub post_install: Vec<String>,

    #[serde(
        rename = "environment_variables",
        default,
        deserialize_with = "deserialize_environment"
    )]
    pub environment: BTreeMap<String, String>,

    /// Surface every command's output, not only on failure.
    #[serde(default)]
    pub debug: bool,

    /// Upper bound on a single remote command. Unbounded when absent.
    #[serde(default, with = "humantime_serde")]
    pub command_timeout: Option<Duration>,

    /// Deadline for the whole run, checked between commands.
    #[serde(default, with = "humantime_serde")]
    pub run_timeout: Option<Duration>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        if !has_config_extension(path) {
            return Err(Error::UnsupportedFormat(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml(&content)?;
        tracing::debug!(
            "loaded {} with {} steps",
            path.display(),
            config.total_steps()
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.private_key.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(Error::InvalidConfig(
                "private_key_path is required in configuration".to_string(),
            ));
        }

        if let Some(name) = self.environment.keys().find(|k| !is_variable_name(k)) {
            return Err(Error::InvalidConfig(format!(
                "invalid environment variable name: {name:?}"
            )));
        }

        // Values are exported unquoted, so anything the shell would split
        // or interpret as a separate command must be rejected.
        if let Some((name, value)) = self
            .environment
            .iter()
            .find(|(_, value)| !is_plain_value(value))
        {
            return Err(Error::InvalidConfig(format!(
                "environment variable {name} has a value the shell would split or reinterpret: {value:?}"
            )));
        }

        Ok(())
    }

    /// Commands of one phase.
    pub fn commands(&self, phase: Phase) -> &[String] {
        match phase {
            Phase::PreInstall => &self.pre_install,
            Phase::Install => &self.install,
            Phase::PostInstall => &self.post_install,
        }
    }

    /// Phases with their commands, in execution order.
    pub fn phases(&self) -> impl Iterator<Item = (Phase, &[String])> {
        Phase::ALL
            .into_iter()
            .map(move |phase| (phase, self.commands(phase)))
    }

    /// Number of commands across all phases.
    pub fn total_steps(&self) -> usize {
        self.pre_install.len() + self.install.len() + self.post_install.len()
    }

    /// Private key path with a leading `~` expanded to the home directory.
    pub fn key_path(&self) -> PathBuf {
        let raw = self.private_key.to_string_lossy();
        PathBuf::from(shellexpand::tilde(&raw).into_owned())
    }

    /// SSH settings for reaching `host` with this configuration's key,
    /// environment, and command timeout.
    pub fn session_config(&self, host: &str, port: u16, user: &str) -> SessionConfig {
        SessionConfig::new(host, user, self.key_path())
            .port(port)
            .environment(self.environment.clone())
            .command_timeout(self.command_timeout)
    }
}

fn has_config_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            CONFIG_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_plain_value(value: &str) -> bool {
    !value.chars().any(|c| {
        c.is_whitespace()
            || matches!(
                c,
                ';' | '&' | '|' | '<' | '>' | '(' | ')' | '\'' | '"' | '`' | '\\'
            )
    })
}
