// ABOUTME: SSH session management using russh.
// ABOUTME: Handles key loading, connection, public key authentication, and command execution.

use super::error::{Error, KeyFormatKind, Result};
use russh::client::{self, Config, Handle};
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, decode_secret_key, ssh_key};
use russh::{Channel, ChannelMsg, Disconnect};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default bound on dialing and completing the SSH handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How the server's host key is checked during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept any host key without verification. Insecure.
    #[default]
    AcceptAny,
    /// Verify against a known_hosts file.
    KnownHosts {
        /// If None, uses the default ~/.ssh/known_hosts.
        path: Option<PathBuf>,
        /// Record unknown hosts instead of rejecting them.
        trust_on_first_use: bool,
    },
}

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Path to the private key used for public key authentication.
    pub key_path: PathBuf,
    /// Variables exported before every command.
    pub environment: BTreeMap<String, String>,
    /// Bound on dial plus handshake.
    pub connect_timeout: Duration,
    /// Optional bound on each command. None waits indefinitely.
    pub command_timeout: Option<Duration>,
    pub host_key_policy: HostKeyPolicy,
}

impl SessionConfig {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: key_path.into(),
            environment: BTreeMap::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: None,
            host_key_policy: HostKeyPolicy::AcceptAny,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }
}

/// Outcome of one remote command.
///
/// A non-zero `exit_code` is a command failure; `error` is set only when the
/// transport failed mid-command, in which case `exit_code` stays 0.
#[derive(Debug)]
pub struct CommandResult {
    /// The command as sent, including any environment prefix.
    pub command: String,
    /// Interleaved stdout and stderr.
    pub output: Vec<u8>,
    pub exit_code: u32,
    pub error: Option<Error>,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.error.is_none() && self.exit_code == 0
    }

    /// Captured output, lossily decoded.
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Prefix `command` with an export of every variable so the remote shell sees them.
///
/// The remote side does not receive the client's environment, so values are
/// injected into the command line itself.
pub fn with_environment(environment: &BTreeMap<String, String>, command: &str) -> String {
    if environment.is_empty() {
        return command.to_string();
    }
    let pairs: Vec<String> = environment
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    format!("export {} && {}", pairs.join(" "), command)
}

/// Read and decode a private key file.
pub async fn load_private_key(path: &Path) -> Result<ssh_key::PrivateKey> {
    let bytes = tokio::fs::read(path).await.map_err(|source| Error::KeyRead {
        path: path.to_path_buf(),
        source,
    })?;

    let text = String::from_utf8(bytes).map_err(|_| Error::KeyFormat {
        path: path.to_path_buf(),
        kind: KeyFormatKind::UnrecognizedType,
        reason: "file is not text".to_string(),
    })?;

    decode_secret_key(&text, None).map_err(|e| Error::KeyFormat {
        path: path.to_path_buf(),
        kind: KeyFormatKind::from(&e),
        reason: e.to_string(),
    })
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let (path, trust_on_first_use) = match &self.policy {
            HostKeyPolicy::AcceptAny => {
                tracing::warn!(
                    "host key verification disabled: accepting key for {}:{} unchecked",
                    self.host,
                    self.port
                );
                return Ok(true);
            }
            HostKeyPolicy::KnownHosts {
                path,
                trust_on_first_use,
            } => (path.as_deref(), *trust_on_first_use),
        };

        let check_result = match path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) if trust_on_first_use => {
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                let learn_result = match path {
                    Some(path) => {
                        learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => learn_known_hosts(&self.host, self.port, server_public_key),
                };
                if let Err(e) = learn_result {
                    tracing::warn!("Failed to save host key to known_hosts: {}", e);
                }
                Ok(true)
            }
            Ok(false) => {
                tracing::warn!("unknown host key for {}:{}", self.host, self.port);
                Ok(false)
            }
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::error!(
                    "host key for {}:{} does not match known_hosts",
                    self.host,
                    self.port
                );
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("failed to check known_hosts: {}", e);
                Ok(trust_on_first_use)
            }
        }
    }
}

/// An established SSH session.
pub struct Session {
    config: SessionConfig,
    handle: Handle<SshHandler>,
    closed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("handle", &"<russh::Handle>")
            .field("closed", &self.closed)
            .finish()
    }
}

impl Session {
    /// Load the key, connect to the remote host, and authenticate.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let key = load_private_key(&config.key_path).await?;

        // No keepalive or inactivity timer: nothing else may write to the
        // connection, and long silent commands must not be cut off.
        let russh_config = Config {
            inactivity_timeout: None,
            keepalive_interval: None,
            ..Default::default()
        };

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            policy: config.host_key_policy.clone(),
        };

        tracing::debug!(
            "connecting to {}@{}:{}",
            config.user,
            config.host,
            config.port
        );

        let connect = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            handler,
        );

        let mut handle = tokio::time::timeout(config.connect_timeout, connect)
            .await
            .map_err(|_| Error::ConnectTimeout {
                host: config.host.clone(),
                port: config.port,
                timeout: config.connect_timeout,
            })?
            .map_err(|e| {
                if e.to_string().contains("Connection refused") {
                    Error::Connection(format!(
                        "connection refused to {}:{}",
                        config.host, config.port
                    ))
                } else {
                    Error::Connection(e.to_string())
                }
            })?;

        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .map_err(Error::Protocol)?
            .flatten();

        let auth = handle
            .authenticate_publickey(
                &config.user,
                PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
            )
            .await
            .map_err(Error::Protocol)?;

        if !auth.success() {
            return Err(Error::AuthenticationFailed);
        }

        tracing::info!("connected to {}:{}", config.host, config.port);

        Ok(Self {
            config,
            handle,
            closed: false,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run one command on a fresh channel and wait for it to finish.
    ///
    /// Returns `Err` only when no channel could be opened. Everything that
    /// happens after the channel exists is reported through the result.
    pub async fn execute(&self, command: &str) -> Result<CommandResult> {
        let sent = with_environment(&self.config.environment, command);

        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::ChannelOpen(e.to_string()))?;

        let mut output = Vec::new();
        let outcome = match self.config.command_timeout {
            Some(limit) => {
                tokio::time::timeout(limit, run_on_channel(&mut channel, &sent, &mut output))
                    .await
                    .unwrap_or(Err(Error::CommandTimeout(limit)))
            }
            None => run_on_channel(&mut channel, &sent, &mut output).await,
        };

        if let Err(e) = channel.close().await {
            tracing::debug!("channel close after command: {}", e);
        }

        let (exit_code, error) = match outcome {
            Ok(code) => (code, None),
            Err(e) => (0, Some(e)),
        };

        Ok(CommandResult {
            command: sent,
            output,
            exit_code,
            error,
        })
    }

    /// Disconnect the session. Later calls are no-ops.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)?;
        tracing::debug!("disconnected from {}", self.config.host);
        Ok(())
    }
}

async fn run_on_channel(
    channel: &mut Channel<client::Msg>,
    command: &str,
    output: &mut Vec<u8>,
) -> Result<u32> {
    channel
        .exec(true, command)
        .await
        .map_err(|e| Error::Exec(e.to_string()))?;

    let mut exit_code = None;
    let mut signal = None;
    let mut got_eof = false;

    loop {
        match channel.wait().await {
            Some(ChannelMsg::Data { data }) => output.extend_from_slice(&data),
            // stderr lands in the same buffer so ordering is preserved
            Some(ChannelMsg::ExtendedData { data, ext: 1 }) => output.extend_from_slice(&data),
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                exit_code = Some(exit_status);
                if got_eof {
                    break;
                }
            }
            Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                signal = Some(format!("{signal_name:?}"));
            }
            Some(ChannelMsg::Eof) => {
                got_eof = true;
                if exit_code.is_some() {
                    break;
                }
            }
            Some(ChannelMsg::Close) | None => break,
            Some(_) => {}
        }
    }

    match (exit_code, signal) {
        (Some(code), _) => Ok(code),
        (None, Some(signal)) => Err(Error::Signal(signal)),
        (None, None) => Err(Error::ChannelClosed),
    }
}
