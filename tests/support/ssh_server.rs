// ABOUTME: In-process SSH server for exercising the real session client.
// ABOUTME: Answers exec requests from a fixed script keyed on the command text.

use super::fixture;
use parking_lot::Mutex;
use provisio::ssh::load_private_key;
use russh::server::{self, Auth, Msg, Session};
use russh::keys::ssh_key;
use russh::{Channel, ChannelId, CryptoVec, Sig};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Commands the server knows how to answer. Anything else is echoed back.
pub const EXIT_THREE: &str = "make check";
pub const MIXED_STREAMS: &str = "./configure";
pub const KILLED: &str = "oom-victim";
pub const NO_STATUS: &str = "vanish";
pub const HANGS: &str = "sleep infinity";

/// What the server observed, shared with the test.
#[derive(Debug, Clone, Default)]
pub struct Seen {
    inner: Arc<Mutex<SeenInner>>,
}

#[derive(Debug, Default)]
struct SeenInner {
    commands: Vec<String>,
    closed_channels: usize,
}

impl Seen {
    pub fn commands(&self) -> Vec<String> {
        self.inner.lock().commands.clone()
    }

    pub fn closed_channels(&self) -> usize {
        self.inner.lock().closed_channels
    }

    /// Wait until the client has closed at least `count` channels.
    pub async fn wait_for_closes(&self, count: usize) -> bool {
        let wait = async {
            while self.closed_channels() < count {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .is_ok()
    }
}

pub struct ScriptedServer {
    pub port: u16,
    pub seen: Seen,
}

impl ScriptedServer {
    /// Bind to a free local port and serve until the test ends.
    pub async fn start() -> Self {
        let host_key = load_private_key(&fixture("id_ed25519_test"))
            .await
            .expect("fixture key should decode");
        let config = Arc::new(server::Config {
            keys: vec![host_key],
            auth_rejection_time: Duration::ZERO,
            ..Default::default()
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let seen = Seen::default();

        let shared = seen.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = ScriptHandler {
                    seen: shared.clone(),
                };
                let config = config.clone();
                tokio::spawn(async move {
                    if let Ok(running) = server::run_stream(config, stream, handler).await {
                        let _ = running.await;
                    }
                });
            }
        });

        Self { port, seen }
    }
}

struct ScriptHandler {
    seen: Seen,
}

impl ScriptHandler {
    fn finish(
        session: &mut Session,
        channel: ChannelId,
        exit_status: u32,
    ) -> Result<(), russh::Error> {
        session.exit_status_request(channel, exit_status)?;
        session.eof(channel)?;
        session.close(channel)
    }
}

impl server::Handler for ScriptHandler {
    type Error = russh::Error;

    async fn auth_publickey(
        &mut self,
        _user: &str,
        _public_key: &ssh_key::PublicKey,
    ) -> Result<Auth, Self::Error> {
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        _channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn channel_close(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.seen.inner.lock().closed_channels += 1;
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let command = String::from_utf8_lossy(data).into_owned();
        self.seen.inner.lock().commands.push(command.clone());
        session.channel_success(channel)?;

        if command.ends_with(EXIT_THREE) {
            session.data(channel, CryptoVec::from_slice(b"2 tests failed\n"))?;
            Self::finish(session, channel, 3)
        } else if command.ends_with(MIXED_STREAMS) {
            session.data(channel, CryptoVec::from_slice(b"checking for cc... yes\n"))?;
            session.extended_data(channel, 1, CryptoVec::from_slice(b"warning: no ccache\n"))?;
            session.data(channel, CryptoVec::from_slice(b"creating Makefile\n"))?;
            Self::finish(session, channel, 0)
        } else if command.ends_with(KILLED) {
            session.exit_signal_request(channel, Sig::KILL, false, "killed", "en")?;
            session.eof(channel)?;
            session.close(channel)
        } else if command.ends_with(NO_STATUS) {
            session.eof(channel)?;
            session.close(channel)
        } else if command.ends_with(HANGS) {
            Ok(())
        } else {
            session.data(channel, CryptoVec::from(format!("{command}\n").as_str()))?;
            Self::finish(session, channel, 0)
        }
    }
}
