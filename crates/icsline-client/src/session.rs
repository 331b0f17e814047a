//! Authenticated ICS session.
//!
//! A [`Session`] composes the whole client stack: it dials with retry,
//! sends the Timeseal hello, runs the login handshake, optionally spawns
//! the keepalive ticker, and then exposes `send`/`recv` to the embedding
//! application. The socket is exclusively owned here; nothing else reads
//! or writes it directly.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::warn;

use icsline_proto::{Event, decode_messages};

use crate::config::Config;
use crate::conn::{Conn, TcpConn};
use crate::error::Result;
use crate::login::login;
use crate::transport::{TcpDialer, dial_with_retry};

/// Deadline for steady-state reads. The server can sit silent for a long
/// time between events; idle protection is the keepalive's job.
const READ_DEADLINE: Duration = Duration::from_secs(3600);

/// How often the keepalive ticker sends its no-op command.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(58 * 60);

/// One authenticated connection to an ICS server.
pub struct Session {
    conn: Arc<TcpConn>,
    config: Config,
    username: String,
    keepalive: Option<JoinHandle<()>>,
}

impl Session {
    /// Dial, handshake, and authenticate.
    ///
    /// On any handshake failure the connection is closed before the error
    /// is returned; no half-constructed session escapes.
    pub async fn connect(config: Config, username: &str, password: &str) -> Result<Self> {
        let stream = dial_with_retry(
            &TcpDialer,
            &config.addr,
            config.connect_timeout,
            config.connect_retries,
        )
        .await?;

        let conn = Arc::new(TcpConn::from_stream(stream, config.timeseal, config.debug));

        match handshake(&conn, &config, username, password).await {
            Ok(username) => {
                let keepalive =
                    config.keep_alive.then(|| spawn_keepalive(Arc::clone(&conn)));
                Ok(Self { conn, config, username, keepalive })
            },
            Err(err) => {
                conn.close().await;
                Err(err)
            },
        }
    }

    /// The server-assigned session name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Send one command to the server.
    pub async fn send(&self, msg: &str) -> Result<()> {
        self.conn.write(msg).await
    }

    /// Receive the next batch of decoded events.
    ///
    /// Blocks until the server prompt arrives or the steady-state deadline
    /// elapses. A reply that cleans down to nothing yields an empty vec.
    pub async fn recv(&self) -> Result<Vec<Event>> {
        let out = self.conn.read_until(&self.config.ics_prompt, READ_DEADLINE).await?;
        Ok(decode_messages(&out))
    }

    /// Log out and tear the connection down.
    pub async fn destroy(mut self) {
        if let Some(task) = self.keepalive.take() {
            task.abort();
        }
        if let Err(err) = self.conn.write("exit").await {
            warn!(%err, "sending exit on teardown");
        }
        self.conn.close().await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("config", &self.config)
            .field("keepalive", &self.keepalive.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.keepalive.take() {
            task.abort();
        }
    }
}

async fn handshake<R, W>(
    conn: &Conn<R, W>,
    config: &Config,
    username: &str,
    password: &str,
) -> Result<String>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    if config.timeseal {
        conn.write(&config.timeseal_hello).await?;
    }
    login(conn, config, username, password).await
}

/// Send a no-op command on a fixed interval so the server does not idle the
/// connection out. Shares the session's serialized write path; stops on the
/// first failed write or when aborted.
fn spawn_keepalive<R, W>(conn: Arc<Conn<R, W>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
        ticker.tick().await; // the first tick fires immediately
        loop {
            ticker.tick().await;
            if conn.write("ping").await.is_err() {
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, DuplexStream, ReadHalf, WriteHalf};

    use super::*;

    type TestConn = Conn<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    fn conn_pair(timeseal: bool) -> (Arc<TestConn>, DuplexStream) {
        let (near, far) = tokio::io::duplex(4096);
        let (reader, writer) = tokio::io::split(near);
        (Arc::new(Conn::new(reader, writer, timeseal, false)), far)
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_pings_every_interval() {
        let (conn, mut server) = conn_pair(false);
        let task = spawn_keepalive(Arc::clone(&conn));

        tokio::time::advance(KEEPALIVE_INTERVAL).await;
        let mut ping = vec![0u8; 5];
        server.read_exact(&mut ping).await.unwrap();
        assert_eq!(ping, b"ping\n");

        tokio::time::advance(KEEPALIVE_INTERVAL).await;
        server.read_exact(&mut ping).await.unwrap();
        assert_eq!(ping, b"ping\n");

        task.abort();
    }

    #[tokio::test]
    async fn handshake_sends_hello_before_login_when_timeseal_is_on() {
        let (conn, mut server) = conn_pair(true);
        let config = Config { timeseal: true, ..Config::default() };

        let task = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { handshake(&conn, &config, "guest", "").await })
        };

        // The hello frame arrives encoded, before any prompt was served.
        let mut byte = [0u8; 1];
        server.read_exact(&mut byte).await.unwrap();

        task.abort();
        let _ = task.await;
    }
}
