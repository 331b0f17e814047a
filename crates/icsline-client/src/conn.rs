//! Deadline-bounded connection and frame reading.
//!
//! One [`Conn`] owns one live stream. Reads scan for a delimiter (the
//! server terminates every reply with a prompt string) and scrub the
//! protocol noise a telnet-era server leaves in its output. Writes go
//! through the Timeseal encoder when the connection has it enabled.
//!
//! The reader and writer halves sit behind separate async mutexes. Reads
//! are strictly sequential anyway (one foreground consumer), but writes
//! arrive from three uncoordinated places (application sends, the
//! keepalive ticker, Timeseal acks) and must never interleave mid-frame,
//! so every write path funnels through the one writer lock.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use icsline_proto::timeseal;

use crate::error::{Error, Result};

/// Deadline applied to every write.
const WRITE_DEADLINE: Duration = Duration::from_secs(20);

/// One live connection to an ICS server.
pub struct Conn<R, W> {
    reader: Mutex<ReadState<R>>,
    writer: Mutex<W>,
    shutdown: AtomicBool,
    closed: Notify,
    timeseal: bool,
    debug: bool,
}

struct ReadState<R> {
    stream: R,
    buf: BytesMut,
}

/// Connection over a split TCP stream.
pub type TcpConn = Conn<ReadHalf<TcpStream>, WriteHalf<TcpStream>>;

impl TcpConn {
    /// Wrap a connected TCP stream.
    pub fn from_stream(stream: TcpStream, timeseal: bool, debug: bool) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer, timeseal, debug)
    }
}

impl<R, W> Conn<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Build a connection from separate read and write halves.
    pub fn new(reader: R, writer: W, timeseal: bool, debug: bool) -> Self {
        Self {
            reader: Mutex::new(ReadState { stream: reader, buf: BytesMut::with_capacity(4096) }),
            writer: Mutex::new(writer),
            shutdown: AtomicBool::new(false),
            closed: Notify::new(),
            timeseal,
            debug,
        }
    }

    /// Read until `prompt` appears, clean the result, and strip the prompt
    /// itself. Empty output after cleaning is `Ok`, not an error.
    ///
    /// A deadline overrun is [`Error::Timeout`]; callers treat it as fatal
    /// for the connection.
    pub async fn read_until(&self, prompt: &str, deadline: Duration) -> Result<String> {
        self.read_until_inner(prompt, deadline, true).await
    }

    /// Like [`Conn::read_until`] but keeps the delimiter in the returned
    /// text, for callers that need to inspect it (the login banner carries
    /// its delimiter inside the text being matched).
    pub async fn read_until_raw(&self, prompt: &str, deadline: Duration) -> Result<String> {
        self.read_until_inner(prompt, deadline, false).await
    }

    async fn read_until_inner(
        &self,
        prompt: &str,
        deadline: Duration,
        strip_prompt: bool,
    ) -> Result<String> {
        let raw = match tokio::time::timeout(deadline, self.fill_until(prompt)).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::Timeout { waiting_for: prompt.to_string() }),
        };

        if self.debug {
            debug!("< {}", String::from_utf8_lossy(&raw));
        }

        let raw = if self.timeseal {
            let (scrubbed, pings) = timeseal::scrub_pings(&raw);
            for _ in 0..pings {
                self.send_payload(&timeseal::PING_REPLY).await?;
            }
            scrubbed
        } else {
            raw
        };

        Ok(clean(&raw, prompt, strip_prompt))
    }

    /// Accumulate stream data until `prompt` is present, consuming through
    /// its end. Bytes past the prompt stay buffered for the next read.
    ///
    /// Unblocks with an error as soon as [`Conn::close`] runs, without
    /// waiting for the peer to acknowledge the shutdown.
    async fn fill_until(&self, prompt: &str) -> Result<Vec<u8>> {
        let mut guard = self.reader.lock().await;
        let ReadState { stream, buf } = &mut *guard;
        let needle = prompt.as_bytes();

        loop {
            // Register for the close signal before checking the flag, so a
            // close landing between the check and the select is not missed.
            let closed = self.closed.notified();
            if self.shutdown.load(Ordering::Acquire) {
                return Err(closed_error());
            }
            if let Some(pos) = find(buf, needle) {
                let frame = buf.split_to(pos + needle.len());
                return Ok(frame.to_vec());
            }

            tokio::select! {
                read = stream.read_buf(buf) => {
                    if read? == 0 {
                        return Err(Error::Io(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "connection closed by server",
                        )));
                    }
                },
                () = closed => return Err(closed_error()),
            }
        }
    }

    /// Send one application message.
    ///
    /// With Timeseal enabled the message is encoded (the control framing
    /// substitutes for a newline); otherwise a newline is appended.
    pub async fn write(&self, msg: &str) -> Result<()> {
        self.send_payload(msg.as_bytes()).await
    }

    async fn send_payload(&self, payload: &[u8]) -> Result<()> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(closed_error());
        }
        if self.debug {
            debug!("> {}", String::from_utf8_lossy(payload));
        }

        let frame = if self.timeseal {
            timeseal::encode(payload)
        } else {
            let mut frame = Vec::with_capacity(payload.len() + 1);
            frame.extend_from_slice(payload);
            frame.push(b'\n');
            frame
        };

        let mut writer = self.writer.lock().await;
        let write = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        };
        match tokio::time::timeout(WRITE_DEADLINE, write).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Timeout { waiting_for: "write completion".to_string() }),
        }
    }

    /// Close the connection: unblock any pending read immediately and shut
    /// down the write half. Every later read or write fails.
    pub async fn close(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.closed.notify_waiters();
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

fn closed_error() -> Error {
    Error::Io(io::Error::new(io::ErrorKind::NotConnected, "connection closed"))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Strip the artifacts a telnet-era server leaves in its output: bell
/// characters, NULs, the `"\   "` wrap artifact, carriage returns, and
/// usually the prompt itself.
fn clean(raw: &[u8], prompt: &str, strip_prompt: bool) -> String {
    let text = String::from_utf8_lossy(raw)
        .replace('\u{0007}', "")
        .replace('\0', "")
        .replace("\\   ", "")
        .replace('\r', "");
    let text = if strip_prompt { text.replace(prompt, "") } else { text };
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    use super::*;

    type TestConn = Conn<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    fn conn_pair(timeseal: bool) -> (TestConn, DuplexStream) {
        let (near, far) = tokio::io::duplex(4096);
        let (reader, writer) = tokio::io::split(near);
        (Conn::new(reader, writer, timeseal, false), far)
    }

    #[tokio::test]
    async fn read_until_cleans_noise_and_strips_prompt() {
        let (conn, mut server) = conn_pair(false);
        server.write_all(b"\x07you have\0 arrived\\   \r\nfics% ").await.unwrap();

        let out = conn.read_until("fics%", Duration::from_secs(5)).await.unwrap();
        assert_eq!(out, "you have arrived");
    }

    #[tokio::test]
    async fn read_until_raw_keeps_the_delimiter() {
        let (conn, mut server) = conn_pair(false);
        server.write_all(b"**** Starting session ****\n").await.unwrap();

        let out = conn.read_until_raw("****\n", Duration::from_secs(5)).await.unwrap();
        assert_eq!(out, "**** Starting session ****");
    }

    #[tokio::test]
    async fn bytes_past_the_prompt_stay_for_the_next_read() {
        let (conn, mut server) = conn_pair(false);
        server.write_all(b"first\nfics% second\nfics% ").await.unwrap();

        let first = conn.read_until("fics%", Duration::from_secs(5)).await.unwrap();
        let second = conn.read_until("fics%", Duration::from_secs(5)).await.unwrap();
        assert_eq!(first, "first");
        assert_eq!(second, "second");
    }

    #[tokio::test]
    async fn ping_markers_are_scrubbed_and_acknowledged() {
        let (conn, mut server) = conn_pair(true);

        let mut payload = Vec::new();
        payload.extend_from_slice(&timeseal::PING_MARKER);
        payload.extend_from_slice(b"hello\nfics% ");
        server.write_all(&payload).await.unwrap();

        let out = conn.read_until("fics%", Duration::from_secs(5)).await.unwrap();
        assert_eq!(out, "hello");

        // One encoded ack frame: 2-byte payload + stamp, padded to 24, plus
        // the 2-byte trailer.
        let mut ack = vec![0u8; 26];
        server.read_exact(&mut ack).await.unwrap();
        assert_eq!(&ack[24..], &[0x80, 0x0a]);
    }

    #[tokio::test]
    async fn write_appends_newline_without_timeseal() {
        let (conn, mut server) = conn_pair(false);

        conn.write("hello").await.unwrap();

        let mut got = vec![0u8; 6];
        server.read_exact(&mut got).await.unwrap();
        assert_eq!(got, b"hello\n");
    }

    #[tokio::test]
    async fn write_encodes_with_timeseal() {
        let (conn, mut server) = conn_pair(true);

        conn.write("ping").await.unwrap();

        let mut frame = vec![0u8; 26];
        server.read_exact(&mut frame).await.unwrap();
        assert_eq!(&frame[24..], &[0x80, 0x0a]);
        assert!(!frame.starts_with(b"ping"));
    }

    #[tokio::test(start_paused = true)]
    async fn read_deadline_overrun_is_a_timeout_error() {
        let (conn, _server) = conn_pair(false);

        let err = conn.read_until("fics%", Duration::from_secs(10)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { waiting_for } if waiting_for == "fics%"));
    }

    #[tokio::test]
    async fn close_unblocks_a_pending_read() {
        let (conn, _server) = conn_pair(false);
        let conn = std::sync::Arc::new(conn);

        let reader = {
            let conn = std::sync::Arc::clone(&conn);
            tokio::spawn(async move { conn.read_until("fics%", Duration::from_secs(30)).await })
        };
        tokio::task::yield_now().await;
        conn.close().await;

        let err = reader.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        let err = conn.write("too late").await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn peer_close_surfaces_as_io_error() {
        let (conn, server) = conn_pair(false);
        drop(server);

        let err = conn.read_until("fics%", Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn concurrent_writers_never_interleave_frames() {
        let (conn, mut server) = conn_pair(false);
        let conn = std::sync::Arc::new(conn);

        let messages: Vec<String> = (0..10).map(|i| format!("message number {i}")).collect();
        let mut tasks = Vec::new();
        for msg in messages.clone() {
            let conn = std::sync::Arc::clone(&conn);
            tasks.push(tokio::spawn(async move { conn.write(&msg).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let total: usize = messages.iter().map(|m| m.len() + 1).sum();
        let mut received = vec![0u8; total];
        server.read_exact(&mut received).await.unwrap();

        let received = String::from_utf8(received).unwrap();
        let mut lines: Vec<&str> = received.lines().collect();
        lines.sort_unstable();
        let mut expected: Vec<&str> = messages.iter().map(String::as_str).collect();
        expected.sort_unstable();
        assert_eq!(lines, expected);
    }
}
