//! Dialing with retry.
//!
//! ICS servers are long-lived boxes behind flaky home-ISP routes; the
//! original clients all retried the initial dial with a growing timeout.
//! The dialer itself sits behind a trait so tests can inject failures
//! without touching a socket.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::info;

use crate::error::{Error, Result};

/// Growth factor applied to the dial timeout after each failed attempt.
const TIMEOUT_GROWTH: f64 = 1.5;

/// Connects a byte stream to a remote address within a deadline.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// The stream produced on success.
    type Stream: Send;

    /// Make one connection attempt, bounded by `timeout`.
    async fn connect(&self, addr: &str, timeout: Duration) -> io::Result<Self::Stream>;
}

/// Production dialer backed by tokio TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn connect(&self, addr: &str, timeout: Duration) -> io::Result<TcpStream> {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")),
        }
    }
}

/// Dial `addr` up to `retries` times.
///
/// Attempt `k` uses `timeout * 1.5^(k-1)`. Returns the stream from the
/// first successful attempt, or [`Error::Connect`] wrapping the last
/// failure once every attempt is spent.
pub async fn dial_with_retry<D: Dialer>(
    dialer: &D,
    addr: &str,
    mut timeout: Duration,
    retries: u32,
) -> Result<D::Stream> {
    let mut last_err = io::Error::other("no connection attempts were made");

    for attempt in 1..=retries {
        info!(addr, attempt, retries, "connecting to ICS server");
        match dialer.connect(addr, timeout).await {
            Ok(stream) => {
                info!(addr, attempt, "connected to ICS server");
                return Ok(stream);
            },
            Err(err) => {
                last_err = err;
                timeout = timeout.mul_f64(TIMEOUT_GROWTH);
            },
        }
    }

    Err(Error::Connect { addr: addr.to_string(), attempts: retries, source: last_err })
}
