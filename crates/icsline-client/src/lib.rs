//! Retrying, deadline-bounded session layer for ICS servers.
//!
//! This crate owns all the I/O of the client engine: dialing with retry,
//! the prompt-scanned frame reader, the login handshake, and the
//! [`Session`] the embedding application talks to. The pure protocol
//! pieces (Timeseal codec, message decoder) live in `icsline-proto`.
//!
//! # Concurrency model
//!
//! One connection supports exactly one foreground consumer calling
//! [`Session::recv`] in a loop, plus an optional background keepalive
//! ticker. Reads are strictly sequential; every write (application send,
//! keepalive ping, Timeseal ack) funnels through one serialized write
//! path. Cancellation is deadline- and close-driven only.
//!
//! # Example
//!
//! ```no_run
//! use icsline_client::{Config, Session};
//!
//! # async fn run() -> Result<(), icsline_client::Error> {
//! let session = Session::connect(Config::default(), "guest", "").await?;
//! session.send("set style 12").await?;
//! loop {
//!     for event in session.recv().await? {
//!         println!("{event:?}");
//!     }
//! }
//! # }
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod conn;
pub mod error;
pub mod login;
pub mod session;
pub mod transport;

pub use config::Config;
pub use conn::{Conn, TcpConn};
pub use error::{Error, Result};
pub use icsline_proto::{Event, GameEndReason};
pub use session::Session;
pub use transport::{Dialer, TcpDialer, dial_with_retry};
