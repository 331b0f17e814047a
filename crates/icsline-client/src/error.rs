//! Client error types.

use std::io;

use thiserror::Error;

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while connecting to, authenticating with, or talking to
/// an ICS server.
///
/// Everything here is terminal for the session it occurred on: retry policy
/// beyond the dial phase belongs to the embedding application.
#[derive(Debug, Error)]
pub enum Error {
    /// Every dial attempt was exhausted without establishing a connection.
    #[error("connecting to server {addr} after {attempts} attempts: {source}")]
    Connect {
        /// The remote address that was dialed.
        addr: String,
        /// How many attempts were made.
        attempts: u32,
        /// The error from the last attempt.
        #[source]
        source: io::Error,
    },

    /// An expected login prompt never arrived.
    #[error("creating new login session for {user}: {source}")]
    LoginSession {
        /// The username being logged in.
        user: String,
        /// What went wrong while waiting.
        #[source]
        source: Box<Error>,
    },

    /// The post-login banner never arrived.
    #[error("failed authentication for {user}: {source}")]
    Authentication {
        /// The username being logged in.
        user: String,
        /// What went wrong while waiting.
        #[source]
        source: Box<Error>,
    },

    /// The banner arrived but did not announce a session: the server
    /// rejected the credentials without any transport error.
    #[error("invalid password for {user}")]
    InvalidPassword {
        /// The username that was rejected.
        user: String,
    },

    /// A read or write deadline elapsed.
    #[error("timed out waiting for {waiting_for:?}")]
    Timeout {
        /// The prompt (or operation) that was being waited on.
        waiting_for: String,
    },

    /// The underlying transport failed or the peer closed the connection.
    #[error(transparent)]
    Io(#[from] io::Error),
}
