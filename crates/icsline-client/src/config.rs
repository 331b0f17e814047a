//! Connection configuration.

use std::time::Duration;

use icsline_proto::timeseal;

/// Configuration consumed by [`crate::Session::connect`].
///
/// One flat struct; every field has a working default, so callers only
/// override what they care about:
///
/// ```
/// use icsline_client::Config;
///
/// let config = Config { addr: "127.0.0.1:5000".to_string(), ..Config::default() };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Server address, `host:port`.
    pub addr: String,
    /// Prompt the server shows when it wants a username.
    pub user_prompt: String,
    /// Prompt the server shows when it wants a password.
    pub password_prompt: String,
    /// End-of-response prompt terminating every server reply.
    pub ics_prompt: String,
    /// Identification banner sent before login when Timeseal is enabled.
    pub timeseal_hello: String,
    /// Timeout for the first dial attempt; grows 1.5x per failed attempt.
    pub connect_timeout: Duration,
    /// How many dial attempts to make before giving up.
    pub connect_retries: u32,
    /// Send a periodic no-op command so the server does not idle us out.
    pub keep_alive: bool,
    /// Obfuscate outgoing messages with the Timeseal codec.
    pub timeseal: bool,
    /// Log raw bytes in both directions.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "freechess.org:5000".to_string(),
            user_prompt: "login:".to_string(),
            password_prompt: "password:".to_string(),
            ics_prompt: "fics%".to_string(),
            timeseal_hello: timeseal::HELLO.to_string(),
            connect_timeout: Duration::from_secs(2),
            connect_retries: 5,
            keep_alive: false,
            timeseal: true,
            debug: false,
        }
    }
}
