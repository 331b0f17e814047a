//! Prompt-driven login handshake.
//!
//! Login is a one-shot negotiation of free-text prompts, run once per
//! connection before a session exists:
//!
//! ```text
//! await user prompt -> send username -> await password prompt or guest
//! banner -> send password or empty line -> await "****\n" banner
//! [-> collision: one more banner read] -> extract session name
//! ```
//!
//! Guests have no passwords: any login as `"guest"` (or with an empty
//! password) takes the press-return branch. Logging into an account that is
//! already connected makes the server kick the other session and print a
//! second banner; that collision is retried exactly once.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::info;

use crate::config::Config;
use crate::conn::Conn;
use crate::error::{Error, Result};

/// Deadline for each handshake read.
const LOGIN_DEADLINE: Duration = Duration::from_secs(10);

/// Banner fragment shown to guests instead of a password prompt.
const GUEST_PROMPT: &str = "Press return to enter the server as";

/// Delimiter ending both the kick notice and the session banner.
const BANNER_MARK: &str = "****\n";

#[allow(clippy::expect_used)]
static SESSION_BANNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*\*\* Starting FICS session as ([a-zA-Z]+)(?:\(U\))? \*\*\*\*")
        .expect("valid pattern")
});

#[allow(clippy::expect_used)]
static KICK_NOTICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"already logged in.*kicking them out").expect("valid pattern")
});

/// Run the login handshake on a fresh connection.
///
/// Returns the server-assigned session name, which may differ in case or
/// suffix from the requested `username`. Fails with
/// [`Error::LoginSession`] when a prompt never arrives, with
/// [`Error::Authentication`] when the banner never arrives, and with
/// [`Error::InvalidPassword`] when the banner arrives but announces no
/// session.
pub async fn login<R, W>(
    conn: &Conn<R, W>,
    config: &Config,
    username: &str,
    password: &str,
) -> Result<String>
where
    R: tokio::io::AsyncRead + Unpin + Send,
    W: tokio::io::AsyncWrite + Unpin + Send,
{
    conn.read_until(&config.user_prompt, LOGIN_DEADLINE)
        .await
        .map_err(|err| session_err(username, err))?;

    conn.write(username).await.map_err(|err| session_err(username, err))?;

    // Guests have no passwords.
    let (next_prompt, secret) = if username != "guest" && !password.is_empty() {
        (config.password_prompt.as_str(), password)
    } else {
        (GUEST_PROMPT, "")
    };

    conn.read_until(next_prompt, LOGIN_DEADLINE)
        .await
        .map_err(|err| session_err(username, err))?;

    conn.write(secret).await.map_err(|err| session_err(username, err))?;

    let mut banner = conn
        .read_until_raw(BANNER_MARK, LOGIN_DEADLINE)
        .await
        .map_err(|err| auth_err(username, err))?;

    // The server kicked a previous session for this account; the real
    // banner follows. At most one retry.
    if KICK_NOTICE.is_match(&banner) {
        banner = conn
            .read_until_raw(BANNER_MARK, LOGIN_DEADLINE)
            .await
            .map_err(|err| auth_err(username, err))?;
    }

    match SESSION_BANNER.captures(&banner).and_then(|caps| caps.get(1)) {
        Some(name) => {
            let name = name.as_str().to_string();
            info!(user = %name, "logged in");
            Ok(name)
        },
        None => Err(Error::InvalidPassword { user: username.to_string() }),
    }
}

fn session_err(user: &str, err: Error) -> Error {
    Error::LoginSession { user: user.to_string(), source: Box::new(err) }
}

fn auth_err(user: &str, err: Error) -> Error {
    Error::Authentication { user: user.to_string(), source: Box::new(err) }
}
