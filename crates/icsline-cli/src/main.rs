//! Minimal interactive ICS client.
//!
//! Connects a session, forwards stdin lines as commands, and prints every
//! decoded event as one JSON line. Useful for poking at a server and for
//! verifying the protocol stack end to end.

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use icsline_client::{Config, Error, Session};

#[derive(Debug, Parser)]
#[command(name = "icsline", about = "Line-oriented ICS client")]
struct Args {
    /// Server address, host:port.
    #[arg(long, default_value = "freechess.org:5000")]
    addr: String,

    /// Username to log in as; guests need no password.
    #[arg(long, default_value = "guest")]
    user: String,

    /// Password for registered accounts.
    #[arg(long, default_value = "")]
    password: String,

    /// Disable the Timeseal obfuscation on outgoing messages.
    #[arg(long)]
    no_timeseal: bool,

    /// Send a periodic no-op so the server does not idle us out.
    #[arg(long)]
    keep_alive: bool,

    /// Log raw bytes in both directions.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config {
        addr: args.addr,
        timeseal: !args.no_timeseal,
        keep_alive: args.keep_alive,
        debug: args.debug,
        ..Config::default()
    };

    let session = Session::connect(config, &args.user, &args.password).await?;
    println!("logged in as {}", session.username());

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            events = session.recv() => match events {
                Ok(events) => {
                    for event in events {
                        match serde_json::to_string(&event) {
                            Ok(json) => println!("{json}"),
                            Err(err) => error!(%err, "serializing event"),
                        }
                    }
                },
                Err(err) => {
                    error!(%err, "connection lost");
                    break;
                },
            },
            line = stdin.next_line() => match line {
                Ok(Some(line)) => {
                    if let Err(err) = session.send(&line).await {
                        error!(%err, "sending command");
                        break;
                    }
                },
                // Stdin closed; log out cleanly.
                Ok(None) | Err(_) => break,
            },
        }
    }

    session.destroy().await;
    Ok(())
}
