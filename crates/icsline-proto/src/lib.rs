//! Wire codec and message decoder for the ICS line protocol.
//!
//! Internet chess servers speak a telnet-era free-text protocol: the client
//! sends newline-terminated commands, the server answers with unstructured
//! text terminated by a prompt. This crate holds the two pure pieces of
//! that exchange:
//!
//! - [`timeseal`]: the byte obfuscation some servers require on every
//!   outgoing message, plus recognition of the inbound keep-alive marker.
//! - [`decode`]: an ordered classifier that turns a cleaned chunk of
//!   server output into typed [`Event`] values (board updates, game
//!   lifecycle, chat).
//!
//! Everything here is I/O-free and deterministic (the Timeseal transform
//! takes its timestamp as a parameter), so the whole crate is testable
//! without a connection. The I/O layer lives in `icsline-client`.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod decode;
pub mod event;
pub mod style12;
pub mod timeseal;

pub use decode::decode_messages;
pub use event::{Event, GameEndReason};
