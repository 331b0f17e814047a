//! Timeseal byte obfuscation.
//!
//! Timeseal is the anti-abuse scheme some ICS servers mandate before they
//! accept moves from a client. It is an obfuscation, not cryptography: every
//! outgoing message is stamped with the client's wall clock, padded, shuffled
//! and XOR-masked with a fixed key. The server uses the embedded timestamps
//! to measure network lag and to gate out trivial clients.
//!
//! # Frame layout
//!
//! ```text
//! payload · 0x18 · ASCII ms timestamp · 0x19 · 0x31 padding   (multiple of 12)
//! └──────────────── swapped + masked ────────────────────┘ · 0x80 · 0x0a
//! ```
//!
//! Per 12-byte block the byte pairs 0↔11, 2↔9 and 4↔7 are swapped, then every
//! byte at absolute index `n` becomes `((b | 0x80) ^ KEY[n % 50]) - 32` with
//! wrapping arithmetic. The trailer bytes are appended unmasked.
//!
//! There is no inbound decode. The only inbound artifact is the 4-byte
//! keep-alive marker [`PING_MARKER`], which must be removed from the stream
//! and answered with [`PING_REPLY`] sent back through [`encode`].

use std::time::{SystemTime, UNIX_EPOCH};

const KEY: &[u8; 50] = b"Timestamp (FICS) v1.0 - programmed by Henrik Gram.";

/// Inbound keep-alive marker (`[G]\0`). The server embeds this in its output
/// and expects each occurrence to be acknowledged.
pub const PING_MARKER: [u8; 4] = [b'[', b'G', b']', 0x00];

/// Acknowledgment payload for one [`PING_MARKER`], sent through the normal
/// encode path.
pub const PING_REPLY: [u8; 2] = [0x02, 0x39];

/// Identification banner sent once after connecting, before login, when
/// Timeseal is enabled on the connection.
pub const HELLO: &str = "TIMESEAL2|freeseal|icsline|";

/// Encode `payload` with the current wall clock.
///
/// See [`encode_at`] for the deterministic variant.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let unix_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    encode_at(payload, unix_ms)
}

/// Encode `payload`, stamping it with `unix_ms` (Unix time in milliseconds).
///
/// Pure function of its inputs; always succeeds. The output length is the
/// padded body (a multiple of 12) plus the 2-byte trailer.
pub fn encode_at(payload: &[u8], unix_ms: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 30);
    buf.extend_from_slice(payload);
    buf.push(0x18);
    buf.extend_from_slice(unix_ms.to_string().as_bytes());
    buf.push(0x19);
    while buf.len() % 12 != 0 {
        buf.push(0x31);
    }

    for block in buf.chunks_exact_mut(12) {
        block.swap(0, 11);
        block.swap(2, 9);
        block.swap(4, 7);
    }

    for (n, b) in buf.iter_mut().enumerate() {
        *b = ((*b | 0x80) ^ KEY[n % 50]).wrapping_sub(32);
    }

    buf.push(0x80);
    buf.push(0x0a);
    buf
}

/// Remove every [`PING_MARKER`] from `data`.
///
/// Returns the scrubbed bytes and the number of markers removed; the caller
/// must answer each one with [`PING_REPLY`]. Removal rescans from the start,
/// so a marker formed by the bytes around an excised one is caught too.
pub fn scrub_pings(data: &[u8]) -> (Vec<u8>, usize) {
    let mut buf = data.to_vec();
    let mut pings = 0;
    while let Some(i) = find_marker(&buf) {
        buf.drain(i..i + PING_MARKER.len());
        pings += 1;
    }
    (buf, pings)
}

fn find_marker(buf: &[u8]) -> Option<usize> {
    buf.windows(PING_MARKER.len()).position(|w| w == PING_MARKER)
}
