//! Marker scrubbing must terminate and never grow the buffer.

#![no_main]

use libfuzzer_sys::fuzz_target;

use icsline_proto::timeseal::{PING_MARKER, scrub_pings};

fuzz_target!(|data: &[u8]| {
    let (clean, pings) = scrub_pings(data);
    assert!(clean.len() + pings * PING_MARKER.len() <= data.len());
    assert!(!clean.windows(PING_MARKER.len()).any(|w| w == PING_MARKER));
});
