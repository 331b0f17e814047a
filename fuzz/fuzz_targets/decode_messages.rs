//! Decoding is total: arbitrary server text must classify without panics.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = icsline_proto::decode_messages(text);
    }
});
