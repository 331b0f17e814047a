//! Style12 rank transliteration.
//!
//! Style12 board lines spell each rank as eight characters, one per square,
//! with `-` for an empty square. FEN instead run-length-encodes runs of
//! empty squares. Only the reformatting lives here; no move validation.

/// Transliterate one Style12 rank into its FEN form.
///
/// Consecutive `-` characters collapse into their count; every other
/// character is copied verbatim. `"--p-----"` becomes `"2p5"`.
pub fn rank_to_fen(rank: &str) -> String {
    let mut fen = String::with_capacity(rank.len());
    let mut empty = 0u32;
    for c in rank.chars() {
        if c == '-' {
            empty += 1;
        } else {
            if empty > 0 {
                fen.push_str(&empty.to_string());
                empty = 0;
            }
            fen.push(c);
        }
    }
    if empty > 0 {
        fen.push_str(&empty.to_string());
    }
    fen
}
