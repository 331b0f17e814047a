//! Typed events decoded from server output.

use serde::{Deserialize, Serialize};

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEndReason {
    /// No recognized end action.
    Unknown,
    /// A player resigned.
    Resign,
    /// A player forfeited by disconnection.
    Disconnect,
    /// A player was checkmated.
    Checkmate,
    /// A player ran out of time.
    TimeForfeit,
    /// The game was drawn.
    Draw,
    /// The game was adjourned.
    Adjourn,
    /// The game was aborted.
    Abort,
}

/// One decoded server event.
///
/// Decoding never fails: output that matches no specific pattern degrades to
/// [`Event::Message`] carrying the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A Style12 board update for a game this session observes or plays.
    GameMove {
        /// Board position, eight `/`-joined FEN ranks.
        fen: String,
        /// Side to move, `"W"` or `"B"`.
        turn: String,
        /// Server-assigned game number.
        game_id: u32,
        /// White player's handle.
        white_name: String,
        /// Black player's handle.
        black_name: String,
        /// Relation of this session to the game (playing, observing, ...).
        role: i32,
        /// Initial clock in minutes.
        time: u32,
        /// Increment per move in seconds.
        inc: u32,
        /// White's remaining time in seconds; negative after a flag fall.
        white_time: i32,
        /// Black's remaining time in seconds; negative after a flag fall.
        black_time: i32,
        /// Move number about to be played.
        move_no: u32,
        /// The previous move in SAN-like notation.
        move_text: String,
    },

    /// A game was created.
    GameStart {
        /// Server-assigned game number.
        game_id: u32,
        /// First named player.
        player_one: String,
        /// Second named player.
        player_two: String,
    },

    /// A game ended.
    GameEnd {
        /// Server-assigned game number.
        game_id: u32,
        /// Winning handle; equal to `player_one` when there is no winner.
        winner: String,
        /// Losing handle; equal to `player_two` when there is no loser.
        loser: String,
        /// Classified end reason.
        reason: GameEndReason,
        /// The raw server text the classification came from.
        message: String,
    },

    /// A message addressed to a channel, or a kibitz/whisper rendered with a
    /// synthetic `"Game <id>"` channel.
    ChannelTell {
        /// Channel identifier.
        channel: String,
        /// Speaker's handle.
        user: String,
        /// Message text.
        message: String,
    },

    /// A message addressed directly to this session.
    PrivateTell {
        /// Speaker's handle.
        user: String,
        /// Message text.
        message: String,
    },

    /// Anything that matched no specific pattern.
    Message {
        /// The cleaned server text.
        text: String,
    },
}
