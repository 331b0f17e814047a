//! Ordered classification of server output into [`Event`]s.
//!
//! The server interleaves everything on one text stream: board updates,
//! game lifecycle notices, channel chatter, private tells, news, ads. This
//! module classifies one cleaned chunk of that stream. Pattern order is
//! significant: some inputs satisfy more than one of the weaker patterns,
//! so the first match wins and the order below must not be reshuffled.
//!
//! Classification is total: a chunk that matches nothing becomes a generic
//! [`Event::Message`], never an error. The pattern set is immutable and
//! shared process-wide.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::event::{Event, GameEndReason};
use crate::style12::rank_to_fen;

// Patterns are fixed at compile time; `pattern_set_compiles` forces them all.
#[allow(clippy::expect_used)]
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("valid pattern")
}

// <12> rnbqkb-r pppppppp -----n-- -------- ----P--- -------- PPPPKPPP RNBQ-BNR
//   B -1 0 0 1 1 0 7 Newton Einstein 1 2 12 39 39 119 122 2 K/e1-e2 (0:06) Ke2 0 1 0
static GAME_MOVE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"<12>\s([rnbqkpRNBQKP\-]{8})\s([rnbqkpRNBQKP\-]{8})\s([rnbqkpRNBQKP\-]{8})\s([rnbqkpRNBQKP\-]{8})\s([rnbqkpRNBQKP\-]{8})\s([rnbqkpRNBQKP\-]{8})\s([rnbqkpRNBQKP\-]{8})\s([rnbqkpRNBQKP\-]{8})\s([BW\-])\s(?:\-?[0-7])\s(?:[01])\s(?:[01])\s(?:[01])\s(?:[01])\s(?:[0-9]+)\s([0-9]+)\s([a-zA-Z]+)\s([a-zA-Z]+)\s(\-?[0-3])\s([0-9]+)\s([0-9]+)\s(?:[0-9]+)\s(?:[0-9]+)\s(\-?[0-9]+)\s(\-?[0-9]+)\s([0-9]+)\s(?:\S+)\s\((?:[0-9]+)\:(?:[0-9]+)\)\s(\S+)\s(?:[01])\s(?:[0-9]+)\s(?:[0-9]+)\s*",
    )
});

// {Game 117 (GuestMDPS vs. guestl) Creating unrated blitz match.}
static GAME_START: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?s)^\s*\{Game\s([0-9]+)\s\(([a-zA-Z]+)\svs\.\s([a-zA-Z]+)\)\sCreating.*\}.*")
});

// {Game 117 (GuestMDPS vs. guestl) GuestMDPS resigns} 0-1
static GAME_END: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"(?s)^[^\(\):]*(?:Game\s[0-9]+:.*)?\{Game\s([0-9]+)\s\(([a-zA-Z]+)\svs\.\s([a-zA-Z]+)\)\s([a-zA-Z]+)\s([a-zA-Z0-9\s]+)\}\s(?:[012/]+-[012/]+)?.*",
    )
});

// hawk(50): good game
static CHANNEL_TELL: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?s)^([a-zA-Z]+)(?:\([A-Z\*]+\))*\(([0-9]+)\):\s+(.*)"));

// hawk tells you: hello
static PRIVATE_TELL: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?s)^([a-zA-Z]+)(?:[\(\[][A-Z0-9\*\-]+[\)\]])* (?:tells you|says):\s+(.*)")
});

// hawk[73] kibitzes: nice sac
static KIBITZ: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?s)^([a-zA-Z]+)(?:\([A-Z0-9\*\-]+\))*\[([0-9]+)\] (?:kibitzes|whispers):\s+(.*)")
});

// (told GuestXYZ, who is playing) - informational echo, carries no event
static TOLD_ECHO: LazyLock<Regex> = LazyLock::new(|| pattern(r"\((?:told|kibitzed) .+\)"));

/// Decode one cleaned chunk of server output into zero or more events.
///
/// Empty and whitespace-only input yields no events. A chunk holding several
/// lines where one is a board update is split and each non-empty line is
/// classified on its own, preserving stream order.
pub fn decode_messages(input: &str) -> Vec<Event> {
    let text = TOLD_ECHO.replace_all(input, "");
    let text = text.as_ref();
    if text.trim().is_empty() {
        return Vec::new();
    }

    // Server bursts interleave a board update with other lines; classify
    // line by line so each one lands on its own pattern. Iterative rather
    // than recursive, single lines cannot split again.
    if GAME_MOVE.is_match(text) {
        let lines: Vec<&str> = text.split('\n').filter(|l| !l.trim().is_empty()).collect();
        if lines.len() > 1 {
            return lines.into_iter().flat_map(decode_chunk).collect();
        }
    }

    decode_chunk(text)
}

fn decode_chunk(text: &str) -> Vec<Event> {
    let decoded = decode_game_move(text)
        .or_else(|| decode_game_start(text))
        .or_else(|| decode_game_end(text))
        .or_else(|| decode_channel_tell(text))
        .or_else(|| decode_private_tell(text))
        .or_else(|| decode_kibitz(text));

    match decoded {
        Some(event) => vec![event],
        None => vec![Event::Message { text: text.to_string() }],
    }
}

fn decode_game_move(text: &str) -> Option<Event> {
    let caps = GAME_MOVE.captures(text)?;

    let mut fen = String::new();
    for i in 1..=8 {
        if i > 1 {
            fen.push('/');
        }
        fen.push_str(&rank_to_fen(group(&caps, i)?));
    }

    Some(Event::GameMove {
        fen,
        turn: group(&caps, 9)?.to_string(),
        game_id: num(&caps, 10),
        white_name: group(&caps, 11)?.to_string(),
        black_name: group(&caps, 12)?.to_string(),
        role: num(&caps, 13),
        time: num(&caps, 14),
        inc: num(&caps, 15),
        white_time: num(&caps, 16),
        black_time: num(&caps, 17),
        move_no: num(&caps, 18),
        move_text: group(&caps, 19)?.to_string(),
    })
}

fn decode_game_start(text: &str) -> Option<Event> {
    let caps = GAME_START.captures(text)?;
    Some(Event::GameStart {
        game_id: num(&caps, 1),
        player_one: group(&caps, 2)?.to_string(),
        player_two: group(&caps, 3)?.to_string(),
    })
}

fn decode_game_end(text: &str) -> Option<Event> {
    let caps = GAME_END.captures(text)?;
    let p1 = group(&caps, 2)?;
    let p2 = group(&caps, 3)?;
    let actor = group(&caps, 4)?;
    let action = group(&caps, 5)?;

    let (winner, loser, reason) = game_result(p1, p2, actor, action);
    Some(Event::GameEnd {
        game_id: num(&caps, 1),
        winner,
        loser,
        reason,
        message: text.to_string(),
    })
}

fn decode_channel_tell(text: &str) -> Option<Event> {
    let caps = CHANNEL_TELL.captures(text)?;
    Some(Event::ChannelTell {
        channel: group(&caps, 2)?.to_string(),
        user: group(&caps, 1)?.to_string(),
        message: group(&caps, 3)?.replace('\n', ""),
    })
}

fn decode_private_tell(text: &str) -> Option<Event> {
    let caps = PRIVATE_TELL.captures(text)?;
    Some(Event::PrivateTell {
        user: group(&caps, 1)?.to_string(),
        message: group(&caps, 2)?.replace('\n', ""),
    })
}

fn decode_kibitz(text: &str) -> Option<Event> {
    let caps = KIBITZ.captures(text)?;
    Some(Event::ChannelTell {
        channel: format!("Game {}", group(&caps, 2)?),
        user: group(&caps, 1)?.to_string(),
        message: group(&caps, 3)?.replace('\n', ""),
    })
}

/// Resolve a `{Game ...}` actor/action pair into `(winner, loser, reason)`.
///
/// For the loser-naming actions the actor is the loser and the other named
/// player the winner; an actor matching neither player degrades to
/// [`GameEndReason::Unknown`]. Draw-like endings keep the players in the
/// order given.
fn game_result(p1: &str, p2: &str, actor: &str, action: &str) -> (String, String, GameEndReason) {
    let action = action.trim();

    let lost_by = match action {
        "resigns" => Some(GameEndReason::Resign),
        "forfeits by disconnection" => Some(GameEndReason::Disconnect),
        "checkmated" => Some(GameEndReason::Checkmate),
        "forfeits on time" => Some(GameEndReason::TimeForfeit),
        _ => None,
    };
    if let Some(reason) = lost_by {
        if actor == p1 {
            return (p2.to_string(), p1.to_string(), reason);
        }
        if actor == p2 {
            return (p1.to_string(), p2.to_string(), reason);
        }
        return (p1.to_string(), p2.to_string(), GameEndReason::Unknown);
    }

    let reason = match action {
        "aborted by mutual agreement" => GameEndReason::Abort,
        // "aborted on move 1" is deliberately not an Abort.
        "aborted on move 1" => GameEndReason::Unknown,
        "drawn by mutual agreement"
        | "drawn because both players ran out of time"
        | "drawn by repetition"
        | "drawn by the 50 move rule"
        | "drawn due to length"
        | "was drawn"
        | "player has mating material"
        | "drawn by adjudication"
        | "drawn by stalemate" => GameEndReason::Draw,
        "adjourned by mutual agreement" => GameEndReason::Adjourn,
        _ => GameEndReason::Unknown,
    };
    (p1.to_string(), p2.to_string(), reason)
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> Option<&'t str> {
    caps.get(i).map(|m| m.as_str())
}

fn num<T: FromStr + Default>(caps: &Captures<'_>, i: usize) -> T {
    group(caps, i).and_then(|s| s.parse().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = "<12> rnbqkb-r pppppppp -----n-- -------- ----P--- -------- PPPPKPPP RNBQ-BNR B -1 0 0 1 1 0 7 Newton Einstein 1 2 12 39 39 119 122 2 K/e1-e2 (0:06) Ke2 0 1 0";

    #[test]
    fn pattern_set_compiles() {
        for re in [&*GAME_MOVE, &*GAME_START, &*GAME_END, &*CHANNEL_TELL, &*PRIVATE_TELL, &*KIBITZ, &*TOLD_ECHO] {
            assert!(!re.as_str().is_empty());
        }
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(decode_messages("").is_empty());
        assert!(decode_messages("\n").is_empty());
        assert!(decode_messages("  \n ").is_empty());
    }

    #[test]
    fn told_echo_is_stripped() {
        assert!(decode_messages("(told GuestXYZ, who is playing)").is_empty());
        assert!(decode_messages("(kibitzed to 3 players)").is_empty());
    }

    #[test]
    fn board_update_decodes_to_game_move() {
        let events = decode_messages(BOARD);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            Event::GameMove {
                fen: "rnbqkb1r/pppppppp/5n2/8/4P3/8/PPPPKPPP/RNBQ1BNR".to_string(),
                turn: "B".to_string(),
                game_id: 7,
                white_name: "Newton".to_string(),
                black_name: "Einstein".to_string(),
                role: 1,
                time: 2,
                inc: 12,
                white_time: 119,
                black_time: 122,
                move_no: 2,
                move_text: "Ke2".to_string(),
            }
        );
    }

    #[test]
    fn burst_splits_into_ordered_events() {
        let burst = format!("{BOARD}\nhawk(50): good game");
        let events = decode_messages(&burst);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::GameMove { .. }));
        assert_eq!(
            events[1],
            Event::ChannelTell {
                channel: "50".to_string(),
                user: "hawk".to_string(),
                message: "good game".to_string(),
            }
        );
    }

    #[test]
    fn game_start_decodes() {
        let events = decode_messages("{Game 117 (GuestMDPS vs. guestl) Creating unrated blitz match.}");
        assert_eq!(
            events,
            vec![Event::GameStart {
                game_id: 117,
                player_one: "GuestMDPS".to_string(),
                player_two: "guestl".to_string(),
            }]
        );
    }

    #[test]
    fn resignation_names_the_actor_as_loser() {
        let text = "{Game 12 (alice vs. bob) alice resigns} 0-1";
        let events = decode_messages(text);
        assert_eq!(
            events,
            vec![Event::GameEnd {
                game_id: 12,
                winner: "bob".to_string(),
                loser: "alice".to_string(),
                reason: GameEndReason::Resign,
                message: text.to_string(),
            }]
        );
    }

    #[test]
    fn time_forfeit_by_second_player() {
        let events = decode_messages("{Game 12 (alice vs. bob) bob forfeits on time} 1-0");
        match &events[0] {
            Event::GameEnd { winner, loser, reason, .. } => {
                assert_eq!(winner, "alice");
                assert_eq!(loser, "bob");
                assert_eq!(*reason, GameEndReason::TimeForfeit);
            },
            other => panic!("expected GameEnd, got {other:?}"),
        }
    }

    #[test]
    fn checkmate_and_disconnect_classify() {
        let events = decode_messages("{Game 5 (alice vs. bob) bob checkmated} 1-0");
        assert!(matches!(
            &events[0],
            Event::GameEnd { reason: GameEndReason::Checkmate, loser, .. } if loser == "bob"
        ));

        let events =
            decode_messages("{Game 5 (alice vs. bob) alice forfeits by disconnection} 0-1");
        assert!(matches!(
            &events[0],
            Event::GameEnd { reason: GameEndReason::Disconnect, winner, .. } if winner == "bob"
        ));
    }

    #[test]
    fn draw_strings_classify_as_draw() {
        for action in [
            "drawn by mutual agreement",
            "drawn by repetition",
            "drawn by the 50 move rule",
            "drawn by stalemate",
        ] {
            let text = format!("{{Game 3 (alice vs. bob) Game {action}}} 1/2-1/2");
            let events = decode_messages(&text);
            assert!(
                matches!(&events[0], Event::GameEnd { reason: GameEndReason::Draw, .. }),
                "action {action:?} decoded to {events:?}"
            );
        }
    }

    #[test]
    fn adjourn_and_abort_classify() {
        let events =
            decode_messages("{Game 9 (alice vs. bob) Game adjourned by mutual agreement} *");
        assert!(matches!(&events[0], Event::GameEnd { reason: GameEndReason::Adjourn, .. }));

        let events =
            decode_messages("{Game 9 (alice vs. bob) Game aborted by mutual agreement} *");
        assert!(matches!(&events[0], Event::GameEnd { reason: GameEndReason::Abort, .. }));
    }

    #[test]
    fn abort_on_move_one_is_unknown() {
        let events = decode_messages("{Game 9 (alice vs. bob) Game aborted on move 1} *");
        assert!(matches!(&events[0], Event::GameEnd { reason: GameEndReason::Unknown, .. }));
    }

    #[test]
    fn unrecognized_action_is_unknown() {
        let events = decode_messages("{Game 12 (alice vs. bob) alice wandered off somewhere} *");
        assert!(matches!(&events[0], Event::GameEnd { reason: GameEndReason::Unknown, .. }));
    }

    #[test]
    fn actor_matching_neither_player_is_unknown() {
        let (winner, loser, reason) = game_result("alice", "bob", "mallory", "resigns");
        assert_eq!(winner, "alice");
        assert_eq!(loser, "bob");
        assert_eq!(reason, GameEndReason::Unknown);
    }

    #[test]
    fn channel_tell_decodes() {
        let events = decode_messages("alice(1234): hello there");
        assert_eq!(
            events,
            vec![Event::ChannelTell {
                channel: "1234".to_string(),
                user: "alice".to_string(),
                message: "hello there".to_string(),
            }]
        );
    }

    #[test]
    fn channel_tell_skips_rank_tags() {
        let events = decode_messages("alice(GM)(1234): hello");
        assert_eq!(
            events,
            vec![Event::ChannelTell {
                channel: "1234".to_string(),
                user: "alice".to_string(),
                message: "hello".to_string(),
            }]
        );
    }

    #[test]
    fn private_tell_decodes() {
        let events = decode_messages("bob tells you: hi");
        assert_eq!(
            events,
            vec![Event::PrivateTell { user: "bob".to_string(), message: "hi".to_string() }]
        );

        let events = decode_messages("bob(SR)(TM) says: your move");
        assert_eq!(
            events,
            vec![Event::PrivateTell { user: "bob".to_string(), message: "your move".to_string() }]
        );
    }

    #[test]
    fn kibitz_becomes_synthetic_channel_tell() {
        let events = decode_messages("alice[73] kibitzes: nice sac");
        assert_eq!(
            events,
            vec![Event::ChannelTell {
                channel: "Game 73".to_string(),
                user: "alice".to_string(),
                message: "nice sac".to_string(),
            }]
        );

        let events = decode_messages("bob[73] whispers: watch the rook");
        assert_eq!(
            events,
            vec![Event::ChannelTell {
                channel: "Game 73".to_string(),
                user: "bob".to_string(),
                message: "watch the rook".to_string(),
            }]
        );
    }

    #[test]
    fn unmatched_text_degrades_to_message() {
        let text = "Challenge: GuestABCD (----) GuestWXYZ (----) unrated blitz 2 12.";
        assert_eq!(decode_messages(text), vec![Event::Message { text: text.to_string() }]);
    }
}
