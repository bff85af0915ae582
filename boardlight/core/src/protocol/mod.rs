//! Wire Protocol
//!
//! Line-oriented state protocol carried over a persistent TCP stream.
//! The match server writes short ASCII tokens, one per line, `\n`-terminated:
//!
//! ```text
//! thinking\n
//! score\n
//! 3\n
//! victory\n
//! ```
//!
//! `score` is the one two-line message: the token line is followed by a
//! value line carrying an integer. Every other message is a single line.
//! Unrecognized tokens decode to [`StateKind::Unknown`] - the display falls
//! back to its default visual rather than treating bad input as an error.

mod decoder;
mod framer;

pub use decoder::MessageDecoder;
pub use framer::{LineFramer, DEFAULT_MAX_PENDING_BYTES};

use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed set of display states the protocol can name.
///
/// `Unknown` is a real member, not an error: any token outside the
/// recognized set maps to it, and the animator renders the configured
/// default visual for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Pre-game option selection screen
    Selection,
    /// The table won the match
    Victory,
    /// The table lost the match
    Defeat,
    /// Match ended in a draw (also the default waiting visual)
    Draw,
    /// Engine is computing a move
    Thinking,
    /// Win-counter display; carries an integer payload
    Score,
    /// A piece is threatened
    UnderAttack,
    /// Blank the display
    Off,
    /// Anything the protocol does not recognize
    Unknown,
}

impl StateKind {
    /// Decode a single trimmed token into a state kind.
    ///
    /// Matching is exact and case-sensitive, like the original wire
    /// protocol. `attack` is accepted as an alias for `under_attack`.
    pub fn parse_token(token: &str) -> Self {
        match token {
            "selection" => Self::Selection,
            "victory" => Self::Victory,
            "lose" => Self::Defeat,
            "draw" => Self::Draw,
            "thinking" => Self::Thinking,
            "score" => Self::Score,
            "under_attack" | "attack" => Self::UnderAttack,
            "off" => Self::Off,
            _ => Self::Unknown,
        }
    }

    /// The canonical wire token for this kind.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::Victory => "victory",
            Self::Defeat => "lose",
            Self::Draw => "draw",
            Self::Thinking => "thinking",
            Self::Score => "score",
            Self::UnderAttack => "under_attack",
            Self::Off => "off",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// One decoded state message.
///
/// Created at decode time, lives only long enough to overwrite the
/// [`StateStore`](crate::state::StateStore) slot, then discarded. Only
/// `Score` carries a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateMessage {
    /// Which display state this message names
    pub kind: StateKind,
    /// Integer payload (win count for `Score`)
    pub payload: Option<i64>,
}

impl StateMessage {
    /// Payload-free message for a kind.
    pub fn new(kind: StateKind) -> Self {
        Self {
            kind,
            payload: None,
        }
    }

    /// Score message with a win count.
    pub fn score(count: i64) -> Self {
        Self {
            kind: StateKind::Score,
            payload: Some(count),
        }
    }

    /// Encode this message to its wire form (terminators included).
    ///
    /// `Score` produces the two-line pair `score\n<n>\n` with a missing
    /// payload encoded as 0, matching what the decoder assumes on the
    /// receiving side. `Unknown` encodes as the literal token `unknown`,
    /// which any receiver maps straight back to `Unknown`.
    pub fn encode(&self) -> String {
        match self.kind {
            StateKind::Score => format!("score\n{}\n", self.payload.unwrap_or(0)),
            kind => format!("{}\n", kind.token()),
        }
    }
}

impl fmt::Display for StateMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.payload {
            Some(n) => write!(f, "{}({n})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}
