//! Message Decoder
//!
//! Turns framed lines into [`StateMessage`]s. Decoding never fails:
//! malformed content maps to [`StateKind::Unknown`] and empty lines are
//! filtered, so bad input degrades to the default visual instead of
//! raising.
//!
//! # The two-line `score` grammar
//!
//! `score` is followed by a value line carrying an integer, so the decoder
//! holds exactly one piece of cross-line state: "the previous line was
//! `score`". This matches the wire convention of the original match
//! server (`score\n<n>\n`); the single-line `score <n>` spelling seen in
//! other systems is deliberately not supported and decodes to `Unknown`.
//!
//! A missing value (empty value line) yields a score of 0. A value line
//! that turns out to be another recognized token is treated as a lost
//! value: the score is emitted with 0 and the token is decoded in its own
//! right, so one dropped line never desynchronizes the stream.

use super::{StateKind, StateMessage};

/// Incremental line-to-message decoder for one connection.
#[derive(Debug, Default)]
pub struct MessageDecoder {
    /// Set after a `score` token line, cleared by the value line.
    awaiting_score_value: bool,
}

impl MessageDecoder {
    /// Create a decoder in its initial state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one framed line, yielding zero, one, or two messages.
    ///
    /// Two messages only occur in the lost-value recovery case described
    /// in the module docs.
    pub fn feed_line(&mut self, line: &str) -> Vec<StateMessage> {
        let token = line.trim();

        if self.awaiting_score_value {
            self.awaiting_score_value = false;

            if let Ok(value) = token.parse::<i64>() {
                return vec![StateMessage::score(value)];
            }
            if token.is_empty() {
                return vec![StateMessage::score(0)];
            }

            // Value line lost; resolve the score with the default and
            // decode this line as a message of its own.
            tracing::debug!(line = token, "score value line missing, defaulting to 0");
            let mut messages = vec![StateMessage::score(0)];
            messages.extend(self.feed_line(token));
            return messages;
        }

        if token.is_empty() {
            return Vec::new();
        }

        match StateKind::parse_token(token) {
            StateKind::Score => {
                self.awaiting_score_value = true;
                Vec::new()
            }
            kind => vec![StateMessage::new(kind)],
        }
    }
}
