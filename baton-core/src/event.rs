//! Pure decoding of inbound frames. No I/O.
//!
//! Every inbound frame is one of two kinds:
//!
//! - a **selection list** — the first `"||"` token is a known status
//!   code (`8` = players, `9` = output devices), followed by the
//!   selected index and (label, id) pairs;
//! - a **field update** — `"||"`-delimited key/value tokens paired
//!   up sequentially.
//!
//! Classification is by the first token alone. Recognized field keys
//! are all alphabetic, so a status token can never collide with a
//! field key and the rule is unambiguous.

use crate::state::selection::{SelectableItem, SelectionKind, SelectionSet};

/// Token separator used throughout the wire protocol.
pub const DELIMITER: &str = "||";

// ── Event ────────────────────────────────────────────────────────

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A player or output-device list to choose from.
    Selection(SelectionSet),
    /// A batch of playback-state field updates.
    Fields(FieldUpdate),
}

impl Event {
    /// Decode one complete frame.
    ///
    /// Decoding is total: content that is not a selection list is a
    /// field update, and malformed field values are dealt with when
    /// the update is applied.
    pub fn decode(frame: &str) -> Event {
        let tokens: Vec<&str> = frame.split(DELIMITER).collect();
        match SelectionKind::from_status_token(tokens[0]) {
            Some(kind) => Event::Selection(decode_selection(kind, &tokens[1..])),
            None => Event::Fields(FieldUpdate::from_tokens(&tokens)),
        }
    }
}

/// Parse the payload tokens after a status code: selected index
/// first, then (label, id) pairs. A payload with fewer than 3 tokens
/// yields index −1 and no items.
fn decode_selection(kind: SelectionKind, tokens: &[&str]) -> SelectionSet {
    if tokens.len() < 3 {
        return SelectionSet::new(kind, -1, Vec::new());
    }

    let current_index = tokens[0].parse::<i32>().unwrap_or(-1);
    let items = tokens[1..]
        .chunks_exact(2)
        .map(|pair| SelectableItem {
            label: pair[0].to_string(),
            id: pair[1].to_string(),
        })
        .collect();

    SelectionSet::new(kind, current_index, items)
}

// ── FieldUpdate ──────────────────────────────────────────────────

/// An ordered batch of key → value updates.
///
/// Order is preserved so that a repeated key applies last-wins; a
/// trailing unpaired token is dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldUpdate {
    pairs: Vec<(String, String)>,
}

impl FieldUpdate {
    fn from_tokens(tokens: &[&str]) -> Self {
        let pairs = tokens
            .chunks_exact(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect();
        Self { pairs }
    }

    /// Build an update from explicit pairs (mostly for tests).
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Iterate the pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The effective value for `key` (last occurrence wins).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Re-encode as `k||v||k||v...`.
    pub fn encode(&self) -> String {
        let mut tokens = Vec::with_capacity(self.pairs.len() * 2);
        for (k, v) in &self.pairs {
            tokens.push(k.as_str());
            tokens.push(v.as_str());
        }
        tokens.join(DELIMITER)
    }
}
