//! Player and output-device choice lists.

use std::fmt;

// ── SelectionKind ────────────────────────────────────────────────

/// Which kind of list a status frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// Status code 8 — media players known to the server.
    Player,
    /// Status code 9 — output devices (sinks).
    Device,
}

impl SelectionKind {
    /// Map a frame's first token to a selection kind, if it is a
    /// known status code.
    pub fn from_status_token(token: &str) -> Option<Self> {
        match token {
            "8" => Some(SelectionKind::Player),
            "9" => Some(SelectionKind::Device),
            _ => None,
        }
    }

    /// The inbound status code for this kind.
    pub fn status_code(&self) -> u8 {
        match self {
            SelectionKind::Player => 8,
            SelectionKind::Device => 9,
        }
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKind::Player => write!(f, "player"),
            SelectionKind::Device => write!(f, "device"),
        }
    }
}

// ── SelectableItem / SelectionSet ────────────────────────────────

/// One choosable entry: a human label and the server-side id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectableItem {
    pub label: String,
    pub id: String,
}

/// An open choice prompt, as decoded from a status frame.
///
/// `current_index` is the server's currently-active entry, or −1
/// when nothing is selected (or the payload was too short to say).
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSet {
    pub kind: SelectionKind,
    pub current_index: i32,
    pub items: Vec<SelectableItem>,
}

impl SelectionSet {
    pub fn new(kind: SelectionKind, current_index: i32, items: Vec<SelectableItem>) -> Self {
        Self {
            kind,
            current_index,
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
