//! Mirrored playback state and the field-update application rules.

use tracing::warn;

use crate::event::FieldUpdate;

// ── RepeatMode ───────────────────────────────────────────────────

/// Repeat setting as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl TryFrom<i32> for RepeatMode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RepeatMode::Off),
            1 => Ok(RepeatMode::All),
            2 => Ok(RepeatMode::One),
            other => Err(other),
        }
    }
}

// ── PlayerState ──────────────────────────────────────────────────

/// The mirrored state of whatever the server is currently playing.
///
/// Mutated only by the session state machine: either from inbound
/// field updates or optimistically during a local seek/volume
/// gesture.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerState {
    pub artist: String,
    pub title: String,
    /// Artwork reference (a URL or file path); loading it is the
    /// consumer's concern.
    pub artwork: String,
    /// Raw position string as sent by the server, e.g. `"1:23"`.
    pub position_text: String,
    /// Raw track length string, e.g. `"4:05"`.
    pub length_text: String,
    pub position_secs: u32,
    pub length_secs: u32,
    /// position / length, 0.0 when the length is unknown.
    pub position_percentage: f32,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub playing: bool,
    /// 0.0 to 1.0.
    pub volume: f32,
}

impl PlayerState {
    /// Apply one decoded field update.
    ///
    /// Recognized keys overwrite their field; unrecognized keys are
    /// ignored; a malformed value keeps the prior one. `"-"` for
    /// artist or title means "nothing" and normalizes to empty.
    /// After all keys apply, the position/length seconds and the
    /// percentage are recomputed — unless `update_position` is false
    /// (an in-progress local seek gesture owns the percentage then).
    pub fn apply(&mut self, update: &FieldUpdate, update_position: bool) {
        for (key, value) in update.iter() {
            match key {
                "art" => self.artwork = value.to_string(),
                "artist" => self.artist = normalize_text(value),
                "title" => self.title = normalize_text(value),
                "length" => self.length_text = value.to_string(),
                "pos" => self.position_text = value.to_string(),
                "shuffle" => self.shuffle = value == "1",
                "playing" => self.playing = value == "1",
                "repeat" => match value.parse::<i32>().ok().map(RepeatMode::try_from) {
                    Some(Ok(mode)) => self.repeat = mode,
                    _ => warn!(value, "unrecognized repeat value"),
                },
                "volume" => match value.parse::<f32>() {
                    Ok(v) => self.volume = v.clamp(0.0, 1.0),
                    Err(_) => warn!(value, "unparsable volume value"),
                },
                _ => {}
            }
        }

        self.length_secs = parse_clock(&self.length_text).unwrap_or(0);
        let position = parse_clock(&self.position_text).unwrap_or(0);
        self.position_secs = if self.length_secs > 0 {
            position.min(self.length_secs)
        } else {
            position
        };

        if update_position {
            self.position_percentage = position_percentage(self.position_secs, self.length_secs);
        }
    }

    /// Forget the displayed track. Used when switching players while
    /// the server catches up.
    pub fn clear_track(&mut self) {
        self.artist.clear();
        self.title.clear();
        self.artwork.clear();
        self.position_text.clear();
        self.length_text.clear();
        self.position_secs = 0;
        self.length_secs = 0;
        self.position_percentage = 0.0;
    }
}

/// `"-"` is the server's stand-in for an absent artist/title.
fn normalize_text(value: &str) -> String {
    if value == "-" {
        String::new()
    } else {
        value.to_string()
    }
}

// ── Time helpers ─────────────────────────────────────────────────

/// Parse a colon-separated clock string (`"[[h:]m:]s"`) into
/// seconds. The rightmost group is seconds, then minutes, then
/// hours; missing groups default to zero.
pub fn parse_clock(text: &str) -> Option<u32> {
    let mut total: u32 = 0;
    let mut scale: u32 = 1;
    for group in text.rsplit(':').take(3) {
        let value = group.trim().parse::<u32>().ok()?;
        total = total.checked_add(value.checked_mul(scale)?)?;
        scale = scale.checked_mul(60)?;
    }
    Some(total)
}

/// Fraction of the track that has played; zero when the length is
/// unknown so the progress bar never divides by zero.
pub fn position_percentage(position_secs: u32, length_secs: u32) -> f32 {
    if length_secs > 0 {
        position_secs as f32 / length_secs as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_clock_groups() {
        assert_eq!(parse_clock("1:02:03"), Some(3723));
        assert_eq!(parse_clock("02:03"), Some(123));
        assert_eq!(parse_clock("5"), Some(5));
        assert_eq!(parse_clock("0"), Some(0));
    }

    #[test]
    fn parse_clock_rejects_garbage() {
        assert_eq!(parse_clock(""), None);
        assert_eq!(parse_clock("abc"), None);
        assert_eq!(parse_clock("1:xx"), None);
    }

    #[test]
    fn percentage_basic() {
        assert_eq!(position_percentage(30, 120), 0.25);
        assert_eq!(position_percentage(0, 120), 0.0);
    }

    #[test]
    fn percentage_zero_length_is_zero() {
        assert_eq!(position_percentage(30, 0), 0.0);
        assert_eq!(position_percentage(0, 0), 0.0);
    }

    #[test]
    fn apply_overwrites_recognized_fields() {
        let mut state = PlayerState::default();
        let update = FieldUpdate::from_pairs([
            ("artist", "Queen"),
            ("title", "Innuendo"),
            ("length", "6:32"),
            ("pos", "1:38"),
            ("shuffle", "1"),
            ("repeat", "2"),
            ("playing", "1"),
            ("volume", "0.8"),
        ]);
        state.apply(&update, true);

        assert_eq!(state.artist, "Queen");
        assert_eq!(state.title, "Innuendo");
        assert_eq!(state.length_secs, 392);
        assert_eq!(state.position_secs, 98);
        assert_eq!(state.position_percentage, 0.25);
        assert!(state.shuffle);
        assert_eq!(state.repeat, RepeatMode::One);
        assert!(state.playing);
        assert_eq!(state.volume, 0.8);
    }

    #[test]
    fn dash_normalizes_to_empty() {
        let mut state = PlayerState::default();
        state.apply(
            &FieldUpdate::from_pairs([("artist", "-"), ("title", "-")]),
            true,
        );
        assert_eq!(state.artist, "");
        assert_eq!(state.title, "");
    }

    #[test]
    fn unknown_keys_ignored_missing_keys_unchanged() {
        let mut state = PlayerState::default();
        state.apply(&FieldUpdate::from_pairs([("artist", "Queen")]), true);
        state.apply(
            &FieldUpdate::from_pairs([("mystery", "42"), ("title", "Innuendo")]),
            true,
        );
        assert_eq!(state.artist, "Queen");
        assert_eq!(state.title, "Innuendo");
    }

    #[test]
    fn malformed_repeat_keeps_prior_mode() {
        let mut state = PlayerState::default();
        state.apply(&FieldUpdate::from_pairs([("repeat", "1")]), true);
        state.apply(&FieldUpdate::from_pairs([("repeat", "7")]), true);
        state.apply(&FieldUpdate::from_pairs([("repeat", "x")]), true);
        assert_eq!(state.repeat, RepeatMode::All);
    }

    #[test]
    fn volume_clamps_into_unit_range() {
        let mut state = PlayerState::default();
        state.apply(&FieldUpdate::from_pairs([("volume", "1.4")]), true);
        assert_eq!(state.volume, 1.0);
        state.apply(&FieldUpdate::from_pairs([("volume", "-0.1")]), true);
        assert_eq!(state.volume, 0.0);
    }

    #[test]
    fn position_clamped_to_length() {
        let mut state = PlayerState::default();
        state.apply(
            &FieldUpdate::from_pairs([("length", "0:30"), ("pos", "0:45")]),
            true,
        );
        assert_eq!(state.position_secs, 30);
        assert_eq!(state.position_percentage, 1.0);
    }

    #[test]
    fn seek_gesture_suppresses_percentage() {
        let mut state = PlayerState::default();
        state.apply(
            &FieldUpdate::from_pairs([("length", "2:00"), ("pos", "0:30")]),
            true,
        );
        assert_eq!(state.position_percentage, 0.25);

        // Drag in progress: inbound echoes must not move the bar.
        state.apply(&FieldUpdate::from_pairs([("pos", "1:00")]), false);
        assert_eq!(state.position_percentage, 0.25);

        // Gesture finished: next update applies normally.
        state.apply(&FieldUpdate::from_pairs([("pos", "1:00")]), true);
        assert_eq!(state.position_percentage, 0.5);
    }

    #[test]
    fn clear_track_resets_display_fields() {
        let mut state = PlayerState::default();
        state.apply(
            &FieldUpdate::from_pairs([
                ("artist", "Queen"),
                ("length", "2:00"),
                ("pos", "0:30"),
                ("playing", "1"),
            ]),
            true,
        );
        state.clear_track();
        assert_eq!(state.artist, "");
        assert_eq!(state.position_secs, 0);
        assert_eq!(state.position_percentage, 0.0);
        // Transport-level flags survive a track clear.
        assert!(state.playing);
    }
}
