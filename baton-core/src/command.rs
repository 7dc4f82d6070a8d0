//! Outbound control commands and their two wire encodings.
//!
//! The server understands a small numeric command set. Two encodings
//! coexist on the wire:
//!
//! - **Text** (current): a UTF-8 string `"<code>"` or
//!   `"<code>||<arg>"`, one per length-prefixed frame.
//! - **Legacy** (numeric): 4 raw bytes, little-endian 32-bit signed
//!   integer. Parameterized commands concatenate the code digits with
//!   the argument digits and parse the result as one integer, so a
//!   seek to 42 s becomes the integer `742`.

use crate::error::BatonError;
use std::fmt;

// ── Command ──────────────────────────────────────────────────────

/// All commands understood by the media-control server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Zero-value liveness probe; the server ignores it.
    Noop,
    /// Skip to the previous track.
    Previous,
    /// Toggle between play and pause.
    PlayPause,
    /// Skip to the next track.
    Next,
    /// Request a full now-playing field update.
    NowPlaying,
    /// Toggle shuffle.
    ToggleShuffle,
    /// Cycle the repeat mode.
    ToggleRepeat,
    /// Seek to an absolute position in seconds.
    Seek(u32),
    /// Request the list of available players.
    ListPlayers,
    /// Select a player by its index in the last player list.
    SelectPlayer(usize),
    /// Request the list of output devices.
    ListDevices,
    /// Select an output device by its device id.
    SelectDevice(i64),
    /// Set the volume, 0.0 to 1.0.
    SetVolume(f32),
}

impl Command {
    /// The numeric action code used by both encodings.
    pub fn code(&self) -> u8 {
        match self {
            Command::Noop => 0,
            Command::Previous => 1,
            Command::PlayPause => 2,
            Command::Next => 3,
            Command::NowPlaying => 4,
            Command::ToggleShuffle => 5,
            Command::ToggleRepeat => 6,
            Command::Seek(_) => 7,
            Command::ListPlayers => 8,
            Command::SelectPlayer(_) => 9,
            Command::ListDevices => 10,
            Command::SelectDevice(_) => 11,
            Command::SetVolume(_) => 12,
        }
    }

    /// Encode as the current string form: `"<code>"` or
    /// `"<code>||<arg>"`.
    pub fn encode_text(&self) -> String {
        match self {
            Command::Seek(secs) => format!("7||{secs}"),
            Command::SelectPlayer(index) => format!("9||{index}"),
            Command::SelectDevice(id) => format!("11||{id}"),
            Command::SetVolume(volume) => format!("12||{volume}"),
            other => other.code().to_string(),
        }
    }

    /// Encode as the legacy 32-bit integer: the code digits
    /// concatenated with the argument digits.
    ///
    /// `SetVolume` carries a float argument and predates the legacy
    /// encoding; it cannot be represented and returns
    /// [`BatonError::NotEncodable`]. The same applies to any argument
    /// whose concatenation overflows `i32`.
    pub fn encode_legacy(&self) -> Result<i32, BatonError> {
        let concatenated = match self {
            Command::SetVolume(_) => {
                return Err(BatonError::NotEncodable {
                    encoding: "legacy",
                    reason: "float argument has no integer form",
                });
            }
            Command::Seek(secs) => format!("7{secs}"),
            Command::SelectPlayer(index) => format!("9{index}"),
            Command::SelectDevice(id) => {
                if *id < 0 {
                    return Err(BatonError::NotEncodable {
                        encoding: "legacy",
                        reason: "negative device id",
                    });
                }
                format!("11{id}")
            }
            other => return Ok(i32::from(other.code())),
        };

        concatenated
            .parse::<i32>()
            .map_err(|_| BatonError::NotEncodable {
                encoding: "legacy",
                reason: "argument overflows i32",
            })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
