//! Framed TCP codec for the control protocol.
//!
//! Inbound frames are a 16-bit big-endian length prefix followed by
//! that many bytes of UTF-8 (the format `DataOutputStream.writeUTF`
//! produces on the server side). The decoder reassembles frames
//! incrementally over a persistent buffer, so frames split or
//! coalesced by TCP are handled: an incomplete frame is simply "not
//! ready yet", never an error.
//!
//! Outbound frames are either the same length-prefixed text form or a
//! legacy raw 4-byte little-endian integer.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::command::Command;
use crate::error::BatonError;

/// Largest payload a 16-bit length prefix can describe.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Length prefix size in bytes.
const PREFIX_SIZE: usize = 2;

// ── WireEncoding ─────────────────────────────────────────────────

/// Which outbound command encoding to put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireEncoding {
    /// Length-prefixed UTF-8 command strings (current servers).
    #[default]
    Text,
    /// Raw little-endian 32-bit integers (legacy servers).
    Legacy,
}

// ── WireFrame ────────────────────────────────────────────────────

/// One outbound unit of protocol data.
#[derive(Debug, Clone, PartialEq)]
pub enum WireFrame {
    /// Length-prefixed UTF-8 payload.
    Text(String),
    /// Raw 4-byte little-endian integer.
    Legacy(i32),
}

impl WireFrame {
    /// Encode a command for the chosen wire encoding.
    pub fn from_command(command: &Command, encoding: WireEncoding) -> Result<Self, BatonError> {
        match encoding {
            WireEncoding::Text => Ok(WireFrame::Text(command.encode_text())),
            WireEncoding::Legacy => Ok(WireFrame::Legacy(command.encode_legacy()?)),
        }
    }
}

// ── WireCodec ────────────────────────────────────────────────────

/// Length-prefixed frame codec for [`tokio_util::codec::Framed`].
#[derive(Debug, Default)]
pub struct WireCodec;

impl Decoder for WireCodec {
    type Item = String;
    type Error = BatonError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PREFIX_SIZE {
            return Ok(None);
        }

        let length = u16::from_be_bytes([src[0], src[1]]) as usize;
        if src.len() < PREFIX_SIZE + length {
            // Frame not yet complete; wait for more bytes.
            src.reserve(PREFIX_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(PREFIX_SIZE);
        let payload = src.split_to(length);
        let text = String::from_utf8(payload.to_vec())?;
        Ok(Some(text))
    }
}

impl Encoder<WireFrame> for WireCodec {
    type Error = BatonError;

    fn encode(&mut self, item: WireFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            WireFrame::Text(text) => {
                let bytes = text.as_bytes();
                if bytes.len() > MAX_FRAME_SIZE {
                    return Err(BatonError::FrameTooLarge {
                        size: bytes.len(),
                        max: MAX_FRAME_SIZE,
                    });
                }
                dst.reserve(PREFIX_SIZE + bytes.len());
                dst.put_u16(bytes.len() as u16);
                dst.extend_from_slice(bytes);
            }
            WireFrame::Legacy(value) => {
                dst.extend_from_slice(&value.to_le_bytes());
            }
        }
        Ok(())
    }
}
