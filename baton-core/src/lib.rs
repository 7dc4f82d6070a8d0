//! # baton-core
//!
//! Connection, discovery and protocol engine for a LAN media-remote
//! client. It locates a media-control server on the local subnet,
//! keeps one TCP connection to it alive, and mirrors playback state
//! from the server's text protocol.
//!
//! This crate contains:
//! - **Commands**: `Command` — every outbound control operation, with
//!   both the string and the legacy integer wire encoding
//! - **Codec**: `WireCodec` for framed TCP I/O via `tokio_util`
//! - **Events**: pure decoding of inbound frames into field updates
//!   and player/device selection lists
//! - **Net**: subnet scanning, connect probing, server discovery, and
//!   the `Transport` that owns the live socket with its heartbeat
//! - **State**: `PlayerState` / `SelectionSet` and the session state
//!   machine that applies decoded events and publishes snapshots
//! - **Error**: `BatonError` — typed, `thiserror`-based error hierarchy
//!
//! The visual layer is not part of this crate; consumers implement
//! [`ConnectionListener`] and observe snapshots through the session's
//! watch channel.

pub mod codec;
pub mod command;
pub mod error;
pub mod event;
pub mod listener;
pub mod net;
pub mod state;

/// TCP port the media-control server listens on.
pub const DEFAULT_PORT: u16 = 4308;

/// Host alias reaching the development machine from an Android
/// emulator; useful when the server runs on the local loopback.
pub const EMULATOR_HOST: &str = "10.0.2.2";

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{WireCodec, WireEncoding, WireFrame, MAX_FRAME_SIZE};
pub use command::Command;
pub use error::BatonError;
pub use event::{Event, FieldUpdate};
pub use listener::{ConnectionListener, NullListener};
pub use net::{
    Discoverer, Endpoint, FrameSender, InterfaceSource, SubnetScanner, Transport, TransportEvent,
};
pub use state::{
    PlayerState, RepeatMode, SelectableItem, SelectionKind, SelectionSet, Session, SessionHandle,
    SessionIntent, Snapshot,
};
