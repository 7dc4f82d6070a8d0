//! Playback/selection state and the session state machine.

pub mod player;
pub mod selection;
pub mod session;

pub use player::{PlayerState, RepeatMode};
pub use selection::{SelectableItem, SelectionKind, SelectionSet};
pub use session::{Session, SessionHandle, SessionIntent, Snapshot};
