//! The consumer-side connection callback contract.

use async_trait::async_trait;

/// Implemented by the presentation layer to observe the connection.
///
/// The session state machine invokes these; implementations should
/// return quickly and must not block the session task.
#[async_trait]
pub trait ConnectionListener: Send + Sync {
    /// A transport reached the server and is live.
    async fn on_connection_success(&self);

    /// The live transport was lost (I/O failure or dead heartbeat).
    /// Fired at most once per transport.
    async fn on_connection_lost(&self);

    /// A raw inbound payload arrived, before decoding.
    async fn on_new_info(&self, info: &str);
}

/// A listener that ignores everything. Useful for tests and headless
/// consumers that only watch state snapshots.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

#[async_trait]
impl ConnectionListener for NullListener {
    async fn on_connection_success(&self) {}
    async fn on_connection_lost(&self) {}
    async fn on_new_info(&self, _info: &str) {}
}
