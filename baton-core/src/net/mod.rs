//! Networking: subnet scanning, connect probing, server discovery,
//! and the transport that owns the live socket.

pub mod discovery;
pub mod probe;
pub mod scanner;
pub mod transport;

pub use discovery::Discoverer;
pub use probe::probe;
pub use scanner::{InterfaceSource, SubnetScanner};
pub use transport::{FrameSender, Transport, TransportEvent};

use std::fmt;
use std::net::Ipv4Addr;

// ── Endpoint ─────────────────────────────────────────────────────

/// Host and port identifying a server socket. Immutable once a
/// transport is built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl From<(Ipv4Addr, u16)> for Endpoint {
    fn from((addr, port): (Ipv4Addr, u16)) -> Self {
        Self::new(addr.to_string(), port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
