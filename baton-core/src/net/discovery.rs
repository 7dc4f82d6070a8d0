//! Finding the server without being told where it is.
//!
//! The `Discoverer` walks every candidate address in the local
//! subnet with a short connect probe until one accepts on the
//! control port. An exhausted pass backs off (doubling, capped) and
//! rescans, so discovery keeps retrying while the server is down but
//! never busy-loops. A manual address can short-circuit the scan;
//! when the manual connect fails, discovery takes over.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::BatonError;
use crate::net::probe::probe;
use crate::net::scanner::{InterfaceSource, SubnetScanner};
use crate::net::Endpoint;

/// Per-candidate connect budget while scanning.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(50);

/// Connect budget for a manually supplied address.
pub const MANUAL_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

const BACKOFF_FLOOR: Duration = Duration::from_millis(250);
const BACKOFF_CEILING: Duration = Duration::from_secs(5);

/// Subnet-wide server search over an [`InterfaceSource`].
///
/// At most one scan runs at a time; concurrent `start_scanning`
/// calls are no-ops. Cancellation is observed between probes, so a
/// stop lands within roughly one probe timeout.
pub struct Discoverer<I: InterfaceSource> {
    interface: I,
    port: u16,
    scanning: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl<I: InterfaceSource> Discoverer<I> {
    pub fn new(interface: I, port: u16) -> Self {
        Self {
            interface,
            port,
            scanning: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Whether a scan is currently running.
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Scan the local subnet until a server accepts.
    ///
    /// Returns `Ok(None)` when a scan is already running (the caller
    /// lost the race and should await that scan's owner instead).
    /// Otherwise runs to the first success — `Ok(Some((stream,
    /// endpoint)))`, socket ownership passing to the caller — or to
    /// one of two exits: [`BatonError::Cancelled`] after
    /// [`Discoverer::stop_scanning`], or [`BatonError::NoActiveInterface`]
    /// when the platform has no usable address. Exhausted passes are
    /// not errors; the loop backs off and rescans.
    pub async fn start_scanning(&self) -> Result<Option<(TcpStream, Endpoint)>, BatonError> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            debug!("scan already in progress");
            return Ok(None);
        }

        let token = CancellationToken::new();
        *self.cancel.lock().await = token.clone();

        let outcome = self.scan_loop(&token).await;
        self.scanning.store(false, Ordering::SeqCst);
        outcome.map(Some)
    }

    /// Cancel the running scan, if any. The scanning task returns
    /// [`BatonError::Cancelled`] within about one probe timeout.
    pub async fn stop_scanning(&self) {
        self.cancel.lock().await.cancel();
    }

    /// Manual path: try `host` directly on the control port with the
    /// longer connect budget; fall back to a full scan when it does
    /// not answer.
    pub async fn connect_to_address(
        &self,
        host: &str,
    ) -> Result<Option<(TcpStream, Endpoint)>, BatonError> {
        let endpoint = Endpoint::new(host, self.port);
        if let Some(stream) = probe(&endpoint, MANUAL_CONNECT_TIMEOUT).await {
            info!(%endpoint, "manual connect succeeded");
            return Ok(Some((stream, endpoint)));
        }
        warn!(%endpoint, "manual connect failed, falling back to scan");
        self.start_scanning().await
    }

    async fn scan_loop(
        &self,
        token: &CancellationToken,
    ) -> Result<(TcpStream, Endpoint), BatonError> {
        let (local, prefix) = self.interface.local_address()?;
        let mut scanner = SubnetScanner::new(local, prefix)?;
        info!(%local, prefix, port = self.port, "scanning subnet");

        let mut backoff = BACKOFF_FLOOR;
        loop {
            for candidate in scanner.by_ref() {
                if token.is_cancelled() {
                    return Err(BatonError::Cancelled);
                }
                let endpoint = Endpoint::from((candidate, self.port));
                if let Some(stream) = probe(&endpoint, PROBE_TIMEOUT).await {
                    info!(%endpoint, "server found");
                    return Ok((stream, endpoint));
                }
            }

            debug!(backoff_ms = backoff.as_millis() as u64, "pass exhausted");
            tokio::select! {
                _ = token.cancelled() => return Err(BatonError::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(BACKOFF_CEILING);
            scanner.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::scanner::FixedInterface;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    // A /30 around 127.0.0.1 has exactly one candidate, 127.0.0.2,
    // which is loopback on Linux. That keeps scan tests on-host.
    const LOCAL: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

    #[tokio::test]
    async fn scan_finds_a_live_server() {
        let listener = TcpListener::bind("127.0.0.2:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let discoverer = Discoverer::new(FixedInterface(LOCAL, 30), port);
        let (stream, endpoint) = discoverer
            .start_scanning()
            .await
            .unwrap()
            .expect("first scan should run, not defer");
        assert_eq!(endpoint, Endpoint::new("127.0.0.2", port));
        assert_eq!(
            stream.peer_addr().unwrap().ip(),
            "127.0.0.2".parse::<std::net::IpAddr>().unwrap()
        );
        assert!(!discoverer.is_scanning());
    }

    #[tokio::test]
    async fn concurrent_scan_is_a_no_op_and_stop_cancels() {
        // Nothing listens on this port, so the scan keeps retrying.
        let listener = TcpListener::bind("127.0.0.2:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let discoverer = Arc::new(Discoverer::new(FixedInterface(LOCAL, 30), port));

        let owner = {
            let discoverer = discoverer.clone();
            tokio::spawn(async move { discoverer.start_scanning().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(discoverer.is_scanning());

        // The racing caller defers to the running scan.
        assert!(matches!(discoverer.start_scanning().await, Ok(None)));

        discoverer.stop_scanning().await;
        let outcome = tokio::time::timeout(Duration::from_secs(1), owner)
            .await
            .expect("cancellation should land promptly")
            .unwrap();
        assert!(matches!(outcome, Err(BatonError::Cancelled)));
        assert!(!discoverer.is_scanning());
    }

    #[tokio::test]
    async fn missing_interface_surfaces_and_releases_the_flag() {
        struct NoInterface;
        impl InterfaceSource for NoInterface {
            fn local_address(&self) -> Result<(Ipv4Addr, u8), BatonError> {
                Err(BatonError::NoActiveInterface)
            }
        }

        let discoverer = Discoverer::new(NoInterface, 4308);
        assert!(matches!(
            discoverer.start_scanning().await,
            Err(BatonError::NoActiveInterface)
        ));
        // The flag is released; the next call fails the same way
        // rather than reporting a scan in progress.
        assert!(matches!(
            discoverer.start_scanning().await,
            Err(BatonError::NoActiveInterface)
        ));
    }

    #[tokio::test]
    async fn manual_address_bypasses_the_scan() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let discoverer = Discoverer::new(FixedInterface(LOCAL, 30), port);
        let (_stream, endpoint) = discoverer
            .connect_to_address("127.0.0.1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(endpoint, Endpoint::new("127.0.0.1", port));
    }

    #[tokio::test]
    async fn failed_manual_connect_falls_back_to_scanning() {
        // Manual target answers nothing; the subnet scan then finds
        // the real server on 127.0.0.2.
        let listener = TcpListener::bind("127.0.0.2:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let discoverer = Discoverer::new(FixedInterface(LOCAL, 30), port);
        let (_stream, endpoint) = discoverer
            .connect_to_address("192.0.2.1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(endpoint, Endpoint::new("127.0.0.2", port));
    }
}
