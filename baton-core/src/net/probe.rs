//! Bounded-timeout TCP connect probing.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::trace;

use crate::net::Endpoint;

/// Attempt a TCP connect to `endpoint` within `timeout`.
///
/// Every failure mode — refused, unreachable, timed out — returns
/// `None`; nothing propagates into caller control flow. The
/// half-open socket of a failed attempt is dropped here, so no
/// handle leaks either way.
pub async fn probe(endpoint: &Endpoint, timeout: Duration) -> Option<TcpStream> {
    let attempt = TcpStream::connect((endpoint.host(), endpoint.port()));
    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(stream)) => Some(stream),
        Ok(Err(e)) => {
            trace!(%endpoint, error = %e, "probe refused");
            None
        }
        Err(_) => {
            trace!(%endpoint, ?timeout, "probe timed out");
            None
        }
    }
}
