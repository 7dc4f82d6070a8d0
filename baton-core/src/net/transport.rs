//! The live connection to the server.
//!
//! A `Transport` owns exactly one socket. Three duties run against
//! it, each a separate task:
//!
//! - **writer** — sole writer to the socket; drains a channel of
//!   outbound frames so concurrent senders never interleave
//!   mid-frame;
//! - **reader** — drives the framed stream and forwards each decoded
//!   frame to the owner;
//! - **heartbeat** — enqueues a zero-value no-op frame every second
//!   so a silently dropped connection is noticed.
//!
//! Any I/O failure is treated uniformly as connection loss: the
//! socket is shut down and `TransportEvent::Lost` is emitted exactly
//! once. A closed transport is never resurrected — reconnecting
//! means constructing a new one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::{WireCodec, WireEncoding, WireFrame};
use crate::command::Command;
use crate::error::BatonError;
use crate::net::Endpoint;

/// How often the liveness probe goes out.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

const CHANNEL_CAPACITY: usize = 100;

// ── TransportEvent ───────────────────────────────────────────────

/// What the transport reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The socket is connected and the duties are running.
    Connected,
    /// One complete inbound frame, decoded to text.
    Frame(String),
    /// The connection failed; the transport is closed for good.
    /// Emitted at most once, and never for a deliberate disconnect.
    Lost,
}

// ── FrameSender ──────────────────────────────────────────────────

/// Cloneable handle for enqueueing outbound frames.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<WireFrame>,
    encoding: WireEncoding,
}

impl FrameSender {
    pub(crate) fn new(tx: mpsc::Sender<WireFrame>, encoding: WireEncoding) -> Self {
        Self { tx, encoding }
    }

    /// Enqueue a raw frame for the writer task.
    pub async fn send_frame(&self, frame: WireFrame) -> Result<(), BatonError> {
        self.tx.send(frame).await?;
        Ok(())
    }

    /// Encode a command for this transport's wire encoding and
    /// enqueue it.
    pub async fn send_command(&self, command: &Command) -> Result<(), BatonError> {
        self.send_frame(WireFrame::from_command(command, self.encoding)?)
            .await
    }
}

// ── Transport ────────────────────────────────────────────────────

/// One live socket and its writer/reader/heartbeat duties.
#[derive(Debug)]
pub struct Transport {
    endpoint: Endpoint,
    frames: mpsc::Sender<WireFrame>,
    encoding: WireEncoding,
    shutdown: CancellationToken,
    alive: Arc<AtomicBool>,
}

impl Transport {
    /// Connect to `endpoint` within `timeout` and start the duties.
    pub async fn connect(
        endpoint: Endpoint,
        timeout: Duration,
        encoding: WireEncoding,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>), BatonError> {
        let attempt = TcpStream::connect((endpoint.host(), endpoint.port()));
        let stream = tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| BatonError::Timeout(timeout))??;
        debug!(%endpoint, "connected");
        Ok(Self::from_stream(stream, endpoint, encoding))
    }

    /// Adopt an already-connected stream (the discovery path).
    pub fn from_stream(
        stream: TcpStream,
        endpoint: Endpoint,
        encoding: WireEncoding,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (mut sink, mut source) = Framed::new(stream, WireCodec).split();

        let (frame_tx, mut frame_rx) = mpsc::channel::<WireFrame>(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();
        let alive = Arc::new(AtomicBool::new(true));

        // The buffer is empty at this point; the success event always fits.
        let _ = event_tx.try_send(TransportEvent::Connected);

        // Writer duty: sole socket writer.
        {
            let alive = alive.clone();
            let shutdown = shutdown.clone();
            let events = event_tx.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        maybe_frame = frame_rx.recv() => match maybe_frame {
                            Some(frame) => {
                                if let Err(e) = sink.send(frame).await {
                                    warn!(error = %e, "socket write failed");
                                    report_lost(&alive, &shutdown, &events).await;
                                    break;
                                }
                            }
                            None => break,
                        },
                    }
                }
            });
        }

        // Reader duty: decoded frames out, loss on error or EOF.
        {
            let alive = alive.clone();
            let shutdown = shutdown.clone();
            let events = event_tx.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        item = source.next() => match item {
                            Some(Ok(frame)) => {
                                debug!(%frame, "received frame");
                                if events.send(TransportEvent::Frame(frame)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Err(e)) => {
                                warn!(error = %e, "socket read failed");
                                report_lost(&alive, &shutdown, &events).await;
                                break;
                            }
                            None => {
                                debug!("server closed the connection");
                                report_lost(&alive, &shutdown, &events).await;
                                break;
                            }
                        },
                    }
                }
            });
        }

        // Heartbeat duty: a no-op frame per interval.
        {
            let alive = alive.clone();
            let shutdown = shutdown.clone();
            let events = event_tx.clone();
            let heartbeat_tx = frame_tx.clone();
            let probe_frame = match encoding {
                WireEncoding::Text => WireFrame::Text(Command::Noop.encode_text()),
                WireEncoding::Legacy => WireFrame::Legacy(0),
            };
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = interval.tick() => {
                            if !alive.load(Ordering::SeqCst) {
                                break;
                            }
                            if heartbeat_tx.send(probe_frame.clone()).await.is_err() {
                                report_lost(&alive, &shutdown, &events).await;
                                break;
                            }
                        }
                    }
                }
            });
        }

        (
            Self {
                endpoint,
                frames: frame_tx,
                encoding,
                shutdown,
                alive,
            },
            event_rx,
        )
    }

    /// The server this transport is bound to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// A cloneable handle for sending frames/commands.
    pub fn sender(&self) -> FrameSender {
        FrameSender {
            tx: self.frames.clone(),
            encoding: self.encoding,
        }
    }

    /// Encode and enqueue a command. Flushed by the writer before it
    /// takes the next frame.
    pub async fn send_command(&self, command: &Command) -> Result<(), BatonError> {
        self.sender().send_command(command).await
    }

    /// Live state at call time, not cached at construction.
    pub fn is_connected(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.shutdown.is_cancelled()
    }

    /// Close the socket and stop all duties. Idempotent; close
    /// errors are swallowed; no `Lost` event is emitted for a
    /// deliberate disconnect.
    pub fn disconnect(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.shutdown.cancel();
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Flip the alive flag and emit `Lost` — first caller wins, every
/// later call is a no-op.
async fn report_lost(
    alive: &AtomicBool,
    shutdown: &CancellationToken,
    events: &mpsc::Sender<TransportEvent>,
) {
    if alive.swap(false, Ordering::SeqCst) {
        shutdown.cancel();
        let _ = events.send(TransportEvent::Lost).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn ephemeral_listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let endpoint = Endpoint::new(addr.ip().to_string(), addr.port());
        (listener, endpoint)
    }

    fn text_frame(payload: &str) -> Vec<u8> {
        let mut bytes = (payload.len() as u16).to_be_bytes().to_vec();
        bytes.extend_from_slice(payload.as_bytes());
        bytes
    }

    #[tokio::test]
    async fn connected_is_the_first_event() {
        let (listener, endpoint) = ephemeral_listener().await;
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

        let (transport, mut events) =
            Transport::connect(endpoint, Duration::from_secs(1), WireEncoding::Text)
                .await
                .unwrap();
        accept.await.unwrap();

        assert_eq!(events.recv().await.unwrap(), TransportEvent::Connected);
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn connect_fails_against_blackhole() {
        // TEST-NET-1 either hangs until the deadline or is refused
        // outright; it never connects.
        let endpoint = Endpoint::new("192.0.2.1", 4308);
        let result =
            Transport::connect(endpoint, Duration::from_millis(50), WireEncoding::Text).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn inbound_frames_are_delivered() {
        let (listener, endpoint) = ephemeral_listener().await;
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream
                .write_all(&text_frame("artist||Queen"))
                .await
                .unwrap();
            stream
        });

        let (_transport, mut events) =
            Transport::connect(endpoint, Duration::from_secs(1), WireEncoding::Text)
                .await
                .unwrap();
        let _stream = server.await.unwrap();

        assert_eq!(events.recv().await.unwrap(), TransportEvent::Connected);
        assert_eq!(
            events.recv().await.unwrap(),
            TransportEvent::Frame("artist||Queen".into())
        );
    }

    #[tokio::test]
    async fn heartbeat_reaches_the_server() {
        let (listener, endpoint) = ephemeral_listener().await;
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 3];
            stream.read_exact(&mut buf).await.unwrap();
            buf
        });

        let (_transport, _events) =
            Transport::connect(endpoint, Duration::from_secs(1), WireEncoding::Text)
                .await
                .unwrap();

        // First heartbeat fires immediately: length-prefixed "0".
        let buf = tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf, &[0, 1, b'0']);
    }

    #[tokio::test]
    async fn loss_is_reported_once_when_server_drops() {
        let (listener, endpoint) = ephemeral_listener().await;
        let server = tokio::spawn(async move { listener.accept().await.unwrap() });

        let (transport, mut events) =
            Transport::connect(endpoint, Duration::from_secs(1), WireEncoding::Text)
                .await
                .unwrap();
        let (stream, _) = server.await.unwrap();
        assert_eq!(events.recv().await.unwrap(), TransportEvent::Connected);

        drop(stream);

        let lost = tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                match events.recv().await {
                    Some(TransportEvent::Lost) => break true,
                    Some(_) => continue,
                    None => break false,
                }
            }
        })
        .await
        .unwrap();
        assert!(lost);
        assert!(!transport.is_connected());

        // Exactly once: the channel ends without a second Lost.
        let trailing = tokio::time::timeout(Duration::from_millis(300), events.recv()).await;
        assert!(matches!(trailing, Ok(None) | Err(_)));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_silent() {
        let (listener, endpoint) = ephemeral_listener().await;
        let server = tokio::spawn(async move { listener.accept().await.unwrap() });

        let (transport, mut events) =
            Transport::connect(endpoint, Duration::from_secs(1), WireEncoding::Text)
                .await
                .unwrap();
        server.await.unwrap();
        assert_eq!(events.recv().await.unwrap(), TransportEvent::Connected);

        transport.disconnect();
        transport.disconnect();
        assert!(!transport.is_connected());

        // The duties stop; no Lost event is emitted for a deliberate
        // disconnect.
        let next = tokio::time::timeout(Duration::from_millis(300), events.recv()).await;
        assert!(matches!(next, Ok(None) | Err(_)));
    }

    #[tokio::test]
    async fn commands_are_flushed_to_the_socket() {
        let (listener, endpoint) = ephemeral_listener().await;
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            // Collect enough bytes for a heartbeat plus the command.
            let mut collected = Vec::new();
            let mut buf = [0u8; 64];
            while collected.len() < 9 {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                collected.extend_from_slice(&buf[..n]);
            }
            collected
        });

        let (transport, _events) =
            Transport::connect(endpoint, Duration::from_secs(1), WireEncoding::Text)
                .await
                .unwrap();
        transport.send_command(&Command::Seek(42)).await.unwrap();

        let collected = tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .unwrap()
            .unwrap();
        let expected = text_frame("7||42");
        assert!(
            collected
                .windows(expected.len())
                .any(|w| w == expected.as_slice()),
            "command frame not found in {collected:?}"
        );
    }
}
