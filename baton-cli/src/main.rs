//! Headless media-remote client.
//!
//! Discovers (or is pointed at) a media-control server, keeps a
//! session alive across connection losses, prints state changes, and
//! maps stdin lines to control commands.
//!
//! Usage: `baton-cli [host] [--legacy]`

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::Arc;

use async_trait::async_trait;
use baton_core::{
    BatonError, Command, ConnectionListener, Discoverer, InterfaceSource, Session, SessionHandle,
    SessionIntent, Snapshot, Transport, WireEncoding, DEFAULT_PORT,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

// ── Interface lookup ─────────────────────────────────────────────

/// Learns the active local IPv4 address with the UDP-connect trick:
/// connecting a datagram socket picks the outbound interface without
/// sending a single packet. The prefix is assumed to be /24, the
/// overwhelmingly common home-LAN case.
struct DefaultInterfaceSource;

impl InterfaceSource for DefaultInterfaceSource {
    fn local_address(&self) -> Result<(Ipv4Addr, u8), BatonError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(("8.8.8.8", 53))?;
        match socket.local_addr()?.ip() {
            IpAddr::V4(addr) if !addr.is_loopback() => Ok((addr, 24)),
            _ => Err(BatonError::NoActiveInterface),
        }
    }
}

// ── Connection callbacks ─────────────────────────────────────────

struct PrintingListener;

#[async_trait]
impl ConnectionListener for PrintingListener {
    async fn on_connection_success(&self) {
        println!("* connected");
    }

    async fn on_connection_lost(&self) {
        println!("* connection lost");
    }

    async fn on_new_info(&self, info: &str) {
        tracing::trace!(info, "inbound payload");
    }
}

// ── Output ───────────────────────────────────────────────────────

fn print_snapshot(snap: &Snapshot) {
    let p = &snap.player;
    println!(
        "[{}] {} — {}  {}/{} ({:.0}%)  vol {:.0}%  shuffle {}  repeat {:?}",
        if p.playing { "playing" } else { "paused" },
        if p.artist.is_empty() { "?" } else { &p.artist },
        if p.title.is_empty() { "?" } else { &p.title },
        p.position_text,
        p.length_text,
        p.position_percentage * 100.0,
        p.volume * 100.0,
        if p.shuffle { "on" } else { "off" },
        p.repeat,
    );
    if let Some(set) = &snap.selection {
        println!("choose a {} with `pick <n>` (or `dismiss`):", set.kind);
        for (i, item) in set.items.iter().enumerate() {
            let marker = if i as i32 == set.current_index { "*" } else { " " };
            println!("  {marker} {i}: {} ({})", item.label, item.id);
        }
    }
}

// ── Input ────────────────────────────────────────────────────────

fn print_help() {
    println!(
        "commands: p=play/pause  n=next  b=previous  s=shuffle  r=repeat\n\
         seek <0..1>   vol <0..1>   players   devices   pick <n>   dismiss   q=quit"
    );
}

/// Map one stdin line to a session intent. Returns `true` when the
/// user asked to quit.
async fn dispatch(line: &str, handle: &SessionHandle) -> bool {
    let mut words = line.split_whitespace();
    let intent = match (words.next(), words.next()) {
        (Some("p"), _) => SessionIntent::Send(Command::PlayPause),
        (Some("n"), _) => SessionIntent::Send(Command::Next),
        (Some("b"), _) => SessionIntent::Send(Command::Previous),
        (Some("s"), _) => SessionIntent::Send(Command::ToggleShuffle),
        (Some("r"), _) => SessionIntent::Send(Command::ToggleRepeat),
        (Some("players"), _) => SessionIntent::Send(Command::ListPlayers),
        (Some("devices"), _) => SessionIntent::Send(Command::ListDevices),
        (Some("dismiss"), _) => SessionIntent::DismissSelection,
        (Some("q"), _) => return true,
        (Some("seek"), Some(arg)) => match arg.parse::<f32>() {
            Ok(pct) => {
                // A one-shot gesture: begin and end in the same line.
                if handle.intend(SessionIntent::BeginSeek).await.is_err() {
                    return false;
                }
                SessionIntent::EndSeek(pct)
            }
            Err(_) => {
                println!("seek wants a fraction, e.g. `seek 0.5`");
                return false;
            }
        },
        (Some("vol"), Some(arg)) => match arg.parse::<f32>() {
            Ok(volume) => SessionIntent::Send(Command::SetVolume(volume)),
            Err(_) => {
                println!("vol wants a fraction, e.g. `vol 0.7`");
                return false;
            }
        },
        (Some("pick"), Some(arg)) => match arg.parse::<usize>() {
            Ok(index) => SessionIntent::ConfirmSelection(index),
            Err(_) => {
                println!("pick wants an index, e.g. `pick 1`");
                return false;
            }
        },
        (None, _) => return false,
        _ => {
            print_help();
            return false;
        }
    };

    if handle.intend(intent).await.is_err() {
        warn!("session is gone; reconnecting");
    }
    false
}

// ── Supervisor ───────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), BatonError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "baton_core=info,baton_cli=info".into()),
        )
        .init();

    let mut manual_host: Option<String> = None;
    let mut encoding = WireEncoding::Text;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--legacy" => encoding = WireEncoding::Legacy,
            host => manual_host = Some(host.to_string()),
        }
    }

    let discoverer = Discoverer::new(DefaultInterfaceSource, DEFAULT_PORT);
    let listener = Arc::new(PrintingListener);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    print_help();

    loop {
        println!("* looking for a server...");
        let found = match &manual_host {
            Some(host) => discoverer.connect_to_address(host).await?,
            None => discoverer.start_scanning().await?,
        };
        // A second concurrent scan cannot happen here; the loop is
        // the only caller.
        let Some((stream, endpoint)) = found else {
            continue;
        };
        info!(%endpoint, "server found");

        let (transport, events) = Transport::from_stream(stream, endpoint, encoding);
        let (handle, mut session) = Session::spawn(events, transport.sender(), listener.clone());

        // Print every state change until the session ends.
        let printer = {
            let mut rx = handle.watch();
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let snap = rx.borrow().clone();
                    print_snapshot(&snap);
                }
            })
        };

        let quit = loop {
            tokio::select! {
                _ = &mut session => break false,
                line = stdin.next_line() => match line {
                    Ok(Some(line)) => {
                        if dispatch(line.trim(), &handle).await {
                            break true;
                        }
                    }
                    // stdin closed: keep mirroring state until loss.
                    Ok(None) => {
                        (&mut session).await.ok();
                        break false;
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break true;
                    }
                },
            }
        };

        transport.disconnect();
        printer.abort();

        if quit {
            println!("* bye");
            return Ok(());
        }
        println!("* reconnecting");
    }
}
