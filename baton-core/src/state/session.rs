//! The session state machine.
//!
//! One task owns all mutable session state. Transport events and
//! consumer intents arrive over channels, are applied in order, and
//! every visible change is published as a [`Snapshot`] on a
//! `tokio::sync::watch` channel. Readers clone the latest snapshot;
//! nothing ever blocks on them and no reader observes a torn update.
//!
//! The task terminates when the transport reports loss (or its event
//! channel closes after a deliberate disconnect). Reconnecting means
//! a fresh transport and a fresh session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::BatonError;
use crate::event::Event;
use crate::listener::ConnectionListener;
use crate::net::transport::{FrameSender, TransportEvent};
use crate::state::player::{position_percentage, PlayerState};
use crate::state::selection::{SelectionKind, SelectionSet};

/// How long the server gets to switch players before the session
/// asks it for the new now-playing state.
pub const SELECT_SETTLE_DELAY: Duration = Duration::from_millis(500);

const INTENT_CAPACITY: usize = 32;

// ── Snapshot / SessionIntent ─────────────────────────────────────

/// Everything a consumer can observe about the session, at one
/// point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub connected: bool,
    pub player: PlayerState,
    /// An open player/device choice prompt, if the server sent one
    /// that has not been confirmed or dismissed yet.
    pub selection: Option<SelectionSet>,
}

/// What a consumer can ask the session to do.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionIntent {
    /// Send a command as-is.
    Send(Command),
    /// A local seek gesture started; inbound position echoes must
    /// not move the progress indicator until it ends.
    BeginSeek,
    /// The gesture ended at this fraction of the track; seek there.
    EndSeek(f32),
    /// Confirm the open selection at this item index.
    ConfirmSelection(usize),
    /// Close the open selection without choosing.
    DismissSelection,
}

// ── SessionHandle ────────────────────────────────────────────────

/// Consumer-side handle: intents in, snapshots out.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    intents: mpsc::Sender<SessionIntent>,
    state: watch::Receiver<Snapshot>,
}

impl SessionHandle {
    /// Queue an intent for the session task.
    pub async fn intend(&self, intent: SessionIntent) -> Result<(), BatonError> {
        self.intents.send(intent).await?;
        Ok(())
    }

    /// A fresh watch receiver for awaiting state changes.
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.state.clone()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }
}

// ── Session ──────────────────────────────────────────────────────

/// Spawns and names the state-machine task.
pub struct Session;

impl Session {
    /// Start the session over an established transport.
    ///
    /// `events` and `sender` come from the transport; `listener`
    /// receives the connection callbacks. The returned join handle
    /// resolves when the connection is gone.
    pub fn spawn(
        events: mpsc::Receiver<TransportEvent>,
        sender: FrameSender,
        listener: Arc<dyn ConnectionListener>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (intent_tx, intent_rx) = mpsc::channel(INTENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(Snapshot::default());

        let task = SessionTask {
            events,
            intents: intent_rx,
            sender,
            listener,
            state: state_tx,
            snapshot: Snapshot::default(),
            seek_active: false,
        };
        let join = tokio::spawn(task.run());

        (
            SessionHandle {
                intents: intent_tx,
                state: state_rx,
            },
            join,
        )
    }
}

struct SessionTask {
    events: mpsc::Receiver<TransportEvent>,
    intents: mpsc::Receiver<SessionIntent>,
    sender: FrameSender,
    listener: Arc<dyn ConnectionListener>,
    state: watch::Sender<Snapshot>,
    snapshot: Snapshot,
    seek_active: bool,
}

impl SessionTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(TransportEvent::Connected) => self.on_connected().await,
                    Some(TransportEvent::Frame(frame)) => self.on_frame(&frame).await,
                    Some(TransportEvent::Lost) => {
                        self.on_lost().await;
                        break;
                    }
                    // Deliberate disconnect: the channel closes with
                    // no Lost event.
                    None => break,
                },
                intent = self.intents.recv() => match intent {
                    Some(intent) => self.on_intent(intent).await,
                    None => break,
                },
            }
        }
    }

    fn publish(&self) {
        self.state.send_replace(self.snapshot.clone());
    }

    async fn send(&self, command: Command) {
        if let Err(e) = self.sender.send_command(&command).await {
            warn!(%command, error = %e, "failed to queue command");
        }
    }

    async fn on_connected(&mut self) {
        self.snapshot.connected = true;
        self.publish();
        self.listener.on_connection_success().await;
        self.send(Command::NowPlaying).await;
    }

    async fn on_frame(&mut self, frame: &str) {
        self.listener.on_new_info(frame).await;
        match Event::decode(frame) {
            Event::Fields(update) => {
                self.snapshot.player.apply(&update, !self.seek_active);
            }
            Event::Selection(set) => {
                if set.is_empty() {
                    debug!(kind = %set.kind, "ignoring empty selection list");
                    return;
                }
                self.snapshot.selection = Some(set);
            }
        }
        self.publish();
    }

    async fn on_lost(&mut self) {
        self.snapshot.connected = false;
        self.snapshot.player.playing = false;
        self.publish();
        self.listener.on_connection_lost().await;
    }

    async fn on_intent(&mut self, intent: SessionIntent) {
        match intent {
            SessionIntent::Send(command) => {
                // Volume is applied optimistically so a local slider
                // does not snap back while the echo is in flight.
                if let Command::SetVolume(volume) = command {
                    self.snapshot.player.volume = volume.clamp(0.0, 1.0);
                    self.publish();
                }
                self.send(command).await;
            }
            SessionIntent::BeginSeek => {
                self.seek_active = true;
            }
            SessionIntent::EndSeek(percentage) => {
                let percentage = percentage.clamp(0.0, 1.0);
                let target = (percentage * self.snapshot.player.length_secs as f32) as u32;
                self.snapshot.player.position_secs = target;
                self.snapshot.player.position_percentage =
                    position_percentage(target, self.snapshot.player.length_secs);
                self.seek_active = false;
                self.publish();
                self.send(Command::Seek(target)).await;
            }
            SessionIntent::ConfirmSelection(index) => self.confirm_selection(index).await,
            SessionIntent::DismissSelection => {
                self.snapshot.selection = None;
                self.publish();
            }
        }
    }

    async fn confirm_selection(&mut self, index: usize) {
        let Some(set) = self.snapshot.selection.as_ref() else {
            debug!(index, "no selection open to confirm");
            return;
        };
        let Some(item) = set.items.get(index) else {
            warn!(index, count = set.items.len(), "selection index out of range");
            return;
        };

        match set.kind {
            SelectionKind::Player => {
                self.send(Command::SelectPlayer(index)).await;
                // The old track's fields are stale the moment the
                // player changes; show a blank slate while the
                // server settles, then ask it what is playing now.
                self.snapshot.player.clear_track();
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(SELECT_SETTLE_DELAY).await;
                    if let Err(e) = sender.send_command(&Command::NowPlaying).await {
                        debug!(error = %e, "post-switch refresh skipped");
                    }
                });
            }
            SelectionKind::Device => match item.id.parse::<i64>() {
                Ok(id) => self.send(Command::SelectDevice(id)).await,
                Err(_) => {
                    warn!(id = %item.id, "device id is not numeric");
                    return;
                }
            },
        }

        self.snapshot.selection = None;
        self.publish();
    }
}
