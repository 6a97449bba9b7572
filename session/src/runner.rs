//! Runs a [`Session`] on its own tokio task.
//!
//! The task is the only mutator of its session. Requests arrive through an
//! unbounded channel and are drained at the start of every tick; messages for
//! clients are written to per-player [`Outbox`]es that never grow past the
//! configured capacity. Sessions share nothing, so any number of them can run
//! side by side.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use blast_maze_core::{
    GameSettings, GameStatistics, PlayerId, PlayerInput, RoomPlayer, ServerMessage,
};
use thiserror::Error;
use tokio::{
    sync::{
        mpsc::{self, error::TryRecvError},
        oneshot, Notify,
    },
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::{InputDisposition, Outbox, Session, SessionEnd, StartError};

/// Requests a room forwards to a running session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRequest {
    /// Decoded client input.
    Input {
        /// Sending player.
        player: PlayerId,
        /// The input itself.
        input: PlayerInput,
    },
    /// The player's connection dropped.
    Disconnect {
        /// Affected player.
        player: PlayerId,
    },
    /// The player's connection was restored.
    Reconnect {
        /// Affected player.
        player: PlayerId,
    },
    /// The player left the session for good.
    Leave {
        /// Affected player.
        player: PlayerId,
    },
    /// The client detected a gap and needs a full snapshot.
    Resync {
        /// Requesting player.
        player: PlayerId,
    },
}

/// The session task has stopped and accepts no more requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("session is no longer running")]
pub struct SessionClosed;

#[derive(Debug)]
struct MailboxState {
    outbox: Outbox,
    closed: bool,
}

#[derive(Debug)]
struct Mailbox {
    state: Mutex<MailboxState>,
    ready: Notify,
}

/// Receiving side of one player's outbox.
#[derive(Clone, Debug)]
pub struct ClientFeed {
    player: PlayerId,
    mailbox: Arc<Mailbox>,
}

impl ClientFeed {
    fn new(player: PlayerId, capacity: usize) -> Self {
        Self {
            player,
            mailbox: Arc::new(Mailbox {
                state: Mutex::new(MailboxState {
                    outbox: Outbox::new(capacity),
                    closed: false,
                }),
                ready: Notify::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MailboxState> {
        self.mailbox
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, message: ServerMessage, session: &Session) {
        let _ = self.lock().outbox.push(message, || session.full_snapshot());
        self.mailbox.ready.notify_waiters();
    }

    fn close(&self) {
        self.lock().closed = true;
        self.mailbox.ready.notify_waiters();
    }

    /// Player this feed belongs to.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Takes every message waiting right now.
    #[must_use]
    pub fn try_drain(&self) -> Vec<ServerMessage> {
        self.lock().outbox.drain()
    }

    /// Waits for the next batch of messages.
    ///
    /// Returns `None` once the session has stopped and nothing is left.
    pub async fn next_batch(&self) -> Option<Vec<ServerMessage>> {
        loop {
            let notified = self.mailbox.ready.notified();
            {
                let mut state = self.lock();
                let batch = state.outbox.drain();
                if !batch.is_empty() {
                    return Some(batch);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }
}

/// Room-side handle to a session running on its own task.
#[derive(Debug)]
pub struct SessionHandle {
    requests: mpsc::UnboundedSender<SessionRequest>,
    feeds: BTreeMap<PlayerId, ClientFeed>,
    statistics: oneshot::Receiver<GameStatistics>,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Forwards a request to the session.
    pub fn request(&self, request: SessionRequest) -> Result<(), SessionClosed> {
        self.requests.send(request).map_err(|_| SessionClosed)
    }

    /// Forwards a decoded client input to the session.
    pub fn submit(&self, player: PlayerId, input: PlayerInput) -> Result<(), SessionClosed> {
        self.request(SessionRequest::Input { player, input })
    }

    /// Outbox feed for a rostered player.
    #[must_use]
    pub fn feed(&self, player: PlayerId) -> Option<ClientFeed> {
        self.feeds.get(&player).cloned()
    }

    /// Completes once the session task has stopped accepting requests.
    pub async fn closed(&self) {
        self.requests.closed().await;
    }

    /// Stops ticking; the session ends with an aborted outcome.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Waits for the session to end and returns its statistics.
    ///
    /// Returns `None` when the task stopped without producing statistics.
    pub async fn finish(self) -> Option<GameStatistics> {
        let statistics = self.statistics.await.ok();
        if let Err(error) = self.task.await {
            debug!(%error, "session task did not complete");
        }
        statistics
    }
}

/// Starts a session and schedules its ticks on the current tokio runtime.
///
/// Every rostered player receives a full snapshot before the first tick.
pub fn start_game(
    settings: GameSettings,
    roster: &[RoomPlayer],
) -> Result<SessionHandle, StartError> {
    let capacity = settings.sync.outbox_capacity;
    let session = Session::start(settings, roster)?;

    let feeds: BTreeMap<PlayerId, ClientFeed> = roster
        .iter()
        .map(|player| (player.id, ClientFeed::new(player.id, capacity)))
        .collect();
    let opening = ServerMessage::Snapshot(session.full_snapshot());
    for feed in feeds.values() {
        feed.push(opening.clone(), &session);
    }

    let (requests, inbox) = mpsc::unbounded_channel();
    let (statistics_tx, statistics) = oneshot::channel();
    let shutdown = Arc::new(Notify::new());
    let task = tokio::spawn(run(
        session,
        inbox,
        feeds.clone(),
        statistics_tx,
        Arc::clone(&shutdown),
    ));

    Ok(SessionHandle {
        requests,
        feeds,
        statistics,
        shutdown,
        task,
    })
}

async fn run(
    mut session: Session,
    mut inbox: mpsc::UnboundedReceiver<SessionRequest>,
    feeds: BTreeMap<PlayerId, ClientFeed>,
    statistics: oneshot::Sender<GameStatistics>,
    shutdown: Arc<Notify>,
) {
    let mut ticker = interval(session.tick_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let end = loop {
        tokio::select! {
            () = shutdown.notified() => break session.abort("session shut down"),
            _ = ticker.tick() => {
                if let Some(end) = drain_requests(&mut session, &mut inbox, &feeds) {
                    break Some(end);
                }
                let Some(report) = session.tick() else {
                    break None;
                };
                let message = ServerMessage::Delta(report.delta);
                for feed in feeds.values() {
                    feed.push(message.clone(), &session);
                }
                if report.ended.is_some() {
                    break report.ended;
                }
            }
        }
    };

    if let Some(end) = end {
        announce(&session, &feeds, end, statistics);
    }
    for feed in feeds.values() {
        feed.close();
    }
}

/// Applies every waiting request; ends the session when the room is gone.
fn drain_requests(
    session: &mut Session,
    inbox: &mut mpsc::UnboundedReceiver<SessionRequest>,
    feeds: &BTreeMap<PlayerId, ClientFeed>,
) -> Option<SessionEnd> {
    loop {
        let request = match inbox.try_recv() {
            Ok(request) => request,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => return session.abort("room closed"),
        };
        match request {
            SessionRequest::Input { player, input } => {
                let disposition = session.enqueue(player, input);
                if disposition != InputDisposition::Queued {
                    debug!(
                        player = player.get(),
                        sequence = input.sequence,
                        ?disposition,
                        "input not queued"
                    );
                }
            }
            SessionRequest::Disconnect { player } => session.disconnect(player),
            SessionRequest::Reconnect { player } => session.reconnect(player),
            SessionRequest::Leave { player } => session.leave(player),
            SessionRequest::Resync { player } => {
                if let Some(feed) = feeds.get(&player) {
                    feed.push(ServerMessage::Snapshot(session.full_snapshot()), session);
                }
            }
        }
    }
}

fn announce(
    session: &Session,
    feeds: &BTreeMap<PlayerId, ClientFeed>,
    end: SessionEnd,
    statistics: oneshot::Sender<GameStatistics>,
) {
    let message = end.message();
    for feed in feeds.values() {
        feed.push(message.clone(), session);
    }
    info!(tick = end.tick, outcome = ?end.outcome, "statistics handed off");
    if statistics.send(end.statistics).is_err() {
        debug!("statistics receiver dropped");
    }
}
