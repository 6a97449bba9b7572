//! Per-client delivery queue with snapshot collapse, and client-side gap detection.

use std::collections::VecDeque;

use blast_maze_core::{FullSnapshot, ServerMessage};
use tracing::debug;

/// How [`Outbox::push`] stored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Appended behind the messages already waiting.
    Queued,
    /// The queue was full; everything waiting was replaced by one full snapshot.
    Collapsed,
}

/// Bounded queue of messages waiting to be written to one client.
///
/// A client that falls behind never makes the queue grow past its capacity:
/// the backlog is discarded and replaced with a snapshot of the current state,
/// which supersedes every delta it would have carried.
#[derive(Clone, Debug)]
pub struct Outbox {
    capacity: usize,
    queue: VecDeque<ServerMessage>,
    collapses: u64,
}

impl Outbox {
    /// Creates an empty outbox holding at most `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            queue: VecDeque::with_capacity(capacity),
            collapses: 0,
        }
    }

    /// Queues a message, collapsing the backlog into `snapshot()` when full.
    ///
    /// `SessionEnded` is always appended so that a lagging client still learns
    /// the outcome.
    pub fn push<F>(&mut self, message: ServerMessage, snapshot: F) -> Delivery
    where
        F: FnOnce() -> FullSnapshot,
    {
        let terminal = matches!(message, ServerMessage::SessionEnded { .. });
        if terminal || self.queue.len() < self.capacity {
            self.queue.push_back(message);
            return Delivery::Queued;
        }

        let dropped = self.queue.len();
        self.queue.clear();
        self.queue.push_back(ServerMessage::Snapshot(snapshot()));
        self.collapses += 1;
        debug!(dropped, tick = message.tick(), "outbox collapsed into a snapshot");
        Delivery::Collapsed
    }

    /// Removes the oldest waiting message.
    pub fn pop(&mut self) -> Option<ServerMessage> {
        self.queue.pop_front()
    }

    /// Removes every waiting message in delivery order.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        self.queue.drain(..).collect()
    }

    /// Number of waiting messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Reports whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of times the backlog has been replaced by a snapshot.
    #[must_use]
    pub const fn collapses(&self) -> u64 {
        self.collapses
    }
}

/// What a client should do with a received message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorStep {
    /// Apply the message; it follows the last applied tick.
    Apply,
    /// Ignore the message; its tick was already applied.
    Stale,
    /// One or more deltas are missing; request a full snapshot.
    Resync {
        /// Tick the client expected next, if it has applied anything yet.
        expected: Option<u64>,
        /// Tick carried by the received message.
        received: u64,
    },
}

/// Client-side tracker that detects gaps in the delta stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeltaCursor {
    applied: Option<u64>,
}

impl DeltaCursor {
    /// Creates a cursor that has not applied any message yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { applied: None }
    }

    /// Last tick applied by the client.
    #[must_use]
    pub const fn applied(&self) -> Option<u64> {
        self.applied
    }

    /// Classifies `message` and advances the cursor when it should be applied.
    pub fn observe(&mut self, message: &ServerMessage) -> CursorStep {
        let received = message.tick();
        match message {
            ServerMessage::Snapshot(_) => {
                self.applied = Some(received);
                CursorStep::Apply
            }
            ServerMessage::SessionEnded { .. } => CursorStep::Apply,
            ServerMessage::Delta(_) => match self.applied {
                Some(applied) if received <= applied => CursorStep::Stale,
                Some(applied) if received == applied + 1 => {
                    self.applied = Some(received);
                    CursorStep::Apply
                }
                applied => CursorStep::Resync {
                    expected: applied.map(|tick| tick + 1),
                    received,
                },
            },
        }
    }
}
