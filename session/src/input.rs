//! Client input boundary: wire decoding and per-player sequence tracking.

use std::collections::BTreeMap;

use blast_maze_core::{Direction, InputKind, PlayerId, PlayerInput};
use serde::Deserialize;
use thiserror::Error;

/// Largest encoded client message accepted by [`decode_input`].
pub const MAX_INPUT_BYTES: usize = 1024;

/// Tagged JSON message sent by a client.
///
/// ```json
/// {"type":"move","sequence":4,"direction":"East","timestamp_ms":1200}
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start or keep walking in a direction.
    Move {
        /// Client-assigned sequence number.
        sequence: u64,
        /// Requested heading.
        direction: Direction,
        /// Client clock when the input was produced.
        timestamp_ms: u64,
    },
    /// Drop a bomb on the current tile.
    PlaceBomb {
        /// Client-assigned sequence number.
        sequence: u64,
        /// Client clock when the input was produced.
        timestamp_ms: u64,
    },
    /// Stop walking.
    Stop {
        /// Client-assigned sequence number.
        sequence: u64,
        /// Client clock when the input was produced.
        timestamp_ms: u64,
    },
}

impl From<ClientMessage> for PlayerInput {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::Move {
                sequence,
                direction,
                timestamp_ms,
            } => Self {
                sequence,
                kind: InputKind::Move { direction },
                timestamp_ms,
            },
            ClientMessage::PlaceBomb {
                sequence,
                timestamp_ms,
            } => Self {
                sequence,
                kind: InputKind::PlaceBomb,
                timestamp_ms,
            },
            ClientMessage::Stop {
                sequence,
                timestamp_ms,
            } => Self {
                sequence,
                kind: InputKind::Stop,
                timestamp_ms,
            },
        }
    }
}

/// Reasons an encoded client message is refused at the boundary.
#[derive(Debug, Error)]
pub enum InputError {
    /// The payload exceeds [`MAX_INPUT_BYTES`].
    #[error("input of {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Received payload size.
        size: usize,
        /// Accepted maximum.
        limit: usize,
    },
    /// The payload is not a well-formed client message.
    #[error("malformed input: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decodes one JSON client message into a [`PlayerInput`].
pub fn decode_input(bytes: &[u8]) -> Result<PlayerInput, InputError> {
    if bytes.len() > MAX_INPUT_BYTES {
        return Err(InputError::TooLarge {
            size: bytes.len(),
            limit: MAX_INPUT_BYTES,
        });
    }
    let message: ClientMessage = serde_json::from_slice(bytes)?;
    Ok(message.into())
}

/// What the session did with an enqueued input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputDisposition {
    /// Queued for the next tick.
    Queued,
    /// The sequence number was already seen; the input was ignored.
    Duplicate,
    /// The player is not part of the session.
    UnknownPlayer,
    /// The session has already ended.
    SessionEnded,
}

/// Highest sequence number accepted per player.
#[derive(Clone, Debug, Default)]
pub(crate) struct SequenceLedger {
    highest: BTreeMap<PlayerId, u64>,
}

impl SequenceLedger {
    /// Records `sequence` and reports whether it is newer than every earlier one.
    pub(crate) fn admit(&mut self, player: PlayerId, sequence: u64) -> bool {
        match self.highest.get(&player) {
            Some(highest) if sequence <= *highest => false,
            _ => {
                let _ = self.highest.insert(player, sequence);
                true
            }
        }
    }

    pub(crate) fn forget(&mut self, player: PlayerId) {
        let _ = self.highest.remove(&player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_message_kind() {
        let moved = decode_input(
            br#"{"type":"move","sequence":4,"direction":"East","timestamp_ms":1200}"#,
        )
        .expect("move decodes");
        assert_eq!(
            moved,
            PlayerInput {
                sequence: 4,
                kind: InputKind::Move {
                    direction: Direction::East
                },
                timestamp_ms: 1200,
            }
        );

        let bomb = decode_input(br#"{"type":"place_bomb","sequence":5,"timestamp_ms":1300}"#)
            .expect("bomb decodes");
        assert_eq!(bomb.kind, InputKind::PlaceBomb);

        let stop = decode_input(br#"{"type":"stop","sequence":6,"timestamp_ms":1400}"#)
            .expect("stop decodes");
        assert_eq!(stop.kind, InputKind::Stop);
    }

    #[test]
    fn rejects_malformed_payloads() {
        let payloads: [&[u8]; 4] = [
            b"not json",
            br#"{"type":"teleport","sequence":1,"timestamp_ms":0}"#,
            br#"{"type":"move","sequence":1,"timestamp_ms":0}"#,
            br#"{"type":"stop","sequence":-1,"timestamp_ms":0}"#,
        ];
        for payload in payloads {
            assert!(
                matches!(decode_input(payload), Err(InputError::Malformed(_))),
                "accepted {}",
                String::from_utf8_lossy(payload)
            );
        }
    }

    #[test]
    fn rejects_oversized_payloads() {
        let payload = vec![b' '; MAX_INPUT_BYTES + 1];
        assert!(matches!(
            decode_input(&payload),
            Err(InputError::TooLarge { size, .. }) if size == MAX_INPUT_BYTES + 1
        ));
    }

    #[test]
    fn ledger_ignores_stale_sequences_per_player() {
        let mut ledger = SequenceLedger::default();
        let first = PlayerId::new(1);
        let second = PlayerId::new(2);

        assert!(ledger.admit(first, 3));
        assert!(!ledger.admit(first, 3));
        assert!(!ledger.admit(first, 2));
        assert!(ledger.admit(second, 1));
        assert!(ledger.admit(first, 4));

        ledger.forget(first);
        assert!(ledger.admit(first, 1));
    }
}
