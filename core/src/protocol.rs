//! Wire-level contracts exchanged with the transport, room, and persistence layers.

use serde::{Deserialize, Serialize};

use crate::{
    BombId, BombSnapshot, Direction, Explosion, GateSnapshot, MonsterId, MonsterSnapshot,
    PlacementRejection, PlayerId, PlayerSnapshot, PowerUpId, PowerUpSnapshot, Tile, TilePos,
};

/// Member of the roster handed over by the room layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPlayer {
    /// Identifier assigned by the room layer.
    pub id: PlayerId,
    /// Display name of the player.
    pub name: String,
}

/// Validated client input consumed by the tick loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Monotonic per-player sequence number assigned by the client.
    pub sequence: u64,
    /// Requested action.
    pub kind: InputKind,
    /// Client-side timestamp in milliseconds, carried for diagnostics only.
    pub timestamp_ms: u64,
}

/// Closed set of actions a client may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    /// Start or keep moving in a direction.
    Move {
        /// Requested direction.
        direction: Direction,
    },
    /// Place a bomb on the occupied tile.
    PlaceBomb,
    /// Stop moving.
    Stop,
}

/// Acknowledgement echoing the last processed input of a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAck {
    /// Player whose input was processed.
    pub player: PlayerId,
    /// Sequence number of the processed input.
    pub sequence: u64,
    /// Result of applying the input.
    pub outcome: InputOutcome,
}

/// Result of applying a single input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputOutcome {
    /// The input was applied.
    Applied,
    /// The input was valid but the world rejected the action.
    Rejected {
        /// Reason reported by the bomb engine.
        reason: PlacementRejection,
    },
}

/// Terminal result of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// A player reached an active gate.
    Victory,
    /// Every player was eliminated or the time limit elapsed.
    Defeat,
    /// The session ended abnormally.
    Aborted,
}

/// Progress of the session objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveState {
    /// The session is still running.
    InProgress,
    /// The session reached a terminal state.
    Completed(Outcome),
}

/// Objective summary attached to every delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveStatus {
    /// Progress of the objective.
    pub state: ObjectiveState,
    /// Gates placed in the maze.
    pub gates_total: u32,
    /// Gates whose covering wall has been destroyed.
    pub gates_revealed: u32,
    /// Gates currently usable as exits.
    pub gates_active: u32,
    /// Monsters currently alive, bosses included.
    pub monsters_alive: u32,
    /// Bosses currently alive.
    pub bosses_alive: u32,
    /// Wave members waiting to spawn.
    pub pending_spawns: u32,
}

impl Default for ObjectiveStatus {
    fn default() -> Self {
        Self {
            state: ObjectiveState::InProgress,
            gates_total: 0,
            gates_revealed: 0,
            gates_active: 0,
            monsters_alive: 0,
            bosses_alive: 0,
            pending_spawns: 0,
        }
    }
}

/// Tile whose contents changed during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileChange {
    /// Coordinate of the tile.
    pub tile: TilePos,
    /// Contents after the change.
    pub now: Tile,
}

/// Minimal per-tick update broadcast to every client.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    /// Tick sequence number; consecutive deltas differ by exactly one.
    pub tick: u64,
    /// Players whose snapshot changed.
    pub changed_players: Vec<PlayerSnapshot>,
    /// Players that left the session.
    pub removed_players: Vec<PlayerId>,
    /// Bombs that appeared or changed.
    pub changed_bombs: Vec<BombSnapshot>,
    /// Bombs removed from the registry.
    pub removed_bombs: Vec<BombId>,
    /// Explosions resolved during the tick.
    pub new_explosions: Vec<Explosion>,
    /// Monsters that appeared or changed.
    pub changed_monsters: Vec<MonsterSnapshot>,
    /// Monsters removed from the registry.
    pub removed_monsters: Vec<MonsterId>,
    /// Power-ups that appeared or changed.
    pub changed_power_ups: Vec<PowerUpSnapshot>,
    /// Power-ups collected, destroyed, or expired.
    pub removed_power_ups: Vec<PowerUpId>,
    /// Gates whose status changed.
    pub changed_gates: Vec<GateSnapshot>,
    /// Tiles whose contents changed.
    pub maze_changes: Vec<TileChange>,
    /// Objective summary after the tick.
    pub objective: ObjectiveStatus,
    /// Acknowledgements of inputs processed during the tick.
    pub acks: Vec<InputAck>,
}

impl StateDelta {
    /// Reports whether the delta carries no entity, maze, or ack changes.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.changed_players.is_empty()
            && self.removed_players.is_empty()
            && self.changed_bombs.is_empty()
            && self.removed_bombs.is_empty()
            && self.new_explosions.is_empty()
            && self.changed_monsters.is_empty()
            && self.removed_monsters.is_empty()
            && self.changed_power_ups.is_empty()
            && self.removed_power_ups.is_empty()
            && self.changed_gates.is_empty()
            && self.maze_changes.is_empty()
            && self.acks.is_empty()
    }
}

/// Complete state sent on join, resync, or outbox overflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FullSnapshot {
    /// Tick sequence number the snapshot reflects.
    pub tick: u64,
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Row-major tile contents.
    pub tiles: Vec<Tile>,
    /// Every player in the session.
    pub players: Vec<PlayerSnapshot>,
    /// Every bomb in the registry.
    pub bombs: Vec<BombSnapshot>,
    /// Every monster alive.
    pub monsters: Vec<MonsterSnapshot>,
    /// Every power-up on the ground.
    pub power_ups: Vec<PowerUpSnapshot>,
    /// Every gate in the maze.
    pub gates: Vec<GateSnapshot>,
    /// Objective summary.
    pub objective: ObjectiveStatus,
}

/// Messages the session pushes to client outboxes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Incremental update for one tick.
    Delta(StateDelta),
    /// Complete state replacing everything the client holds.
    Snapshot(FullSnapshot),
    /// Terminal notification; no further messages follow.
    SessionEnded {
        /// Tick at which the session ended.
        tick: u64,
        /// Terminal result.
        outcome: Outcome,
        /// Human readable reason.
        reason: String,
    },
}

impl ServerMessage {
    /// Tick sequence number carried by the message.
    #[must_use]
    pub fn tick(&self) -> u64 {
        match self {
            Self::Delta(delta) => delta.tick,
            Self::Snapshot(snapshot) => snapshot.tick,
            Self::SessionEnded { tick, .. } => *tick,
        }
    }
}

/// Per-player totals reported at the end of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatistics {
    /// Player the totals belong to.
    pub player: PlayerId,
    /// Display name of the player.
    pub name: String,
    /// Monsters killed by the player's bombs.
    pub kills: u32,
    /// Times the player died.
    pub deaths: u32,
    /// Score earned from kills.
    pub score: u64,
    /// Bombs the player placed.
    pub bombs_placed: u32,
    /// Walls destroyed by the player's bombs.
    pub walls_destroyed: u32,
    /// Power-ups the player collected.
    pub power_ups_collected: u32,
}

/// Session summary handed to the persistence layer exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatistics {
    /// Simulated session length in milliseconds.
    pub duration_ms: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Terminal result.
    pub outcome: Outcome,
    /// Per-player totals in ascending player order.
    pub players: Vec<PlayerStatistics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_delta_ignores_objective_summary() {
        let delta = StateDelta {
            tick: 7,
            objective: ObjectiveStatus {
                monsters_alive: 3,
                ..ObjectiveStatus::default()
            },
            ..StateDelta::default()
        };
        assert!(delta.is_quiet());
    }

    #[test]
    fn server_message_reports_tick() {
        let ended = ServerMessage::SessionEnded {
            tick: 12,
            outcome: Outcome::Defeat,
            reason: "time limit reached".to_owned(),
        };
        assert_eq!(ended.tick(), 12);
        assert_eq!(
            ServerMessage::Delta(StateDelta {
                tick: 3,
                ..StateDelta::default()
            })
            .tick(),
            3
        );
    }

    #[test]
    fn delta_round_trips_through_bincode() {
        let delta = StateDelta {
            tick: 2,
            removed_bombs: vec![BombId::new(1)],
            maze_changes: vec![TileChange {
                tile: TilePos::new(3, 1),
                now: Tile::Gate { revealed: true },
            }],
            acks: vec![InputAck {
                player: PlayerId::new(1),
                sequence: 9,
                outcome: InputOutcome::Rejected {
                    reason: PlacementRejection::TileOccupied,
                },
            }],
            ..StateDelta::default()
        };
        let bytes = bincode::serialize(&delta).expect("serialize");
        let restored: StateDelta = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, delta);
    }
}
