use std::collections::BTreeMap;

use blast_maze_core::{BombId, GateId, GateStatus, MonsterId, PlayerId, Tile, TilePos};
use thiserror::Error;

use crate::World;

/// Cross-entity consistency violations that end a session.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Two bombs occupy the same tile.
    #[error("bombs {first:?} and {second:?} share tile {tile:?}")]
    BombsShareTile {
        /// Shared tile.
        tile: TilePos,
        /// Bomb with the lower identifier.
        first: BombId,
        /// Bomb with the higher identifier.
        second: BombId,
    },
    /// A bomb rests on a tile that is not walkable.
    #[error("bomb {bomb:?} rests inside a wall at {tile:?}")]
    BombInsideWall {
        /// Offending bomb.
        bomb: BombId,
        /// Tile holding the bomb.
        tile: TilePos,
    },
    /// More monsters are alive than the configured cap allows.
    #[error("{alive} monsters alive exceeds the cap of {cap}")]
    MonsterCapExceeded {
        /// Monsters alive.
        alive: u32,
        /// Configured cap.
        cap: u32,
    },
    /// A gate's status disagrees with the tile covering it.
    #[error("gate {gate:?} is {status:?} but its tile holds {tile:?}")]
    GateCoverMismatch {
        /// Offending gate.
        gate: GateId,
        /// Recorded gate status.
        status: GateStatus,
        /// Tile contents at the gate's position.
        tile: Option<Tile>,
    },
    /// A living player has no health, or a dead one still has some.
    #[error("player {player:?} alive={alive} with health {health}")]
    PlayerVitalsMismatch {
        /// Offending player.
        player: PlayerId,
        /// Recorded alive flag.
        alive: bool,
        /// Recorded health.
        health: u32,
    },
    /// A monster stands on a tile it cannot enter.
    #[error("monster {monster:?} stands on a blocked tile at {tile:?}")]
    MonsterInsideWall {
        /// Offending monster.
        monster: MonsterId,
        /// Tile the monster stands on.
        tile: Option<TilePos>,
    },
}

/// Verifies every cross-entity invariant of the world.
pub fn check_invariants(world: &World) -> Result<(), InvariantViolation> {
    let mut occupied: BTreeMap<TilePos, BombId> = BTreeMap::new();
    for bomb in world.registry.bombs.values() {
        if let Some(first) = occupied.insert(bomb.tile, bomb.id) {
            return Err(InvariantViolation::BombsShareTile {
                tile: bomb.tile,
                first,
                second: bomb.id,
            });
        }
        if world.maze.tile(bomb.tile).map_or(true, Tile::is_solid) {
            return Err(InvariantViolation::BombInsideWall {
                bomb: bomb.id,
                tile: bomb.tile,
            });
        }
    }

    let alive = world.registry.monsters_alive();
    let cap = world.settings.monsters.max_active;
    if alive > cap {
        return Err(InvariantViolation::MonsterCapExceeded { alive, cap });
    }

    for gate in world.registry.gates.values() {
        let tile = world.maze.tile(gate.tile);
        let consistent = match gate.status {
            GateStatus::Hidden => tile == Some(Tile::Gate { revealed: false }),
            GateStatus::Revealed | GateStatus::Destroyed | GateStatus::Active => {
                tile == Some(Tile::Gate { revealed: true })
            }
        };
        if !consistent {
            return Err(InvariantViolation::GateCoverMismatch {
                gate: gate.id,
                status: gate.status,
                tile,
            });
        }
    }

    for player in world.registry.players.values() {
        if player.alive == (player.health == 0) {
            return Err(InvariantViolation::PlayerVitalsMismatch {
                player: player.id,
                alive: player.alive,
                health: player.health,
            });
        }
    }

    for monster in world.registry.monsters.values() {
        let tile = monster.tile();
        let walkable = tile.is_some_and(|tile| world.maze.is_walkable(tile, monster.passability()));
        if !walkable {
            return Err(InvariantViolation::MonsterInsideWall {
                monster: monster.id,
                tile,
            });
        }
    }

    Ok(())
}
