use std::{collections::BTreeMap, time::Duration};

use blast_maze_core::{
    Abilities, BombId, BombOwner, BombSnapshot, BombStatus, BossPhase, Direction, GateId,
    GateKind, GateSnapshot, GateStatus, MonsterId, MonsterKind, Passability,
    PlayerId, PlayerSnapshot, Position, PowerUpId, PowerUpKind, PowerUpSnapshot, TilePos,
};

#[derive(Clone, Debug)]
pub(crate) struct PlayerState {
    pub(crate) id: PlayerId,
    pub(crate) name: String,
    pub(crate) position: Position,
    pub(crate) facing: Direction,
    pub(crate) moving: Option<Direction>,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    pub(crate) alive: bool,
    pub(crate) connected: bool,
    pub(crate) lives: u32,
    pub(crate) spawn: TilePos,
    pub(crate) abilities: Abilities,
    pub(crate) inventory: BTreeMap<PowerUpKind, u32>,
    pub(crate) immunity: Duration,
    pub(crate) respawn_in: Option<Duration>,
}

impl PlayerState {
    pub(crate) fn tile(&self) -> Option<TilePos> {
        self.position.tile()
    }

    /// Alive and connected players are the only ones that act or count for objectives.
    pub(crate) fn is_active(&self) -> bool {
        self.alive && self.connected
    }

    pub(crate) fn is_immune(&self) -> bool {
        !self.immunity.is_zero()
    }

    pub(crate) fn is_eliminated(&self) -> bool {
        !self.alive && self.respawn_in.is_none()
    }

    pub(crate) fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            facing: self.facing,
            moving: self.moving,
            health: self.health,
            max_health: self.max_health,
            alive: self.alive,
            connected: self.connected,
            lives: self.lives,
            immune: self.is_immune(),
            respawning: self.respawn_in.is_some(),
            abilities: self.abilities,
            inventory: self.inventory.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct BombState {
    pub(crate) id: BombId,
    pub(crate) owner: BombOwner,
    pub(crate) tile: TilePos,
    pub(crate) fuse: Duration,
    pub(crate) blast_radius: u32,
    pub(crate) penetration: u32,
    pub(crate) status: BombStatus,
}

impl BombState {
    pub(crate) fn snapshot(&self) -> BombSnapshot {
        BombSnapshot {
            id: self.id,
            owner: self.owner,
            tile: self.tile,
            blast_radius: self.blast_radius,
            penetration: self.penetration,
            status: self.status,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct MonsterState {
    pub(crate) id: MonsterId,
    pub(crate) kind: MonsterKind,
    pub(crate) position: Position,
    pub(crate) facing: Direction,
    pub(crate) moving: Option<Direction>,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    pub(crate) anchor: TilePos,
}

impl MonsterState {
    pub(crate) fn tile(&self) -> Option<TilePos> {
        self.position.tile()
    }

    pub(crate) fn passability(&self) -> Passability {
        Passability {
            wall_pass: self.kind.profile().wall_pass,
            bomb_pass: false,
        }
    }
}

/// Phase bookkeeping attached to a monster that is a boss.
#[derive(Clone, Debug)]
pub(crate) struct BossExtension {
    pub(crate) phases: Vec<BossPhase>,
    pub(crate) phase: u32,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct GateState {
    pub(crate) id: GateId,
    pub(crate) tile: TilePos,
    pub(crate) kind: GateKind,
    pub(crate) status: GateStatus,
}

impl GateState {
    pub(crate) fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            id: self.id,
            tile: self.tile,
            kind: self.kind,
            status: self.status,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct PowerUpState {
    pub(crate) id: PowerUpId,
    pub(crate) kind: PowerUpKind,
    pub(crate) tile: TilePos,
    pub(crate) expires_in: Option<Duration>,
}

impl PowerUpState {
    pub(crate) fn snapshot(&self) -> PowerUpSnapshot {
        PowerUpSnapshot {
            id: self.id,
            kind: self.kind,
            tile: self.tile,
        }
    }
}

/// Entity storage keyed by identifier; iteration is always in ascending id order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Registry {
    pub(crate) players: BTreeMap<PlayerId, PlayerState>,
    pub(crate) bombs: BTreeMap<BombId, BombState>,
    pub(crate) monsters: BTreeMap<MonsterId, MonsterState>,
    pub(crate) bosses: BTreeMap<MonsterId, BossExtension>,
    pub(crate) gates: BTreeMap<GateId, GateState>,
    pub(crate) power_ups: BTreeMap<PowerUpId, PowerUpState>,
    next_bomb: u32,
    next_monster: u32,
    next_power_up: u32,
}

impl Registry {
    pub(crate) fn allocate_bomb(&mut self) -> BombId {
        let id = BombId::new(self.next_bomb);
        self.next_bomb = self.next_bomb.saturating_add(1);
        id
    }

    pub(crate) fn allocate_monster(&mut self) -> MonsterId {
        let id = MonsterId::new(self.next_monster);
        self.next_monster = self.next_monster.saturating_add(1);
        id
    }

    pub(crate) fn allocate_power_up(&mut self) -> PowerUpId {
        let id = PowerUpId::new(self.next_power_up);
        self.next_power_up = self.next_power_up.saturating_add(1);
        id
    }

    /// Bomb occupying the tile, regardless of its status.
    pub(crate) fn bomb_at(&self, tile: TilePos) -> Option<BombId> {
        self.bombs
            .values()
            .find(|bomb| bomb.tile == tile)
            .map(|bomb| bomb.id)
    }

    pub(crate) fn armed_bombs_owned_by(&self, owner: BombOwner) -> u32 {
        let count = self
            .bombs
            .values()
            .filter(|bomb| bomb.owner == owner && bomb.status == BombStatus::Armed)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub(crate) fn power_up_at(&self, tile: TilePos) -> Option<PowerUpId> {
        self.power_ups
            .values()
            .find(|power_up| power_up.tile == tile)
            .map(|power_up| power_up.id)
    }

    pub(crate) fn gate_at(&self, tile: TilePos) -> Option<GateId> {
        self.gates
            .values()
            .find(|gate| gate.tile == tile)
            .map(|gate| gate.id)
    }

    /// Reports whether any living player or monster stands on the tile.
    pub(crate) fn is_tile_occupied(&self, tile: TilePos) -> bool {
        self.players
            .values()
            .any(|player| player.alive && player.tile() == Some(tile))
            || self
                .monsters
                .values()
                .any(|monster| monster.tile() == Some(tile))
    }

    pub(crate) fn remove_monster(&mut self, monster: MonsterId) -> Option<MonsterState> {
        let _ = self.bosses.remove(&monster);
        self.monsters.remove(&monster)
    }

    pub(crate) fn bosses_alive(&self) -> u32 {
        u32::try_from(self.bosses.len()).unwrap_or(u32::MAX)
    }

    pub(crate) fn monsters_alive(&self) -> u32 {
        u32::try_from(self.monsters.len()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bomb(registry: &mut Registry, owner: BombOwner, tile: TilePos, status: BombStatus) {
        let id = registry.allocate_bomb();
        let _ = registry.bombs.insert(
            id,
            BombState {
                id,
                owner,
                tile,
                fuse: Duration::from_secs(1),
                blast_radius: 1,
                penetration: 0,
                status,
            },
        );
    }

    #[test]
    fn allocators_are_monotonic() {
        let mut registry = Registry::default();
        assert_eq!(registry.allocate_bomb(), BombId::new(0));
        assert_eq!(registry.allocate_bomb(), BombId::new(1));
        assert_eq!(registry.allocate_monster(), MonsterId::new(0));
        assert_eq!(registry.allocate_power_up(), PowerUpId::new(0));
    }

    #[test]
    fn only_armed_bombs_count_toward_capacity() {
        let mut registry = Registry::default();
        let owner = BombOwner::Player(PlayerId::new(1));
        bomb(&mut registry, owner, TilePos::new(1, 1), BombStatus::Armed);
        bomb(&mut registry, owner, TilePos::new(2, 1), BombStatus::Spent);
        bomb(
            &mut registry,
            BombOwner::Player(PlayerId::new(2)),
            TilePos::new(3, 1),
            BombStatus::Armed,
        );
        assert_eq!(registry.armed_bombs_owned_by(owner), 1);
        assert!(registry.bomb_at(TilePos::new(2, 1)).is_some());
        assert!(registry.bomb_at(TilePos::new(4, 1)).is_none());
    }
}
