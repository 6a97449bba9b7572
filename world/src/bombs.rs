//! Bomb placement, fuse countdown and breadth-first chain resolution.

use std::{
    collections::{BTreeSet, VecDeque},
    time::Duration,
};

use blast_maze_core::{
    BombId, BombOwner, BombStatus, DamageSource, Direction, Event, Explosion, GateId, GateKind,
    GateStatus, MazeView, MonsterId, Passability, PlacementRejection, PlayerId, Tile, TilePos,
};
use tracing::{debug, warn};

use crate::{combat, registry::BombState, World};

/// Tiles reached by a single blast.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlastPattern {
    /// Affected tiles, center first, then each cardinal cast in canonical order.
    pub tiles: Vec<TilePos>,
    /// Subset of `tiles` holding a wall the blast destroys.
    pub walls: Vec<TilePos>,
}

/// Computes the tiles a blast of `radius` centered on `center` reaches.
///
/// Each cardinal direction is cast independently. Solid walls and the map
/// edge halt a cast without being affected. Destructible walls are affected
/// and halt the cast unless a penetration level remains to be consumed.
#[must_use]
pub fn blast_pattern(
    maze: &MazeView<'_>,
    center: TilePos,
    radius: u32,
    penetration: u32,
) -> BlastPattern {
    let mut pattern = BlastPattern {
        tiles: vec![center],
        walls: Vec::new(),
    };

    for direction in Direction::ALL {
        let mut remaining = penetration;
        for distance in 1..=radius {
            let Some(tile) = center.offset(direction, distance) else {
                break;
            };
            let Some(contents) = maze.tile(tile) else {
                break;
            };
            if contents.is_solid() {
                break;
            }
            pattern.tiles.push(tile);
            if contents.is_destructible() {
                pattern.walls.push(tile);
                if remaining == 0 {
                    break;
                }
                remaining -= 1;
            }
        }
    }

    pattern
}

pub(crate) fn place_player_bomb(world: &mut World, player: PlayerId, out_events: &mut Vec<Event>) {
    let owner = BombOwner::Player(player);
    let Some(state) = world.registry.players.get(&player) else {
        reject(owner, PlacementRejection::PlayerUnavailable, out_events);
        return;
    };
    if !state.is_active() {
        reject(owner, PlacementRejection::PlayerUnavailable, out_events);
        return;
    }
    let Some(tile) = state.tile() else {
        reject(owner, PlacementRejection::OutOfBounds, out_events);
        return;
    };
    let abilities = state.abilities;

    if world.registry.armed_bombs_owned_by(owner) >= abilities.max_bombs {
        reject(owner, PlacementRejection::CapacityExceeded, out_events);
        return;
    }

    if place(
        world,
        owner,
        tile,
        abilities.blast_radius,
        abilities.penetration,
        out_events,
    ) {
        world
            .scoreboard
            .update(player, |entry| entry.bombs_placed += 1);
    }
}

pub(crate) fn place_boss_bomb(
    world: &mut World,
    boss: MonsterId,
    tile: TilePos,
    out_events: &mut Vec<Event>,
) {
    let owner = BombOwner::Boss(boss);
    if !world.registry.bosses.contains_key(&boss) {
        reject(owner, PlacementRejection::PlayerUnavailable, out_events);
        return;
    }
    let radius = world.settings.players.blast_radius;
    let _ = place(world, owner, tile, radius, 0, out_events);
}

fn place(
    world: &mut World,
    owner: BombOwner,
    tile: TilePos,
    blast_radius: u32,
    penetration: u32,
    out_events: &mut Vec<Event>,
) -> bool {
    if world.maze.tile(tile).is_none() {
        reject(owner, PlacementRejection::OutOfBounds, out_events);
        return false;
    }
    if !world.maze.is_walkable(tile, Passability::NONE) {
        reject(owner, PlacementRejection::TileBlocked, out_events);
        return false;
    }
    if world.registry.bomb_at(tile).is_some() {
        reject(owner, PlacementRejection::TileOccupied, out_events);
        return false;
    }

    let id = world.registry.allocate_bomb();
    let _ = world.registry.bombs.insert(
        id,
        BombState {
            id,
            owner,
            tile,
            fuse: world.settings.bombs.fuse(),
            blast_radius,
            penetration,
            status: BombStatus::Armed,
        },
    );
    out_events.push(Event::BombPlaced {
        bomb: id,
        owner,
        tile,
    });
    true
}

fn reject(owner: BombOwner, reason: PlacementRejection, out_events: &mut Vec<Event>) {
    debug!(?owner, ?reason, "bomb placement rejected");
    out_events.push(Event::BombPlacementRejected { owner, reason });
}

/// Slides an armed bomb until the next tile is blocked.
pub(crate) fn kick(
    world: &mut World,
    bomb: BombId,
    direction: Direction,
    out_events: &mut Vec<Event>,
) {
    let Some(state) = world.registry.bombs.get(&bomb) else {
        return;
    };
    if state.status != BombStatus::Armed {
        return;
    }

    let from = state.tile;
    let mut to = from;
    while let Some(next) = to.neighbor(direction) {
        let blocked = !world.maze.is_walkable(next, Passability::NONE)
            || world.registry.bomb_at(next).is_some()
            || world.registry.is_tile_occupied(next);
        if blocked {
            break;
        }
        to = next;
    }
    if to == from {
        return;
    }

    if let Some(state) = world.registry.bombs.get_mut(&bomb) {
        state.tile = to;
    }
    out_events.push(Event::BombKicked { bomb, from, to });
}

/// Removes spent bombs, burns fuses and resolves every detonation due this tick.
pub(crate) fn advance(world: &mut World, dt: Duration, out_events: &mut Vec<Event>) {
    world
        .registry
        .bombs
        .retain(|_, bomb| bomb.status != BombStatus::Spent);

    let mut due = Vec::new();
    for bomb in world.registry.bombs.values_mut() {
        if bomb.status != BombStatus::Armed {
            continue;
        }
        bomb.fuse = bomb.fuse.saturating_sub(dt);
        if bomb.fuse.is_zero() {
            bomb.status = BombStatus::Exploding;
            due.push(bomb.id);
        }
    }

    if !due.is_empty() {
        resolve_chain(world, due, out_events);
    }
}

#[derive(Default)]
struct ChainLedger {
    damaged_players: BTreeSet<PlayerId>,
    damaged_monsters: BTreeSet<MonsterId>,
    deferred: BTreeSet<BombId>,
}

fn resolve_chain(world: &mut World, due: Vec<BombId>, out_events: &mut Vec<Event>) {
    let max_depth = world.settings.bombs.max_chain_depth;
    let mut queue: VecDeque<(BombId, u32)> = due.into_iter().map(|bomb| (bomb, 0)).collect();
    let mut ledger = ChainLedger::default();

    while let Some((bomb, depth)) = queue.pop_front() {
        let Some(state) = world.registry.bombs.get(&bomb).copied() else {
            continue;
        };
        let pattern = blast_pattern(
            &world.maze.view(),
            state.tile,
            state.blast_radius,
            state.penetration,
        );
        detonate(world, &state, &pattern, depth, &mut ledger, out_events);

        for tile in &pattern.tiles {
            let Some(next) = world.registry.bomb_at(*tile) else {
                continue;
            };
            let Some(candidate) = world.registry.bombs.get_mut(&next) else {
                continue;
            };
            if candidate.status != BombStatus::Armed {
                continue;
            }
            if depth >= max_depth {
                candidate.fuse = Duration::ZERO;
                let _ = ledger.deferred.insert(next);
                continue;
            }
            candidate.status = BombStatus::Exploding;
            queue.push_back((next, depth + 1));
        }
    }

    if !ledger.deferred.is_empty() {
        let deferred: Vec<BombId> = ledger.deferred.into_iter().collect();
        warn!(
            max_depth,
            deferred = deferred.len(),
            "chain depth exceeded; deferring detonations to the next tick"
        );
        out_events.push(Event::ChainDepthExceeded {
            max_depth,
            deferred,
        });
    }
}

fn detonate(
    world: &mut World,
    bomb: &BombState,
    pattern: &BlastPattern,
    depth: u32,
    ledger: &mut ChainLedger,
    out_events: &mut Vec<Event>,
) {
    let damage = world.settings.bombs.explosion_damage;
    out_events.push(Event::ExplosionResolved {
        explosion: Explosion {
            bomb: bomb.id,
            owner: bomb.owner,
            center: bomb.tile,
            tiles: pattern.tiles.clone(),
            damage,
            visual_duration: world.settings.bombs.explosion_visual(),
            chain_depth: depth,
        },
    });

    destroy_power_ups(world, &pattern.tiles, out_events);
    strike_gates(world, pattern, out_events);
    destroy_walls(world, bomb.owner, &pattern.walls, out_events);
    damage_entities(world, bomb.owner, &pattern.tiles, damage, ledger, out_events);

    if let Some(state) = world.registry.bombs.get_mut(&bomb.id) {
        state.status = BombStatus::Spent;
    }
}

fn destroy_power_ups(world: &mut World, tiles: &[TilePos], out_events: &mut Vec<Event>) {
    let hit: Vec<_> = world
        .registry
        .power_ups
        .values()
        .filter(|power_up| tiles.contains(&power_up.tile))
        .map(|power_up| power_up.id)
        .collect();
    for power_up in hit {
        let _ = world.registry.power_ups.remove(&power_up);
        out_events.push(Event::PowerUpRemoved { power_up });
    }
}

/// Destroys uncovered gates the blast reaches. Covered gates are handled as walls.
fn strike_gates(world: &mut World, pattern: &BlastPattern, out_events: &mut Vec<Event>) {
    for tile in &pattern.tiles {
        if pattern.walls.contains(tile) {
            continue;
        }
        let Some(gate) = world.registry.gate_at(*tile) else {
            continue;
        };
        let Some(state) = world.registry.gates.get_mut(&gate) else {
            continue;
        };
        if !matches!(state.status, GateStatus::Revealed | GateStatus::Active) {
            continue;
        }
        state.status = GateStatus::Destroyed;
        debug!(gate = gate.get(), kind = ?state.kind, "gate destroyed");
        out_events.push(Event::GateDestroyed {
            gate,
            kind: state.kind,
            tile: *tile,
        });
    }
}

fn destroy_walls(
    world: &mut World,
    owner: BombOwner,
    walls: &[TilePos],
    out_events: &mut Vec<Event>,
) {
    for &tile in walls {
        let Some(destruction) = world.maze.destroy_wall(tile) else {
            continue;
        };
        out_events.push(Event::WallDestroyed {
            tile,
            now: destruction.now,
        });
        if let BombOwner::Player(player) = owner {
            world
                .scoreboard
                .update(player, |entry| entry.walls_destroyed += 1);
        }

        match destruction.revealed_gate {
            Some(gate) => reveal_gate(world, gate, tile, out_events),
            None if destruction.now == Tile::Empty => {
                combat::roll_power_up_drop(world, tile, out_events);
            }
            None => {}
        }
    }
}

fn reveal_gate(
    world: &mut World,
    gate: GateId,
    tile: TilePos,
    out_events: &mut Vec<Event>,
) {
    let Some(state) = world.registry.gates.get_mut(&gate) else {
        return;
    };
    if state.status != GateStatus::Hidden {
        return;
    }
    state.status = GateStatus::Revealed;
    out_events.push(Event::GateRevealed { gate, tile });
    if state.kind == GateKind::Emergency {
        state.status = GateStatus::Active;
        out_events.push(Event::GateActivated { gate });
    }
}

fn damage_entities(
    world: &mut World,
    owner: BombOwner,
    tiles: &[TilePos],
    damage: u32,
    ledger: &mut ChainLedger,
    out_events: &mut Vec<Event>,
) {
    let source = DamageSource::Explosion(owner);

    let players: Vec<PlayerId> = world
        .registry
        .players
        .values()
        .filter(|player| player.alive)
        .filter(|player| player.tile().is_some_and(|tile| tiles.contains(&tile)))
        .map(|player| player.id)
        .filter(|player| !ledger.damaged_players.contains(player))
        .collect();
    for player in players {
        if combat::hurt_player(world, player, damage, source, out_events) {
            let _ = ledger.damaged_players.insert(player);
        }
    }

    let credited = match owner {
        BombOwner::Player(player) => Some(player),
        BombOwner::Boss(_) => None,
    };
    let monsters: Vec<MonsterId> = world
        .registry
        .monsters
        .values()
        .filter(|monster| monster.tile().is_some_and(|tile| tiles.contains(&tile)))
        .map(|monster| monster.id)
        .filter(|monster| !ledger.damaged_monsters.contains(monster))
        .collect();
    for monster in monsters {
        let _ = ledger.damaged_monsters.insert(monster);
        combat::hurt_monster(world, monster, damage, credited, out_events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> (Vec<Tile>, u32, u32) {
        let columns = 11;
        let rows = 11;
        let mut tiles = vec![Tile::Empty; (columns * rows) as usize];
        for column in 0..columns {
            tiles[column as usize] = Tile::SolidWall;
        }
        (tiles, columns, rows)
    }

    #[test]
    fn center_is_always_affected() {
        let (tiles, columns, rows) = corridor();
        let view = MazeView::new(&tiles, columns, rows);
        let pattern = blast_pattern(&view, TilePos::new(5, 5), 0, 0);
        assert_eq!(pattern.tiles, vec![TilePos::new(5, 5)]);
        assert!(pattern.walls.is_empty());
    }

    #[test]
    fn solid_walls_halt_without_being_affected() {
        let (tiles, columns, rows) = corridor();
        let view = MazeView::new(&tiles, columns, rows);
        let pattern = blast_pattern(&view, TilePos::new(5, 1), 3, 0);
        assert!(!pattern.tiles.contains(&TilePos::new(5, 0)));
        assert!(pattern.tiles.contains(&TilePos::new(5, 4)));
    }

    #[test]
    fn penetration_continues_through_destructible_walls() {
        let (mut tiles, columns, rows) = corridor();
        tiles[(5 * columns + 6) as usize] = Tile::DestructibleWall;
        tiles[(5 * columns + 7) as usize] = Tile::DestructibleWall;
        let view = MazeView::new(&tiles, columns, rows);

        let halted = blast_pattern(&view, TilePos::new(5, 5), 3, 0);
        assert!(halted.tiles.contains(&TilePos::new(6, 5)));
        assert!(!halted.tiles.contains(&TilePos::new(7, 5)));

        let pierced = blast_pattern(&view, TilePos::new(5, 5), 3, 1);
        assert_eq!(
            pierced.walls,
            vec![TilePos::new(6, 5), TilePos::new(7, 5)]
        );
        assert!(!pierced.tiles.contains(&TilePos::new(8, 5)));
    }

    #[test]
    fn covered_gates_count_as_walls() {
        let (mut tiles, columns, rows) = corridor();
        tiles[(4 * columns + 5) as usize] = Tile::Gate { revealed: false };
        tiles[(6 * columns + 5) as usize] = Tile::Gate { revealed: true };
        let view = MazeView::new(&tiles, columns, rows);
        let pattern = blast_pattern(&view, TilePos::new(5, 5), 2, 0);
        assert_eq!(pattern.walls, vec![TilePos::new(5, 4)]);
        assert!(pattern.tiles.contains(&TilePos::new(5, 7)));
    }
}
