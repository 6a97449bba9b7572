//! Client-facing projection of the world and per-tick change detection.

use std::collections::BTreeMap;

use blast_maze_core::{
    BombId, BombSnapshot, Explosion, FullSnapshot, GateId, GateSnapshot, GateStatus, InputAck,
    MonsterId, MonsterSnapshot, ObjectiveStatus, PlayerId, PlayerSnapshot, PowerUpId,
    PowerUpSnapshot, StateDelta, Tile, TileChange, TilePos,
};
use blast_maze_world::{query, World};

/// Tile as clients may see it; gates stay secret until uncovered.
fn visible_tile(tile: Tile) -> Tile {
    match tile {
        Tile::Gate { revealed: false } => Tile::DestructibleWall,
        other => other,
    }
}

/// Everything a client can observe about the world at one instant.
#[derive(Clone, Debug, Default)]
struct Frame {
    columns: u32,
    tiles: Vec<Tile>,
    players: BTreeMap<PlayerId, PlayerSnapshot>,
    bombs: BTreeMap<BombId, BombSnapshot>,
    monsters: BTreeMap<MonsterId, MonsterSnapshot>,
    power_ups: BTreeMap<PowerUpId, PowerUpSnapshot>,
    gates: BTreeMap<GateId, GateSnapshot>,
}

impl Frame {
    fn capture(world: &World) -> Self {
        let maze = query::maze(world);
        let (columns, _) = maze.dimensions();
        Self {
            columns,
            tiles: maze.tiles().iter().copied().map(visible_tile).collect(),
            players: query::player_view(world)
                .into_vec()
                .into_iter()
                .map(|player| (player.id, player))
                .collect(),
            bombs: query::bomb_view(world)
                .into_vec()
                .into_iter()
                .map(|bomb| (bomb.id, bomb))
                .collect(),
            monsters: query::monster_view(world)
                .into_vec()
                .into_iter()
                .map(|monster| (monster.id, monster))
                .collect(),
            power_ups: query::power_ups(world)
                .into_iter()
                .map(|power_up| (power_up.id, power_up))
                .collect(),
            gates: query::gates(world)
                .into_iter()
                .filter(|gate| gate.status != GateStatus::Hidden)
                .map(|gate| (gate.id, gate))
                .collect(),
        }
    }

    fn tile_changes(&self, current: &Self) -> Vec<TileChange> {
        let columns = current.columns.max(1);
        current
            .tiles
            .iter()
            .enumerate()
            .filter(|(index, tile)| self.tiles.get(*index) != Some(*tile))
            .filter_map(|(index, tile)| {
                let index = u32::try_from(index).ok()?;
                Some(TileChange {
                    tile: TilePos::new(index % columns, index / columns),
                    now: *tile,
                })
            })
            .collect()
    }
}

/// Entries whose snapshot differs from the previous frame, plus removed keys.
fn diff<K, V>(previous: &BTreeMap<K, V>, current: &BTreeMap<K, V>) -> (Vec<V>, Vec<K>)
where
    K: Ord + Copy,
    V: Clone + PartialEq,
{
    let changed = current
        .iter()
        .filter(|(id, snapshot)| previous.get(*id) != Some(*snapshot))
        .map(|(_, snapshot)| snapshot.clone())
        .collect();
    let removed = previous
        .keys()
        .filter(|id| !current.contains_key(*id))
        .copied()
        .collect();
    (changed, removed)
}

/// Full client-facing snapshot of the world.
pub(crate) fn full_snapshot(world: &World, objective: ObjectiveStatus) -> FullSnapshot {
    let frame = Frame::capture(world);
    let (columns, rows) = query::maze(world).dimensions();
    FullSnapshot {
        tick: query::tick_index(world),
        columns,
        rows,
        tiles: frame.tiles,
        players: frame.players.into_values().collect(),
        bombs: frame.bombs.into_values().collect(),
        monsters: frame.monsters.into_values().collect(),
        power_ups: frame.power_ups.into_values().collect(),
        gates: frame.gates.into_values().collect(),
        objective,
    }
}

/// Remembers the last observed frame and reports what changed since.
#[derive(Clone, Debug, Default)]
pub(crate) struct DeltaTracker {
    previous: Frame,
}

impl DeltaTracker {
    /// Starts tracking from the world's current state.
    pub(crate) fn new(world: &World) -> Self {
        Self {
            previous: Frame::capture(world),
        }
    }

    /// Builds the delta for the tick just completed and adopts the new frame.
    pub(crate) fn observe(
        &mut self,
        world: &World,
        objective: ObjectiveStatus,
        new_explosions: Vec<Explosion>,
        acks: Vec<InputAck>,
    ) -> StateDelta {
        let current = Frame::capture(world);
        let (changed_players, removed_players) = diff(&self.previous.players, &current.players);
        let (changed_bombs, removed_bombs) = diff(&self.previous.bombs, &current.bombs);
        let (changed_monsters, removed_monsters) =
            diff(&self.previous.monsters, &current.monsters);
        let (changed_power_ups, removed_power_ups) =
            diff(&self.previous.power_ups, &current.power_ups);
        let (changed_gates, _) = diff(&self.previous.gates, &current.gates);
        let maze_changes = self.previous.tile_changes(&current);

        self.previous = current;
        StateDelta {
            tick: query::tick_index(world),
            changed_players,
            removed_players,
            changed_bombs,
            removed_bombs,
            new_explosions,
            changed_monsters,
            removed_monsters,
            changed_power_ups,
            removed_power_ups,
            changed_gates,
            maze_changes,
            objective,
            acks,
        }
    }
}
