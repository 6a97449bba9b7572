use blast_maze_core::{
    Direction, Event, MonsterId, MonsterKind, MonsterSnapshot, Position, SpawnRejection, TilePos,
};
use tracing::debug;

use crate::{
    registry::{BossExtension, MonsterState},
    World,
};

pub(crate) fn spawn(
    world: &mut World,
    kind: MonsterKind,
    tile: TilePos,
    out_events: &mut Vec<Event>,
) {
    let cap = world.settings.monsters.max_active;
    if world.registry.monsters_alive() >= cap {
        out_events.push(Event::MonsterSpawnRejected {
            kind,
            tile,
            reason: SpawnRejection::CapacityReached,
        });
        return;
    }

    let profile = kind.profile();
    let passability = blast_maze_core::Passability {
        wall_pass: profile.wall_pass,
        bomb_pass: false,
    };
    if !world.maze.is_walkable(tile, passability) || world.registry.bomb_at(tile).is_some() {
        out_events.push(Event::MonsterSpawnRejected {
            kind,
            tile,
            reason: SpawnRejection::Blocked,
        });
        return;
    }

    let id = world.registry.allocate_monster();
    let max_health = world.settings.difficulty.scale_health(profile.max_health);
    let _ = world.registry.monsters.insert(
        id,
        MonsterState {
            id,
            kind,
            position: tile.center(),
            facing: Direction::South,
            moving: None,
            health: max_health,
            max_health,
            anchor: tile,
        },
    );
    if kind.is_boss() {
        let _ = world.registry.bosses.insert(
            id,
            BossExtension {
                phases: kind.boss_phases(),
                phase: 0,
            },
        );
    }
    debug!(monster = id.get(), ?kind, ?tile, "monster spawned");
    out_events.push(Event::MonsterSpawned {
        monster: id,
        kind,
        tile,
    });
}

pub(crate) fn relocate(world: &mut World, monster: MonsterId, position: Position, facing: Direction) {
    let inside = position
        .tile()
        .is_some_and(|tile| world.maze.view().contains(tile));
    let Some(state) = world.registry.monsters.get_mut(&monster) else {
        return;
    };
    if !inside {
        debug!(monster = monster.get(), "ignoring relocation outside the maze");
        return;
    }
    state.position = position;
    state.facing = facing;
}

pub(crate) fn set_intent(world: &mut World, monster: MonsterId, direction: Option<Direction>) {
    if let Some(state) = world.registry.monsters.get_mut(&monster) {
        state.moving = direction;
        if let Some(direction) = direction {
            state.facing = direction;
        }
    }
}

/// Moves a boss into `to_phase` when it is exactly the next phase.
pub(crate) fn advance_boss_phase(
    world: &mut World,
    boss: MonsterId,
    to_phase: u32,
    out_events: &mut Vec<Event>,
) {
    let Some(extension) = world.registry.bosses.get_mut(&boss) else {
        return;
    };
    let phase_count = u32::try_from(extension.phases.len()).unwrap_or(u32::MAX);
    if to_phase != extension.phase.saturating_add(1) || to_phase >= phase_count {
        debug!(
            boss = boss.get(),
            current = extension.phase,
            to_phase,
            "ignoring stale boss phase request"
        );
        return;
    }
    extension.phase = to_phase;
    out_events.push(Event::BossPhaseAdvanced {
        boss,
        phase: to_phase,
    });
}

pub(crate) fn snapshot(world: &World, monster: &MonsterState) -> MonsterSnapshot {
    MonsterSnapshot {
        id: monster.id,
        kind: monster.kind,
        position: monster.position,
        facing: monster.facing,
        moving: monster.moving,
        health: monster.health,
        max_health: monster.max_health,
        anchor: monster.anchor,
        boss_phase: world.registry.bosses.get(&monster.id).map(|boss| boss.phase),
    }
}
