//! Player lifecycle: joining, leaving, connection changes and movement intents.

use std::{collections::BTreeMap, time::Duration};

use blast_maze_core::{Abilities, Direction, Event, PlayerId, Position};
use tracing::debug;

use crate::{combat, registry::PlayerState, World};

pub(crate) fn add(world: &mut World, player: PlayerId, name: String, out_events: &mut Vec<Event>) {
    let roster_full = u32::try_from(world.registry.players.len()).unwrap_or(u32::MAX)
        >= world.settings.max_players;
    if world.registry.players.contains_key(&player) || roster_full {
        debug!(player = player.get(), "player join rejected");
        out_events.push(Event::PlayerJoinRejected { player });
        return;
    }

    let spawn = world.maze.spawn_points().iter().copied().find(|spawn| {
        !world
            .registry
            .players
            .values()
            .any(|existing| existing.spawn == *spawn)
    });
    let Some(spawn) = spawn else {
        debug!(player = player.get(), "no free spawn point");
        out_events.push(Event::PlayerJoinRejected { player });
        return;
    };

    let tuning = &world.settings.players;
    let state = PlayerState {
        id: player,
        name: name.clone(),
        position: spawn.center(),
        facing: Direction::South,
        moving: None,
        health: tuning.max_health,
        max_health: tuning.max_health,
        alive: true,
        connected: true,
        lives: tuning.lives,
        spawn,
        abilities: Abilities {
            max_bombs: tuning.max_bombs,
            blast_radius: tuning.blast_radius,
            speed_multiplier: 1.0,
            penetration: 0,
            wall_pass: false,
            bomb_pass: false,
            bomb_kick: false,
            immunity_window: tuning.immunity(),
        },
        inventory: BTreeMap::new(),
        immunity: Duration::ZERO,
        respawn_in: None,
    };
    let _ = world.registry.players.insert(player, state);
    world.scoreboard.register(player, &name);
    out_events.push(Event::PlayerJoined { player, spawn });
}

pub(crate) fn remove(world: &mut World, player: PlayerId, out_events: &mut Vec<Event>) {
    if world.registry.players.remove(&player).is_some() {
        out_events.push(Event::PlayerLeft { player });
    }
}

pub(crate) fn set_connected(
    world: &mut World,
    player: PlayerId,
    connected: bool,
    out_events: &mut Vec<Event>,
) {
    let Some(state) = world.registry.players.get_mut(&player) else {
        return;
    };
    if state.connected == connected {
        return;
    }
    state.connected = connected;
    if !connected {
        state.moving = None;
    }
    out_events.push(Event::PlayerConnectionChanged { player, connected });
}

pub(crate) fn set_intent(world: &mut World, player: PlayerId, direction: Option<Direction>) {
    let Some(state) = world.registry.players.get_mut(&player) else {
        return;
    };
    if !state.is_active() {
        debug!(player = player.get(), "ignoring intent of inactive player");
        return;
    }
    state.moving = direction;
    if let Some(direction) = direction {
        state.facing = direction;
    }
}

pub(crate) fn relocate(
    world: &mut World,
    player: PlayerId,
    position: Position,
    facing: Direction,
    out_events: &mut Vec<Event>,
) {
    let inside = position
        .tile()
        .is_some_and(|tile| world.maze.view().contains(tile));
    let Some(state) = world.registry.players.get_mut(&player) else {
        return;
    };
    if !state.is_active() || !inside {
        debug!(player = player.get(), "ignoring relocation");
        return;
    }
    state.position = position;
    state.facing = facing;
    combat::collect_power_up(world, player, out_events);
}
