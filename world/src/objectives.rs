use blast_maze_core::{
    Event, GateKind, GateStatus, ObjectiveState, ObjectiveStatus, Outcome,
};
use tracing::info;

use crate::World;

/// Activates cleared gates and records the terminal outcome once reached.
pub(crate) fn evaluate(world: &mut World, pending_spawns: u32, out_events: &mut Vec<Event>) {
    if world.outcome.is_some() {
        return;
    }

    let cleared = world.registry.monsters.is_empty() && pending_spawns == 0;
    for gate in world.registry.gates.values_mut() {
        let ready = match gate.status {
            GateStatus::Revealed if gate.kind == GateKind::Emergency => true,
            GateStatus::Revealed | GateStatus::Destroyed => cleared,
            GateStatus::Hidden | GateStatus::Active => false,
        };
        if ready {
            gate.status = GateStatus::Active;
            out_events.push(Event::GateActivated { gate: gate.id });
        }
    }

    let outcome = if victory(world) {
        Some(Outcome::Victory)
    } else if defeat(world) {
        Some(Outcome::Defeat)
    } else {
        None
    };

    if let Some(outcome) = outcome {
        info!(?outcome, tick = world.tick_index, "objective reached");
        world.outcome = Some(outcome);
        out_events.push(Event::ObjectiveReached { outcome });
    }
}

fn victory(world: &World) -> bool {
    world
        .registry
        .gates
        .values()
        .filter(|gate| gate.status == GateStatus::Active)
        .any(|gate| {
            world
                .registry
                .players
                .values()
                .any(|player| player.is_active() && player.tile() == Some(gate.tile))
        })
}

fn defeat(world: &World) -> bool {
    let eliminated = !world.registry.players.is_empty()
        && world
            .registry
            .players
            .values()
            .all(|player| player.is_eliminated());
    let out_of_time = world
        .settings
        .time_limit()
        .is_some_and(|limit| world.clock >= limit);
    eliminated || out_of_time
}

pub(crate) fn status(world: &World, pending_spawns: u32) -> ObjectiveStatus {
    let count = |status: &[GateStatus]| {
        let matching = world
            .registry
            .gates
            .values()
            .filter(|gate| status.contains(&gate.status))
            .count();
        u32::try_from(matching).unwrap_or(u32::MAX)
    };

    ObjectiveStatus {
        state: world
            .outcome
            .map_or(ObjectiveState::InProgress, ObjectiveState::Completed),
        gates_total: u32::try_from(world.registry.gates.len()).unwrap_or(u32::MAX),
        gates_revealed: count(&[
            GateStatus::Revealed,
            GateStatus::Destroyed,
            GateStatus::Active,
        ]),
        gates_active: count(&[GateStatus::Active]),
        monsters_alive: world.registry.monsters_alive(),
        bosses_alive: world.registry.bosses_alive(),
        pending_spawns,
    }
}
