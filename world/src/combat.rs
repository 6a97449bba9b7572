//! Damage, death, respawn and power-up handling.

use std::time::Duration;

use blast_maze_core::{
    DamageSource, Event, MonsterId, Passability, PlayerId, PlayerTuning, PowerUpKind, TilePos,
};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};
use tracing::{debug, info};

use crate::{
    registry::{PlayerState, PowerUpState},
    World,
};

const SHIELD_DURATION: Duration = Duration::from_secs(5);
const MAX_PENETRATION: u32 = 3;
const SPEED_STEP: f32 = 0.25;

/// Advances immunity windows, respawn countdowns and power-up expiry.
pub(crate) fn advance_timers(world: &mut World, dt: Duration, out_events: &mut Vec<Event>) {
    let mut respawned = Vec::new();
    for player in world.registry.players.values_mut() {
        player.immunity = player.immunity.saturating_sub(dt);
        let Some(remaining) = player.respawn_in else {
            continue;
        };
        let remaining = remaining.saturating_sub(dt);
        if !remaining.is_zero() {
            player.respawn_in = Some(remaining);
            continue;
        }

        player.respawn_in = None;
        player.alive = true;
        player.health = player.max_health;
        player.position = player.spawn.center();
        player.moving = None;
        player.immunity = player.abilities.immunity_window;
        respawned.push((player.id, player.spawn));
    }
    for (player, spawn) in respawned {
        out_events.push(Event::PlayerRespawned { player, spawn });
        collect_power_up(world, player, out_events);
    }

    let mut expired = Vec::new();
    for power_up in world.registry.power_ups.values_mut() {
        let Some(remaining) = power_up.expires_in else {
            continue;
        };
        let remaining = remaining.saturating_sub(dt);
        power_up.expires_in = Some(remaining);
        if remaining.is_zero() {
            expired.push(power_up.id);
        }
    }
    for power_up in expired {
        let _ = world.registry.power_ups.remove(&power_up);
        out_events.push(Event::PowerUpRemoved { power_up });
    }
}

pub(crate) fn damage_player(
    world: &mut World,
    player: PlayerId,
    amount: u32,
    source: DamageSource,
    out_events: &mut Vec<Event>,
) {
    let _ = hurt_player(world, player, amount, source, out_events);
}

/// Applies damage unless the player is dead or immune. Returns whether damage landed.
pub(crate) fn hurt_player(
    world: &mut World,
    player: PlayerId,
    amount: u32,
    source: DamageSource,
    out_events: &mut Vec<Event>,
) -> bool {
    let Some(state) = world.registry.players.get_mut(&player) else {
        return false;
    };
    if !state.alive || state.is_immune() || amount == 0 {
        return false;
    }

    state.health = state.health.saturating_sub(amount);
    state.immunity = state.abilities.immunity_window;
    out_events.push(Event::PlayerDamaged {
        player,
        amount,
        health: state.health,
        source,
    });
    if state.health > 0 {
        return true;
    }

    state.alive = false;
    state.moving = None;
    state.immunity = Duration::ZERO;
    out_events.push(Event::PlayerDied { player, source });
    if state.lives > 0 {
        state.lives -= 1;
        state.respawn_in = Some(world.settings.players.respawn_delay());
    } else {
        info!(player = player.get(), "player eliminated");
        out_events.push(Event::PlayerEliminated { player });
    }
    world.scoreboard.update(player, |entry| entry.deaths += 1);
    true
}

/// Applies damage to a monster, crediting the kill to `credited` when it dies.
pub(crate) fn hurt_monster(
    world: &mut World,
    monster: MonsterId,
    amount: u32,
    credited: Option<PlayerId>,
    out_events: &mut Vec<Event>,
) {
    let Some(state) = world.registry.monsters.get_mut(&monster) else {
        return;
    };
    state.health = state.health.saturating_sub(amount);
    out_events.push(Event::MonsterDamaged {
        monster,
        amount,
        health: state.health,
    });
    if state.health > 0 {
        return;
    }

    let kind = state.kind;
    let _ = world.registry.remove_monster(monster);
    debug!(monster = monster.get(), ?kind, ?credited, "monster killed");
    out_events.push(Event::MonsterKilled {
        monster,
        kind,
        credited,
    });
    if let Some(player) = credited {
        let score = u64::from(kind.profile().score);
        world.scoreboard.update(player, |entry| {
            entry.kills += 1;
            entry.score += score;
        });
    }
}

/// Hands the power-up under an active player to that player.
pub(crate) fn collect_power_up(world: &mut World, player: PlayerId, out_events: &mut Vec<Event>) {
    let Some(state) = world.registry.players.get(&player) else {
        return;
    };
    if !state.is_active() {
        return;
    }
    let Some(tile) = state.tile() else {
        return;
    };
    let Some(power_up) = world.registry.power_up_at(tile) else {
        return;
    };
    let Some(collected) = world.registry.power_ups.remove(&power_up) else {
        return;
    };

    let tuning = world.settings.players.clone();
    if let Some(state) = world.registry.players.get_mut(&player) {
        grant(state, collected.kind, &tuning);
    }
    world
        .scoreboard
        .update(player, |entry| entry.power_ups_collected += 1);
    out_events.push(Event::PowerUpCollected {
        power_up,
        player,
        kind: collected.kind,
    });
}

fn grant(player: &mut PlayerState, kind: PowerUpKind, tuning: &PlayerTuning) {
    *player.inventory.entry(kind).or_insert(0) += 1;
    let abilities = &mut player.abilities;
    match kind {
        PowerUpKind::ExtraBomb => {
            abilities.max_bombs = (abilities.max_bombs + 1).min(tuning.max_bombs_cap);
        }
        PowerUpKind::BlastRadius => {
            abilities.blast_radius = (abilities.blast_radius + 1).min(tuning.blast_radius_cap);
        }
        PowerUpKind::Speed => {
            abilities.speed_multiplier =
                (abilities.speed_multiplier + SPEED_STEP).min(tuning.speed_multiplier_cap);
        }
        PowerUpKind::WallPass => abilities.wall_pass = true,
        PowerUpKind::BombPass => abilities.bomb_pass = true,
        PowerUpKind::BombKick => abilities.bomb_kick = true,
        PowerUpKind::Pierce => {
            abilities.penetration = (abilities.penetration + 1).min(MAX_PENETRATION);
        }
        PowerUpKind::Shield => player.immunity = player.immunity.max(SHIELD_DURATION),
        PowerUpKind::Heal => player.health = player.max_health,
    }
}

pub(crate) fn spawn_power_up(
    world: &mut World,
    kind: PowerUpKind,
    tile: TilePos,
    out_events: &mut Vec<Event>,
) {
    if !world.maze.is_walkable(tile, Passability::NONE)
        || world.registry.power_up_at(tile).is_some()
    {
        debug!(?tile, ?kind, "power-up spawn rejected");
        return;
    }

    let id = world.registry.allocate_power_up();
    let _ = world.registry.power_ups.insert(
        id,
        PowerUpState {
            id,
            kind,
            tile,
            expires_in: world.settings.power_ups.expiry(),
        },
    );
    out_events.push(Event::PowerUpSpawned {
        power_up: id,
        kind,
        tile,
    });
}

/// Rolls the drop table for a freshly cleared tile.
pub(crate) fn roll_power_up_drop(world: &mut World, tile: TilePos, out_events: &mut Vec<Event>) {
    let tuning = &world.settings.power_ups;
    let chance = f64::from(tuning.chance).clamp(0.0, 1.0);
    if chance <= 0.0 || !world.rng.gen_bool(chance) {
        return;
    }

    let weights = PowerUpKind::ALL.map(|kind| tuning.weights.weight(kind));
    let distribution = match WeightedIndex::new(weights) {
        Ok(distribution) => distribution,
        Err(error) => {
            debug!(%error, "power-up weights unusable");
            return;
        }
    };
    let kind = PowerUpKind::ALL[distribution.sample(&mut world.rng)];
    spawn_power_up(world, kind, tile, out_events);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> PlayerState {
        let tuning = PlayerTuning::default();
        PlayerState {
            id: PlayerId::new(1),
            name: "p".to_owned(),
            position: TilePos::new(1, 1).center(),
            facing: blast_maze_core::Direction::South,
            moving: None,
            health: 40,
            max_health: tuning.max_health,
            alive: true,
            connected: true,
            lives: 1,
            spawn: TilePos::new(1, 1),
            abilities: blast_maze_core::Abilities {
                max_bombs: tuning.max_bombs_cap,
                blast_radius: 1,
                speed_multiplier: 1.9,
                penetration: 0,
                wall_pass: false,
                bomb_pass: false,
                bomb_kick: false,
                immunity_window: tuning.immunity(),
            },
            inventory: Default::default(),
            immunity: Duration::ZERO,
            respawn_in: None,
        }
    }

    #[test]
    fn power_ups_respect_caps() {
        let tuning = PlayerTuning::default();
        let mut state = player();
        grant(&mut state, PowerUpKind::ExtraBomb, &tuning);
        grant(&mut state, PowerUpKind::Speed, &tuning);
        grant(&mut state, PowerUpKind::BlastRadius, &tuning);
        assert_eq!(state.abilities.max_bombs, tuning.max_bombs_cap);
        assert_eq!(state.abilities.speed_multiplier, tuning.speed_multiplier_cap);
        assert_eq!(state.abilities.blast_radius, 2);
        assert_eq!(state.inventory.get(&PowerUpKind::ExtraBomb), Some(&1));
    }

    #[test]
    fn heal_and_shield_affect_vitals() {
        let tuning = PlayerTuning::default();
        let mut state = player();
        grant(&mut state, PowerUpKind::Heal, &tuning);
        grant(&mut state, PowerUpKind::Shield, &tuning);
        assert_eq!(state.health, state.max_health);
        assert_eq!(state.immunity, SHIELD_DURATION);
    }
}
