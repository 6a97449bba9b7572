//! Boss phase tracking and attack selection.

use std::time::Duration;

use blast_maze_core::{
    BossAttackKind, BossPhase, Command, DamageSource, MonsterSnapshot, Passability, TilePos,
};
use rand::{
    distributions::{Distribution, WeightedIndex},
    seq::SliceRandom,
};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace};

use crate::{AiError, AiState, Surroundings, Target};

/// Index of the deepest phase whose threshold the health fraction has crossed.
pub(crate) fn phase_for(phases: &[BossPhase], health_fraction: f32) -> u32 {
    phases
        .iter()
        .rposition(|phase| health_fraction <= phase.health_threshold)
        .and_then(|index| u32::try_from(index).ok())
        .unwrap_or(0)
}

/// Requests at most one phase transition for the boss this tick.
pub(crate) fn review_phase(
    monster: &MonsterSnapshot,
    phases: &[BossPhase],
    state: &mut AiState,
    out: &mut Vec<Command>,
) -> Result<(), AiError> {
    let current = monster.boss_phase.unwrap_or(0);
    if current as usize >= phases.len() {
        return Err(AiError::UnknownPhase {
            boss: monster.id,
            phase: current,
        });
    }

    let desired = phase_for(phases, monster.health_fraction());
    let already_requested = state.requested_phase.is_some_and(|phase| phase > current);
    if desired > current && !already_requested {
        let to_phase = current + 1;
        state.requested_phase = Some(to_phase);
        info!(
            boss = monster.id.get(),
            to_phase,
            health = monster.health,
            "boss phase transition requested"
        );
        out.push(Command::AdvanceBossPhase {
            boss: monster.id,
            to_phase,
        });
    }
    Ok(())
}

/// Picks one ready attack by weight and emits its commands.
///
/// Without a target or a ready attack the boss waits.
#[allow(clippy::too_many_arguments)]
pub(crate) fn attack(
    monster: &MonsterSnapshot,
    tile: TilePos,
    phase: &BossPhase,
    target: Option<Target>,
    state: &mut AiState,
    rng: &mut ChaCha8Rng,
    clock: Duration,
    world: &Surroundings<'_, '_>,
    out: &mut Vec<Command>,
) {
    let Some(target) = target else {
        return;
    };
    let ready: Vec<usize> = (0..phase.attacks.len())
        .filter(|index| {
            state
                .attack_ready_at
                .get(index)
                .map_or(true, |ready_at| *ready_at <= clock)
        })
        .collect();
    if ready.is_empty() {
        trace!(boss = monster.id.get(), "every attack cooling down");
        return;
    }
    let weights = ready.iter().map(|index| phase.attacks[*index].weight);
    let choice = match WeightedIndex::new(weights) {
        Ok(choice) => choice,
        Err(error) => {
            debug!(boss = monster.id.get(), %error, "no attack could be weighted");
            return;
        }
    };
    let index = ready[choice.sample(rng)];
    let attack = phase.attacks[index];
    let _ = state
        .attack_ready_at
        .insert(index, clock.saturating_add(attack.cooldown()));
    debug!(boss = monster.id.get(), kind = ?attack.kind, "boss attacks");

    match attack.kind {
        BossAttackKind::Slam { radius, damage } => {
            for player in world.players.iter() {
                let in_reach = player
                    .position
                    .tile()
                    .is_some_and(|position| position.manhattan_distance(tile) <= radius);
                if player.alive && in_reach {
                    out.push(Command::DamagePlayer {
                        player: player.id,
                        amount: damage,
                        source: DamageSource::Monster(monster.id),
                    });
                }
            }
        }
        BossAttackKind::Summon { kind, count } => {
            for spawn in spawn_tiles(tile, count, world) {
                out.push(Command::SpawnMonster { kind, tile: spawn });
            }
        }
        BossAttackKind::BombRain { count, radius } => {
            let mut candidates: Vec<TilePos> = tiles_within(target.tile, radius, world)
                .into_iter()
                .filter(|candidate| world.bombs.armed_at(*candidate).is_none())
                .collect();
            candidates.shuffle(rng);
            candidates.truncate(count as usize);
            candidates.sort();
            for bomb_tile in candidates {
                out.push(Command::PlaceBossBomb {
                    boss: monster.id,
                    tile: bomb_tile,
                });
            }
        }
    }
}

/// Free tiles around `center` for summoned monsters, cycling when crowded.
pub(crate) fn spawn_tiles(center: TilePos, count: u32, world: &Surroundings<'_, '_>) -> Vec<TilePos> {
    let mut around: Vec<TilePos> = world
        .maze
        .walkable_neighbors(center, Passability::NONE)
        .map(|(_, tile)| tile)
        .filter(|tile| world.bombs.armed_at(*tile).is_none())
        .collect();
    if around.is_empty() {
        around.push(center);
    }
    around.iter().copied().cycle().take(count as usize).collect()
}

fn tiles_within(center: TilePos, radius: u32, world: &Surroundings<'_, '_>) -> Vec<TilePos> {
    let (columns, rows) = world.maze.dimensions();
    let left = center.column().saturating_sub(radius);
    let top = center.row().saturating_sub(radius);
    let right = center.column().saturating_add(radius).min(columns.saturating_sub(1));
    let bottom = center.row().saturating_add(radius).min(rows.saturating_sub(1));
    (top..=bottom)
        .flat_map(|row| (left..=right).map(move |column| TilePos::new(column, row)))
        .filter(|tile| tile.manhattan_distance(center) <= radius)
        .filter(|tile| world.maze.is_walkable(*tile, Passability::NONE))
        .collect()
}
