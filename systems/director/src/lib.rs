#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Monster and boss AI director.
//!
//! The director keeps per-monster memory between ticks, chooses a goal for
//! each monster by its kind's priority list, plans routes with a breadth-first
//! search and turns the result into intents, contact damage and boss attacks.
//! Failures are isolated per monster: the monster is logged and skipped while
//! the rest of the tick proceeds.

mod boss;
mod pathfinding;

use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use blast_maze_core::{
    derive_stream_seed, AiGoal, BombView, Command, DamageSource, Event, GameSettings, MazeView,
    MonsterId, MonsterKind, MonsterSnapshot, MonsterTuning, MonsterView, Passability, PlayerId,
    PlayerView, TilePos,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, warn};

/// Distance from the anchor within which patrolling monsters wander.
const PATROL_RADIUS: u32 = 4;

/// Reasons the director skips a monster for one tick.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AiError {
    /// The monster's position does not map onto the maze.
    #[error("monster {} is outside the maze", monster.get())]
    OutsideMaze {
        /// Monster that was skipped.
        monster: MonsterId,
    },
    /// The boss reported a phase its kind does not define.
    #[error("boss {} reports unknown phase {phase}", boss.get())]
    UnknownPhase {
        /// Boss that was skipped.
        boss: MonsterId,
        /// Phase index reported by the world.
        phase: u32,
    },
}

/// Player chosen as the focus of a monster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Target {
    pub(crate) player: PlayerId,
    pub(crate) tile: TilePos,
}

/// Read-only views shared by every decision in a tick.
pub(crate) struct Surroundings<'view, 'maze> {
    pub(crate) players: &'view PlayerView,
    pub(crate) bombs: &'view BombView,
    pub(crate) maze: &'view MazeView<'maze>,
}

/// Memory the director keeps for one monster.
#[derive(Clone, Debug)]
pub(crate) struct AiState {
    goal: AiGoal,
    requested_goal: AiGoal,
    target: Option<PlayerId>,
    destination: Option<TilePos>,
    path: VecDeque<TilePos>,
    recalculate_at: Duration,
    target_tile: Option<TilePos>,
    contact_ready_at: Duration,
    pub(crate) attack_ready_at: BTreeMap<usize, Duration>,
    pub(crate) requested_phase: Option<u32>,
}

impl AiState {
    pub(crate) fn new(clock: Duration) -> Self {
        Self {
            goal: AiGoal::Patrol,
            requested_goal: AiGoal::Patrol,
            target: None,
            destination: None,
            path: VecDeque::new(),
            recalculate_at: clock,
            target_tile: None,
            contact_ready_at: clock,
            attack_ready_at: BTreeMap::new(),
            requested_phase: None,
        }
    }
}

/// Stateful system that drives every monster once per tick.
#[derive(Debug)]
pub struct Director {
    rng: ChaCha8Rng,
    clock: Duration,
    tuning: MonsterTuning,
    states: BTreeMap<MonsterId, AiState>,
}

impl Director {
    /// Creates a director seeded from the session seed.
    #[must_use]
    pub fn new(settings: &GameSettings) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(derive_stream_seed(settings.maze.seed, "director")),
            clock: Duration::ZERO,
            tuning: settings.monsters.clone(),
            states: BTreeMap::new(),
        }
    }

    /// Goal the monster pursued during the last tick.
    #[must_use]
    pub fn goal(&self, monster: MonsterId) -> Option<AiGoal> {
        self.states.get(&monster).map(|state| state.goal)
    }

    /// Player the monster focused on during the last tick.
    #[must_use]
    pub fn target(&self, monster: MonsterId) -> Option<PlayerId> {
        self.states.get(&monster).and_then(|state| state.target)
    }

    /// Consumes world events and immutable views to emit AI commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        players: &PlayerView,
        monsters: &MonsterView,
        bombs: &BombView,
        maze: &MazeView<'_>,
        out: &mut Vec<Command>,
    ) {
        let world = Surroundings {
            players,
            bombs,
            maze,
        };
        let mut phase_entries = Vec::new();
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => self.clock = self.clock.saturating_add(*dt),
                Event::MazeLoaded { .. } => self.states.clear(),
                Event::MonsterKilled { monster, .. } => {
                    let _ = self.states.remove(monster);
                }
                Event::BossPhaseAdvanced { boss, phase } => phase_entries.push((*boss, *phase)),
                _ => {}
            }
        }
        self.states.retain(|id, _| monsters.get(*id).is_some());

        for (boss, phase) in phase_entries {
            if let Some(snapshot) = monsters.get(boss) {
                self.enter_phase(snapshot, phase, &world, out);
            }
        }

        let targets = select_targets(players, monsters);
        for monster in monsters.iter() {
            let target = targets.get(&monster.id).copied();
            if let Err(error) = self.think(monster, target, &world, out) {
                warn!(monster = monster.id.get(), %error, "monster skipped this tick");
            }
        }
    }

    fn enter_phase(
        &mut self,
        boss: &MonsterSnapshot,
        phase: u32,
        world: &Surroundings<'_, '_>,
        out: &mut Vec<Command>,
    ) {
        let clock = self.clock;
        let state = self
            .states
            .entry(boss.id)
            .or_insert_with(|| AiState::new(clock));
        state.attack_ready_at.clear();

        let phases = boss.kind.boss_phases();
        let Some(definition) = usize::try_from(phase).ok().and_then(|index| phases.get(index)) else {
            return;
        };
        let Some(center) = boss.position.tile() else {
            return;
        };
        debug!(boss = boss.id.get(), phase, "boss entered phase");
        for minion in &definition.minions {
            for tile in boss::spawn_tiles(center, minion.count, world) {
                out.push(Command::SpawnMonster {
                    kind: minion.kind,
                    tile,
                });
            }
        }
    }

    fn think(
        &mut self,
        monster: &MonsterSnapshot,
        target: Option<Target>,
        world: &Surroundings<'_, '_>,
        out: &mut Vec<Command>,
    ) -> Result<(), AiError> {
        let tile = monster
            .position
            .tile()
            .filter(|tile| world.maze.contains(*tile))
            .ok_or(AiError::OutsideMaze {
                monster: monster.id,
            })?;
        let clock = self.clock;
        let profile = monster.kind.profile();
        let passability = Passability {
            wall_pass: profile.wall_pass,
            bomb_pass: false,
        };
        let state = self
            .states
            .entry(monster.id)
            .or_insert_with(|| AiState::new(clock));

        if monster.kind.is_boss() {
            let phases = monster.kind.boss_phases();
            boss::review_phase(monster, &phases, state, out)?;
            let phase = monster.boss_phase.unwrap_or(0) as usize;
            if let Some(phase) = phases.get(phase) {
                boss::attack(
                    monster,
                    tile,
                    phase,
                    target,
                    state,
                    &mut self.rng,
                    clock,
                    world,
                    out,
                );
            }
        }

        strike_on_contact(monster, tile, state, clock, self.tuning.attack_cooldown(), world, out);

        let goal = choose_goal(monster, tile, target, self.tuning.defend_leash);
        let destination = match goal {
            AiGoal::Hunt => target.map(|target| target.tile),
            AiGoal::Defend => Some(monster.anchor),
            AiGoal::Patrol => None,
        };
        let target_moved = match (destination, state.target_tile) {
            (Some(now), Some(before)) => now.manhattan_distance(before) > self.tuning.repath_distance,
            _ => false,
        };
        let lost = state.path.is_empty()
            && match destination {
                Some(destination) => state.destination != Some(destination),
                None => state.destination != Some(tile),
            };
        let replan = goal != state.requested_goal
            || target_moved
            || lost
            || clock >= state.recalculate_at
            || pathfinding::is_blocked(&state.path, world.maze, world.bombs, passability);

        state.target = target.filter(|_| goal == AiGoal::Hunt).map(|target| target.player);
        if replan {
            state.goal = goal;
            state.requested_goal = goal;
            state.target_tile = destination;
            let destination = match destination {
                Some(destination) => destination,
                None => patrol_destination(
                    &mut self.rng,
                    monster,
                    tile,
                    world,
                    passability,
                ),
            };
            state.destination = Some(destination);
            state.recalculate_at = clock.saturating_add(self.tuning.repath_interval());
            match pathfinding::find_path(world.maze, world.bombs, tile, destination, passability) {
                Some(path) => state.path = path,
                None => {
                    debug!(
                        monster = monster.id.get(),
                        ?goal,
                        ?destination,
                        "no route; falling back to patrol"
                    );
                    state.goal = AiGoal::Patrol;
                    state.target = None;
                    let fallback = patrol_destination(
                        &mut self.rng,
                        monster,
                        tile,
                        world,
                        passability,
                    );
                    state.destination = Some(fallback);
                    state.path =
                        pathfinding::find_path(world.maze, world.bombs, tile, fallback, passability)
                            .unwrap_or_default();
                }
            }
        }

        while state.path.front() == Some(&tile) {
            let _ = state.path.pop_front();
        }
        let direction = match state.path.front() {
            Some(next) => {
                let direction = tile.direction_to(*next);
                if direction.is_none() {
                    state.path.clear();
                    state.recalculate_at = clock;
                }
                direction
            }
            None => None,
        };
        if direction != monster.moving {
            out.push(Command::SetMonsterIntent {
                monster: monster.id,
                direction,
            });
        }
        Ok(())
    }
}

/// First goal in the kind's priority list whose precondition holds.
fn choose_goal(
    monster: &MonsterSnapshot,
    tile: TilePos,
    target: Option<Target>,
    defend_leash: u32,
) -> AiGoal {
    monster
        .kind
        .profile()
        .goals
        .into_iter()
        .find(|goal| match goal {
            AiGoal::Hunt => target.is_some(),
            AiGoal::Defend => tile.manhattan_distance(monster.anchor) > defend_leash,
            AiGoal::Patrol => true,
        })
        .unwrap_or(AiGoal::Patrol)
}

fn strike_on_contact(
    monster: &MonsterSnapshot,
    tile: TilePos,
    state: &mut AiState,
    clock: Duration,
    cooldown: Duration,
    world: &Surroundings<'_, '_>,
    out: &mut Vec<Command>,
) {
    if clock < state.contact_ready_at {
        return;
    }
    let damage = monster.kind.profile().contact_damage;
    let mut struck = false;
    for player in world.players.iter() {
        if player.alive && player.connected && player.position.tile() == Some(tile) {
            out.push(Command::DamagePlayer {
                player: player.id,
                amount: damage,
                source: DamageSource::Monster(monster.id),
            });
            struck = true;
        }
    }
    if struck {
        state.contact_ready_at = clock.saturating_add(cooldown);
    }
}

/// Nearest eligible player per monster, with pack members sharing sightings.
fn select_targets(players: &PlayerView, monsters: &MonsterView) -> BTreeMap<MonsterId, Target> {
    let candidates: Vec<Target> = players
        .iter()
        .filter(|player| player.alive && player.connected && !player.respawning)
        .filter_map(|player| {
            player.position.tile().map(|tile| Target {
                player: player.id,
                tile,
            })
        })
        .collect();

    let mut targets = BTreeMap::new();
    for monster in monsters.iter() {
        let Some(tile) = monster.position.tile() else {
            continue;
        };
        let range = monster.kind.profile().detection_radius;
        if let Some(target) = nearest(tile, &candidates, Some(range)) {
            let _ = targets.insert(monster.id, target);
        }
    }

    let mut sightings: BTreeMap<MonsterKind, Target> = BTreeMap::new();
    for monster in monsters.iter().filter(|monster| monster.kind.profile().pack) {
        if let Some(target) = targets.get(&monster.id) {
            let _ = sightings.entry(monster.kind).or_insert(*target);
        }
    }
    for monster in monsters.iter().filter(|monster| monster.kind.profile().pack) {
        if let Some(shared) = sightings.get(&monster.kind) {
            let _ = targets.entry(monster.id).or_insert(*shared);
        }
    }
    targets
}

/// Closest candidate by tile distance; ties go to the lowest player id.
fn nearest(from: TilePos, candidates: &[Target], range: Option<u32>) -> Option<Target> {
    let mut best: Option<(u32, Target)> = None;
    for candidate in candidates {
        let distance = candidate.tile.manhattan_distance(from);
        if range.is_some_and(|range| distance > range) {
            continue;
        }
        let closer = best.map_or(true, |(best_distance, best_target)| {
            distance < best_distance
                || (distance == best_distance && candidate.player < best_target.player)
        });
        if closer {
            best = Some((distance, *candidate));
        }
    }
    best.map(|(_, target)| target)
}

/// Wandering destination near the anchor, drifting toward players with aggression.
fn patrol_destination(
    rng: &mut ChaCha8Rng,
    monster: &MonsterSnapshot,
    tile: TilePos,
    world: &Surroundings<'_, '_>,
    passability: Passability,
) -> TilePos {
    let aggression = f64::from(monster.kind.profile().aggression).clamp(0.0, 1.0);
    if rng.gen_bool(aggression) {
        let players: Vec<Target> = world
            .players
            .iter()
            .filter(|player| player.alive && player.connected)
            .filter_map(|player| {
                player.position.tile().map(|tile| Target {
                    player: player.id,
                    tile,
                })
            })
            .collect();
        if let Some(target) = nearest(tile, &players, None) {
            return target.tile;
        }
    }

    let anchor = monster.anchor;
    let (columns, rows) = world.maze.dimensions();
    let left = anchor.column().saturating_sub(PATROL_RADIUS);
    let top = anchor.row().saturating_sub(PATROL_RADIUS);
    let right = anchor.column().saturating_add(PATROL_RADIUS).min(columns.saturating_sub(1));
    let bottom = anchor.row().saturating_add(PATROL_RADIUS).min(rows.saturating_sub(1));
    let candidates: Vec<TilePos> = (top..=bottom)
        .flat_map(|row| (left..=right).map(move |column| TilePos::new(column, row)))
        .filter(|candidate| candidate.manhattan_distance(anchor) <= PATROL_RADIUS)
        .filter(|candidate| *candidate != tile)
        .filter(|candidate| world.maze.is_walkable(*candidate, passability))
        .collect();
    candidates.choose(rng).copied().unwrap_or(tile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_maze_core::{Direction, Position, Tile};

    fn monster(id: u32, kind: MonsterKind, tile: TilePos) -> MonsterSnapshot {
        MonsterSnapshot {
            id: MonsterId::new(id),
            kind,
            position: tile.center(),
            facing: Direction::South,
            moving: None,
            health: 10,
            max_health: 10,
            anchor: tile,
            boss_phase: kind.is_boss().then_some(0),
        }
    }

    fn target(player: u32, column: u32, row: u32) -> Target {
        Target {
            player: PlayerId::new(player),
            tile: TilePos::new(column, row),
        }
    }

    #[test]
    fn nearest_breaks_ties_by_lowest_id() {
        let candidates = [target(3, 2, 0), target(1, 0, 2), target(2, 5, 5)];
        let chosen = nearest(TilePos::new(0, 0), &candidates, Some(4));
        assert_eq!(chosen, Some(target(1, 0, 2)));
    }

    #[test]
    fn nearest_respects_range() {
        let candidates = [target(1, 9, 9)];
        assert_eq!(nearest(TilePos::new(0, 0), &candidates, Some(4)), None);
        assert!(nearest(TilePos::new(0, 0), &candidates, None).is_some());
    }

    #[test]
    fn goals_follow_kind_priority() {
        let hunter = monster(0, MonsterKind::Hunter, TilePos::new(3, 3));
        let sighted = Some(target(1, 4, 3));
        assert_eq!(choose_goal(&hunter, TilePos::new(3, 3), sighted, 4), AiGoal::Hunt);
        assert_eq!(choose_goal(&hunter, TilePos::new(3, 3), None, 4), AiGoal::Patrol);
        assert_eq!(choose_goal(&hunter, TilePos::new(9, 3), None, 4), AiGoal::Defend);

        let brute = monster(1, MonsterKind::Brute, TilePos::new(3, 3));
        assert_eq!(choose_goal(&brute, TilePos::new(9, 3), sighted, 4), AiGoal::Defend);
        assert_eq!(choose_goal(&brute, TilePos::new(4, 3), sighted, 4), AiGoal::Hunt);
    }

    #[test]
    fn monsters_outside_the_maze_are_skipped_alone() {
        let tiles = vec![Tile::Empty; 25];
        let maze = MazeView::new(&tiles, 5, 5);
        let mut stray = monster(0, MonsterKind::Balloon, TilePos::new(1, 1));
        stray.position = Position::new(40.5, 1.5);
        let settled = monster(1, MonsterKind::Balloon, TilePos::new(2, 2));
        let monsters = MonsterView::from_snapshots(vec![stray, settled]);
        let mut director = Director::new(&GameSettings::default());
        let mut out = Vec::new();

        director.handle(
            &[],
            &PlayerView::default(),
            &monsters,
            &BombView::default(),
            &maze,
            &mut out,
        );

        assert_eq!(director.goal(MonsterId::new(0)), None);
        assert_eq!(director.goal(MonsterId::new(1)), Some(AiGoal::Patrol));
    }
}
