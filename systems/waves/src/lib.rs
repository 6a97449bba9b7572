#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave system that releases monsters from gates and timers.

use std::{collections::VecDeque, time::Duration};

use blast_maze_core::{
    Command, Difficulty, Event, GameSettings, GateKind, MonsterKind, MonsterView, PlayerView,
    SpawnRejection, TilePos, TimedWave, WaveMember, WaveTuning,
};
use tracing::{debug, info, warn};

/// Where a queued member appears.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Anchor {
    /// The tile of the gate whose destruction released the member.
    Gate(TilePos),
    /// The configured monster spawn farthest from every player.
    Remote,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct QueuedSpawn {
    kind: MonsterKind,
    anchor: Anchor,
}

/// Pure system that queues wave members and releases them at a fixed spacing.
#[derive(Debug)]
pub struct Waves {
    tuning: WaveTuning,
    difficulty: Difficulty,
    max_active: u32,
    clock: Duration,
    cooldown: Duration,
    next_timed: usize,
    queue: VecDeque<QueuedSpawn>,
    in_flight: Vec<(QueuedSpawn, TilePos)>,
}

impl Waves {
    /// Creates the wave system for the provided settings.
    #[must_use]
    pub fn new(settings: &GameSettings) -> Self {
        let mut tuning = settings.waves.clone();
        tuning.timed.sort_by_key(TimedWave::at);
        Self {
            tuning,
            difficulty: settings.difficulty,
            max_active: settings.monsters.max_active,
            clock: Duration::ZERO,
            cooldown: Duration::ZERO,
            next_timed: 0,
            queue: VecDeque::new(),
            in_flight: Vec::new(),
        }
    }

    /// Members queued but not yet released into the world.
    #[must_use]
    pub fn pending(&self) -> u32 {
        u32::try_from(self.queue.len()).unwrap_or(u32::MAX)
    }

    /// Consumes world events and immutable views to emit spawn commands.
    ///
    /// Members released on the previous call that the world turned away at
    /// the monster cap return to the front of the queue.
    pub fn handle(
        &mut self,
        events: &[Event],
        players: &PlayerView,
        monsters: &MonsterView,
        monster_spawns: &[TilePos],
        out: &mut Vec<Command>,
    ) {
        let mut returned = Vec::new();
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    self.clock = self.clock.saturating_add(*dt);
                    self.cooldown = self.cooldown.saturating_sub(*dt);
                }
                Event::MazeLoaded { .. } => self.reset(),
                Event::GateDestroyed { gate, kind, tile } => {
                    let members = match kind {
                        GateKind::Primary => self.tuning.primary_gate.clone(),
                        GateKind::Secondary => self.tuning.secondary_gate.clone(),
                        GateKind::Emergency => Vec::new(),
                    };
                    info!(gate = gate.get(), ?kind, "gate wave released");
                    self.enqueue(&members, Anchor::Gate(*tile));
                }
                Event::MonsterSpawnRejected {
                    kind,
                    tile,
                    reason: SpawnRejection::CapacityReached,
                } => {
                    if let Some(index) = self
                        .in_flight
                        .iter()
                        .position(|(member, at)| member.kind == *kind && at == tile)
                    {
                        returned.push(self.in_flight.remove(index).0);
                    }
                }
                _ => {}
            }
        }
        self.in_flight.clear();
        for member in returned.into_iter().rev() {
            debug!(kind = ?member.kind, "wave member turned away at the cap; requeued");
            self.queue.push_front(member);
        }

        while let Some(wave) = self.tuning.timed.get(self.next_timed) {
            if wave.at() > self.clock {
                break;
            }
            let members = wave.members.clone();
            info!(at_ms = wave.at_ms, "timed wave released");
            self.next_timed += 1;
            self.enqueue(&members, Anchor::Remote);
        }

        self.release(players, monsters, monster_spawns, out);
    }

    fn reset(&mut self) {
        self.clock = Duration::ZERO;
        self.cooldown = Duration::ZERO;
        self.next_timed = 0;
        self.queue.clear();
        self.in_flight.clear();
    }

    fn enqueue(&mut self, members: &[WaveMember], anchor: Anchor) {
        for member in members {
            for _ in 0..self.difficulty.scale_count(member.count) {
                self.queue.push_back(QueuedSpawn {
                    kind: member.kind,
                    anchor,
                });
            }
        }
    }

    fn release(
        &mut self,
        players: &PlayerView,
        monsters: &MonsterView,
        monster_spawns: &[TilePos],
        out: &mut Vec<Command>,
    ) {
        let mut active = u32::try_from(monsters.len()).unwrap_or(u32::MAX);
        while self.cooldown.is_zero() && active < self.max_active {
            let Some(member) = self.queue.front().copied() else {
                return;
            };
            let tile = match member.anchor {
                Anchor::Gate(tile) => Some(tile),
                Anchor::Remote => farthest_from_players(players, monster_spawns),
            };
            let _ = self.queue.pop_front();
            let Some(tile) = tile else {
                warn!(kind = ?member.kind, "no monster spawn available; member dropped");
                continue;
            };
            debug!(kind = ?member.kind, ?tile, pending = self.queue.len(), "wave member released");
            out.push(Command::SpawnMonster {
                kind: member.kind,
                tile,
            });
            self.in_flight.push((member, tile));
            active += 1;
            self.cooldown = self.tuning.spawn_spacing();
        }
    }
}

/// Spawn tile maximizing the distance to the closest active player.
///
/// Ties keep the earliest tile in the configured order.
fn farthest_from_players(players: &PlayerView, spawns: &[TilePos]) -> Option<TilePos> {
    let occupied: Vec<TilePos> = players
        .iter()
        .filter(|player| player.alive)
        .filter_map(|player| player.position.tile())
        .collect();
    let mut best: Option<(u32, TilePos)> = None;
    for spawn in spawns {
        let distance = occupied
            .iter()
            .map(|tile| tile.manhattan_distance(*spawn))
            .min()
            .unwrap_or(u32::MAX);
        if best.map_or(true, |(best_distance, _)| distance > best_distance) {
            best = Some((distance, *spawn));
        }
    }
    best.map(|(_, tile)| tile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_maze_core::{Direction, GateId, MonsterId, MonsterSnapshot};

    const SPACING: Duration = Duration::from_millis(750);

    fn quiet_settings() -> GameSettings {
        let mut settings = GameSettings::default();
        settings.waves.timed.clear();
        settings
    }

    fn tick(dt: Duration) -> Event {
        Event::TimeAdvanced { dt }
    }

    fn gate_destroyed(kind: GateKind, tile: TilePos) -> Event {
        Event::GateDestroyed {
            gate: GateId::new(0),
            kind,
            tile,
        }
    }

    fn spawned(out: &[Command]) -> Vec<(MonsterKind, TilePos)> {
        out.iter()
            .filter_map(|command| match command {
                Command::SpawnMonster { kind, tile } => Some((*kind, *tile)),
                _ => None,
            })
            .collect()
    }

    fn crowd(count: u32) -> MonsterView {
        MonsterView::from_snapshots(
            (0..count)
                .map(|id| MonsterSnapshot {
                    id: MonsterId::new(id),
                    kind: MonsterKind::Balloon,
                    position: TilePos::new(1, 1).center(),
                    facing: Direction::South,
                    moving: None,
                    health: 1,
                    max_health: 1,
                    anchor: TilePos::new(1, 1),
                    boss_phase: None,
                })
                .collect(),
        )
    }

    #[test]
    fn primary_gate_releases_members_at_spacing() {
        let mut waves = Waves::new(&quiet_settings());
        let gate = TilePos::new(5, 5);
        let mut out = Vec::new();

        waves.handle(
            &[gate_destroyed(GateKind::Primary, gate)],
            &PlayerView::default(),
            &MonsterView::default(),
            &[],
            &mut out,
        );
        assert_eq!(spawned(&out), vec![(MonsterKind::Hunter, gate)]);
        assert_eq!(waves.pending(), 3);

        out.clear();
        waves.handle(
            &[tick(SPACING / 2)],
            &PlayerView::default(),
            &MonsterView::default(),
            &[],
            &mut out,
        );
        assert!(out.is_empty());

        waves.handle(
            &[tick(SPACING / 2)],
            &PlayerView::default(),
            &MonsterView::default(),
            &[],
            &mut out,
        );
        assert_eq!(spawned(&out), vec![(MonsterKind::Hunter, gate)]);
        assert_eq!(waves.pending(), 2);
    }

    #[test]
    fn emergency_gates_release_nothing() {
        let mut waves = Waves::new(&quiet_settings());
        let mut out = Vec::new();
        waves.handle(
            &[gate_destroyed(GateKind::Emergency, TilePos::new(2, 2))],
            &PlayerView::default(),
            &MonsterView::default(),
            &[],
            &mut out,
        );
        assert!(out.is_empty());
        assert_eq!(waves.pending(), 0);
    }

    #[test]
    fn members_wait_at_the_active_cap() {
        let mut settings = quiet_settings();
        settings.monsters.max_active = 2;
        let mut waves = Waves::new(&settings);
        let mut out = Vec::new();

        waves.handle(
            &[gate_destroyed(GateKind::Secondary, TilePos::new(3, 3))],
            &PlayerView::default(),
            &crowd(2),
            &[],
            &mut out,
        );
        assert!(out.is_empty());
        assert_eq!(waves.pending(), 2);

        waves.handle(
            &[tick(SPACING)],
            &PlayerView::default(),
            &crowd(1),
            &[],
            &mut out,
        );
        assert_eq!(spawned(&out).len(), 1);
        assert_eq!(waves.pending(), 1);
    }

    #[test]
    fn timed_wave_uses_remote_spawns_and_difficulty() {
        let mut settings = GameSettings::default();
        settings.difficulty = Difficulty::Hard;
        settings.waves.spawn_spacing_ms = 0;
        let mut waves = Waves::new(&settings);
        let spawns = [TilePos::new(9, 9), TilePos::new(5, 5)];
        let mut out = Vec::new();

        waves.handle(
            &[tick(Duration::from_millis(16))],
            &PlayerView::default(),
            &MonsterView::default(),
            &spawns,
            &mut out,
        );

        // Hard turns three balloons into five.
        let released = spawned(&out);
        assert_eq!(released.len(), 5);
        assert!(released
            .iter()
            .all(|(kind, tile)| *kind == MonsterKind::Balloon && *tile == TilePos::new(9, 9)));
        assert_eq!(waves.pending(), 0);
    }

    #[test]
    fn farthest_spawn_is_chosen_relative_to_players() {
        assert_eq!(
            farthest_from_players(&PlayerView::default(), &[]),
            None
        );
        assert_eq!(
            farthest_from_players(
                &PlayerView::default(),
                &[TilePos::new(1, 1), TilePos::new(2, 2)]
            ),
            Some(TilePos::new(1, 1))
        );
    }
}
