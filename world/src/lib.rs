#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Blast Maze.
//!
//! The world owns the maze and every entity of one session. It is mutated
//! exclusively through [`apply`], which executes a [`Command`] and reports the
//! consequences as [`Event`] values, and it is read through the [`query`]
//! module. Bomb fuses, chain reactions, damage, respawns and objective
//! evaluation all run inside `apply`, so replaying the same command sequence
//! always reproduces the same world.

mod bombs;
mod combat;
mod invariants;
mod maze;
mod monsters;
mod objectives;
mod players;
mod registry;
mod scoreboard;

#[cfg(feature = "fault_injection")]
pub mod fault_injection;

use std::time::Duration;

use blast_maze_core::{
    derive_stream_seed, Command, Event, GameSettings, GateId, GateStatus, MazeLayout, Outcome,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

pub use bombs::{blast_pattern, BlastPattern};
pub use invariants::{check_invariants, InvariantViolation};
pub use maze::Maze;

use registry::{GateState, Registry};
use scoreboard::Scoreboard;

const POWER_UP_STREAM: &str = "power-ups";

/// Represents the authoritative Blast Maze world state.
#[derive(Debug)]
pub struct World {
    settings: GameSettings,
    maze: Maze,
    registry: Registry,
    scoreboard: Scoreboard,
    rng: ChaCha8Rng,
    clock: Duration,
    tick_index: u64,
    outcome: Option<Outcome>,
}

impl World {
    /// Creates an empty world governed by the provided settings.
    ///
    /// The world holds no maze until a [`Command::LoadMaze`] is applied.
    #[must_use]
    pub fn new(settings: GameSettings) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(derive_stream_seed(
            settings.maze.seed,
            POWER_UP_STREAM,
        ));
        Self {
            settings,
            maze: Maze::default(),
            registry: Registry::default(),
            scoreboard: Scoreboard::default(),
            rng,
            clock: Duration::ZERO,
            tick_index: 0,
            outcome: None,
        }
    }

    fn load_maze(&mut self, layout: &MazeLayout, out_events: &mut Vec<Event>) {
        self.registry = Registry::default();
        self.scoreboard = Scoreboard::default();
        self.outcome = None;

        let mut placements = Vec::with_capacity(layout.gates.len());
        for (index, placement) in layout.gates.iter().enumerate() {
            let id = GateId::new(u32::try_from(index).unwrap_or(u32::MAX));
            placements.push((id, placement.tile));
            let _ = self.registry.gates.insert(
                id,
                GateState {
                    id,
                    tile: placement.tile,
                    kind: placement.kind,
                    status: GateStatus::Hidden,
                },
            );
        }
        self.maze = Maze::from_layout(layout, &placements);

        debug!(
            columns = layout.columns,
            rows = layout.rows,
            gates = layout.gates.len(),
            "maze loaded"
        );
        out_events.push(Event::MazeLoaded {
            columns: layout.columns,
            rows: layout.rows,
        });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadMaze { layout } => world.load_maze(&layout, out_events),
        Command::AddPlayer { player, name } => players::add(world, player, name, out_events),
        Command::RemovePlayer { player } => players::remove(world, player, out_events),
        Command::SetPlayerConnected { player, connected } => {
            players::set_connected(world, player, connected, out_events);
        }
        Command::SetPlayerIntent { player, direction } => {
            players::set_intent(world, player, direction);
        }
        Command::PlaceBomb { player } => bombs::place_player_bomb(world, player, out_events),
        Command::PlaceBossBomb { boss, tile } => {
            bombs::place_boss_bomb(world, boss, tile, out_events);
        }
        Command::RelocatePlayer {
            player,
            position,
            facing,
        } => players::relocate(world, player, position, facing, out_events),
        Command::RelocateMonster {
            monster,
            position,
            facing,
        } => monsters::relocate(world, monster, position, facing),
        Command::KickBomb { bomb, direction } => {
            bombs::kick(world, bomb, direction, out_events);
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });

            combat::advance_timers(world, dt, out_events);
            bombs::advance(world, dt, out_events);
        }
        Command::SetMonsterIntent { monster, direction } => {
            monsters::set_intent(world, monster, direction);
        }
        Command::SpawnMonster { kind, tile } => {
            monsters::spawn(world, kind, tile, out_events);
        }
        Command::DamagePlayer {
            player,
            amount,
            source,
        } => combat::damage_player(world, player, amount, source, out_events),
        Command::AdvanceBossPhase { boss, to_phase } => {
            monsters::advance_boss_phase(world, boss, to_phase, out_events);
        }
        Command::SpawnPowerUp { kind, tile } => {
            combat::spawn_power_up(world, kind, tile, out_events);
        }
        Command::EvaluateObjectives { pending_spawns } => {
            objectives::evaluate(world, pending_spawns, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use blast_maze_core::{
        BombView, GameSettings, GateSnapshot, MonsterId, MonsterView, ObjectiveStatus, Outcome,
        PlayerStatistics, PlayerView, PowerUpSnapshot,
    };

    use super::{Maze, World};

    /// Provides read-only access to the settings governing the world.
    #[must_use]
    pub fn settings(world: &World) -> &GameSettings {
        &world.settings
    }

    /// Provides read-only access to the maze.
    #[must_use]
    pub fn maze(world: &World) -> &Maze {
        &world.maze
    }

    /// Captures a read-only view of every player.
    #[must_use]
    pub fn player_view(world: &World) -> PlayerView {
        PlayerView::from_snapshots(
            world
                .registry
                .players
                .values()
                .map(|player| player.snapshot())
                .collect(),
        )
    }

    /// Captures a read-only view of every living monster.
    #[must_use]
    pub fn monster_view(world: &World) -> MonsterView {
        MonsterView::from_snapshots(
            world
                .registry
                .monsters
                .values()
                .map(|monster| super::monsters::snapshot(world, monster))
                .collect(),
        )
    }

    /// Captures a read-only view of every bomb, spent bombs included.
    #[must_use]
    pub fn bomb_view(world: &World) -> BombView {
        BombView::from_snapshots(
            world
                .registry
                .bombs
                .values()
                .map(|bomb| bomb.snapshot())
                .collect(),
        )
    }

    /// Snapshots of every gate in ascending identifier order.
    #[must_use]
    pub fn gates(world: &World) -> Vec<GateSnapshot> {
        world
            .registry
            .gates
            .values()
            .map(|gate| gate.snapshot())
            .collect()
    }

    /// Snapshots of every power-up on the ground in ascending identifier order.
    #[must_use]
    pub fn power_ups(world: &World) -> Vec<PowerUpSnapshot> {
        world
            .registry
            .power_ups
            .values()
            .map(|power_up| power_up.snapshot())
            .collect()
    }

    /// Active phase of the provided boss, if it is a living boss.
    #[must_use]
    pub fn boss_phase(world: &World, boss: MonsterId) -> Option<u32> {
        world.registry.bosses.get(&boss).map(|boss| boss.phase)
    }

    /// Simulated time elapsed since the world was created.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Number of ticks applied to the world.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Terminal outcome, once one has been reached.
    #[must_use]
    pub fn outcome(world: &World) -> Option<Outcome> {
        world.outcome
    }

    /// Objective summary including the provided number of pending wave members.
    #[must_use]
    pub fn objective_status(world: &World, pending_spawns: u32) -> ObjectiveStatus {
        super::objectives::status(world, pending_spawns)
    }

    /// Per-player totals accumulated so far, in ascending player order.
    #[must_use]
    pub fn statistics(world: &World) -> Vec<PlayerStatistics> {
        world.scoreboard.statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_maze_core::{
        BombOwner, Direction, Event, GateKind, GatePlacement, PlacementRejection, PlayerId,
        Position, Tile, TilePos,
    };

    fn open_layout(columns: u32, rows: u32) -> MazeLayout {
        let mut tiles = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            for column in 0..columns {
                let border = row == 0 || column == 0 || row == rows - 1 || column == columns - 1;
                tiles.push(if border { Tile::SolidWall } else { Tile::Empty });
            }
        }
        MazeLayout {
            columns,
            rows,
            tiles,
            spawn_points: vec![TilePos::new(1, 1), TilePos::new(columns - 2, rows - 2)],
            gates: Vec::new(),
            power_up_spots: Vec::new(),
            monster_spawns: Vec::new(),
            seed: 7,
            attempts: 1,
        }
    }

    fn world_with(layout: MazeLayout) -> World {
        let mut settings = GameSettings::default();
        settings.power_ups.chance = 0.0;
        let mut world = World::new(settings);
        let mut events = Vec::new();
        apply(&mut world, Command::LoadMaze { layout }, &mut events);
        world
    }

    #[test]
    fn loading_maze_registers_hidden_gates() {
        let mut layout = open_layout(9, 9);
        layout.gates.push(GatePlacement {
            tile: TilePos::new(4, 4),
            kind: GateKind::Primary,
        });
        let world = world_with(layout);

        let gates = query::gates(&world);
        assert_eq!(gates.len(), 1);
        assert_eq!(gates[0].status, GateStatus::Hidden);
        assert_eq!(
            query::maze(&world).tile(TilePos::new(4, 4)),
            Some(Tile::Gate { revealed: false })
        );
    }

    #[test]
    fn players_join_at_distinct_spawns() {
        let mut world = world_with(open_layout(9, 9));
        let mut events = Vec::new();
        for id in 1..=3 {
            apply(
                &mut world,
                Command::AddPlayer {
                    player: PlayerId::new(id),
                    name: format!("p{id}"),
                },
                &mut events,
            );
        }

        assert_eq!(
            events,
            vec![
                Event::PlayerJoined {
                    player: PlayerId::new(1),
                    spawn: TilePos::new(1, 1),
                },
                Event::PlayerJoined {
                    player: PlayerId::new(2),
                    spawn: TilePos::new(7, 7),
                },
                Event::PlayerJoinRejected {
                    player: PlayerId::new(3),
                },
            ]
        );
    }

    #[test]
    fn disconnected_players_cannot_place_bombs() {
        let mut world = world_with(open_layout(9, 9));
        let mut events = Vec::new();
        let player = PlayerId::new(1);
        apply(
            &mut world,
            Command::AddPlayer {
                player,
                name: "solo".to_owned(),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SetPlayerConnected {
                player,
                connected: false,
            },
            &mut events,
        );
        events.clear();

        apply(&mut world, Command::PlaceBomb { player }, &mut events);
        assert_eq!(
            events,
            vec![Event::BombPlacementRejected {
                owner: BombOwner::Player(player),
                reason: PlacementRejection::PlayerUnavailable,
            }]
        );
    }

    #[test]
    fn relocation_updates_position_and_facing() {
        let mut world = world_with(open_layout(9, 9));
        let mut events = Vec::new();
        let player = PlayerId::new(1);
        apply(
            &mut world,
            Command::AddPlayer {
                player,
                name: "solo".to_owned(),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::RelocatePlayer {
                player,
                position: Position::new(2.1, 1.5),
                facing: Direction::East,
            },
            &mut events,
        );

        let view = query::player_view(&world);
        let snapshot = view.get(player).expect("player present");
        assert_eq!(snapshot.position, Position::new(2.1, 1.5));
        assert_eq!(snapshot.facing, Direction::East);
    }

    #[test]
    fn tick_advances_clock() {
        let mut world = world_with(open_layout(9, 9));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(16),
            },
            &mut events,
        );
        assert_eq!(query::tick_index(&world), 1);
        assert_eq!(query::clock(&world), Duration::from_millis(16));
        assert_eq!(
            events,
            vec![Event::TimeAdvanced {
                dt: Duration::from_millis(16),
            }]
        );
    }
}
