#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session for one Blast Maze game.
//!
//! A [`Session`] owns the world and every system. Each call to
//! [`Session::tick`] drains queued inputs, moves entities, advances fuses and
//! timers, runs the monster director and the wave system, evaluates objectives,
//! verifies world invariants, and reports the tick as a [`StateDelta`]. The
//! [`runner`] module drives sessions on a tokio interval.

mod delta;
mod input;
mod outbox;
pub mod runner;

use std::{collections::VecDeque, time::Duration};

use blast_maze_core::{
    BombOwner, Command, Event, Explosion, FullSnapshot, GameSettings, GameStatistics, InputAck,
    InputKind, InputOutcome, ObjectiveStatus, Outcome, PlacementRejection, PlayerId,
    PlayerInput, RoomPlayer, ServerMessage, SettingsError, StateDelta, MAX_PLAYERS,
};
use blast_maze_system_director::Director;
use blast_maze_system_maze_generation::{connectivity, generate, GenerationError};
use blast_maze_system_movement::Movement;
use blast_maze_system_waves::Waves;
use blast_maze_world::{self as world, check_invariants, query, World};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub use input::{decode_input, ClientMessage, InputDisposition, InputError, MAX_INPUT_BYTES};
pub use outbox::{CursorStep, Delivery, DeltaCursor, Outbox};
pub use runner::{start_game, ClientFeed, SessionClosed, SessionHandle, SessionRequest};

use delta::DeltaTracker;
use input::SequenceLedger;

/// Reasons a session cannot be started.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum StartError {
    /// The settings failed validation.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// No playable maze could be generated.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// The roster holds no players.
    #[error("a session needs at least one player")]
    EmptyRoster,
    /// The roster exceeds the configured player limit.
    #[error("{players} players exceed the limit of {limit}")]
    RosterTooLarge {
        /// Players in the roster.
        players: usize,
        /// Configured limit.
        limit: u32,
    },
    /// The same player appears twice in the roster.
    #[error("player {0:?} appears more than once in the roster")]
    DuplicatePlayer(PlayerId),
    /// The world refused to seat a player.
    #[error("player {0:?} could not be seated")]
    PlayerRejected(PlayerId),
    /// The generated maze does not connect every spawn point.
    #[error("generated maze leaves spawn points disconnected")]
    SpawnsDisconnected,
}

/// Terminal summary produced exactly once when a session ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionEnd {
    /// Tick on which the session ended.
    pub tick: u64,
    /// Final outcome.
    pub outcome: Outcome,
    /// Human-readable reason broadcast to clients.
    pub reason: String,
    /// Totals handed to persistence.
    pub statistics: GameStatistics,
}

impl SessionEnd {
    /// The message announcing the end to clients.
    #[must_use]
    pub fn message(&self) -> ServerMessage {
        ServerMessage::SessionEnded {
            tick: self.tick,
            outcome: self.outcome,
            reason: self.reason.clone(),
        }
    }
}

/// Result of one simulated tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Changes produced by the tick.
    pub delta: StateDelta,
    /// Present on the tick that ended the session.
    pub ended: Option<SessionEnd>,
}

/// One running game: the world, its systems, and the input queue.
#[derive(Debug)]
pub struct Session {
    seed: u64,
    tick_duration: Duration,
    world: World,
    movement: Movement,
    director: Director,
    waves: Waves,
    inputs: VecDeque<(PlayerId, PlayerInput)>,
    ledger: SequenceLedger,
    tracker: DeltaTracker,
    carried: Vec<Event>,
    ended: Option<Outcome>,
}

impl Session {
    /// Generates the maze, seats the roster, and prepares the first tick.
    pub fn start(settings: GameSettings, roster: &[RoomPlayer]) -> Result<Self, StartError> {
        settings.validate()?;
        if roster.is_empty() {
            return Err(StartError::EmptyRoster);
        }
        let limit = settings.max_players.min(MAX_PLAYERS);
        if roster.len() > limit as usize {
            return Err(StartError::RosterTooLarge {
                players: roster.len(),
                limit,
            });
        }
        for (index, player) in roster.iter().enumerate() {
            if roster[..index].iter().any(|other| other.id == player.id) {
                return Err(StartError::DuplicatePlayer(player.id));
            }
        }

        let layout = generate(&settings)?;
        if !connectivity::spawns_connected(&layout) {
            return Err(StartError::SpawnsDisconnected);
        }

        let seed = settings.maze.seed;
        let mut world = World::new(settings.clone());
        let mut carried = Vec::new();
        world::apply(&mut world, Command::LoadMaze { layout }, &mut carried);
        for player in roster {
            let mut events = Vec::new();
            world::apply(
                &mut world,
                Command::AddPlayer {
                    player: player.id,
                    name: player.name.clone(),
                },
                &mut events,
            );
            if events
                .iter()
                .any(|event| matches!(event, Event::PlayerJoinRejected { .. }))
            {
                return Err(StartError::PlayerRejected(player.id));
            }
            carried.extend(events);
        }

        info!(
            session = seed,
            players = roster.len(),
            difficulty = ?settings.difficulty,
            "session started"
        );
        Ok(Self {
            seed,
            tick_duration: settings.sync.tick_duration(),
            movement: Movement::new(&settings),
            director: Director::new(&settings),
            waves: Waves::new(&settings),
            tracker: DeltaTracker::new(&world),
            world,
            inputs: VecDeque::new(),
            ledger: SequenceLedger::default(),
            carried,
            ended: None,
        })
    }

    /// Simulated time covered by one tick.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Number of ticks simulated so far.
    #[must_use]
    pub fn tick_index(&self) -> u64 {
        query::tick_index(&self.world)
    }

    /// Final outcome once the session has ended.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.ended
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Queues an input for the next tick unless its sequence was already seen.
    pub fn enqueue(&mut self, player: PlayerId, input: PlayerInput) -> InputDisposition {
        if self.ended.is_some() {
            return InputDisposition::SessionEnded;
        }
        if query::player_view(&self.world).get(player).is_none() {
            return InputDisposition::UnknownPlayer;
        }
        if !self.ledger.admit(player, input.sequence) {
            debug!(
                session = self.seed,
                player = player.get(),
                sequence = input.sequence,
                "duplicate input ignored"
            );
            return InputDisposition::Duplicate;
        }
        self.inputs.push_back((player, input));
        InputDisposition::Queued
    }

    /// Marks a player disconnected; their bombs keep fusing.
    pub fn disconnect(&mut self, player: PlayerId) {
        self.set_connected(player, false);
    }

    /// Marks a previously disconnected player connected again.
    pub fn reconnect(&mut self, player: PlayerId) {
        self.set_connected(player, true);
    }

    fn set_connected(&mut self, player: PlayerId, connected: bool) {
        if self.ended.is_some() {
            return;
        }
        info!(session = self.seed, player = player.get(), connected, "connection changed");
        world::apply(
            &mut self.world,
            Command::SetPlayerConnected { player, connected },
            &mut self.carried,
        );
    }

    /// Removes a player from the session for good.
    pub fn leave(&mut self, player: PlayerId) {
        if self.ended.is_some() {
            return;
        }
        self.inputs.retain(|(owner, _)| *owner != player);
        self.ledger.forget(player);
        world::apply(
            &mut self.world,
            Command::RemovePlayer { player },
            &mut self.carried,
        );
    }

    /// Full client-facing snapshot of the current state.
    #[must_use]
    pub fn full_snapshot(&self) -> FullSnapshot {
        delta::full_snapshot(&self.world, self.objective())
    }

    fn objective(&self) -> ObjectiveStatus {
        query::objective_status(&self.world, self.waves.pending())
    }

    /// Ends the session with [`Outcome::Aborted`].
    ///
    /// Returns `None` when the session had already ended.
    pub fn abort(&mut self, reason: &str) -> Option<SessionEnd> {
        if self.ended.is_some() {
            return None;
        }
        Some(self.finish(Outcome::Aborted, reason.to_owned()))
    }

    /// Simulates one tick. Returns `None` once the session has ended.
    pub fn tick(&mut self) -> Option<TickReport> {
        if self.ended.is_some() {
            return None;
        }
        let dt = self.tick_duration;
        let mut events = std::mem::take(&mut self.carried);
        let inherited = events.len();

        let acks = self.drain_inputs(&mut events);

        let mut commands = Vec::new();
        {
            let maze = query::maze(&self.world).view();
            self.movement.handle(
                dt,
                &query::player_view(&self.world),
                &query::monster_view(&self.world),
                &query::bomb_view(&self.world),
                &maze,
                &mut commands,
            );
        }
        self.apply_all(commands.drain(..), &mut events);

        world::apply(&mut self.world, Command::Tick { dt }, &mut events);

        {
            let maze = query::maze(&self.world).view();
            self.director.handle(
                &events,
                &query::player_view(&self.world),
                &query::monster_view(&self.world),
                &query::bomb_view(&self.world),
                &maze,
                &mut commands,
            );
        }
        // Consequences of system commands reach the systems on the next tick.
        let mut produced = Vec::new();
        self.apply_all(commands.drain(..), &mut produced);

        // Waves count active monsters after the director's summons landed.
        self.waves.handle(
            &events,
            &query::player_view(&self.world),
            &query::monster_view(&self.world),
            query::maze(&self.world).monster_spawns(),
            &mut commands,
        );
        self.apply_all(commands.drain(..), &mut produced);
        world::apply(
            &mut self.world,
            Command::EvaluateObjectives {
                pending_spawns: self.waves.pending(),
            },
            &mut produced,
        );

        let new_explosions: Vec<Explosion> = events[inherited..]
            .iter()
            .chain(produced.iter())
            .filter_map(|event| match event {
                Event::ExplosionResolved { explosion } => Some(explosion.clone()),
                _ => None,
            })
            .collect();
        self.carried = produced;

        let objective = self.objective();
        let delta = self
            .tracker
            .observe(&self.world, objective, new_explosions, acks);

        let ended = match (check_invariants(&self.world), query::outcome(&self.world)) {
            (Err(violation), _) => {
                error!(
                    session = self.seed,
                    tick = delta.tick,
                    %violation,
                    snapshot = ?self.full_snapshot(),
                    "world invariant violated; aborting session"
                );
                Some(self.finish(Outcome::Aborted, violation.to_string()))
            }
            (Ok(()), Some(outcome)) => {
                let reason = describe(outcome, &self.world);
                Some(self.finish(outcome, reason))
            }
            (Ok(()), None) => None,
        };

        Some(TickReport { delta, ended })
    }

    /// Turns queued inputs into world commands, acknowledging each one.
    fn drain_inputs(&mut self, events: &mut Vec<Event>) -> Vec<InputAck> {
        let mut acks = Vec::with_capacity(self.inputs.len());
        while let Some((player, input)) = self.inputs.pop_front() {
            let active = query::player_view(&self.world)
                .get(player)
                .is_some_and(|snapshot| {
                    snapshot.alive && snapshot.connected && !snapshot.respawning
                });
            let outcome = if !active {
                InputOutcome::Rejected {
                    reason: PlacementRejection::PlayerUnavailable,
                }
            } else {
                match input.kind {
                    InputKind::Move { direction } => {
                        world::apply(
                            &mut self.world,
                            Command::SetPlayerIntent {
                                player,
                                direction: Some(direction),
                            },
                            events,
                        );
                        InputOutcome::Applied
                    }
                    InputKind::Stop => {
                        world::apply(
                            &mut self.world,
                            Command::SetPlayerIntent {
                                player,
                                direction: None,
                            },
                            events,
                        );
                        InputOutcome::Applied
                    }
                    InputKind::PlaceBomb => self.place_bomb(player, events),
                }
            };
            acks.push(InputAck {
                player,
                sequence: input.sequence,
                outcome,
            });
        }
        acks
    }

    fn place_bomb(&mut self, player: PlayerId, events: &mut Vec<Event>) -> InputOutcome {
        let start = events.len();
        world::apply(&mut self.world, Command::PlaceBomb { player }, events);
        let rejection = events[start..].iter().find_map(|event| match event {
            Event::BombPlacementRejected {
                owner: BombOwner::Player(owner),
                reason,
            } if *owner == player => Some(*reason),
            _ => None,
        });
        match rejection {
            Some(reason) => InputOutcome::Rejected { reason },
            None => InputOutcome::Applied,
        }
    }

    fn apply_all(&mut self, commands: impl Iterator<Item = Command>, events: &mut Vec<Event>) {
        for command in commands {
            world::apply(&mut self.world, command, events);
        }
    }

    fn finish(&mut self, outcome: Outcome, reason: String) -> SessionEnd {
        self.ended = Some(outcome);
        self.inputs.clear();
        let tick = query::tick_index(&self.world);
        let statistics = GameStatistics {
            duration_ms: u64::try_from(query::clock(&self.world).as_millis()).unwrap_or(u64::MAX),
            ticks: tick,
            outcome,
            players: query::statistics(&self.world),
        };
        if outcome == Outcome::Aborted {
            warn!(session = self.seed, tick, %reason, "session aborted");
        } else {
            info!(session = self.seed, tick, ?outcome, "session ended");
        }
        SessionEnd {
            tick,
            outcome,
            reason,
            statistics,
        }
    }
}

fn describe(outcome: Outcome, world: &World) -> String {
    let out_of_time = query::settings(world)
        .time_limit()
        .is_some_and(|limit| query::clock(world) >= limit);
    match outcome {
        Outcome::Victory => "a player reached an active gate".to_owned(),
        Outcome::Defeat if out_of_time => "time limit reached".to_owned(),
        Outcome::Defeat => "every player was eliminated".to_owned(),
        Outcome::Aborted => "session aborted".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_maze_core::{Direction, TilePos};
    use blast_maze_world::fault_injection;

    fn roster(count: u32) -> Vec<RoomPlayer> {
        (1..=count)
            .map(|id| RoomPlayer {
                id: PlayerId::new(id),
                name: format!("player-{id}"),
            })
            .collect()
    }

    fn input(sequence: u64, kind: InputKind) -> PlayerInput {
        PlayerInput {
            sequence,
            kind,
            timestamp_ms: sequence * 16,
        }
    }

    #[test]
    fn roster_problems_are_reported() {
        assert_eq!(
            Session::start(GameSettings::default(), &[]).err(),
            Some(StartError::EmptyRoster)
        );

        let mut doubled = roster(2);
        doubled[1].id = PlayerId::new(1);
        assert_eq!(
            Session::start(GameSettings::default(), &doubled).err(),
            Some(StartError::DuplicatePlayer(PlayerId::new(1)))
        );

        let mut settings = GameSettings::default();
        settings.max_players = 2;
        assert_eq!(
            Session::start(settings, &roster(3)).err(),
            Some(StartError::RosterTooLarge {
                players: 3,
                limit: 2,
            })
        );
    }

    #[test]
    fn invalid_settings_fail_to_start() {
        let mut settings = GameSettings::default();
        settings.sync.tick_rate_hz = 0;
        assert!(matches!(
            Session::start(settings, &roster(1)),
            Err(StartError::Settings(_))
        ));
    }

    #[test]
    fn inputs_are_acknowledged_once() {
        let mut session = Session::start(GameSettings::default(), &roster(1)).expect("start");
        let player = PlayerId::new(1);
        let east = input(
            1,
            InputKind::Move {
                direction: Direction::East,
            },
        );

        assert_eq!(session.enqueue(player, east), InputDisposition::Queued);
        assert_eq!(session.enqueue(player, east), InputDisposition::Duplicate);
        assert_eq!(
            session.enqueue(PlayerId::new(9), input(1, InputKind::Stop)),
            InputDisposition::UnknownPlayer
        );

        let report = session.tick().expect("running");
        assert_eq!(
            report.delta.acks,
            vec![InputAck {
                player,
                sequence: 1,
                outcome: InputOutcome::Applied,
            }]
        );
        let report = session.tick().expect("running");
        assert!(report.delta.acks.is_empty());
    }

    #[test]
    fn stacked_bombs_abort_the_session_once() {
        let mut session = Session::start(GameSettings::default(), &roster(1)).expect("start");
        let spawn = query::maze(session.world()).spawn_points()[0];
        let _ = fault_injection::stack_bomb(&mut session.world, PlayerId::new(1), spawn);
        let _ = fault_injection::stack_bomb(&mut session.world, PlayerId::new(1), spawn);

        let report = session.tick().expect("running");
        let end = report.ended.expect("violation ends the session");
        assert_eq!(end.outcome, Outcome::Aborted);
        assert_eq!(end.statistics.outcome, Outcome::Aborted);
        assert!(matches!(
            end.message(),
            ServerMessage::SessionEnded {
                outcome: Outcome::Aborted,
                ..
            }
        ));

        assert_eq!(session.outcome(), Some(Outcome::Aborted));
        assert!(session.tick().is_none());
        assert!(session.abort("again").is_none());
        assert_eq!(
            session.enqueue(PlayerId::new(1), input(5, InputKind::PlaceBomb)),
            InputDisposition::SessionEnded
        );
    }

    #[test]
    fn snapshot_hides_covered_gates() {
        let mut settings = GameSettings::default();
        settings.maze.gate_count = 2;
        let session = Session::start(settings, &roster(1)).expect("start");
        let snapshot = session.full_snapshot();

        assert!(snapshot.gates.is_empty());
        assert!(snapshot
            .tiles
            .iter()
            .all(|tile| *tile != blast_maze_core::Tile::Gate { revealed: false }));
        assert_eq!(snapshot.tick, 0);
        assert_eq!(snapshot.players.len(), 1);
        assert!(snapshot.players[0].position.tile() == Some(TilePos::new(1, 1)));
    }
}
