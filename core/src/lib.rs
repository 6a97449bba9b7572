#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Blast Maze simulation.
//!
//! This crate defines the message surface that connects the session loop,
//! the authoritative world, and pure systems. The session submits [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views, and respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod bestiary;
mod protocol;
mod seed;
mod settings;

pub use bestiary::{BossAttack, BossAttackKind, BossPhase, MonsterKind, MonsterProfile};
pub use protocol::{
    FullSnapshot, GameStatistics, InputAck, InputKind, InputOutcome, ObjectiveState,
    ObjectiveStatus, Outcome, PlayerInput, PlayerStatistics, RoomPlayer, ServerMessage,
    StateDelta, TileChange,
};
pub use seed::derive_stream_seed;
pub use settings::{
    BombTuning, Difficulty, GameSettings, MazeSettings, MazeTheme, MonsterTuning,
    PlayerTuning, PowerUpTuning, PowerUpWeights, SettingsError, SyncTuning, TimedWave,
    WaveMember, WaveTuning, MAX_PLAYERS,
};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }
    };
}

identifier!(
    /// Unique identifier assigned to a player by the room layer.
    PlayerId
);
identifier!(
    /// Unique identifier allocated to a bomb by the world.
    BombId
);
identifier!(
    /// Unique identifier allocated to a monster or boss by the world.
    MonsterId
);
identifier!(
    /// Unique identifier allocated to a gate when the maze is loaded.
    GateId
);
identifier!(
    /// Unique identifier allocated to a power-up by the world.
    PowerUpId
);

/// Cardinal movement directions available to every entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All directions in the canonical evaluation order used by every system.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Column and row offsets of a single step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Reports whether the direction travels along the column axis.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::East | Self::West)
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }
}

/// Location of a single maze tile expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    column: u32,
    row: u32,
}

impl TilePos {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two tile coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: TilePos) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Tile adjacent in the provided direction, if it does not underflow.
    ///
    /// Upper bounds are not checked; callers consult the maze dimensions.
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<TilePos> {
        self.offset(direction, 1)
    }

    /// Tile located `distance` steps away in the provided direction.
    #[must_use]
    pub fn offset(self, direction: Direction, distance: u32) -> Option<TilePos> {
        let distance = i64::from(distance);
        let (dx, dy) = direction.delta();
        let column = i64::from(self.column) + i64::from(dx) * distance;
        let row = i64::from(self.row) + i64::from(dy) * distance;
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        Some(TilePos::new(column, row))
    }

    /// Continuous position of the tile's center.
    #[must_use]
    pub fn center(self) -> Position {
        Position::new(self.column as f32 + 0.5, self.row as f32 + 0.5)
    }

    /// Direction of a single cardinal step from `self` to `other`, if adjacent.
    #[must_use]
    pub fn direction_to(self, other: TilePos) -> Option<Direction> {
        let column_diff = self.column.abs_diff(other.column);
        let row_diff = self.row.abs_diff(other.row);
        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if other.column > self.column {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if other.row > self.row {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

/// Continuous position measured in tile units.
///
/// Tile `(c, r)` spans `[c, c + 1) x [r, r + 1)`, so an entity centered on a
/// tile sits at `(c + 0.5, r + 0.5)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    x: f32,
    y: f32,
}

impl Position {
    /// Creates a new continuous position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate in tile units.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical coordinate in tile units.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Tile containing the position, or `None` when it lies left of or above the grid.
    #[must_use]
    pub fn tile(self) -> Option<TilePos> {
        if self.x < 0.0 || self.y < 0.0 || !self.x.is_finite() || !self.y.is_finite() {
            return None;
        }
        Some(TilePos::new(self.x.floor() as u32, self.y.floor() as u32))
    }

    /// Position translated by `distance` tile units in the provided direction.
    #[must_use]
    pub fn offset(self, direction: Direction, distance: f32) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx as f32 * distance, self.y + dy as f32 * distance)
    }

    /// Euclidean distance to another position in tile units.
    #[must_use]
    pub fn distance_to(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Contents of a single maze tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    /// Open floor.
    Empty,
    /// Indestructible wall that halts movement and blasts.
    SolidWall,
    /// Wall that a blast destroys.
    DestructibleWall,
    /// Gate objective tile.
    ///
    /// An unrevealed gate is still covered by a destructible wall and behaves
    /// exactly like one until a blast uncovers it.
    Gate {
        /// Whether the covering wall has been destroyed.
        revealed: bool,
    },
}

impl Tile {
    /// Reports whether a blast destroys the tile.
    #[must_use]
    pub const fn is_destructible(self) -> bool {
        matches!(self, Self::DestructibleWall | Self::Gate { revealed: false })
    }

    /// Reports whether the tile is an indestructible wall.
    #[must_use]
    pub const fn is_solid(self) -> bool {
        matches!(self, Self::SolidWall)
    }

    /// Reports whether the tile blocks an entity with the provided flags.
    ///
    /// Bombs are tracked by the entity registry and are not part of the tile.
    #[must_use]
    pub const fn blocks(self, passability: Passability) -> bool {
        match self {
            Self::SolidWall => true,
            Self::DestructibleWall | Self::Gate { revealed: false } => !passability.wall_pass,
            Self::Empty | Self::Gate { revealed: true } => false,
        }
    }
}

/// Per-entity flags that relax movement rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Passability {
    /// Entity walks through destructible walls.
    pub wall_pass: bool,
    /// Entity walks through armed bombs.
    pub bomb_pass: bool,
}

impl Passability {
    /// Flags for an entity without any passability abilities.
    pub const NONE: Passability = Passability {
        wall_pass: false,
        bomb_pass: false,
    };
}

/// Entity responsible for placing a bomb.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BombOwner {
    /// Bomb placed by a player.
    Player(PlayerId),
    /// Bomb dropped by a boss attack.
    Boss(MonsterId),
}

/// Lifecycle stage of a bomb.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BombStatus {
    /// Fuse is counting down.
    Armed,
    /// Fuse expired or a chain reaction triggered the bomb during this tick.
    Exploding,
    /// Explosion fully resolved; the bomb is removed on the next tick.
    Spent,
}

/// Lifecycle stage of a gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateStatus {
    /// Gate is still covered by a destructible wall.
    Hidden,
    /// Covering wall destroyed; the gate is visible but not yet usable.
    Revealed,
    /// A blast hit the uncovered gate, releasing a wave of monsters.
    Destroyed,
    /// Gate is open and a player standing on it wins the session.
    Active,
}

/// Role a gate plays in the session objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GateKind {
    /// Main exit guarded by the full gate wave.
    Primary,
    /// Side exit guarded by a smaller wave.
    Secondary,
    /// Exit that opens as soon as it is revealed and releases no wave.
    Emergency,
}

/// Effects granted by collecting a power-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Raises the number of bombs the player may have armed at once.
    ExtraBomb,
    /// Extends the blast radius of the player's bombs.
    BlastRadius,
    /// Raises the player's movement speed multiplier.
    Speed,
    /// Lets the player walk through destructible walls.
    WallPass,
    /// Lets the player walk through armed bombs.
    BombPass,
    /// Lets the player kick bombs by walking into them.
    BombKick,
    /// Lets the player's blasts pierce one extra destructible wall.
    Pierce,
    /// Opens a fresh immunity window.
    Shield,
    /// Restores health up to the maximum.
    Heal,
}

impl PowerUpKind {
    /// Every power-up kind in canonical order.
    pub const ALL: [PowerUpKind; 9] = [
        PowerUpKind::ExtraBomb,
        PowerUpKind::BlastRadius,
        PowerUpKind::Speed,
        PowerUpKind::WallPass,
        PowerUpKind::BombPass,
        PowerUpKind::BombKick,
        PowerUpKind::Pierce,
        PowerUpKind::Shield,
        PowerUpKind::Heal,
    ];
}

/// Goal driving a monster's behaviour for the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiGoal {
    /// Chase the selected target player.
    Hunt,
    /// Return to and guard the monster's anchor tile.
    Defend,
    /// Wander between random waypoints.
    Patrol,
}

/// Player ability set, mutated by power-ups.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Abilities {
    /// Maximum number of armed bombs the player may own at once.
    pub max_bombs: u32,
    /// Blast radius of bombs placed by the player.
    pub blast_radius: u32,
    /// Multiplier applied to the configured base movement speed.
    pub speed_multiplier: f32,
    /// Destructible walls the player's blasts pierce before halting.
    pub penetration: u32,
    /// Player walks through destructible walls.
    pub wall_pass: bool,
    /// Player walks through armed bombs.
    pub bomb_pass: bool,
    /// Player kicks bombs by walking into them.
    pub bomb_kick: bool,
    /// Length of the immunity window opened after taking damage.
    pub immunity_window: Duration,
}

impl Abilities {
    /// Passability flags derived from the ability set.
    #[must_use]
    pub const fn passability(&self) -> Passability {
        Passability {
            wall_pass: self.wall_pass,
            bomb_pass: self.bomb_pass,
        }
    }
}

/// Source of damage applied to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageSource {
    /// Blast from a bomb with the provided owner.
    Explosion(BombOwner),
    /// Contact or attack from a monster or boss.
    Monster(MonsterId),
}

/// Reasons a bomb placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementRejection {
    /// The owner already has the maximum number of armed bombs.
    CapacityExceeded,
    /// Another bomb already occupies the tile.
    TileOccupied,
    /// The player is unknown, dead, or disconnected.
    PlayerUnavailable,
    /// The requested tile lies outside the maze.
    OutOfBounds,
    /// The requested tile lies inside the maze but is not open floor.
    TileBlocked,
}

/// Reasons a monster spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnRejection {
    /// The session already holds the configured maximum of active monsters.
    CapacityReached,
    /// The requested tile is not walkable for the monster.
    Blocked,
}

/// Ephemeral projection of one resolved explosion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explosion {
    /// Bomb whose blast produced the explosion.
    pub bomb: BombId,
    /// Owner of the exploding bomb.
    pub owner: BombOwner,
    /// Tile at the center of the blast.
    pub center: TilePos,
    /// Tiles affected by the blast, center first, then in cast order.
    pub tiles: Vec<TilePos>,
    /// Damage applied to entities standing on affected tiles.
    pub damage: u32,
    /// How long clients should render the blast.
    pub visual_duration: Duration,
    /// Position in the chain: zero for fuse expiry, `n` for the n-th chained hop.
    pub chain_depth: u32,
}

/// Seeded maze layout produced by the generator and loaded into the world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeLayout {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Row-major tile contents.
    pub tiles: Vec<Tile>,
    /// Player spawn points in assignment order.
    pub spawn_points: Vec<TilePos>,
    /// Gates hidden behind destructible walls.
    pub gates: Vec<GatePlacement>,
    /// Tiles suitable for scripted power-up spawns.
    pub power_up_spots: Vec<TilePos>,
    /// Open tiles far from every player spawn used for timed monster waves.
    pub monster_spawns: Vec<TilePos>,
    /// Seed of the attempt that produced the layout.
    pub seed: u64,
    /// Number of attempts consumed before the layout satisfied every constraint.
    pub attempts: u32,
}

impl MazeLayout {
    /// Tile stored at the provided coordinate, if it lies within the layout.
    #[must_use]
    pub fn tile(&self, position: TilePos) -> Option<Tile> {
        MazeView::new(&self.tiles, self.columns, self.rows).tile(position)
    }
}

/// Gate placement recorded in a maze layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GatePlacement {
    /// Tile hiding the gate.
    pub tile: TilePos,
    /// Role of the gate.
    pub kind: GateKind,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the maze and clears every entity.
    LoadMaze {
        /// Layout to install.
        layout: MazeLayout,
    },
    /// Adds a player at the next free spawn point.
    AddPlayer {
        /// Identifier assigned by the room layer.
        player: PlayerId,
        /// Display name of the player.
        name: String,
    },
    /// Removes a player that left the session.
    RemovePlayer {
        /// Player leaving the session.
        player: PlayerId,
    },
    /// Marks a player as connected or disconnected.
    SetPlayerConnected {
        /// Player whose connection changed.
        player: PlayerId,
        /// New connection state.
        connected: bool,
    },
    /// Updates the direction a player wants to move in, or stops them.
    SetPlayerIntent {
        /// Player issuing the intent.
        player: PlayerId,
        /// Requested direction; `None` stops the player.
        direction: Option<Direction>,
    },
    /// Requests that a player place a bomb on the tile they occupy.
    PlaceBomb {
        /// Player placing the bomb.
        player: PlayerId,
    },
    /// Requests that a boss drop a bomb on a specific tile.
    PlaceBossBomb {
        /// Boss performing the attack.
        boss: MonsterId,
        /// Tile receiving the bomb.
        tile: TilePos,
    },
    /// Moves a player to a validated position.
    RelocatePlayer {
        /// Player being moved.
        player: PlayerId,
        /// Position resolved by the collision validator.
        position: Position,
        /// Direction the player faces after the move.
        facing: Direction,
    },
    /// Moves a monster to a validated position.
    RelocateMonster {
        /// Monster being moved.
        monster: MonsterId,
        /// Position resolved by the collision validator.
        position: Position,
        /// Direction the monster faces after the move.
        facing: Direction,
    },
    /// Slides a bomb away from the kicking player until it hits an obstacle.
    KickBomb {
        /// Bomb being kicked.
        bomb: BombId,
        /// Direction of the kick.
        direction: Direction,
    },
    /// Advances fuses, countdowns, and explosions by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Updates the direction a monster wants to move in.
    SetMonsterIntent {
        /// Monster being steered.
        monster: MonsterId,
        /// Requested direction; `None` halts the monster.
        direction: Option<Direction>,
    },
    /// Requests a new monster at the provided tile.
    SpawnMonster {
        /// Kind of monster to create.
        kind: MonsterKind,
        /// Tile where the monster appears.
        tile: TilePos,
    },
    /// Applies damage to a player from a non-explosion source.
    DamagePlayer {
        /// Player receiving the damage.
        player: PlayerId,
        /// Amount of health removed.
        amount: u32,
        /// Origin of the damage.
        source: DamageSource,
    },
    /// Moves a boss into the provided phase if it is the next one.
    AdvanceBossPhase {
        /// Boss changing phase.
        boss: MonsterId,
        /// Phase index the boss should enter.
        to_phase: u32,
    },
    /// Spawns a power-up explicitly, bypassing the drop roll.
    SpawnPowerUp {
        /// Kind of power-up to create.
        kind: PowerUpKind,
        /// Tile receiving the power-up.
        tile: TilePos,
    },
    /// Updates gate activation and evaluates victory and defeat conditions.
    EvaluateObjectives {
        /// Wave members still waiting to spawn.
        pending_spawns: u32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a maze layout was installed.
    MazeLoaded {
        /// Number of tile columns.
        columns: u32,
        /// Number of tile rows.
        rows: u32,
    },
    /// Confirms that a player joined at a spawn point.
    PlayerJoined {
        /// Player that joined.
        player: PlayerId,
        /// Spawn tile assigned to the player.
        spawn: TilePos,
    },
    /// Reports that a player could not join because the spawn points are exhausted.
    PlayerJoinRejected {
        /// Player that attempted to join.
        player: PlayerId,
    },
    /// Confirms that a player left the session.
    PlayerLeft {
        /// Player that left.
        player: PlayerId,
    },
    /// Announces a change in a player's connection state.
    PlayerConnectionChanged {
        /// Player whose connection changed.
        player: PlayerId,
        /// New connection state.
        connected: bool,
    },
    /// Confirms that a bomb was armed.
    BombPlaced {
        /// Identifier allocated to the bomb.
        bomb: BombId,
        /// Entity that placed the bomb.
        owner: BombOwner,
        /// Tile holding the bomb.
        tile: TilePos,
    },
    /// Reports that a bomb placement request was rejected.
    BombPlacementRejected {
        /// Entity that requested the placement.
        owner: BombOwner,
        /// Specific reason the placement failed.
        reason: PlacementRejection,
    },
    /// Confirms that a kicked bomb slid to a new tile.
    BombKicked {
        /// Bomb that moved.
        bomb: BombId,
        /// Tile the bomb left.
        from: TilePos,
        /// Tile the bomb stopped on.
        to: TilePos,
    },
    /// Announces a fully resolved explosion.
    ExplosionResolved {
        /// Projection of the resolved explosion.
        explosion: Explosion,
    },
    /// Reports that chained detonations were deferred to the next tick.
    ChainDepthExceeded {
        /// Configured maximum depth that was reached.
        max_depth: u32,
        /// Bombs left armed with an expired fuse.
        deferred: Vec<BombId>,
    },
    /// Confirms that a blast destroyed a wall.
    WallDestroyed {
        /// Tile that held the wall.
        tile: TilePos,
        /// Contents of the tile after destruction.
        now: Tile,
    },
    /// Announces that a hidden gate was uncovered.
    GateRevealed {
        /// Gate that became visible.
        gate: GateId,
        /// Tile holding the gate.
        tile: TilePos,
    },
    /// Announces that a blast destroyed an uncovered gate.
    GateDestroyed {
        /// Gate that was hit.
        gate: GateId,
        /// Role of the gate.
        kind: GateKind,
        /// Tile holding the gate.
        tile: TilePos,
    },
    /// Announces that a gate opened as an exit.
    GateActivated {
        /// Gate that became active.
        gate: GateId,
    },
    /// Confirms that a power-up appeared.
    PowerUpSpawned {
        /// Identifier allocated to the power-up.
        power_up: PowerUpId,
        /// Kind of power-up.
        kind: PowerUpKind,
        /// Tile holding the power-up.
        tile: TilePos,
    },
    /// Confirms that a player collected a power-up.
    PowerUpCollected {
        /// Power-up that was collected.
        power_up: PowerUpId,
        /// Player that collected it.
        player: PlayerId,
        /// Kind of power-up.
        kind: PowerUpKind,
    },
    /// Reports that a power-up vanished without being collected.
    PowerUpRemoved {
        /// Power-up that vanished.
        power_up: PowerUpId,
    },
    /// Confirms that a player took damage.
    PlayerDamaged {
        /// Player that was hit.
        player: PlayerId,
        /// Health removed.
        amount: u32,
        /// Health remaining.
        health: u32,
        /// Origin of the damage.
        source: DamageSource,
    },
    /// Announces that a player's health reached zero.
    PlayerDied {
        /// Player that died.
        player: PlayerId,
        /// Origin of the killing blow.
        source: DamageSource,
    },
    /// Announces that a dead player returned at their spawn point.
    PlayerRespawned {
        /// Player that respawned.
        player: PlayerId,
        /// Tile the player respawned on.
        spawn: TilePos,
    },
    /// Announces that a player has no lives left.
    PlayerEliminated {
        /// Player that is out of the session.
        player: PlayerId,
    },
    /// Confirms that a monster entered the maze.
    MonsterSpawned {
        /// Identifier allocated to the monster.
        monster: MonsterId,
        /// Kind of monster.
        kind: MonsterKind,
        /// Tile where the monster appeared.
        tile: TilePos,
    },
    /// Reports that a monster spawn request was rejected.
    MonsterSpawnRejected {
        /// Kind of monster requested.
        kind: MonsterKind,
        /// Tile requested for the spawn.
        tile: TilePos,
        /// Specific reason the spawn failed.
        reason: SpawnRejection,
    },
    /// Confirms that a monster took damage.
    MonsterDamaged {
        /// Monster that was hit.
        monster: MonsterId,
        /// Health removed.
        amount: u32,
        /// Health remaining.
        health: u32,
    },
    /// Announces that a monster died.
    MonsterKilled {
        /// Monster that died.
        monster: MonsterId,
        /// Kind of the monster.
        kind: MonsterKind,
        /// Player credited with the kill, if any.
        credited: Option<PlayerId>,
    },
    /// Announces that a boss entered a new phase.
    BossPhaseAdvanced {
        /// Boss that changed phase.
        boss: MonsterId,
        /// Index of the newly active phase.
        phase: u32,
    },
    /// Announces that the session reached a terminal objective state.
    ObjectiveReached {
        /// Outcome of the session.
        outcome: Outcome,
    },
}

/// Immutable representation of a single player's state used for queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Unique identifier of the player.
    pub id: PlayerId,
    /// Display name of the player.
    pub name: String,
    /// Continuous position of the player's center.
    pub position: Position,
    /// Direction the player faces.
    pub facing: Direction,
    /// Direction the player is currently trying to move in.
    pub moving: Option<Direction>,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Whether the player is alive.
    pub alive: bool,
    /// Whether the player's connection is live.
    pub connected: bool,
    /// Respawns remaining after the current life.
    pub lives: u32,
    /// Whether the player is inside an immunity window.
    pub immune: bool,
    /// Whether the player is dead and waiting to respawn.
    pub respawning: bool,
    /// Ability set granted by power-ups.
    pub abilities: Abilities,
    /// Number of power-ups collected per kind.
    pub inventory: std::collections::BTreeMap<PowerUpKind, u32>,
}

/// Immutable representation of a single bomb's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BombSnapshot {
    /// Unique identifier of the bomb.
    pub id: BombId,
    /// Entity that placed the bomb.
    pub owner: BombOwner,
    /// Tile holding the bomb.
    pub tile: TilePos,
    /// Blast radius in tiles.
    pub blast_radius: u32,
    /// Destructible walls the blast pierces.
    pub penetration: u32,
    /// Lifecycle stage of the bomb.
    pub status: BombStatus,
}

/// Immutable representation of a single monster's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonsterSnapshot {
    /// Unique identifier of the monster.
    pub id: MonsterId,
    /// Kind of monster.
    pub kind: MonsterKind,
    /// Continuous position of the monster's center.
    pub position: Position,
    /// Direction the monster faces.
    pub facing: Direction,
    /// Direction the monster is currently trying to move in.
    pub moving: Option<Direction>,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Tile the monster defends.
    pub anchor: TilePos,
    /// Active phase index for bosses.
    pub boss_phase: Option<u32>,
}

impl MonsterSnapshot {
    /// Remaining health as a fraction of the maximum.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_health == 0 {
            return 0.0;
        }
        self.health as f32 / self.max_health as f32
    }
}

/// Immutable representation of a gate used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSnapshot {
    /// Unique identifier of the gate.
    pub id: GateId,
    /// Tile holding the gate.
    pub tile: TilePos,
    /// Role of the gate.
    pub kind: GateKind,
    /// Lifecycle stage of the gate.
    pub status: GateStatus,
}

/// Immutable representation of a power-up used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUpSnapshot {
    /// Unique identifier of the power-up.
    pub id: PowerUpId,
    /// Kind of power-up.
    pub kind: PowerUpKind,
    /// Tile holding the power-up.
    pub tile: TilePos,
}

/// Read-only snapshot describing all players in deterministic order.
#[derive(Clone, Debug, Default)]
pub struct PlayerView {
    snapshots: Vec<PlayerSnapshot>,
}

impl PlayerView {
    /// Creates a new player view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<PlayerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured player snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the provided player, if present.
    #[must_use]
    pub fn get(&self, player: PlayerId) -> Option<&PlayerSnapshot> {
        self.snapshots
            .binary_search_by_key(&player, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<PlayerSnapshot> {
        self.snapshots
    }
}

/// Read-only snapshot describing all monsters in deterministic order.
#[derive(Clone, Debug, Default)]
pub struct MonsterView {
    snapshots: Vec<MonsterSnapshot>,
}

impl MonsterView {
    /// Creates a new monster view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<MonsterSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured monster snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &MonsterSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the provided monster, if present.
    #[must_use]
    pub fn get(&self, monster: MonsterId) -> Option<&MonsterSnapshot> {
        self.snapshots
            .binary_search_by_key(&monster, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of monsters captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<MonsterSnapshot> {
        self.snapshots
    }
}

/// Read-only snapshot describing all bombs in deterministic order.
#[derive(Clone, Debug, Default)]
pub struct BombView {
    snapshots: Vec<BombSnapshot>,
}

impl BombView {
    /// Creates a new bomb view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<BombSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured bomb snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &BombSnapshot> {
        self.snapshots.iter()
    }

    /// Armed bomb resting on the provided tile, if any.
    #[must_use]
    pub fn armed_at(&self, tile: TilePos) -> Option<&BombSnapshot> {
        self.snapshots
            .iter()
            .find(|bomb| bomb.tile == tile && bomb.status == BombStatus::Armed)
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<BombSnapshot> {
        self.snapshots
    }
}

/// Read-only view into the dense tile grid.
#[derive(Clone, Copy, Debug)]
pub struct MazeView<'a> {
    tiles: &'a [Tile],
    columns: u32,
    rows: u32,
}

impl<'a> MazeView<'a> {
    /// Captures a new maze view backed by the provided row-major tiles.
    #[must_use]
    pub fn new(tiles: &'a [Tile], columns: u32, rows: u32) -> Self {
        Self {
            tiles,
            columns,
            rows,
        }
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Reports whether the tile lies inside the grid.
    #[must_use]
    pub const fn contains(&self, tile: TilePos) -> bool {
        tile.column() < self.columns && tile.row() < self.rows
    }

    /// Tile stored at the provided coordinate, if it lies within the grid.
    #[must_use]
    pub fn tile(&self, tile: TilePos) -> Option<Tile> {
        self.index(tile)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Reports whether an entity with the provided flags may stand on the tile.
    ///
    /// Tiles outside the grid are never walkable.
    #[must_use]
    pub fn is_walkable(&self, tile: TilePos, passability: Passability) -> bool {
        self.tile(tile)
            .map_or(false, |contents| !contents.blocks(passability))
    }

    /// Walkable cardinal neighbours of a tile in canonical direction order.
    pub fn walkable_neighbors(
        &self,
        tile: TilePos,
        passability: Passability,
    ) -> impl Iterator<Item = (Direction, TilePos)> + 'a {
        let view = *self;
        Direction::ALL.into_iter().filter_map(move |direction| {
            let next = tile.neighbor(direction)?;
            view.is_walkable(next, passability)
                .then_some((direction, next))
        })
    }

    fn index(&self, tile: TilePos) -> Option<usize> {
        if !self.contains(tile) {
            return None;
        }
        let row = usize::try_from(tile.row()).ok()?;
        let column = usize::try_from(tile.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}
