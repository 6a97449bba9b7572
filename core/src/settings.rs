//! Session configuration handed over by the room layer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MonsterKind, PowerUpKind};

/// Hard upper bound on players per session.
pub const MAX_PLAYERS: u32 = 8;

/// Complete configuration of one game session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Maze shape and generation parameters.
    pub maze: MazeSettings,
    /// Difficulty scaling applied to monsters and waves.
    pub difficulty: Difficulty,
    /// Maximum number of players admitted to the session.
    pub max_players: u32,
    /// Bomb fuse and explosion tuning.
    pub bombs: BombTuning,
    /// Player health, speed, and starting abilities.
    pub players: PlayerTuning,
    /// Power-up drop tuning.
    pub power_ups: PowerUpTuning,
    /// Monster cap and AI cadence.
    pub monsters: MonsterTuning,
    /// Wave composition and spacing.
    pub waves: WaveTuning,
    /// Tick rate and client outbox bounds.
    pub sync: SyncTuning,
    /// Optional session time limit in milliseconds; reaching it is a defeat.
    pub time_limit_ms: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            maze: MazeSettings::default(),
            difficulty: Difficulty::Normal,
            max_players: 4,
            bombs: BombTuning::default(),
            players: PlayerTuning::default(),
            power_ups: PowerUpTuning::default(),
            monsters: MonsterTuning::default(),
            waves: WaveTuning::default(),
            sync: SyncTuning::default(),
            time_limit_ms: None,
        }
    }
}

impl GameSettings {
    /// Session time limit, if configured.
    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    /// Checks the settings for values the simulation cannot honour.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.maze.columns < MIN_MAZE_SIDE || self.maze.rows < MIN_MAZE_SIDE {
            return Err(SettingsError::MazeTooSmall {
                columns: self.maze.columns,
                rows: self.maze.rows,
            });
        }
        if self.max_players == 0 || self.max_players > MAX_PLAYERS {
            return Err(SettingsError::PlayerCount(self.max_players));
        }
        if let Some(density) = self.maze.wall_density {
            if !(0.0..=1.0).contains(&density) {
                return Err(SettingsError::Probability {
                    field: "maze.wall_density",
                    value: density,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.power_ups.chance) {
            return Err(SettingsError::Probability {
                field: "power_ups.chance",
                value: self.power_ups.chance,
            });
        }
        if self.power_ups.chance > 0.0 && self.power_ups.weights.total() == 0 {
            return Err(SettingsError::EmptyPowerUpWeights);
        }
        if self.bombs.fuse_ms == 0 {
            return Err(SettingsError::ZeroFuse);
        }
        if !(self.players.footprint > 0.0 && self.players.footprint < 0.5)
            || !(self.monsters.footprint > 0.0 && self.monsters.footprint < 0.5)
        {
            return Err(SettingsError::Footprint);
        }
        if self.players.base_speed <= 0.0 {
            return Err(SettingsError::Speed(self.players.base_speed));
        }
        if self.sync.tick_rate_hz == 0 || self.sync.tick_rate_hz > MAX_TICK_RATE_HZ {
            return Err(SettingsError::TickRate(self.sync.tick_rate_hz));
        }
        if self.sync.outbox_capacity == 0 {
            return Err(SettingsError::OutboxCapacity);
        }
        Ok(())
    }
}

const MIN_MAZE_SIDE: u32 = 7;
const MAX_TICK_RATE_HZ: u32 = 240;

/// Reasons a settings document is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SettingsError {
    /// The maze is smaller than the minimum playable size.
    #[error("maze {columns}x{rows} is smaller than the minimum of {MIN_MAZE_SIDE}x{MIN_MAZE_SIDE}")]
    MazeTooSmall {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// The player cap lies outside `1..=MAX_PLAYERS`.
    #[error("max_players must be between 1 and {MAX_PLAYERS}, got {0}")]
    PlayerCount(u32),
    /// A probability field lies outside `[0, 1]`.
    #[error("{field} must lie within [0, 1], got {value}")]
    Probability {
        /// Name of the offending field.
        field: &'static str,
        /// Offending value.
        value: f32,
    },
    /// Power-ups can drop but every weight is zero.
    #[error("power-up weights must not all be zero while drops are enabled")]
    EmptyPowerUpWeights,
    /// The bomb fuse is zero.
    #[error("bomb fuse must be longer than zero")]
    ZeroFuse,
    /// An entity footprint does not fit inside a tile.
    #[error("entity footprints must lie strictly between 0 and 0.5 tiles")]
    Footprint,
    /// The player base speed is not positive.
    #[error("player base speed must be positive, got {0}")]
    Speed(f32),
    /// The tick rate lies outside the supported range.
    #[error("tick rate must be between 1 and {MAX_TICK_RATE_HZ} Hz, got {0}")]
    TickRate(u32),
    /// The client outbox cannot hold a single message.
    #[error("client outbox capacity must be at least one")]
    OutboxCapacity,
}

/// Maze shape and generation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MazeSettings {
    /// Number of tile columns including the solid border.
    pub columns: u32,
    /// Number of tile rows including the solid border.
    pub rows: u32,
    /// Seed that fully determines the generated maze.
    pub seed: u64,
    /// Visual and structural theme.
    pub theme: MazeTheme,
    /// Share of open interior tiles filled with destructible walls; theme default when absent.
    pub wall_density: Option<f32>,
    /// Manhattan radius around each spawn kept clear of destructible walls.
    pub spawn_safety_radius: u32,
    /// Number of gates hidden behind destructible walls.
    pub gate_count: u32,
    /// Number of candidate tiles recorded for scripted power-up spawns.
    pub power_up_spots: u32,
    /// Number of tiles recorded for timed monster waves.
    pub monster_spawns: u32,
}

impl Default for MazeSettings {
    fn default() -> Self {
        Self {
            columns: 15,
            rows: 13,
            seed: 0x5eed_b1a5_7000_0001,
            theme: MazeTheme::Classic,
            wall_density: None,
            spawn_safety_radius: 2,
            gate_count: 1,
            power_up_spots: 4,
            monster_spawns: 4,
        }
    }
}

impl MazeSettings {
    /// Wall density after applying the theme default.
    #[must_use]
    pub fn effective_wall_density(&self) -> f32 {
        self.wall_density
            .unwrap_or_else(|| self.theme.default_wall_density())
    }
}

/// Structural theme of the generated maze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MazeTheme {
    /// Solid pillars on every even interior coordinate.
    Classic,
    /// No pillar grid; scattered solid rock instead.
    Cavern,
    /// Pillar grid with densely packed destructible walls.
    Fortress,
}

impl MazeTheme {
    /// Default destructible wall density for the theme.
    #[must_use]
    pub const fn default_wall_density(self) -> f32 {
        match self {
            Self::Classic => 0.55,
            Self::Cavern => 0.4,
            Self::Fortress => 0.75,
        }
    }

    /// Whether the theme places the regular pillar grid.
    #[must_use]
    pub const fn has_pillars(self) -> bool {
        matches!(self, Self::Classic | Self::Fortress)
    }

    /// Share of open interior tiles turned into solid rock.
    #[must_use]
    pub const fn rock_density(self) -> f32 {
        match self {
            Self::Classic | Self::Fortress => 0.0,
            Self::Cavern => 0.12,
        }
    }
}

/// Difficulty scaling applied to monsters and waves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// Fewer, weaker monsters.
    Easy,
    /// Baseline tuning.
    Normal,
    /// More, tougher monsters.
    Hard,
}

impl Difficulty {
    /// Scales a monster's base health.
    #[must_use]
    pub fn scale_health(self, health: u32) -> u32 {
        let scaled = match self {
            Self::Easy => health.saturating_mul(3) / 4,
            Self::Normal => health,
            Self::Hard => health.saturating_mul(3) / 2,
        };
        scaled.max(1)
    }

    /// Scales the number of members of a wave entry.
    #[must_use]
    pub fn scale_count(self, count: u32) -> u32 {
        if count == 0 {
            return 0;
        }
        match self {
            Self::Easy => count.div_ceil(2),
            Self::Normal => count,
            Self::Hard => count.saturating_add(count.div_ceil(2)),
        }
    }
}

/// Bomb fuse and explosion tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BombTuning {
    /// Fuse length in milliseconds.
    pub fuse_ms: u64,
    /// Damage applied to every entity on an affected tile.
    pub explosion_damage: u32,
    /// Maximum number of chained hops resolved within one tick.
    pub max_chain_depth: u32,
    /// How long clients render an explosion, in milliseconds.
    pub explosion_visual_ms: u64,
}

impl Default for BombTuning {
    fn default() -> Self {
        Self {
            fuse_ms: 2_000,
            explosion_damage: 50,
            max_chain_depth: 8,
            explosion_visual_ms: 500,
        }
    }
}

impl BombTuning {
    /// Fuse length as a duration.
    #[must_use]
    pub const fn fuse(&self) -> Duration {
        Duration::from_millis(self.fuse_ms)
    }

    /// Explosion render duration.
    #[must_use]
    pub const fn explosion_visual(&self) -> Duration {
        Duration::from_millis(self.explosion_visual_ms)
    }
}

/// Player health, speed, and starting abilities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Health at spawn.
    pub max_health: u32,
    /// Respawns granted after the first death.
    pub lives: u32,
    /// Movement speed in tiles per second before multipliers.
    pub base_speed: f32,
    /// Delay before a dead player respawns, in milliseconds.
    pub respawn_delay_ms: u64,
    /// Immunity window opened by damage and respawns, in milliseconds.
    pub immunity_ms: u64,
    /// Half extent of the player's square footprint in tiles.
    pub footprint: f32,
    /// Bombs a fresh player may have armed at once.
    pub max_bombs: u32,
    /// Blast radius of a fresh player's bombs.
    pub blast_radius: u32,
    /// Upper bound for `max_bombs` after power-ups.
    pub max_bombs_cap: u32,
    /// Upper bound for `blast_radius` after power-ups.
    pub blast_radius_cap: u32,
    /// Upper bound for the speed multiplier after power-ups.
    pub speed_multiplier_cap: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: 100,
            lives: 3,
            base_speed: 3.0,
            respawn_delay_ms: 3_000,
            immunity_ms: 1_500,
            footprint: 0.4,
            max_bombs: 1,
            blast_radius: 2,
            max_bombs_cap: 8,
            blast_radius_cap: 8,
            speed_multiplier_cap: 2.0,
        }
    }
}

impl PlayerTuning {
    /// Respawn delay as a duration.
    #[must_use]
    pub const fn respawn_delay(&self) -> Duration {
        Duration::from_millis(self.respawn_delay_ms)
    }

    /// Immunity window as a duration.
    #[must_use]
    pub const fn immunity(&self) -> Duration {
        Duration::from_millis(self.immunity_ms)
    }
}

/// Power-up drop tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpTuning {
    /// Probability that a destroyed wall drops a power-up.
    pub chance: f32,
    /// Relative drop weight per kind.
    pub weights: PowerUpWeights,
    /// Lifetime of an uncollected power-up in milliseconds; `None` keeps it forever.
    pub expiry_ms: Option<u64>,
}

impl Default for PowerUpTuning {
    fn default() -> Self {
        Self {
            chance: 0.3,
            weights: PowerUpWeights::default(),
            expiry_ms: Some(20_000),
        }
    }
}

impl PowerUpTuning {
    /// Lifetime of an uncollected power-up.
    #[must_use]
    pub fn expiry(&self) -> Option<Duration> {
        self.expiry_ms.map(Duration::from_millis)
    }
}

/// Relative drop weight per power-up kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpWeights {
    /// Weight of [`PowerUpKind::ExtraBomb`].
    pub extra_bomb: u32,
    /// Weight of [`PowerUpKind::BlastRadius`].
    pub blast_radius: u32,
    /// Weight of [`PowerUpKind::Speed`].
    pub speed: u32,
    /// Weight of [`PowerUpKind::WallPass`].
    pub wall_pass: u32,
    /// Weight of [`PowerUpKind::BombPass`].
    pub bomb_pass: u32,
    /// Weight of [`PowerUpKind::BombKick`].
    pub bomb_kick: u32,
    /// Weight of [`PowerUpKind::Pierce`].
    pub pierce: u32,
    /// Weight of [`PowerUpKind::Shield`].
    pub shield: u32,
    /// Weight of [`PowerUpKind::Heal`].
    pub heal: u32,
}

impl Default for PowerUpWeights {
    fn default() -> Self {
        Self {
            extra_bomb: 20,
            blast_radius: 20,
            speed: 15,
            wall_pass: 4,
            bomb_pass: 5,
            bomb_kick: 8,
            pierce: 6,
            shield: 10,
            heal: 12,
        }
    }
}

impl PowerUpWeights {
    /// Weight assigned to the provided kind.
    #[must_use]
    pub const fn weight(&self, kind: PowerUpKind) -> u32 {
        match kind {
            PowerUpKind::ExtraBomb => self.extra_bomb,
            PowerUpKind::BlastRadius => self.blast_radius,
            PowerUpKind::Speed => self.speed,
            PowerUpKind::WallPass => self.wall_pass,
            PowerUpKind::BombPass => self.bomb_pass,
            PowerUpKind::BombKick => self.bomb_kick,
            PowerUpKind::Pierce => self.pierce,
            PowerUpKind::Shield => self.shield,
            PowerUpKind::Heal => self.heal,
        }
    }

    /// Sum of every weight.
    #[must_use]
    pub fn total(&self) -> u32 {
        PowerUpKind::ALL
            .iter()
            .map(|kind| self.weight(*kind))
            .fold(0_u32, u32::saturating_add)
    }
}

/// Monster cap and AI cadence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterTuning {
    /// Maximum number of monsters alive at once.
    pub max_active: u32,
    /// Deadline after which a monster recomputes its path, in milliseconds.
    pub repath_interval_ms: u64,
    /// Tiles a target may move before the chasing monster recomputes its path.
    pub repath_distance: u32,
    /// Tiles a defending monster may stray from its anchor.
    pub defend_leash: u32,
    /// Minimum time between contact attacks of one monster, in milliseconds.
    pub attack_cooldown_ms: u64,
    /// Half extent of a monster's square footprint in tiles.
    pub footprint: f32,
}

impl Default for MonsterTuning {
    fn default() -> Self {
        Self {
            max_active: 24,
            repath_interval_ms: 1_000,
            repath_distance: 2,
            defend_leash: 4,
            attack_cooldown_ms: 1_000,
            footprint: 0.4,
        }
    }
}

impl MonsterTuning {
    /// Path recalculation deadline as a duration.
    #[must_use]
    pub const fn repath_interval(&self) -> Duration {
        Duration::from_millis(self.repath_interval_ms)
    }

    /// Contact attack cooldown as a duration.
    #[must_use]
    pub const fn attack_cooldown(&self) -> Duration {
        Duration::from_millis(self.attack_cooldown_ms)
    }
}

/// One entry of a wave composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveMember {
    /// Kind of monster.
    pub kind: MonsterKind,
    /// Number of monsters of this kind before difficulty scaling.
    pub count: u32,
}

/// Wave released once the session clock reaches `at_ms`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedWave {
    /// Session time at which the wave triggers, in milliseconds.
    pub at_ms: u64,
    /// Wave composition.
    pub members: Vec<WaveMember>,
}

impl TimedWave {
    /// Trigger time as a duration.
    #[must_use]
    pub const fn at(&self) -> Duration {
        Duration::from_millis(self.at_ms)
    }
}

/// Wave composition and spacing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    /// Delay between two members of the same wave entering the maze, in milliseconds.
    pub spawn_spacing_ms: u64,
    /// Wave released when a primary gate is destroyed.
    pub primary_gate: Vec<WaveMember>,
    /// Wave released when a secondary gate is destroyed.
    pub secondary_gate: Vec<WaveMember>,
    /// Waves released on the session clock.
    pub timed: Vec<TimedWave>,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            spawn_spacing_ms: 750,
            primary_gate: vec![
                WaveMember {
                    kind: MonsterKind::Hunter,
                    count: 2,
                },
                WaveMember {
                    kind: MonsterKind::Balloon,
                    count: 2,
                },
            ],
            secondary_gate: vec![WaveMember {
                kind: MonsterKind::Balloon,
                count: 2,
            }],
            timed: vec![
                TimedWave {
                    at_ms: 0,
                    members: vec![WaveMember {
                        kind: MonsterKind::Balloon,
                        count: 3,
                    }],
                },
                TimedWave {
                    at_ms: 60_000,
                    members: vec![
                        WaveMember {
                            kind: MonsterKind::Balloon,
                            count: 2,
                        },
                        WaveMember {
                            kind: MonsterKind::Ghost,
                            count: 1,
                        },
                    ],
                },
                TimedWave {
                    at_ms: 180_000,
                    members: vec![
                        WaveMember {
                            kind: MonsterKind::Overlord,
                            count: 1,
                        },
                        WaveMember {
                            kind: MonsterKind::Hunter,
                            count: 2,
                        },
                    ],
                },
            ],
        }
    }
}

impl WaveTuning {
    /// Spacing between wave members as a duration.
    #[must_use]
    pub const fn spawn_spacing(&self) -> Duration {
        Duration::from_millis(self.spawn_spacing_ms)
    }
}

/// Tick rate and client outbox bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncTuning {
    /// Simulation ticks per second.
    pub tick_rate_hz: u32,
    /// Messages a client outbox holds before collapsing into a snapshot.
    pub outbox_capacity: usize,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            outbox_capacity: 32,
        }
    }
}

impl SyncTuning {
    /// Simulated time covered by a single tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}
