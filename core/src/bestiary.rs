//! Static behaviour tables for monsters and bosses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AiGoal, WaveMember};

const DEFAULT_GOALS: [AiGoal; 3] = [AiGoal::Hunt, AiGoal::Defend, AiGoal::Patrol];

/// Kinds of monsters that roam the maze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MonsterKind {
    /// Slow wanderer with a short detection radius.
    Balloon,
    /// Drifts through destructible walls.
    Ghost,
    /// Fast pack hunter.
    Hunter,
    /// Durable guardian that prefers defending its anchor.
    Brute,
    /// Boss with phased attacks.
    Overlord,
}

/// Behaviour parameters shared by every monster of a kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonsterProfile {
    /// Health at spawn before difficulty scaling.
    pub max_health: u32,
    /// Movement speed in tiles per second.
    pub speed: f32,
    /// Damage dealt to a player sharing the monster's tile.
    pub contact_damage: u32,
    /// Radius in tiles within which the monster notices players.
    pub detection_radius: u32,
    /// Chance in `[0, 1]` that a patrolling monster drifts toward the nearest player.
    pub aggression: f32,
    /// Whether the monster adopts the targets of nearby pack mates.
    pub pack: bool,
    /// Whether the monster passes through destructible walls.
    pub wall_pass: bool,
    /// Score credited to the player who kills the monster.
    pub score: u32,
    /// Goals in priority order; the first eligible goal wins.
    pub goals: [AiGoal; 3],
}

impl MonsterKind {
    /// Every monster kind in canonical order.
    pub const ALL: [MonsterKind; 5] = [
        MonsterKind::Balloon,
        MonsterKind::Ghost,
        MonsterKind::Hunter,
        MonsterKind::Brute,
        MonsterKind::Overlord,
    ];

    /// Behaviour parameters for the kind.
    #[must_use]
    pub const fn profile(self) -> MonsterProfile {
        match self {
            Self::Balloon => MonsterProfile {
                max_health: 20,
                speed: 1.2,
                contact_damage: 10,
                detection_radius: 2,
                aggression: 0.1,
                pack: false,
                wall_pass: false,
                score: 100,
                goals: DEFAULT_GOALS,
            },
            Self::Ghost => MonsterProfile {
                max_health: 20,
                speed: 1.6,
                contact_damage: 15,
                detection_radius: 6,
                aggression: 0.3,
                pack: false,
                wall_pass: true,
                score: 200,
                goals: DEFAULT_GOALS,
            },
            Self::Hunter => MonsterProfile {
                max_health: 30,
                speed: 2.4,
                contact_damage: 20,
                detection_radius: 8,
                aggression: 0.6,
                pack: true,
                wall_pass: false,
                score: 300,
                goals: DEFAULT_GOALS,
            },
            Self::Brute => MonsterProfile {
                max_health: 80,
                speed: 1.0,
                contact_damage: 30,
                detection_radius: 4,
                aggression: 0.2,
                pack: true,
                wall_pass: false,
                score: 400,
                goals: [AiGoal::Defend, AiGoal::Hunt, AiGoal::Patrol],
            },
            Self::Overlord => MonsterProfile {
                max_health: 400,
                speed: 0.8,
                contact_damage: 40,
                detection_radius: 12,
                aggression: 1.0,
                pack: false,
                wall_pass: false,
                score: 5_000,
                goals: DEFAULT_GOALS,
            },
        }
    }

    /// Reports whether the kind carries a boss extension.
    #[must_use]
    pub const fn is_boss(self) -> bool {
        matches!(self, Self::Overlord)
    }

    /// Ordered boss phases, strongest threshold first. Empty for regular monsters.
    ///
    /// Phase `0` is active at spawn. Each later phase activates once the
    /// boss's health fraction drops to or below its threshold.
    #[must_use]
    pub fn boss_phases(self) -> Vec<BossPhase> {
        match self {
            Self::Overlord => vec![
                BossPhase {
                    health_threshold: 1.0,
                    speed_multiplier: 1.0,
                    attacks: vec![
                        BossAttack::new(BossAttackKind::Slam { radius: 2, damage: 20 }, 3, 3_000),
                        BossAttack::new(
                            BossAttackKind::Summon {
                                kind: MonsterKind::Balloon,
                                count: 2,
                            },
                            1,
                            8_000,
                        ),
                    ],
                    minions: Vec::new(),
                },
                BossPhase {
                    health_threshold: 0.5,
                    speed_multiplier: 1.25,
                    attacks: vec![
                        BossAttack::new(BossAttackKind::Slam { radius: 2, damage: 25 }, 2, 2_500),
                        BossAttack::new(BossAttackKind::BombRain { count: 3, radius: 3 }, 2, 5_000),
                        BossAttack::new(
                            BossAttackKind::Summon {
                                kind: MonsterKind::Hunter,
                                count: 2,
                            },
                            1,
                            7_000,
                        ),
                    ],
                    minions: vec![WaveMember {
                        kind: MonsterKind::Hunter,
                        count: 2,
                    }],
                },
                BossPhase {
                    health_threshold: 0.2,
                    speed_multiplier: 1.5,
                    attacks: vec![
                        BossAttack::new(BossAttackKind::BombRain { count: 5, radius: 4 }, 3, 4_000),
                        BossAttack::new(BossAttackKind::Slam { radius: 3, damage: 30 }, 2, 2_000),
                    ],
                    minions: vec![
                        WaveMember {
                            kind: MonsterKind::Brute,
                            count: 1,
                        },
                        WaveMember {
                            kind: MonsterKind::Ghost,
                            count: 2,
                        },
                    ],
                },
            ],
            Self::Balloon | Self::Ghost | Self::Hunter | Self::Brute => Vec::new(),
        }
    }
}

/// One phase of a boss fight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BossPhase {
    /// Health fraction at or below which the phase activates.
    pub health_threshold: f32,
    /// Multiplier applied to the boss's base speed while the phase is active.
    pub speed_multiplier: f32,
    /// Attacks available while the phase is active.
    pub attacks: Vec<BossAttack>,
    /// Minions spawned when the boss enters the phase.
    pub minions: Vec<WaveMember>,
}

/// Weighted attack entry within a boss phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossAttack {
    /// Effect of the attack.
    pub kind: BossAttackKind,
    /// Relative selection weight among ready attacks.
    pub weight: u32,
    /// Cooldown in milliseconds after the attack fires.
    pub cooldown_ms: u64,
}

impl BossAttack {
    /// Creates a new attack entry.
    #[must_use]
    pub const fn new(kind: BossAttackKind, weight: u32, cooldown_ms: u64) -> Self {
        Self {
            kind,
            weight,
            cooldown_ms,
        }
    }

    /// Cooldown expressed as a duration.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Effects a boss attack may produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossAttackKind {
    /// Damages every player within `radius` tiles of the boss.
    Slam {
        /// Manhattan radius in tiles.
        radius: u32,
        /// Damage applied to each player hit.
        damage: u32,
    },
    /// Spawns minions next to the boss.
    Summon {
        /// Kind of minion.
        kind: MonsterKind,
        /// Number of minions requested.
        count: u32,
    },
    /// Drops boss-owned bombs around the targeted player.
    BombRain {
        /// Number of bombs requested.
        count: u32,
        /// Manhattan radius around the target in tiles.
        radius: u32,
    },
}
