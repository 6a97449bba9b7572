#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seeded maze generation with bounded retries.
//!
//! Every attempt draws from its own random stream derived from the session
//! seed and the attempt index, so a given seed always produces the same layout
//! and the same number of consumed attempts.

pub mod connectivity;

use std::collections::BTreeSet;

use blast_maze_core::{
    derive_stream_seed, GameSettings, GateKind, GatePlacement, MazeLayout, MazeView,
    Passability, SettingsError, Tile, TilePos, MAX_PLAYERS,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, warn};

use connectivity::Reachability;

/// Attempts made before generation gives up, unless overridden.
pub const MAX_GENERATION_ATTEMPTS: u32 = 32;

/// Bounds applied to the retry loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationLimits {
    /// Maximum number of attempts before reporting [`GenerationError::Unsatisfiable`].
    pub max_attempts: u32,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            max_attempts: MAX_GENERATION_ATTEMPTS,
        }
    }
}

/// Reasons a maze cannot be generated.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GenerationError {
    /// The settings failed validation.
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
    /// More players were requested than the maze offers spawn points.
    #[error("{requested} players requested but only {available} spawn points fit")]
    TooManyPlayers {
        /// Requested player count.
        requested: u32,
        /// Spawn points available in the maze.
        available: u32,
    },
    /// More gates were requested than there are tiles to hide them under.
    #[error("{requested} gates requested but only {available} tiles can hold one")]
    TooManyGates {
        /// Requested gate count.
        requested: u32,
        /// Tiles able to hide a gate.
        available: u32,
    },
    /// No attempt satisfied every constraint.
    #[error("no valid maze found after {attempts} attempts")]
    Unsatisfiable {
        /// Attempts consumed.
        attempts: u32,
    },
}

/// Generates the maze for the provided settings with the default retry bound.
pub fn generate(settings: &GameSettings) -> Result<MazeLayout, GenerationError> {
    generate_with_limits(settings, GenerationLimits::default())
}

/// Generates the maze for the provided settings.
pub fn generate_with_limits(
    settings: &GameSettings,
    limits: GenerationLimits,
) -> Result<MazeLayout, GenerationError> {
    settings.validate()?;
    let maze = &settings.maze;
    let spawns = spawn_points(maze.columns, maze.rows, settings.max_players)?;

    let safe = safe_zone(&spawns, maze.columns, maze.rows, maze.spawn_safety_radius);
    let available = interior(maze.columns, maze.rows)
        .filter(|tile| !is_pillar(*tile, settings) && !safe.contains(tile))
        .count();
    let available = u32::try_from(available).unwrap_or(u32::MAX);
    if maze.gate_count > available {
        return Err(GenerationError::TooManyGates {
            requested: maze.gate_count,
            available,
        });
    }

    for attempt in 0..limits.max_attempts {
        let seed = derive_stream_seed(maze.seed, &format!("maze-attempt-{attempt}"));
        match attempt_layout(settings, &spawns, &safe, seed) {
            Some(mut layout) => {
                layout.attempts = attempt + 1;
                debug!(
                    seed = maze.seed,
                    attempts = layout.attempts,
                    columns = layout.columns,
                    rows = layout.rows,
                    "maze generated"
                );
                return Ok(layout);
            }
            None => debug!(attempt, "maze attempt rejected"),
        }
    }

    warn!(
        seed = maze.seed,
        attempts = limits.max_attempts,
        "maze generation exhausted its attempts"
    );
    Err(GenerationError::Unsatisfiable {
        attempts: limits.max_attempts,
    })
}

fn attempt_layout(
    settings: &GameSettings,
    spawns: &[TilePos],
    safe: &BTreeSet<TilePos>,
    seed: u64,
) -> Option<MazeLayout> {
    let maze = &settings.maze;
    let (columns, rows) = (maze.columns, maze.rows);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut tiles = vec![Tile::Empty; (columns as usize) * (rows as usize)];
    let index = |tile: TilePos| (tile.row() as usize) * (columns as usize) + tile.column() as usize;

    for row in 0..rows {
        for column in 0..columns {
            let border = row == 0 || column == 0 || row == rows - 1 || column == columns - 1;
            if border {
                tiles[index(TilePos::new(column, row))] = Tile::SolidWall;
            }
        }
    }

    let rock_density = f64::from(maze.theme.rock_density());
    let wall_density = f64::from(maze.effective_wall_density()).clamp(0.0, 1.0);
    for tile in interior(columns, rows) {
        if is_pillar(tile, settings) {
            tiles[index(tile)] = Tile::SolidWall;
            continue;
        }
        if safe.contains(&tile) {
            continue;
        }
        if rock_density > 0.0 && rng.gen_bool(rock_density) {
            tiles[index(tile)] = Tile::SolidWall;
        } else if wall_density > 0.0 && rng.gen_bool(wall_density) {
            tiles[index(tile)] = Tile::DestructibleWall;
        }
    }
    for spawn in spawns {
        tiles[index(*spawn)] = Tile::Empty;
    }

    let view = MazeView::new(&tiles, columns, rows);
    let reachability = Reachability::from_origin(&view, spawns[0]);
    if !spawns.iter().all(|spawn| reachability.contains(*spawn)) {
        return None;
    }

    let mut gate_candidates: Vec<TilePos> = interior(columns, rows)
        .filter(|tile| !safe.contains(tile))
        .filter(|tile| view.tile(*tile) == Some(Tile::DestructibleWall))
        .filter(|tile| reachability.contains(*tile))
        .collect();
    if gate_candidates.len() < maze.gate_count as usize {
        return None;
    }
    gate_candidates.shuffle(&mut rng);
    gate_candidates.truncate(maze.gate_count as usize);
    gate_candidates.sort();

    let gates: Vec<GatePlacement> = gate_candidates
        .iter()
        .enumerate()
        .map(|(position, tile)| GatePlacement {
            tile: *tile,
            kind: gate_kind(position, gate_candidates.len()),
        })
        .collect();
    for gate in &gates {
        tiles[index(gate.tile)] = Tile::Gate { revealed: false };
    }

    let view = MazeView::new(&tiles, columns, rows);
    let open: Vec<TilePos> = interior(columns, rows)
        .filter(|tile| !safe.contains(tile))
        .filter(|tile| view.is_walkable(*tile, Passability::NONE))
        .filter(|tile| reachability.contains(*tile))
        .collect();

    let mut power_up_spots = open.clone();
    power_up_spots.shuffle(&mut rng);
    power_up_spots.truncate(maze.power_up_spots as usize);
    power_up_spots.sort();

    let monster_spawns = farthest_from(spawns, open, maze.monster_spawns as usize);
    if maze.monster_spawns > 0 && monster_spawns.is_empty() {
        return None;
    }

    Some(MazeLayout {
        columns,
        rows,
        tiles,
        spawn_points: spawns.to_vec(),
        gates,
        power_up_spots,
        monster_spawns,
        seed,
        attempts: 0,
    })
}

fn gate_kind(position: usize, total: usize) -> GateKind {
    if position == 0 {
        GateKind::Primary
    } else if total >= 3 && position == total - 1 {
        GateKind::Emergency
    } else {
        GateKind::Secondary
    }
}

/// Open tiles ordered by decreasing distance to the nearest player spawn.
fn farthest_from(spawns: &[TilePos], mut open: Vec<TilePos>, count: usize) -> Vec<TilePos> {
    let nearest = |tile: TilePos| {
        spawns
            .iter()
            .map(|spawn| spawn.manhattan_distance(tile))
            .min()
            .unwrap_or(0)
    };
    open.sort_by_key(|tile| (std::cmp::Reverse(nearest(*tile)), *tile));
    open.truncate(count);
    open
}

/// Corners first, then edge midpoints, truncated to the player count.
fn spawn_points(columns: u32, rows: u32, players: u32) -> Result<Vec<TilePos>, GenerationError> {
    let right = columns - 2;
    let bottom = rows - 2;
    let middle_column = (columns / 2) | 1;
    let middle_row = (rows / 2) | 1;
    let candidates = [
        TilePos::new(1, 1),
        TilePos::new(right, bottom),
        TilePos::new(right, 1),
        TilePos::new(1, bottom),
        TilePos::new(middle_column, 1),
        TilePos::new(middle_column, bottom),
        TilePos::new(1, middle_row),
        TilePos::new(right, middle_row),
    ];

    let mut unique: Vec<TilePos> = Vec::with_capacity(MAX_PLAYERS as usize);
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }

    if players as usize > unique.len() {
        return Err(GenerationError::TooManyPlayers {
            requested: players,
            available: u32::try_from(unique.len()).unwrap_or(u32::MAX),
        });
    }
    unique.truncate(players as usize);
    Ok(unique)
}

fn safe_zone(spawns: &[TilePos], columns: u32, rows: u32, radius: u32) -> BTreeSet<TilePos> {
    interior(columns, rows)
        .filter(|tile| {
            spawns
                .iter()
                .any(|spawn| spawn.manhattan_distance(*tile) <= radius)
        })
        .collect()
}

fn interior(columns: u32, rows: u32) -> impl Iterator<Item = TilePos> {
    (1..rows.saturating_sub(1))
        .flat_map(move |row| (1..columns.saturating_sub(1)).map(move |column| TilePos::new(column, row)))
}

fn is_pillar(tile: TilePos, settings: &GameSettings) -> bool {
    settings.maze.theme.has_pillars() && tile.column() % 2 == 0 && tile.row() % 2 == 0
}
