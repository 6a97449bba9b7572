#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that validates steps and proposes relocations.

use std::time::Duration;

use blast_maze_core::{
    BombId, BombView, Command, Direction, GameSettings, MazeView, MonsterSnapshot, MonsterView,
    Passability, PlayerSnapshot, PlayerView, Position, TilePos,
};
use tracing::trace;

/// Everything needed to validate a single step of one entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveRequest {
    /// Current position of the entity's center.
    pub position: Position,
    /// Direction of travel.
    pub direction: Direction,
    /// Speed in tiles per second.
    pub speed: f32,
    /// Simulated time covered by the step.
    pub dt: Duration,
    /// Half-extent of the entity's square footprint in tiles.
    pub footprint: f32,
    /// Relaxations of the collision rules granted to the entity.
    pub passability: Passability,
}

impl MoveRequest {
    fn step_length(&self) -> f32 {
        (self.speed * self.dt.as_secs_f32()).max(0.0)
    }
}

/// Resolution of a validated step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveOutcome {
    /// Position after the step; the original position when fully blocked.
    pub position: Position,
    /// Armed bomb that stopped the forward motion, if any.
    pub blocked_by: Option<BombId>,
}

/// Validates a step and returns the resulting position.
///
/// Blocked steps return the original position; there is no error case.
#[must_use]
pub fn try_move(request: &MoveRequest, maze: &MazeView<'_>, bombs: &BombView) -> Position {
    resolve(request, maze, bombs).position
}

/// Validates a step and reports the bomb that blocked it, if any.
#[must_use]
pub fn resolve(request: &MoveRequest, maze: &MazeView<'_>, bombs: &BombView) -> MoveOutcome {
    let step = request.step_length();
    let origin = request.position;
    if step <= 0.0 {
        return MoveOutcome {
            position: origin,
            blocked_by: None,
        };
    }

    let lateral = lateral_nudge(origin, request.direction, step);
    let forward = lateral.offset(request.direction, step);
    let blocked_by = match blocker(request, forward, maze, bombs) {
        Blocker::None => {
            return MoveOutcome {
                position: forward,
                blocked_by: None,
            }
        }
        Blocker::Bomb(bomb) => Some(bomb),
        Blocker::Terrain => None,
    };

    // Slide toward the lane center even when the way ahead is closed.
    let position = if lateral != origin && blocker(request, lateral, maze, bombs) == Blocker::None {
        lateral
    } else {
        origin
    };
    trace!(?origin, ?position, direction = ?request.direction, "step blocked");
    MoveOutcome {
        position,
        blocked_by,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Blocker {
    None,
    Terrain,
    Bomb(BombId),
}

fn blocker(request: &MoveRequest, candidate: Position, maze: &MazeView<'_>, bombs: &BombView) -> Blocker {
    let Some(destination) = footprint_tiles(candidate, request.footprint) else {
        return Blocker::Terrain;
    };
    let current = footprint_tiles(request.position, request.footprint);

    for tile in destination.iter() {
        if !maze.is_walkable(tile, request.passability) {
            return Blocker::Terrain;
        }
    }
    if request.passability.bomb_pass {
        return Blocker::None;
    }
    for tile in destination.iter() {
        let Some(bomb) = bombs.armed_at(tile) else {
            continue;
        };
        let standing_on = current.is_some_and(|current| current.contains(tile));
        if !standing_on {
            return Blocker::Bomb(bomb.id);
        }
    }
    Blocker::None
}

/// Moves the perpendicular coordinate toward the center of the current lane.
fn lateral_nudge(position: Position, direction: Direction, step: f32) -> Position {
    let Some(tile) = position.tile() else {
        return position;
    };
    let center = tile.center();
    if direction.is_horizontal() {
        Position::new(position.x(), approach(position.y(), center.y(), step))
    } else {
        Position::new(approach(position.x(), center.x(), step), position.y())
    }
}

fn approach(value: f32, target: f32, step: f32) -> f32 {
    let gap = target - value;
    if gap.abs() <= step {
        target
    } else {
        value + step.copysign(gap)
    }
}

/// Inclusive tile rectangle covered by a square footprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FootprintTiles {
    min: TilePos,
    max: TilePos,
}

impl FootprintTiles {
    fn iter(self) -> impl Iterator<Item = TilePos> {
        (self.min.row()..=self.max.row()).flat_map(move |row| {
            (self.min.column()..=self.max.column()).map(move |column| TilePos::new(column, row))
        })
    }

    fn contains(self, tile: TilePos) -> bool {
        (self.min.column()..=self.max.column()).contains(&tile.column())
            && (self.min.row()..=self.max.row()).contains(&tile.row())
    }
}

fn footprint_tiles(position: Position, half_extent: f32) -> Option<FootprintTiles> {
    let left = position.x() - half_extent;
    let top = position.y() - half_extent;
    if left < 0.0 || top < 0.0 || !left.is_finite() || !top.is_finite() {
        return None;
    }
    let right = ((position.x() + half_extent).ceil() - 1.0).max(left.floor());
    let bottom = ((position.y() + half_extent).ceil() - 1.0).max(top.floor());
    Some(FootprintTiles {
        min: Position::new(left, top).tile()?,
        max: Position::new(right, bottom).tile()?,
    })
}

/// Pure system that turns movement intents into relocation commands.
#[derive(Clone, Debug)]
pub struct Movement {
    base_speed: f32,
    player_footprint: f32,
    monster_footprint: f32,
}

impl Movement {
    /// Creates the movement system for the provided settings.
    #[must_use]
    pub fn new(settings: &GameSettings) -> Self {
        Self {
            base_speed: settings.players.base_speed,
            player_footprint: settings.players.footprint,
            monster_footprint: settings.monsters.footprint,
        }
    }

    /// Validates every pending step and emits the resulting commands.
    pub fn handle(
        &self,
        dt: Duration,
        players: &PlayerView,
        monsters: &MonsterView,
        bombs: &BombView,
        maze: &MazeView<'_>,
        out: &mut Vec<Command>,
    ) {
        for player in players.iter() {
            self.move_player(player, dt, bombs, maze, out);
        }
        for monster in monsters.iter() {
            self.move_monster(monster, dt, bombs, maze, out);
        }
    }

    fn move_player(
        &self,
        player: &PlayerSnapshot,
        dt: Duration,
        bombs: &BombView,
        maze: &MazeView<'_>,
        out: &mut Vec<Command>,
    ) {
        if !player.alive || !player.connected || player.respawning {
            return;
        }
        let Some(direction) = player.moving else {
            return;
        };
        let request = MoveRequest {
            position: player.position,
            direction,
            speed: self.base_speed * player.abilities.speed_multiplier,
            dt,
            footprint: self.player_footprint,
            passability: player.abilities.passability(),
        };
        let outcome = resolve(&request, maze, bombs);
        if outcome.position != player.position {
            out.push(Command::RelocatePlayer {
                player: player.id,
                position: outcome.position,
                facing: direction,
            });
        }
        if let Some(bomb) = outcome.blocked_by.filter(|_| player.abilities.bomb_kick) {
            out.push(Command::KickBomb { bomb, direction });
        }
    }

    fn move_monster(
        &self,
        monster: &MonsterSnapshot,
        dt: Duration,
        bombs: &BombView,
        maze: &MazeView<'_>,
        out: &mut Vec<Command>,
    ) {
        let Some(direction) = monster.moving else {
            return;
        };
        let profile = monster.kind.profile();
        let request = MoveRequest {
            position: monster.position,
            direction,
            speed: profile.speed * phase_speed(monster),
            dt,
            footprint: self.monster_footprint,
            passability: Passability {
                wall_pass: profile.wall_pass,
                bomb_pass: false,
            },
        };
        let position = try_move(&request, maze, bombs);
        if position != monster.position {
            out.push(Command::RelocateMonster {
                monster: monster.id,
                position,
                facing: direction,
            });
        }
    }
}

fn phase_speed(monster: &MonsterSnapshot) -> f32 {
    let Some(phase) = monster.boss_phase else {
        return 1.0;
    };
    usize::try_from(phase)
        .ok()
        .and_then(|phase| monster.kind.boss_phases().get(phase).map(|phase| phase.speed_multiplier))
        .unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_maze_core::{BombOwner, BombSnapshot, BombStatus, PlayerId, Tile};

    const SIDE: u32 = 5;

    /// 5×5 grid with a solid border and an open interior.
    fn bordered() -> Vec<Tile> {
        let mut tiles = vec![Tile::Empty; (SIDE * SIDE) as usize];
        for row in 0..SIDE {
            for column in 0..SIDE {
                if row == 0 || column == 0 || row == SIDE - 1 || column == SIDE - 1 {
                    tiles[(row * SIDE + column) as usize] = Tile::SolidWall;
                }
            }
        }
        tiles
    }

    fn request(x: f32, y: f32, direction: Direction) -> MoveRequest {
        MoveRequest {
            position: Position::new(x, y),
            direction,
            speed: 2.0,
            dt: Duration::from_millis(100),
            footprint: 0.4,
            passability: Passability::NONE,
        }
    }

    fn bomb_at(tile: TilePos) -> BombView {
        BombView::from_snapshots(vec![BombSnapshot {
            id: BombId::new(0),
            owner: BombOwner::Player(PlayerId::new(0)),
            tile,
            blast_radius: 1,
            penetration: 0,
            status: BombStatus::Armed,
        }])
    }

    fn close(a: Position, b: Position) -> bool {
        (a.x() - b.x()).abs() < 1e-4 && (a.y() - b.y()).abs() < 1e-4
    }

    #[test]
    fn open_floor_advances_by_speed_times_dt() {
        let tiles = bordered();
        let view = MazeView::new(&tiles, SIDE, SIDE);
        let moved = try_move(&request(1.5, 1.5, Direction::East), &view, &BombView::default());
        assert!(close(moved, Position::new(1.7, 1.5)));
    }

    #[test]
    fn solid_wall_returns_original_position() {
        let tiles = bordered();
        let view = MazeView::new(&tiles, SIDE, SIDE);
        let start = request(1.5, 1.5, Direction::North);
        assert_eq!(try_move(&start, &view, &BombView::default()), start.position);
    }

    #[test]
    fn destructible_wall_blocks_without_wall_pass() {
        let mut tiles = bordered();
        tiles[(SIDE + 2) as usize] = Tile::DestructibleWall;
        let view = MazeView::new(&tiles, SIDE, SIDE);
        let mut step = request(1.5, 1.5, Direction::East);
        assert_eq!(try_move(&step, &view, &BombView::default()), step.position);

        step.passability.wall_pass = true;
        assert_ne!(try_move(&step, &view, &BombView::default()), step.position);
    }

    #[test]
    fn corner_assist_slides_toward_lane_center() {
        let mut tiles = bordered();
        tiles[(2 * SIDE + 2) as usize] = Tile::SolidWall;
        let view = MazeView::new(&tiles, SIDE, SIDE);
        // Slightly below the lane center, so the footprint grazes row 2.
        let step = request(1.5, 1.65, Direction::East);
        let outcome = resolve(&step, &view, &BombView::default());
        assert!(close(outcome.position, Position::new(1.7, 1.5)));
    }

    #[test]
    fn blocked_forward_still_nudges_laterally() {
        let mut tiles = bordered();
        tiles[(2 * SIDE + 2) as usize] = Tile::SolidWall;
        tiles[(SIDE + 2) as usize] = Tile::SolidWall;
        let view = MazeView::new(&tiles, SIDE, SIDE);
        let step = request(1.5, 1.65, Direction::East);
        let outcome = resolve(&step, &view, &BombView::default());
        assert!(close(outcome.position, Position::new(1.5, 1.5)));
    }

    #[test]
    fn bomb_ahead_blocks_and_is_reported() {
        let tiles = bordered();
        let view = MazeView::new(&tiles, SIDE, SIDE);
        let bombs = bomb_at(TilePos::new(2, 1));
        let step = request(1.5, 1.5, Direction::East);
        let outcome = resolve(&step, &view, &bombs);
        assert_eq!(outcome.position, step.position);
        assert_eq!(outcome.blocked_by, Some(BombId::new(0)));
    }

    #[test]
    fn bomb_underfoot_does_not_trap_its_owner() {
        let tiles = bordered();
        let view = MazeView::new(&tiles, SIDE, SIDE);
        let bombs = bomb_at(TilePos::new(1, 1));
        let step = request(1.5, 1.5, Direction::East);
        assert_ne!(try_move(&step, &view, &bombs), step.position);
    }

    #[test]
    fn bomb_pass_ignores_bombs() {
        let tiles = bordered();
        let view = MazeView::new(&tiles, SIDE, SIDE);
        let bombs = bomb_at(TilePos::new(2, 1));
        let mut step = request(1.5, 1.5, Direction::East);
        step.passability.bomb_pass = true;
        let outcome = resolve(&step, &view, &bombs);
        assert_eq!(outcome.blocked_by, None);
        assert_ne!(outcome.position, step.position);
    }

    #[test]
    fn footprint_covers_straddled_tiles() {
        let tiles = footprint_tiles(Position::new(1.9, 1.5), 0.4).expect("inside");
        assert_eq!(tiles.min, TilePos::new(1, 1));
        assert_eq!(tiles.max, TilePos::new(2, 1));
        assert_eq!(tiles.iter().count(), 2);
    }

    #[test]
    fn phase_speed_defaults_for_regular_monsters() {
        let monster = MonsterSnapshot {
            id: blast_maze_core::MonsterId::new(0),
            kind: blast_maze_core::MonsterKind::Balloon,
            position: Position::new(1.5, 1.5),
            facing: Direction::East,
            moving: None,
            health: 1,
            max_health: 1,
            anchor: TilePos::new(1, 1),
            boss_phase: None,
        };
        assert_eq!(phase_speed(&monster), 1.0);
    }
}
