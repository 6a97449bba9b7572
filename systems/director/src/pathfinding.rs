//! Breadth-first route planning over the tile grid.

use std::collections::VecDeque;

use blast_maze_core::{BombView, MazeView, Passability, TilePos};

/// Shortest route from `from` to `to`, excluding the start and including the goal.
///
/// Armed bombs block every tile except the goal. Neighbours are expanded in
/// canonical direction order so equal-length routes resolve identically.
pub(crate) fn find_path(
    maze: &MazeView<'_>,
    bombs: &BombView,
    from: TilePos,
    to: TilePos,
    passability: Passability,
) -> Option<VecDeque<TilePos>> {
    if from == to {
        return Some(VecDeque::new());
    }
    if !maze.is_walkable(to, passability) {
        return None;
    }

    let (columns, rows) = maze.dimensions();
    let width = usize::try_from(columns).ok()?;
    let cell_count = width.checked_mul(usize::try_from(rows).ok()?)?;
    let mut parents: Vec<Option<TilePos>> = vec![None; cell_count];
    let mut visited = vec![false; cell_count];

    let start = index(width, from)?;
    *visited.get_mut(start)? = true;
    let mut queue = VecDeque::new();
    queue.push_back(from);

    while let Some(tile) = queue.pop_front() {
        for (_, next) in maze.walkable_neighbors(tile, passability) {
            let Some(slot) = index(width, next) else {
                continue;
            };
            if visited[slot] {
                continue;
            }
            if next != to && !passability.bomb_pass && bombs.armed_at(next).is_some() {
                continue;
            }
            visited[slot] = true;
            parents[slot] = Some(tile);
            if next == to {
                return Some(unwind(width, &parents, from, to));
            }
            queue.push_back(next);
        }
    }

    None
}

/// Reports whether any tile of the route has become impassable.
pub(crate) fn is_blocked(
    path: &VecDeque<TilePos>,
    maze: &MazeView<'_>,
    bombs: &BombView,
    passability: Passability,
) -> bool {
    let last = path.len().saturating_sub(1);
    path.iter().enumerate().any(|(position, tile)| {
        !maze.is_walkable(*tile, passability)
            || (position != last && !passability.bomb_pass && bombs.armed_at(*tile).is_some())
    })
}

fn unwind(width: usize, parents: &[Option<TilePos>], from: TilePos, to: TilePos) -> VecDeque<TilePos> {
    let mut path = VecDeque::new();
    let mut cursor = to;
    while cursor != from {
        path.push_front(cursor);
        match index(width, cursor).and_then(|slot| parents.get(slot).copied().flatten()) {
            Some(parent) => cursor = parent,
            None => break,
        }
    }
    path
}

fn index(width: usize, tile: TilePos) -> Option<usize> {
    let row = usize::try_from(tile.row()).ok()?;
    let column = usize::try_from(tile.column()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
