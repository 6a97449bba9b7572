//! Flood-fill reachability over the maze, treating destructible walls as passable.

use std::collections::VecDeque;

use blast_maze_core::{MazeLayout, MazeView, Passability, TilePos};

/// Every tile may be bombed open except solid walls.
const BOMBABLE: Passability = Passability {
    wall_pass: true,
    bomb_pass: true,
};

/// Dense reachability grid produced by a breadth-first flood fill.
#[derive(Clone, Debug)]
pub struct Reachability {
    columns: u32,
    reached: Vec<bool>,
}

impl Reachability {
    /// Floods outward from `origin` through every tile that is not a solid wall.
    #[must_use]
    pub fn from_origin(view: &MazeView<'_>, origin: TilePos) -> Self {
        let (columns, rows) = view.dimensions();
        let cell_count = (columns as usize).saturating_mul(rows as usize);
        let mut reachability = Self {
            columns,
            reached: vec![false; cell_count],
        };
        if !view.is_walkable(origin, BOMBABLE) {
            return reachability;
        }

        let mut queue = VecDeque::new();
        reachability.mark(origin);
        queue.push_back(origin);
        while let Some(tile) = queue.pop_front() {
            for (_, next) in view.walkable_neighbors(tile, BOMBABLE) {
                if reachability.contains(next) {
                    continue;
                }
                reachability.mark(next);
                queue.push_back(next);
            }
        }

        reachability
    }

    /// Reports whether the flood fill reached the tile.
    #[must_use]
    pub fn contains(&self, tile: TilePos) -> bool {
        self.index(tile)
            .and_then(|index| self.reached.get(index).copied())
            .unwrap_or(false)
    }

    fn mark(&mut self, tile: TilePos) {
        if let Some(slot) = self.index(tile).and_then(|index| self.reached.get_mut(index)) {
            *slot = true;
        }
    }

    fn index(&self, tile: TilePos) -> Option<usize> {
        if tile.column() >= self.columns {
            return None;
        }
        (tile.row() as usize)
            .checked_mul(self.columns as usize)?
            .checked_add(tile.column() as usize)
    }
}

/// Reports whether every spawn point of the layout reaches every other one.
///
/// Reachability is symmetric, so flooding from the first spawn suffices.
#[must_use]
pub fn spawns_connected(layout: &MazeLayout) -> bool {
    let view = MazeView::new(&layout.tiles, layout.columns, layout.rows);
    let Some(first) = layout.spawn_points.first() else {
        return true;
    };
    let reachability = Reachability::from_origin(&view, *first);
    layout
        .spawn_points
        .iter()
        .all(|spawn| reachability.contains(*spawn))
}
