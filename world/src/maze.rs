use std::collections::BTreeMap;

use blast_maze_core::{GateId, MazeLayout, MazeView, Passability, Tile, TilePos};

/// Destructible tile grid owned by the world.
///
/// The grid's shape is fixed once a layout is loaded; only the contents of
/// individual tiles change as blasts destroy walls and uncover gates.
#[derive(Clone, Debug, Default)]
pub struct Maze {
    columns: u32,
    rows: u32,
    tiles: Vec<Tile>,
    spawn_points: Vec<TilePos>,
    monster_spawns: Vec<TilePos>,
    gate_covers: BTreeMap<TilePos, GateId>,
}

/// Result of destroying a wall tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WallDestruction {
    pub(crate) now: Tile,
    pub(crate) revealed_gate: Option<GateId>,
}

impl Maze {
    pub(crate) fn from_layout(layout: &MazeLayout, gates: &[(GateId, TilePos)]) -> Self {
        let mut tiles = layout.tiles.clone();
        let expected = usize::try_from(layout.columns)
            .ok()
            .and_then(|columns| columns.checked_mul(usize::try_from(layout.rows).ok()?))
            .unwrap_or(0);
        tiles.resize(expected, Tile::SolidWall);

        let mut maze = Self {
            columns: layout.columns,
            rows: layout.rows,
            tiles,
            spawn_points: layout.spawn_points.clone(),
            monster_spawns: layout.monster_spawns.clone(),
            gate_covers: BTreeMap::new(),
        };

        for &(gate, tile) in gates {
            if let Some(index) = maze.index(tile) {
                maze.tiles[index] = Tile::Gate { revealed: false };
                let _ = maze.gate_covers.insert(tile, gate);
            }
        }

        maze
    }

    /// Dimensions of the grid as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Read-only view over the current tile contents.
    #[must_use]
    pub fn view(&self) -> MazeView<'_> {
        MazeView::new(&self.tiles, self.columns, self.rows)
    }

    /// Row-major tile contents.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile stored at the provided coordinate, if it lies within the grid.
    #[must_use]
    pub fn tile(&self, tile: TilePos) -> Option<Tile> {
        self.view().tile(tile)
    }

    /// Reports whether an entity with the provided flags may stand on the tile.
    #[must_use]
    pub fn is_walkable(&self, tile: TilePos, passability: Passability) -> bool {
        self.view().is_walkable(tile, passability)
    }

    /// Player spawn points in assignment order.
    #[must_use]
    pub fn spawn_points(&self) -> &[TilePos] {
        &self.spawn_points
    }

    /// Tiles reserved for timed monster waves.
    #[must_use]
    pub fn monster_spawns(&self) -> &[TilePos] {
        &self.monster_spawns
    }

    /// Destroys the wall at `tile`, uncovering a hidden gate if one lies beneath.
    ///
    /// Returns `None` when the tile holds nothing a blast can destroy.
    pub(crate) fn destroy_wall(&mut self, tile: TilePos) -> Option<WallDestruction> {
        let index = self.index(tile)?;
        let destruction = match self.tiles[index] {
            Tile::DestructibleWall => WallDestruction {
                now: Tile::Empty,
                revealed_gate: None,
            },
            Tile::Gate { revealed: false } => WallDestruction {
                now: Tile::Gate { revealed: true },
                revealed_gate: self.gate_covers.get(&tile).copied(),
            },
            Tile::Empty | Tile::SolidWall | Tile::Gate { revealed: true } => return None,
        };
        self.tiles[index] = destruction.now;
        Some(destruction)
    }

    fn index(&self, tile: TilePos) -> Option<usize> {
        if tile.column() >= self.columns || tile.row() >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let row = usize::try_from(tile.row()).ok()?;
        let column = usize::try_from(tile.column()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}
