//! Deliberate state corruption used to exercise invariant handling in tests.

use std::time::Duration;

use blast_maze_core::{BombId, BombOwner, BombStatus, PlayerId, TilePos};

use crate::{registry::BombState, World};

/// Inserts a second armed bomb on `tile` without any placement checks.
pub fn stack_bomb(world: &mut World, owner: PlayerId, tile: TilePos) -> BombId {
    let id = world.registry.allocate_bomb();
    let _ = world.registry.bombs.insert(
        id,
        BombState {
            id,
            owner: BombOwner::Player(owner),
            tile,
            fuse: Duration::from_secs(60),
            blast_radius: 1,
            penetration: 0,
            status: BombStatus::Armed,
        },
    );
    id
}
