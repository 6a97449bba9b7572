use blast_maze_core::{
    BombOwner, BombStatus, Command, Direction, Event, GameSettings, MazeLayout, PlacementRejection,
    PlayerId, Tile, TilePos,
};
use blast_maze_world::{apply, query, World};
use proptest::prelude::*;

const SIDE: u32 = 11;

fn open_layout() -> MazeLayout {
    let mut tiles = Vec::new();
    for row in 0..SIDE {
        for column in 0..SIDE {
            let border = row == 0 || column == 0 || row == SIDE - 1 || column == SIDE - 1;
            tiles.push(if border { Tile::SolidWall } else { Tile::Empty });
        }
    }
    MazeLayout {
        columns: SIDE,
        rows: SIDE,
        tiles,
        spawn_points: vec![TilePos::new(1, 5)],
        gates: Vec::new(),
        power_up_spots: Vec::new(),
        monster_spawns: Vec::new(),
        seed: 11,
        attempts: 1,
    }
}

fn boot(max_bombs: u32) -> World {
    let mut settings = GameSettings::default();
    settings.power_ups.chance = 0.0;
    settings.players.max_bombs = max_bombs;
    let mut world = World::new(settings);
    let mut events = Vec::new();
    apply(&mut world, Command::LoadMaze { layout: open_layout() }, &mut events);
    apply(
        &mut world,
        Command::AddPlayer {
            player: PlayerId::new(1),
            name: String::from("sapper"),
        },
        &mut events,
    );
    world
}

proptest! {
    #[test]
    fn armed_bombs_never_exceed_the_owner_capacity(
        max_bombs in 1_u32..6,
        attempts in 1_u32..10,
    ) {
        let mut world = boot(max_bombs);
        let player = PlayerId::new(1);
        let mut events = Vec::new();
        for column in 1..=attempts {
            apply(
                &mut world,
                Command::RelocatePlayer {
                    player,
                    position: TilePos::new(column, 5).center(),
                    facing: Direction::East,
                },
                &mut events,
            );
            apply(&mut world, Command::PlaceBomb { player }, &mut events);
        }

        let placed = events
            .iter()
            .filter(|event| matches!(event, Event::BombPlaced { .. }))
            .count();
        let refused = events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    Event::BombPlacementRejected {
                        owner: BombOwner::Player(_),
                        reason: PlacementRejection::CapacityExceeded,
                    }
                )
            })
            .count();
        let expected = attempts.min(max_bombs) as usize;

        prop_assert_eq!(placed, expected);
        prop_assert_eq!(refused, attempts as usize - expected);
        prop_assert_eq!(
            query::bomb_view(&world)
                .iter()
                .filter(|bomb| bomb.status == BombStatus::Armed)
                .count(),
            expected
        );
    }
}
