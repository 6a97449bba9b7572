use std::time::Duration;

use blast_maze_core::{
    Command, Direction, Event, GameSettings, MazeLayout, PlayerId, Position, Tile, TilePos,
};
use blast_maze_system_movement::Movement;
use blast_maze_world::{self as world, query, World};

const TICK: Duration = Duration::from_millis(50);

fn corridor() -> MazeLayout {
    let columns = 9;
    let rows = 5;
    let mut tiles = Vec::new();
    for row in 0..rows {
        for column in 0..columns {
            let border = row == 0 || column == 0 || row == rows - 1 || column == columns - 1;
            let pillar = row == 2 && column % 2 == 0;
            tiles.push(if border || pillar {
                Tile::SolidWall
            } else {
                Tile::Empty
            });
        }
    }
    MazeLayout {
        columns,
        rows,
        tiles,
        spawn_points: vec![TilePos::new(1, 1), TilePos::new(7, 3)],
        gates: Vec::new(),
        power_up_spots: Vec::new(),
        monster_spawns: Vec::new(),
        seed: 7,
        attempts: 1,
    }
}

fn script() -> Vec<(u32, Option<Direction>)> {
    vec![
        (0, Some(Direction::East)),
        (20, Some(Direction::South)),
        (30, Some(Direction::East)),
        (70, None),
    ]
}

fn replay(settings: &GameSettings) -> (Vec<Position>, Vec<String>) {
    let mut world = World::new(settings.clone());
    let mut log = Vec::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::LoadMaze { layout: corridor() },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::AddPlayer {
            player: PlayerId::new(1),
            name: String::from("runner"),
        },
        &mut events,
    );
    let movement = Movement::new(settings);
    let mut trail = Vec::new();

    for tick in 0..80 {
        for (at, direction) in script() {
            if at == tick {
                world::apply(
                    &mut world,
                    Command::SetPlayerIntent {
                        player: PlayerId::new(1),
                        direction,
                    },
                    &mut events,
                );
            }
        }

        let mut commands = Vec::new();
        {
            let maze = query::maze(&world).view();
            movement.handle(
                TICK,
                &query::player_view(&world),
                &query::monster_view(&world),
                &query::bomb_view(&world),
                &maze,
                &mut commands,
            );
        }
        for command in commands {
            log.push(format!("{command:?}"));
            world::apply(&mut world, command, &mut events);
        }
        world::apply(&mut world, Command::Tick { dt: TICK }, &mut events);

        let player = query::player_view(&world)
            .get(PlayerId::new(1))
            .map(|player| player.position)
            .expect("player present");
        trail.push(player);
    }
    assert!(events
        .iter()
        .all(|event| !matches!(event, Event::PlayerJoinRejected { .. })));
    (trail, log)
}

#[test]
fn replay_is_deterministic() {
    let settings = GameSettings::default();
    let first = replay(&settings);
    let second = replay(&settings);
    assert_eq!(first, second, "replay diverged between runs");
}

#[test]
fn runner_is_stopped_by_walls_and_pillars() {
    let settings = GameSettings::default();
    let (trail, _) = replay(&settings);

    for position in &trail {
        let tile = position.tile().expect("inside");
        let layout = corridor();
        assert_eq!(layout.tile(tile), Some(Tile::Empty), "entered {tile:?}");
    }

    // 20 ticks east at 3 tiles/s covers 3 tiles from the first column.
    let after_east = trail[19];
    assert_eq!(after_east.tile(), Some(TilePos::new(4, 1)));

    // Row 2 is a pillar below even columns, so the southward leg stalls.
    let after_south = trail[29];
    assert_eq!(after_south.tile(), Some(TilePos::new(4, 1)));
    assert!((after_south.y() - 1.5).abs() < 1e-4);

    // The eastern border halts the runner with its footprint flush against it.
    let stopped = trail[69];
    assert_eq!(stopped.tile(), Some(TilePos::new(7, 1)));
    assert!(stopped.x() <= 7.6 + 1e-4);
    assert!(trail[70..].iter().all(|position| *position == stopped));
}
