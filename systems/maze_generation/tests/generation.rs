use blast_maze_core::{GameSettings, MazeTheme, MazeView, Tile, TilePos};
use blast_maze_system_maze_generation::{
    connectivity::{spawns_connected, Reachability},
    generate,
};
use proptest::prelude::*;

fn two_player_settings(seed: u64) -> GameSettings {
    let mut settings = GameSettings::default();
    settings.maze.columns = 15;
    settings.maze.rows = 15;
    settings.maze.seed = seed;
    settings.max_players = 2;
    settings
}

#[test]
fn seed_42_two_player_maze_is_connected() {
    let layout = generate(&two_player_settings(42)).expect("layout");

    assert_eq!(
        layout.spawn_points,
        vec![TilePos::new(1, 1), TilePos::new(13, 13)]
    );
    assert!(spawns_connected(&layout));
}

#[test]
fn border_is_solid() {
    let layout = generate(&two_player_settings(42)).expect("layout");
    for column in 0..layout.columns {
        assert_eq!(layout.tile(TilePos::new(column, 0)), Some(Tile::SolidWall));
        assert_eq!(
            layout.tile(TilePos::new(column, layout.rows - 1)),
            Some(Tile::SolidWall)
        );
    }
    for row in 0..layout.rows {
        assert_eq!(layout.tile(TilePos::new(0, row)), Some(Tile::SolidWall));
        assert_eq!(
            layout.tile(TilePos::new(layout.columns - 1, row)),
            Some(Tile::SolidWall)
        );
    }
}

#[test]
fn monster_spawns_sit_far_from_players() {
    let layout = generate(&two_player_settings(3)).expect("layout");
    assert!(!layout.monster_spawns.is_empty());
    for spawn in &layout.monster_spawns {
        let view = MazeView::new(&layout.tiles, layout.columns, layout.rows);
        assert_eq!(view.tile(*spawn), Some(Tile::Empty));
        for player in &layout.spawn_points {
            assert!(player.manhattan_distance(*spawn) > 2);
        }
    }
}

fn theme_strategy() -> impl Strategy<Value = MazeTheme> {
    prop_oneof![
        Just(MazeTheme::Classic),
        Just(MazeTheme::Cavern),
        Just(MazeTheme::Fortress),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_generated_maze_connects_its_spawns(
        seed in any::<u64>(),
        theme in theme_strategy(),
        columns in 9_u32..21,
        rows in 9_u32..21,
        players in 1_u32..=8,
    ) {
        let mut settings = GameSettings::default();
        settings.maze.seed = seed;
        settings.maze.theme = theme;
        settings.maze.columns = columns;
        settings.maze.rows = rows;
        settings.max_players = players;
        settings.maze.spawn_safety_radius = 1;

        if let Ok(layout) = generate(&settings) {
            prop_assert!(spawns_connected(&layout));
            prop_assert_eq!(layout.spawn_points.len(), players as usize);
            prop_assert_eq!(layout.gates.len(), settings.maze.gate_count as usize);

            let view = MazeView::new(&layout.tiles, layout.columns, layout.rows);
            for origin in &layout.spawn_points {
                let reachability = Reachability::from_origin(&view, *origin);
                for other in &layout.spawn_points {
                    prop_assert!(reachability.contains(*other));
                }
                for gate in &layout.gates {
                    prop_assert!(reachability.contains(gate.tile));
                }
            }
        }
    }
}
