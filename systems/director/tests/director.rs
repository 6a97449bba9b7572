use std::time::Duration;

use blast_maze_core::{
    AiGoal, BombView, Command, DamageSource, Direction, Event, GameSettings, MazeLayout, MazeView,
    MonsterId, MonsterKind, MonsterSnapshot, MonsterView, PlayerId, PlayerView, Tile, TilePos,
};
use blast_maze_system_director::Director;
use blast_maze_system_movement::Movement;
use blast_maze_world::{self as world, query, World};

const TICK: Duration = Duration::from_millis(50);

fn open_layout(spawns: Vec<TilePos>) -> MazeLayout {
    let columns = 11;
    let rows = 11;
    let mut tiles = Vec::new();
    for row in 0..rows {
        for column in 0..columns {
            let border = row == 0 || column == 0 || row == rows - 1 || column == columns - 1;
            tiles.push(if border { Tile::SolidWall } else { Tile::Empty });
        }
    }
    MazeLayout {
        columns,
        rows,
        tiles,
        spawn_points: spawns,
        gates: Vec::new(),
        power_up_spots: Vec::new(),
        monster_spawns: Vec::new(),
        seed: 11,
        attempts: 1,
    }
}

fn set_tile(layout: &mut MazeLayout, tile: TilePos, contents: Tile) {
    let index = (tile.row() * layout.columns + tile.column()) as usize;
    layout.tiles[index] = contents;
}

struct Harness {
    world: World,
    director: Director,
    movement: Movement,
    pending: Vec<Event>,
}

impl Harness {
    fn boot(layout: MazeLayout, players: u32) -> Self {
        let mut settings = GameSettings::default();
        settings.power_ups.chance = 0.0;
        let mut world = World::new(settings.clone());
        let mut pending = Vec::new();
        world::apply(&mut world, Command::LoadMaze { layout }, &mut pending);
        for id in 1..=players {
            world::apply(
                &mut world,
                Command::AddPlayer {
                    player: PlayerId::new(id),
                    name: format!("player-{id}"),
                },
                &mut pending,
            );
        }
        Self {
            world,
            director: Director::new(&settings),
            movement: Movement::new(&settings),
            pending,
        }
    }

    fn spawn(&mut self, kind: MonsterKind, tile: TilePos) -> MonsterId {
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::SpawnMonster { kind, tile },
            &mut events,
        );
        let id = events
            .iter()
            .find_map(|event| match event {
                Event::MonsterSpawned { monster, .. } => Some(*monster),
                _ => None,
            })
            .expect("monster spawned");
        self.pending.extend(events);
        id
    }

    /// Runs one tick and returns the director's commands plus every world event.
    fn step(&mut self) -> (Vec<Command>, Vec<Event>) {
        let mut events = std::mem::take(&mut self.pending);
        let mut moves = Vec::new();
        {
            let maze = query::maze(&self.world).view();
            self.movement.handle(
                TICK,
                &query::player_view(&self.world),
                &query::monster_view(&self.world),
                &query::bomb_view(&self.world),
                &maze,
                &mut moves,
            );
        }
        for command in moves {
            world::apply(&mut self.world, command, &mut events);
        }
        world::apply(&mut self.world, Command::Tick { dt: TICK }, &mut events);

        let mut commands = Vec::new();
        {
            let maze = query::maze(&self.world).view();
            self.director.handle(
                &events,
                &query::player_view(&self.world),
                &query::monster_view(&self.world),
                &query::bomb_view(&self.world),
                &maze,
                &mut commands,
            );
        }
        let mut produced = Vec::new();
        for command in commands.clone() {
            world::apply(&mut self.world, command, &mut produced);
        }
        events.extend(produced.iter().cloned());
        self.pending = produced;
        (commands, events)
    }
}

#[test]
fn hunter_closes_in_and_strikes() {
    let mut harness = Harness::boot(open_layout(vec![TilePos::new(2, 5)]), 1);
    let hunter = harness.spawn(MonsterKind::Hunter, TilePos::new(7, 5));

    let mut struck = false;
    for _ in 0..120 {
        let (_, events) = harness.step();
        struck |= events.iter().any(|event| {
            matches!(
                event,
                Event::PlayerDamaged {
                    source: DamageSource::Monster(monster),
                    ..
                } if *monster == hunter
            )
        });
        if struck {
            break;
        }
    }

    assert!(struck, "hunter never reached the player");
    assert_eq!(harness.director.goal(hunter), Some(AiGoal::Hunt));
    assert_eq!(harness.director.target(hunter), Some(PlayerId::new(1)));
}

#[test]
fn equidistant_players_resolve_to_lowest_id() {
    let mut harness = Harness::boot(
        open_layout(vec![TilePos::new(4, 7), TilePos::new(4, 3)]),
        2,
    );
    let hunter = harness.spawn(MonsterKind::Hunter, TilePos::new(4, 5));

    let _ = harness.step();

    assert_eq!(harness.director.target(hunter), Some(PlayerId::new(1)));
}

#[test]
fn walled_in_hunter_falls_back_to_patrol() {
    let mut layout = open_layout(vec![TilePos::new(2, 5)]);
    for wall in [
        TilePos::new(6, 5),
        TilePos::new(8, 5),
        TilePos::new(7, 4),
        TilePos::new(7, 6),
    ] {
        set_tile(&mut layout, wall, Tile::SolidWall);
    }
    let mut harness = Harness::boot(layout, 1);
    let hunter = harness.spawn(MonsterKind::Hunter, TilePos::new(7, 5));

    let (commands, _) = harness.step();

    assert_eq!(harness.director.goal(hunter), Some(AiGoal::Patrol));
    assert_eq!(harness.director.target(hunter), None);
    assert!(commands
        .iter()
        .all(|command| !matches!(command, Command::SetMonsterIntent { direction: Some(_), .. })));
}

#[test]
fn boss_opens_with_a_ready_attack() {
    let mut harness = Harness::boot(open_layout(vec![TilePos::new(5, 4)]), 1);
    let boss = harness.spawn(MonsterKind::Overlord, TilePos::new(5, 6));

    let (commands, _) = harness.step();

    let attacks = commands
        .iter()
        .filter(|command| match command {
            Command::DamagePlayer {
                source: DamageSource::Monster(source),
                ..
            } => *source == boss,
            Command::SpawnMonster { .. } => true,
            _ => false,
        })
        .count();
    assert!(attacks >= 1, "boss attack missing from {commands:?}");
}

fn boss_snapshot(health: u32, phase: u32) -> MonsterSnapshot {
    MonsterSnapshot {
        id: MonsterId::new(0),
        kind: MonsterKind::Overlord,
        position: TilePos::new(3, 3).center(),
        facing: Direction::South,
        moving: None,
        health,
        max_health: 400,
        anchor: TilePos::new(3, 3),
        boss_phase: Some(phase),
    }
}

#[test]
fn boss_dropping_below_half_advances_exactly_one_phase() {
    let tiles = vec![Tile::Empty; 49];
    let maze = MazeView::new(&tiles, 7, 7);
    let mut director = Director::new(&GameSettings::default());
    let time = [Event::TimeAdvanced { dt: TICK }];
    let mut advances = 0;

    for (health, phase) in [(220, 0), (180, 0), (180, 0), (180, 1), (170, 1)] {
        let mut out = Vec::new();
        director.handle(
            &time,
            &PlayerView::default(),
            &MonsterView::from_snapshots(vec![boss_snapshot(health, phase)]),
            &BombView::default(),
            &maze,
            &mut out,
        );
        for command in out {
            if let Command::AdvanceBossPhase { boss, to_phase } = command {
                assert_eq!(boss, MonsterId::new(0));
                assert_eq!(to_phase, 1);
                advances += 1;
            }
        }
    }

    assert_eq!(advances, 1);
}

#[test]
fn phase_entry_summons_minions() {
    let tiles = vec![Tile::Empty; 49];
    let maze = MazeView::new(&tiles, 7, 7);
    let mut director = Director::new(&GameSettings::default());
    let mut out = Vec::new();

    director.handle(
        &[Event::BossPhaseAdvanced {
            boss: MonsterId::new(0),
            phase: 1,
        }],
        &PlayerView::default(),
        &MonsterView::from_snapshots(vec![boss_snapshot(180, 1)]),
        &BombView::default(),
        &maze,
        &mut out,
    );

    let summoned: Vec<_> = out
        .iter()
        .filter_map(|command| match command {
            Command::SpawnMonster { kind, tile } => Some((*kind, *tile)),
            _ => None,
        })
        .collect();
    assert_eq!(summoned.len(), 2);
    assert!(summoned
        .iter()
        .all(|(kind, tile)| *kind == MonsterKind::Hunter && tile.manhattan_distance(TilePos::new(3, 3)) == 1));
}
