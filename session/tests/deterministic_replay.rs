use blast_maze_core::{
    BombOwner, Direction, GameSettings, InputKind, InputOutcome, PlayerId, PlayerInput,
    RoomPlayer, StateDelta,
};
use blast_maze_session::{InputDisposition, Session};
use blast_maze_world::query;
use sha2::{Digest, Sha256};

const TICKS: u64 = 360;

fn roster() -> Vec<RoomPlayer> {
    vec![
        RoomPlayer {
            id: PlayerId::new(1),
            name: String::from("ada"),
        },
        RoomPlayer {
            id: PlayerId::new(2),
            name: String::from("brook"),
        },
    ]
}

fn settings(seed: u64) -> GameSettings {
    let mut settings = GameSettings::default();
    settings.maze.seed = seed;
    settings
}

/// Inputs issued before the given tick.
fn script(tick: u64) -> Vec<(PlayerId, InputKind)> {
    let first = PlayerId::new(1);
    let second = PlayerId::new(2);
    match tick {
        0 => vec![
            (
                first,
                InputKind::Move {
                    direction: Direction::East,
                },
            ),
            (
                second,
                InputKind::Move {
                    direction: Direction::West,
                },
            ),
        ],
        20 => vec![(first, InputKind::PlaceBomb)],
        21 => vec![(
            first,
            InputKind::Move {
                direction: Direction::West,
            },
        )],
        40 => vec![(first, InputKind::Stop), (second, InputKind::PlaceBomb)],
        41 => vec![(
            second,
            InputKind::Move {
                direction: Direction::East,
            },
        )],
        90 => vec![(second, InputKind::Stop)],
        _ => Vec::new(),
    }
}

fn record(seed: u64) -> Vec<StateDelta> {
    let mut session = Session::start(settings(seed), &roster()).expect("session starts");
    let mut sequence = 0;
    let mut deltas = Vec::new();
    for tick in 0..TICKS {
        for (player, kind) in script(tick) {
            sequence += 1;
            let input = PlayerInput {
                sequence,
                kind,
                timestamp_ms: tick * 16,
            };
            assert_eq!(session.enqueue(player, input), InputDisposition::Queued);
        }
        let Some(report) = session.tick() else {
            break;
        };
        deltas.push(report.delta);
    }
    deltas
}

fn fingerprint(deltas: &[StateDelta]) -> (Vec<Vec<u8>>, String) {
    let mut hasher = Sha256::new();
    let encoded: Vec<Vec<u8>> = deltas
        .iter()
        .map(|delta| bincode::serialize(delta).expect("delta encodes"))
        .collect();
    for bytes in &encoded {
        hasher.update(bytes);
    }
    let digest = hasher.finalize();
    let hex = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    (encoded, hex)
}

#[test]
fn replay_produces_identical_delta_bytes() {
    let (first_bytes, first) = fingerprint(&record(42));
    let (second_bytes, second) = fingerprint(&record(42));

    assert_eq!(first_bytes, second_bytes);
    assert_eq!(first, second);

    let (_, other) = fingerprint(&record(43));
    assert_ne!(first, other, "a different seed should change the stream");
}

#[test]
fn delta_ticks_are_contiguous() {
    let deltas = record(7);
    for (index, delta) in deltas.iter().enumerate() {
        assert_eq!(delta.tick, index as u64 + 1);
    }
}

#[test]
fn duplicate_inputs_apply_once() {
    let mut session = Session::start(settings(42), &roster()).expect("session starts");
    let player = PlayerId::new(1);
    let bomb = PlayerInput {
        sequence: 1,
        kind: InputKind::PlaceBomb,
        timestamp_ms: 0,
    };

    assert_eq!(session.enqueue(player, bomb), InputDisposition::Queued);
    assert_eq!(session.enqueue(player, bomb), InputDisposition::Duplicate);
    let report = session.tick().expect("running");

    assert_eq!(report.delta.acks.len(), 1);
    assert_eq!(report.delta.acks[0].outcome, InputOutcome::Applied);
    assert_eq!(report.delta.changed_bombs.len(), 1);
    assert_eq!(query::bomb_view(session.world()).iter().count(), 1);

    let again = PlayerInput {
        sequence: 2,
        ..bomb
    };
    assert_eq!(session.enqueue(player, again), InputDisposition::Queued);
    let report = session.tick().expect("running");
    assert!(matches!(
        report.delta.acks[0].outcome,
        InputOutcome::Rejected { .. }
    ));
    assert_eq!(query::bomb_view(session.world()).iter().count(), 1);
}

#[test]
fn disconnected_players_bombs_still_explode() {
    let mut session = Session::start(settings(42), &roster()).expect("session starts");
    let player = PlayerId::new(1);
    let _ = session.enqueue(
        player,
        PlayerInput {
            sequence: 1,
            kind: InputKind::PlaceBomb,
            timestamp_ms: 0,
        },
    );
    let _ = session.tick().expect("running");

    session.disconnect(player);
    let report = session.tick().expect("running");
    assert!(report
        .delta
        .changed_players
        .iter()
        .any(|snapshot| snapshot.id == player && !snapshot.connected));

    let mut exploded = false;
    for _ in 0..200 {
        let Some(report) = session.tick() else {
            break;
        };
        exploded |= report
            .delta
            .new_explosions
            .iter()
            .any(|explosion| explosion.owner == BombOwner::Player(player));
        if exploded {
            break;
        }
    }
    assert!(exploded, "the absent player's bomb never went off");

    let end = session.abort("test finished").expect("first end");
    let totals = end
        .statistics
        .players
        .iter()
        .find(|totals| totals.player == player)
        .expect("statistics for the player");
    assert_eq!(totals.bombs_placed, 1);
    assert!(session.abort("twice").is_none());
}
