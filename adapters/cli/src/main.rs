#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs headless Blast Maze sessions.

mod config;
mod script;
mod snapshot_transfer;

use std::{
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result};
use blast_maze_core::{GameStatistics, MazeLayout, ServerMessage, Tile, TilePos};
use blast_maze_session::{start_game, InputDisposition, Session};
use blast_maze_system_maze_generation::generate;
use clap::{Parser, Subcommand};
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::SettingsArgs;
use script::Script;

/// Headless driver for the Blast Maze simulation core.
#[derive(Debug, Parser)]
#[command(name = "blast-maze", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Simulate a session as fast as possible and print its statistics.
    Run {
        #[command(flatten)]
        settings: SettingsArgs,
        /// JSON-lines file of scripted client inputs.
        #[arg(long, value_name = "PATH")]
        script: Option<PathBuf>,
        /// Stop after this many ticks if the session has not ended.
        #[arg(long, default_value_t = 3_600)]
        ticks: u64,
        /// Print every non-quiet delta as a JSON line.
        #[arg(long)]
        deltas: bool,
        /// Print a transfer string of the final snapshot.
        #[arg(long)]
        snapshot: bool,
    },
    /// Run a session in real time on the async runner, streaming player one's feed.
    Serve {
        #[command(flatten)]
        settings: SettingsArgs,
        /// JSON-lines file of scripted client inputs.
        #[arg(long, value_name = "PATH")]
        script: Option<PathBuf>,
        /// Shut the session down after this many seconds.
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
    /// Generate a maze and print it as text.
    Maze {
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Decode a snapshot transfer string and print it as JSON.
    Decode {
        /// String produced by `run --snapshot`.
        value: String,
    },
}

/// Entry point for the Blast Maze command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            settings,
            script,
            ticks,
            deltas,
            snapshot,
        } => run(&settings, script, ticks, deltas, snapshot),
        Command::Serve {
            settings,
            script,
            seconds,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("building the async runtime")?;
            let statistics = runtime.block_on(serve(&settings, script, seconds))?;
            print_statistics(&statistics)
        }
        Command::Maze { settings } => {
            let layout = generate(&settings.load()?).context("generating maze")?;
            print!("{}", render_layout(&layout));
            println!("seed {} after {} attempt(s)", layout.seed, layout.attempts);
            Ok(())
        }
        Command::Decode { value } => {
            let snapshot =
                snapshot_transfer::decode(&value).context("decoding snapshot string")?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_script(path: Option<PathBuf>) -> Result<Script> {
    path.map_or_else(|| Ok(Script::default()), |path| Script::load(&path))
}

fn run(
    settings: &SettingsArgs,
    script: Option<PathBuf>,
    ticks: u64,
    deltas: bool,
    snapshot: bool,
) -> Result<()> {
    let script = load_script(script)?;
    let mut session =
        Session::start(settings.load()?, &settings.roster()).context("starting session")?;
    let mut out = io::stdout().lock();

    let mut end = None;
    for tick in 0..ticks {
        for (player, input) in script.inputs_at(tick) {
            let disposition = session.enqueue(*player, *input);
            if disposition != InputDisposition::Queued {
                warn!(tick, player = player.get(), ?disposition, "scripted input not queued");
            }
        }
        let Some(report) = session.tick() else {
            break;
        };
        if deltas && !report.delta.is_quiet() {
            serde_json::to_writer(&mut out, &ServerMessage::Delta(report.delta))?;
            writeln!(out)?;
        }
        if report.ended.is_some() {
            end = report.ended;
            break;
        }
    }

    let end = match end {
        Some(end) => end,
        None => session
            .abort("tick budget exhausted")
            .context("session ended without statistics")?,
    };
    info!(outcome = ?end.outcome, tick = end.tick, "headless run finished");
    if deltas {
        serde_json::to_writer(&mut out, &end.message())?;
        writeln!(out)?;
    }
    if snapshot {
        writeln!(out, "{}", snapshot_transfer::encode(&session.full_snapshot())?)?;
    }
    drop(out);
    print_statistics(&end.statistics)
}

async fn serve(
    settings: &SettingsArgs,
    script: Option<PathBuf>,
    seconds: u64,
) -> Result<GameStatistics> {
    let script = load_script(script)?;
    let game_settings = settings.load()?;
    let tick = game_settings.sync.tick_duration();
    let roster = settings.roster();
    let handle = start_game(game_settings, &roster).context("starting session")?;

    let observer = roster
        .first()
        .and_then(|player| handle.feed(player.id))
        .context("session has no players")?;
    let printer = tokio::spawn(async move {
        while let Some(batch) = observer.next_batch().await {
            for message in batch {
                match serde_json::to_string(&message) {
                    Ok(line) => println!("{line}"),
                    Err(error) => warn!(%error, "message could not be printed"),
                }
            }
        }
    });

    let started = Instant::now();
    let deadline = started + Duration::from_secs(seconds);
    for (at, player, input) in script.timeline() {
        let due = started + tick.saturating_mul(u32::try_from(at).unwrap_or(u32::MAX));
        if due > deadline {
            break;
        }
        tokio::time::sleep_until(due).await;
        if handle.submit(player, input).is_err() {
            break;
        }
    }

    tokio::select! {
        () = tokio::time::sleep_until(deadline) => handle.shutdown(),
        () = handle.closed() => {}
    }
    let statistics = handle
        .finish()
        .await
        .context("session stopped without statistics")?;
    printer.await.context("printing the session feed")?;
    Ok(statistics)
}

fn print_statistics(statistics: &GameStatistics) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(statistics)?);
    Ok(())
}

fn render_layout(layout: &MazeLayout) -> String {
    let mut text = String::new();
    for row in 0..layout.rows {
        for column in 0..layout.columns {
            let tile = TilePos::new(column, row);
            let symbol = if layout.spawn_points.contains(&tile) {
                'S'
            } else if layout.monster_spawns.contains(&tile) {
                'M'
            } else if layout.gates.iter().any(|gate| gate.tile == tile) {
                'G'
            } else {
                match layout.tile(tile) {
                    Some(Tile::SolidWall) | None => '#',
                    Some(Tile::DestructibleWall) => '+',
                    Some(Tile::Gate { .. }) => 'G',
                    Some(Tile::Empty) => '.',
                }
            };
            text.push(symbol);
        }
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_maze_core::GameSettings;

    #[test]
    fn rendered_layout_marks_spawns_and_border() {
        let mut settings = GameSettings::default();
        settings.maze.seed = 42;
        settings.maze.columns = 11;
        settings.maze.rows = 9;
        settings.max_players = 1;
        let layout = generate(&settings).expect("maze generates");

        let text = render_layout(&layout);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 9);
        assert!(lines.iter().all(|line| line.len() == 11));
        assert_eq!(lines[0], "###########");
        assert_eq!(lines[1].chars().nth(1), Some('S'));
    }

    #[test]
    fn cli_arguments_parse() {
        let cli = Cli::try_parse_from([
            "blast-maze",
            "run",
            "--seed",
            "42",
            "--players",
            "2",
            "--theme",
            "cavern",
            "--deltas",
        ])
        .expect("arguments parse");
        match cli.command {
            Command::Run {
                settings, deltas, ..
            } => {
                assert_eq!(settings.seed, Some(42));
                assert_eq!(settings.players, 2);
                assert!(deltas);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
