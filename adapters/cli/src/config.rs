use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use blast_maze_core::{Difficulty, GameSettings, MazeTheme, PlayerId, RoomPlayer};
use clap::{Args, ValueEnum};

/// Maze theme accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ThemeArg {
    /// Pillar grid with scattered walls.
    Classic,
    /// Open caverns with solid rock.
    Cavern,
    /// Pillar grid packed with walls.
    Fortress,
}

impl From<ThemeArg> for MazeTheme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Classic => Self::Classic,
            ThemeArg::Cavern => Self::Cavern,
            ThemeArg::Fortress => Self::Fortress,
        }
    }
}

/// Difficulty accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum DifficultyArg {
    /// Fewer, weaker monsters.
    Easy,
    /// Baseline tuning.
    Normal,
    /// More, tougher monsters.
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(difficulty: DifficultyArg) -> Self {
        match difficulty {
            DifficultyArg::Easy => Self::Easy,
            DifficultyArg::Normal => Self::Normal,
            DifficultyArg::Hard => Self::Hard,
        }
    }
}

/// Settings file plus flags that override individual values.
#[derive(Args, Clone, Debug, Default)]
pub(crate) struct SettingsArgs {
    /// TOML file with game settings; omitted values keep their defaults.
    #[arg(long, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,
    /// Seed that fully determines the maze and every random roll.
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Tile columns including the border.
    #[arg(long)]
    pub(crate) columns: Option<u32>,
    /// Tile rows including the border.
    #[arg(long)]
    pub(crate) rows: Option<u32>,
    /// Maze theme.
    #[arg(long, value_enum)]
    pub(crate) theme: Option<ThemeArg>,
    /// Monster and wave scaling.
    #[arg(long, value_enum)]
    pub(crate) difficulty: Option<DifficultyArg>,
    /// Session time limit in milliseconds.
    #[arg(long, value_name = "MS")]
    pub(crate) time_limit: Option<u64>,
    /// Number of players seated in the session.
    #[arg(long, default_value_t = 1)]
    pub(crate) players: u32,
}

impl SettingsArgs {
    /// Loads the settings file, applies overrides, and validates the result.
    pub(crate) fn load(&self) -> Result<GameSettings> {
        let mut settings = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading settings from {}", path.display()))?;
                parse_settings(&text)
                    .with_context(|| format!("parsing settings in {}", path.display()))?
            }
            None => GameSettings::default(),
        };

        if let Some(seed) = self.seed {
            settings.maze.seed = seed;
        }
        if let Some(columns) = self.columns {
            settings.maze.columns = columns;
        }
        if let Some(rows) = self.rows {
            settings.maze.rows = rows;
        }
        if let Some(theme) = self.theme {
            settings.maze.theme = theme.into();
        }
        if let Some(difficulty) = self.difficulty {
            settings.difficulty = difficulty.into();
        }
        if let Some(limit) = self.time_limit {
            settings.time_limit_ms = Some(limit);
        }
        settings.max_players = settings.max_players.max(self.players);

        settings.validate().context("invalid game settings")?;
        Ok(settings)
    }

    /// Roster of numbered players for headless sessions.
    pub(crate) fn roster(&self) -> Vec<RoomPlayer> {
        (1..=self.players)
            .map(|id| RoomPlayer {
                id: PlayerId::new(id),
                name: format!("player-{id}"),
            })
            .collect()
    }
}

fn parse_settings(text: &str) -> Result<GameSettings> {
    Ok(toml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = parse_settings(
            r#"
            difficulty = "Hard"

            [maze]
            seed = 42
            theme = "Cavern"

            [bombs]
            fuse_ms = 1500
            "#,
        )
        .expect("settings parse");

        assert_eq!(settings.maze.seed, 42);
        assert_eq!(settings.maze.theme, MazeTheme::Cavern);
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.bombs.fuse_ms, 1500);
        assert_eq!(settings.maze.columns, GameSettings::default().maze.columns);
    }

    #[test]
    fn flags_override_defaults() {
        let args = SettingsArgs {
            seed: Some(7),
            columns: Some(21),
            rows: Some(17),
            theme: Some(ThemeArg::Fortress),
            players: 6,
            ..SettingsArgs::default()
        };

        let settings = args.load().expect("settings load");

        assert_eq!(settings.maze.seed, 7);
        assert_eq!((settings.maze.columns, settings.maze.rows), (21, 17));
        assert_eq!(settings.maze.theme, MazeTheme::Fortress);
        assert_eq!(settings.max_players, 6);
        assert_eq!(args.roster().len(), 6);
    }

    #[test]
    fn invalid_overrides_are_reported() {
        let args = SettingsArgs {
            columns: Some(2),
            players: 1,
            ..SettingsArgs::default()
        };
        assert!(args.load().is_err());
    }
}
