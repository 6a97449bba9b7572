use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use blast_maze_core::{PlayerId, PlayerInput};
use blast_maze_session::decode_input;
use serde::Deserialize;

/// One line of an input script.
///
/// ```json
/// {"tick": 12, "player": 1, "message": {"type": "place_bomb", "sequence": 3, "timestamp_ms": 200}}
/// ```
#[derive(Debug, Deserialize)]
struct ScriptLine {
    tick: u64,
    player: u32,
    message: serde_json::Value,
}

/// Client inputs keyed by the tick before which they are enqueued.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Script {
    entries: BTreeMap<u64, Vec<(PlayerId, PlayerInput)>>,
}

impl Script {
    /// Reads a JSON-lines script; blank lines and `#` comments are skipped.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing script {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        let mut script = Self::default();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let number = index + 1;
            let entry: ScriptLine = serde_json::from_str(line)
                .with_context(|| format!("line {number} is not a script entry"))?;
            let wire = serde_json::to_vec(&entry.message)?;
            let input = decode_input(&wire)
                .with_context(|| format!("line {number} carries an invalid client message"))?;
            script
                .entries
                .entry(entry.tick)
                .or_default()
                .push((PlayerId::new(entry.player), input));
        }
        Ok(script)
    }

    /// Inputs to enqueue before the provided tick, in file order.
    pub(crate) fn inputs_at(&self, tick: u64) -> &[(PlayerId, PlayerInput)] {
        self.entries
            .get(&tick)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every input with its tick, in tick order.
    pub(crate) fn timeline(&self) -> impl Iterator<Item = (u64, PlayerId, PlayerInput)> + '_ {
        self.entries.iter().flat_map(|(tick, inputs)| {
            inputs
                .iter()
                .map(move |(player, input)| (*tick, *player, *input))
        })
    }
}
