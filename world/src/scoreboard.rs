use std::collections::BTreeMap;

use blast_maze_core::{PlayerId, PlayerStatistics};

/// Per-player totals accumulated over the session.
///
/// Entries outlive the player so that statistics still cover players who left.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scoreboard {
    entries: BTreeMap<PlayerId, PlayerStatistics>,
}

impl Scoreboard {
    pub(crate) fn register(&mut self, player: PlayerId, name: &str) {
        let _ = self
            .entries
            .entry(player)
            .or_insert_with(|| PlayerStatistics {
                player,
                name: name.to_owned(),
                kills: 0,
                deaths: 0,
                score: 0,
                bombs_placed: 0,
                walls_destroyed: 0,
                power_ups_collected: 0,
            });
    }

    pub(crate) fn update(&mut self, player: PlayerId, apply: impl FnOnce(&mut PlayerStatistics)) {
        if let Some(entry) = self.entries.get_mut(&player) {
            apply(entry);
        }
    }

    pub(crate) fn statistics(&self) -> Vec<PlayerStatistics> {
        self.entries.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_keeps_first_name() {
        let mut scoreboard = Scoreboard::default();
        scoreboard.register(PlayerId::new(2), "ada");
        scoreboard.register(PlayerId::new(2), "grace");
        scoreboard.update(PlayerId::new(2), |entry| entry.kills += 1);
        scoreboard.update(PlayerId::new(9), |entry| entry.kills += 1);

        let statistics = scoreboard.statistics();
        assert_eq!(statistics.len(), 1);
        assert_eq!(statistics[0].name, "ada");
        assert_eq!(statistics[0].kills, 1);
    }
}
