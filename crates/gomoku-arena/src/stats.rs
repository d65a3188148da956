//! Per-engine win/loss/draw statistics.
//!
//! Counters are two-element arrays indexed by the color the engine held in
//! the game being counted ([`Color::index`]), not by a fixed engine slot.
//! With color swapping, an engine's `win_count[0]` therefore counts its wins
//! as Black across all games, whichever seat it started in.

use gomoku_core::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when persisting statistics.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Failed to write statistics: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize statistics: {0}")]
    Json(#[from] serde_json::Error),
}

/// Running results of one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatistic {
    pub label: String,
    pub win_count: [u32; 2],
    pub loss_count: [u32; 2],
    pub draw_count: [u32; 2],
}

impl PlayerStatistic {
    /// All counters start at zero.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Counts a win while playing `color`.
    pub fn record_win(&mut self, color: Color) {
        self.win_count[color.index()] += 1;
    }

    /// Counts a loss while playing `color`.
    pub fn record_loss(&mut self, color: Color) {
        self.loss_count[color.index()] += 1;
    }

    /// Counts a draw while playing `color`.
    pub fn record_draw(&mut self, color: Color) {
        self.draw_count[color.index()] += 1;
    }

    /// Wins with either color.
    pub fn total_wins(&self) -> u32 {
        self.win_count.iter().sum()
    }

    /// Losses with either color.
    pub fn total_losses(&self) -> u32 {
        self.loss_count.iter().sum()
    }

    /// Draws with either color.
    pub fn total_draws(&self) -> u32 {
        self.draw_count.iter().sum()
    }

    /// Every finished game this engine played.
    pub fn total_games(&self) -> u32 {
        self.total_wins() + self.total_losses() + self.total_draws()
    }

    /// Score fraction over all games, a draw counting as half a win.
    ///
    /// Returns 0.0 before the first game.
    pub fn total_win_rate(&self) -> f64 {
        win_rate(self.total_wins(), self.total_losses(), self.total_draws())
    }

    /// Games played holding `color`.
    pub fn games_as(&self, color: Color) -> u32 {
        let i = color.index();
        self.win_count[i] + self.loss_count[i] + self.draw_count[i]
    }

    /// Score fraction of the games played holding `color`.
    pub fn win_rate_as(&self, color: Color) -> f64 {
        let i = color.index();
        win_rate(self.win_count[i], self.loss_count[i], self.draw_count[i])
    }

    /// One-line score summary: `name: W-D-L (WinRate: x%)`.
    pub fn summary(&self, name: &str) -> String {
        format!(
            "{}: {}-{}-{} (WinRate: {:.2}%)",
            name,
            self.total_wins(),
            self.total_draws(),
            self.total_losses(),
            self.total_win_rate() * 100.0
        )
    }
}

fn win_rate(wins: u32, losses: u32, draws: u32) -> f64 {
    let games = wins + losses + draws;
    if games == 0 {
        return 0.0;
    }
    (f64::from(wins) + 0.5 * f64::from(draws)) / f64::from(games)
}

/// Rewrites the statistics file with the current counters of all players.
///
/// # Errors
///
/// Returns [`StatsError`] if the file cannot be written.
pub fn save_stats<P: AsRef<Path>>(path: P, players: &[PlayerStatistic]) -> Result<(), StatsError> {
    let json = serde_json::to_string_pretty(players)?;
    std::fs::write(path, json)?;
    Ok(())
}
