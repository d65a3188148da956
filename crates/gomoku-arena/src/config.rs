//! Configuration file loading for the arena.
//!
//! A run is described by one [`GameConfig`] and two [`EngineConfig`]s. Both
//! are plain values: they are read once at startup and never mutated. Files
//! are JSON unless their extension is `.toml`. Keys are snake_case; the
//! PascalCase keys written by earlier versions of the server are accepted as
//! aliases so existing `game_config.json` files keep working.

use gomoku_core::{MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse a JSON configuration file.
    #[error("Failed to parse config: {0}")]
    JsonError(#[from] serde_json::Error),
    /// Failed to parse a TOML configuration file.
    #[error("Failed to parse config: {0}")]
    TomlError(#[from] toml::de::Error),
    /// The board size is outside the supported range.
    #[error("Board size {0} is out of range (5..=19)")]
    InvalidBoardSize(usize),
}

/// Settings for a whole run of games.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GameConfig {
    /// Edge length of the board, 5 to 19.
    #[serde(alias = "BoardSize")]
    pub board_size: usize,
    /// Thinking time sent with every `go` command. Advisory only.
    #[serde(alias = "TimeLimitMsPerMove")]
    pub time_limit_ms_per_move: u64,
    /// Alternate colors between consecutive games.
    #[serde(alias = "SwapPlayer")]
    pub swap_player: bool,
    /// Replay the previous opening when colors are swapped.
    #[serde(alias = "UseSamePositionWhenSwapPlayer")]
    pub use_same_position_when_swap_player: bool,
    /// File with one opening position per line; `None` starts every game
    /// from the empty board.
    #[serde(alias = "OpeningPositionsPath", deserialize_with = "empty_path_as_none")]
    pub opening_positions_path: Option<PathBuf>,
    /// Shuffle the openings on load and whenever the pool is exhausted.
    #[serde(alias = "ShuffleOpenings")]
    pub shuffle_openings: bool,
    /// One line per finished game.
    #[serde(alias = "GameLogPath")]
    pub game_log_path: PathBuf,
    /// Per-engine statistics, rewritten after every game.
    #[serde(alias = "GameStatsPath")]
    pub game_stats_path: PathBuf,
    /// Optional JSON-lines file with a detailed record of every game.
    #[serde(alias = "GameRecordsPath", deserialize_with = "empty_path_as_none")]
    pub game_records_path: Option<PathBuf>,
    /// Executable of the optional board display.
    #[serde(alias = "ViewerPath", deserialize_with = "empty_path_as_none")]
    pub viewer_path: Option<PathBuf>,
    /// Whitespace-separated arguments for the display.
    #[serde(alias = "ViewerArgs")]
    pub viewer_args: String,
    /// Seed for the opening shuffle; random when absent.
    #[serde(alias = "Seed")]
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: 9,
            time_limit_ms_per_move: 5000,
            swap_player: true,
            use_same_position_when_swap_player: true,
            opening_positions_path: None,
            shuffle_openings: true,
            game_log_path: PathBuf::from("game.txt"),
            game_stats_path: PathBuf::from("stats.json"),
            game_records_path: None,
            viewer_path: None,
            viewer_args: String::new(),
            seed: None,
        }
    }
}

impl GameConfig {
    /// Loads and validates a game configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or if the
    /// board size is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = load_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&self.board_size) {
            return Err(ConfigError::InvalidBoardSize(self.board_size));
        }
        Ok(())
    }
}

/// How to launch one engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Display name used in logs, statistics, and error messages.
    #[serde(alias = "Name")]
    pub name: String,
    /// Path to the engine executable.
    #[serde(alias = "Path")]
    pub path: PathBuf,
    /// Whitespace-separated command-line arguments.
    #[serde(default, alias = "Args")]
    pub args: String,
    /// Working directory for the engine process; inherited when absent.
    #[serde(default, alias = "WorkDir", deserialize_with = "empty_path_as_none")]
    pub work_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Loads an engine configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_file(path.as_ref())
    }
}

/// Reads `path` as TOML when it has a `.toml` extension, JSON otherwise.
fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        Ok(toml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

/// Treats a missing, null, or empty path as "not configured".
fn empty_path_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()).map(PathBuf::from))
}
