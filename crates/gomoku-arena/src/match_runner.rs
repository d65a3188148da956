//! Runs a series of games between two engines.
//!
//! The [`MatchRunner`] owns both players and the optional display for the
//! whole run. It starts them, draws openings from the [`OpeningBook`],
//! alternates colors, records every finished game, and always shuts the
//! processes down again, whether the run completed or was aborted.
//!
//! Statistics stay attached to the engine (slot 0 is the first engine on
//! the command line) while the counters inside each [`PlayerStatistic`] are
//! indexed by the color held in that game.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use gomoku_core::{Color, Position};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{EngineConfig, GameConfig};
use crate::engine_client::{EngineClient, EngineError, GameClient};
use crate::game_runner::{GameError, GameRecord, GameRunner};
use crate::openings::{load_openings, OpeningBook, OpeningError};
use crate::records::{GameLog, RecordWriter};
use crate::stats::{save_stats, PlayerStatistic, StatsError};
use crate::viewer::{DisplayClient, Viewer};

/// How long each process gets to exit after `quit` before it is killed.
pub const QUIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that abort a run.
#[derive(Error, Debug)]
pub enum ArenaError {
    /// An engine or the display could not be launched.
    #[error("Cannot execute \"{}\": {source}", path.display())]
    Startup {
        path: PathBuf,
        #[source]
        source: EngineError,
    },
    #[error(transparent)]
    Opening(#[from] OpeningError),
    /// A game ended without a result.
    #[error("Game {game}: {source}")]
    Game {
        game: usize,
        #[source]
        source: GameError,
    },
    /// A log file could not be created or written.
    #[error("Failed to write \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Starting,
    /// Playing the game with this 0-based index.
    Playing(usize),
    Finishing,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Starting => write!(f, "starting"),
            RunState::Playing(game) => write!(f, "playing game {}", game + 1),
            RunState::Finishing => write!(f, "finishing"),
            RunState::Done => write!(f, "done"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// Results of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    pub games_played: usize,
    /// Engine names in command-line order.
    pub names: [String; 2],
    /// Statistics in command-line order.
    pub stats: [PlayerStatistic; 2],
}

/// Color held by the engine in `slot` (0 or 1).
fn color_of(slot: usize, swapped: bool) -> Color {
    if (slot == 0) != swapped {
        Color::Black
    } else {
        Color::White
    }
}

/// Owns the players and plays the configured series of games.
pub struct MatchRunner {
    config: GameConfig,
    engines: [Box<dyn GameClient>; 2],
    display: Option<Box<dyn DisplayClient>>,
    stats: [PlayerStatistic; 2],
    state: RunState,
}

impl MatchRunner {
    /// Creates a runner over already constructed (not yet started) players.
    pub fn new(
        config: GameConfig,
        engines: [Box<dyn GameClient>; 2],
        display: Option<Box<dyn DisplayClient>>,
    ) -> Self {
        let stats = [
            PlayerStatistic::new(engines[0].name()),
            PlayerStatistic::new(engines[1].name()),
        ];
        Self {
            config,
            engines,
            display,
            stats,
            state: RunState::Idle,
        }
    }

    /// Creates a runner with subprocess engines and, when configured, a
    /// subprocess display.
    pub fn from_config(config: GameConfig, first: EngineConfig, second: EngineConfig) -> Self {
        let display = config.viewer_path.as_ref().map(|path| {
            Box::new(Viewer::new(path.clone(), &config.viewer_args)) as Box<dyn DisplayClient>
        });
        let engines: [Box<dyn GameClient>; 2] = [
            Box::new(EngineClient::new(first)),
            Box::new(EngineClient::new(second)),
        ];
        Self::new(config, engines, display)
    }

    /// Where the run currently is; [`RunState::Idle`] before [`Self::start`].
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Statistics in command-line order.
    pub fn stats(&self) -> &[PlayerStatistic; 2] {
        &self.stats
    }

    /// Plays `number_of_games` games.
    ///
    /// Engines and display are shut down before this returns, also when the
    /// run fails. Games finished before a failure stay counted in
    /// [`Self::stats`] and on disk.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError`] for the first startup, opening, game, or file
    /// error; no further games are played after it.
    pub fn start(&mut self, number_of_games: usize) -> Result<MatchSummary, ArenaError> {
        self.set_state(RunState::Starting);
        let result = self
            .launch()
            .and_then(|()| self.play_games(number_of_games));

        self.set_state(RunState::Finishing);
        self.shutdown();

        match result {
            Ok(games_played) => {
                self.set_state(RunState::Done);
                Ok(MatchSummary {
                    games_played,
                    names: [
                        self.engines[0].name().to_string(),
                        self.engines[1].name().to_string(),
                    ],
                    stats: self.stats.clone(),
                })
            }
            Err(e) => {
                tracing::error!("run aborted: {}", e);
                self.set_state(RunState::Failed);
                Err(e)
            }
        }
    }

    fn set_state(&mut self, state: RunState) {
        info!("run state: {} -> {}", self.state, state);
        self.state = state;
    }

    fn launch(&mut self) -> Result<(), ArenaError> {
        for engine in &mut self.engines {
            engine.start().map_err(|source| ArenaError::Startup {
                path: engine.executable().to_path_buf(),
                source,
            })?;
            info!("started {} ({})", engine.name(), engine.executable().display());
        }

        if let Some(viewer) = &mut self.display {
            viewer.start().map_err(|source| ArenaError::Startup {
                path: viewer.executable().to_path_buf(),
                source,
            })?;
            info!("started display ({})", viewer.executable().display());
        }
        Ok(())
    }

    /// Returns the number of games played.
    fn play_games(&mut self, number_of_games: usize) -> Result<usize, ArenaError> {
        let board_size = self.config.board_size;
        let openings = load_openings(self.config.opening_positions_path.as_deref(), board_size)?;
        info!("loaded {} opening(s)", openings.len());
        let mut book = OpeningBook::new(openings, self.config.shuffle_openings, self.config.seed);

        let log_path = self.config.game_log_path.clone();
        let mut game_log = GameLog::create(&log_path).map_err(|source| ArenaError::Io {
            path: log_path.clone(),
            source,
        })?;
        let mut records = match &self.config.game_records_path {
            Some(path) => Some((
                path.clone(),
                RecordWriter::create(path).map_err(|source| ArenaError::Io {
                    path: path.clone(),
                    source,
                })?,
            )),
            None => None,
        };

        let mut opening = Position::new(board_size);
        for game_index in 0..number_of_games {
            self.set_state(RunState::Playing(game_index));
            let game = game_index + 1;
            let odd = game_index % 2 == 1;
            let swapped = self.config.swap_player && odd;
            if !(swapped && self.config.use_same_position_when_swap_player) {
                opening = book.next_opening();
            }

            println!("Game {}", game);
            let record = self
                .play_one(&opening, swapped)
                .map_err(|source| ArenaError::Game { game, source })?;

            self.record_result(&record, swapped);

            game_log
                .append(&record)
                .map_err(|source| ArenaError::Io {
                    path: log_path.clone(),
                    source,
                })?;
            if let Some((path, writer)) = &mut records {
                writer.append(game, &record).map_err(|source| ArenaError::Io {
                    path: path.clone(),
                    source,
                })?;
            }

            self.print_scores();
            save_stats(&self.config.game_stats_path, &self.stats)?;
        }

        Ok(number_of_games)
    }

    fn play_one(&mut self, opening: &Position, swapped: bool) -> Result<GameRecord, GameError> {
        let [first, second] = &mut self.engines;
        let (black, white) = if swapped {
            (second, first)
        } else {
            (first, second)
        };
        let display = self
            .display
            .as_mut()
            .map(|d| d.as_mut() as &mut dyn DisplayClient);

        let mut runner = GameRunner::new(
            black.as_mut(),
            white.as_mut(),
            display,
            self.config.time_limit_ms_per_move,
        );
        runner.play_game(opening)
    }

    fn record_result(&mut self, record: &GameRecord, swapped: bool) {
        match record.result.winner() {
            Some(winner) => {
                println!("Gameover: {} wins", record.name_of(winner));
                for (slot, stats) in self.stats.iter_mut().enumerate() {
                    let color = color_of(slot, swapped);
                    if color == winner {
                        stats.record_win(color);
                    } else {
                        stats.record_loss(color);
                    }
                }
            }
            None => {
                println!("Gameover: Draw");
                for (slot, stats) in self.stats.iter_mut().enumerate() {
                    stats.record_draw(color_of(slot, swapped));
                }
            }
        }
        info!(
            "{} (black) vs {} (white): {} after {} moves",
            record.black_name,
            record.white_name,
            record.result.as_str(),
            record.moves.len()
        );
    }

    fn print_scores(&self) {
        println!("////////////////////");
        for (engine, stats) in self.engines.iter().zip(&self.stats) {
            println!("{}", stats.summary(engine.name()));
        }
        println!("////////////////////");
    }

    /// Asks every process to quit and kills the ones that do not.
    fn shutdown(&mut self) {
        for engine in &mut self.engines {
            if !engine.quit(QUIT_TIMEOUT) {
                warn!(
                    "{} did not exit within {:?}, killing it",
                    engine.name(),
                    QUIT_TIMEOUT
                );
                engine.kill();
            }
        }
        if let Some(viewer) = &mut self.display {
            if !viewer.quit(QUIT_TIMEOUT) {
                warn!("display did not exit within {:?}, killing it", QUIT_TIMEOUT);
                viewer.kill();
            }
        }
    }
}
