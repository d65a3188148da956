//! Plays a single game between two engines.
//!
//! [`GameRunner`] borrows the two players for the duration of one game,
//! keeps the authoritative [`Position`], validates every reply against it,
//! and stops at the first five-in-a-row or when the board is full. Protocol
//! and legality violations end the game with a [`GameError`]; there is no
//! adjudication and no retry.

use gomoku_core::{Color, MoveError, Position};
use thiserror::Error;
use tracing::debug;

use crate::engine_client::{EngineError, GameClient};
use crate::viewer::DisplayClient;

/// Errors that end a game without a result.
#[derive(Error, Debug)]
pub enum GameError {
    /// The engine answered `go` with something that is not a coordinate, or
    /// exited before answering.
    #[error("\"{engine}\" returned invalid coordinate.")]
    IllegalReturn { engine: String },
    /// The engine named a coordinate the board rejects.
    #[error("move {coordinate} which played by \"{engine}\" is illegal: {reason}")]
    IllegalMove {
        engine: String,
        coordinate: usize,
        reason: MoveError,
    },
    /// Sending a command to a player or the display failed.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// The outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// Black completed five in a row.
    BlackWins,
    /// White completed five in a row.
    WhiteWins,
    /// The board filled up without a five.
    Draw,
}

impl MatchResult {
    /// Maps the board's winner to a result; no winner is a draw.
    pub fn from_winner(winner: Option<Color>) -> Self {
        match winner {
            Some(Color::Black) => MatchResult::BlackWins,
            Some(Color::White) => MatchResult::WhiteWins,
            None => MatchResult::Draw,
        }
    }

    /// Inverse of [`Self::from_winner`].
    pub fn winner(self) -> Option<Color> {
        match self {
            MatchResult::BlackWins => Some(Color::Black),
            MatchResult::WhiteWins => Some(Color::White),
            MatchResult::Draw => None,
        }
    }

    /// `"black"`, `"white"` or `"draw"`.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchResult::BlackWins => "black",
            MatchResult::WhiteWins => "white",
            MatchResult::Draw => "draw",
        }
    }
}

/// Everything worth keeping about a finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Position the game started from.
    pub opening: Position,
    /// Coordinates in the order they were played.
    pub moves: Vec<usize>,
    pub result: MatchResult,
    pub black_name: String,
    pub white_name: String,
}

impl GameRecord {
    /// Name of the engine that held `color`.
    pub fn name_of(&self, color: Color) -> &str {
        match color {
            Color::Black => &self.black_name,
            Color::White => &self.white_name,
        }
    }

    /// Game log line: the opening followed by the coordinates concatenated
    /// without a separator.
    pub fn log_line(&self) -> String {
        let moves: String = self.moves.iter().map(|m| m.to_string()).collect();
        format!("{} {}", self.opening, moves)
    }

    /// Board labels of the moves, such as `E5`.
    pub fn move_labels(&self) -> Vec<String> {
        self.moves
            .iter()
            .map(|&m| self.opening.coordinate_label(m))
            .collect()
    }

    /// Replays the moves on top of the opening.
    ///
    /// # Errors
    ///
    /// Fails only if the record was not produced by a legal game.
    pub fn final_position(&self) -> Result<Position, MoveError> {
        let mut pos = self.opening.clone();
        for &m in &self.moves {
            pos.apply_move(m)?;
        }
        Ok(pos)
    }
}

/// Runs one game between two borrowed players.
pub struct GameRunner<'a> {
    black: &'a mut dyn GameClient,
    white: &'a mut dyn GameClient,
    display: Option<&'a mut dyn DisplayClient>,
    time_limit_ms: u64,
}

impl<'a> GameRunner<'a> {
    /// Pairs two started players for one game.
    ///
    /// `time_limit_ms` is passed with every `go` and is advisory only.
    pub fn new(
        black: &'a mut dyn GameClient,
        white: &'a mut dyn GameClient,
        display: Option<&'a mut dyn DisplayClient>,
        time_limit_ms: u64,
    ) -> Self {
        Self {
            black,
            white,
            display,
            time_limit_ms,
        }
    }

    /// Plays from `opening` until a five is formed or the board is full.
    ///
    /// Both players receive the opening, then the side to move is asked for
    /// a move, the move is checked against the board, shown on the display,
    /// and forwarded to the opponent. The display is told the result and
    /// acknowledges it before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::IllegalReturn`] for an unusable reply,
    /// [`GameError::IllegalMove`] for a move the board rejects, and
    /// [`GameError::Engine`] if a command could not be delivered.
    pub fn play_game(&mut self, opening: &Position) -> Result<GameRecord, GameError> {
        self.black.set_position(opening)?;
        self.white.set_position(opening)?;
        if let Some(display) = self.display.as_deref_mut() {
            display.set_position(opening)?;
        }

        let mut pos = opening.clone();
        let mut moves = Vec::new();

        loop {
            let (player, opponent) = match pos.side_to_move() {
                Color::Black => (&mut *self.black, &mut *self.white),
                Color::White => (&mut *self.white, &mut *self.black),
            };

            let coordinate =
                player
                    .request_move(self.time_limit_ms)
                    .ok_or_else(|| GameError::IllegalReturn {
                        engine: player.name().to_string(),
                    })?;

            if let Err(reason) = pos.apply_move(coordinate) {
                return Err(GameError::IllegalMove {
                    engine: player.name().to_string(),
                    coordinate,
                    reason,
                });
            }
            debug!(
                "{} plays {} ({})",
                player.name(),
                coordinate,
                pos.coordinate_label(coordinate)
            );

            if let Some(display) = self.display.as_deref_mut() {
                display.set_position(&pos)?;
            }
            moves.push(coordinate);
            opponent.notify_move(coordinate)?;

            if pos.winner().is_some() || pos.is_full() {
                break;
            }
        }

        if let Some(display) = self.display.as_deref_mut() {
            display.notify_result(pos.winner())?;
        }

        Ok(GameRecord {
            opening: opening.clone(),
            moves,
            result: MatchResult::from_winner(pos.winner()),
            black_name: self.black.name().to_string(),
            white_name: self.white.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{draw_script, CommandLog, ScriptedClient, ScriptedDisplay};

    #[test]
    fn test_match_result_conversions() {
        for result in [
            MatchResult::BlackWins,
            MatchResult::WhiteWins,
            MatchResult::Draw,
        ] {
            assert_eq!(MatchResult::from_winner(result.winner()), result);
        }
        assert_eq!(MatchResult::WhiteWins.as_str(), "white");
        assert_eq!(MatchResult::Draw.winner(), None);
    }

    #[test]
    fn test_black_completes_five() {
        let log = CommandLog::default();
        let mut black = ScriptedClient::preferring("alpha", vec![0, 1, 2, 3, 4], &log);
        let mut white = ScriptedClient::preferring("beta", vec![5, 6, 7, 8, 9], &log);
        let mut runner = GameRunner::new(&mut black, &mut white, None, 250);

        let record = runner.play_game(&Position::new(9)).unwrap();
        assert_eq!(record.result, MatchResult::BlackWins);
        assert_eq!(record.moves, vec![0, 5, 1, 6, 2, 7, 3, 8, 4]);
        assert_eq!(record.name_of(Color::Black), "alpha");
        assert_eq!(record.name_of(Color::White), "beta");
        assert_eq!(record.final_position().unwrap().winner(), Some(Color::Black));

        // The losing side is told the winning move; nobody is sent `winner`.
        let commands = log.commands();
        assert!(commands.contains(&"beta: move 4".to_string()));
        assert!(commands.iter().all(|c| !c.contains("winner")));
        assert!(commands.contains(&"alpha: go 250".to_string()));
    }

    #[test]
    fn test_full_board_is_a_draw() {
        let log = CommandLog::default();
        let (black_cells, white_cells) = draw_script();
        let mut black = ScriptedClient::preferring("alpha", black_cells, &log);
        let mut white = ScriptedClient::preferring("beta", white_cells, &log);
        let mut display = ScriptedDisplay::new(&log);
        let mut runner = GameRunner::new(&mut black, &mut white, Some(&mut display), 10);

        let record = runner.play_game(&Position::new(5)).unwrap();
        assert_eq!(record.result, MatchResult::Draw);
        assert_eq!(record.moves.len(), 25);
        assert!(record.final_position().unwrap().is_full());

        let commands = log.commands();
        assert_eq!(commands.last().map(String::as_str), Some("display: winner none"));
        let shown = commands
            .iter()
            .filter(|c| c.starts_with("display: pos"))
            .count();
        assert_eq!(shown, 26);
    }

    #[test]
    fn test_opening_is_sent_to_both_players() {
        let log = CommandLog::default();
        let mut opening = Position::new(9);
        opening.apply_move(40).unwrap();

        let mut black = ScriptedClient::preferring("alpha", vec![0, 1, 2, 3, 4], &log);
        let mut white = ScriptedClient::preferring("beta", vec![9, 10, 11, 12, 13], &log);
        let mut runner = GameRunner::new(&mut black, &mut white, None, 10);
        let record = runner.play_game(&opening).unwrap();

        // White is to move in the opening.
        assert_eq!(record.result, MatchResult::WhiteWins);
        assert_eq!(record.moves[0], 9);
        let commands = log.commands();
        assert_eq!(commands[0], format!("alpha: pos {}", opening));
        assert_eq!(commands[1], format!("beta: pos {}", opening));
        assert!(record.log_line().starts_with(&opening.to_string()));
    }

    #[test]
    fn test_invalid_reply_names_the_engine() {
        let log = CommandLog::default();
        let mut black = ScriptedClient::preferring("alpha", vec![0, 1, 2], &log);
        let mut white = ScriptedClient::replying("beta", vec![None], &log);
        let mut runner = GameRunner::new(&mut black, &mut white, None, 10);

        match runner.play_game(&Position::new(9)) {
            Err(GameError::IllegalReturn { engine }) => assert_eq!(engine, "beta"),
            other => panic!("Expected IllegalReturn, got {:?}", other),
        }
    }

    #[test]
    fn test_occupied_cell_is_an_illegal_move() {
        let log = CommandLog::default();
        let mut black = ScriptedClient::preferring("alpha", vec![40, 41, 42], &log);
        let mut white = ScriptedClient::replying("beta", vec![Some(40)], &log);
        let mut runner = GameRunner::new(&mut black, &mut white, None, 10);

        let err = runner.play_game(&Position::new(9)).unwrap_err();
        match &err {
            GameError::IllegalMove {
                engine,
                coordinate,
                reason,
            } => {
                assert_eq!(engine, "beta");
                assert_eq!(*coordinate, 40);
                assert!(matches!(reason, MoveError::Occupied { .. }));
            }
            other => panic!("Expected IllegalMove, got {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "move 40 which played by \"beta\" is illegal: cell E5 is already occupied"
        );
    }

    #[test]
    fn test_out_of_range_move() {
        let log = CommandLog::default();
        let mut black = ScriptedClient::replying("alpha", vec![Some(81)], &log);
        let mut white = ScriptedClient::preferring("beta", vec![0], &log);
        let mut runner = GameRunner::new(&mut black, &mut white, None, 10);

        match runner.play_game(&Position::new(9)) {
            Err(GameError::IllegalMove { reason, .. }) => {
                assert_eq!(
                    reason,
                    MoveError::OutOfRange {
                        coordinate: 81,
                        size: 9
                    }
                );
            }
            other => panic!("Expected IllegalMove, got {:?}", other),
        }
    }

    #[test]
    fn test_game_record_log_line() {
        let record = GameRecord {
            opening: Position::new(5),
            moves: vec![12, 0, 13],
            result: MatchResult::Draw,
            black_name: "a".to_string(),
            white_name: "b".to_string(),
        };
        assert_eq!(record.log_line(), format!("{} X 12013", "-".repeat(25)));
        assert_eq!(record.move_labels(), vec!["C3", "A5", "D3"]);
    }
}
