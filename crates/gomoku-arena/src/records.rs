//! Per-game output files.
//!
//! [`GameLog`] writes the compact one-line-per-game log that other tools
//! replay. [`RecordWriter`] writes a JSON object per game with the names,
//! result, and both coordinate and label forms of the moves. Both files are
//! truncated when the run starts and flushed after every line, so an
//! interrupted run leaves every finished game on disk.

use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::game_runner::{GameRecord, MatchResult};

/// Plain-text game log: `<opening> <moves>` per line.
pub struct GameLog {
    writer: LineWriter<File>,
}

impl GameLog {
    /// Creates (or truncates) the log file.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self {
            writer: LineWriter::new(File::create(path)?),
        })
    }

    /// Writes the game's log line and flushes it.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn append(&mut self, record: &GameRecord) -> std::io::Result<()> {
        writeln!(self.writer, "{}", record.log_line())?;
        self.writer.flush()
    }
}

/// JSON representation of one finished game.
#[derive(Serialize)]
struct GameJson<'a> {
    /// 1-based game number within the run.
    game: usize,
    black: &'a str,
    white: &'a str,
    /// `"black"`, `"white"` or `"draw"`.
    result: &'a str,
    /// How the game ended.
    reason: &'a str,
    opening: String,
    moves: &'a [usize],
    labels: Vec<String>,
    created_at: String,
}

/// JSON-lines file with one object per game.
pub struct RecordWriter {
    writer: LineWriter<File>,
}

impl RecordWriter {
    /// Creates (or truncates) the records file.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self {
            writer: LineWriter::new(File::create(path)?),
        })
    }

    /// Writes game number `game` (1-based) as one JSON line and flushes it.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, also for a serialization failure.
    pub fn append(&mut self, game: usize, record: &GameRecord) -> std::io::Result<()> {
        let reason = match record.result {
            MatchResult::Draw => "board full",
            MatchResult::BlackWins | MatchResult::WhiteWins => "five in a row",
        };
        let json = GameJson {
            game,
            black: &record.black_name,
            white: &record.white_name,
            result: record.result.as_str(),
            reason,
            opening: record.opening.to_string(),
            moves: &record.moves,
            labels: record.move_labels(),
            created_at: Utc::now().to_rfc3339(),
        };
        serde_json::to_writer(&mut self.writer, &json)?;
        writeln!(self.writer)?;
        self.writer.flush()
    }
}
