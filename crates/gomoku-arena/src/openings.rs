//! Opening positions for a run.
//!
//! Openings come from a text file with one position per line in position
//! notation. The [`OpeningBook`] hands them out in a shuffled order and
//! reshuffles whenever the pool is exhausted, so every cycle is a
//! permutation of the same openings.

use std::path::{Path, PathBuf};

use gomoku_core::{Position, PositionError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

/// Errors that can occur when loading an opening file.
#[derive(Error, Debug)]
pub enum OpeningError {
    #[error("Failed to read opening file \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("A position at line {line} is invalid: {source}")]
    InvalidPosition {
        line: usize,
        #[source]
        source: PositionError,
    },
    #[error("The board size of the position at line {line} is {found} but {expected} was expected")]
    SizeMismatch {
        line: usize,
        found: usize,
        expected: usize,
    },
    #[error("Opening file contains no positions")]
    Empty,
}

/// Parses opening file content; line numbers in errors are 1-based.
///
/// # Errors
///
/// Fails on the first line that is not valid position notation or whose
/// board size differs from `board_size`.
pub fn parse_openings(content: &str, board_size: usize) -> Result<Vec<Position>, OpeningError> {
    let mut positions = Vec::new();
    for (i, text) in content.lines().enumerate() {
        let line = i + 1;
        let pos = Position::parse(text)
            .map_err(|source| OpeningError::InvalidPosition { line, source })?;
        if pos.board_size() != board_size {
            return Err(OpeningError::SizeMismatch {
                line,
                found: pos.board_size(),
                expected: board_size,
            });
        }
        positions.push(pos);
    }

    if positions.is_empty() {
        return Err(OpeningError::Empty);
    }
    Ok(positions)
}

/// Loads the opening pool.
///
/// Without a file the pool is a single empty board of `board_size`.
///
/// # Errors
///
/// Returns [`OpeningError`] if the file cannot be read or any line is
/// rejected by [`parse_openings`].
pub fn load_openings(path: Option<&Path>, board_size: usize) -> Result<Vec<Position>, OpeningError> {
    let Some(path) = path else {
        return Ok(vec![Position::new(board_size)]);
    };
    let content = std::fs::read_to_string(path).map_err(|source| OpeningError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_openings(&content, board_size)
}

/// Rotating, optionally shuffled pool of openings.
pub struct OpeningBook {
    openings: Vec<Position>,
    next: usize,
    shuffle: bool,
    rng: StdRng,
}

impl OpeningBook {
    /// Creates a book and shuffles it once when `shuffle` is set.
    ///
    /// `seed` makes the order reproducible; `None` seeds from the OS.
    ///
    /// # Panics
    ///
    /// Panics if `openings` is empty.
    pub fn new(openings: Vec<Position>, shuffle: bool, seed: Option<u64>) -> Self {
        assert!(!openings.is_empty(), "opening book needs at least one position");
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut book = Self {
            openings,
            next: 0,
            shuffle,
            rng,
        };
        book.reshuffle();
        book
    }

    /// Number of distinct openings.
    pub fn len(&self) -> usize {
        self.openings.len()
    }

    /// Always false: a book holds at least one opening.
    pub fn is_empty(&self) -> bool {
        self.openings.is_empty()
    }

    /// Returns the next opening, starting a fresh cycle when exhausted.
    pub fn next_opening(&mut self) -> Position {
        if self.next == self.openings.len() {
            self.reshuffle();
            self.next = 0;
        }
        let pos = self.openings[self.next].clone();
        self.next += 1;
        pos
    }

    fn reshuffle(&mut self) {
        if self.shuffle {
            self.openings.shuffle(&mut self.rng);
        }
    }
}
