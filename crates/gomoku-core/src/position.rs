//! Gomoku position representation, move application, and notation.
//!
//! A position is stored on a padded board: the `size × size` playing area is
//! surrounded by a one-cell border of out-of-board sentinels, so the
//! five-in-a-row scan in [`Position::apply_move`] walks each axis until it
//! meets a cell that is not the mover's stone, without any bounds checks.
//!
//! # Notation
//!
//! A position is written as a flat, row-major run of `size²` cell symbols
//! (`X` black, `O` white, `-` empty), a space, and the side to move
//! (`X` or `O`):
//!
//! ```
//! use gomoku_core::{Color, Position};
//!
//! let cells = "-".repeat(81);
//! let pos = Position::parse(&format!("{cells} X")).unwrap();
//! assert_eq!(pos.board_size(), 9);
//! assert_eq!(pos.side_to_move(), Color::Black);
//! assert_eq!(pos.to_string(), format!("{cells} X"));
//! ```

use std::fmt;

use thiserror::Error;

use crate::Color;

/// Number of contiguous stones that wins the game.
pub const STONES_TO_WIN: usize = 5;

/// Smallest supported board edge.
pub const MIN_BOARD_SIZE: usize = STONES_TO_WIN;

/// Largest supported board edge.
pub const MAX_BOARD_SIZE: usize = 19;

/// Symbol of an empty cell in position notation.
pub const EMPTY_CHAR: char = '-';

/// Width of the sentinel border around the playing area.
const MARGIN: usize = 1;

/// Errors that can occur when parsing position notation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("invalid position: missing side to move")]
    MissingSide,

    #[error("invalid position: unexpected trailing token '{0}'")]
    UnexpectedToken(String),

    #[error("invalid position: {0} cells is not the square of a board size between 5 and 19")]
    InvalidLength(usize),

    #[error("invalid position: unrecognized cell '{found}' at index {index}")]
    InvalidCell { index: usize, found: char },

    #[error("invalid side to move: expected 'X' or 'O', got '{0}'")]
    InvalidSide(String),
}

/// Reasons a move is rejected by [`Position::apply_move`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("coordinate {coordinate} is outside the {size}x{size} board")]
    OutOfRange { coordinate: usize, size: usize },

    #[error("cell {label} is already occupied")]
    Occupied { coordinate: usize, label: Label },
}

/// Contents of one cell of the padded board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Cell {
    Black = 0,
    White = 1,
    Empty = 2,
    OutOfBoard = 3,
}

impl Cell {
    #[inline]
    const fn from_color(color: Color) -> Self {
        match color {
            Color::Black => Cell::Black,
            Color::White => Cell::White,
        }
    }

    #[inline]
    const fn color(self) -> Option<Color> {
        match self {
            Cell::Black => Some(Color::Black),
            Cell::White => Some(Color::White),
            Cell::Empty | Cell::OutOfBoard => None,
        }
    }
}

/// Human-readable cell label such as `A9`, used in diagnostics.
///
/// Kept as a small `Copy` value so it can live inside [`MoveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    column: u8,
    row: u8,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.column) as char, self.row)
    }
}

/// A gomoku position: stones, side to move, and winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    size: usize,
    padded_size: usize,
    cells: Vec<Cell>,
    side_to_move: Color,
    winner: Option<Color>,
}

impl Position {
    /// Creates an empty board with Black to move.
    ///
    /// `size` must lie in `MIN_BOARD_SIZE..=MAX_BOARD_SIZE`; callers validate
    /// it where it enters the system (configuration loading, [`Self::parse`]).
    pub fn new(size: usize) -> Self {
        debug_assert!(
            (MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size),
            "board size {size} out of range"
        );

        let padded_size = size + 2 * MARGIN;
        let mut cells = vec![Cell::OutOfBoard; padded_size * padded_size];
        for row in 0..size {
            let start = (row + MARGIN) * padded_size + MARGIN;
            cells[start..start + size].fill(Cell::Empty);
        }

        Self {
            size,
            padded_size,
            cells,
            side_to_move: Color::Black,
            winner: None,
        }
    }

    /// Parses position notation (`"<cells> <side>"`).
    ///
    /// Stone counts are not checked against the side to move, and no win scan
    /// is performed: the parsed position has no winner.
    pub fn parse(s: &str) -> Result<Self, PositionError> {
        let mut tokens = s.split_whitespace();
        let board = tokens.next().ok_or(PositionError::InvalidLength(0))?;
        let side = tokens.next().ok_or(PositionError::MissingSide)?;
        if let Some(extra) = tokens.next() {
            return Err(PositionError::UnexpectedToken(extra.to_string()));
        }

        let len = board.chars().count();
        let size = board_size_for(len).ok_or(PositionError::InvalidLength(len))?;

        let mut pos = Self::new(size);
        for (index, c) in board.chars().enumerate() {
            let stone = match c {
                EMPTY_CHAR => None,
                other => Some(
                    Color::from_char(other)
                        .ok_or(PositionError::InvalidCell { index, found: other })?,
                ),
            };
            pos.set_stone(index, stone);
        }

        let mut side_chars = side.chars();
        pos.side_to_move = match (side_chars.next().and_then(Color::from_char), side_chars.next()) {
            (Some(color), None) => color,
            _ => return Err(PositionError::InvalidSide(side.to_string())),
        };

        Ok(pos)
    }

    /// Board edge length.
    #[inline]
    pub fn board_size(&self) -> usize {
        self.size
    }

    /// Number of playable cells (`size²`).
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.size * self.size
    }

    /// The color that plays the next stone.
    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// The color that completed five in a row, if any.
    #[inline]
    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    /// The losing color once the game has a winner.
    #[inline]
    pub fn loser(&self) -> Option<Color> {
        self.winner.map(Color::opposite)
    }

    /// True when no playable cell is empty, regardless of the winner.
    pub fn is_full(&self) -> bool {
        !self.cells.contains(&Cell::Empty)
    }

    /// Number of empty playable cells.
    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == Cell::Empty).count()
    }

    /// Stone at a row-major coordinate, or `None` for an empty cell.
    ///
    /// # Panics
    ///
    /// Panics if `coord` is outside the board.
    pub fn stone_at(&self, coord: usize) -> Option<Color> {
        self.cells[self.padded_index(coord)].color()
    }

    /// Overwrites a cell without touching side to move or winner.
    ///
    /// Used to build positions from notation; games advance through
    /// [`Self::apply_move`].
    ///
    /// # Panics
    ///
    /// Panics if `coord` is outside the board.
    pub fn set_stone(&mut self, coord: usize, stone: Option<Color>) {
        let index = self.padded_index(coord);
        self.cells[index] = stone.map_or(Cell::Empty, Cell::from_color);
    }

    /// Plays a stone for the side to move at a row-major coordinate.
    ///
    /// On success the stone is placed, the winner is set if the stone
    /// completes five or more in a row along any axis, and the turn passes to
    /// the opponent. On failure the position is left untouched.
    pub fn apply_move(&mut self, coord: usize) -> Result<(), MoveError> {
        if coord >= self.cell_count() {
            return Err(MoveError::OutOfRange {
                coordinate: coord,
                size: self.size,
            });
        }

        let index = self.padded_index(coord);
        if self.cells[index] != Cell::Empty {
            return Err(MoveError::Occupied {
                coordinate: coord,
                label: self.label(coord),
            });
        }

        let mover = self.side_to_move;
        if self.winner.is_none() && self.completes_five(index, Cell::from_color(mover)) {
            self.winner = Some(mover);
        }

        self.cells[index] = Cell::from_color(mover);
        self.side_to_move = mover.opposite();
        Ok(())
    }

    /// Scans the four axes through `index` for a run of `stone` long enough
    /// to win once the empty cell at `index` is filled.
    fn completes_five(&self, index: usize, stone: Cell) -> bool {
        let p = self.padded_size as isize;
        let directions = [1, p, p + 1, p - 1];

        for dir in directions {
            let mut count = 0;

            let mut i = index as isize + dir;
            while self.cells[i as usize] == stone {
                count += 1;
                i += dir;
            }

            let mut i = index as isize - dir;
            while self.cells[i as usize] == stone {
                count += 1;
                i -= dir;
            }

            if count + 1 >= STONES_TO_WIN {
                return true;
            }
        }

        false
    }

    /// Diagnostic label of a coordinate: column letter, then row counted
    /// from the bottom edge (`A9` is the top-left cell of a 9x9 board).
    pub fn coordinate_label(&self, coord: usize) -> String {
        self.label(coord).to_string()
    }

    fn label(&self, coord: usize) -> Label {
        Label {
            column: (coord % self.size) as u8,
            row: (self.size - coord / self.size) as u8,
        }
    }

    /// The cell run of the notation, without the side to move.
    pub fn cells_string(&self) -> String {
        self.cells
            .iter()
            .filter_map(|&c| match c {
                Cell::OutOfBoard => None,
                Cell::Empty => Some(EMPTY_CHAR),
                stone => stone.color().map(Color::to_char),
            })
            .collect()
    }

    #[inline]
    fn padded_index(&self, coord: usize) -> usize {
        assert!(coord < self.cell_count(), "coordinate {coord} out of range");
        let (x, y) = (coord % self.size + MARGIN, coord / self.size + MARGIN);
        y * self.padded_size + x
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.cells_string(), self.side_to_move.to_char())
    }
}

impl std::str::FromStr for Position {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Board edge whose square is `len`, if it is a supported size.
fn board_size_for(len: usize) -> Option<usize> {
    (MIN_BOARD_SIZE..=MAX_BOARD_SIZE).find(|size| size * size == len)
}
