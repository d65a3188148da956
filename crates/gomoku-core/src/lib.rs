//! Core types for gomoku.
//!
//! This crate provides the fundamental types shared by the arena and the
//! sample engines:
//! - [`Color`] for stone colors
//! - [`Position`] for board state, move legality, and five-in-a-row detection
//! - Position notation parsing and serialization

mod color;
mod position;

pub use color::Color;
pub use position::{
    Label, MoveError, Position, PositionError, EMPTY_CHAR, MAX_BOARD_SIZE, MIN_BOARD_SIZE,
    STONES_TO_WIN,
};
