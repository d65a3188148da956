//! Gomoku Arena - a match server for gomoku engines.
//!
//! This crate runs series of games between two engine programs that speak a
//! line protocol over stdin/stdout, enforces the rules through
//! [`gomoku_core::Position`], and keeps statistics and game logs.
//!
//! # Modules
//!
//! - [`config`] - Game and engine configuration files
//! - [`engine_client`] - Engine subprocesses and request/reply correlation
//! - [`viewer`] - Optional board display subprocess
//! - [`game_runner`] - Plays a single game
//! - [`match_runner`] - Runs a series of games with opening rotation and color swaps
//! - [`openings`] - Opening file loading and rotation
//! - [`stats`] - Per-engine win/loss/draw statistics
//! - [`records`] - Game log and JSON-lines game records

pub mod config;
pub mod engine_client;
pub mod game_runner;
pub mod match_runner;
pub mod openings;
pub mod records;
pub mod stats;
pub mod viewer;

#[cfg(test)]
mod test_support;
