//! Client for the optional board display.
//!
//! The display speaks a subset of the engine protocol: it receives `pos`
//! after every move and `winner` at the end of each game. After `winner` the
//! arena waits until the display answers `ok`, so a human watching can
//! acknowledge the result before the next game starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gomoku_core::{Color, Position};
use tracing::warn;

use crate::engine_client::{position_command, winner_command, EngineError, EngineProcess};

/// Acknowledgement the display sends after a `winner` command.
pub const ACK_PATTERN: &str = "^ok$";

/// Operations the game loop needs from a board display.
pub trait DisplayClient {
    /// Executable path, for startup diagnostics.
    fn executable(&self) -> &Path;

    /// Launches the display.
    fn start(&mut self) -> Result<(), EngineError>;

    /// Shows a position.
    fn set_position(&mut self, position: &Position) -> Result<(), EngineError>;

    /// Shows the game result and blocks until the display acknowledges it
    /// or exits.
    fn notify_result(&mut self, winner: Option<Color>) -> Result<(), EngineError>;

    /// Asks the display to exit; returns whether it did within `timeout`.
    fn quit(&mut self, timeout: Duration) -> bool;

    /// Forcibly terminates the display.
    fn kill(&mut self);
}

/// A display subprocess.
pub struct Viewer {
    process: EngineProcess,
}

impl Viewer {
    /// Creates a display client; `args` is split on whitespace.
    pub fn new(path: impl Into<PathBuf>, args: &str) -> Self {
        Self {
            process: EngineProcess::new("viewer", path, args, None),
        }
    }
}

impl DisplayClient for Viewer {
    fn executable(&self) -> &Path {
        self.process.path()
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.process.start()
    }

    fn set_position(&mut self, position: &Position) -> Result<(), EngineError> {
        self.process.send(&position_command(position))
    }

    fn notify_result(&mut self, winner: Option<Color>) -> Result<(), EngineError> {
        let response = self.process.request(&winner_command(winner), ACK_PATTERN)?;
        if self.process.wait_for(response).is_none() {
            warn!("viewer exited without acknowledging the result");
        }
        Ok(())
    }

    fn quit(&mut self, timeout: Duration) -> bool {
        self.process.quit(timeout)
    }

    fn kill(&mut self) {
        self.process.kill()
    }
}
