//! Scripted in-memory players for exercising the game and match loops
//! without subprocesses.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use gomoku_core::{Color, Position};

use crate::engine_client::{EngineError, GameClient};
use crate::viewer::DisplayClient;

/// Every command sent to any scripted client, as `"<name>: <command>"`.
#[derive(Clone, Default)]
pub struct CommandLog(Rc<RefCell<Vec<String>>>);

impl CommandLog {
    fn push(&self, name: &str, command: String) {
        self.0.borrow_mut().push(format!("{}: {}", name, command));
    }

    pub fn commands(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn commands_of(&self, name: &str) -> Vec<String> {
        let prefix = format!("{}: ", name);
        self.0
            .borrow()
            .iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

enum Script {
    /// Play the first cell of the list that is still empty.
    Prefer(Vec<usize>),
    /// Answer `go` with these replies in order, then `None`.
    Replies(VecDeque<Option<usize>>),
}

pub struct ScriptedClient {
    name: String,
    script: Script,
    position: Option<Position>,
    log: CommandLog,
    fail_start: bool,
    exits_on_quit: bool,
}

impl ScriptedClient {
    pub fn preferring(name: &str, cells: Vec<usize>, log: &CommandLog) -> Self {
        Self::with_script(name, Script::Prefer(cells), log)
    }

    pub fn replying(name: &str, replies: Vec<Option<usize>>, log: &CommandLog) -> Self {
        Self::with_script(name, Script::Replies(replies.into()), log)
    }

    fn with_script(name: &str, script: Script, log: &CommandLog) -> Self {
        Self {
            name: name.to_string(),
            script,
            position: None,
            log: log.clone(),
            fail_start: false,
            exits_on_quit: true,
        }
    }

    pub fn failing_to_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn ignoring_quit(mut self) -> Self {
        self.exits_on_quit = false;
        self
    }

    fn choose(&mut self) -> Option<usize> {
        match &mut self.script {
            Script::Prefer(cells) => {
                let pos = self.position.as_ref()?;
                cells
                    .iter()
                    .copied()
                    .find(|&c| c < pos.cell_count() && pos.stone_at(c).is_none())
            }
            Script::Replies(replies) => replies.pop_front().flatten(),
        }
    }
}

impl GameClient for ScriptedClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn executable(&self) -> &Path {
        Path::new("/scripted")
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.log.push(&self.name, "start".to_string());
        if self.fail_start {
            return Err(EngineError::Spawn {
                path: PathBuf::from("/scripted"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        Ok(())
    }

    fn set_position(&mut self, position: &Position) -> Result<(), EngineError> {
        self.log.push(&self.name, format!("pos {}", position));
        self.position = Some(position.clone());
        Ok(())
    }

    fn request_move(&mut self, time_limit_ms: u64) -> Option<usize> {
        self.log.push(&self.name, format!("go {}", time_limit_ms));
        let coordinate = self.choose()?;
        if let Some(pos) = &mut self.position {
            // Illegal replies are the point of some scripts; keep going.
            let _ = pos.apply_move(coordinate);
        }
        Some(coordinate)
    }

    fn notify_move(&mut self, coordinate: usize) -> Result<(), EngineError> {
        self.log.push(&self.name, format!("move {}", coordinate));
        if let Some(pos) = &mut self.position {
            let _ = pos.apply_move(coordinate);
        }
        Ok(())
    }

    fn notify_result(&mut self, winner: Option<Color>) -> Result<(), EngineError> {
        let name = winner.map_or("none", Color::protocol_name);
        self.log.push(&self.name, format!("winner {}", name));
        Ok(())
    }

    fn quit(&mut self, _timeout: Duration) -> bool {
        self.log.push(&self.name, "quit".to_string());
        self.exits_on_quit
    }

    fn kill(&mut self) {
        self.log.push(&self.name, "kill".to_string());
    }
}

pub struct ScriptedDisplay {
    log: CommandLog,
}

impl ScriptedDisplay {
    pub fn new(log: &CommandLog) -> Self {
        Self { log: log.clone() }
    }
}

impl DisplayClient for ScriptedDisplay {
    fn executable(&self) -> &Path {
        Path::new("/scripted-display")
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.log.push("display", "start".to_string());
        Ok(())
    }

    fn set_position(&mut self, position: &Position) -> Result<(), EngineError> {
        self.log.push("display", format!("pos {}", position));
        Ok(())
    }

    fn notify_result(&mut self, winner: Option<Color>) -> Result<(), EngineError> {
        let name = winner.map_or("none", Color::protocol_name);
        self.log.push("display", format!("winner {}", name));
        Ok(())
    }

    fn quit(&mut self, _timeout: Duration) -> bool {
        self.log.push("display", "quit".to_string());
        true
    }

    fn kill(&mut self) {
        self.log.push("display", "kill".to_string());
    }
}

/// Cell lists for Black and White that fill a 5x5 board without a five.
///
/// Cell `(row, col)` is Black when `(col + 2 * row) % 4 < 2`, which gives
/// rows of alternating pairs and 13 Black against 12 White stones.
pub fn draw_script() -> (Vec<usize>, Vec<usize>) {
    (0..25).partition(|&c| (c % 5 + 2 * (c / 5)) % 4 < 2)
}
