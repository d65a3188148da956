//! Line-protocol client for communicating with gomoku engines.
//!
//! [`EngineProcess`] owns one subprocess. A dedicated reader thread consumes
//! its stdout line by line and resolves outstanding requests: every request
//! that expects a reply registers a regular expression together with a
//! one-shot slot *before* the command is written, and each incoming line
//! fulfils the earliest registered request whose pattern matches it. Lines
//! that match nothing are engine chatter and are dropped.
//!
//! [`EngineClient`] layers the engine commands on top:
//!
//! | Command | Reply |
//! |---|---|
//! | `pos <cells> <side>` | none |
//! | `go <ms>` | `move <coordinate>` |
//! | `move <coordinate>` | none |
//! | `winner black\|white\|none` | none |
//! | `quit` | none, the engine exits |
//!
//! # Example
//!
//! ```no_run
//! use gomoku_arena::config::EngineConfig;
//! use gomoku_arena::engine_client::{EngineClient, GameClient};
//! use gomoku_core::Position;
//! use std::time::Duration;
//!
//! let config = EngineConfig {
//!     name: "random".to_string(),
//!     path: "bot-random".into(),
//!     args: String::new(),
//!     work_dir: None,
//! };
//! let mut client = EngineClient::new(config);
//! client.start()?;
//! client.set_position(&Position::new(9))?;
//! if let Some(coordinate) = client.request_move(1000) {
//!     println!("engine plays {coordinate}");
//! }
//! client.quit(Duration::from_secs(10));
//! # Ok::<(), gomoku_arena::engine_client::EngineError>(())
//! ```

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use gomoku_core::{Color, Position};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;

/// Reply pattern of the `go` command.
pub const MOVE_PATTERN: &str = r"^\s*move\s+\d+";

/// How often [`EngineProcess::quit`] polls for process exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How often [`EngineProcess::wait_for`] checks that the process is alive.
const REPLY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Time the reader thread gets to deliver lines written just before exit.
const EXIT_GRACE: Duration = Duration::from_millis(100);

/// Errors that can occur when communicating with an engine process.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to launch the executable.
    #[error("Failed to spawn \"{}\": {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing to the engine's stdin failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A command was issued before `start` or after the process went away.
    #[error("Process not running")]
    NotRunning,
    /// A reply pattern failed to compile.
    #[error("Invalid response pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Lifecycle of an [`EngineProcess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running,
    Exited,
}

/// A registered request waiting for its reply line.
struct Pending {
    id: u64,
    pattern: Regex,
    slot: Sender<String>,
}

/// Requests awaiting a reply, oldest first.
#[derive(Default)]
struct PendingList {
    entries: VecDeque<Pending>,
    next_id: u64,
    /// Set once stdout reaches EOF; no reply can arrive afterwards.
    closed: bool,
}

/// State shared between the owning thread and the reader thread.
#[derive(Default)]
struct Shared {
    pending: Mutex<PendingList>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PendingList> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a request. The returned receiver yields the reply, or
    /// disconnects if the output stream closes first.
    fn register(&self, pattern: Regex) -> (u64, Receiver<String>) {
        let (slot, rx) = mpsc::channel();
        let mut pending = self.lock();
        let id = pending.next_id;
        pending.next_id += 1;
        if !pending.closed {
            pending.entries.push_back(Pending { id, pattern, slot });
        }
        (id, rx)
    }

    /// Withdraws a request whose command never reached the process.
    fn cancel(&self, id: u64) {
        self.lock().entries.retain(|p| p.id != id);
    }

    /// Hands `line` to the earliest registered request it matches.
    ///
    /// Returns `false` if no request was waiting for it.
    fn resolve(&self, line: &str) -> bool {
        let mut pending = self.lock();
        let Some(index) = pending
            .entries
            .iter()
            .position(|p| p.pattern.is_match(line))
        else {
            return false;
        };
        if let Some(entry) = pending.entries.remove(index) {
            // The waiter may have given up; the line is consumed either way.
            let _ = entry.slot.send(line.to_string());
        }
        true
    }

    /// Wakes every waiter with "no reply" and refuses new registrations.
    fn close(&self) {
        let mut pending = self.lock();
        pending.closed = true;
        pending.entries.clear();
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.lock().entries.len()
    }
}

/// A reply that has been requested but not necessarily received yet.
///
/// Consumed by [`PendingResponse::wait`]; it cannot be reused.
pub struct PendingResponse {
    command: String,
    rx: Receiver<String>,
}

impl PendingResponse {
    /// The command this response belongs to.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Sleeps until the reply arrives.
    ///
    /// Returns `None` if the process output closed before a matching line
    /// was seen. An exited process whose output is still held open by a
    /// child it spawned is not noticed here; use [`EngineProcess::wait_for`]
    /// to also watch the process itself.
    pub fn wait(self) -> Option<String> {
        self.rx.recv().ok()
    }
}

/// One engine or display subprocess with request/reply correlation.
pub struct EngineProcess {
    /// Label used in log lines.
    label: String,
    path: PathBuf,
    args: Vec<String>,
    work_dir: Option<PathBuf>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    shared: Arc<Shared>,
}

impl EngineProcess {
    /// Describes a process without launching it.
    ///
    /// `args` is split on whitespace.
    pub fn new(
        label: impl Into<String>,
        path: impl Into<PathBuf>,
        args: &str,
        work_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            args: args.split_whitespace().map(str::to_string).collect(),
            work_dir,
            child: None,
            stdin: None,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Path of the executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Launches the process and its stdout reader thread.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Spawn`] if the executable cannot be launched;
    /// the process then stays [`ProcessState::NotStarted`].
    pub fn start(&mut self) -> Result<(), EngineError> {
        let spawn_error = |source| EngineError::Spawn {
            path: self.path.clone(),
            source,
        };

        let mut command = Command::new(&self.path);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.work_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(spawn_error)?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(EngineError::NotRunning);
        };

        let shared = Arc::clone(&self.shared);
        let label = self.label.clone();
        let reader = thread::Builder::new()
            .name(format!("{}-stdout", self.label))
            .spawn(move || read_lines(stdout, &shared, &label));
        if let Err(e) = reader {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_error(e));
        }

        debug!("{}: started {} (pid {})", self.label, self.path.display(), child.id());
        self.child = Some(child);
        self.stdin = Some(stdin);
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&mut self) -> ProcessState {
        match &mut self.child {
            None => ProcessState::NotStarted,
            Some(child) => match child.try_wait() {
                Ok(None) => ProcessState::Running,
                Ok(Some(_)) | Err(_) => ProcessState::Exited,
            },
        }
    }

    /// True while the process is alive.
    pub fn is_running(&mut self) -> bool {
        self.state() == ProcessState::Running
    }

    /// Writes one command line. No reply is expected.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotRunning`] before `start` (or after `quit`),
    /// or [`EngineError::Io`] if the pipe is broken.
    pub fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        let stdin = self.stdin.as_mut().ok_or(EngineError::NotRunning)?;
        debug!("{} <- {}", self.label, cmd);
        writeln!(stdin, "{}", cmd)?;
        stdin.flush()?;
        Ok(())
    }

    /// Registers a reply pattern, then writes `cmd`.
    ///
    /// The registration happens first so a fast reply cannot slip past.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Pattern`] for an invalid regular expression and
    /// the errors of [`Self::send`].
    pub fn request(&mut self, cmd: &str, pattern: &str) -> Result<PendingResponse, EngineError> {
        let pattern = Regex::new(pattern)?;
        let (id, rx) = self.shared.register(pattern);
        if let Err(e) = self.send(cmd) {
            self.shared.cancel(id);
            return Err(e);
        }
        Ok(PendingResponse {
            command: cmd.to_string(),
            rx,
        })
    }

    /// Blocks until `response` is answered or the process is gone.
    ///
    /// Returns `None` once the output closes or the process has exited
    /// without a matching line. There is no timeout: an engine that stays
    /// alive without ever replying blocks the caller indefinitely.
    pub fn wait_for(&mut self, response: PendingResponse) -> Option<String> {
        loop {
            match response.rx.recv_timeout(REPLY_POLL_INTERVAL) {
                Ok(line) => return Some(line),
                Err(RecvTimeoutError::Disconnected) => return None,
                Err(RecvTimeoutError::Timeout) => {}
            }
            if self.state() != ProcessState::Running {
                let reply = response.rx.recv_timeout(EXIT_GRACE).ok();
                if reply.is_none() {
                    debug!("{}: exited while waiting on `{}`", self.label, response.command);
                }
                return reply;
            }
        }
    }

    /// Sends `quit` and waits up to `timeout` for the process to exit.
    ///
    /// Returns whether it exited in time; the caller kills it otherwise. A
    /// process that was never started counts as exited.
    pub fn quit(&mut self, timeout: Duration) -> bool {
        if self.child.is_none() {
            return true;
        }

        // The engine may already be gone; a broken pipe here is expected.
        if let Err(e) = self.send("quit") {
            trace!("{}: quit not delivered: {}", self.label, e);
        }
        self.stdin = None;

        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_running() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }

    /// Forcibly terminates the process.
    pub fn kill(&mut self) {
        self.stdin = None;
        if let Some(child) = &mut self.child {
            if let Err(e) = child.kill() {
                trace!("{}: kill failed: {}", self.label, e);
            }
            let _ = child.wait();
        }
    }
}

impl Drop for EngineProcess {
    /// Never leave a subprocess running behind a dropped handle.
    fn drop(&mut self) {
        if self.is_running() {
            warn!("{}: still running on drop, killing", self.label);
            self.kill();
        }
    }
}

/// Reader thread body: resolve pending requests until EOF.
///
/// Bytes that are not valid UTF-8 are replaced, so a stray log line in
/// another encoding is dropped as chatter instead of ending the stream.
fn read_lines(stdout: ChildStdout, shared: &Shared, label: &str) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("{}: read failed: {}", label, e);
                break;
            }
        }
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(['\n', '\r']);
        debug!("{} -> {}", label, line);
        if !shared.resolve(line) {
            trace!("{}: ignored unsolicited line", label);
        }
    }
    debug!("{}: output closed", label);
    shared.close();
}

/// Operations the game loop needs from a player.
///
/// Implemented by [`EngineClient`] for real subprocesses; tests drive the
/// match logic with scripted implementations.
pub trait GameClient {
    /// Display name of the player.
    fn name(&self) -> &str;

    /// Executable path, for startup diagnostics.
    fn executable(&self) -> &Path;

    /// Launches the player.
    fn start(&mut self) -> Result<(), EngineError>;

    /// Sends the position to play from.
    fn set_position(&mut self, position: &Position) -> Result<(), EngineError>;

    /// Asks for a move with an advisory time budget.
    ///
    /// Returns `None` when no usable coordinate came back: the reply did not
    /// parse, or the player exited before answering.
    fn request_move(&mut self, time_limit_ms: u64) -> Option<usize>;

    /// Tells the player which move the opponent made.
    fn notify_move(&mut self, coordinate: usize) -> Result<(), EngineError>;

    /// Tells the player how the game ended.
    fn notify_result(&mut self, winner: Option<Color>) -> Result<(), EngineError>;

    /// Asks the player to exit; returns whether it did within `timeout`.
    fn quit(&mut self, timeout: Duration) -> bool;

    /// Forcibly terminates the player.
    fn kill(&mut self);
}

/// Formats the `winner` command shared by engines and displays.
pub(crate) fn winner_command(winner: Option<Color>) -> String {
    match winner {
        Some(color) => format!("winner {}", color.protocol_name()),
        None => "winner none".to_string(),
    }
}

/// Formats the `pos` command shared by engines and displays.
pub(crate) fn position_command(position: &Position) -> String {
    format!("pos {}", position)
}

/// Extracts the coordinate from a `move <n>` reply.
fn parse_move_reply(line: &str) -> Option<usize> {
    line.split_whitespace().nth(1)?.parse().ok()
}

/// A gomoku engine speaking the line protocol over stdin/stdout.
pub struct EngineClient {
    name: String,
    process: EngineProcess,
}

impl EngineClient {
    /// Creates a client for the configured engine; call
    /// [`GameClient::start`] to launch it.
    pub fn new(config: EngineConfig) -> Self {
        let process = EngineProcess::new(
            config.name.clone(),
            config.path,
            &config.args,
            config.work_dir,
        );
        Self {
            name: config.name,
            process,
        }
    }

    /// True while the engine process is alive.
    pub fn is_running(&mut self) -> bool {
        self.process.is_running()
    }
}

impl GameClient for EngineClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn executable(&self) -> &Path {
        self.process.path()
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.process.start()
    }

    fn set_position(&mut self, position: &Position) -> Result<(), EngineError> {
        self.process.send(&position_command(position))
    }

    fn request_move(&mut self, time_limit_ms: u64) -> Option<usize> {
        let response = match self
            .process
            .request(&format!("go {}", time_limit_ms), MOVE_PATTERN)
        {
            Ok(response) => response,
            Err(e) => {
                warn!("{}: move request failed: {}", self.name, e);
                return None;
            }
        };

        let line = self.process.wait_for(response)?;
        parse_move_reply(&line)
    }

    fn notify_move(&mut self, coordinate: usize) -> Result<(), EngineError> {
        self.process.send(&format!("move {}", coordinate))
    }

    fn notify_result(&mut self, winner: Option<Color>) -> Result<(), EngineError> {
        self.process.send(&winner_command(winner))
    }

    fn quit(&mut self, timeout: Duration) -> bool {
        self.process.quit(timeout)
    }

    fn kill(&mut self) {
        self.process.kill()
    }
}
