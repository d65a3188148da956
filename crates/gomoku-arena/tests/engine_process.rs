//! End-to-end tests against real subprocesses, using `/bin/sh` scripts as
//! engines.

#![cfg(unix)]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use gomoku_arena::config::{EngineConfig, GameConfig};
use gomoku_arena::engine_client::{EngineClient, GameClient};
use gomoku_arena::match_runner::{MatchRunner, RunState};
use gomoku_arena::stats::PlayerStatistic;
use gomoku_arena::viewer::{DisplayClient, Viewer};
use gomoku_core::{Color, Position};
use tempfile::TempDir;

const QUIT: Duration = Duration::from_secs(5);

fn shell_engine(dir: &TempDir, name: &str, body: &str) -> EngineConfig {
    let path = dir.path().join(format!("{}.sh", name));
    std::fs::write(&path, body).unwrap();
    EngineConfig {
        name: name.to_string(),
        path: PathBuf::from("/bin/sh"),
        args: path.display().to_string(),
        work_dir: None,
    }
}

/// Answers the n-th `go` with `move <base + n>`.
fn counting_engine(dir: &TempDir, name: &str, base: usize) -> EngineConfig {
    let body = format!(
        r#"n=0
while read -r cmd rest; do
  case "$cmd" in
    go) echo "move $(({base} + n))"; n=$((n + 1)) ;;
    quit) exit 0 ;;
  esac
done
"#
    );
    shell_engine(dir, name, &body)
}

#[test]
fn test_reply_is_matched_past_chatter() {
    let dir = TempDir::new().unwrap();
    let config = shell_engine(
        &dir,
        "chatty",
        r#"while read -r cmd rest; do
  case "$cmd" in
    go) echo "info thinking"; echo "move"; echo "  move 7" ;;
    quit) exit 0 ;;
  esac
done
"#,
    );
    let mut client = EngineClient::new(config);
    client.start().unwrap();
    assert!(client.is_running());

    client.set_position(&Position::new(9)).unwrap();
    assert_eq!(client.request_move(100), Some(7));
    assert_eq!(client.request_move(100), Some(7));

    assert!(client.quit(QUIT));
    assert!(!client.is_running());
}

#[test]
fn test_non_utf8_chatter_is_skipped() {
    let dir = TempDir::new().unwrap();
    let config = shell_engine(
        &dir,
        "latin1",
        r#"while read -r cmd rest; do
  case "$cmd" in
    go) printf 'info caf\351\n'; echo "move 7" ;;
    quit) exit 0 ;;
  esac
done
"#,
    );
    let mut client = EngineClient::new(config);
    client.start().unwrap();
    client.set_position(&Position::new(9)).unwrap();
    assert_eq!(client.request_move(100), Some(7));
    assert_eq!(client.request_move(100), Some(7));
    assert!(client.quit(QUIT));
}

#[test]
fn test_unparsable_coordinate_is_none() {
    let dir = TempDir::new().unwrap();
    let config = shell_engine(
        &dir,
        "garbled",
        r#"while read -r cmd rest; do
  case "$cmd" in
    go) echo "move 12x" ;;
    quit) exit 0 ;;
  esac
done
"#,
    );
    let mut client = EngineClient::new(config);
    client.start().unwrap();
    assert_eq!(client.request_move(100), None);
    assert!(client.quit(QUIT));
}

#[test]
fn test_engine_exit_unblocks_move_request() {
    let dir = TempDir::new().unwrap();
    let config = shell_engine(
        &dir,
        "crasher",
        r#"while read -r cmd rest; do
  if [ "$cmd" = go ]; then exit 3; fi
done
"#,
    );
    let mut client = EngineClient::new(config);
    client.start().unwrap();

    let started = Instant::now();
    assert_eq!(client.request_move(100), None);
    assert!(started.elapsed() < Duration::from_secs(5));

    // Already gone: quit succeeds and later commands fail or are ignored.
    assert!(client.quit(QUIT));
    assert!(client.notify_move(3).is_err());
}

#[test]
fn test_exit_unblocks_request_while_child_holds_output() {
    let dir = TempDir::new().unwrap();
    // The background sleep keeps the stdout pipe open after the engine exits.
    let config = shell_engine(
        &dir,
        "forker",
        r#"while read -r cmd rest; do
  if [ "$cmd" = go ]; then sleep 6 & exit 3; fi
done
"#,
    );
    let mut client = EngineClient::new(config);
    client.start().unwrap();

    let started = Instant::now();
    assert_eq!(client.request_move(100), None);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!client.is_running());
    assert!(client.quit(QUIT));
}

#[test]
fn test_engine_ignoring_quit_is_reported_and_killable() {
    let dir = TempDir::new().unwrap();
    let config = shell_engine(
        &dir,
        "stubborn",
        r#"trap '' TERM
while read -r line; do :; done
exec sleep 30
"#,
    );
    let mut client = EngineClient::new(config);
    client.start().unwrap();

    assert!(!client.quit(Duration::from_millis(200)));
    assert!(client.is_running());
    client.kill();
    assert!(!client.is_running());
}

#[test]
fn test_viewer_waits_for_acknowledgement() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("viewer.sh");
    let seen = dir.path().join("seen.txt");
    std::fs::write(
        &script,
        format!(
            r#"while read -r cmd rest; do
  echo "$cmd $rest" >> "{}"
  case "$cmd" in
    winner) sleep 0.2; echo "ok" ;;
    quit) exit 0 ;;
  esac
done
"#,
            seen.display()
        ),
    )
    .unwrap();

    let mut viewer = Viewer::new("/bin/sh", &script.display().to_string());
    viewer.start().unwrap();
    viewer.set_position(&Position::new(5)).unwrap();
    viewer.notify_result(Some(Color::White)).unwrap();

    // The acknowledgement is written after the command was recorded.
    let lines = std::fs::read_to_string(&seen).unwrap();
    let lines: Vec<&str> = lines.lines().collect();
    assert_eq!(lines[0], format!("pos {}", Position::new(5)));
    assert_eq!(lines[1], "winner white");
    assert!(viewer.quit(QUIT));
}

#[test]
fn test_match_between_shell_engines() {
    let dir = TempDir::new().unwrap();
    // Row 0 from cell 0 and row 1 from cell 9: whoever is Black wins.
    let first = counting_engine(&dir, "first", 0);
    let second = counting_engine(&dir, "second", 9);
    let config = GameConfig {
        board_size: 9,
        time_limit_ms_per_move: 50,
        game_log_path: dir.path().join("game.txt"),
        game_stats_path: dir.path().join("stats.json"),
        seed: Some(3),
        ..GameConfig::default()
    };

    let mut runner = MatchRunner::from_config(config, first, second);
    let summary = runner.start(2).unwrap();
    assert_eq!(runner.state(), RunState::Done);
    assert_eq!(summary.games_played, 2);
    assert_eq!(summary.names, ["first".to_string(), "second".to_string()]);

    let stats: Vec<PlayerStatistic> =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("stats.json")).unwrap())
            .unwrap();
    assert_eq!(stats[0].label, "first");
    assert_eq!(stats[0].win_count, [1, 0]);
    assert_eq!(stats[0].loss_count, [0, 1]);
    assert_eq!(stats[1].win_count, [1, 0]);
    assert_eq!(stats[1].loss_count, [0, 1]);

    let log = std::fs::read_to_string(dir.path().join("game.txt")).unwrap();
    let empty = Position::new(9).to_string();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines[0], format!("{} 091102113124", empty));
    assert_eq!(lines[1], format!("{} 13514615716817", empty));
}

#[test]
fn test_missing_engine_fails_startup() {
    let dir = TempDir::new().unwrap();
    let first = counting_engine(&dir, "first", 0);
    let second = EngineConfig {
        name: "ghost".to_string(),
        path: dir.path().join("does-not-exist"),
        args: String::new(),
        work_dir: None,
    };
    let config = GameConfig {
        game_log_path: dir.path().join("game.txt"),
        game_stats_path: dir.path().join("stats.json"),
        ..GameConfig::default()
    };

    let mut runner = MatchRunner::from_config(config, first, second);
    let err = runner.start(1).unwrap_err();
    assert!(err.to_string().starts_with("Cannot execute"));
    assert!(err.to_string().contains("does-not-exist"));
    assert_eq!(runner.state(), RunState::Failed);
    assert!(!dir.path().join("game.txt").exists());
}

#[test]
fn test_missing_display_fails_startup() {
    let dir = TempDir::new().unwrap();
    let config = GameConfig {
        game_log_path: dir.path().join("game.txt"),
        game_stats_path: dir.path().join("stats.json"),
        viewer_path: Some(dir.path().join("no-viewer")),
        ..GameConfig::default()
    };
    let first = counting_engine(&dir, "first", 0);
    let second = counting_engine(&dir, "second", 9);

    let mut runner = MatchRunner::from_config(config, first, second);
    let err = runner.start(1).unwrap_err();
    assert!(err.to_string().starts_with("Cannot execute"));
    assert!(err.to_string().contains("no-viewer"));
    assert_eq!(runner.state(), RunState::Failed);
}
