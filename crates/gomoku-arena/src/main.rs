use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use gomoku_arena::config::{EngineConfig, GameConfig};
use gomoku_arena::match_runner::{MatchRunner, MatchSummary};
use gomoku_core::Color;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE_HINT: &str = "\
Hint
args[0]: game config path (.json or .toml)
args[1]: engine config path
args[2]: engine config path
args[3]: the number of games

Example: gomoku-arena game_config.json engine_config_0.json engine_config_1.json 100";

#[derive(Parser)]
#[command(name = "gomoku-arena")]
#[command(about = "Runs matches between two gomoku engines")]
struct Cli {
    /// Game configuration file
    game_config: Option<PathBuf>,
    /// Configuration of the first engine
    engine0: Option<PathBuf>,
    /// Configuration of the second engine
    engine1: Option<PathBuf>,
    /// Number of games to play
    games: Option<usize>,
    /// Seed for the opening order, overriding the game configuration
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let (Some(game_config), Some(engine0), Some(engine1), Some(games)) =
        (cli.game_config, cli.engine0, cli.engine1, cli.games)
    else {
        println!("{}", USAGE_HINT);
        return ExitCode::SUCCESS;
    };

    match run(&game_config, &engine0, &engine1, games, cli.seed) {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(
    game_config: &Path,
    engine0: &Path,
    engine1: &Path,
    games: usize,
    seed: Option<u64>,
) -> Result<MatchSummary> {
    let mut config = GameConfig::load(game_config)
        .with_context(|| format!("Invalid file: \"{}\"", game_config.display()))?;
    if seed.is_some() {
        config.seed = seed;
    }
    let first = EngineConfig::load(engine0)
        .with_context(|| format!("Invalid file: \"{}\"", engine0.display()))?;
    let second = EngineConfig::load(engine1)
        .with_context(|| format!("Invalid file: \"{}\"", engine1.display()))?;

    info!(
        "{} vs {}: {} game(s) on {}x{}",
        first.name, second.name, games, config.board_size, config.board_size
    );
    let mut runner = MatchRunner::from_config(config, first, second);
    runner
        .start(games)
        .context("Game was suspended.")
}

fn print_summary(summary: &MatchSummary) {
    println!();
    println!("Finished {} game(s)", summary.games_played);
    for (name, stats) in summary.names.iter().zip(&summary.stats) {
        println!("{}", stats.summary(name));
        for color in Color::ALL {
            println!(
                "  as {}: {} game(s), WinRate {:.2}%",
                color.protocol_name(),
                stats.games_as(color),
                stats.win_rate_as(color) * 100.0
            );
        }
    }
}
