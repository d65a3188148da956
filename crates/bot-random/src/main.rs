//! Random move bot - plays a random empty cell.
//!
//! This is the simplest possible engine for the arena's line protocol,
//! useful as a sparring partner and as a template for real engines.

use std::io::{self, BufRead, Write};

use gomoku_core::Position;
use rand::seq::IteratorRandom;
use rand::Rng;

/// Engine state between commands.
struct RandomBot {
    position: Option<Position>,
}

impl RandomBot {
    fn new() -> Self {
        Self { position: None }
    }

    /// Handles one command line, returning the reply if the command has one.
    fn handle<R: Rng>(&mut self, line: &str, rng: &mut R) -> Option<String> {
        let mut tokens = line.split_whitespace();
        match tokens.next()? {
            "pos" => {
                let rest: Vec<&str> = tokens.collect();
                match Position::parse(&rest.join(" ")) {
                    Ok(pos) => self.position = Some(pos),
                    Err(e) => eprintln!("bot-random: {}", e),
                }
                None
            }
            "move" => {
                let coordinate = tokens.next().and_then(|t| t.parse().ok());
                if let (Some(pos), Some(coordinate)) = (&mut self.position, coordinate) {
                    if let Err(e) = pos.apply_move(coordinate) {
                        eprintln!("bot-random: {}", e);
                    }
                }
                None
            }
            "go" => {
                // The time limit is ignored; the move is instant.
                let pos = self.position.as_mut()?;
                let coordinate = (0..pos.cell_count())
                    .filter(|&c| pos.stone_at(c).is_none())
                    .choose(rng)?;
                pos.apply_move(coordinate).ok()?;
                Some(format!("move {}", coordinate))
            }
            // `winner` needs no action.
            _ => None,
        }
    }
}

fn main() -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut rng = rand::thread_rng();
    let mut bot = RandomBot::new();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim() == "quit" {
            break;
        }
        if let Some(reply) = bot.handle(&line, &mut rng) {
            writeln!(stdout, "{}", reply)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
