//! Plain line-based front-end over stdin/stdout.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use cities_core::{
    config::AppConfig,
    dataset,
    engine::Side,
    error::GameError,
    session::{GameEvent, GameReport, GameSession, Narrator, Prompt, Prompter},
};
use tokio::task;
use tracing::info;

struct StdinPrompter {
    stdin: io::Stdin,
}

impl Prompter for StdinPrompter {
    fn prompt(&mut self, prompt: &Prompt) -> Option<String> {
        print!("{prompt}: ");
        io::stdout().flush().ok()?;
        let mut line = String::new();
        match self.stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()),
        }
    }
}

struct ConsoleNarrator;

impl Narrator for ConsoleNarrator {
    fn narrate(&mut self, event: &GameEvent) {
        match event {
            GameEvent::CityNamed {
                side: Side::Computer,
                city,
                ..
            } if city.population > 0 => {
                println!("{event}");
                println!("  ({}, {}, население {})", city.subject, city.district, city.population);
            }
            _ => println!("{event}"),
        }
    }

    fn report(&mut self, report: &GameReport) {
        println!();
        println!("{report}");
        for (index, (side, city)) in report.history.iter().enumerate() {
            println!("{:>3}. {:<10} {city}", index + 1, side.to_string());
        }
    }
}

/// Play one game on the terminal without the full-screen UI.
pub async fn run(config: AppConfig) -> Result<()> {
    let result = task::spawn_blocking(move || {
        let source = dataset::source_for(&config.dataset);
        let session = GameSession::load(source.as_ref(), config.alphabet());
        let mut prompter = StdinPrompter { stdin: io::stdin() };
        session.run(&mut prompter, &mut ConsoleNarrator)
    })
    .await
    .context("console session task failed")?;

    match result {
        Ok(report) => {
            info!(moves = report.move_count, outcome = ?report.outcome, "Console game finished");
            Ok(())
        }
        Err(GameError::InputClosed) => {
            println!();
            Ok(())
        }
        Err(err) => Err(err).context("console session failed"),
    }
}
