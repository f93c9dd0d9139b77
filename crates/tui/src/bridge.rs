//! Runs a game session on a blocking worker and connects its input/output
//! boundaries to the UI event loop.

use cities_core::{
    config::AppConfig,
    dataset,
    error::GameError,
    session::{GameEvent, GameReport, GameSession, Narrator, Prompt, Prompter},
};
use tokio::{sync::mpsc, task};
use tracing::{debug, error};

use crate::app::AppEvent;

/// Messages sent from the session worker to the UI.
#[derive(Debug)]
pub enum GameMessage {
    /// The dataset was loaded and the engine is ready.
    Ready {
        cities: usize,
        bad_letters: Vec<char>,
        dataset: String,
    },
    Event(GameEvent),
    Prompt(Prompt),
    Finished(Result<GameReport, GameError>),
}

struct ChannelPrompter {
    events: mpsc::Sender<AppEvent>,
    lines: mpsc::Receiver<String>,
}

impl Prompter for ChannelPrompter {
    fn prompt(&mut self, prompt: &Prompt) -> Option<String> {
        self.events
            .blocking_send(AppEvent::Game(GameMessage::Prompt(*prompt)))
            .ok()?;
        self.lines.blocking_recv()
    }
}

struct ChannelNarrator {
    events: mpsc::Sender<AppEvent>,
}

impl Narrator for ChannelNarrator {
    fn narrate(&mut self, event: &GameEvent) {
        if self
            .events
            .blocking_send(AppEvent::Game(GameMessage::Event(event.clone())))
            .is_err()
        {
            debug!("UI gone, dropping narration");
        }
    }

    fn report(&mut self, _report: &GameReport) {
        // the report travels with `GameMessage::Finished`
    }
}

/// Start a new game in the background. Lines typed by the player go into the
/// returned sender; dropping it ends the session.
pub fn spawn_session(config: AppConfig, events: mpsc::Sender<AppEvent>) -> mpsc::Sender<String> {
    let (line_tx, line_rx) = mpsc::channel::<String>(8);
    task::spawn_blocking(move || {
        let source = dataset::source_for(&config.dataset);
        let session = GameSession::load(source.as_ref(), config.alphabet());
        let engine = session.engine();
        let ready = GameMessage::Ready {
            cities: engine.catalog().len(),
            bad_letters: engine.letters().bad_letters().iter().copied().collect(),
            dataset: source.describe(),
        };
        if events.blocking_send(AppEvent::Game(ready)).is_err() {
            return;
        }

        let mut prompter = ChannelPrompter {
            events: events.clone(),
            lines: line_rx,
        };
        let mut narrator = ChannelNarrator {
            events: events.clone(),
        };
        let result = session.run(&mut prompter, &mut narrator);
        match &result {
            Err(GameError::InputClosed) => debug!("Session closed before the first letter"),
            Err(err) => error!(%err, "Session ended without a result"),
            Ok(_) => {}
        }
        let _ = events.blocking_send(AppEvent::Game(GameMessage::Finished(result)));
    });
    line_tx
}
