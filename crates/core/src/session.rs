//! A full game from the opening letter to the final report.
//!
//! [`GameSession`] composes a dataset collaborator with a [`TurnEngine`] and
//! talks to the outside world only through [`Prompter`] (input) and
//! [`Narrator`] (output).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    catalog::Catalog,
    dataset::{CityRecord, DatasetSource},
    engine::{LossReason, Outcome, Side, TurnEngine, TurnResult, TurnState},
    error::{GameError, InputError},
    letters::Alphabet,
};

/// A request for one line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// The opening letter.
    FirstLetter,
    /// A city starting with the given letter.
    City(char),
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::FirstLetter => f.write_str("Введите первую букву"),
            Prompt::City(letter) => write!(f, "Назовите город на букву '{letter}'"),
        }
    }
}

/// Input boundary: returns one line per prompt, `None` once input is closed.
pub trait Prompter {
    /// Ask for one line; `None` once input is closed.
    fn prompt(&mut self, prompt: &Prompt) -> Option<String>;
}

impl<F> Prompter for F
where
    F: FnMut(&Prompt) -> Option<String>,
{
    fn prompt(&mut self, prompt: &Prompt) -> Option<String> {
        self(prompt)
    }
}

/// Things worth telling the player while a game runs.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// The dataset could not be loaded; the game runs on an empty catalog.
    DatasetUnavailable {
        /// Error chain of the failed load.
        reason: String,
    },
    /// An opening letter was refused and will be asked for again.
    FirstLetterRejected {
        /// What was entered, trimmed.
        input: String,
        /// Why it was refused.
        error: InputError,
    },
    /// The opening letter was accepted.
    GameStarted {
        /// The opening letter.
        letter: char,
        /// Cities in play.
        cities: usize,
    },
    /// A side named a valid city.
    CityNamed {
        /// Who named it.
        side: Side,
        /// The accepted city.
        city: CityRecord,
        /// Letter the other side must continue with.
        next_letter: char,
    },
    /// A side failed its turn and lost.
    TurnLost {
        /// The losing side.
        side: Side,
        /// What went wrong.
        reason: LossReason,
    },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::DatasetUnavailable { reason } => {
                write!(f, "Список городов недоступен ({reason}), играем без городов")
            }
            GameEvent::FirstLetterRejected { error, .. } => write!(f, "{error}"),
            GameEvent::GameStarted { letter, cities } => {
                write!(f, "Городов в игре: {cities}, начинаем с буквы '{letter}'")
            }
            GameEvent::CityNamed {
                side: Side::Computer,
                city,
                next_letter,
            } => write!(
                f,
                "Компьютер называет город {}. Вам на букву '{next_letter}'",
                city.name
            ),
            GameEvent::CityNamed {
                side: Side::Human,
                city,
                next_letter,
            } => write!(f, "Вы назвали город {}. Компьютеру на букву '{next_letter}'", city.name),
            GameEvent::TurnLost {
                side: Side::Computer,
                reason,
            } => write!(f, "Компьютер сдаётся: {reason}. Вы победили!"),
            GameEvent::TurnLost {
                side: Side::Human,
                reason,
            } => write!(f, "Вы проиграли: {reason}"),
        }
    }
}

/// Summary handed to the output boundary when a game ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameReport {
    /// Attempted turns, including the one that ended the game.
    pub move_count: u32,
    /// Cities accepted during the game.
    pub cities_named: u32,
    /// Who lost.
    pub outcome: Outcome,
    /// Accepted cities in play order.
    pub history: Vec<(Side, String)>,
    /// When the session started running.
    pub started_at: DateTime<Utc>,
    /// When the losing turn was played.
    pub finished_at: DateTime<Utc>,
}

impl fmt::Display for GameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Игра окончена. Ходов: {}, названо городов: {}. Итог: {}",
            self.move_count, self.cities_named, self.outcome
        )
    }
}

/// Output boundary.
pub trait Narrator {
    /// Tell the player what just happened.
    fn narrate(&mut self, event: &GameEvent);

    /// Show the final summary.
    fn report(&mut self, report: &GameReport);
}

/// Optional persistence extension point, called after every turn.
pub trait SaveHook {
    /// Called with the state after every turn.
    fn save(&mut self, state: &TurnState);
}

/// The default hook: games are not persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSave;

impl SaveHook for NoSave {
    fn save(&mut self, _state: &TurnState) {}
}

/// One game, from loading the cities to the final report.
pub struct GameSession {
    engine: TurnEngine,
    dataset_failure: Option<String>,
    save_hook: Box<dyn SaveHook + Send>,
    history: Vec<(Side, String)>,
}

impl GameSession {
    /// Load cities from `source`. A failing source leaves the catalog empty,
    /// which makes the computer lose its first turn.
    pub fn load(source: &dyn DatasetSource, alphabet: Alphabet) -> Self {
        match source.load() {
            Ok(records) => Self::new(Catalog::from_records(records), alphabet),
            Err(err) => {
                warn!(source = %source.describe(), error = ?err, "Dataset unavailable");
                let mut session = Self::new(Catalog::default(), alphabet);
                session.dataset_failure = Some(describe_error(&err));
                session
            }
        }
    }

    /// Session over an already built catalog.
    pub fn new(catalog: Catalog, alphabet: Alphabet) -> Self {
        Self {
            engine: TurnEngine::new(catalog, alphabet),
            dataset_failure: None,
            save_hook: Box::new(NoSave),
            history: Vec::new(),
        }
    }

    /// Replace the default no-op save hook.
    pub fn with_save_hook(mut self, hook: impl SaveHook + Send + 'static) -> Self {
        self.save_hook = Box::new(hook);
        self
    }

    /// The engine driving this session.
    pub fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    /// Why the dataset could not be loaded, if it could not.
    pub fn dataset_failure(&self) -> Option<&str> {
        self.dataset_failure.as_deref()
    }

    /// Ask for the opening letter until a usable one arrives. Rejections are
    /// narrated and never count as moves.
    pub fn acquire_first_letter(
        &mut self,
        prompter: &mut dyn Prompter,
        narrator: &mut dyn Narrator,
    ) -> Result<char, GameError> {
        loop {
            let input = prompter
                .prompt(&Prompt::FirstLetter)
                .ok_or(GameError::InputClosed)?;
            match self.engine.begin(&input)? {
                Ok(letter) => {
                    narrator.narrate(&GameEvent::GameStarted {
                        letter,
                        cities: self.engine.catalog().len(),
                    });
                    return Ok(letter);
                }
                Err(error) => {
                    info!(input = %input.trim(), %error, "First letter rejected");
                    narrator.narrate(&GameEvent::FirstLetterRejected {
                        input: input.trim().to_string(),
                        error,
                    });
                }
            }
        }
    }

    /// Play a whole game and report the result.
    pub fn run(
        mut self,
        prompter: &mut dyn Prompter,
        narrator: &mut dyn Narrator,
    ) -> Result<GameReport, GameError> {
        let started_at = Utc::now();
        if let Some(reason) = self.dataset_failure.clone() {
            narrator.narrate(&GameEvent::DatasetUnavailable { reason });
        }

        let first_letter = self.acquire_first_letter(prompter, narrator)?;

        loop {
            let result = self.engine.play_computer()?;
            let Some(letter) = self.after_turn(Side::Computer, result, narrator) else {
                break;
            };

            let input = prompter.prompt(&Prompt::City(letter)).unwrap_or_default();
            let result = self.engine.play_human(&input)?;
            if self.after_turn(Side::Human, result, narrator).is_none() {
                break;
            }
        }

        let state = self
            .engine
            .state()
            .cloned()
            .unwrap_or_else(|| TurnState::new(first_letter));
        let report = GameReport {
            move_count: state.move_count(),
            cities_named: state.cities_named(),
            outcome: state.outcome(),
            history: self.history,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            moves = report.move_count,
            cities = report.cities_named,
            outcome = ?report.outcome,
            "Session finished"
        );
        narrator.report(&report);
        Ok(report)
    }

    /// Narrate a turn and run the save hook. Returns the next required letter,
    /// or `None` once the game is over.
    fn after_turn(
        &mut self,
        side: Side,
        result: TurnResult,
        narrator: &mut dyn Narrator,
    ) -> Option<char> {
        if let Some(state) = self.engine.state() {
            self.save_hook.save(state);
        }
        match result {
            TurnResult::Accepted { city, next_letter } => {
                self.history.push((side, city.name.clone()));
                narrator.narrate(&GameEvent::CityNamed {
                    side,
                    city,
                    next_letter,
                });
                Some(next_letter)
            }
            TurnResult::Lost(reason) => {
                narrator.narrate(&GameEvent::TurnLost { side, reason });
                None
            }
        }
    }
}

fn describe_error(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::dataset::{JsonFileSource, StaticSource};

    #[derive(Default)]
    struct Transcript {
        events: Vec<GameEvent>,
        reports: Vec<GameReport>,
    }

    impl Narrator for Transcript {
        fn narrate(&mut self, event: &GameEvent) {
            self.events.push(event.clone());
        }

        fn report(&mut self, report: &GameReport) {
            self.reports.push(report.clone());
        }
    }

    fn scripted(lines: &[&str]) -> impl FnMut(&Prompt) -> Option<String> {
        let mut queue: VecDeque<String> = lines.iter().map(|line| line.to_string()).collect();
        move |_prompt: &Prompt| queue.pop_front()
    }

    fn play(names: &[&str], inputs: &[&str]) -> (Result<GameReport, GameError>, Transcript) {
        let session = GameSession::load(
            &StaticSource::from_names(names.iter().copied()),
            Alphabet::russian(),
        );
        let mut narrator = Transcript::default();
        let mut prompter = scripted(inputs);
        let report = session.run(&mut prompter, &mut narrator);
        (report, narrator)
    }

    fn narration(transcript: &Transcript) -> Vec<String> {
        transcript.events.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn two_city_game_ends_with_the_computer_stuck() -> Result<(), GameError> {
        let (report, transcript) = play(&["Москва", "Астана"], &["м", "Астана"]);
        let report = report?;

        assert_eq!(report.outcome, Outcome::ComputerLost);
        assert_eq!(report.cities_named, 2);
        // every attempted turn counts, including the computer's failed third
        // one; accepted cities are tracked separately above
        assert_eq!(report.move_count, 3);
        assert_eq!(
            report.history,
            vec![
                (Side::Computer, "Москва".to_string()),
                (Side::Human, "Астана".to_string()),
            ]
        );
        assert!(matches!(
            &transcript.events[1],
            GameEvent::CityNamed { side: Side::Computer, city, next_letter: 'а' } if city.name == "Москва"
        ));
        assert_eq!(
            transcript.events.last(),
            Some(&GameEvent::TurnLost {
                side: Side::Computer,
                reason: LossReason::NoCityForLetter('а'),
            })
        );
        assert_eq!(transcript.reports, vec![report]);
        Ok(())
    }

    #[test]
    fn narration_speaks_russian() -> Result<(), GameError> {
        let (report, transcript) = play(&["Москва", "Астана"], &["м", "Астана"]);
        assert_eq!(
            narration(&transcript),
            vec![
                "Городов в игре: 2, начинаем с буквы 'м'".to_string(),
                "Компьютер называет город Москва. Вам на букву 'а'".to_string(),
                "Вы назвали город Астана. Компьютеру на букву 'а'".to_string(),
                "Компьютер сдаётся: не осталось городов на букву 'а'. Вы победили!".to_string(),
            ]
        );
        assert_eq!(
            report?.to_string(),
            "Игра окончена. Ходов: 3, названо городов: 2. Итог: компьютер проиграл"
        );
        assert_eq!(Prompt::City('к').to_string(), "Назовите город на букву 'к'");
        Ok(())
    }

    #[test]
    fn invalid_first_letters_are_reprompted_without_moves() -> Result<(), GameError> {
        let (report, transcript) = play(&["Москва", "Астана"], &["7", "мо", "ы", "", "м", "Астана"]);
        let report = report?;

        let rejections: Vec<_> = transcript
            .events
            .iter()
            .filter_map(|event| match event {
                GameEvent::FirstLetterRejected { error, .. } => Some(error.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            rejections,
            vec![
                InputError::InvalidFirstLetter("7".to_string()),
                InputError::InvalidFirstLetter("мо".to_string()),
                InputError::NoCityForLetter('ы'),
                InputError::InvalidFirstLetter(String::new()),
            ]
        );
        // rejections are not moves, so this matches the two-city game above
        assert_eq!(report.move_count, 3);
        Ok(())
    }

    #[test]
    fn reusing_a_city_loses() -> Result<(), GameError> {
        // computer: Абакан -> н, human: Находка -> а, computer: Азов -> а,
        // human repeats Абакан
        let (report, transcript) = play(
            &["Анапа", "Абакан", "Находка", "Азов"],
            &["а", "Находка", "абакан"],
        );
        let report = report?;

        assert_eq!(report.outcome, Outcome::HumanLost);
        assert_eq!(report.move_count, 4);
        assert_eq!(report.cities_named, 3);
        assert_eq!(
            transcript.events.last(),
            Some(&GameEvent::TurnLost {
                side: Side::Human,
                reason: LossReason::UnknownOrUsed("абакан".to_string()),
            })
        );
        Ok(())
    }

    #[test]
    fn wrong_first_letter_loses_even_for_an_unused_city() -> Result<(), GameError> {
        let (report, transcript) = play(&["Москва", "Астана", "Омск"], &["м", "Омск"]);
        let report = report?;

        assert_eq!(report.outcome, Outcome::HumanLost);
        assert_eq!(report.move_count, 2);
        assert_eq!(
            transcript.events.last(),
            Some(&GameEvent::TurnLost {
                side: Side::Human,
                reason: LossReason::WrongLetter {
                    expected: 'а',
                    found: Some('о'),
                },
            })
        );
        Ok(())
    }

    #[test]
    fn empty_dataset_loses_on_the_first_computer_turn() -> Result<(), GameError> {
        let (report, transcript) = play(&[], &["1", "а"]);
        let report = report?;

        assert_eq!(report.outcome, Outcome::ComputerLost);
        assert_eq!(report.move_count, 1);
        assert_eq!(report.cities_named, 0);
        assert_eq!(
            transcript.events,
            vec![
                GameEvent::FirstLetterRejected {
                    input: "1".to_string(),
                    error: InputError::InvalidFirstLetter("1".to_string()),
                },
                GameEvent::GameStarted {
                    letter: 'а',
                    cities: 0,
                },
                GameEvent::TurnLost {
                    side: Side::Computer,
                    reason: LossReason::NoCityForLetter('а'),
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn missing_dataset_is_reported_not_fatal() {
        let session = GameSession::load(
            &JsonFileSource::new("/nowhere/cities.json"),
            Alphabet::russian(),
        );
        assert!(session.engine().catalog().is_empty());
        assert!(session.dataset_failure().is_some());

        let mut narrator = Transcript::default();
        let mut prompter = scripted(&[]);
        let result = session.run(&mut prompter, &mut narrator);
        assert_eq!(result, Err(GameError::InputClosed));
        assert!(matches!(
            narrator.events.first(),
            Some(GameEvent::DatasetUnavailable { .. })
        ));
    }

    #[test]
    fn closed_input_during_a_turn_counts_as_a_loss() -> Result<(), GameError> {
        let (report, _) = play(&["Москва", "Астана"], &["м"]);
        let report = report?;
        assert_eq!(report.outcome, Outcome::HumanLost);
        assert_eq!(report.move_count, 2);
        Ok(())
    }

    #[test]
    fn identical_inputs_replay_identically() -> Result<(), GameError> {
        let names = ["Анапа", "Абакан", "Находка", "Азов", "Владимир", "Рязань"];
        // Абакан, Находка, Азов, Владимир, Рязань, then input runs out
        let inputs = ["а", "Находка", "Владимир"];
        let (first, first_log) = play(&names, &inputs);
        let (second, second_log) = play(&names, &inputs);
        let (first, second) = (first?, second?);

        assert_eq!(narration(&first_log), narration(&second_log));
        assert_eq!(first.move_count, second.move_count);
        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.history, second.history);
        assert_eq!(first.cities_named, 5);
        assert_eq!(first.outcome, Outcome::HumanLost);
        Ok(())
    }

    #[test]
    fn save_hook_sees_every_turn() -> Result<(), GameError> {
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Recorder(Arc<Mutex<Vec<u32>>>);

        impl SaveHook for Recorder {
            fn save(&mut self, state: &TurnState) {
                if let Ok(mut moves) = self.0.lock() {
                    moves.push(state.move_count());
                }
            }
        }

        let recorder = Recorder::default();
        let session = GameSession::new(Catalog::from_names(["Москва", "Астана"]), Alphabet::russian())
            .with_save_hook(recorder.clone());
        let mut narrator = Transcript::default();
        let mut prompter = scripted(&["м", "Астана"]);
        session.run(&mut prompter, &mut narrator)?;

        let seen = recorder.0.lock().map(|moves| moves.clone()).unwrap_or_default();
        assert_eq!(seen, vec![1, 2, 3]);
        Ok(())
    }
}
