//! Turn engine: move validation, catalog bookkeeping and win/loss detection.
//!
//! The engine moves through
//! `AwaitingFirstLetter → ComputerTurn ⇄ HumanTurn → Finished(outcome)`.
//! The computer always moves first. Every accepted city, by either side,
//! sets the next required letter through [`BadLetterIndex::next_letter`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    catalog::{Catalog, CityName},
    dataset::CityRecord,
    error::{GameError, InputError},
    letters::{Alphabet, BadLetterIndex},
};

/// The two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Always opens the game.
    Computer,
    /// The player at the keyboard.
    Human,
}

impl Side {
    /// The other side.
    pub fn opponent(self) -> Self {
        match self {
            Side::Computer => Side::Human,
            Side::Human => Side::Computer,
        }
    }

    /// Outcome recorded when this side fails its turn.
    pub fn loss(self) -> Outcome {
        match self {
            Side::Computer => Outcome::ComputerLost,
            Side::Human => Outcome::HumanLost,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Computer => f.write_str("Компьютер"),
            Side::Human => f.write_str("Вы"),
        }
    }
}

/// Result of a game, `Pending` until somebody fails a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Nobody has failed a turn yet.
    Pending,
    /// The player failed a turn.
    HumanLost,
    /// The computer failed a turn.
    ComputerLost,
}

impl Outcome {
    /// Whether the game is over.
    pub fn is_terminal(self) -> bool {
        self != Outcome::Pending
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pending => f.write_str("игра продолжается"),
            Outcome::HumanLost => f.write_str("вы проиграли"),
            Outcome::ComputerLost => f.write_str("компьютер проиграл"),
        }
    }
}

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for a valid opening letter.
    AwaitingFirstLetter,
    /// The computer names the next city.
    ComputerTurn,
    /// The player names the next city.
    HumanTurn,
    /// The game is over.
    Finished(Outcome),
}

/// Why a turn ended the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReason {
    /// No unused city starts with the required letter.
    NoCityForLetter(char),
    /// The named city does not start with the required letter.
    WrongLetter {
        /// The required letter.
        expected: char,
        /// First letter of what was entered, if anything was.
        found: Option<char>,
    },
    /// The city is unknown or was already named in this session.
    UnknownOrUsed(String),
    /// The city was valid but contains no playable letter to continue from.
    /// Accepted cities start with the required letter, which is playable, so
    /// regular play never ends this way.
    DeadEnd(String),
}

impl fmt::Display for LossReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossReason::NoCityForLetter(letter) => {
                write!(f, "не осталось городов на букву '{letter}'")
            }
            LossReason::WrongLetter {
                expected,
                found: Some(found),
            } => write!(f, "город начинается на '{found}', а нужно на '{expected}'"),
            LossReason::WrongLetter {
                expected,
                found: None,
            } => write!(f, "город не назван, нужен город на '{expected}'"),
            LossReason::UnknownOrUsed(city) => {
                write!(f, "города {city} нет или он уже был назван")
            }
            LossReason::DeadEnd(city) => write!(f, "после города {city} не на что продолжить"),
        }
    }
}

/// Result of a single turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnResult {
    /// The city was accepted and removed from the catalog.
    Accepted {
        /// The city, now removed from the catalog.
        city: CityRecord,
        /// Letter the opponent has to continue with.
        next_letter: char,
    },
    /// The turn failed and the game is over for whoever played it.
    Lost(LossReason),
}

impl TurnResult {
    /// Letter required of the next city, if the turn was accepted.
    pub fn next_letter(&self) -> Option<char> {
        match self {
            TurnResult::Accepted { next_letter, .. } => Some(*next_letter),
            TurnResult::Lost(_) => None,
        }
    }
}

/// Computer move: the smallest unused city starting with `required`.
pub fn computer_turn(required: char, catalog: &mut Catalog, index: &BadLetterIndex) -> TurnResult {
    let Some(candidate) = catalog
        .starting_with(required)
        .next()
        .map(|(name, _)| name.clone())
    else {
        return TurnResult::Lost(LossReason::NoCityForLetter(required));
    };
    accept(candidate, catalog, index)
}

/// Human move: validate `input` against the required letter and the catalog.
pub fn human_turn(
    required: char,
    input: &str,
    catalog: &mut Catalog,
    index: &BadLetterIndex,
) -> TurnResult {
    let candidate = CityName::new(input);
    let found = candidate.first_letter();
    if found != Some(required) {
        return TurnResult::Lost(LossReason::WrongLetter {
            expected: required,
            found,
        });
    }
    if !catalog.contains(&candidate) {
        return TurnResult::Lost(LossReason::UnknownOrUsed(input.trim().to_string()));
    }
    accept(candidate, catalog, index)
}

fn accept(candidate: CityName, catalog: &mut Catalog, index: &BadLetterIndex) -> TurnResult {
    let city = match catalog.remove(&candidate) {
        Ok(city) => city,
        Err(_) => return TurnResult::Lost(LossReason::UnknownOrUsed(candidate.to_string())),
    };
    match index.next_letter(&candidate) {
        Some(next_letter) => TurnResult::Accepted { city, next_letter },
        None => TurnResult::Lost(LossReason::DeadEnd(city.name)),
    }
}

/// Mutable per-game counters. Only [`TurnState::record`] changes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    required_letter: char,
    move_count: u32,
    cities_named: u32,
    to_move: Side,
    outcome: Outcome,
}

impl TurnState {
    /// State at the start of a game; the computer moves first.
    pub fn new(first_letter: char) -> Self {
        Self {
            required_letter: first_letter,
            move_count: 0,
            cities_named: 0,
            to_move: Side::Computer,
            outcome: Outcome::Pending,
        }
    }

    /// Letter the next city must start with.
    pub fn required_letter(&self) -> char {
        self.required_letter
    }

    /// Attempted turns, including the one that ended the game.
    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    /// Cities accepted so far.
    pub fn cities_named(&self) -> u32 {
        self.cities_named
    }

    /// Side whose turn it is.
    pub fn to_move(&self) -> Side {
        self.to_move
    }

    /// Result so far.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Apply the result of a turn played by the side to move. Terminal states
    /// are frozen and ignore further results; returns whether anything changed.
    pub fn record(&mut self, result: &TurnResult) -> bool {
        if self.outcome.is_terminal() {
            return false;
        }
        self.move_count += 1;
        match result {
            TurnResult::Accepted { next_letter, .. } => {
                self.cities_named += 1;
                self.required_letter = *next_letter;
                self.to_move = self.to_move.opponent();
            }
            TurnResult::Lost(_) => self.outcome = self.to_move.loss(),
        }
        true
    }
}

/// Owns the catalog and turn state of one game and enforces turn order.
#[derive(Debug, Clone)]
pub struct TurnEngine {
    catalog: Catalog,
    index: BadLetterIndex,
    state: Option<TurnState>,
}

impl TurnEngine {
    /// Start a game over `catalog`. Bad letters are computed here, from the
    /// catalog as it is now.
    pub fn new(catalog: Catalog, alphabet: Alphabet) -> Self {
        let index = BadLetterIndex::build(&catalog, alphabet);
        debug!(
            cities = catalog.len(),
            bad_letters = index.bad_letters().len(),
            "Turn engine ready"
        );
        Self {
            catalog,
            index,
            state: None,
        }
    }

    /// Current phase, derived from the turn state.
    pub fn phase(&self) -> Phase {
        match &self.state {
            None => Phase::AwaitingFirstLetter,
            Some(state) if state.outcome.is_terminal() => Phase::Finished(state.outcome),
            Some(state) => match state.to_move {
                Side::Computer => Phase::ComputerTurn,
                Side::Human => Phase::HumanTurn,
            },
        }
    }

    /// Cities not yet named.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Bad letters of this game.
    pub fn letters(&self) -> &BadLetterIndex {
        &self.index
    }

    /// Turn state, once the game has started.
    pub fn state(&self) -> Option<&TurnState> {
        self.state.as_ref()
    }

    /// Result so far; `Pending` before the game starts.
    pub fn outcome(&self) -> Outcome {
        self.state
            .as_ref()
            .map(TurnState::outcome)
            .unwrap_or(Outcome::Pending)
    }

    /// Validate the opening letter and hand the first turn to the computer.
    pub fn begin(&mut self, input: &str) -> Result<Result<char, InputError>, GameError> {
        self.expect_phase(Phase::AwaitingFirstLetter)?;
        let letter = match self.index.validate_first_letter(input) {
            Ok(letter) => letter,
            Err(err) => return Ok(Err(err)),
        };
        info!(%letter, cities = self.catalog.len(), "Game started");
        self.state = Some(TurnState::new(letter));
        Ok(Ok(letter))
    }

    /// Let the computer play its turn.
    pub fn play_computer(&mut self) -> Result<TurnResult, GameError> {
        let required = self.required_for(Phase::ComputerTurn)?;
        let result = computer_turn(required, &mut self.catalog, &self.index);
        self.record(Side::Computer, &result);
        Ok(result)
    }

    /// Play the human's turn with the raw text they entered.
    pub fn play_human(&mut self, input: &str) -> Result<TurnResult, GameError> {
        let required = self.required_for(Phase::HumanTurn)?;
        let result = human_turn(required, input, &mut self.catalog, &self.index);
        self.record(Side::Human, &result);
        Ok(result)
    }

    fn required_for(&self, phase: Phase) -> Result<char, GameError> {
        self.expect_phase(phase)?;
        self.state
            .as_ref()
            .map(TurnState::required_letter)
            .ok_or(GameError::WrongPhase {
                expected: phase,
                actual: Phase::AwaitingFirstLetter,
            })
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), GameError> {
        let actual = self.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(GameError::WrongPhase { expected, actual })
        }
    }

    fn record(&mut self, side: Side, result: &TurnResult) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.record(result);
        match result {
            TurnResult::Accepted { city, next_letter } => debug!(
                %side,
                city = %city.name,
                %next_letter,
                moves = state.move_count,
                remaining = self.catalog.len(),
                "City accepted"
            ),
            TurnResult::Lost(reason) => info!(
                %side,
                %reason,
                moves = state.move_count,
                outcome = ?state.outcome,
                "Game over"
            ),
        }
    }
}
