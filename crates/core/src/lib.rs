#![warn(clippy::all, missing_docs)]

//! Core game logic for the Cities word-chain game.
//!
//! This crate hosts the city catalog, the bad-letter index, the turn engine
//! and the session driver, together with dataset loading and configuration
//! used by the terminal front-end.

pub mod catalog;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod letters;
pub mod session;

pub use catalog::{normalize, Catalog, CityName};
pub use config::{AppConfig, Interface};
pub use dataset::{CityRecord, DatasetSource, HttpSource, JsonFileSource, StaticSource};
pub use engine::{Outcome, Phase, Side, TurnEngine, TurnResult, TurnState};
pub use error::{CatalogError, DatasetError, GameError, InputError};
pub use letters::{Alphabet, BadLetterIndex};
pub use session::{GameEvent, GameReport, GameSession, Narrator, Prompt, Prompter, SaveHook};
