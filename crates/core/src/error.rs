//! Error taxonomy for the game core.
//!
//! Losing a game is not an error: [`crate::engine::Outcome`] carries the
//! terminal values. The types here describe input that must be re-prompted,
//! bookkeeping mistakes and collaborator failures.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::engine::Phase;

/// Rejections raised while acquiring the first letter. Both are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Empty, multi-character or non-alphabet entry.
    #[error("нужна одна буква алфавита, введено {0:?}")]
    InvalidFirstLetter(String),
    /// The letter is valid but no city in the catalog starts with it.
    #[error("нет городов на букву '{0}', выберите другую")]
    NoCityForLetter(char),
}

/// Catalog bookkeeping failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The city is not (or no longer) part of the catalog.
    #[error("города {0:?} нет в списке")]
    NotFound(String),
}

/// Failures of a dataset source. The session treats all of them as an
/// unavailable dataset and continues with an empty catalog.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The dataset file could not be read.
    #[error("не удалось прочитать список городов {path}")]
    Read {
        /// Location of the dataset.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The payload is not a valid list of city records.
    #[error("не удалось разобрать список городов {location}")]
    Parse {
        /// File path or URL of the dataset.
        location: String,
        /// Underlying decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The remote dataset could not be downloaded.
    #[error("не удалось загрузить список городов {url}")]
    Fetch {
        /// URL that was requested.
        url: String,
        /// Underlying HTTP failure.
        #[source]
        source: reqwest::Error,
    },
}

/// Misuse of the turn engine or a dead input boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// A turn method was called while the engine was in another phase.
    #[error("ожидалась фаза {expected:?}, игра в фазе {actual:?}")]
    WrongPhase {
        /// Phase the call requires.
        expected: Phase,
        /// Phase the engine was in.
        actual: Phase,
    },
    /// The input boundary stopped producing lines before the game started.
    #[error("ввод закрыт до начала игры")]
    InputClosed,
}
