//! Application configuration.
//!
//! Settings come from `<config dir>/cities/config.toml`, overridden by
//! `CITIES_*` environment variables (`CITIES_DATASET`, `CITIES_INTERFACE`, ...).

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::letters::{Alphabet, RUSSIAN};

/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "cities";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "CITIES";

const DEFAULT_CONFIG: &str = r#"# Cities game configuration.

# Path to a JSON list of cities, or an http(s) URL serving one.
dataset = "data/cities.json"

# Letters of the game's language, in order.
alphabet = "абвгдеёжзийклмнопрстуфхцчшщъыьэюя"

# "tui" for the full-screen interface, "console" for plain line input.
interface = "tui"

# Directory for log files.
log_dir = "logs"
"#;

/// Which front-end drives the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    /// Full-screen ratatui interface.
    #[default]
    Tui,
    /// Line-based stdin/stdout play.
    Console,
}

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// File path or URL of the cities dataset.
    pub dataset: String,
    /// Letters of the game alphabet.
    pub alphabet: String,
    /// Front-end to start.
    pub interface: Interface,
    /// Where log files are written.
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset: "data/cities.json".to_string(),
            alphabet: RUSSIAN.to_string(),
            interface: Interface::Tui,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    /// Load from the default config file location plus environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from a specific file (which may be missing) plus environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Alphabet built from the configured letters, falling back to Russian
    /// when the setting is blank.
    pub fn alphabet(&self) -> Alphabet {
        let alphabet = Alphabet::new(&self.alphabet);
        if alphabet.is_empty() {
            Alphabet::russian()
        } else {
            alphabet
        }
    }
}

/// Location of the user's config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write the default config file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    info!(path = %path.display(), "Default config written");
    Ok(())
}
