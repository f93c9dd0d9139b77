mod app;
mod block_font;
mod bridge;
mod console;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use cities_core::config::{self, AppConfig, Interface};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load_from(&config_path)?;
    init_logging(&config)?;
    info!(
        config = %config_path.display(),
        interface = ?config.interface,
        dataset = %config.dataset,
        "Starting cities"
    );

    match config.interface {
        Interface::Console => console::run(config).await,
        Interface::Tui => {
            let mut app = app::CitiesApp::new(config);
            app.run().await
        }
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(&config.log_dir);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("cities.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // the full-screen UI owns the terminal, so only console mode logs to stderr
    let stderr_layer = (config.interface == Interface::Console).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(LevelFilter::WARN)
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
