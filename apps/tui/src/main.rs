//! pdfqa TUI: a single form that indexes a PDF and answers questions about it.
//!
//! Built with `ratatui` + `crossterm`. Submissions run on a tokio runtime in
//! the background while the form keeps redrawing.

mod app;
mod screens;
mod widgets;

use std::fs::OpenOptions;
use std::sync::Mutex;

use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    color_eyre::install()?;
    init_file_logging();

    let config = match pdfqa_shared::load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "falling back to default config");
            pdfqa_shared::AppConfig::default()
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;
    app::run(config, runtime.handle().clone())
}

/// Log to `<config_dir>/logs/pdfqa-tui.log`; the terminal belongs to the UI.
fn init_file_logging() {
    let Ok(dir) = pdfqa_shared::config_dir() else {
        return;
    };
    let dir = dir.join("logs");
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("pdfqa-tui.log"))
    else {
        return;
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdfqa=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}
