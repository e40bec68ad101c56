//! pdfqa CLI: ask questions about a PDF, backed by a libSQL vector store.
//!
//! Indexes a PDF URL into a collection, then answers questions with a
//! tool-calling chat model that searches that collection.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
