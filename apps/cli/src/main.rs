//! Postforge CLI — blog harvesting and AI enhancement tool.
//!
//! Harvests the oldest articles from a configured blog into local storage,
//! then researches and rewrites the newest one into an enhanced edition.

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
