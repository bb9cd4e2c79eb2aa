//! BookForge CLI — research-driven e-book generation.
//!
//! Turns a topic into a reviewed table of contents, generated chapters,
//! optional artwork, and a merged markdown book on disk.

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
