//! contextpairs CLI: rebuild conversation context for exported replies.
//!
//! Reads a reply export, recovers each reply's ancestor thread from the
//! archive, and appends sanitized context/response pairs to an NDJSON dataset.

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
