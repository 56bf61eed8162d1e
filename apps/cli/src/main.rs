//! dailyvocab CLI — daily vocabulary generator.
//!
//! Generates new vocabulary words with an LLM, enriches them with video
//! prompts and captions, and appends them to a local vocabulary sheet.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; the environment may already carry the key.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
