//! ReadWatch CLI: spot articles and videos while browsing and save the good ones.
//!
//! Drives the coordinator, page observers and review flow against pages
//! fetched over HTTP or fed as tab events on stdin.

mod commands;
mod watch;

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
