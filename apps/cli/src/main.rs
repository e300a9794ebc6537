//! jbook-nav CLI — navigate an unbuilt Jupyter Book through a Jupyter server.
//!
//! Fetches the table of contents from the companion server extension,
//! reconciles book paths with the browser's directory, and reports
//! document titles and book metadata.

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
