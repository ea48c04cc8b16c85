//! ManyBodyLab CLI — fetch the organization's enriched member list.
//!
//! Runs the same directory pipeline the site's People page renders from.

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
