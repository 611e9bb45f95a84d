//! Scenario driver for the aura runtime.
//!
//! Run with: `aura-sim run --catalog demos/spells.ron --scenario demos/scenarios/duel.ron`

mod commands;
mod logging;
mod sim;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use commands::{Inspect, Run};

/// Aura runtime simulator
#[derive(Parser)]
#[command(name = "aura-sim")]
#[command(about = "Replay aura scenarios and inspect spell catalogs", long_about = None)]
#[command(version)]
struct Cli {
    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Replay a scenario against a spell catalog
    Run(Run),

    /// List spells of a catalog
    Inspect(Inspect),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init(cli.log_dir.as_deref())?;

    match cli.command {
        Command::Run(cmd) => cmd.execute(),
        Command::Inspect(cmd) => cmd.execute(),
    }
}
