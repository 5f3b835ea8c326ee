use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Delivery forecast board for a file-backed task list.
/// Storage defaults to ~/.dfc/tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "dfc", version, about = "Forecast task delivery, risk and confidence")]
pub struct Cli {
    /// Path to the JSON task file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
