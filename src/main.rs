//! # DFC - Delivery Forecast CLI
//!
//! A terminal delivery-forecast board for a small, file-backed task list.
//! Each task carries an original estimate plus a handful of qualitative risk
//! factors; the board turns those into a forecast duration with a min–max
//! range, a risk tier and a confidence score, and explains how it got there.
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch the interactive board
//! dfc ui
//!
//! # List the riskiest tasks first
//! dfc list --sort delta --desc --risk high
//!
//! # Explain one forecast
//! dfc view MORT-104
//!
//! # Add a task
//! dfc add MORT-200 "Escrow statement" --estimate 4 --complexity high --regulatory
//! ```
//!
//! ## Key Commands
//!
//! - `dfc ui` - Interactive board with search, risk filter, sorting and details
//! - `dfc list` - Forecast table with the same query options as the board
//! - `dfc view <key>` - Forecast explanation for a single task
//! - `dfc add <key> <title>` - Append a task with its risk factors
//! - `dfc reset` - Replace the collection with the demo dataset
//! - `dfc export` - CSV export of the current forecasts
//!
//! Data is stored in `~/.dfc/tasks.json` unless `--db` points elsewhere. A
//! missing or unreadable file is replaced by the demo dataset on load.

use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod db;
pub mod error;
pub mod explain;
pub mod fields;
pub mod forecast;
pub mod logging;
pub mod schedule;
pub mod scoring;
pub mod state;
pub mod task;
pub mod view;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod task_form;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use db::TaskStore;
use state::Board;
use task::Flags;

fn main() {
    logging::init_tracing();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return;
    }

    let db_path = cli.db.clone().unwrap_or_else(default_db_path);
    tracing::debug!("Using task file {}", db_path.display());

    let mut board = Board::open(TaskStore::new(&db_path), Utc::now());

    match cli.command {
        Commands::Ui => cmd_ui(board),

        Commands::List { search, risk, sort, desc, mode, limit } =>
            cmd_list(&board, search, risk, sort, desc, mode, limit),

        Commands::View { key } => cmd_view(&board, key),

        Commands::Add {
            key, title, estimate, url, complexity, dependencies, novelty,
            external_api, integration, regulatory, mobile, web, bt, ft, stage, kind,
        } => {
            let flags = Flags { external_api, integration, regulatory, mobile, web };
            let request = new_task_from_args(
                key, title, estimate, url, complexity, dependencies, novelty,
                flags, bt, ft, stage, kind,
            );
            cmd_add(&mut board, request);
        }

        Commands::Reset { yes } => cmd_reset(&mut board, yes),

        Commands::Export { output } => cmd_export(&board, output),

        Commands::Completions { .. } => unreachable!("completions handled above"),
    }
}

/// `~/.dfc/tasks.json`, creating the directory when needed.
fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let dfc_dir = PathBuf::from(home).join(".dfc");
    if let Err(e) = std::fs::create_dir_all(&dfc_dir) {
        eprintln!("Failed to create dfc directory {}: {}", dfc_dir.display(), e);
        std::process::exit(1);
    }
    dfc_dir.join("tasks.json")
}
