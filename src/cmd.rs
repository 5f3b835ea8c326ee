//! Command implementations for the CLI interface.
//!
//! Each subcommand loads the board through the task store, runs the view
//! pipeline or dispatches a board event, and prints the result. Failures that
//! the user must see are reported on stderr with a non-zero exit.

use std::io::{self, BufRead, Write};

use chrono::{Local, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::db::*;
use crate::explain::explain;
use crate::fields::*;
use crate::state::{Board, BoardEvent, Dispatch};
use crate::task::{Flags, NewTask};
use crate::tui::run::run_tui;
use crate::view::{compute_view, SortState, ViewQuery};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive forecast board.
    Ui,

    /// List tasks with forecasts, risk and confidence.
    List {
        /// Case-insensitive text matched against key and title.
        #[arg(long)]
        search: Option<String>,
        /// Risk filter: all | low | medium | high.
        #[arg(long, value_enum, default_value_t = RiskFilter::All)]
        risk: RiskFilter,
        /// Sort column.
        #[arg(long, value_enum, default_value_t = SortField::Key)]
        sort: SortField,
        /// Sort descending.
        #[arg(long)]
        desc: bool,
        /// Show the forecast in days or as calendar dates.
        #[arg(long, value_enum, default_value_t = ViewMode::Days)]
        mode: ViewMode,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Explain the forecast for one task.
    View {
        /// Task key, e.g. MORT-104.
        key: String,
    },

    /// Add a new task.
    Add {
        /// Unique task key.
        key: String,
        /// Short title for the task.
        title: String,
        /// Original estimate in days (positive integer).
        #[arg(long, allow_negative_numbers = true)]
        estimate: i64,
        /// Link to the task in the tracker.
        #[arg(long)]
        url: Option<String>,
        #[arg(long, value_enum, default_value_t = Level::Medium)]
        complexity: Level,
        #[arg(long, value_enum, default_value_t = Level::Medium)]
        dependencies: Level,
        #[arg(long, value_enum, default_value_t = Level::Medium)]
        novelty: Level,
        /// Depends on an external API.
        #[arg(long)]
        external_api: bool,
        /// Requires integration work.
        #[arg(long)]
        integration: bool,
        /// Subject to regulatory review.
        #[arg(long)]
        regulatory: bool,
        /// Touches the mobile app.
        #[arg(long)]
        mobile: bool,
        /// Touches the web interface.
        #[arg(long)]
        web: bool,
        /// Business requirement this task traces to.
        #[arg(long)]
        bt: Option<String>,
        /// Functional requirement this task traces to.
        #[arg(long)]
        ft: Option<String>,
        #[arg(long, value_enum, default_value_t = Stage::InProgress)]
        stage: Stage,
        #[arg(long = "type", value_enum, default_value_t = TaskType::Feature)]
        kind: TaskType,
    },

    /// Replace all tasks with the demo dataset.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Export the forecast table to CSV.
    Export {
        /// Output file; prints to stdout when omitted.
        #[arg(long)]
        output: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Launch the board, exiting on terminal errors.
pub fn cmd_ui(board: Board) {
    if let Err(e) = run_tui(board) {
        eprintln!("Error running UI: {}", e);
        std::process::exit(1);
    }
}

pub fn cmd_list(
    board: &Board,
    search: Option<String>,
    risk: RiskFilter,
    sort: SortField,
    desc: bool,
    mode: ViewMode,
    limit: Option<usize>,
) {
    let query = ViewQuery {
        search: search.unwrap_or_default(),
        risk,
        sort: SortState {
            field: sort,
            dir: if desc { SortDir::Desc } else { SortDir::Asc },
        },
    };
    let mut rows = compute_view(&board.state().tasks, &query);
    if let Some(n) = limit {
        rows.truncate(n);
    }
    if rows.is_empty() {
        println!("No matching tasks.");
        return;
    }
    print_table(&rows, mode, Local::now().date_naive());
    println!(
        "\nData updated: {}",
        format_time_ago(board.state().last_updated, Utc::now())
    );
}

pub fn cmd_view(board: &Board, key: String) {
    let rows = board.state().view();
    let found = rows
        .iter()
        .find(|r| r.task.key == key)
        .or_else(|| rows.iter().find(|r| r.task.key.eq_ignore_ascii_case(&key)));
    let Some(row) = found else {
        eprintln!("No task found with key '{}'", key);
        std::process::exit(1);
    };
    println!("Title:        {}", row.task.title);
    println!("Type:         {}", format_type(row.task.type_key()));
    if let Some(url) = &row.task.url {
        println!("Link:         {}", url);
    }
    println!();
    for line in format_explanation(&explain(row, Local::now().date_naive())) {
        println!("{}", line);
    }
}

pub fn cmd_add(board: &mut Board, request: NewTask) {
    let key = request.key.trim().to_string();
    match board.dispatch(BoardEvent::AddTask(request), Utc::now()) {
        Ok(Dispatch::Applied) => println!("Added task {}", key),
        Ok(Dispatch::Rejected(reason)) => println!("Nothing added: {}", reason),
        Err(e) => {
            eprintln!("Failed to save tasks: {}", e);
            std::process::exit(1);
        }
    }
}

/// Build an add request from the `add` subcommand's arguments.
#[allow(clippy::too_many_arguments)]
pub fn new_task_from_args(
    key: String,
    title: String,
    estimate: i64,
    url: Option<String>,
    complexity: Level,
    dependencies: Level,
    novelty: Level,
    flags: Flags,
    bt: Option<String>,
    ft: Option<String>,
    stage: Stage,
    kind: TaskType,
) -> NewTask {
    NewTask {
        key,
        title,
        estimate_days: estimate,
        url,
        complexity,
        dependencies,
        novelty,
        flags,
        bt,
        ft,
        stage: Some(stage),
        kind: Some(kind),
    }
}

pub fn cmd_reset(board: &mut Board, yes: bool) {
    if !yes && !confirm("Reset to the demo dataset? This replaces all tasks. [y/N] ") {
        println!("Reset cancelled.");
        return;
    }
    match board.dispatch(BoardEvent::Reset, Utc::now()) {
        Ok(_) => println!("Restored {} demo tasks.", board.state().tasks.len()),
        Err(e) => {
            eprintln!("Failed to save tasks: {}", e);
            std::process::exit(1);
        }
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{}", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

pub fn cmd_export(board: &Board, output: Option<String>) {
    let rows = board.state().view();
    let csv = rows_to_csv(&rows);
    match output {
        None => print!("{}", csv),
        Some(path) => match std::fs::write(&path, csv) {
            Ok(_) => println!("Exported {} task(s) to {}", rows.len(), path),
            Err(e) => {
                eprintln!("Failed to write CSV file: {}", e);
                std::process::exit(1);
            }
        },
    }
}

pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut io::stdout());
}
