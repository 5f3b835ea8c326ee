//! Main application logic for the terminal user interface.
//!
//! `App` drives the forecast board: it turns key presses into board events,
//! recomputes the visible rows whenever the board's revision moves, and
//! renders the table, the expanded-row details, the add form and the popups.

use std::io;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::db::*;
use crate::explain::explain;
use crate::fields::*;
use crate::state::{Board, BoardEvent, Dispatch};
use crate::tui::{
    colors::{confidence_color, risk_color, ACCENT, DARK_RED, ON_ACCENT},
    enums::{AppState, InputMode},
    input::InputField,
    task_form::*,
    utils::centered_rect,
};
use crate::view::EnrichedTask;

/// How often the "Data updated" label and today's date are refreshed.
const META_REFRESH: Duration = Duration::from_secs(60);

/// Sort columns reachable from the number keys, in key order.
const SORT_KEYS: [(char, SortField); 7] = [
    ('1', SortField::Key),
    ('2', SortField::Title),
    ('3', SortField::Estimate),
    ('4', SortField::Forecast),
    ('5', SortField::Delta),
    ('6', SortField::Risk),
    ('7', SortField::Confidence),
];

/// Board application state for the terminal user interface.
pub struct App {
    state: AppState,
    board: Board,
    rows: Vec<EnrichedTask>,
    /// Board revision `rows` was computed at.
    seen_revision: Option<u64>,
    table_state: TableState,
    task_form: TaskForm,
    input_mode: InputMode,
    search: InputField,
    status_message: String,
    today: NaiveDate,
    updated_label: String,
    last_meta_refresh: Instant,
}

impl App {
    pub fn new(board: Board) -> Self {
        let search = InputField::with_value(&board.state().query.search);
        let mut app = App {
            state: AppState::Board,
            board,
            rows: Vec::new(),
            seen_revision: None,
            table_state: TableState::default(),
            task_form: TaskForm::new(),
            input_mode: InputMode::None,
            search,
            status_message: String::new(),
            today: Local::now().date_naive(),
            updated_label: String::new(),
            last_meta_refresh: Instant::now(),
        };
        app.refresh_meta();
        app.sync_rows();
        app
    }

    /// Recompute rows if the board changed, keeping the selected task selected.
    fn sync_rows(&mut self) {
        if self.seen_revision == Some(self.board.revision()) {
            return;
        }
        let selected_key = self.selected_row().map(|r| r.task.key.clone());
        self.rows = self.board.state().view();
        self.seen_revision = Some(self.board.revision());

        let index = selected_key
            .and_then(|k| self.rows.iter().position(|r| r.task.key == k))
            .or(if self.rows.is_empty() { None } else { Some(0) });
        self.table_state.select(index);
    }

    fn refresh_meta(&mut self) {
        self.today = Local::now().date_naive();
        self.updated_label = format_time_ago(self.board.state().last_updated, Utc::now());
        self.last_meta_refresh = Instant::now();
    }

    fn selected_row(&self) -> Option<&EnrichedTask> {
        self.table_state.selected().and_then(|i| self.rows.get(i))
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
    }

    /// Send an event to the board and surface the outcome in the status bar.
    fn dispatch(&mut self, event: BoardEvent) -> Option<Dispatch> {
        let outcome = match self.board.dispatch(event, Utc::now()) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Failed to save tasks: {}", e);
                self.set_status_message(format!("Error saving tasks: {}", e));
                return None;
            }
        };
        self.sync_rows();
        self.refresh_meta();
        Some(outcome)
    }

    fn move_selection(&mut self, down: bool) {
        if self.rows.is_empty() {
            return;
        }
        let next = match self.table_state.selected() {
            Some(i) if down => (i + 1).min(self.rows.len() - 1),
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.table_state.select(Some(next));
    }

    fn handle_search_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.input_mode = InputMode::None;
                self.search.clear();
                self.dispatch(BoardEvent::Search(String::new()));
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::None;
                if self.search.value.trim().is_empty() {
                    self.set_status_message("Search cleared".to_string());
                } else {
                    self.set_status_message(format!(
                        "Search applied: '{}' ({} tasks)",
                        self.search.value,
                        self.rows.len()
                    ));
                }
            }
            KeyCode::Backspace => {
                self.search.handle_backspace();
                self.dispatch(BoardEvent::Search(self.search.value.clone()));
            }
            KeyCode::Left => self.search.move_cursor_left(),
            KeyCode::Right => self.search.move_cursor_right(),
            KeyCode::Char(c) => {
                self.search.handle_char(c);
                self.dispatch(BoardEvent::Search(self.search.value.clone()));
            }
            _ => {}
        }
    }

    /// Handle keys on the board screen. Returns true if the app should quit.
    fn handle_board_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        if self.input_mode == InputMode::Search {
            self.handle_search_input(key);
            return false;
        }

        match key {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                if self.search.value.is_empty() {
                    return true;
                }
                self.search.clear();
                self.dispatch(BoardEvent::Search(String::new()));
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(false),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(true),
            KeyCode::Char('/') => self.input_mode = InputMode::Search,
            KeyCode::Char('f') => {
                let next = self.board.state().query.risk.cycle();
                self.dispatch(BoardEvent::FilterRisk(next));
            }
            KeyCode::Char('v') => {
                self.dispatch(BoardEvent::ToggleViewMode);
            }
            KeyCode::Char(c) if SORT_KEYS.iter().any(|(k, _)| *k == c) => {
                if let Some((_, field)) = SORT_KEYS.iter().find(|(k, _)| *k == c) {
                    self.dispatch(BoardEvent::SortClick(*field));
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(key) = self.selected_row().map(|r| r.task.key.clone()) {
                    self.dispatch(BoardEvent::ToggleDetails(key));
                }
            }
            KeyCode::Char('a') => {
                self.task_form = TaskForm::new();
                self.state = AppState::AddTask;
            }
            KeyCode::Char('R') => self.state = AppState::Confirm,
            KeyCode::Char('h') | KeyCode::F(1) => self.state = AppState::Help,
            _ => {}
        }
        false
    }

    fn handle_form_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.state = AppState::Board,
            KeyCode::Tab | KeyCode::Down => self.task_form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.task_form.prev_field(),
            KeyCode::Left => self.task_form.handle_left_right(false),
            KeyCode::Right => self.task_form.handle_left_right(true),
            KeyCode::Backspace => self.task_form.handle_backspace(),
            KeyCode::Delete => self.task_form.handle_delete(),
            KeyCode::Enter => self.submit_form(),
            KeyCode::Char(c) => self.task_form.handle_char(c),
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let request = self.task_form.to_request();
        let key = request.key.trim().to_string();
        match self.dispatch(BoardEvent::AddTask(request)) {
            Some(Dispatch::Applied) => {
                self.state = AppState::Board;
                if let Some(i) = self.rows.iter().position(|r| r.task.key == key) {
                    self.table_state.select(Some(i));
                }
                self.set_status_message(format!("Task {} added", key));
            }
            Some(Dispatch::Rejected(reason)) => {
                self.set_status_message(format!("Cannot add task: {}", reason));
            }
            None => {}
        }
    }

    fn handle_confirm_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.state = AppState::Board;
                if self.dispatch(BoardEvent::Reset).is_some() {
                    self.set_status_message("Demo data restored".to_string());
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.state = AppState::Board;
            }
            _ => {}
        }
    }

    fn handle_help_input(&mut self, key: KeyCode) {
        if matches!(key, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('h')) {
            self.state = AppState::Board;
        }
    }

    /// Route one key press by screen. Returns true if the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        self.status_message.clear();
        match self.state {
            AppState::Board => return self.handle_board_input(key.code, key.modifiers),
            AppState::AddTask => self.handle_form_input(key.code),
            AppState::Help => self.handle_help_input(key.code),
            AppState::Confirm => self.handle_confirm_input(key.code),
        }
        false
    }

    /// Poll for keyboard events. Returns true if the app should quit.
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                return Ok(self.handle_key(key));
            }
        }
        Ok(false)
    }

    fn sort_label(&self, field: SortField, label: &str) -> String {
        let sort = self.board.state().query.sort;
        if sort.field != field {
            return label.to_string();
        }
        match sort.dir {
            SortDir::Asc => format!("{} ↑", label),
            SortDir::Desc => format!("{} ↓", label),
        }
    }

    fn forecast_cell(&self, row: &EnrichedTask) -> Cell<'static> {
        match self.board.state().view_mode {
            ViewMode::Days => Cell::from(Line::from(vec![
                Span::raw(format!("{} ", row.forecast.days)),
                Span::styled("●", Style::default().fg(confidence_color(row.confidence.level))),
                Span::styled(
                    format!(" {}–{}", row.forecast.range.low, row.forecast.range.high),
                    Style::default().fg(Color::DarkGray),
                ),
            ])),
            ViewMode::Dates => Cell::from(format_forecast_cell(row, ViewMode::Dates, self.today)),
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let query = &self.board.state().query;
        let search = if query.search.trim().is_empty() {
            "-".to_string()
        } else {
            format!("'{}'", query.search)
        };
        let mode = match self.board.state().view_mode {
            ViewMode::Days => "days",
            ViewMode::Dates => "dates",
        };
        let context = format!(
            "Search: {}  Risk: {:?}  View: {}",
            search, query.risk, mode
        );
        let header = Paragraph::new(Line::from(vec![
            Span::styled("DELIVERY FORECAST", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                context,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_table(&mut self, f: &mut Frame, area: Rect) {
        let header_cells = [
            String::new(),
            self.sort_label(SortField::Key, "Key"),
            self.sort_label(SortField::Title, "Title"),
            "Stage".to_string(),
            self.sort_label(SortField::Estimate, "Est"),
            self.sort_label(
                SortField::Confidence,
                &self.sort_label(SortField::Forecast, "Forecast"),
            ),
            self.sort_label(SortField::Delta, "Δ"),
            self.sort_label(SortField::Risk, "Risk"),
        ]
        .into_iter()
        .map(|h| Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD)));
        let header = Row::new(header_cells)
            .style(Style::default().bg(ACCENT).fg(ON_ACCENT))
            .height(1);

        let expanded = self.board.state().expanded_key.clone();
        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|r| {
                let style = if expanded.as_deref() == Some(r.task.key.as_str()) {
                    Style::default().add_modifier(Modifier::BOLD)
                } else if r.task.stage_or_default() == Stage::Done {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(type_glyph(r.task.type_key())),
                    Cell::from(r.task.key.clone()),
                    Cell::from(r.task.title.clone()),
                    Cell::from(format_stage(r.task.stage_or_default())),
                    Cell::from(r.task.estimate_days.to_string()),
                    self.forecast_cell(r),
                    Cell::from(format_delta(r.delta)),
                    Cell::from(format_risk(r.risk)).style(Style::default().fg(risk_color(r.risk))),
                ])
                .style(style)
            })
            .collect();

        let forecast_width = match self.board.state().view_mode {
            ViewMode::Days => 14,
            ViewMode::Dates => 28,
        };
        let widths = [
            Constraint::Length(2),  // Type
            Constraint::Length(10), // Key
            Constraint::Min(24),    // Title
            Constraint::Length(20), // Stage
            Constraint::Length(5),  // Est
            Constraint::Length(forecast_width),
            Constraint::Length(5),  // Δ
            Constraint::Length(7),  // Risk
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Tasks ({}/{}) - Press 'h' for help",
                self.rows.len(),
                self.board.state().tasks.len()
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    /// Explanation lines for the expanded row, if it is visible.
    fn details_lines(&self) -> Option<Vec<Line<'static>>> {
        let key = self.board.state().expanded_key.as_deref()?;
        let row = self.rows.iter().find(|r| r.task.key == key)?;
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled(row.task.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("  ({})", format_type(row.task.type_key()))),
        ]));
        if let Some(url) = &row.task.url {
            lines.push(Line::from(Span::styled(url.clone(), Style::default().fg(Color::Cyan))));
        }
        for text in format_explanation(&explain(row, self.today)) {
            lines.push(Line::from(text));
        }
        Some(lines)
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let details = self.details_lines();
        let details_height = details
            .as_ref()
            .map(|l| (l.len() as u16 + 2).min(area.height / 2))
            .unwrap_or(0);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(details_height),
            ])
            .split(area);

        self.render_header(f, chunks[0]);
        self.render_table(f, chunks[1]);

        if let Some(lines) = details {
            let panel = Paragraph::new(lines)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Details - Enter to collapse"),
                )
                .wrap(Wrap { trim: false });
            f.render_widget(panel, chunks[2]);
        }
    }

    fn form_text(&self, f: &mut Frame, area: Rect, field: usize, title: &str, input: &InputField) {
        let focused = self.task_form.current_field == field;
        let style = if focused { Style::default().fg(ACCENT) } else { Style::default() };
        let widget = Paragraph::new(input.value.as_str())
            .block(Block::default().borders(Borders::ALL).title(title.to_string()).border_style(style));
        f.render_widget(widget, area);
        if focused {
            let x = area.x + 1 + (input.cursor as u16).min(area.width.saturating_sub(3));
            f.set_cursor_position((x, area.y + 1));
        }
    }

    fn form_selector(&self, f: &mut Frame, area: Rect, field: usize, title: &str, value: String) {
        let style = if self.task_form.current_field == field {
            Style::default().fg(ACCENT)
        } else {
            Style::default()
        };
        let widget = Paragraph::new(value)
            .block(Block::default().borders(Borders::ALL).title(title.to_string()).border_style(style));
        f.render_widget(widget, area);
    }

    fn render_task_form(&mut self, f: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3); 8])
            .split(columns[0]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(7),
                Constraint::Min(1),
            ])
            .split(columns[1]);

        let form = &self.task_form;
        self.form_text(f, left[0], KEY_GLOBAL_ORDER, "Key *", &form.key);
        self.form_text(f, left[1], TITLE_GLOBAL_ORDER, "Title *", &form.title);
        self.form_text(f, left[2], ESTIMATE_GLOBAL_ORDER, "Estimate (days) *", &form.estimate);
        self.form_text(f, left[3], URL_GLOBAL_ORDER, "Link", &form.url);
        self.form_selector(f, left[4], STAGE_GLOBAL_ORDER, "Stage",
            format!("< {} >", format_stage(form.stage())));
        self.form_selector(f, left[5], TYPE_GLOBAL_ORDER, "Type",
            format!("< {} >", format_type(form.kind().key())));
        self.form_text(f, left[6], BT_GLOBAL_ORDER, "Business requirement", &form.bt);
        self.form_text(f, left[7], FT_GLOBAL_ORDER, "Functional requirement", &form.ft);

        self.form_selector(f, right[0], COMPLEXITY_GLOBAL_ORDER, "Complexity",
            format!("< {} >", form.complexity().key()));
        self.form_selector(f, right[1], DEPENDENCIES_GLOBAL_ORDER, "Dependencies",
            format!("< {} >", form.dependencies().key()));
        self.form_selector(f, right[2], NOVELTY_GLOBAL_ORDER, "Novelty",
            format!("< {} >", form.novelty().key()));

        let flags = [
            (EXTERNAL_API_GLOBAL_ORDER, "External API", form.flags.external_api),
            (INTEGRATION_GLOBAL_ORDER, "Integration", form.flags.integration),
            (REGULATORY_GLOBAL_ORDER, "Regulatory", form.flags.regulatory),
            (MOBILE_GLOBAL_ORDER, "Mobile", form.flags.mobile),
            (WEB_GLOBAL_ORDER, "Web", form.flags.web),
        ];
        let flag_lines: Vec<Line> = flags
            .iter()
            .map(|(field, label, on)| {
                let mark = if *on { "[x]" } else { "[ ]" };
                let style = if form.current_field == *field {
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::from(Span::styled(format!("{} {}", mark, label), style))
            })
            .collect();
        let flags_focused = flags.iter().any(|(field, _, _)| *field == form.current_field);
        let flags_style = if flags_focused { Style::default().fg(ACCENT) } else { Style::default() };
        f.render_widget(
            Paragraph::new(flag_lines)
                .block(Block::default().borders(Borders::ALL).title("Flags").border_style(flags_style)),
            right[3],
        );

        let instructions = Paragraph::new(vec![
            Line::from("Tab/↑↓  Move between fields"),
            Line::from("←/→     Change selector or toggle flag"),
            Line::from("Space   Toggle flag"),
            Line::from("Enter   Add task"),
            Line::from("Esc     Cancel"),
        ])
        .block(Block::default().borders(Borders::ALL).title("Add Task"));
        f.render_widget(instructions, right[4]);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let help_text = vec![
            Line::from(Span::styled("Delivery Forecast Help", bold)),
            Line::from(""),
            Line::from(Span::styled("Board:", bold)),
            Line::from("  ↑/↓, k/j     Move selection"),
            Line::from("  Enter/Space  Expand or collapse forecast details"),
            Line::from("  /            Search by key or title"),
            Line::from("  f            Cycle risk filter (all → low → medium → high)"),
            Line::from("  1-7          Sort by key, title, estimate, forecast, delta, risk, confidence"),
            Line::from("               (press again to reverse)"),
            Line::from("  v            Toggle days / calendar dates"),
            Line::from("  a            Add task"),
            Line::from("  R            Reset to demo data"),
            Line::from("  h/F1         Show this help"),
            Line::from("  q/Esc        Quit"),
            Line::from(""),
            Line::from(Span::styled("Forecast column:", bold)),
            Line::from("  days ● min–max   dot color shows confidence (green high, yellow medium, red low)"),
        ];
        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help - Press Esc to return"))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_confirm(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Confirm Reset")
            .borders(Borders::ALL)
            .style(Style::default().bg(DARK_RED));
        let area = centered_rect(50, 25, area);
        f.render_widget(Clear, area);

        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Replace all tasks with the demo dataset?",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("This action cannot be undone."),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if self.input_mode == InputMode::Search {
            format!("Search: {} (Esc to clear, Enter to confirm)", self.search.value)
        } else {
            match self.state {
                AppState::Board => format!(
                    "Tasks: {} | Data updated: {} | Press 'h' for help",
                    self.rows.len(),
                    self.updated_label
                ),
                AppState::AddTask => "Add New Task".to_string(),
                AppState::Help => "Help".to_string(),
                AppState::Confirm => "Confirm Reset".to_string(),
            }
        };
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(ACCENT).fg(ON_ACCENT))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        match self.state {
            AppState::Board => self.render_board(f, chunks[0]),
            AppState::AddTask => self.render_task_form(f, chunks[0]),
            AppState::Help => self.render_help(f, chunks[0]),
            AppState::Confirm => {
                self.render_board(f, chunks[0]);
                self.render_confirm(f, chunks[0]);
            }
        }
        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop. Redraws after every key and at least once a minute
    /// so the "Data updated" label stays current.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            if self.last_meta_refresh.elapsed() >= META_REFRESH {
                self.refresh_meta();
            }
            self.sync_rows();
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TaskStore;
    use ratatui::backend::TestBackend;
    use tempfile::{tempdir, TempDir};

    fn app() -> (TempDir, App) {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(&dir.path().join("tasks.json"));
        let board = Board::open(store, Utc::now());
        (dir, App::new(board))
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_search_filters_rows_live() {
        let (_dir, mut app) = app();
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "pdf");
        assert_eq!(app.rows.len(), 1);
        assert_eq!(app.rows[0].task.key, "MORT-106");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::None);
        assert_eq!(app.rows.len(), app.board.state().tasks.len());
    }

    #[test]
    fn test_number_keys_sort_and_reverse() {
        let (_dir, mut app) = app();
        press(&mut app, KeyCode::Char('5'));
        assert!(app.rows.windows(2).all(|w| w[0].delta <= w[1].delta));
        press(&mut app, KeyCode::Char('5'));
        assert_eq!(app.board.state().query.sort.dir, SortDir::Desc);
        assert!(app.rows.windows(2).all(|w| w[0].delta >= w[1].delta));
    }

    #[test]
    fn test_enter_toggles_details_of_selected_row() {
        let (_dir, mut app) = app();
        let key = app.selected_row().unwrap().task.key.clone();
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.board.state().expanded_key.as_deref(), Some(key.as_str()));
        assert!(app.details_lines().is_some());
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.board.state().expanded_key, None);
    }

    #[test]
    fn test_add_form_rejects_then_accepts() {
        let (_dir, mut app) = app();
        let count = app.rows.len();
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.state, AppState::AddTask);
        type_text(&mut app, "MORT-400");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::AddTask);
        assert!(app.status_message.starts_with("Cannot add task"));

        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Appraisal upload");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "3");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::Board);
        assert_eq!(app.rows.len(), count + 1);
        assert_eq!(app.selected_row().unwrap().task.key, "MORT-400");
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let (_dir, mut app) = app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "MORT-401");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Extra");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "2");
        press(&mut app, KeyCode::Enter);
        let grown = app.rows.len();

        press(&mut app, KeyCode::Char('R'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.rows.len(), grown);

        press(&mut app, KeyCode::Char('R'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.rows.len(), demo_tasks().len());
    }

    #[test]
    fn test_quit_keys() {
        let (_dir, mut app) = app();
        assert!(!press(&mut app, KeyCode::Char('h')));
        assert_eq!(app.state, AppState::Help);
        assert!(!press(&mut app, KeyCode::Esc));
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_renders_every_screen() {
        let (_dir, mut app) = app();
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        for key in [KeyCode::Enter, KeyCode::Char('v'), KeyCode::Char('R')] {
            press(&mut app, key);
            terminal.draw(|f| app.render(f)).unwrap();
        }
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('a'));
        terminal.draw(|f| app.render(f)).unwrap();
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('h'));
        terminal.draw(|f| app.render(f)).unwrap();
    }
}
