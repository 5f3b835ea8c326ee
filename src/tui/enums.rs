//! Enumerations for TUI state management.

/// Which screen has the keyboard.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppState {
    Board,
    AddTask,
    Help,
    /// Reset confirmation popup over the board.
    Confirm,
}

/// Input mode on the board screen.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum InputMode {
    None,
    /// Keystrokes edit the search text.
    Search,
}
