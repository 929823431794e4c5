//! Keyboard event handling.
//!
//! This module maps keyboard input to actions:
//! - `j`/`k` or arrows: move the row selection
//! - `g`/`G` or `Home`/`End`: first/last row
//! - `Tab`: switch between the generated and mutated tables
//! - `1`-`7`: sort by column (again to reverse)
//! - `Enter`: show the structure of the selected row
//! - `S`: fetch the structure image of the selected row
//! - `y`: copy the focused table
//! - `?`: show help
//! - `:`: enter command mode (see [`crate::command`])
//! - `Ctrl+C`: quit

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

use crate::model::{AppMode, AppState, Field};

/// Actions that can be triggered by keyboard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action (key not recognized)
    None,
    /// Quit the application
    Quit,
    /// Move selection up
    MoveUp,
    /// Move selection down
    MoveDown,
    /// Jump to the first row
    MoveTop,
    /// Jump to the last row
    MoveBottom,
    /// Focus the other table
    SwitchPanel,
    /// Sort by the given column
    Sort(Field),
    /// Draw the selected record's structure
    ShowStructure,
    /// Fetch the service-rendered structure image
    PlotStructure,
    /// Copy the focused table
    Copy,
    /// Show the help overlay
    ShowHelp,
    /// Enter command mode
    EnterCommandMode,
    /// Add character to command buffer
    CommandChar(char),
    /// Execute current command
    ExecuteCommand,
    /// Cancel command mode
    CancelCommand,
    /// Backspace in command mode
    CommandBackspace,
    /// Answer to the reset prompt
    ConfirmReset(bool),
    /// Resize event (terminal resized)
    Resize(u16, u16),
    /// Dismiss the help overlay
    DismissHelp,
}

/// Polls for keyboard events with a timeout.
///
/// Returns `None` if no event occurred within the timeout.
pub fn poll_event(timeout: Duration) -> Option<Event> {
    if event::poll(timeout).ok()? {
        event::read().ok()
    } else {
        None
    }
}

/// Converts a crossterm event to an Action based on current app mode.
pub fn handle_event(event: Event, mode: &AppMode, show_help: bool) -> Action {
    match event {
        Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
            handle_key_event(key_event, mode, show_help)
        }
        Event::Resize(width, height) => Action::Resize(width, height),
        _ => Action::None,
    }
}

/// Handles a key event based on the current application mode.
fn handle_key_event(key: KeyEvent, mode: &AppMode, show_help: bool) -> Action {
    // If help is shown, any key dismisses it
    if show_help {
        return Action::DismissHelp;
    }

    match mode {
        AppMode::Normal => handle_normal_mode(key),
        AppMode::Command(_) => handle_command_mode(key),
        AppMode::ConfirmReset => handle_confirm_mode(key),
    }
}

/// Handles key events in normal mode.
fn handle_normal_mode(key: KeyEvent) -> Action {
    // Handle Ctrl+C for emergency quit
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,
        KeyCode::Char('g') | KeyCode::Home => Action::MoveTop,
        KeyCode::Char('G') | KeyCode::End => Action::MoveBottom,

        KeyCode::Tab | KeyCode::BackTab => Action::SwitchPanel,

        // Column sort, 1-based as shown in the header
        KeyCode::Char(c @ '1'..='9') => c
            .to_digit(10)
            .and_then(|d| Field::from_column(d as usize))
            .map_or(Action::None, Action::Sort),

        KeyCode::Enter => Action::ShowStructure,
        KeyCode::Char('S') => Action::PlotStructure,
        KeyCode::Char('y') => Action::Copy,
        KeyCode::Char('?') => Action::ShowHelp,

        // Command mode
        KeyCode::Char(':') => Action::EnterCommandMode,

        _ => Action::None,
    }
}

/// Handles key events in command mode.
fn handle_command_mode(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter => Action::ExecuteCommand,
        KeyCode::Esc => Action::CancelCommand,
        KeyCode::Backspace => Action::CommandBackspace,
        KeyCode::Char(c) => Action::CommandChar(c),
        _ => Action::None,
    }
}

/// Handles the y/n prompt after `:reset`. Anything but `y` cancels.
fn handle_confirm_mode(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Action::ConfirmReset(true),
        _ => Action::ConfirmReset(false),
    }
}

/// Applies an action to the application state.
///
/// Returns `true` if the application should continue, `false` if it should quit.
pub fn apply_action(state: &mut AppState, action: Action) -> bool {
    // Notices live until the next key press
    if !matches!(action, Action::None | Action::Resize(_, _)) {
        state.clear_notice();
    }

    match action {
        Action::None => {}
        Action::Quit => {
            state.should_quit = true;
        }
        Action::MoveUp => {
            state.move_up();
        }
        Action::MoveDown => {
            state.move_down();
        }
        Action::MoveTop => {
            state.move_top();
        }
        Action::MoveBottom => {
            state.move_bottom();
        }
        Action::SwitchPanel => {
            state.switch_panel();
        }
        Action::Sort(field) => {
            state.select_sort(field);
        }
        Action::ShowStructure => {
            state.show_structure();
        }
        Action::PlotStructure => {
            state.request_plot();
        }
        Action::Copy => {
            state.request_copy();
        }
        Action::ShowHelp => {
            state.show_help();
        }
        Action::EnterCommandMode => {
            state.enter_command_mode();
        }
        Action::CommandChar(c) => {
            state.command_input(c);
        }
        Action::ExecuteCommand => {
            state.execute_command();
        }
        Action::CancelCommand => {
            state.cancel_command();
        }
        Action::CommandBackspace => {
            state.command_backspace();
        }
        Action::ConfirmReset(yes) => {
            state.confirm_reset(yes);
        }
        Action::Resize(_, _) => {
            // Layout is recomputed on every draw
        }
        Action::DismissHelp => {
            state.dismiss_help();
        }
    }

    !state.should_quit
}
