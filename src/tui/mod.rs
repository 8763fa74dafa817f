//! Terminal front end for the chat client.
//!
//! A login form followed by the chat view, drawn with ratatui. The session
//! state machine lives inside [`App`]; this module only renders it and turns
//! keys into actions.

mod app;
pub mod event;
mod ui;

pub use app::{App, LoginField, TextInput, MAX_PASSWORD_LEN};
pub use event::{handle_key_event, Event, EventHandler, KeyAction};
pub use ui::{format_time, render};

use std::io;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::error::ChatError;

/// Terminal type used by the front end.
pub type Tui = Terminal<CrosstermBackend<io::Stdout>>;

/// Initialize the terminal for TUI mode.
pub fn init_terminal() -> Result<Tui, ChatError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// Restore the terminal to normal mode.
pub fn restore_terminal(terminal: &mut Tui) -> Result<(), ChatError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
