//! Event handling for the TUI.

use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use super::app::App;
use crate::state::SessionPhase;

/// Terminal events.
#[derive(Debug)]
pub enum Event {
    /// Terminal tick (for refreshing UI).
    Tick,
    /// Keyboard event.
    Key(KeyEvent),
    /// Terminal resize.
    Resize(u16, u16),
}

/// Reads terminal events on a blocking thread and forwards them.
pub struct EventHandler {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Create a new event handler.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Receive the next event.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Start reading terminal events.
    pub fn spawn_reader(&self, tick_rate: Duration) {
        let tx = self.tx.clone();
        tokio::task::spawn_blocking(move || loop {
            let event = if event::poll(tick_rate).unwrap_or(false) {
                match event::read() {
                    Ok(CrosstermEvent::Key(key)) => Event::Key(key),
                    Ok(CrosstermEvent::Resize(w, h)) => Event::Resize(w, h),
                    _ => continue,
                }
            } else {
                Event::Tick
            };
            if tx.send(event).is_err() {
                break;
            }
        });
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of handling a key event.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// No action needed.
    None,
    /// Quit the application.
    Quit,
    /// Submit the login form.
    Connect,
    /// Send the current input as a message.
    SendMessage,
    /// Switch between decrypted text and ciphertext.
    ToggleReveal,
}

/// Handle a key event and update app state.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> KeyAction {
    app.notice = None;
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return KeyAction::Quit;
        }
        KeyCode::Esc => {
            app.should_quit = true;
            return KeyAction::Quit;
        }
        KeyCode::Char('x') if ctrl => return KeyAction::ToggleReveal,
        _ => {}
    }

    match app.session.phase() {
        SessionPhase::LoggedOut => handle_login_key(app, key),
        SessionPhase::Chatting => handle_chat_key(app, key),
        SessionPhase::Handshaking | SessionPhase::Closed => KeyAction::None,
    }
}

fn handle_login_key(app: &mut App, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Enter => return KeyAction::Connect,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.toggle_focus(),
        KeyCode::Backspace => app.focused_field().delete_char(),
        KeyCode::Delete => app.focused_field().delete_char_forward(),
        KeyCode::Left => app.focused_field().move_left(),
        KeyCode::Right => app.focused_field().move_right(),
        KeyCode::Home => app.focused_field().move_home(),
        KeyCode::End => app.focused_field().move_end(),
        KeyCode::Char(c) => app.focused_field().enter_char(c),
        _ => {}
    }
    KeyAction::None
}

fn handle_chat_key(app: &mut App, key: KeyEvent) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Enter if !app.input.is_empty() => return KeyAction::SendMessage,
        KeyCode::Backspace => app.input.delete_char(),
        KeyCode::Delete => app.input.delete_char_forward(),
        KeyCode::Left => app.input.move_left(),
        KeyCode::Right => app.input.move_right(),
        KeyCode::Home => app.input.move_home(),
        KeyCode::End => app.input.move_end(),
        KeyCode::PageUp => app.scroll_up(5),
        KeyCode::PageDown => app.scroll_down(5),
        KeyCode::Up if ctrl => app.scroll_up(1),
        KeyCode::Down if ctrl => app.scroll_down(1),
        KeyCode::Char(c) if !ctrl => app.input.enter_char(c),
        _ => {}
    }
    KeyAction::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::state::ChatSessionState;

    fn app() -> App {
        App::new(ChatSessionState::new(Identity::generate(), 280))
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        assert_eq!(handle_key_event(&mut app, ctrl('c')), KeyAction::Quit);
        assert!(app.should_quit);

        let mut app = self::app();
        assert_eq!(handle_key_event(&mut app, key(KeyCode::Esc)), KeyAction::Quit);
    }

    #[test]
    fn test_login_form_typing() {
        let mut app = app();

        for c in "room".chars() {
            handle_key_event(&mut app, key(KeyCode::Char(c)));
        }
        handle_key_event(&mut app, key(KeyCode::Tab));
        for c in "pw".chars() {
            handle_key_event(&mut app, key(KeyCode::Char(c)));
        }

        assert_eq!(app.room.text, "room");
        assert_eq!(app.password.text, "pw");
        assert_eq!(handle_key_event(&mut app, key(KeyCode::Enter)), KeyAction::Connect);
    }

    #[test]
    fn test_toggle_reveal_key() {
        let mut app = app();
        assert_eq!(handle_key_event(&mut app, ctrl('x')), KeyAction::ToggleReveal);
        assert!(app.room.is_empty());
    }

    #[test]
    fn test_typing_ignored_while_handshaking() {
        let mut app = app();
        app.session.confirm_login("room", "pw").unwrap();

        assert_eq!(handle_key_event(&mut app, key(KeyCode::Char('a'))), KeyAction::None);
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_keypress_clears_notice() {
        let mut app = app();
        app.set_notice("Message dropped");
        handle_key_event(&mut app, key(KeyCode::Left));
        assert!(app.notice.is_none());
    }
}
