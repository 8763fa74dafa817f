//! Application state for the TUI.

use zeroize::{Zeroize, Zeroizing};

use crate::config::MAX_ROOM_ID_LEN;
use crate::state::ChatSessionState;

/// Maximum password length accepted by the login form.
pub const MAX_PASSWORD_LEN: usize = 128;

/// Single-line text input with a character cursor.
///
/// Edits happen in place within a buffer sized for `max_len` characters. The
/// text is wiped on drop.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    /// Current text.
    pub text: String,
    /// Cursor position in characters.
    pub cursor: usize,
    /// Maximum length in characters.
    pub max_len: usize,
}

impl TextInput {
    /// Empty input holding at most `max_len` characters.
    pub fn new(max_len: usize) -> Self {
        Self {
            text: String::with_capacity(max_len.saturating_mul(4)),
            cursor: 0,
            max_len,
        }
    }

    /// Number of characters entered.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether nothing has been entered.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Remaining characters before the limit.
    pub fn remaining(&self) -> usize {
        self.max_len.saturating_sub(self.len())
    }

    /// Whether the input is at its limit.
    pub fn is_at_max(&self) -> bool {
        self.len() >= self.max_len
    }

    /// Insert a character at the cursor (ignored at the limit).
    pub fn enter_char(&mut self, c: char) {
        if self.is_at_max() {
            return;
        }
        let index = self.byte_index();
        self.text.insert(index, c);
        self.move_right();
    }

    /// Delete the character before the cursor.
    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }

        self.move_left();
        let index = self.byte_index();
        self.text.remove(index);
    }

    /// Delete the character under the cursor.
    pub fn delete_char_forward(&mut self) {
        if self.cursor >= self.len() {
            return;
        }

        let index = self.byte_index();
        self.text.remove(index);
    }

    /// Move the cursor one character left.
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move the cursor one character right.
    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    /// Move the cursor to the start.
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// Move the cursor to the end.
    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    /// Take the text and clear the input.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    /// Copy the text out as a secret and wipe the buffer, keeping its capacity.
    pub fn take_secret(&mut self) -> Zeroizing<String> {
        let secret = Zeroizing::new(self.text.clone());
        self.text.zeroize();
        self.cursor = 0;
        secret
    }

    fn byte_index(&self) -> usize {
        self.text
            .char_indices()
            .map(|(i, _)| i)
            .nth(self.cursor)
            .unwrap_or(self.text.len())
    }
}

impl Drop for TextInput {
    fn drop(&mut self) {
        self.text.zeroize();
    }
}

/// Focused field of the login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    /// Room id.
    Room,
    /// Room password.
    Password,
}

/// Application state for the chat TUI.
pub struct App {
    /// The session state machine.
    pub session: ChatSessionState,
    /// Room id field.
    pub room: TextInput,
    /// Password field (rendered masked).
    pub password: TextInput,
    /// Focused login field.
    pub focus: LoginField,
    /// Chat input.
    pub input: TextInput,
    /// Scroll offset for the transcript (0 = bottom).
    pub scroll_offset: usize,
    /// Transient UI feedback, cleared on the next keypress.
    pub notice: Option<String>,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Create a new App around a session in the login phase.
    pub fn new(session: ChatSessionState) -> Self {
        let max_message_len = session.max_message_len();
        Self {
            session,
            room: TextInput::new(MAX_ROOM_ID_LEN),
            password: TextInput::new(MAX_PASSWORD_LEN),
            focus: LoginField::Room,
            input: TextInput::new(max_message_len),
            scroll_offset: 0,
            notice: None,
            should_quit: false,
        }
    }

    /// Switch focus between the login fields.
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Room => LoginField::Password,
            LoginField::Password => LoginField::Room,
        };
    }

    /// The focused login field.
    pub fn focused_field(&mut self) -> &mut TextInput {
        match self.focus {
            LoginField::Room => &mut self.room,
            LoginField::Password => &mut self.password,
        }
    }

    /// Take the login form contents, wiping the password field.
    pub fn take_login(&mut self) -> (String, Zeroizing<String>) {
        (self.room.text.clone(), self.password.take_secret())
    }

    /// Scroll to the newest line.
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    /// Scroll up by n lines.
    pub fn scroll_up(&mut self, n: usize) {
        let max_scroll = self.session.transcript().len().saturating_sub(1);
        self.scroll_offset = self.scroll_offset.saturating_add(n).min(max_scroll);
    }

    /// Scroll down by n lines.
    pub fn scroll_down(&mut self, n: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
    }

    /// Show a transient notice.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }
}
