//! UI rendering for the TUI.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::app::{App, LoginField, TextInput};
use crate::state::{Author, SessionPhase};

/// Main render function.
pub fn render(frame: &mut Frame, app: &App) {
    match app.session.phase() {
        SessionPhase::LoggedOut => render_login(frame, app),
        _ => render_chat(frame, app),
    }
}

fn render_login(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Room
            Constraint::Length(3), // Password
            Constraint::Min(1),    // Help / errors
        ])
        .split(frame.area());

    let title = Paragraph::new(Line::from(vec![
        Span::styled(" pakechat ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("| you are {}", app.session.identity().user_id()),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(title, chunks[0]);

    let masked = "*".repeat(app.password.len());
    render_field(frame, chunks[1], " Room ", &app.room.text, app.focus == LoginField::Room);
    render_field(frame, chunks[2], " Password ", &masked, app.focus == LoginField::Password);

    let mut help = vec![Line::from(Span::styled(
        "Tab to switch fields, Enter to join, Esc to quit",
        Style::default().fg(Color::DarkGray),
    ))];
    if let Some(error) = app.session.last_error() {
        help.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )));
    }
    frame.render_widget(Paragraph::new(help).wrap(Wrap { trim: false }), chunks[3]);

    let (area, field) = match app.focus {
        LoginField::Room => (chunks[1], &app.room),
        LoginField::Password => (chunks[2], &app.password),
    };
    frame.set_cursor_position((area.x + 1 + field.cursor as u16, area.y + 1));
}

fn render_field(frame: &mut Frame, area: Rect, title: &str, text: &str, focused: bool) {
    let border = if focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let field = Paragraph::new(text.to_string()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title.to_string())
            .border_style(border),
    );
    frame.render_widget(field, area);
}

fn render_chat(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header/status bar
            Constraint::Min(5),    // Messages area
            Constraint::Length(3), // Input area
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_messages(frame, app, chunks[1]);
    render_input(frame, app, chunks[2]);
}

/// Render the header/status bar.
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let phase = app.session.phase();
    let (status_text, status_color) = match phase {
        SessionPhase::Handshaking => ("Securing session...", Color::Yellow),
        SessionPhase::Chatting => ("Connected", Color::Green),
        SessionPhase::Closed => ("Disconnected", Color::Red),
        SessionPhase::LoggedOut => ("Logged out", Color::DarkGray),
    };

    let title = format!(" pakechat - {} ", app.session.room_id().unwrap_or("-"));
    let mode = if app.session.is_revealed() {
        "plaintext"
    } else {
        "ciphertext"
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", status_text),
            Style::default().fg(status_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(
            app.session.identity().user_id().to_string(),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled(format!("{} (Ctrl+X)", mode), Style::default().fg(Color::DarkGray)),
    ];

    let problem = app.notice.as_deref().or(match phase {
        SessionPhase::Closed => app.session.last_error(),
        _ => None,
    });
    if let Some(problem) = problem {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(problem.to_string(), Style::default().fg(Color::Red)));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(header, area);
}

/// Format a Unix timestamp as HH:MM (UTC).
pub fn format_time(timestamp: i64) -> String {
    let secs = timestamp.rem_euclid(86400);
    format!("{:02}:{:02}", secs / 3600, (secs % 3600) / 60)
}

/// Wrap text to fit within a given width (word-aware).
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0;

    for word in text.split_inclusive(|c: char| c.is_whitespace()) {
        let word_len = word.chars().count();

        if current_width + word_len <= max_width {
            current_line.push_str(word);
            current_width += word_len;
        } else if word_len > max_width {
            // Break words longer than a line (hex ciphertext mostly).
            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
            for ch in word.chars() {
                if current_width >= max_width {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
                current_line.push(ch);
                current_width += 1;
            }
        } else {
            if !current_line.is_empty() {
                lines.push(current_line);
            }
            current_line = word.to_string();
            current_width = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Render the messages area.
fn render_messages(frame: &mut Frame, app: &App, area: Rect) {
    let inner_height = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2) as usize;

    let mut all_lines: Vec<Line> = Vec::new();

    for line in app.session.visible_lines() {
        let time = format_time(line.timestamp);
        let (prefix, style) = match &line.author {
            Author::You => (
                format!("[{}] you: ", time),
                Style::default().fg(Color::Green),
            ),
            Author::Peer(user_id) => (
                format!("[{}] {}: ", time, user_id),
                Style::default().fg(Color::Blue),
            ),
            Author::System => (
                format!("[{}] ", time),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            ),
        };

        let prefix_len = prefix.chars().count();
        let content_width = inner_width.saturating_sub(prefix_len);

        for (i, part) in wrap_text(&line.text, content_width).into_iter().enumerate() {
            let lead = if i == 0 {
                Span::styled(prefix.clone(), style)
            } else {
                Span::raw(" ".repeat(prefix_len))
            };
            all_lines.push(Line::from(vec![lead, Span::raw(part)]));
        }
    }

    let total_lines = all_lines.len();
    let start_index = total_lines
        .saturating_sub(inner_height)
        .saturating_sub(app.scroll_offset);
    let end_index = start_index.saturating_add(inner_height).min(total_lines);

    let items: Vec<ListItem> = all_lines
        .drain(start_index..end_index)
        .map(ListItem::new)
        .collect();

    let scroll_indicator = if app.scroll_offset > 0 {
        format!(" [↑{}] ", app.scroll_offset)
    } else {
        String::new()
    };

    let messages_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Messages{}", scroll_indicator))
        .border_style(Style::default().fg(Color::White));

    frame.render_widget(List::new(items).block(messages_block), area);
}

/// Visible slice of the input and the cursor column within it.
fn visible_input(input: &TextInput, width: usize) -> (String, usize) {
    let chars: Vec<char> = input.text.chars().collect();
    if chars.len() <= width {
        return (input.text.clone(), input.cursor);
    }

    let start = if input.cursor >= width {
        input.cursor.saturating_sub(width.saturating_sub(1))
    } else {
        0
    };
    let end = (start + width).min(chars.len());
    (chars[start..end].iter().collect(), input.cursor - start)
}

/// Render the input area.
fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let chatting = app.session.phase() == SessionPhase::Chatting;
    let inner_width = area.width.saturating_sub(2) as usize;

    let placeholder = match app.session.phase() {
        SessionPhase::Chatting => "Type a message... (Esc to quit)",
        SessionPhase::Handshaking => "Waiting for the secure session...",
        _ => "Session closed. Esc to quit.",
    };

    let (display_text, visible_cursor) = if app.input.is_empty() {
        (placeholder.to_string(), 0)
    } else {
        visible_input(&app.input, inner_width)
    };

    let remaining = app.input.remaining();
    let counter_style = if remaining == 0 {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else if remaining <= 20 {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let counter_text = format!(" {}/{} ", app.input.len(), app.input.max_len);

    let text_style = if app.input.is_empty() || !chatting {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };
    let border_style = match (chatting, remaining) {
        (false, _) => Style::default().fg(Color::DarkGray),
        (true, 0) => Style::default().fg(Color::Red),
        (true, _) => Style::default().fg(Color::Green),
    };

    let input = Paragraph::new(display_text)
        .style(text_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Input ")
                .title_bottom(Line::from(vec![Span::styled(counter_text, counter_style)]).right_aligned())
                .border_style(border_style),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(input, area);

    if chatting {
        let cursor_x = area.x + 1 + visible_cursor as u16;
        let cursor_y = area.y + 1;
        frame.set_cursor_position((cursor_x.min(area.x + area.width.saturating_sub(2)), cursor_y));
    }
}
