//! Input composer with an inline slash-command palette.

use crate::ui::commands::{CommandEntry, ParsedCommand, command_entries, parse_slash_command};
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};
use std::cell::{Cell, RefCell};

/// Result of one key press delivered to the composer.
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(ParsedCommand),
    None,
}

#[derive(Debug, Clone, Default)]
struct InputState {
    content: String,
    cursor: usize,
}

/// Single-line-ish input box; Shift+Enter inserts a newline, Enter submits.
pub struct Composer {
    state: RefCell<InputState>,
    placeholder: String,
    entries: Vec<CommandEntry>,
    filtered: RefCell<Vec<CommandEntry>>,
    palette_open: Cell<bool>,
    palette_selected: Cell<Option<usize>>,
}

impl Composer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            state: RefCell::new(InputState::default()),
            placeholder: placeholder.into(),
            entries: command_entries(),
            filtered: RefCell::new(Vec::new()),
            palette_open: Cell::new(false),
            palette_selected: Cell::new(None),
        }
    }

    /// Replace the input content, e.g. with a transcript passed on the
    /// command line.
    pub fn set_text(&self, text: &str) {
        let mut state = self.state.borrow_mut();
        state.content = text.to_string();
        state.cursor = state.content.len();
    }

    /// Handle a key press. While `locked`, submission is ignored and the
    /// typed text stays in the box; editing keys still work.
    pub fn handle_key(&self, key: KeyEvent, locked: bool) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        let mut state = self.state.borrow_mut();

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    insert_char(&mut state, '\n');
                } else if self.palette_open.get() {
                    self.apply_selected(&mut state);
                } else if !locked && !state.content.trim().is_empty() {
                    let content = state.content.clone();
                    state.content.clear();
                    state.cursor = 0;
                    self.close_palette();
                    drop(state);
                    return match parse_slash_command(&content) {
                        Some(command) => ComposerResult::Command(command),
                        None => ComposerResult::Submitted(content),
                    };
                }
            }
            KeyCode::Up if self.palette_open.get() => self.move_selection(-1),
            KeyCode::Down if self.palette_open.get() => self.move_selection(1),
            KeyCode::Esc if self.palette_open.get() => self.close_palette(),
            KeyCode::Tab if self.palette_open.get() => {
                self.apply_selected(&mut state);
            }
            KeyCode::Char(c) => {
                insert_char(&mut state, c);
                self.sync_palette(&state, c.is_whitespace());
            }
            KeyCode::Backspace => {
                if backspace(&mut state) {
                    self.sync_palette(&state, false);
                }
            }
            KeyCode::Delete => {
                if delete(&mut state) {
                    self.sync_palette(&state, false);
                }
            }
            KeyCode::Left => {
                state.cursor = previous_boundary(&state.content, state.cursor);
            }
            KeyCode::Right => {
                state.cursor = next_boundary(&state.content, state.cursor);
            }
            KeyCode::Home => state.cursor = 0,
            KeyCode::End => state.cursor = state.content.len(),
            _ => {}
        }

        ComposerResult::None
    }

    fn sync_palette(&self, state: &InputState, ends_word: bool) {
        if state.content.starts_with('/') && !ends_word {
            if !self.palette_open.get() {
                self.palette_open.set(true);
                self.palette_selected.set(Some(0));
            }
            self.refresh_palette(state);
        } else {
            self.close_palette();
        }
    }

    fn close_palette(&self) {
        self.palette_open.set(false);
        self.filtered.borrow_mut().clear();
        self.palette_selected.set(None);
    }

    fn refresh_palette(&self, state: &InputState) {
        let query = state.content.trim_start_matches('/').to_lowercase();
        let mut filtered = self.filtered.borrow_mut();
        filtered.clear();
        for entry in &self.entries {
            if query.is_empty() || entry.keyword.starts_with(&query) {
                filtered.push(*entry);
            }
        }

        if filtered.is_empty() {
            self.palette_selected.set(None);
        } else {
            let index = self.palette_selected.get().unwrap_or(0);
            self.palette_selected.set(Some(index.min(filtered.len() - 1)));
        }
    }

    fn move_selection(&self, delta: isize) {
        let filtered = self.filtered.borrow();
        if filtered.is_empty() {
            self.palette_selected.set(None);
            return;
        }
        let len = filtered.len() as isize;
        let current = self.palette_selected.get().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len);
        self.palette_selected.set(Some(next as usize));
    }

    fn apply_selected(&self, state: &mut InputState) {
        let filtered = self.filtered.borrow();
        let Some(index) = self.palette_selected.get() else {
            return;
        };
        let Some(entry) = filtered.get(index).copied() else {
            return;
        };
        drop(filtered);

        state.content = format!("/{}", entry.keyword);
        state.cursor = state.content.len();
        self.close_palette();
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme, locked: bool) {
        let state = self.state.borrow();

        let border = if locked {
            theme.border
        } else {
            theme.border_focus
        };
        let title = if locked {
            " replying... "
        } else {
            " Type your message "
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(Style::default().fg(border));
        let inner = block.inner(area);
        block.render(area, buf);

        if state.content.is_empty() {
            let placeholder = Line::from(Span::styled(
                self.placeholder.clone(),
                Style::default().fg(theme.text_dim),
            ));
            buf.set_line(inner.x, inner.y, &placeholder, inner.width);
        } else {
            let mut content = state.content.clone();
            content.insert(state.cursor.min(content.len()), '\u{258c}');
            for (i, text) in content.split('\n').enumerate() {
                if i < inner.height as usize {
                    let line = Line::from(Span::styled(
                        text.to_string(),
                        Style::default().fg(theme.text),
                    ));
                    buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
                }
            }
        }

        if self.palette_open.get() {
            self.render_palette(area, buf, theme);
        }
    }

    fn render_palette(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let filtered = self.filtered.borrow();
        if filtered.is_empty() {
            return;
        }

        let height = (filtered.len().min(8) + 2) as u16;
        let palette_area = Rect {
            x: area.x,
            y: area.y.saturating_sub(height),
            width: area.width,
            height,
        };
        Clear.render(palette_area, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Commands ")
            .style(Style::default().fg(theme.border_focus));
        let inner = block.inner(palette_area);
        block.render(palette_area, buf);

        let selected = self.palette_selected.get();
        for (index, entry) in filtered.iter().enumerate() {
            if index >= inner.height as usize {
                break;
            }
            let style = if selected == Some(index) {
                Style::default()
                    .fg(theme.highlight_fg)
                    .bg(theme.highlight_bg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.text)
            };
            let line = Line::from(vec![
                Span::styled(format!("/{}", entry.keyword), style),
                Span::styled(" - ", Style::default().fg(theme.text_dim)),
                Span::styled(entry.description, Style::default().fg(theme.text_dim)),
            ]);
            buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
        }
    }
}

fn insert_char(state: &mut InputState, c: char) {
    state.content.insert(state.cursor, c);
    state.cursor += c.len_utf8();
}

fn backspace(state: &mut InputState) -> bool {
    if state.cursor == 0 {
        return false;
    }
    let previous = previous_boundary(&state.content, state.cursor);
    state.content.remove(previous);
    state.cursor = previous;
    true
}

fn delete(state: &mut InputState) -> bool {
    if state.cursor >= state.content.len() {
        return false;
    }
    state.content.remove(state.cursor);
    true
}

fn previous_boundary(content: &str, cursor: usize) -> usize {
    content[..cursor]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn next_boundary(content: &str, cursor: usize) -> usize {
    if cursor >= content.len() {
        return content.len();
    }
    let step = content[cursor..]
        .chars()
        .next()
        .map(char::len_utf8)
        .unwrap_or(0);
    cursor + step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::commands::SlashCommand;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &Composer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)), false);
        }
    }

    #[test]
    fn enter_submits_typed_text() {
        let composer = Composer::new("say something");
        type_text(&composer, "hello there");
        let result = composer.handle_key(press(KeyCode::Enter), false);
        assert_eq!(result, ComposerResult::Submitted("hello there".into()));
    }

    #[test]
    fn enter_while_locked_keeps_the_text() {
        let composer = Composer::new("say something");
        type_text(&composer, "patience");
        assert_eq!(
            composer.handle_key(press(KeyCode::Enter), true),
            ComposerResult::None
        );
        // Unlocked submit still delivers the preserved text.
        assert_eq!(
            composer.handle_key(press(KeyCode::Enter), false),
            ComposerResult::Submitted("patience".into())
        );
    }

    #[test]
    fn slash_input_parses_as_command() {
        let composer = Composer::new("");
        type_text(&composer, "/bye");
        // Typing opened the palette; Esc closes it so Enter submits the text.
        composer.handle_key(press(KeyCode::Esc), false);
        let result = composer.handle_key(press(KeyCode::Enter), false);
        match result {
            ComposerResult::Command(parsed) => assert_eq!(parsed.command, SlashCommand::Bye),
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn blank_input_does_not_submit() {
        let composer = Composer::new("");
        type_text(&composer, "   ");
        assert_eq!(
            composer.handle_key(press(KeyCode::Enter), false),
            ComposerResult::None
        );
    }

    #[test]
    fn backspace_handles_multibyte_input() {
        let composer = Composer::new("");
        type_text(&composer, "héllo");
        composer.handle_key(press(KeyCode::Backspace), false);
        composer.handle_key(press(KeyCode::Backspace), false);
        let result = composer.handle_key(press(KeyCode::Enter), false);
        assert_eq!(result, ComposerResult::Submitted("hél".into()));
    }

    #[test]
    fn prefilled_text_submits_as_typed() {
        let composer = Composer::new("");
        composer.set_text("from the transcript");
        let result = composer.handle_key(press(KeyCode::Enter), false);
        assert_eq!(
            result,
            ComposerResult::Submitted("from the transcript".into())
        );
    }
}
