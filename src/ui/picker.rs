//! Overlay for browsing, switching and deleting saved conversations.

use crate::session::SessionSummary;
use crate::ui::theme::Theme;
use chrono::{DateTime, Datelike, Local, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

/// Outcome of a key press while the picker is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerResult {
    Switch(String),
    Delete(String),
    Close,
    None,
}

/// Modal session list, newest first.
pub struct SessionPicker {
    summaries: Vec<SessionSummary>,
    selected: usize,
}

impl SessionPicker {
    pub fn new(summaries: Vec<SessionSummary>) -> Self {
        Self {
            summaries,
            selected: 0,
        }
    }

    /// Refresh after a deletion, keeping the selection in range.
    pub fn set_summaries(&mut self, summaries: Vec<SessionSummary>) {
        self.summaries = summaries;
        if !self.summaries.is_empty() {
            self.selected = self.selected.min(self.summaries.len() - 1);
        } else {
            self.selected = 0;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickerResult {
        if key.kind != KeyEventKind::Press {
            return PickerResult::None;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => PickerResult::Close,
            KeyCode::Up | KeyCode::Char('k') => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
                PickerResult::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.summaries.len() {
                    self.selected += 1;
                }
                PickerResult::None
            }
            KeyCode::Enter => match self.summaries.get(self.selected) {
                Some(summary) => PickerResult::Switch(summary.id.clone()),
                None => PickerResult::Close,
            },
            KeyCode::Char('d') | KeyCode::Delete => match self.summaries.get(self.selected) {
                Some(summary) => PickerResult::Delete(summary.id.clone()),
                None => PickerResult::None,
            },
            _ => PickerResult::None,
        }
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let popup = centered_rect(area, 70, 70);
        Clear.render(popup, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Conversations (Enter switch, d delete, Esc close) ")
            .style(Style::default().fg(theme.border_focus));
        let inner = block.inner(popup);
        block.render(popup, buf);

        if self.summaries.is_empty() {
            let line = Line::from(Span::styled(
                "No saved conversations yet.",
                Style::default().fg(theme.text_dim),
            ));
            buf.set_line(inner.x + 1, inner.y + 1, &line, inner.width);
            return;
        }

        // Two rows per entry: title line and preview line.
        let rows_per_entry = 2u16;
        let visible = (inner.height / rows_per_entry) as usize;
        let first = self.selected.saturating_sub(visible.saturating_sub(1));

        let mut y = inner.y;
        for (index, summary) in self.summaries.iter().enumerate().skip(first) {
            if y + rows_per_entry > inner.y + inner.height {
                break;
            }

            let selected = index == self.selected;
            let title_style = if selected {
                Style::default()
                    .fg(theme.highlight_fg)
                    .bg(theme.highlight_bg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
            };

            let active_marker = if summary.is_active { "\u{25cf} " } else { "  " };
            let title = Line::from(vec![
                Span::styled(active_marker, Style::default().fg(theme.assistant)),
                Span::styled(summary.title.clone(), title_style),
                Span::styled(
                    format!(
                        "  {} \u{00b7} {} msgs",
                        relative_date(summary.timestamp),
                        summary.message_count
                    ),
                    Style::default().fg(theme.text_dim),
                ),
            ]);
            buf.set_line(inner.x + 1, y, &title, inner.width.saturating_sub(2));

            let preview = summary.preview.as_deref().unwrap_or("(no reply yet)");
            let preview_line = Line::from(Span::styled(
                format!("    {preview}"),
                Style::default().fg(theme.text_dim),
            ));
            buf.set_line(inner.x + 1, y + 1, &preview_line, inner.width.saturating_sub(2));

            y += rows_per_entry;
        }
    }
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

/// Human date for the session list: "Today", "Yesterday", "N days ago"
/// within a week, then a short calendar date.
pub fn relative_date(timestamp: DateTime<Utc>) -> String {
    let date = timestamp.with_timezone(&Local).date_naive();
    let today = Local::now().date_naive();
    let days = (today - date).num_days();

    match days {
        d if d <= 0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{days} days ago"),
        _ => {
            let local = timestamp.with_timezone(&Local);
            if date.year() == today.year() {
                local.format("%b %-d").to_string()
            } else {
                local.format("%b %-d, %Y").to_string()
            }
        }
    }
}
