//! Scrollable conversation view rendering structured markup.

use crate::markup::{self, Block, Inline, ListKind, Markup};
use crate::session::Message;
use crate::ui::theme::Theme;
use chrono::{DateTime, Local, Utc};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block as WidgetBlock, Borders, Paragraph, Widget, Wrap},
};

const STREAM_CURSOR: &str = "\u{258b}";

/// One visible entry in the transcript.
#[derive(Debug, Clone)]
enum Entry {
    User {
        content: String,
        timestamp: DateTime<Utc>,
    },
    Assistant {
        markup: Markup,
        timestamp: DateTime<Utc>,
    },
    Notice(String),
    Error(String),
}

/// Conversation history plus streaming state, rendered bottom-anchored.
pub struct Transcript {
    entries: Vec<Entry>,
    /// Markup for the reply currently being revealed, if any.
    streaming: Option<Markup>,
    thinking: bool,
    /// Lines scrolled up from the bottom. Zero means pinned to the newest.
    scroll_back: u16,
    tick: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            streaming: None,
            thinking: false,
            scroll_back: 0,
            tick: 0,
        }
    }

    /// Rebuild the view from a session's messages, e.g. after a switch.
    pub fn rebuild_from(&mut self, messages: &[Message]) {
        self.entries = messages
            .iter()
            .map(|m| {
                if m.is_user {
                    Entry::User {
                        content: m.content.clone(),
                        timestamp: m.timestamp,
                    }
                } else {
                    Entry::Assistant {
                        markup: markup::render(&m.content),
                        timestamp: m.timestamp,
                    }
                }
            })
            .collect();
        self.streaming = None;
        self.thinking = false;
        self.scroll_back = 0;
    }

    pub fn push_user(&mut self, content: &str) {
        self.entries.push(Entry::User {
            content: content.to_string(),
            timestamp: Utc::now(),
        });
        self.scroll_back = 0;
    }

    pub fn push_assistant(&mut self, raw: &str) {
        self.entries.push(Entry::Assistant {
            markup: markup::render(raw),
            timestamp: Utc::now(),
        });
        self.scroll_back = 0;
    }

    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::Notice(text.into()));
        self.scroll_back = 0;
    }

    pub fn push_error(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::Error(text.into()));
        self.scroll_back = 0;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.streaming = None;
        self.thinking = false;
        self.scroll_back = 0;
    }

    pub fn set_thinking(&mut self, on: bool) {
        self.thinking = on;
    }

    /// Replace the in-progress reply frame. Resets scroll to the bottom so
    /// the reveal stays visible.
    pub fn set_streaming(&mut self, markup: Markup) {
        self.streaming = Some(markup);
        self.thinking = false;
        self.scroll_back = 0;
    }

    pub fn clear_streaming(&mut self) {
        self.streaming = None;
    }

    /// Markup of the last completed assistant reply, for copy and export.
    pub fn last_assistant_markup(&self) -> Option<&Markup> {
        self.entries.iter().rev().find_map(|e| match e {
            Entry::Assistant { markup, .. } => Some(markup),
            _ => None,
        })
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    pub fn advance_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme, title: &str) {
        let block = WidgetBlock::default()
            .borders(Borders::ALL)
            .title(format!(" {title} "))
            .style(Style::default().fg(theme.border));
        let inner = block.inner(area);
        block.render(area, buf);

        let lines = self.build_lines(theme, inner.width);
        if lines.is_empty() {
            self.render_welcome(inner, buf, theme);
            return;
        }

        let total = lines.len() as u16;
        let visible = inner.height;
        let max_back = total.saturating_sub(visible);
        let back = self.scroll_back.min(max_back);
        let offset = max_back - back;

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((offset, 0))
            .render(inner, buf);
    }

    fn render_welcome(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Welcome!",
                Style::default()
                    .fg(theme.assistant)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Type a message below and press Enter to start a conversation.",
                Style::default().fg(theme.text_dim),
            )),
            Line::from(Span::styled(
                "Type / to see available commands, or /help for details.",
                Style::default().fg(theme.text_dim),
            )),
        ];
        Paragraph::new(lines)
            .alignment(ratatui::layout::Alignment::Center)
            .render(area, buf);
    }

    fn build_lines(&self, theme: &Theme, width: u16) -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = Vec::new();
        let wrap_width = width.saturating_sub(2).max(16) as usize;

        for entry in &self.entries {
            match entry {
                Entry::User { content, timestamp } => {
                    lines.push(header_line("You", *timestamp, theme.user, theme));
                    for text_line in content.split('\n') {
                        for wrapped in wrap_text(text_line, wrap_width) {
                            lines.push(Line::from(Span::styled(
                                wrapped,
                                Style::default().fg(theme.text),
                            )));
                        }
                    }
                    lines.push(Line::from(""));
                }
                Entry::Assistant { markup, timestamp } => {
                    lines.push(header_line("Assistant", *timestamp, theme.assistant, theme));
                    lines.extend(markup_lines(markup, theme, wrap_width, false));
                    lines.push(Line::from(""));
                }
                Entry::Notice(text) => {
                    for text_line in text.split('\n') {
                        lines.push(Line::from(Span::styled(
                            text_line.to_string(),
                            Style::default().fg(theme.notice),
                        )));
                    }
                    lines.push(Line::from(""));
                }
                Entry::Error(text) => {
                    lines.push(Line::from(Span::styled(
                        format!("error: {text}"),
                        Style::default().fg(theme.error),
                    )));
                    lines.push(Line::from(""));
                }
            }
        }

        if let Some(markup) = &self.streaming {
            lines.push(Line::from(Span::styled(
                "Assistant".to_string(),
                Style::default()
                    .fg(theme.assistant)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.extend(markup_lines(markup, theme, wrap_width, true));
        } else if self.thinking {
            let dots = ".".repeat(self.tick / 2 % 4);
            lines.push(Line::from(Span::styled(
                format!("thinking{dots}"),
                Style::default().fg(theme.text_dim),
            )));
        }

        lines
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

fn header_line(
    who: &str,
    timestamp: DateTime<Utc>,
    color: ratatui::style::Color,
    theme: &Theme,
) -> Line<'static> {
    let local = timestamp.with_timezone(&Local);
    Line::from(vec![
        Span::styled(
            who.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", local.format("%H:%M")),
            Style::default().fg(theme.text_dim),
        ),
    ])
}

/// Flatten markup blocks into styled terminal lines. When `streaming`, a
/// cursor glyph is appended to the final line.
fn markup_lines(
    markup: &Markup,
    theme: &Theme,
    wrap_width: usize,
    streaming: bool,
) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for block in &markup.blocks {
        match block {
            Block::Paragraph(inlines) => {
                lines.extend(inline_lines(inlines, None, theme, wrap_width));
            }
            Block::Code { language, code } => {
                let fence = match language {
                    Some(lang) => format!("```{lang}"),
                    None => "```".to_string(),
                };
                let dim = Style::default().fg(theme.text_dim);
                lines.push(Line::from(Span::styled(fence, dim)));
                for code_line in code.split('\n') {
                    lines.push(Line::from(Span::styled(
                        format!("  {code_line}"),
                        Style::default().fg(theme.code_block),
                    )));
                }
                lines.push(Line::from(Span::styled("```".to_string(), dim)));
            }
            Block::List { kind, items } => {
                for (index, item) in items.iter().enumerate() {
                    let marker = match kind {
                        ListKind::Unordered => "\u{2022} ".to_string(),
                        ListKind::Ordered => format!("{}. ", index + 1),
                    };
                    lines.extend(inline_lines(item, Some(marker), theme, wrap_width));
                }
            }
            Block::Break => lines.push(Line::from("")),
        }
    }

    if streaming {
        let cursor = Span::styled(STREAM_CURSOR, Style::default().fg(theme.cursor));
        match lines.last_mut() {
            Some(last) => last.spans.push(cursor),
            None => lines.push(Line::from(cursor)),
        }
    }

    lines
}

/// Render inline spans into wrapped lines, optionally prefixed with a list
/// marker on the first line and indentation on continuations.
fn inline_lines(
    inlines: &[Inline],
    marker: Option<String>,
    theme: &Theme,
    wrap_width: usize,
) -> Vec<Line<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let indent = marker.as_ref().map(|m| m.chars().count()).unwrap_or(0);
    if let Some(marker) = marker {
        spans.push(Span::styled(marker, Style::default().fg(theme.text_dim)));
    }

    for inline in inlines {
        let (text, style) = match inline {
            Inline::Text(t) => (t, Style::default().fg(theme.text)),
            Inline::Code(t) => (t, Style::default().fg(theme.code)),
            Inline::Bold(t) => (
                t,
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
            ),
        };
        spans.push(Span::styled(text.clone(), style));
    }

    wrap_spans(spans, wrap_width, indent)
}

/// Word-wrap styled spans at `width` columns, preserving each span's style
/// across the break. Continuation lines get `indent` spaces.
fn wrap_spans(spans: Vec<Span<'static>>, width: usize, indent: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut column = 0usize;

    for span in spans {
        let style = span.style;
        for word in split_keeping_spaces(&span.content) {
            let len = word.chars().count();
            if column + len > width && column > indent {
                lines.push(Line::from(std::mem::take(&mut current)));
                current.push(Span::raw(" ".repeat(indent)));
                column = indent;
                if word.trim().is_empty() {
                    continue;
                }
            }
            current.push(Span::styled(word, style));
            column += len;
        }
    }

    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

/// Split text into words and the whitespace runs between them, so styles
/// and spacing both survive wrapping.
fn split_keeping_spaces(text: &str) -> Vec<String> {
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_space = false;

    for c in text.chars() {
        let is_space = c == ' ';
        if !current.is_empty() && is_space != in_space {
            pieces.push(std::mem::take(&mut current));
        }
        in_space = is_space;
        current.push(c);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    wrap_spans(vec![Span::raw(text.to_string())], width, 0)
        .into_iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|s| s.content.as_ref())
                .collect::<String>()
        })
        .collect()
}
