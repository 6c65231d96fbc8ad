//! Constrained-markdown rendering for assistant replies.
//!
//! `render` turns raw response text into a typed block structure. It is a
//! single-pass, line-oriented state machine whose only carried state is the
//! currently open list kind. Recognized, in precedence order: fenced code
//! blocks, inline code spans, bold spans, then line-level block structure
//! (blank lines, list items, paragraphs). Malformed markers degrade to
//! literal text; this function never fails.

/// Kind of list container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
}

/// Inline span within a paragraph or list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Bold(String),
}

/// Block-level element of a rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Code {
        language: Option<String>,
        code: String,
    },
    List {
        kind: ListKind,
        items: Vec<Vec<Inline>>,
    },
    /// Line-break marker produced by a blank source line.
    Break,
}

/// Structured markup for one message, ready for display or export.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Markup {
    pub blocks: Vec<Block>,
}

/// Render raw response text into structured markup.
pub fn render(raw: &str) -> Markup {
    let text = raw.replace('\r', "");
    let lines: Vec<&str> = text.split('\n').collect();

    let mut blocks: Vec<Block> = Vec::new();
    let mut open_list: Option<(ListKind, Vec<Vec<Inline>>)> = None;

    let mut i = 0;
    while i < lines.len() {
        let trimmed = lines[i].trim();

        // Fenced code block: only honored when a closing fence exists below,
        // otherwise the opener is literal paragraph text.
        if let Some(tag) = trimmed.strip_prefix("```") {
            let close = lines[i + 1..]
                .iter()
                .position(|l| l.trim().starts_with("```"));
            if let Some(offset) = close {
                close_open_list(&mut blocks, &mut open_list);
                blocks.push(Block::Code {
                    language: language_tag(tag),
                    code: lines[i + 1..i + 1 + offset].join("\n"),
                });
                i += offset + 2;
                continue;
            }
        }

        if trimmed.is_empty() {
            close_open_list(&mut blocks, &mut open_list);
            blocks.push(Block::Break);
        } else if let Some(content) = bullet_item(trimmed) {
            push_list_item(&mut blocks, &mut open_list, ListKind::Unordered, content);
        } else if let Some(content) = numbered_item(trimmed) {
            push_list_item(&mut blocks, &mut open_list, ListKind::Ordered, content);
        } else {
            close_open_list(&mut blocks, &mut open_list);
            blocks.push(Block::Paragraph(parse_inlines(trimmed)));
        }

        i += 1;
    }

    // Input may end while still inside a list.
    close_open_list(&mut blocks, &mut open_list);

    Markup { blocks }
}

fn close_open_list(blocks: &mut Vec<Block>, open_list: &mut Option<(ListKind, Vec<Vec<Inline>>)>) {
    if let Some((kind, items)) = open_list.take() {
        blocks.push(Block::List { kind, items });
    }
}

fn push_list_item(
    blocks: &mut Vec<Block>,
    open_list: &mut Option<(ListKind, Vec<Vec<Inline>>)>,
    kind: ListKind,
    content: &str,
) {
    match open_list {
        Some((open_kind, items)) if *open_kind == kind => {
            items.push(parse_inlines(content));
        }
        _ => {
            // Switching kinds closes the open container first, so ordered and
            // unordered lists never nest into each other.
            close_open_list(blocks, open_list);
            *open_list = Some((kind, vec![parse_inlines(content)]));
        }
    }
}

/// Language token after an opening fence: the leading run of word characters.
fn language_tag(tag: &str) -> Option<String> {
    let token: String = tag
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if token.is_empty() { None } else { Some(token) }
}

/// `* item` or `- item`: marker plus at least one whitespace character.
fn bullet_item(trimmed: &str) -> Option<&str> {
    let rest = trimmed
        .strip_prefix('*')
        .or_else(|| trimmed.strip_prefix('-'))?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// `1. item`: digits, a dot, then at least one whitespace character.
fn numbered_item(trimmed: &str) -> Option<&str> {
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = trimmed[digits..].strip_prefix('.')?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Split a line into text, inline-code and bold spans. Inline code wins over
/// bold; unpaired delimiters stay literal.
fn parse_inlines(text: &str) -> Vec<Inline> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '`' {
            if let Some(offset) = chars[i + 1..].iter().position(|&c| c == '`') {
                if offset > 0 {
                    flush_literal(&mut spans, &mut literal);
                    spans.push(Inline::Code(chars[i + 1..i + 1 + offset].iter().collect()));
                    i += offset + 2;
                    continue;
                }
            }
            literal.push('`');
            i += 1;
        } else if chars[i] == '*' && chars.get(i + 1) == Some(&'*') {
            if let Some(offset) = find_double_star(&chars[i + 2..]) {
                flush_literal(&mut spans, &mut literal);
                spans.push(Inline::Bold(chars[i + 2..i + 2 + offset].iter().collect()));
                i += offset + 4;
                continue;
            }
            literal.push_str("**");
            i += 2;
        } else {
            literal.push(chars[i]);
            i += 1;
        }
    }

    flush_literal(&mut spans, &mut literal);
    spans
}

fn flush_literal(spans: &mut Vec<Inline>, literal: &mut String) {
    if !literal.is_empty() {
        spans.push(Inline::Text(std::mem::take(literal)));
    }
}

fn find_double_star(chars: &[char]) -> Option<usize> {
    chars
        .windows(2)
        .position(|pair| pair[0] == '*' && pair[1] == '*')
}

/// Escape the three HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl Markup {
    /// Serialize to sanitized HTML, used by transcript export.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(inlines) => {
                    out.push_str("<p>");
                    push_inline_html(&mut out, inlines);
                    out.push_str("</p>");
                }
                Block::Code { language, code } => {
                    match language {
                        Some(lang) => {
                            out.push_str(&format!("<pre><code class=\"language-{lang}\">"))
                        }
                        None => out.push_str("<pre><code>"),
                    }
                    out.push_str(&escape_html(code));
                    out.push_str("</code></pre>");
                }
                Block::List { kind, items } => {
                    let (open, close) = match kind {
                        ListKind::Unordered => ("<ul>", "</ul>"),
                        ListKind::Ordered => ("<ol>", "</ol>"),
                    };
                    out.push_str(open);
                    for item in items {
                        out.push_str("<li>");
                        push_inline_html(&mut out, item);
                        out.push_str("</li>");
                    }
                    out.push_str(close);
                }
                Block::Break => out.push_str("<br>"),
            }
        }
        out
    }

    /// Reconstruct a plain-text approximation of the message for clipboard
    /// copy. Lossy by design: only the rendered structure survives, so bold
    /// markers are gone while code fences and backticks are re-synthesized.
    pub fn to_clipboard_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(inlines) => {
                    out.push_str(&inline_plain(inlines));
                    out.push('\n');
                }
                Block::Code { code, .. } => {
                    out.push_str("\n```\n");
                    out.push_str(code);
                    out.push_str("\n```\n");
                }
                Block::List { items, .. } => {
                    for item in items {
                        out.push_str("\u{2022} ");
                        out.push_str(&inline_plain(item));
                        out.push('\n');
                    }
                }
                Block::Break => out.push('\n'),
            }
        }
        tidy_plain_text(&out)
    }
}

fn push_inline_html(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&escape_html(text)),
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(&escape_html(code));
                out.push_str("</code>");
            }
            Inline::Bold(text) => {
                out.push_str("<strong>");
                out.push_str(&escape_html(text));
                out.push_str("</strong>");
            }
        }
    }
}

fn inline_plain(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(text),
            Inline::Code(code) => {
                out.push('`');
                out.push_str(code);
                out.push('`');
            }
            Inline::Bold(text) => out.push_str(text),
        }
    }
    out
}

/// Strip trailing spaces per line, collapse runs of blank lines down to one,
/// and trim the ends.
fn tidy_plain_text(text: &str) -> String {
    let mut out = text
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph_text(block: &Block) -> String {
        match block {
            Block::Paragraph(inlines) => inline_plain(inlines),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn plain_lines_become_paragraphs() {
        let markup = render("hello\nworld");
        assert_eq!(markup.blocks.len(), 2);
        assert_eq!(paragraph_text(&markup.blocks[0]), "hello");
        assert_eq!(paragraph_text(&markup.blocks[1]), "world");
    }

    #[test]
    fn blank_lines_become_breaks_not_empty_paragraphs() {
        let markup = render("a\n\n\nb");
        assert_eq!(
            markup.blocks,
            vec![
                Block::Paragraph(vec![Inline::Text("a".into())]),
                Block::Break,
                Block::Break,
                Block::Paragraph(vec![Inline::Text("b".into())]),
            ]
        );
    }

    #[test]
    fn fenced_code_block_with_language() {
        let markup = render("```rust\nfn main() {}\n```");
        assert_eq!(
            markup.blocks,
            vec![Block::Code {
                language: Some("rust".into()),
                code: "fn main() {}".into(),
            }]
        );
    }

    #[test]
    fn code_block_content_is_never_interpreted() {
        let markup = render("```\n- not a list\n**not bold**\n```");
        assert_eq!(
            markup.blocks,
            vec![Block::Code {
                language: None,
                code: "- not a list\n**not bold**".into(),
            }]
        );
    }

    #[test]
    fn unterminated_fence_degrades_to_literal_text() {
        let markup = render("```rust\nno closing fence here");
        assert_eq!(markup.blocks.len(), 2);
        assert_eq!(paragraph_text(&markup.blocks[0]), "```rust");
        assert_eq!(paragraph_text(&markup.blocks[1]), "no closing fence here");
    }

    #[test]
    fn inline_code_and_bold_spans() {
        let markup = render("use `foo()` and **bar**");
        assert_eq!(
            markup.blocks,
            vec![Block::Paragraph(vec![
                Inline::Text("use ".into()),
                Inline::Code("foo()".into()),
                Inline::Text(" and ".into()),
                Inline::Bold("bar".into()),
            ])]
        );
    }

    #[test]
    fn inline_code_takes_precedence_over_bold() {
        let markup = render("`**`");
        assert_eq!(
            markup.blocks,
            vec![Block::Paragraph(vec![Inline::Code("**".into())])]
        );
    }

    #[test]
    fn unpaired_delimiters_stay_literal() {
        let markup = render("a ` b ** c");
        assert_eq!(paragraph_text(&markup.blocks[0]), "a ` b ** c");
    }

    #[test]
    fn consecutive_items_merge_into_one_list() {
        let markup = render("- a\n- b\n* c");
        assert_eq!(
            markup.blocks,
            vec![Block::List {
                kind: ListKind::Unordered,
                items: vec![
                    vec![Inline::Text("a".into())],
                    vec![Inline::Text("b".into())],
                    vec![Inline::Text("c".into())],
                ],
            }]
        );
    }

    #[test]
    fn kind_switch_closes_list_instead_of_nesting() {
        let markup = render("1. one\n2. two\n- bullet");
        assert_eq!(
            markup.blocks,
            vec![
                Block::List {
                    kind: ListKind::Ordered,
                    items: vec![
                        vec![Inline::Text("one".into())],
                        vec![Inline::Text("two".into())],
                    ],
                },
                Block::List {
                    kind: ListKind::Unordered,
                    items: vec![vec![Inline::Text("bullet".into())]],
                },
            ]
        );
    }

    #[test]
    fn list_open_at_end_of_input_is_closed() {
        let markup = render("- a\n- b");
        assert!(matches!(markup.blocks.last(), Some(Block::List { items, .. }) if items.len() == 2));
    }

    #[test]
    fn blank_line_closes_list_before_break() {
        let markup = render("- a\n\n- b");
        assert_eq!(markup.blocks.len(), 3);
        assert!(matches!(markup.blocks[0], Block::List { .. }));
        assert!(matches!(markup.blocks[1], Block::Break));
        assert!(matches!(markup.blocks[2], Block::List { .. }));
    }

    #[test]
    fn bullet_marker_requires_whitespace() {
        let markup = render("-not a list\n*neither");
        assert!(markup.blocks.iter().all(|b| matches!(b, Block::Paragraph(_))));
    }

    #[test]
    fn html_escapes_code_content() {
        let markup = render("```\nif a < b && c > d {}\n```");
        let html = markup.to_html();
        assert!(html.contains("if a &lt; b &amp;&amp; c &gt; d {}"));
        assert!(html.starts_with("<pre><code>"));
    }

    #[test]
    fn html_escapes_inline_content() {
        let html = render("a <tag> & `1 < 2`").to_html();
        assert!(html.contains("a &lt;tag&gt; &amp; "));
        assert!(html.contains("<code>1 &lt; 2</code>"));
    }

    #[test]
    fn html_list_containers_match_kind() {
        let html = render("1. a\n- b").to_html();
        assert_eq!(html, "<ol><li>a</li></ol><ul><li>b</li></ul>");
    }

    #[test]
    fn clipboard_text_rewraps_code_and_bullets() {
        let markup = render("intro\n```\nlet x = 1;\n```\n- a\n- b");
        let text = markup.to_clipboard_text();
        assert_eq!(text, "intro\n\n```\nlet x = 1;\n```\n\u{2022} a\n\u{2022} b");
    }

    #[test]
    fn clipboard_text_unwraps_bold_and_keeps_backticks() {
        let text = render("**bold** and `code`").to_clipboard_text();
        assert_eq!(text, "bold and `code`");
    }

    #[test]
    fn clipboard_text_collapses_blank_runs() {
        let text = render("a\n\n\n\n\nb").to_clipboard_text();
        assert_eq!(text, "a\n\nb");
    }

    #[test]
    fn render_handles_pathological_input_without_panicking() {
        for raw in ["", "```", "``````", "**", "``", "\n\n\n", "1.", "- ", "*  *"] {
            let _ = render(raw).to_html();
            let _ = render(raw).to_clipboard_text();
        }
    }

    #[test]
    fn end_to_end_bold_plus_list_scenario() {
        let markup = render("Here is **bold** and:\n- a\n- b\n");
        assert_eq!(
            markup.blocks[0],
            Block::Paragraph(vec![
                Inline::Text("Here is ".into()),
                Inline::Bold("bold".into()),
                Inline::Text(" and:".into()),
            ])
        );
        assert_eq!(
            markup.blocks[1],
            Block::List {
                kind: ListKind::Unordered,
                items: vec![
                    vec![Inline::Text("a".into())],
                    vec![Inline::Text("b".into())],
                ],
            }
        );
    }
}
