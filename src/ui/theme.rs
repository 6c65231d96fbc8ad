//! Dark and light color palettes for the terminal UI.

use ratatui::style::Color;

/// Palette consulted by every widget.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub text: Color,
    pub text_dim: Color,
    pub user: Color,
    pub assistant: Color,
    pub code: Color,
    pub code_block: Color,
    pub error: Color,
    pub notice: Color,
    pub border: Color,
    pub border_focus: Color,
    pub cursor: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            text: Color::White,
            text_dim: Color::DarkGray,
            user: Color::Blue,
            assistant: Color::Green,
            code: Color::Cyan,
            code_block: Color::Yellow,
            error: Color::Red,
            notice: Color::Yellow,
            border: Color::DarkGray,
            border_focus: Color::Green,
            cursor: Color::Yellow,
            highlight_fg: Color::Black,
            highlight_bg: Color::Cyan,
        }
    }

    pub fn light() -> Self {
        Self {
            text: Color::Black,
            text_dim: Color::Gray,
            user: Color::Blue,
            assistant: Color::Rgb(0, 128, 0),
            code: Color::Rgb(0, 110, 110),
            code_block: Color::Rgb(150, 100, 0),
            error: Color::Red,
            notice: Color::Rgb(150, 100, 0),
            border: Color::Gray,
            border_focus: Color::Blue,
            cursor: Color::Blue,
            highlight_fg: Color::White,
            highlight_bg: Color::Blue,
        }
    }

    pub fn by_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Name of the other theme, for the `/theme` toggle.
    pub fn toggled_name(current: &str) -> &'static str {
        if current == "light" { "dark" } else { "light" }
    }
}
