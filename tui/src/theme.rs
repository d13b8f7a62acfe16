//! Color theme and glyphs for the Finaptico TUI.
//!
//! A slate-and-teal palette by default, with a high-contrast override and an
//! ASCII glyph set for terminals without good unicode fonts.

use ratatui::style::{Color, Modifier, Style};

mod colors {
    use super::Color;

    // === Backgrounds ===
    pub const BG_DARK: Color = Color::Rgb(17, 21, 28);
    pub const BG_PANEL: Color = Color::Rgb(23, 29, 38);
    pub const BG_HIGHLIGHT: Color = Color::Rgb(36, 45, 58);
    pub const BG_POPUP: Color = Color::Rgb(28, 36, 47);
    pub const BORDER: Color = Color::Rgb(58, 70, 86);

    // === Foregrounds ===
    pub const TEXT_PRIMARY: Color = Color::Rgb(213, 221, 230);
    pub const TEXT_SECONDARY: Color = Color::Rgb(164, 176, 190);
    pub const TEXT_MUTED: Color = Color::Rgb(104, 116, 131);

    // === Accents ===
    pub const ACCENT: Color = Color::Rgb(72, 188, 170); // teal
    pub const BLUE: Color = Color::Rgb(98, 150, 212);
    pub const GREEN: Color = Color::Rgb(122, 192, 124);
    pub const YELLOW: Color = Color::Rgb(223, 178, 98);
    pub const RED: Color = Color::Rgb(222, 100, 100);
}

/// Resolved theme palette used by the UI.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg_dark: Color,
    pub bg_panel: Color,
    pub bg_highlight: Color,
    pub bg_popup: Color,
    pub border: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_muted: Color,
    pub accent: Color,
    pub blue: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Palette {
    #[must_use]
    pub fn standard() -> Self {
        Self {
            bg_dark: colors::BG_DARK,
            bg_panel: colors::BG_PANEL,
            bg_highlight: colors::BG_HIGHLIGHT,
            bg_popup: colors::BG_POPUP,
            border: colors::BORDER,
            text_primary: colors::TEXT_PRIMARY,
            text_secondary: colors::TEXT_SECONDARY,
            text_muted: colors::TEXT_MUTED,
            accent: colors::ACCENT,
            blue: colors::BLUE,
            success: colors::GREEN,
            warning: colors::YELLOW,
            error: colors::RED,
        }
    }

    #[must_use]
    pub fn high_contrast() -> Self {
        Self {
            bg_dark: Color::Black,
            bg_panel: Color::Black,
            bg_highlight: Color::DarkGray,
            bg_popup: Color::Black,
            border: Color::Gray,
            text_primary: Color::White,
            text_secondary: Color::Gray,
            text_muted: Color::DarkGray,
            accent: Color::Cyan,
            blue: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }
}

#[must_use]
pub fn palette(high_contrast: bool) -> Palette {
    if high_contrast {
        Palette::high_contrast()
    } else {
        Palette::standard()
    }
}

/// Icon set; the ASCII variant keeps every glyph one column wide.
#[derive(Debug, Clone, Copy)]
pub struct Glyphs {
    pub bullet: &'static str,
    pub urgent: &'static str,
    pub done: &'static str,
    pub pending: &'static str,
    pub overdue: &'static str,
    pub cursor: &'static str,
    spinner: &'static [&'static str],
}

const UNICODE_SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const ASCII_SPINNER: &[&str] = &["|", "/", "-", "\\"];

impl Glyphs {
    #[must_use]
    pub fn unicode() -> Self {
        Self {
            bullet: "•",
            urgent: "‼",
            done: "✓",
            pending: "○",
            overdue: "✗",
            cursor: "▶",
            spinner: UNICODE_SPINNER,
        }
    }

    #[must_use]
    pub fn ascii() -> Self {
        Self {
            bullet: "*",
            urgent: "!",
            done: "v",
            pending: "o",
            overdue: "x",
            cursor: ">",
            spinner: ASCII_SPINNER,
        }
    }

    #[must_use]
    pub fn spinner_frame(&self, tick: usize) -> &'static str {
        self.spinner[(tick / 2) % self.spinner.len()]
    }
}

#[must_use]
pub fn glyphs(ascii_only: bool) -> Glyphs {
    if ascii_only { Glyphs::ascii() } else { Glyphs::unicode() }
}

pub mod styles {
    use super::{Modifier, Palette, Style};

    #[must_use]
    pub fn card_title(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn figure(palette: &Palette) -> Style {
        Style::default()
            .fg(palette.text_primary)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn muted(palette: &Palette) -> Style {
        Style::default().fg(palette.text_muted)
    }

    #[must_use]
    pub fn error(palette: &Palette) -> Style {
        Style::default().fg(palette.error)
    }
}

#[cfg(test)]
mod tests {
    use super::{Glyphs, glyphs, palette};

    #[test]
    fn high_contrast_switches_palette() {
        assert_ne!(palette(false).bg_dark, palette(true).bg_dark);
    }

    #[test]
    fn ascii_glyphs_are_single_column() {
        let g = glyphs(true);
        for s in [g.bullet, g.urgent, g.done, g.pending, g.overdue, g.cursor] {
            assert!(s.is_ascii());
            assert_eq!(s.len(), 1);
        }
    }

    #[test]
    fn spinner_cycles_without_panicking() {
        let g = Glyphs::unicode();
        for tick in 0..50 {
            let _ = g.spinner_frame(tick);
        }
    }
}
