//! Theme and color definitions for the TUI.

use crate::services::Tone;
use ratatui::style::{Color, Modifier, Style};

/// Theme for the TUI with consistent color scheme.
#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub danger: Color,
    pub muted: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color::Cyan,
            secondary: Color::Magenta,
            success: hex_color(crate::types::GAIN_COLOR),
            warning: Color::Yellow,
            danger: hex_color(crate::types::LOSS_COLOR),
            muted: Color::DarkGray,
        }
    }
}

impl Theme {
    /// Get style for titles.
    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for headers.
    pub fn header(&self) -> Style {
        Style::default()
            .fg(self.secondary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.danger)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    /// Style for a dashboard slot tone.
    pub fn tone(&self, tone: Tone) -> Style {
        match tone {
            Tone::Gain => self.success().add_modifier(Modifier::BOLD),
            Tone::Loss => self.error().add_modifier(Modifier::BOLD),
            Tone::Neutral => Style::default().fg(Color::Gray),
            Tone::Caution => self.warning().add_modifier(Modifier::BOLD),
        }
    }

    /// Style for the focused form field.
    pub fn selected(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.primary)
    }

    pub fn tab_active(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_inactive(&self) -> Style {
        Style::default().fg(self.muted)
    }
}

/// Parse a `#RRGGBB` palette entry into a terminal color.
pub fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 {
        return Color::Reset;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Reset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#00E396"), Color::Rgb(0x00, 0xE3, 0x96));
        assert_eq!(hex_color("#FEB019"), Color::Rgb(0xFE, 0xB0, 0x19));
        assert_eq!(hex_color("teal"), Color::Reset);
        assert_eq!(hex_color("#GG0000"), Color::Reset);
    }

    #[test]
    fn test_tones_are_distinct() {
        let theme = Theme::default();
        assert_ne!(theme.tone(Tone::Gain), theme.tone(Tone::Loss));
        assert_ne!(theme.tone(Tone::Gain), theme.tone(Tone::Neutral));
    }
}
