//! Theme and Colors
//!
//! Stock-Elf's slate-and-blue palette: dark slate panels, a blue accent for
//! the ticker and headings, green/red for market moves.

use ratatui::style::{Color, Modifier, Style};

use stock_elf_core::{MessageRole, NotifyLevel};

// ============================================================================
// Slate Surfaces
// ============================================================================

/// Main background
pub const SLATE_900: Color = Color::Rgb(15, 23, 42);

/// Sidebar and bar background
pub const SLATE_800: Color = Color::Rgb(30, 41, 59);

/// Borders and separators
pub const SLATE_700: Color = Color::Rgb(51, 65, 85);

/// Secondary text (labels, status, timestamps)
pub const SLATE_400: Color = Color::Rgb(148, 163, 184);

/// Body text in answers
pub const SLATE_300: Color = Color::Rgb(203, 213, 225);

/// Primary text
pub const SLATE_50: Color = Color::Rgb(248, 250, 252);

// ============================================================================
// Accents
// ============================================================================

/// Brand blue (ticker label, headings, focused borders)
pub const ACCENT_BLUE: Color = Color::Rgb(59, 130, 246);

/// User message label
pub const USER_BLUE: Color = Color::Rgb(96, 165, 250);

/// Price line
pub const CHART_LINE: Color = Color::Rgb(59, 130, 246);

/// Area under the price line
pub const CHART_FILL: Color = Color::Rgb(30, 64, 125);

/// Gain
pub const UP_GREEN: Color = Color::Rgb(74, 222, 128);

/// Loss
pub const DOWN_RED: Color = Color::Rgb(248, 113, 113);

/// Listening indicator
pub const RECORDING_RED: Color = Color::Rgb(248, 113, 113);

/// Warning notices
pub const WARNING_AMBER: Color = Color::Rgb(251, 191, 36);

// ============================================================================
// Styles
// ============================================================================

/// Muted text
#[must_use]
pub fn muted() -> Style {
    Style::default().fg(SLATE_400)
}

/// Section header in the sidebar
#[must_use]
pub fn section_header() -> Style {
    Style::default().fg(SLATE_400).add_modifier(Modifier::BOLD)
}

/// Border style for a panel, highlighted when focused
#[must_use]
pub fn border(focused: bool) -> Style {
    if focused {
        Style::default().fg(ACCENT_BLUE)
    } else {
        Style::default().fg(SLATE_700)
    }
}

/// Label style for a message author
#[must_use]
pub fn role_label(role: MessageRole) -> Style {
    let color = match role {
        MessageRole::User => USER_BLUE,
        MessageRole::Bot => ACCENT_BLUE,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Colour for a percentage change
#[must_use]
pub fn change_color(change: f64) -> Color {
    if change >= 0.0 {
        UP_GREEN
    } else {
        DOWN_RED
    }
}

/// Style for a notice line
#[must_use]
pub fn notice(level: NotifyLevel) -> Style {
    match level {
        NotifyLevel::Info => Style::default().fg(SLATE_50),
        NotifyLevel::Warning => Style::default().fg(WARNING_AMBER),
        NotifyLevel::Error => Style::default().fg(DOWN_RED).add_modifier(Modifier::BOLD),
    }
}
