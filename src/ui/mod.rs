pub mod layout;
pub mod results;
pub mod typing_area;

use ratatui::style::Color;

/// Fixed colour set shared by every widget.
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub fg: Color,
    pub correct: Color,
    pub incorrect: Color,
    pub incorrect_bg: Color,
    pub pending: Color,
    pub cursor_fg: Color,
    pub cursor_bg: Color,
    pub accent: Color,
    pub border: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            fg: Color::Rgb(0xcd, 0xd6, 0xf4),
            correct: Color::Rgb(0xa6, 0xe3, 0xa1),
            incorrect: Color::Rgb(0xf3, 0x8b, 0xa8),
            incorrect_bg: Color::Rgb(0x45, 0x27, 0x3a),
            pending: Color::Rgb(0x58, 0x5b, 0x70),
            cursor_fg: Color::Rgb(0x1e, 0x1e, 0x2e),
            cursor_bg: Color::Rgb(0xf5, 0xe0, 0xdc),
            accent: Color::Rgb(0x89, 0xb4, 0xfa),
            border: Color::Rgb(0x45, 0x47, 0x5a),
            success: Color::Rgb(0xa6, 0xe3, 0xa1),
            warning: Color::Rgb(0xf9, 0xe2, 0xaf),
            error: Color::Rgb(0xf3, 0x8b, 0xa8),
        }
    }
}

impl Palette {
    /// Green at or above the goal, yellow within five points, red below.
    pub fn against_goal(&self, value: u32, goal: u32) -> Color {
        if value >= goal {
            self.success
        } else if value + 5 >= goal {
            self.warning
        } else {
            self.error
        }
    }
}
