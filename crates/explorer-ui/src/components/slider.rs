use crate::themes::Theme;
use ratatui::text::{Line, Span};

/// Configuration controlling visual appearance of a slider.
pub struct SliderConfig {
    /// Width in terminal columns of the track (excluding label).
    pub width: u16,
    pub filled_char: char,
    pub empty_char: char,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            width: 20,
            filled_char: '\u{2588}', // █  FULL BLOCK
            empty_char: '\u{2591}',  // ░  LIGHT SHADE
        }
    }
}

// ── Slider ───────────────────────────────────────────────────────────────────

/// Horizontal integer slider: filled track up to `value`, then the value.
pub struct Slider<'a> {
    pub value: u32,
    pub min: u32,
    pub max: u32,
    pub theme: &'a Theme,
    pub config: SliderConfig,
}

impl<'a> Slider<'a> {
    pub fn new(value: u32, min: u32, max: u32, theme: &'a Theme) -> Self {
        Self {
            value,
            min,
            max,
            theme,
            config: SliderConfig::default(),
        }
    }

    /// Position of `value` within `[min, max]`, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.max <= self.min {
            return 1.0;
        }
        let clamped = self.value.clamp(self.min, self.max);
        (clamped - self.min) as f64 / (self.max - self.min) as f64
    }

    /// Render as `filled | empty | label` spans.
    pub fn to_line(&self) -> Line<'a> {
        let filled = (self.fraction() * self.config.width as f64).round() as u16;
        let empty = self.config.width.saturating_sub(filled);

        let filled_str: String =
            std::iter::repeat_n(self.config.filled_char, filled as usize).collect();
        let empty_str: String =
            std::iter::repeat_n(self.config.empty_char, empty as usize).collect();

        Line::from(vec![
            Span::styled(filled_str, self.theme.selected),
            Span::styled(empty_str, self.theme.dim),
            Span::styled(format!(" {}", self.value), self.theme.value),
        ])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
