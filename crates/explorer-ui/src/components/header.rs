use crate::themes::Theme;
use ratatui::text::{Line, Span};

/// Decoration placed either side of the application title.
pub const ACCENT: &str = "♥ ♡ ♥";

/// Dashboard header rendering four lines:
///
/// 1. Application title with accents (ALL CAPS).
/// 2. A 60-column `=` separator.
/// 3. Data source in `[ vitals | users:sheet | N rows ]` format.
/// 4. An empty line.
pub struct Header<'a> {
    /// File name of the vital-sign export.
    pub vitals: &'a str,
    /// File name of the participant sheet.
    pub users: &'a str,
    pub sheet: &'a str,
    /// Number of joined rows.
    pub rows: usize,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(vitals: &'a str, users: &'a str, sheet: &'a str, rows: usize, theme: &'a Theme) -> Self {
        Self {
            vitals,
            users,
            sheet,
            rows,
            theme,
        }
    }

    /// Render the header as exactly four lines.
    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let separator = "=".repeat(60);

        vec![
            Line::from(vec![
                Span::styled(ACCENT, self.theme.header_accent),
                Span::styled(" WATCH DATA EXPLORER ", self.theme.header),
                Span::styled(ACCENT, self.theme.header_accent),
            ]),
            Line::from(Span::styled(separator, self.theme.separator)),
            Line::from(vec![
                Span::styled("[ ", self.theme.label),
                Span::styled(self.vitals, self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(format!("{}:{}", self.users, self.sheet), self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(
                    format!(
                        "{} rows",
                        explorer_core::formatting::format_number(self.rows as f64, 0)
                    ),
                    self.theme.value,
                ),
                Span::styled(" ]", self.theme.label),
            ]),
            Line::from(""),
        ]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
