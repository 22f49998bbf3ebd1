use crate::components::slider::Slider;
use crate::themes::Theme;
use explorer_core::config::MIN_POINTS_RANGE;
use explorer_core::formatting::truncate_label;
use explorer_core::models::{Cohort, Reference};
use explorer_runtime::controller::{DashboardOptions, Filters};
use ratatui::text::{Line, Span};

/// Width of the control name column.
const LABEL_WIDTH: usize = 14;
const VALUE_WIDTH: usize = 24;

// ── Focus ────────────────────────────────────────────────────────────────────

/// The dashboard control that currently receives input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Vital,
    MinPoints,
    StartDate,
    Intervention,
    ControlGroup,
    Individuals,
}

impl Focus {
    pub const ALL: [Focus; 6] = [
        Focus::Vital,
        Focus::MinPoints,
        Focus::StartDate,
        Focus::Intervention,
        Focus::ControlGroup,
        Focus::Individuals,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Focus::Vital => "Vital",
            Focus::MinPoints => "Min points",
            Focus::StartDate => "Use start date",
            Focus::Intervention => Cohort::Intervention.label(),
            Focus::ControlGroup => Cohort::Control.label(),
            Focus::Individuals => "Individuals",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|f| f == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

// ── ControlsPanel ────────────────────────────────────────────────────────────

/// One line per control plus a key help line.
pub struct ControlsPanel<'a> {
    pub filters: &'a Filters,
    pub options: &'a DashboardOptions,
    pub focus: Focus,
    /// Index into `options.customers` of the customer under the cursor.
    pub customer_cursor: usize,
    pub theme: &'a Theme,
}

impl<'a> ControlsPanel<'a> {
    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let mut lines: Vec<Line<'a>> = Focus::ALL.iter().map(|f| self.control_line(*f)).collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Tab/↑↓ focus  ←→ change  Space toggle  c clear  q quit",
            self.theme.dim,
        )));
        lines
    }

    fn control_line(&self, focus: Focus) -> Line<'a> {
        let focused = self.focus == focus;
        let marker = if focused { "▸ " } else { "  " };
        let mut spans = vec![Span::styled(
            format!("{marker}{:<LABEL_WIDTH$}", focus.label()),
            self.theme.control_style(focused),
        )];
        spans.push(Span::raw(" "));

        match focus {
            Focus::Vital => {
                let value = if self.filters.measurement_type.is_empty() {
                    "none".to_string()
                } else {
                    truncate_label(&self.filters.measurement_type, VALUE_WIDTH)
                };
                spans.push(Span::styled(format!("◀ {value} ▶"), self.theme.value));
            }
            Focus::MinPoints => {
                let slider = Slider::new(
                    self.filters.min_points(),
                    MIN_POINTS_RANGE.0,
                    MIN_POINTS_RANGE.1,
                    self.theme,
                );
                spans.extend(slider.to_line().spans);
            }
            Focus::StartDate => {
                spans.push(self.checkbox(self.filters.reference == Reference::DaysSinceStart));
            }
            Focus::Intervention => {
                spans.push(self.checkbox(self.filters.visibility.intervention));
            }
            Focus::ControlGroup => {
                spans.push(self.checkbox(self.filters.visibility.control));
            }
            Focus::Individuals => spans.extend(self.individuals_spans()),
        }
        Line::from(spans)
    }

    fn checkbox(&self, checked: bool) -> Span<'a> {
        if checked {
            Span::styled("[x]", self.theme.selected)
        } else {
            Span::styled("[ ]", self.theme.dim)
        }
    }

    fn individuals_spans(&self) -> Vec<Span<'a>> {
        let Some(customer) = self.options.customers.get(self.customer_cursor) else {
            return vec![Span::styled("none", self.theme.dim)];
        };
        let selected = self.filters.customers.contains(customer);
        vec![
            Span::styled(
                format!("◀ {} ▶ ", truncate_label(customer, VALUE_WIDTH)),
                self.theme.value,
            ),
            self.checkbox(selected),
            Span::styled(
                format!("  {} selected", self.filters.customers.len()),
                self.theme.label,
            ),
        ]
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
