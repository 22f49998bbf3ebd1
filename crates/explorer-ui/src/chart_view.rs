//! Trend chart panes.
//!
//! Draws a [`LayeredChart`] or a single [`ChartOutcome`] with ratatui's
//! [`Chart`] widget. Panes without data show the reason instead.

use ratatui::{
    layout::Rect,
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use explorer_core::chart::{ChartOutcome, ChartSpec, LayeredChart};
use explorer_core::formatting::{axis_decimals, format_number, truncate_label};
use explorer_core::models::{Reference, XValue};

use crate::themes::Theme;

/// Longest legend entry in columns.
const LEGEND_WIDTH: usize = 18;

// ── Public API ───────────────────────────────────────────────────────────────

/// Render the value pane: base chart plus optional overlay.
pub fn render_layered(frame: &mut Frame, area: Rect, chart: &LayeredChart, title: &str, theme: &Theme) {
    let layers = chart.layers();
    if layers.is_empty() {
        render_placeholder(frame, area, title, reason(&chart.base), theme);
        return;
    }
    render_layers(frame, area, &layers, title, theme);
}

/// Render a single-chart pane.
pub fn render_outcome(frame: &mut Frame, area: Rect, outcome: &ChartOutcome, title: &str, theme: &Theme) {
    match outcome {
        ChartOutcome::Chart(spec) => render_layers(frame, area, &[spec], title, theme),
        ChartOutcome::NoData { reason } => render_placeholder(frame, area, title, reason, theme),
    }
}

/// Render the placeholder shown when a pane has nothing to plot.
pub fn render_placeholder(frame: &mut Frame, area: Rect, title: &str, reason: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No data", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(reason.to_string(), theme.placeholder)),
    ];
    let paragraph = Paragraph::new(Text::from(text)).block(pane_block(title, theme));
    frame.render_widget(paragraph, area);
}

// ── Axis helpers ─────────────────────────────────────────────────────────────

/// Widen a zero-span range so the widget has something to draw.
pub fn widen(bounds: (f64, f64)) -> [f64; 2] {
    let (lo, hi) = bounds;
    if hi > lo {
        [lo, hi]
    } else {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
        [lo - pad, hi + pad]
    }
}

/// Three labels (low, middle, high) for the x axis.
pub fn x_labels(reference: Reference, bounds: [f64; 2]) -> Vec<String> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .iter()
        .map(|v| XValue::from_f64(reference, *v).to_string())
        .collect()
}

/// Three labels (low, middle, high) for the y axis.
pub fn y_labels(bounds: [f64; 2]) -> Vec<String> {
    let decimals = axis_decimals(bounds[1] - bounds[0]);
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .iter()
        .map(|v| format_number(*v, decimals))
        .collect()
}

// ── Private helpers ──────────────────────────────────────────────────────────

fn reason(outcome: &ChartOutcome) -> &str {
    match outcome {
        ChartOutcome::NoData { reason } => reason,
        ChartOutcome::Chart(_) => "",
    }
}

fn pane_block<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme.chart_border)
        .title(Span::styled(format!(" {title} "), theme.header))
}

fn union(bounds: impl Iterator<Item = (f64, f64)>) -> Option<(f64, f64)> {
    bounds.reduce(|(a_lo, a_hi), (b_lo, b_hi)| (a_lo.min(b_lo), a_hi.max(b_hi)))
}

fn render_layers(frame: &mut Frame, area: Rect, layers: &[&ChartSpec], title: &str, theme: &Theme) {
    let Some(first) = layers.first() else {
        return;
    };
    let reference = first.reference;
    let x_bounds = widen(union(layers.iter().filter_map(|c| c.x_bounds())).unwrap_or((0.0, 0.0)));
    let y_bounds = widen(union(layers.iter().map(|c| c.y_domain)).unwrap_or((0.0, 0.0)));

    // Datasets borrow their points, so collect them first.
    let series: Vec<(String, ratatui::style::Style, Vec<(f64, f64)>)> = layers
        .iter()
        .flat_map(|c| c.series.iter())
        .enumerate()
        .map(|(i, s)| {
            let points = s.points.iter().map(|(x, y)| (x.as_f64(), *y)).collect();
            (
                truncate_label(&s.name, LEGEND_WIDTH),
                theme.series_style(&s.color, i),
                points,
            )
        })
        .collect();

    let datasets: Vec<Dataset> = series
        .iter()
        .map(|(name, style, points)| {
            Dataset::default()
                .name(name.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(*style)
                .data(points)
        })
        .collect();

    let y_title = layers
        .iter()
        .map(|c| c.y_field.as_str())
        .collect::<Vec<_>>()
        .join(" / ");

    let chart = Chart::new(datasets)
        .block(pane_block(title, theme))
        .x_axis(
            Axis::default()
                .title(Span::styled(first.x_field.clone(), theme.label))
                .style(theme.axis)
                .bounds(x_bounds)
                .labels(x_labels(reference, x_bounds)),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled(y_title, theme.label))
                .style(theme.axis)
                .bounds(y_bounds)
                .labels(y_labels(y_bounds)),
        );
    frame.render_widget(chart, area);
}

// ── Tests ────────────────────────────────────────────────────────────────────
