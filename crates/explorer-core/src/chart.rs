//! Declarative chart descriptions.
//!
//! Chart builders produce these plain data structures; the terminal UI draws
//! them and the exporter serialises them as Vega-Lite documents. Nothing here
//! performs any rendering.

use serde_json::{json, Value};

use crate::models::{Reference, XValue};

/// Vega-Lite schema URL written into exported documents.
pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Categorical palette for charts without fixed series colours.
pub const CATEGORY_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

// ── Series / scales ───────────────────────────────────────────────────────────

/// One line of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Legend label, also the value of the chart's colour field.
    pub name: String,
    /// Hex colour, e.g. `"#c0392b"`.
    pub color: String,
    /// Points ordered by x.
    pub points: Vec<(XValue, f64)>,
}

/// Explicit mapping from colour-field values to colours.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    pub domain: Vec<String>,
    pub range: Vec<String>,
}

// ── ChartSpec ─────────────────────────────────────────────────────────────────

/// A line chart: one line per series, with a fixed y domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub reference: Reference,
    /// Name of the x field (`"day"` or `"days_since_start"`).
    pub x_field: String,
    /// Name of the y field (`"median"`, `"count"`, `"value"`, ...).
    pub y_field: String,
    /// Name of the field distinguishing series (`"cohort"`, `"customer"`).
    pub color_field: String,
    /// Inclusive y axis range.
    pub y_domain: (f64, f64),
    pub color_scale: ColorScale,
    pub series: Vec<Series>,
}

impl ChartSpec {
    /// Smallest and largest x position over all series, or `None` when the
    /// chart has no points.
    pub fn x_bounds(&self) -> Option<(f64, f64)> {
        let mut xs = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|(x, _)| x.as_f64()));
        let first = xs.next()?;
        Some(xs.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x))))
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }

    /// Flatten the series into Vega-Lite data rows.
    fn data_values(&self) -> Vec<Value> {
        self.series
            .iter()
            .flat_map(|s| {
                s.points.iter().map(move |(x, y)| {
                    let x_value = match x {
                        XValue::Date(_) => Value::String(x.to_string()),
                        XValue::Offset(o) => json!(o),
                    };
                    let mut row = serde_json::Map::new();
                    row.insert(self.x_field.clone(), x_value);
                    row.insert(self.y_field.clone(), json!(y));
                    row.insert(self.color_field.clone(), Value::String(s.name.clone()));
                    Value::Object(row)
                })
            })
            .collect()
    }

    /// Single-view Vega-Lite body (without `$schema`).
    fn vega_lite_view(&self) -> Value {
        let x_type = match self.reference {
            Reference::Day => "temporal",
            Reference::DaysSinceStart => "quantitative",
        };
        json!({
            "title": self.title,
            "data": { "values": self.data_values() },
            "mark": "line",
            "encoding": {
                "x": { "field": self.x_field, "type": x_type },
                "y": {
                    "field": self.y_field,
                    "type": "quantitative",
                    "scale": { "domain": [self.y_domain.0, self.y_domain.1] }
                },
                "color": {
                    "field": self.color_field,
                    "type": "nominal",
                    "scale": {
                        "domain": self.color_scale.domain,
                        "range": self.color_scale.range
                    }
                }
            }
        })
    }

    /// Serialise as a standalone Vega-Lite v5 document.
    pub fn to_vega_lite(&self) -> Value {
        let mut doc = self.vega_lite_view();
        if let Value::Object(map) = &mut doc {
            map.insert("$schema".to_string(), Value::String(VEGA_LITE_SCHEMA.to_string()));
        }
        doc
    }
}

// ── ChartOutcome ──────────────────────────────────────────────────────────────

/// Result of a chart builder: a chart, or an explicit empty state.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Chart(ChartSpec),
    NoData { reason: String },
}

impl ChartOutcome {
    pub fn no_data(reason: impl Into<String>) -> Self {
        ChartOutcome::NoData {
            reason: reason.into(),
        }
    }

    pub fn chart(&self) -> Option<&ChartSpec> {
        match self {
            ChartOutcome::Chart(spec) => Some(spec),
            ChartOutcome::NoData { .. } => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, ChartOutcome::NoData { .. })
    }

    /// Vega-Lite document; an empty state becomes an empty, titled view.
    pub fn to_vega_lite(&self) -> Value {
        match self {
            ChartOutcome::Chart(spec) => spec.to_vega_lite(),
            ChartOutcome::NoData { reason } => json!({
                "$schema": VEGA_LITE_SCHEMA,
                "title": reason,
                "data": { "values": [] },
                "mark": "line"
            }),
        }
    }
}

// ── LayeredChart ──────────────────────────────────────────────────────────────

/// A base chart optionally overlaid with a second chart whose colour scale
/// is resolved independently.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredChart {
    pub base: ChartOutcome,
    pub overlay: Option<ChartOutcome>,
}

impl LayeredChart {
    pub fn single(base: ChartOutcome) -> Self {
        Self {
            base,
            overlay: None,
        }
    }

    /// Charts that actually have data, base first.
    pub fn layers(&self) -> Vec<&ChartSpec> {
        std::iter::once(&self.base)
            .chain(self.overlay.iter())
            .filter_map(ChartOutcome::chart)
            .collect()
    }

    /// Union of the y domains of all drawable layers.
    pub fn y_domain(&self) -> Option<(f64, f64)> {
        self.layers()
            .iter()
            .map(|c| c.y_domain)
            .reduce(|(a_lo, a_hi), (b_lo, b_hi)| (a_lo.min(b_lo), a_hi.max(b_hi)))
    }

    /// Union of the x bounds of all drawable layers.
    pub fn x_bounds(&self) -> Option<(f64, f64)> {
        self.layers()
            .iter()
            .filter_map(|c| c.x_bounds())
            .reduce(|(a_lo, a_hi), (b_lo, b_hi)| (a_lo.min(b_lo), a_hi.max(b_hi)))
    }

    /// Serialise as Vega-Lite. Returns `None` when no layer has data.
    pub fn to_vega_lite(&self) -> Option<Value> {
        let layers = self.layers();
        match layers.as_slice() {
            [] => None,
            [only] => Some(only.to_vega_lite()),
            _ => Some(json!({
                "$schema": VEGA_LITE_SCHEMA,
                "layer": layers.iter().map(|c| c.vega_lite_view()).collect::<Vec<_>>(),
                "resolve": { "scale": { "color": "independent" } }
            })),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
