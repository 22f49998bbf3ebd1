//! Dashboard controller.
//!
//! The dashboard is a pure function from the current [`Filters`] to a
//! [`DashboardView`]. The only shared state is the cached, immutable
//! [`JoinedTable`]; every render builds new aggregates and charts.

use explorer_core::chart::{ChartOutcome, LayeredChart};
use explorer_core::config::{DEFAULT_MIN_POINTS, MIN_POINTS_RANGE};
use explorer_core::models::{JoinedTable, Reference, Statistic};
use explorer_core::settings::LastUsedParams;
use explorer_data::charts::{self, CohortVisibility};
use explorer_data::selector;

// ── Filters ───────────────────────────────────────────────────────────────────

/// Current dashboard selections.
#[derive(Debug, Clone, PartialEq)]
pub struct Filters {
    pub measurement_type: String,
    /// Customers whose raw readings are overlaid on the value chart.
    pub customers: Vec<String>,
    min_points: u32,
    pub reference: Reference,
    pub visibility: CohortVisibility,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            measurement_type: String::new(),
            customers: Vec::new(),
            min_points: DEFAULT_MIN_POINTS,
            reference: Reference::Day,
            visibility: CohortVisibility::default(),
        }
    }
}

impl Filters {
    pub fn new(measurement_type: impl Into<String>) -> Self {
        Self {
            measurement_type: measurement_type.into(),
            ..Self::default()
        }
    }

    pub fn min_points(&self) -> u32 {
        self.min_points
    }

    /// Set the minimum group size, clamped to the slider range.
    pub fn set_min_points(&mut self, value: u32) {
        self.min_points = value.clamp(MIN_POINTS_RANGE.0, MIN_POINTS_RANGE.1);
    }

    pub fn step_min_points(&mut self, delta: i32) {
        let next = (self.min_points as i64 + delta as i64).max(0) as u32;
        self.set_min_points(next);
    }

    /// Add `customer` to the overlay selection, or remove it if present.
    pub fn toggle_customer(&mut self, customer: &str) {
        if let Some(pos) = self.customers.iter().position(|c| c == customer) {
            self.customers.remove(pos);
        } else {
            self.customers.push(customer.to_string());
        }
    }

    /// Restore remembered selections. A remembered measurement type is only
    /// used when it is still offered.
    pub fn apply_last_used(&mut self, last: &LastUsedParams, options: &DashboardOptions) {
        if let Some(kind) = &last.measurement_type {
            if options.measurement_types.contains(kind) {
                self.measurement_type = kind.clone();
            }
        }
        if let Some(v) = last.min_points {
            self.set_min_points(v);
        }
        if let Some(reference) = last.reference {
            self.reference = reference;
        }
        if let Some(v) = last.show_intervention {
            self.visibility.intervention = v;
        }
        if let Some(v) = last.show_control {
            self.visibility.control = v;
        }
    }

    /// Selections worth remembering across runs.
    pub fn to_last_used(&self, theme: Option<String>) -> LastUsedParams {
        LastUsedParams {
            theme,
            measurement_type: Some(self.measurement_type.clone()).filter(|t| !t.is_empty()),
            min_points: Some(self.min_points),
            reference: Some(self.reference),
            show_intervention: Some(self.visibility.intervention),
            show_control: Some(self.visibility.control),
        }
    }
}

// ── DashboardOptions ──────────────────────────────────────────────────────────

/// Choices offered by the dashboard controls for a loaded table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardOptions {
    pub measurement_types: Vec<String>,
    pub customers: Vec<String>,
    pub default_type: Option<String>,
}

impl DashboardOptions {
    /// Offer the measurement types that reach the default group size by
    /// calendar day, falling back to every type present.
    pub fn from_table(table: &JoinedTable, default_type_index: usize) -> Self {
        let mut measurement_types =
            match selector::select(table, Reference::Day, DEFAULT_MIN_POINTS as usize) {
                Ok(rows) => selector::measurement_types(&rows),
                Err(e) => {
                    tracing::warn!(error = %e, "selecting measurement types failed");
                    Vec::new()
                }
            };
        if measurement_types.is_empty() {
            measurement_types = table.measurement_types();
        }

        let default_type = if measurement_types.is_empty() {
            None
        } else {
            let idx = default_type_index.min(measurement_types.len() - 1);
            Some(measurement_types[idx].clone())
        };

        Self {
            customers: table.customers(),
            default_type,
            measurement_types,
        }
    }

    /// Initial filters for this table.
    pub fn initial_filters(&self) -> Filters {
        Filters::new(self.default_type.clone().unwrap_or_default())
    }
}

// ── compute_view ──────────────────────────────────────────────────────────────

/// The two charts shown for one set of filters.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    /// Median trend, overlaid with individual readings when customers are
    /// selected.
    pub value: LayeredChart,
    /// Number of samples behind each median.
    pub counts: ChartOutcome,
    /// Aggregate rows that passed the minimum group size.
    pub group_count: usize,
}

/// Build the dashboard for `filters`.
pub fn compute_view(table: &JoinedTable, filters: &Filters) -> DashboardView {
    let rows = match selector::select(table, filters.reference, filters.min_points() as usize) {
        Ok(rows) => rows,
        Err(e) => {
            let reason = e.to_string();
            return DashboardView {
                value: LayeredChart::single(ChartOutcome::no_data(reason.clone())),
                counts: ChartOutcome::no_data(reason),
                group_count: 0,
            };
        }
    };

    let kind = filters.measurement_type.as_str();
    let base = charts::draw_aggregate(
        &rows,
        kind,
        filters.reference,
        Statistic::Median,
        filters.visibility,
    );
    let overlay = (!filters.customers.is_empty()).then(|| {
        charts::draw_individuals(table, filters.reference, &filters.customers, kind)
    });
    let counts = charts::draw_aggregate(
        &rows,
        kind,
        filters.reference,
        Statistic::Count,
        filters.visibility,
    );

    tracing::debug!(
        measurement_type = kind,
        min_points = filters.min_points(),
        groups = rows.len(),
        customers = filters.customers.len(),
        "dashboard view computed"
    );

    DashboardView {
        value: LayeredChart { base, overlay },
        counts,
        group_count: rows.len(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
