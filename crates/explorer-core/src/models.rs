use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::stats::GroupStats;

// ── Cohort ────────────────────────────────────────────────────────────────────

/// Study arm a participant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Cohort {
    Intervention,
    Control,
}

impl Cohort {
    /// Both cohorts in flag order (`0`, `1`).
    pub const ALL: [Cohort; 2] = [Cohort::Intervention, Cohort::Control];

    /// Map the binary group flag from the participant sheet.
    ///
    /// `0 → Intervention`, `1 → Control`; any other value yields `None`.
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(Cohort::Intervention),
            1 => Some(Cohort::Control),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Cohort::Intervention => "Intervention",
            Cohort::Control => "Control",
        }
    }

    /// Fixed chart colour for the cohort.
    pub fn color(&self) -> &'static str {
        match self {
            Cohort::Intervention => "#c0392b",
            Cohort::Control => "#34495e",
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Reference ─────────────────────────────────────────────────────────────────

/// Time basis used for the x axis and for grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    /// Calendar day of the measurement.
    #[default]
    Day,
    /// Whole days elapsed since the participant's enrollment date.
    DaysSinceStart,
}

impl Reference {
    /// Select the reference from the "use start date as reference" toggle.
    pub fn from_start_toggle(use_start: bool) -> Self {
        if use_start {
            Reference::DaysSinceStart
        } else {
            Reference::Day
        }
    }

    /// Column name of the reference in the joined table.
    pub fn column(&self) -> &'static str {
        match self {
            Reference::Day => "day",
            Reference::DaysSinceStart => "days_since_start",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Reference::Day => Reference::DaysSinceStart,
            Reference::DaysSinceStart => Reference::Day,
        }
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// One vital-sign reading for a customer on a calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub customer: String,
    pub day: NaiveDate,
    pub measurement_type: String,
    pub value: f64,
}

impl MeasurementRecord {
    /// Build a record from the two optional numeric source fields.
    ///
    /// Absent or non-finite fields count as `0`; both are always summed.
    pub fn from_sources(
        customer: impl Into<String>,
        day: NaiveDate,
        measurement_type: impl Into<String>,
        double_value: Option<f64>,
        long_value: Option<f64>,
    ) -> Self {
        Self {
            customer: customer.into(),
            day,
            measurement_type: measurement_type.into(),
            value: finite_or_zero(double_value) + finite_or_zero(long_value),
        }
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// First-test metadata row for a study participant.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantRecord {
    pub pseudonym: String,
    pub enrollment: NaiveDate,
    pub cohort: Cohort,
}

/// A measurement joined with its participant's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub customer: String,
    pub day: NaiveDate,
    pub measurement_type: String,
    pub value: f64,
    pub enrollment: NaiveDate,
    pub days_since_start: i64,
    pub cohort: Cohort,
}

impl JoinedRow {
    pub fn join(measurement: &MeasurementRecord, participant: &ParticipantRecord) -> Self {
        Self {
            customer: measurement.customer.clone(),
            day: measurement.day,
            measurement_type: measurement.measurement_type.clone(),
            value: measurement.value,
            enrollment: participant.enrollment,
            days_since_start: (measurement.day - participant.enrollment).num_days(),
            cohort: participant.cohort,
        }
    }

    /// The x value of this row under `reference`.
    pub fn x(&self, reference: Reference) -> XValue {
        match reference {
            Reference::Day => XValue::Date(self.day),
            Reference::DaysSinceStart => XValue::Offset(self.days_since_start),
        }
    }
}

/// The loaded study table. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinedTable {
    rows: Vec<JoinedRow>,
}

impl JoinedTable {
    pub fn new(rows: Vec<JoinedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[JoinedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct measurement types, sorted.
    pub fn measurement_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .rows
            .iter()
            .map(|r| r.measurement_type.clone())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Distinct customer identifiers, sorted.
    pub fn customers(&self) -> Vec<String> {
        let mut customers: Vec<String> = self.rows.iter().map(|r| r.customer.clone()).collect();
        customers.sort();
        customers.dedup();
        customers
    }
}

// ── Grouping keys ─────────────────────────────────────────────────────────────

/// Columns of the joined table that can be used as grouping keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyColumn {
    Customer,
    Day,
    Type,
    DaysSinceStart,
    Cohort,
}

impl KeyColumn {
    pub fn name(&self) -> &'static str {
        match self {
            KeyColumn::Customer => "customer",
            KeyColumn::Day => "day",
            KeyColumn::Type => "type",
            KeyColumn::DaysSinceStart => "days_since_start",
            KeyColumn::Cohort => "cohort",
        }
    }

    /// Extract this column's value from `row`.
    pub fn value(&self, row: &JoinedRow) -> KeyValue {
        match self {
            KeyColumn::Customer => KeyValue::Text(row.customer.clone()),
            KeyColumn::Day => KeyValue::Date(row.day),
            KeyColumn::Type => KeyValue::Text(row.measurement_type.clone()),
            KeyColumn::DaysSinceStart => KeyValue::Int(row.days_since_start),
            KeyColumn::Cohort => KeyValue::Cohort(row.cohort),
        }
    }
}

impl From<Reference> for KeyColumn {
    fn from(reference: Reference) -> Self {
        match reference {
            Reference::Day => KeyColumn::Day,
            Reference::DaysSinceStart => KeyColumn::DaysSinceStart,
        }
    }
}

/// A single grouping key value. Ordered so that grouped output follows the
/// natural ordering of the keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Text(String),
    Date(NaiveDate),
    Int(i64),
    Cohort(Cohort),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Text(s) => f.write_str(s),
            KeyValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            KeyValue::Int(i) => write!(f, "{i}"),
            KeyValue::Cohort(c) => f.write_str(c.label()),
        }
    }
}

// ── X values ──────────────────────────────────────────────────────────────────

/// Position on a chart's time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum XValue {
    Date(NaiveDate),
    Offset(i64),
}

impl XValue {
    /// Numeric position used for plotting: days since 1970-01-01 for dates,
    /// the offset itself otherwise.
    pub fn as_f64(&self) -> f64 {
        match self {
            XValue::Date(d) => (*d - unix_epoch()).num_days() as f64,
            XValue::Offset(o) => *o as f64,
        }
    }

    /// Inverse of [`Self::as_f64`], rounding to the nearest whole day.
    pub fn from_f64(reference: Reference, position: f64) -> Self {
        let days = position.round() as i64;
        match reference {
            Reference::Day => XValue::Date(unix_epoch() + chrono::Duration::days(days)),
            Reference::DaysSinceStart => XValue::Offset(days),
        }
    }

    pub fn from_key(value: &KeyValue) -> Option<Self> {
        match value {
            KeyValue::Date(d) => Some(XValue::Date(*d)),
            KeyValue::Int(i) => Some(XValue::Offset(*i)),
            _ => None,
        }
    }
}

impl fmt::Display for XValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            XValue::Offset(o) => write!(f, "{o}"),
        }
    }
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::default()
}

// ── Aggregates ────────────────────────────────────────────────────────────────

/// One output row of a group-by aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    /// Key values in the order of the requested grouping columns.
    pub key: Vec<KeyValue>,
    pub stats: GroupStats,
}

/// Aggregate keyed by `(measurement type, reference value, cohort)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortAggregate {
    pub measurement_type: String,
    pub x: XValue,
    pub cohort: Cohort,
    pub stats: GroupStats,
}

/// Statistic column plotted on a chart's y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Mean,
    Median,
    Std,
    Count,
    Err,
}

impl Statistic {
    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Std => "std",
            Statistic::Count => "count",
            Statistic::Err => "err",
        }
    }

    /// Read this statistic from `stats`; `None` when it is undefined.
    pub fn value(&self, stats: &GroupStats) -> Option<f64> {
        match self {
            Statistic::Mean => Some(stats.mean),
            Statistic::Median => Some(stats.median),
            Statistic::Std => stats.std,
            Statistic::Count => Some(stats.count as f64),
            Statistic::Err => stats.err,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
