//! Study data loading.
//!
//! Reads the vital-sign CSV export and the participant spreadsheet, keeps
//! first-test participants only, and inner-joins the two into a
//! [`JoinedTable`].

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use explorer_core::config::{DataSource, DEFAULT_COHORT_COLUMN};
use explorer_core::error::{ExplorerError, Result};
use explorer_core::models::{
    Cohort, JoinedRow, JoinedTable, MeasurementRecord, ParticipantRecord,
};

// ── Column names ──────────────────────────────────────────────────────────────

pub const COL_CUSTOMER: &str = "customer";
pub const COL_DAY: &str = "day";
pub const COL_TYPE: &str = "type";
pub const COL_DOUBLE_VALUE: &str = "doubleValue";
pub const COL_LONG_VALUE: &str = "longValue";

pub const COL_TEST_NR: &str = "Test-Nr.";
pub const COL_PSEUDONYM: &str = "Pseudonym";
pub const COL_TEST_DATE: &str = "Testdatum";

const MEASUREMENT_COLUMNS: [&str; 5] = [
    COL_CUSTOMER,
    COL_DAY,
    COL_TYPE,
    COL_DOUBLE_VALUE,
    COL_LONG_VALUE,
];

static EMPTY_CELL: Cell = Cell::Empty;

/// Day zero of the spreadsheet (1900 system) serial date numbering.
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Reads and joins the study files.
#[derive(Debug, Clone)]
pub struct Loader {
    cohort_column: Regex,
}

impl Default for Loader {
    fn default() -> Self {
        Self {
            cohort_column: Regex::new(DEFAULT_COHORT_COLUMN).expect("regex is valid"),
        }
    }
}

impl Loader {
    /// Build a loader that locates the cohort-flag column with `pattern`.
    pub fn new(cohort_column_pattern: &str) -> Result<Self> {
        let cohort_column = Regex::new(cohort_column_pattern).map_err(|e| {
            ExplorerError::Config(format!(
                "invalid cohort column pattern '{cohort_column_pattern}': {e}"
            ))
        })?;
        Ok(Self { cohort_column })
    }

    pub fn load_source(&self, source: &DataSource) -> Result<JoinedTable> {
        self.load(&source.vitals_path, &source.users_path, &source.sheet)
    }

    /// Load both files and join them.
    pub fn load(&self, vitals_path: &Path, users_path: &Path, sheet: &str) -> Result<JoinedTable> {
        let start = Instant::now();

        let measurements = read_measurements(vitals_path)?;
        let participants = self.read_participants(users_path, sheet)?;
        let table = inner_join(&measurements, &participants);

        info!(
            measurements = measurements.len(),
            participants = participants.len(),
            joined = table.len(),
            dropped = measurements.len().saturating_sub(table.len()),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "study data loaded"
        );
        Ok(table)
    }

    /// Read first-test participant records from a spreadsheet sheet, or from
    /// a CSV export of that sheet (`sheet` is then ignored).
    pub fn read_participants(&self, path: &Path, sheet: &str) -> Result<Vec<ParticipantRecord>> {
        let (header, rows) = if has_extension(path, "csv") {
            read_csv_sheet(path)?
        } else {
            read_workbook_sheet(path, sheet)?
        };
        self.participants_from_rows(path, &header, rows)
    }

    /// Interpret a header row plus data rows as participant records.
    ///
    /// Keeps rows with `Test-Nr. == 1`, drops rows whose cohort flag is not
    /// one of the two known values.
    pub fn participants_from_rows(
        &self,
        path: &Path,
        header: &[String],
        rows: Vec<Vec<Cell>>,
    ) -> Result<Vec<ParticipantRecord>> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| missing_column(path, name))
        };
        let test_nr_idx = find(COL_TEST_NR)?;
        let pseudonym_idx = find(COL_PSEUDONYM)?;
        let date_idx = find(COL_TEST_DATE)?;
        let cohort_idx = header
            .iter()
            .position(|h| self.cohort_column.is_match(h))
            .ok_or_else(|| missing_column(path, self.cohort_column.as_str()))?;

        let mut participants = Vec::new();
        let mut unknown_cohort = 0usize;

        for (i, row) in rows.iter().enumerate() {
            // 1-based, header is row 1.
            let row_number = i + 2;
            let cell = |idx: usize| row.get(idx).unwrap_or(&EMPTY_CELL);

            if cell(test_nr_idx).as_i64() != Some(1) {
                continue;
            }
            let Some(pseudonym) = cell(pseudonym_idx).as_text() else {
                continue;
            };
            let Some(cohort) = cell(cohort_idx).as_i64().and_then(Cohort::from_flag) else {
                unknown_cohort += 1;
                continue;
            };
            let enrollment = cell(date_idx).as_date().ok_or_else(|| ExplorerError::InvalidCell {
                column: COL_TEST_DATE.to_string(),
                row: row_number,
                value: cell(date_idx).to_string(),
            })?;

            participants.push(ParticipantRecord {
                pseudonym,
                enrollment,
                cohort,
            });
        }

        if unknown_cohort > 0 {
            warn!(
                rows = unknown_cohort,
                "dropped first-test participants with unknown cohort flag"
            );
        }
        debug!(
            "Read {} first-test participants from {}",
            participants.len(),
            path.display()
        );
        Ok(participants)
    }
}

/// Load with the default cohort column pattern.
pub fn load(vitals_path: &Path, users_path: &Path, sheet: &str) -> Result<JoinedTable> {
    Loader::default().load(vitals_path, users_path, sheet)
}

// ── Measurements ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawMeasurement {
    customer: String,
    day: String,
    #[serde(rename = "type")]
    measurement_type: String,
    #[serde(rename = "doubleValue", default, deserialize_with = "csv::invalid_option")]
    double_value: Option<f64>,
    #[serde(rename = "longValue", default, deserialize_with = "csv::invalid_option")]
    long_value: Option<f64>,
}

/// Read the vital-sign CSV.
pub fn read_measurements(path: &Path) -> Result<Vec<MeasurementRecord>> {
    let file = std::fs::File::open(path).map_err(|source| ExplorerError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let csv_err = |source: csv::Error| ExplorerError::CsvParse {
        path: path.to_path_buf(),
        source,
    };

    let headers = reader.headers().map_err(csv_err)?.clone();
    for column in MEASUREMENT_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(missing_column(path, column));
        }
    }

    let mut records = Vec::new();
    for (i, result) in reader.deserialize::<RawMeasurement>().enumerate() {
        let raw = result.map_err(csv_err)?;
        let day = parse_day(&raw.day).ok_or_else(|| ExplorerError::InvalidCell {
            column: COL_DAY.to_string(),
            row: i + 2,
            value: raw.day.clone(),
        })?;
        records.push(MeasurementRecord::from_sources(
            raw.customer.trim(),
            day,
            raw.measurement_type.trim(),
            raw.double_value,
            raw.long_value,
        ));
    }

    debug!(
        "Read {} measurements from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

// ── Join ──────────────────────────────────────────────────────────────────────

/// Inner join on `customer == pseudonym`, preserving measurement order.
///
/// Measurements without a participant are dropped; a pseudonym with several
/// participant rows yields one joined row per match.
pub fn inner_join(
    measurements: &[MeasurementRecord],
    participants: &[ParticipantRecord],
) -> JoinedTable {
    let mut by_pseudonym: HashMap<&str, Vec<&ParticipantRecord>> = HashMap::new();
    for p in participants {
        by_pseudonym.entry(p.pseudonym.as_str()).or_default().push(p);
    }

    let rows = measurements
        .iter()
        .flat_map(|m| {
            by_pseudonym
                .get(m.customer.as_str())
                .into_iter()
                .flatten()
                .map(move |p| JoinedRow::join(m, p))
        })
        .collect();

    JoinedTable::new(rows)
}

// ── Cells ─────────────────────────────────────────────────────────────────────

/// A spreadsheet cell reduced to the shapes the loader cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    /// Integral value of a numeric or numeric-text cell.
    pub fn as_i64(&self) -> Option<i64> {
        let n = match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (n.fract() == 0.0 && n.is_finite()).then_some(n as i64)
    }

    /// Text form; integral numbers are rendered without a decimal point.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(_) | Cell::Date(_) => Some(self.to_string()),
        }
    }

    /// Date of a native date cell, a serial date number, or a date string.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Number(n) => excel_serial_to_date(*n),
            Cell::Text(s) => parse_day(s),
            Cell::Empty => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
            Data::String(s) => Cell::Text(s.clone()),
            Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
                .map(Cell::Date)
                .unwrap_or(Cell::Empty),
            Data::DateTimeIso(s) => parse_day(s)
                .map(Cell::Date)
                .unwrap_or_else(|| Cell::Text(s.clone())),
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(_) | Data::Empty => Cell::Empty,
        }
    }
}

// ── Sheet readers ─────────────────────────────────────────────────────────────

type SheetRows = (Vec<String>, Vec<Vec<Cell>>);

fn read_workbook_sheet(path: &Path, sheet: &str) -> Result<SheetRows> {
    std::fs::metadata(path).map_err(|source| ExplorerError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let spreadsheet_err = |source: calamine::Error| ExplorerError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_err)?;
    let names = workbook.sheet_names();
    if !names.iter().any(|n| n == sheet) {
        return Err(ExplorerError::SheetNotFound {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
            available: names.join(", "),
        });
    }
    let range = workbook.worksheet_range(sheet).map_err(spreadsheet_err)?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .map(|r| r.iter().map(|c| Cell::from(c).to_string()).collect())
        .unwrap_or_default();
    let data = rows
        .map(|r| r.iter().map(Cell::from).collect())
        .collect();
    Ok((header, data))
}

fn read_csv_sheet(path: &Path) -> Result<SheetRows> {
    let file = std::fs::File::open(path).map_err(|source| ExplorerError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_err = |source: csv::Error| ExplorerError::CsvParse {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let header = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok((header, rows))
}

// ── Parsing helpers ───────────────────────────────────────────────────────────

/// Parse a calendar day from a date or date-time string.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Convert a spreadsheet serial date (days since 1899-12-30) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    excel_epoch().checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn missing_column(path: &Path, column: &str) -> ExplorerError {
    ExplorerError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
