//! Cohort-level aggregates for one time reference.

use explorer_core::error::Result;
use explorer_core::models::{
    CohortAggregate, JoinedTable, KeyColumn, KeyValue, Reference, XValue,
};

use crate::aggregator::Aggregator;

/// Aggregate by `(type, reference, cohort)` and return typed rows.
pub fn select(
    table: &JoinedTable,
    reference: Reference,
    min_points: usize,
) -> Result<Vec<CohortAggregate>> {
    let keys = [KeyColumn::Type, KeyColumn::from(reference), KeyColumn::Cohort];
    let rows = Aggregator::aggregate(table, &keys, min_points)?;

    Ok(rows
        .into_iter()
        .filter_map(|row| match row.key.as_slice() {
            [KeyValue::Text(kind), x, KeyValue::Cohort(cohort)] => Some(CohortAggregate {
                measurement_type: kind.clone(),
                x: XValue::from_key(x)?,
                cohort: *cohort,
                stats: row.stats,
            }),
            _ => None,
        })
        .collect())
}

/// Distinct measurement types present in `rows`, in row order.
pub fn measurement_types(rows: &[CohortAggregate]) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for r in rows {
        if !types.contains(&r.measurement_type) {
            types.push(r.measurement_type.clone());
        }
    }
    types
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use explorer_core::models::{Cohort, JoinedRow};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn row(customer: &str, day: u32, enrolled: u32, kind: &str, value: f64, cohort: Cohort) -> JoinedRow {
        JoinedRow {
            customer: customer.to_string(),
            day: date(day),
            measurement_type: kind.to_string(),
            value,
            enrollment: date(enrolled),
            days_since_start: day as i64 - enrolled as i64,
            cohort,
        }
    }

    fn make_table() -> JoinedTable {
        JoinedTable::new(vec![
            row("A", 3, 1, "hr", 70.0, Cohort::Intervention),
            row("B", 4, 2, "hr", 80.0, Cohort::Intervention),
            row("C", 3, 1, "hr", 60.0, Cohort::Control),
            row("C", 3, 1, "spo2", 97.0, Cohort::Control),
        ])
    }

    #[test]
    fn test_select_by_day() {
        let rows = select(&make_table(), Reference::Day, 1).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].measurement_type, "hr");
        assert_eq!(rows[0].x, XValue::Date(date(3)));
        assert_eq!(rows[0].cohort, Cohort::Intervention);
        assert_eq!(rows[1].cohort, Cohort::Control);
        assert_eq!(rows[2].x, XValue::Date(date(4)));
    }

    #[test]
    fn test_select_by_days_since_start_merges_offsets() {
        let rows = select(&make_table(), Reference::DaysSinceStart, 1).unwrap();
        // A (day 3, enrolled 1) and B (day 4, enrolled 2) share offset 2.
        let intervention: Vec<_> = rows
            .iter()
            .filter(|r| r.measurement_type == "hr" && r.cohort == Cohort::Intervention)
            .collect();
        assert_eq!(intervention.len(), 1);
        assert_eq!(intervention[0].x, XValue::Offset(2));
        assert_eq!(intervention[0].stats.count, 2);
        assert_eq!(intervention[0].stats.median, 75.0);
    }

    #[test]
    fn test_select_threshold() {
        let rows = select(&make_table(), Reference::DaysSinceStart, 2).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_measurement_types_distinct_in_order() {
        let rows = select(&make_table(), Reference::Day, 1).unwrap();
        assert_eq!(measurement_types(&rows), vec!["hr", "spo2"]);
        assert!(measurement_types(&[]).is_empty());
    }
}
