//! Chart builders.
//!
//! Pure functions turning aggregates or joined rows into declarative
//! [`ChartSpec`]s. Empty inputs produce [`ChartOutcome::NoData`] rather than
//! an error.

use std::collections::BTreeMap;

use explorer_core::chart::{ChartOutcome, ChartSpec, ColorScale, Series, CATEGORY_PALETTE};
use explorer_core::models::{
    Cohort, CohortAggregate, JoinedTable, Reference, Statistic, XValue,
};

/// Fraction of the value span added above and below the data.
pub const Y_PADDING_FACTOR: f64 = 0.1;

// ── CohortVisibility ──────────────────────────────────────────────────────────

/// Which cohorts a chart should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CohortVisibility {
    pub intervention: bool,
    pub control: bool,
}

impl Default for CohortVisibility {
    fn default() -> Self {
        Self {
            intervention: true,
            control: false,
        }
    }
}

impl CohortVisibility {
    pub fn shows(&self, cohort: Cohort) -> bool {
        match cohort {
            Cohort::Intervention => self.intervention,
            Cohort::Control => self.control,
        }
    }
}

// ── y_limits ──────────────────────────────────────────────────────────────────

/// Padded y range `[min - factor·span, max + factor·span]`.
///
/// Non-finite values are ignored; returns `None` when nothing is left.
pub fn y_limits(values: impl IntoIterator<Item = f64>, factor: f64) -> Option<(f64, f64)> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    let span = max - min;
    Some((min - factor * span, max + factor * span))
}

// ── Aggregate trend ───────────────────────────────────────────────────────────

/// One line per visible cohort showing `stat` for `measurement_type`.
///
/// The y range is computed over every cohort of the measurement type, so
/// hiding a cohort does not rescale the axis.
pub fn draw_aggregate(
    rows: &[CohortAggregate],
    measurement_type: &str,
    reference: Reference,
    stat: Statistic,
    visibility: CohortVisibility,
) -> ChartOutcome {
    let slice: Vec<&CohortAggregate> = rows
        .iter()
        .filter(|r| r.measurement_type == measurement_type)
        .collect();
    if slice.is_empty() {
        return ChartOutcome::no_data(format!(
            "No {measurement_type} groups meet the minimum number of data points"
        ));
    }

    let Some(y_domain) = y_limits(
        slice.iter().filter_map(|r| stat.value(&r.stats)),
        Y_PADDING_FACTOR,
    ) else {
        return ChartOutcome::no_data(format!(
            "{} is undefined for every {measurement_type} group",
            stat.name()
        ));
    };

    let series: Vec<Series> = Cohort::ALL
        .iter()
        .filter(|c| visibility.shows(**c))
        .filter_map(|cohort| {
            let mut points: Vec<(XValue, f64)> = slice
                .iter()
                .filter(|r| r.cohort == *cohort)
                .filter_map(|r| stat.value(&r.stats).map(|v| (r.x, v)))
                .collect();
            if points.is_empty() {
                return None;
            }
            points.sort_by(|a, b| a.0.cmp(&b.0));
            Some(Series {
                name: cohort.label().to_string(),
                color: cohort.color().to_string(),
                points,
            })
        })
        .collect();

    if series.is_empty() {
        return ChartOutcome::no_data("No visible cohort has data");
    }

    ChartOutcome::Chart(ChartSpec {
        title: format!("{measurement_type} ({})", stat.name()),
        reference,
        x_field: reference.column().to_string(),
        y_field: stat.name().to_string(),
        color_field: "cohort".to_string(),
        y_domain,
        color_scale: ColorScale {
            domain: Cohort::ALL.iter().map(|c| c.label().to_string()).collect(),
            range: Cohort::ALL.iter().map(|c| c.color().to_string()).collect(),
        },
        series,
    })
}

// ── Individual trend ──────────────────────────────────────────────────────────

/// One line per selected customer showing raw values of `measurement_type`.
pub fn draw_individuals(
    table: &JoinedTable,
    reference: Reference,
    customers: &[String],
    measurement_type: &str,
) -> ChartOutcome {
    let mut by_customer: BTreeMap<&str, Vec<(XValue, f64)>> = BTreeMap::new();
    for row in table.rows() {
        if row.measurement_type == measurement_type && customers.contains(&row.customer) {
            by_customer
                .entry(row.customer.as_str())
                .or_default()
                .push((row.x(reference), row.value));
        }
    }

    let Some(y_domain) = y_limits(
        by_customer.values().flatten().map(|(_, v)| *v),
        Y_PADDING_FACTOR,
    ) else {
        return ChartOutcome::no_data(format!(
            "No {measurement_type} readings for the selected individuals"
        ));
    };

    let series: Vec<Series> = by_customer
        .into_iter()
        .enumerate()
        .map(|(i, (customer, mut points))| {
            points.sort_by(|a, b| a.0.cmp(&b.0));
            Series {
                name: customer.to_string(),
                color: CATEGORY_PALETTE[i % CATEGORY_PALETTE.len()].to_string(),
                points,
            }
        })
        .collect();

    ChartOutcome::Chart(ChartSpec {
        title: format!("{measurement_type} (individuals)"),
        reference,
        x_field: reference.column().to_string(),
        y_field: "value".to_string(),
        color_field: "customer".to_string(),
        y_domain,
        color_scale: ColorScale {
            domain: series.iter().map(|s| s.name.clone()).collect(),
            range: series.iter().map(|s| s.color.clone()).collect(),
        },
        series,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use explorer_core::models::JoinedRow;
    use explorer_core::stats::GroupStats;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn agg(kind: &str, day: u32, cohort: Cohort, values: &[f64]) -> CohortAggregate {
        CohortAggregate {
            measurement_type: kind.to_string(),
            x: XValue::Date(date(day)),
            cohort,
            stats: GroupStats::from_values(values).unwrap(),
        }
    }

    fn make_rows() -> Vec<CohortAggregate> {
        vec![
            agg("hr", 1, Cohort::Intervention, &[70.0, 72.0]),
            agg("hr", 1, Cohort::Control, &[60.0, 62.0]),
            agg("hr", 2, Cohort::Intervention, &[80.0, 82.0]),
            agg("hr", 2, Cohort::Control, &[64.0, 66.0]),
            agg("spo2", 1, Cohort::Control, &[97.0, 98.0]),
        ]
    }

    fn both() -> CohortVisibility {
        CohortVisibility {
            intervention: true,
            control: true,
        }
    }

    // ── y_limits ──────────────────────────────────────────────────────────────

    #[test]
    fn test_y_limits_pads_ten_percent() {
        let (lo, hi) = y_limits([10.0, 20.0, 15.0], 0.1).unwrap();
        assert!((lo - 9.0).abs() < 1e-12);
        assert!((hi - 21.0).abs() < 1e-12);
    }

    #[test]
    fn test_y_limits_bracket_values() {
        let values = [3.5, -2.0, 7.25, 0.0];
        let (lo, hi) = y_limits(values, Y_PADDING_FACTOR).unwrap();
        assert!(values.iter().all(|v| lo <= *v && *v <= hi));
    }

    #[test]
    fn test_y_limits_constant_values() {
        assert_eq!(y_limits([5.0, 5.0], 0.1), Some((5.0, 5.0)));
    }

    #[test]
    fn test_y_limits_empty_and_nan() {
        assert_eq!(y_limits(Vec::<f64>::new(), 0.1), None);
        assert_eq!(y_limits([f64::NAN], 0.1), None);
        assert_eq!(y_limits([f64::NAN, 1.0], 0.1), Some((1.0, 1.0)));
    }

    // ── draw_aggregate ────────────────────────────────────────────────────────

    #[test]
    fn test_draw_aggregate_line_per_cohort() {
        let outcome = draw_aggregate(&make_rows(), "hr", Reference::Day, Statistic::Median, both());
        let chart = outcome.chart().expect("chart");
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].name, "Intervention");
        assert_eq!(chart.series[0].color, "#c0392b");
        assert_eq!(chart.series[1].name, "Control");
        assert_eq!(chart.series[1].color, "#34495e");
        assert_eq!(chart.series[0].points, vec![(XValue::Date(date(1)), 71.0), (XValue::Date(date(2)), 81.0)]);
        assert_eq!(chart.x_field, "day");
        assert_eq!(chart.y_field, "median");
        // Medians span 61..81, padded by 2 on each side.
        assert!((chart.y_domain.0 - 59.0).abs() < 1e-9);
        assert!((chart.y_domain.1 - 83.0).abs() < 1e-9);
    }

    #[test]
    fn test_draw_aggregate_hiding_cohort_removes_only_that_cohort() {
        let visible = CohortVisibility {
            intervention: true,
            control: false,
        };
        let chart = draw_aggregate(&make_rows(), "hr", Reference::Day, Statistic::Median, visible);
        let chart = chart.chart().expect("chart");
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].name, "Intervention");
        assert_eq!(chart.point_count(), 2);
        // Axis is unchanged by hiding a cohort.
        assert!((chart.y_domain.0 - 59.0).abs() < 1e-9);
    }

    #[test]
    fn test_draw_aggregate_all_hidden_is_no_data() {
        let hidden = CohortVisibility {
            intervention: false,
            control: false,
        };
        let outcome = draw_aggregate(&make_rows(), "hr", Reference::Day, Statistic::Median, hidden);
        assert!(outcome.is_no_data());
    }

    #[test]
    fn test_draw_aggregate_unknown_type_is_no_data() {
        let outcome = draw_aggregate(&make_rows(), "bp", Reference::Day, Statistic::Median, both());
        assert!(outcome.is_no_data());
    }

    #[test]
    fn test_draw_aggregate_empty_rows_is_no_data() {
        let outcome = draw_aggregate(&[], "hr", Reference::Day, Statistic::Count, both());
        assert!(outcome.is_no_data());
    }

    #[test]
    fn test_draw_aggregate_undefined_statistic_is_no_data() {
        let rows = vec![agg("hr", 1, Cohort::Intervention, &[70.0])];
        let outcome = draw_aggregate(&rows, "hr", Reference::Day, Statistic::Err, both());
        assert!(outcome.is_no_data());
    }

    #[test]
    fn test_draw_aggregate_count_chart() {
        let chart = draw_aggregate(&make_rows(), "spo2", Reference::Day, Statistic::Count, both());
        let chart = chart.chart().expect("chart");
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].points[0].1, 2.0);
        assert_eq!(chart.y_domain, (2.0, 2.0));
    }

    // ── draw_individuals ──────────────────────────────────────────────────────

    fn joined(customer: &str, day: u32, kind: &str, value: f64) -> JoinedRow {
        JoinedRow {
            customer: customer.to_string(),
            day: date(day),
            measurement_type: kind.to_string(),
            value,
            enrollment: date(1),
            days_since_start: day as i64 - 1,
            cohort: Cohort::Intervention,
        }
    }

    fn make_table() -> JoinedTable {
        JoinedTable::new(vec![
            joined("B", 2, "hr", 90.0),
            joined("A", 2, "hr", 70.0),
            joined("A", 1, "hr", 60.0),
            joined("A", 1, "steps", 9000.0),
            joined("C", 1, "hr", 200.0),
        ])
    }

    #[test]
    fn test_draw_individuals_filters_customers_and_type() {
        let customers = vec!["A".to_string(), "B".to_string()];
        let outcome = draw_individuals(&make_table(), Reference::DaysSinceStart, &customers, "hr");
        let chart = outcome.chart().expect("chart");

        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].name, "A");
        assert_eq!(
            chart.series[0].points,
            vec![(XValue::Offset(0), 60.0), (XValue::Offset(1), 70.0)]
        );
        assert_eq!(chart.series[1].name, "B");
        assert_eq!(chart.color_field, "customer");
        assert_eq!(chart.x_field, "days_since_start");
        // Values 60..90 → padded by 3.
        assert!((chart.y_domain.0 - 57.0).abs() < 1e-9);
        assert!((chart.y_domain.1 - 93.0).abs() < 1e-9);
        assert_eq!(chart.color_scale.domain, vec!["A", "B"]);
        assert_ne!(chart.series[0].color, chart.series[1].color);
    }

    #[test]
    fn test_draw_individuals_no_match_is_no_data() {
        let customers = vec!["Z".to_string()];
        let outcome = draw_individuals(&make_table(), Reference::Day, &customers, "hr");
        assert!(outcome.is_no_data());
        let outcome = draw_individuals(&make_table(), Reference::Day, &[], "hr");
        assert!(outcome.is_no_data());
    }
}
