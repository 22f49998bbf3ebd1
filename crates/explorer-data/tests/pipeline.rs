//! End-to-end pipeline: files on disk → joined table → aggregates → charts.

use std::fs;
use std::path::PathBuf;

use explorer_data::charts::{self, CohortVisibility};
use explorer_data::core::error::ExplorerError;
use explorer_data::core::models::{Cohort, KeyColumn, Reference, Statistic, XValue};
use explorer_data::{aggregator::Aggregator, loader, selector};
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

fn fixture(dir: &TempDir) -> (PathBuf, PathBuf) {
    let vitals = write_file(
        dir,
        "vitals.csv",
        "customer,day,type,doubleValue,longValue\n\
         A,2024-01-01,hr,70,\n\
         A,2024-01-02,hr,72,\n\
         B,2024-01-01,hr,65,\n\
         Z,2024-01-01,hr,99,\n",
    );
    let users = write_file(
        dir,
        "users.csv",
        "Test-Nr.,Pseudonym,Testdatum,Gruppe [In = 0; Ko = 1]\n\
         1,A,2024-01-01,0\n\
         1,B,2024-01-01,1\n\
         2,B,2024-03-01,1\n",
    );
    (vitals, users)
}

#[test]
fn test_load_joins_cohorts_and_offsets() {
    let tmp = TempDir::new().expect("tempdir");
    let (vitals, users) = fixture(&tmp);

    let table = loader::load(&vitals, &users, "Tabelle1").unwrap();

    assert_eq!(table.len(), 3);
    let cohorts: Vec<Cohort> = table.rows().iter().map(|r| r.cohort).collect();
    assert_eq!(
        cohorts,
        vec![Cohort::Intervention, Cohort::Intervention, Cohort::Control]
    );
    let offsets: Vec<i64> = table.rows().iter().map(|r| r.days_since_start).collect();
    assert_eq!(offsets, vec![0, 1, 0]);
    assert_eq!(table.customers(), vec!["A", "B"]);
}

#[test]
fn test_single_sample_groups_have_undefined_spread() {
    let tmp = TempDir::new().expect("tempdir");
    let (vitals, users) = fixture(&tmp);
    let table = loader::load(&vitals, &users, "Tabelle1").unwrap();

    let rows = Aggregator::aggregate(
        &table,
        &[KeyColumn::Type, KeyColumn::Day, KeyColumn::Cohort],
        1,
    )
    .unwrap();

    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.stats.count, 1);
        assert!(row.stats.std.is_none());
        assert!(row.stats.err.is_none());
    }
}

#[test]
fn test_threshold_above_group_sizes_yields_nothing() {
    let tmp = TempDir::new().expect("tempdir");
    let (vitals, users) = fixture(&tmp);
    let table = loader::load(&vitals, &users, "Tabelle1").unwrap();

    let rows = selector::select(&table, Reference::Day, 2).unwrap();
    assert!(rows.is_empty());

    let chart = charts::draw_aggregate(
        &rows,
        "hr",
        Reference::Day,
        Statistic::Median,
        CohortVisibility::default(),
    );
    assert!(chart.is_no_data());
}

#[test]
fn test_days_since_start_chart() {
    let tmp = TempDir::new().expect("tempdir");
    let (vitals, users) = fixture(&tmp);
    let table = loader::load(&vitals, &users, "Tabelle1").unwrap();

    let rows = selector::select(&table, Reference::DaysSinceStart, 1).unwrap();
    let visibility = CohortVisibility {
        intervention: true,
        control: true,
    };
    let outcome = charts::draw_aggregate(
        &rows,
        "hr",
        Reference::DaysSinceStart,
        Statistic::Median,
        visibility,
    );
    let chart = outcome.chart().expect("chart");

    assert_eq!(chart.series.len(), 2);
    assert_eq!(
        chart.series[0].points,
        vec![(XValue::Offset(0), 70.0), (XValue::Offset(1), 72.0)]
    );
    assert_eq!(chart.series[1].points, vec![(XValue::Offset(0), 65.0)]);

    let spec = chart.to_vega_lite();
    assert_eq!(spec["encoding"]["x"]["field"], "days_since_start");
}

#[test]
fn test_missing_vitals_file_is_reported() {
    let tmp = TempDir::new().expect("tempdir");
    let (_, users) = fixture(&tmp);
    let err = loader::load(&tmp.path().join("absent.csv"), &users, "Tabelle1").unwrap_err();
    assert!(matches!(err, ExplorerError::FileRead { .. }));
}
