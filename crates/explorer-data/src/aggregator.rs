//! Group-by aggregation of joined measurement values.

use std::collections::BTreeMap;

use explorer_core::error::{ExplorerError, Result};
use explorer_core::models::{AggregateRow, JoinedTable, KeyColumn, KeyValue};
use explorer_core::stats::GroupStats;
use tracing::debug;

/// Stateless helper that groups the joined table by arbitrary key columns.
pub struct Aggregator;

impl Aggregator {
    /// Group `table` by `by` and summarise each group's values.
    ///
    /// Groups with fewer than `min_data_points` values are dropped. Rows are
    /// returned sorted by key. An empty `by` is rejected.
    pub fn aggregate(
        table: &JoinedTable,
        by: &[KeyColumn],
        min_data_points: usize,
    ) -> Result<Vec<AggregateRow>> {
        if by.is_empty() {
            return Err(ExplorerError::EmptyGroupKeys);
        }

        // BTreeMap keeps the groups in natural key order.
        let mut groups: BTreeMap<Vec<KeyValue>, Vec<f64>> = BTreeMap::new();
        for row in table.rows() {
            let key: Vec<KeyValue> = by.iter().map(|col| col.value(row)).collect();
            groups.entry(key).or_default().push(row.value);
        }

        let total_groups = groups.len();
        let rows: Vec<AggregateRow> = groups
            .into_iter()
            .filter(|(_, values)| values.len() >= min_data_points)
            .filter_map(|(key, values)| {
                GroupStats::from_values(&values).map(|stats| AggregateRow { key, stats })
            })
            .collect();

        debug!(
            keys = ?by.iter().map(KeyColumn::name).collect::<Vec<_>>(),
            groups = total_groups,
            retained = rows.len(),
            min_data_points,
            "aggregated joined table"
        );
        Ok(rows)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
