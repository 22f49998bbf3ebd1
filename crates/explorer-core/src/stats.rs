//! Descriptive statistics for grouped measurement values.

use serde::Serialize;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Compute the `p`-th percentile of a **sorted** slice using linear
/// interpolation between closest ranks.
///
/// Returns `None` for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> Option<f64> {
    let len = sorted_data.len();
    if len == 0 {
        return None;
    }
    if len == 1 {
        return Some(sorted_data[0]);
    }
    let rank = (p / 100.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted_data[lo]);
    }
    let frac = rank - lo as f64;
    Some(sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo]))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (`n - 1` denominator).
///
/// Undefined for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() as f64 - 1.0)).sqrt())
}

// ── GroupStats ────────────────────────────────────────────────────────────────

/// Summary of one group's values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` for singleton groups.
    pub std: Option<f64>,
    pub count: usize,
    /// Standard error of the mean, `std / sqrt(count)`.
    pub err: Option<f64>,
}

impl GroupStats {
    /// Summarise `values`. Returns `None` when there are no values, so a
    /// group that does not exist never gets statistics.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mean = mean(values)?;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = percentile(&sorted, 50.0)?;

        let count = values.len();
        let std = sample_std(values);
        let err = std.map(|s| s / (count as f64).sqrt());

        Some(Self {
            mean,
            median,
            std,
            count,
            err,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
