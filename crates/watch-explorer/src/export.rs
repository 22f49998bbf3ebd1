use std::path::{Path, PathBuf};

use explorer_runtime::controller::DashboardView;

pub const VALUE_CHART_FILE: &str = "value_chart.json";
pub const COUNT_CHART_FILE: &str = "count_chart.json";

/// Write both dashboard charts as Vega-Lite documents into `dir`.
///
/// Empty panes are written as empty, titled views so both files always
/// exist. Returns the written paths.
pub fn write_charts(dir: &Path, view: &DashboardView) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let value = view
        .value
        .to_vega_lite()
        .unwrap_or_else(|| view.value.base.to_vega_lite());
    let counts = view.counts.to_vega_lite();

    let mut written = Vec::with_capacity(2);
    for (name, doc) in [(VALUE_CHART_FILE, value), (COUNT_CHART_FILE, counts)] {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string_pretty(&doc)?)?;
        tracing::info!(path = %path.display(), "chart exported");
        written.push(path);
    }
    Ok(written)
}
