mod bootstrap;
mod export;

use std::sync::Arc;

use anyhow::Result;
use explorer_core::config::ExplorerConfig;
use explorer_core::settings::{LastUsedParams, Settings};
use explorer_data::loader::Loader;
use explorer_runtime::controller::{compute_view, DashboardOptions};
use explorer_runtime::data_manager::DataManager;
use explorer_ui::app::{App, SourceLabels};

#[tokio::main]
async fn main() -> Result<()> {
    let (settings, last_used) = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("WATCH data explorer v{} starting", env!("CARGO_PKG_VERSION"));

    let config = ExplorerConfig::load_from(&settings.config_path())?;
    let source = settings.data_source(&config)?;
    tracing::info!(
        vitals = %source.vitals_path.display(),
        users = %source.users_path.display(),
        sheet = %source.sheet,
        "Loading study data"
    );

    // Parsing runs on a blocking thread; the manager travels with it.
    let loader = Loader::new(settings.effective_cohort_column(&config))?;
    let manager = DataManager::new(loader);
    let load_source = source.clone();
    let (_manager, loaded) = tokio::task::spawn_blocking(move || {
        let mut manager = manager;
        let loaded = manager.get_or_load(&load_source);
        (manager, loaded)
    })
    .await?;
    let table = loaded?;

    let options = DashboardOptions::from_table(&table, settings.effective_type_index(&config));
    let mut filters = options.initial_filters();
    filters.apply_last_used(&last_used, &options);
    filters.set_min_points(settings.effective_min_points(&config));

    tracing::info!(
        rows = table.len(),
        types = options.measurement_types.len(),
        customers = options.customers.len(),
        "Dashboard ready"
    );

    if let Some(dir) = &settings.export {
        let view = compute_view(&table, &filters);
        let written = export::write_charts(dir, &view)?;
        for path in written {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let app = App::new(
        &settings.theme,
        Arc::clone(&table),
        options,
        filters,
        SourceLabels::from_source(&source),
    );

    // The TUI handles q / Esc / Ctrl+C itself; the signal covers the window
    // before raw mode is enabled.
    tokio::select! {
        result = app.run() => {
            let filters = result?;
            let remembered = filters.to_last_used(Some(settings.theme.clone()));
            if let Err(e) = remembered.save_to(&LastUsedParams::config_path()) {
                tracing::warn!(error = %e, "could not save last-used selections");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received; shutting down");
        }
    }

    Ok(())
}
