//! Cached access to the loaded study table.
//!
//! Loading parses a CSV and a spreadsheet, so the joined table is kept per
//! [`DataSource`] and handed out as an [`Arc`]. Callers use
//! [`DataManager::get_or_load`]; identical arguments reuse the cached table,
//! a different source triggers a fresh load. Changes on disk are not
//! detected, call [`DataManager::invalidate`] to force a reload.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use explorer_core::config::DataSource;
use explorer_core::error::Result;
use explorer_core::models::JoinedTable;
use explorer_data::loader::Loader;

struct CacheEntry {
    table: Arc<JoinedTable>,
    loaded_at: Instant,
}

// ── DataManager ───────────────────────────────────────────────────────────────

/// Load cache keyed by `(vitals path, users path, sheet)`.
///
/// # Example
/// ```no_run
/// use explorer_runtime::data_manager::DataManager;
/// use explorer_core::config::DataSource;
///
/// let mut mgr = DataManager::default();
/// let source = DataSource {
///     vitals_path: "raw/vitals.csv".into(),
///     users_path: "external/users.xlsx".into(),
///     sheet: "Tabelle1".to_string(),
/// };
/// if let Ok(table) = mgr.get_or_load(&source) {
///     println!("joined rows: {}", table.len());
/// }
/// ```
#[derive(Default)]
pub struct DataManager {
    loader: Loader,
    cache: HashMap<DataSource, CacheEntry>,
    /// Human-readable description of the last load error.
    last_error: Option<String>,
}

impl DataManager {
    pub fn new(loader: Loader) -> Self {
        Self {
            loader,
            cache: HashMap::new(),
            last_error: None,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the joined table for `source`, loading it on a cache miss.
    ///
    /// Load errors are returned to the caller and nothing is cached.
    pub fn get_or_load(&mut self, source: &DataSource) -> Result<Arc<JoinedTable>> {
        if let Some(entry) = self.cache.get(source) {
            tracing::debug!(
                vitals = %source.vitals_path.display(),
                rows = entry.table.len(),
                "returning cached table"
            );
            return Ok(Arc::clone(&entry.table));
        }

        match self.loader.load_source(source) {
            Ok(table) => {
                let table = Arc::new(table);
                self.cache.insert(
                    source.clone(),
                    CacheEntry {
                        table: Arc::clone(&table),
                        loaded_at: Instant::now(),
                    },
                );
                self.last_error = None;
                Ok(table)
            }
            Err(e) => {
                tracing::warn!(error = %e, "loading study data failed");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Drop every cached table.
    pub fn invalidate(&mut self) {
        self.cache.clear();
        tracing::debug!("load cache invalidated");
    }

    /// Age of the cached table for `source`, or `None` when not loaded.
    pub fn cache_age(&self, source: &DataSource) -> Option<Duration> {
        self.cache.get(source).map(|e| e.loaded_at.elapsed())
    }

    pub fn cached_sources(&self) -> usize {
        self.cache.len()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
