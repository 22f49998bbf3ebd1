//! Structured configuration file for the explorer.
//!
//! The file mirrors the study's data layout: a `raw` directory holding the
//! vital-sign export and an `external` directory holding the participant
//! spreadsheet.
//!
//! ```json
//! {
//!   "data": {
//!     "raw": "data/raw",
//!     "external": "data/external",
//!     "files": {
//!       "vitals": "vitals.csv",
//!       "users": { "file": "participants.xlsx", "sheet": "Probanden" }
//!     }
//!   },
//!   "dashboard": { "default_type_index": 24, "default_min_points": 10 }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};

/// Default pattern locating the cohort-flag column in the participant sheet.
pub const DEFAULT_COHORT_COLUMN: &str = r"(?i)^\s*gruppe";

pub const DEFAULT_TYPE_INDEX: usize = 24;
pub const DEFAULT_MIN_POINTS: u32 = 10;
pub const MIN_POINTS_RANGE: (u32, u32) = (1, 20);

// ── File sections ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub data: DataSection,
    pub dashboard: DashboardSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Directory containing the vital-sign export.
    pub raw: Option<PathBuf>,
    /// Directory containing the participant spreadsheet.
    pub external: Option<PathBuf>,
    pub files: FilesSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesSection {
    pub vitals: Option<PathBuf>,
    pub users: UsersFile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersFile {
    pub file: Option<PathBuf>,
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSection {
    /// Index into the measurement-type list selected on start-up.
    pub default_type_index: usize,
    pub default_min_points: u32,
    /// Regular expression matched against the participant sheet headers.
    pub cohort_column: String,
}

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            default_type_index: DEFAULT_TYPE_INDEX,
            default_min_points: DEFAULT_MIN_POINTS,
            cohort_column: DEFAULT_COHORT_COLUMN.to_string(),
        }
    }
}

// ── DataSource ────────────────────────────────────────────────────────────────

/// The three loader arguments. Also the key of the load cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataSource {
    pub vitals_path: PathBuf,
    pub users_path: PathBuf,
    pub sheet: String,
}

// ── ExplorerConfig impl ───────────────────────────────────────────────────────

impl ExplorerConfig {
    /// Default config location: `~/.watch-explorer/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".watch-explorer")
            .join("config.json")
    }

    /// Load the config at `path`.
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// parsed is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ExplorerError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// `raw / files.vitals`, or `files.vitals` alone when no `raw` directory
    /// is configured.
    pub fn vitals_path(&self) -> Option<PathBuf> {
        let file = self.data.files.vitals.as_ref()?;
        Some(join_opt(self.data.raw.as_deref(), file))
    }

    /// `external / files.users.file`, or the file alone.
    pub fn users_path(&self) -> Option<PathBuf> {
        let file = self.data.files.users.file.as_ref()?;
        Some(join_opt(self.data.external.as_deref(), file))
    }

    pub fn sheet(&self) -> Option<&str> {
        self.data.files.users.sheet.as_deref()
    }
}

fn join_opt(dir: Option<&Path>, file: &Path) -> PathBuf {
    match dir {
        Some(d) => d.join(file),
        None => file.to_path_buf(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
