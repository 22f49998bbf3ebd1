use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{DataSource, ExplorerConfig, MIN_POINTS_RANGE};
use crate::error::{ExplorerError, Result};
use crate::models::Reference;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Explore WATCH study vital signs by cohort
#[derive(Parser, Debug, Clone)]
#[command(
    name = "watch-explorer",
    about = "Explore WATCH study vital signs by cohort",
    version
)]
pub struct Settings {
    /// Configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Vital-sign measurements CSV (overrides the config file)
    #[arg(long)]
    pub vitals: Option<PathBuf>,

    /// Participant metadata spreadsheet (overrides the config file)
    #[arg(long)]
    pub users: Option<PathBuf>,

    /// Sheet name inside the participant spreadsheet
    #[arg(long)]
    pub sheet: Option<String>,

    /// Regular expression locating the cohort-flag column
    #[arg(long)]
    pub cohort_column: Option<String>,

    /// Index of the measurement type selected on start-up
    #[arg(long)]
    pub vital_index: Option<usize>,

    /// Minimum daily data points per group (1-20)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub min_points: Option<u32>,

    /// Use the enrollment date as time reference
    #[arg(long)]
    pub start_reference: bool,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Write Vega-Lite chart documents to this directory instead of opening the dashboard
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved dashboard selections
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Dashboard selections persisted to `~/.watch-explorer/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_intervention: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_control: Option<bool>,
}

impl LastUsedParams {
    /// Return the default path to the persisted selections.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".watch-explorer").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and merge with last-used selections where no
    /// explicit CLI value was provided.
    ///
    /// Returns the settings together with the remembered selections so the
    /// dashboard can restore them.
    pub fn load_with_last_used() -> (Self, LastUsedParams) {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit path so that tests
    /// can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        last_used_path: &std::path::Path,
    ) -> (Self, LastUsedParams) {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        if settings.clear {
            let _ = LastUsedParams::clear_at(last_used_path);
            return (settings, LastUsedParams::default());
        }

        let mut last = LastUsedParams::load_from(last_used_path);

        // CLI always wins; explicit flags also replace the remembered value.
        if is_arg_explicitly_set(&matches, "theme") {
            last.theme = Some(settings.theme.clone());
        } else if let Some(theme) = &last.theme {
            settings.theme = theme.clone();
        }
        match settings.min_points {
            Some(v) => last.min_points = Some(v),
            None => settings.min_points = last.min_points,
        }
        if settings.start_reference {
            last.reference = Some(Reference::DaysSinceStart);
        }

        (settings, last)
    }

    /// Resolve the loader arguments: CLI flags first, then the config file.
    pub fn data_source(&self, config: &ExplorerConfig) -> Result<DataSource> {
        let vitals_path = self
            .vitals
            .clone()
            .or_else(|| config.vitals_path())
            .ok_or_else(|| ExplorerError::Config("no vitals file configured".to_string()))?;
        let users_path = self
            .users
            .clone()
            .or_else(|| config.users_path())
            .ok_or_else(|| ExplorerError::Config("no participant file configured".to_string()))?;
        let sheet = self
            .sheet
            .clone()
            .or_else(|| config.sheet().map(str::to_string))
            .ok_or_else(|| ExplorerError::Config("no participant sheet configured".to_string()))?;

        Ok(DataSource {
            vitals_path,
            users_path,
            sheet,
        })
    }

    /// Effective minimum points, clamped into the slider range.
    pub fn effective_min_points(&self, config: &ExplorerConfig) -> u32 {
        self.min_points
            .unwrap_or(config.dashboard.default_min_points)
            .clamp(MIN_POINTS_RANGE.0, MIN_POINTS_RANGE.1)
    }

    pub fn effective_type_index(&self, config: &ExplorerConfig) -> usize {
        self.vital_index
            .unwrap_or(config.dashboard.default_type_index)
    }

    pub fn effective_cohort_column<'a>(&'a self, config: &'a ExplorerConfig) -> &'a str {
        self.cohort_column
            .as_deref()
            .unwrap_or(&config.dashboard.cohort_column)
    }

    /// Config file to read: `--config`, or the default location.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(ExplorerConfig::default_path)
    }
}

// ── Helper: check if an arg was explicitly set on the command line ─────────────

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_last_used_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    // ── LastUsedParams ────────────────────────────────────────────────────────

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_last_used_path(&tmp);
        let params = LastUsedParams {
            theme: Some("dark".to_string()),
            measurement_type: Some("HeartRate".to_string()),
            min_points: Some(5),
            reference: Some(Reference::DaysSinceStart),
            show_intervention: Some(true),
            show_control: Some(true),
        };

        params.save_to(&path).expect("save");
        let loaded = LastUsedParams::load_from(&path);

        assert_eq!(loaded, params);
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_last_used_path(&tmp);

        LastUsedParams {
            theme: Some("light".to_string()),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");
        assert!(path.exists(), "file must exist after save");

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists(), "file must be gone after clear");
    }

    #[test]
    fn test_last_used_params_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded = LastUsedParams::load_from(&tmp_last_used_path(&tmp));
        assert_eq!(loaded, LastUsedParams::default());
    }

    #[test]
    fn test_last_used_params_default_when_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_last_used_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "garbage").unwrap();
        assert_eq!(LastUsedParams::load_from(&path), LastUsedParams::default());
    }

    // ── CLI parsing ───────────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["watch-explorer"]);

        assert!(settings.config.is_none());
        assert!(settings.vitals.is_none());
        assert!(settings.users.is_none());
        assert!(settings.sheet.is_none());
        assert!(settings.min_points.is_none());
        assert!(!settings.start_reference);
        assert_eq!(settings.theme, "auto");
        assert!(settings.export.is_none());
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
        assert!(!settings.clear);
    }

    #[test]
    fn test_settings_min_points_out_of_range_rejected() {
        let result = Settings::try_parse_from(["watch-explorer", "--min-points", "25"]);
        assert!(result.is_err());
        let result = Settings::try_parse_from(["watch-explorer", "--min-points", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_paths() {
        let settings = Settings::parse_from([
            "watch-explorer",
            "--vitals",
            "v.csv",
            "--users",
            "u.xlsx",
            "--sheet",
            "S1",
        ]);
        let source = settings.data_source(&ExplorerConfig::default()).unwrap();
        assert_eq!(source.vitals_path, PathBuf::from("v.csv"));
        assert_eq!(source.users_path, PathBuf::from("u.xlsx"));
        assert_eq!(source.sheet, "S1");
    }

    // ── data_source resolution ────────────────────────────────────────────────

    #[test]
    fn test_data_source_falls_back_to_config() {
        let mut config = ExplorerConfig::default();
        config.data.raw = Some(PathBuf::from("raw"));
        config.data.files.vitals = Some(PathBuf::from("vitals.csv"));
        config.data.files.users.file = Some(PathBuf::from("users.xlsx"));
        config.data.files.users.sheet = Some("Probanden".to_string());

        let settings = Settings::parse_from(["watch-explorer", "--sheet", "Other"]);
        let source = settings.data_source(&config).unwrap();
        assert_eq!(source.vitals_path, PathBuf::from("raw").join("vitals.csv"));
        assert_eq!(source.users_path, PathBuf::from("users.xlsx"));
        assert_eq!(source.sheet, "Other");
    }

    #[test]
    fn test_data_source_missing_is_config_error() {
        let settings = Settings::parse_from(["watch-explorer"]);
        let err = settings.data_source(&ExplorerConfig::default()).unwrap_err();
        assert!(matches!(err, ExplorerError::Config(_)));
    }

    #[test]
    fn test_effective_defaults_from_config() {
        let settings = Settings::parse_from(["watch-explorer"]);
        let mut config = ExplorerConfig::default();
        config.dashboard.default_min_points = 50;
        config.dashboard.default_type_index = 2;
        assert_eq!(settings.effective_min_points(&config), 20);
        assert_eq!(settings.effective_type_index(&config), 2);
        assert_eq!(
            settings.effective_cohort_column(&config),
            crate::config::DEFAULT_COHORT_COLUMN
        );
    }

    // ── load_with_last_used ───────────────────────────────────────────────────

    #[test]
    fn test_load_with_last_used_merges_persisted_values() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_last_used_path(&tmp);
        LastUsedParams {
            theme: Some("dark".to_string()),
            min_points: Some(4),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");

        let (settings, last) =
            Settings::load_with_last_used_impl(vec!["watch-explorer".into()], &path);
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.min_points, Some(4));
        assert_eq!(last.min_points, Some(4));
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_last_used_path(&tmp);
        LastUsedParams {
            theme: Some("dark".to_string()),
            min_points: Some(4),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");

        let (settings, last) = Settings::load_with_last_used_impl(
            vec![
                "watch-explorer".into(),
                "--theme".into(),
                "light".into(),
                "--min-points".into(),
                "12".into(),
            ],
            &path,
        );
        assert_eq!(settings.theme, "light");
        assert_eq!(settings.min_points, Some(12));
        assert_eq!(last.theme, Some("light".to_string()));
        assert_eq!(last.min_points, Some(12));
    }

    #[test]
    fn test_load_with_last_used_start_reference_flag() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_last_used_path(&tmp);
        let (_, last) = Settings::load_with_last_used_impl(
            vec!["watch-explorer".into(), "--start-reference".into()],
            &path,
        );
        assert_eq!(last.reference, Some(Reference::DaysSinceStart));
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_last_used_path(&tmp);
        LastUsedParams {
            theme: Some("classic".to_string()),
            ..Default::default()
        }
        .save_to(&path)
        .expect("save");

        let (settings, last) = Settings::load_with_last_used_impl(
            vec!["watch-explorer".into(), "--clear".into()],
            &path,
        );

        assert!(!path.exists(), "file must be gone after --clear");
        assert_eq!(settings.theme, "auto");
        assert_eq!(last, LastUsedParams::default());
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_last_used_path(&tmp);
        let (settings, _) = Settings::load_with_last_used_impl(
            vec!["watch-explorer".into(), "--debug".into()],
            &path,
        );
        assert_eq!(settings.log_level, "DEBUG");
    }
}
