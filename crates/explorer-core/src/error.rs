use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the WATCH data explorer.
#[derive(Error, Debug)]
pub enum ExplorerError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A measurement CSV could not be parsed.
    #[error("Failed to parse CSV {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A spreadsheet could not be opened or one of its sheets read.
    #[error("Failed to read spreadsheet {path}: {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// The requested sheet does not exist in the workbook.
    #[error("Sheet '{sheet}' not found in {path} (available: {available})")]
    SheetNotFound {
        path: PathBuf,
        sheet: String,
        available: String,
    },

    /// A required column is absent from a table header.
    #[error("Missing column '{column}' in {path}")]
    MissingColumn { path: PathBuf, column: String },

    /// A cell in a required column could not be interpreted.
    #[error("Invalid value in column '{column}' at row {row}: {value}")]
    InvalidCell {
        column: String,
        row: usize,
        value: String,
    },

    /// An aggregation was requested without any grouping key.
    #[error("Aggregation requires at least one grouping key")]
    EmptyGroupKeys,

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the explorer crates.
pub type Result<T> = std::result::Result<T, ExplorerError>;
