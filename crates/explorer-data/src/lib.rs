//! Data layer for the WATCH data explorer.
//!
//! Reads the vitals CSV and the participant sheet, joins them, aggregates
//! the joined table and builds declarative trend charts.

pub mod aggregator;
pub mod charts;
pub mod loader;
pub mod selector;

pub use explorer_core as core;
