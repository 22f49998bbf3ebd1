//! Domain model and shared infrastructure for the WATCH data explorer.
//!
//! Holds the study record types, descriptive statistics, declarative chart
//! descriptions, configuration and settings, formatting helpers and the
//! common error type.

pub mod chart;
pub mod config;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod stats;
