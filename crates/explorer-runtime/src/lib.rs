//! Runtime layer for the WATCH data explorer.
//!
//! Caches the loaded study table and turns dashboard selections into
//! rendered chart descriptions.

pub mod controller;
pub mod data_manager;

pub use explorer_core as core;
pub use explorer_data as data;
