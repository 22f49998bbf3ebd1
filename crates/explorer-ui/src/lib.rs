//! Terminal UI layer for the WATCH data explorer.
//!
//! Provides themes, the header and controls components, the trend chart
//! panes and the application event loop built on top of [`ratatui`].

pub mod app;
pub mod chart_view;
pub mod components;
pub mod themes;

pub use explorer_core as core;
