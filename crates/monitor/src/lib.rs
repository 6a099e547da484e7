//! Energy monitor service
//!
//! Wires the monitoring pipeline from configuration and exposes it over HTTP.

pub mod api;
pub mod app;
pub mod config;

pub use app::AppState;
pub use config::MonitorConfig;
