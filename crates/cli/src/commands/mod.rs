//! Subcommand implementations

pub mod alerts;
pub mod devices;
pub mod ingest;
pub mod simulation;
pub mod status;
