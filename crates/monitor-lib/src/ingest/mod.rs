//! Reading ingestion
//!
//! The coordinator is the single path every reading takes, whether it comes
//! from the simulator or from the external ingest endpoint: persist, resolve
//! the device class, evaluate thresholds, persist alerts, broadcast.

mod coordinator;


pub use coordinator::{BatchReport, IngestFailure, IngestOutcome, IngestionCoordinator};
