//! Operating envelopes and threshold evaluation
//!
//! Severity is a deterministic function of how far a metric lies outside
//! the fixed envelope of its device class:
//! - `ThresholdTable` holds the per-class envelopes
//! - `ThresholdEvaluator` grades violations into alerts

mod evaluator;
mod table;


pub use evaluator::{breach, Breach, SeverityPolicy, ThresholdEvaluator};
pub use table::{Envelope, OperatingRange, ThresholdTable};
