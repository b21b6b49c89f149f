//! TrendPulse Runtime
//!
//! Orchestrates one detection cycle end to end:
//! - fan out to collectors, each under its own timeout budget
//! - validate the combined batch
//! - run correlation, temporal and graph analytics concurrently over the
//!   read-only validated snapshot, each with an independent stage timeout
//! - join in the aggregator under a global cycle deadline
//!
//! No error escapes a cycle; every failure lands in `DegradationFlags` or
//! the `QualityReport` on the returned result.

pub mod collector;
pub mod engine;

pub use collector::{CollectorError, JsonBatchCollector, SignalCollector, StaticCollector};
pub use engine::{CycleResult, DetectionEngine, EngineConfig};
