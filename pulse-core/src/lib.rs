//! TrendPulse Core - Signal types and domain model for trend intelligence
//!
//! This crate provides the foundational primitives:
//! - Signals harvested from external source platforms
//! - Quality/validation metadata attached during fusion
//! - Per-source credibility scores
//! - Temporal pattern and trend graph types
//! - Ranked trend opportunities and cycle reports

pub mod signal;
pub mod quality;
pub mod credibility;
pub mod patterns;
pub mod graph;
pub mod opportunity;
pub mod report;
pub mod config;
pub mod error;

pub use signal::*;
pub use quality::*;
pub use credibility::*;
pub use patterns::*;
pub use graph::*;
pub use opportunity::*;
pub use report::*;
pub use config::*;
pub use error::*;

/// Minimum credibility weight multiplier
pub const MIN_CREDIBILITY_WEIGHT: f64 = 0.1;

/// Maximum credibility weight multiplier
pub const MAX_CREDIBILITY_WEIGHT: f64 = 2.0;

/// Default quality floor for signal verification
pub const DEFAULT_QUALITY_FLOOR: f64 = 0.6;

/// Tolerated clock skew for signal timestamps, in seconds
pub const CLOCK_SKEW_TOLERANCE_SECS: i64 = 300;
