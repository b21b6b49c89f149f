//! TrendPulse Engines
//!
//! The six analytic services behind a detection cycle:
//! - **Validator**: scores and gates incoming signals
//! - **Registry**: maintains per-source trust weights over time
//! - **Correlation**: cross-source keyword/temporal/sentiment correlation
//! - **Temporal**: seasonality, trend, cyclical, anomaly and emergence detection
//! - **Graph**: topological clustering, influence and cascade analysis
//! - **Aggregator**: merges analytic outputs into ranked opportunities
//!
//! All engines except the registry are stateless over a read-only
//! validated-signal snapshot and safe to run concurrently.

pub mod traits;
pub mod validator;
pub mod registry;
pub mod correlation;
pub mod temporal;
pub mod graph;
pub mod aggregator;

pub use traits::*;
pub use validator::*;
pub use registry::*;
pub use correlation::*;
pub use aggregator::*;

pub use graph::GraphTrendEngine;
pub use temporal::TemporalPatternEngine;
