//! TrendPulse probe layer
//!
//! Opportunistic URL validation for the quality validator:
//! - Static plausibility scoring (no network)
//! - Short-timeout existence probes (HEAD, GET fallback)
//! - Bounded-concurrency batch probing
//!
//! Probes are best-effort by contract: a failed or slow probe degrades the
//! authenticity sub-score of one signal, it never fails validation.

pub mod client;
pub mod url_check;

pub use client::*;
pub use url_check::*;
