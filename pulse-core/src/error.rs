//! Engine error taxonomy
//!
//! Every failure inside a detection cycle maps onto one of these variants.
//! None of them escape the cycle as an unhandled error: sources and analytic
//! stages degrade, validation falls back, and the final result carries the
//! failure as structured data.

use thiserror::Error;

/// Errors raised by the fusion engine and its collaborators
#[derive(Debug, Error)]
pub enum EngineError {
    /// A collector exceeded its timeout budget
    #[error("source '{collector}' timed out after {budget_ms}ms")]
    SourceTimeout { collector: String, budget_ms: u64 },

    /// A collector failed outright
    #[error("source '{collector}' failed: {reason}")]
    SourceError { collector: String, reason: String },

    /// A single signal could not be validated
    #[error("validation failed for signal {signal_id}: {reason}")]
    ValidationFailure { signal_id: String, reason: String },

    /// An analytic stage exceeded its timeout budget
    #[error("analytic stage '{stage}' timed out after {budget_ms}ms")]
    AnalyticTimeout { stage: String, budget_ms: u64 },

    /// An analytic stage failed
    #[error("analytic stage '{stage}' failed: {reason}")]
    AnalyticError { stage: String, reason: String },

    /// Not enough data to produce a meaningful result
    #[error("insufficient data: {0}")]
    InsufficientData(String),
}

impl EngineError {
    /// Stage name for analytic errors, source name for source errors
    pub fn origin(&self) -> &str {
        match self {
            EngineError::SourceTimeout { collector, .. } => collector,
            EngineError::SourceError { collector, .. } => collector,
            EngineError::ValidationFailure { signal_id, .. } => signal_id,
            EngineError::AnalyticTimeout { stage, .. } => stage,
            EngineError::AnalyticError { stage, .. } => stage,
            EngineError::InsufficientData(_) => "cycle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::SourceTimeout {
            collector: "reddit".to_string(),
            budget_ms: 5000,
        };
        assert!(err.to_string().contains("reddit"));
        assert!(err.to_string().contains("5000"));
        assert_eq!(err.origin(), "reddit");
    }

    #[test]
    fn test_source_errors_carry_no_cause_chain() {
        use std::error::Error as _;
        let err = EngineError::SourceError {
            collector: "broken".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.source().is_none());
        assert_eq!(err.origin(), "broken");
    }
}
