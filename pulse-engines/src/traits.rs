//! External collaborator contracts
//!
//! The engine defines these interfaces; durable or remote implementations are
//! supplied by the caller. In-memory defaults keep the engine usable without
//! any external service.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

use pulse_core::{CredibilityScore, VerificationRecord};

/// Errors from external collaborators
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("store error: {0}")]
    Store(String),

    #[error("oracle error: {0}")]
    Oracle(String),

    #[error("collaborator timed out")]
    Timeout,
}

/// Score bundle from the semantic content-understanding oracle
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticScores {
    /// How relevant the content is in its business context, [0, 1]
    pub context_relevance: f64,
    /// Classified intent label (question, launch, complaint, ...)
    pub intent: String,
    /// Sentiment breakdown: (positive, neutral, negative), sums to ~1
    pub sentiment_breakdown: (f64, f64, f64),
    /// Named entities recognized in the content
    pub entities: Vec<String>,
    /// Innovation potential estimate, [0, 1]
    pub innovation_potential: f64,
}

impl SemanticScores {
    /// Neutral defaults used when the oracle is unavailable or slow
    pub fn neutral() -> Self {
        Self {
            context_relevance: 0.5,
            intent: "unknown".to_string(),
            sentiment_breakdown: (0.33, 0.34, 0.33),
            entities: Vec::new(),
            innovation_potential: 0.5,
        }
    }
}

/// Optional content-understanding oracle
///
/// Treated as enrichment: scores merge additively into relevance/correlation
/// scoring. Callers must substitute [`SemanticScores::neutral`] on failure
/// rather than blocking a cycle.
#[async_trait]
pub trait SemanticOracle: Send + Sync {
    async fn analyze(&self, content: &str) -> Result<SemanticScores, CollaboratorError>;
}

/// Oracle stub that always answers with neutral scores
pub struct NeutralOracle;

#[async_trait]
impl SemanticOracle for NeutralOracle {
    async fn analyze(&self, _content: &str) -> Result<SemanticScores, CollaboratorError> {
        Ok(SemanticScores::neutral())
    }
}

/// Delegated persistence for credibility history
#[async_trait]
pub trait CredibilityStore: Send + Sync {
    async fn get_score(&self, platform: &str) -> Result<Option<CredibilityScore>, CollaboratorError>;

    async fn put_score(&self, score: CredibilityScore) -> Result<(), CollaboratorError>;

    async fn append_verification(
        &self,
        record: VerificationRecord,
    ) -> Result<(), CollaboratorError>;
}

/// In-memory credibility store (tests, demos, single-process runs)
#[derive(Default)]
pub struct MemoryCredibilityStore {
    scores: DashMap<String, CredibilityScore>,
    verifications: DashMap<String, Vec<VerificationRecord>>,
}

impl MemoryCredibilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Verification records for a platform (test inspection)
    pub fn verification_count(&self, platform: &str) -> usize {
        self.verifications
            .get(platform)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CredibilityStore for MemoryCredibilityStore {
    async fn get_score(&self, platform: &str) -> Result<Option<CredibilityScore>, CollaboratorError> {
        Ok(self.scores.get(platform).map(|s| s.clone()))
    }

    async fn put_score(&self, score: CredibilityScore) -> Result<(), CollaboratorError> {
        self.scores.insert(score.platform.clone(), score);
        Ok(())
    }

    async fn append_verification(
        &self,
        record: VerificationRecord,
    ) -> Result<(), CollaboratorError> {
        self.verifications
            .entry(record.platform.clone())
            .or_default()
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::platform_prior;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryCredibilityStore::new();
        assert!(store.get_score("reddit").await.unwrap().is_none());

        store.put_score(platform_prior("reddit")).await.unwrap();
        let got = store.get_score("reddit").await.unwrap().unwrap();
        assert_eq!(got.platform, "reddit");
    }

    #[tokio::test]
    async fn test_neutral_oracle() {
        let oracle = NeutralOracle;
        let scores = oracle.analyze("anything").await.unwrap();
        assert_eq!(scores, SemanticScores::neutral());
    }
}
