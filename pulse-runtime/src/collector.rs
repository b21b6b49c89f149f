//! Collector contract and the built-in batch collectors
//!
//! The engine is agnostic to how signals were obtained; anything that can
//! deliver a batch under its timeout budget is a collector.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use pulse_core::Signal;

/// Errors a collector may surface; never fatal to the cycle
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("collector {name} failed: {reason}")]
    Failed { name: String, reason: String },

    #[error("could not read signal batch from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed signal batch in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// An inbound signal source
#[async_trait]
pub trait SignalCollector: Send + Sync {
    /// Stable name, used in logs and degradation accounting
    fn name(&self) -> &str;

    /// Produce one batch of signals
    async fn collect(&self) -> Result<Vec<Signal>, CollectorError>;
}

/// In-memory batch collector, for tests and pre-assembled data
pub struct StaticCollector {
    name: String,
    batch: Vec<Signal>,
}

impl StaticCollector {
    pub fn new(name: &str, batch: Vec<Signal>) -> Self {
        Self {
            name: name.to_string(),
            batch,
        }
    }
}

#[async_trait]
impl SignalCollector for StaticCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self) -> Result<Vec<Signal>, CollectorError> {
        Ok(self.batch.clone())
    }
}

/// Reads a JSON array of signals from a file on every collect
pub struct JsonBatchCollector {
    name: String,
    path: PathBuf,
}

impl JsonBatchCollector {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl SignalCollector for JsonBatchCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self) -> Result<Vec<Signal>, CollectorError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|source| CollectorError::Io {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_slice(&raw).map_err(|source| CollectorError::Malformed {
            path: self.path.clone(),
            source,
        })
    }
}
