//! Signals - normalized observations from external source platforms
//!
//! A signal is produced once by a collector and consumed once by the
//! validator. Signals do not persist across detection cycles; the only
//! cross-cycle state in the engine is per-source credibility.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

use crate::{CLOCK_SKEW_TOLERANCE_SECS, MAX_CREDIBILITY_WEIGHT, MIN_CREDIBILITY_WEIGHT};

/// Errors from signal construction
#[derive(Debug, Error)]
pub enum SignalError {
    /// Timestamp is ahead of the engine clock beyond the skew tolerance
    #[error("timestamp {timestamp} is {ahead_secs}s in the future")]
    FutureTimestamp {
        timestamp: DateTime<Utc>,
        ahead_secs: i64,
    },

    /// Engagement score must be non-negative
    #[error("negative engagement score: {0}")]
    NegativeEngagement(f64),
}

/// Versioned extension map for source-specific metadata
///
/// Consumers can rely on the core `Signal` fields; anything platform-specific
/// (subreddit, star count, upvote ratio, ...) rides here. The version lets
/// collectors evolve their extras without breaking downstream readers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalExtensions {
    /// Extension schema version (collector-defined)
    pub schema_version: u32,
    /// Open key/value extras; BTreeMap keeps serialization deterministic
    pub map: BTreeMap<String, serde_json::Value>,
}

impl SignalExtensions {
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// A single normalized observation from a source platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Unique signal instance ID
    pub id: Uuid,

    /// Content-based fingerprint for dedup and validation caching
    pub fingerprint: String,

    /// Identifier of the specific source (account, feed, repository, ...)
    pub source_id: String,

    /// Platform the source belongs to (reddit, hackernews, github, ...)
    pub platform: String,

    /// Raw textual content
    pub content: String,

    /// Observation timestamp
    pub timestamp: DateTime<Utc>,

    /// Engagement score (upvotes, stars, reactions; always >= 0)
    pub engagement_score: f64,

    /// Sentiment score, normalized to [-1, 1]
    pub sentiment_score: f64,

    /// Keywords attached by the collector
    pub keywords: Vec<String>,

    /// Origin URL, if any
    pub url: Option<String>,

    /// Versioned source-specific extras
    #[serde(default, skip_serializing_if = "SignalExtensions::is_empty")]
    pub extensions: SignalExtensions,

    /// Per-source trust multiplier, clamped to [0.1, 2.0]
    pub credibility_weight: f64,
}

impl Signal {
    /// Create a new signal builder
    pub fn builder(platform: &str, source_id: &str) -> SignalBuilder {
        SignalBuilder::new(platform, source_id)
    }

    /// Age of the signal relative to `now`, in fractional hours
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.timestamp).num_milliseconds() as f64 / 3_600_000.0
    }

    /// Keywords as a lowercase set, for overlap computations
    pub fn keyword_set(&self) -> HashSet<String> {
        self.keywords.iter().map(|k| k.to_lowercase()).collect()
    }

    fn compute_fingerprint(platform: &str, source_id: &str, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(platform.as_bytes());
        hasher.update(source_id.as_bytes());
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())[..16].to_string()
    }
}

/// Builder for signals
pub struct SignalBuilder {
    platform: String,
    source_id: String,
    content: String,
    timestamp: DateTime<Utc>,
    engagement_score: f64,
    sentiment_score: f64,
    keywords: Vec<String>,
    url: Option<String>,
    extensions: SignalExtensions,
    credibility_weight: f64,
}

impl SignalBuilder {
    pub fn new(platform: &str, source_id: &str) -> Self {
        Self {
            platform: platform.to_string(),
            source_id: source_id.to_string(),
            content: String::new(),
            timestamp: Utc::now(),
            engagement_score: 0.0,
            sentiment_score: 0.0,
            keywords: Vec::new(),
            url: None,
            extensions: SignalExtensions::default(),
            credibility_weight: 1.0,
        }
    }

    pub fn content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = ts;
        self
    }

    pub fn engagement(mut self, score: f64) -> Self {
        self.engagement_score = score;
        self
    }

    pub fn sentiment(mut self, score: f64) -> Self {
        self.sentiment_score = score.clamp(-1.0, 1.0);
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn extension(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extensions.map.insert(key.to_string(), value);
        self
    }

    pub fn extension_version(mut self, version: u32) -> Self {
        self.extensions.schema_version = version;
        self
    }

    pub fn credibility_weight(mut self, weight: f64) -> Self {
        self.credibility_weight = weight.clamp(MIN_CREDIBILITY_WEIGHT, MAX_CREDIBILITY_WEIGHT);
        self
    }

    /// Build the signal, enforcing invariants
    pub fn build(self) -> Result<Signal, SignalError> {
        if self.engagement_score < 0.0 {
            return Err(SignalError::NegativeEngagement(self.engagement_score));
        }

        let ahead = (self.timestamp - Utc::now()).num_seconds();
        if ahead > CLOCK_SKEW_TOLERANCE_SECS {
            return Err(SignalError::FutureTimestamp {
                timestamp: self.timestamp,
                ahead_secs: ahead,
            });
        }

        let fingerprint =
            Signal::compute_fingerprint(&self.platform, &self.source_id, &self.content);

        Ok(Signal {
            id: Uuid::new_v4(),
            fingerprint,
            source_id: self.source_id,
            platform: self.platform,
            content: self.content,
            timestamp: self.timestamp,
            engagement_score: self.engagement_score,
            sentiment_score: self.sentiment_score,
            keywords: self.keywords,
            url: self.url,
            extensions: self.extensions,
            credibility_weight: self.credibility_weight,
        })
    }
}

/// Convenience for tests and sample data: a signal observed `hours_ago` hours ago
pub fn signal_at_age(
    platform: &str,
    source_id: &str,
    content: &str,
    hours_ago: f64,
) -> Result<Signal, SignalError> {
    Signal::builder(platform, source_id)
        .content(content)
        .timestamp(Utc::now() - Duration::milliseconds((hours_ago * 3_600_000.0) as i64))
        .build()
}
