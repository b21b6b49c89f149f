//! URL plausibility scoring and existence probes

use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::{create_probe_client, ProbeConfig};

/// Outcome of an existence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 2xx/3xx response
    Reachable,
    /// 4xx/5xx response
    Unreachable,
    /// Timeout, DNS failure, connection refused
    Failed,
    /// Probe skipped (disabled, or URL implausible)
    Skipped,
}

impl ProbeOutcome {
    /// Contribution to the authenticity sub-score
    pub fn score(&self) -> f64 {
        match self {
            ProbeOutcome::Reachable => 1.0,
            ProbeOutcome::Unreachable => 0.2,
            // Degrade, do not zero: a slow site is not a fake site
            ProbeOutcome::Failed => 0.5,
            ProbeOutcome::Skipped => 0.6,
        }
    }
}

fn url_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://[a-zA-Z0-9][a-zA-Z0-9.-]*\.[a-zA-Z]{2,}(/[^\s]*)?$").unwrap()
    })
}

const SHORTENER_HOSTS: &[&str] = &["bit.ly", "tinyurl.com", "t.co", "goo.gl", "ow.ly", "is.gd"];

const SPAM_TLDS: &[&str] = &[".xyz", ".top", ".click", ".loan", ".win", ".gq", ".tk"];

/// Hosts expected for each platform, for metadata consistency checks
const PLATFORM_HOSTS: &[(&str, &str)] = &[
    ("reddit", "reddit.com"),
    ("hackernews", "news.ycombinator.com"),
    ("producthunt", "producthunt.com"),
    ("github", "github.com"),
    ("twitter", "twitter.com"),
    ("linkedin", "linkedin.com"),
    ("youtube", "youtube.com"),
    ("tiktok", "tiktok.com"),
];

/// Static plausibility score for a URL, in [0, 1]
///
/// Checks shape, shortener hosts, spam TLDs and platform/host consistency.
/// No network access.
pub fn url_plausibility(url: &str, platform: &str) -> f64 {
    if !url_shape().is_match(url) {
        return 0.1;
    }

    let lower = url.to_lowercase();
    let mut score: f64 = 0.8;

    if SHORTENER_HOSTS.iter().any(|h| lower.contains(h)) {
        score -= 0.3;
    }

    if SPAM_TLDS.iter().any(|tld| {
        lower
            .split('/')
            .nth(2)
            .map(|host| host.ends_with(tld))
            .unwrap_or(false)
    }) {
        score -= 0.3;
    }

    if lower.starts_with("https://") {
        score += 0.1;
    }

    // A platform-native URL matching its expected host is a consistency win;
    // a mismatch is neutral (cross-posting is common).
    if let Some((_, host)) = PLATFORM_HOSTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(platform))
    {
        if lower.contains(host) {
            score += 0.1;
        }
    }

    score.clamp(0.0, 1.0)
}

/// Probe a single URL for existence
///
/// HEAD first; on 405 retries with GET. Errors map to [`ProbeOutcome::Failed`]
/// rather than propagating.
pub async fn probe_url(client: &Client, url: &str) -> ProbeOutcome {
    let head = client.head(url).send().await;

    let response = match head {
        Ok(resp) if resp.status() == reqwest::StatusCode::METHOD_NOT_ALLOWED => {
            match client.get(url).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    debug!("GET fallback for {} failed: {}", url, e);
                    return ProbeOutcome::Failed;
                }
            }
        }
        Ok(resp) => resp,
        Err(e) => {
            debug!("Probe for {} failed: {}", url, e);
            return ProbeOutcome::Failed;
        }
    };

    if response.status().is_success() || response.status().is_redirection() {
        ProbeOutcome::Reachable
    } else {
        ProbeOutcome::Unreachable
    }
}

/// Probe a batch of URLs with bounded concurrency
///
/// Returns outcomes keyed by URL. One slow probe cannot stall the batch:
/// each request carries the client's own short timeout and at most
/// `config.max_concurrent` probes are in flight.
pub async fn probe_batch(urls: &[String], config: &ProbeConfig) -> HashMap<String, ProbeOutcome> {
    if !config.enabled || urls.is_empty() {
        return urls
            .iter()
            .map(|u| (u.clone(), ProbeOutcome::Skipped))
            .collect();
    }

    let client = match create_probe_client(config) {
        Ok(client) => client,
        Err(e) => {
            warn!("Probe client unavailable, skipping probes: {}", e);
            return urls
                .iter()
                .map(|u| (u.clone(), ProbeOutcome::Skipped))
                .collect();
        }
    };

    stream::iter(urls.iter().cloned())
        .map(|url| {
            let client = client.clone();
            async move {
                let outcome = probe_url(&client, &url).await;
                (url, outcome)
            }
        })
        .buffer_unordered(config.max_concurrent)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plausible_url() {
        let score = url_plausibility("https://news.ycombinator.com/item?id=1", "hackernews");
        assert!(score > 0.8);
    }

    #[test]
    fn test_malformed_url() {
        assert!(url_plausibility("not a url", "reddit") < 0.2);
        assert!(url_plausibility("ftp://example.com/x", "reddit") < 0.2);
    }

    #[test]
    fn test_shortener_penalized() {
        let short = url_plausibility("https://bit.ly/abc", "twitter");
        let full = url_plausibility("https://example.com/post/abc", "twitter");
        assert!(short < full);
    }

    #[test]
    fn test_spam_tld_penalized() {
        let spam = url_plausibility("https://freestuff.xyz/deal", "reddit");
        let normal = url_plausibility("https://example.com/deal", "reddit");
        assert!(spam < normal);
    }

    #[test]
    fn test_probe_outcome_scores() {
        assert_eq!(ProbeOutcome::Reachable.score(), 1.0);
        assert!(ProbeOutcome::Failed.score() > ProbeOutcome::Unreachable.score());
    }

    #[tokio::test]
    async fn test_probe_batch_disabled() {
        let config = ProbeConfig {
            enabled: false,
            ..Default::default()
        };
        let urls = vec!["https://example.com/a".to_string()];
        let outcomes = probe_batch(&urls, &config).await;
        assert_eq!(outcomes["https://example.com/a"], ProbeOutcome::Skipped);
    }
}
