//! Candidate retrieval: provider call, quality filtering, authority baseline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::{debug, instrument, warn};

use crate::authority::AuthorityScorer;
use crate::config::SearchConfig;
use crate::error::PipelineError;
use crate::model::VideoCandidate;
use crate::pool::OutboundPool;
use crate::quality::QualityFilter;

const QUERY_TRIM_CHARS: &[char] = &['\'', '"', '\\'];
const DESCRIPTION_MAX_CHARS: usize = 500;
const OVERFETCH_FACTOR: usize = 2;

/// Media item as reported by a search provider, before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCandidate {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Seconds; some providers report fractional durations.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
}

/// Providers report unextractable fields as explicit `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawCandidate {
    /// Uploader name, falling back to the channel name.
    pub fn uploader(&self) -> Option<&str> {
        non_empty(self.uploader.as_deref()).or_else(|| non_empty(self.channel.as_deref()))
    }

    /// Canonical page link, preferring `webpage_url`.
    pub fn link(&self) -> String {
        non_empty(self.webpage_url.as_deref())
            .or_else(|| non_empty(self.url.as_deref()))
            .unwrap_or_default()
            .to_string()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// External search provider contract.
///
/// Implementations report every failure as [`PipelineError::SearchUnavailable`].
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawCandidate>, PipelineError>;
}

/// Strip surrounding whitespace and quoting characters from a query.
pub fn normalize_query(query: &str) -> String {
    query
        .trim_matches(|c: char| c.is_whitespace() || QUERY_TRIM_CHARS.contains(&c))
        .to_string()
}

/// Retry schedule for provider calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }
}

impl RetryPolicy {
    /// Doubled delay, capped at `max_backoff_ms`.
    pub fn next_backoff(&self, current_ms: u64) -> u64 {
        current_ms.saturating_mul(2).min(self.max_backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for RetryPolicy {
    fn from(config: &SearchConfig) -> Self {
        Self {
            retries: config.retries,
            initial_backoff_ms: config.initial_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        }
    }
}

/// Provider call plus quality filter and authority baseline.
#[derive(Clone)]
pub struct CandidateSearch {
    provider: Arc<dyn SearchProvider>,
    pool: OutboundPool,
    retry: RetryPolicy,
    filter: QualityFilter,
    authority: AuthorityScorer,
}

impl CandidateSearch {
    pub fn new(provider: Arc<dyn SearchProvider>, pool: OutboundPool) -> Self {
        Self {
            provider,
            pool,
            retry: RetryPolicy::default(),
            filter: QualityFilter,
            authority: AuthorityScorer,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Return up to `limit` quality-passing candidates in provider order.
    ///
    /// Requests `2 × limit` raw entries so that filtered titles leave headroom.
    #[instrument(name = "search.candidates", skip(self))]
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<VideoCandidate>, PipelineError> {
        let query = normalize_query(query);
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let raw = self.fetch(&query, limit * OVERFETCH_FACTOR).await?;
        let raw_count = raw.len();

        let mut candidates = Vec::with_capacity(limit);
        for entry in raw {
            if let Err(rejection) = self.filter.check(&entry.title) {
                debug!(title = %entry.title, %rejection, "rejected low-quality title");
                continue;
            }
            candidates.push(self.to_candidate(entry));
            if candidates.len() >= limit {
                break;
            }
        }

        debug!(
            raw_count,
            retained = candidates.len(),
            "search candidates filtered"
        );
        Ok(candidates)
    }

    async fn fetch(&self, query: &str, raw_limit: usize) -> Result<Vec<RawCandidate>, PipelineError> {
        let mut attempt = 0;
        let mut backoff_ms = self.retry.initial_backoff_ms;

        loop {
            let result = {
                let _permit = self.pool.acquire().await?;
                self.provider.search(query, raw_limit).await
            };

            match result {
                Ok(entries) => return Ok(entries),
                Err(err) if attempt < self.retry.retries && err.is_retryable() => {
                    attempt += 1;
                    warn!(error = %err, attempt, backoff_ms, "search failed, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = self.retry.next_backoff(backoff_ms);
                }
                Err(PipelineError::SearchUnavailable(reason)) => {
                    return Err(PipelineError::SearchUnavailable(reason));
                }
                Err(other) => return Err(PipelineError::search(other.to_string())),
            }
        }
    }

    fn to_candidate(&self, entry: RawCandidate) -> VideoCandidate {
        let authority = self.authority.score(&entry);
        let url = entry.link();
        let channel_name = entry.uploader().map(str::to_string);
        let description = entry
            .description
            .map(|text| text.chars().take(DESCRIPTION_MAX_CHARS).collect::<String>());

        VideoCandidate {
            title: entry.title,
            url,
            thumbnail: entry.thumbnail,
            duration: entry
                .duration
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(|secs| secs.round() as u64),
            channel_name,
            view_count: entry.view_count,
            description,
            relevance_score: Some(authority),
        }
    }
}
