//! Per-argument unit of work: search, verify, accept, fall back, rank, truncate.

use std::cmp::Ordering;
use std::time::Instant;

use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::events::{EventPayload, RunEvents};
use crate::metrics::record_argument_task;
use crate::model::{CounterArgument, Verdict, VerificationVerdict, VideoCandidate};
use crate::search::CandidateSearch;
use crate::verifier::RelevanceVerifier;

/// Terminal state of one argument task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArgumentOutcome {
    /// At least one candidate passed the acceptance policy.
    Verified { accepted: usize },
    /// Nothing passed; the top provider result was kept at the neutral score.
    Fallback,
    /// Search succeeded but returned no quality candidates.
    NoCandidates,
    /// Empty or malformed query; no I/O was attempted.
    Skipped,
    Failed { reason: String },
    /// The pipeline deadline elapsed before the task finished.
    TimedOut,
}

impl ArgumentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentOutcome::Verified { .. } => "verified",
            ArgumentOutcome::Fallback => "fallback",
            ArgumentOutcome::NoCandidates => "no_candidates",
            ArgumentOutcome::Skipped => "skipped",
            ArgumentOutcome::Failed { .. } => "failed",
            ArgumentOutcome::TimedOut => "timed_out",
        }
    }
}

/// Acceptance, fallback, ranking and truncation rules.
#[derive(Debug, Clone)]
pub struct AcceptancePolicy {
    pub threshold: f32,
    pub max_suggestions: usize,
    pub fallback_score: f32,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for AcceptancePolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            threshold: config.acceptance_threshold,
            max_suggestions: config.max_suggestions,
            fallback_score: config.fallback_score,
        }
    }
}

/// Result of applying the policy to one argument's verified candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub suggestions: Vec<VideoCandidate>,
    pub accepted: usize,
    pub fallback: bool,
}

impl AcceptancePolicy {
    /// `accept` verdicts pass when they clear the threshold. Neutral verdicts
    /// from a degraded scorer pass regardless of their score.
    pub fn accepts(&self, verdict: &VerificationVerdict) -> bool {
        verdict.verdict == Verdict::Accept && (verdict.degraded || verdict.score >= self.threshold)
    }

    /// `verified` must be in provider order.
    pub fn select(&self, verified: Vec<(VideoCandidate, VerificationVerdict)>) -> Selection {
        let first_raw = verified.first().map(|(candidate, _)| candidate.clone());

        let mut accepted: Vec<VideoCandidate> = verified
            .into_iter()
            .filter(|(_, verdict)| self.accepts(verdict))
            .map(|(mut candidate, verdict)| {
                candidate.relevance_score = Some(verdict.score);
                candidate
            })
            .collect();
        let accepted_count = accepted.len();

        let mut fallback = false;
        if accepted.is_empty() {
            if let Some(mut top) = first_raw {
                top.relevance_score = Some(self.fallback_score);
                accepted.push(top);
                fallback = true;
            }
        }

        // Stable: equal scores keep provider order.
        accepted.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal));
        accepted.truncate(self.max_suggestions);

        Selection {
            suggestions: accepted,
            accepted: accepted_count,
            fallback,
        }
    }
}

/// What a finished task hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub suggestions: Vec<VideoCandidate>,
    pub outcome: ArgumentOutcome,
}

impl TaskReport {
    fn empty(outcome: ArgumentOutcome) -> Self {
        Self {
            suggestions: Vec::new(),
            outcome,
        }
    }
}

pub struct ArgumentVerificationTask {
    search: CandidateSearch,
    verifier: RelevanceVerifier,
    policy: AcceptancePolicy,
    candidate_limit: usize,
    verify_concurrency: usize,
}

impl ArgumentVerificationTask {
    pub fn new(search: CandidateSearch, verifier: RelevanceVerifier, config: &PipelineConfig) -> Self {
        Self {
            search,
            verifier,
            policy: AcceptancePolicy::from(config),
            candidate_limit: config.candidate_limit.max(config.max_suggestions),
            verify_concurrency: config.verify_concurrency.max(1),
        }
    }

    /// Run the task to a terminal state. Never fails: errors become an empty
    /// suggestion list with a `Failed` outcome.
    #[instrument(name = "task.argument", skip(self, argument, events), fields(kind = %argument.kind))]
    pub async fn run(&self, index: usize, argument: &CounterArgument, events: &RunEvents) -> TaskReport {
        let start = Instant::now();

        let report = match argument.search_query() {
            None => {
                debug!(index, "skipping argument without a usable query");
                events.emit(EventPayload::ArgumentSkipped {
                    argument_index: index,
                    reason: PipelineError::MalformedArgument("empty query".into()).to_string(),
                });
                TaskReport::empty(ArgumentOutcome::Skipped)
            }
            Some(query) => {
                events.emit(EventPayload::ArgumentStarted {
                    argument_index: index,
                    kind: argument.kind,
                    query: query.clone(),
                });
                match self.verify_argument(index, &query, &argument.content, events).await {
                    Ok(report) => report,
                    Err(err) => {
                        warn!(index, error = %err, "argument task failed; leaving suggestions empty");
                        TaskReport::empty(ArgumentOutcome::Failed {
                            reason: err.to_string(),
                        })
                    }
                }
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        record_argument_task(report.outcome.as_str(), duration_ms, report.suggestions.len());
        events.emit(EventPayload::ArgumentFinished {
            argument_index: index,
            outcome: report.outcome.clone(),
            suggestion_count: report.suggestions.len(),
            duration_ms,
        });
        info!(
            index,
            outcome = report.outcome.as_str(),
            suggestions = report.suggestions.len(),
            duration_ms,
            "argument task finished"
        );

        report
    }

    async fn verify_argument(
        &self,
        index: usize,
        query: &str,
        content: &str,
        events: &RunEvents,
    ) -> Result<TaskReport, PipelineError> {
        let candidates = self.search.search(query, self.candidate_limit).await?;
        events.emit(EventPayload::SearchCompleted {
            argument_index: index,
            candidate_count: candidates.len(),
        });

        if candidates.is_empty() {
            return Ok(TaskReport::empty(ArgumentOutcome::NoCandidates));
        }

        // `buffered` yields in input order whatever order the scorer answers in.
        let concurrency = self.verify_concurrency.min(candidates.len());
        let verified: Vec<(VideoCandidate, VerificationVerdict)> = stream::iter(candidates)
            .map(|candidate| async move {
                let verdict = self
                    .verifier
                    .verify(
                        content,
                        &candidate.title,
                        candidate.description.as_deref().unwrap_or_default(),
                    )
                    .await;
                (candidate, verdict)
            })
            .buffered(concurrency)
            .collect()
            .await;

        for (candidate, verdict) in &verified {
            events.emit(EventPayload::CandidateVerified {
                argument_index: index,
                url: candidate.url.clone(),
                score: verdict.score,
                verdict: verdict.verdict.as_str().to_string(),
                degraded: verdict.degraded,
                accepted: self.policy.accepts(verdict),
            });
        }

        let selection = self.policy.select(verified);
        let outcome = if selection.fallback {
            if let Some(top) = selection.suggestions.first() {
                info!(index, url = %top.url, "no candidate accepted; keeping top search result");
                events.emit(EventPayload::FallbackApplied {
                    argument_index: index,
                    url: top.url.clone(),
                });
            }
            ArgumentOutcome::Fallback
        } else {
            ArgumentOutcome::Verified {
                accepted: selection.accepted,
            }
        };

        Ok(TaskReport {
            suggestions: selection.suggestions,
            outcome,
        })
    }
}
