//! Relevance verification of a single (argument, candidate) pair.
//!
//! The verifier never fails: any scorer problem (transport error, timeout,
//! unusable payload) is replaced by [`VerificationVerdict::neutral`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::metrics::record_verifier_degraded;
use crate::model::{Verdict, VerificationVerdict};
use crate::pool::OutboundPool;

const DEFAULT_SCORE: f32 = 0.5;
const DEFAULT_REASON: &str = "automated verification";
const DEFAULT_ACCEPT_THRESHOLD: f32 = 0.7;
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Scorer response; every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawVerdict {
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// External relevance-verification scorer contract.
#[async_trait]
pub trait VerificationScorer: Send + Sync {
    async fn score(
        &self,
        argument_text: &str,
        candidate_title: &str,
        candidate_description: &str,
    ) -> Result<RawVerdict, PipelineError>;
}

#[derive(Clone)]
pub struct RelevanceVerifier {
    scorer: Arc<dyn VerificationScorer>,
    pool: OutboundPool,
    accept_threshold: f32,
    call_timeout: Duration,
}

impl RelevanceVerifier {
    pub fn new(scorer: Arc<dyn VerificationScorer>, pool: OutboundPool) -> Self {
        Self {
            scorer,
            pool,
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Threshold used to derive a verdict the scorer left out.
    pub fn with_accept_threshold(mut self, threshold: f32) -> Self {
        self.accept_threshold = threshold;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub async fn verify(
        &self,
        argument_content: &str,
        candidate_title: &str,
        candidate_description: &str,
    ) -> VerificationVerdict {
        match self
            .try_verify(argument_content, candidate_title, candidate_description)
            .await
        {
            Ok(verdict) => {
                debug!(
                    title = %candidate_title,
                    score = verdict.score,
                    verdict = verdict.verdict.as_str(),
                    "candidate verified"
                );
                verdict
            }
            Err(err) => {
                warn!(title = %candidate_title, error = %err, "verifier degraded to neutral verdict");
                record_verifier_degraded();
                VerificationVerdict::neutral()
            }
        }
    }

    async fn try_verify(
        &self,
        argument_content: &str,
        candidate_title: &str,
        candidate_description: &str,
    ) -> Result<VerificationVerdict, PipelineError> {
        let _permit = self.pool.acquire().await?;
        let raw = tokio::time::timeout(
            self.call_timeout,
            self.scorer
                .score(argument_content, candidate_title, candidate_description),
        )
        .await
        .map_err(|_| {
            PipelineError::degraded(format!(
                "scorer timed out after {} ms",
                self.call_timeout.as_millis()
            ))
        })??;

        self.normalize(raw)
    }

    /// Apply the defaulting rules to a raw scorer response.
    pub fn normalize(&self, raw: RawVerdict) -> Result<VerificationVerdict, PipelineError> {
        let score = match raw.score {
            Some(score) if !score.is_finite() => {
                return Err(PipelineError::degraded(format!("non-finite score {score}")));
            }
            Some(score) => score.clamp(0.0, 1.0),
            None => DEFAULT_SCORE,
        };

        let verdict = match raw.verdict.as_deref() {
            Some(text) => Verdict::parse(text),
            None if score >= self.accept_threshold => Verdict::Accept,
            None => Verdict::Reject,
        };

        let reason = raw
            .reason
            .filter(|reason| !reason.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REASON.to_string());

        Ok(VerificationVerdict {
            score,
            verdict,
            reason,
            degraded: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScorer(Result<RawVerdict, &'static str>);

    #[async_trait]
    impl VerificationScorer for FixedScorer {
        async fn score(&self, _: &str, _: &str, _: &str) -> Result<RawVerdict, PipelineError> {
            self.0.clone().map_err(PipelineError::degraded)
        }
    }

    struct SlowScorer;

    #[async_trait]
    impl VerificationScorer for SlowScorer {
        async fn score(&self, _: &str, _: &str, _: &str) -> Result<RawVerdict, PipelineError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(RawVerdict::default())
        }
    }

    fn verifier(scorer: impl VerificationScorer + 'static) -> RelevanceVerifier {
        RelevanceVerifier::new(Arc::new(scorer), OutboundPool::new(1))
    }

    #[tokio::test]
    async fn passes_scorer_fields_through() {
        let v = verifier(FixedScorer(Ok(RawVerdict {
            score: Some(0.82),
            verdict: Some("accept".into()),
            reason: Some("expert interview".into()),
        })));

        let verdict = v.verify("argument", "title", "").await;
        assert_eq!(verdict.score, 0.82);
        assert_eq!(verdict.verdict, Verdict::Accept);
        assert_eq!(verdict.reason, "expert interview");
        assert!(!verdict.degraded);
    }

    #[tokio::test]
    async fn scorer_error_yields_neutral_accept() {
        let v = verifier(FixedScorer(Err("unparsable response")));
        let verdict = v.verify("argument", "title", "desc").await;
        assert_eq!(verdict, VerificationVerdict::neutral());
        assert_eq!(verdict.score, 0.65);
        assert_eq!(verdict.reason, "verification unavailable");
    }

    #[tokio::test]
    async fn slow_scorer_times_out_to_neutral() {
        let v = verifier(SlowScorer).with_call_timeout(Duration::from_millis(10));
        let verdict = v.verify("argument", "title", "").await;
        assert!(verdict.degraded);
        assert_eq!(verdict.verdict, Verdict::Accept);
    }

    #[test]
    fn missing_fields_are_defaulted() {
        let v = verifier(FixedScorer(Ok(RawVerdict::default())));

        let empty = v.normalize(RawVerdict::default()).unwrap();
        assert_eq!(empty.score, 0.5);
        assert_eq!(empty.verdict, Verdict::Reject);
        assert_eq!(empty.reason, "automated verification");

        let high = v
            .normalize(RawVerdict {
                score: Some(0.7),
                ..RawVerdict::default()
            })
            .unwrap();
        assert_eq!(high.verdict, Verdict::Accept);
    }

    #[test]
    fn explicit_verdict_wins_over_score() {
        let v = verifier(FixedScorer(Ok(RawVerdict::default())));
        let verdict = v
            .normalize(RawVerdict {
                score: Some(0.95),
                verdict: Some("reject".into()),
                reason: None,
            })
            .unwrap();
        assert_eq!(verdict.verdict, Verdict::Reject);
    }

    #[test]
    fn out_of_range_scores_are_clamped_and_nan_is_rejected() {
        let v = verifier(FixedScorer(Ok(RawVerdict::default())));
        let clamped = v
            .normalize(RawVerdict {
                score: Some(7.0),
                ..RawVerdict::default()
            })
            .unwrap();
        assert_eq!(clamped.score, 1.0);

        assert!(
            v.normalize(RawVerdict {
                score: Some(f32::NAN),
                ..RawVerdict::default()
            })
            .is_err()
        );
    }
}
