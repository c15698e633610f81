#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use counterpoint_core::{
    ArgumentKind, CounterArgument, PipelineConfig, PipelineError, PipelineOrchestrator,
    RawCandidate, RawVerdict, RetryPolicy, SearchProvider, VerificationScorer,
};

pub fn raw(title: &str) -> RawCandidate {
    RawCandidate {
        title: title.to_string(),
        webpage_url: Some(format!("https://video.example/{}", title.replace(' ', "-"))),
        uploader: Some("Independent Channel".to_string()),
        description: Some(format!("About {title}")),
        ..RawCandidate::default()
    }
}

pub fn raws(prefix: &str, count: usize) -> Vec<RawCandidate> {
    (0..count).map(|i| raw(&format!("{prefix} video {i}"))).collect()
}

pub fn argument(query: &str) -> CounterArgument {
    CounterArgument::new(
        ArgumentKind::Empirical,
        format!("Counterpoint on {query}"),
        format!("Evidence about {query}"),
        query,
    )
}

/// Search fake keyed by query. Unknown queries return no results.
#[derive(Default)]
pub struct ScriptedSearch {
    results: HashMap<String, Vec<RawCandidate>>,
    failing: Vec<String>,
    hanging: Vec<String>,
    pub calls: AtomicUsize,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, results: Vec<RawCandidate>) -> Self {
        self.results.insert(query.to_string(), results);
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }

    pub fn hanging_on(mut self, query: &str) -> Self {
        self.hanging.push(query.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawCandidate>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|q| q == query) {
            return Err(PipelineError::search("provider offline"));
        }
        if self.hanging.iter().any(|q| q == query) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        let mut results = self.results.get(query).cloned().unwrap_or_default();
        results.truncate(limit);
        Ok(results)
    }
}

enum Script {
    Verdict(RawVerdict, Duration),
    Fail,
}

/// Scorer fake keyed by candidate title.
pub struct ScriptedScorer {
    scripts: HashMap<String, Script>,
    default: Option<RawVerdict>,
    pub calls: AtomicUsize,
}

impl ScriptedScorer {
    /// Titles without a script are rejected with a low score.
    pub fn rejecting() -> Self {
        Self {
            scripts: HashMap::new(),
            default: Some(verdict(0.2, "reject")),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self {
            scripts: HashMap::new(),
            default: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn answer(self, title: &str, score: f32, decision: &str) -> Self {
        self.answer_after(title, score, decision, Duration::ZERO)
    }

    pub fn answer_after(mut self, title: &str, score: f32, decision: &str, delay: Duration) -> Self {
        self.scripts
            .insert(title.to_string(), Script::Verdict(verdict(score, decision), delay));
        self
    }

    pub fn fail_on(mut self, title: &str) -> Self {
        self.scripts.insert(title.to_string(), Script::Fail);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationScorer for ScriptedScorer {
    async fn score(
        &self,
        _argument_text: &str,
        candidate_title: &str,
        _candidate_description: &str,
    ) -> Result<RawVerdict, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(candidate_title) {
            Some(Script::Verdict(verdict, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                Ok(verdict.clone())
            }
            Some(Script::Fail) => Err(PipelineError::degraded("scorer offline")),
            None => self
                .default
                .clone()
                .ok_or_else(|| PipelineError::degraded("scorer offline")),
        }
    }
}

pub fn verdict(score: f32, decision: &str) -> RawVerdict {
    RawVerdict {
        score: Some(score),
        verdict: Some(decision.to_string()),
        reason: Some("scripted".to_string()),
    }
}

pub fn orchestrator(
    config: PipelineConfig,
    search: Arc<ScriptedSearch>,
    scorer: Arc<ScriptedScorer>,
) -> PipelineOrchestrator {
    PipelineOrchestrator::with_retry(config, search, scorer, RetryPolicy::none())
}
