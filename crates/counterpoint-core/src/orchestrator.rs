//! Pipeline orchestrator: one verification task per counter-argument.
//!
//! Tasks run concurrently in a [`JoinSet`] and are joined against a single
//! deadline. A failing or panicking task only empties its own argument; on
//! deadline expiry the remaining tasks are aborted and their arguments are
//! left without suggestions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Config, PipelineConfig};
use crate::error::PipelineError;
use crate::events::{EventPayload, EventSink, NullEventSink, RunEvents};
use crate::model::{AnalysisResult, CounterArgument};
use crate::pool::OutboundPool;
use crate::search::{CandidateSearch, RetryPolicy, SearchProvider};
use crate::tasks::{ArgumentOutcome, ArgumentVerificationTask, TaskReport};
use crate::verifier::{RelevanceVerifier, VerificationScorer};

/// Summary of one orchestration call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub total_arguments: usize,
    pub verified: usize,
    pub fallback: usize,
    pub no_candidates: usize,
    pub skipped: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub duration_ms: u64,
    /// Outcome per argument, in input order.
    pub outcomes: Vec<ArgumentOutcome>,
}

impl PipelineReport {
    fn tally(run_id: String, outcomes: Vec<ArgumentOutcome>, duration_ms: u64) -> Self {
        let mut report = Self {
            run_id,
            total_arguments: outcomes.len(),
            duration_ms,
            ..Self::default()
        };
        for outcome in &outcomes {
            match outcome {
                ArgumentOutcome::Verified { .. } => report.verified += 1,
                ArgumentOutcome::Fallback => report.fallback += 1,
                ArgumentOutcome::NoCandidates => report.no_candidates += 1,
                ArgumentOutcome::Skipped => report.skipped += 1,
                ArgumentOutcome::Failed { .. } => report.failed += 1,
                ArgumentOutcome::TimedOut => report.timed_out += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }

    pub fn timed_out_error(&self) -> Option<PipelineError> {
        (self.timed_out > 0).then(|| PipelineError::PipelineTimeout {
            elapsed_ms: self.duration_ms,
        })
    }
}

pub struct PipelineOrchestrator {
    config: PipelineConfig,
    task: Arc<ArgumentVerificationTask>,
    sink: Arc<dyn EventSink>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: PipelineConfig,
        provider: Arc<dyn SearchProvider>,
        scorer: Arc<dyn VerificationScorer>,
    ) -> Self {
        Self::with_retry(config, provider, scorer, RetryPolicy::default())
    }

    pub fn with_retry(
        config: PipelineConfig,
        provider: Arc<dyn SearchProvider>,
        scorer: Arc<dyn VerificationScorer>,
        retry: RetryPolicy,
    ) -> Self {
        let pool = OutboundPool::new(config.max_outbound_calls);
        let search = CandidateSearch::new(provider, pool.clone()).with_retry(retry);
        let verifier = RelevanceVerifier::new(scorer, pool)
            .with_accept_threshold(config.acceptance_threshold)
            .with_call_timeout(config.verify_timeout());
        let task = Arc::new(ArgumentVerificationTask::new(search, verifier, &config));

        Self {
            config,
            task,
            sink: Arc::new(NullEventSink),
        }
    }

    pub fn from_config(
        config: &Config,
        provider: Arc<dyn SearchProvider>,
        scorer: Arc<dyn VerificationScorer>,
    ) -> Self {
        Self::with_retry(
            config.pipeline.clone(),
            provider,
            scorer,
            RetryPolicy::from(&config.search),
        )
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Populate every counter-argument of `result` using the configured deadline.
    pub async fn run(&self, result: AnalysisResult) -> AnalysisResult {
        self.run_with_report(result, self.config.timeout()).await.0
    }

    pub async fn run_with_report(
        &self,
        mut result: AnalysisResult,
        timeout: Duration,
    ) -> (AnalysisResult, PipelineReport) {
        let arguments = std::mem::take(&mut result.counter_arguments);
        let (arguments, report) = self.orchestrate_with_report(arguments, timeout).await;
        result.counter_arguments = arguments;
        (result, report)
    }

    /// Caller-facing operation: populated arguments, same order as the input.
    pub async fn orchestrate(
        &self,
        arguments: Vec<CounterArgument>,
        timeout: Duration,
    ) -> Vec<CounterArgument> {
        self.orchestrate_with_report(arguments, timeout).await.0
    }

    pub async fn orchestrate_with_report(
        &self,
        mut arguments: Vec<CounterArgument>,
        timeout: Duration,
    ) -> (Vec<CounterArgument>, PipelineReport) {
        let start = Instant::now();
        // A timeout past the clock's range means no deadline at all.
        let deadline = time::Instant::now().checked_add(timeout);
        let events = RunEvents::new(self.sink.clone(), Uuid::new_v4().to_string());

        info!(
            run_id = events.run_id(),
            arguments = arguments.len(),
            timeout_ms = timeout.as_millis() as u64,
            "starting verification pipeline"
        );
        events.emit(EventPayload::RunStarted {
            argument_count: arguments.len(),
        });

        let mut set = JoinSet::new();
        let mut task_index = HashMap::with_capacity(arguments.len());
        for (index, argument) in arguments.iter().enumerate() {
            let task = self.task.clone();
            let argument = argument.clone();
            let events = events.clone();
            let handle = set.spawn(async move { (index, task.run(index, &argument, &events).await) });
            task_index.insert(handle.id(), index);
        }

        let mut reports: Vec<Option<TaskReport>> = arguments.iter().map(|_| None).collect();
        loop {
            let joined = match deadline {
                Some(deadline) => match time::timeout_at(deadline, set.join_next_with_id()).await {
                    Ok(joined) => joined,
                    Err(_elapsed) => {
                        warn!(
                            run_id = events.run_id(),
                            pending = set.len(),
                            "pipeline deadline elapsed; abandoning unfinished tasks"
                        );
                        set.abort_all();
                        break;
                    }
                },
                None => set.join_next_with_id().await,
            };

            match joined {
                Some(Ok((_, (index, report)))) => reports[index] = Some(report),
                Some(Err(err)) => {
                    let reason = if err.is_panic() {
                        "argument task panicked".to_string()
                    } else {
                        format!("argument task did not complete: {err}")
                    };
                    match task_index.get(&err.id()) {
                        Some(&index) => {
                            warn!(index, %reason, "argument task failed");
                            events.emit(EventPayload::ArgumentFinished {
                                argument_index: index,
                                outcome: ArgumentOutcome::Failed {
                                    reason: reason.clone(),
                                },
                                suggestion_count: 0,
                                duration_ms: start.elapsed().as_millis() as u64,
                            });
                            reports[index] = Some(TaskReport {
                                suggestions: Vec::new(),
                                outcome: ArgumentOutcome::Failed { reason },
                            });
                        }
                        None => warn!(%reason, "unknown argument task failed"),
                    }
                }
                None => break,
            }
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let mut outcomes = Vec::with_capacity(arguments.len());
        for (index, (argument, report)) in arguments.iter_mut().zip(reports).enumerate() {
            let report = report.unwrap_or_else(|| {
                events.emit(EventPayload::ArgumentFinished {
                    argument_index: index,
                    outcome: ArgumentOutcome::TimedOut,
                    suggestion_count: 0,
                    duration_ms: elapsed_ms,
                });
                TaskReport {
                    suggestions: Vec::new(),
                    outcome: ArgumentOutcome::TimedOut,
                }
            });
            argument.suggested_videos = report.suggestions;
            outcomes.push(report.outcome);
        }

        let report = PipelineReport::tally(events.run_id().to_string(), outcomes, elapsed_ms);
        events.emit(EventPayload::RunFinished {
            completed: report.total_arguments - report.timed_out,
            timed_out: report.timed_out,
            duration_ms: elapsed_ms,
        });
        info!(
            run_id = %report.run_id,
            verified = report.verified,
            fallback = report.fallback,
            failed = report.failed,
            timed_out = report.timed_out,
            duration_ms = elapsed_ms,
            "verification pipeline complete"
        );

        (arguments, report)
    }
}
