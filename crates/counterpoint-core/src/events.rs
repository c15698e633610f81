//! Structured pipeline events.
//!
//! The orchestrator reports progress through an injected [`EventSink`]
//! instead of writing to any process-wide log target, so callers decide
//! whether events are collected, persisted or dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::model::ArgumentKind;
use crate::tasks::ArgumentOutcome;

pub type EventId = String;

/// Envelope shared by every pipeline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub event_id: EventId,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    pub run_id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    RunStarted {
        argument_count: usize,
    },
    ArgumentStarted {
        argument_index: usize,
        kind: ArgumentKind,
        query: String,
    },
    ArgumentSkipped {
        argument_index: usize,
        reason: String,
    },
    SearchCompleted {
        argument_index: usize,
        candidate_count: usize,
    },
    CandidateVerified {
        argument_index: usize,
        url: String,
        score: f32,
        verdict: String,
        degraded: bool,
        accepted: bool,
    },
    FallbackApplied {
        argument_index: usize,
        url: String,
    },
    ArgumentFinished {
        argument_index: usize,
        outcome: ArgumentOutcome,
        suggestion_count: usize,
        duration_ms: u64,
    },
    RunFinished {
        completed: usize,
        timed_out: usize,
        duration_ms: u64,
    },
}

impl EventPayload {
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::RunStarted { .. } => "run_started",
            EventPayload::ArgumentStarted { .. } => "argument_started",
            EventPayload::ArgumentSkipped { .. } => "argument_skipped",
            EventPayload::SearchCompleted { .. } => "search_completed",
            EventPayload::CandidateVerified { .. } => "candidate_verified",
            EventPayload::FallbackApplied { .. } => "fallback_applied",
            EventPayload::ArgumentFinished { .. } => "argument_finished",
            EventPayload::RunFinished { .. } => "run_finished",
        }
    }
}

/// Destination for pipeline events. Emission must not block or fail.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// Channel-backed sink; the receiver is handed to the caller.
#[derive(Clone)]
pub struct EventCollector {
    sender: mpsc::UnboundedSender<PipelineEvent>,
}

impl EventCollector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for EventCollector {
    fn emit(&self, event: PipelineEvent) {
        if let Err(e) = self.sender.send(event) {
            tracing::warn!(event = e.0.payload.name(), "event receiver dropped");
        }
    }
}

/// Stamps payloads with the run id before handing them to the sink.
#[derive(Clone)]
pub struct RunEvents {
    sink: Arc<dyn EventSink>,
    run_id: String,
}

impl RunEvents {
    pub fn new(sink: Arc<dyn EventSink>, run_id: impl Into<String>) -> Self {
        Self {
            sink,
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn emit(&self, payload: EventPayload) {
        self.sink.emit(PipelineEvent {
            event_id: generate_event_id(),
            timestamp: current_timestamp(),
            run_id: self.run_id.clone(),
            payload,
        });
    }
}

fn generate_event_id() -> EventId {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("evt_{}", id)
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
