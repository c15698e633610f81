//! Counterpoint core: verification pipeline for counter-perspective media.
//!
//! For every counter-argument produced by an upstream reasoning step, the
//! pipeline searches for candidate videos, filters them for quality, has an
//! external scorer verify their relevance, and attaches the best few back to
//! the argument. Arguments are processed concurrently under one deadline.

mod authority;
mod config;
mod error;
mod events;
mod logging;
mod metrics;
mod model;
mod orchestrator;
mod pool;
pub mod providers;
mod quality;
mod search;
mod security;
mod tasks;
mod telemetry;
mod verifier;
mod workflow;

pub use authority::AuthorityScorer;
pub use config::{
    Config, ConfigLoader, LoggingConfig, MAX_CANDIDATE_LIMIT, PipelineConfig, ScorerConfig,
    SearchConfig,
};
pub use error::PipelineError;
pub use events::{
    EventCollector, EventId, EventPayload, EventSink, NullEventSink, PipelineEvent, RunEvents,
};
pub use logging::JsonlEventSink;
pub use metrics::{init_metrics_from_env, record_argument_task, record_verifier_degraded};
pub use model::{
    AnalysisResult, ArgumentKind, CounterArgument, ExtractedClaim, MinedOpinion, Verdict,
    VerificationVerdict, VideoCandidate, VideoMetadata, repair_missing_queries,
};
pub use orchestrator::{PipelineOrchestrator, PipelineReport};
pub use pool::OutboundPool;
pub use quality::{QualityFilter, QualityRejection};
pub use search::{CandidateSearch, RawCandidate, RetryPolicy, SearchProvider, normalize_query};
pub use security::{SecretValue, require_env};
pub use tasks::{
    AcceptancePolicy, ArgumentOutcome, ArgumentVerificationTask, Selection, TaskReport,
};
pub use telemetry::{TelemetryOptions, init_telemetry};
pub use verifier::{RawVerdict, RelevanceVerifier, VerificationScorer};
pub use workflow::{AnalysisSession, MediaArtifact, MediaSource, ReasoningService, Transcriber};
