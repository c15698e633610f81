//! Analysis session: acquire media, transcribe, reason, then verify.
//!
//! Acquisition, transcription and reasoning are collaborators behind traits;
//! this module only sequences them and hands the result to the
//! [`PipelineOrchestrator`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::error::PipelineError;
use crate::model::{AnalysisResult, VideoMetadata, repair_missing_queries};
use crate::orchestrator::{PipelineOrchestrator, PipelineReport};

/// A downloaded media file plus the metadata reported for it.
#[derive(Debug, Clone)]
pub struct MediaArtifact {
    pub path: PathBuf,
    pub metadata: VideoMetadata,
}

#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self, video_url: &str) -> Result<MediaArtifact, PipelineError>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, media: &Path) -> Result<String, PipelineError>;
}

/// Produces claims and counter-arguments (with search queries) from a transcript.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn analyze(&self, transcript: &str, video_url: &str) -> Result<AnalysisResult, PipelineError>;
}

/// Removes the media artifact when dropped, on success and failure alike.
struct ArtifactGuard {
    path: PathBuf,
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to remove media artifact")
            }
        }
    }
}

pub struct AnalysisSession {
    media: Arc<dyn MediaSource>,
    transcriber: Arc<dyn Transcriber>,
    reasoning: Arc<dyn ReasoningService>,
    orchestrator: PipelineOrchestrator,
}

impl AnalysisSession {
    pub fn new(
        media: Arc<dyn MediaSource>,
        transcriber: Arc<dyn Transcriber>,
        reasoning: Arc<dyn ReasoningService>,
        orchestrator: PipelineOrchestrator,
    ) -> Self {
        Self {
            media,
            transcriber,
            reasoning,
            orchestrator,
        }
    }

    #[instrument(name = "session.analyze", skip(self))]
    pub async fn analyze(&self, video_url: &str) -> Result<(AnalysisResult, PipelineReport), PipelineError> {
        let artifact = self.media.acquire(video_url).await?;
        let guard = ArtifactGuard {
            path: artifact.path.clone(),
        };

        let transcript = self.transcriber.transcribe(&artifact.path).await?;
        drop(guard);
        if transcript.trim().is_empty() {
            return Err(PipelineError::TranscriptionEmpty);
        }
        info!(chars = transcript.chars().count(), "transcription complete");

        let mut result = self.reasoning.analyze(&transcript, video_url).await?;
        let repaired = repair_missing_queries(&mut result);
        if repaired > 0 {
            info!(repaired, "filled missing counter-argument queries");
        }
        result.video_metadata = Some(artifact.metadata);

        let timeout = self.orchestrator.config().timeout();
        Ok(self.orchestrator.run_with_report(result, timeout).await)
    }
}
