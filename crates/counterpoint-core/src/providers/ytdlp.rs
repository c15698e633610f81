use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::PipelineError;
use crate::search::{RawCandidate, SearchProvider};

const STDERR_SNIPPET_CHARS: usize = 300;

/// Search provider backed by the `yt-dlp` executable.
///
/// Runs `ytsearch<N>:<query>` with `--dump-json`, which prints one JSON
/// object per result on stdout.
#[derive(Debug, Clone)]
pub struct YtDlpSearchProvider {
    binary: String,
    timeout: Duration,
}

impl YtDlpSearchProvider {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.binary.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    fn build_args(query: &str, limit: usize) -> Vec<String> {
        vec![
            "--dump-json".to_string(),
            "--skip-download".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--ignore-errors".to_string(),
            format!("ytsearch{limit}:{query}"),
        ]
    }
}

/// Parse `--dump-json` output, skipping lines that are not result objects.
pub fn parse_dump(stdout: &str) -> Vec<RawCandidate> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<RawCandidate>(line) {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(error = %err, "skipping unparsable yt-dlp line");
                None
            }
        })
        .collect()
}

#[async_trait]
impl SearchProvider for YtDlpSearchProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawCandidate>, PipelineError> {
        let args = Self::build_args(query, limit);
        debug!(binary = %self.binary, args = ?args, "prepared yt-dlp invocation");

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(PipelineError::search(format!(
                    "failed to run {}: {err}",
                    self.binary
                )));
            }
            Err(_elapsed) => {
                warn!(%query, timeout_ms = self.timeout.as_millis() as u64, "yt-dlp search timed out");
                return Err(PipelineError::search(format!(
                    "search timed out after {} ms",
                    self.timeout.as_millis()
                )));
            }
        };

        let entries = parse_dump(&String::from_utf8_lossy(&output.stdout));
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let snippet: String = stderr.chars().take(STDERR_SNIPPET_CHARS).collect();
            if entries.is_empty() {
                return Err(PipelineError::search(format!(
                    "yt-dlp exited with {:?}: {}",
                    output.status.code(),
                    snippet.trim()
                )));
            }
            warn!(code = ?output.status.code(), stderr = %snippet.trim(), "yt-dlp reported partial failure");
        }

        info!(%query, results = entries.len(), "yt-dlp search completed");
        Ok(entries)
    }
}
