use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{PipelineError, SecretValue, require_env};

const DEFAULT_CONFIG_PATH: &str = "counterpoint.toml";
const CONFIG_PATH_ENV: &str = "COUNTERPOINT_CONFIG";
/// Upper bound on candidates verified per argument.
pub const MAX_CANDIDATE_LIMIT: usize = 10;

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub search: SearchConfig,
    pub scorer: ScorerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Resolve the scorer bearer token, if one is configured (environment only).
    pub fn scorer_api_key(&self) -> Result<Option<SecretValue>, PipelineError> {
        self.scorer
            .api_key_env
            .as_deref()
            .map(require_env)
            .transpose()
    }
}

/// Helper to load configuration with guard rails.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a provided path or discoverable defaults.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument.
    /// 2. `COUNTERPOINT_CONFIG` environment variable.
    /// 3. `counterpoint.toml` in the current working directory.
    ///
    /// Only the implicit default file may be absent, in which case built-in
    /// defaults apply.
    pub fn load(path: Option<PathBuf>) -> Result<Config, PipelineError> {
        let (candidate, explicit) = resolve_path(path);
        if !explicit && !candidate.exists() {
            tracing::debug!(path = %candidate.display(), "no config file found; using defaults");
            let config = Config::default();
            Self::validate(&config)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&candidate)
            .map_err(|err| PipelineError::config_io(candidate.clone(), err))?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Config, PipelineError> {
        let config: Config = toml::from_str(raw)
            .map_err(|err| PipelineError::InvalidConfiguration(err.to_string()))?;
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), PipelineError> {
        config.pipeline.validate()?;

        if config.search.timeout_ms == 0 {
            return Err(invalid("search.timeout_ms must be greater than zero"));
        }
        if config.search.max_backoff_ms < config.search.initial_backoff_ms {
            return Err(invalid(
                "search.max_backoff_ms must not be smaller than initial_backoff_ms",
            ));
        }
        if config.search.binary.trim().is_empty() {
            return Err(invalid("search.binary must not be empty"));
        }
        if config.scorer.timeout_ms == 0 {
            return Err(invalid("scorer.timeout_ms must be greater than zero"));
        }
        if let Some(var) = &config.scorer.api_key_env {
            if var.trim().is_empty() {
                return Err(invalid(
                    "scorer.api_key_env must reference an environment variable",
                ));
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> PipelineError {
    PipelineError::InvalidConfiguration(message.to_string())
}

fn resolve_path(path: Option<PathBuf>) -> (PathBuf, bool) {
    if let Some(path) = path {
        return (path, true);
    }

    if let Ok(from_env) = env::var(CONFIG_PATH_ENV) {
        if !from_env.trim().is_empty() {
            return (PathBuf::from(from_env), true);
        }
    }

    (Path::new(DEFAULT_CONFIG_PATH).to_path_buf(), false)
}

/// Acceptance policy and concurrency knobs of the orchestrator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// τ: minimum verifier score for an `accept` verdict to count.
    pub acceptance_threshold: f32,
    /// K: suggestions kept per argument.
    pub max_suggestions: usize,
    /// Quality-passing candidates verified per argument.
    pub candidate_limit: usize,
    pub fallback_score: f32,
    /// Overall deadline for one orchestration call.
    pub timeout_ms: u64,
    pub verify_concurrency: usize,
    pub verify_timeout_ms: u64,
    /// Size of the outbound-call pool shared by all argument tasks.
    pub max_outbound_calls: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.7,
            max_suggestions: 2,
            candidate_limit: 3,
            fallback_score: 0.5,
            timeout_ms: 60_000,
            verify_concurrency: 2,
            verify_timeout_ms: 20_000,
            max_outbound_calls: 4,
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(0.0..=1.0).contains(&self.acceptance_threshold) {
            return Err(invalid("pipeline.acceptance_threshold must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.fallback_score) {
            return Err(invalid("pipeline.fallback_score must be within [0, 1]"));
        }
        if self.max_suggestions == 0 {
            return Err(invalid("pipeline.max_suggestions must be at least 1"));
        }
        if self.candidate_limit < self.max_suggestions {
            return Err(invalid(
                "pipeline.candidate_limit must not be smaller than max_suggestions",
            ));
        }
        if self.candidate_limit > MAX_CANDIDATE_LIMIT {
            return Err(PipelineError::InvalidConfiguration(format!(
                "pipeline.candidate_limit must not exceed {MAX_CANDIDATE_LIMIT}"
            )));
        }
        if self.verify_concurrency == 0 || self.max_outbound_calls == 0 {
            return Err(invalid(
                "pipeline.verify_concurrency and max_outbound_calls must be at least 1",
            ));
        }
        if self.timeout_ms == 0 || self.verify_timeout_ms == 0 {
            return Err(invalid("pipeline timeouts must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Executable used by the yt-dlp search provider.
    pub binary: String,
    pub timeout_ms: u64,
    pub retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            timeout_ms: 30_000,
            retries: 1,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub endpoint: String,
    /// Name of the environment variable holding a bearer token.
    pub api_key_env: Option<String>,
    pub timeout_ms: u64,
    /// Description characters forwarded to the scorer.
    pub description_chars: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8088/verify".to_string(),
            api_key_env: None,
            timeout_ms: 20_000,
            description_chars: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Optional JSONL file receiving pipeline events.
    pub event_log: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            event_log: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_canonical_policy() {
        let config = Config::default();
        assert_eq!(config.pipeline.acceptance_threshold, 0.7);
        assert_eq!(config.pipeline.max_suggestions, 2);
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ConfigLoader::parse(
            r#"
            [pipeline]
            acceptance_threshold = 0.6
            max_suggestions = 1

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.acceptance_threshold, 0.6);
        assert_eq!(config.pipeline.max_suggestions, 1);
        assert_eq!(config.pipeline.candidate_limit, 3);
        assert_eq!(config.search.binary, "yt-dlp");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = ConfigLoader::parse("[pipeline]\nacceptance_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration(_)));

        let err = ConfigLoader::parse("[pipeline]\nmax_suggestions = 4\ncandidate_limit = 3\n")
            .unwrap_err();
        assert!(err.to_string().contains("candidate_limit"));

        let err = ConfigLoader::parse("[pipeline]\ncandidate_limit = 11\n").unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
    }

    #[test]
    fn rejects_inverted_backoff_window() {
        let err = ConfigLoader::parse("[search]\ninitial_backoff_ms = 5000\nmax_backoff_ms = 100\n")
            .unwrap_err();
        assert!(err.to_string().contains("max_backoff_ms"));

        let config = ConfigLoader::parse("[search]\ninitial_backoff_ms = 100\nmax_backoff_ms = 100\n")
            .unwrap();
        assert_eq!(config.search.max_backoff_ms, 100);
    }

    #[test]
    fn loads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[search]\nretries = 0\nbinary = \"/opt/yt-dlp\"").unwrap();

        let config = ConfigLoader::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.search.retries, 0);
        assert_eq!(config.search.binary, "/opt/yt-dlp");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigIo { .. }));
    }
}
