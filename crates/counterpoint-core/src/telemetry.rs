//! Process-wide tracing subscriber for binaries that embed the pipeline.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt};

use crate::PipelineError;
use crate::config::LoggingConfig;

static INSTALLED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct TelemetryOptions {
    /// Directive used when `RUST_LOG` is unset or unparsable.
    pub default_filter: String,
    pub with_ansi: bool,
    pub with_target: bool,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            with_ansi: true,
            with_target: false,
        }
    }
}

impl From<&LoggingConfig> for TelemetryOptions {
    fn from(config: &LoggingConfig) -> Self {
        let level = config.level.trim();
        let level = if level.is_empty() { "info" } else { level };
        Self {
            default_filter: format!("{level},counterpoint_core={level}"),
            ..Self::default()
        }
    }
}

/// Install a stderr fmt subscriber. `RUST_LOG` overrides the configured filter.
///
/// Only the first call installs anything; later calls are no-ops.
pub fn init_telemetry(options: TelemetryOptions) -> Result<(), PipelineError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.default_filter));

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_ansi(options.with_ansi)
        .with_target(options.with_target)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| {
            PipelineError::InvalidConfiguration(format!("tracing subscriber already set: {err}"))
        })?;

    INSTALLED.get_or_init(|| ());
    Ok(())
}
