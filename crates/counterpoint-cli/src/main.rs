use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use counterpoint_core::providers::{HttpVerificationScorer, YtDlpSearchProvider};
use counterpoint_core::{
    AnalysisResult, AuthorityScorer, Config, ConfigLoader, JsonlEventSink, PipelineOrchestrator,
    QualityFilter, RawCandidate, TelemetryOptions, init_metrics_from_env, init_telemetry,
    repair_missing_queries,
};
use serde_json::json;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "counterpoint",
    version,
    about = "Attach verified counter-perspective videos to analysed arguments"
)]
struct Cli {
    /// Path to a TOML config (falls back to COUNTERPOINT_CONFIG, then ./counterpoint.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search and verify suggestions for every counter-argument in an analysis.
    Orchestrate(OrchestrateArgs),
    /// Show how the quality filter and authority baseline judge one title.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct OrchestrateArgs {
    /// Analysis JSON to read; `-` reads stdin.
    #[arg(long)]
    input: PathBuf,

    /// Where to write the populated analysis (stdout if omitted).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Override the pipeline deadline in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print the run report to stderr as JSON.
    #[arg(long, default_value_t = false)]
    report: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    uploader: Option<String>,

    /// Provider category; may be repeated.
    #[arg(long = "category")]
    categories: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::load(cli.config.clone())?;

    init_telemetry(TelemetryOptions::from(&config.logging))?;

    match cli.command {
        Command::Orchestrate(args) => {
            let rt = Runtime::new()?;
            rt.block_on(orchestrate_command(config, args))?;
        }
        Command::Inspect(args) => inspect_command(args)?,
    }

    Ok(())
}

async fn orchestrate_command(mut config: Config, args: OrchestrateArgs) -> Result<()> {
    if let Some(timeout_ms) = args.timeout_ms {
        config.pipeline.timeout_ms = timeout_ms;
        ConfigLoader::validate(&config)?;
    }
    init_metrics_from_env("counterpoint-cli");

    let mut analysis = read_analysis(&args.input)?;
    let repaired = repair_missing_queries(&mut analysis);
    if repaired > 0 {
        warn!(repaired, "input contained arguments without queries");
    }

    let provider = Arc::new(YtDlpSearchProvider::from_config(&config.search));
    let scorer = Arc::new(HttpVerificationScorer::new(
        &config.scorer,
        config.scorer_api_key()?,
    )?);
    let mut orchestrator = PipelineOrchestrator::from_config(&config, provider, scorer);
    if let Some(path) = &config.logging.event_log {
        info!(path = %path.display(), "appending pipeline events");
        orchestrator = orchestrator.with_event_sink(Arc::new(JsonlEventSink::new(path)));
    }

    let timeout = Duration::from_millis(config.pipeline.timeout_ms);
    let (analysis, report) = orchestrator.run_with_report(analysis, timeout).await;
    if let Some(err) = report.timed_out_error() {
        warn!(error = %err, timed_out = report.timed_out, "some arguments were not verified");
    }
    if args.report {
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    }

    let rendered = serde_json::to_string_pretty(&analysis)?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote populated analysis");
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn read_analysis(input: &Path) -> Result<AnalysisResult> {
    let raw = if input.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read analysis from stdin")?;
        buffer
    } else {
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?
    };

    serde_json::from_str(&raw).context("input is not a valid analysis document")
}

fn inspect_command(args: InspectArgs) -> Result<()> {
    let candidate = RawCandidate {
        title: args.title,
        uploader: args.uploader,
        categories: args.categories,
        ..RawCandidate::default()
    };

    let quality = QualityFilter.check(&candidate.title);
    let summary = json!({
        "title": candidate.title,
        "accepted": quality.is_ok(),
        "rejection": quality.err().map(|rejection| rejection.to_string()),
        "authority_score": AuthorityScorer.score(&candidate),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
