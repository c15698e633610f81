use once_cell::sync::OnceCell;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{KeyValue, global};
use tracing::info;

struct PipelineMetrics {
    tasks: Counter<u64>,
    task_duration_ms: Histogram<f64>,
    suggestions: Histogram<u64>,
    verifier_degraded: Counter<u64>,
}

static METRICS: OnceCell<PipelineMetrics> = OnceCell::new();

fn handles() -> &'static PipelineMetrics {
    METRICS.get_or_init(|| {
        let meter: Meter = global::meter("counterpoint.pipeline");
        PipelineMetrics {
            tasks: meter
                .u64_counter("argument_tasks_total")
                .with_description("Argument verification tasks by outcome")
                .init(),
            task_duration_ms: meter
                .f64_histogram("argument_task_duration_ms")
                .with_description("Argument verification task runtime in milliseconds")
                .init(),
            suggestions: meter
                .u64_histogram("argument_suggestions")
                .with_description("Suggested videos attached per argument")
                .init(),
            verifier_degraded: meter
                .u64_counter("verifier_degraded_total")
                .with_description("Verifier calls replaced by the neutral verdict")
                .init(),
        }
    })
}

/// Hint to operators that OTEL metrics export can be configured externally.
pub fn init_metrics_from_env(service_name: &str) {
    if std::env::var("COUNTERPOINT_OTEL_METRICS_ENDPOINT").is_ok() {
        info!(
            target = "telemetry",
            "COUNTERPOINT_OTEL_METRICS_ENDPOINT detected for {service_name}. Configure an OTLP meter provider in your deployment to export pipeline metrics."
        );
    }
}

/// Record one finished argument task (no-op if no provider installed).
pub fn record_argument_task(outcome: &'static str, duration_ms: u64, suggestions: usize) {
    let metrics = handles();
    let attrs = [KeyValue::new("outcome", outcome)];

    metrics.tasks.add(1, &attrs);
    metrics.task_duration_ms.record(duration_ms as f64, &attrs);
    metrics.suggestions.record(suggestions as u64, &attrs);
}

pub fn record_verifier_degraded() {
    handles().verifier_degraded.add(1, &[]);
}
