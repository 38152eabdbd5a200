// Prometheus metrics for the Arena API

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

lazy_static! {
    // Global registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Runs against visible cases (language, outcome)
    pub static ref RUNS: CounterVec = CounterVec::new(
        Opts::new("arena_runs_total", "Total number of runs against visible test cases"),
        &["language", "outcome"]
    )
    .expect("metric can be created");

    // Graded submissions (language, final status)
    pub static ref SUBMISSIONS: CounterVec = CounterVec::new(
        Opts::new("arena_submissions_total", "Total number of graded submissions"),
        &["language", "status"]
    )
    .expect("metric can be created");

    // Requests refused before dispatch
    pub static ref REJECTED: CounterVec = CounterVec::new(
        Opts::new("arena_requests_rejected_total", "Requests rejected before reaching the judge"),
        &["reason"]
    )
    .expect("metric can be created");

    // Judge failures (unavailable, timeout)
    pub static ref GATEWAY_FAILURES: CounterVec = CounterVec::new(
        Opts::new("arena_gateway_failures_total", "Execution service failures"),
        &["kind"]
    )
    .expect("metric can be created");

    // Wall time from dispatch to verdict (seconds)
    pub static ref JUDGE_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "arena_judge_latency_seconds",
            "Time from request to verdict"
        )
        .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["entry"]
    )
    .expect("metric can be created");
}

/// Initialize metrics registry
pub fn init_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(RUNS.clone()),
        Box::new(SUBMISSIONS.clone()),
        Box::new(REJECTED.clone()),
        Box::new(GATEWAY_FAILURES.clone()),
        Box::new(JUDGE_LATENCY.clone()),
    ];
    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            tracing::debug!(error = %e, "Metric already registered");
        }
    }
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_run(language: &str, success: bool, seconds: f64) {
    let outcome = if success { "passed" } else { "failed" };
    RUNS.with_label_values(&[language, outcome]).inc();
    JUDGE_LATENCY.with_label_values(&["run"]).observe(seconds);
}

pub fn record_submission(language: &str, status: &str, seconds: f64) {
    SUBMISSIONS.with_label_values(&[language, status]).inc();
    JUDGE_LATENCY.with_label_values(&["submit"]).observe(seconds);
}

pub fn record_rejected(reason: &str) {
    REJECTED.with_label_values(&[reason]).inc();
}

pub fn record_gateway_failure(kind: &str) {
    GATEWAY_FAILURES.with_label_values(&[kind]).inc();
}
