use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::{Arc, OnceLock};
use tracing::info;

// Declare the static OnceLock to hold the Metrics.
static METRICS_INSTANCE: OnceLock<Arc<Metrics>> = OnceLock::new();

/// Initializes on first use and returns the process-wide metrics.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| {
        info!("Initializing Metrics ...");
        Metrics::new()
    })
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Request executor metrics
    pub api_requests: IntCounterVec,
    pub api_request_failures: IntCounterVec,
    pub api_retries: IntCounterVec,
    pub api_reauthentications: IntCounterVec,
    pub api_request_duration: HistogramVec,

    // Auth metrics
    pub auth_token_fetches: IntCounterVec,

    // Tool metrics
    pub tool_calls: IntCounterVec,
    pub shaping_truncations: IntCounterVec,

    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("tdxagent".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Executor
            api_requests: IntCounterVec::new(Opts::new("api_requests_total", "Logical API calls by environment"),&["environment", "method"],).unwrap(),
            api_request_failures: IntCounterVec::new(Opts::new("api_request_failures_total", "Failed logical API calls by error kind"),&["environment", "kind"],).unwrap(),
            api_retries: IntCounterVec::new(Opts::new("api_retries_total", "Backoff retries by cause"),&["environment", "reason"],).unwrap(),
            api_reauthentications: IntCounterVec::new(Opts::new("api_reauthentications_total", "Token refreshes triggered by a 401"),&["environment"],).unwrap(),
            api_request_duration: HistogramVec::new(HistogramOpts::new("api_request_duration_seconds", "Logical call duration seconds, retries included").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0, 60.0]),&["environment"],).unwrap(),

            // Auth
            auth_token_fetches: IntCounterVec::new(Opts::new("auth_token_fetches_total", "Token fetches by outcome"),&["environment", "outcome"],).unwrap(),

            // Tools
            tool_calls: IntCounterVec::new(Opts::new("tool_calls_total", "Tool invocations by outcome"),&["tool", "outcome"],).unwrap(),
            shaping_truncations: IntCounterVec::new(Opts::new("shaping_truncations_total", "Collection responses cut to the size budget"),&["tool"],).unwrap(),

            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.api_requests.clone())).unwrap();
        reg.register(Box::new(metrics.api_request_failures.clone())).unwrap();
        reg.register(Box::new(metrics.api_retries.clone())).unwrap();
        reg.register(Box::new(metrics.api_reauthentications.clone())).unwrap();
        reg.register(Box::new(metrics.api_request_duration.clone())).unwrap();
        reg.register(Box::new(metrics.auth_token_fetches.clone())).unwrap();
        reg.register(Box::new(metrics.tool_calls.clone())).unwrap();
        reg.register(Box::new(metrics.shaping_truncations.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
