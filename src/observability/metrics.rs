use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token metrics
    pub token_fetch_requests: IntCounter,
    pub token_fetch_failures: IntCounterVec,
    pub token_fetch_duration: Histogram,
    pub token_cache_hits: IntCounter,
    pub unauthorized_responses: IntCounter,

    // Invocation metrics
    pub invocations: IntCounterVec,
    pub batch_item_failures: IntCounterVec,

    // Config
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("oauthlambda".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token
            token_fetch_requests: IntCounter::new("token_fetch_requests_total", "Token endpoint calls").unwrap(),
            token_fetch_failures: IntCounterVec::new(Opts::new("token_fetch_failures_total", "Token fetch failures by code"),&["code"],).unwrap(),
            token_fetch_duration: Histogram::with_opts(HistogramOpts::new("token_fetch_duration_seconds", "Token fetch duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])).unwrap(),
            token_cache_hits: IntCounter::new("token_cache_hits_total", "Requests served with a cached token").unwrap(),
            unauthorized_responses: IntCounter::new("unauthorized_responses_total", "Authorized requests answered with 401").unwrap(),

            // Invocations
            invocations: IntCounterVec::new(Opts::new("invocations_total", "Handler invocations by outcome"),&["trigger", "outcome"],).unwrap(),
            batch_item_failures: IntCounterVec::new(Opts::new("batch_item_failures_total", "Batch records reported as failed"),&["trigger"],).unwrap(),

            config_validation_errors: IntCounter::new("config_validation_errors_total","Validation errors during startup",).unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_fetch_requests.clone())).unwrap();
        reg.register(Box::new(metrics.token_fetch_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_fetch_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.unauthorized_responses.clone())).unwrap();
        reg.register(Box::new(metrics.invocations.clone())).unwrap();
        reg.register(Box::new(metrics.batch_item_failures.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();

        metrics
    }

    /// Text exposition of everything registered.
    pub fn gather_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
