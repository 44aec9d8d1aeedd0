use std::sync::OnceLock;
use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

static REGISTRY: OnceLock<Registry> = OnceLock::new();
static RPC_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static RPC_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
static GATE_REJECTIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static VALIDATION_FAILURES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

fn register_collector<T>(collector: T) -> T
where
    T: prometheus::core::Collector + Clone + 'static,
{
    let _ = registry().register(Box::new(collector.clone()));
    collector
}

fn rpc_requests_total() -> &'static IntCounterVec {
    RPC_REQUESTS_TOTAL.get_or_init(|| {
        register_collector(
            IntCounterVec::new(
                Opts::new("infokeeper_rpc_requests_total", "Vault RPC request count."),
                &["operation", "status"],
            )
            .expect("create infokeeper_rpc_requests_total"),
        )
    })
}

fn rpc_request_duration_seconds() -> &'static HistogramVec {
    RPC_REQUEST_DURATION_SECONDS.get_or_init(|| {
        register_collector(
            HistogramVec::new(
                HistogramOpts::new(
                    "infokeeper_rpc_request_duration_seconds",
                    "Vault RPC request duration in seconds.",
                )
                .buckets(vec![
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
                ]),
                &["operation", "status"],
            )
            .expect("create infokeeper_rpc_request_duration_seconds"),
        )
    })
}

fn gate_rejections_total() -> &'static IntCounterVec {
    GATE_REJECTIONS_TOTAL.get_or_init(|| {
        register_collector(
            IntCounterVec::new(
                Opts::new(
                    "infokeeper_gate_rejections_total",
                    "Requests rejected by the authorization gate.",
                ),
                &["operation", "reason"],
            )
            .expect("create infokeeper_gate_rejections_total"),
        )
    })
}

fn validation_failures_total() -> &'static IntCounterVec {
    VALIDATION_FAILURES_TOTAL.get_or_init(|| {
        register_collector(
            IntCounterVec::new(
                Opts::new(
                    "infokeeper_validation_failures_total",
                    "Requests rejected with field violations.",
                ),
                &["operation"],
            )
            .expect("create infokeeper_validation_failures_total"),
        )
    })
}

pub fn observe_rpc(operation: &str, status: &str, duration: Duration) {
    rpc_requests_total()
        .with_label_values(&[operation, status])
        .inc();
    rpc_request_duration_seconds()
        .with_label_values(&[operation, status])
        .observe(duration.as_secs_f64());
}

pub fn inc_gate_rejection(operation: &str, reason: &str) {
    gate_rejections_total()
        .with_label_values(&[operation, reason])
        .inc();
}

pub fn inc_validation_failure(operation: &str) {
    validation_failures_total()
        .with_label_values(&[operation])
        .inc();
}

pub fn render() -> Result<(Vec<u8>, String), prometheus::Error> {
    let _ = rpc_requests_total();
    let _ = gate_rejections_total();

    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok((buffer, encoder.format_type().to_string()))
}
