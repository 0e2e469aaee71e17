//! Prometheus metrics for review store operations
//!
//! Covers write volume (creates, edits, deletes, votes, moderation), rejected
//! writes by error code, and per-operation latency.

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Once;
use tracing::info;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref REVIEWS_CREATED_TOTAL: Counter = Counter::new(
        "agora_reviews_created_total",
        "Total number of reviews created"
    ).unwrap();

    pub static ref REVIEWS_UPDATED_TOTAL: Counter = Counter::new(
        "agora_reviews_updated_total",
        "Total number of review edits"
    ).unwrap();

    pub static ref REVIEWS_DELETED_TOTAL: Counter = Counter::new(
        "agora_reviews_deleted_total",
        "Total number of reviews deleted"
    ).unwrap();

    /// Helpfulness votes applied, by direction and whether the vote changed anything
    pub static ref HELPFUL_VOTES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("agora_helpful_votes_total", "Helpfulness vote calls"),
        &["helpful", "changed"]
    ).unwrap();

    pub static ref REVIEW_STATUS_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("agora_review_status_transitions_total", "Review moderation transitions"),
        &["from_status", "to_status"]
    ).unwrap();

    /// Writes refused by the store, by operation and error code
    pub static ref REJECTED_WRITES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("agora_rejected_writes_total", "Review writes rejected by the store"),
        &["operation", "code"]
    ).unwrap();

    pub static ref STORE_OP_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("agora_store_operation_seconds", "Review store operation duration")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["operation"]
    ).unwrap();
}

static INIT: Once = Once::new();

/// Register all metrics with the global registry
pub fn register_metrics() {
    INIT.call_once(|| {
        info!("Registering review store metrics");

        REGISTRY.register(Box::new(REVIEWS_CREATED_TOTAL.clone())).ok();
        REGISTRY.register(Box::new(REVIEWS_UPDATED_TOTAL.clone())).ok();
        REGISTRY.register(Box::new(REVIEWS_DELETED_TOTAL.clone())).ok();
        REGISTRY.register(Box::new(HELPFUL_VOTES_TOTAL.clone())).ok();
        REGISTRY.register(Box::new(REVIEW_STATUS_TRANSITIONS.clone())).ok();
        REGISTRY.register(Box::new(REJECTED_WRITES_TOTAL.clone())).ok();
        REGISTRY.register(Box::new(STORE_OP_DURATION.clone())).ok();
    });
}

/// Observes the elapsed time of one store operation when dropped
pub struct OperationTimer {
    operation: &'static str,
    start: std::time::Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        STORE_OP_DURATION
            .with_label_values(&[self.operation])
            .observe(self.start.elapsed().as_secs_f64());
    }
}

pub fn record_helpful_vote(helpful: bool, changed: bool) {
    HELPFUL_VOTES_TOTAL
        .with_label_values(&[bool_label(helpful), bool_label(changed)])
        .inc();
}

pub fn record_status_transition(from: &str, to: &str) {
    REVIEW_STATUS_TRANSITIONS.with_label_values(&[from, to]).inc();
}

pub fn record_rejected_write(operation: &str, code: &str) {
    REJECTED_WRITES_TOTAL.with_label_values(&[operation, code]).inc();
}

fn bool_label(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Get metrics as text for Prometheus scraping
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
