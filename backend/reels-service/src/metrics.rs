//! Prometheus metrics for reels-service
//!
//! Collectors register lazily on the default registry and are exported by
//! `GET /metrics`.

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Encoder, Histogram,
    IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Duration;

static RATE_LIMIT_DECISIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "reels_rate_limit_decisions_total",
        "Admission control decisions by action class and outcome",
        &["class", "outcome"]
    )
    .expect("Failed to register rate limit decisions metric")
});

static RATE_LIMIT_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "reels_rate_limit_entries",
        "Rate limit window entries held in memory after the last sweep"
    )
    .expect("Failed to register rate limit entries metric")
});

static PROCESSING_JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "reels_processing_jobs_total",
        "Media processing job transitions by status",
        &["status"]
    )
    .expect("Failed to register processing jobs metric")
});

static PROCESSING_JOB_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "reels_processing_job_duration_seconds",
        "Wall time from job start to terminal state",
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .expect("Failed to register processing job duration metric")
});

static FEED_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "reels_feed_requests_total",
        "Feed compositions by mode",
        &["mode"]
    )
    .expect("Failed to register feed requests metric")
});

static FEED_ENRICHMENT_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "reels_feed_enrichment_failures_total",
        "Per-item enrichment lookups that fell back to defaults",
        &["field"]
    )
    .expect("Failed to register feed enrichment failures metric")
});

/// Record an admission decision (`allowed` / `rejected`)
pub fn record_rate_limit_decision(class: &str, allowed: bool) {
    let outcome = if allowed { "allowed" } else { "rejected" };
    RATE_LIMIT_DECISIONS_TOTAL
        .with_label_values(&[class, outcome])
        .inc();
}

/// Set the number of live rate limit entries
pub fn set_rate_limit_entries(count: usize) {
    RATE_LIMIT_ENTRIES.set(count as i64);
}

/// Record a job entering `status`
pub fn record_job_status(status: &str) {
    PROCESSING_JOBS_TOTAL.with_label_values(&[status]).inc();
}

/// Record how long a job ran
pub fn record_job_duration(duration: Duration) {
    PROCESSING_JOB_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_feed_request(mode: &str) {
    FEED_REQUESTS_TOTAL.with_label_values(&[mode]).inc();
}

pub fn record_enrichment_failure(field: &str) {
    FEED_ENRICHMENT_FAILURES_TOTAL
        .with_label_values(&[field])
        .inc();
}

/// GET /metrics
pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", err);
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
