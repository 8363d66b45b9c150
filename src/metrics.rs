// Prometheus metrics for the gateway
//
// Exposed on the /metrics HTTP endpoint:
// - Submissions by outcome (counter)
// - Recipients charged to quotas (counter)
// - Retrievals by outcome (counter)
// - Dispatch latency (histogram)
// - Registered applications (gauge)

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Histogram, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref SUBMISSIONS_TOTAL: CounterVec = CounterVec::new(
        prometheus::Opts::new("sms_submissions_total", "Message submissions by outcome"),
        &["outcome"]
    ).expect("Failed to create submissions metric");

    pub static ref RECIPIENTS_ADMITTED_TOTAL: IntCounter = IntCounter::new(
        "sms_recipients_admitted_total",
        "Recipients charged against application quotas"
    ).expect("Failed to create recipients metric");

    pub static ref RETRIEVALS_TOTAL: CounterVec = CounterVec::new(
        prometheus::Opts::new("sms_retrievals_total", "Message lookups by outcome"),
        &["outcome"]
    ).expect("Failed to create retrievals metric");

    pub static ref DISPATCH_DURATION_SECONDS: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new("sms_dispatch_duration_seconds", "Time to handle a submission"),
    ).expect("Failed to create dispatch duration metric");

    pub static ref APPLICATIONS_REGISTERED: IntGauge = IntGauge::new(
        "sms_applications_registered",
        "Applications currently registered"
    ).expect("Failed to create applications metric");
}

/// Register all gateway metrics - call once at startup
pub fn init() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(SUBMISSIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECIPIENTS_ADMITTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RETRIEVALS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DISPATCH_DURATION_SECONDS.clone()))?;
    REGISTRY.register(Box::new(APPLICATIONS_REGISTERED.clone()))?;
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}

pub fn record_submission(outcome: &str) {
    SUBMISSIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_retrieval(outcome: &str) {
    RETRIEVALS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Refresh the registered-application gauge from the directory size
pub fn set_applications_registered(count: usize) {
    APPLICATIONS_REGISTERED.set(i64::try_from(count).unwrap_or(i64::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_counter() {
        let before = SUBMISSIONS_TOTAL.with_label_values(&["accepted"]).get();
        record_submission("accepted");
        assert!(SUBMISSIONS_TOTAL.with_label_values(&["accepted"]).get() >= before + 1.0);
    }

    #[test]
    fn test_gather_after_init() {
        // May already be registered by another test in this process
        let _ = init();
        RECIPIENTS_ADMITTED_TOTAL.inc_by(2);
        let text = gather_metrics().unwrap();
        assert!(text.contains("sms_recipients_admitted_total"));
    }
}
