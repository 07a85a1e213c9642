//! Metrics facade for the curation pipeline.
//!
//! Ambient observability (2.1 of the expanded spec): per-stage input/output
//! counts, per-stage wall-clock, retry counts, figure counts, and
//! HTTP/LLM call latency histograms, recorded through the `metrics` crate
//! facade. Installing a concrete recorder (`metrics-exporter-prometheus`,
//! kept in the workspace dependency table for that purpose) is a deployment
//! concern left to the process that wires up the binary; both binaries here
//! only call `register_metrics()` and record through the facade.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

pub const METRICS_PREFIX: &str = "curator";

/// Registers every metric description this crate emits, so a Prometheus
/// exporter's `/metrics` scrape has help text even before the first event.
pub fn register_metrics() {
    describe_counter!(
        format!("{METRICS_PREFIX}_stage_input_total"),
        Unit::Count,
        "Papers entering a pipeline stage"
    );
    describe_counter!(
        format!("{METRICS_PREFIX}_stage_output_total"),
        Unit::Count,
        "Papers surviving a pipeline stage"
    );
    describe_histogram!(
        format!("{METRICS_PREFIX}_stage_duration_seconds"),
        Unit::Seconds,
        "Wall-clock time for a full stage run"
    );
    describe_counter!(
        format!("{METRICS_PREFIX}_retry_total"),
        Unit::Count,
        "Retry attempts issued by the shared backoff helper"
    );
    describe_counter!(
        format!("{METRICS_PREFIX}_figures_extracted_total"),
        Unit::Count,
        "Figures extracted and uploaded by the Post-L3 reviewer"
    );
    describe_histogram!(
        format!("{METRICS_PREFIX}_external_call_duration_seconds"),
        Unit::Seconds,
        "Latency of an outbound HTTP/LLM/embedding/object-store call"
    );
    describe_counter!(
        format!("{METRICS_PREFIX}_external_call_errors_total"),
        Unit::Count,
        "Outbound call failures, labeled by target and error kind"
    );

    tracing::info!("metrics registered");
}

/// Records the input/output counts and wall-clock for one stage run.
pub fn record_stage(stage: &'static str, input: usize, output: usize, duration_secs: f64) {
    counter!(format!("{METRICS_PREFIX}_stage_input_total"), "stage" => stage)
        .increment(input as u64);
    counter!(format!("{METRICS_PREFIX}_stage_output_total"), "stage" => stage)
        .increment(output as u64);
    histogram!(format!("{METRICS_PREFIX}_stage_duration_seconds"), "stage" => stage)
        .record(duration_secs);
}

/// Records one retry attempt against `target` (e.g. `"arxiv"`, `"l3_judge"`).
pub fn record_retry(target: &'static str) {
    counter!(format!("{METRICS_PREFIX}_retry_total"), "target" => target).increment(1);
}

/// Records the latency of an outbound call, and a failure counter when it
/// did not succeed.
pub fn record_external_call(target: &'static str, duration_secs: f64, success: bool) {
    histogram!(format!("{METRICS_PREFIX}_external_call_duration_seconds"), "target" => target)
        .record(duration_secs);
    if !success {
        counter!(format!("{METRICS_PREFIX}_external_call_errors_total"), "target" => target)
            .increment(1);
    }
}

/// Records the count of figures extracted and persisted for one paper.
pub fn record_figures_extracted(count: usize) {
    counter!(format!("{METRICS_PREFIX}_figures_extracted_total")).increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_and_retry_recording_do_not_panic() {
        record_stage("l1_fetch", 42, 30, 1.5);
        record_retry("arxiv");
        record_external_call("l3_judge", 0.2, true);
        record_external_call("post_l3_review", 1.1, false);
        record_figures_extracted(3);
    }
}
