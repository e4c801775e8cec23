//! Metrics collection and Prometheus export.
//!
//! `init_metrics` installs the global recorder; the `record_*` helpers are
//! no-ops until it has run, which keeps tests free of global state.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init_metrics() -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    // A concurrent caller may have won the race; its handle is equivalent.
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Current metrics in Prometheus text format, for the /metrics endpoint.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

/// One call to the generative API. `outcome` is `success` or an error kind.
pub fn record_provider_request(operation: &'static str, outcome: &'static str, latency: Duration) {
    counter!(
        "studio_provider_requests_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    histogram!("studio_provider_latency_seconds", "operation" => operation)
        .record(latency.as_secs_f64());
}

pub fn record_image_saved(operation: &'static str) {
    counter!("studio_images_saved_total", "operation" => operation).increment(1);
}

pub fn record_cleanup(deleted: usize) {
    counter!("studio_cleanup_deleted_files_total").increment(deleted as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_does_not_panic() {
        record_provider_request("generate", "success", Duration::from_millis(5));
        record_image_saved("generate");
        record_cleanup(3);
    }
}
