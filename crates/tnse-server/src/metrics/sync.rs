//! Descriptions of the metrics emitted by the refresh coordinator.

/// Describes the refresh and retry metrics.
pub fn register_sync_metrics() {
    metrics::describe_counter!(
        "tnse_refresh_total",
        "Refresh cycles by outcome (success, failed, auth_failed)"
    );
    metrics::describe_histogram!(
        "tnse_refresh_duration_seconds",
        "Duration of a refresh cycle in seconds"
    );
    metrics::describe_counter!(
        "tnse_api_retries_total",
        "Retried upstream API calls by operation"
    );
}
