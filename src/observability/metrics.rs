//! # Metrics Collection
//!
//! Validation metrics recorded through the `metrics` facade. Without an
//! installed recorder every call is a no-op; the Prometheus exporter is
//! available behind the `prometheus` feature.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

#[cfg(feature = "prometheus")]
use crate::config::ObservabilityConfig;
#[cfg(feature = "prometheus")]
use crate::errors::{FlowgateError, Result};

pub const VALID_CONFIG: &str = "valid_config";
pub const VALIDATION_REQUESTS_TOTAL: &str = "validation_requests_total";
pub const VALIDATION_DURATION_SECONDS: &str = "validation_duration_seconds";
pub const SNAPSHOT_SYNCS_TOTAL: &str = "snapshot_syncs_total";

/// Records validation outcomes.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    /// 1 when the last recorded outcome accepted the configuration, 0 otherwise.
    pub fn set_valid_config(&self, valid: bool) {
        gauge!(VALID_CONFIG).set(if valid { 1.0 } else { 0.0 });
    }

    /// Record one validation entry point call
    pub fn record_validation(&self, operation: &str, accepted: bool, duration: f64) {
        let outcome = if accepted { "accepted" } else { "rejected" };
        let labels = [("operation", operation.to_string()), ("outcome", outcome.to_string())];
        counter!(VALIDATION_REQUESTS_TOTAL, &labels).increment(1);

        let duration_labels = [("operation", operation.to_string())];
        histogram!(VALIDATION_DURATION_SECONDS, &duration_labels).record(duration);
    }

    /// Record a snapshot sync; `outcome` is `unchanged`, `ready` or `poisoned`.
    pub fn record_sync(&self, outcome: &str) {
        let labels = [("outcome", outcome.to_string())];
        counter!(SNAPSHOT_SYNCS_TOTAL, &labels).increment(1);
    }

    /// Register descriptions so exporters show the metrics before the first event.
    pub fn register_validation_metrics(&self) {
        describe_gauge!(
            VALID_CONFIG,
            Unit::Count,
            "Whether the last validated configuration was accepted"
        );
        describe_counter!(
            VALIDATION_REQUESTS_TOTAL,
            Unit::Count,
            "Validation calls grouped by operation and outcome"
        );
        describe_histogram!(
            VALIDATION_DURATION_SECONDS,
            Unit::Seconds,
            "Validation call duration"
        );
        describe_counter!(
            SNAPSHOT_SYNCS_TOTAL,
            Unit::Count,
            "Snapshot syncs grouped by outcome"
        );
    }
}

/// Install the Prometheus exporter when metrics are enabled.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;
    use tracing::{info, warn};

    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            warn!("Metrics disabled: no bind address configured");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        FlowgateError::config(format!(
            "Invalid metrics bind address '{}': {}",
            metrics_addr, e
        ))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| {
            FlowgateError::config(format!("Failed to initialize metrics exporter: {}", e))
        })?;

    MetricsRecorder::new().register_validation_metrics();

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let recorder = MetricsRecorder::new();
        recorder.register_validation_metrics();
        recorder.set_valid_config(true);
        recorder.record_validation("validate_modified_gvk", false, 0.01);
        recorder.record_sync("ready");
    }

    #[cfg(feature = "prometheus")]
    #[test]
    fn test_init_metrics_disabled() {
        let config = ObservabilityConfig {
            enable_metrics: false,
            ..Default::default()
        };
        assert!(init_metrics(&config).is_ok());
    }
}
