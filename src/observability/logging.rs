//! # Structured Logging
//!
//! Subscriber setup and span helpers built on the tracing ecosystem.
//!
//! Every validation entry point runs inside a span created with
//! [`validation_span!`](crate::validation_span), so log lines emitted while
//! translating or validating a proxy carry the operation and its id.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{AppConfig, ObservabilityConfig};

/// Create a tracing span for a validation operation.
///
/// ```rust,ignore
/// let span = validation_span!("validate_modified_gvk", kind = "VirtualService", dry_run = true);
/// ```
#[macro_export]
macro_rules! validation_span {
    ($operation:expr) => {
        tracing::info_span!(
            "validation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info_span!(
            "validation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over the configured level. A subscriber installed
/// elsewhere (tests, embedding applications) is left in place.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = FmtSubscriber::builder().with_env_filter(filter);
    let installed = if config.json_logging {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if installed.is_err() {
        tracing::debug!("Global tracing subscriber already installed");
    }
}

/// Log the effective configuration at startup.
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        default_proxy_name = %config.validation.default_proxy_name,
        write_namespace = %config.validation.write_namespace,
        allow_warnings = config.validation.allow_warnings,
        xds_validation_timeout_ms = config.validation.xds_validation_timeout_ms,
        metrics_enabled = config.observability.enable_metrics,
        "Flowgate validation configuration"
    );
}
