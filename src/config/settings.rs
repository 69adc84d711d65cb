//! # Configuration Settings
//!
//! Defines the configuration structure for the Flowgate validation core.

use crate::domain::Metadata;
use crate::errors::{FlowgateError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Validation core configuration
    #[validate(nested)]
    pub validation: ValidationConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(FlowgateError::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Checks the validator derive cannot express.
    fn validate_custom(&self) -> Result<()> {
        // Produced proxies are stored like any other resource, so their
        // name and namespace follow the same rules.
        let validation = &self.validation;
        Metadata::new(&validation.write_namespace, &validation.default_proxy_name)
            .validate()
            .map_err(|reason| {
                FlowgateError::validation(format!("Invalid proxy identity: {}", reason))
            })?;

        if self.observability.enable_metrics && self.observability.metrics_port == 0 {
            return Err(FlowgateError::validation(
                "Metrics port must be set when metrics are enabled",
            ));
        }

        Ok(())
    }
}

/// Validation core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ValidationConfig {
    /// Accept changes that only produce warnings
    pub allow_warnings: bool,

    /// Warn about routes made unreachable by an earlier catch-all prefix
    pub warn_on_route_short_circuiting: bool,

    /// Upper bound on each downstream xDS validation call
    #[validate(range(
        min = 1,
        max = 60000,
        message = "xDS validation timeout must be between 1 and 60000 milliseconds"
    ))]
    pub xds_validation_timeout_ms: u64,

    /// Proxy that gateways without explicit proxy names render into
    #[validate(length(min = 1, message = "Default proxy name cannot be empty"))]
    pub default_proxy_name: String,

    /// Namespace of the proxies produced by the translator
    #[validate(length(min = 1, message = "Write namespace cannot be empty"))]
    pub write_namespace: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allow_warnings: false,
            warn_on_route_short_circuiting: false,
            xds_validation_timeout_ms: 5000,
            default_proxy_name: "gateway-proxy".to_string(),
            write_namespace: "flowgate-system".to_string(),
        }
    }
}

impl ValidationConfig {
    /// Get the downstream validation timeout as Duration
    pub fn xds_validation_timeout(&self) -> Duration {
        Duration::from_millis(self.xds_validation_timeout_ms)
    }

    /// Warnings fail validation unless explicitly allowed.
    pub fn strict(&self) -> bool {
        !self.allow_warnings
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Prometheus exporter port
    #[validate(range(max = 65535, message = "Metrics port must be <= 65535"))]
    pub metrics_port: u16,

    /// Service name attached to logs
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            metrics_port: 9090,
            service_name: "flowgate".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if !self.enable_metrics || self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.validation.strict());
        assert_eq!(config.validation.xds_validation_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_range() {
        let mut config = AppConfig::default();
        config.validation.xds_validation_timeout_ms = 0;
        assert!(config.validate().is_err());

        config.validation.xds_validation_timeout_ms = 60_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_proxy_identity_must_be_dns_compatible() {
        let mut config = AppConfig::default();
        config.validation.write_namespace = "Flowgate_System".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.validation.default_proxy_name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_observability_config_metrics_address() {
        let config = ObservabilityConfig {
            enable_metrics: true,
            ..Default::default()
        };
        assert_eq!(config.metrics_bind_address(), Some("0.0.0.0:9090".to_string()));
        assert_eq!(ObservabilityConfig::default().metrics_bind_address(), None);

        let mut app = AppConfig::default();
        app.observability = ObservabilityConfig {
            enable_metrics: true,
            metrics_port: 0,
            ..Default::default()
        };
        assert!(app.validate().is_err());
    }

    #[test]
    fn test_allow_warnings_relaxes_predicate() {
        let config = ValidationConfig {
            allow_warnings: true,
            ..Default::default()
        };
        assert!(!config.strict());
    }
}
