//! Integration tests for observability setup
//!
//! Installing the global subscriber is process-wide, so these tests live in
//! their own binary away from the captured-log unit tests.

use flowgate::config::ObservabilityConfig;
use flowgate::observability::{init_logging, init_observability};

#[test]
fn test_init_observability() {
    let config = ObservabilityConfig {
        enable_metrics: false,
        ..Default::default()
    };
    assert!(init_observability(&config).is_ok());
}

#[test]
fn test_init_logging_tolerates_existing_subscriber() {
    init_logging(&ObservabilityConfig::default());
    init_logging(&ObservabilityConfig {
        json_logging: true,
        ..Default::default()
    });
}
