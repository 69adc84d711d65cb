//! End-to-end admission scenarios against the default collaborators.

mod common;

use common::*;
use flowgate::domain::{Object, UpstreamSpec};
use flowgate::errors::ValidationError;
use flowgate::{ResourceKey, ResourceKind, ValidationConfig, ValidationContext};
use serde_json::Value;

#[tokio::test]
async fn test_upstream_update_is_accepted_and_committed() {
    let validator = ready_validator(ValidationConfig::default(), petstore_snapshot()).await;

    let spec = UpstreamSpec::static_host("10.0.0.2", 9090);
    let updated: flowgate::Resource = Object::new(NAMESPACE, "petstore", spec).into();
    let outcome = validator
        .validate_modified_gvk(&ValidationContext::new(), &updated.gvk(), updated, false)
        .await;

    assert!(
        outcome.is_accepted(),
        "unexpected errors: {:?}",
        outcome.error_messages()
    );
    assert_eq!(outcome.reports.proxies.len(), 1);
    let cluster = &outcome.reports.proxies[0].spec.clusters[0];
    assert_eq!(cluster.name, "petstore_default");
    assert_eq!(cluster.endpoints[0].port, 9090);

    let latest = validator.latest_snapshot().await.expect("synced");
    let stored = latest.upstream(&reference("petstore")).expect("upstream kept");
    assert_eq!(stored.spec.hosts[0].address, "10.0.0.2");
    assert_eq!(validator.valid_config().await, Some(true));
}

#[tokio::test]
async fn test_deleting_a_referenced_virtual_service_is_rejected() {
    let snapshot = snapshot(vec![
        hybrid_gateway("hybrid", 8080, &["v"]),
        upstream("u", 8080),
        virtual_service("v", "v.com", "u"),
    ]);
    let validator = ready_validator(ValidationConfig::default(), snapshot).await;

    let doomed = virtual_service("v", "v.com", "u");
    let outcome = validator
        .validate_deleted_gvk(&ValidationContext::new(), &doomed.gvk(), doomed, false)
        .await;

    assert!(!outcome.is_accepted());
    assert!(outcome.has_error(|e| matches!(e, ValidationError::CouldNotRenderProxy { .. })));
    assert!(
        outcome
            .error_messages()
            .iter()
            .any(|m| m.contains("virtual service default.v does not exist")),
        "unexpected errors: {:?}",
        outcome.error_messages()
    );

    let latest = validator.latest_snapshot().await.expect("synced");
    assert!(latest.contains(ResourceKind::VirtualService, &reference("v")));
    assert_eq!(validator.valid_config().await, Some(false));
}

#[tokio::test]
async fn test_secret_delete_with_unchanged_errors_is_accepted() {
    // The upstream already points at a secret that does not exist, so every
    // run reports the same error whether or not the unrelated secret is there.
    let snapshot = snapshot(vec![
        http_gateway("http", 8080),
        tls_upstream("petstore", "legacy-tls"),
        virtual_service("petstore", "petstore.com", "petstore"),
        tls_secret("unused"),
    ]);
    let validator = ready_validator(ValidationConfig::default(), snapshot).await;

    let secret = tls_secret("unused");
    let outcome = validator
        .validate_deleted_gvk(&ValidationContext::new(), &secret.gvk(), secret, false)
        .await;

    assert!(
        outcome.is_accepted(),
        "unexpected errors: {:?}",
        outcome.error_messages()
    );
    let upstream_report = outcome
        .reports
        .resource_reports
        .get(&ResourceKey::new(ResourceKind::Upstream, reference("petstore")))
        .expect("upstream reported");
    assert_eq!(
        upstream_report.errors,
        vec!["secret default.legacy-tls does not exist".to_string()]
    );

    let latest = validator.latest_snapshot().await.expect("synced");
    assert!(!latest.contains(ResourceKind::Secret, &reference("unused")));
}

#[tokio::test]
async fn test_secret_delete_that_breaks_an_upstream_is_rejected() {
    let snapshot = snapshot(vec![
        http_gateway("http", 8080),
        tls_upstream("petstore", "petstore-tls"),
        virtual_service("petstore", "petstore.com", "petstore"),
        tls_secret("petstore-tls"),
    ]);
    let validator = ready_validator(ValidationConfig::default(), snapshot).await;

    let secret = tls_secret("petstore-tls");
    let outcome = validator
        .validate_deleted_gvk(&ValidationContext::new(), &secret.gvk(), secret, false)
        .await;

    assert!(outcome.has_error(|e| matches!(e, ValidationError::FailedXdsValidation { .. })));
    assert!(outcome
        .error_messages()
        .iter()
        .any(|m| m.contains("secret default.petstore-tls does not exist")));

    let latest = validator.latest_snapshot().await.expect("synced");
    assert!(latest.contains(ResourceKind::Secret, &reference("petstore-tls")));
}

fn encoded(resources: &[flowgate::Resource]) -> Vec<Value> {
    resources
        .iter()
        .map(|r| r.to_value().expect("fixture encodes"))
        .collect()
}

#[tokio::test]
async fn test_list_validates_items_cumulatively() {
    let validator = ready_validator(ValidationConfig::default(), petstore_snapshot()).await;
    let items = encoded(&[
        virtual_service("x", "a.com", "petstore"),
        virtual_service("y", "a.com", "petstore"),
    ]);

    let outcome = validator
        .validate_list(&ValidationContext::new(), &items, false)
        .await;

    let errors = outcome
        .errors
        .as_ref()
        .expect("second item conflicts with the first");
    assert!(errors
        .iter()
        .all(|e| matches!(e, ValidationError::CouldNotRenderProxy { .. })));
    assert!(outcome
        .error_messages()
        .iter()
        .any(|m| m.contains("domain conflict: a.com")));

    let latest = validator.latest_snapshot().await.expect("synced");
    assert!(latest.contains(ResourceKind::VirtualService, &reference("x")));
    assert!(!latest.contains(ResourceKind::VirtualService, &reference("y")));
}

#[tokio::test]
async fn test_dry_run_list_restores_the_snapshot() {
    let validator = ready_validator(ValidationConfig::default(), petstore_snapshot()).await;
    let before = validator.latest_snapshot().await;
    let items = encoded(&[
        virtual_service("x", "a.com", "petstore"),
        virtual_service("y", "a.com", "petstore"),
    ]);

    let outcome = validator
        .validate_list(&ValidationContext::new(), &items, true)
        .await;

    // The second item still sees the first one during the call.
    assert!(outcome
        .error_messages()
        .iter()
        .any(|m| m.contains("domain conflict: a.com")));
    assert_eq!(validator.latest_snapshot().await, before);
    assert_eq!(validator.valid_config().await, Some(true));
}

#[tokio::test]
async fn test_list_reports_undecodable_items_and_continues() {
    let validator = ready_validator(ValidationConfig::default(), petstore_snapshot()).await;
    let mut items = vec![
        serde_json::json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "metadata": {"name": "w"}
        }),
        serde_json::json!({
            "apiVersion": "flowgate.io/v1",
            "kind": "Upstream",
            "metadata": {"name": "bad"},
            "spec": {"hosts": "nope"}
        }),
        serde_json::json!({"metadata": {"name": "anonymous"}}),
    ];
    items.extend(encoded(&[virtual_service("shop", "shop.com", "petstore")]));

    let outcome = validator
        .validate_list(&ValidationContext::new(), &items, false)
        .await;

    let errors = outcome.errors.expect("three items cannot be decoded");
    assert_eq!(errors.len(), 3);
    assert!(errors.contains(|e| matches!(e, ValidationError::UnknownGvk(_))));
    assert!(errors.contains(|e| matches!(
        e,
        ValidationError::Unmarshal { gvk, .. } if gvk.ends_with("Kind=Upstream")
    )));

    let latest = validator.latest_snapshot().await.expect("synced");
    assert!(latest.contains(ResourceKind::VirtualService, &reference("shop")));
}
