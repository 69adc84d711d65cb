//! # Validation Core
//!
//! [`GatewayValidator`] owns the committed snapshot and decides whether a
//! proposed change may be admitted. Every entry point takes the write half
//! of one lock for its whole duration, so concurrent calls are serialized
//! and each sees everything earlier calls committed.
//!
//! A single-resource call clones the committed snapshot, applies the change
//! to the clone, translates every proxy, runs the xDS validator on each
//! rendered proxy and finally the extension validator. Errors are collected,
//! never short-circuited. The clone replaces the committed snapshot only
//! when nothing failed and the call is not a dry run.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info, warn, Instrument};

use super::context::ValidationContext;
use super::differential::RunSummary;
use super::extensions::{ExtensionValidator, PluginExtensionValidator};
use super::outcome::{ValidationOutcome, ValidationReports};
use crate::config::ValidationConfig;
use crate::domain::{Gvk, Proxy, Resource, ResourceKind};
use crate::errors::{ValidationError, ValidationErrors};
use crate::observability::MetricsRecorder;
use crate::snapshot::ApiSnapshot;
use crate::translator::{gateways_by_proxy, GatewayTranslator, Translator};
use crate::xds::{proxy_errors, proxy_warnings, XdsProxyValidator, XdsValidator};

#[derive(Debug, Default)]
pub(super) struct ValidatorState {
    pub(super) latest: Option<ApiSnapshot>,
    pub(super) gateway_hash: Option<u64>,
    /// Set while the last translating sync failed validation.
    poisoned: Option<String>,
    valid_config: Option<bool>,
}

impl ValidatorState {
    fn ready_snapshot(&self) -> Result<&ApiSnapshot, ValidationError> {
        match (&self.latest, &self.poisoned) {
            (None, _) => Err(ValidationError::NotReady),
            (Some(_), Some(reason)) => Err(ValidationError::InvalidSnapshot(reason.clone())),
            (Some(snapshot), None) => Ok(snapshot),
        }
    }

    fn commit(&mut self, snapshot: ApiSnapshot) {
        self.gateway_hash = snapshot.gateway_hash().ok();
        self.latest = Some(snapshot);
    }

    fn set_valid_config(&mut self, metrics: &MetricsRecorder, valid: bool) {
        self.valid_config = Some(valid);
        metrics.set_valid_config(valid);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Intent {
    Upsert,
    Delete,
}

/// What happens to an accepted change.
#[derive(Debug, Clone, Copy)]
pub(super) struct Apply {
    /// Replace the committed snapshot with the proposed one.
    pub commit: bool,
    /// Update the `valid_config` gauge.
    pub record: bool,
}

/// The resource under validation as the xDS validator sees it.
#[derive(Clone, Copy)]
struct Mutation<'r> {
    resource: &'r Resource,
    should_delete: bool,
}

#[derive(Default)]
struct Run {
    reports: ValidationReports,
    errors: ValidationErrors,
    warnings: Vec<String>,
}

/// Admission-time validation of gateway configuration.
pub struct GatewayValidator {
    config: ValidationConfig,
    translator: Arc<dyn Translator>,
    xds_validator: Arc<dyn XdsValidator>,
    extension_validator: Arc<dyn ExtensionValidator>,
    pub(super) metrics: MetricsRecorder,
    pub(super) state: RwLock<ValidatorState>,
}

impl GatewayValidator {
    pub fn new(
        config: ValidationConfig,
        translator: Arc<dyn Translator>,
        xds_validator: Arc<dyn XdsValidator>,
        extension_validator: Arc<dyn ExtensionValidator>,
    ) -> Self {
        Self {
            config,
            translator,
            xds_validator,
            extension_validator,
            metrics: MetricsRecorder::new(),
            state: RwLock::new(ValidatorState::default()),
        }
    }

    /// Wire the gateway translator, the in-process xDS validator and the
    /// plugin extension validator.
    pub fn with_defaults(config: ValidationConfig) -> Self {
        let translator = Arc::new(GatewayTranslator::new(&config));
        Self::new(
            config,
            translator,
            Arc::new(XdsProxyValidator::new()),
            Arc::new(PluginExtensionValidator::new()),
        )
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// A clone of the committed snapshot, `None` before the first sync.
    pub async fn latest_snapshot(&self) -> Option<ApiSnapshot> {
        self.state.read().await.latest.clone()
    }

    /// Last value written to the `valid_config` gauge.
    pub async fn valid_config(&self) -> Option<bool> {
        self.state.read().await.valid_config
    }

    pub async fn is_ready(&self) -> bool {
        self.state.read().await.latest.is_some()
    }

    pub async fn is_poisoned(&self) -> bool {
        self.state.read().await.poisoned.is_some()
    }

    /// Install a full snapshot from the snapshot source.
    ///
    /// When the gateway-shape resources are unchanged the snapshot is
    /// swapped in without translating and the ready/poisoned state is kept.
    /// Otherwise every proxy is translated; a failure poisons the core until
    /// a later sync succeeds.
    pub async fn sync(&self, snapshot: ApiSnapshot) -> Result<(), ValidationErrors> {
        let span = crate::validation_span!("sync", resources = snapshot.len());
        async move {
            let started = Instant::now();
            let mut state = self.state.write().await;

            let hash = match snapshot.gateway_hash() {
                Ok(hash) => Some(hash),
                Err(e) => {
                    warn!(error = %e, "Could not hash gateway resources, translating snapshot");
                    None
                }
            };

            if state.latest.is_some() && hash.is_some() && hash == state.gateway_hash {
                state.latest = Some(snapshot);
                self.metrics.record_sync("unchanged");
                debug!("Gateway resources unchanged, skipping translation");
                return match &state.poisoned {
                    None => Ok(()),
                    Some(reason) => Err(ValidationError::InvalidSnapshot(reason.clone()).into()),
                };
            }

            let strict = self.config.strict();
            let mut errors = ValidationErrors::new();
            let proxies = gateways_by_proxy(&snapshot, &self.config.default_proxy_name);
            for (proxy_name, gateways) in &proxies {
                let (_, reports) = self.translator.translate(proxy_name, &snapshot, gateways);
                if let Err(e) = reports.validate_with(strict) {
                    errors.push(ValidationError::CouldNotRenderProxy {
                        proxy: proxy_name.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            state.latest = Some(snapshot);
            state.gateway_hash = hash;
            let valid = errors.is_empty();
            state.set_valid_config(&self.metrics, valid);
            self.metrics
                .record_validation("sync", valid, started.elapsed().as_secs_f64());

            if valid {
                state.poisoned = None;
                self.metrics.record_sync("ready");
                info!(proxies = proxies.len(), "Snapshot synced");
                Ok(())
            } else {
                state.poisoned = Some(errors.to_string());
                self.metrics.record_sync("poisoned");
                warn!(
                    errors = %errors,
                    "Snapshot failed validation, rejecting changes until it is repaired"
                );
                Err(errors)
            }
        }
        .instrument(span)
        .await
    }

    /// Validate creating or updating `resource`.
    pub async fn validate_modified_gvk(
        &self,
        ctx: &ValidationContext,
        gvk: &Gvk,
        resource: Resource,
        dry_run: bool,
    ) -> ValidationOutcome {
        self.validate_single(
            "validate_modified_gvk",
            ctx,
            gvk,
            resource,
            Intent::Upsert,
            dry_run,
        )
        .await
    }

    /// Validate deleting `resource`. Only its kind and reference are used.
    pub async fn validate_deleted_gvk(
        &self,
        ctx: &ValidationContext,
        gvk: &Gvk,
        resource: Resource,
        dry_run: bool,
    ) -> ValidationOutcome {
        self.validate_single(
            "validate_deleted_gvk",
            ctx,
            gvk,
            resource,
            Intent::Delete,
            dry_run,
        )
        .await
    }

    async fn validate_single(
        &self,
        operation: &'static str,
        ctx: &ValidationContext,
        gvk: &Gvk,
        resource: Resource,
        intent: Intent,
        dry_run: bool,
    ) -> ValidationOutcome {
        let started = Instant::now();
        let span = crate::validation_span!(
            operation,
            kind = %gvk,
            resource = %resource.reference(),
            dry_run
        );
        let outcome = async {
            let mut state = self.state.write().await;
            let apply = Apply {
                commit: !dry_run,
                record: !dry_run,
            };
            self.validate_resource(&mut state, ctx, gvk, resource, intent, apply)
                .await
        }
        .instrument(span)
        .await;

        self.metrics.record_validation(
            operation,
            outcome.is_accepted(),
            started.elapsed().as_secs_f64(),
        );
        outcome
    }

    /// The single-resource algorithm. The caller holds the write lock.
    pub(super) async fn validate_resource(
        &self,
        state: &mut ValidatorState,
        ctx: &ValidationContext,
        gvk: &Gvk,
        resource: Resource,
        intent: Intent,
        apply: Apply,
    ) -> ValidationOutcome {
        let mut proposed = match state.ready_snapshot() {
            Ok(snapshot) => snapshot.clone(),
            Err(e) => return ValidationOutcome::rejected(ValidationReports::default(), e),
        };

        let Some(kind) = ResourceKind::from_gvk(gvk) else {
            return ValidationOutcome::rejected(
                ValidationReports::default(),
                ValidationError::UnknownGvk(gvk.to_string()),
            );
        };
        if kind != resource.kind() {
            return ValidationOutcome::rejected(
                ValidationReports::default(),
                ValidationError::KindMismatch {
                    expected: gvk.to_string(),
                    actual: resource.gvk().to_string(),
                },
            );
        }

        let resource = match intent {
            Intent::Upsert => match proposed.upsert(resource.clone()) {
                Ok(()) => resource,
                Err(e) => return ValidationOutcome::rejected(ValidationReports::default(), e),
            },
            Intent::Delete => match proposed.remove(kind, &resource.reference()) {
                Ok(removed) => removed,
                Err(e) => return ValidationOutcome::rejected(ValidationReports::default(), e),
            },
        };

        let secret_delete = intent == Intent::Delete && kind == ResourceKind::Secret;
        let mutation = Mutation {
            resource: &resource,
            should_delete: intent == Intent::Delete,
        };

        let run = match self.run(ctx, &proposed, mutation, secret_delete).await {
            Ok(run) => run,
            Err(e) => {
                info!("Validation cancelled, discarding proposed snapshot");
                return ValidationOutcome::rejected(ValidationReports::default(), e);
            }
        };

        if secret_delete && !run.errors.is_empty() {
            if let Some(original) = state.latest.as_ref() {
                let kept = Mutation {
                    resource: &resource,
                    should_delete: false,
                };
                let pre = match self.run(ctx, original, kept, true).await {
                    Ok(pre) => pre,
                    Err(e) => return ValidationOutcome::rejected(run.reports, e),
                };

                let before = RunSummary::new(&pre.errors, &pre.warnings, &pre.reports.proxies);
                let after = RunSummary::new(&run.errors, &run.warnings, &run.reports.proxies);
                if after.equivalent(&before) {
                    info!(
                        secret = %resource.reference(),
                        errors = run.errors.len(),
                        "Secret delete leaves validation results unchanged, accepting"
                    );
                    if apply.commit {
                        state.commit(proposed);
                    }
                    return ValidationOutcome::accepted(run.reports);
                }
                debug!(
                    secret = %resource.reference(),
                    "Secret delete changes validation results"
                );
            }
        }

        let accepted = run.errors.is_empty();
        if accepted && apply.commit {
            state.commit(proposed);
        }
        if apply.record {
            state.set_valid_config(&self.metrics, accepted);
        }

        if accepted {
            debug!(
                proxies = run.reports.proxies.len(),
                warnings = run.warnings.len(),
                "Change accepted"
            );
            ValidationOutcome::accepted(run.reports)
        } else {
            info!(errors = %run.errors, "Change rejected");
            ValidationOutcome {
                reports: run.reports,
                errors: Some(run.errors),
            }
        }
    }

    /// Translate and validate every proxy of `snapshot`, then run the
    /// extension validator. Only cancellation ends a run early.
    async fn run(
        &self,
        ctx: &ValidationContext,
        snapshot: &ApiSnapshot,
        mutation: Mutation<'_>,
        secret_delete: bool,
    ) -> Result<Run, ValidationError> {
        let strict = self.config.strict();
        let mut run = Run::default();

        let proxies = gateways_by_proxy(snapshot, &self.config.default_proxy_name);
        for (proxy_name, gateways) in proxies {
            if ctx.is_cancelled() {
                return Err(ValidationError::Cancelled);
            }

            let (proxy, reports) = self.translator.translate(&proxy_name, snapshot, &gateways);
            run.warnings.extend(reports.warning_messages());
            let rendered = reports.validate_with(strict);
            run.reports.resource_reports.merge(reports);

            // Secrets never reach the translator, so its errors match before and after.
            if let Err(e) = rendered {
                if !secret_delete {
                    debug!(proxy = %proxy_name, error = %e, "Proxy could not be rendered");
                    run.errors.push(ValidationError::CouldNotRenderProxy {
                        proxy: proxy_name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            }

            let Some(proxy) = proxy else {
                continue;
            };
            self.validate_proxy(ctx, snapshot, &proxy_name, &proxy, mutation, &mut run)
                .await?;
        }

        if ctx.is_cancelled() {
            return Err(ValidationError::Cancelled);
        }

        let extension_reports = self.extension_validator.validate(snapshot);
        run.warnings.extend(extension_reports.warning_messages());
        if let Err(e) = extension_reports.validate_with(strict) {
            run.errors.push(ValidationError::FailedResourceReports(e.to_string()));
        }
        run.reports.resource_reports.merge(extension_reports);

        Ok(run)
    }

    async fn validate_proxy(
        &self,
        ctx: &ValidationContext,
        snapshot: &ApiSnapshot,
        proxy_name: &str,
        proxy: &Proxy,
        mutation: Mutation<'_>,
        run: &mut Run,
    ) -> Result<(), ValidationError> {
        let strict = self.config.strict();
        let budget = ctx.budget(self.config.xds_validation_timeout());
        let call = self.xds_validator.validate(
            snapshot,
            proxy,
            Some(mutation.resource),
            mutation.should_delete,
        );

        let result = tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => return Err(ValidationError::Cancelled),
            result = tokio::time::timeout(budget, call) => result,
        };

        let reports = match result {
            Ok(Ok(reports)) => reports,
            Ok(Err(e)) => {
                warn!(proxy = %proxy_name, error = %e, "xDS validation failed");
                run.errors.push(ValidationError::XdsValidation {
                    proxy: proxy_name.to_string(),
                    reason: e.to_string(),
                });
                return Ok(());
            }
            Err(_) => {
                warn!(proxy = %proxy_name, budget = ?budget, "xDS validation timed out");
                run.errors.push(ValidationError::XdsValidation {
                    proxy: proxy_name.to_string(),
                    reason: "deadline exceeded".to_string(),
                });
                return Ok(());
            }
        };

        if reports.len() != 1 {
            warn!(
                proxy = %proxy_name,
                received = reports.len(),
                "Unexpected number of xDS validation reports"
            );
            run.errors.push(ValidationError::XdsValidationResponseLength {
                proxy: proxy_name.to_string(),
                received: reports.len(),
            });
        }

        for report in reports {
            run.warnings.extend(report.proxy_report.warnings());
            if let Err(reason) = proxy_errors(&report.proxy_report) {
                run.errors.push(ValidationError::FailedXdsValidation {
                    proxy: proxy_name.to_string(),
                    reason,
                });
            }
            if strict {
                if let Err(reason) = proxy_warnings(&report.proxy_report) {
                    run.errors.push(ValidationError::FailedXdsValidation {
                        proxy: proxy_name.to_string(),
                        reason,
                    });
                }
            }

            run.warnings.extend(report.resource_reports.warning_messages());
            if let Err(e) = report.resource_reports.validate_with(strict) {
                run.errors.push(ValidationError::FailedXdsValidation {
                    proxy: proxy_name.to_string(),
                    reason: e.to_string(),
                });
            }
            run.reports.resource_reports.merge(report.resource_reports);
            let rendered = report.proxy.unwrap_or_else(|| proxy.clone());
            run.reports.proxies.push(rendered);
            run.reports.proxy_reports.push(report.proxy_report);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        GatewaySpec, HttpGateway, Object, ResourceRef, Route, SecretSpec, TlsSecret, UpstreamSpec,
        UpstreamSslConfig, VirtualServiceSpec,
    };

    fn petstore() -> ResourceRef {
        ResourceRef::new("default", "petstore")
    }

    fn vs(name: &str, domain: &str) -> Resource {
        let routes = vec![Route::to_upstream("/", petstore())];
        Object::new(
            "default",
            name,
            VirtualServiceSpec::with_domains(&[domain], routes),
        )
        .into()
    }

    fn base() -> ApiSnapshot {
        ApiSnapshot::from_resources(vec![
            Object::new(
                "flowgate-system",
                "http",
                GatewaySpec::http(8080, HttpGateway::default()),
            )
            .into(),
            Object::new(
                "default",
                "petstore",
                UpstreamSpec::static_host("10.0.0.1", 8080),
            )
            .into(),
            vs("petstore", "petstore.com"),
        ])
        .unwrap()
    }

    async fn ready(config: ValidationConfig, snapshot: ApiSnapshot) -> GatewayValidator {
        let validator = GatewayValidator::with_defaults(config);
        validator.sync(snapshot).await.unwrap();
        validator
    }

    #[tokio::test]
    async fn test_not_ready_before_first_sync() {
        let validator = GatewayValidator::with_defaults(ValidationConfig::default());
        let resource = vs("shop", "shop.com");
        let outcome = validator
            .validate_modified_gvk(&ValidationContext::new(), &resource.gvk(), resource, false)
            .await;
        assert_eq!(outcome.errors, Some(ValidationError::NotReady.into()));
        assert_eq!(validator.valid_config().await, None);
    }

    #[tokio::test]
    async fn test_accepted_change_is_committed() {
        let validator = ready(ValidationConfig::default(), base()).await;
        let resource = vs("shop", "shop.com");
        let outcome = validator
            .validate_modified_gvk(&ValidationContext::new(), &resource.gvk(), resource, false)
            .await;

        assert!(outcome.is_accepted(), "{:?}", outcome.errors);
        assert_eq!(outcome.reports.proxies.len(), 1);
        assert_eq!(outcome.reports.proxies[0].spec.clusters.len(), 1);
        let latest = validator.latest_snapshot().await.unwrap();
        let shop = ResourceRef::new("default", "shop");
        assert!(latest.contains(ResourceKind::VirtualService, &shop));
        assert_eq!(validator.valid_config().await, Some(true));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_state_alone() {
        let validator = ready(ValidationConfig::default(), base()).await;
        let before = validator.latest_snapshot().await;

        let conflicting = vs("clash", "petstore.com");
        let outcome = validator
            .validate_modified_gvk(
                &ValidationContext::new(),
                &conflicting.gvk(),
                conflicting,
                true,
            )
            .await;
        assert!(outcome.has_error(|e| matches!(e, ValidationError::CouldNotRenderProxy { .. })));
        assert_eq!(validator.latest_snapshot().await, before);
        assert_eq!(validator.valid_config().await, Some(true));
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_rejected() {
        let validator = ready(ValidationConfig::default(), base()).await;
        let resource = vs("shop", "shop.com");
        let outcome = validator
            .validate_modified_gvk(
                &ValidationContext::new(),
                &ResourceKind::Upstream.gvk(),
                resource,
                false,
            )
            .await;
        assert!(outcome.has_error(|e| matches!(e, ValidationError::KindMismatch { .. })));
    }

    #[tokio::test]
    async fn test_deleting_a_missing_resource_is_not_found() {
        let validator = ready(ValidationConfig::default(), base()).await;
        let resource = vs("ghost", "ghost.com");
        let outcome = validator
            .validate_deleted_gvk(&ValidationContext::new(), &resource.gvk(), resource, false)
            .await;
        assert!(outcome.has_error(|e| matches!(e, ValidationError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_calls_do_not_commit() {
        let validator = ready(ValidationConfig::default(), base()).await;
        let ctx = ValidationContext::new();
        ctx.cancellation().cancel();

        let resource = vs("shop", "shop.com");
        let outcome = validator
            .validate_modified_gvk(&ctx, &resource.gvk(), resource, false)
            .await;
        assert_eq!(outcome.errors, Some(ValidationError::Cancelled.into()));
        let latest = validator.latest_snapshot().await.unwrap();
        let shop = ResourceRef::new("default", "shop");
        assert!(!latest.contains(ResourceKind::VirtualService, &shop));
    }

    #[tokio::test]
    async fn test_secret_delete_with_a_consumer_is_rejected() {
        let mut snapshot = base();
        let mut upstream = UpstreamSpec::static_host("10.0.0.1", 8443);
        upstream.ssl_config = Some(UpstreamSslConfig {
            secret_ref: Some(ResourceRef::new("default", "tls")),
            sni: None,
        });
        snapshot
            .upsert(Object::new("default", "petstore", upstream).into())
            .unwrap();
        let secret: Resource = Object::new(
            "default",
            "tls",
            SecretSpec::Tls(TlsSecret {
                cert_chain: "cert".into(),
                private_key: "key".into(),
                root_ca: None,
            }),
        )
        .into();
        snapshot.upsert(secret.clone()).unwrap();

        let validator = ready(ValidationConfig::default(), snapshot).await;
        let outcome = validator
            .validate_deleted_gvk(&ValidationContext::new(), &secret.gvk(), secret, false)
            .await;
        assert!(outcome.has_error(|e| matches!(e, ValidationError::FailedXdsValidation { .. })));
        let latest = validator.latest_snapshot().await.unwrap();
        assert!(latest.contains(ResourceKind::Secret, &ResourceRef::new("default", "tls")));
    }
}
