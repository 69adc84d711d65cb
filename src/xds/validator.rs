//! In-process downstream validator.
//!
//! Resolves upstreams and secrets for a translated proxy, fills in its
//! clusters and runs the Envoy resource checks over the converted protobufs.

use async_trait::async_trait;
use std::borrow::Cow;
use tracing::{debug, warn};

use super::conversion::{cluster_to_envoy, listener_to_envoy, route_configuration};
use super::report::{ListenerReport, ProxyReport, RouteReport, VirtualHostReport};
use super::{XdsValidationReport, XdsValidator};
use crate::domain::{
    cluster_name, Cluster, ClusterEndpoint, ClusterTls, FilterChain, Listener, Proxy, ProxyRoute,
    ProxyRouteAction, Resource, ResourceKind, ResourceRef, RouteAction, Upstream,
};
use crate::errors::{FlowgateError, Result};
use crate::reports::{ResourceKey, ResourceReports};
use crate::snapshot::ApiSnapshot;
use crate::validation::envoy_validation::{
    validate_envoy_cluster, validate_envoy_listener, validate_envoy_route_configuration,
};

pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone, Default)]
pub struct XdsProxyValidator;

impl XdsProxyValidator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl XdsValidator for XdsProxyValidator {
    async fn validate(
        &self,
        snapshot: &ApiSnapshot,
        proxy: &Proxy,
        resource: Option<&Resource>,
        should_delete: bool,
    ) -> Result<Vec<XdsValidationReport>> {
        let view = overlay(snapshot, resource, should_delete)?;
        let mut resource_reports = ResourceReports::new();

        let clusters: Vec<Cluster> = view
            .upstreams
            .iter()
            .map(|upstream| materialize_cluster(&view, upstream, &mut resource_reports))
            .collect();

        for cluster in clusters.iter().filter(|c| !c.endpoints.is_empty()) {
            if let Err(e) = validate_envoy_cluster(&cluster_to_envoy(cluster)) {
                warn!(cluster = %cluster.name, error = %e, "Cluster failed envoy validation");
                resource_reports.add_error(upstream_key(&cluster.upstream), e.to_string());
            }
        }

        let mut materialized = proxy.clone();
        materialized.spec.clusters = clusters;

        let proxy_report = ProxyReport {
            listener_reports: materialized
                .spec
                .listeners
                .iter()
                .map(|listener| validate_listener(&view, listener))
                .collect(),
        };

        debug!(
            proxy = %materialized.reference(),
            clusters = materialized.spec.clusters.len(),
            proxy_errors = proxy_report.errors().len(),
            proxy_warnings = proxy_report.warnings().len(),
            "Validated proxy against xds resources"
        );

        Ok(vec![XdsValidationReport {
            proxy: Some(materialized),
            proxy_report,
            resource_reports,
        }])
    }
}

/// The snapshot as the admitted change would leave it.
fn overlay<'a>(
    snapshot: &'a ApiSnapshot,
    resource: Option<&Resource>,
    should_delete: bool,
) -> Result<Cow<'a, ApiSnapshot>> {
    let Some(resource) = resource else {
        return Ok(Cow::Borrowed(snapshot));
    };

    let reference = resource.reference();
    if should_delete {
        if !snapshot.contains(resource.kind(), &reference) {
            return Ok(Cow::Borrowed(snapshot));
        }
        let mut view = snapshot.clone();
        view.remove(resource.kind(), &reference)
            .map_err(|e| FlowgateError::internal(e.to_string()))?;
        return Ok(Cow::Owned(view));
    }

    match snapshot.find(resource.kind(), &reference) {
        Ok(stored) if &stored == resource => Ok(Cow::Borrowed(snapshot)),
        _ => {
            let mut view = snapshot.clone();
            view.upsert(resource.clone())
                .map_err(|e| FlowgateError::validation(e.to_string()))?;
            Ok(Cow::Owned(view))
        }
    }
}

fn upstream_key(reference: &ResourceRef) -> ResourceKey {
    ResourceKey::new(ResourceKind::Upstream, reference.clone())
}

fn materialize_cluster(
    view: &ApiSnapshot,
    upstream: &Upstream,
    reports: &mut ResourceReports,
) -> Cluster {
    let reference = upstream.reference();
    let key = upstream_key(&reference);
    reports.accept(key.clone());

    if upstream.spec.hosts.is_empty() {
        reports.add_error(key.clone(), "upstream has no hosts");
    }

    let tls = upstream.spec.ssl_config.as_ref().map(|ssl| {
        let certificate_digest = ssl
            .secret_ref
            .as_ref()
            .and_then(|secret_ref| secret_digest(view, secret_ref, &key, reports));
        ClusterTls {
            sni: ssl.sni.clone(),
            secret_ref: ssl.secret_ref.clone(),
            certificate_digest,
        }
    });

    Cluster {
        name: cluster_name(&reference),
        upstream: reference,
        endpoints: upstream
            .spec
            .hosts
            .iter()
            .map(|host| ClusterEndpoint {
                address: host.address.clone(),
                port: host.port,
                weight: host.weight.unwrap_or(1),
            })
            .collect(),
        lb_policy: upstream.spec.load_balancer,
        connect_timeout_seconds: upstream
            .spec
            .connect_timeout_seconds
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECONDS),
        tls,
    }
}

/// Digest of the TLS secret behind `secret_ref`. A missing or non-TLS
/// secret is an error on `key`.
fn secret_digest(
    view: &ApiSnapshot,
    secret_ref: &ResourceRef,
    key: &ResourceKey,
    reports: &mut ResourceReports,
) -> Option<String> {
    let Some(secret) = view.secret(secret_ref) else {
        reports.add_error(
            key.clone(),
            format!("secret {} does not exist", secret_ref),
        );
        return None;
    };
    match secret.spec.tls() {
        Some(tls) => Some(tls.digest()),
        None => {
            reports.add_error(
                key.clone(),
                format!("secret {} is not a TLS secret", secret_ref),
            );
            None
        }
    }
}

fn validate_listener(view: &ApiSnapshot, listener: &Listener) -> ListenerReport {
    let mut report = ListenerReport {
        name: listener.name.clone(),
        ..Default::default()
    };

    for chain in &listener.filter_chains {
        check_chain_tls(view, chain, &mut report);

        for host in &chain.tcp_hosts {
            if view.upstream(&host.destination).is_none() {
                report.warnings.push(format!(
                    "tcp host {}: upstream {} does not exist",
                    host.name, host.destination
                ));
            }
        }

        for vhost in &chain.virtual_hosts {
            report.virtual_host_reports.push(VirtualHostReport {
                name: vhost.name.clone(),
                route_reports: vhost
                    .routes
                    .iter()
                    .map(|route| validate_route(view, route))
                    .collect(),
                ..Default::default()
            });
        }
    }

    match listener_to_envoy(listener) {
        Err(e) => report.errors.push(e.to_string()),
        Ok(envoy_listener) => {
            if let Err(e) = validate_envoy_listener(&envoy_listener) {
                report.errors.push(e.to_string());
            }
            for chain in listener.filter_chains.iter().filter(|c| !c.is_tcp()) {
                match route_configuration(listener, chain) {
                    Ok(route_config) => {
                        if let Err(e) = validate_envoy_route_configuration(&route_config) {
                            report.errors.push(format!("filter chain {}: {}", chain.name, e));
                        }
                    }
                    Err(e) => report.errors.push(format!("filter chain {}: {}", chain.name, e)),
                }
            }
        }
    }

    report
}

fn check_chain_tls(view: &ApiSnapshot, chain: &FilterChain, report: &mut ListenerReport) {
    let Some(tls) = &chain.tls else {
        return;
    };
    let problem = match &tls.secret_ref {
        None => "ssl config has no secret".to_string(),
        Some(secret_ref) => match view.secret(secret_ref) {
            None => format!("secret {} does not exist", secret_ref),
            Some(secret) if secret.spec.tls().is_none() => {
                format!("secret {} is not a TLS secret", secret_ref)
            }
            Some(_) => return,
        },
    };
    report
        .errors
        .push(format!("filter chain {}: {}", chain.name, problem));
}

fn validate_route(view: &ApiSnapshot, route: &ProxyRoute) -> RouteReport {
    let mut report = RouteReport {
        name: route.name.clone(),
        ..Default::default()
    };

    if let ProxyRouteAction::Route(action) = &route.action {
        for upstream in action.upstreams() {
            if view.upstream(upstream).is_none() {
                report
                    .warnings
                    .push(format!("upstream {} does not exist", upstream));
            }
        }
        if let RouteAction::Multi(multi) = action {
            let total: u64 = multi.destinations.iter().map(|d| u64::from(d.weight)).sum();
            if total == 0 {
                report
                    .errors
                    .push("weighted destinations have a total weight of zero".to_string());
            }
        }
    }

    report
}
