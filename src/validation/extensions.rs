//! Plugin resource validation.
//!
//! Runs once per validation call on the mutated snapshot, after every proxy
//! went through the xDS validator. Checks the auth and rate limit resources
//! themselves and every option that points at them.

use std::collections::HashSet;

use url::Url;

use crate::domain::{
    AuthConfig, AuthConfigEntry, RateLimitConfig, ResourceKind, ResourceRef, Route, RouteOptions,
    VirtualHostOptions,
};
use crate::reports::{ResourceKey, ResourceReports};
use crate::snapshot::ApiSnapshot;

/// Validates plugin-owned resources and references into them.
pub trait ExtensionValidator: Send + Sync {
    fn validate(&self, snapshot: &ApiSnapshot) -> ResourceReports;
}

/// External auth and rate limit checks.
#[derive(Debug, Clone, Default)]
pub struct PluginExtensionValidator;

impl PluginExtensionValidator {
    pub fn new() -> Self {
        Self
    }
}

impl ExtensionValidator for PluginExtensionValidator {
    fn validate(&self, snapshot: &ApiSnapshot) -> ResourceReports {
        let mut reports = ResourceReports::new();

        for auth_config in &snapshot.auth_configs {
            validate_auth_config(snapshot, auth_config, &mut reports);
        }
        for rate_limit_config in &snapshot.rate_limit_configs {
            validate_rate_limit_config(rate_limit_config, &mut reports);
        }

        for vs in &snapshot.virtual_services {
            let key = ResourceKey::new(ResourceKind::VirtualService, vs.reference());
            if let Some(options) = &vs.spec.virtual_host.options {
                check_virtual_host_options(snapshot, &key, options, &mut reports);
            }
            check_routes(snapshot, &key, &vs.spec.virtual_host.routes, &mut reports);
        }
        for table in &snapshot.route_tables {
            let key = ResourceKey::new(ResourceKind::RouteTable, table.reference());
            check_routes(snapshot, &key, &table.spec.routes, &mut reports);
        }
        for option in &snapshot.virtual_host_options {
            let key = ResourceKey::new(ResourceKind::VirtualHostOption, option.reference());
            check_virtual_host_options(snapshot, &key, &option.spec.options, &mut reports);
        }
        for option in &snapshot.route_options {
            let key = ResourceKey::new(ResourceKind::RouteOption, option.reference());
            check_route_options(snapshot, &key, &option.spec.options, &mut reports);
        }

        reports
    }
}

fn validate_auth_config(
    snapshot: &ApiSnapshot,
    auth_config: &AuthConfig,
    reports: &mut ResourceReports,
) {
    let key = ResourceKey::new(ResourceKind::AuthConfig, auth_config.reference());
    reports.accept(key.clone());

    if auth_config.spec.configs.is_empty() {
        reports.add_error(key.clone(), "auth config must define at least one config");
    }

    for (index, entry) in auth_config.spec.configs.iter().enumerate() {
        match entry {
            AuthConfigEntry::BasicAuth(_) => {}
            AuthConfigEntry::ApiKeyAuth(api_key) => {
                if api_key.secret_refs.is_empty() {
                    reports.add_error(
                        key.clone(),
                        format!("config {}: api key auth has no secret refs", index),
                    );
                }
                for secret in &api_key.secret_refs {
                    check_secret(snapshot, &key, index, secret, reports);
                }
            }
            AuthConfigEntry::Oauth2(oauth2) => {
                if let Err(reason) = check_issuer_url(&oauth2.issuer_url) {
                    reports.add_error(
                        key.clone(),
                        format!(
                            "config {}: invalid issuer url '{}': {}",
                            index, oauth2.issuer_url, reason
                        ),
                    );
                }
                if oauth2.client_id.trim().is_empty() {
                    reports.add_error(
                        key.clone(),
                        format!("config {}: oauth2 client id is empty", index),
                    );
                }
                if let Some(secret) = &oauth2.client_secret_ref {
                    check_secret(snapshot, &key, index, secret, reports);
                }
            }
        }
    }
}

fn check_issuer_url(issuer: &str) -> Result<(), String> {
    let url = Url::parse(issuer).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(()),
        "http" | "https" => Err("missing host".to_string()),
        scheme => Err(format!("unsupported scheme {}", scheme)),
    }
}

fn check_secret(
    snapshot: &ApiSnapshot,
    key: &ResourceKey,
    index: usize,
    secret: &ResourceRef,
    reports: &mut ResourceReports,
) {
    if snapshot.secret(secret).is_none() {
        reports.add_error(
            key.clone(),
            format!("config {}: secret {} does not exist", index, secret),
        );
    }
}

fn validate_rate_limit_config(config: &RateLimitConfig, reports: &mut ResourceReports) {
    let key = ResourceKey::new(ResourceKind::RateLimitConfig, config.reference());
    reports.accept(key.clone());

    let mut seen = HashSet::new();
    for (index, descriptor) in config.spec.descriptors.iter().enumerate() {
        if descriptor.key.trim().is_empty() {
            reports.add_error(
                key.clone(),
                format!("descriptor {}: key must not be empty", index),
            );
        }
        if descriptor.rate_limit.requests_per_unit == 0 {
            reports.add_error(
                key.clone(),
                format!("descriptor {}: requests per unit must be positive", index),
            );
        }
        if !seen.insert((descriptor.key.as_str(), descriptor.value.as_deref())) {
            reports.add_error(
                key.clone(),
                format!(
                    "descriptor {}: duplicate descriptor {}={}",
                    index,
                    descriptor.key,
                    descriptor.value.as_deref().unwrap_or("*")
                ),
            );
        }
    }
}

fn check_routes(
    snapshot: &ApiSnapshot,
    key: &ResourceKey,
    routes: &[Route],
    reports: &mut ResourceReports,
) {
    for options in routes.iter().filter_map(|route| route.options.as_ref()) {
        check_route_options(snapshot, key, options, reports);
    }
}

fn check_virtual_host_options(
    snapshot: &ApiSnapshot,
    key: &ResourceKey,
    options: &VirtualHostOptions,
    reports: &mut ResourceReports,
) {
    let (auth, rate_limits) = options.referenced_configs();
    check_references(snapshot, key, auth, rate_limits, reports);
}

fn check_route_options(
    snapshot: &ApiSnapshot,
    key: &ResourceKey,
    options: &RouteOptions,
    reports: &mut ResourceReports,
) {
    let (auth, rate_limits) = options.referenced_configs();
    check_references(snapshot, key, auth, rate_limits, reports);
}

fn check_references(
    snapshot: &ApiSnapshot,
    key: &ResourceKey,
    auth: Option<&ResourceRef>,
    rate_limits: &[ResourceRef],
    reports: &mut ResourceReports,
) {
    if let Some(auth) = auth {
        if snapshot.auth_config(auth).is_none() {
            reports.add_error(key.clone(), format!("auth config {} does not exist", auth));
        }
    }
    for rate_limit in rate_limits {
        if snapshot.rate_limit_config(rate_limit).is_none() {
            reports.add_error(
                key.clone(),
                format!("rate limit config {} does not exist", rate_limit),
            );
        }
    }
}
