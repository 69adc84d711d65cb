//! # Gateway Translation
//!
//! Turns the gateway-shape resources of a snapshot into one [`Proxy`] per
//! proxy name. Translation is pure and deterministic: problems never abort
//! it, they are attached to the resource that caused them in the returned
//! [`ResourceReports`].
//!
//! - `gateway`: listeners and filter chains per gateway
//! - `selector`: virtual service and route table selection
//! - `virtual_host`: virtual services to virtual hosts and routes
//! - `delegation`: route table delegation

mod delegation;
mod gateway;
mod selector;
mod virtual_host;

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::config::ValidationConfig;
use crate::domain::{Gateway, Object, Proxy, ProxySpec, ResourceKind};
use crate::reports::{ResourceKey, ResourceReports};
use crate::snapshot::ApiSnapshot;

/// Pure transform from one proxy's gateways to the proxy they render.
pub trait Translator: Send + Sync {
    /// Returns `None` for the proxy when no listener could be rendered.
    fn translate(
        &self,
        proxy_name: &str,
        snapshot: &ApiSnapshot,
        gateways: &[Gateway],
    ) -> (Option<Proxy>, ResourceReports);
}

/// Group the snapshot's gateways by the proxies they render into.
///
/// A gateway without proxy names belongs to `default_proxy_name`. Both the
/// map and each gateway list are ordered.
pub fn gateways_by_proxy(
    snapshot: &ApiSnapshot,
    default_proxy_name: &str,
) -> BTreeMap<String, Vec<Gateway>> {
    let mut grouped: BTreeMap<String, Vec<Gateway>> = BTreeMap::new();
    for gateway in &snapshot.gateways {
        if gateway.spec.proxy_names.is_empty() {
            grouped
                .entry(default_proxy_name.to_string())
                .or_default()
                .push(gateway.clone());
            continue;
        }
        for proxy_name in &gateway.spec.proxy_names {
            grouped.entry(proxy_name.clone()).or_default().push(gateway.clone());
        }
    }
    grouped
}

/// The gateway translator used by the validation core.
#[derive(Debug, Clone)]
pub struct GatewayTranslator {
    write_namespace: String,
    warn_on_route_short_circuiting: bool,
}

impl GatewayTranslator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            write_namespace: config.write_namespace.clone(),
            warn_on_route_short_circuiting: config.warn_on_route_short_circuiting,
        }
    }
}

impl Translator for GatewayTranslator {
    fn translate(
        &self,
        proxy_name: &str,
        snapshot: &ApiSnapshot,
        gateways: &[Gateway],
    ) -> (Option<Proxy>, ResourceReports) {
        let mut reports = ResourceReports::new();
        let mut listeners = Vec::new();
        let mut bound: HashMap<(String, u32), ResourceKey> = HashMap::new();

        for gateway in gateways {
            let key = ResourceKey::new(ResourceKind::Gateway, gateway.reference());
            reports.accept(key.clone());

            let bind = (gateway.spec.bind_address.clone(), gateway.spec.bind_port);
            if let Some(first) = bound.get(&bind) {
                let address = format!("{}:{}", bind.0, bind.1);
                reports.add_error(
                    first.clone(),
                    format!("bind address {} is also used by gateway {}", address, key.reference),
                );
                reports.add_error(
                    key.clone(),
                    format!("bind address {} is also used by gateway {}", address, first.reference),
                );
                continue;
            }
            bound.insert(bind, key.clone());

            if let Some(listener) = self.listener(snapshot, gateway, &key, &mut reports) {
                listeners.push(listener);
            }
        }

        debug!(
            proxy = %proxy_name,
            gateways = gateways.len(),
            listeners = listeners.len(),
            "Translated gateways"
        );

        if listeners.is_empty() {
            return (None, reports);
        }

        let spec = ProxySpec {
            listeners,
            clusters: Vec::new(),
        };
        let proxy = Object::new(self.write_namespace.clone(), proxy_name, spec);
        (Some(proxy), reports)
    }
}
