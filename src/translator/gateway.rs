//! Gateways to listeners and filter chains.

use ipnet::IpNet;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::selector::{select_http_gateways, select_virtual_services};
use super::GatewayTranslator;
use crate::domain::{
    FilterChain, FilterChainTls, Gateway, GatewayType, HttpGateway, HybridGateway, Listener,
    MatchedGatewayType, Matcher, ProxyTcpHost, ResourceKind, ResourceRef, TcpGateway,
    VirtualService,
};
use crate::reports::{ResourceKey, ResourceReports};
use crate::snapshot::ApiSnapshot;

fn listener_name(bind_address: &str, bind_port: u32) -> String {
    format!("listener-{}-{}", bind_address, bind_port)
}

impl GatewayTranslator {
    /// Render one gateway. `None` when it has nothing to serve.
    pub(super) fn listener(
        &self,
        snapshot: &ApiSnapshot,
        gateway: &Gateway,
        key: &ResourceKey,
        reports: &mut ResourceReports,
    ) -> Option<Listener> {
        let spec = &gateway.spec;
        let filter_chains = match &spec.gateway_type {
            GatewayType::HttpGateway(http) => {
                self.http_chains(snapshot, "http", None, spec.ssl, http, key, reports)
            }
            GatewayType::TcpGateway(tcp) => tcp_chains("tcp", None, tcp),
            GatewayType::HybridGateway(hybrid) => {
                self.hybrid_chains(snapshot, hybrid, key, reports)
            }
        };

        if filter_chains.is_empty() {
            return None;
        }

        Some(Listener {
            name: listener_name(&spec.bind_address, spec.bind_port),
            bind_address: spec.bind_address.clone(),
            bind_port: spec.bind_port,
            filter_chains,
        })
    }

    /// Plain HTTP shares one filter chain; TLS gets one chain per virtual
    /// service so SNI can pick the certificate.
    #[allow(clippy::too_many_arguments)]
    fn http_chains(
        &self,
        snapshot: &ApiSnapshot,
        chain_name: &str,
        matcher: Option<&Matcher>,
        ssl: bool,
        http: &HttpGateway,
        owner: &ResourceKey,
        reports: &mut ResourceReports,
    ) -> Vec<FilterChain> {
        let selected = select_virtual_services(snapshot, owner, http, ssl, reports);
        check_domain_conflicts(&selected, reports);

        if !ssl {
            let virtual_hosts: Vec<_> = selected
                .iter()
                .map(|vs| self.virtual_host(snapshot, vs, reports))
                .collect();
            if virtual_hosts.is_empty() {
                return Vec::new();
            }
            return vec![FilterChain {
                name: chain_name.to_string(),
                matcher: matcher.cloned(),
                tls: None,
                virtual_hosts,
                tcp_hosts: Vec::new(),
            }];
        }

        selected
            .iter()
            .map(|vs| FilterChain {
                name: format!("{}-{}", chain_name, vs.reference()),
                matcher: matcher.cloned(),
                tls: Some(chain_tls(vs)),
                virtual_hosts: vec![self.virtual_host(snapshot, vs, reports)],
                tcp_hosts: Vec::new(),
            })
            .collect()
    }

    fn hybrid_chains(
        &self,
        snapshot: &ApiSnapshot,
        hybrid: &HybridGateway,
        key: &ResourceKey,
        reports: &mut ResourceReports,
    ) -> Vec<FilterChain> {
        let mut chains = Vec::new();
        let mut seen = HashSet::new();

        for (index, matched) in hybrid.matched_gateways.iter().enumerate() {
            let matcher = &matched.matcher;
            if !check_matcher(matcher, &mut seen, key, key, reports) {
                continue;
            }
            let chain_name = format!("matched-{}", index);
            match &matched.gateway_type {
                MatchedGatewayType::HttpGateway(http) => chains.extend(self.http_chains(
                    snapshot,
                    &chain_name,
                    Some(matcher),
                    matcher.ssl,
                    http,
                    key,
                    reports,
                )),
                MatchedGatewayType::TcpGateway(tcp) => {
                    chains.extend(tcp_chains(&chain_name, Some(matcher), tcp))
                }
            }
        }

        if let Some(delegated) = &hybrid.delegated_http_gateways {
            for http_gateway in select_http_gateways(snapshot, key, delegated, reports) {
                let child = ResourceKey::new(
                    ResourceKind::MatchableHttpGateway,
                    http_gateway.reference(),
                );
                reports.accept(child.clone());

                let matcher = &http_gateway.spec.matcher;
                if !check_matcher(matcher, &mut seen, &child, key, reports) {
                    continue;
                }
                chains.extend(self.http_chains(
                    snapshot,
                    &child.reference.to_string(),
                    Some(matcher),
                    matcher.ssl,
                    &http_gateway.spec.http_gateway,
                    &child,
                    reports,
                ));
            }
        }

        chains
    }
}

fn tcp_chains(chain_name: &str, matcher: Option<&Matcher>, tcp: &TcpGateway) -> Vec<FilterChain> {
    tcp.tcp_hosts
        .iter()
        .map(|host| FilterChain {
            name: format!("{}-{}", chain_name, host.name),
            matcher: matcher.cloned(),
            tls: None,
            virtual_hosts: Vec::new(),
            tcp_hosts: vec![ProxyTcpHost {
                name: host.name.clone(),
                destination: host.destination.clone(),
            }],
        })
        .collect()
}

/// SNI defaults to the virtual service's concrete domains.
fn chain_tls(virtual_service: &VirtualService) -> FilterChainTls {
    let ssl = virtual_service.spec.ssl_config.clone().unwrap_or_default();
    let sni_domains = if ssl.sni_domains.is_empty() {
        virtual_service
            .spec
            .virtual_host
            .effective_domains()
            .into_iter()
            .filter(|d| d != "*")
            .collect()
    } else {
        ssl.sni_domains
    };
    FilterChainTls {
        secret_ref: ssl.secret_ref,
        sni_domains,
    }
}

/// Source ranges must parse as CIDRs (error on `owner`); a matcher already
/// used on this listener is an error on the gateway.
fn check_matcher(
    matcher: &Matcher,
    seen: &mut HashSet<Matcher>,
    owner: &ResourceKey,
    gateway: &ResourceKey,
    reports: &mut ResourceReports,
) -> bool {
    let mut valid = true;
    for range in &matcher.source_prefix_ranges {
        if let Err(e) = range.parse::<IpNet>() {
            reports.add_error(
                owner.clone(),
                format!("invalid source prefix range '{}': {}", range, e),
            );
            valid = false;
        }
    }
    if !valid {
        return false;
    }

    if !seen.insert(matcher.clone()) {
        reports.add_error(
            gateway.clone(),
            format!(
                "duplicate matcher: source prefix ranges [{}], ssl {}",
                matcher.source_prefix_ranges.join(", "),
                matcher.ssl
            ),
        );
        return false;
    }
    true
}

/// A domain served by more than one virtual service is an error on each.
fn check_domain_conflicts(selected: &[&VirtualService], reports: &mut ResourceReports) {
    let mut owners: BTreeMap<String, Vec<ResourceRef>> = BTreeMap::new();
    for vs in selected {
        let domains: BTreeSet<String> = vs
            .spec
            .virtual_host
            .effective_domains()
            .into_iter()
            .collect();
        for domain in domains {
            owners.entry(domain).or_default().push(vs.reference());
        }
    }

    for (domain, refs) in owners.iter().filter(|(_, refs)| refs.len() > 1) {
        for reference in refs {
            let others: Vec<String> = refs
                .iter()
                .filter(|r| *r != reference)
                .map(ToString::to_string)
                .collect();
            reports.add_error(
                ResourceKey::new(ResourceKind::VirtualService, reference.clone()),
                format!(
                    "domain conflict: {} is also served by virtual service {}",
                    domain,
                    others.join(", ")
                ),
            );
        }
    }
}
