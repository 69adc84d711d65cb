//! Conversion of the materialized proxy into envoy-types protobufs.
//!
//! HTTP filter chains carry an inline route configuration inside the
//! HttpConnectionManager; TLS material is referenced through SDS by secret
//! name so no key bytes end up in listener or cluster resources.

use envoy_types::pb::envoy::config::cluster::v3::cluster::{
    ClusterDiscoveryType, DiscoveryType, LbPolicy,
};
use envoy_types::pb::envoy::config::cluster::v3::Cluster as EnvoyCluster;
use envoy_types::pb::envoy::config::core::v3::{
    address::Address as AddressType, config_source::ConfigSourceSpecifier, data_source::Specifier,
    header_value_option::HeaderAppendAction, socket_address::PortSpecifier,
    transport_socket::ConfigType as TransportSocketConfigType, Address, AggregatedConfigSource,
    CidrRange, ConfigSource, DataSource, HeaderValue as EnvoyHeaderValue, HeaderValueOption,
    SocketAddress, TransportSocket,
};
use envoy_types::pb::envoy::config::endpoint::v3::{
    lb_endpoint, ClusterLoadAssignment, Endpoint, LbEndpoint, LocalityLbEndpoints,
};
use envoy_types::pb::envoy::config::listener::v3::{
    filter::ConfigType as FilterConfigType, Filter, FilterChain as EnvoyFilterChain,
    FilterChainMatch, Listener as EnvoyListener,
};
use envoy_types::pb::envoy::config::route::v3::{
    header_matcher::HeaderMatchSpecifier, redirect_action::PathRewriteSpecifier,
    redirect_action::RedirectResponseCode, route::Action as EnvoyRouteAction,
    route_action::ClusterSpecifier, route_match::PathSpecifier, weighted_cluster::ClusterWeight,
    DirectResponseAction as EnvoyDirectResponse, HeaderMatcher as EnvoyHeaderMatcher,
    RedirectAction as EnvoyRedirect, RetryPolicy as EnvoyRetryPolicy, Route as EnvoyRoute,
    RouteAction as EnvoyRouteActionConfig, RouteConfiguration, RouteMatch,
    VirtualHost as EnvoyVirtualHost, WeightedCluster,
};
use envoy_types::pb::envoy::extensions::filters::http::router::v3::Router as RouterFilter;
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::{CodecType, RouteSpecifier},
    http_filter::ConfigType as HttpFilterConfigType,
    HttpConnectionManager, HttpFilter,
};
use envoy_types::pb::envoy::extensions::filters::network::tcp_proxy::v3::{
    tcp_proxy::ClusterSpecifier as TcpClusterSpecifier, TcpProxy,
};
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    CommonTlsContext, DownstreamTlsContext, SdsSecretConfig, UpstreamTlsContext,
};
use envoy_types::pb::envoy::r#type::matcher::v3::{
    string_matcher::MatchPattern, RegexMatcher, StringMatcher,
};
use envoy_types::pb::google::protobuf::{Any, BoolValue, Duration, UInt32Value};
use prost::Message;
use std::net::IpAddr;

use crate::domain::{
    cluster_name, Cluster, FilterChain, FilterChainTls, HeaderMatcher, HeaderValue, Listener,
    LoadBalancer, PathMatch, ProxyRoute, ProxyRouteAction, ProxyVirtualHost, ResourceRef,
    RouteAction, RouteMatcher,
};
use crate::errors::{FlowgateError, Result};

pub const ROUTER_FILTER_NAME: &str = "envoy.filters.http.router";
pub const HCM_FILTER_NAME: &str = "envoy.filters.network.http_connection_manager";
pub const TCP_PROXY_FILTER_NAME: &str = "envoy.filters.network.tcp_proxy";
pub const TLS_TRANSPORT_SOCKET: &str = "envoy.transport_sockets.tls";

const ROUTER_TYPE_URL: &str = "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router";
const HCM_TYPE_URL: &str = concat!(
    "type.googleapis.com/",
    "envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager"
);
const TCP_PROXY_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.tcp_proxy.v3.TcpProxy";
const UPSTREAM_TLS_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.UpstreamTlsContext";
const DOWNSTREAM_TLS_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext";

fn any_from_message<M: Message>(type_url: &str, message: &M) -> Any {
    Any {
        type_url: type_url.to_string(),
        value: message.encode_to_vec(),
    }
}

fn seconds_to_duration(value: u64) -> Duration {
    Duration {
        seconds: value as i64,
        nanos: 0,
    }
}

fn millis_to_duration(value: u64) -> Duration {
    Duration {
        seconds: (value / 1000) as i64,
        nanos: ((value % 1000) * 1_000_000) as i32,
    }
}

fn socket_address(address: &str, port: u32) -> Address {
    Address {
        address: Some(AddressType::SocketAddress(SocketAddress {
            address: address.to_string(),
            port_specifier: Some(PortSpecifier::PortValue(port)),
            ..Default::default()
        })),
    }
}

fn ads_config_source() -> ConfigSource {
    ConfigSource {
        config_source_specifier: Some(ConfigSourceSpecifier::Ads(
            AggregatedConfigSource::default(),
        )),
        ..Default::default()
    }
}

fn sds_certificate(secret: &ResourceRef) -> CommonTlsContext {
    CommonTlsContext {
        tls_certificate_sds_secret_configs: vec![SdsSecretConfig {
            name: secret.to_string(),
            sds_config: Some(ads_config_source()),
        }],
        ..Default::default()
    }
}

fn lb_policy(load_balancer: LoadBalancer) -> i32 {
    match load_balancer {
        LoadBalancer::RoundRobin => LbPolicy::RoundRobin as i32,
        LoadBalancer::LeastRequest => LbPolicy::LeastRequest as i32,
        LoadBalancer::Random => LbPolicy::Random as i32,
        LoadBalancer::RingHash => LbPolicy::RingHash as i32,
    }
}

/// Build an Envoy cluster. Hostname endpoints switch discovery to DNS.
pub fn cluster_to_envoy(cluster: &Cluster) -> EnvoyCluster {
    let lb_endpoints: Vec<LbEndpoint> = cluster
        .endpoints
        .iter()
        .map(|endpoint| LbEndpoint {
            host_identifier: Some(lb_endpoint::HostIdentifier::Endpoint(Endpoint {
                address: Some(socket_address(&endpoint.address, endpoint.port)),
                ..Default::default()
            })),
            load_balancing_weight: Some(UInt32Value {
                value: endpoint.weight,
            }),
            ..Default::default()
        })
        .collect();

    let uses_dns = cluster
        .endpoints
        .iter()
        .any(|e| e.address.parse::<IpAddr>().is_err());
    let discovery = if uses_dns {
        DiscoveryType::StrictDns
    } else {
        DiscoveryType::Static
    };

    let mut envoy = EnvoyCluster {
        name: cluster.name.clone(),
        connect_timeout: Some(seconds_to_duration(cluster.connect_timeout_seconds)),
        lb_policy: lb_policy(cluster.lb_policy),
        cluster_discovery_type: Some(ClusterDiscoveryType::Type(discovery as i32)),
        load_assignment: Some(ClusterLoadAssignment {
            cluster_name: cluster.name.clone(),
            endpoints: vec![LocalityLbEndpoints {
                lb_endpoints,
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    };

    if let Some(tls) = &cluster.tls {
        let tls_context = UpstreamTlsContext {
            common_tls_context: Some(match &tls.secret_ref {
                Some(secret) => sds_certificate(secret),
                None => CommonTlsContext::default(),
            }),
            sni: tls.sni.clone().unwrap_or_default(),
            ..Default::default()
        };
        envoy.transport_socket = Some(TransportSocket {
            name: TLS_TRANSPORT_SOCKET.to_string(),
            config_type: Some(TransportSocketConfigType::TypedConfig(any_from_message(
                UPSTREAM_TLS_TYPE_URL,
                &tls_context,
            ))),
        });
    }

    envoy
}

/// Route configuration name for an HTTP filter chain.
pub fn route_config_name(listener: &Listener, chain: &FilterChain) -> String {
    format!("{}-{}-routes", listener.name, chain.name)
}

/// Inline route configuration for one HTTP filter chain.
pub fn route_configuration(listener: &Listener, chain: &FilterChain) -> Result<RouteConfiguration> {
    let virtual_hosts = chain
        .virtual_hosts
        .iter()
        .map(virtual_host_to_envoy)
        .collect::<Result<Vec<_>>>()?;

    Ok(RouteConfiguration {
        name: route_config_name(listener, chain),
        virtual_hosts,
        ..Default::default()
    })
}

fn virtual_host_to_envoy(vhost: &ProxyVirtualHost) -> Result<EnvoyVirtualHost> {
    let mut routes = Vec::new();
    for route in &vhost.routes {
        routes.extend(route_to_envoy(route)?);
    }

    let mut envoy = EnvoyVirtualHost {
        name: vhost.name.clone(),
        domains: vhost.domains.clone(),
        routes,
        ..Default::default()
    };
    if let Some(options) = &vhost.options {
        envoy.request_headers_to_add = options
            .request_headers_to_add
            .iter()
            .map(header_option)
            .collect();
        envoy.response_headers_to_add = options
            .response_headers_to_add
            .iter()
            .map(header_option)
            .collect();
    }
    Ok(envoy)
}

fn header_option(header: &HeaderValue) -> HeaderValueOption {
    HeaderValueOption {
        header: Some(EnvoyHeaderValue {
            key: header.key.clone(),
            value: header.value.clone(),
            ..Default::default()
        }),
        append_action: if header.append {
            HeaderAppendAction::AppendIfExistsOrAdd as i32
        } else {
            HeaderAppendAction::OverwriteIfExistsOrAdd as i32
        },
        ..Default::default()
    }
}

/// One Envoy route per matcher.
pub fn route_to_envoy(route: &ProxyRoute) -> Result<Vec<EnvoyRoute>> {
    let action = route_action_to_envoy(route)?;
    route
        .matchers
        .iter()
        .enumerate()
        .map(|(index, matcher)| -> Result<EnvoyRoute> {
            Ok(EnvoyRoute {
                name: if route.matchers.len() > 1 {
                    format!("{}-{}", route.name, index)
                } else {
                    route.name.clone()
                },
                r#match: Some(route_match_to_envoy(matcher)?),
                action: Some(action.clone()),
                ..Default::default()
            })
        })
        .collect()
}

fn route_match_to_envoy(matcher: &RouteMatcher) -> Result<RouteMatch> {
    let path = matcher
        .path()
        .map_err(|e| FlowgateError::validation_field(e, "matchers"))?;
    let path_specifier = match path {
        PathMatch::Prefix(prefix) => PathSpecifier::Prefix(prefix),
        PathMatch::Exact(path) => PathSpecifier::Path(path),
        PathMatch::Regex(regex) => PathSpecifier::SafeRegex(RegexMatcher {
            regex,
            ..Default::default()
        }),
    };

    let mut headers: Vec<EnvoyHeaderMatcher> = matcher
        .headers
        .iter()
        .map(header_matcher_to_envoy)
        .collect();
    if !matcher.methods.is_empty() {
        headers.push(EnvoyHeaderMatcher {
            name: ":method".to_string(),
            header_match_specifier: Some(HeaderMatchSpecifier::StringMatch(StringMatcher {
                match_pattern: Some(MatchPattern::SafeRegex(RegexMatcher {
                    regex: matcher.methods.join("|"),
                    ..Default::default()
                })),
                ..Default::default()
            })),
            ..Default::default()
        });
    }

    Ok(RouteMatch {
        path_specifier: Some(path_specifier),
        headers,
        ..Default::default()
    })
}

fn header_matcher_to_envoy(header: &HeaderMatcher) -> EnvoyHeaderMatcher {
    let specifier = match &header.value {
        None => HeaderMatchSpecifier::PresentMatch(true),
        Some(value) if header.regex => HeaderMatchSpecifier::StringMatch(StringMatcher {
            match_pattern: Some(MatchPattern::SafeRegex(RegexMatcher {
                regex: value.clone(),
                ..Default::default()
            })),
            ..Default::default()
        }),
        Some(value) => HeaderMatchSpecifier::StringMatch(StringMatcher {
            match_pattern: Some(MatchPattern::Exact(value.clone())),
            ..Default::default()
        }),
    };
    EnvoyHeaderMatcher {
        name: header.name.clone(),
        header_match_specifier: Some(specifier),
        ..Default::default()
    }
}

fn redirect_code(code: u32) -> Result<RedirectResponseCode> {
    match code {
        301 => Ok(RedirectResponseCode::MovedPermanently),
        302 => Ok(RedirectResponseCode::Found),
        303 => Ok(RedirectResponseCode::SeeOther),
        307 => Ok(RedirectResponseCode::TemporaryRedirect),
        308 => Ok(RedirectResponseCode::PermanentRedirect),
        other => Err(FlowgateError::validation_field(
            format!("unsupported redirect response code {}", other),
            "redirectAction.responseCode",
        )),
    }
}

fn route_action_to_envoy(route: &ProxyRoute) -> Result<EnvoyRouteAction> {
    let action = match &route.action {
        ProxyRouteAction::Route(action) => {
            let cluster_specifier = match action {
                RouteAction::Single(destination) => {
                    ClusterSpecifier::Cluster(cluster_name(&destination.upstream))
                }
                RouteAction::Multi(multi) => ClusterSpecifier::WeightedClusters(WeightedCluster {
                    clusters: multi
                        .destinations
                        .iter()
                        .map(|d| ClusterWeight {
                            name: cluster_name(&d.destination.upstream),
                            weight: Some(UInt32Value { value: d.weight }),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                }),
            };

            #[allow(deprecated)]
            let mut envoy = EnvoyRouteActionConfig {
                cluster_specifier: Some(cluster_specifier),
                ..Default::default()
            };
            if let Some(options) = &route.options {
                envoy.timeout = options.timeout_ms.map(millis_to_duration);
                if let Some(prefix) = &options.prefix_rewrite {
                    envoy.prefix_rewrite = prefix.clone();
                }
                if let Some(retries) = &options.retries {
                    envoy.retry_policy = Some(EnvoyRetryPolicy {
                        retry_on: retries.retry_on.clone(),
                        num_retries: Some(UInt32Value {
                            value: retries.num_retries,
                        }),
                        per_try_timeout: retries.per_try_timeout_ms.map(millis_to_duration),
                        ..Default::default()
                    });
                }
            }
            EnvoyRouteAction::Route(envoy)
        }
        ProxyRouteAction::Redirect(redirect) => EnvoyRouteAction::Redirect(EnvoyRedirect {
            host_redirect: redirect.host_redirect.clone().unwrap_or_default(),
            path_rewrite_specifier: redirect
                .path_redirect
                .clone()
                .map(PathRewriteSpecifier::PathRedirect),
            response_code: redirect_code(redirect.response_code)? as i32,
            ..Default::default()
        }),
        ProxyRouteAction::DirectResponse(direct) => {
            EnvoyRouteAction::DirectResponse(EnvoyDirectResponse {
                status: direct.status,
                body: direct.body.as_ref().map(|body| DataSource {
                    specifier: Some(Specifier::InlineString(body.clone())),
                    ..Default::default()
                }),
                ..Default::default()
            })
        }
    };
    Ok(action)
}

fn router_filter() -> HttpFilter {
    HttpFilter {
        name: ROUTER_FILTER_NAME.to_string(),
        is_optional: false,
        disabled: false,
        config_type: Some(HttpFilterConfigType::TypedConfig(any_from_message(
            ROUTER_TYPE_URL,
            &RouterFilter::default(),
        ))),
    }
}

fn filter_chain_to_envoy(listener: &Listener, chain: &FilterChain) -> Result<EnvoyFilterChain> {
    let filter = if chain.is_tcp() {
        let host = &chain.tcp_hosts[0];
        let tcp_proxy = TcpProxy {
            stat_prefix: format!("{}_tcp", chain.name),
            cluster_specifier: Some(TcpClusterSpecifier::Cluster(cluster_name(&host.destination))),
            ..Default::default()
        };
        Filter {
            name: TCP_PROXY_FILTER_NAME.to_string(),
            config_type: Some(FilterConfigType::TypedConfig(any_from_message(
                TCP_PROXY_TYPE_URL,
                &tcp_proxy,
            ))),
        }
    } else {
        let route_config = route_configuration(listener, chain)?;
        let hcm = HttpConnectionManager {
            stat_prefix: format!("{}_http", chain.name),
            codec_type: CodecType::Auto as i32,
            route_specifier: Some(RouteSpecifier::RouteConfig(route_config)),
            http_filters: vec![router_filter()],
            ..Default::default()
        };
        Filter {
            name: HCM_FILTER_NAME.to_string(),
            config_type: Some(FilterConfigType::TypedConfig(any_from_message(HCM_TYPE_URL, &hcm))),
        }
    };

    let mut filter_chain_match = FilterChainMatch::default();
    if let Some(matcher) = &chain.matcher {
        filter_chain_match.source_prefix_ranges = matcher
            .source_prefix_ranges
            .iter()
            .map(String::as_str)
            .map(cidr_range)
            .collect::<Result<Vec<_>>>()?;
    }
    if let Some(tls) = &chain.tls {
        filter_chain_match.server_names = tls.sni_domains.clone();
    }

    Ok(EnvoyFilterChain {
        name: chain.name.clone(),
        filter_chain_match: Some(filter_chain_match),
        filters: vec![filter],
        transport_socket: chain.tls.as_ref().map(downstream_tls_socket),
        ..Default::default()
    })
}

fn cidr_range(range: &str) -> Result<CidrRange> {
    let network: ipnet::IpNet = range.parse().map_err(|e| {
        FlowgateError::validation_field(
            format!("invalid CIDR range '{}': {}", range, e),
            "sourcePrefixRanges",
        )
    })?;
    Ok(CidrRange {
        address_prefix: network.network().to_string(),
        prefix_len: Some(UInt32Value {
            value: u32::from(network.prefix_len()),
        }),
    })
}

fn downstream_tls_socket(tls: &FilterChainTls) -> TransportSocket {
    let context = DownstreamTlsContext {
        common_tls_context: Some(match &tls.secret_ref {
            Some(secret) => sds_certificate(secret),
            None => CommonTlsContext::default(),
        }),
        require_client_certificate: Some(BoolValue { value: false }),
        ..Default::default()
    };
    TransportSocket {
        name: TLS_TRANSPORT_SOCKET.to_string(),
        config_type: Some(TransportSocketConfigType::TypedConfig(any_from_message(
            DOWNSTREAM_TLS_TYPE_URL,
            &context,
        ))),
    }
}

/// Build an Envoy listener with one filter chain per proxy filter chain.
pub fn listener_to_envoy(listener: &Listener) -> Result<EnvoyListener> {
    let filter_chains = listener
        .filter_chains
        .iter()
        .map(|chain| filter_chain_to_envoy(listener, chain))
        .collect::<Result<Vec<_>>>()?;

    Ok(EnvoyListener {
        name: listener.name.clone(),
        address: Some(socket_address(&listener.bind_address, listener.bind_port)),
        filter_chains,
        ..Default::default()
    })
}
