use crate::errors::{FlowgateError, Result};
use envoy_types::pb::envoy::config::route::v3::{
    route::Action as RouteActionEnum, route_action::ClusterSpecifier, route_match::PathSpecifier,
    DirectResponseAction, Route, RouteAction, RouteConfiguration, RouteMatch, VirtualHost,
};
use std::collections::HashSet;

use super::helpers::{encode_check, nested};

pub fn validate_envoy_route_configuration(route_config: &RouteConfiguration) -> Result<()> {
    encode_check(route_config, "Invalid route configuration")?;

    if route_config.name.is_empty() {
        return Err(FlowgateError::validation_field(
            "Route configuration name cannot be empty",
            "name",
        ));
    }

    if route_config.virtual_hosts.is_empty() {
        return Err(FlowgateError::validation_field(
            "At least one virtual host is required",
            "virtual_hosts",
        ));
    }

    // Envoy rejects a route configuration where a domain appears twice.
    let mut domains = HashSet::new();
    for vhost in &route_config.virtual_hosts {
        validate_virtual_host(vhost)
            .map_err(|e| nested(format!("Virtual host {}", vhost.name), e))?;
        for domain in &vhost.domains {
            if !domains.insert(domain.as_str()) {
                return Err(FlowgateError::validation_field(
                    format!("Domain {} is served by more than one virtual host", domain),
                    "virtual_hosts",
                ));
            }
        }
    }

    Ok(())
}

fn validate_virtual_host(vhost: &VirtualHost) -> Result<()> {
    if vhost.name.is_empty() {
        return Err(FlowgateError::validation("Virtual host name cannot be empty"));
    }

    if vhost.domains.is_empty() {
        return Err(FlowgateError::validation("At least one domain is required"));
    }

    if vhost.domains.iter().any(String::is_empty) {
        return Err(FlowgateError::validation("Domain cannot be empty"));
    }

    for (index, route) in vhost.routes.iter().enumerate() {
        validate_route(route).map_err(|e| nested(format!("Route {}", index), e))?;
    }

    Ok(())
}

fn validate_route(route: &Route) -> Result<()> {
    match &route.r#match {
        Some(route_match) => validate_route_match(route_match)?,
        None => return Err(FlowgateError::validation("Route match is required")),
    }

    match &route.action {
        Some(RouteActionEnum::Route(route_action)) => validate_route_action(route_action),
        Some(RouteActionEnum::DirectResponse(direct)) => validate_direct_response(direct),
        Some(_) => Ok(()),
        None => Err(FlowgateError::validation("Route action is required")),
    }
}

fn validate_route_match(route_match: &RouteMatch) -> Result<()> {
    match &route_match.path_specifier {
        Some(PathSpecifier::Prefix(prefix)) if !prefix.is_empty() && !prefix.starts_with('/') => {
            Err(FlowgateError::validation(format!("Prefix '{}' must start with '/'", prefix)))
        }
        Some(PathSpecifier::Path(path)) if !path.starts_with('/') => {
            Err(FlowgateError::validation(format!("Path '{}' must start with '/'", path)))
        }
        Some(_) => Ok(()),
        None => Err(FlowgateError::validation("Path specifier is required")),
    }
}

fn validate_route_action(route_action: &RouteAction) -> Result<()> {
    match &route_action.cluster_specifier {
        Some(ClusterSpecifier::Cluster(name)) if name.is_empty() => {
            Err(FlowgateError::validation("Cluster name cannot be empty"))
        }
        Some(ClusterSpecifier::ClusterHeader(header)) if header.is_empty() => {
            Err(FlowgateError::validation("Cluster header cannot be empty"))
        }
        Some(ClusterSpecifier::WeightedClusters(weighted)) => {
            if weighted.clusters.is_empty() {
                return Err(FlowgateError::validation(
                    "At least one weighted cluster is required",
                ));
            }
            let total: u64 = weighted
                .clusters
                .iter()
                .map(|c| c.weight.as_ref().map_or(0, |w| u64::from(w.value)))
                .sum();
            if total == 0 {
                return Err(FlowgateError::validation(
                    "Weighted clusters must have a positive total weight",
                ));
            }
            Ok(())
        }
        Some(_) => Ok(()),
        None => Err(FlowgateError::validation("Cluster specifier is required")),
    }
}

fn validate_direct_response(direct: &DirectResponseAction) -> Result<()> {
    if !(200..600).contains(&direct.status) {
        return Err(FlowgateError::validation(format!(
            "Direct response status {} must be between 200 and 599",
            direct.status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use envoy_types::pb::envoy::config::route::v3::{
        weighted_cluster::ClusterWeight, WeightedCluster,
    };
    use envoy_types::pb::google::protobuf::UInt32Value;

    fn route(prefix: &str, action: RouteActionEnum) -> Route {
        Route {
            r#match: Some(RouteMatch {
                path_specifier: Some(PathSpecifier::Prefix(prefix.to_string())),
                ..Default::default()
            }),
            action: Some(action),
            ..Default::default()
        }
    }

    fn to_cluster(name: &str) -> RouteActionEnum {
        RouteActionEnum::Route(RouteAction {
            cluster_specifier: Some(ClusterSpecifier::Cluster(name.to_string())),
            ..Default::default()
        })
    }

    fn config(vhosts: Vec<VirtualHost>) -> RouteConfiguration {
        RouteConfiguration {
            name: "routes".to_string(),
            virtual_hosts: vhosts,
            ..Default::default()
        }
    }

    fn vhost(name: &str, domain: &str, routes: Vec<Route>) -> VirtualHost {
        VirtualHost {
            name: name.to_string(),
            domains: vec![domain.to_string()],
            routes,
            ..Default::default()
        }
    }

    #[test]
    fn test_envoy_route_configuration_validation() {
        let routes = vec![route("/", to_cluster("petstore_default"))];
        let valid = config(vec![vhost("petstore", "example.com", routes)]);
        assert!(validate_envoy_route_configuration(&valid).is_ok());

        let invalid_route = RouteConfiguration {
            name: "".to_string(),
            ..Default::default()
        };
        assert!(validate_envoy_route_configuration(&invalid_route).is_err());
    }

    #[test]
    fn test_virtual_host_without_routes_is_accepted() {
        let empty = config(vec![vhost("empty", "a.com", Vec::new())]);
        assert!(validate_envoy_route_configuration(&empty).is_ok());
    }

    #[test]
    fn test_duplicate_domains_across_virtual_hosts_are_rejected() {
        let duplicated = config(vec![
            vhost("a", "a.com", Vec::new()),
            vhost("b", "a.com", Vec::new()),
        ]);
        assert!(validate_envoy_route_configuration(&duplicated).is_err());
    }

    #[test]
    fn test_relative_prefix_is_rejected() {
        let relative = config(vec![vhost("a", "a.com", vec![route("api", to_cluster("c"))])]);
        let err = validate_envoy_route_configuration(&relative).unwrap_err();
        assert!(err
            .to_string()
            .contains("Virtual host a: Route 0: Prefix 'api' must start with '/'"));
    }

    #[test]
    fn test_zero_total_weight_is_rejected() {
        let weighted = RouteActionEnum::Route(RouteAction {
            cluster_specifier: Some(ClusterSpecifier::WeightedClusters(WeightedCluster {
                clusters: vec![ClusterWeight {
                    name: "c".to_string(),
                    weight: Some(UInt32Value { value: 0 }),
                    ..Default::default()
                }],
                ..Default::default()
            })),
            ..Default::default()
        });
        let cfg = config(vec![vhost("a", "a.com", vec![route("/", weighted)])]);
        assert!(validate_envoy_route_configuration(&cfg).is_err());
    }

    #[test]
    fn test_direct_response_status_range() {
        let direct = |status| {
            let action = RouteActionEnum::DirectResponse(DirectResponseAction {
                status,
                ..Default::default()
            });
            config(vec![vhost("a", "a.com", vec![route("/", action)])])
        };
        assert!(validate_envoy_route_configuration(&direct(418)).is_ok());
        assert!(validate_envoy_route_configuration(&direct(99)).is_err());
    }
}
