//! Envoy-types protocol checks grouped by resource type.
//!
//! These run on the protobufs produced from a materialized proxy and catch
//! anything Envoy itself would NACK: empty names, missing addresses, bad
//! ports, empty weighted cluster sets and the like.

mod cluster;
mod helpers;
mod listener;
mod route;

pub use cluster::validate_envoy_cluster;
pub use listener::validate_envoy_listener;
pub use route::validate_envoy_route_configuration;

#[cfg(test)]
mod tests {
    use super::*;
    use envoy_types::pb::envoy::config::{
        cluster::v3::Cluster,
        route::v3::{
            route::Action as RouteActionEnum, route_action::ClusterSpecifier,
            route_match::PathSpecifier, Route, RouteAction, RouteConfiguration, RouteMatch,
            VirtualHost,
        },
    };

    #[test]
    fn test_reexports_work() {
        let cluster = Cluster {
            name: "petstore_default".to_string(),
            ..Default::default()
        };
        assert!(validate_envoy_cluster(&cluster).is_ok());

        let route = RouteConfiguration {
            name: "listener-::-8080-http-routes".to_string(),
            virtual_hosts: vec![VirtualHost {
                name: "default.petstore".to_string(),
                domains: vec!["*".to_string()],
                routes: vec![Route {
                    r#match: Some(RouteMatch {
                        path_specifier: Some(PathSpecifier::Prefix("/".to_string())),
                        ..Default::default()
                    }),
                    action: Some(RouteActionEnum::Route(RouteAction {
                        cluster_specifier: Some(ClusterSpecifier::Cluster(
                            "petstore_default".to_string(),
                        )),
                        ..Default::default()
                    })),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(validate_envoy_route_configuration(&route).is_ok());
    }
}
