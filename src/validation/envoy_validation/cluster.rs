use crate::errors::{FlowgateError, Result};
use envoy_types::pb::envoy::config::{
    cluster::v3::{cluster::LbPolicy, Cluster},
    core::v3::{
        address::Address as AddressType, socket_address::PortSpecifier, Address, SocketAddress,
    },
    endpoint::v3::{lb_endpoint, ClusterLoadAssignment, Endpoint, LbEndpoint, LocalityLbEndpoints},
};

use super::helpers::{encode_check, nested};

pub fn validate_envoy_cluster(cluster: &Cluster) -> Result<()> {
    encode_check(cluster, "Invalid cluster configuration")?;

    if cluster.name.is_empty() {
        return Err(FlowgateError::validation_field("Cluster name cannot be empty", "name"));
    }

    if !is_valid_lb_policy(cluster.lb_policy) {
        return Err(FlowgateError::validation_field("Invalid load balancing policy", "lb_policy"));
    }

    if let Some(timeout) = &cluster.connect_timeout {
        if timeout.seconds <= 0 && timeout.nanos <= 0 {
            return Err(FlowgateError::validation_field(
                "Connect timeout must be positive",
                "connect_timeout",
            ));
        }
    }

    if let Some(load_assignment) = &cluster.load_assignment {
        validate_cluster_load_assignment(&cluster.name, load_assignment)?;
    }

    Ok(())
}

fn validate_cluster_load_assignment(
    cluster_name: &str,
    load_assignment: &ClusterLoadAssignment,
) -> Result<()> {
    if load_assignment.cluster_name != cluster_name {
        return Err(FlowgateError::validation_field(
            format!(
                "Load assignment cluster name '{}' does not match cluster '{}'",
                load_assignment.cluster_name, cluster_name
            ),
            "cluster_name",
        ));
    }

    if load_assignment.endpoints.is_empty() {
        return Err(FlowgateError::validation_field(
            "At least one endpoint is required",
            "endpoints",
        ));
    }

    for (index, locality_endpoints) in load_assignment.endpoints.iter().enumerate() {
        validate_locality_lb_endpoints(locality_endpoints)
            .map_err(|e| nested(format!("Locality endpoints {}", index), e))?;
    }

    Ok(())
}

fn validate_locality_lb_endpoints(locality_endpoints: &LocalityLbEndpoints) -> Result<()> {
    if locality_endpoints.lb_endpoints.is_empty() {
        return Err(FlowgateError::validation("At least one load balancing endpoint is required"));
    }

    for (index, lb_endpoint) in locality_endpoints.lb_endpoints.iter().enumerate() {
        validate_lb_endpoint(lb_endpoint).map_err(|e| nested(format!("Endpoint {}", index), e))?;
    }

    Ok(())
}

fn validate_lb_endpoint(lb_endpoint: &LbEndpoint) -> Result<()> {
    if let Some(weight) = &lb_endpoint.load_balancing_weight {
        if weight.value == 0 {
            return Err(FlowgateError::validation("Endpoint weight must be at least 1"));
        }
    }

    match &lb_endpoint.host_identifier {
        Some(lb_endpoint::HostIdentifier::Endpoint(endpoint)) => validate_endpoint(endpoint),
        Some(lb_endpoint::HostIdentifier::EndpointName(name)) if name.is_empty() => {
            Err(FlowgateError::validation("Endpoint name cannot be empty"))
        }
        Some(lb_endpoint::HostIdentifier::EndpointName(_)) => Ok(()),
        None => Err(FlowgateError::validation("Host identifier is required")),
    }
}

fn validate_endpoint(endpoint: &Endpoint) -> Result<()> {
    match &endpoint.address {
        Some(address) => validate_address(address),
        None => Err(FlowgateError::validation("Endpoint address is required")),
    }
}

pub(crate) fn validate_address(address: &Address) -> Result<()> {
    match &address.address {
        Some(AddressType::SocketAddress(socket_addr)) => validate_socket_address(socket_addr),
        Some(AddressType::Pipe(pipe)) if pipe.path.is_empty() => {
            Err(FlowgateError::validation("Pipe path cannot be empty"))
        }
        Some(AddressType::Pipe(_)) | Some(AddressType::EnvoyInternalAddress(_)) => Ok(()),
        None => Err(FlowgateError::validation("Address type is required")),
    }
}

pub(crate) fn validate_socket_address(socket_addr: &SocketAddress) -> Result<()> {
    if socket_addr.address.is_empty() {
        return Err(FlowgateError::validation("Socket address cannot be empty"));
    }

    match &socket_addr.port_specifier {
        Some(PortSpecifier::PortValue(port)) if *port == 0 || *port > 65535 => {
            Err(FlowgateError::validation(format!("Port {} must be between 1 and 65535", port)))
        }
        Some(PortSpecifier::PortValue(_)) => Ok(()),
        Some(PortSpecifier::NamedPort(name)) if name.is_empty() => {
            Err(FlowgateError::validation("Named port cannot be empty"))
        }
        Some(PortSpecifier::NamedPort(_)) => Ok(()),
        None => Err(FlowgateError::validation("Port specifier is required")),
    }
}

fn is_valid_lb_policy(policy: i32) -> bool {
    LbPolicy::try_from(policy).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use envoy_types::pb::google::protobuf::UInt32Value;

    fn endpoint(port: u32, weight: Option<u32>) -> LbEndpoint {
        LbEndpoint {
            host_identifier: Some(lb_endpoint::HostIdentifier::Endpoint(Endpoint {
                address: Some(Address {
                    address: Some(AddressType::SocketAddress(SocketAddress {
                        address: "10.0.0.1".to_string(),
                        port_specifier: Some(PortSpecifier::PortValue(port)),
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })),
            load_balancing_weight: weight.map(|value| UInt32Value { value }),
            ..Default::default()
        }
    }

    fn cluster_with(endpoints: Vec<LbEndpoint>) -> Cluster {
        Cluster {
            name: "petstore_default".to_string(),
            lb_policy: LbPolicy::RoundRobin as i32,
            load_assignment: Some(ClusterLoadAssignment {
                cluster_name: "petstore_default".to_string(),
                endpoints: vec![LocalityLbEndpoints {
                    lb_endpoints: endpoints,
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_envoy_cluster_validation() {
        assert!(validate_envoy_cluster(&cluster_with(vec![endpoint(8080, Some(1))])).is_ok());

        let invalid_cluster = Cluster {
            name: "".to_string(),
            ..Default::default()
        };
        assert!(validate_envoy_cluster(&invalid_cluster).is_err());
    }

    #[test]
    fn test_endpoint_errors_are_located() {
        let cluster = cluster_with(vec![endpoint(8080, None), endpoint(70000, None)]);
        let err = validate_envoy_cluster(&cluster).unwrap_err();
        assert_eq!(
            err.to_string(),
            concat!(
                "Validation error: Locality endpoints 0: Endpoint 1: ",
                "Port 70000 must be between 1 and 65535"
            )
        );

        assert!(validate_envoy_cluster(&cluster_with(vec![endpoint(8080, Some(0))])).is_err());
        assert!(validate_envoy_cluster(&cluster_with(Vec::new())).is_err());
    }

    #[test]
    fn test_unknown_lb_policy_is_rejected() {
        let cluster = Cluster {
            name: "c".to_string(),
            lb_policy: 999,
            ..Default::default()
        };
        assert!(validate_envoy_cluster(&cluster).is_err());
    }

    #[test]
    fn test_socket_address_validation() {
        let missing_port = SocketAddress {
            address: "127.0.0.1".to_string(),
            port_specifier: None,
            ..Default::default()
        };
        assert!(validate_socket_address(&missing_port).is_err());
    }
}
