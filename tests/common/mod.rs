//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use flowgate::domain::{
    GatewaySpec, GatewayType, HttpGateway, HybridGateway, MatchedGateway, MatchedGatewayType,
    Matcher, Object, Route, SecretSpec, TlsSecret, UpstreamSpec, UpstreamSslConfig,
    VirtualServiceSpec,
};
use flowgate::{ApiSnapshot, GatewayValidator, Resource, ResourceRef, ValidationConfig};

pub const NAMESPACE: &str = "default";
pub const SYSTEM_NAMESPACE: &str = "flowgate-system";

pub fn reference(name: &str) -> ResourceRef {
    ResourceRef::new(NAMESPACE, name)
}

/// HTTP gateway on `port` selecting every virtual service.
pub fn http_gateway(name: &str, port: u32) -> Resource {
    Object::new(
        SYSTEM_NAMESPACE,
        name,
        GatewaySpec::http(port, HttpGateway::default()),
    )
    .into()
}

/// Hybrid gateway with one plain HTTP matched gateway listing `virtual_services`.
pub fn hybrid_gateway(name: &str, port: u32, virtual_services: &[&str]) -> Resource {
    let mut spec = GatewaySpec::http(port, HttpGateway::default());
    spec.gateway_type = GatewayType::HybridGateway(HybridGateway {
        matched_gateways: vec![MatchedGateway {
            matcher: Matcher::default(),
            gateway_type: MatchedGatewayType::HttpGateway(HttpGateway {
                virtual_services: virtual_services
                    .iter()
                    .map(|name| reference(name))
                    .collect(),
                ..Default::default()
            }),
        }],
        delegated_http_gateways: None,
    });
    Object::new(SYSTEM_NAMESPACE, name, spec).into()
}

/// Virtual service serving `domain` with a catch-all route to `upstream`.
pub fn virtual_service(name: &str, domain: &str, upstream: &str) -> Resource {
    let route = Route::to_upstream("/", reference(upstream));
    virtual_service_with_routes(name, domain, vec![route])
}

pub fn virtual_service_with_routes(name: &str, domain: &str, routes: Vec<Route>) -> Resource {
    Object::new(
        NAMESPACE,
        name,
        VirtualServiceSpec::with_domains(&[domain], routes),
    )
    .into()
}

pub fn upstream(name: &str, port: u32) -> Resource {
    Object::new(NAMESPACE, name, UpstreamSpec::static_host("10.0.0.1", port)).into()
}

/// Upstream originating TLS with the client certificate in `secret`.
pub fn tls_upstream(name: &str, secret: &str) -> Resource {
    let mut spec = UpstreamSpec::static_host("10.0.0.1", 8443);
    spec.ssl_config = Some(UpstreamSslConfig {
        secret_ref: Some(reference(secret)),
        sni: None,
    });
    Object::new(NAMESPACE, name, spec).into()
}

pub fn tls_secret(name: &str) -> Resource {
    Object::new(
        NAMESPACE,
        name,
        SecretSpec::Tls(TlsSecret {
            cert_chain: format!("{}-cert", name),
            private_key: format!("{}-key", name),
            root_ca: None,
        }),
    )
    .into()
}

pub fn snapshot(resources: Vec<Resource>) -> ApiSnapshot {
    ApiSnapshot::from_resources(resources).expect("fixture resources are valid")
}

/// Gateway, upstream `petstore` and virtual service `petstore` on petstore.com.
pub fn petstore_snapshot() -> ApiSnapshot {
    snapshot(vec![
        http_gateway("http", 8080),
        upstream("petstore", 8080),
        virtual_service("petstore", "petstore.com", "petstore"),
    ])
}

/// Validator with default collaborators, synced to `snapshot`.
pub async fn ready_validator(config: ValidationConfig, snapshot: ApiSnapshot) -> GatewayValidator {
    let validator = GatewayValidator::with_defaults(config);
    validator
        .sync(snapshot)
        .await
        .expect("fixture snapshot syncs");
    validator
}
