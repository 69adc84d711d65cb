//! Domain layer
//!
//! Pure configuration types consumed by the translator and the validation
//! core. Nothing here performs I/O; every type is `Clone` so snapshots can be
//! deep-copied on each validation call.
//!
//! ## Module Organization
//!
//! - `id`: resource references, GVKs and the closed kind table
//! - `object`: metadata and the `{metadata, spec}` envelope
//! - `gateway`, `virtual_service`, `route`, `options`: gateway-shape specs
//! - `upstream`, `secret`, `extensions`: specs resolved after translation
//! - `proxy`: the materialized proxy emitted by the translator
//! - `resource`: the tagged resource variant and its wire decoding

pub mod extensions;
pub mod gateway;
pub mod id;
pub mod object;
pub mod options;
pub mod proxy;
pub mod resource;
pub mod route;
pub mod secret;
pub mod upstream;
pub mod virtual_service;

pub use extensions::{
    ApiKeyAuth, AuthConfigEntry, AuthConfigSpec, BasicAuth, Descriptor, OAuth2, RateLimit,
    RateLimitConfigSpec, RateLimitUnit,
};
pub use gateway::{
    DelegatedHttpGateways, GatewaySpec, GatewayType, HttpGateway, HybridGateway,
    MatchableHttpGatewaySpec, MatchedGateway, MatchedGatewayType, Matcher, TcpGateway, TcpHost,
};
pub use id::{Gvk, ResourceKind, ResourceRef, DEFAULT_NAMESPACE};
pub use object::{Metadata, Object};
pub use options::{
    ExtAuthExtension, HeaderValue, RetryPolicy, RouteOptionSpec, RouteOptions,
    VirtualHostOptionSpec, VirtualHostOptions,
};
pub use proxy::{
    Cluster, ClusterEndpoint, ClusterTls, FilterChain, FilterChainTls, Listener, Proxy, ProxyRoute,
    ProxyRouteAction, ProxySpec, ProxyTcpHost, ProxyVirtualHost,
};
pub use resource::{
    decode_resource, decode_resources_yaml, parse_gvk, AuthConfig, Gateway, MatchableHttpGateway,
    RateLimitConfig, Resource, RouteOption, RouteTable, Secret, Upstream, VirtualHostOption,
    VirtualService,
};
pub use route::{
    Action, DelegateAction, DelegateSelector, Destination, DirectResponseAction, HeaderMatcher,
    MultiDestination, PathMatch, RedirectAction, Route, RouteAction, RouteMatcher, RouteTableSpec,
    WeightedDestination,
};
pub use secret::{GenericSecret, SecretSpec, TlsSecret};
pub use upstream::{cluster_name, Host, LoadBalancer, UpstreamSpec, UpstreamSslConfig};
pub use virtual_service::{SslConfig, VirtualHost, VirtualServiceSpec};
