//! Gateway and MatchableHttpGateway specs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::id::ResourceRef;

pub const DEFAULT_BIND_ADDRESS: &str = "::";

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpGateway {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_services: Vec<ResourceRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub virtual_service_selector: BTreeMap<String, String>,
    /// Namespaces to select from; empty or `*` selects all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_service_namespaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpHost {
    pub name: String,
    pub destination: ResourceRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpGateway {
    #[serde(default)]
    pub tcp_hosts: Vec<TcpHost>,
}

/// Connection-level match for hybrid gateway filter chains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_prefix_ranges: Vec<String>,
    #[serde(default)]
    pub ssl: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchedGatewayType {
    HttpGateway(HttpGateway),
    TcpGateway(TcpGateway),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedGateway {
    #[serde(default)]
    pub matcher: Matcher,
    #[serde(flatten)]
    pub gateway_type: MatchedGatewayType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedHttpGateways {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<ResourceRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridGateway {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_gateways: Vec<MatchedGateway>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegated_http_gateways: Option<DelegatedHttpGateways>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GatewayType {
    HttpGateway(HttpGateway),
    TcpGateway(TcpGateway),
    HybridGateway(HybridGateway),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySpec {
    /// Proxies this gateway renders into; empty means the default proxy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxy_names: Vec<String>,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    pub bind_port: u32,
    #[serde(default)]
    pub ssl: bool,
    #[serde(flatten)]
    pub gateway_type: GatewayType,
}

impl GatewaySpec {
    pub fn http(bind_port: u32, http: HttpGateway) -> Self {
        Self {
            proxy_names: Vec::new(),
            bind_address: default_bind_address(),
            bind_port,
            ssl: false,
            gateway_type: GatewayType::HttpGateway(http),
        }
    }
}

/// A standalone HTTP gateway a hybrid gateway can delegate to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchableHttpGatewaySpec {
    #[serde(default)]
    pub matcher: Matcher,
    #[serde(default)]
    pub http_gateway: HttpGateway,
}
