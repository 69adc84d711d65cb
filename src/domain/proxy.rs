//! The materialized proxy: listeners with filter chains and the clusters
//! they route to. Compared by content hash, not structurally.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::gateway::Matcher;
use super::id::ResourceRef;
use super::object::Object;
use super::options::{RouteOptions, VirtualHostOptions};
use super::route::{DirectResponseAction, RedirectAction, RouteAction, RouteMatcher};
use super::upstream::LoadBalancer;
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProxyRouteAction {
    Route(RouteAction),
    Redirect(RedirectAction),
    DirectResponse(DirectResponseAction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRoute {
    pub name: String,
    pub matchers: Vec<RouteMatcher>,
    pub action: ProxyRouteAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RouteOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyVirtualHost {
    pub name: String,
    pub domains: Vec<String>,
    pub routes: Vec<ProxyRoute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<VirtualHostOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyTcpHost {
    pub name: String,
    pub destination: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterChainTls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sni_domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterChain {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<Matcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<FilterChainTls>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_hosts: Vec<ProxyVirtualHost>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tcp_hosts: Vec<ProxyTcpHost>,
}

impl FilterChain {
    pub fn is_tcp(&self) -> bool {
        !self.tcp_hosts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listener {
    pub name: String,
    pub bind_address: String,
    pub bind_port: u32,
    pub filter_chains: Vec<FilterChain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEndpoint {
    pub address: String,
    pub port: u32,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<ResourceRef>,
    /// Digest of the client certificate, absent when none could be resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_digest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,
    pub upstream: ResourceRef,
    pub endpoints: Vec<ClusterEndpoint>,
    pub lb_policy: LoadBalancer,
    pub connect_timeout_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<ClusterTls>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySpec {
    #[serde(default)]
    pub listeners: Vec<Listener>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

pub type Proxy = Object<ProxySpec>;

impl Object<ProxySpec> {
    /// First eight bytes of SHA-256 over the canonical JSON of the spec.
    pub fn content_hash(&self) -> Result<u64> {
        let encoded = serde_json::to_vec(&self.spec)?;
        Ok(hash_bytes(&encoded))
    }
}

pub(crate) fn hash_bytes(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}
