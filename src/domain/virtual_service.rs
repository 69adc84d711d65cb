use serde::{Deserialize, Serialize};

use super::id::ResourceRef;
use super::options::VirtualHostOptions;
use super::route::Route;

/// Downstream TLS settings of a virtual service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sni_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualHost {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<VirtualHostOptions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub option_refs: Vec<ResourceRef>,
}

impl VirtualHost {
    /// Declared domains, `*` when none are declared.
    pub fn effective_domains(&self) -> Vec<String> {
        if self.domains.is_empty() {
            vec!["*".to_string()]
        } else {
            self.domains.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServiceSpec {
    #[serde(default)]
    pub virtual_host: VirtualHost,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_config: Option<SslConfig>,
}

impl VirtualServiceSpec {
    pub fn with_domains(domains: &[&str], routes: Vec<Route>) -> Self {
        Self {
            virtual_host: VirtualHost {
                domains: domains.iter().map(|d| d.to_string()).collect(),
                routes,
                ..Default::default()
            },
            ssl_config: None,
        }
    }
}
