//! Virtual host and route option payloads, inline or referenced through
//! `VirtualHostOption` / `RouteOption` resources.

use serde::{Deserialize, Serialize};

use super::id::ResourceRef;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtAuthExtension {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_ref: Option<ResourceRef>,
    #[serde(default)]
    pub disable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderValue {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub append: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    #[serde(default = "default_retry_on")]
    pub retry_on: String,
    #[serde(default = "default_num_retries")]
    pub num_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_try_timeout_ms: Option<u64>,
}

fn default_retry_on() -> String {
    "5xx".to_string()
}

fn default_num_retries() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualHostOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extauth: Option<ExtAuthExtension>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rate_limit_configs: Vec<ResourceRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_headers_to_add: Vec<HeaderValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_headers_to_add: Vec<HeaderValue>,
}

impl VirtualHostOptions {
    /// Fill unset fields from `fallback`; fields already set win.
    pub fn merge_from(&mut self, fallback: &VirtualHostOptions) {
        if self.extauth.is_none() {
            self.extauth = fallback.extauth.clone();
        }
        if self.rate_limit_configs.is_empty() {
            self.rate_limit_configs = fallback.rate_limit_configs.clone();
        }
        if self.request_headers_to_add.is_empty() {
            self.request_headers_to_add = fallback.request_headers_to_add.clone();
        }
        if self.response_headers_to_add.is_empty() {
            self.response_headers_to_add = fallback.response_headers_to_add.clone();
        }
    }

    pub fn referenced_configs(&self) -> (Option<&ResourceRef>, &[ResourceRef]) {
        (self.extauth.as_ref().and_then(|e| e.config_ref.as_ref()), &self.rate_limit_configs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extauth: Option<ExtAuthExtension>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rate_limit_configs: Vec<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_rewrite: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<RetryPolicy>,
}

impl RouteOptions {
    pub fn merge_from(&mut self, fallback: &RouteOptions) {
        if self.extauth.is_none() {
            self.extauth = fallback.extauth.clone();
        }
        if self.rate_limit_configs.is_empty() {
            self.rate_limit_configs = fallback.rate_limit_configs.clone();
        }
        if self.timeout_ms.is_none() {
            self.timeout_ms = fallback.timeout_ms;
        }
        if self.prefix_rewrite.is_none() {
            self.prefix_rewrite = fallback.prefix_rewrite.clone();
        }
        if self.retries.is_none() {
            self.retries = fallback.retries.clone();
        }
    }

    pub fn referenced_configs(&self) -> (Option<&ResourceRef>, &[ResourceRef]) {
        (self.extauth.as_ref().and_then(|e| e.config_ref.as_ref()), &self.rate_limit_configs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualHostOptionSpec {
    #[serde(default)]
    pub options: VirtualHostOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptionSpec {
    #[serde(default)]
    pub options: RouteOptions,
}
