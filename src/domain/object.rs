//! Metadata block and the generic `{metadata, spec}` envelope shared by all kinds.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::id::{default_namespace, ResourceRef};

static DNS_SUBDOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("DNS_SUBDOMAIN should be a valid regex pattern")
});

const MAX_NAME_LEN: usize = 253;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub generation: i64,
}

impl Metadata {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            generation: 0,
        }
    }

    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(self.namespace.clone(), self.name.clone())
    }

    /// Name and namespace must both be DNS-1123 subdomains.
    pub fn validate(&self) -> Result<(), String> {
        validate_dns_subdomain("name", &self.name)?;
        validate_dns_subdomain("namespace", &self.namespace)
    }
}

fn validate_dns_subdomain(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(format!("{} cannot exceed {} characters", field, MAX_NAME_LEN));
    }
    if !DNS_SUBDOMAIN.is_match(value) {
        return Err(format!("{} '{}' must be a lowercase DNS-1123 subdomain", field, value));
    }
    Ok(())
}

/// A configured resource: metadata plus a kind-specific spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object<S> {
    pub metadata: Metadata,
    pub spec: S,
}

impl<S> Object<S> {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: S) -> Self {
        Self {
            metadata: Metadata::new(namespace, name),
            spec,
        }
    }

    pub fn reference(&self) -> ResourceRef {
        self.metadata.reference()
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    pub fn matches_labels(&self, selector: &BTreeMap<String, String>) -> bool {
        selector.iter().all(|(key, value)| self.metadata.labels.get(key) == Some(value))
    }
}
