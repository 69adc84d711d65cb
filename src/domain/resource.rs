//! The tagged resource variant and its self-describing wire encoding.
//!
//! Each encoded item carries `apiVersion` and `kind` next to `metadata` and
//! `spec`. Decoding goes through the closed [`ResourceKind`] table; anything
//! outside it is rejected as an unknown GVK.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::extensions::{AuthConfigSpec, RateLimitConfigSpec};
use super::gateway::{GatewaySpec, MatchableHttpGatewaySpec};
use super::id::{Gvk, ResourceKind, ResourceRef};
use super::object::{Metadata, Object};
use super::options::{RouteOptionSpec, VirtualHostOptionSpec};
use super::proxy::ProxySpec;
use super::route::RouteTableSpec;
use super::secret::SecretSpec;
use super::upstream::UpstreamSpec;
use super::virtual_service::VirtualServiceSpec;
use crate::errors::ValidationError;

pub type Gateway = Object<GatewaySpec>;
pub type MatchableHttpGateway = Object<MatchableHttpGatewaySpec>;
pub type VirtualService = Object<VirtualServiceSpec>;
pub type RouteTable = Object<RouteTableSpec>;
pub type VirtualHostOption = Object<VirtualHostOptionSpec>;
pub type RouteOption = Object<RouteOptionSpec>;
pub type Upstream = Object<UpstreamSpec>;
pub type Secret = Object<SecretSpec>;
pub type AuthConfig = Object<AuthConfigSpec>;
pub type RateLimitConfig = Object<RateLimitConfigSpec>;

macro_rules! resources {
    ($($variant:ident($spec:ty)),+ $(,)?) => {
        /// A configured resource of any recognized kind.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Resource {
            $($variant(Object<$spec>)),+
        }

        impl Resource {
            pub fn kind(&self) -> ResourceKind {
                match self {
                    $(Resource::$variant(_) => ResourceKind::$variant),+
                }
            }

            pub fn metadata(&self) -> &Metadata {
                match self {
                    $(Resource::$variant(object) => &object.metadata),+
                }
            }

            /// Encode with `apiVersion`/`kind` so it can be decoded again.
            pub fn to_value(&self) -> serde_json::Result<Value> {
                let mut value = match self {
                    $(Resource::$variant(object) => serde_json::to_value(object)?),+
                };
                let gvk = self.kind().gvk();
                if let Value::Object(map) = &mut value {
                    map.insert("apiVersion".to_string(), Value::String(gvk.api_version()));
                    map.insert("kind".to_string(), Value::String(gvk.kind));
                }
                Ok(value)
            }
        }

        fn decode_as(kind: ResourceKind, value: Value) -> Result<Resource, ValidationError> {
            match kind {
                $(ResourceKind::$variant => {
                    decode_object::<$spec>(kind, value).map(Resource::$variant)
                }),+
            }
        }

        $(
            impl From<Object<$spec>> for Resource {
                fn from(object: Object<$spec>) -> Self {
                    Resource::$variant(object)
                }
            }
        )+
    };
}

resources! {
    Gateway(GatewaySpec),
    MatchableHttpGateway(MatchableHttpGatewaySpec),
    VirtualService(VirtualServiceSpec),
    RouteTable(RouteTableSpec),
    VirtualHostOption(VirtualHostOptionSpec),
    RouteOption(RouteOptionSpec),
    Upstream(UpstreamSpec),
    Proxy(ProxySpec),
    Secret(SecretSpec),
    AuthConfig(AuthConfigSpec),
    RateLimitConfig(RateLimitConfigSpec),
}

impl Resource {
    pub fn reference(&self) -> ResourceRef {
        self.metadata().reference()
    }

    pub fn gvk(&self) -> Gvk {
        self.kind().gvk()
    }
}

fn decode_object<S: DeserializeOwned>(
    kind: ResourceKind,
    value: Value,
) -> Result<Object<S>, ValidationError> {
    serde_json::from_value(value).map_err(|e| ValidationError::Unmarshal {
        gvk: kind.gvk().to_string(),
        reason: e.to_string(),
    })
}

/// Read the GVK embedded in an encoded item.
pub fn parse_gvk(value: &Value) -> Result<Gvk, ValidationError> {
    let field = |name: &str| value.get(name).and_then(Value::as_str);
    match (field("apiVersion"), field("kind")) {
        (Some(api_version), Some(kind)) => Ok(Gvk::from_api_version(api_version, kind)),
        _ => Err(ValidationError::Unmarshal {
            gvk: "<unknown>".to_string(),
            reason: "item must carry string apiVersion and kind fields".to_string(),
        }),
    }
}

/// Decode one self-describing item.
pub fn decode_resource(value: &Value) -> Result<Resource, ValidationError> {
    let gvk = parse_gvk(value)?;
    let kind = ResourceKind::from_gvk(&gvk)
        .ok_or_else(|| ValidationError::UnknownGvk(gvk.to_string()))?;

    let mut body = value.clone();
    if let Value::Object(map) = &mut body {
        map.remove("apiVersion");
        map.remove("kind");
    }
    decode_as(kind, body)
}

/// Decode a multi-document YAML stream; empty documents are skipped.
pub fn decode_resources_yaml(input: &str) -> Result<Vec<Resource>, ValidationError> {
    let mut resources = Vec::new();
    for document in serde_yaml::Deserializer::from_str(input) {
        let value = Value::deserialize(document).map_err(|e| ValidationError::Unmarshal {
            gvk: "<unknown>".to_string(),
            reason: e.to_string(),
        })?;
        if value.is_null() {
            continue;
        }
        resources.push(decode_resource(&value)?);
    }
    Ok(resources)
}
