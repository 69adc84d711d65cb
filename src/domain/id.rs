//! Resource identity types
//!
//! [`ResourceRef`] identifies a configured resource within its kind,
//! [`Gvk`] is the wire discriminator and [`ResourceKind`] is the closed
//! table of kinds the validation core understands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_NAMESPACE: &str = "default";

pub(crate) fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// `{namespace, name}` pair, unique within a kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Group/version/kind triple. The core group is the empty string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Parse from the `apiVersion` and `kind` fields of a serialized object.
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Generates the closed kind table together with its GVK lookups.
macro_rules! resource_kinds {
    ($($variant:ident => ($group:literal, $version:literal)),+ $(,)?) => {
        /// Every resource kind the validation core recognizes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum ResourceKind {
            $($variant),+
        }

        impl ResourceKind {
            pub const ALL: &'static [ResourceKind] = &[$(ResourceKind::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ResourceKind::$variant => stringify!($variant)),+
                }
            }

            pub fn gvk(&self) -> Gvk {
                match self {
                    $(ResourceKind::$variant => Gvk::new($group, $version, stringify!($variant))),+
                }
            }

            /// Exact lookup; group, version and kind must all match.
            pub fn from_gvk(gvk: &Gvk) -> Option<Self> {
                Self::ALL.iter().copied().find(|kind| &kind.gvk() == gvk)
            }
        }

        impl FromStr for ResourceKind {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(ResourceKind::$variant),)+
                    other => Err(format!("unknown resource kind '{}'", other)),
                }
            }
        }
    };
}

resource_kinds! {
    Gateway => ("gateway.flowgate.io", "v1"),
    MatchableHttpGateway => ("gateway.flowgate.io", "v1"),
    VirtualService => ("gateway.flowgate.io", "v1"),
    RouteTable => ("gateway.flowgate.io", "v1"),
    VirtualHostOption => ("gateway.flowgate.io", "v1"),
    RouteOption => ("gateway.flowgate.io", "v1"),
    Upstream => ("flowgate.io", "v1"),
    Proxy => ("flowgate.io", "v1"),
    Secret => ("", "v1"),
    AuthConfig => ("extauth.flowgate.io", "v1"),
    RateLimitConfig => ("ratelimit.flowgate.io", "v1alpha1"),
}

impl ResourceKind {
    /// Kinds whose content can change translator output.
    pub fn affects_gateway_translation(&self) -> bool {
        matches!(
            self,
            ResourceKind::Gateway
                | ResourceKind::MatchableHttpGateway
                | ResourceKind::VirtualService
                | ResourceKind::RouteTable
                | ResourceKind::VirtualHostOption
                | ResourceKind::RouteOption
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
