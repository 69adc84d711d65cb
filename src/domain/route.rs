//! Routes shared by virtual services and route tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::id::ResourceRef;
use super::options::RouteOptions;

/// Path match resolved from a [`RouteMatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathMatch {
    Prefix(String),
    Exact(String),
    Regex(String),
}

impl PathMatch {
    /// A literal path this matcher is guaranteed to accept, used for
    /// delegation prefix checks. Regex matchers have none.
    pub fn literal(&self) -> Option<&str> {
        match self {
            PathMatch::Prefix(p) | PathMatch::Exact(p) => Some(p),
            PathMatch::Regex(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMatcher {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub regex: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderMatcher>,
}

impl RouteMatcher {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    /// Resolve the path specifier. No specifier means prefix `/`; more than
    /// one is an error.
    pub fn path(&self) -> Result<PathMatch, String> {
        match (&self.prefix, &self.exact, &self.regex) {
            (None, None, None) => Ok(PathMatch::Prefix("/".to_string())),
            (Some(p), None, None) => Ok(PathMatch::Prefix(p.clone())),
            (None, Some(e), None) => Ok(PathMatch::Exact(e.clone())),
            (None, None, Some(r)) => Ok(PathMatch::Regex(r.clone())),
            _ => Err(
                "route matcher must specify at most one of prefix, exact or regex".to_string(),
            ),
        }
    }

    /// True when the matcher accepts every request whose path starts with its prefix.
    pub fn is_unconstrained_prefix(&self) -> bool {
        self.exact.is_none()
            && self.regex.is_none()
            && self.methods.is_empty()
            && self.headers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub upstream: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedDestination {
    pub destination: Destination,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiDestination {
    pub destinations: Vec<WeightedDestination>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteAction {
    Single(Destination),
    Multi(MultiDestination),
}

impl RouteAction {
    pub fn upstreams(&self) -> Vec<&ResourceRef> {
        match self {
            RouteAction::Single(destination) => vec![&destination.upstream],
            RouteAction::Multi(multi) => {
                multi.destinations.iter().map(|d| &d.destination.upstream).collect()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateSelector {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Namespaces to search; empty means the owner's namespace, `*` means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateAction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<DelegateSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_redirect: Option<String>,
    #[serde(default = "default_redirect_code")]
    pub response_code: u32,
}

fn default_redirect_code() -> u32 {
    301
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectResponseAction {
    pub status: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    RouteAction(RouteAction),
    DelegateAction(DelegateAction),
    RedirectAction(RedirectAction),
    DirectResponseAction(DirectResponseAction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<RouteMatcher>,
    #[serde(flatten)]
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RouteOptions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub option_refs: Vec<ResourceRef>,
}

impl Route {
    pub fn to_upstream(prefix: &str, upstream: ResourceRef) -> Self {
        Self {
            name: None,
            matchers: vec![RouteMatcher::prefix(prefix)],
            action: Action::RouteAction(RouteAction::Single(Destination { upstream })),
            options: None,
            option_refs: Vec::new(),
        }
    }

    /// Matchers with the implicit catch-all filled in.
    pub fn effective_matchers(&self) -> Vec<RouteMatcher> {
        if self.matchers.is_empty() {
            vec![RouteMatcher::prefix("/")]
        } else {
            self.matchers.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableSpec {
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub weight: i32,
}
