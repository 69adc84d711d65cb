//! Downstream xDS validation
//!
//! Takes a proxy produced by the translator, materializes its clusters,
//! converts everything into Envoy protobufs and checks the result the way
//! Envoy would before accepting it:
//! - `conversion`: proxy model to `envoy-types` listeners, routes and clusters
//! - `report`: the listener → virtual host → route diagnostic tree
//! - `validator`: [`XdsProxyValidator`], the in-process downstream validator

pub mod conversion;
pub mod report;
pub mod validator;

use async_trait::async_trait;

use crate::domain::{Proxy, Resource};
use crate::errors::Result;
use crate::reports::ResourceReports;
use crate::snapshot::ApiSnapshot;

pub use report::{
    proxy_errors, proxy_warnings, ListenerReport, ProxyReport, RouteReport, VirtualHostReport,
};
pub use validator::XdsProxyValidator;

/// One downstream validation result for one proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct XdsValidationReport {
    /// The proxy as the downstream validator materialized it, if it got that far.
    pub proxy: Option<Proxy>,
    pub proxy_report: ProxyReport,
    pub resource_reports: ResourceReports,
}

/// Validates a translated proxy against the resources it depends on.
///
/// `resource` is the resource being admitted. With `should_delete` the
/// validator must behave as if it were already gone from `snapshot`.
/// Implementations are expected to return exactly one report per call.
#[async_trait]
pub trait XdsValidator: Send + Sync {
    async fn validate(
        &self,
        snapshot: &ApiSnapshot,
        proxy: &Proxy,
        resource: Option<&Resource>,
        should_delete: bool,
    ) -> Result<Vec<XdsValidationReport>>;
}
