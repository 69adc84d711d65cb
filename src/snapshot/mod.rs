//! # Configuration Snapshot
//!
//! [`ApiSnapshot`] is the typed, namespaced resource set the translator reads.
//! Every kind is kept as a list sorted by [`ResourceRef`], so two snapshots
//! holding the same resources compare, clone and hash identically no matter
//! the order resources arrived in.

use serde::Serialize;

use crate::domain::proxy::hash_bytes;
use crate::domain::{
    AuthConfig, Gateway, MatchableHttpGateway, Object, Proxy, RateLimitConfig, Resource,
    ResourceKind, ResourceRef, RouteOption, RouteTable, Secret, Upstream, VirtualHostOption,
    VirtualService,
};
use crate::errors::{Result, ValidationError};

/// Generates the per-kind storage and the dispatch between [`Resource`]
/// variants and the sorted lists holding them.
macro_rules! snapshot_kinds {
    ($($variant:ident => $field:ident: $ty:ty),+ $(,)?) => {
        #[derive(Debug, Clone, Default, PartialEq, Serialize)]
        pub struct ApiSnapshot {
            $(pub $field: Vec<$ty>),+
        }

        impl ApiSnapshot {
            /// Insert or replace by (kind, ref).
            pub fn upsert(
                &mut self,
                resource: Resource,
            ) -> std::result::Result<(), ValidationError> {
                validate_metadata(&resource)?;
                match resource {
                    $(Resource::$variant(object) => upsert_sorted(&mut self.$field, object)),+
                }
                Ok(())
            }

            /// Remove by (kind, ref), returning the removed resource.
            pub fn remove(
                &mut self,
                kind: ResourceKind,
                reference: &ResourceRef,
            ) -> std::result::Result<Resource, ValidationError> {
                let removed = match kind {
                    $(ResourceKind::$variant => {
                        remove_sorted(&mut self.$field, reference).map(Resource::$variant)
                    }),+
                };
                removed.ok_or_else(|| not_found(kind, reference))
            }

            pub fn find(
                &self,
                kind: ResourceKind,
                reference: &ResourceRef,
            ) -> std::result::Result<Resource, ValidationError> {
                let found = match kind {
                    $(ResourceKind::$variant => find_sorted(&self.$field, reference)
                        .cloned()
                        .map(Resource::$variant)),+
                };
                found.ok_or_else(|| not_found(kind, reference))
            }

            pub fn contains(&self, kind: ResourceKind, reference: &ResourceRef) -> bool {
                match kind {
                    $(ResourceKind::$variant => find_sorted(&self.$field, reference).is_some()),+
                }
            }

            /// Every stored resource, kind by kind in table order.
            pub fn resources(&self) -> Vec<Resource> {
                let mut all = Vec::with_capacity(self.len());
                $(all.extend(self.$field.iter().cloned().map(Resource::$variant));)+
                all
            }

            pub fn len(&self) -> usize {
                0 $(+ self.$field.len())+
            }

            pub fn count(&self, kind: ResourceKind) -> usize {
                match kind {
                    $(ResourceKind::$variant => self.$field.len()),+
                }
            }
        }
    };
}

snapshot_kinds! {
    Gateway => gateways: Gateway,
    MatchableHttpGateway => http_gateways: MatchableHttpGateway,
    VirtualService => virtual_services: VirtualService,
    RouteTable => route_tables: RouteTable,
    VirtualHostOption => virtual_host_options: VirtualHostOption,
    RouteOption => route_options: RouteOption,
    Upstream => upstreams: Upstream,
    Proxy => proxies: Proxy,
    Secret => secrets: Secret,
    AuthConfig => auth_configs: AuthConfig,
    RateLimitConfig => rate_limit_configs: RateLimitConfig,
}

/// The gateway-shape subset, borrowed for hashing.
#[derive(Serialize)]
struct GatewayShape<'a> {
    gateways: &'a [Gateway],
    http_gateways: &'a [MatchableHttpGateway],
    virtual_services: &'a [VirtualService],
    route_tables: &'a [RouteTable],
    virtual_host_options: &'a [VirtualHostOption],
    route_options: &'a [RouteOption],
}

impl ApiSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resources<I>(resources: I) -> std::result::Result<Self, ValidationError>
    where
        I: IntoIterator<Item = Resource>,
    {
        let mut snapshot = Self::new();
        for resource in resources {
            snapshot.upsert(resource)?;
        }
        Ok(snapshot)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Content hash over the kinds that can change translator output.
    /// Upstreams, secrets and plugin resources are not covered.
    pub fn gateway_hash(&self) -> Result<u64> {
        let shape = GatewayShape {
            gateways: &self.gateways,
            http_gateways: &self.http_gateways,
            virtual_services: &self.virtual_services,
            route_tables: &self.route_tables,
            virtual_host_options: &self.virtual_host_options,
            route_options: &self.route_options,
        };
        let encoded = serde_json::to_vec(&shape)?;
        Ok(hash_bytes(&encoded))
    }

    pub fn upstream(&self, reference: &ResourceRef) -> Option<&Upstream> {
        find_sorted(&self.upstreams, reference)
    }

    pub fn secret(&self, reference: &ResourceRef) -> Option<&Secret> {
        find_sorted(&self.secrets, reference)
    }

    pub fn virtual_service(&self, reference: &ResourceRef) -> Option<&VirtualService> {
        find_sorted(&self.virtual_services, reference)
    }

    pub fn route_table(&self, reference: &ResourceRef) -> Option<&RouteTable> {
        find_sorted(&self.route_tables, reference)
    }

    pub fn virtual_host_option(&self, reference: &ResourceRef) -> Option<&VirtualHostOption> {
        find_sorted(&self.virtual_host_options, reference)
    }

    pub fn route_option(&self, reference: &ResourceRef) -> Option<&RouteOption> {
        find_sorted(&self.route_options, reference)
    }

    pub fn http_gateway(&self, reference: &ResourceRef) -> Option<&MatchableHttpGateway> {
        find_sorted(&self.http_gateways, reference)
    }

    pub fn auth_config(&self, reference: &ResourceRef) -> Option<&AuthConfig> {
        find_sorted(&self.auth_configs, reference)
    }

    pub fn rate_limit_config(&self, reference: &ResourceRef) -> Option<&RateLimitConfig> {
        find_sorted(&self.rate_limit_configs, reference)
    }
}

fn validate_metadata(resource: &Resource) -> std::result::Result<(), ValidationError> {
    resource.metadata().validate().map_err(|reason| ValidationError::InvalidMetadata {
        kind: resource.kind().to_string(),
        reference: resource.reference().to_string(),
        reason,
    })
}

fn not_found(kind: ResourceKind, reference: &ResourceRef) -> ValidationError {
    ValidationError::NotFound {
        kind: kind.to_string(),
        reference: reference.to_string(),
    }
}

fn position<S>(list: &[Object<S>], reference: &ResourceRef) -> std::result::Result<usize, usize> {
    list.binary_search_by(|item| {
        (item.metadata.namespace.as_str(), item.metadata.name.as_str())
            .cmp(&(reference.namespace.as_str(), reference.name.as_str()))
    })
}

fn upsert_sorted<S>(list: &mut Vec<Object<S>>, object: Object<S>) {
    match position(list, &object.reference()) {
        Ok(index) => list[index] = object,
        Err(index) => list.insert(index, object),
    }
}

fn remove_sorted<S>(list: &mut Vec<Object<S>>, reference: &ResourceRef) -> Option<Object<S>> {
    position(list, reference).ok().map(|index| list.remove(index))
}

fn find_sorted<'a, S>(list: &'a [Object<S>], reference: &ResourceRef) -> Option<&'a Object<S>> {
    position(list, reference).ok().map(|index| &list[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SecretSpec, TlsSecret, UpstreamSpec, VirtualServiceSpec};
    use proptest::prelude::*;

    fn upstream(name: &str, port: u32) -> Resource {
        Object::new("default", name, UpstreamSpec::static_host("10.0.0.1", port)).into()
    }

    fn virtual_service(name: &str, domain: &str) -> Resource {
        Object::new(
            "default",
            name,
            VirtualServiceSpec::with_domains(&[domain], Vec::new()),
        )
        .into()
    }

    #[test]
    fn test_upsert_replaces_by_reference() {
        let mut snapshot = ApiSnapshot::new();
        snapshot.upsert(upstream("petstore", 80)).unwrap();
        snapshot.upsert(upstream("petstore", 8080)).unwrap();
        assert_eq!(snapshot.upstreams.len(), 1);
        assert_eq!(snapshot.upstreams[0].spec.hosts[0].port, 8080);
    }

    #[test]
    fn test_upsert_rejects_invalid_metadata() {
        let mut snapshot = ApiSnapshot::new();
        let err = snapshot.upsert(upstream("Not_Valid", 80)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMetadata { .. }));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_remove_and_find_report_not_found() {
        let mut snapshot = ApiSnapshot::from_resources(vec![upstream("a", 80)]).unwrap();
        let missing = ResourceRef::new("default", "b");
        assert!(matches!(
            snapshot.remove(ResourceKind::Upstream, &missing),
            Err(ValidationError::NotFound { .. })
        ));
        assert!(snapshot.find(ResourceKind::Upstream, &missing).is_err());

        let present = ResourceRef::new("default", "a");
        assert!(snapshot.find(ResourceKind::Upstream, &present).is_ok());
        snapshot.remove(ResourceKind::Upstream, &present).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_kinds_are_keyed_independently() {
        let secret: Resource = Object::new(
            "default",
            "a",
            SecretSpec::Tls(TlsSecret {
                cert_chain: "c".to_string(),
                private_key: "k".to_string(),
                root_ca: None,
            }),
        )
        .into();
        let snapshot = ApiSnapshot::from_resources(vec![upstream("a", 80), secret]).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains(ResourceKind::Secret, &ResourceRef::new("default", "a")));
    }

    #[test]
    fn test_clone_is_independent_of_the_original() {
        let original = ApiSnapshot::from_resources(vec![upstream("a", 80)]).unwrap();
        let mut clone = original.clone();
        clone.upsert(upstream("b", 80)).unwrap();
        assert_eq!(original.len(), 1);
        assert_eq!(clone.len(), 2);
    }

    #[test]
    fn test_gateway_hash_ignores_upstream_changes() {
        let base =
            ApiSnapshot::from_resources(vec![virtual_service("vs", "a.com"), upstream("u", 80)])
                .unwrap();
        let mut upstream_changed = base.clone();
        upstream_changed.upsert(upstream("u", 9090)).unwrap();
        assert_eq!(base.gateway_hash().unwrap(), upstream_changed.gateway_hash().unwrap());

        let mut vs_changed = base.clone();
        vs_changed.upsert(virtual_service("vs", "b.com")).unwrap();
        assert_ne!(base.gateway_hash().unwrap(), vs_changed.gateway_hash().unwrap());
    }

    proptest! {
        #[test]
        fn test_insertion_order_does_not_matter(
            names in proptest::collection::btree_set("[a-z]{1,8}", 1..12)
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let forward = ApiSnapshot::from_resources(names.iter().map(|n| upstream(n, 80)))
                .unwrap();
            let backward = ApiSnapshot::from_resources(names.iter().rev().map(|n| upstream(n, 80)))
                .unwrap();
            prop_assert_eq!(&forward, &backward);
            prop_assert_eq!(forward.gateway_hash().unwrap(), backward.gateway_hash().unwrap());
            prop_assert_eq!(forward.upstreams.len(), names.len());
        }
    }
}
