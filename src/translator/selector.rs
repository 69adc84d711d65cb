//! Reference and label selection of virtual services, route tables and
//! delegated HTTP gateways.

use crate::domain::{
    DelegateSelector, DelegatedHttpGateways, HttpGateway, MatchableHttpGateway, RouteTable,
    VirtualService,
};
use crate::reports::{ResourceKey, ResourceReports};
use crate::snapshot::ApiSnapshot;

const ALL_NAMESPACES: &str = "*";

/// Empty or `*` selects every namespace.
fn any_namespace(namespaces: &[String], namespace: &str) -> bool {
    namespaces.is_empty() || namespaces.iter().any(|n| n == ALL_NAMESPACES || n == namespace)
}

/// Virtual services an HTTP gateway serves, sorted by reference.
///
/// Explicit references win over the label selector; a reference that does
/// not resolve is an error on `owner`. Only virtual services whose TLS
/// setting matches `ssl` are kept.
pub(super) fn select_virtual_services<'a>(
    snapshot: &'a ApiSnapshot,
    owner: &ResourceKey,
    http: &HttpGateway,
    ssl: bool,
    reports: &mut ResourceReports,
) -> Vec<&'a VirtualService> {
    let mut selected: Vec<&VirtualService> = if http.virtual_services.is_empty() {
        snapshot
            .virtual_services
            .iter()
            .filter(|vs| vs.matches_labels(&http.virtual_service_selector))
            .filter(|vs| any_namespace(&http.virtual_service_namespaces, &vs.metadata.namespace))
            .collect()
    } else {
        http.virtual_services
            .iter()
            .filter_map(|reference| {
                let found = snapshot.virtual_service(reference);
                if found.is_none() {
                    reports.add_error(
                        owner.clone(),
                        format!("virtual service {} does not exist", reference),
                    );
                }
                found
            })
            .collect()
    };

    selected.retain(|vs| vs.spec.ssl_config.is_some() == ssl);
    selected.sort_by_key(|vs| vs.reference());
    selected.dedup_by_key(|vs| vs.reference());
    selected
}

/// Route tables matched by a delegate selector. No namespaces means the
/// owner's namespace.
pub(super) fn select_route_tables<'a>(
    snapshot: &'a ApiSnapshot,
    owner_namespace: &str,
    selector: &DelegateSelector,
) -> Vec<&'a RouteTable> {
    snapshot
        .route_tables
        .iter()
        .filter(|table| table.matches_labels(&selector.labels))
        .filter(|table| {
            if selector.namespaces.is_empty() {
                table.metadata.namespace == owner_namespace
            } else {
                any_namespace(&selector.namespaces, &table.metadata.namespace)
            }
        })
        .collect()
}

/// MatchableHttpGateways a hybrid gateway delegates to. Selectors only
/// look in the owner's namespace.
pub(super) fn select_http_gateways<'a>(
    snapshot: &'a ApiSnapshot,
    owner: &ResourceKey,
    delegated: &DelegatedHttpGateways,
    reports: &mut ResourceReports,
) -> Vec<&'a MatchableHttpGateway> {
    let mut selected: Vec<&MatchableHttpGateway> = if delegated.refs.is_empty() {
        if delegated.selector.is_empty() {
            return Vec::new();
        }
        snapshot
            .http_gateways
            .iter()
            .filter(|gateway| gateway.metadata.namespace == owner.reference.namespace)
            .filter(|gateway| gateway.matches_labels(&delegated.selector))
            .collect()
    } else {
        delegated
            .refs
            .iter()
            .filter_map(|reference| {
                let found = snapshot.http_gateway(reference);
                if found.is_none() {
                    reports.add_error(
                        owner.clone(),
                        format!("matchable http gateway {} does not exist", reference),
                    );
                }
                found
            })
            .collect()
    };

    selected.sort_by_key(|gateway| gateway.reference());
    selected.dedup_by_key(|gateway| gateway.reference());
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Object, ResourceKind, ResourceRef, RouteTableSpec, SslConfig, VirtualServiceSpec,
    };
    use std::collections::BTreeMap;

    fn owner() -> ResourceKey {
        ResourceKey::new(
            ResourceKind::Gateway,
            ResourceRef::new("flowgate-system", "http"),
        )
    }

    fn snapshot() -> ApiSnapshot {
        let mut secure = VirtualServiceSpec::with_domains(&["secure.com"], Vec::new());
        secure.ssl_config = Some(SslConfig::default());
        let shop = VirtualServiceSpec::with_domains(&["shop.com"], Vec::new());
        let admin = VirtualServiceSpec::with_domains(&["admin.com"], Vec::new());
        ApiSnapshot::from_resources(vec![
            Object::new("team-a", "shop", shop)
                .with_label("expose", "public")
                .into(),
            Object::new("team-b", "admin", admin).into(),
            Object::new("team-a", "secure", secure).into(),
            Object::new("team-a", "rt", RouteTableSpec::default())
                .with_label("app", "shop")
                .into(),
            Object::new("team-b", "rt", RouteTableSpec::default())
                .with_label("app", "shop")
                .into(),
        ])
        .unwrap()
    }

    fn names(selected: &[&VirtualService]) -> Vec<String> {
        selected.iter().map(|vs| vs.reference().to_string()).collect()
    }

    #[test]
    fn test_all_plain_virtual_services_by_default() {
        let snapshot = snapshot();
        let mut reports = ResourceReports::new();
        let selected = select_virtual_services(
            &snapshot,
            &owner(),
            &HttpGateway::default(),
            false,
            &mut reports,
        );
        assert_eq!(names(&selected), vec!["team-a.shop", "team-b.admin"]);

        let secure = select_virtual_services(
            &snapshot,
            &owner(),
            &HttpGateway::default(),
            true,
            &mut reports,
        );
        assert_eq!(names(&secure), vec!["team-a.secure"]);
        assert!(reports.is_empty());
    }

    #[test]
    fn test_selector_and_namespaces_narrow_the_selection() {
        let snapshot = snapshot();
        let mut reports = ResourceReports::new();
        let labels = BTreeMap::from([("expose".to_string(), "public".to_string())]);
        let by_label = HttpGateway {
            virtual_service_selector: labels,
            ..Default::default()
        };
        let selected = select_virtual_services(&snapshot, &owner(), &by_label, false, &mut reports);
        assert_eq!(names(&selected), vec!["team-a.shop"]);

        let by_namespace = HttpGateway {
            virtual_service_namespaces: vec!["team-b".to_string()],
            ..Default::default()
        };
        let selected =
            select_virtual_services(&snapshot, &owner(), &by_namespace, false, &mut reports);
        assert_eq!(names(&selected), vec!["team-b.admin"]);
    }

    #[test]
    fn test_dangling_reference_is_an_error_on_the_owner() {
        let snapshot = snapshot();
        let mut reports = ResourceReports::new();
        let http = HttpGateway {
            virtual_services: vec![
                ResourceRef::new("team-a", "shop"),
                ResourceRef::new("team-a", "gone"),
            ],
            ..Default::default()
        };
        let selected = select_virtual_services(&snapshot, &owner(), &http, false, &mut reports);
        assert_eq!(names(&selected), vec!["team-a.shop"]);
        assert_eq!(
            reports.get(&owner()).unwrap().errors,
            vec!["virtual service team-a.gone does not exist"]
        );
    }

    #[test]
    fn test_route_table_selection_defaults_to_owner_namespace() {
        let snapshot = snapshot();
        let selector = DelegateSelector {
            labels: BTreeMap::from([("app".to_string(), "shop".to_string())]),
            namespaces: Vec::new(),
        };
        assert_eq!(select_route_tables(&snapshot, "team-a", &selector).len(), 1);

        let everywhere = DelegateSelector {
            namespaces: vec!["*".to_string()],
            ..selector
        };
        assert_eq!(select_route_tables(&snapshot, "team-a", &everywhere).len(), 2);
    }
}
