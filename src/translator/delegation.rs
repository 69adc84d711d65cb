//! Route table delegation.
//!
//! A delegating route hands every request under its prefixes to the routes
//! of one or more route tables. Tables are visited in (weight, reference)
//! order and may delegate further; a table that is already on the current
//! path closes a cycle and is skipped.

use super::selector::select_route_tables;
use super::virtual_host::{ParentRoute, RouteConverter};
use crate::domain::{
    DelegateAction, PathMatch, ProxyRoute, ResourceKind, RouteMatcher, RouteOptions, RouteTable,
};
use crate::reports::ResourceKey;

impl<'a> RouteConverter<'a, '_> {
    pub(super) fn delegate(
        &mut self,
        owner: &ResourceKey,
        route_name: &str,
        matchers: &[RouteMatcher],
        options: Option<RouteOptions>,
        action: &DelegateAction,
    ) -> Vec<ProxyRoute> {
        let mut prefixes = Vec::with_capacity(matchers.len());
        for matcher in matchers {
            match matcher.path() {
                Ok(PathMatch::Prefix(prefix)) => prefixes.push(prefix),
                _ => {
                    self.reports.add_error(
                        owner.clone(),
                        format!(
                            "route {}: delegating routes must use prefix matchers",
                            route_name
                        ),
                    );
                    return Vec::new();
                }
            }
        }

        let tables = self.delegated_tables(owner, route_name, action);
        let parent = ParentRoute {
            name: route_name,
            prefixes,
            options,
        };
        let mut routes = Vec::new();

        for table in tables {
            let reference = table.reference();
            if let Some(start) = self.visiting.iter().position(|visited| visited == &reference) {
                let cycle: Vec<String> = self.visiting[start..]
                    .iter()
                    .chain(std::iter::once(&reference))
                    .map(ToString::to_string)
                    .collect();
                self.reports.add_error(
                    owner.clone(),
                    format!("delegation cycle detected: {}", cycle.join(" -> ")),
                );
                continue;
            }

            let child = ResourceKey::new(ResourceKind::RouteTable, reference.clone());
            self.reports.accept(child.clone());

            self.visiting.push(reference.clone());
            let name = reference.to_string();
            let converted =
                self.convert_routes(&child, &name, &table.spec.routes, Some(&parent));
            routes.extend(converted);
            self.visiting.pop();
        }

        routes
    }

    fn delegated_tables(
        &mut self,
        owner: &ResourceKey,
        route_name: &str,
        action: &DelegateAction,
    ) -> Vec<&'a RouteTable> {
        let snapshot = self.snapshot;
        let mut tables: Vec<&'a RouteTable> = Vec::new();

        for reference in &action.refs {
            match snapshot.route_table(reference) {
                Some(table) => tables.push(table),
                None => self.reports.add_error(
                    owner.clone(),
                    format!("route table {} does not exist", reference),
                ),
            }
        }

        if let Some(selector) = &action.selector {
            let selected = select_route_tables(snapshot, &owner.reference.namespace, selector);
            if selected.is_empty() {
                self.reports.add_warning(
                    owner.clone(),
                    format!(
                        "route {}: delegate selector matched no route tables",
                        route_name
                    ),
                );
            }
            tables.extend(selected);
        }

        tables.sort_by_key(|table| (table.spec.weight, table.reference()));
        tables.dedup_by_key(|table| table.reference());
        tables
    }
}
