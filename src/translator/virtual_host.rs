//! Virtual services to virtual hosts, routes to proxy routes.

use regex::Regex;

use super::GatewayTranslator;
use crate::domain::{
    Action, PathMatch, ProxyRoute, ProxyRouteAction, ProxyVirtualHost, ResourceKind, ResourceRef,
    Route, RouteMatcher, RouteOptions, VirtualHostOptions, VirtualService,
};
use crate::reports::{ResourceKey, ResourceReports};
use crate::snapshot::ApiSnapshot;

impl GatewayTranslator {
    pub(super) fn virtual_host(
        &self,
        snapshot: &ApiSnapshot,
        virtual_service: &VirtualService,
        reports: &mut ResourceReports,
    ) -> ProxyVirtualHost {
        let key = ResourceKey::new(
            ResourceKind::VirtualService,
            virtual_service.reference(),
        );
        reports.accept(key.clone());

        let spec = &virtual_service.spec.virtual_host;
        let name = virtual_service.reference().to_string();

        let options = if spec.options.is_none() && spec.option_refs.is_empty() {
            None
        } else {
            let mut options = spec.options.clone().unwrap_or_default();
            for reference in &spec.option_refs {
                match snapshot.virtual_host_option(reference) {
                    Some(referenced) => options.merge_from(&referenced.spec.options),
                    None => reports.add_error(
                        key.clone(),
                        format!("virtual host option {} does not exist", reference),
                    ),
                }
            }
            Some(options).filter(|o| o != &VirtualHostOptions::default())
        };

        let routes = RouteConverter::new(snapshot, reports)
            .convert_routes(&key, &name, &spec.routes, None);

        if self.warn_on_route_short_circuiting {
            warn_short_circuits(&key, &routes, reports);
        }

        ProxyVirtualHost {
            name,
            domains: spec.effective_domains(),
            routes,
            options,
        }
    }
}

/// The delegating route a set of child routes is rendered under.
pub(super) struct ParentRoute<'p> {
    pub name: &'p str,
    pub prefixes: Vec<String>,
    pub options: Option<RouteOptions>,
}

/// Flattens a route list, following delegation, into proxy routes.
pub(super) struct RouteConverter<'a, 'r> {
    pub(super) snapshot: &'a ApiSnapshot,
    pub(super) reports: &'r mut ResourceReports,
    /// Route tables on the current delegation path.
    pub(super) visiting: Vec<ResourceRef>,
}

impl<'a, 'r> RouteConverter<'a, 'r> {
    pub(super) fn new(snapshot: &'a ApiSnapshot, reports: &'r mut ResourceReports) -> Self {
        Self {
            snapshot,
            reports,
            visiting: Vec::new(),
        }
    }

    pub(super) fn convert_routes(
        &mut self,
        owner: &ResourceKey,
        name_prefix: &str,
        routes: &[Route],
        parent: Option<&ParentRoute<'_>>,
    ) -> Vec<ProxyRoute> {
        let mut converted = Vec::new();

        for (index, route) in routes.iter().enumerate() {
            let local_name = route
                .name
                .clone()
                .unwrap_or_else(|| format!("{}-route-{}", name_prefix, index));
            let name = match parent {
                Some(parent) => format!("{}/{}", parent.name, local_name),
                None => local_name,
            };

            let matchers = route.effective_matchers();
            if !self.check_matchers(owner, &name, &matchers) {
                continue;
            }
            if let Some(parent) = parent {
                if !self.check_delegated_prefixes(owner, &name, &matchers, parent) {
                    continue;
                }
            }

            let mut options = self.route_options(owner, route);
            if let Some(inherited) = parent.and_then(|p| p.options.as_ref()) {
                let mut merged = options.unwrap_or_default();
                merged.merge_from(inherited);
                options = Some(merged);
            }

            let action = match &route.action {
                Action::RouteAction(action) => ProxyRouteAction::Route(action.clone()),
                Action::RedirectAction(redirect) => ProxyRouteAction::Redirect(redirect.clone()),
                Action::DirectResponseAction(direct) => {
                    ProxyRouteAction::DirectResponse(direct.clone())
                }
                Action::DelegateAction(delegate) => {
                    converted.extend(self.delegate(owner, &name, &matchers, options, delegate));
                    continue;
                }
            };

            converted.push(ProxyRoute {
                name,
                matchers,
                action,
                options,
            });
        }

        converted
    }

    /// Inline options, filled from referenced RouteOptions.
    fn route_options(&mut self, owner: &ResourceKey, route: &Route) -> Option<RouteOptions> {
        if route.options.is_none() && route.option_refs.is_empty() {
            return None;
        }
        let mut options = route.options.clone().unwrap_or_default();
        for reference in &route.option_refs {
            match self.snapshot.route_option(reference) {
                Some(referenced) => options.merge_from(&referenced.spec.options),
                None => self.reports.add_error(
                    owner.clone(),
                    format!("route option {} does not exist", reference),
                ),
            }
        }
        Some(options)
    }

    /// Path specifiers must be unambiguous and regexes must compile.
    fn check_matchers(
        &mut self,
        owner: &ResourceKey,
        route_name: &str,
        matchers: &[RouteMatcher],
    ) -> bool {
        let mut valid = true;
        for matcher in matchers {
            match matcher.path() {
                Err(reason) => {
                    self.reports
                        .add_error(owner.clone(), format!("route {}: {}", route_name, reason));
                    valid = false;
                }
                Ok(PathMatch::Regex(pattern)) => {
                    if let Err(e) = Regex::new(&pattern) {
                        self.reports.add_error(
                            owner.clone(),
                            format!("route {}: invalid regex '{}': {}", route_name, pattern, e),
                        );
                        valid = false;
                    }
                }
                Ok(_) => {}
            }

            for header in matcher.headers.iter().filter(|h| h.regex) {
                let pattern = header.value.as_deref().unwrap_or_default();
                if let Err(e) = Regex::new(pattern) {
                    self.reports.add_error(
                        owner.clone(),
                        format!(
                            "route {}: invalid regex '{}' for header {}: {}",
                            route_name, pattern, header.name, e
                        ),
                    );
                    valid = false;
                }
            }
        }
        valid
    }

    /// Child paths must stay below one of the delegating prefixes.
    fn check_delegated_prefixes(
        &mut self,
        owner: &ResourceKey,
        route_name: &str,
        matchers: &[RouteMatcher],
        parent: &ParentRoute<'_>,
    ) -> bool {
        let mut valid = true;
        for matcher in matchers {
            let path = matcher.path().ok();
            let literal = path.as_ref().and_then(PathMatch::literal);
            let covered = literal.is_some_and(|l| {
                parent
                    .prefixes
                    .iter()
                    .any(|prefix| l.starts_with(prefix.as_str()))
            });
            if !covered {
                self.reports.add_error(
                    owner.clone(),
                    format!(
                        "route {}: path {} does not start with the delegating prefix {}",
                        route_name,
                        literal.unwrap_or("<regex>"),
                        parent.prefixes.join(", ")
                    ),
                );
                valid = false;
            }
        }
        valid
    }
}

/// Warn about routes an earlier catch-all prefix always wins over.
fn warn_short_circuits(
    owner: &ResourceKey,
    routes: &[ProxyRoute],
    reports: &mut ResourceReports,
) {
    for (index, route) in routes.iter().enumerate() {
        let shadowing = routes[..index].iter().find_map(|earlier| {
            earlier
                .matchers
                .iter()
                .filter(|m| m.is_unconstrained_prefix())
                .filter_map(|m| m.prefix.as_deref())
                .find(|prefix| route.matchers.iter().all(|m| starts_with(m, prefix)))
                .map(|prefix| (earlier.name.as_str(), prefix))
        });

        if let Some((earlier, prefix)) = shadowing {
            reports.add_warning(
                owner.clone(),
                format!(
                    "route {} is unreachable: route {} matches prefix {} first",
                    route.name, earlier, prefix
                ),
            );
        }
    }
}

/// Whether every path `matcher` accepts starts with `prefix`.
fn starts_with(matcher: &RouteMatcher, prefix: &str) -> bool {
    let path = matcher.path().ok();
    path.as_ref()
        .and_then(PathMatch::literal)
        .is_some_and(|literal| literal.starts_with(prefix))
}
