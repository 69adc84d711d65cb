//! Structured proxy diagnostics: listener → virtual host → route.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualHostReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route_reports: Vec<RouteReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_host_reports: Vec<VirtualHostReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyReport {
    #[serde(default)]
    pub listener_reports: Vec<ListenerReport>,
}

impl ProxyReport {
    /// Every error in the tree, prefixed with its location.
    pub fn errors(&self) -> Vec<String> {
        self.collect(|errors, _| errors)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.collect(|_, warnings| warnings)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings().is_empty()
    }

    fn collect<'a>(
        &'a self,
        pick: impl Fn(&'a [String], &'a [String]) -> &'a [String],
    ) -> Vec<String> {
        let mut out = Vec::new();
        for listener in &self.listener_reports {
            for message in pick(&listener.errors, &listener.warnings) {
                out.push(format!("listener {}: {}", listener.name, message));
            }
            for vhost in &listener.virtual_host_reports {
                for message in pick(&vhost.errors, &vhost.warnings) {
                    out.push(format!(
                        "listener {} virtual host {}: {}",
                        listener.name, vhost.name, message
                    ));
                }
                for route in &vhost.route_reports {
                    for message in pick(&route.errors, &route.warnings) {
                        out.push(format!(
                            "listener {} virtual host {} route {}: {}",
                            listener.name, vhost.name, route.name, message
                        ));
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for ProxyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// `Err` with every proxy-level error when the report has any.
pub fn proxy_errors(report: &ProxyReport) -> Result<(), String> {
    join_or_ok(report.errors())
}

/// `Err` with every proxy-level warning when the report has any.
pub fn proxy_warnings(report: &ProxyReport) -> Result<(), String> {
    join_or_ok(report.warnings())
}

fn join_or_ok(messages: Vec<String>) -> Result<(), String> {
    if messages.is_empty() {
        Ok(())
    } else {
        Err(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with_route_warning() -> ProxyReport {
        ProxyReport {
            listener_reports: vec![ListenerReport {
                name: "listener-::-8080".to_string(),
                virtual_host_reports: vec![VirtualHostReport {
                    name: "default.petstore".to_string(),
                    route_reports: vec![RouteReport {
                        name: "route-0".to_string(),
                        warnings: vec!["upstream default.missing not found".to_string()],
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_empty_report_passes_both_predicates() {
        let report = ProxyReport::default();
        assert!(proxy_errors(&report).is_ok());
        assert!(proxy_warnings(&report).is_ok());
    }

    #[test]
    fn test_route_warning_is_located() {
        let report = report_with_route_warning();
        assert!(proxy_errors(&report).is_ok());
        let warning = proxy_warnings(&report).unwrap_err();
        assert_eq!(
            warning,
            concat!(
                "listener listener-::-8080 virtual host default.petstore route route-0: ",
                "upstream default.missing not found"
            )
        );
    }

    #[test]
    fn test_display_is_json() {
        let rendered = report_with_route_warning().to_string();
        let parsed: ProxyReport = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, report_with_route_warning());
    }
}
