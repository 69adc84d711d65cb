//! # Resource Reports
//!
//! Per-resource errors and warnings produced by the translator, the xDS
//! validator and the extension validator. Reports accumulate; nothing here
//! short-circuits.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{Resource, ResourceKind, ResourceRef};

/// Identifies the resource a report belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub reference: ResourceRef,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, reference: ResourceRef) -> Self {
        Self { kind, reference }
    }
}

impl From<&Resource> for ResourceKey {
    fn from(resource: &Resource) -> Self {
        Self::new(resource.kind(), resource.reference())
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.reference)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Failing resources rendered as one message per resource.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .messages.join("; "))]
pub struct ReportsError {
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceReports(BTreeMap<ResourceKey, ResourceReport>);

impl ResourceReports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resource as seen, with an empty report if it has none yet.
    pub fn accept(&mut self, key: ResourceKey) {
        self.0.entry(key).or_default();
    }

    pub fn add_error(&mut self, key: ResourceKey, error: impl Into<String>) {
        self.0.entry(key).or_default().errors.push(error.into());
    }

    pub fn add_warning(&mut self, key: ResourceKey, warning: impl Into<String>) {
        self.0.entry(key).or_default().warnings.push(warning.into());
    }

    /// Fold `other` into this report set, appending messages per resource.
    pub fn merge(&mut self, other: ResourceReports) {
        for (key, report) in other.0 {
            let entry = self.0.entry(key).or_default();
            entry.errors.extend(report.errors);
            entry.warnings.extend(report.warnings);
        }
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&ResourceReport> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKey, &ResourceReport)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.0.values().any(|r| !r.errors.is_empty())
    }

    pub fn has_warnings(&self) -> bool {
        self.0.values().any(|r| !r.warnings.is_empty())
    }

    /// Fails iff any resource carries an error.
    pub fn validate(&self) -> Result<(), ReportsError> {
        self.collect(false)
    }

    /// Fails iff any resource carries an error or a warning.
    pub fn validate_strict(&self) -> Result<(), ReportsError> {
        self.collect(true)
    }

    /// Strict or lax predicate depending on `strict`.
    pub fn validate_with(&self, strict: bool) -> Result<(), ReportsError> {
        self.collect(strict)
    }

    /// Warning messages, prefixed with the owning resource.
    pub fn warning_messages(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(key, report)| {
                report
                    .warnings
                    .iter()
                    .map(move |w| format!("{}: {}", key, w))
            })
            .collect()
    }

    /// Reports restricted to resources that have something to say.
    pub fn failing(&self) -> ResourceReports {
        Self(
            self.0
                .iter()
                .filter(|(_, r)| !r.errors.is_empty() || !r.warnings.is_empty())
                .map(|(k, r)| (k.clone(), r.clone()))
                .collect(),
        )
    }

    fn collect(&self, include_warnings: bool) -> Result<(), ReportsError> {
        let mut messages = Vec::new();
        for (key, report) in &self.0 {
            if !report.errors.is_empty() {
                messages.push(format!("invalid resource {}: {}", key, report.errors.join(", ")));
            }
            if include_warnings && !report.warnings.is_empty() {
                messages.push(format!(
                    "warnings on resource {}: {}",
                    key,
                    report.warnings.join(", ")
                ));
            }
        }
        if messages.is_empty() {
            Ok(())
        } else {
            Err(ReportsError { messages })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(name: &str) -> ResourceKey {
        ResourceKey::new(
            ResourceKind::VirtualService,
            ResourceRef::new("default", name),
        )
    }

    #[test]
    fn test_lax_and_strict_predicates() {
        let mut reports = ResourceReports::new();
        reports.accept(key("clean"));
        assert!(reports.validate_strict().is_ok());

        reports.add_warning(key("warned"), "route is unreachable");
        assert!(reports.validate().is_ok());
        let strict = reports.validate_strict().unwrap_err();
        assert_eq!(
            strict.to_string(),
            "warnings on resource VirtualService default.warned: route is unreachable"
        );

        reports.add_error(key("broken"), "domain conflict");
        assert!(reports.validate().is_err());
    }

    #[test]
    fn test_merge_appends_per_resource() {
        let mut a = ResourceReports::new();
        a.add_error(key("vs"), "first");
        let mut b = ResourceReports::new();
        b.add_error(key("vs"), "second");
        b.add_warning(key("other"), "hmm");
        a.merge(b);
        assert_eq!(a.get(&key("vs")).unwrap().errors, vec!["first", "second"]);
        assert_eq!(a.warning_messages(), vec!["VirtualService default.other: hmm"]);
        assert_eq!(a.failing().len(), 2);
    }

    proptest! {
        #[test]
        fn test_strict_fails_whenever_lax_fails(errors in 0usize..4, warnings in 0usize..4) {
            let mut reports = ResourceReports::new();
            for i in 0..errors {
                reports.add_error(key(&format!("e{}", i)), "error");
            }
            for i in 0..warnings {
                reports.add_warning(key(&format!("w{}", i)), "warning");
            }
            prop_assert_eq!(reports.validate().is_err(), errors > 0);
            prop_assert_eq!(reports.validate_strict().is_err(), errors + warnings > 0);
        }
    }
}
