//! Differential delete.
//!
//! Deleting a secret can surface errors that were already there before the
//! delete. When the pre-delete run reports the same errors, the same warnings
//! and the same proxies, the delete changes nothing a consumer can observe
//! and is accepted.

use crate::domain::Proxy;
use crate::errors::{same_multiset, ValidationErrors};

/// What one validation run observed, reduced to the comparable parts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunSummary {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// `namespace.name#hash` per proxy, `None` when a hash could not be computed.
    pub proxies: Option<Vec<String>>,
}

impl RunSummary {
    pub(crate) fn new(
        errors: &ValidationErrors,
        warnings: &[String],
        proxies: &[Proxy],
    ) -> Self {
        let proxies = proxies
            .iter()
            .map(|proxy| {
                proxy
                    .content_hash()
                    .ok()
                    .map(|hash| format!("{}#{:016x}", proxy.reference(), hash))
            })
            .collect();
        Self {
            errors: errors.messages(),
            warnings: warnings.to_vec(),
            proxies,
        }
    }

    /// Multiset equality of errors, warnings and proxy hashes. Unhashable
    /// proxies never compare equal.
    pub(crate) fn equivalent(&self, other: &RunSummary) -> bool {
        let proxies = match (&self.proxies, &other.proxies) {
            (Some(left), Some(right)) => same_multiset(left, right),
            _ => false,
        };
        proxies
            && same_multiset(&self.errors, &other.errors)
            && same_multiset(&self.warnings, &other.warnings)
    }
}
