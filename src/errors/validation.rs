//! # Validation Errors
//!
//! The closed set of reasons a configuration change can be rejected, and the
//! flat aggregate the validation core returns. Every variant renders a stable
//! message: differential deletes compare rendered messages between the pre-
//! and post-delete runs, so messages must not embed anything that differs
//! between the two (timestamps, operation ids, ...).

use std::fmt;

/// A single reason a validation call failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("validation is not available until the first configuration snapshot has been received")]
    NotReady,

    #[error("configuration snapshot is invalid, rejecting changes until it is repaired: {0}")]
    InvalidSnapshot(String),

    #[error("could not render proxy {proxy}: {reason}")]
    CouldNotRenderProxy { proxy: String, reason: String },

    #[error("failed xds validation for proxy {proxy}: {reason}")]
    FailedXdsValidation { proxy: String, reason: String },

    #[error("failed extension validation: {0}")]
    FailedResourceReports(String),

    #[error("expected exactly one xds validation report for proxy {proxy}, received {received}")]
    XdsValidationResponseLength { proxy: String, received: usize },

    #[error("xds validation request for proxy {proxy} failed: {reason}")]
    XdsValidation { proxy: String, reason: String },

    #[error("unknown resource kind {0}")]
    UnknownGvk(String),

    #[error("could not unmarshal {gvk} resource: {reason}")]
    Unmarshal { gvk: String, reason: String },

    #[error("resource kind mismatch: expected {expected}, got {actual}")]
    KindMismatch { expected: String, actual: String },

    #[error("invalid metadata on {kind} {reference}: {reason}")]
    InvalidMetadata {
        kind: String,
        reference: String,
        reason: String,
    },

    #[error("{kind} {reference} not found")]
    NotFound { kind: String, reference: String },

    #[error("validation cancelled before completion")]
    Cancelled,
}

impl ValidationError {
    /// Errors that describe the call itself rather than the configuration.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, ValidationError::Cancelled)
    }
}

/// Flat collection of validation errors, in the order they were observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Append every error from `other`, flattening nested aggregates.
    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn contains(&self, predicate: impl Fn(&ValidationError) -> bool) -> bool {
        self.0.iter().any(predicate)
    }

    /// Rendered messages, in observation order.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// Multiset equality of rendered messages.
    pub fn same_messages(&self, other: &ValidationErrors) -> bool {
        same_multiset(&self.messages(), &other.messages())
    }

    /// `Ok(())` when empty, otherwise the aggregate itself.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl FromIterator<ValidationError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "no errors"),
            [single] => write!(f, "1 error occurred: {}", single),
            errors => {
                write!(f, "{} errors occurred:", errors.len())?;
                for error in errors {
                    write!(f, "\n\t* {}", error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}

/// Order-independent comparison of two string sequences, counting duplicates.
pub fn same_multiset(left: &[String], right: &[String]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut left = left.to_vec();
    let mut right = right.to_vec();
    left.sort();
    right.sort();
    left == right
}
