//! # Error Handling
//!
//! [`FlowgateError`] covers ambient failures (configuration, serialization,
//! internal invariants). [`ValidationError`] is the closed set of reasons a
//! configuration change is rejected, aggregated into [`ValidationErrors`].

pub mod types;
pub mod validation;

pub use types::{FlowgateError, Result};
pub use validation::{same_multiset, ValidationError, ValidationErrors};
