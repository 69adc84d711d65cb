//! # Validation
//!
//! The validation core and the checks it runs:
//! - `validator`: [`GatewayValidator`], the lock-guarded admission core
//! - `list`: ordered validation of several changes under one lock
//! - `differential`: the equivalence check behind secret deletes
//! - `extensions`: plugin resource validation
//! - `envoy_validation`: protocol checks on generated Envoy resources
//! - `context` / `outcome`: per-call inputs and results

pub mod context;
mod differential;
pub mod envoy_validation;
pub mod extensions;
mod list;
pub mod outcome;
mod validator;

pub use context::ValidationContext;
pub use extensions::{ExtensionValidator, PluginExtensionValidator};
pub use outcome::{ValidationOutcome, ValidationReports};
pub use validator::GatewayValidator;
