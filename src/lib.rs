//! # Flowgate
//!
//! Gateway validation core for the Flowgate Envoy control plane. Flowgate
//! decides, at admission time, whether a proposed change to the gateway
//! configuration may be accepted.
//!
//! ## Architecture
//!
//! ```text
//! snapshot source ─ sync ─▶ GatewayValidator ◀─ validate_* ─ admission caller
//!                                 │
//!                 Translator → XdsValidator → ExtensionValidator
//! ```
//!
//! ## Core Components
//!
//! - **Snapshot**: the typed, namespaced resource set ([`snapshot::ApiSnapshot`])
//! - **Translator**: gateways to proxies with per-resource reports
//! - **xDS validator**: materializes clusters and checks the generated Envoy resources
//! - **Validation core**: serialized admission with dry runs, list validation
//!   and differential secret deletes
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use flowgate::{ApiSnapshot, GatewayValidator, ValidationConfig, ValidationContext};
//!
//! # async fn run(snapshot: ApiSnapshot, items: Vec<serde_json::Value>) {
//! let validator = GatewayValidator::with_defaults(ValidationConfig::default());
//! validator.sync(snapshot).await.ok();
//!
//! let outcome = validator.validate_list(&ValidationContext::new(), &items, true).await;
//! if let Some(errors) = outcome.errors {
//!     eprintln!("{}", errors);
//! }
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod reports;
pub mod snapshot;
pub mod translator;
pub mod validation;
pub mod xds;

pub use config::{AppConfig, ValidationConfig};
pub use domain::{Gvk, Resource, ResourceKind, ResourceRef};
pub use errors::{FlowgateError, Result, ValidationError, ValidationErrors};
pub use reports::{ResourceKey, ResourceReports};
pub use snapshot::ApiSnapshot;
pub use translator::{GatewayTranslator, Translator};
pub use validation::{GatewayValidator, ValidationContext, ValidationOutcome, ValidationReports};
pub use xds::{XdsProxyValidator, XdsValidationReport, XdsValidator};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
