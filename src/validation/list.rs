//! Validation of a list of changes applied in order.

use std::time::Instant;

use serde_json::Value;
use tracing::{debug, Instrument};

use super::context::ValidationContext;
use super::outcome::{ValidationOutcome, ValidationReports};
use super::validator::{Apply, GatewayValidator, Intent};
use crate::domain::decode_resource;
use crate::errors::{ValidationError, ValidationErrors};

impl GatewayValidator {
    /// Validate every item as an upsert, in order, under one lock.
    ///
    /// Accepted items are committed as they go, so each item is validated
    /// against the cumulative effect of the items before it. Items that
    /// cannot be decoded fail on their own and the rest continue. With
    /// `dry_run` the committed snapshot is restored before returning.
    pub async fn validate_list(
        &self,
        ctx: &ValidationContext,
        items: &[Value],
        dry_run: bool,
    ) -> ValidationOutcome {
        let started = Instant::now();
        let span = crate::validation_span!("validate_list", items = items.len(), dry_run);

        let outcome = async {
            let mut state = self.state.write().await;
            let original = (state.latest.clone(), state.gateway_hash);
            let apply = Apply {
                commit: true,
                record: !dry_run,
            };

            let mut reports = ValidationReports::default();
            let mut errors = ValidationErrors::new();
            let mut cancelled = false;

            for (index, item) in items.iter().enumerate() {
                let resource = match decode_resource(item) {
                    Ok(resource) => resource,
                    Err(e) => {
                        debug!(index, error = %e, "List item could not be decoded");
                        errors.push(e);
                        continue;
                    }
                };

                let gvk = resource.gvk();
                let outcome = self
                    .validate_resource(&mut state, ctx, &gvk, resource, Intent::Upsert, apply)
                    .await;
                reports.merge(outcome.reports);
                if let Some(item_errors) = outcome.errors {
                    if item_errors.contains(ValidationError::is_interrupt) {
                        cancelled = true;
                        errors.extend(item_errors);
                        break;
                    }
                    errors.extend(item_errors);
                }
            }

            if dry_run || cancelled {
                state.latest = original.0;
                state.gateway_hash = original.1;
            }

            ValidationOutcome::new(reports, errors)
        }
        .instrument(span)
        .await;

        self.metrics.record_validation(
            "validate_list",
            outcome.is_accepted(),
            started.elapsed().as_secs_f64(),
        );
        outcome
    }
}
