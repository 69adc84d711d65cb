use crate::domain::Proxy;
use crate::errors::{ValidationError, ValidationErrors};
use crate::reports::ResourceReports;
use crate::xds::ProxyReport;

/// Everything a validation call produced, accepted or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReports {
    /// Proxies as the xDS validator materialized them.
    pub proxies: Vec<Proxy>,
    pub proxy_reports: Vec<ProxyReport>,
    /// Translator, xDS and extension reports merged per resource.
    pub resource_reports: ResourceReports,
}

impl ValidationReports {
    pub fn merge(&mut self, other: ValidationReports) {
        self.proxies.extend(other.proxies);
        self.proxy_reports.extend(other.proxy_reports);
        self.resource_reports.merge(other.resource_reports);
    }
}

/// `{reports, err}` of a validation call. `errors` is `None` on accept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    pub reports: ValidationReports,
    pub errors: Option<ValidationErrors>,
}

impl ValidationOutcome {
    /// Accepted iff `errors` is empty.
    pub fn new(reports: ValidationReports, errors: ValidationErrors) -> Self {
        Self {
            reports,
            errors: (!errors.is_empty()).then_some(errors),
        }
    }

    pub fn accepted(reports: ValidationReports) -> Self {
        Self {
            reports,
            errors: None,
        }
    }

    pub fn rejected(reports: ValidationReports, errors: impl Into<ValidationErrors>) -> Self {
        Self {
            reports,
            errors: Some(errors.into()),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.errors.is_none()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.as_ref().map(ValidationErrors::messages).unwrap_or_default()
    }

    pub fn has_error(&self, predicate: impl Fn(&ValidationError) -> bool) -> bool {
        self.errors.as_ref().is_some_and(|errors| errors.contains(predicate))
    }

    pub fn into_result(self) -> Result<ValidationReports, ValidationErrors> {
        match self.errors {
            None => Ok(self.reports),
            Some(errors) => Err(errors),
        }
    }
}
