//! API operations concerning the company account.

use serde::Deserialize;

use crate::api::{ApiRequest, DataResponse};

/// A report suite visible to the authenticated user.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSuite {
    /// The report suite id, e.g. `omniture.api-gateway`.
    pub rsid: String,
    /// The display name.
    pub site_title: String,
}

/// The response to [`GetReportSuites`].
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSuites {
    /// Every suite the user can query.
    #[serde(default)]
    pub report_suites: Vec<RawSuite>,
}

impl DataResponse for ReportSuites {}

/// List the report suites available to the account.
#[derive(Debug, Clone, Copy)]
pub struct GetReportSuites;

impl ApiRequest for GetReportSuites {
    type Response = ReportSuites;

    fn method(&self) -> &'static str {
        "Company.GetReportSuites"
    }
}
