//! API operations concerning reports and report suite catalogs.

use serde::{Deserialize, Serialize};

use crate::{
    ReportDescription,
    api::{ApiRequest, DataResponse},
};

/// The id the vendor assigns to a queued report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub u64);

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct ReportIdBody {
    #[serde(rename = "reportID")]
    report_id: ReportId,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct SuiteBody<'a> {
    #[serde(rename = "reportSuiteID")]
    report_suite_id: &'a str,
}

/// Raw catalog entries, as returned by `Report.GetMetrics`,
/// `Report.GetElements` and `Segments.Get`.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct CatalogEntries(pub Vec<serde_json::Map<String, serde_json::Value>>);

impl DataResponse for CatalogEntries {}

/// List the metrics available in a report suite.
#[derive(Debug, Clone, Copy)]
pub struct GetMetrics<'a> {
    /// The report suite id.
    pub report_suite_id: &'a str,
}

impl ApiRequest for GetMetrics<'_> {
    type Response = CatalogEntries;

    fn method(&self) -> &'static str {
        "Report.GetMetrics"
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(SuiteBody {
            report_suite_id: self.report_suite_id,
        })
    }
}

/// List the elements available in a report suite.
#[derive(Debug, Clone, Copy)]
pub struct GetElements<'a> {
    /// The report suite id.
    pub report_suite_id: &'a str,
}

impl ApiRequest for GetElements<'_> {
    type Response = CatalogEntries;

    fn method(&self) -> &'static str {
        "Report.GetElements"
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(SuiteBody {
            report_suite_id: self.report_suite_id,
        })
    }
}

/// Submit a report description to the vendor's queue.
#[derive(Debug, Clone, Copy)]
pub struct QueueReport<'a> {
    /// The report to run.
    pub description: &'a ReportDescription,
}

#[derive(Debug, Serialize)]
struct QueueReportBody<'a> {
    #[serde(rename = "reportDescription")]
    description: &'a ReportDescription,
}

/// The response to [`QueueReport`].
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Queued {
    /// The id to poll with.
    #[serde(rename = "reportID")]
    pub report_id: ReportId,
}

impl DataResponse for Queued {}

impl ApiRequest for QueueReport<'_> {
    type Response = Queued;

    fn method(&self) -> &'static str {
        "Report.Queue"
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(QueueReportBody {
            description: self.description,
        })
    }
}

/// Fetch a queued report. Fails with [`ApiError::NotReady`](crate::ApiError)
/// while the report is still running.
#[derive(Debug, Clone, Copy)]
pub struct GetReport {
    /// The id returned by [`QueueReport`].
    pub report_id: ReportId,
}

/// The raw payload of a finished report.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ReportResponse(pub serde_json::Value);

impl DataResponse for ReportResponse {}

impl ApiRequest for GetReport {
    type Response = ReportResponse;

    fn method(&self) -> &'static str {
        "Report.Get"
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(ReportIdBody {
            report_id: self.report_id,
        })
    }
}

/// Cancel a queued report.
#[derive(Debug, Clone, Copy)]
pub struct CancelReport {
    /// The id returned by [`QueueReport`].
    pub report_id: ReportId,
}

/// The response to [`CancelReport`]: whether the vendor accepted the
/// cancellation.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct Cancelled(pub bool);

impl DataResponse for Cancelled {}

impl ApiRequest for CancelReport {
    type Response = Cancelled;

    fn method(&self) -> &'static str {
        "Report.CancelReport"
    }

    fn body(&self) -> Option<impl Serialize> {
        Some(ReportIdBody {
            report_id: self.report_id,
        })
    }
}
