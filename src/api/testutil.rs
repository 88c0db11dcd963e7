//! A scripted [`Transport`] and vendor payload fixtures for unit tests.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex},
};

use serde::Deserialize;
use serde_json::{Value, json};

use crate::{BoxError, Client, Profile, Transport};

#[derive(Debug, Deserialize)]
struct MethodParam {
    method: String,
}

#[derive(Debug, Default)]
struct MockState {
    responses: BTreeMap<String, VecDeque<(u16, Value)>>,
    requests: Vec<(String, String)>,
}

/// Serves canned JSON per API method and records every request. The last
/// canned response for a method is sticky: it keeps being served once the
/// queue is drained to it.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport(Arc<Mutex<MockState>>);

impl MockTransport {
    /// Replace whatever is queued for `method` with a single response.
    pub(crate) fn respond(&self, method: &str, status: u16, body: Value) {
        let mut state = self.0.lock().unwrap();
        state
            .responses
            .insert(method.to_owned(), VecDeque::from([(status, body)]));
    }

    /// Queue another response for `method`, after those already queued.
    pub(crate) fn then(&self, method: &str, status: u16, body: Value) {
        let mut state = self.0.lock().unwrap();
        state
            .responses
            .entry(method.to_owned())
            .or_default()
            .push_back((status, body));
    }

    /// How many times `method` was called.
    pub(crate) fn calls(&self, method: &str) -> usize {
        self.bodies(method).len()
    }

    /// The total number of requests, across all methods.
    pub(crate) fn total_calls(&self) -> usize {
        self.0.lock().unwrap().requests.len()
    }

    /// The JSON bodies sent to `method`, in order.
    pub(crate) fn bodies(&self, method: &str) -> Vec<Value> {
        let state = self.0.lock().unwrap();
        state
            .requests
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, body)| serde_json::from_str(body).unwrap())
            .collect()
    }
}

impl Transport for MockTransport {
    fn send(&self, req: http::Request<String>) -> Result<http::Response<Vec<u8>>, BoxError> {
        assert!(req.headers().contains_key("x-wsse"), "unsigned request");

        let MethodParam { method } = serde_qs::from_str(req.uri().query().unwrap_or_default())?;
        let mut state = self.0.lock().unwrap();
        state.requests.push((method.clone(), req.into_body()));

        let Some(queue) = state.responses.get_mut(&method) else {
            return Err(format!("no canned response for {method}").into());
        };

        let (status, body) = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue[0].clone()
        };

        Ok(http::Response::builder()
            .status(status)
            .body(serde_json::to_vec(&body)?)?)
    }
}

/// A client wired to a [`MockTransport`] that already answers the catalog
/// methods, `Report.Queue` and `Report.CancelReport`.
pub(crate) fn test_client() -> (Client, MockTransport) {
    let mock = MockTransport::default();
    mock.respond("Company.GetReportSuites", 200, report_suites());
    mock.respond("Report.GetMetrics", 200, metrics());
    mock.respond("Report.GetElements", 200, elements());
    mock.respond("Segments.Get", 200, segments());
    mock.respond("Report.Queue", 200, json!({"reportID": 123456}));
    mock.respond("Report.CancelReport", 200, json!(true));

    let profile = Profile::new("analyst:Example Corp", "s3cr3t").unwrap();
    (Client::with_transport(profile, mock.clone()), mock)
}

pub(crate) fn report_suites() -> Value {
    json!({
        "report_suites": [
            {"rsid": "omniture.api-gateway", "site_title": "Reference Index"},
            {"rsid": "omniture.demo", "site_title": "Demo Suite"},
        ]
    })
}

pub(crate) fn metrics() -> Value {
    json!([
        {"id": "pageviews", "name": "Page Views", "type": "number", "decimals": 0},
        {"id": "visits", "name": "Visits", "type": "number", "decimals": 0},
        {"id": "revenue", "name": "Revenue", "type": "currency", "decimals": 2},
        {"id": "bouncerate", "name": "Bounce Rate", "type": "percent", "decimals": 1},
    ])
}

pub(crate) fn elements() -> Value {
    json!([
        {"id": "page", "name": "Page"},
        {"id": "browser", "name": "Browser"},
        {"id": "trackingcode", "name": "Tracking Code"},
        {"id": "evar2", "name": "Campaign Owner"},
        {"id": "prop1", "name": "Section"},
    ])
}

pub(crate) fn segments() -> Value {
    json!([
        {"id": "s300_1", "name": "Visits from Search"},
        {"id": "s300_2", "name": "Mobile"},
        {"id": "s300_3", "name": "Mobile"},
        {"id": "537d509ee4b0893ab30b9bc9", "name": "Returning Visitors"},
    ])
}

/// The vendor's answer while a report is still running.
pub(crate) fn not_ready() -> Value {
    json!({
        "error": "report_not_ready",
        "error_description": "Report not ready",
        "error_uri": null,
    })
}

fn metric(id: &str, name: &str, decimals: u32) -> Value {
    json!({"id": id, "name": name, "type": "number", "decimals": decimals})
}

/// A ranked report by page, broken down by browser.
pub(crate) fn ranked_report() -> Value {
    json!({
        "report": {
            "type": "ranked",
            "reportSuite": {"id": "omniture.api-gateway", "name": "Reference Index"},
            "period": "Sun. 1 Jan. 2017 - Mon. 2 Jan. 2017",
            "elements": [
                {"id": "page", "name": "Page"},
                {"id": "browser", "name": "Browser"},
            ],
            "metrics": [
                metric("pageviews", "Page Views", 0),
                metric("bouncerate", "Bounce Rate", 1),
            ],
            "segment_id": "s300_1",
            "data": [
                {
                    "name": "Home",
                    "url": "",
                    "counts": ["150", "0.3"],
                    "breakdown": [
                        {"name": "Chrome", "url": "", "counts": ["100", "0.25"]},
                        {"name": "Firefox", "url": "", "counts": ["50", "0.4"]},
                    ],
                },
                {
                    "name": "Search",
                    "url": "",
                    "counts": ["20", "0.1"],
                    "breakdown": [
                        {"name": "Chrome", "url": "", "counts": ["20", "0.1"]},
                    ],
                },
            ],
            "totals": ["170", "0.28"],
            "version": "1.4.16.10",
        },
        "waitSeconds": "1.5",
        "runSeconds": 0.25,
    })
}

/// A trended report by page, one day at a time.
pub(crate) fn trended_report() -> Value {
    json!({
        "report": {
            "type": "trended",
            "period": "Sun. 1 Jan. 2017 - Mon. 2 Jan. 2017",
            "elements": [{"id": "page", "name": "Page"}],
            "metrics": [metric("pageviews", "Page Views", 0)],
            "data": [
                {
                    "name": "Sun. 1 Jan. 2017",
                    "year": 2017, "month": 1, "day": 1,
                    "breakdown": [
                        {"name": "Home", "counts": ["10"]},
                        {"name": "Search", "counts": ["5"]},
                    ],
                },
                {
                    "name": "Mon. 2 Jan. 2017",
                    "year": 2017, "month": 1, "day": 2,
                    "breakdown": [{"name": "Home", "counts": ["12"]}],
                },
            ],
        },
        "waitSeconds": 0,
        "runSeconds": 0,
    })
}

/// An overtime report with the datetime element and no breakdown.
pub(crate) fn overtime_report() -> Value {
    json!({
        "report": {
            "type": "overtime",
            "period": "Sun. 1 Jan. 2017 - Mon. 2 Jan. 2017",
            "elements": [{"id": "datetime", "name": "Date"}],
            "metrics": [
                metric("pageviews", "Page Views", 0),
                metric("revenue", "Revenue", 2),
            ],
            "data": [
                {"name": "Sun. 1 Jan. 2017", "counts": ["100", "12.5"]},
                {"name": "Mon. 2 Jan. 2017", "counts": [90, 7]},
            ],
        },
        "waitSeconds": "0.000",
        "runSeconds": "0.100",
    })
}

/// A ranked report with the same element reported under two
/// classifications.
pub(crate) fn classified_report() -> Value {
    json!({
        "report": {
            "type": "ranked",
            "period": "2017-01-01",
            "elements": [
                {"id": "trackingcode", "name": "Tracking Code", "classification": "Campaign"},
                {"id": "trackingcode", "name": "Tracking Code", "classification": "Channel"},
            ],
            "metrics": [metric("visits", "Visits", 0)],
            "data": [
                {
                    "name": "Spring Sale",
                    "breakdown": [
                        {"name": "Email", "counts": ["7"]},
                        {"name": "Display", "counts": ["3"]},
                    ],
                },
            ],
        },
        "waitSeconds": 0,
        "runSeconds": 0,
    })
}

/// A report that matched nothing.
pub(crate) fn empty_report() -> Value {
    json!({
        "report": {
            "type": "ranked",
            "period": "2017-01-01",
            "elements": [{"id": "page", "name": "Page"}],
            "metrics": [metric("pageviews", "Page Views", 0)],
            "data": [],
        },
        "waitSeconds": 0,
        "runSeconds": 0,
    })
}

/// The vendor rejecting an unknown metric at submit time.
pub(crate) fn invalid_metric() -> Value {
    json!({
        "error": "metric_id_invalid",
        "error_description": "Metric \"bad_metric\" not valid",
        "error_uri": "https://marketing.adobe.com/developer/get-started",
    })
}

#[cfg(feature = "_integration-tests")]
fn live_profile() -> &'static Profile {
    static PROFILE: std::sync::OnceLock<Profile> = std::sync::OnceLock::new();
    PROFILE.get_or_init(|| {
        Profile::from_default_env()
            .expect("Failed to load test profile. Did you forget to set OMNITURE_PROFILE?")
    })
}

/// Execute an API request against the live API and parse the response.
#[cfg(feature = "_integration-tests")]
pub(crate) fn roundtrip<T: crate::ApiRequest>(req: T) -> Result<T::Response, crate::ApiError> {
    use crate::ApiResponse as _;

    let agent = crate::transport::default_agent();
    let req = req.into_request(live_profile()).expect("Failed to create request");
    let resp = agent.run(req).expect("HTTP Error");
    T::Response::from_response(resp.map(ureq::Body::into_reader))
}
