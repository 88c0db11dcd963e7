//! End-to-end checks against the live Reporting API, using the default
//! profile.

#![cfg(feature = "_integration-tests")]

use assert_matches::assert_matches;
use omniture::{
    ApiError, ApiErrorKind, Client, DateRange, Element, Entry as _, Error, Metric, NaiveDate,
    ReportState,
};

fn client() -> Client {
    Client::from_default_env()
        .expect("Failed to load test profile. Did you forget to set OMNITURE_PROFILE?")
}

fn yesterday() -> NaiveDate {
    chrono::Utc::now().date_naive() - chrono::Days::new(1)
}

#[test_log::test]
fn ranked_report() -> anyhow::Result<()> {
    let client = client();
    let suite = client.suite(0)?;

    let result = suite
        .report()
        .range(yesterday())?
        .element(Element::new("page").top(5))?
        .metric("pageviews")?
        .run()?;

    assert!(result.len() <= 5);
    assert!(result.records().all(|r| r.contains_key("page")));

    Ok(())
}

#[test_log::test]
fn trended_report() -> anyhow::Result<()> {
    let client = client();
    let suite = client.suite(0)?;

    let mut report = suite
        .report()
        .range(DateRange::new(yesterday() - chrono::Days::new(2)).days(3))?
        .granularity("day")?
        .element(Element::new("page").top(3))?
        .metric("pageviews")?
        .report();

    report.run_async()?;
    assert_eq!(report.state(), ReportState::Queued);
    let result = report.run()?;

    assert!(result.records().all(|r| r.contains_key("datetime")));
    Ok(())
}

#[test]
fn invalid_metric() -> anyhow::Result<()> {
    let client = client();
    let suite = client.suite(0)?;

    let query = suite
        .report()
        .range(yesterday())?
        .metric(Metric::unchecked("bad_metric"))?;

    assert_matches!(
        query.run(),
        Err(Error::Api(ApiError::InvalidReport {
            kind: ApiErrorKind::MetricIdInvalid,
            ..
        }))
    );

    Ok(())
}

#[test]
fn catalogs() -> anyhow::Result<()> {
    let client = client();
    let suite = client.suite(0)?;

    assert!(!suite.metrics()?.is_empty());
    let page = suite.elements()?.get("page")?;
    assert_eq!(page.owner(), suite.id());

    Ok(())
}
