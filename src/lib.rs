//! A client for the Adobe Analytics (formerly Omniture SiteCatalyst) 1.4
//! Reporting API.
//!
//! Reports are built with an immutable [`Query`], submitted to the vendor's
//! queue, polled until they finish, and returned as flat records:
//!
//! ```no_run
//! use omniture::{Client, DateRange, Element, NaiveDate};
//!
//! # fn main() -> Result<(), omniture::Error> {
//! let client = Client::from_default_env()?;
//! let suite = client.suite("Reference Index")?;
//!
//! let start = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
//! let result = suite
//!     .report()
//!     .range(DateRange::new(start).days(7))?
//!     .granularity("day")?
//!     .element(Element::new("page").top(10))?
//!     .metric("pageviews")?
//!     .run()?;
//!
//! for record in result.records() {
//!     println!("{} {}", record["page"], record["pageviews"]);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # HTTP Requests and Responses
//!
//! The typed API requests work with any HTTP client that uses the [`http`]
//! crate. Use [`ApiRequest::into_request`] to create a signed request, and
//! [`ApiResponse::from_response`] to parse the response:
//!
//! ```no_run
//! use omniture::{ApiRequest, ApiResponse, Profile, company::GetReportSuites};
//!
//! # fn main() -> anyhow::Result<()> {
//! let profile = Profile::from_default_env()?;
//!
//! let http_req = GetReportSuites.into_request(&profile)?;
//! let resp = ureq::Agent::new_with_config(
//!     ureq::config::Config::builder()
//!         .http_status_as_error(false)
//!         .build(),
//! )
//! .run(http_req)?;
//!
//! let suites = <GetReportSuites as ApiRequest>::Response::from_response(
//!     resp.map(ureq::Body::into_reader),
//! )?;
//!
//! for suite in suites.report_suites {
//!     println!("{}: {}", suite.rsid, suite.site_title);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(
    anonymous_parameters,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_qualifications,
    variant_size_differences
)]

mod api;
mod catalog;
mod client;
mod config;
mod error;
mod query;
mod report;
mod suite;
mod transport;

pub use api::{reports::ReportId, *};
pub use catalog::{CatalogItem, Directory, Entry, Key};
pub use chrono::NaiveDate;
pub use client::Client;
pub use config::{ConfigError, Profile};
pub use error::{BoxError, Error};
pub use query::*;
pub use report::*;
pub use suite::Suite;
pub use transport::Transport;
