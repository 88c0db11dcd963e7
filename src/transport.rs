//! The HTTP layer underneath [`Client`](crate::Client).

use crate::BoxError;

/// Sends a fully built request and returns the raw response.
///
/// Implementations must not turn HTTP error statuses into errors: the
/// Reporting API returns its faults as JSON bodies on 4xx responses, and
/// those need to be parsed.
pub trait Transport: Send + Sync {
    /// Perform a single request.
    fn send(&self, req: http::Request<String>) -> Result<http::Response<Vec<u8>>, BoxError>;
}

/// Finished reports have no size cap.
const MAX_BODY: u64 = u64::MAX;

impl Transport for ureq::Agent {
    fn send(&self, req: http::Request<String>) -> Result<http::Response<Vec<u8>>, BoxError> {
        let resp = self.run(req)?;
        let (parts, mut body) = resp.into_parts();
        let bytes = body.with_config().limit(MAX_BODY).read_to_vec()?;
        Ok(http::Response::from_parts(parts, bytes))
    }
}

/// Build the default agent. Status codes are passed through so that vendor
/// error bodies reach the parser.
pub(crate) fn default_agent() -> ureq::Agent {
    ureq::Agent::new_with_config(
        ureq::config::Config::builder()
            .http_status_as_error(false)
            .build(),
    )
}
