use std::io::Read;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::Profile;

mod auth;
pub mod company;
mod error;
pub mod reports;
pub mod segments;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::*;

use error::RawApiError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawApiResponse<T> {
    Error(RawApiError),
    Data(T),
}

/// The query string carried by every request.
#[derive(Debug, Serialize)]
struct MethodQuery<'a> {
    method: &'a str,
}

/// Implemented by types that can be sent as requests to the Reporting API.
pub trait ApiRequest: Sized {
    /// The corresponding response type.
    type Response: ApiResponse;

    /// The fully qualified API method, e.g. `Report.Queue`.
    fn method(&self) -> &'static str;

    /// The serializable request body. Methods without parameters send an
    /// empty JSON object.
    fn body(&self) -> Option<impl Serialize> {
        None::<&()>
    }

    /// Consume the request and return an [http::Request] suitable for passing
    /// to your favorite HTTP client. The request is signed with a fresh WSSE
    /// token for the profile's credentials.
    fn into_request(self, profile: &Profile) -> Result<http::Request<String>, http::Error> {
        let mut parts = profile.api_endpoint.clone().into_parts();

        let qs = serde_qs::to_string(&MethodQuery {
            method: self.method(),
        })
        .expect("query string serialization should be infallible");
        let path = parts
            .path_and_query
            .as_ref()
            .map(|pq| pq.path())
            .unwrap_or("/");
        parts.path_and_query = Some(format!("{path}?{qs}").parse()?);

        let uri = http::Uri::from_parts(parts)?;
        let body_str = match self.body() {
            Some(body) => {
                serde_json::to_string(&body).expect("JSON serialization should be infallible")
            }
            None => "{}".to_string(),
        };

        http::Request::builder()
            .method(http::Method::POST)
            .uri(uri)
            .header(
                auth::WSSE_HEADER,
                auth::wsse_header(&profile.username, &profile.secret),
            )
            .header(http::header::USER_AGENT, &profile.user_agent)
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::CONTENT_LENGTH, body_str.len())
            .body(body_str)
    }
}

/// Implemented by types that can be read as responses from the Reporting API.
pub trait ApiResponse: Sized {
    /// Read the response from an [http::Response] object.
    fn from_response(resp: http::Response<impl Read>) -> Result<Self, ApiError> {
        let (parts, body) = resp.into_parts();
        Self::from_response_parts(parts, body)
    }

    /// Read the response from pre-parsed parts.
    fn from_response_parts(parts: http::response::Parts, body: impl Read)
    -> Result<Self, ApiError>;
}

/// A private trait for types that deserialize directly from the response
/// body.
pub(crate) trait DataResponse: DeserializeOwned {}

impl<T: DataResponse> ApiResponse for T {
    fn from_response_parts(
        parts: http::response::Parts,
        body: impl Read,
    ) -> Result<Self, ApiError> {
        let raw: RawApiResponse<Self> = serde_json::from_reader(body).map_err(|e| {
            tracing::error!("Failed to parse API response: {e:#?}");
            ApiError::InvalidResponse(parts.status)
        })?;

        match raw {
            RawApiResponse::Data(data) => Ok(data),
            RawApiResponse::Error(error) => Err(ApiError::from_raw(parts.status, error)),
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use assert_matches::assert_matches;

    use super::*;
    use super::reports::ReportId;

    fn response(status: u16, body: &str) -> http::Response<Cursor<Vec<u8>>> {
        http::Response::builder()
            .status(status)
            .body(Cursor::new(body.as_bytes().to_vec()))
            .unwrap()
    }

    #[test]
    fn into_request_signs_and_posts() -> anyhow::Result<()> {
        let profile = Profile::new("analyst:Example Corp", "s3cr3t")?;
        let req = reports::CancelReport {
            report_id: ReportId(42),
        };

        let http_req = req.into_request(&profile)?;
        assert_eq!(http_req.method(), http::Method::POST);
        assert_eq!(
            http_req.uri().to_string(),
            "https://api.omniture.com/admin/1.4/rest/?method=Report.CancelReport"
        );
        assert_eq!(http_req.body(), r#"{"reportID":42}"#);

        let wsse = http_req.headers()["x-wsse"].to_str()?;
        assert!(wsse.starts_with("UsernameToken Username=\"analyst:Example Corp\""));

        Ok(())
    }

    #[test]
    fn empty_body_is_an_object() -> anyhow::Result<()> {
        let profile = Profile::new("analyst:Example Corp", "s3cr3t")?;
        let http_req = company::GetReportSuites.into_request(&profile)?;
        assert_eq!(http_req.body(), "{}");

        Ok(())
    }

    #[test]
    fn error_body_is_parsed() {
        let resp = response(
            400,
            r#"{"error":"element_id_invalid","error_description":"Element \"bad_element\" not valid","error_uri":""}"#,
        );

        assert_matches!(
            reports::Queued::from_response(resp),
            Err(ApiError::InvalidReport {
                kind: ApiErrorKind::ElementIdInvalid,
                ..
            })
        );
    }

    #[test]
    fn garbage_body() {
        let resp = response(502, "<html>Bad Gateway</html>");
        assert_matches!(
            reports::Queued::from_response(resp),
            Err(ApiError::InvalidResponse(status)) if status == http::StatusCode::BAD_GATEWAY
        );
    }
}
