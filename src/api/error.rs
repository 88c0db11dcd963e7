use std::str::FromStr as _;

use serde::Deserialize;

/// An error response from the API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The report is still being computed on the vendor side. This is
    /// absorbed by polling and only surfaces from raw requests.
    NotReady,
    /// The API rejected the request with an application-level error code,
    /// e.g. an unknown metric or element.
    InvalidReport {
        /// The HTTP status on the overall response.
        status: http::StatusCode,
        /// The error code from the API.
        kind: ApiErrorKind,
        /// A longer description of the error encountered.
        description: Option<String>,
        /// A link to the vendor documentation for the error.
        uri: Option<String>,
    },
    /// The API response was invalid.
    InvalidResponse(http::StatusCode),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotReady => {
                write!(f, "Report not ready")?;
            }
            ApiError::InvalidReport {
                kind,
                description,
                uri,
                ..
            } => {
                write!(f, "{kind}")?;
                if let Some(description) = &description {
                    write!(f, ": {description}")?;
                }
                if let Some(uri) = uri.as_deref().filter(|u| !u.is_empty()) {
                    write!(f, " ({uri})")?;
                }
            }
            ApiError::InvalidResponse(status) => {
                write!(f, "Invalid response ({status})")?;
            }
        }

        Ok(())
    }
}

impl ApiError {
    /// The error code, if the API returned one.
    pub fn kind(&self) -> Option<&ApiErrorKind> {
        match self {
            ApiError::NotReady => Some(&ApiErrorKind::ReportNotReady),
            ApiError::InvalidReport { kind, .. } => Some(kind),
            ApiError::InvalidResponse(_) => None,
        }
    }
}

/// Indicates that the error code was unrecognized.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid error kind: {0}")]
pub struct InvalidErrorKind(String);

macro_rules! api_error_kinds {
    ($($code:literal => $variant:ident),* $(,)?) => {
        /// An error code from the API.
        #[derive(Debug, Clone, PartialEq, Eq)]
        #[non_exhaustive]
        pub enum ApiErrorKind {
            $(
                #[doc = $code]
                $variant,
            )*
            /// An unknown error code.
            Unknown(String),
        }

        impl std::fmt::Display for ApiErrorKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $(ApiErrorKind::$variant => $code,)*
                    ApiErrorKind::Unknown(kind) => kind,
                })
            }
        }

        impl std::str::FromStr for ApiErrorKind {
            type Err = InvalidErrorKind;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(match s {
                    $($code => ApiErrorKind::$variant,)*
                    _ => return Err(InvalidErrorKind(s.to_string())),
                })
            }
        }
    };
}

api_error_kinds! {
    "report_not_ready" => ReportNotReady,
    "metric_id_invalid" => MetricIdInvalid,
    "element_id_invalid" => ElementIdInvalid,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawApiError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error_uri: Option<String>,
}

impl ApiError {
    pub(crate) fn from_raw(status: http::StatusCode, raw: RawApiError) -> Self {
        let kind = ApiErrorKind::from_str(&raw.error).unwrap_or(ApiErrorKind::Unknown(raw.error));
        if kind == ApiErrorKind::ReportNotReady {
            return ApiError::NotReady;
        }

        ApiError::InvalidReport {
            status,
            kind,
            description: raw.error_description,
            uri: raw.error_uri,
        }
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn not_ready_is_its_own_variant() {
        let raw = RawApiError {
            error: "report_not_ready".to_string(),
            error_description: Some("Report not ready".to_string()),
            error_uri: None,
        };

        assert_matches!(
            ApiError::from_raw(http::StatusCode::BAD_REQUEST, raw),
            ApiError::NotReady
        );
    }

    #[test]
    fn invalid_report_display() {
        let raw = RawApiError {
            error: "metric_id_invalid".to_string(),
            error_description: Some("Metric \"bad_metric\" not valid".to_string()),
            error_uri: Some("https://marketing.adobe.com/developer/en_US/get-started".to_string()),
        };

        let err = ApiError::from_raw(http::StatusCode::BAD_REQUEST, raw);
        assert_eq!(err.kind(), Some(&ApiErrorKind::MetricIdInvalid));
        assert_eq!(
            err.to_string(),
            "metric_id_invalid: Metric \"bad_metric\" not valid \
             (https://marketing.adobe.com/developer/en_US/get-started)"
        );
    }

    #[test]
    fn unknown_kind() {
        let raw = RawApiError {
            error: "quota_exceeded".to_string(),
            error_description: None,
            error_uri: Some(String::new()),
        };

        let err = ApiError::from_raw(http::StatusCode::BAD_REQUEST, raw);
        assert_matches!(
            &err,
            ApiError::InvalidReport { kind: ApiErrorKind::Unknown(k), .. } if k == "quota_exceeded"
        );
        assert_eq!(err.to_string(), "quota_exceeded");
    }
}
