use crate::{ApiError, ConfigError};

/// A boxed error returned by a [`Transport`](crate::Transport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Any error produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller passed malformed input, e.g. an unknown granularity or a
    /// filter with conflicting arguments.
    #[error("{0}")]
    InvalidArgument(String),
    /// No item in a directory matched the key.
    #[error("Cannot find {key} among the available {directory}")]
    NotFound {
        /// The key that was looked up.
        key: String,
        /// The name of the directory, e.g. "metrics".
        directory: &'static str,
    },
    /// More than one item in a directory matched the key.
    #[error("Found multiple matches for {key}: {}. Use the identifier instead.", .matches.join(", "))]
    Ambiguous {
        /// The key that was looked up.
        key: String,
        /// The display form of every match.
        matches: Vec<String>,
    },
    /// A result was requested from a report that was never submitted.
    #[error("Report not submitted")]
    ReportNotSubmitted,
    /// A result was requested from a report that is still queued.
    #[error("Report not ready")]
    ReportNotReady,
    /// The API returned an error.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The API returned a payload we couldn't interpret.
    #[error("Invalid report data: {0}")]
    InvalidData(String),
    /// The HTTP request could not be built.
    #[error("Failed to build request")]
    Request(#[from] http::Error),
    /// The underlying HTTP client failed.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),
    /// The configuration profile could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_data(msg: impl Into<String>) -> Self {
        Error::InvalidData(msg.into())
    }
}
