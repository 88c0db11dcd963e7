use std::{
    io::Cursor,
    sync::{Arc, OnceLock},
};

use tracing::{debug, trace};

use crate::{
    ApiRequest, ApiResponse as _, Directory, Error, Profile, Suite, Transport,
    api::company::GetReportSuites, catalog::Key, transport::default_agent,
};

/// The authenticated connection shared by a client and all of its suites.
pub(crate) struct Session {
    profile: Profile,
    transport: Box<dyn Transport>,
    span: tracing::Span,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub(crate) fn roundtrip<T: ApiRequest>(&self, req: T) -> Result<T::Response, Error> {
        let method = req.method();
        let req = req.into_request(&self.profile)?;

        let _guard = self.span.enter();
        trace!(method, "sending request");
        let resp = self.transport.send(req).map_err(Error::Transport)?;
        debug!(method, status = %resp.status(), "received response");

        Ok(T::Response::from_response(resp.map(Cursor::new))?)
    }
}

/// An authenticated client for the Reporting API.
///
/// ```no_run
/// # fn main() -> Result<(), omniture::Error> {
/// let client = omniture::Client::from_default_env()?;
/// let suite = client.suite("Reference Index")?;
/// let result = suite
///     .report()
///     .element("page")?
///     .metric("pageviews")?
///     .run()?;
///
/// for record in result.records() {
///     println!("{record:?}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    session: Arc<Session>,
    suites: OnceLock<Directory<Suite>>,
}

impl Client {
    /// Create a client that talks to the profile's endpoint over HTTPS.
    pub fn new(profile: Profile) -> Self {
        Self::with_transport(profile, default_agent())
    }

    /// Create a client on top of a custom [`Transport`].
    pub fn with_transport(profile: Profile, transport: impl Transport + 'static) -> Self {
        let span = tracing::debug_span!("omniture", user = %profile.username);
        Self {
            session: Arc::new(Session {
                profile,
                transport: Box::new(transport),
                span,
            }),
            suites: OnceLock::new(),
        }
    }

    /// Create a client from the default profile. See
    /// [`Profile::from_default_env`].
    pub fn from_default_env() -> Result<Self, Error> {
        Ok(Self::new(Profile::from_default_env()?))
    }

    /// The profile the client authenticates with.
    pub fn profile(&self) -> &Profile {
        &self.session.profile
    }

    /// Send a single typed request and parse the response. This is the
    /// escape hatch for API methods that have no higher-level wrapper.
    pub fn roundtrip<T: ApiRequest>(&self, req: T) -> Result<T::Response, Error> {
        self.session.roundtrip(req)
    }

    /// Every report suite visible to the user. Fetched once, on first
    /// access.
    pub fn suites(&self) -> Result<&Directory<Suite>, Error> {
        if let Some(suites) = self.suites.get() {
            return Ok(suites);
        }

        let resp = self.session.roundtrip(GetReportSuites)?;
        let suites: Vec<_> = resp
            .report_suites
            .into_iter()
            .map(|raw| Suite::new(raw.site_title, raw.rsid, &self.session))
            .collect();

        debug!(parent: self.session.span(), count = suites.len(), "loaded report suites");
        Ok(self
            .suites
            .get_or_init(|| Directory::new("report suites", suites)))
    }

    /// Look up a single report suite by position, title or id.
    pub fn suite<'k>(&self, key: impl Into<Key<'k>>) -> Result<&Suite, Error> {
        self.suites()?.lookup(key)
    }
}
