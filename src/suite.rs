use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use tracing::debug;

use crate::{
    ApiRequest, CatalogItem, Directory, Entry, Error, Query,
    api::{
        reports::{CatalogEntries, GetElements, GetMetrics},
        segments::GetSegments,
    },
    client::Session,
};

/// A report suite: the unit of data collection that reports run against.
///
/// The suite's metric, element and segment catalogs are fetched lazily and
/// kept for the lifetime of the suite.
#[derive(Debug)]
pub struct Suite {
    title: String,
    id: String,
    session: Arc<Session>,
    metrics: OnceLock<Directory>,
    elements: OnceLock<Directory>,
    segments: OnceLock<Directory>,
    span: tracing::Span,
}

impl Suite {
    pub(crate) fn new(title: String, id: String, session: &Arc<Session>) -> Self {
        let span = tracing::debug_span!(parent: session.span(), "suite", id = %id);
        Self {
            title,
            id,
            session: Arc::clone(session),
            metrics: OnceLock::new(),
            elements: OnceLock::new(),
            segments: OnceLock::new(),
            span,
        }
    }

    pub(crate) fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub(crate) fn roundtrip<T: ApiRequest>(&self, req: T) -> Result<T::Response, Error> {
        let _guard = self.span.enter();
        self.session.roundtrip(req)
    }

    /// The metrics available in this suite.
    pub fn metrics(&self) -> Result<&Directory, Error> {
        self.catalog(&self.metrics, "metrics", || {
            self.roundtrip(GetMetrics {
                report_suite_id: &self.id,
            })
        })
    }

    /// The elements (dimensions) available in this suite.
    pub fn elements(&self) -> Result<&Directory, Error> {
        self.catalog(&self.elements, "elements", || {
            self.roundtrip(GetElements {
                report_suite_id: &self.id,
            })
        })
    }

    /// The segments visible to the user.
    pub fn segments(&self) -> Result<&Directory, Error> {
        self.catalog(&self.segments, "segments", || self.roundtrip(GetSegments))
    }

    fn catalog<'a>(
        &'a self,
        lock: &'a OnceLock<Directory>,
        name: &'static str,
        fetch: impl FnOnce() -> Result<CatalogEntries, Error>,
    ) -> Result<&'a Directory, Error> {
        if let Some(dir) = lock.get() {
            return Ok(dir);
        }

        let items = fetch()?
            .0
            .into_iter()
            .map(|entry| CatalogItem::from_entry(entry, "name", "id", &self.id))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(parent: &self.span, catalog = name, count = items.len(), "loaded catalog");
        Ok(lock.get_or_init(|| Directory::new(name, items)))
    }

    /// Start building a report against this suite.
    pub fn report(&self) -> Query<'_> {
        Query::new(self)
    }

    /// Rebuild a query from its JSON form, as produced by
    /// [`Query::to_json`]. Both the wrapped `{"reportDescription": ...}`
    /// form and a bare description are accepted. The suite id in the JSON
    /// is replaced with this suite's.
    pub fn query_from_json(&self, json: &str) -> Result<Query<'_>, Error> {
        Query::from_json(self, json)
    }
}

impl Entry for Suite {
    fn title(&self) -> &str {
        &self.title
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {}>", self.title, self.id)
    }
}
