//! An immutable builder for report descriptions.
//!
//! Every builder method returns a new [`Query`], leaving the original
//! untouched, so a base query can be branched into several variants:
//!
//! ```no_run
//! # fn main() -> Result<(), omniture::Error> {
//! # let client = omniture::Client::from_default_env()?;
//! let suite = client.suite("Reference Index")?;
//! let base = suite.report().element("page")?.granularity("day")?;
//!
//! let views = base.metric("pageviews")?;
//! let visits = base.metric("visits")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use serde::Serialize;

use crate::{CatalogItem, Entry as _, Error, Report, ReportResult, Suite};

mod description;

pub use description::*;

type Properties = serde_json::Map<String, serde_json::Value>;

/// Something a query refers to: a key to look up in one of the suite's
/// catalogs, or an already resolved item.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// A title or id.
    Key(String),
    /// A catalog item.
    Item(CatalogItem),
}

impl Reference {
    /// The id to send. Keys are looked up with `lookup` unless validation
    /// is off.
    fn resolve(
        &self,
        validate: bool,
        lookup: impl FnOnce(&str) -> Result<String, Error>,
    ) -> Result<String, Error> {
        match self {
            Reference::Item(item) => Ok(item.id().to_owned()),
            Reference::Key(key) if validate => lookup(key),
            Reference::Key(key) => Ok(key.clone()),
        }
    }
}

impl From<&str> for Reference {
    fn from(key: &str) -> Self {
        Reference::Key(key.to_owned())
    }
}

impl From<String> for Reference {
    fn from(key: String) -> Self {
        Reference::Key(key)
    }
}

impl From<&CatalogItem> for Reference {
    fn from(item: &CatalogItem) -> Self {
        Reference::Item(item.clone())
    }
}

impl From<CatalogItem> for Reference {
    fn from(item: CatalogItem) -> Self {
        Reference::Item(item)
    }
}

/// An element to add to a query, with its breakdown parameters.
///
/// By default the key is checked against the suite's element catalog; use
/// [`Element::unchecked`] to send an id as-is.
#[derive(Debug, Clone)]
pub struct Element {
    reference: Reference,
    validate: bool,
    top: Option<u64>,
    starting_with: Option<u64>,
    classification: Option<String>,
    params: Properties,
}

impl Element {
    /// An element by title, id or catalog item.
    pub fn new(reference: impl Into<Reference>) -> Self {
        Self {
            reference: reference.into(),
            validate: true,
            top: None,
            starting_with: None,
            classification: None,
            params: Default::default(),
        }
    }

    /// An element id that is sent without checking the catalog.
    pub fn unchecked(id: impl Into<String>) -> Self {
        Self {
            validate: false,
            ..Self::new(Reference::Key(id.into()))
        }
    }

    /// Return at most `n` rows for this element.
    pub fn top(self, n: u64) -> Self {
        Self {
            top: Some(n),
            ..self
        }
    }

    /// Start from the `n`th row (1-based).
    pub fn starting_with(self, n: u64) -> Self {
        Self {
            starting_with: Some(n),
            ..self
        }
    }

    /// Report on a classification of the element.
    pub fn classification(self, classification: impl Into<String>) -> Self {
        Self {
            classification: Some(classification.into()),
            ..self
        }
    }

    /// Any other element parameter, e.g. `search` or `selected`.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A metric to add to a query.
#[derive(Debug, Clone)]
pub struct Metric {
    reference: Reference,
    validate: bool,
}

impl Metric {
    /// A metric by title, id or catalog item.
    pub fn new(reference: impl Into<Reference>) -> Self {
        Self {
            reference: reference.into(),
            validate: true,
        }
    }

    /// A metric id that is sent without checking the catalog.
    pub fn unchecked(id: impl Into<String>) -> Self {
        Self {
            reference: Reference::Key(id.into()),
            validate: false,
        }
    }
}

macro_rules! from_reference {
    ($target:ident: $($source:ty),+) => {
        $(
            impl From<$source> for $target {
                fn from(reference: $source) -> Self {
                    $target::new(reference)
                }
            }
        )+
    };
}

from_reference!(Element: &str, String, &CatalogItem, CatalogItem);
from_reference!(Metric: &str, String, &CatalogItem, CatalogItem);

/// A segment filter. Exactly one of a single segment, a list of segments or
/// a set of inline fields must be given.
///
/// ```
/// use omniture::Filter;
///
/// let saved = Filter::new().segment("Visits from Search");
/// let several = Filter::new().segments(["s300_1", "s300_2"]);
/// let inline = Filter::new()
///     .field("element", "page")
///     .field("selected", serde_json::json!(["Home"]));
/// ```
#[derive(Debug, Clone)]
pub struct Filter {
    segment: Option<Reference>,
    segments: Vec<Reference>,
    fields: Properties,
    validate: bool,
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter {
    /// An empty filter. Adding it to a query fails until something is set.
    pub fn new() -> Self {
        Self {
            segment: None,
            segments: Vec::new(),
            fields: Default::default(),
            validate: true,
        }
    }

    /// Filter by a single saved segment.
    pub fn segment(self, reference: impl Into<Reference>) -> Self {
        Self {
            segment: Some(reference.into()),
            ..self
        }
    }

    /// Filter by several saved segments.
    pub fn segments<R: Into<Reference>>(self, references: impl IntoIterator<Item = R>) -> Self {
        Self {
            segments: references.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Add a field to an inline segment definition.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Send segment keys as ids without checking the catalog.
    pub fn unchecked(self) -> Self {
        Self {
            validate: false,
            ..self
        }
    }
}

impl From<&str> for Filter {
    fn from(key: &str) -> Self {
        Filter::new().segment(key)
    }
}

impl From<&CatalogItem> for Filter {
    fn from(item: &CatalogItem) -> Self {
        Filter::new().segment(item)
    }
}

/// A report request under construction, bound to the suite it runs against.
#[derive(Debug, Clone)]
pub struct Query<'s> {
    suite: &'s Suite,
    description: ReportDescription,
}

impl<'s> Query<'s> {
    pub(crate) fn new(suite: &'s Suite) -> Self {
        Self {
            suite,
            description: ReportDescription::new(suite.id()),
        }
    }

    pub(crate) fn from_json(suite: &'s Suite, json: &str) -> Result<Self, Error> {
        let mut value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::invalid_argument(format!("Invalid query JSON: {e}")))?;
        if let Some(inner) = value.get_mut("reportDescription") {
            value = inner.take();
        }

        let mut description: ReportDescription = serde_json::from_value(value)
            .map_err(|e| Error::invalid_argument(format!("Invalid report description: {e}")))?;
        description.report_suite_id = suite.id().to_owned();

        Ok(Self { suite, description })
    }

    fn with(&self, f: impl FnOnce(&mut ReportDescription)) -> Self {
        let mut next = self.clone();
        f(&mut next.description);
        next
    }

    /// The suite this query runs against.
    pub fn suite(&self) -> &'s Suite {
        self.suite
    }

    /// The description as built so far.
    pub fn description(&self) -> &ReportDescription {
        &self.description
    }

    /// Set the date range. A range that resolves to a single day is sent as
    /// `date`, anything longer as `dateFrom` and `dateTo`.
    pub fn range(&self, range: impl Into<DateRange>) -> Result<Self, Error> {
        let range = range.into();
        let (start, stop) = range.resolve()?;
        Ok(self.with(|d| {
            d.set_dates(start, stop);
            if let Some(g) = range.granularity_level() {
                d.date_granularity = Some(g);
            }
        }))
    }

    /// Set the granularity: one of hour, day, week, month, quarter or year.
    pub fn granularity(&self, level: &str) -> Result<Self, Error> {
        let level: Granularity = level.parse()?;
        Ok(self.with(|d| d.date_granularity = Some(level)))
    }

    /// Add an element. The first element is the primary dimension of the
    /// report; each one after that breaks down the one before it.
    pub fn element(&self, element: impl Into<Element>) -> Result<Self, Error> {
        let element = element.into();
        if let Some(key) = element
            .params
            .keys()
            .find(|k| ElementSpec::FIELDS.contains(&k.as_str()))
        {
            return Err(Error::invalid_argument(format!(
                "Element parameter '{key}' has its own setter"
            )));
        }

        let id = element
            .reference
            .resolve(element.validate, |key| {
                Ok(self.suite.elements()?.get(key)?.id().to_owned())
            })?;

        let spec = ElementSpec {
            id,
            top: element.top,
            starting_with: element.starting_with,
            classification: element.classification,
            extra: element.params,
        };

        Ok(self.with(|d| d.elements.push(spec)))
    }

    /// An alias for [`Query::element`].
    pub fn breakdown(&self, element: impl Into<Element>) -> Result<Self, Error> {
        self.element(element)
    }

    /// Add several elements, in order.
    pub fn elements<E: Into<Element>>(
        &self,
        elements: impl IntoIterator<Item = E>,
    ) -> Result<Self, Error> {
        elements
            .into_iter()
            .try_fold(self.clone(), |query, e| query.element(e))
    }

    /// Add a metric.
    pub fn metric(&self, metric: impl Into<Metric>) -> Result<Self, Error> {
        let metric = metric.into();
        let id = metric
            .reference
            .resolve(metric.validate, |key| {
                Ok(self.suite.metrics()?.get(key)?.id().to_owned())
            })?;

        Ok(self.with(|d| {
            d.metrics.push(MetricSpec {
                id,
                extra: Default::default(),
            })
        }))
    }

    /// Add several metrics, in order.
    pub fn metrics<M: Into<Metric>>(
        &self,
        metrics: impl IntoIterator<Item = M>,
    ) -> Result<Self, Error> {
        metrics
            .into_iter()
            .try_fold(self.clone(), |query, m| query.metric(m))
    }

    /// Add a segment filter.
    pub fn filter(&self, filter: impl Into<Filter>) -> Result<Self, Error> {
        let Filter {
            segment,
            segments,
            fields,
            validate,
        } = filter.into();

        let supplied = [segment.is_some(), !segments.is_empty(), !fields.is_empty()]
            .into_iter()
            .filter(|s| *s)
            .count();
        if supplied != 1 {
            return Err(Error::invalid_argument(
                "A filter needs exactly one of a segment, a list of segments or inline fields",
            ));
        }

        let specs = if !fields.is_empty() {
            vec![SegmentSpec::Inline(fields)]
        } else {
            segment
                .into_iter()
                .chain(segments)
                .map(|r| -> Result<SegmentSpec, Error> {
                    let id = r.resolve(validate, |key| {
                        Ok(self.suite.segments()?.get(key)?.id().to_owned())
                    })?;
                    Ok(SegmentSpec::Reference(SegmentRef { id }))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(self.with(|d| d.segments.extend(specs)))
    }

    /// Rank rows by the given metric id.
    pub fn sort_by(&self, metric: &str) -> Self {
        self.with(|d| d.sort_by = Some(metric.to_owned()))
    }

    /// Include data the vendor hasn't finished processing.
    pub fn current_data(&self) -> Self {
        self.with(|d| d.current_data = true)
    }

    /// Set a raw property of the report description, for vendor features
    /// this builder has no method for. Known keys are type-checked.
    pub fn set(&self, key: &str, value: impl Serialize) -> Result<Self, Error> {
        self.set_all([(key, value)])
    }

    /// Set several raw properties at once.
    pub fn set_all<K, V>(&self, properties: impl IntoIterator<Item = (K, V)>) -> Result<Self, Error>
    where
        K: AsRef<str>,
        V: Serialize,
    {
        let mut raw = Properties::new();
        for (key, value) in properties {
            let key = key.as_ref();
            if key.is_empty() {
                return Err(Error::invalid_argument("Property keys must not be empty"));
            }

            let value = serde_json::to_value(value)
                .map_err(|e| Error::invalid_argument(format!("Invalid value for {key}: {e}")))?;
            if value.is_null() {
                return Err(Error::invalid_argument(format!("No value given for {key}")));
            }

            raw.insert(key.to_owned(), value);
        }

        if raw.is_empty() {
            return Err(Error::invalid_argument(
                "Setting properties requires at least one key and value",
            ));
        }

        Ok(Self {
            suite: self.suite,
            description: self.description.merge(raw)?,
        })
    }

    /// The request body for `Report.Queue`.
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::json!({ "reportDescription": self.description })
    }

    /// The request body as pretty-printed JSON, with sorted keys.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_wire())
            .expect("JSON serialization should be infallible")
    }

    /// A report handle for this query, not yet submitted.
    pub fn report(&self) -> Report<'s> {
        Report::new(self.suite, self.description.clone())
    }

    /// Run the query to completion and return the result.
    pub fn run(&self) -> Result<ReportResult, Error> {
        let mut report = self.report();
        report.run()?;
        report.into_result()
    }
}

impl fmt::Display for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}
