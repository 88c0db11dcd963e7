//! Turning a finished report payload into flat records.

use std::{collections::BTreeMap, fmt, str::FromStr as _, time::Duration};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{CatalogItem, Directory, Entry as _, Error, ReportDescription};

type Properties = serde_json::Map<String, serde_json::Value>;

/// The shape of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Rows ranked by a metric.
    Ranked,
    /// Metrics over time, with no element breakdown.
    Overtime,
    /// Element rows within each time bucket.
    Trended,
}

/// A single cell of a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    /// An element value, e.g. a page name or a date label.
    Text(String),
    /// A metric with no decimal places.
    Integer(i64),
    /// A metric with decimal places. Serializes as a string, so no digits
    /// are lost.
    Decimal(Decimal),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Integer(i) => i.fmt(f),
            Scalar::Decimal(d) => d.fmt(f),
        }
    }
}

/// One row of a flattened report, keyed by element key or metric id.
pub type Record = BTreeMap<String, Scalar>;

/// How long the vendor took with a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timing {
    /// Time spent waiting in the queue.
    pub queue: Duration,
    /// Time spent running.
    pub execution: Duration,
}

/// A finished report.
#[derive(Debug, Clone)]
pub struct ReportResult {
    /// How long the vendor took.
    pub timing: Timing,
    /// The metrics, in column order.
    pub metrics: Directory,
    /// The elements, in breakdown order.
    pub elements: Directory,
    /// The report shape.
    pub kind: ReportKind,
    /// The period covered, as labeled by the vendor.
    pub period: String,
    /// The segments the report was filtered by.
    pub segments: Vec<CatalogItem>,
    /// The flattened rows.
    pub data: Vec<Record>,
}

impl ReportResult {
    /// The first segment the report was filtered by, if any.
    pub fn segment(&self) -> Option<&CatalogItem> {
        self.segments.first()
    }

    /// Iterate over the rows.
    pub fn records(&self) -> std::slice::Iter<'_, Record> {
        self.data.iter()
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the report has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(f64),
    Text(String),
}

impl Seconds {
    fn to_duration(&self) -> Result<Duration, Error> {
        let secs = match self {
            Seconds::Number(n) => *n,
            Seconds::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::invalid_data(format!("invalid duration '{s}'")))?,
        };

        Duration::try_from_secs_f64(secs)
            .map_err(|_| Error::invalid_data(format!("invalid duration {secs}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPayload {
    wait_seconds: Seconds,
    run_seconds: Seconds,
    report: RawReport,
}

#[derive(Debug, Deserialize)]
struct RawReport {
    #[serde(rename = "type")]
    kind: ReportKind,
    #[serde(default)]
    period: Option<serde_json::Value>,
    #[serde(default)]
    elements: Vec<Properties>,
    #[serde(default)]
    metrics: Vec<Properties>,
    #[serde(default)]
    segment_id: Option<String>,
    #[serde(default)]
    segments: Vec<Properties>,
    #[serde(default)]
    data: Vec<Node>,
}

/// A node of the vendor's breakdown tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawNode")]
enum Node {
    Branch { name: String, children: Vec<Node> },
    Leaf { name: String, counts: Vec<serde_json::Value> },
    Empty { name: String },
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default)]
    name: serde_json::Value,
    #[serde(default)]
    breakdown: Option<Vec<Node>>,
    #[serde(default)]
    counts: Option<Vec<serde_json::Value>>,
}

impl From<RawNode> for Node {
    fn from(raw: RawNode) -> Self {
        let name = match raw.name {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };

        match (raw.breakdown, raw.counts) {
            (Some(children), _) if !children.is_empty() => Node::Branch { name, children },
            (_, Some(counts)) => Node::Leaf { name, counts },
            _ => Node::Empty { name },
        }
    }
}

impl Node {
    fn name(&self) -> &str {
        match self {
            Node::Branch { name, .. } | Node::Leaf { name, .. } | Node::Empty { name } => name,
        }
    }
}

/// Build a result from a `Report.Get` payload. `resolve_segment` looks up a
/// `segment_id` in the suite's segment catalog.
pub(crate) fn process(
    raw: &serde_json::Value,
    description: &ReportDescription,
    resolve_segment: impl FnOnce(&str) -> Result<CatalogItem, Error>,
) -> Result<ReportResult, Error> {
    let payload = RawPayload::deserialize(raw)
        .map_err(|e| Error::invalid_data(format!("unexpected report payload: {e}")))?;
    let owner = description.report_suite_id.as_str();
    let report = payload.report;

    let timing = Timing {
        queue: payload.wait_seconds.to_duration()?,
        execution: payload.run_seconds.to_duration()?,
    };

    let catalog = |entries: Vec<Properties>| {
        entries
            .into_iter()
            .map(|entry| CatalogItem::from_entry(entry, "name", "id", owner))
            .collect::<Result<Vec<_>, _>>()
    };
    let metrics = Directory::new("metrics", catalog(report.metrics)?);
    let elements = Directory::new("elements", catalog(report.elements)?);

    let segments = match report.segment_id.as_deref().filter(|s| !s.is_empty()) {
        Some(id) => vec![resolve_segment(id)?],
        None => report
            .segments
            .into_iter()
            .map(|entry| segment_item(entry, owner))
            .collect::<Result<Vec<_>, _>>()?,
    };

    let keys = elements
        .iter()
        .enumerate()
        .map(|(i, element)| {
            let classification = element.classification().or_else(|| {
                description
                    .elements
                    .get(i)
                    .and_then(|spec| spec.classification.as_deref())
                    .filter(|c| !c.is_empty())
            });

            match classification {
                Some(c) => format!("{} | {c}", element.id()),
                None => element.id().to_owned(),
            }
        })
        .collect();

    let flattener = Flattener {
        kind: report.kind,
        keys,
        metrics: &metrics,
    };

    let mut data = Vec::new();
    flattener.walk(&report.data, 0, &Record::new(), &mut data)?;
    trace!(rows = data.len(), kind = ?report.kind, "flattened report");

    let period = match report.period {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    Ok(ReportResult {
        timing,
        kind: report.kind,
        period,
        segments,
        data,
        metrics,
        elements,
    })
}

fn segment_item(entry: Properties, owner: &str) -> Result<CatalogItem, Error> {
    if entry.contains_key("name") {
        CatalogItem::from_entry(entry, "name", "id", owner)
    } else {
        CatalogItem::from_entry(entry, "id", "id", owner)
    }
}

struct Flattener<'a> {
    kind: ReportKind,
    keys: Vec<String>,
    metrics: &'a Directory,
}

impl Flattener<'_> {
    /// The record key for a level of the tree. Trended reports have a
    /// datetime level above the first element.
    fn key(&self, depth: usize) -> Result<&str, Error> {
        let index = match (self.kind, depth) {
            (ReportKind::Trended, 0) => return Ok("datetime"),
            (ReportKind::Trended, d) => d - 1,
            (_, d) => d,
        };

        self.keys
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| Error::invalid_data(format!("no element for breakdown level {depth}")))
    }

    fn walk(
        &self,
        nodes: &[Node],
        depth: usize,
        parent: &Record,
        out: &mut Vec<Record>,
    ) -> Result<(), Error> {
        for node in nodes {
            let mut record = parent.clone();
            record.insert(
                self.key(depth)?.to_owned(),
                Scalar::Text(node.name().to_owned()),
            );

            match node {
                Node::Branch { children, .. } => self.walk(children, depth + 1, &record, out)?,
                Node::Leaf { counts, .. } => {
                    if counts.len() > self.metrics.len() {
                        return Err(Error::invalid_data(format!(
                            "{} counts for {} metrics",
                            counts.len(),
                            self.metrics.len()
                        )));
                    }

                    for (count, metric) in counts.iter().zip(self.metrics) {
                        record.insert(metric.id().to_owned(), convert(count, metric)?);
                    }
                    out.push(record);
                }
                Node::Empty { .. } => out.push(record),
            }
        }

        Ok(())
    }
}

/// Type a count by its metric's precision.
fn convert(count: &serde_json::Value, metric: &CatalogItem) -> Result<Scalar, Error> {
    let invalid = || Error::invalid_data(format!("invalid count {count} for {}", metric.id()));

    if metric.decimals() > 0 {
        let value = match count {
            serde_json::Value::Number(n) => parse_decimal(&n.to_string()),
            serde_json::Value::String(s) => parse_decimal(s),
            _ => None,
        };
        value.map(Scalar::Decimal).ok_or_else(invalid)
    } else {
        let value = match count {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        value.map(Scalar::Integer).ok_or_else(invalid)
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}
