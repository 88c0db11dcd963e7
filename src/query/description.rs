//! The typed wire form of a report request.

use std::{fmt, str::FromStr};

use chrono::{Days, Months, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The time bucket a report is broken down by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Granularity {
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Granularity {
    /// Every level, from finest to coarsest.
    pub const ALL: [Granularity; 6] = [
        Granularity::Hour,
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
        Granularity::Quarter,
        Granularity::Year,
    ];

    /// The wire name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| {
                let levels: Vec<_> = Granularity::ALL.iter().map(Granularity::as_str).collect();
                Error::invalid_argument(format!(
                    "Granularity should be one of: {}",
                    levels.join(", ")
                ))
            })
    }
}

/// A date range for a report, resolved to inclusive start and stop dates.
///
/// ```
/// use omniture::{DateRange, NaiveDate};
///
/// let start = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
/// let (_, stop) = DateRange::new(start).months(3).resolve().unwrap();
/// assert_eq!(stop, NaiveDate::from_ymd_opt(2017, 3, 31).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    stop: Option<NaiveDate>,
    months: u32,
    days: u32,
    granularity: Option<Granularity>,
}

impl DateRange {
    /// A range starting (and, unless extended, ending) on `start`.
    pub fn new(start: NaiveDate) -> Self {
        Self {
            start,
            stop: None,
            months: 0,
            days: 0,
            granularity: None,
        }
    }

    /// A range covering `start` through `stop`, inclusive.
    pub fn between(start: NaiveDate, stop: NaiveDate) -> Self {
        Self::new(start).to(stop)
    }

    /// Parse a range from free-form dates, e.g. `2017-01-01`,
    /// `January 1, 2017` or `1/1/2017`. Any time of day is dropped.
    pub fn parse(start: &str, stop: Option<&str>) -> Result<Self, Error> {
        let range = Self::new(parse_date(start)?);
        Ok(match stop {
            Some(stop) => range.to(parse_date(stop)?),
            None => range,
        })
    }

    /// Set an explicit, inclusive stop date.
    pub fn to(self, stop: NaiveDate) -> Self {
        Self {
            stop: Some(stop),
            ..self
        }
    }

    /// Extend the range by a number of months. Overrides [`DateRange::to`].
    pub fn months(self, months: u32) -> Self {
        Self { months, ..self }
    }

    /// Extend the range to cover a number of days, counting the start day.
    /// Overrides [`DateRange::to`].
    pub fn days(self, days: u32) -> Self {
        Self { days, ..self }
    }

    /// Also set the report granularity.
    pub fn granularity(self, granularity: Granularity) -> Self {
        Self {
            granularity: Some(granularity),
            ..self
        }
    }

    pub(crate) fn granularity_level(&self) -> Option<Granularity> {
        self.granularity
    }

    /// The inclusive start and stop dates.
    pub fn resolve(&self) -> Result<(NaiveDate, NaiveDate), Error> {
        let overflow = || Error::invalid_argument("Date range is out of bounds");

        let stop = if self.months > 0 || self.days > 0 {
            let shifted = self
                .start
                .checked_add_months(Months::new(self.months))
                .ok_or_else(overflow)?;

            match self.days {
                0 => shifted.checked_sub_days(Days::new(1)),
                n => shifted.checked_add_days(Days::new(u64::from(n) - 1)),
            }
            .ok_or_else(overflow)?
        } else {
            self.stop.unwrap_or(self.start)
        };

        if stop < self.start {
            return Err(Error::invalid_argument(format!(
                "Date range ends ({stop}) before it starts ({})",
                self.start
            )));
        }

        Ok((self.start, stop))
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, Error> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::from_str(s) {
        return Ok(date);
    }
    if let Ok(datetime) = NaiveDateTime::from_str(s) {
        return Ok(datetime.date());
    }

    dateparser::parse_with_timezone(s, &Utc)
        .map(|datetime| datetime.date_naive())
        .map_err(|e| Error::invalid_argument(format!("Invalid date '{s}': {e}")))
}

impl From<NaiveDate> for DateRange {
    fn from(date: NaiveDate) -> Self {
        Self::new(date)
    }
}

impl From<(NaiveDate, NaiveDate)> for DateRange {
    fn from((start, stop): (NaiveDate, NaiveDate)) -> Self {
        Self::between(start, stop)
    }
}

type Properties = serde_json::Map<String, serde_json::Value>;

/// One element (dimension) of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    /// The element id.
    pub id: String,
    /// How many rows to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<u64>,
    /// The 1-based row to start from.
    #[serde(
        default,
        rename = "startingWith",
        skip_serializing_if = "Option::is_none"
    )]
    pub starting_with: Option<u64>,
    /// Report on a classification of the element instead of its raw
    /// values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    /// Any other parameters, e.g. `search` or `selected`.
    #[serde(flatten)]
    pub extra: Properties,
}

impl ElementSpec {
    /// Wire keys with typed fields, which can't be set through `extra`.
    pub const FIELDS: [&str; 4] = ["id", "top", "startingWith", "classification"];

    /// An element with no extra parameters.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            top: None,
            starting_with: None,
            classification: None,
            extra: Default::default(),
        }
    }
}

/// One metric of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// The metric id.
    pub id: String,
    /// Any other parameters.
    #[serde(flatten)]
    pub extra: Properties,
}

/// A reference to a saved segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentRef {
    /// The segment id.
    pub id: String,
}

/// A segment applied to a report: either a saved segment or an inline
/// definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentSpec {
    /// `{"id": ...}`
    Reference(SegmentRef),
    /// Any other object, passed through as-is, e.g.
    /// `{"element": "page", "selected": ["Home"]}`.
    Inline(Properties),
}

/// Everything the vendor needs to run a report, in wire form.
///
/// Keys this type doesn't model are kept in `extra` and sent along
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDescription {
    /// The suite to report on.
    #[serde(default, rename = "reportSuiteID")]
    pub report_suite_id: String,
    /// A single-day report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// The first day of a multi-day report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    /// The last day of a multi-day report, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    /// The time bucket, for trended and overtime reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_granularity: Option<Granularity>,
    /// The primary element first, then each breakdown level in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<ElementSpec>,
    /// The metrics to report, in column order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricSpec>,
    /// Segments to filter by.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<SegmentSpec>,
    /// The metric to rank by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    /// Include data that hasn't finished processing.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub current_data: bool,
    /// Unmodeled keys.
    #[serde(flatten)]
    pub extra: Properties,
}

impl ReportDescription {
    /// An empty description for the given suite.
    pub fn new(report_suite_id: impl Into<String>) -> Self {
        Self {
            report_suite_id: report_suite_id.into(),
            ..Default::default()
        }
    }

    pub(crate) fn set_dates(&mut self, start: NaiveDate, stop: NaiveDate) {
        if start == stop {
            self.date = Some(start);
            self.date_from = None;
            self.date_to = None;
        } else {
            self.date = None;
            self.date_from = Some(start);
            self.date_to = Some(stop);
        }
    }

    /// Write `properties` over the description's wire form and read it back.
    pub(crate) fn merge(&self, properties: Properties) -> Result<Self, Error> {
        let serde_json::Value::Object(mut raw) =
            serde_json::to_value(self).map_err(|e| Error::invalid_argument(e.to_string()))?
        else {
            return Err(Error::invalid_argument("report description is not an object"));
        };

        for (key, value) in properties {
            raw.insert(key, value);
        }

        serde_json::from_value(serde_json::Value::Object(raw))
            .map_err(|e| Error::invalid_argument(format!("Invalid report property: {e}")))
    }
}
