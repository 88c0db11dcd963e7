//! The lifecycle of a submitted report.

use std::{fmt, thread, time::Duration};

use tracing::{debug, trace};

use crate::{
    ApiError, CatalogItem, Entry as _, Error, ReportDescription, Suite,
    api::reports::{CancelReport, Cancelled, GetReport, QueueReport, ReportId, ReportResponse},
};

mod backoff;
mod result;

pub use backoff::Backoff;
pub use result::*;

/// The interval before the first poll, when none is given.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Where a report is in its lifecycle. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportState {
    /// Built but not yet sent to the vendor.
    NotSubmitted,
    /// Sent, and waiting in the vendor's queue.
    Queued,
    /// Finished. The result is cached on the handle.
    Ready,
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportState::NotSubmitted => "Not Submitted",
            ReportState::Queued => "Not Ready",
            ReportState::Ready => "Done",
        })
    }
}

#[derive(Debug)]
enum Stage {
    NotSubmitted,
    Queued(ReportId),
    Ready {
        id: ReportId,
        raw: serde_json::Value,
        result: ReportResult,
    },
}

/// A handle on one report run.
///
/// ```no_run
/// # fn main() -> Result<(), omniture::Error> {
/// # let client = omniture::Client::from_default_env()?;
/// let suite = client.suite(0)?;
/// let mut report = suite.report().metric("pageviews")?.report();
///
/// report.run_async()?;
/// while !report.check()? {
///     std::thread::sleep(std::time::Duration::from_secs(5));
/// }
///
/// println!("{} rows", report.result()?.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Report<'s> {
    suite: &'s Suite,
    description: ReportDescription,
    stage: Stage,
    span: tracing::Span,
}

impl<'s> Report<'s> {
    pub(crate) fn new(suite: &'s Suite, description: ReportDescription) -> Self {
        let span = tracing::debug_span!(
            parent: suite.span(),
            "report",
            report_id = tracing::field::Empty
        );
        Self {
            suite,
            description,
            stage: Stage::NotSubmitted,
            span,
        }
    }

    /// The description this report runs.
    pub fn description(&self) -> &ReportDescription {
        &self.description
    }

    /// The current state.
    pub fn state(&self) -> ReportState {
        match self.stage {
            Stage::NotSubmitted => ReportState::NotSubmitted,
            Stage::Queued(_) => ReportState::Queued,
            Stage::Ready { .. } => ReportState::Ready,
        }
    }

    /// The vendor id, once submitted.
    pub fn id(&self) -> Option<ReportId> {
        match self.stage {
            Stage::NotSubmitted => None,
            Stage::Queued(id) | Stage::Ready { id, .. } => Some(id),
        }
    }

    /// The unprocessed `Report.Get` payload, once ready.
    pub fn raw_response(&self) -> Option<&serde_json::Value> {
        match &self.stage {
            Stage::Ready { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Send the report to the vendor's queue. Does nothing if it was
    /// already submitted.
    pub fn submit(&mut self) -> Result<&mut Self, Error> {
        if !matches!(self.stage, Stage::NotSubmitted) {
            return Ok(self);
        }

        let queued = self.suite.roundtrip(QueueReport {
            description: &self.description,
        })?;

        self.span.record("report_id", queued.report_id.0);
        debug!(parent: &self.span, report_id = %queued.report_id, "queued report");
        self.stage = Stage::Queued(queued.report_id);
        Ok(self)
    }

    /// Ask the vendor once whether the report is done. When it is, the
    /// result is processed and cached, and later polls return `true`
    /// without any network activity.
    pub fn poll(&mut self) -> Result<bool, Error> {
        let report_id = match self.stage {
            Stage::NotSubmitted => return Err(Error::ReportNotSubmitted),
            Stage::Ready { .. } => return Ok(true),
            Stage::Queued(id) => id,
        };

        let raw = match self.suite.roundtrip(GetReport { report_id }) {
            Ok(ReportResponse(raw)) => raw,
            Err(Error::Api(ApiError::NotReady)) => {
                trace!(parent: &self.span, "report not ready");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        // Segments shared by other users may be missing from Segments.Get.
        let suite = self.suite;
        let span = &self.span;
        let result = process(&raw, &self.description, |id| {
            match suite.segments()?.get(id) {
                Ok(segment) => Ok(segment.clone()),
                Err(Error::NotFound { .. }) => {
                    debug!(parent: span, segment_id = id, "segment not in catalog");
                    Ok(CatalogItem::new(id, id, suite.id()))
                }
                Err(e) => Err(e),
            }
        })?;

        debug!(
            parent: &self.span,
            rows = result.len(),
            queue = ?result.timing.queue,
            execution = ?result.timing.execution,
            "report ready"
        );

        self.stage = Stage::Ready {
            id: report_id,
            raw,
            result,
        };

        Ok(true)
    }

    /// An alias for [`Report::poll`].
    pub fn check(&mut self) -> Result<bool, Error> {
        self.poll()
    }

    /// Block until the report is ready, polling on a [`Backoff`] schedule
    /// that starts at `interval`. The heartbeat, if given, is called before
    /// each sleep.
    pub fn wait(
        &mut self,
        interval: Duration,
        mut heartbeat: Option<&mut dyn FnMut()>,
    ) -> Result<(), Error> {
        let mut backoff = Backoff::new(interval);
        while !self.poll()? {
            if let Some(heartbeat) = heartbeat.as_deref_mut() {
                heartbeat();
            }

            let delay = backoff.next_delay();
            trace!(parent: &self.span, ?delay, "waiting before next poll");
            thread::sleep(delay);
        }

        Ok(())
    }

    /// Submit the report if needed, wait for it and return the result.
    pub fn run(&mut self) -> Result<&ReportResult, Error> {
        self.run_with(DEFAULT_POLL_INTERVAL, None)
    }

    /// Like [`Report::run`], with a custom first interval and heartbeat.
    pub fn run_with(
        &mut self,
        interval: Duration,
        heartbeat: Option<&mut dyn FnMut()>,
    ) -> Result<&ReportResult, Error> {
        if !matches!(self.stage, Stage::Ready { .. }) {
            self.submit()?;
            self.wait(interval, heartbeat)?;
        }

        self.result()
    }

    /// Submit the report if needed, and return without waiting.
    pub fn run_async(&mut self) -> Result<&mut Self, Error> {
        self.submit()
    }

    /// The cached result.
    pub fn result(&self) -> Result<&ReportResult, Error> {
        match &self.stage {
            Stage::NotSubmitted => Err(Error::ReportNotSubmitted),
            Stage::Queued(_) => Err(Error::ReportNotReady),
            Stage::Ready { result, .. } => Ok(result),
        }
    }

    /// Consume the handle and return the result.
    pub fn into_result(self) -> Result<ReportResult, Error> {
        match self.stage {
            Stage::NotSubmitted => Err(Error::ReportNotSubmitted),
            Stage::Queued(_) => Err(Error::ReportNotReady),
            Stage::Ready { result, .. } => Ok(result),
        }
    }

    /// Ask the vendor to cancel the report. Local state is left as it is.
    /// Returns `false` without a request if the report was never submitted.
    pub fn cancel(&self) -> Result<bool, Error> {
        let Some(report_id) = self.id() else {
            return Ok(false);
        };

        let Cancelled(cancelled) = self.suite.roundtrip(CancelReport { report_id })?;
        debug!(parent: &self.span, cancelled, "cancel requested");
        Ok(cancelled)
    }
}

/// Submit every report, then poll the unfinished ones on a shared
/// [`Backoff`] schedule until all of them are ready.
pub fn run_all(reports: &mut [Report<'_>], interval: Duration) -> Result<(), Error> {
    for report in reports.iter_mut() {
        report.submit()?;
    }

    let mut backoff = Backoff::new(interval);
    loop {
        let mut pending = 0;
        for report in reports.iter_mut() {
            if !report.poll()? {
                pending += 1;
            }
        }

        if pending == 0 {
            return Ok(());
        }

        let delay = backoff.next_delay();
        debug!(pending, ?delay, "waiting for reports");
        thread::sleep(delay);
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<report on {}: {}", self.suite.id(), self.state())?;
        if let Some(id) = self.id() {
            write!(f, " ({id})")?;
        }
        f.write_str(">")
    }
}
