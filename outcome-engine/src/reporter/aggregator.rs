// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregates final records into a session report.

use crate::{
    classify::Classification,
    errors::{IncompleteSession, WriteReportError},
    helpers::lock,
    identity::CaseId,
    reconciler::FinalRecord,
};
use indexmap::IndexMap;
use outcome_metadata::{ClassificationCounts, SessionReportSummary, SessionSummary};
use std::{io, sync::Mutex, time::Duration};
use tracing::{debug, warn};

/// The single point final records are appended through.
///
/// Cases are ordered by when they were first seen, not by when they were finalized. A case is
/// observed when its first phase event arrives, and its record fills the slot reserved for it.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    inner: Mutex<AggregatorInner>,
}

#[derive(Debug, Default)]
struct AggregatorInner {
    slots: IndexMap<CaseId, Option<FinalRecord>>,
    counts: ClassificationCounts,
}

impl ReportAggregator {
    /// Creates a new, empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a slot for a case, fixing its position in the report.
    pub fn observe(&self, case_id: &CaseId) {
        let mut inner = lock(&self.inner);
        if !inner.slots.contains_key(case_id) {
            inner.slots.insert(case_id.clone(), None);
        }
    }

    /// Appends a final record.
    ///
    /// A case has at most one final record per session: a second record for the same case is
    /// ignored.
    pub fn append(&self, record: FinalRecord) {
        let mut inner = lock(&self.inner);
        let classification = record.classification.summary();
        let slot = inner.slots.entry(record.case_id.clone()).or_default();
        if slot.is_some() {
            warn!(case_id = %record.case_id, "ignoring duplicate final record");
            return;
        }
        *slot = Some(record);
        inner.counts.increment(classification);
    }

    /// Returns the counts of the records appended so far.
    pub fn counts(&self) -> ClassificationCounts {
        lock(&self.inner).counts
    }

    /// Builds the session report.
    ///
    /// `incomplete_record` is called, without any aggregator lock held, for each observed case
    /// that has no final record. If any such case exists, the report is returned within an
    /// [`IncompleteSession`] error.
    ///
    /// This doesn't consume the aggregator: calling it again without further appends produces
    /// the same report.
    pub fn finalize(
        &self,
        mut incomplete_record: impl FnMut(&CaseId) -> Option<FinalRecord>,
    ) -> Result<SessionReport, IncompleteSession> {
        let slots: Vec<_> = lock(&self.inner)
            .slots
            .iter()
            .map(|(case_id, record)| (case_id.clone(), record.clone()))
            .collect();

        let mut incomplete = Vec::new();
        let records = slots
            .into_iter()
            .filter_map(|(case_id, record)| match record {
                Some(record) => Some(record),
                None => {
                    let record = incomplete_record(&case_id);
                    incomplete.push(case_id);
                    record
                }
            })
            .collect();

        let report = SessionReport::new(records);
        if incomplete.is_empty() {
            debug!(cases = report.records.len(), "session finalized");
            Ok(report)
        } else {
            warn!(
                incomplete = incomplete.len(),
                "session finalized with incomplete cases"
            );
            Err(IncompleteSession::new(incomplete, report))
        }
    }
}

/// The report for a whole session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    records: Vec<FinalRecord>,
    counts: ClassificationCounts,
    flaky: usize,
    total_attempts: usize,
    total_duration: Duration,
}

impl SessionReport {
    /// Builds a report from final records, in report order.
    pub fn new(records: Vec<FinalRecord>) -> Self {
        let mut counts = ClassificationCounts::default();
        let mut flaky = 0;
        let mut total_attempts = 0;
        let mut total_duration = Duration::ZERO;
        for record in &records {
            counts.increment(record.classification.summary());
            flaky += usize::from(record.flaky);
            total_attempts += record.attempts_used as usize;
            total_duration = total_duration.saturating_add(record.duration);
        }
        Self {
            records,
            counts,
            flaky,
            total_attempts,
            total_duration,
        }
    }

    /// Returns the final records, in the order their cases were first seen.
    pub fn records(&self) -> &[FinalRecord] {
        &self.records
    }

    /// Returns the record for `id`, if present.
    pub fn record(&self, id: &str) -> Option<&FinalRecord> {
        self.records
            .iter()
            .find(|record| record.case_id.as_str() == id)
    }

    /// Returns the number of records per classification.
    pub fn counts(&self) -> &ClassificationCounts {
        &self.counts
    }

    /// Returns the number of flaky cases.
    pub fn flaky_count(&self) -> usize {
        self.flaky
    }

    /// Returns the number of attempts across all cases.
    pub fn total_attempts(&self) -> usize {
        self.total_attempts
    }

    /// Returns the sum of all record durations.
    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// Returns true if every case ended successfully.
    pub fn is_success(&self) -> bool {
        self.records.iter().all(|record| record.passing)
    }

    /// Returns the records that did not end successfully.
    pub fn failing_records(&self) -> impl Iterator<Item = &FinalRecord> {
        self.records.iter().filter(|record| !record.passing)
    }

    /// Returns the number of records that did not end successfully.
    pub fn failing_count(&self) -> usize {
        self.failing_records().count()
    }

    /// Returns true if any case never reached a final state.
    pub fn has_incomplete(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.classification == Classification::Incomplete)
    }

    /// Returns the serializable form of this report.
    pub fn to_summary(&self) -> SessionReportSummary {
        SessionReportSummary {
            summary: SessionSummary {
                counts: self.counts,
                flaky: self.flaky,
                total_attempts: self.total_attempts,
                total_duration: self.total_duration,
            },
            cases: self.records.iter().map(FinalRecord::to_summary).collect(),
        }
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write_json(&self, writer: impl io::Write) -> Result<(), WriteReportError> {
        serde_json::to_writer_pretty(writer, &self.to_summary()).map_err(WriteReportError::Json)
    }

    /// Returns the report as a pretty-printed JSON string.
    pub fn to_json_string(&self) -> Result<String, WriteReportError> {
        serde_json::to_string_pretty(&self.to_summary()).map_err(WriteReportError::Json)
    }
}
