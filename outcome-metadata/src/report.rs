// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{ArtifactDescriptor, ClassificationParseError, messages::duration_secs};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{fmt, str::FromStr, time::Duration};

/// The session report: one record per logical case, plus summary counts.
///
/// This is the document `outcome-report` writes at the end of a session.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SessionReportSummary {
    /// Counts across the whole session.
    pub summary: SessionSummary,

    /// Final records, in the order each case was first seen.
    pub cases: Vec<FinalRecordSummary>,
}

impl SessionReportSummary {
    /// Parses a session report from JSON.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }

    /// Returns the record with the given case id, if present.
    pub fn case(&self, id: &str) -> Option<&FinalRecordSummary> {
        self.cases.iter().find(|case| case.id == id)
    }
}

/// Session-wide counts.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SessionSummary {
    /// The number of cases per final classification.
    pub counts: ClassificationCounts,

    /// The number of cases that passed only after a retry.
    pub flaky: usize,

    /// The number of attempts across all cases.
    pub total_attempts: usize,

    /// The sum of all record durations.
    #[serde(with = "duration_secs")]
    pub total_duration: Duration,
}

/// The number of cases per classification.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ClassificationCounts {
    /// Cases that passed.
    pub passed: usize,
    /// Cases whose call phase failed.
    pub failed: usize,
    /// Cases whose setup or teardown failed.
    pub error: usize,
    /// Cases that were skipped.
    pub skipped: usize,
    /// Cases that failed as expected.
    pub expected_failure: usize,
    /// Cases that were expected to fail but passed.
    pub unexpected_pass: usize,
    /// Cases that never reached a final state.
    pub incomplete: usize,
}

impl ClassificationCounts {
    /// Increments the count for `classification`.
    pub fn increment(&mut self, classification: CaseClassification) {
        *self.get_mut(classification) += 1;
    }

    /// Returns the count for `classification`.
    pub fn get(&self, classification: CaseClassification) -> usize {
        match classification {
            CaseClassification::Passed => self.passed,
            CaseClassification::Failed => self.failed,
            CaseClassification::Error => self.error,
            CaseClassification::Skipped => self.skipped,
            CaseClassification::ExpectedFailure => self.expected_failure,
            CaseClassification::UnexpectedPass => self.unexpected_pass,
            CaseClassification::Incomplete => self.incomplete,
        }
    }

    /// Returns the total number of cases counted.
    pub fn total(&self) -> usize {
        CaseClassification::ALL
            .iter()
            .map(|classification| self.get(*classification))
            .sum()
    }

    fn get_mut(&mut self, classification: CaseClassification) -> &mut usize {
        match classification {
            CaseClassification::Passed => &mut self.passed,
            CaseClassification::Failed => &mut self.failed,
            CaseClassification::Error => &mut self.error,
            CaseClassification::Skipped => &mut self.skipped,
            CaseClassification::ExpectedFailure => &mut self.expected_failure,
            CaseClassification::UnexpectedPass => &mut self.unexpected_pass,
            CaseClassification::Incomplete => &mut self.incomplete,
        }
    }
}

/// The serialized form of a final record.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct FinalRecordSummary {
    /// The logical case id.
    pub id: String,

    /// The final classification.
    pub classification: CaseClassification,

    /// The sequence number of the deciding attempt.
    pub attempts_used: u32,

    /// True if the case passed only after one or more failing attempts.
    pub flaky: bool,

    /// The duration attributed to this case.
    #[serde(with = "duration_secs")]
    pub duration: Duration,

    /// The deciding attempt's error, if the case did not pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorSummary>,

    /// Artifacts attached to this case.
    #[serde(default)]
    pub artifacts: Vec<ArtifactDescriptor>,
}

/// The serialized form of an error.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorSummary {
    /// The error kind, exactly as reported by the runner.
    pub kind: SmolStr,

    /// The error message.
    pub message: String,
}

/// The closed set of final classifications in a session report.
#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum CaseClassification {
    /// The case passed.
    Passed,
    /// The call phase failed.
    Failed,
    /// Setup or teardown failed.
    Error,
    /// The case was skipped.
    Skipped,
    /// The case was expected to fail, and did.
    ExpectedFailure,
    /// The case was expected to fail, but passed.
    UnexpectedPass,
    /// The case never reached a final state.
    Incomplete,
}

impl CaseClassification {
    /// All classifications, in report order.
    pub const ALL: [CaseClassification; 7] = [
        CaseClassification::Passed,
        CaseClassification::Failed,
        CaseClassification::Error,
        CaseClassification::Skipped,
        CaseClassification::ExpectedFailure,
        CaseClassification::UnexpectedPass,
        CaseClassification::Incomplete,
    ];

    /// Returns the string representation used in serialized output.
    pub fn as_str(self) -> &'static str {
        match self {
            CaseClassification::Passed => "passed",
            CaseClassification::Failed => "failed",
            CaseClassification::Error => "error",
            CaseClassification::Skipped => "skipped",
            CaseClassification::ExpectedFailure => "expected-failure",
            CaseClassification::UnexpectedPass => "unexpected-pass",
            CaseClassification::Incomplete => "incomplete",
        }
    }

    /// Returns the string representations of all classifications.
    pub fn variants() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.as_str()).collect()
    }
}

impl fmt::Display for CaseClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseClassification {
    type Err = ClassificationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ClassificationParseError::new(s))
    }
}
