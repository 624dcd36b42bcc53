// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Code to generate JUnit XML reports from a session report.

use crate::{
    classify::Classification,
    errors::WriteReportError,
    reconciler::{FinalRecord, PriorAttempt},
    reporter::SessionReport,
};
use camino::Utf8Path;
use indexmap::IndexMap;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestRerun, TestSuite};
use std::fs::File;
use swrite::{SWrite, swriteln};
use tracing::debug;

/// Builds JUnit XML from a [`SessionReport`].
///
/// Each base test name becomes a test suite, so the entries of a parametrized test are grouped
/// together. Earlier attempts of retried cases are recorded as reruns: flaky runs for cases that
/// passed, and reruns for cases that didn't.
#[derive(Clone, Debug)]
pub struct JunitReporter<'a> {
    report_name: &'a str,
}

impl<'a> JunitReporter<'a> {
    /// Creates a new reporter. `report_name` is the name of the top-level report element.
    pub fn new(report_name: &'a str) -> Self {
        Self { report_name }
    }

    /// Builds the JUnit report.
    pub fn build(&self, report: &SessionReport) -> Report {
        let mut test_suites: IndexMap<&str, TestSuite> = IndexMap::new();
        for record in report.records() {
            let base = record.case_id.base();
            test_suites
                .entry(base)
                .or_insert_with(|| TestSuite::new(base))
                .add_test_case(make_test_case(record));
        }

        let mut junit = Report::new(self.report_name);
        junit
            .set_time(report.total_duration())
            .add_test_suites(test_suites.into_values());
        junit
    }

    /// Serializes the JUnit report to a string.
    ///
    /// `path` is only used for error reporting.
    pub fn to_xml_string(
        &self,
        report: &SessionReport,
        path: &Utf8Path,
    ) -> Result<String, WriteReportError> {
        self.build(report)
            .to_string()
            .map_err(|error| WriteReportError::Junit {
                file: path.to_owned(),
                error,
            })
    }

    /// Writes the JUnit report to `path`, creating parent directories as needed.
    pub fn write_to_path(
        &self,
        report: &SessionReport,
        path: &Utf8Path,
    ) -> Result<(), WriteReportError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|error| WriteReportError::Fs {
                file: dir.to_owned(),
                error,
            })?;
        }
        let f = File::create(path).map_err(|error| WriteReportError::Fs {
            file: path.to_owned(),
            error,
        })?;
        self.build(report)
            .serialize(f)
            .map_err(|error| WriteReportError::Junit {
                file: path.to_owned(),
                error,
            })?;
        debug!(%path, "wrote JUnit report");
        Ok(())
    }
}

fn make_test_case(record: &FinalRecord) -> TestCase {
    let mut status = match record.classification {
        Classification::Skipped => {
            let mut status = TestCaseStatus::skipped();
            if let Some(reason) = &record.reason {
                status.set_message(reason.as_str());
            }
            status
        }
        Classification::ExpectedFailure => {
            let mut status = TestCaseStatus::skipped();
            status
                .set_type("expected-failure")
                .set_message(match &record.reason {
                    Some(reason) => format!("expected failure: {reason}"),
                    None => "expected failure".to_owned(),
                });
            status
        }
        _ if record.passing => TestCaseStatus::success(),
        Classification::UnexpectedPass { .. } => {
            let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
            status.set_type("unexpected-pass").set_message(match &record.reason {
                Some(reason) => format!("expected failure did not occur: {reason}"),
                None => "expected failure did not occur".to_owned(),
            });
            status
        }
        classification => {
            let kind = match classification {
                Classification::Failed => NonSuccessKind::Failure,
                _ => NonSuccessKind::Error,
            };
            let mut status = TestCaseStatus::non_success(kind);
            if let Some(error) = &record.error {
                status
                    .set_type(error.kind.as_str())
                    .set_message(error.message.as_str());
                if let Some(location) = &error.location {
                    status.set_description(location.as_str());
                }
            } else if classification == Classification::Incomplete {
                status
                    .set_type("incomplete")
                    .set_message("the case never reached a final state");
            }
            status
        }
    };

    for prior in &record.prior_attempts {
        status.add_rerun(make_rerun(prior));
    }

    let mut test_case = TestCase::new(record.case_id.as_str(), status);
    test_case
        .set_classname(record.case_id.base())
        .set_time(record.duration);

    let mut system_out = String::new();
    if let Some(secondary) = &record.secondary_error {
        swriteln!(
            system_out,
            "call phase also failed: {}: {}",
            secondary.kind,
            secondary.message
        );
    }
    // Attachment syntax understood by the Jenkins JUnit attachments plugin.
    for artifact in &record.artifacts {
        swriteln!(system_out, "[[ATTACHMENT|{}]]", artifact.path);
    }
    if !system_out.is_empty() {
        test_case.set_system_out(system_out);
    }

    test_case
}

fn make_rerun(prior: &PriorAttempt) -> TestRerun {
    let kind = match prior.classification {
        Classification::Failed => NonSuccessKind::Failure,
        _ => NonSuccessKind::Error,
    };
    let mut rerun = TestRerun::new(kind);
    rerun.set_time(prior.duration);
    if let Some(error) = &prior.error {
        rerun
            .set_type(error.kind.as_str())
            .set_message(error.message.as_str());
    }
    rerun
}
