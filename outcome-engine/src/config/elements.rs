// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// How a non-strict unexpected pass affects its case.
///
/// Strict unexpected passes are always failing regardless of this setting.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UnexpectedPassPolicy {
    /// The case ends successfully, like a pass.
    #[default]
    Passing,

    /// The case ends as a failure. It is not retried.
    Failing,
}

/// Which duration a final record reports.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DurationPolicy {
    /// The sum of the durations of every attempt.
    #[default]
    Total,

    /// The duration of the deciding attempt only.
    DecidingAttempt,
}

/// Which attempts' artifacts end up in a final record.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RetainArtifacts {
    /// Only artifacts attached to the deciding attempt.
    #[default]
    DecidingOnly,

    /// Artifacts from every attempt, in attempt order.
    AllAttempts,
}

/// JUnit configuration stored within a profile.
///
/// Returned by [`OutcomeProfile::junit`](super::OutcomeProfile::junit).
#[derive(Clone, Debug)]
pub struct JunitConfig<'cfg> {
    path: &'cfg Utf8Path,
    report_name: &'cfg str,
}

impl<'cfg> JunitConfig<'cfg> {
    pub(super) fn new(
        custom_data: Option<&'cfg JunitImpl>,
        default_data: &'cfg JunitImpl,
    ) -> Option<Self> {
        let path = custom_data
            .and_then(|custom| custom.path.as_deref())
            .or(default_data.path.as_deref())?;
        let report_name = custom_data
            .and_then(|custom| custom.report_name.as_deref())
            .or(default_data.report_name.as_deref())
            .unwrap_or(DEFAULT_JUNIT_REPORT_NAME);
        Some(Self { path, report_name })
    }

    /// Returns the path to the JUnit report, joined to the store directory.
    pub fn path(&self, store_dir: &Utf8Path) -> Utf8PathBuf {
        store_dir.join(self.path)
    }

    /// Returns the name of the JUnit report.
    pub fn report_name(&self) -> &'cfg str {
        self.report_name
    }
}

/// The JUnit report name used when a profile doesn't set one.
pub const DEFAULT_JUNIT_REPORT_NAME: &str = "outcome-run";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct JunitImpl {
    #[serde(default)]
    path: Option<Utf8PathBuf>,
    #[serde(default)]
    report_name: Option<String>,
}
