// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps a completed attempt to a single classification.
//!
//! Classification is a pure function of an attempt's phase outcomes and markers. The rules are
//! applied in order, and the first one that matches wins:
//!
//! 1. A failed setup phase is an **error**: the test body never ran.
//! 2. A `skip` marker (or `skip-if` with a true condition) means **skipped**, whatever the phases
//!    say.
//! 3. With an `expected-failure` marker, a failed call is an **expected failure**, and a passing
//!    call is an **unexpected pass**. Strict unexpected passes are always failing.
//! 4. A failed teardown is an **error**. The call phase's error, if any, is kept as secondary
//!    information.
//! 5. A failed call is a **failure**, carrying the call phase's error.
//! 6. Otherwise, the attempt **passed**.
//!
//! The error kind reported by the runner is carried through verbatim and never affects the
//! classification: only the phase that failed does.

use crate::{attempt::Attempt, config::UnexpectedPassPolicy};
use outcome_metadata::{CaseClassification, ErrorInfo, PhaseStatus};
use std::{fmt, time::Duration};

/// The error kind used when an attempt was abandoned without any phase reporting a failure.
pub const ABANDONED_ERROR_KIND: &str = "AttemptAbandoned";

/// The classification of an attempt or a logical case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    /// All phases passed.
    Passed,

    /// The call phase failed.
    Failed,

    /// The setup or teardown phase failed, or the attempt was abandoned.
    Error,

    /// The test was skipped, either through a marker or by the runner.
    Skipped,

    /// The test was expected to fail, and did.
    ExpectedFailure,

    /// The test was expected to fail, but passed.
    UnexpectedPass {
        /// Whether the expected-failure marker was strict.
        strict: bool,
    },

    /// The case never reached a final state. Only produced for final records.
    Incomplete,
}

impl Classification {
    /// Returns the serialized classification.
    pub fn summary(self) -> CaseClassification {
        match self {
            Self::Passed => CaseClassification::Passed,
            Self::Failed => CaseClassification::Failed,
            Self::Error => CaseClassification::Error,
            Self::Skipped => CaseClassification::Skipped,
            Self::ExpectedFailure => CaseClassification::ExpectedFailure,
            Self::UnexpectedPass { .. } => CaseClassification::UnexpectedPass,
            Self::Incomplete => CaseClassification::Incomplete,
        }
    }

    /// Returns true if this classification ends a case successfully.
    ///
    /// Strict unexpected passes are always failing. Non-strict ones follow `policy`.
    pub fn is_passing(self, policy: UnexpectedPassPolicy) -> bool {
        match self {
            Self::Passed | Self::Skipped | Self::ExpectedFailure => true,
            Self::UnexpectedPass { strict: true } => false,
            Self::UnexpectedPass { strict: false } => policy == UnexpectedPassPolicy::Passing,
            Self::Failed | Self::Error | Self::Incomplete => false,
        }
    }

    /// Returns true if an attempt with this classification should be retried, budget permitting.
    ///
    /// Only failures and errors are retried. In particular, unexpected passes are never retried
    /// even when they count as failing.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedPass { strict: true } => write!(f, "unexpected-pass (strict)"),
            other => write!(f, "{}", other.summary()),
        }
    }
}

/// A classified attempt: the classification plus the details a final record needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedAttempt {
    /// The 1-based attempt number.
    pub attempt: u32,

    /// The classification.
    pub classification: Classification,

    /// The error that decided the classification, if any.
    pub error: Option<ErrorInfo>,

    /// The call phase's error, when a teardown failure took precedence over it.
    pub secondary_error: Option<ErrorInfo>,

    /// The skip or expected-failure reason from the marker that applied, if any.
    pub reason: Option<String>,

    /// The total time taken across all phases.
    pub duration: Duration,
}

/// Classifies a completed attempt.
pub fn classify(attempt: &Attempt) -> Classification {
    classify_attempt(attempt).classification
}

/// Classifies a completed attempt, keeping the errors and reason that explain the result.
pub fn classify_attempt(attempt: &Attempt) -> ClassifiedAttempt {
    let verdict = Verdict::compute(attempt);
    ClassifiedAttempt {
        attempt: attempt.attempt(),
        classification: verdict.classification,
        error: verdict.error,
        secondary_error: verdict.secondary_error,
        reason: verdict.reason.map(str::to_owned),
        duration: attempt.duration(),
    }
}

struct Verdict<'a> {
    classification: Classification,
    error: Option<ErrorInfo>,
    secondary_error: Option<ErrorInfo>,
    reason: Option<&'a str>,
}

impl<'a> Verdict<'a> {
    fn new(classification: Classification) -> Self {
        Self {
            classification,
            error: None,
            secondary_error: None,
            reason: None,
        }
    }

    fn with_error(mut self, error: Option<&ErrorInfo>) -> Self {
        self.error = error.cloned();
        self
    }

    fn with_reason(mut self, reason: Option<&'a str>) -> Self {
        self.reason = reason;
        self
    }

    fn compute(attempt: &'a Attempt) -> Self {
        let setup = attempt.setup();
        let call = attempt.call();
        let teardown = attempt.teardown();

        if setup.is_failed() {
            return Self::new(Classification::Error).with_error(setup.error.as_ref());
        }

        if let Some(reason) = attempt.skip_marker() {
            return Self::new(Classification::Skipped).with_reason(reason);
        }

        if attempt.is_abandoned() && !call.is_failed() && !teardown.is_failed() {
            let error = ErrorInfo::new(
                ABANDONED_ERROR_KIND,
                format!(
                    "attempt {} was abandoned before all phases reported",
                    attempt.attempt()
                ),
            );
            return Self::new(Classification::Error).with_error(Some(&error));
        }

        if let Some((reason, strict)) = attempt.expected_failure_marker() {
            let verdict = match call.status {
                PhaseStatus::Failed => {
                    Self::new(Classification::ExpectedFailure).with_error(call.error.as_ref())
                }
                PhaseStatus::Ok => Self::new(Classification::UnexpectedPass { strict }),
                // The runner skipped the body at runtime: the expectation was never tested.
                PhaseStatus::Skipped => Self::new(Classification::Skipped),
            };
            return verdict.with_reason(reason);
        }

        if teardown.is_failed() {
            let mut verdict =
                Self::new(Classification::Error).with_error(teardown.error.as_ref());
            verdict.secondary_error = call.error.clone().filter(|_| call.is_failed());
            return verdict;
        }

        match call.status {
            PhaseStatus::Failed => {
                Self::new(Classification::Failed).with_error(call.error.as_ref())
            }
            PhaseStatus::Skipped => Self::new(Classification::Skipped),
            PhaseStatus::Ok => Self::new(Classification::Passed),
        }
    }
}
