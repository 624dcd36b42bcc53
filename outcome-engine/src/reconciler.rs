// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciles the attempts of a logical case into a single final record.
//!
//! Each case owns a [`CaseReconciler`], fed one classified attempt at a time. The reconciler
//! decides whether another attempt is expected and, once the case is decided, produces its
//! [`FinalRecord`].

use crate::{
    attempt::Attempt,
    classify::{Classification, ClassifiedAttempt, classify_attempt},
    config::DurationPolicy,
    errors::{OutOfOrderPhase, OutOfOrderReason},
    identity::CaseId,
    session::SessionSettings,
};
use outcome_metadata::{ArtifactDescriptor, ErrorInfo, ErrorSummary, FinalRecordSummary};
use std::{num::NonZeroU32, time::Duration};
use tracing::debug;

/// The reconciliation state of a logical case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcilerState {
    /// No attempts have completed yet.
    Initial,

    /// The latest attempt failed and the case has attempts left.
    Retrying {
        /// The total number of attempts allowed.
        max_attempts: NonZeroU32,
    },

    /// The case ended with a passing classification.
    FinalPass,

    /// The case ended with a failing classification.
    FinalFail,
}

impl ReconcilerState {
    /// Returns true if the case has reached a final state.
    pub fn is_final(self) -> bool {
        matches!(self, Self::FinalPass | Self::FinalFail)
    }
}

/// What happens after an attempt is reconciled.
#[derive(Clone, Debug)]
pub enum ReconcileStep {
    /// The attempt failed with budget remaining: the runner is expected to try again.
    RetryExpected {
        /// The classification of the attempt that just completed.
        classification: Classification,

        /// The attempt number expected next.
        next_attempt: u32,

        /// The total number of attempts allowed.
        max_attempts: NonZeroU32,
    },

    /// The case is decided.
    Final(FinalRecord),
}

/// Per-case reconciliation state.
#[derive(Clone, Debug)]
pub struct CaseReconciler {
    case_id: CaseId,
    state: ReconcilerState,
    history: Vec<ClassifiedAttempt>,
}

impl CaseReconciler {
    /// Creates a new reconciler for `case_id` in the initial state.
    pub fn new(case_id: CaseId) -> Self {
        Self {
            case_id,
            state: ReconcilerState::Initial,
            history: Vec::new(),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> ReconcilerState {
        self.state
    }

    /// Returns the attempts reconciled so far, in order.
    pub fn history(&self) -> &[ClassifiedAttempt] {
        &self.history
    }

    /// Classifies a completed attempt and folds it into this case.
    ///
    /// The maximum number of attempts comes from the attempt's `rerun-policy` marker, or
    /// `settings.default_max_attempts` if it has none.
    pub fn push(
        &mut self,
        attempt: &Attempt,
        settings: &SessionSettings,
    ) -> Result<ReconcileStep, OutOfOrderPhase> {
        let error = |reason| OutOfOrderPhase::new(self.case_id.clone(), attempt.attempt(), reason);
        if self.state.is_final() {
            return Err(error(OutOfOrderReason::CaseFinalized));
        }
        let expected = self.next_attempt();
        if attempt.attempt() != expected {
            return Err(error(OutOfOrderReason::AttemptOutOfSequence { expected }));
        }

        let classified = classify_attempt(attempt);
        let classification = classified.classification;
        let max_attempts = attempt
            .rerun_policy()
            .unwrap_or(settings.default_max_attempts);
        let attempt_number = classified.attempt;
        debug!(
            case_id = %self.case_id,
            attempt = attempt_number,
            %classification,
            "attempt classified",
        );
        self.history.push(classified);

        if classification.is_passing(settings.unexpected_pass) {
            self.state = ReconcilerState::FinalPass;
        } else if classification.is_retryable() && attempt_number < max_attempts.get() {
            self.state = ReconcilerState::Retrying { max_attempts };
            return Ok(ReconcileStep::RetryExpected {
                classification,
                next_attempt: attempt_number + 1,
                max_attempts,
            });
        } else {
            self.state = ReconcilerState::FinalFail;
        }

        Ok(ReconcileStep::Final(self.make_record(settings.duration)))
    }

    /// Returns the record for a case that never reached a final state, or `None` if it did.
    ///
    /// The record is classified [`Classification::Incomplete`], and `attempts_used` is the number
    /// of attempts that completed.
    pub fn incomplete_record(&self, duration: DurationPolicy) -> Option<FinalRecord> {
        if self.state.is_final() {
            return None;
        }
        let last = self.history.last();
        Some(FinalRecord {
            case_id: self.case_id.clone(),
            classification: Classification::Incomplete,
            passing: false,
            attempts_used: last.map_or(0, |last| last.attempt),
            flaky: false,
            duration: self.duration(duration),
            error: last.and_then(|last| last.error.clone()),
            secondary_error: last.and_then(|last| last.secondary_error.clone()),
            reason: None,
            artifacts: Vec::new(),
            prior_attempts: self.prior_attempts(self.history.len()),
        })
    }

    fn next_attempt(&self) -> u32 {
        self.history.last().map_or(1, |last| last.attempt + 1)
    }

    fn make_record(&self, duration: DurationPolicy) -> FinalRecord {
        // Only called after an attempt was pushed.
        let deciding = &self.history[self.history.len() - 1];
        let passing = self.state == ReconcilerState::FinalPass;
        let flaky = passing
            && deciding.classification == Classification::Passed
            && deciding.attempt > 1;
        let error = match deciding.classification {
            Classification::Passed => None,
            _ => deciding.error.clone(),
        };

        let record = FinalRecord {
            case_id: self.case_id.clone(),
            classification: deciding.classification,
            passing,
            attempts_used: deciding.attempt,
            flaky,
            duration: self.duration(duration),
            error,
            secondary_error: deciding.secondary_error.clone(),
            reason: deciding.reason.clone(),
            artifacts: Vec::new(),
            prior_attempts: self.prior_attempts(self.history.len() - 1),
        };
        debug!(
            case_id = %record.case_id,
            classification = %record.classification,
            attempts_used = record.attempts_used,
            flaky = record.flaky,
            "case finalized",
        );
        record
    }

    fn duration(&self, policy: DurationPolicy) -> Duration {
        match policy {
            DurationPolicy::Total => self
                .history
                .iter()
                .fold(Duration::ZERO, |total, attempt| {
                    total.saturating_add(attempt.duration)
                }),
            DurationPolicy::DecidingAttempt => self
                .history
                .last()
                .map_or(Duration::ZERO, |attempt| attempt.duration),
        }
    }

    fn prior_attempts(&self, count: usize) -> Vec<PriorAttempt> {
        self.history[..count]
            .iter()
            .map(|attempt| PriorAttempt {
                attempt: attempt.attempt,
                classification: attempt.classification,
                duration: attempt.duration,
                error: attempt.error.clone(),
            })
            .collect()
    }
}

/// The canonical record for one logical case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalRecord {
    /// The logical case.
    pub case_id: CaseId,

    /// The deciding attempt's classification.
    pub classification: Classification,

    /// True if the case ended successfully.
    pub passing: bool,

    /// The deciding attempt's number.
    pub attempts_used: u32,

    /// True if the case passed, but only after one or more failing attempts.
    pub flaky: bool,

    /// The duration attributed to the case.
    pub duration: Duration,

    /// The deciding attempt's error, if the case did not pass.
    pub error: Option<ErrorInfo>,

    /// The call phase's error, when a teardown failure decided the classification.
    pub secondary_error: Option<ErrorInfo>,

    /// The skip or expected-failure reason, if a marker decided the classification.
    pub reason: Option<String>,

    /// Artifacts linked to the case.
    pub artifacts: Vec<ArtifactDescriptor>,

    /// Attempts before the deciding one, in order.
    pub prior_attempts: Vec<PriorAttempt>,
}

impl FinalRecord {
    /// Returns the serialized form of this record.
    pub fn to_summary(&self) -> FinalRecordSummary {
        FinalRecordSummary {
            id: self.case_id.to_string(),
            classification: self.classification.summary(),
            attempts_used: self.attempts_used,
            flaky: self.flaky,
            duration: self.duration,
            error: self.error.as_ref().map(|error| ErrorSummary {
                kind: error.kind.clone(),
                message: error.message.clone(),
            }),
            artifacts: self.artifacts.clone(),
        }
    }
}

/// An attempt that did not decide its case's classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriorAttempt {
    /// The attempt number.
    pub attempt: u32,

    /// The attempt's classification.
    pub classification: Classification,

    /// The time the attempt took.
    pub duration: Duration,

    /// The attempt's error, if any.
    pub error: Option<ErrorInfo>,
}
