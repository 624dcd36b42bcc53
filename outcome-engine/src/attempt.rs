// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::identity::CaseId;
use outcome_metadata::{ErrorInfo, Marker, Phase, PhaseStatus};
use std::{num::NonZeroU32, time::Duration};

/// The outcome of a single phase of an attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseOutcome {
    /// The phase.
    pub phase: Phase,

    /// How the phase ended.
    pub status: PhaseStatus,

    /// Error details, for a failed phase.
    pub error: Option<ErrorInfo>,

    /// Time taken by the phase.
    pub duration: Duration,
}

impl PhaseOutcome {
    /// A phase that completed without error.
    pub fn ok(phase: Phase) -> Self {
        Self {
            phase,
            status: PhaseStatus::Ok,
            error: None,
            duration: Duration::ZERO,
        }
    }

    /// A phase that failed with `error`.
    pub fn failed(phase: Phase, error: ErrorInfo) -> Self {
        Self {
            phase,
            status: PhaseStatus::Failed,
            error: Some(error),
            duration: Duration::ZERO,
        }
    }

    /// A phase that did not run.
    pub fn skipped(phase: Phase) -> Self {
        Self {
            phase,
            status: PhaseStatus::Skipped,
            error: None,
            duration: Duration::ZERO,
        }
    }

    /// Sets the duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Returns true if the phase failed.
    pub fn is_failed(&self) -> bool {
        self.status.is_failed()
    }
}

/// One complete execution instance of a logical case.
///
/// Attempts are built by the [`EventCollector`](crate::collector::EventCollector) once all three
/// phases have reported (or the runner abandoned the attempt), and are never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    case_id: CaseId,
    attempt: u32,
    setup: PhaseOutcome,
    call: PhaseOutcome,
    teardown: PhaseOutcome,
    markers: Vec<Marker>,
    abandoned: bool,
}

impl Attempt {
    /// Creates a new attempt from its three phase outcomes.
    pub fn new(
        case_id: CaseId,
        attempt: u32,
        setup: PhaseOutcome,
        call: PhaseOutcome,
        teardown: PhaseOutcome,
        markers: Vec<Marker>,
    ) -> Self {
        debug_assert_eq!(setup.phase, Phase::Setup);
        debug_assert_eq!(call.phase, Phase::Call);
        debug_assert_eq!(teardown.phase, Phase::Teardown);
        Self {
            case_id,
            attempt,
            setup,
            call,
            teardown,
            markers,
            abandoned: false,
        }
    }

    pub(crate) fn mark_abandoned(mut self) -> Self {
        self.abandoned = true;
        self
    }

    /// Returns the logical case this attempt belongs to.
    pub fn case_id(&self) -> &CaseId {
        &self.case_id
    }

    /// Returns the 1-based attempt number.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the outcome of the setup phase.
    pub fn setup(&self) -> &PhaseOutcome {
        &self.setup
    }

    /// Returns the outcome of the call phase.
    pub fn call(&self) -> &PhaseOutcome {
        &self.call
    }

    /// Returns the outcome of the teardown phase.
    pub fn teardown(&self) -> &PhaseOutcome {
        &self.teardown
    }

    /// Returns the outcome for `phase`.
    pub fn phase(&self, phase: Phase) -> &PhaseOutcome {
        match phase {
            Phase::Setup => &self.setup,
            Phase::Call => &self.call,
            Phase::Teardown => &self.teardown,
        }
    }

    /// Returns the markers in effect for this attempt.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Returns true if the runner abandoned this attempt before all phases reported.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// Returns the total time taken across all phases, saturating at [`Duration::MAX`].
    pub fn duration(&self) -> Duration {
        self.setup
            .duration
            .saturating_add(self.call.duration)
            .saturating_add(self.teardown.duration)
    }

    /// Returns the skip reason if a `skip` marker, or a `skip-if` marker with a true condition,
    /// is in effect.
    ///
    /// The outer `Option` is whether the test is skipped; the inner one is the reason.
    pub fn skip_marker(&self) -> Option<Option<&str>> {
        self.markers.iter().find_map(|marker| match marker {
            Marker::Skip { reason } => Some(reason.as_deref()),
            Marker::SkipIf {
                condition: true,
                reason,
            } => Some(reason.as_deref()),
            _ => None,
        })
    }

    /// Returns the reason and strictness of an `expected-failure` marker, if present.
    pub fn expected_failure_marker(&self) -> Option<(Option<&str>, bool)> {
        self.markers.iter().find_map(|marker| match marker {
            Marker::ExpectedFailure { reason, strict } => Some((reason.as_deref(), *strict)),
            _ => None,
        })
    }

    /// Returns the max attempts from a `rerun-policy` marker, if present.
    pub fn rerun_policy(&self) -> Option<NonZeroU32> {
        self.markers.iter().find_map(|marker| match marker {
            Marker::RerunPolicy { max_attempts } => Some(*max_attempts),
            _ => None,
        })
    }
}
