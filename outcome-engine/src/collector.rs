// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Buffers phase events until an attempt is complete.
//!
//! The runner reports each phase of each attempt separately, and attempts for different cases may
//! interleave arbitrarily. The collector shards its buffers by case id so that workers reporting
//! on different cases only ever touch their own shard.

use crate::{
    attempt::{Attempt, PhaseOutcome},
    errors::{OutOfOrderPhase, OutOfOrderReason},
    helpers::ShardedMap,
    identity::CaseId,
};
use outcome_metadata::{Marker, Phase};
use tracing::trace;

/// The result of recording a phase.
#[derive(Clone, Debug)]
#[must_use]
pub struct CollectedPhase {
    /// True if this was the first event ever seen for the case.
    pub first_seen: bool,

    /// The attempt, if this phase completed it.
    pub completed: Option<Attempt>,
}

/// Buffers per-attempt phase outcomes, sharded by case id.
#[derive(Debug, Default)]
pub struct EventCollector {
    cases: ShardedMap<CaseId, CaseBuffer>,
}

#[derive(Debug, Default)]
struct CaseBuffer {
    // The highest attempt number that has completed, or 0.
    completed: u32,
    in_progress: Option<AttemptBuffer>,
    closed: bool,
}

#[derive(Debug)]
struct AttemptBuffer {
    attempt: u32,
    markers: Vec<Marker>,
    setup: Option<PhaseOutcome>,
    call: Option<PhaseOutcome>,
}

impl AttemptBuffer {
    fn next_phase(&self) -> Phase {
        match (&self.setup, &self.call) {
            (None, _) => Phase::Setup,
            (Some(_), None) => Phase::Call,
            (Some(_), Some(_)) => Phase::Teardown,
        }
    }

    fn finish(self, case_id: &CaseId, teardown: Option<PhaseOutcome>) -> Attempt {
        Attempt::new(
            case_id.clone(),
            self.attempt,
            self.setup
                .unwrap_or_else(|| PhaseOutcome::skipped(Phase::Setup)),
            self.call.unwrap_or_else(|| PhaseOutcome::skipped(Phase::Call)),
            teardown.unwrap_or_else(|| PhaseOutcome::skipped(Phase::Teardown)),
            self.markers,
        )
    }
}

impl EventCollector {
    /// Creates a new, empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one phase of an attempt.
    ///
    /// Phases must arrive in the order setup, call, teardown, and attempt `n + 1` may only start
    /// once attempt `n` has completed. The markers sent with the setup phase are the ones in
    /// effect for the attempt.
    ///
    /// Once the teardown phase is recorded, the completed [`Attempt`] is returned.
    pub fn record_phase(
        &self,
        case_id: &CaseId,
        attempt: u32,
        outcome: PhaseOutcome,
        markers: &[Marker],
    ) -> Result<CollectedPhase, OutOfOrderPhase> {
        self.cases.with_shard(case_id, |shard| {
            let first_seen = !shard.contains_key(case_id);
            let buffer = shard.entry(case_id.clone()).or_default();

            match buffer.accept(case_id, attempt, outcome, markers) {
                Ok(completed) => Ok(CollectedPhase {
                    first_seen,
                    completed,
                }),
                Err(error) => {
                    if first_seen {
                        shard.remove(case_id);
                    }
                    Err(error)
                }
            }
        })
    }

    /// Ends an in-progress attempt early.
    ///
    /// Phases that never reported are recorded as skipped, and the attempt is returned with
    /// [`Attempt::is_abandoned`] set.
    pub fn abandon(&self, case_id: &CaseId, attempt: u32) -> Result<Attempt, OutOfOrderPhase> {
        self.cases.with_value(case_id, |buffer| {
            let error = || {
                OutOfOrderPhase::new(
                    case_id.clone(),
                    attempt,
                    OutOfOrderReason::NothingToAbandon,
                )
            };
            let buffer = buffer.ok_or_else(error)?;
            match buffer.in_progress.take() {
                Some(in_progress) if in_progress.attempt == attempt => {
                    buffer.completed = attempt;
                    trace!(%case_id, attempt, "attempt abandoned");
                    Ok(in_progress.finish(case_id, None).mark_abandoned())
                }
                other => {
                    buffer.in_progress = other;
                    Err(error())
                }
            }
        })
    }

    /// Marks a case as finished: any further attempts for it are rejected.
    pub fn close(&self, case_id: &CaseId) {
        self.cases.with_value(case_id, |buffer| {
            if let Some(buffer) = buffer {
                buffer.closed = true;
            }
        });
    }

    /// Returns the attempt number currently being collected for a case, if any.
    pub fn in_progress(&self, case_id: &CaseId) -> Option<u32> {
        self.cases.with_value(case_id, |buffer| {
            buffer.and_then(|buffer| buffer.in_progress.as_ref().map(|b| b.attempt))
        })
    }

    /// Returns every attempt with buffered phases that hasn't completed, sorted by case id.
    pub fn in_flight(&self) -> Vec<(CaseId, u32)> {
        let mut in_flight = Vec::new();
        self.cases.for_each(|case_id, buffer| {
            if let Some(attempt) = &buffer.in_progress {
                in_flight.push((case_id.clone(), attempt.attempt));
            }
        });
        in_flight.sort_unstable();
        in_flight
    }
}

impl CaseBuffer {
    fn accept(
        &mut self,
        case_id: &CaseId,
        attempt: u32,
        outcome: PhaseOutcome,
        markers: &[Marker],
    ) -> Result<Option<Attempt>, OutOfOrderPhase> {
        let phase = outcome.phase;
        let error = |reason| OutOfOrderPhase::new(case_id.clone(), attempt, reason);

        if attempt != 0 && attempt <= self.completed {
            return Err(error(OutOfOrderReason::AttemptFinalized { phase }));
        }
        if self.closed {
            return Err(error(OutOfOrderReason::CaseFinalized));
        }

        let in_progress = match &mut self.in_progress {
            Some(in_progress) if in_progress.attempt == attempt => {
                let expected = in_progress.next_phase();
                if phase != expected {
                    return Err(error(OutOfOrderReason::UnexpectedPhase {
                        expected,
                        actual: phase,
                    }));
                }
                in_progress
            }
            Some(in_progress) => {
                return Err(error(OutOfOrderReason::AttemptInProgress {
                    in_progress: in_progress.attempt,
                }));
            }
            None => {
                let expected = self.completed + 1;
                if attempt != expected {
                    return Err(error(OutOfOrderReason::AttemptOutOfSequence { expected }));
                }
                if phase != Phase::Setup {
                    return Err(error(OutOfOrderReason::UnexpectedPhase {
                        expected: Phase::Setup,
                        actual: phase,
                    }));
                }
                self.in_progress.insert(AttemptBuffer {
                    attempt,
                    markers: markers.to_vec(),
                    setup: None,
                    call: None,
                })
            }
        };

        trace!(%case_id, attempt, %phase, status = ?outcome.status, "phase recorded");
        match phase {
            Phase::Setup => in_progress.setup = Some(outcome),
            Phase::Call => in_progress.call = Some(outcome),
            Phase::Teardown => {
                let finished = self
                    .in_progress
                    .take()
                    .map(|in_progress| in_progress.finish(case_id, Some(outcome)));
                self.completed = attempt;
                return Ok(finished);
            }
        }
        Ok(None)
    }
}
