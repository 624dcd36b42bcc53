// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session: the single entry point runners report into.
//!
//! A [`Session`] wires the engine's components together. Phase events flow through the
//! [`EventCollector`], completed attempts through the classifier and a per-case
//! [`CaseReconciler`], and final records into the [`ReportAggregator`], with artifacts linked in
//! by the [`AttachmentLinker`] as each record is produced.
//!
//! Every method takes `&self`, and a session can be shared across worker threads. Per-case state
//! is sharded by case id, so workers reporting on different cases don't contend with each other.

use crate::{
    attachments::{AttachOutcome, AttachmentLinker},
    attempt::{Attempt, PhaseOutcome},
    classify::Classification,
    collector::EventCollector,
    config::{DurationPolicy, RetainArtifacts, UnexpectedPassPolicy},
    errors::{DuplicateParameterId, IncompleteSession, ProtocolError, UnknownParameterId},
    helpers::ShardedMap,
    identity::{CaseId, CaseIdentityResolver},
    reconciler::{CaseReconciler, FinalRecord, ReconcileStep},
    reporter::{ReportAggregator, SessionReport},
};
use outcome_metadata::{ArtifactDescriptor, CaseRef, ParameterId, PhaseEvent, RunnerMessage};
use smol_str::SmolStr;
use std::num::NonZeroU32;
use tracing::debug;

/// Settings a session runs with.
///
/// Usually obtained from [`OutcomeProfile::session_settings`](crate::config::OutcomeProfile::session_settings).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// The number of attempts allowed for a case without a `rerun-policy` marker.
    pub default_max_attempts: NonZeroU32,

    /// Which attempts' artifacts final records carry.
    pub retain_artifacts: RetainArtifacts,

    /// How non-strict unexpected passes end their case.
    pub unexpected_pass: UnexpectedPassPolicy,

    /// Which duration final records report.
    pub duration: DurationPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_max_attempts: NonZeroU32::MIN,
            retain_artifacts: RetainArtifacts::default(),
            unexpected_pass: UnexpectedPassPolicy::default(),
            duration: DurationPolicy::default(),
        }
    }
}

/// What happened as a result of a phase event or an abandoned attempt.
#[derive(Clone, Debug)]
pub enum PhaseProgress {
    /// The phase was buffered; its attempt isn't complete yet.
    Buffered,

    /// An attempt completed and failed, and the case has attempts left.
    RetryExpected {
        /// The case.
        case_id: CaseId,

        /// The classification of the attempt that just completed.
        classification: Classification,

        /// The attempt number expected next.
        next_attempt: u32,

        /// The total number of attempts allowed.
        max_attempts: NonZeroU32,
    },

    /// An attempt completed and decided its case.
    Finalized(FinalRecord),
}

/// A test session.
#[derive(Debug, Default)]
pub struct Session {
    settings: SessionSettings,
    resolver: CaseIdentityResolver,
    collector: EventCollector,
    reconcilers: ShardedMap<CaseId, CaseReconciler>,
    linker: AttachmentLinker,
    aggregator: ReportAggregator,
}

impl Session {
    /// Creates a new session with the given settings.
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Returns the settings this session runs with.
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Registers the ordered parameter set for a parametrized base test.
    pub fn register_parameters(
        &self,
        base: impl Into<SmolStr>,
        ids: impl IntoIterator<Item = ParameterId>,
    ) -> Result<(), DuplicateParameterId> {
        self.resolver.register_parameters(base, ids)
    }

    /// Resolves a case reference into its logical-case id.
    pub fn resolve(&self, case: &CaseRef) -> Result<CaseId, UnknownParameterId> {
        self.resolver.resolve_ref(case)
    }

    /// Records one phase of one attempt.
    pub fn record_phase(&self, event: &PhaseEvent) -> Result<PhaseProgress, ProtocolError> {
        let case_id = self.resolver.resolve_ref(&event.case)?;
        let outcome = PhaseOutcome {
            phase: event.phase,
            status: event.status,
            error: event.error.clone(),
            duration: event.duration,
        };

        let collected =
            self.collector
                .record_phase(&case_id, event.attempt, outcome, &event.markers)?;
        if collected.first_seen {
            self.aggregator.observe(&case_id);
        }
        match collected.completed {
            Some(attempt) => self.complete_attempt(attempt),
            None => Ok(PhaseProgress::Buffered),
        }
    }

    /// Ends an in-progress attempt early, for example after a setup failure with no teardown.
    pub fn abandon(&self, case: &CaseRef, attempt: u32) -> Result<PhaseProgress, ProtocolError> {
        let case_id = self.resolver.resolve_ref(case)?;
        let attempt = self.collector.abandon(&case_id, attempt)?;
        self.complete_attempt(attempt)
    }

    /// Associates an artifact with an attempt.
    pub fn attach(
        &self,
        case: &CaseRef,
        attempt: u32,
        artifact: ArtifactDescriptor,
    ) -> Result<AttachOutcome, ProtocolError> {
        let case_id = self.resolver.resolve_ref(case)?;
        Ok(self.linker.attach(&case_id, attempt, artifact))
    }

    /// Handles a single message from the runner.
    ///
    /// Returns the progress made, if the message was a phase event or an abandoned attempt.
    pub fn handle_message(
        &self,
        message: &RunnerMessage,
    ) -> Result<Option<PhaseProgress>, ProtocolError> {
        match message {
            RunnerMessage::Parameters(parameters) => {
                self.register_parameters(parameters.base.clone(), parameters.ids.iter().cloned())?;
                Ok(None)
            }
            RunnerMessage::Phase(event) => self.record_phase(event).map(Some),
            RunnerMessage::Attach(attach) => {
                self.attach(&attach.case, attach.attempt, attach.artifact.clone())?;
                Ok(None)
            }
            RunnerMessage::Abandon(abandon) => {
                self.abandon(&abandon.case, abandon.attempt).map(Some)
            }
        }
    }

    /// Returns the attempts that have reported some, but not all, of their phases.
    pub fn in_flight(&self) -> Vec<(CaseId, u32)> {
        self.collector.in_flight()
    }

    /// Produces the session report.
    ///
    /// Cases that recorded events but never reached a final state are reported as incomplete, and
    /// the report is returned inside the [`IncompleteSession`] error. Calling this again without
    /// recording further events produces an identical report.
    pub fn finalize(&self) -> Result<SessionReport, IncompleteSession> {
        self.aggregator.finalize(|case_id| self.incomplete_record(case_id))
    }

    fn complete_attempt(&self, attempt: Attempt) -> Result<PhaseProgress, ProtocolError> {
        let case_id = attempt.case_id().clone();
        let step = self.reconcilers.with_shard(&case_id, |shard| {
            shard
                .entry(case_id.clone())
                .or_insert_with(|| CaseReconciler::new(case_id.clone()))
                .push(&attempt, &self.settings)
        })?;

        match step {
            ReconcileStep::RetryExpected {
                classification,
                next_attempt,
                max_attempts,
            } => {
                debug!(
                    %case_id,
                    next_attempt,
                    max_attempts = max_attempts.get(),
                    "retry expected",
                );
                Ok(PhaseProgress::RetryExpected {
                    case_id,
                    classification,
                    next_attempt,
                    max_attempts,
                })
            }
            ReconcileStep::Final(mut record) => {
                self.collector.close(&case_id);
                record.artifacts = self.linker.take(
                    &case_id,
                    record.attempts_used,
                    self.settings.retain_artifacts,
                );
                self.aggregator.append(record.clone());
                Ok(PhaseProgress::Finalized(record))
            }
        }
    }

    fn incomplete_record(&self, case_id: &CaseId) -> Option<FinalRecord> {
        let duration = self.settings.duration;
        let mut record = self.reconcilers.with_value(case_id, |reconciler| match reconciler {
            Some(reconciler) => reconciler.incomplete_record(duration),
            // Seen, but no attempt ever completed.
            None => CaseReconciler::new(case_id.clone()).incomplete_record(duration),
        })?;
        record.artifacts =
            self.linker
                .peek(case_id, record.attempts_used, self.settings.retain_artifacts);
        Some(record)
    }
}
