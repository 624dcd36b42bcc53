// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Links out-of-band artifacts, such as screenshots, to the attempts that produced them.

use crate::{config::RetainArtifacts, helpers::ShardedMap, identity::CaseId};
use outcome_metadata::ArtifactDescriptor;
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// Collects artifacts per attempt until their case is final.
///
/// Artifacts may be attached before or after the attempt they belong to completes. Once a case's
/// final record has taken its artifacts, later attachments for that case are dropped.
#[derive(Debug, Default)]
pub struct AttachmentLinker {
    cases: ShardedMap<CaseId, CaseArtifacts>,
}

#[derive(Debug, Default)]
struct CaseArtifacts {
    by_attempt: BTreeMap<u32, Vec<ArtifactDescriptor>>,
    taken: bool,
}

impl CaseArtifacts {
    fn select(&self, deciding_attempt: u32, retain: RetainArtifacts) -> Vec<ArtifactDescriptor> {
        match retain {
            RetainArtifacts::DecidingOnly => self
                .by_attempt
                .get(&deciding_attempt)
                .cloned()
                .unwrap_or_default(),
            RetainArtifacts::AllAttempts => self.by_attempt.values().flatten().cloned().collect(),
        }
    }
}

/// The result of [`AttachmentLinker::attach`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The artifact was linked.
    Linked,

    /// The case was already final; the artifact was dropped.
    Dropped,
}

impl AttachmentLinker {
    /// Creates a new, empty linker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `artifact` with attempt `attempt` of `case_id`.
    pub fn attach(
        &self,
        case_id: &CaseId,
        attempt: u32,
        artifact: ArtifactDescriptor,
    ) -> AttachOutcome {
        self.cases.with_shard(case_id, |shard| {
            let artifacts = shard.entry(case_id.clone()).or_default();
            if artifacts.taken {
                warn!(
                    %case_id,
                    attempt,
                    path = %artifact.path,
                    "dropping artifact attached after the case was finalized"
                );
                return AttachOutcome::Dropped;
            }
            trace!(%case_id, attempt, kind = %artifact.kind, "artifact linked");
            artifacts.by_attempt.entry(attempt).or_default().push(artifact);
            AttachOutcome::Linked
        })
    }

    /// Returns the artifacts for a final record and closes the case to further attachments.
    ///
    /// With [`RetainArtifacts::DecidingOnly`], only artifacts attached to `deciding_attempt` are
    /// returned. With [`RetainArtifacts::AllAttempts`], artifacts from every attempt are returned
    /// in attempt order.
    pub fn take(
        &self,
        case_id: &CaseId,
        deciding_attempt: u32,
        retain: RetainArtifacts,
    ) -> Vec<ArtifactDescriptor> {
        self.cases.with_shard(case_id, |shard| {
            let artifacts = shard.entry(case_id.clone()).or_default();
            let selected = artifacts.select(deciding_attempt, retain);
            artifacts.by_attempt.clear();
            artifacts.taken = true;
            selected
        })
    }

    /// Returns the artifacts for a case without closing it.
    ///
    /// Used for records of cases that never reached a final state.
    pub fn peek(
        &self,
        case_id: &CaseId,
        deciding_attempt: u32,
        retain: RetainArtifacts,
    ) -> Vec<ArtifactDescriptor> {
        self.cases.with_value(case_id, |artifacts| {
            artifacts
                .map(|artifacts| artifacts.select(deciding_attempt, retain))
                .unwrap_or_default()
        })
    }
}
