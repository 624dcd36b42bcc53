// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the outcome engine.
//!
//! Errors here are failures of the engine or of the runner's use of it. Test failures are never
//! errors: they are data, carried by [`ErrorInfo`](outcome_metadata::ErrorInfo) and classified.

use crate::{identity::CaseId, reporter::SessionReport};
use camino::Utf8PathBuf;
use config::ConfigError;
use itertools::Itertools;
use outcome_metadata::{ParameterId, Phase};
use smol_str::SmolStr;
use std::fmt;
use thiserror::Error;

/// An error in the runner's event protocol.
///
/// Protocol errors are integration bugs: they are surfaced immediately and never retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A phase or attempt arrived out of order.
    #[error(transparent)]
    OutOfOrderPhase(#[from] OutOfOrderPhase),

    /// A parameter id was repeated within a parameter set.
    #[error(transparent)]
    DuplicateParameterId(#[from] DuplicateParameterId),

    /// A parameter id was not part of its base test's parameter set.
    #[error(transparent)]
    UnknownParameterId(#[from] UnknownParameterId),
}

/// An event arrived in an order the collector or reconciler cannot accept.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("out-of-order event for `{case_id}` attempt {attempt}: {reason}")]
pub struct OutOfOrderPhase {
    case_id: CaseId,
    attempt: u32,
    reason: OutOfOrderReason,
}

impl OutOfOrderPhase {
    pub(crate) fn new(case_id: CaseId, attempt: u32, reason: OutOfOrderReason) -> Self {
        Self {
            case_id,
            attempt,
            reason,
        }
    }

    /// Returns the case the event was for.
    pub fn case_id(&self) -> &CaseId {
        &self.case_id
    }

    /// Returns the attempt the event was for.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns why the event was rejected.
    pub fn reason(&self) -> &OutOfOrderReason {
        &self.reason
    }
}

/// The reason an [`OutOfOrderPhase`] error occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutOfOrderReason {
    /// A phase arrived for an attempt that was already complete.
    AttemptFinalized {
        /// The phase that arrived.
        phase: Phase,
    },

    /// A phase arrived before its predecessor, or twice.
    UnexpectedPhase {
        /// The phase the collector was waiting for.
        expected: Phase,

        /// The phase that arrived.
        actual: Phase,
    },

    /// An attempt number was skipped, repeated, or zero.
    AttemptOutOfSequence {
        /// The attempt number the case expects next.
        expected: u32,
    },

    /// A new attempt started while an earlier one was still being collected.
    AttemptInProgress {
        /// The attempt still being collected.
        in_progress: u32,
    },

    /// An attempt arrived for a case that already has a final record.
    CaseFinalized,

    /// An attempt was abandoned before any of its phases were recorded.
    NothingToAbandon,
}

impl fmt::Display for OutOfOrderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttemptFinalized { phase } => {
                write!(f, "phase `{phase}` arrived after the attempt was finalized")
            }
            Self::UnexpectedPhase { expected, actual } => {
                write!(f, "expected phase `{expected}`, found `{actual}`")
            }
            Self::AttemptOutOfSequence { expected } => {
                write!(f, "expected attempt {expected}")
            }
            Self::AttemptInProgress { in_progress } => {
                write!(f, "attempt {in_progress} has not finished")
            }
            Self::CaseFinalized => write!(f, "the case already has a final record"),
            Self::NothingToAbandon => write!(f, "no phases were recorded for this attempt"),
        }
    }
}

/// A parameter id was repeated within a base test's parameter set.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("parameter id `{id}` is used more than once for `{base}`")]
pub struct DuplicateParameterId {
    base: SmolStr,
    id: ParameterId,
}

impl DuplicateParameterId {
    pub(crate) fn new(base: SmolStr, id: ParameterId) -> Self {
        Self { base, id }
    }

    /// Returns the base test name.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the repeated id.
    pub fn id(&self) -> &ParameterId {
        &self.id
    }
}

/// A parameter id was used that is not part of the base test's registered parameter set.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(
    "parameter id `{id}` is not registered for `{base}` (known ids: {})",
    .known.iter().join(", ")
)]
pub struct UnknownParameterId {
    base: SmolStr,
    id: ParameterId,
    known: Vec<ParameterId>,
}

impl UnknownParameterId {
    pub(crate) fn new(base: SmolStr, id: ParameterId, known: Vec<ParameterId>) -> Self {
        Self { base, id, known }
    }
}

/// Some cases recorded attempts but never reached a final state.
///
/// The session still finalizes: those cases are reported as `incomplete`, and the full report is
/// available through [`Self::report`] and [`Self::into_report`].
#[derive(Clone, Debug, Error)]
#[error(
    "{} case(s) did not reach a final state: {}",
    .incomplete.len(),
    .incomplete.iter().join(", ")
)]
pub struct IncompleteSession {
    incomplete: Vec<CaseId>,
    report: Box<SessionReport>,
}

impl IncompleteSession {
    pub(crate) fn new(incomplete: Vec<CaseId>, report: SessionReport) -> Self {
        Self {
            incomplete,
            report: Box::new(report),
        }
    }

    /// Returns the cases that were reported as incomplete.
    pub fn incomplete_cases(&self) -> &[CaseId] {
        &self.incomplete
    }

    /// Returns the report, with incomplete cases included.
    pub fn report(&self) -> &SessionReport {
        &self.report
    }

    /// Consumes self, returning the report.
    pub fn into_report(self) -> SessionReport {
        *self.report
    }
}

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse outcome config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of [`ConfigParseError`].
#[derive(Debug, Error)]
pub enum ConfigParseErrorKind {
    /// Building the layered config failed.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// Deserializing the layered config failed.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// A profile set `default-max-attempts` to zero.
    #[error("profile `{profile}` sets default-max-attempts to 0 (must be at least 1)")]
    ZeroMaxAttempts {
        /// The profile name.
        profile: String,
    },
}

/// An error which indicates that a profile was requested but not defined.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }
}

/// An error that occurred while writing a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// An error occurred while writing to the provided output.
    #[error("error writing to output")]
    Io(#[source] std::io::Error),

    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while producing JSON.
    #[error("error serializing session report")]
    Json(#[source] serde_json::Error),

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit output to {file}")]
    Junit {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: quick_junit::SerializeError,
    },
}
