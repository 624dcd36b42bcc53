// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::MessageStreamError;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{fmt, io::BufRead, num::NonZeroU32, time::Duration};

/// A message sent by a test runner to the outcome engine.
///
/// Runners write one message per line, serialized as JSON and tagged by a `"type"` field.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RunnerMessage {
    /// The ordered parameter set for a parametrized base test.
    Parameters(ParameterSetMessage),

    /// A single execution phase of an attempt completed.
    Phase(PhaseEvent),

    /// An artifact was produced by an attempt.
    Attach(AttachMessage),

    /// The runner gave up on an attempt before all of its phases reported.
    Abandon(AbandonMessage),
}

impl RunnerMessage {
    /// Reads newline-delimited runner messages from `reader`.
    ///
    /// Blank lines are skipped. Iteration continues past parse errors so that callers can decide
    /// whether to stop at the first one.
    pub fn read_stream<R: BufRead>(
        reader: R,
    ) -> impl Iterator<Item = Result<RunnerMessage, MessageStreamError>> {
        reader
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(serde_json::from_str(&line).map_err(|err| {
                    MessageStreamError::Parse {
                        line: idx + 1,
                        err,
                    }
                })),
                Err(err) => Some(Err(MessageStreamError::Read(err))),
            })
    }
}

/// The parameter set used to instantiate a parametrized base test.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ParameterSetMessage {
    /// The base test name.
    pub base: SmolStr,

    /// Parameter ids, in declaration order.
    pub ids: Vec<ParameterId>,
}

/// A reference to a logical case, as sent by the runner.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct CaseRef {
    /// The base test name, for example `TestPassing::test_page_title`.
    pub base: SmolStr,

    /// The parameter id, for parametrized tests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<ParameterId>,
}

impl CaseRef {
    /// Creates a reference to a non-parametrized case.
    pub fn new(base: impl Into<SmolStr>) -> Self {
        Self {
            base: base.into(),
            param: None,
        }
    }

    /// Creates a reference to a parametrized case.
    pub fn with_param(base: impl Into<SmolStr>, param: impl Into<ParameterId>) -> Self {
        Self {
            base: base.into(),
            param: Some(param.into()),
        }
    }
}

/// The id of a single entry within a parameter set.
///
/// Either an explicit id chosen by the test author or a positional index into the parameter set.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum ParameterId {
    /// A positional index into the parameter set.
    Index(usize),

    /// An explicit id.
    Explicit(SmolStr),
}

impl From<&str> for ParameterId {
    fn from(id: &str) -> Self {
        Self::Explicit(id.into())
    }
}

impl From<usize> for ParameterId {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Explicit(id) => f.write_str(id),
        }
    }
}

/// A phase-completion event for one attempt.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PhaseEvent {
    /// The case this event belongs to.
    pub case: CaseRef,

    /// The 1-based attempt number.
    pub attempt: u32,

    /// The phase that completed.
    pub phase: Phase,

    /// How the phase ended.
    pub status: PhaseStatus,

    /// Error details for a failed phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,

    /// Markers declared on the test. Runners typically send these on every phase; the engine
    /// uses the ones sent with the first phase of the attempt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,

    /// Time taken by this phase.
    #[serde(default, with = "duration_secs")]
    pub duration: Duration,
}

/// An artifact produced by an attempt.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AttachMessage {
    /// The case the artifact belongs to.
    pub case: CaseRef,

    /// The attempt that produced the artifact.
    pub attempt: u32,

    /// The artifact.
    pub artifact: ArtifactDescriptor,
}

/// Signals that an attempt ended before all of its phases reported.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AbandonMessage {
    /// The case the attempt belongs to.
    pub case: CaseRef,

    /// The abandoned attempt.
    pub attempt: u32,
}

/// An execution phase of a single attempt.
#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Fixture setup.
    Setup,

    /// The test body.
    Call,

    /// Fixture teardown.
    Teardown,
}

impl Phase {
    /// All phases, in execution order.
    pub const ALL: [Phase; 3] = [Phase::Setup, Phase::Call, Phase::Teardown];

    /// Returns the phase expected to follow this one, if any.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Setup => Some(Phase::Call),
            Phase::Call => Some(Phase::Teardown),
            Phase::Teardown => None,
        }
    }

    /// Returns the string used for this phase in serialized output.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Call => "call",
            Phase::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a phase ended.
#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseStatus {
    /// The phase completed without error.
    Ok,

    /// The phase raised an error or failed an assertion.
    Failed,

    /// The phase did not run.
    Skipped,
}

impl PhaseStatus {
    /// Returns true if the phase failed.
    pub fn is_failed(self) -> bool {
        self == PhaseStatus::Failed
    }
}

/// Details about an error raised during a phase.
///
/// The `kind` is kept exactly as the runner reported it: `IndexError` and `KeyError` remain
/// distinct all the way into the report.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorInfo {
    /// The exception category, or `AssertionError` for assertion failures.
    pub kind: SmolStr,

    /// The error message.
    pub message: String,

    /// Stack trace or source location, if the runner captured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ErrorInfo {
    /// Creates a new `ErrorInfo` without location information.
    pub fn new(kind: impl Into<SmolStr>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            location: None,
        }
    }

    /// Sets the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Metadata declared on a test.
///
/// A test with no markers carries an empty list.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Marker {
    /// The test is skipped unconditionally.
    Skip {
        /// Why the test is skipped.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// The test is skipped if `condition` is true. The runner evaluates the condition.
    SkipIf {
        /// The evaluated condition.
        condition: bool,

        /// Why the test is skipped.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// The test is expected to fail.
    ExpectedFailure {
        /// Why the test is expected to fail.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,

        /// If true, an unexpected pass is reported as a failure.
        #[serde(default)]
        strict: bool,
    },

    /// The test may be run up to `max_attempts` times.
    RerunPolicy {
        /// The total number of attempts, including the first.
        max_attempts: NonZeroU32,
    },
}

/// A reference to an artifact stored outside the engine, such as a screenshot.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactDescriptor {
    /// The artifact kind, for example `screenshot` or `trace`.
    pub kind: SmolStr,

    /// Where the artifact was stored.
    pub path: Utf8PathBuf,
}

impl ArtifactDescriptor {
    /// Creates a new artifact descriptor.
    pub fn new(kind: impl Into<SmolStr>, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            kind: kind.into(),
            path: path.into(),
        }
    }
}

/// Serializes durations as fractional seconds.
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub(crate) fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|err| D::Error::custom(format!("invalid duration {secs}: {err}")))
    }
}
