// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data models for fixture information.

use outcome_metadata::{
    ArtifactDescriptor, AttachMessage, CaseClassification, CaseRef, ErrorInfo, Marker, ParameterId,
    ParameterSetMessage, Phase, PhaseEvent, PhaseStatus, RunnerMessage,
};
use std::time::Duration;

pub const SETUP_DURATION: Duration = Duration::from_millis(20);
pub const CALL_DURATION: Duration = Duration::from_millis(100);
pub const TEARDOWN_DURATION: Duration = Duration::from_millis(5);

/// The duration of one scripted attempt, summed over its phases.
pub const ATTEMPT_DURATION: Duration = SETUP_DURATION
    .saturating_add(CALL_DURATION)
    .saturating_add(TEARDOWN_DURATION);

#[derive(Clone, Debug)]
pub struct SuiteFixture {
    pub name: &'static str,
    pub cases: Vec<CaseFixture>,
}

impl SuiteFixture {
    /// Parameter-set messages for every parametrized base test, in first-seen order.
    pub fn parameter_messages(&self) -> Vec<RunnerMessage> {
        let mut messages: Vec<ParameterSetMessage> = Vec::new();
        for case in &self.cases {
            let Some(param) = case.param else {
                continue;
            };
            match messages.iter_mut().find(|m| m.base == case.base) {
                Some(message) => message.ids.push(param.into()),
                None => messages.push(ParameterSetMessage {
                    base: case.base.into(),
                    ids: vec![param.into()],
                }),
            }
        }
        messages.into_iter().map(RunnerMessage::Parameters).collect()
    }

    /// The full message stream a runner would produce for this suite, case by case.
    pub fn messages(&self) -> Vec<RunnerMessage> {
        let mut messages = self.parameter_messages();
        for case in &self.cases {
            messages.extend(case.scripted_messages());
        }
        messages
    }

    /// Returns the number of attempts the suite's scripts run.
    pub fn scripted_attempts(&self) -> usize {
        self.cases.iter().map(|case| case.script.len()).sum()
    }

    pub fn case(&self, id: &str) -> Option<&CaseFixture> {
        self.cases.iter().find(|case| case.id() == id)
    }
}

#[derive(Clone, Debug)]
pub struct CaseFixture {
    pub base: &'static str,
    pub param: Option<&'static str>,
    pub markers: Vec<Marker>,
    /// What each attempt does, in order. Attempts past the end repeat the last entry.
    pub script: Vec<AttemptScript>,
    /// Artifacts produced by each attempt.
    pub artifacts: Vec<(u32, &'static str, &'static str)>,
    pub expected: ExpectedRecord,
}

impl CaseFixture {
    pub fn new(base: &'static str, script: AttemptScript, expected: ExpectedRecord) -> Self {
        Self {
            base,
            param: None,
            markers: Vec::new(),
            script: vec![script],
            artifacts: Vec::new(),
            expected,
        }
    }

    pub fn with_param(mut self, param: &'static str) -> Self {
        self.param = Some(param);
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn with_script(mut self, script: Vec<AttemptScript>) -> Self {
        self.script = script;
        self
    }

    pub fn with_artifact(mut self, attempt: u32, kind: &'static str, path: &'static str) -> Self {
        self.artifacts.push((attempt, kind, path));
        self
    }

    pub fn case_ref(&self) -> CaseRef {
        CaseRef {
            base: self.base.into(),
            param: self.param.map(ParameterId::from),
        }
    }

    /// The logical case id: `base`, or `base[param]` for parametrized cases.
    pub fn id(&self) -> String {
        match self.param {
            Some(param) => format!("{}[{param}]", self.base),
            None => self.base.to_owned(),
        }
    }

    pub fn script_for(&self, attempt: u32) -> AttemptScript {
        let idx = (attempt as usize).saturating_sub(1);
        self.script
            .get(idx)
            .or_else(|| self.script.last())
            .copied()
            .unwrap_or(AttemptScript::Pass)
    }

    /// Messages for a single attempt: its phases in order, with its artifacts attached before
    /// teardown reports.
    pub fn attempt_messages(&self, attempt: u32) -> Vec<RunnerMessage> {
        let script = self.script_for(attempt);
        let mut messages = Vec::new();
        for phase in Phase::ALL {
            if phase == Phase::Teardown {
                messages.extend(self.attach_messages(attempt));
            }
            let (status, error) = script.phase_result(phase);
            messages.push(RunnerMessage::Phase(PhaseEvent {
                case: self.case_ref(),
                attempt,
                phase,
                status,
                error,
                markers: self.markers.clone(),
                duration: match (phase, status) {
                    (_, PhaseStatus::Skipped) => Duration::ZERO,
                    (Phase::Setup, _) => SETUP_DURATION,
                    (Phase::Call, _) => CALL_DURATION,
                    (Phase::Teardown, _) => TEARDOWN_DURATION,
                },
            }));
        }
        messages
    }

    fn attach_messages(&self, attempt: u32) -> impl Iterator<Item = RunnerMessage> + '_ {
        self.artifacts
            .iter()
            .filter(move |(artifact_attempt, _, _)| *artifact_attempt == attempt)
            .map(move |(_, kind, path)| {
                RunnerMessage::Attach(AttachMessage {
                    case: self.case_ref(),
                    attempt,
                    artifact: ArtifactDescriptor::new(*kind, *path),
                })
            })
    }

    /// Messages for every scripted attempt.
    pub fn scripted_messages(&self) -> Vec<RunnerMessage> {
        (1..=self.script.len() as u32)
            .flat_map(|attempt| self.attempt_messages(attempt))
            .collect()
    }
}

/// What a scripted attempt does.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttemptScript {
    /// All phases pass.
    Pass,

    /// The call phase raises the given error.
    Fail {
        kind: &'static str,
        message: &'static str,
    },

    /// Setup raises the given error; call and teardown don't run.
    SetupError {
        kind: &'static str,
        message: &'static str,
    },

    /// The runner skips every phase.
    Skip,
}

impl AttemptScript {
    fn phase_result(self, phase: Phase) -> (PhaseStatus, Option<ErrorInfo>) {
        match (self, phase) {
            (AttemptScript::Pass, _) => (PhaseStatus::Ok, None),
            (AttemptScript::Fail { kind, message }, Phase::Call) => {
                (PhaseStatus::Failed, Some(ErrorInfo::new(kind, message)))
            }
            (AttemptScript::Fail { .. }, _) => (PhaseStatus::Ok, None),
            (AttemptScript::SetupError { kind, message }, Phase::Setup) => {
                (PhaseStatus::Failed, Some(ErrorInfo::new(kind, message)))
            }
            (AttemptScript::SetupError { .. }, _) | (AttemptScript::Skip, _) => {
                (PhaseStatus::Skipped, None)
            }
        }
    }
}

/// The final record a case is expected to produce with the default profile.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExpectedRecord {
    pub classification: CaseClassification,
    pub attempts_used: u32,
    pub flaky: bool,
    pub error_kind: Option<&'static str>,
}

impl ExpectedRecord {
    pub const PASSED: Self = Self::new(CaseClassification::Passed);
    pub const SKIPPED: Self = Self::new(CaseClassification::Skipped);

    pub const fn new(classification: CaseClassification) -> Self {
        Self {
            classification,
            attempts_used: 1,
            flaky: false,
            error_kind: None,
        }
    }

    pub const fn failed(kind: &'static str) -> Self {
        Self {
            classification: CaseClassification::Failed,
            attempts_used: 1,
            flaky: false,
            error_kind: Some(kind),
        }
    }

    pub const fn flaky(attempts_used: u32) -> Self {
        Self {
            classification: CaseClassification::Passed,
            attempts_used,
            flaky: true,
            error_kind: None,
        }
    }
}
