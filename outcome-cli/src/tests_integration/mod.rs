// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{ExpectedError, OutcomeApp, OutputWriter};
use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use clap::Parser;
use fixture_data::{models::SuiteFixture, saucedemo::SAUCEDEMO_SUITE};
use outcome_metadata::{CaseClassification, OutcomeExitCode, RunnerMessage, SessionReportSummary};
use pretty_assertions::assert_eq;

struct TempWorkspace {
    dir: Utf8TempDir,
}

impl TempWorkspace {
    fn new() -> Self {
        Self {
            dir: camino_tempfile::tempdir().expect("created temp dir"),
        }
    }

    fn root(&self) -> &Utf8Path {
        self.dir.path()
    }

    fn write_events(&self, messages: &[RunnerMessage]) -> Utf8PathBuf {
        let lines: Vec<_> = messages
            .iter()
            .map(|message| serde_json::to_string(message).expect("message serializes"))
            .collect();
        let path = self.root().join("events.jsonl");
        std::fs::write(&path, lines.join("\n")).expect("wrote events");
        path
    }

    fn default_report(&self) -> SessionReportSummary {
        let path = self.root().join("target/outcome/default/outcome.json");
        let json = std::fs::read_to_string(&path).expect("report was written");
        SessionReportSummary::parse_json(json).expect("report parses")
    }

    fn run(&self, events: &Utf8Path, extra_args: &[&str]) -> (Result<i32, ExpectedError>, Output) {
        let mut args = vec![
            "outcome-report",
            "--workspace-root",
            self.root().as_str(),
            "--events",
            events.as_str(),
            "--color",
            "never",
        ];
        args.extend_from_slice(extra_args);
        let app = OutcomeApp::try_parse_from(args).expect("arguments parse");
        let output = app.init_output();

        let mut writer = OutputWriter::Test {
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let result = app.exec(output, &mut writer);
        let OutputWriter::Test { stdout, stderr } = writer else {
            unreachable!("writer is a test writer");
        };
        let output = Output {
            stdout: String::from_utf8(stdout).expect("stdout is UTF-8"),
            stderr: String::from_utf8(stderr).expect("stderr is UTF-8"),
        };
        (result, output)
    }
}

struct Output {
    stdout: String,
    stderr: String,
}

fn exit_code(result: &Result<i32, ExpectedError>) -> i32 {
    match result {
        Ok(code) => *code,
        Err(error) => error.process_exit_code(),
    }
}

fn passing_suite() -> SuiteFixture {
    SuiteFixture {
        name: "saucedemo-passing",
        cases: SAUCEDEMO_SUITE
            .cases
            .iter()
            .filter(|case| case.expected.classification != CaseClassification::Failed)
            .cloned()
            .collect(),
    }
}

#[test]
fn saucedemo_fails_with_report() {
    let workspace = TempWorkspace::new();
    let events = workspace.write_events(&SAUCEDEMO_SUITE.messages());
    let (result, output) = workspace.run(&events, &[]);

    assert!(
        matches!(
            result,
            Err(ExpectedError::CasesFailed {
                failing: 7,
                total: 22
            })
        ),
        "unexpected result: {result:?}"
    );
    assert_eq!(exit_code(&result), OutcomeExitCode::CASES_FAILED);

    let report = workspace.default_report();
    assert_eq!(report.cases.len(), 22);
    assert_eq!(report.summary.flaky, 1);
    assert!(output.stderr.contains("Summary"), "stderr: {}", output.stderr);
    assert!(
        output
            .stderr
            .contains("FAIL RETRY [1/3] TestFlaky::test_passes_on_retry"),
        "stderr: {}",
        output.stderr
    );
    assert!(output.stdout.is_empty());
}

#[test]
fn passing_suite_as_json() {
    let workspace = TempWorkspace::new();
    let events = workspace.write_events(&passing_suite().messages());
    let (result, output) = workspace.run(&events, &["--message-format", "json"]);

    assert_eq!(exit_code(&result), OutcomeExitCode::OK);
    let printed = SessionReportSummary::parse_json(&output.stdout).expect("stdout is a report");
    assert_eq!(printed.cases.len(), 15);
    assert_eq!(
        printed.case("TestFlaky::test_passes_on_retry").map(|case| case.flaky),
        Some(true)
    );
    assert_eq!(printed, workspace.default_report());
    assert!(output.stderr.is_empty(), "stderr: {}", output.stderr);
}

#[test]
fn junit_flag_writes_xml() {
    let workspace = TempWorkspace::new();
    let events = workspace.write_events(&passing_suite().messages());
    let junit = workspace.root().join("out/junit.xml");
    let json = workspace.root().join("out/report.json");
    let (result, _) = workspace.run(
        &events,
        &["--junit", junit.as_str(), "--output", json.as_str()],
    );

    assert_eq!(exit_code(&result), OutcomeExitCode::OK);
    let xml = std::fs::read_to_string(&junit).expect("JUnit report written");
    assert!(xml.contains(r#"<testsuites name="outcome-run""#));
    assert!(xml.contains("TestParametrized::test_login[locked]"));
    assert!(json.exists(), "JSON report written to --output");
}

#[test]
fn truncated_stream_is_incomplete() {
    let workspace = TempWorkspace::new();
    let mut messages = passing_suite().messages();
    messages.pop();
    let events = workspace.write_events(&messages);
    let (result, _) = workspace.run(&events, &[]);

    assert_eq!(exit_code(&result), OutcomeExitCode::INCOMPLETE_SESSION);
    let report = workspace.default_report();
    let incomplete: Vec<_> = report
        .cases
        .iter()
        .filter(|case| case.classification == CaseClassification::Incomplete)
        .map(|case| case.id.as_str())
        .collect();
    assert_eq!(incomplete, vec!["TestNavigation::test_logout"]);
}

#[test]
fn out_of_order_phase_is_protocol_error() {
    let workspace = TempWorkspace::new();
    let mut messages = SAUCEDEMO_SUITE.messages();
    let first_phase = messages
        .iter()
        .position(|message| matches!(message, RunnerMessage::Phase(_)))
        .expect("suite has phase events");
    messages.insert(first_phase + 1, messages[first_phase].clone());
    let events = workspace.write_events(&messages);
    let (result, _) = workspace.run(&events, &[]);

    assert!(
        matches!(result, Err(ExpectedError::ProtocolError { .. })),
        "unexpected result: {result:?}"
    );
    assert_eq!(exit_code(&result), OutcomeExitCode::PROTOCOL_ERROR);
}

#[test]
fn malformed_line_is_protocol_error() {
    let workspace = TempWorkspace::new();
    let events = workspace.root().join("events.jsonl");
    std::fs::write(&events, "{\"type\":\"phase\"\n").expect("wrote events");
    let (result, _) = workspace.run(&events, &[]);
    assert!(
        matches!(result, Err(ExpectedError::MessageStreamError { .. })),
        "unexpected result: {result:?}"
    );
    assert_eq!(exit_code(&result), OutcomeExitCode::PROTOCOL_ERROR);
}

#[test]
fn empty_stream_records_no_cases() {
    let workspace = TempWorkspace::new();
    let events = workspace.write_events(&[]);
    let (result, _) = workspace.run(&events, &[]);
    assert_eq!(exit_code(&result), OutcomeExitCode::NO_CASES_RECORDED);
    assert!(workspace.default_report().cases.is_empty());
}

#[test]
fn setup_errors() {
    let workspace = TempWorkspace::new();
    let events = workspace.write_events(&[]);

    let (result, _) = workspace.run(&events, &["--profile", "nightly"]);
    assert!(
        matches!(result, Err(ExpectedError::ProfileNotFound { .. })),
        "unexpected result: {result:?}"
    );
    assert_eq!(exit_code(&result), OutcomeExitCode::SETUP_ERROR);

    let missing = workspace.root().join("missing.jsonl");
    let (result, _) = workspace.run(&missing, &[]);
    assert!(
        matches!(result, Err(ExpectedError::EventsOpenError { .. })),
        "unexpected result: {result:?}"
    );
    assert_eq!(exit_code(&result), OutcomeExitCode::SETUP_ERROR);
}
