// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, eyre};
use fixture_data::saucedemo::SAUCEDEMO_SUITE;
use indoc::indoc;
use outcome_engine::{
    config::OutcomeConfig,
    reporter::{JunitReporter, ReportDisplayer},
    session::{Session, SessionSettings},
};
use outcome_metadata::{CaseClassification, SessionReportSummary};
use pretty_assertions::assert_eq;
use quick_junit::{NonSuccessKind, TestCaseStatus};

#[test]
fn json_report_round_trips_through_disk() -> Result<()> {
    test_init();

    let session = Session::new(SessionSettings::default());
    run_suite(&session, &SAUCEDEMO_SUITE)?;
    let report = session.finalize()?;

    let dir = camino_tempfile::tempdir()?;
    let path = dir.path().join("outcome.json");
    report.write_json(std::fs::File::create(&path)?)?;

    let parsed = SessionReportSummary::parse_json(std::fs::read_to_string(&path)?)?;
    assert_eq!(parsed.cases.len(), SAUCEDEMO_SUITE.cases.len());
    assert_eq!(parsed.summary.counts, *report.counts());
    assert_eq!(parsed.summary.flaky, 1);
    assert_eq!(
        parsed.summary.total_attempts,
        SAUCEDEMO_SUITE.scripted_attempts()
    );

    for case in &SAUCEDEMO_SUITE.cases {
        let record = parsed
            .case(&case.id())
            .ok_or_else(|| eyre!("{} missing from report", case.id()))?;
        assert_eq!(record.classification, case.expected.classification);
        assert_eq!(record.attempts_used, case.expected.attempts_used);
        assert_eq!(record.flaky, case.expected.flaky);
        assert_eq!(
            record.error.as_ref().map(|error| error.kind.as_str()),
            case.expected.error_kind,
        );
    }

    let zero_division = parsed
        .case("TestErrorTypes::test_zero_division")
        .and_then(|record| record.error.as_ref())
        .ok_or_else(|| eyre!("zero division error missing"))?;
    assert_eq!(zero_division.message, "division by zero");
    Ok(())
}

#[test]
fn junit_report_from_profile() -> Result<()> {
    test_init();

    let workspace = camino_tempfile::tempdir()?;
    let config_file = workspace.path().join("outcome.toml");
    std::fs::write(
        &config_file,
        indoc! {r#"
            [profile.ci]
            default-max-attempts = 2

            [profile.ci.junit]
            path = "reports/junit.xml"
            report-name = "saucedemo"
        "#},
    )?;
    let config = OutcomeConfig::from_sources(workspace.path(), Some(&config_file))?;
    let profile = config.profile("ci")?;
    let junit = profile
        .junit()
        .ok_or_else(|| eyre!("ci profile has a JUnit path"))?;

    let session = Session::new(profile.session_settings());
    run_suite(&session, &SAUCEDEMO_SUITE)?;
    let report = session.finalize()?;

    let path = junit.path(profile.store_dir());
    assert_eq!(
        path,
        workspace.path().join("target/outcome/ci/reports/junit.xml")
    );
    let reporter = JunitReporter::new(junit.report_name());
    reporter.write_to_path(&report, &path)?;
    let xml = std::fs::read_to_string(&path)?;
    assert!(xml.contains(r#"<testsuites name="saucedemo""#));

    let built = reporter.build(&report);
    let test_cases: usize = built
        .test_suites
        .iter()
        .map(|suite| suite.test_cases.len())
        .sum();
    assert_eq!(test_cases, report.records().len(), "one testcase per record");

    // The three parametrized entries share a suite.
    let login = built
        .test_suites
        .iter()
        .find(|suite| suite.name.as_str() == "TestParametrized::test_login")
        .ok_or_else(|| eyre!("parametrized suite missing"))?;
    assert_eq!(login.test_cases.len(), 3);

    // With two attempts, failing cases carry one rerun each.
    let wrong_title = built
        .test_suites
        .iter()
        .find(|suite| suite.name.as_str() == "TestFailing::test_wrong_title")
        .ok_or_else(|| eyre!("failing suite missing"))?;
    assert!(matches!(
        wrong_title.test_cases[0].status,
        TestCaseStatus::NonSuccess {
            kind: NonSuccessKind::Failure,
            ..
        }
    ));
    assert_eq!(
        xml.matches("<rerunFailure").count(),
        report.failing_count(),
        "one rerun per failing case in:\n{xml}"
    );
    assert_eq!(xml.matches("<flakyFailure").count(), 1);
    Ok(())
}

#[test]
fn human_summary() -> Result<()> {
    test_init();

    let session = Session::new(SessionSettings::default());
    run_suite(&session, &SAUCEDEMO_SUITE)?;
    let report = session.finalize()?;

    let mut buf = Vec::new();
    ReportDisplayer::new().write_summary(&report, &mut buf)?;
    let output = String::from_utf8(buf)?;

    assert!(
        output.contains(
            "22 cases (23 attempts): 11 passed (1 flaky), 7 failed, \
             1 unexpectedly passed, 1 expected failures, 2 skipped"
        ),
        "summary line in:\n{output}"
    );
    // One status line and one error line per failing case, after the summary line.
    assert_eq!(output.lines().count(), 2 + 2 * report.failing_count());
    assert!(output.contains("ZeroDivisionError: division by zero"));
    assert_eq!(
        report.counts().get(CaseClassification::Failed),
        report.failing_count()
    );
    Ok(())
}
