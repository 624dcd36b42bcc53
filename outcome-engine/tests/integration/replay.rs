// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure, eyre};
use fixture_data::{models::ATTEMPT_DURATION, saucedemo::SAUCEDEMO_SUITE};
use indoc::indoc;
use outcome_engine::{
    classify::Classification,
    reporter::SessionReport,
    session::{Session, SessionSettings},
};
use outcome_metadata::{CaseClassification, RunnerMessage};
use pretty_assertions::assert_eq;
use std::{collections::BTreeMap, thread};

fn sequential_report() -> Result<SessionReport> {
    let session = Session::new(SessionSettings::default());
    run_suite(&session, &SAUCEDEMO_SUITE)?;
    Ok(session.finalize()?)
}

#[test]
fn replay_matches_fixture() -> Result<()> {
    test_init();

    let session = Session::new(SessionSettings::default());
    let records = run_suite(&session, &SAUCEDEMO_SUITE)?;
    for (record, case) in records.iter().zip(&SAUCEDEMO_SUITE.cases) {
        assert_matches_fixture(record, case);
    }

    let report = session.finalize()?;
    assert_eq!(report.records().len(), SAUCEDEMO_SUITE.cases.len());
    assert_eq!(report.total_attempts(), SAUCEDEMO_SUITE.scripted_attempts());

    let counts = report.counts();
    assert_eq!(counts.get(CaseClassification::Passed), 11);
    assert_eq!(counts.get(CaseClassification::Failed), 7);
    assert_eq!(counts.get(CaseClassification::Skipped), 2);
    assert_eq!(counts.get(CaseClassification::ExpectedFailure), 1);
    assert_eq!(counts.get(CaseClassification::UnexpectedPass), 1);
    assert_eq!(counts.total(), report.records().len());
    assert_eq!(report.flaky_count(), 1);
    assert_eq!(report.failing_count(), 7);
    assert!(!report.is_success());

    // Records are in first-seen order.
    let ids: Vec<_> = report
        .records()
        .iter()
        .map(|record| record.case_id.to_string())
        .collect();
    let expected_ids: Vec<_> = SAUCEDEMO_SUITE.cases.iter().map(|case| case.id()).collect();
    assert_eq!(ids, expected_ids);

    Ok(())
}

#[test]
fn flaky_case_keeps_prior_attempt() -> Result<()> {
    test_init();

    let report = sequential_report()?;
    let flaky = report
        .record("TestFlaky::test_passes_on_retry")
        .expect("flaky case is recorded");
    assert_eq!(flaky.classification, Classification::Passed);
    assert_eq!(flaky.prior_attempts.len(), 1);
    assert_eq!(flaky.prior_attempts[0].classification, Classification::Failed);
    assert_eq!(
        flaky.prior_attempts[0]
            .error
            .as_ref()
            .map(|error| error.message.as_str()),
        Some("assert 1 >= 2")
    );
    assert_eq!(flaky.duration, ATTEMPT_DURATION * 2);
    assert_eq!(flaky.error, None);

    Ok(())
}

#[test]
fn parametrized_entries_are_independent() -> Result<()> {
    test_init();

    let report = sequential_report()?;
    for param in ["valid", "locked", "invalid"] {
        let id = format!("TestParametrized::test_login[{param}]");
        let record = report.record(&id).expect("parametrized entry is recorded");
        assert_eq!(record.case_id.base(), "TestParametrized::test_login");
        assert_eq!(record.case_id.param(), Some(param));
        assert_eq!(record.attempts_used, 1);
    }
    Ok(())
}

#[test]
fn screenshot_follows_deciding_attempt() -> Result<()> {
    test_init();

    let report = sequential_report()?;
    let record = report
        .record("TestScreenshots::test_capture_screenshot")
        .expect("screenshot case is recorded");
    let paths: Vec<_> = record
        .artifacts
        .iter()
        .map(|artifact| artifact.path.as_str())
        .collect();
    assert_eq!(paths, vec!["test-results/login.png"]);
    ensure!(
        report
            .records()
            .iter()
            .filter(|record| !record.artifacts.is_empty())
            .count()
            == 1,
        "only the screenshot case has artifacts"
    );
    Ok(())
}

#[test]
fn message_stream_matches_driven_run() -> Result<()> {
    test_init();

    let session = Session::new(SessionSettings::default());
    for message in SAUCEDEMO_SUITE.messages() {
        session.handle_message(&message)?;
    }
    assert_eq!(session.finalize()?, sequential_report()?);
    Ok(())
}

#[test]
fn interleaved_cases_match_sequential() -> Result<()> {
    test_init();

    let session = Session::new(SessionSettings::default());
    for message in SAUCEDEMO_SUITE.parameter_messages() {
        session.handle_message(&message)?;
    }

    // Round-robin: one message from each case at a time.
    let mut streams: Vec<_> = SAUCEDEMO_SUITE
        .cases
        .iter()
        .map(|case| case.scripted_messages().into_iter())
        .collect();
    loop {
        let mut sent = false;
        for stream in &mut streams {
            if let Some(message) = stream.next() {
                session.handle_message(&message)?;
                sent = true;
            }
        }
        if !sent {
            break;
        }
    }

    assert_eq!(session.finalize()?, sequential_report()?);
    Ok(())
}

#[test]
fn concurrent_workers_match_sequential() -> Result<()> {
    test_init();

    let session = Session::new(SessionSettings::default());
    for message in SAUCEDEMO_SUITE.parameter_messages() {
        session.handle_message(&message)?;
    }
    let session_ref = &session;
    thread::scope(|scope| -> Result<()> {
        let handles: Vec<_> = SAUCEDEMO_SUITE
            .cases
            .iter()
            .map(|case| scope.spawn(move || run_case(session_ref, case)))
            .collect();
        for handle in handles {
            handle
                .join()
                .map_err(|_| eyre!("worker panicked"))??;
        }
        Ok(())
    })?;

    // First-seen order depends on scheduling, so compare by id.
    let by_id = |report: &SessionReport| -> BTreeMap<String, _> {
        report
            .records()
            .iter()
            .map(|record| (record.case_id.to_string(), record.clone()))
            .collect()
    };
    let concurrent = session.finalize()?;
    let sequential = sequential_report()?;
    assert_eq!(by_id(&concurrent), by_id(&sequential));
    assert_eq!(concurrent.counts(), sequential.counts());
    Ok(())
}

#[test]
fn profile_retries_failing_cases() -> Result<()> {
    test_init();

    let settings = settings_from_config(indoc! {r#"
        [profile.default]
        default-max-attempts = 2
    "#})?;
    let session = Session::new(settings);
    run_suite(&session, &SAUCEDEMO_SUITE)?;
    let report = session.finalize()?;

    for record in report.failing_records() {
        assert_eq!(record.classification, Classification::Failed);
        assert_eq!(record.attempts_used, 2, "{} retried once", record.case_id);
        assert_eq!(record.prior_attempts.len(), 1);
        assert!(!record.flaky);
    }
    // The rerun marker takes precedence over the profile default.
    let flaky = report
        .record("TestFlaky::test_passes_on_retry")
        .expect("flaky case is recorded");
    assert_eq!(flaky.attempts_used, 2);

    // Skipped and expected-failure cases are never retried.
    for id in [
        "TestSkipped::test_skip_explicit",
        "TestXfail::test_xfail_fails",
    ] {
        let record = report.record(id).expect("case is recorded");
        assert_eq!(record.attempts_used, 1, "{id}");
    }

    assert_eq!(
        report.total_attempts(),
        SAUCEDEMO_SUITE.scripted_attempts() + report.failing_count()
    );
    Ok(())
}

#[test]
fn profile_policies() -> Result<()> {
    test_init();

    let settings = settings_from_config(indoc! {r#"
        [profile.default]
        unexpected-pass = "failing"
        duration = "deciding-attempt"
    "#})?;
    let session = Session::new(settings);
    run_suite(&session, &SAUCEDEMO_SUITE)?;
    let report = session.finalize()?;

    let xpass = report
        .record("TestXfail::test_xfail_passes")
        .expect("xpass case is recorded");
    assert_eq!(
        xpass.classification,
        Classification::UnexpectedPass { strict: false }
    );
    assert!(!xpass.passing);
    assert_eq!(report.failing_count(), 8);

    let flaky = report
        .record("TestFlaky::test_passes_on_retry")
        .expect("flaky case is recorded");
    assert_eq!(flaky.duration, ATTEMPT_DURATION);
    Ok(())
}

#[test]
fn truncated_stream_is_incomplete() -> Result<()> {
    test_init();

    let mut messages = SAUCEDEMO_SUITE.messages();
    let last = messages.pop();
    assert!(matches!(last, Some(RunnerMessage::Phase(_))));

    let session = Session::new(SessionSettings::default());
    for message in &messages {
        session.handle_message(message)?;
    }

    let in_flight: Vec<_> = session
        .in_flight()
        .into_iter()
        .map(|(case_id, attempt)| (case_id.to_string(), attempt))
        .collect();
    assert_eq!(in_flight, vec![("TestNavigation::test_logout".to_owned(), 1)]);

    let error = session
        .finalize()
        .expect_err("the last case never finished");
    let incomplete: Vec<_> = error
        .incomplete_cases()
        .iter()
        .map(|case_id| case_id.as_str())
        .collect();
    assert_eq!(incomplete, vec!["TestNavigation::test_logout"]);

    let report = error.report();
    assert_eq!(report.records().len(), SAUCEDEMO_SUITE.cases.len());
    assert!(report.has_incomplete());
    let record = report
        .record("TestNavigation::test_logout")
        .expect("incomplete case is still reported");
    assert_eq!(record.classification, Classification::Incomplete);
    assert_eq!(record.attempts_used, 0);

    // Finalizing again produces the same report.
    let again = session
        .finalize()
        .expect_err("still incomplete");
    assert_eq!(again.report(), report);
    Ok(())
}
