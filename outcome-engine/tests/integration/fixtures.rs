// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use color_eyre::eyre::{Result, bail, eyre};
use fixture_data::models::{CaseFixture, SuiteFixture};
use outcome_engine::{
    config::OutcomeConfig,
    reconciler::FinalRecord,
    session::{PhaseProgress, Session, SessionSettings},
};
use std::sync::Once;

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Installing twice fails; tests share a process.
        let _ = color_eyre::install();
    });
}

/// Writes `contents` to the config file of a fresh temporary workspace and loads its default
/// profile's session settings.
pub(crate) fn settings_from_config(contents: &str) -> Result<SessionSettings> {
    let workspace = camino_tempfile::tempdir()?;
    let config_path = workspace.path().join(OutcomeConfig::CONFIG_PATH);
    let parent = config_path
        .parent()
        .ok_or_else(|| eyre!("config path has no parent"))?;
    std::fs::create_dir_all(parent)?;
    std::fs::write(&config_path, contents)?;

    let config = OutcomeConfig::from_sources(workspace.path(), None)?;
    let profile = config.profile(OutcomeConfig::DEFAULT_PROFILE)?;
    Ok(profile.session_settings())
}

/// Drives `case` the way a runner would: attempt after attempt, until the session decides it.
pub(crate) fn run_case(session: &Session, case: &CaseFixture) -> Result<FinalRecord> {
    let mut attempt = 1;
    loop {
        let mut last = None;
        for message in case.attempt_messages(attempt) {
            if let Some(progress) = session.handle_message(&message)? {
                last = Some(progress);
            }
        }
        match last {
            Some(PhaseProgress::Finalized(record)) => return Ok(record),
            Some(PhaseProgress::RetryExpected { next_attempt, .. }) => {
                assert_eq!(next_attempt, attempt + 1, "retries are contiguous");
                attempt = next_attempt;
            }
            other => bail!("attempt {attempt} of {} ended with {other:?}", case.id()),
        }
    }
}

/// Registers the suite's parameter sets, then drives every case in order.
pub(crate) fn run_suite(session: &Session, suite: &SuiteFixture) -> Result<Vec<FinalRecord>> {
    for message in suite.parameter_messages() {
        session.handle_message(&message)?;
    }
    suite
        .cases
        .iter()
        .map(|case| run_case(session, case))
        .collect()
}

/// Checks a record against the expectations in the fixture.
pub(crate) fn assert_matches_fixture(record: &FinalRecord, case: &CaseFixture) {
    let expected = &case.expected;
    let id = case.id();
    assert_eq!(record.case_id.as_str(), id);
    assert_eq!(
        record.classification.summary(),
        expected.classification,
        "{id}: classification"
    );
    assert_eq!(
        record.attempts_used, expected.attempts_used,
        "{id}: attempts used"
    );
    assert_eq!(record.flaky, expected.flaky, "{id}: flaky");
    assert_eq!(
        record.error.as_ref().map(|error| error.kind.as_str()),
        expected.error_kind,
        "{id}: error kind"
    );
}
