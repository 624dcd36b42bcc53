// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Information about the "saucedemo" fixture: a browser suite run against a demo storefront.

use crate::models::{AttemptScript, CaseFixture, ExpectedRecord, SuiteFixture};
use outcome_metadata::{CaseClassification, Marker};
use std::{num::NonZeroU32, sync::LazyLock};

pub static SAUCEDEMO_SUITE: LazyLock<SuiteFixture> = LazyLock::new(|| SuiteFixture {
    name: "saucedemo",
    cases: vec![
        // Passing
        CaseFixture::new(
            "TestPassing::test_page_title",
            AttemptScript::Pass,
            ExpectedRecord::PASSED,
        ),
        CaseFixture::new(
            "TestPassing::test_login_form_visible",
            AttemptScript::Pass,
            ExpectedRecord::PASSED,
        ),
        CaseFixture::new(
            "TestPassing::test_login_button_enabled",
            AttemptScript::Pass,
            ExpectedRecord::PASSED,
        ),
        CaseFixture::new(
            "TestPassing::test_successful_login",
            AttemptScript::Pass,
            ExpectedRecord::PASSED,
        ),
        // Failing
        CaseFixture::new(
            "TestFailing::test_wrong_title",
            AttemptScript::Fail {
                kind: "AssertionError",
                message: "Page title expected to be 'Wrong Title'",
            },
            ExpectedRecord::failed("AssertionError"),
        ),
        CaseFixture::new(
            "TestFailing::test_element_not_found",
            AttemptScript::Fail {
                kind: "AssertionError",
                message: "Locator expected to be visible",
            },
            ExpectedRecord::failed("AssertionError"),
        ),
        CaseFixture::new(
            "TestFailing::test_assertion_error",
            AttemptScript::Fail {
                kind: "AssertionError",
                message: "Numbers don't match",
            },
            ExpectedRecord::failed("AssertionError"),
        ),
        // Error kinds raised from the test body
        CaseFixture::new(
            "TestErrorTypes::test_index_error",
            AttemptScript::Fail {
                kind: "IndexError",
                message: "list index out of range",
            },
            ExpectedRecord::failed("IndexError"),
        ),
        CaseFixture::new(
            "TestErrorTypes::test_key_error",
            AttemptScript::Fail {
                kind: "KeyError",
                message: "'missing'",
            },
            ExpectedRecord::failed("KeyError"),
        ),
        CaseFixture::new(
            "TestErrorTypes::test_type_error",
            AttemptScript::Fail {
                kind: "TypeError",
                message: r#"can only concatenate str (not "int") to str"#,
            },
            ExpectedRecord::failed("TypeError"),
        ),
        CaseFixture::new(
            "TestErrorTypes::test_zero_division",
            AttemptScript::Fail {
                kind: "ZeroDivisionError",
                message: "division by zero",
            },
            ExpectedRecord::failed("ZeroDivisionError"),
        ),
        // Skipped
        CaseFixture::new(
            "TestSkipped::test_skip_explicit",
            AttemptScript::Skip,
            ExpectedRecord::SKIPPED,
        )
        .with_marker(Marker::Skip {
            reason: Some("Not implemented".to_owned()),
        }),
        CaseFixture::new(
            "TestSkipped::test_skip_conditional",
            AttemptScript::Skip,
            ExpectedRecord::SKIPPED,
        )
        .with_marker(Marker::SkipIf {
            condition: true,
            reason: Some("Condition true".to_owned()),
        }),
        // Expected failures
        CaseFixture::new(
            "TestXfail::test_xfail_fails",
            AttemptScript::Fail {
                kind: "AssertionError",
                message: "assert False",
            },
            ExpectedRecord {
                error_kind: Some("AssertionError"),
                ..ExpectedRecord::new(CaseClassification::ExpectedFailure)
            },
        )
        .with_marker(Marker::ExpectedFailure {
            reason: Some("Known bug".to_owned()),
            strict: false,
        }),
        CaseFixture::new(
            "TestXfail::test_xfail_passes",
            AttemptScript::Pass,
            ExpectedRecord::new(CaseClassification::UnexpectedPass),
        )
        .with_marker(Marker::ExpectedFailure {
            reason: Some("Should fail".to_owned()),
            strict: false,
        }),
        // Flaky: fails once, then passes
        CaseFixture::new(
            "TestFlaky::test_passes_on_retry",
            AttemptScript::Pass,
            ExpectedRecord::flaky(2),
        )
        .with_marker(Marker::RerunPolicy {
            max_attempts: NonZeroU32::new(3).unwrap_or(NonZeroU32::MIN),
        })
        .with_script(vec![
            AttemptScript::Fail {
                kind: "AssertionError",
                message: "assert 1 >= 2",
            },
            AttemptScript::Pass,
        ]),
        // Parametrized
        CaseFixture::new(
            "TestParametrized::test_login",
            AttemptScript::Pass,
            ExpectedRecord::PASSED,
        )
        .with_param("valid"),
        CaseFixture::new(
            "TestParametrized::test_login",
            AttemptScript::Pass,
            ExpectedRecord::PASSED,
        )
        .with_param("locked"),
        CaseFixture::new(
            "TestParametrized::test_login",
            AttemptScript::Pass,
            ExpectedRecord::PASSED,
        )
        .with_param("invalid"),
        // Screenshots
        CaseFixture::new(
            "TestScreenshots::test_capture_screenshot",
            AttemptScript::Pass,
            ExpectedRecord::PASSED,
        )
        .with_artifact(1, "screenshot", "test-results/login.png"),
        // Navigation
        CaseFixture::new(
            "TestNavigation::test_login_and_cart",
            AttemptScript::Pass,
            ExpectedRecord::PASSED,
        ),
        CaseFixture::new(
            "TestNavigation::test_logout",
            AttemptScript::Pass,
            ExpectedRecord::PASSED,
        ),
    ],
});
