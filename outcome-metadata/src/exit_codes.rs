// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `outcome-report` failures.
///
/// `outcome-report` may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum OutcomeExitCode {}

impl OutcomeExitCode {
    /// The session was reconciled and every case ended in a passing classification.
    pub const OK: i32 = 0;

    /// No runner messages were received, but no other errors occurred.
    pub const NO_CASES_RECORDED: i32 = 4;

    /// One or more cases ended in a failing classification.
    pub const CASES_FAILED: i32 = 100;

    /// The session ended with cases that never reached a final state.
    ///
    /// The report is still written, with those cases marked `incomplete`.
    pub const INCOMPLETE_SESSION: i32 = 106;

    /// The runner message stream violated the event protocol: phases out of order, attempts out
    /// of sequence, or duplicate parameter ids.
    pub const PROTOCOL_ERROR: i32 = 97;

    /// A user issue happened while setting up an `outcome-report` invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing data to stdout, stderr or a report file produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
