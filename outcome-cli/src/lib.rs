// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `outcome-report` command: reconciles a test runner's per-phase events into a session
//! report.
//!
//! Runners write one JSON message per line (see `outcome-metadata` for the format). The report is
//! written as JSON, and optionally as JUnit XML. Exit codes are documented in
//! `outcome_metadata::OutcomeExitCode`.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
#[cfg(test)]
mod tests_integration;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
