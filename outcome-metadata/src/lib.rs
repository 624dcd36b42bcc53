// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Machine-readable formats for the outcome engine.
//!
//! Test runners report each execution phase of each attempt as a
//! [`RunnerMessage`], serialized as one JSON object per line. The engine
//! reconciles those into a [`SessionReportSummary`], which is what ends up on
//! disk.
//!
//! The types here are plain data: they carry no classification logic. See the
//! `outcome-engine` crate for that.

mod errors;
mod exit_codes;
mod messages;
mod report;

pub use errors::*;
pub use exit_codes::*;
pub use messages::*;
pub use report::*;
