// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report the results of a session in human and machine-readable formats.
//!
//! The main type here is [`SessionReport`], produced by a [`ReportAggregator`]. It serializes to
//! JSON directly, and to JUnit XML through [`JunitReporter`].

mod aggregator;
mod displayer;
mod junit;

pub use aggregator::*;
pub use displayer::*;
pub use junit::*;
