// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Turns the per-phase events of test attempts into final, retry-aware outcomes.
//!
//! A test runner reports each execution phase (setup, call, teardown) of each attempt as it
//! completes. The [`session::Session`] buffers those phases per case, classifies complete
//! attempts, decides whether another attempt is expected, and appends exactly one final record
//! per logical case to a [`reporter::SessionReport`].
//!
//! Artifacts such as screenshots are linked to the attempt that produced them, and follow the
//! deciding attempt into the final record.

pub mod attachments;
pub mod attempt;
pub mod classify;
pub mod collector;
pub mod config;
pub mod errors;
mod helpers;
pub mod identity;
pub mod reconciler;
pub mod reporter;
pub mod session;
#[cfg(test)]
mod test_helpers;
