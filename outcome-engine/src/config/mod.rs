// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the outcome engine.
//!
//! Configuration is read from `.config/outcome.toml` in the workspace root, layered on top of the
//! defaults in [`OutcomeConfig::DEFAULT_CONFIG`]. Settings are grouped into profiles; see
//! [`OutcomeProfile`].

mod core;
mod elements;
#[cfg(test)]
mod test_helpers;

pub use core::*;
pub use elements::*;
