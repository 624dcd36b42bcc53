// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture data shared by outcome-engine and outcome-report tests.

pub mod models;
pub mod saucedemo;
