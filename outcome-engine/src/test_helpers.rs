// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proptest strategies for wire types defined in `outcome-metadata`.

use outcome_metadata::{Marker, PhaseStatus};
use proptest::{collection::vec, option, prelude::*};
use std::num::NonZeroU32;

/// Strategy for generating arbitrary phase statuses.
pub(crate) fn arb_status() -> impl Strategy<Value = PhaseStatus> {
    prop_oneof![
        Just(PhaseStatus::Ok),
        Just(PhaseStatus::Failed),
        Just(PhaseStatus::Skipped),
    ]
}

fn arb_reason() -> impl Strategy<Value = Option<String>> {
    option::of("[a-zA-Z ]{0,16}")
}

/// Strategy for generating a single marker.
pub(crate) fn arb_marker() -> impl Strategy<Value = Marker> {
    prop_oneof![
        arb_reason().prop_map(|reason| Marker::Skip { reason }),
        (any::<bool>(), arb_reason())
            .prop_map(|(condition, reason)| Marker::SkipIf { condition, reason }),
        (arb_reason(), any::<bool>())
            .prop_map(|(reason, strict)| Marker::ExpectedFailure { reason, strict }),
        (1..=5u32).prop_filter_map("non-zero", |n| NonZeroU32::new(n)
            .map(|max_attempts| Marker::RerunPolicy { max_attempts })),
    ]
}

/// Strategy for generating a list of markers, including the empty list.
pub(crate) fn arb_markers() -> impl Strategy<Value = Vec<Marker>> {
    vec(arb_marker(), 0..4)
}
