// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logical-case identity.
//!
//! A logical case is one conceptually distinct test, independent of how many attempts it took.
//! Non-parametrized tests are identified by their base name; each entry of a parametrized test
//! is identified as `base[param]`.

use crate::{
    errors::{DuplicateParameterId, UnknownParameterId},
    helpers::ShardedMap,
};
use indexmap::IndexMap;
use outcome_metadata::{CaseRef, ParameterId};
use smol_str::{SmolStr, format_smolstr};
use std::fmt;
use tracing::debug;

/// The id of a logical case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseId {
    id: SmolStr,
    base_len: usize,
}

impl CaseId {
    /// Builds an id from a base name and an optional parameter id.
    ///
    /// This does not validate the parameter id; use [`CaseIdentityResolver::resolve`] for that.
    pub fn new(base: &str, param: Option<&ParameterId>) -> Self {
        let id = match param {
            Some(param) => format_smolstr!("{base}[{param}]"),
            None => SmolStr::new(base),
        };
        Self {
            id,
            base_len: base.len(),
        }
    }

    /// Returns the id as a string.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Returns the base test name.
    pub fn base(&self) -> &str {
        &self.id[..self.base_len]
    }

    /// Returns the parameter id portion, if this is a parametrized case.
    pub fn param(&self) -> Option<&str> {
        let rest = &self.id[self.base_len..];
        rest.strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Resolves case references into logical-case ids, validating parameter ids against the
/// parameter sets reported by the parametrization layer.
#[derive(Debug, Default)]
pub struct CaseIdentityResolver {
    // Keyed by the rendered id, which is what the case id is built from.
    parameter_sets: ShardedMap<SmolStr, IndexMap<SmolStr, ParameterId>>,
}

impl CaseIdentityResolver {
    /// Creates a new resolver with no registered parameter sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the ordered parameter set for `base`.
    ///
    /// Registering the exact same set again is a no-op. Otherwise the ids extend the existing set,
    /// and any id already present is a [`DuplicateParameterId`]. Ids are compared by how they
    /// render, so the positional id `0` and the explicit id `"0"` collide. On error, nothing is
    /// registered.
    pub fn register_parameters(
        &self,
        base: impl Into<SmolStr>,
        ids: impl IntoIterator<Item = ParameterId>,
    ) -> Result<(), DuplicateParameterId> {
        let base = base.into();
        let ids: Vec<_> = ids.into_iter().collect();

        self.parameter_sets.with_shard(&base, |shard| {
            if let Some(existing) = shard.get(&base) {
                if existing.values().eq(ids.iter()) {
                    return Ok(());
                }
            }

            let mut candidate = shard.get(&base).cloned().unwrap_or_default();
            for id in ids {
                let rendered = format_smolstr!("{id}");
                if candidate.contains_key(&rendered) {
                    return Err(DuplicateParameterId::new(base.clone(), id));
                }
                candidate.insert(rendered, id);
            }

            debug!(%base, count = candidate.len(), "registered parameter set");
            shard.insert(base.clone(), candidate);
            Ok(())
        })
    }

    /// Resolves a base name and optional parameter id into a [`CaseId`].
    ///
    /// If a parameter set was registered for `base`, `param` must be part of it. Parameter ids
    /// for bases without a registered set are accepted as-is.
    pub fn resolve(
        &self,
        base: &str,
        param: Option<&ParameterId>,
    ) -> Result<CaseId, UnknownParameterId> {
        if let Some(param) = param {
            let key = SmolStr::new(base);
            self.parameter_sets.with_value(&key, |set| match set {
                Some(set) if !set.contains_key(&format_smolstr!("{param}")) => {
                    Err(UnknownParameterId::new(
                        key.clone(),
                        param.clone(),
                        set.values().cloned().collect(),
                    ))
                }
                _ => Ok(()),
            })?;
        }
        Ok(CaseId::new(base, param))
    }

    /// Resolves a [`CaseRef`] sent by the runner.
    pub fn resolve_ref(&self, case: &CaseRef) -> Result<CaseId, UnknownParameterId> {
        self.resolve(&case.base, case.param.as_ref())
    }

    /// Returns the case ids for every entry of the parameter set registered for `base`, in
    /// declaration order.
    pub fn parametrized_cases(&self, base: &str) -> Vec<CaseId> {
        let key = SmolStr::new(base);
        self.parameter_sets.with_value(&key, |set| {
            set.map(|set| set.values().map(|id| CaseId::new(base, Some(id))).collect())
                .unwrap_or_default()
        })
    }
}
