/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::BTreeMap;

use crate::builtin::Value;

/// Per-instance sparse map from property identifier to dynamically-typed [`Value`].
///
/// Attached lazily to an instance on the first dynamic write and owned by that instance;
/// the reflection layer never frees it behind the owner's back. Iteration order is the
/// key order, so introspection output is deterministic.
#[derive(Clone, Default, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdProperties {
    entries: BTreeMap<String, Value>,
}

impl IdProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<&Value> {
        self.entries.get(identifier)
    }

    /// Inserts or replaces; returns the previous value if any.
    pub fn insert(&mut self, identifier: &str, value: Value) -> Option<Value> {
        self.entries.insert(identifier.to_string(), value)
    }

    pub fn remove(&mut self, identifier: &str) -> Option<Value> {
        self.entries.remove(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
