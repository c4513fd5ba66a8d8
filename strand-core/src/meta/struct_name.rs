/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock};

// First element (index 0) is always the empty name, which is used for "no struct".
struct InternTable {
    entries: Vec<Box<str>>,
    index_by_str: HashMap<Box<str>, u16>,
}

impl InternTable {
    fn new() -> Self {
        Self {
            entries: vec!["".into()],
            index_by_str: HashMap::new(),
        }
    }
}

fn table() -> MutexGuard<'static, InternTable> {
    static TABLE: OnceLock<Mutex<InternTable>> = OnceLock::new();

    TABLE
        .get_or_init(|| Mutex::new(InternTable::new()))
        .lock()
        .expect("struct name intern table poisoned")
}

/// Interned identifier of a registered struct type.
///
/// Cheap `Copy` handle into a process-wide table; comparison and hashing work on the index.
/// The table lives for the whole process and is torn down once via [`cleanup`][Self::cleanup],
/// matching the build-once/read-only lifecycle of the descriptor graph.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructName {
    index: u16,
}

impl StructName {
    /// Interns `identifier`, returning the existing handle if it was seen before.
    pub fn new(identifier: &str) -> Self {
        let mut table = table();
        if let Some(&index) = table.index_by_str.get(identifier) {
            return Self { index };
        }

        let index = u16::try_from(table.entries.len()).expect("struct name table exhausted");
        table.entries.push(identifier.into());
        table.index_by_str.insert(identifier.into(), index);
        Self { index }
    }

    /// Looks up an already-interned identifier without interning it.
    ///
    /// Runtime lookups by string go through this, so schema typos do not grow the table.
    pub fn find(identifier: &str) -> Option<Self> {
        let table = table();
        table.index_by_str.get(identifier).map(|&index| Self { index })
    }

    /// The "no struct" sentinel (empty identifier).
    pub fn none() -> Self {
        Self { index: 0 }
    }

    pub fn is_none(self) -> bool {
        self.index == 0
    }

    /// Owned copy of the identifier string.
    pub fn to_owned_str(self) -> String {
        table().entries[self.index as usize].to_string()
    }

    pub fn eq_str(self, identifier: &str) -> bool {
        &*table().entries[self.index as usize] == identifier
    }

    /// Clears the intern table.
    ///
    /// Part of process shutdown; no `StructName` handle may be used afterwards.
    pub fn cleanup() {
        let mut table = table();
        *table = InternTable::new();
    }
}

impl fmt::Display for StructName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&table().entries[self.index as usize])
    }
}

impl fmt::Debug for StructName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StructName({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedups() {
        let a = StructName::new("MeshFilter");
        let b = StructName::new("MeshFilter");
        assert_eq!(a, b);
        assert!(a.eq_str("MeshFilter"));
        assert_eq!(a.to_owned_str(), "MeshFilter");
    }

    #[test]
    fn find_does_not_intern() {
        assert!(StructName::find("NeverInternedAnywhere").is_none());
        let n = StructName::new("InternedOnce");
        assert_eq!(StructName::find("InternedOnce"), Some(n));
    }

    #[test]
    fn none_is_empty() {
        assert!(StructName::none().is_none());
        assert_eq!(StructName::none().to_owned_str(), "");
    }
}
