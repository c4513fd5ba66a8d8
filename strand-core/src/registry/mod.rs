/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The process-wide descriptor registry.
//!
//! Data-type modules declare their structs and properties once at startup through
//! [`RegistryBuilder`]; [`RegistryBuilder::build`] validates everything, generates the
//! trivial accessors, sorts deterministically, and freezes the graph into an immutable
//! [`Registry`] shared behind `Arc` for the rest of the process.

use std::collections::HashMap;
use std::sync::Arc;

use crate::meta::layout::Layout;
use crate::meta::{PropertyDef, StructDef, StructName};
use crate::strand_error;

mod builder;
mod generate;

pub use builder::{PropertyBuilder, PropertyType, RegistryBuilder, StructBuilder};

/// Immutable, process-wide graph of struct and property descriptors.
#[derive(Debug)]
pub struct Registry {
    pub(crate) structs: Vec<Arc<StructDef>>,
    pub(crate) index_by_name: HashMap<StructName, usize>,
    pub(crate) layouts: HashMap<StructName, Arc<Layout>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Looks a struct up by its string identifier.
    ///
    /// A miss is a schema typo on the caller's side: it is logged and `None` is returned;
    /// callers must treat the sentinel as "degrade to empty", not crash.
    pub fn find_struct(&self, identifier: &str) -> Option<&Arc<StructDef>> {
        let found = StructName::find(identifier).and_then(|name| self.struct_def(name));
        if found.is_none() {
            strand_error!("no registered struct `{identifier}`");
        }
        found
    }

    pub fn struct_def(&self, name: StructName) -> Option<&Arc<StructDef>> {
        self.index_by_name.get(&name).map(|&i| &self.structs[i])
    }

    /// Property lookup by identifier, struct-local first, then up the base chain
    /// (intentional shadowing resolves to the most-derived definition).
    pub fn find_property(&self, ty: StructName, identifier: &str) -> Option<Arc<PropertyDef>> {
        let found = self.lookup_property(ty, identifier);
        if found.is_none() {
            strand_error!("struct `{ty}` has no property `{identifier}`");
        }
        found
    }

    /// Same lookup without the diagnostic, for callers to whom a miss is a normal
    /// outcome (path resolution).
    pub(crate) fn lookup_property(&self, ty: StructName, identifier: &str) -> Option<Arc<PropertyDef>> {
        let mut current = Some(ty);
        while let Some(name) = current {
            let def = self.struct_def(name)?;
            if let Some(prop) = def.local_property(identifier) {
                return Some(Arc::clone(prop));
            }
            current = def.base;
        }
        None
    }

    /// Whether `ty` is `base` or inherits from it.
    pub fn is_a(&self, ty: StructName, base: StructName) -> bool {
        let mut current = Some(ty);
        while let Some(name) = current {
            if name == base {
                return true;
            }
            current = self.struct_def(name).and_then(|def| def.base);
        }
        false
    }

    /// All structs, sorted by identifier (the build-time ordering pass guarantees this).
    pub fn structs(&self) -> impl Iterator<Item = &Arc<StructDef>> {
        self.structs.iter()
    }

    /// Properties of `ty` in display order: base chain first, shadowed entries replaced
    /// in place by the most-derived definition.
    pub fn properties_of(&self, ty: StructName) -> Vec<Arc<PropertyDef>> {
        let mut chain = Vec::new();
        let mut current = Some(ty);
        while let Some(name) = current {
            let Some(def) = self.struct_def(name) else { break };
            chain.push(Arc::clone(def));
            current = def.base;
        }

        let mut out: Vec<Arc<PropertyDef>> = Vec::new();
        let mut index_of: HashMap<String, usize> = HashMap::new();
        for def in chain.iter().rev() {
            for prop in &def.properties {
                match index_of.get(prop.identifier.as_str()) {
                    Some(&i) => out[i] = Arc::clone(prop),
                    None => {
                        out.push(Arc::clone(prop));
                        index_of.insert(prop.identifier.clone(), out.len() - 1);
                    }
                }
            }
        }
        out
    }

    /// The designated name property of `ty`, searching up the base chain.
    pub fn name_property_of(&self, ty: StructName) -> Option<Arc<PropertyDef>> {
        let mut current = Some(ty);
        while let Some(name) = current {
            let def = self.struct_def(name)?;
            if let Some(designated) = &def.name_property {
                return self.find_property(ty, designated);
            }
            current = def.base;
        }
        None
    }

    pub fn layout(&self, name: StructName) -> Option<&Arc<Layout>> {
        self.layouts.get(&name)
    }

    /// The native layout backing `ty`'s compiled fields, if any.
    pub fn layout_of(&self, ty: StructName) -> Option<&Arc<Layout>> {
        let def = self.struct_def(ty)?;
        self.layout(def.layout?)
    }
}
