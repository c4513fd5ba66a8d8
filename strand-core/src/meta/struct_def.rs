/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::Arc;

use bitflags::bitflags;

use crate::meta::{PropertyDef, StructName};
use crate::obj::{Ptr, Store};

/// Runtime subtype narrowing: returns the true type of an instance nominally of this type.
///
/// Applied repeatedly until a fixed point; must converge within [`MAX_REFINE`] steps.
pub type RefineFn = fn(&Store, &Ptr) -> StructName;

/// Produces the path fragment addressing an instance from its owning ID block.
pub type PathFn = fn(&Store, &Ptr) -> Option<String>;

/// Bound on refine iteration; exceeding it is an embedding logic error, reported and
/// stopped rather than silently tolerated.
pub const MAX_REFINE: u32 = 8;

bitflags! {
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub struct StructFlags: u32 {
        /// Instances are identity (ID) blocks: named, reference-counted, library-linkable.
        const IS_ID = 1 << 0;
        /// Instances never carry dynamic overrides.
        const NO_ID_PROPERTIES = 1 << 1;
    }
}

/// Static descriptor of one struct type: a node in the type graph.
///
/// Immutable and globally shared once the registry is built.
#[derive(Clone, Debug)]
pub struct StructDef {
    pub identifier: StructName,
    /// Human-readable display name.
    pub name: String,
    pub description: String,
    /// Single-inheritance base; property lookup walks this chain.
    pub base: Option<StructName>,
    /// Native layout backing compiled fields, if any. Refined subtypes share the base's.
    pub layout: Option<StructName>,
    pub flags: StructFlags,
    /// Identifier of the property producing a human label for instances.
    pub name_property: Option<String>,
    /// Ordered for iteration/display; lookup is by identifier.
    pub properties: Vec<Arc<PropertyDef>>,
    pub refine: Option<RefineFn>,
    pub path: Option<PathFn>,
}

impl StructDef {
    pub fn is_id(&self) -> bool {
        self.flags.contains(StructFlags::IS_ID)
    }

    /// Struct-local property lookup; base-chain search lives on the registry.
    pub fn local_property(&self, identifier: &str) -> Option<&Arc<PropertyDef>> {
        self.properties.iter().find(|p| p.identifier == identifier)
    }
}
