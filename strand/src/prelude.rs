/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Curated re-exports for the common case: `use strand::prelude::*;`.

pub use strand_core::builtin::{IdProperties, Value};
pub use strand_core::meta::{
    ArrayInfo, EnumItem, PropertyDef, PropertyFlags, PropertyKind, StructDef, StructFlags,
    StructName,
};
pub use strand_core::obj::{
    foreach_id, foreach_id_mut, IdHeader, IdRemap, IdVisitor, Ptr, RefUsage, Slot, Store,
    VisitControl, VisitFlags,
};
pub use strand_core::path::{self, ResolvedPath};
pub use strand_core::registry::{PropertyBuilder, PropertyType, Registry, RegistryBuilder, StructBuilder};

pub use strand_core::access;
