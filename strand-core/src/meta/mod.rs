/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Static descriptors: struct and property metadata, layouts, definition errors.

pub mod error;
pub mod inspect;
pub mod layout;

mod property_def;
mod struct_def;
mod struct_name;

pub use property_def::{
    ArrayInfo, BoolAccess, BoolGetFn, BoolSetFn, CollectionBeginFn, CollectionLengthFn,
    CollectionLookupIndexFn, CollectionLookupNameFn, CollectionSource, EnumItem, FloatAccess,
    FloatGetFn, FloatRange, FloatRangeFn, FloatSetFn, IntAccess, IntGetFn, IntRange, IntRangeFn,
    IntSetFn, LenSource, PointerAccess, PointerGetFn, PointerSetFn, PropertyDef, PropertyFlags,
    PropertyKind, ResolvedField, ScalarAccess, StringAccess, StringGetFn, StringSetFn, UpdateFn,
    MAX_ARRAY_LEN,
};
pub use struct_def::{PathFn, RefineFn, StructDef, StructFlags, MAX_REFINE};
pub use struct_name::StructName;
