/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use bitflags::bitflags;

use crate::builtin::Value;
use crate::meta::layout::FieldKind;
use crate::meta::StructName;
use crate::obj::{Ptr, Slot, Store};

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Callback signatures

pub type BoolGetFn = fn(&Store, &Ptr) -> bool;
pub type BoolSetFn = fn(&mut Store, &Ptr, bool);
pub type IntGetFn = fn(&Store, &Ptr) -> i32;
pub type IntSetFn = fn(&mut Store, &Ptr, i32);
pub type IntRangeFn = fn(&Store, &Ptr) -> (i32, i32);
pub type FloatGetFn = fn(&Store, &Ptr) -> f32;
pub type FloatSetFn = fn(&mut Store, &Ptr, f32);
pub type FloatRangeFn = fn(&Store, &Ptr) -> (f32, f32);
pub type StringGetFn = fn(&Store, &Ptr) -> String;
pub type StringSetFn = fn(&mut Store, &Ptr, &str);
pub type PointerGetFn = fn(&Store, &Ptr) -> Option<Ptr>;
pub type PointerSetFn = fn(&mut Store, &Ptr, Option<Slot>);

/// Change-notification hook, invoked after a successful set.
pub type UpdateFn = fn(&mut Store, &Ptr);

/// Custom collection begin: materializes the cursor's element sequence.
pub type CollectionBeginFn = fn(&Store, &Ptr) -> Vec<Ptr>;
pub type CollectionLengthFn = fn(&Store, &Ptr) -> usize;
pub type CollectionLookupIndexFn = fn(&Store, &Ptr, usize) -> Option<Ptr>;
pub type CollectionLookupNameFn = fn(&Store, &Ptr, &str) -> Option<Ptr>;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Flags and shared pieces

bitflags! {
    /// Behavioral flags of one property.
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub struct PropertyFlags: u32 {
        const EDITABLE = 1 << 0;
        const ANIMATABLE = 1 << 1;
        /// Required pointer; assigning null is refused.
        const NEVER_NULL = 1 << 2;
        /// The descriptor is a thin proxy over a dynamic value, not a compiled field.
        const ID_PROPERTY = 1 << 3;
        /// Visible to exporters/serializers.
        const EXPORT = 1 << 4;
        /// Pointer assignment counts toward the target's user count.
        const OWNING_USER = 1 << 5;
        /// Pointer assignment guarantees at least one user without incrementing further.
        const USER_ONE = 1 << 6;
    }
}

impl Default for PropertyFlags {
    fn default() -> Self {
        PropertyFlags::EDITABLE | PropertyFlags::EXPORT
    }
}

/// Array-ness of a property.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayInfo {
    Scalar,
    Fixed(u16),
    /// Length read from a sibling field at access time.
    Dynamic { len_field: ResolvedField },
}

/// Maximum rank of a fixed array property; index access round-trips through a stack
/// buffer of this size.
pub const MAX_ARRAY_LEN: u16 = 32;

/// A field binding resolved against the owning struct's native layout.
///
/// `hops` are byte offsets of reference fields to jump through (nested sub-struct access
/// behind a pointer); `offset` is relative to the last hop target (or the instance base).
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedField {
    pub hops: Vec<u32>,
    pub offset: u32,
    pub kind: FieldKind,
}

/// Accessor strategy for one scalar direction pair.
///
/// `Unbound` defers to the dynamic override layer entirely. `Field` is the generated
/// trivial accessor, a data-described strategy interpreted by the access layer rather
/// than emitted code. `Bit` packs a boolean into a larger integer field.
#[derive(Clone, Debug)]
pub enum ScalarAccess<G, S> {
    Unbound,
    Field(ResolvedField),
    Bit {
        field: ResolvedField,
        bit: u8,
        negate: bool,
    },
    Custom { get: G, set: Option<S> },
}

pub type BoolAccess = ScalarAccess<BoolGetFn, BoolSetFn>;
pub type IntAccess = ScalarAccess<IntGetFn, IntSetFn>;
pub type FloatAccess = ScalarAccess<FloatGetFn, FloatSetFn>;
pub type StringAccess = ScalarAccess<StringGetFn, StringSetFn>;
pub type PointerAccess = ScalarAccess<PointerGetFn, PointerSetFn>;

impl<G, S> ScalarAccess<G, S> {
    pub fn is_unbound(&self) -> bool {
        matches!(self, ScalarAccess::Unbound)
    }

    /// Whether a set through this accessor can reach compiled storage.
    pub fn has_setter(&self) -> bool {
        match self {
            ScalarAccess::Unbound => false,
            ScalarAccess::Field(_) | ScalarAccess::Bit { .. } => true,
            ScalarAccess::Custom { set, .. } => set.is_some(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct IntRange {
    pub hard_min: i32,
    pub hard_max: i32,
    pub soft_min: i32,
    pub soft_max: i32,
    pub step: i32,
    pub default: i32,
    pub range_fn: Option<IntRangeFn>,
}

impl Default for IntRange {
    fn default() -> Self {
        Self {
            hard_min: i32::MIN,
            hard_max: i32::MAX,
            soft_min: -10_000,
            soft_max: 10_000,
            step: 1,
            default: 0,
            range_fn: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FloatRange {
    pub hard_min: f32,
    pub hard_max: f32,
    pub soft_min: f32,
    pub soft_max: f32,
    pub step: f32,
    pub precision: u8,
    pub default: f32,
    pub range_fn: Option<FloatRangeFn>,
}

impl Default for FloatRange {
    fn default() -> Self {
        Self {
            hard_min: f32::MIN,
            hard_max: f32::MAX,
            soft_min: -10_000.0,
            soft_max: 10_000.0,
            step: 0.1,
            precision: 3,
            default: 0.0,
            range_fn: None,
        }
    }
}

/// One declared enum value.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumItem {
    pub value: i32,
    pub identifier: String,
    pub name: String,
}

/// Where the length of an inline-array collection comes from.
#[derive(Clone, Debug)]
pub enum LenSource {
    Fixed(u32),
    Field(ResolvedField),
}

/// Backing storage strategy of a collection property.
#[derive(Clone, Debug)]
pub enum CollectionSource {
    /// No compiled storage; iterates a dynamic reference-array override, empty if absent.
    Unbound,
    /// Linked list: `head` holds the first element reference, `next` is the link field
    /// within the element's layout.
    List { head: ResolvedField, next_offset: u32 },
    /// Homogeneous inline array with a fixed stride. With `deref`, elements are encoded
    /// references rather than inline structs.
    Array {
        field: ResolvedField,
        stride: u32,
        len: LenSource,
        deref: bool,
    },
    /// Fully custom iteration callbacks.
    Custom {
        begin: CollectionBeginFn,
        length: Option<CollectionLengthFn>,
        lookup_index: Option<CollectionLookupIndexFn>,
        lookup_name: Option<CollectionLookupNameFn>,
    },
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// The descriptor itself

/// Kind-specific payload of a property descriptor.
#[derive(Clone, Debug)]
pub enum PropertyKind {
    Boolean {
        default: bool,
        access: BoolAccess,
    },
    Int {
        range: IntRange,
        access: IntAccess,
    },
    Float {
        range: FloatRange,
        access: FloatAccess,
    },
    String {
        max_length: u16,
        default: String,
        access: StringAccess,
    },
    Enum {
        items: Vec<EnumItem>,
        /// Bit-flag semantics: values combine, and sets merge rather than replace.
        flag: bool,
        default: i32,
        access: IntAccess,
    },
    Pointer {
        target: StructName,
        access: PointerAccess,
    },
    Collection {
        target: StructName,
        source: CollectionSource,
    },
}

impl PropertyKind {
    /// Kind identifier for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyKind::Boolean { .. } => "boolean",
            PropertyKind::Int { .. } => "int",
            PropertyKind::Float { .. } => "float",
            PropertyKind::String { .. } => "string",
            PropertyKind::Enum { .. } => "enum",
            PropertyKind::Pointer { .. } => "pointer",
            PropertyKind::Collection { .. } => "collection",
        }
    }
}

/// Static descriptor of one property of one struct type.
///
/// Immutable and process-wide once the registry is built; no instance-specific state is
/// ever stored here.
#[derive(Clone, Debug)]
pub struct PropertyDef {
    pub identifier: String,
    /// Human-readable display name.
    pub name: String,
    pub description: String,
    pub kind: PropertyKind,
    pub array: ArrayInfo,
    pub flags: PropertyFlags,
    /// Change-notification tag passed to the embedder's notifier alongside `update`.
    pub notify: u32,
    pub update: Option<UpdateFn>,
}

impl PropertyDef {
    pub fn is_editable_flag(&self) -> bool {
        self.flags.contains(PropertyFlags::EDITABLE)
    }

    pub fn is_id_property(&self) -> bool {
        self.flags.contains(PropertyFlags::ID_PROPERTY)
    }

    /// Declared fixed array length; 0 for scalars and dynamic arrays.
    pub fn fixed_array_len(&self) -> usize {
        match self.array {
            ArrayInfo::Fixed(n) => usize::from(n),
            _ => 0,
        }
    }

    /// Whether a dynamic override value satisfies this descriptor's schema.
    ///
    /// The dynamic layer never serves data violating the compiled schema; a mismatch here
    /// causes the override to be discarded (self-healing), not coerced.
    pub fn value_matches(&self, value: &Value) -> bool {
        let scalar = matches!(self.array, ArrayInfo::Scalar);
        match &self.kind {
            PropertyKind::Boolean { .. } => scalar && value.as_bool().is_some(),
            PropertyKind::Int { .. } | PropertyKind::Enum { .. } => match value {
                Value::Int(_) | Value::Bool(_) => scalar,
                Value::IntArray(items) => self.array_len_matches(items.len()),
                _ => false,
            },
            PropertyKind::Float { .. } => match value {
                Value::Float(_) | Value::Double(_) => scalar,
                Value::FloatArray(items) => self.array_len_matches(items.len()),
                _ => false,
            },
            PropertyKind::String { .. } => scalar && matches!(value, Value::String(_)),
            PropertyKind::Pointer { .. } => scalar && matches!(value, Value::Ref(_)),
            PropertyKind::Collection { .. } => matches!(value, Value::RefArray(_)),
        }
    }

    fn array_len_matches(&self, len: usize) -> bool {
        match self.array {
            ArrayInfo::Scalar => false,
            ArrayInfo::Fixed(n) => len == usize::from(n),
            // Dynamic arrays accept any override length; the length source is consulted
            // only for compiled storage.
            ArrayInfo::Dynamic { .. } => true,
        }
    }
}
