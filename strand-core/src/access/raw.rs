/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Bulk raw access over inline struct-array collections.
//!
//! Transfers one property of every element between compiled storage and a flat caller
//! buffer without going through the per-element pipeline, converting numeric types
//! element-wise when source and destination differ (float into an int buffer truncates
//! exactly like a per-element get would).
//!
//! Eligibility is decided fully up front; anything that would force per-element logic
//! (overrides, refinement, custom accessors, indirection, a read-only owner on writes)
//! makes the whole transfer ineligible and nothing is copied. Callers fall back to the
//! general per-element path.

use crate::meta::layout::FieldKind;
use crate::meta::{
    ArrayInfo, CollectionSource, LenSource, PropertyDef, PropertyKind, ResolvedField,
    ScalarAccess,
};
use crate::obj::{Ptr, Slot, Store};
use crate::strand_warn;

/// Typed view of a caller's read buffer.
pub enum RawSlice<'a> {
    I8(&'a [i8]),
    I16(&'a [i16]),
    I32(&'a [i32]),
    I64(&'a [i64]),
    F32(&'a [f32]),
    F64(&'a [f64]),
}

/// Typed view of a caller's write buffer.
pub enum RawSliceMut<'a> {
    I8(&'a mut [i8]),
    I16(&'a mut [i16]),
    I32(&'a mut [i32]),
    I64(&'a mut [i64]),
    F32(&'a mut [f32]),
    F64(&'a mut [f64]),
}

impl RawSlice<'_> {
    fn len(&self) -> usize {
        match self {
            RawSlice::I8(s) => s.len(),
            RawSlice::I16(s) => s.len(),
            RawSlice::I32(s) => s.len(),
            RawSlice::I64(s) => s.len(),
            RawSlice::F32(s) => s.len(),
            RawSlice::F64(s) => s.len(),
        }
    }

    fn get(&self, i: usize) -> Scalar {
        match self {
            RawSlice::I8(s) => Scalar::Int(i64::from(s[i])),
            RawSlice::I16(s) => Scalar::Int(i64::from(s[i])),
            RawSlice::I32(s) => Scalar::Int(i64::from(s[i])),
            RawSlice::I64(s) => Scalar::Int(s[i]),
            RawSlice::F32(s) => Scalar::Float(f64::from(s[i])),
            RawSlice::F64(s) => Scalar::Float(s[i]),
        }
    }
}

impl RawSliceMut<'_> {
    fn len(&self) -> usize {
        match self {
            RawSliceMut::I8(s) => s.len(),
            RawSliceMut::I16(s) => s.len(),
            RawSliceMut::I32(s) => s.len(),
            RawSliceMut::I64(s) => s.len(),
            RawSliceMut::F32(s) => s.len(),
            RawSliceMut::F64(s) => s.len(),
        }
    }

    fn put(&mut self, i: usize, value: Scalar) {
        match self {
            RawSliceMut::I8(s) => s[i] = value.to_int() as i8,
            RawSliceMut::I16(s) => s[i] = value.to_int() as i16,
            RawSliceMut::I32(s) => s[i] = value.to_int() as i32,
            RawSliceMut::I64(s) => s[i] = value.to_int(),
            RawSliceMut::F32(s) => s[i] = value.to_float() as f32,
            RawSliceMut::F64(s) => s[i] = value.to_float(),
        }
    }
}

/// One scalar in transit; numeric conversion happens at the buffer boundary.
#[derive(Copy, Clone)]
enum Scalar {
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Floats truncate toward zero, the conversion a per-element get-then-cast does.
    fn to_int(self) -> i64 {
        match self {
            Scalar::Int(i) => i,
            Scalar::Float(f) => f as i64,
        }
    }

    fn to_float(self) -> f64 {
        match self {
            Scalar::Int(i) => i as f64,
            Scalar::Float(f) => f,
        }
    }
}

/// Everything needed to run the copy loop, proven valid in advance.
struct Plan {
    slot: Slot,
    /// Offset of element 0 within the block.
    base: u32,
    stride: u32,
    count: u32,
    /// Offset of the item property within one element.
    item_offset: u32,
    /// Scalar slots per element (1, or the fixed array length).
    per_elem: u32,
    /// Scalar shape of one slot in compiled storage.
    kind: FieldKind,
    item_editable: bool,
}

fn ineligible(prop: &PropertyDef, item: &str, why: &str) {
    strand_warn!("raw access to `{}` via `{item}` ineligible: {why}", prop.identifier);
}

fn plan(store: &Store, ptr: &Ptr, prop: &PropertyDef, item: &str) -> Option<Plan> {
    let PropertyKind::Collection { target, source } = &prop.kind else {
        ineligible(prop, item, "not a collection");
        return None;
    };
    let CollectionSource::Array {
        field,
        stride,
        len,
        deref: false,
    } = source
    else {
        ineligible(prop, item, "not an inline struct array");
        return None;
    };
    if super::is_overridden(store, ptr, prop) {
        ineligible(prop, item, "shadowed by a dynamic override");
        return None;
    }
    if store
        .registry()
        .struct_def(*target)
        .is_some_and(|def| def.refine.is_some())
    {
        ineligible(prop, item, "element type refines at runtime");
        return None;
    }

    let item_prop = store.registry().find_property(*target, item)?;
    let access: &ResolvedField = match &item_prop.kind {
        PropertyKind::Boolean {
            access: ScalarAccess::Field(f),
            ..
        }
        | PropertyKind::Int {
            access: ScalarAccess::Field(f),
            ..
        }
        | PropertyKind::Enum {
            access: ScalarAccess::Field(f),
            ..
        }
        | PropertyKind::Float {
            access: ScalarAccess::Field(f),
            ..
        } => f,
        _ => {
            ineligible(prop, item, "item property is not field-bound");
            return None;
        }
    };
    if !access.hops.is_empty() {
        ineligible(prop, item, "item property reaches through a reference");
        return None;
    }

    let (per_elem, kind) = match (&item_prop.array, &access.kind) {
        (
            ArrayInfo::Scalar,
            k @ (FieldKind::I8
            | FieldKind::I16
            | FieldKind::I32
            | FieldKind::I64
            | FieldKind::F32
            | FieldKind::F64),
        ) => (1, k.clone()),
        (ArrayInfo::Fixed(n), FieldKind::I32Array(m)) if n == m => {
            (u32::from(*n), FieldKind::I32)
        }
        (ArrayInfo::Fixed(n), FieldKind::F32Array(m)) if n == m => {
            (u32::from(*n), FieldKind::F32)
        }
        _ => {
            ineligible(prop, item, "item property shape unsupported");
            return None;
        }
    };

    let (slot, base) = store.field_addr(ptr, field)?;
    let count = match len {
        LenSource::Fixed(n) => *n,
        LenSource::Field(len_field) => store
            .field_addr(ptr, len_field)
            .map_or(0, |(s, o)| store.read_int_kind(s, o, &len_field.kind).max(0) as u32),
    };

    Some(Plan {
        slot,
        base,
        stride: *stride,
        count,
        item_offset: access.offset,
        per_elem,
        kind,
        item_editable: item_prop.is_editable_flag(),
    })
}

fn read_scalar(store: &Store, slot: Slot, at: u32, kind: &FieldKind) -> Scalar {
    match kind {
        FieldKind::I64 => Scalar::Int(store.read_i64(slot, at)),
        FieldKind::F32 => Scalar::Float(f64::from(store.read_f32(slot, at))),
        FieldKind::F64 => Scalar::Float(store.read_f64(slot, at)),
        _ => Scalar::Int(i64::from(store.read_int_kind(slot, at, kind))),
    }
}

fn write_scalar(store: &mut Store, slot: Slot, at: u32, kind: &FieldKind, value: Scalar) {
    match kind {
        FieldKind::I64 => store.write_i64(slot, at, value.to_int()),
        FieldKind::F32 => store.write_f32(slot, at, value.to_float() as f32),
        FieldKind::F64 => store.write_f64(slot, at, value.to_float()),
        _ => store.write_int_kind(slot, at, kind, value.to_int() as i32),
    }
}

fn scalar_width(kind: &FieldKind) -> u32 {
    match kind {
        FieldKind::I8 => 1,
        FieldKind::I16 => 2,
        FieldKind::I32 | FieldKind::F32 => 4,
        FieldKind::I64 | FieldKind::F64 => 8,
        _ => 0,
    }
}

/// Bulk-reads `item` of every element of the collection into `out`.
///
/// `out` must be exactly `length * per_element` scalars; its numeric type may differ
/// from the field's. Returns `false` (with nothing copied) when the transfer is
/// ineligible.
pub fn raw_get(
    store: &Store,
    ptr: &Ptr,
    prop: &PropertyDef,
    item: &str,
    mut out: RawSliceMut<'_>,
) -> bool {
    let Some(plan) = plan(store, ptr, prop, item) else {
        return false;
    };
    if out.len() != (plan.count * plan.per_elem) as usize {
        ineligible(prop, item, "buffer length does not match");
        return false;
    }

    let width = scalar_width(&plan.kind);
    for i in 0..plan.count {
        let elem = plan.base + plan.stride * i + plan.item_offset;
        for j in 0..plan.per_elem {
            let value = read_scalar(store, plan.slot, elem + width * j, &plan.kind);
            out.put((i * plan.per_elem + j) as usize, value);
        }
    }
    true
}

/// Bulk-writes `item` of every element of the collection from `values`.
///
/// Same eligibility rules as [`raw_get`], plus owner and item property must be
/// editable. No per-element update hooks run; bulk callers notify once themselves.
pub fn raw_set(
    store: &mut Store,
    ptr: &Ptr,
    prop: &PropertyDef,
    item: &str,
    values: RawSlice<'_>,
) -> bool {
    if !super::editable(store, ptr, prop) {
        ineligible(prop, item, "owner is not editable");
        return false;
    }
    let Some(plan) = plan(store, ptr, prop, item) else {
        return false;
    };
    if !plan.item_editable {
        ineligible(prop, item, "item property is read-only");
        return false;
    }
    if values.len() != (plan.count * plan.per_elem) as usize {
        ineligible(prop, item, "buffer length does not match");
        return false;
    }

    let width = scalar_width(&plan.kind);
    for i in 0..plan.count {
        let elem = plan.base + plan.stride * i + plan.item_offset;
        for j in 0..plan.per_elem {
            let value = values.get((i * plan.per_elem + j) as usize);
            write_scalar(store, plan.slot, elem + width * j, &plan.kind, value);
        }
    }
    true
}
