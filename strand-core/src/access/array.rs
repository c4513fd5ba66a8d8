/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Array-shaped numeric property access.
//!
//! Whole-array transfers against caller buffers, plus per-index convenience that
//! round-trips through a stack buffer of [`MAX_ARRAY_LEN`]. Dynamic arrays read their
//! effective length from a sibling field, clamped to the declared capacity.

use smallvec::SmallVec;

use crate::builtin::Value;
use crate::meta::layout::FieldKind;
use crate::meta::{ArrayInfo, PropertyDef, PropertyKind, ScalarAccess, MAX_ARRAY_LEN};
use crate::obj::{Ptr, Store};
use crate::strand_error;

use super::{editable, override_lookup, override_present, override_store, run_update};

type IntBuf = SmallVec<[i32; MAX_ARRAY_LEN as usize]>;
type FloatBuf = SmallVec<[f32; MAX_ARRAY_LEN as usize]>;

fn field_capacity(kind: &FieldKind) -> usize {
    match kind {
        FieldKind::I32Array(n) | FieldKind::F32Array(n) => usize::from(*n),
        _ => 0,
    }
}

fn bound_field<'p>(prop: &'p PropertyDef) -> Option<&'p crate::meta::ResolvedField> {
    match &prop.kind {
        PropertyKind::Int {
            access: ScalarAccess::Field(field),
            ..
        }
        | PropertyKind::Float {
            access: ScalarAccess::Field(field),
            ..
        } => Some(field),
        _ => None,
    }
}

/// Effective element count of an array property.
///
/// An override wins (dynamic arrays accept any override length); otherwise the declared
/// fixed length, or the length field clamped to the backing capacity.
pub fn array_len(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> usize {
    match override_lookup(store, ptr, prop) {
        Some(Value::IntArray(items)) => return items.len(),
        Some(Value::FloatArray(items)) => return items.len(),
        _ => {}
    }

    match &prop.array {
        ArrayInfo::Scalar => 0,
        ArrayInfo::Fixed(n) => usize::from(*n),
        ArrayInfo::Dynamic { len_field } => {
            let capacity = bound_field(prop).map_or(0, |f| field_capacity(&f.kind));
            let len = store
                .field_addr(ptr, len_field)
                .map_or(0, |(slot, offset)| {
                    store.read_int_kind(slot, offset, &len_field.kind)
                });
            (len.max(0) as usize).min(capacity)
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Int arrays

/// Copies the array into `out`; returns the number of elements written.
pub fn int_array_get(store: &Store, ptr: &Ptr, prop: &PropertyDef, out: &mut [i32]) -> usize {
    let PropertyKind::Int { range, access } = &prop.kind else {
        super::kind_mismatch(prop, "int");
        return 0;
    };

    let len = array_len(store, ptr, prop).min(out.len());
    if let Some(Value::IntArray(items)) = override_lookup(store, ptr, prop) {
        out[..len].copy_from_slice(&items[..len]);
        return len;
    }

    match access {
        ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
            Some((slot, offset)) => {
                for (i, item) in out[..len].iter_mut().enumerate() {
                    *item = store.read_i32(slot, offset + 4 * i as u32);
                }
                len
            }
            None => {
                out[..len].fill(range.default);
                len
            }
        },
        _ => {
            out[..len].fill(range.default);
            len
        }
    }
}

pub fn int_array_set(store: &mut Store, ptr: &Ptr, prop: &PropertyDef, values: &[i32]) -> bool {
    let PropertyKind::Int { .. } = &prop.kind else {
        super::kind_mismatch(prop, "int");
        return false;
    };
    if !editable(store, ptr, prop) {
        return false;
    }

    let len = array_len(store, ptr, prop);
    if values.len() != len {
        strand_error!(
            "`{}` holds {len} elements, caller supplied {}",
            prop.identifier,
            values.len()
        );
        return false;
    }

    let (min, max) = super::int_range(store, ptr, prop);
    let clamped: IntBuf = values.iter().map(|v| (*v).clamp(min, max)).collect();

    let PropertyKind::Int { access, .. } = &prop.kind else { unreachable!() };
    let applied = if override_present(store, ptr, prop) {
        override_store(store, ptr, prop, Value::IntArray(clamped.to_vec()))
    } else {
        match access {
            ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
                Some((slot, offset)) => {
                    for (i, item) in clamped.iter().enumerate() {
                        store.write_i32(slot, offset + 4 * i as u32, *item);
                    }
                    true
                }
                None => false,
            },
            _ => override_store(store, ptr, prop, Value::IntArray(clamped.to_vec())),
        }
    };

    if applied {
        run_update(store, ptr, prop);
    }
    applied
}

pub fn int_index_get(store: &Store, ptr: &Ptr, prop: &PropertyDef, index: usize) -> i32 {
    let mut buf: IntBuf = SmallVec::from_elem(0, array_len(store, ptr, prop));
    let written = int_array_get(store, ptr, prop, &mut buf);
    if index >= written {
        strand_error!("index {index} outside `{}` (len {written})", prop.identifier);
        return 0;
    }
    buf[index]
}

pub fn int_index_set(
    store: &mut Store,
    ptr: &Ptr,
    prop: &PropertyDef,
    index: usize,
    value: i32,
) -> bool {
    let mut buf: IntBuf = SmallVec::from_elem(0, array_len(store, ptr, prop));
    let written = int_array_get(store, ptr, prop, &mut buf);
    if index >= written {
        strand_error!("index {index} outside `{}` (len {written})", prop.identifier);
        return false;
    }
    buf[index] = value;
    int_array_set(store, ptr, prop, &buf)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Float arrays

pub fn float_array_get(store: &Store, ptr: &Ptr, prop: &PropertyDef, out: &mut [f32]) -> usize {
    let PropertyKind::Float { range, access } = &prop.kind else {
        super::kind_mismatch(prop, "float");
        return 0;
    };

    let len = array_len(store, ptr, prop).min(out.len());
    if let Some(Value::FloatArray(items)) = override_lookup(store, ptr, prop) {
        out[..len].copy_from_slice(&items[..len]);
        return len;
    }

    match access {
        ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
            Some((slot, offset)) => {
                for (i, item) in out[..len].iter_mut().enumerate() {
                    *item = store.read_f32(slot, offset + 4 * i as u32);
                }
                len
            }
            None => {
                out[..len].fill(range.default);
                len
            }
        },
        _ => {
            out[..len].fill(range.default);
            len
        }
    }
}

pub fn float_array_set(store: &mut Store, ptr: &Ptr, prop: &PropertyDef, values: &[f32]) -> bool {
    let PropertyKind::Float { .. } = &prop.kind else {
        super::kind_mismatch(prop, "float");
        return false;
    };
    if !editable(store, ptr, prop) {
        return false;
    }

    let len = array_len(store, ptr, prop);
    if values.len() != len {
        strand_error!(
            "`{}` holds {len} elements, caller supplied {}",
            prop.identifier,
            values.len()
        );
        return false;
    }

    let (min, max) = super::float_range(store, ptr, prop);
    let clamped: FloatBuf = values.iter().map(|v| v.clamp(min, max)).collect();

    let PropertyKind::Float { access, .. } = &prop.kind else { unreachable!() };
    let applied = if override_present(store, ptr, prop) {
        override_store(store, ptr, prop, Value::FloatArray(clamped.to_vec()))
    } else {
        match access {
            ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
                Some((slot, offset)) => {
                    for (i, item) in clamped.iter().enumerate() {
                        store.write_f32(slot, offset + 4 * i as u32, *item);
                    }
                    true
                }
                None => false,
            },
            _ => override_store(store, ptr, prop, Value::FloatArray(clamped.to_vec())),
        }
    };

    if applied {
        run_update(store, ptr, prop);
    }
    applied
}

pub fn float_index_get(store: &Store, ptr: &Ptr, prop: &PropertyDef, index: usize) -> f32 {
    let mut buf: FloatBuf = SmallVec::from_elem(0.0, array_len(store, ptr, prop));
    let written = float_array_get(store, ptr, prop, &mut buf);
    if index >= written {
        strand_error!("index {index} outside `{}` (len {written})", prop.identifier);
        return 0.0;
    }
    buf[index]
}

pub fn float_index_set(
    store: &mut Store,
    ptr: &Ptr,
    prop: &PropertyDef,
    index: usize,
    value: f32,
) -> bool {
    let mut buf: FloatBuf = SmallVec::from_elem(0.0, array_len(store, ptr, prop));
    let written = float_array_get(store, ptr, prop, &mut buf);
    if index >= written {
        strand_error!("index {index} outside `{}` (len {written})", prop.identifier);
        return false;
    }
    buf[index] = value;
    float_array_set(store, ptr, prop, &buf)
}
