/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Generic property access.
//!
//! Every read goes through the same pipeline: dynamic override (schema-checked, with
//! mismatches discarded on the spot), then the compiled accessor, then the declared
//! default. Every write goes: editability, clamping, then override-replace, compiled
//! setter, or lazy override creation, followed by the property's update hook.
//!
//! Kind mismatches (asking for an int from a float property) are caller bugs: they are
//! logged and degrade to the neutral value, never panic.

mod array;
mod collection;
mod raw;

pub use array::{
    array_len, float_array_get, float_array_set, float_index_get, float_index_set,
    int_array_get, int_array_set, int_index_get, int_index_set,
};
pub use collection::{
    collection_begin, collection_length, collection_lookup_index, collection_lookup_string,
    CollectionIter, SkipFn,
};
pub(crate) use collection::resolve_len;
pub use raw::{raw_get, raw_set, RawSlice, RawSliceMut};

use std::sync::Arc;

use crate::builtin::Value;
use crate::meta::{
    ArrayInfo, PropertyDef, PropertyFlags, PropertyKind, ScalarAccess, StructName,
};
use crate::obj::{Ptr, Slot, Store};
use crate::{strand_error, strand_warn};

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Shared pipeline pieces

/// Whether a write through this property would be applied.
///
/// Requires the editable flag and an owner that is not read-only library data.
pub fn editable(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> bool {
    prop.is_editable_flag() && !ptr.owner_id.is_some_and(|id| store.is_library(id))
}

/// Serves the dynamic override for `prop`, if one exists and satisfies the schema.
///
/// A value that violates the compiled schema is discarded here, during the read; the
/// caller falls through to compiled storage. Overrides attach to instance roots only.
fn override_lookup(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> Option<Value> {
    if !ptr.is_instance_root() {
        return None;
    }
    let value = store.override_clone(ptr.slot, &prop.identifier)?;
    if prop.value_matches(&value) {
        return Some(value);
    }

    strand_warn!(
        "discarding override `{}`: {} does not satisfy a {} property",
        prop.identifier,
        value.type_name(),
        prop.kind.type_name()
    );
    store.override_discard(ptr.slot, &prop.identifier);
    None
}

/// Whether a (valid or not) override currently shadows `prop`.
fn override_present(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> bool {
    ptr.is_instance_root() && store.override_contains(ptr.slot, &prop.identifier)
}

/// Stores `value` as the property's override, replacing or lazily creating it.
fn override_store(store: &mut Store, ptr: &Ptr, prop: &PropertyDef, value: Value) -> bool {
    if !ptr.is_instance_root() {
        strand_warn!(
            "`{}` has no storage here; sub-region instances carry no overrides",
            prop.identifier
        );
        return false;
    }
    store.override_insert(ptr.slot, &prop.identifier, value);
    true
}

fn run_update(store: &mut Store, ptr: &Ptr, prop: &PropertyDef) {
    if let Some(update) = prop.update {
        update(store, ptr);
    }
}

fn kind_mismatch(prop: &PropertyDef, wanted: &str) {
    strand_error!(
        "`{}` is a {} property, not {wanted}",
        prop.identifier,
        prop.kind.type_name()
    );
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Boolean

pub fn bool_get(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> bool {
    let PropertyKind::Boolean { default, access } = &prop.kind else {
        kind_mismatch(prop, "boolean");
        return false;
    };

    if let Some(value) = override_lookup(store, ptr, prop) {
        return value.as_bool().unwrap_or(*default);
    }

    match access {
        ScalarAccess::Custom { get, .. } => get(store, ptr),
        ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
            Some((slot, offset)) => store.read_int_kind(slot, offset, &field.kind) != 0,
            None => *default,
        },
        ScalarAccess::Bit { field, bit, negate } => match store.field_addr(ptr, field) {
            Some((slot, offset)) => {
                let raw = store.read_int_kind(slot, offset, &field.kind);
                (raw & (1 << bit) != 0) != *negate
            }
            None => *default,
        },
        ScalarAccess::Unbound => *default,
    }
}

pub fn bool_set(store: &mut Store, ptr: &Ptr, prop: &PropertyDef, value: bool) -> bool {
    let PropertyKind::Boolean { access, .. } = &prop.kind else {
        kind_mismatch(prop, "boolean");
        return false;
    };
    if !editable(store, ptr, prop) {
        return false;
    }

    let applied = if override_present(store, ptr, prop) {
        override_store(store, ptr, prop, Value::Bool(value))
    } else {
        match access {
            ScalarAccess::Custom { set: Some(set), .. } => {
                set(store, ptr, value);
                true
            }
            ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
                Some((slot, offset)) => {
                    store.write_int_kind(slot, offset, &field.kind, i32::from(value));
                    true
                }
                None => false,
            },
            ScalarAccess::Bit { field, bit, negate } => match store.field_addr(ptr, field) {
                Some((slot, offset)) => {
                    let mut raw = store.read_int_kind(slot, offset, &field.kind);
                    if value != *negate {
                        raw |= 1 << bit;
                    } else {
                        raw &= !(1 << bit);
                    }
                    store.write_int_kind(slot, offset, &field.kind, raw);
                    true
                }
                None => false,
            },
            _ => override_store(store, ptr, prop, Value::Bool(value)),
        }
    };

    if applied {
        run_update(store, ptr, prop);
    }
    applied
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Int

/// Effective hard bounds, consulting the per-instance range callback when declared.
pub fn int_range(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> (i32, i32) {
    match &prop.kind {
        PropertyKind::Int { range, .. } => match range.range_fn {
            Some(f) => f(store, ptr),
            None => (range.hard_min, range.hard_max),
        },
        _ => {
            kind_mismatch(prop, "int");
            (i32::MIN, i32::MAX)
        }
    }
}

pub fn int_get(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> i32 {
    let PropertyKind::Int { range, access } = &prop.kind else {
        kind_mismatch(prop, "int");
        return 0;
    };

    if let Some(value) = override_lookup(store, ptr, prop) {
        return value.as_int().unwrap_or(range.default);
    }

    match access {
        ScalarAccess::Custom { get, .. } => get(store, ptr),
        ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
            Some((slot, offset)) => store.read_int_kind(slot, offset, &field.kind),
            None => range.default,
        },
        ScalarAccess::Bit { .. } => {
            kind_mismatch(prop, "bit-bound");
            range.default
        }
        ScalarAccess::Unbound => range.default,
    }
}

pub fn int_set(store: &mut Store, ptr: &Ptr, prop: &PropertyDef, value: i32) -> bool {
    let PropertyKind::Int { .. } = &prop.kind else {
        kind_mismatch(prop, "int");
        return false;
    };
    if !editable(store, ptr, prop) {
        return false;
    }

    let (min, max) = int_range(store, ptr, prop);
    let value = value.clamp(min, max);

    let PropertyKind::Int { access, .. } = &prop.kind else { unreachable!() };
    let applied = if override_present(store, ptr, prop) {
        override_store(store, ptr, prop, Value::Int(value))
    } else {
        match access {
            ScalarAccess::Custom { set: Some(set), .. } => {
                set(store, ptr, value);
                true
            }
            ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
                Some((slot, offset)) => {
                    store.write_int_kind(slot, offset, &field.kind, value);
                    true
                }
                None => false,
            },
            _ => override_store(store, ptr, prop, Value::Int(value)),
        }
    };

    if applied {
        run_update(store, ptr, prop);
    }
    applied
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Float

pub fn float_range(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> (f32, f32) {
    match &prop.kind {
        PropertyKind::Float { range, .. } => match range.range_fn {
            Some(f) => f(store, ptr),
            None => (range.hard_min, range.hard_max),
        },
        _ => {
            kind_mismatch(prop, "float");
            (f32::MIN, f32::MAX)
        }
    }
}

pub fn float_get(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> f32 {
    let PropertyKind::Float { range, access } = &prop.kind else {
        kind_mismatch(prop, "float");
        return 0.0;
    };

    if let Some(value) = override_lookup(store, ptr, prop) {
        return value.as_float().unwrap_or(range.default);
    }

    match access {
        ScalarAccess::Custom { get, .. } => get(store, ptr),
        ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
            Some((slot, offset)) => store.read_float_kind(slot, offset, &field.kind),
            None => range.default,
        },
        ScalarAccess::Bit { .. } => {
            kind_mismatch(prop, "bit-bound");
            range.default
        }
        ScalarAccess::Unbound => range.default,
    }
}

pub fn float_set(store: &mut Store, ptr: &Ptr, prop: &PropertyDef, value: f32) -> bool {
    let PropertyKind::Float { .. } = &prop.kind else {
        kind_mismatch(prop, "float");
        return false;
    };
    if !editable(store, ptr, prop) {
        return false;
    }

    let (min, max) = float_range(store, ptr, prop);
    let value = value.clamp(min, max);

    let PropertyKind::Float { access, .. } = &prop.kind else { unreachable!() };
    let applied = if override_present(store, ptr, prop) {
        override_store(store, ptr, prop, Value::Float(value))
    } else {
        match access {
            ScalarAccess::Custom { set: Some(set), .. } => {
                set(store, ptr, value);
                true
            }
            ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
                Some((slot, offset)) => {
                    store.write_float_kind(slot, offset, &field.kind, value);
                    true
                }
                None => false,
            },
            _ => override_store(store, ptr, prop, Value::Float(value)),
        }
    };

    if applied {
        run_update(store, ptr, prop);
    }
    applied
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// String

pub fn string_get(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> String {
    let PropertyKind::String { default, access, .. } = &prop.kind else {
        kind_mismatch(prop, "string");
        return String::new();
    };

    if let Some(Value::String(s)) = override_lookup(store, ptr, prop) {
        return s;
    }

    match access {
        ScalarAccess::Custom { get, .. } => get(store, ptr),
        ScalarAccess::Field(field) => {
            let capacity = match field.kind {
                crate::meta::layout::FieldKind::Char(n) => n,
                _ => 0,
            };
            match store.field_addr(ptr, field) {
                Some((slot, offset)) => store.read_chars(slot, offset, capacity),
                None => default.clone(),
            }
        }
        _ => default.clone(),
    }
}

pub fn string_set(store: &mut Store, ptr: &Ptr, prop: &PropertyDef, value: &str) -> bool {
    let PropertyKind::String { max_length, access, .. } = &prop.kind else {
        kind_mismatch(prop, "string");
        return false;
    };
    if !editable(store, ptr, prop) {
        return false;
    }

    // Truncate on a char boundary to the declared maximum (0 = unlimited); the NUL
    // terminator of char storage is accounted for by the field writer.
    let mut value = value;
    if *max_length > 0 {
        let mut len = value.len().min(usize::from(*max_length) - 1);
        while len > 0 && !value.is_char_boundary(len) {
            len -= 1;
        }
        value = &value[..len];
    }

    let applied = if override_present(store, ptr, prop) {
        override_store(store, ptr, prop, Value::String(value.to_string()))
    } else {
        match access {
            ScalarAccess::Custom { set: Some(set), .. } => {
                set(store, ptr, value);
                true
            }
            ScalarAccess::Field(field) => {
                let capacity = match field.kind {
                    crate::meta::layout::FieldKind::Char(n) => n,
                    _ => 0,
                };
                match store.field_addr(ptr, field) {
                    Some((slot, offset)) => {
                        store.write_chars(slot, offset, capacity, value);
                        true
                    }
                    None => false,
                }
            }
            _ => override_store(store, ptr, prop, Value::String(value.to_string())),
        }
    };

    if applied {
        run_update(store, ptr, prop);
    }
    applied
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Enum

pub fn enum_get(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> i32 {
    let PropertyKind::Enum { default, access, .. } = &prop.kind else {
        kind_mismatch(prop, "enum");
        return 0;
    };

    if let Some(value) = override_lookup(store, ptr, prop) {
        return value.as_int().unwrap_or(*default);
    }

    match access {
        ScalarAccess::Custom { get, .. } => get(store, ptr),
        ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
            Some((slot, offset)) => store.read_int_kind(slot, offset, &field.kind),
            None => *default,
        },
        _ => *default,
    }
}

/// Combined mask of every declared item value; the writable bits of a flag enum.
fn enum_mask(items: &[crate::meta::EnumItem]) -> i32 {
    items.iter().fold(0, |mask, item| mask | item.value)
}

/// Flag-enum sets touch only the declared bits; foreign bits in the backing field
/// survive the write.
fn merge_flags(current: i32, value: i32, mask: i32) -> i32 {
    (current & !mask) | (value & mask)
}

pub fn enum_set(store: &mut Store, ptr: &Ptr, prop: &PropertyDef, value: i32) -> bool {
    let PropertyKind::Enum { items, flag, .. } = &prop.kind else {
        kind_mismatch(prop, "enum");
        return false;
    };
    if !editable(store, ptr, prop) {
        return false;
    }

    let value = if *flag {
        merge_flags(enum_get(store, ptr, prop), value, enum_mask(items))
    } else if !items.iter().any(|item| item.value == value) {
        strand_warn!("`{}`: {value} is not a declared enum value", prop.identifier);
        return false;
    } else {
        value
    };

    let PropertyKind::Enum { access, .. } = &prop.kind else { unreachable!() };
    let applied = if override_present(store, ptr, prop) {
        override_store(store, ptr, prop, Value::Int(value))
    } else {
        match access {
            ScalarAccess::Custom { set: Some(set), .. } => {
                set(store, ptr, value);
                true
            }
            ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
                Some((slot, offset)) => {
                    store.write_int_kind(slot, offset, &field.kind, value);
                    true
                }
                None => false,
            },
            _ => override_store(store, ptr, prop, Value::Int(value)),
        }
    };

    if applied {
        run_update(store, ptr, prop);
    }
    applied
}

pub fn enum_identifier(prop: &PropertyDef, value: i32) -> Option<&str> {
    match &prop.kind {
        PropertyKind::Enum { items, .. } => items
            .iter()
            .find(|item| item.value == value)
            .map(|item| item.identifier.as_str()),
        _ => None,
    }
}

pub fn enum_value(prop: &PropertyDef, identifier: &str) -> Option<i32> {
    match &prop.kind {
        PropertyKind::Enum { items, .. } => items
            .iter()
            .find(|item| item.identifier == identifier)
            .map(|item| item.value),
        _ => None,
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Pointer

pub fn pointer_get(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> Option<Ptr> {
    let PropertyKind::Pointer { access, .. } = &prop.kind else {
        kind_mismatch(prop, "pointer");
        return None;
    };

    if let Some(value) = override_lookup(store, ptr, prop) {
        return value.as_ref_slot().flatten().and_then(|slot| store.pointer(slot));
    }

    match access {
        ScalarAccess::Custom { get, .. } => get(store, ptr),
        ScalarAccess::Field(field) => {
            let (slot, offset) = store.field_addr(ptr, field)?;
            let target = store.read_ref(slot, offset)?;
            store.pointer(target)
        }
        _ => None,
    }
}

/// Pointer assignment with user-count bookkeeping.
///
/// `OWNING_USER` properties release the old target and claim the new one; `USER_ONE`
/// properties guarantee the new target has at least one real user.
pub fn pointer_set(store: &mut Store, ptr: &Ptr, prop: &PropertyDef, target: Option<Slot>) -> bool {
    let PropertyKind::Pointer { target: target_ty, .. } = &prop.kind else {
        kind_mismatch(prop, "pointer");
        return false;
    };
    let target_ty = *target_ty;

    if !editable(store, ptr, prop) {
        return false;
    }
    if target.is_none() && prop.flags.contains(PropertyFlags::NEVER_NULL) {
        strand_warn!("`{}` is never-null; assignment refused", prop.identifier);
        return false;
    }
    if let Some(slot) = target {
        let Some(ty) = store.type_of(slot) else {
            strand_warn!("`{}`: assigned a dead instance", prop.identifier);
            return false;
        };
        if !target_ty.is_none() && !store.registry().is_a(ty, target_ty) {
            strand_warn!(
                "`{}` expects `{target_ty}`, got `{ty}`",
                prop.identifier
            );
            return false;
        }
    }

    let old = pointer_get(store, ptr, prop).map(|p| p.slot);

    let PropertyKind::Pointer { access, .. } = &prop.kind else { unreachable!() };
    let applied = if override_present(store, ptr, prop) {
        override_store(store, ptr, prop, Value::Ref(target))
    } else {
        match access {
            ScalarAccess::Custom { set: Some(set), .. } => {
                set(store, ptr, target);
                true
            }
            ScalarAccess::Field(field) => match store.field_addr(ptr, field) {
                Some((slot, offset)) => {
                    store.write_ref(slot, offset, target);
                    true
                }
                None => false,
            },
            _ => override_store(store, ptr, prop, Value::Ref(target)),
        }
    };

    // Counts move in lockstep with the stored reference, so a write that found no
    // storage leaves them untouched.
    if applied {
        if prop.flags.contains(PropertyFlags::OWNING_USER) {
            if let Some(old) = old {
                store.user_min(old);
            }
            if let Some(new) = target {
                store.user_add(new);
            }
        } else if prop.flags.contains(PropertyFlags::USER_ONE) {
            if let Some(new) = target {
                store.user_ensure_real(new);
            }
        }
        run_update(store, ptr, prop);
    }
    applied
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Generic value access and override management

/// Reads any scalar or array property as a dynamic [`Value`].
///
/// Collections yield their override reference-array if present, an empty one otherwise;
/// iterate them through [`collection_begin`] for real traversal.
pub fn value_get(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> Value {
    if !matches!(prop.array, ArrayInfo::Scalar) {
        return match &prop.kind {
            PropertyKind::Int { .. } => {
                let mut buf = vec![0; array_len(store, ptr, prop)];
                int_array_get(store, ptr, prop, &mut buf);
                Value::IntArray(buf)
            }
            PropertyKind::Float { .. } => {
                let mut buf = vec![0.0; array_len(store, ptr, prop)];
                float_array_get(store, ptr, prop, &mut buf);
                Value::FloatArray(buf)
            }
            _ => Value::Bool(false), // build pass rejects other array kinds
        };
    }

    match &prop.kind {
        PropertyKind::Boolean { .. } => Value::Bool(bool_get(store, ptr, prop)),
        PropertyKind::Int { .. } => Value::Int(int_get(store, ptr, prop)),
        PropertyKind::Float { .. } => Value::Float(float_get(store, ptr, prop)),
        PropertyKind::String { .. } => Value::String(string_get(store, ptr, prop)),
        PropertyKind::Enum { .. } => Value::Int(enum_get(store, ptr, prop)),
        PropertyKind::Pointer { .. } => {
            Value::Ref(pointer_get(store, ptr, prop).map(|p| p.slot))
        }
        PropertyKind::Collection { .. } => {
            match override_lookup(store, ptr, prop) {
                Some(value) => value,
                None => Value::RefArray(Vec::new()),
            }
        }
    }
}

/// Whether the property is currently shadowed by a dynamic override.
pub fn is_overridden(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> bool {
    override_present(store, ptr, prop)
}

/// Drops the property's override, if any. Subsequent reads serve compiled storage.
pub fn unset(store: &mut Store, ptr: &Ptr, prop: &PropertyDef) -> bool {
    if !ptr.is_instance_root() {
        return false;
    }
    match store.id_props_mut(ptr.slot) {
        Some(props) => props.remove(&prop.identifier).is_some(),
        None => false,
    }
}

/// Resets the property to its declared default: removes the override and, when compiled
/// storage exists, writes the default through it.
pub fn reset(store: &mut Store, ptr: &Ptr, prop: &PropertyDef) -> bool {
    unset(store, ptr, prop);
    match &prop.kind {
        PropertyKind::Boolean { default, access } => {
            let default = *default;
            access.has_setter() && bool_set(store, ptr, prop, default)
        }
        PropertyKind::Int { range, access } => {
            let default = range.default;
            access.has_setter() && int_set(store, ptr, prop, default)
        }
        PropertyKind::Float { range, access } => {
            let default = range.default;
            access.has_setter() && float_set(store, ptr, prop, default)
        }
        PropertyKind::String { default, access, .. } => {
            let default = default.clone();
            access.has_setter() && string_set(store, ptr, prop, &default)
        }
        PropertyKind::Enum { default, access, .. } => {
            let default = *default;
            access.has_setter() && enum_set(store, ptr, prop, default)
        }
        PropertyKind::Pointer { .. } | PropertyKind::Collection { .. } => false,
    }
}

/// Synthesizes descriptors for override entries with no static counterpart.
///
/// External code may attach arbitrary values through the store's override map; this
/// makes them enumerable through the same descriptor-driven machinery, flagged as
/// id-property proxies.
pub fn runtime_properties(store: &Store, ptr: &Ptr) -> Vec<Arc<PropertyDef>> {
    if !ptr.is_instance_root() {
        return Vec::new();
    }

    let declared: std::collections::HashSet<String> = store
        .registry()
        .properties_of(ptr.ty)
        .iter()
        .map(|p| p.identifier.clone())
        .collect();

    let mut out = Vec::new();
    store.with_id_props(ptr.slot, |props| {
        for (key, value) in props.iter() {
            if declared.contains(key) {
                continue;
            }
            if let Some(def) = synthesize(key, value) {
                out.push(Arc::new(def));
            }
        }
    });
    out
}

fn synthesize(identifier: &str, value: &Value) -> Option<PropertyDef> {
    use crate::meta::{FloatRange, IntRange};

    let (kind, array) = match value {
        Value::Bool(_) => (
            PropertyKind::Boolean {
                default: false,
                access: ScalarAccess::Unbound,
            },
            ArrayInfo::Scalar,
        ),
        Value::Int(_) => (
            PropertyKind::Int {
                range: IntRange::default(),
                access: ScalarAccess::Unbound,
            },
            ArrayInfo::Scalar,
        ),
        Value::Float(_) | Value::Double(_) => (
            PropertyKind::Float {
                range: FloatRange::default(),
                access: ScalarAccess::Unbound,
            },
            ArrayInfo::Scalar,
        ),
        Value::String(_) => (
            PropertyKind::String {
                max_length: 0,
                default: String::new(),
                access: ScalarAccess::Unbound,
            },
            ArrayInfo::Scalar,
        ),
        Value::IntArray(items) => (
            PropertyKind::Int {
                range: IntRange::default(),
                access: ScalarAccess::Unbound,
            },
            ArrayInfo::Fixed(items.len().min(usize::from(u16::MAX)) as u16),
        ),
        Value::FloatArray(items) => (
            PropertyKind::Float {
                range: FloatRange::default(),
                access: ScalarAccess::Unbound,
            },
            ArrayInfo::Fixed(items.len().min(usize::from(u16::MAX)) as u16),
        ),
        Value::Ref(_) => (
            PropertyKind::Pointer {
                target: StructName::none(),
                access: ScalarAccess::Unbound,
            },
            ArrayInfo::Scalar,
        ),
        Value::RefArray(_) => (
            PropertyKind::Collection {
                target: StructName::none(),
                source: crate::meta::CollectionSource::Unbound,
            },
            ArrayInfo::Scalar,
        ),
        // Nested groups have no typed counterpart; reachable through the raw map only.
        Value::Group(_) => return None,
    };

    Some(PropertyDef {
        identifier: identifier.to_string(),
        name: identifier.to_string(),
        description: String::new(),
        kind,
        array,
        flags: PropertyFlags::default() | PropertyFlags::ID_PROPERTY,
        notify: 0,
        update: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_merge_preserves_foreign_bits() {
        // Field holds 0b1001 where only 0b0111 belongs to the enum.
        assert_eq!(merge_flags(0b1001, 0b0110, 0b0111), 0b1110);
        // Clearing all declared bits keeps the foreign one.
        assert_eq!(merge_flags(0b1001, 0, 0b0111), 0b1000);
    }
}
