/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Display stringification of property values.
//!
//! For debugging and UI, explicitly not round-trippable: booleans render as `true` and
//! `false`, numbers in plain decimal, strings quoted, enums by identifier, pointers as
//! an opaque placeholder, collections as an ordered sequence of element maps. Nesting
//! is depth-capped so cyclic graphs terminate.

use std::fmt::Write;

use crate::access;
use crate::meta::{ArrayInfo, PropertyDef, PropertyFlags, PropertyKind};
use crate::obj::{Ptr, Store};

const MAX_DEPTH: u32 = 4;

/// Renders one property of one instance.
pub fn stringify_property(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> String {
    property_with_depth(store, ptr, prop, 0)
}

/// Renders every exported property of an instance as a `{"identifier": value}` map.
pub fn stringify_struct(store: &Store, ptr: &Ptr) -> String {
    struct_with_depth(store, ptr, 0)
}

fn property_with_depth(store: &Store, ptr: &Ptr, prop: &PropertyDef, depth: u32) -> String {
    if !matches!(prop.array, ArrayInfo::Scalar) {
        return array_value(store, ptr, prop);
    }

    match &prop.kind {
        PropertyKind::Boolean { .. } => access::bool_get(store, ptr, prop).to_string(),
        PropertyKind::Int { .. } => access::int_get(store, ptr, prop).to_string(),
        PropertyKind::Float { .. } => format!("{:?}", access::float_get(store, ptr, prop)),
        PropertyKind::String { .. } => format!("{:?}", access::string_get(store, ptr, prop)),
        PropertyKind::Enum { items, flag, .. } => {
            let value = access::enum_get(store, ptr, prop);
            if *flag {
                let names: Vec<&str> = items
                    .iter()
                    .filter(|item| item.value != 0 && value & item.value == item.value)
                    .map(|item| item.identifier.as_str())
                    .collect();
                if names.is_empty() {
                    value.to_string()
                } else {
                    names.join("|")
                }
            } else {
                access::enum_identifier(prop, value)
                    .map_or_else(|| value.to_string(), str::to_string)
            }
        }
        PropertyKind::Pointer { .. } => match access::pointer_get(store, ptr, prop) {
            Some(_) => "<pointer>".to_string(),
            None => "<null>".to_string(),
        },
        PropertyKind::Collection { .. } => {
            if depth >= MAX_DEPTH {
                return "[...]".to_string();
            }
            let mut out = String::from("[");
            for (i, elem) in access::collection_begin(store, ptr, prop).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&struct_with_depth(store, &elem, depth + 1));
            }
            out.push(']');
            out
        }
    }
}

fn array_value(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> String {
    let len = access::array_len(store, ptr, prop);
    let mut out = String::from("[");
    match &prop.kind {
        PropertyKind::Int { .. } => {
            let mut buf = vec![0; len];
            access::int_array_get(store, ptr, prop, &mut buf);
            for (i, v) in buf.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{v}");
            }
        }
        PropertyKind::Float { .. } => {
            let mut buf = vec![0.0; len];
            access::float_array_get(store, ptr, prop, &mut buf);
            for (i, v) in buf.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{v:?}");
            }
        }
        _ => {}
    }
    out.push(']');
    out
}

fn struct_with_depth(store: &Store, ptr: &Ptr, depth: u32) -> String {
    if depth > MAX_DEPTH {
        return "{...}".to_string();
    }

    let mut out = String::from("{");
    let mut first = true;

    let statics = store.registry().properties_of(ptr.ty);
    let runtime = access::runtime_properties(store, ptr);
    for prop in statics.iter().chain(runtime.iter()) {
        if !prop.flags.contains(PropertyFlags::EXPORT) {
            continue;
        }
        if !first {
            out.push_str(", ");
        }
        first = false;
        let _ = write!(
            out,
            "{:?}: {}",
            prop.identifier,
            property_with_depth(store, ptr, prop, depth)
        );
    }
    out.push('}');
    out
}
