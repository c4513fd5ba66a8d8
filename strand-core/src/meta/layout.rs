/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Declared byte layouts of native structs.
//!
//! Every instance in a [`Store`][crate::obj::Store] is a plain byte block. A [`Layout`]
//! describes how a given struct type carves that block into fields: sized primitives,
//! fixed char arrays, encoded instance references, and nested structs. Property bindings
//! (`bind*` calls on the definition builder) refer to these fields by name; the accessor
//! generation pass resolves them into offsets once, at build time.

use std::collections::HashMap;

use crate::meta::error::DefineError;
use crate::meta::StructName;
use crate::obj::REF_SIZE;

/// Shape of one declared field.
#[derive(Clone, PartialEq, Debug)]
pub enum FieldKind {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Fixed-capacity, NUL-terminated string storage (`n` bytes total).
    Char(u16),
    /// Encoded reference to another instance (8 bytes, generation 0 = null). The target
    /// layout, when declared, lets bindings traverse the reference with a dotted path.
    Ref(Option<StructName>),
    I32Array(u16),
    F32Array(u16),
    /// One nested struct, stored inline.
    Struct(StructName),
    /// `count` nested structs stored inline with a common stride.
    StructArray { elem: StructName, count: u16 },
    /// `count` encoded references stored inline.
    RefArray(u16),
}

/// A resolved field: name, shape, byte offset within the owning layout.
#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub offset: u32,
}

/// Frozen byte layout of one native struct.
#[derive(Clone, Debug)]
pub struct Layout {
    pub name: StructName,
    pub fields: Vec<Field>,
    pub size: u32,
}

impl Layout {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Collects field declarations for one layout; offsets are computed at registry build.
pub struct LayoutBuilder {
    pub(crate) name: String,
    pub(crate) fields: Vec<(String, FieldKind)>,
}

impl LayoutBuilder {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    fn push(&mut self, name: &str, kind: FieldKind) -> &mut Self {
        self.fields.push((name.to_string(), kind));
        self
    }

    pub fn i8(&mut self, name: &str) -> &mut Self {
        self.push(name, FieldKind::I8)
    }

    pub fn i16(&mut self, name: &str) -> &mut Self {
        self.push(name, FieldKind::I16)
    }

    pub fn i32(&mut self, name: &str) -> &mut Self {
        self.push(name, FieldKind::I32)
    }

    pub fn i64(&mut self, name: &str) -> &mut Self {
        self.push(name, FieldKind::I64)
    }

    pub fn f32(&mut self, name: &str) -> &mut Self {
        self.push(name, FieldKind::F32)
    }

    pub fn f64(&mut self, name: &str) -> &mut Self {
        self.push(name, FieldKind::F64)
    }

    /// Fixed string storage of `capacity` bytes (including the NUL terminator).
    pub fn chars(&mut self, name: &str, capacity: u16) -> &mut Self {
        self.push(name, FieldKind::Char(capacity))
    }

    pub fn reference(&mut self, name: &str) -> &mut Self {
        self.push(name, FieldKind::Ref(None))
    }

    /// Reference with a declared target layout, so bindings can reach through it.
    pub fn reference_to(&mut self, name: &str, target: &str) -> &mut Self {
        self.push(name, FieldKind::Ref(Some(StructName::new(target))))
    }

    pub fn i32_array(&mut self, name: &str, len: u16) -> &mut Self {
        self.push(name, FieldKind::I32Array(len))
    }

    pub fn f32_array(&mut self, name: &str, len: u16) -> &mut Self {
        self.push(name, FieldKind::F32Array(len))
    }

    pub fn nested(&mut self, name: &str, elem: &str) -> &mut Self {
        self.push(name, FieldKind::Struct(StructName::new(elem)))
    }

    pub fn nested_array(&mut self, name: &str, elem: &str, count: u16) -> &mut Self {
        self.push(
            name,
            FieldKind::StructArray {
                elem: StructName::new(elem),
                count,
            },
        )
    }

    pub fn ref_array(&mut self, name: &str, count: u16) -> &mut Self {
        self.push(name, FieldKind::RefArray(count))
    }
}

/// Size of a field, given already-resolved nested layout sizes.
fn field_size(kind: &FieldKind, sizes: &HashMap<StructName, u32>) -> Option<u32> {
    let size = match kind {
        FieldKind::I8 => 1,
        FieldKind::I16 => 2,
        FieldKind::I32 | FieldKind::F32 => 4,
        FieldKind::I64 | FieldKind::F64 => 8,
        FieldKind::Char(n) => u32::from(*n),
        FieldKind::Ref(_) => REF_SIZE,
        FieldKind::I32Array(n) | FieldKind::F32Array(n) => 4 * u32::from(*n),
        FieldKind::Struct(elem) => *sizes.get(elem)?,
        FieldKind::StructArray { elem, count } => sizes.get(elem)? * u32::from(*count),
        FieldKind::RefArray(n) => REF_SIZE * u32::from(*n),
    };
    Some(size)
}

/// Resolves all collected layout declarations into frozen [`Layout`]s.
///
/// Nested struct fields require the nested layout's size, so resolution recurses with an
/// in-progress set for cycle detection. Errors accumulate; a layout that failed to resolve
/// is simply absent from the result (its dependents error out in turn).
pub(crate) fn resolve_layouts(
    builders: Vec<LayoutBuilder>,
    errors: &mut Vec<DefineError>,
) -> HashMap<StructName, Layout> {
    let mut specs: HashMap<StructName, &LayoutBuilder> = HashMap::new();
    for builder in &builders {
        let name = StructName::new(&builder.name);
        if specs.insert(name, builder).is_some() {
            errors.push(DefineError::DuplicateLayout {
                layout: builder.name.clone(),
            });
        }
    }

    // Sizes first (recursive), then offsets in a single linear pass per layout.
    let mut sizes: HashMap<StructName, u32> = HashMap::new();
    let order: Vec<StructName> = {
        let mut names: Vec<StructName> = specs.keys().copied().collect();
        names.sort();
        names
    };

    for name in &order {
        let mut in_progress = Vec::new();
        resolve_size(*name, &specs, &mut sizes, &mut in_progress, errors);
    }

    let mut layouts = HashMap::new();
    for name in order {
        let Some(spec) = specs.get(&name) else { continue };
        if !sizes.contains_key(&name) {
            continue; // already reported
        }

        let mut fields = Vec::with_capacity(spec.fields.len());
        let mut offset = 0;
        for (field_name, kind) in &spec.fields {
            let Some(size) = field_size(kind, &sizes) else { continue };
            fields.push(Field {
                name: field_name.clone(),
                kind: kind.clone(),
                offset,
            });
            offset += size;
        }

        layouts.insert(
            name,
            Layout {
                name,
                fields,
                size: offset,
            },
        );
    }

    layouts
}

fn resolve_size(
    name: StructName,
    specs: &HashMap<StructName, &LayoutBuilder>,
    sizes: &mut HashMap<StructName, u32>,
    in_progress: &mut Vec<StructName>,
    errors: &mut Vec<DefineError>,
) -> Option<u32> {
    if let Some(&size) = sizes.get(&name) {
        return Some(size);
    }
    if in_progress.contains(&name) {
        errors.push(DefineError::LayoutCycle {
            layout: name.to_owned_str(),
        });
        return None;
    }

    let Some(spec) = specs.get(&name) else {
        let owner = in_progress.last().copied().unwrap_or(name);
        errors.push(DefineError::UnknownLayout {
            strukt: owner.to_owned_str(),
            layout: name.to_owned_str(),
        });
        return None;
    };
    in_progress.push(name);

    let mut total = 0;
    let mut failed = false;
    for (_, kind) in &spec.fields {
        let nested = match kind {
            FieldKind::Struct(elem) => Some((*elem, 1)),
            FieldKind::StructArray { elem, count } => Some((*elem, u32::from(*count))),
            _ => None,
        };

        let size = match nested {
            Some((elem, count)) => {
                match resolve_size(elem, specs, sizes, in_progress, errors) {
                    Some(elem_size) => Some(elem_size * count),
                    None => {
                        failed = true;
                        None
                    }
                }
            }
            None => field_size(kind, sizes),
        };

        total += size.unwrap_or(0);
    }

    in_progress.pop();
    if failed {
        return None;
    }

    sizes.insert(name, total);
    Some(total)
}
