/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The registry build pass.
//!
//! Turns the declarative specs collected by [`RegistryBuilder`] into the frozen
//! [`Registry`]: resolves layouts, validates the inheritance graph, compiles field
//! bindings into [`ResolvedField`] accessors, injects the implicit `type_name` property,
//! sorts deterministically, and freezes. All schema errors are accumulated and returned
//! as one [`BuildErrors`] set.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::meta::error::{BuildErrors, DefineError};
use crate::meta::layout::{resolve_layouts, FieldKind, Layout};
use crate::meta::{
    ArrayInfo, BoolAccess, CollectionSource, FloatAccess, IntAccess, LenSource, PointerAccess,
    PropertyDef, PropertyFlags, PropertyKind, ResolvedField, ScalarAccess, StringAccess, StructDef,
    StructName, MAX_ARRAY_LEN,
};
use crate::obj::{Ptr, Store, REF_SIZE};
use crate::registry::builder::{
    ArraySpec, BindingSpec, PropertySpec, PropertyType, RegistryBuilder, StructSpec,
};
use crate::registry::Registry;

pub(super) fn build(builder: RegistryBuilder) -> Result<Arc<Registry>, BuildErrors> {
    let RegistryBuilder {
        layouts: layout_builders,
        structs: struct_specs,
        mut errors,
        ..
    } = builder;

    let declared_layouts: HashSet<StructName> = layout_builders
        .iter()
        .map(|b| StructName::new(&b.name))
        .collect();
    let layouts = resolve_layouts(layout_builders, &mut errors);

    let known: HashSet<String> = struct_specs.iter().map(|s| s.identifier.clone()).collect();

    // Pass 1: base validation and layout assignment, in declaration order (bases are
    // required to be declared before their subtypes).
    let mut assigned: HashMap<String, LayoutState> = HashMap::new();
    for spec in &struct_specs {
        let state = assign_layout(spec, &declared_layouts, &layouts, &assigned, &mut errors);
        assigned.insert(spec.identifier.clone(), state);
    }

    // Pass 2: property finalization and descriptor construction.
    let mut pass = Pass {
        layouts: &layouts,
        known: &known,
        assigned: &assigned,
        errors,
    };

    let mut defs: Vec<Arc<StructDef>> = Vec::with_capacity(struct_specs.len());
    for spec in struct_specs {
        defs.push(Arc::new(pass.finalize_struct(spec)));
    }
    let mut errors = pass.errors;

    let by_identifier: HashMap<StructName, usize> =
        defs.iter().enumerate().map(|(i, d)| (d.identifier, i)).collect();

    // Designated name properties must resolve somewhere on the chain.
    for def in &defs {
        let Some(designated) = &def.name_property else { continue };
        let mut current = Some(def.identifier);
        let mut found = false;
        while let Some(name) = current {
            let Some(&i) = by_identifier.get(&name) else { break };
            if defs[i].local_property(designated).is_some() {
                found = true;
                break;
            }
            current = defs[i].base;
        }
        if !found {
            errors.push(DefineError::UnknownNameProperty {
                strukt: def.identifier.to_owned_str(),
                property: designated.clone(),
            });
        }
    }

    if !errors.is_empty() {
        return Err(BuildErrors { errors });
    }

    defs.sort_by_key(|d| d.identifier.to_owned_str());
    let index_by_name = defs
        .iter()
        .enumerate()
        .map(|(i, d)| (d.identifier, i))
        .collect();

    Ok(Arc::new(Registry {
        structs: defs,
        index_by_name,
        layouts: layouts.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
    }))
}

/// Layout association of one struct after pass 1.
#[derive(Copy, Clone)]
enum LayoutState {
    None,
    /// Named a layout that failed to resolve; bindings are skipped, the failure was
    /// already reported.
    Broken,
    Ok(StructName),
}

fn assign_layout(
    spec: &StructSpec,
    declared: &HashSet<StructName>,
    layouts: &HashMap<StructName, Layout>,
    assigned: &HashMap<String, LayoutState>,
    errors: &mut Vec<DefineError>,
) -> LayoutState {
    if let Some(explicit) = &spec.layout_name {
        let name = StructName::new(explicit);
        if layouts.contains_key(&name) {
            return LayoutState::Ok(name);
        }
        if declared.contains(&name) {
            return LayoutState::Broken;
        }
        errors.push(DefineError::UnknownLayout {
            strukt: spec.identifier.clone(),
            layout: explicit.clone(),
        });
        return LayoutState::None;
    }

    // Implicit: a layout named like the struct, else the base's layout.
    let own = StructName::new(&spec.identifier);
    if layouts.contains_key(&own) {
        return LayoutState::Ok(own);
    }
    if declared.contains(&own) {
        return LayoutState::Broken;
    }

    if let Some(base) = &spec.base {
        match assigned.get(base) {
            Some(&state) => return state,
            None => {
                errors.push(DefineError::UnknownBase {
                    strukt: spec.identifier.clone(),
                    base: base.clone(),
                });
            }
        }
    }
    LayoutState::None
}

struct Pass<'a> {
    layouts: &'a HashMap<StructName, Layout>,
    known: &'a HashSet<String>,
    assigned: &'a HashMap<String, LayoutState>,
    errors: Vec<DefineError>,
}

impl Pass<'_> {
    fn finalize_struct(&mut self, spec: StructSpec) -> StructDef {
        let state = *self
            .assigned
            .get(&spec.identifier)
            .unwrap_or(&LayoutState::None);

        let mut properties: Vec<Arc<PropertyDef>> = spec
            .props
            .into_iter()
            .map(|p| Arc::new(self.finalize_property(&spec.identifier, state, p)))
            .collect();

        // Every root struct exposes its resolved type identifier; subtypes inherit it.
        if spec.base.is_none() && !properties.iter().any(|p| p.identifier == "type_name") {
            properties.push(Arc::new(type_name_property()));
        }

        sort_properties(&mut properties, spec.name_property.as_deref());

        StructDef {
            identifier: StructName::new(&spec.identifier),
            name: spec.name,
            description: spec.description,
            base: spec.base.map(|b| StructName::new(&b)),
            layout: match state {
                LayoutState::Ok(name) => Some(name),
                _ => None,
            },
            flags: spec.flags,
            name_property: spec.name_property,
            properties,
            refine: spec.refine,
            path: spec.path,
        }
    }

    fn finalize_property(
        &mut self,
        strukt: &str,
        layout: LayoutState,
        spec: PropertySpec,
    ) -> PropertyDef {
        let ctx = PropCtx {
            strukt,
            property: &spec.identifier,
            layout,
        };

        if spec.flags.contains(PropertyFlags::ID_PROPERTY)
            && (!matches!(spec.binding, BindingSpec::None) || spec.custom.any_scalar())
        {
            self.bad(&ctx, "an id-property proxy cannot also be bound or custom");
        }
        if spec.custom.any_scalar() && !matches!(spec.array, ArraySpec::Scalar) {
            self.bad(&ctx, "custom accessors apply to scalars only");
        }

        let array = self.finalize_array(&ctx, &spec.array);
        let kind = match spec.ty {
            PropertyType::Boolean => self.finalize_bool(&ctx, &spec),
            PropertyType::Int => self.finalize_int(&ctx, &spec, &array),
            PropertyType::Float => self.finalize_float(&ctx, &spec, &array),
            PropertyType::String => self.finalize_string(&ctx, &spec),
            PropertyType::Enum => self.finalize_enum(&ctx, &spec),
            PropertyType::Pointer => self.finalize_pointer(&ctx, &spec),
            PropertyType::Collection => self.finalize_collection(&ctx, &spec),
        };

        PropertyDef {
            identifier: spec.identifier.clone(),
            name: spec.name,
            description: spec.description,
            kind,
            array,
            flags: spec.flags,
            notify: spec.notify,
            update: spec.update,
        }
    }

    fn finalize_array(&mut self, ctx: &PropCtx<'_>, spec: &ArraySpec) -> ArrayInfo {
        match spec {
            ArraySpec::Scalar => ArrayInfo::Scalar,
            ArraySpec::Fixed(len) => {
                if *len > MAX_ARRAY_LEN {
                    self.errors.push(DefineError::ArrayTooLong {
                        strukt: ctx.strukt.to_string(),
                        property: ctx.property.to_string(),
                        len: u32::from(*len),
                        max: u32::from(MAX_ARRAY_LEN),
                    });
                }
                ArrayInfo::Fixed(*len)
            }
            ArraySpec::Dynamic { len_field } => {
                match self.resolve_int_field(ctx, len_field) {
                    Some(field) => ArrayInfo::Dynamic { len_field: field },
                    // Reported; degrade to a zero-length fixed shape.
                    None => ArrayInfo::Fixed(0),
                }
            }
        }
    }

    fn finalize_bool(&mut self, ctx: &PropCtx<'_>, spec: &PropertySpec) -> PropertyKind {
        let access: BoolAccess = if let Some(get) = spec.custom.bool_get {
            ScalarAccess::Custom {
                get,
                set: spec.custom.bool_set,
            }
        } else {
            match &spec.binding {
                BindingSpec::None => ScalarAccess::Unbound,
                BindingSpec::Field(path) => match self.resolve_int_field(ctx, path) {
                    Some(field) => ScalarAccess::Field(field),
                    None => ScalarAccess::Unbound,
                },
                BindingSpec::Bit { field, bit, negate } => {
                    match self.resolve_int_field(ctx, field) {
                        Some(resolved) => {
                            let width = int_bit_width(&resolved.kind);
                            if u32::from(*bit) >= width {
                                self.mismatch(
                                    ctx,
                                    field,
                                    format!("bit {bit} exceeds the field's {width} bits"),
                                );
                            }
                            ScalarAccess::Bit {
                                field: resolved,
                                bit: *bit,
                                negate: *negate,
                            }
                        }
                        None => ScalarAccess::Unbound,
                    }
                }
                _ => {
                    self.bad(ctx, "collection bindings do not apply to a boolean");
                    ScalarAccess::Unbound
                }
            }
        };

        PropertyKind::Boolean {
            default: spec.bool_default,
            access,
        }
    }

    fn finalize_int(
        &mut self,
        ctx: &PropCtx<'_>,
        spec: &PropertySpec,
        array: &ArrayInfo,
    ) -> PropertyKind {
        let access: IntAccess = if let Some(get) = spec.custom.int_get {
            ScalarAccess::Custom {
                get,
                set: spec.custom.int_set,
            }
        } else {
            self.numeric_field_access(ctx, spec, array, NumericShape::Int)
        };

        PropertyKind::Int {
            range: spec.int_range.clone(),
            access,
        }
    }

    fn finalize_float(
        &mut self,
        ctx: &PropCtx<'_>,
        spec: &PropertySpec,
        array: &ArrayInfo,
    ) -> PropertyKind {
        let access: FloatAccess = if let Some(get) = spec.custom.float_get {
            ScalarAccess::Custom {
                get,
                set: spec.custom.float_set,
            }
        } else {
            self.numeric_field_access(ctx, spec, array, NumericShape::Float)
        };

        PropertyKind::Float {
            range: spec.float_range.clone(),
            access,
        }
    }

    /// Shared scalar/array field binding for the two numeric kinds.
    fn numeric_field_access<G, S>(
        &mut self,
        ctx: &PropCtx<'_>,
        spec: &PropertySpec,
        array: &ArrayInfo,
        shape: NumericShape,
    ) -> ScalarAccess<G, S> {
        let path = match &spec.binding {
            BindingSpec::None => {
                if matches!(array, ArrayInfo::Dynamic { .. }) {
                    self.bad(ctx, "a dynamic array must be bound to a layout field");
                }
                return ScalarAccess::Unbound;
            }
            BindingSpec::Field(path) => path,
            _ => {
                self.bad(ctx, "only plain field bindings apply to a numeric property");
                return ScalarAccess::Unbound;
            }
        };
        let Some(field) = self.resolve_field(ctx, path) else {
            return ScalarAccess::Unbound;
        };

        let shape_ok = match array {
            ArrayInfo::Scalar => shape.scalar_ok(&field.kind),
            ArrayInfo::Fixed(len) => match shape.array_len(&field.kind) {
                Some(capacity) => {
                    if u32::from(*len) != capacity {
                        self.mismatch(
                            ctx,
                            path,
                            format!("declared length {len} but the field holds {capacity}"),
                        );
                    }
                    true
                }
                None => false,
            },
            ArrayInfo::Dynamic { .. } => shape.array_len(&field.kind).is_some(),
        };
        if !shape_ok {
            self.mismatch(ctx, path, format!("expected {}", shape.wanted(array)));
            return ScalarAccess::Unbound;
        }

        ScalarAccess::Field(field)
    }

    fn finalize_string(&mut self, ctx: &PropCtx<'_>, spec: &PropertySpec) -> PropertyKind {
        let mut max_length = spec.string_max.unwrap_or(0);
        let access: StringAccess = if let Some(get) = spec.custom.string_get {
            ScalarAccess::Custom {
                get,
                set: spec.custom.string_set,
            }
        } else {
            match &spec.binding {
                BindingSpec::None => ScalarAccess::Unbound,
                BindingSpec::Field(path) => match self.resolve_field(ctx, path) {
                    Some(field) => {
                        if let FieldKind::Char(capacity) = field.kind {
                            if max_length == 0 {
                                max_length = capacity;
                            }
                            ScalarAccess::Field(field)
                        } else {
                            self.mismatch(ctx, path, "expected fixed char storage".to_string());
                            ScalarAccess::Unbound
                        }
                    }
                    None => ScalarAccess::Unbound,
                },
                _ => {
                    self.bad(ctx, "only plain field bindings apply to a string");
                    ScalarAccess::Unbound
                }
            }
        };

        PropertyKind::String {
            max_length,
            default: spec.string_default.clone(),
            access,
        }
    }

    fn finalize_enum(&mut self, ctx: &PropCtx<'_>, spec: &PropertySpec) -> PropertyKind {
        if spec.enum_items.is_empty() {
            self.bad(ctx, "enum declares no items");
        }

        let access: IntAccess = if let Some(get) = spec.custom.enum_get {
            ScalarAccess::Custom {
                get,
                set: spec.custom.enum_set,
            }
        } else {
            match &spec.binding {
                BindingSpec::None => ScalarAccess::Unbound,
                BindingSpec::Field(path) => match self.resolve_int_field(ctx, path) {
                    Some(field) => ScalarAccess::Field(field),
                    None => ScalarAccess::Unbound,
                },
                _ => {
                    self.bad(ctx, "only plain field bindings apply to an enum");
                    ScalarAccess::Unbound
                }
            }
        };

        PropertyKind::Enum {
            items: spec.enum_items.clone(),
            flag: spec.enum_flag,
            default: spec.enum_default,
            access,
        }
    }

    fn finalize_pointer(&mut self, ctx: &PropCtx<'_>, spec: &PropertySpec) -> PropertyKind {
        let target = self.resolve_target(ctx, spec);

        let access: PointerAccess = if let Some(get) = spec.custom.pointer_get {
            ScalarAccess::Custom {
                get,
                set: spec.custom.pointer_set,
            }
        } else {
            match &spec.binding {
                BindingSpec::None => ScalarAccess::Unbound,
                BindingSpec::Field(path) => match self.resolve_field(ctx, path) {
                    Some(field) => {
                        if matches!(field.kind, FieldKind::Ref(_)) {
                            ScalarAccess::Field(field)
                        } else {
                            self.mismatch(ctx, path, "expected a reference field".to_string());
                            ScalarAccess::Unbound
                        }
                    }
                    None => ScalarAccess::Unbound,
                },
                _ => {
                    self.bad(ctx, "only plain field bindings apply to a pointer");
                    ScalarAccess::Unbound
                }
            }
        };

        PropertyKind::Pointer { target, access }
    }

    fn finalize_collection(&mut self, ctx: &PropCtx<'_>, spec: &PropertySpec) -> PropertyKind {
        let target = self.resolve_target(ctx, spec);

        let source = if let Some(begin) = spec.custom.coll_begin {
            CollectionSource::Custom {
                begin,
                length: spec.custom.coll_length,
                lookup_index: spec.custom.coll_lookup_index,
                lookup_name: spec.custom.coll_lookup_name,
            }
        } else {
            match &spec.binding {
                BindingSpec::List { head, next } => self.list_source(ctx, spec, head, next),
                BindingSpec::ArrayField { field, len, deref } => {
                    self.array_source(ctx, field, len.as_deref(), *deref)
                }
                BindingSpec::None if spec.flags.contains(PropertyFlags::ID_PROPERTY) => {
                    CollectionSource::Unbound
                }
                BindingSpec::None => {
                    self.errors.push(DefineError::CollectionWithoutStrategy {
                        strukt: ctx.strukt.to_string(),
                        property: ctx.property.to_string(),
                    });
                    CollectionSource::Unbound
                }
                _ => {
                    self.bad(ctx, "scalar bindings do not apply to a collection");
                    CollectionSource::Unbound
                }
            }
        };

        PropertyKind::Collection { target, source }
    }

    fn list_source(
        &mut self,
        ctx: &PropCtx<'_>,
        spec: &PropertySpec,
        head: &str,
        next: &str,
    ) -> CollectionSource {
        let Some(head_field) = self.resolve_field(ctx, head) else {
            return CollectionSource::Unbound;
        };
        if !matches!(head_field.kind, FieldKind::Ref(_)) {
            self.mismatch(ctx, head, "list head must be a reference field".to_string());
            return CollectionSource::Unbound;
        }

        // The link field lives in the element type's layout and must sit at a flat
        // offset there (no hops, no indirection).
        let Some(target) = &spec.target else {
            return CollectionSource::Unbound; // missing target already reported
        };
        let elem_layout = match self.assigned.get(target) {
            Some(LayoutState::Ok(name)) => *name,
            Some(LayoutState::Broken) => return CollectionSource::Unbound,
            _ => {
                self.bad(ctx, format!("list element `{target}` has no native layout"));
                return CollectionSource::Unbound;
            }
        };
        match resolve_field_path(self.layouts, elem_layout, next) {
            Ok(link) if link.hops.is_empty() && matches!(link.kind, FieldKind::Ref(_)) => {
                CollectionSource::List {
                    head: head_field,
                    next_offset: link.offset,
                }
            }
            Ok(_) => {
                self.mismatch(ctx, next, "list link must be a flat reference field".to_string());
                CollectionSource::Unbound
            }
            Err(fail) => {
                self.push_resolve_fail(ctx, fail);
                CollectionSource::Unbound
            }
        }
    }

    fn array_source(
        &mut self,
        ctx: &PropCtx<'_>,
        field: &str,
        len: Option<&str>,
        deref: bool,
    ) -> CollectionSource {
        let Some(resolved) = self.resolve_field(ctx, field) else {
            return CollectionSource::Unbound;
        };

        let (stride, capacity) = match (&resolved.kind, deref) {
            (FieldKind::StructArray { elem, count }, false) => {
                let Some(layout) = self.layouts.get(elem) else {
                    self.mismatch(ctx, field, format!("element layout `{elem}` is unresolved"));
                    return CollectionSource::Unbound;
                };
                (layout.size, u32::from(*count))
            }
            (FieldKind::RefArray(count), true) => (REF_SIZE, u32::from(*count)),
            (_, false) => {
                self.mismatch(ctx, field, "expected an inline struct array".to_string());
                return CollectionSource::Unbound;
            }
            (_, true) => {
                self.mismatch(ctx, field, "expected an inline reference array".to_string());
                return CollectionSource::Unbound;
            }
        };

        let len = match len {
            None => LenSource::Fixed(capacity),
            Some(path) => match self.resolve_int_field(ctx, path) {
                Some(len_field) => LenSource::Field(len_field),
                None => LenSource::Fixed(0),
            },
        };

        CollectionSource::Array {
            field: resolved,
            stride,
            len,
            deref,
        }
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Shared plumbing

    fn resolve_target(&mut self, ctx: &PropCtx<'_>, spec: &PropertySpec) -> StructName {
        match &spec.target {
            Some(target) if self.known.contains(target) => StructName::new(target),
            Some(target) => {
                self.errors.push(DefineError::UnknownTarget {
                    strukt: ctx.strukt.to_string(),
                    property: ctx.property.to_string(),
                    target: target.clone(),
                });
                StructName::none()
            }
            None => {
                self.bad(ctx, "missing target struct type");
                StructName::none()
            }
        }
    }

    fn resolve_field(&mut self, ctx: &PropCtx<'_>, path: &str) -> Option<ResolvedField> {
        let layout = match ctx.layout {
            LayoutState::Ok(name) => name,
            LayoutState::Broken => return None, // layout failure already reported
            LayoutState::None => {
                self.errors.push(DefineError::MissingLayout {
                    strukt: ctx.strukt.to_string(),
                    property: ctx.property.to_string(),
                });
                return None;
            }
        };
        match resolve_field_path(self.layouts, layout, path) {
            Ok(field) => Some(field),
            Err(fail) => {
                self.push_resolve_fail(ctx, fail);
                None
            }
        }
    }

    fn resolve_int_field(&mut self, ctx: &PropCtx<'_>, path: &str) -> Option<ResolvedField> {
        let field = self.resolve_field(ctx, path)?;
        if int_bit_width(&field.kind) == 0 {
            self.mismatch(ctx, path, "expected an integer field".to_string());
            return None;
        }
        Some(field)
    }

    fn push_resolve_fail(&mut self, ctx: &PropCtx<'_>, fail: ResolveFail) {
        let err = match fail {
            ResolveFail::UnknownLayout(layout) => DefineError::UnknownLayout {
                strukt: ctx.strukt.to_string(),
                layout,
            },
            ResolveFail::UnknownField { layout, field } => DefineError::UnknownField {
                strukt: ctx.strukt.to_string(),
                property: ctx.property.to_string(),
                layout,
                field,
            },
            ResolveFail::Mismatch { field, detail } => DefineError::FieldMismatch {
                strukt: ctx.strukt.to_string(),
                property: ctx.property.to_string(),
                field,
                detail,
            },
        };
        self.errors.push(err);
    }

    fn mismatch(&mut self, ctx: &PropCtx<'_>, field: &str, detail: String) {
        self.errors.push(DefineError::FieldMismatch {
            strukt: ctx.strukt.to_string(),
            property: ctx.property.to_string(),
            field: field.to_string(),
            detail,
        });
    }

    fn bad(&mut self, ctx: &PropCtx<'_>, detail: impl Into<String>) {
        self.errors.push(DefineError::BadDefinition {
            strukt: ctx.strukt.to_string(),
            property: ctx.property.to_string(),
            detail: detail.into(),
        });
    }
}

struct PropCtx<'a> {
    strukt: &'a str,
    property: &'a str,
    layout: LayoutState,
}

#[derive(Copy, Clone)]
enum NumericShape {
    Int,
    Float,
}

impl NumericShape {
    fn scalar_ok(self, kind: &FieldKind) -> bool {
        match self {
            NumericShape::Int => int_bit_width(kind) > 0,
            NumericShape::Float => matches!(kind, FieldKind::F32 | FieldKind::F64),
        }
    }

    fn array_len(self, kind: &FieldKind) -> Option<u32> {
        match (self, kind) {
            (NumericShape::Int, FieldKind::I32Array(n)) => Some(u32::from(*n)),
            (NumericShape::Float, FieldKind::F32Array(n)) => Some(u32::from(*n)),
            _ => None,
        }
    }

    fn wanted(self, array: &ArrayInfo) -> &'static str {
        match (self, matches!(array, ArrayInfo::Scalar)) {
            (NumericShape::Int, true) => "an integer field",
            (NumericShape::Int, false) => "an i32 array field",
            (NumericShape::Float, true) => "a float field",
            (NumericShape::Float, false) => "an f32 array field",
        }
    }
}

fn int_bit_width(kind: &FieldKind) -> u32 {
    match kind {
        FieldKind::I8 => 8,
        FieldKind::I16 => 16,
        FieldKind::I32 => 32,
        FieldKind::I64 => 64,
        _ => 0,
    }
}

enum ResolveFail {
    UnknownLayout(String),
    UnknownField { layout: String, field: String },
    Mismatch { field: String, detail: String },
}

/// Resolves a dotted field path against a layout into hops and a final offset.
///
/// Inline struct segments accumulate into the offset; typed reference segments become
/// hops (the offset restarts relative to the referenced instance).
fn resolve_field_path(
    layouts: &HashMap<StructName, Layout>,
    start: StructName,
    path: &str,
) -> Result<ResolvedField, ResolveFail> {
    let mut layout = layouts
        .get(&start)
        .ok_or_else(|| ResolveFail::UnknownLayout(start.to_owned_str()))?;

    let mut hops = Vec::new();
    let mut offset = 0u32;

    let segments: Vec<&str> = path.split('.').collect();
    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        let field = layout.field(segment).ok_or_else(|| ResolveFail::UnknownField {
            layout: layout.name.to_owned_str(),
            field: segment.to_string(),
        })?;

        if i == last {
            return Ok(ResolvedField {
                hops,
                offset: offset + field.offset,
                kind: field.kind.clone(),
            });
        }

        match &field.kind {
            FieldKind::Struct(elem) => {
                offset += field.offset;
                layout = layouts
                    .get(elem)
                    .ok_or_else(|| ResolveFail::UnknownLayout(elem.to_owned_str()))?;
            }
            FieldKind::Ref(Some(target)) => {
                hops.push(offset + field.offset);
                offset = 0;
                layout = layouts
                    .get(target)
                    .ok_or_else(|| ResolveFail::UnknownLayout(target.to_owned_str()))?;
            }
            FieldKind::Ref(None) => {
                return Err(ResolveFail::Mismatch {
                    field: segment.to_string(),
                    detail: "reference has no declared target layout".to_string(),
                });
            }
            _ => {
                return Err(ResolveFail::Mismatch {
                    field: segment.to_string(),
                    detail: "cannot traverse into a primitive field".to_string(),
                });
            }
        }
    }
    unreachable!("split produces at least one segment")
}

fn type_name_get(_store: &Store, ptr: &Ptr) -> String {
    ptr.ty.to_owned_str()
}

/// The implicit, read-only type identifier every root struct exposes.
fn type_name_property() -> PropertyDef {
    PropertyDef {
        identifier: "type_name".to_string(),
        name: "Type".to_string(),
        description: "Resolved struct type identifier of this instance".to_string(),
        kind: PropertyKind::String {
            max_length: 0,
            default: String::new(),
            access: ScalarAccess::Custom {
                get: type_name_get,
                set: None,
            },
        },
        array: ArrayInfo::Scalar,
        flags: PropertyFlags::empty(),
        notify: 0,
        update: None,
    }
}

/// Deterministic display order: designated name property first, `type_name` next,
/// everything else by display name then identifier.
fn sort_properties(properties: &mut [Arc<PropertyDef>], name_property: Option<&str>) {
    properties.sort_by(|a, b| {
        let rank = |p: &PropertyDef| {
            if name_property == Some(p.identifier.as_str()) {
                0
            } else if p.identifier == "type_name" {
                1
            } else {
                2
            }
        };
        rank(a)
            .cmp(&rank(b))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PropertyType;

    #[test]
    fn build_resolves_bindings_and_sorts() {
        let mut b = Registry::builder();
        b.define_layout("GenTestThing", |l| {
            l.chars("name", 64)
                .i32("flag")
                .f32_array("loc", 3)
                .nested("inner", "GenTestInner");
        });
        b.define_layout("GenTestInner", |l| {
            l.i32("depth");
        });
        b.define_struct("GenTestThing", None, |s| {
            s.name_property("name");
            s.property("name", PropertyType::String, |p| {
                p.display_name("Name").bind("name");
            });
            s.property("location", PropertyType::Float, |p| {
                p.display_name("Location").array(3).bind("loc");
            });
            s.property("depth", PropertyType::Int, |p| {
                p.display_name("Depth").bind("inner.depth");
            });
        });

        let registry = b.build().expect("clean build");
        let def = registry.find_struct("GenTestThing").unwrap();

        // Pinned order: name property, implicit type identifier, then display names.
        let idents: Vec<&str> = def.properties.iter().map(|p| p.identifier.as_str()).collect();
        assert_eq!(idents, ["name", "type_name", "depth", "location"]);

        let depth = def.local_property("depth").unwrap();
        match &depth.kind {
            PropertyKind::Int {
                access: ScalarAccess::Field(field),
                ..
            } => {
                // name(64) + flag(4) + loc(12) precede the nested struct.
                assert_eq!(field.offset, 80);
                assert!(field.hops.is_empty());
            }
            other => panic!("unexpected accessor: {other:?}"),
        }

        let name = def.local_property("name").unwrap();
        match &name.kind {
            PropertyKind::String { max_length, .. } => assert_eq!(*max_length, 64),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn errors_accumulate_into_one_report() {
        let mut b = Registry::builder();
        b.define_layout("GenTestBroken", |l| {
            l.i32("flag");
        });
        b.define_struct("GenTestBroken", None, |s| {
            s.property("missing", PropertyType::Int, |p| {
                p.bind("no_such_field");
            });
            s.property("huge", PropertyType::Float, |p| {
                p.array(40);
            });
            s.property("things", PropertyType::Collection, |p| {
                p.struct_type("GenTestBroken");
            });
        });

        let err = b.build().expect_err("broken build");
        assert!(err
            .errors
            .iter()
            .any(|e| matches!(e, DefineError::UnknownField { field, .. } if field == "no_such_field")));
        assert!(err
            .errors
            .iter()
            .any(|e| matches!(e, DefineError::ArrayTooLong { len: 40, .. })));
        assert!(err
            .errors
            .iter()
            .any(|e| matches!(e, DefineError::CollectionWithoutStrategy { .. })));
    }

    #[test]
    fn binding_through_typed_reference_produces_hops() {
        let mut b = Registry::builder();
        b.define_layout("GenTestOwner", |l| {
            l.i32("pad").reference_to("data", "GenTestData");
        });
        b.define_layout("GenTestData", |l| {
            l.i32("count");
        });
        b.define_struct("GenTestOwner", None, |s| {
            s.property("count", PropertyType::Int, |p| {
                p.bind("data.count");
            });
        });
        b.define_struct("GenTestData", None, |s| {
            s.property("count", PropertyType::Int, |p| {
                p.bind("count");
            });
        });

        let registry = b.build().expect("clean build");
        let def = registry.find_struct("GenTestOwner").unwrap();
        let prop = def.local_property("count").unwrap();
        match &prop.kind {
            PropertyKind::Int {
                access: ScalarAccess::Field(field),
                ..
            } => {
                assert_eq!(field.hops, vec![4]);
                assert_eq!(field.offset, 0);
            }
            other => panic!("unexpected accessor: {other:?}"),
        }
    }
}
