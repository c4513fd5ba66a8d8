/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Definition-time builder.
//!
//! Each data-type module declares its native layout, its struct descriptor and its
//! properties here, once, at startup, base structs before the structs inheriting from
//! them. Nothing is validated eagerly beyond duplicate identifiers; the heavy checks and
//! the accessor generation run in one pass at [`RegistryBuilder::build`], which reports
//! the complete error set instead of aborting on the first.

use std::collections::HashSet;
use std::sync::Arc;

use crate::meta::error::{BuildErrors, DefineError};
use crate::meta::layout::LayoutBuilder;
use crate::meta::{
    BoolGetFn, BoolSetFn, CollectionBeginFn, CollectionLengthFn, CollectionLookupIndexFn,
    CollectionLookupNameFn, EnumItem, FloatGetFn, FloatRange, FloatRangeFn, FloatSetFn, IntGetFn,
    IntRange, IntRangeFn, IntSetFn, PathFn, PointerGetFn, PointerSetFn, PropertyFlags, RefineFn,
    StringGetFn, StringSetFn, StructFlags, UpdateFn,
};
use crate::registry::Registry;

/// Kind tag given to [`StructBuilder::property`]; kind-specific configuration follows on
/// the property builder.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PropertyType {
    Boolean,
    Int,
    Float,
    String,
    Enum,
    Pointer,
    Collection,
}

#[derive(Clone, Debug)]
pub(crate) enum BindingSpec {
    None,
    /// Dotted field path, traversing inline structs and typed references.
    Field(String),
    Bit {
        field: String,
        bit: u8,
        negate: bool,
    },
    List {
        head: String,
        next: String,
    },
    ArrayField {
        field: String,
        /// Integer sibling field bounding the length; the declared capacity otherwise.
        len: Option<String>,
        deref: bool,
    },
}

#[derive(Clone, Debug)]
pub(crate) enum ArraySpec {
    Scalar,
    Fixed(u16),
    Dynamic { len_field: String },
}

#[derive(Default)]
pub(crate) struct CustomSpec {
    pub bool_get: Option<BoolGetFn>,
    pub bool_set: Option<BoolSetFn>,
    pub int_get: Option<IntGetFn>,
    pub int_set: Option<IntSetFn>,
    pub float_get: Option<FloatGetFn>,
    pub float_set: Option<FloatSetFn>,
    pub string_get: Option<StringGetFn>,
    pub string_set: Option<StringSetFn>,
    pub enum_get: Option<IntGetFn>,
    pub enum_set: Option<IntSetFn>,
    pub pointer_get: Option<PointerGetFn>,
    pub pointer_set: Option<PointerSetFn>,
    pub coll_begin: Option<CollectionBeginFn>,
    pub coll_length: Option<CollectionLengthFn>,
    pub coll_lookup_index: Option<CollectionLookupIndexFn>,
    pub coll_lookup_name: Option<CollectionLookupNameFn>,
}

impl CustomSpec {
    pub(crate) fn any_scalar(&self) -> bool {
        self.bool_get.is_some()
            || self.int_get.is_some()
            || self.float_get.is_some()
            || self.string_get.is_some()
            || self.enum_get.is_some()
            || self.pointer_get.is_some()
    }
}

pub(crate) struct PropertySpec {
    pub identifier: String,
    pub name: String,
    pub description: String,
    pub ty: PropertyType,
    pub flags: PropertyFlags,
    pub notify: u32,
    pub update: Option<UpdateFn>,
    pub array: ArraySpec,
    pub bool_default: bool,
    pub int_range: IntRange,
    pub float_range: FloatRange,
    pub string_max: Option<u16>,
    pub string_default: String,
    pub enum_items: Vec<EnumItem>,
    pub enum_flag: bool,
    pub enum_default: i32,
    pub target: Option<String>,
    pub binding: BindingSpec,
    pub custom: CustomSpec,
}

pub(crate) struct StructSpec {
    pub identifier: String,
    pub base: Option<String>,
    pub name: String,
    pub description: String,
    pub layout_name: Option<String>,
    pub flags: StructFlags,
    pub name_property: Option<String>,
    pub refine: Option<RefineFn>,
    pub path: Option<PathFn>,
    pub props: Vec<PropertySpec>,
}

/// Accumulates layout, struct and property declarations until [`build`][Self::build].
pub struct RegistryBuilder {
    pub(crate) layouts: Vec<LayoutBuilder>,
    pub(crate) structs: Vec<StructSpec>,
    pub(crate) errors: Vec<DefineError>,
    defined: HashSet<String>,
}

impl RegistryBuilder {
    pub(crate) fn new() -> Self {
        Self {
            layouts: Vec::new(),
            structs: Vec::new(),
            errors: Vec::new(),
            defined: HashSet::new(),
        }
    }

    /// Declares the byte layout of a native struct. By convention the layout shares the
    /// struct identifier; refined subtypes reuse their base's layout implicitly.
    pub fn define_layout(&mut self, name: &str, f: impl FnOnce(&mut LayoutBuilder)) {
        let mut builder = LayoutBuilder::new(name);
        f(&mut builder);
        self.layouts.push(builder);
    }

    /// Creates and registers a new struct descriptor. A duplicate identifier is a
    /// build-time error; the closure is skipped so the original definition stands.
    pub fn define_struct(
        &mut self,
        identifier: &str,
        base: Option<&str>,
        f: impl FnOnce(&mut StructBuilder),
    ) {
        if !self.defined.insert(identifier.to_string()) {
            self.errors.push(DefineError::DuplicateStruct {
                identifier: identifier.to_string(),
            });
            return;
        }

        let mut spec = StructSpec {
            identifier: identifier.to_string(),
            base: base.map(str::to_string),
            name: identifier.to_string(),
            description: String::new(),
            layout_name: None,
            flags: StructFlags::empty(),
            name_property: None,
            refine: None,
            path: None,
            props: Vec::new(),
        };

        let mut builder = StructBuilder {
            spec: &mut spec,
            errors: &mut self.errors,
        };
        f(&mut builder);

        self.structs.push(spec);
    }

    /// Validates everything, generates trivial accessors, sorts, and freezes.
    pub fn build(self) -> Result<Arc<Registry>, BuildErrors> {
        super::generate::build(self)
    }
}

/// Configures one struct descriptor during definition.
pub struct StructBuilder<'b> {
    pub(crate) spec: &'b mut StructSpec,
    pub(crate) errors: &'b mut Vec<DefineError>,
}

impl StructBuilder<'_> {
    pub fn display_name(&mut self, name: &str) -> &mut Self {
        self.spec.name = name.to_string();
        self
    }

    pub fn description(&mut self, text: &str) -> &mut Self {
        self.spec.description = text.to_string();
        self
    }

    pub fn flags(&mut self, flags: StructFlags) -> &mut Self {
        self.spec.flags |= flags;
        self
    }

    /// Overrides the layout association (default: a layout named like the struct, or the
    /// base's layout for refined subtypes).
    pub fn layout(&mut self, name: &str) -> &mut Self {
        self.spec.layout_name = Some(name.to_string());
        self
    }

    /// Designates the property producing a human label for instances.
    pub fn name_property(&mut self, identifier: &str) -> &mut Self {
        self.spec.name_property = Some(identifier.to_string());
        self
    }

    pub fn refine(&mut self, f: RefineFn) -> &mut Self {
        self.spec.refine = Some(f);
        self
    }

    pub fn path(&mut self, f: PathFn) -> &mut Self {
        self.spec.path = Some(f);
        self
    }

    /// Appends a property. A duplicate identifier within this struct is a build-time
    /// error (shadowing a base property is allowed and intentional).
    pub fn property(
        &mut self,
        identifier: &str,
        ty: PropertyType,
        f: impl FnOnce(&mut PropertyBuilder),
    ) {
        if self.spec.props.iter().any(|p| p.identifier == identifier) {
            self.errors.push(DefineError::DuplicateProperty {
                strukt: self.spec.identifier.clone(),
                identifier: identifier.to_string(),
            });
            return;
        }

        let mut prop = PropertySpec {
            identifier: identifier.to_string(),
            name: identifier.to_string(),
            description: String::new(),
            ty,
            flags: PropertyFlags::default(),
            notify: 0,
            update: None,
            array: ArraySpec::Scalar,
            bool_default: false,
            int_range: IntRange::default(),
            float_range: FloatRange::default(),
            string_max: None,
            string_default: String::new(),
            enum_items: Vec::new(),
            enum_flag: false,
            enum_default: 0,
            target: None,
            binding: BindingSpec::None,
            custom: CustomSpec::default(),
        };

        let mut builder = PropertyBuilder {
            spec: &mut prop,
            strukt: &self.spec.identifier,
            errors: self.errors,
        };
        f(&mut builder);

        self.spec.props.push(prop);
    }
}

/// Configures one property descriptor during definition.
///
/// Kind-specific methods on the wrong kind accumulate a build error instead of
/// panicking, so a module's full set of mistakes is reported in one run.
pub struct PropertyBuilder<'b> {
    pub(crate) spec: &'b mut PropertySpec,
    pub(crate) strukt: &'b str,
    pub(crate) errors: &'b mut Vec<DefineError>,
}

impl PropertyBuilder<'_> {
    fn bad(&mut self, detail: impl Into<String>) {
        self.errors.push(DefineError::BadDefinition {
            strukt: self.strukt.to_string(),
            property: self.spec.identifier.clone(),
            detail: detail.into(),
        });
    }

    fn expect_kind(&mut self, wanted: &[PropertyType], what: &str) -> bool {
        if wanted.contains(&self.spec.ty) {
            true
        } else {
            self.bad(format!("{what} does not apply to a {:?} property", self.spec.ty));
            false
        }
    }

    pub fn display_name(&mut self, name: &str) -> &mut Self {
        self.spec.name = name.to_string();
        self
    }

    pub fn description(&mut self, text: &str) -> &mut Self {
        self.spec.description = text.to_string();
        self
    }

    pub fn read_only(&mut self) -> &mut Self {
        self.spec.flags.remove(PropertyFlags::EDITABLE);
        self
    }

    pub fn animatable(&mut self) -> &mut Self {
        self.spec.flags |= PropertyFlags::ANIMATABLE;
        self
    }

    pub fn never_null(&mut self) -> &mut Self {
        self.spec.flags |= PropertyFlags::NEVER_NULL;
        self
    }

    pub fn not_exported(&mut self) -> &mut Self {
        self.spec.flags.remove(PropertyFlags::EXPORT);
        self
    }

    /// Marks the descriptor as a thin proxy over a dynamic value (no compiled field).
    pub fn id_property(&mut self) -> &mut Self {
        self.spec.flags |= PropertyFlags::ID_PROPERTY;
        self
    }

    /// Pointer assignment counts toward the target's user count.
    pub fn owning_user(&mut self) -> &mut Self {
        self.spec.flags |= PropertyFlags::OWNING_USER;
        self
    }

    /// Pointer assignment guarantees at least one user without incrementing further.
    pub fn user_one(&mut self) -> &mut Self {
        self.spec.flags |= PropertyFlags::USER_ONE;
        self
    }

    /// Change-notification hook invoked after each successful set.
    pub fn update(&mut self, notify: u32, f: Option<UpdateFn>) -> &mut Self {
        self.spec.notify = notify;
        self.spec.update = f;
        self
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Array shape

    pub fn array(&mut self, len: u16) -> &mut Self {
        if self.expect_kind(&[PropertyType::Int, PropertyType::Float], "an array shape") {
            self.spec.array = ArraySpec::Fixed(len);
        }
        self
    }

    /// Array whose length is read from a sibling field at access time.
    pub fn dynamic_array(&mut self, len_field: &str) -> &mut Self {
        if self.expect_kind(&[PropertyType::Int, PropertyType::Float], "an array shape") {
            self.spec.array = ArraySpec::Dynamic {
                len_field: len_field.to_string(),
            };
        }
        self
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Kind-specific configuration

    pub fn default_bool(&mut self, value: bool) -> &mut Self {
        if self.expect_kind(&[PropertyType::Boolean], "a boolean default") {
            self.spec.bool_default = value;
        }
        self
    }

    pub fn range_int(&mut self, hard_min: i32, hard_max: i32) -> &mut Self {
        if self.expect_kind(&[PropertyType::Int], "an integer range") {
            self.spec.int_range.hard_min = hard_min;
            self.spec.int_range.hard_max = hard_max;
            self.spec.int_range.soft_min = self.spec.int_range.soft_min.max(hard_min);
            self.spec.int_range.soft_max = self.spec.int_range.soft_max.min(hard_max);
        }
        self
    }

    pub fn soft_range_int(&mut self, soft_min: i32, soft_max: i32, step: i32) -> &mut Self {
        if self.expect_kind(&[PropertyType::Int], "an integer range") {
            self.spec.int_range.soft_min = soft_min;
            self.spec.int_range.soft_max = soft_max;
            self.spec.int_range.step = step;
        }
        self
    }

    pub fn default_int(&mut self, value: i32) -> &mut Self {
        if self.expect_kind(&[PropertyType::Int], "an integer default") {
            self.spec.int_range.default = value;
        }
        self
    }

    /// Per-instance hard range, consulted at set time instead of the static bounds.
    pub fn range_fn_int(&mut self, f: IntRangeFn) -> &mut Self {
        if self.expect_kind(&[PropertyType::Int], "an integer range") {
            self.spec.int_range.range_fn = Some(f);
        }
        self
    }

    pub fn range_float(&mut self, hard_min: f32, hard_max: f32) -> &mut Self {
        if self.expect_kind(&[PropertyType::Float], "a float range") {
            self.spec.float_range.hard_min = hard_min;
            self.spec.float_range.hard_max = hard_max;
            self.spec.float_range.soft_min = self.spec.float_range.soft_min.max(hard_min);
            self.spec.float_range.soft_max = self.spec.float_range.soft_max.min(hard_max);
        }
        self
    }

    pub fn soft_range_float(&mut self, soft_min: f32, soft_max: f32, step: f32, precision: u8) -> &mut Self {
        if self.expect_kind(&[PropertyType::Float], "a float range") {
            self.spec.float_range.soft_min = soft_min;
            self.spec.float_range.soft_max = soft_max;
            self.spec.float_range.step = step;
            self.spec.float_range.precision = precision;
        }
        self
    }

    pub fn default_float(&mut self, value: f32) -> &mut Self {
        if self.expect_kind(&[PropertyType::Float], "a float default") {
            self.spec.float_range.default = value;
        }
        self
    }

    pub fn range_fn_float(&mut self, f: FloatRangeFn) -> &mut Self {
        if self.expect_kind(&[PropertyType::Float], "a float range") {
            self.spec.float_range.range_fn = Some(f);
        }
        self
    }

    pub fn max_length(&mut self, max: u16) -> &mut Self {
        if self.expect_kind(&[PropertyType::String], "a string length") {
            self.spec.string_max = Some(max);
        }
        self
    }

    pub fn default_str(&mut self, value: &str) -> &mut Self {
        if self.expect_kind(&[PropertyType::String], "a string default") {
            self.spec.string_default = value.to_string();
        }
        self
    }

    /// Declares the enum's ordered `(value, identifier, display name)` items.
    pub fn enum_items(&mut self, items: &[(i32, &str, &str)]) -> &mut Self {
        if self.expect_kind(&[PropertyType::Enum], "enum items") {
            self.spec.enum_items = items
                .iter()
                .map(|&(value, identifier, name)| EnumItem {
                    value,
                    identifier: identifier.to_string(),
                    name: name.to_string(),
                })
                .collect();
        }
        self
    }

    /// Bit-flag semantics: values combine; sets merge into the backing field.
    pub fn enum_flag(&mut self) -> &mut Self {
        if self.expect_kind(&[PropertyType::Enum], "flag semantics") {
            self.spec.enum_flag = true;
        }
        self
    }

    pub fn default_enum(&mut self, value: i32) -> &mut Self {
        if self.expect_kind(&[PropertyType::Enum], "an enum default") {
            self.spec.enum_default = value;
        }
        self
    }

    /// Referenced struct type of a pointer or collection property.
    pub fn struct_type(&mut self, identifier: &str) -> &mut Self {
        if self.expect_kind(
            &[PropertyType::Pointer, PropertyType::Collection],
            "a target struct",
        ) {
            self.spec.target = Some(identifier.to_string());
        }
        self
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Field bindings

    /// Binds to a layout field by (dotted) name; the trivial accessor pair is generated
    /// at build time.
    pub fn bind(&mut self, field_path: &str) -> &mut Self {
        self.set_binding(BindingSpec::Field(field_path.to_string()));
        self
    }

    /// Boolean packed into a larger integer field at `bit`.
    pub fn bind_bit(&mut self, field: &str, bit: u8) -> &mut Self {
        if self.expect_kind(&[PropertyType::Boolean], "a bit binding") {
            self.set_binding(BindingSpec::Bit {
                field: field.to_string(),
                bit,
                negate: false,
            });
        }
        self
    }

    /// Bit binding with inverted polarity (stored 0 reads as true).
    pub fn bind_bit_negated(&mut self, field: &str, bit: u8) -> &mut Self {
        if self.expect_kind(&[PropertyType::Boolean], "a bit binding") {
            self.set_binding(BindingSpec::Bit {
                field: field.to_string(),
                bit,
                negate: true,
            });
        }
        self
    }

    /// Collection backed by a linked list: `head` is a reference field here, `next` the
    /// link field within the element's layout.
    pub fn bind_list(&mut self, head: &str, next: &str) -> &mut Self {
        if self.expect_kind(&[PropertyType::Collection], "a list binding") {
            self.set_binding(BindingSpec::List {
                head: head.to_string(),
                next: next.to_string(),
            });
        }
        self
    }

    /// Collection backed by an inline struct array; `len_field` (an integer sibling)
    /// bounds it, or the declared capacity when `None`.
    pub fn bind_struct_array(&mut self, field: &str, len_field: Option<&str>) -> &mut Self {
        if self.expect_kind(&[PropertyType::Collection], "an array binding") {
            self.set_binding(BindingSpec::ArrayField {
                field: field.to_string(),
                len: len_field.map(str::to_string),
                deref: false,
            });
        }
        self
    }

    /// Collection backed by an inline array of references.
    pub fn bind_ref_array(&mut self, field: &str, len_field: Option<&str>) -> &mut Self {
        if self.expect_kind(&[PropertyType::Collection], "an array binding") {
            self.set_binding(BindingSpec::ArrayField {
                field: field.to_string(),
                len: len_field.map(str::to_string),
                deref: true,
            });
        }
        self
    }

    fn set_binding(&mut self, binding: BindingSpec) {
        if !matches!(self.spec.binding, BindingSpec::None) {
            self.bad("bound twice");
            return;
        }
        self.spec.binding = binding;
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Custom accessors

    pub fn custom_bool(&mut self, get: BoolGetFn, set: Option<BoolSetFn>) -> &mut Self {
        if self.expect_kind(&[PropertyType::Boolean], "a boolean accessor") {
            self.spec.custom.bool_get = Some(get);
            self.spec.custom.bool_set = set;
        }
        self
    }

    pub fn custom_int(&mut self, get: IntGetFn, set: Option<IntSetFn>) -> &mut Self {
        if self.expect_kind(&[PropertyType::Int], "an integer accessor") {
            self.spec.custom.int_get = Some(get);
            self.spec.custom.int_set = set;
        }
        self
    }

    pub fn custom_float(&mut self, get: FloatGetFn, set: Option<FloatSetFn>) -> &mut Self {
        if self.expect_kind(&[PropertyType::Float], "a float accessor") {
            self.spec.custom.float_get = Some(get);
            self.spec.custom.float_set = set;
        }
        self
    }

    pub fn custom_string(&mut self, get: StringGetFn, set: Option<StringSetFn>) -> &mut Self {
        if self.expect_kind(&[PropertyType::String], "a string accessor") {
            self.spec.custom.string_get = Some(get);
            self.spec.custom.string_set = set;
        }
        self
    }

    pub fn custom_enum(&mut self, get: IntGetFn, set: Option<IntSetFn>) -> &mut Self {
        if self.expect_kind(&[PropertyType::Enum], "an enum accessor") {
            self.spec.custom.enum_get = Some(get);
            self.spec.custom.enum_set = set;
        }
        self
    }

    pub fn custom_pointer(&mut self, get: PointerGetFn, set: Option<PointerSetFn>) -> &mut Self {
        if self.expect_kind(&[PropertyType::Pointer], "a pointer accessor") {
            self.spec.custom.pointer_get = Some(get);
            self.spec.custom.pointer_set = set;
        }
        self
    }

    /// Fully custom collection iteration; `begin` materializes the element sequence,
    /// the optional callbacks provide O(1) length and direct lookups.
    pub fn custom_collection(
        &mut self,
        begin: CollectionBeginFn,
        length: Option<CollectionLengthFn>,
        lookup_index: Option<CollectionLookupIndexFn>,
        lookup_name: Option<CollectionLookupNameFn>,
    ) -> &mut Self {
        if self.expect_kind(&[PropertyType::Collection], "collection callbacks") {
            self.spec.custom.coll_begin = Some(begin);
            self.spec.custom.coll_length = length;
            self.spec.custom.coll_lookup_index = lookup_index;
            self.spec.custom.coll_lookup_name = lookup_name;
        }
        self
    }
}
