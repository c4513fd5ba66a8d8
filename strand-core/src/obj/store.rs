/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::cell::RefCell;
use std::sync::Arc;

use crate::builtin::{IdProperties, Value};
use crate::meta::layout::FieldKind;
use crate::meta::{ResolvedField, StructFlags, StructName, MAX_REFINE};
use crate::obj::{Ptr, Slot, REF_SIZE};
use crate::registry::Registry;
use crate::{strand_error, strand_warn};

/// Standard header carried by every identity (ID) block: the unit of naming, reference
/// counting and library linkage.
#[derive(Clone, Debug)]
pub struct IdHeader {
    pub name: String,
    pub users: u32,
    /// Data sourced from a read-only external library; writes through the access API no-op.
    pub library: bool,
}

pub(crate) struct Instance {
    pub(crate) ty: StructName,
    pub(crate) data: Vec<u8>,
    pub(crate) id: Option<IdHeader>,
    // RefCell so a schema-mismatched override can be discarded during a read (the
    // self-healing contract). The store is single-threaded by design.
    pub(crate) props: RefCell<Option<IdProperties>>,
}

struct Entry {
    generation: u32,
    inst: Option<Instance>,
}

/// Owns every reflected instance as a byte block in a generational-slot arena.
///
/// The embedding application holds exactly one `Store` per data universe and serializes
/// access to it; the reflection layer adds no internal synchronization. Instances are
/// addressed by [`Slot`]; freeing bumps the generation so stale handles read as dead.
pub struct Store {
    registry: Arc<Registry>,
    entries: Vec<Entry>,
    free: Vec<u32>,
}

impl Store {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            entries: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Lifecycle

    /// Allocates a plain (non-ID) instance of `ty`, zero-initialized.
    ///
    /// Returns `None` with a diagnostic for unknown types; ID types must go through
    /// [`create_id`][Self::create_id] so they get a header.
    pub fn create(&mut self, ty: &str) -> Option<Slot> {
        let (name, is_id) = self.check_type(ty)?;
        if is_id {
            strand_error!("`{ty}` is an ID type; use create_id");
            return None;
        }
        Some(self.alloc(name, None))
    }

    /// Allocates an identity block of `ty` with a store-unique name (suffixing `.001`
    /// style on collision) and a user count of 0.
    pub fn create_id(&mut self, ty: &str, name: &str) -> Option<Slot> {
        let (struct_name, is_id) = self.check_type(ty)?;
        if !is_id {
            strand_error!("`{ty}` is not an ID type");
            return None;
        }

        let unique = self.unique_id_name(struct_name, name);
        let header = IdHeader {
            name: unique,
            users: 0,
            library: false,
        };
        Some(self.alloc(struct_name, Some(header)))
    }

    fn check_type(&self, ty: &str) -> Option<(StructName, bool)> {
        let name = StructName::find(ty)?;
        match self.registry.struct_def(name) {
            Some(def) => Some((name, def.is_id())),
            None => {
                strand_error!("unknown struct type `{ty}`");
                None
            }
        }
    }

    fn alloc(&mut self, ty: StructName, id: Option<IdHeader>) -> Slot {
        let size = self
            .registry
            .struct_def(ty)
            .and_then(|def| def.layout)
            .and_then(|layout| self.registry.layout(layout))
            .map(|layout| layout.size as usize)
            .unwrap_or(0);

        let inst = Instance {
            ty,
            data: vec![0; size],
            id,
            props: RefCell::new(None),
        };

        match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.inst = Some(inst);
                Slot {
                    index,
                    generation: entry.generation,
                }
            }
            None => {
                let index = u32::try_from(self.entries.len()).expect("store exhausted");
                self.entries.push(Entry {
                    generation: 1,
                    inst: Some(inst),
                });
                Slot {
                    index,
                    generation: 1,
                }
            }
        }
    }

    /// Frees an instance. Attached overrides die with it; references held elsewhere become
    /// dead handles, not dangling memory.
    pub fn free(&mut self, slot: Slot) -> bool {
        match self.entries.get_mut(slot.index as usize) {
            Some(entry) if entry.generation == slot.generation && entry.inst.is_some() => {
                entry.inst = None;
                entry.generation += 1;
                self.free.push(slot.index);
                true
            }
            _ => false,
        }
    }

    pub fn is_alive(&self, slot: Slot) -> bool {
        self.instance(slot).is_some()
    }

    pub(crate) fn instance(&self, slot: Slot) -> Option<&Instance> {
        match self.entries.get(slot.index as usize) {
            Some(entry) if entry.generation == slot.generation => entry.inst.as_ref(),
            _ => None,
        }
    }

    fn instance_mut(&mut self, slot: Slot) -> Option<&mut Instance> {
        match self.entries.get_mut(slot.index as usize) {
            Some(entry) if entry.generation == slot.generation => entry.inst.as_mut(),
            _ => None,
        }
    }

    pub fn type_of(&self, slot: Slot) -> Option<StructName> {
        self.instance(slot).map(|inst| inst.ty)
    }

    /// All live ID blocks, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = Slot> + '_ {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            let inst = entry.inst.as_ref()?;
            inst.id.as_ref()?;
            Some(Slot {
                index: index as u32,
                generation: entry.generation,
            })
        })
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Pointers and refinement

    /// Builds a refined [`Ptr`] for a live instance.
    pub fn pointer(&self, slot: Slot) -> Option<Ptr> {
        let inst = self.instance(slot)?;
        let owner_id = inst.id.as_ref().map(|_| slot);
        let ptr = Ptr {
            owner_id,
            ty: inst.ty,
            slot,
            base: 0,
        };
        Some(self.refined(ptr))
    }

    /// Applies `refine` to a fixed point, bounded by [`MAX_REFINE`].
    pub(crate) fn refined(&self, mut ptr: Ptr) -> Ptr {
        for _ in 0..MAX_REFINE {
            let Some(def) = self.registry.struct_def(ptr.ty) else {
                return ptr;
            };
            let Some(refine) = def.refine else {
                return ptr;
            };

            let next = refine(self, &ptr);
            if next == ptr.ty || next.is_none() {
                return ptr;
            }
            ptr.ty = next;
        }

        // Not a data-driven condition: a refine chain that keeps narrowing is an
        // embedding bug. Stop at the last type rather than looping.
        strand_error!("refine exceeded {MAX_REFINE} steps for `{}`", ptr.ty);
        ptr
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // ID header bookkeeping

    pub fn id_name(&self, slot: Slot) -> Option<String> {
        self.instance(slot)?.id.as_ref().map(|h| h.name.clone())
    }

    /// Renames an ID block, re-uniquifying on collision.
    pub fn rename_id(&mut self, slot: Slot, name: &str) {
        let Some(ty) = self.type_of(slot) else { return };
        let unique = self.unique_id_name_excluding(ty, name, Some(slot));
        if let Some(header) = self.instance_mut(slot).and_then(|i| i.id.as_mut()) {
            header.name = unique;
        }
    }

    pub fn id_users(&self, slot: Slot) -> u32 {
        self.instance(slot)
            .and_then(|i| i.id.as_ref())
            .map_or(0, |h| h.users)
    }

    pub fn user_add(&mut self, slot: Slot) {
        if let Some(header) = self.instance_mut(slot).and_then(|i| i.id.as_mut()) {
            header.users += 1;
        }
    }

    pub fn user_min(&mut self, slot: Slot) {
        if let Some(header) = self.instance_mut(slot).and_then(|i| i.id.as_mut()) {
            if header.users == 0 {
                strand_warn!("user count of `{}` already 0", header.name);
            } else {
                header.users -= 1;
            }
        }
    }

    /// Guarantees at least one user without incrementing further (`USER_ONE` semantics).
    pub fn user_ensure_real(&mut self, slot: Slot) {
        if let Some(header) = self.instance_mut(slot).and_then(|i| i.id.as_mut()) {
            if header.users == 0 {
                header.users = 1;
            }
        }
    }

    pub fn set_library(&mut self, slot: Slot, library: bool) {
        if let Some(header) = self.instance_mut(slot).and_then(|i| i.id.as_mut()) {
            header.library = library;
        }
    }

    pub fn is_library(&self, slot: Slot) -> bool {
        self.instance(slot)
            .and_then(|i| i.id.as_ref())
            .is_some_and(|h| h.library)
    }

    /// Finds an ID block of type `ty` by its header name (exact match).
    pub fn find_id(&self, ty: &str, name: &str) -> Option<Slot> {
        let struct_name = StructName::find(ty)?;
        self.ids().find(|&slot| {
            self.instance(slot).is_some_and(|inst| {
                inst.ty == struct_name && inst.id.as_ref().is_some_and(|h| h.name == name)
            })
        })
    }

    fn unique_id_name(&self, ty: StructName, base: &str) -> String {
        self.unique_id_name_excluding(ty, base, None)
    }

    fn unique_id_name_excluding(&self, ty: StructName, base: &str, skip: Option<Slot>) -> String {
        let taken = |candidate: &str| {
            self.ids().any(|slot| {
                Some(slot) != skip
                    && self.instance(slot).is_some_and(|inst| {
                        inst.ty == ty && inst.id.as_ref().is_some_and(|h| h.name == candidate)
                    })
            })
        };

        if !taken(base) {
            return base.to_string();
        }
        for n in 1..1000 {
            let candidate = format!("{base}.{n:03}");
            if !taken(&candidate) {
                return candidate;
            }
        }
        strand_warn!("could not uniquify ID name `{base}`");
        base.to_string()
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Dynamic overrides (ID properties)

    fn idprops_allowed(&self, slot: Slot) -> bool {
        let Some(ty) = self.type_of(slot) else {
            return false;
        };
        match self.registry.struct_def(ty) {
            Some(def) => !def.flags.contains(StructFlags::NO_ID_PROPERTIES),
            None => false,
        }
    }

    /// Read access to an instance's overrides, if it has any.
    pub fn with_id_props<R>(&self, slot: Slot, f: impl FnOnce(&IdProperties) -> R) -> Option<R> {
        let inst = self.instance(slot)?;
        let props = inst.props.borrow();
        props.as_ref().map(f)
    }

    /// Mutable access to an instance's overrides, creating the map on first use.
    ///
    /// This is also the "behind the layer's back" entry point: external code may store
    /// arbitrary values here, and the access API will discard what violates the schema.
    pub fn id_props_mut(&mut self, slot: Slot) -> Option<&mut IdProperties> {
        if !self.idprops_allowed(slot) {
            return None;
        }
        let inst = self.instance_mut(slot)?;
        Some(inst.props.get_mut().get_or_insert_with(IdProperties::new))
    }

    pub(crate) fn override_clone(&self, slot: Slot, identifier: &str) -> Option<Value> {
        let inst = self.instance(slot)?;
        let props = inst.props.borrow();
        props.as_ref()?.get(identifier).cloned()
    }

    pub(crate) fn override_contains(&self, slot: Slot, identifier: &str) -> bool {
        self.with_id_props(slot, |props| props.contains(identifier))
            .unwrap_or(false)
    }

    /// Removes an override through a shared reference; the self-healing path for reads.
    pub(crate) fn override_discard(&self, slot: Slot, identifier: &str) {
        if let Some(inst) = self.instance(slot) {
            let mut props = inst.props.borrow_mut();
            if let Some(map) = props.as_mut() {
                map.remove(identifier);
            }
        }
    }

    pub(crate) fn override_insert(&mut self, slot: Slot, identifier: &str, value: Value) {
        match self.id_props_mut(slot) {
            Some(props) => {
                props.insert(identifier, value);
            }
            None => strand_warn!("instance cannot carry overrides; `{identifier}` dropped"),
        }
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Byte-block field access
    //
    // All reads degrade to zero and all writes to a no-op (with a diagnostic) when a
    // reference hop is null or a field range falls outside the block. These are the
    // data-driven conditions the access layer is specified to survive.

    /// Resolves a bound field against a pointer: follows reference hops, yielding the
    /// final (instance, byte offset) address. `None` on a null hop or dead handle.
    pub(crate) fn field_addr(&self, ptr: &Ptr, field: &ResolvedField) -> Option<(Slot, u32)> {
        let mut slot = ptr.slot;
        let mut base = ptr.base;

        for &hop in &field.hops {
            let target = self.read_ref(slot, base + hop)?;
            slot = target;
            base = 0;
        }

        Some((slot, base + field.offset))
    }

    fn bytes(&self, slot: Slot, offset: u32, len: u32) -> Option<&[u8]> {
        let inst = self.instance(slot)?;
        let start = offset as usize;
        let end = start + len as usize;
        let range = inst.data.get(start..end);
        if range.is_none() {
            strand_error!("field range {start}..{end} outside `{}` block", inst.ty);
        }
        range
    }

    fn bytes_mut(&mut self, slot: Slot, offset: u32, len: u32) -> Option<&mut [u8]> {
        let inst = self.instance_mut(slot)?;
        let ty = inst.ty;
        let start = offset as usize;
        let end = start + len as usize;
        let range = inst.data.get_mut(start..end);
        if range.is_none() {
            strand_error!("field range {start}..{end} outside `{ty}` block");
        }
        range
    }

    pub(crate) fn read_ref(&self, slot: Slot, offset: u32) -> Option<Slot> {
        let bytes = self.bytes(slot, offset, REF_SIZE)?;
        Slot::decode(bytes)
    }

    pub(crate) fn write_ref(&mut self, slot: Slot, offset: u32, value: Option<Slot>) {
        if let Some(bytes) = self.bytes_mut(slot, offset, REF_SIZE) {
            bytes.copy_from_slice(&Slot::encode(value));
        }
    }

    pub(crate) fn read_i32(&self, slot: Slot, offset: u32) -> i32 {
        self.bytes(slot, offset, 4)
            .map_or(0, |b| i32::from_le_bytes(b.try_into().expect("width")))
    }

    pub(crate) fn write_i32(&mut self, slot: Slot, offset: u32, value: i32) {
        if let Some(bytes) = self.bytes_mut(slot, offset, 4) {
            bytes.copy_from_slice(&value.to_le_bytes());
        }
    }

    pub(crate) fn read_f32(&self, slot: Slot, offset: u32) -> f32 {
        self.bytes(slot, offset, 4)
            .map_or(0.0, |b| f32::from_le_bytes(b.try_into().expect("width")))
    }

    pub(crate) fn write_f32(&mut self, slot: Slot, offset: u32, value: f32) {
        if let Some(bytes) = self.bytes_mut(slot, offset, 4) {
            bytes.copy_from_slice(&value.to_le_bytes());
        }
    }

    pub(crate) fn read_i64(&self, slot: Slot, offset: u32) -> i64 {
        self.bytes(slot, offset, 8)
            .map_or(0, |b| i64::from_le_bytes(b.try_into().expect("width")))
    }

    pub(crate) fn write_i64(&mut self, slot: Slot, offset: u32, value: i64) {
        if let Some(bytes) = self.bytes_mut(slot, offset, 8) {
            bytes.copy_from_slice(&value.to_le_bytes());
        }
    }

    pub(crate) fn read_f64(&self, slot: Slot, offset: u32) -> f64 {
        self.bytes(slot, offset, 8)
            .map_or(0.0, |b| f64::from_le_bytes(b.try_into().expect("width")))
    }

    pub(crate) fn write_f64(&mut self, slot: Slot, offset: u32, value: f64) {
        if let Some(bytes) = self.bytes_mut(slot, offset, 8) {
            bytes.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Widening integer read dispatched on the declared field shape.
    pub(crate) fn read_int_kind(&self, slot: Slot, offset: u32, kind: &FieldKind) -> i32 {
        match kind {
            FieldKind::I8 => self.bytes(slot, offset, 1).map_or(0, |b| b[0] as i8 as i32),
            FieldKind::I16 => self
                .bytes(slot, offset, 2)
                .map_or(0, |b| i16::from_le_bytes(b.try_into().expect("width")) as i32),
            FieldKind::I32 => self.read_i32(slot, offset),
            FieldKind::I64 => self
                .bytes(slot, offset, 8)
                .map_or(0, |b| i64::from_le_bytes(b.try_into().expect("width")) as i32),
            _ => {
                strand_error!("integer read from non-integer field");
                0
            }
        }
    }

    pub(crate) fn write_int_kind(&mut self, slot: Slot, offset: u32, kind: &FieldKind, value: i32) {
        match kind {
            FieldKind::I8 => {
                if let Some(bytes) = self.bytes_mut(slot, offset, 1) {
                    bytes[0] = value as i8 as u8;
                }
            }
            FieldKind::I16 => {
                if let Some(bytes) = self.bytes_mut(slot, offset, 2) {
                    bytes.copy_from_slice(&(value as i16).to_le_bytes());
                }
            }
            FieldKind::I32 => self.write_i32(slot, offset, value),
            FieldKind::I64 => {
                if let Some(bytes) = self.bytes_mut(slot, offset, 8) {
                    bytes.copy_from_slice(&i64::from(value).to_le_bytes());
                }
            }
            _ => strand_error!("integer write to non-integer field"),
        }
    }

    pub(crate) fn read_float_kind(&self, slot: Slot, offset: u32, kind: &FieldKind) -> f32 {
        match kind {
            FieldKind::F32 => self.read_f32(slot, offset),
            FieldKind::F64 => self
                .bytes(slot, offset, 8)
                .map_or(0.0, |b| f64::from_le_bytes(b.try_into().expect("width")) as f32),
            _ => {
                strand_error!("float read from non-float field");
                0.0
            }
        }
    }

    pub(crate) fn write_float_kind(&mut self, slot: Slot, offset: u32, kind: &FieldKind, value: f32) {
        match kind {
            FieldKind::F32 => self.write_f32(slot, offset, value),
            FieldKind::F64 => {
                if let Some(bytes) = self.bytes_mut(slot, offset, 8) {
                    bytes.copy_from_slice(&f64::from(value).to_le_bytes());
                }
            }
            _ => strand_error!("float write to non-float field"),
        }
    }

    /// Reads a fixed char field up to its NUL terminator.
    pub(crate) fn read_chars(&self, slot: Slot, offset: u32, capacity: u16) -> String {
        let Some(bytes) = self.bytes(slot, offset, u32::from(capacity)) else {
            return String::new();
        };
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    /// Writes a string into a fixed char field, truncating to capacity minus the
    /// terminator on a UTF-8 boundary.
    pub(crate) fn write_chars(&mut self, slot: Slot, offset: u32, capacity: u16, value: &str) {
        if capacity == 0 {
            return;
        }
        let Some(bytes) = self.bytes_mut(slot, offset, u32::from(capacity)) else {
            return;
        };
        let max = capacity as usize - 1;
        let mut len = value.len().min(max);
        while len > 0 && !value.is_char_boundary(len) {
            len -= 1;
        }

        bytes[..len].copy_from_slice(&value.as_bytes()[..len]);
        for byte in &mut bytes[len..] {
            *byte = 0;
        }
    }
}
