/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Generic "for each ID reference reachable from this block" traversal.
//!
//! Library-query style consumers (save, linking, refcount verification, remap after
//! deletion) walk the descriptor graph instead of knowing each type's fields. Pointer
//! and collection properties of a block are followed into nested non-ID data; every
//! reference landing on an identity block is reported with its ownership semantics.

use std::collections::HashSet;
use std::sync::Arc;

use bitflags::bitflags;

use crate::access;
use crate::builtin::Value;
use crate::meta::{CollectionSource, PropertyDef, PropertyFlags, PropertyKind, ScalarAccess};
use crate::obj::{Ptr, Slot, Store};

bitflags! {
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub struct VisitFlags: u32 {
        /// Traversal never writes back; remap answers are ignored.
        const READ_ONLY = 1 << 0;
        /// After reporting a referenced ID block, walk its references too.
        const RECURSE = 1 << 1;
    }
}

/// How a reference participates in ownership.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RefUsage {
    /// Counted: assignment and unassignment move the target's user count in lockstep.
    User,
    /// Guarantees at least one user without incrementing further.
    UserOne,
    /// Non-owning back-reference.
    Nop,
}

impl RefUsage {
    fn of(prop: &PropertyDef) -> RefUsage {
        if prop.flags.contains(PropertyFlags::OWNING_USER) {
            RefUsage::User
        } else if prop.flags.contains(PropertyFlags::USER_ONE) {
            RefUsage::UserOne
        } else {
            RefUsage::Nop
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VisitControl {
    Continue,
    Stop,
}

/// Read-only callback interface over reachable ID references.
pub trait IdVisitor {
    fn visit(
        &mut self,
        owner: &Ptr,
        prop: &PropertyDef,
        referenced: Slot,
        usage: RefUsage,
    ) -> VisitControl;
}

/// Answer of a read-write traversal callback for one reference.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum IdRemap {
    Keep,
    /// Replace the reference (user counts are adjusted per the usage semantics).
    Assign(Option<Slot>),
    Stop,
}

type Emit<'c> = dyn FnMut(&Ptr, &Arc<PropertyDef>, Slot, RefUsage) -> VisitControl + 'c;

/// Visits every ID reference reachable from `root`.
pub fn foreach_id(store: &Store, root: Slot, flags: VisitFlags, visitor: &mut dyn IdVisitor) {
    let mut emit = |owner: &Ptr, prop: &Arc<PropertyDef>, referenced: Slot, usage: RefUsage| {
        visitor.visit(owner, prop, referenced, usage)
    };
    walk(store, root, flags, &mut emit);
}

/// Read-write traversal: `f` may answer [`IdRemap::Assign`] to replace a reference.
///
/// Replacements are collected during the walk and applied afterwards, so the graph
/// being traversed never shifts underfoot. Remapping bypasses editability: pruning a
/// deleted block out of library data is administrative, not an edit. User counts move
/// only for replacements that actually land; a reference that cannot be rewritten
/// (custom collection, unwritable storage) keeps its counts.
pub fn foreach_id_mut(
    store: &mut Store,
    root: Slot,
    flags: VisitFlags,
    f: &mut dyn FnMut(&Ptr, &PropertyDef, Slot, RefUsage) -> IdRemap,
) {
    let read_only = flags.contains(VisitFlags::READ_ONLY);
    let mut remaps: Vec<(Ptr, Arc<PropertyDef>, Slot, Option<Slot>, RefUsage)> = Vec::new();

    let mut emit = |owner: &Ptr, prop: &Arc<PropertyDef>, referenced: Slot, usage: RefUsage| {
        match f(owner, prop, referenced, usage) {
            IdRemap::Keep => VisitControl::Continue,
            IdRemap::Assign(_) if read_only => VisitControl::Continue,
            IdRemap::Assign(new) => {
                remaps.push((*owner, Arc::clone(prop), referenced, new, usage));
                VisitControl::Continue
            }
            IdRemap::Stop => VisitControl::Stop,
        }
    };
    walk(store, root, flags, &mut emit);

    for (owner, prop, old, new, usage) in remaps {
        if !write_reference(store, &owner, &prop, old, new) {
            continue;
        }
        match usage {
            RefUsage::User => {
                store.user_min(old);
                if let Some(new) = new {
                    store.user_add(new);
                }
            }
            RefUsage::UserOne => {
                if let Some(new) = new {
                    store.user_ensure_real(new);
                }
            }
            RefUsage::Nop => {}
        }
    }
}

/// Rewrites one emitted reference without the access pipeline's editability gate.
/// Returns whether the write landed.
fn write_reference(
    store: &mut Store,
    ptr: &Ptr,
    prop: &PropertyDef,
    old: Slot,
    target: Option<Slot>,
) -> bool {
    match &prop.kind {
        PropertyKind::Pointer { .. } => write_pointer(store, ptr, prop, target),
        PropertyKind::Collection { source, .. } => {
            write_collection_ref(store, ptr, prop, source, old, target)
        }
        _ => false,
    }
}

fn write_pointer(store: &mut Store, ptr: &Ptr, prop: &PropertyDef, target: Option<Slot>) -> bool {
    if ptr.is_instance_root() && store.override_contains(ptr.slot, &prop.identifier) {
        store.override_insert(ptr.slot, &prop.identifier, Value::Ref(target));
        return true;
    }

    let PropertyKind::Pointer { access, .. } = &prop.kind else {
        return false;
    };
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
        _ => match store.id_props_mut(ptr.slot) {
            Some(props) => {
                props.insert(&prop.identifier, Value::Ref(target));
                true
            }
            None => false,
        },
    }
}

/// Replaces `old` inside a collection's storage. A `None` target removes the element
/// from a dynamic override, splices it out of a list, or nulls its array entry.
fn write_collection_ref(
    store: &mut Store,
    ptr: &Ptr,
    prop: &PropertyDef,
    source: &CollectionSource,
    old: Slot,
    target: Option<Slot>,
) -> bool {
    if ptr.is_instance_root() && store.override_contains(ptr.slot, &prop.identifier) {
        let Some(Value::RefArray(mut items)) = store.override_clone(ptr.slot, &prop.identifier)
        else {
            return false;
        };
        let Some(pos) = items.iter().position(|&slot| slot == old) else {
            return false;
        };
        match target {
            Some(new) => items[pos] = new,
            None => {
                items.remove(pos);
            }
        }
        store.override_insert(ptr.slot, &prop.identifier, Value::RefArray(items));
        return true;
    }

    match source {
        CollectionSource::Array {
            field,
            stride,
            len,
            deref: true,
        } => {
            let Some((slot, base)) = store.field_addr(ptr, field) else {
                return false;
            };
            let count = access::resolve_len(store, ptr, len);
            for i in 0..count {
                let at = base + stride * i;
                if store.read_ref(slot, at) == Some(old) {
                    store.write_ref(slot, at, target);
                    return true;
                }
            }
            false
        }
        CollectionSource::List { head, next_offset } => {
            let Some((mut link_slot, mut link_offset)) = store.field_addr(ptr, head) else {
                return false;
            };
            loop {
                let Some(elem) = store.read_ref(link_slot, link_offset) else {
                    return false;
                };
                if elem == old {
                    // The replacement inherits the chain position; it must share the
                    // element layout for its next field to line up.
                    let next = store.read_ref(elem, *next_offset);
                    match target {
                        Some(new) => {
                            store.write_ref(link_slot, link_offset, Some(new));
                            store.write_ref(new, *next_offset, next);
                        }
                        None => store.write_ref(link_slot, link_offset, next),
                    }
                    return true;
                }
                if store.instance(elem).is_none() {
                    return false;
                }
                link_slot = elem;
                link_offset = *next_offset;
            }
        }
        // Inline struct elements are never emitted as ID references; custom and
        // unbound sources have no writable storage.
        _ => false,
    }
}

fn walk(store: &Store, root: Slot, flags: VisitFlags, emit: &mut Emit<'_>) {
    let mut pending = vec![root];
    let mut visited_ids: HashSet<Slot> = HashSet::new();

    while let Some(id_slot) = pending.pop() {
        if !visited_ids.insert(id_slot) {
            continue;
        }
        let Some(ptr) = store.pointer(id_slot) else {
            continue;
        };

        let mut seen = HashSet::new();
        if walk_instance(store, &ptr, flags, emit, &mut pending, &mut seen) == VisitControl::Stop {
            return;
        }
    }
}

fn is_id_type(store: &Store, slot: Slot) -> bool {
    store
        .type_of(slot)
        .and_then(|ty| store.registry().struct_def(ty))
        .is_some_and(|def| def.is_id())
}

fn walk_instance(
    store: &Store,
    ptr: &Ptr,
    flags: VisitFlags,
    emit: &mut Emit<'_>,
    pending: &mut Vec<Slot>,
    seen: &mut HashSet<(Slot, u32)>,
) -> VisitControl {
    if !seen.insert((ptr.slot, ptr.base)) {
        return VisitControl::Continue; // cycle in nested non-ID data
    }

    let statics = store.registry().properties_of(ptr.ty);
    let runtime = access::runtime_properties(store, ptr);
    for prop in statics.iter().chain(runtime.iter()) {
        match &prop.kind {
            PropertyKind::Pointer { .. } => {
                let Some(target) = access::pointer_get(store, ptr, prop) else {
                    continue;
                };
                if is_id_type(store, target.slot) {
                    if emit(ptr, prop, target.slot, RefUsage::of(prop)) == VisitControl::Stop {
                        return VisitControl::Stop;
                    }
                    if flags.contains(VisitFlags::RECURSE) {
                        pending.push(target.slot);
                    }
                } else if walk_instance(store, &target, flags, emit, pending, seen)
                    == VisitControl::Stop
                {
                    return VisitControl::Stop;
                }
            }
            PropertyKind::Collection { .. } => {
                for elem in access::collection_begin(store, ptr, prop) {
                    if is_id_type(store, elem.slot) && elem.is_instance_root() {
                        if emit(ptr, prop, elem.slot, RefUsage::of(prop)) == VisitControl::Stop {
                            return VisitControl::Stop;
                        }
                        if flags.contains(VisitFlags::RECURSE) {
                            pending.push(elem.slot);
                        }
                    } else if walk_instance(store, &elem, flags, emit, pending, seen)
                        == VisitControl::Stop
                    {
                        return VisitControl::Stop;
                    }
                }
            }
            _ => {}
        }
    }
    VisitControl::Continue
}
