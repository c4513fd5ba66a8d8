/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Collection iteration.
//!
//! One iterator type over four cursor shapes: linked lists threaded through element
//! layouts, inline arrays (struct or reference elements), dynamic reference-array
//! overrides, and materialized custom sequences. Elements come out as refined [`Ptr`]s
//! carrying the collection owner's ID.

use crate::builtin::Value;
use crate::meta::{CollectionSource, LenSource, PropertyDef, PropertyKind, StructName};
use crate::obj::{Ptr, Slot, Store};
use crate::strand_error;

use super::{override_lookup, string_get};

/// Element filter; `true` skips the element. Applied by the iterator, invisible to
/// length and lookup counts.
pub type SkipFn = fn(&Store, &Ptr) -> bool;

enum Cursor {
    Empty,
    List {
        current: Option<Slot>,
        next_offset: u32,
        ty: StructName,
    },
    Array {
        slot: Slot,
        offset: u32,
        stride: u32,
        index: u32,
        len: u32,
        deref: bool,
        ty: StructName,
    },
    Slots {
        items: Vec<Slot>,
        pos: usize,
    },
    Materialized {
        items: Vec<Ptr>,
        pos: usize,
    },
}

/// Iterator over a collection property's elements.
pub struct CollectionIter<'s> {
    store: &'s Store,
    owner_id: Option<Slot>,
    cursor: Cursor,
    skip: Option<SkipFn>,
}

impl<'s> CollectionIter<'s> {
    pub fn with_skip(mut self, skip: SkipFn) -> Self {
        self.skip = Some(skip);
        self
    }

    fn raw_next(&mut self) -> Option<Ptr> {
        match &mut self.cursor {
            Cursor::Empty => None,
            Cursor::List {
                current,
                next_offset,
                ty,
            } => {
                let slot = (*current)?;
                // A dead link terminates iteration instead of serving garbage.
                if self.store.instance(slot).is_none() {
                    *current = None;
                    return None;
                }
                *current = self.store.read_ref(slot, *next_offset);

                let ptr = Ptr {
                    owner_id: self.owner_id,
                    ty: *ty,
                    slot,
                    base: 0,
                };
                Some(self.store.refined(ptr))
            }
            Cursor::Array {
                slot,
                offset,
                stride,
                index,
                len,
                deref,
                ty,
            } => {
                while *index < *len {
                    let at = *offset + *stride * *index;
                    *index += 1;

                    if *deref {
                        // Null and dead entries are skipped, not served.
                        let Some(target) = self.store.read_ref(*slot, at) else {
                            continue;
                        };
                        let Some(mut ptr) = self.store.pointer(target) else {
                            continue;
                        };
                        ptr.owner_id = self.owner_id.or(ptr.owner_id);
                        return Some(ptr);
                    }

                    let ptr = Ptr {
                        owner_id: self.owner_id,
                        ty: *ty,
                        slot: *slot,
                        base: at,
                    };
                    return Some(self.store.refined(ptr));
                }
                None
            }
            Cursor::Slots { items, pos } => {
                while *pos < items.len() {
                    let slot = items[*pos];
                    *pos += 1;
                    if let Some(mut ptr) = self.store.pointer(slot) {
                        ptr.owner_id = self.owner_id.or(ptr.owner_id);
                        return Some(ptr);
                    }
                    // Dead references in a dynamic collection are skipped silently.
                }
                None
            }
            Cursor::Materialized { items, pos } => {
                let ptr = items.get(*pos).copied()?;
                *pos += 1;
                Some(ptr)
            }
        }
    }
}

impl Iterator for CollectionIter<'_> {
    type Item = Ptr;

    fn next(&mut self) -> Option<Ptr> {
        loop {
            let ptr = self.raw_next()?;
            match self.skip {
                Some(skip) if skip(self.store, &ptr) => continue,
                _ => return Some(ptr),
            }
        }
    }
}

/// Starts iteration over a collection property.
///
/// A dynamic reference-array override shadows compiled storage entirely, the same
/// precedence scalar reads have.
pub fn collection_begin<'s>(store: &'s Store, ptr: &Ptr, prop: &PropertyDef) -> CollectionIter<'s> {
    let PropertyKind::Collection { target, source } = &prop.kind else {
        super::kind_mismatch(prop, "collection");
        return empty(store, ptr);
    };

    if let Some(Value::RefArray(items)) = override_lookup(store, ptr, prop) {
        return CollectionIter {
            store,
            owner_id: ptr.owner_id,
            cursor: Cursor::Slots { items, pos: 0 },
            skip: None,
        };
    }

    let cursor = match source {
        CollectionSource::Unbound => Cursor::Empty,
        CollectionSource::List { head, next_offset } => {
            let current = store
                .field_addr(ptr, head)
                .and_then(|(slot, offset)| store.read_ref(slot, offset));
            Cursor::List {
                current,
                next_offset: *next_offset,
                ty: *target,
            }
        }
        CollectionSource::Array {
            field,
            stride,
            len,
            deref,
        } => match store.field_addr(ptr, field) {
            Some((slot, offset)) => Cursor::Array {
                slot,
                offset,
                stride: *stride,
                index: 0,
                len: resolve_len(store, ptr, len),
                deref: *deref,
                ty: *target,
            },
            None => Cursor::Empty,
        },
        CollectionSource::Custom { begin, .. } => Cursor::Materialized {
            items: begin(store, ptr),
            pos: 0,
        },
    };

    CollectionIter {
        store,
        owner_id: ptr.owner_id,
        cursor,
        skip: None,
    }
}

fn empty<'s>(store: &'s Store, ptr: &Ptr) -> CollectionIter<'s> {
    CollectionIter {
        store,
        owner_id: ptr.owner_id,
        cursor: Cursor::Empty,
        skip: None,
    }
}

pub(crate) fn resolve_len(store: &Store, ptr: &Ptr, len: &LenSource) -> u32 {
    match len {
        LenSource::Fixed(n) => *n,
        LenSource::Field(field) => store
            .field_addr(ptr, field)
            .map_or(0, |(slot, offset)| {
                store.read_int_kind(slot, offset, &field.kind).max(0) as u32
            }),
    }
}

/// Element count, using the declared O(1) strategy where one exists.
pub fn collection_length(store: &Store, ptr: &Ptr, prop: &PropertyDef) -> usize {
    let PropertyKind::Collection { source, .. } = &prop.kind else {
        super::kind_mismatch(prop, "collection");
        return 0;
    };

    if let Some(Value::RefArray(items)) = override_lookup(store, ptr, prop) {
        return items.len();
    }

    match source {
        CollectionSource::Array { len, .. } => resolve_len(store, ptr, len) as usize,
        CollectionSource::Custom {
            length: Some(length),
            ..
        } => length(store, ptr),
        // Lists (and customs without a length callback) walk.
        _ => collection_begin(store, ptr, prop).count(),
    }
}

/// Element at `index`, via callback or linear walk.
pub fn collection_lookup_index(
    store: &Store,
    ptr: &Ptr,
    prop: &PropertyDef,
    index: usize,
) -> Option<Ptr> {
    if let PropertyKind::Collection {
        source:
            CollectionSource::Custom {
                lookup_index: Some(lookup),
                ..
            },
        ..
    } = &prop.kind
    {
        if !super::is_overridden(store, ptr, prop) {
            return lookup(store, ptr, index);
        }
    }
    collection_begin(store, ptr, prop).nth(index)
}

/// Element whose designated name property equals `key`, via callback or linear walk.
pub fn collection_lookup_string(
    store: &Store,
    ptr: &Ptr,
    prop: &PropertyDef,
    key: &str,
) -> Option<Ptr> {
    if let PropertyKind::Collection {
        source:
            CollectionSource::Custom {
                lookup_name: Some(lookup),
                ..
            },
        ..
    } = &prop.kind
    {
        if !super::is_overridden(store, ptr, prop) {
            return lookup(store, ptr, key);
        }
    }

    let mut name_prop_cache: Option<(StructName, Option<std::sync::Arc<PropertyDef>>)> = None;
    for elem in collection_begin(store, ptr, prop) {
        let name_prop = match &name_prop_cache {
            Some((ty, cached)) if *ty == elem.ty => cached.clone(),
            _ => {
                let looked_up = store.registry().name_property_of(elem.ty);
                name_prop_cache = Some((elem.ty, looked_up.clone()));
                looked_up
            }
        };
        let Some(name_prop) = name_prop else {
            strand_error!("`{}` elements have no name property", elem.ty);
            return None;
        };
        if string_get(store, &elem, &name_prop) == key {
            return Some(elem);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::obj::Store;
    use crate::registry::{PropertyType, Registry};

    use super::*;

    // Compiled ref-array storage can only be filled through crate-internal writes,
    // so the dereferencing cursor is covered here rather than at the API surface.
    #[test]
    fn deref_array_skips_null_and_dead_entries() {
        let mut b = Registry::builder();
        b.define_layout("RefArrHolder", |l| {
            l.ref_array("items", 4).i32("count");
        });
        b.define_layout("RefArrNode", |l| {
            l.chars("name", 16);
        });
        b.define_struct("RefArrHolder", None, |s| {
            s.property("nodes", PropertyType::Collection, |p| {
                p.struct_type("RefArrNode")
                    .bind_ref_array("items", Some("count"));
            });
        });
        b.define_struct("RefArrNode", None, |_| {});

        let mut store = Store::new(b.build().expect("schema is sound"));
        let holder = store.create("RefArrHolder").expect("holder");
        let n0 = store.create("RefArrNode").expect("node");
        let n1 = store.create("RefArrNode").expect("node");
        let n3 = store.create("RefArrNode").expect("node");

        // Entry 2 stays null; entry 1 dies before iteration.
        store.write_ref(holder, 0, Some(n0));
        store.write_ref(holder, 8, Some(n1));
        store.write_ref(holder, 24, Some(n3));
        store.write_i32(holder, 32, 4);
        store.free(n1);

        let ptr = store.pointer(holder).expect("alive");
        let nodes = store
            .registry()
            .find_property(ptr.ty, "nodes")
            .expect("declared");

        let elems: Vec<Ptr> = collection_begin(&store, &ptr, &nodes).collect();
        assert_eq!(
            elems.iter().map(|e| e.slot).collect::<Vec<_>>(),
            [n0, n3]
        );
        // Length answers from the count field, not the live walk.
        assert_eq!(collection_length(&store, &ptr, &nodes), 4);
    }
}
