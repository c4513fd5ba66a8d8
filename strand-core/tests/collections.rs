/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

mod common;

use strand_core::access;
use strand_core::builtin::Value;
use strand_core::obj::{Ptr, Store};

fn names(store: &Store, elems: impl Iterator<Item = Ptr>) -> Vec<String> {
    elems
        .map(|e| {
            let name = common::prop(store, &e, "name");
            access::string_get(store, &e, &name)
        })
        .collect()
}

#[test]
fn list_collection_iterates_in_link_order() {
    let mut store = common::store();
    let obj = store.create_id("Object", "Cube").expect("object");
    common::add_modifier(&mut store, obj, "Bend");
    common::add_modifier(&mut store, obj, "Twist");
    common::add_modifier(&mut store, obj, "Wave");

    let ptr = store.pointer(obj).expect("alive");
    let mods = common::prop(&store, &ptr, "modifiers");

    let got = names(&store, access::collection_begin(&store, &ptr, &mods));
    assert_eq!(got, ["Bend", "Twist", "Wave"]);
    assert_eq!(access::collection_length(&store, &ptr, &mods), 3);

    // Elements carry their owning ID for path reconstruction.
    let first = access::collection_begin(&store, &ptr, &mods).next().expect("element");
    assert_eq!(first.owner_id, Some(obj));
}

#[test]
fn list_lookups_by_index_and_name() {
    let mut store = common::store();
    let obj = store.create_id("Object", "Cube").expect("object");
    common::add_modifier(&mut store, obj, "Bend");
    let twist = common::add_modifier(&mut store, obj, "Twist");

    let ptr = store.pointer(obj).expect("alive");
    let mods = common::prop(&store, &ptr, "modifiers");

    let second = access::collection_lookup_index(&store, &ptr, &mods, 1).expect("in range");
    assert_eq!(second.slot, twist);
    assert!(access::collection_lookup_index(&store, &ptr, &mods, 5).is_none());

    let by_name = access::collection_lookup_string(&store, &ptr, &mods, "Twist").expect("present");
    assert_eq!(by_name.slot, twist);
    assert!(access::collection_lookup_string(&store, &ptr, &mods, "Smooth").is_none());
}

fn skip_collapsed(store: &Store, elem: &Ptr) -> bool {
    let expanded = common::prop(store, elem, "show_expanded");
    !access::bool_get(store, elem, &expanded)
}

#[test]
fn skip_callback_filters_iteration_only() {
    let mut store = common::store();
    let obj = store.create_id("Object", "Cube").expect("object");
    common::add_modifier(&mut store, obj, "Bend");
    let twist = common::add_modifier(&mut store, obj, "Twist");

    let twist_ptr = store.pointer(twist).expect("alive");
    let expanded = common::prop(&store, &twist_ptr, "show_expanded");
    access::bool_set(&mut store, &twist_ptr, &expanded, true);

    let ptr = store.pointer(obj).expect("alive");
    let mods = common::prop(&store, &ptr, "modifiers");

    let iter = access::collection_begin(&store, &ptr, &mods).with_skip(skip_collapsed);
    let got = names(&store, iter);
    assert_eq!(got, ["Twist"]);
    // Length ignores the filter; it belongs to the iterator alone.
    assert_eq!(access::collection_length(&store, &ptr, &mods), 2);
}

#[test]
fn struct_array_elements_are_addressable_in_place() {
    let mut store = common::store();
    let mesh = common::mesh_with_verts(&mut store, "Grid", 3);
    let ptr = store.pointer(mesh).expect("alive");
    let verts = common::prop(&store, &ptr, "vertices");

    assert_eq!(access::collection_length(&store, &ptr, &verts), 3);

    // Each element is a window into the mesh block; writes land in the array.
    let elems: Vec<Ptr> = access::collection_begin(&store, &ptr, &verts).collect();
    for (i, vert) in elems.iter().enumerate() {
        let co = common::prop(&store, &vert, "co");
        assert!(access::float_array_set(&mut store, &vert, &co, &[i as f32, 0.0, 0.0]));
    }

    let second = access::collection_lookup_index(&store, &ptr, &verts, 1).expect("in range");
    let co = common::prop(&store, &second, "co");
    assert_eq!(access::float_index_get(&store, &second, &co, 0), 1.0);

    // Shrinking the length field shrinks the collection.
    let count = common::prop(&store, &ptr, "vertex_count");
    assert!(access::int_set(&mut store, &ptr, &count, 1));
    assert_eq!(access::collection_length(&store, &ptr, &verts), 1);

    // Vert has no designated name property, so string lookup misses cleanly.
    assert!(access::collection_lookup_string(&store, &ptr, &verts, "v0").is_none());
}

#[test]
fn ref_array_override_shadows_compiled_storage() {
    let mut store = common::store();
    let scene = store.create_id("Scene", "Main").expect("scene");
    let a = store.create_id("Object", "A").expect("object");
    let b = store.create_id("Object", "B").expect("object");

    store
        .id_props_mut(scene)
        .expect("override capable")
        .insert("objects", Value::RefArray(vec![a, b]));

    let ptr = store.pointer(scene).expect("alive");
    let objects = common::prop(&store, &ptr, "objects");

    let got = names(&store, access::collection_begin(&store, &ptr, &objects));
    assert_eq!(got, ["A", "B"]);
    assert_eq!(access::collection_length(&store, &ptr, &objects), 2);

    // A freed entry is skipped during iteration but still counted by length, which
    // reads the stored sequence as-is.
    store.free(a);
    let ptr = store.pointer(scene).expect("alive");
    let got = names(&store, access::collection_begin(&store, &ptr, &objects));
    assert_eq!(got, ["B"]);
    assert_eq!(access::collection_length(&store, &ptr, &objects), 2);
}

#[test]
fn custom_collection_materializes_its_elements() {
    let mut store = common::store();
    let scene = store.create_id("Scene", "Main").expect("scene");
    store.create_id("Object", "A").expect("object");
    store.create_id("Object", "B").expect("object");
    // Non-objects stay out of the answer.
    common::mesh_with_verts(&mut store, "Grid", 0);

    let ptr = store.pointer(scene).expect("alive");
    let all = common::prop(&store, &ptr, "all_objects");

    let got = names(&store, access::collection_begin(&store, &ptr, &all));
    assert_eq!(got, ["A", "B"]);
    assert_eq!(access::collection_length(&store, &ptr, &all), 2);

    let by_name = access::collection_lookup_string(&store, &ptr, &all, "B").expect("present");
    assert!(by_name.ty.eq_str("Object"));
}

#[test]
fn empty_collections_answer_cleanly() {
    let mut store = common::store();
    let obj = store.create_id("Object", "Cube").expect("object");
    let ptr = store.pointer(obj).expect("alive");
    let mods = common::prop(&store, &ptr, "modifiers");

    assert_eq!(access::collection_begin(&store, &ptr, &mods).count(), 0);
    assert_eq!(access::collection_length(&store, &ptr, &mods), 0);
    assert!(access::collection_lookup_index(&store, &ptr, &mods, 0).is_none());
    assert!(access::collection_lookup_string(&store, &ptr, &mods, "x").is_none());

    // A ref-array whose length field reads zero is empty.
    let scene = store.create_id("Scene", "Main").expect("scene");
    let scene_ptr = store.pointer(scene).expect("alive");
    let objects = common::prop(&store, &scene_ptr, "objects");
    assert_eq!(access::collection_length(&store, &scene_ptr, &objects), 0);
}
