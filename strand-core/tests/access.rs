/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

mod common;

use std::sync::atomic::Ordering;

use glam::Vec3;

use strand_core::access;
use strand_core::builtin::Value;
use strand_core::meta::inspect;
use strand_core::obj::{Ptr, Store};

fn object(store: &mut Store, name: &str) -> Ptr {
    let slot = store.create_id("Object", name).expect("object");
    store.pointer(slot).expect("alive")
}

#[test]
fn scalar_sets_clamp_to_the_declared_range() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");

    let priority = common::prop(&store, &obj, "priority");
    assert!(access::int_set(&mut store, &obj, &priority, 99));
    assert_eq!(access::int_get(&store, &obj, &priority), 5);
    assert!(access::int_set(&mut store, &obj, &priority, -99));
    assert_eq!(access::int_get(&store, &obj, &priority), -5);
    assert_eq!(access::int_range(&store, &obj, &priority), (-5, 5));

    let weight = common::prop(&store, &obj, "weight");
    assert!(access::float_set(&mut store, &obj, &weight, -2.0));
    assert_eq!(access::float_get(&store, &obj, &weight), 0.0);
    assert!(access::float_set(&mut store, &obj, &weight, 0.25));
    assert_eq!(access::float_get(&store, &obj, &weight), 0.25);
}

#[test]
fn per_instance_range_callback_clamps_unbound_sets() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");

    // `clamped` has no compiled storage; the set lazily creates an override, after
    // clamping against the callback's bounds.
    let clamped = common::prop(&store, &obj, "clamped");
    assert_eq!(access::int_range(&store, &obj, &clamped), (0, 10));
    assert!(access::int_set(&mut store, &obj, &clamped, 50));
    assert_eq!(access::int_get(&store, &obj, &clamped), 10);
    assert!(access::is_overridden(&store, &obj, &clamped));
}

#[test]
fn float_array_round_trips_through_the_field() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");

    let location = common::prop(&store, &obj, "location");
    assert_eq!(access::array_len(&store, &obj, &location), 3);
    assert!(access::float_array_set(&mut store, &obj, &location, &[1.0, 2.0, 3.0]));

    let mut buf = [0.0f32; 3];
    assert_eq!(access::float_array_get(&store, &obj, &location, &mut buf), 3);
    assert_eq!(Vec3::from_array(buf), Vec3::new(1.0, 2.0, 3.0));

    assert!(access::float_index_set(&mut store, &obj, &location, 2, 9.0));
    assert_eq!(access::float_index_get(&store, &obj, &location, 2), 9.0);
    assert_eq!(access::float_index_get(&store, &obj, &location, 0), 1.0);

    // A length mismatch is refused outright.
    assert!(!access::float_array_set(&mut store, &obj, &location, &[1.0, 2.0]));
}

#[test]
fn int_array_round_trips_and_clamps() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");

    let layers = common::prop(&store, &obj, "layers");
    assert_eq!(access::array_len(&store, &obj, &layers), 4);
    assert!(access::int_array_set(&mut store, &obj, &layers, &[1, 12, -3, 5]));

    let mut buf = [0i32; 4];
    assert_eq!(access::int_array_get(&store, &obj, &layers, &mut buf), 4);
    assert_eq!(buf, [1, 9, 0, 5]);

    assert!(access::int_index_set(&mut store, &obj, &layers, 2, 4));
    assert_eq!(access::int_index_get(&store, &obj, &layers, 2), 4);

    assert!(!access::int_array_set(&mut store, &obj, &layers, &[1, 2]));
}

#[test]
fn bit_bound_booleans_share_one_field() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");

    let hide = common::prop(&store, &obj, "hide");
    let selectable = common::prop(&store, &obj, "selectable");

    // flag starts at 0: bit 0 clear, bit 1 clear (negated polarity reads true).
    assert!(!access::bool_get(&store, &obj, &hide));
    assert!(access::bool_get(&store, &obj, &selectable));

    assert!(access::bool_set(&mut store, &obj, &hide, true));
    assert!(access::bool_set(&mut store, &obj, &selectable, false));
    assert!(access::bool_get(&store, &obj, &hide));
    assert!(!access::bool_get(&store, &obj, &selectable));

    // Each write touched only its own bit.
    assert!(access::bool_set(&mut store, &obj, &selectable, true));
    assert!(access::bool_get(&store, &obj, &hide));
}

#[test]
fn enum_sets_validate_and_flag_enums_merge() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");

    let mode = common::prop(&store, &obj, "display_mode");
    assert!(access::enum_set(&mut store, &obj, &mode, 2));
    assert_eq!(access::enum_get(&store, &obj, &mode), 2);
    assert_eq!(access::enum_identifier(&mode, 2), Some("SOLID"));
    assert_eq!(access::enum_value(&mode, "WIRE"), Some(1));

    // 9 is not declared; the set is refused and the value stands.
    assert!(!access::enum_set(&mut store, &obj, &mode, 9));
    assert_eq!(access::enum_get(&store, &obj, &mode), 2);

    let draw = common::prop(&store, &obj, "draw_options");
    assert!(access::enum_set(&mut store, &obj, &draw, 1 | 2));
    assert_eq!(access::enum_get(&store, &obj, &draw), 3);
    // Flag sets replace the declared bits as a group.
    assert!(access::enum_set(&mut store, &obj, &draw, 4));
    assert_eq!(access::enum_get(&store, &obj, &draw), 4);
}

#[test]
fn custom_accessors_reach_the_id_header() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");

    let name = common::prop(&store, &obj, "name");
    assert_eq!(access::string_get(&store, &obj, &name), "Cube");
    assert!(access::string_set(&mut store, &obj, &name, "Box"));
    assert_eq!(store.id_name(obj.slot).as_deref(), Some("Box"));

    // Renaming onto a taken name re-uniquifies.
    let other = object(&mut store, "Lamp");
    assert!(access::string_set(&mut store, &other, &name, "Box"));
    assert_eq!(access::string_get(&store, &other, &name), "Box.001");

    let users = common::prop(&store, &obj, "users");
    assert_eq!(access::int_get(&store, &obj, &users), 0);
    // Read-only: no setter flag, the set is refused.
    assert!(!access::int_set(&mut store, &obj, &users, 7));
}

#[test]
fn update_hook_runs_only_on_applied_sets() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");
    let pass = common::prop(&store, &obj, "pass_index");

    let before = common::PASS_UPDATES.load(Ordering::Relaxed);
    assert!(access::int_set(&mut store, &obj, &pass, 7));
    assert!(access::int_set(&mut store, &obj, &pass, 8));

    store.set_library(obj.slot, true);
    assert!(!access::int_set(&mut store, &obj, &pass, 9));

    let after = common::PASS_UPDATES.load(Ordering::Relaxed);
    assert_eq!(after - before, 2);
}

#[test]
fn library_data_is_read_only() {
    let mut store = common::store();
    let mesh = common::mesh_with_verts(&mut store, "Plane", 4);
    store.set_library(mesh, true);

    let ptr = store.pointer(mesh).expect("alive");
    let count = common::prop(&store, &ptr, "vertex_count");
    assert!(!access::editable(&store, &ptr, &count));
    assert!(!access::int_set(&mut store, &ptr, &count, 8));
    assert_eq!(access::int_get(&store, &ptr, &count), 4);

    let is_library = common::prop(&store, &ptr, "is_library");
    assert!(access::bool_get(&store, &ptr, &is_library));
}

#[test]
fn valid_override_shadows_compiled_storage() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");
    let location = common::prop(&store, &obj, "location");
    assert!(access::float_array_set(&mut store, &obj, &location, &[1.0, 1.0, 1.0]));

    store
        .id_props_mut(obj.slot)
        .expect("override capable")
        .insert("location", Value::FloatArray(vec![9.0, 8.0, 7.0]));

    let mut buf = [0.0f32; 3];
    access::float_array_get(&store, &obj, &location, &mut buf);
    assert_eq!(buf, [9.0, 8.0, 7.0]);

    // While the override exists, writes land in it, not the field.
    assert!(access::float_index_set(&mut store, &obj, &location, 0, 5.0));
    assert_eq!(access::float_index_get(&store, &obj, &location, 0), 5.0);

    assert!(access::unset(&mut store, &obj, &location));
    access::float_array_get(&store, &obj, &location, &mut buf);
    assert_eq!(buf, [1.0, 1.0, 1.0]);
}

#[test]
fn schema_violating_override_is_discarded_on_read() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");
    let location = common::prop(&store, &obj, "location");
    assert!(access::float_array_set(&mut store, &obj, &location, &[1.0, 2.0, 3.0]));

    // Attached behind the layer's back, with the wrong type.
    store
        .id_props_mut(obj.slot)
        .expect("override capable")
        .insert("location", Value::String("bogus".into()));
    assert!(access::is_overridden(&store, &obj, &location));

    // The read discards it and serves compiled storage; the map has self-healed.
    let mut buf = [0.0f32; 3];
    access::float_array_get(&store, &obj, &location, &mut buf);
    assert_eq!(buf, [1.0, 2.0, 3.0]);
    assert!(!access::is_overridden(&store, &obj, &location));
}

#[test]
fn unbound_property_stores_lazily_and_resets() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");

    let note = common::prop(&store, &obj, "note");
    assert_eq!(access::string_get(&store, &obj, &note), "");
    assert!(!access::is_overridden(&store, &obj, &note));

    assert!(access::string_set(&mut store, &obj, &note, "rig me"));
    assert!(access::is_overridden(&store, &obj, &note));
    assert_eq!(access::string_get(&store, &obj, &note), "rig me");

    assert!(access::unset(&mut store, &obj, &note));
    assert_eq!(access::string_get(&store, &obj, &note), "");
}

#[test]
fn reset_restores_the_declared_default() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");

    let pass = common::prop(&store, &obj, "pass_index");
    assert!(access::int_set(&mut store, &obj, &pass, 50));
    store
        .id_props_mut(obj.slot)
        .expect("override capable")
        .insert("pass_index", Value::Int(77));

    assert!(access::reset(&mut store, &obj, &pass));
    assert!(!access::is_overridden(&store, &obj, &pass));
    assert_eq!(access::int_get(&store, &obj, &pass), 0);
}

#[test]
fn pointer_sets_enforce_type_and_move_user_counts() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");
    let mesh_a = common::mesh_with_verts(&mut store, "A", 0);
    let mesh_b = common::mesh_with_verts(&mut store, "B", 0);
    let armature = store.create_id("Armature", "Rig").expect("armature");

    let data = common::prop(&store, &obj, "data");
    // Wrong target type is refused.
    assert!(!access::pointer_set(&mut store, &obj, &data, Some(armature)));

    assert!(access::pointer_set(&mut store, &obj, &data, Some(mesh_a)));
    assert_eq!(store.id_users(mesh_a), 1);

    // Reassignment releases the old target and claims the new one.
    assert!(access::pointer_set(&mut store, &obj, &data, Some(mesh_b)));
    assert_eq!(store.id_users(mesh_a), 0);
    assert_eq!(store.id_users(mesh_b), 1);
    assert_eq!(
        access::pointer_get(&store, &obj, &data).map(|p| p.slot),
        Some(mesh_b)
    );

    assert!(access::pointer_set(&mut store, &obj, &data, None));
    assert_eq!(store.id_users(mesh_b), 0);
    assert!(access::pointer_get(&store, &obj, &data).is_none());

    // A freed instance is not assignable.
    store.free(mesh_a);
    assert!(!access::pointer_set(&mut store, &obj, &data, Some(mesh_a)));
}

#[test]
fn failed_pointer_write_leaves_user_counts_alone() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");
    let mesh = common::mesh_with_verts(&mut store, "A", 0);

    // Bound through `parent`, which is still null: the compiled write has nowhere to
    // land, so the owning-user bookkeeping must not run either.
    let pd = common::prop(&store, &obj, "parent_data");
    assert!(!access::pointer_set(&mut store, &obj, &pd, Some(mesh)));
    assert_eq!(store.id_users(mesh), 0);
    assert!(access::pointer_get(&store, &obj, &pd).is_none());

    let parent_slot = store.create_id("Object", "Parent").expect("object");
    let parent = common::prop(&store, &obj, "parent");
    assert!(access::pointer_set(&mut store, &obj, &parent, Some(parent_slot)));
    assert!(access::pointer_set(&mut store, &obj, &pd, Some(mesh)));
    assert_eq!(store.id_users(mesh), 1);
    assert_eq!(
        access::pointer_get(&store, &obj, &pd).map(|p| p.slot),
        Some(mesh)
    );
}

#[test]
fn user_one_pointers_guarantee_a_single_user() {
    let mut store = common::store();
    let child = object(&mut store, "Child");
    let parent_slot = store.create_id("Object", "Parent").expect("object");

    let parent = common::prop(&store, &child, "parent");
    assert!(access::pointer_set(&mut store, &child, &parent, Some(parent_slot)));
    assert_eq!(store.id_users(parent_slot), 1);

    // Re-assigning does not keep incrementing.
    assert!(access::pointer_set(&mut store, &child, &parent, Some(parent_slot)));
    assert_eq!(store.id_users(parent_slot), 1);
}

#[test]
fn never_null_pointer_refuses_null() {
    let mut store = common::store();
    let scene = store.create_id("Scene", "Main").expect("scene");
    let ptr = store.pointer(scene).expect("alive");
    let mesh = common::mesh_with_verts(&mut store, "A", 0);

    let world = common::prop(&store, &ptr, "world");
    assert!(!access::pointer_set(&mut store, &ptr, &world, None));

    // Unbound pointer storage goes through the override layer.
    assert!(access::pointer_set(&mut store, &ptr, &world, Some(mesh)));
    assert_eq!(
        access::pointer_get(&store, &ptr, &world).map(|p| p.slot),
        Some(mesh)
    );
}

#[test]
fn runtime_properties_surface_foreign_overrides() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");

    store
        .id_props_mut(obj.slot)
        .expect("override capable")
        .insert("my_tag", Value::Int(42));

    let runtime = access::runtime_properties(&store, &obj);
    let tag = runtime
        .iter()
        .find(|p| p.identifier == "my_tag")
        .expect("synthesized");
    assert!(tag.is_id_property());
    assert_eq!(access::int_get(&store, &obj, tag), 42);

    // Declared properties are never duplicated as runtime entries.
    store
        .id_props_mut(obj.slot)
        .expect("override capable")
        .insert("pass_index", Value::Int(3));
    let runtime = access::runtime_properties(&store, &obj);
    assert!(runtime.iter().all(|p| p.identifier != "pass_index"));
}

#[test]
fn value_get_covers_every_shape() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");
    let mesh = common::mesh_with_verts(&mut store, "A", 0);

    let location = common::prop(&store, &obj, "location");
    assert!(access::float_array_set(&mut store, &obj, &location, &[1.0, 2.0, 3.0]));
    assert_eq!(
        access::value_get(&store, &obj, &location),
        Value::FloatArray(vec![1.0, 2.0, 3.0])
    );

    let data = common::prop(&store, &obj, "data");
    assert!(access::pointer_set(&mut store, &obj, &data, Some(mesh)));
    assert_eq!(access::value_get(&store, &obj, &data), Value::Ref(Some(mesh)));

    let hide = common::prop(&store, &obj, "hide");
    assert_eq!(access::value_get(&store, &obj, &hide), Value::Bool(false));
}

#[test]
fn stringify_renders_for_humans() {
    let mut store = common::store();
    let obj = object(&mut store, "Cube");

    let location = common::prop(&store, &obj, "location");
    assert!(access::float_array_set(&mut store, &obj, &location, &[1.0, 2.5, 3.0]));
    assert_eq!(
        inspect::stringify_property(&store, &obj, &location),
        "[1.0, 2.5, 3.0]"
    );

    let mode = common::prop(&store, &obj, "display_mode");
    assert!(access::enum_set(&mut store, &obj, &mode, 1));
    assert_eq!(inspect::stringify_property(&store, &obj, &mode), "WIRE");

    let draw = common::prop(&store, &obj, "draw_options");
    assert!(access::enum_set(&mut store, &obj, &draw, 1 | 4));
    assert_eq!(inspect::stringify_property(&store, &obj, &draw), "AXES|SHADOW");

    let data = common::prop(&store, &obj, "data");
    assert_eq!(inspect::stringify_property(&store, &obj, &data), "<null>");

    let rendered = inspect::stringify_struct(&store, &obj);
    assert!(rendered.starts_with("{\"name\": \"Cube\""));
    assert!(rendered.contains("\"hide\": false"));
    // Unexported properties stay out of the map.
    assert!(!rendered.contains("first_modifier"));
}
