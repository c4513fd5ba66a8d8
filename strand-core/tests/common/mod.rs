/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Shared scene-graph fixture: a small content-creation schema (objects, meshes,
//! armatures, curves, scenes) exercising every binding strategy the registry supports.
//!
//! Each test builds its own registry and store; the struct-name intern table is
//! process-wide, so repeated builds are cheap and harmless.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use strand_core::access;
use strand_core::meta::{PropertyDef, StructFlags, StructName};
use strand_core::obj::{Ptr, Slot, Store};
use strand_core::path;
use strand_core::registry::{PropertyType, Registry};

/// Successful `pass_index` sets bump this; the update-hook test reads it.
pub static PASS_UPDATES: AtomicUsize = AtomicUsize::new(0);

fn pass_update(_store: &mut Store, _ptr: &Ptr) {
    PASS_UPDATES.fetch_add(1, Ordering::Relaxed);
}

fn id_name_get(store: &Store, ptr: &Ptr) -> String {
    store.id_name(ptr.slot).unwrap_or_default()
}

fn id_name_set(store: &mut Store, ptr: &Ptr, value: &str) {
    store.rename_id(ptr.slot, value);
}

fn id_users_get(store: &Store, ptr: &Ptr) -> i32 {
    store.id_users(ptr.slot) as i32
}

fn id_library_get(store: &Store, ptr: &Ptr) -> bool {
    store.is_library(ptr.slot)
}

fn clamped_range(_store: &Store, _ptr: &Ptr) -> (i32, i32) {
    (0, 10)
}

/// A `Curve` whose `kind` field reads 1 is really a `TextCurve`.
fn curve_refine(store: &Store, ptr: &Ptr) -> StructName {
    let Some(kind) = store.registry().find_property(ptr.ty, "kind") else {
        return ptr.ty;
    };
    if access::int_get(store, ptr, &kind) == 1 {
        StructName::new("TextCurve")
    } else {
        ptr.ty
    }
}

/// Addresses a modifier from its owning object by position in the list.
fn modifier_path(store: &Store, ptr: &Ptr) -> Option<String> {
    let owner = store.pointer(ptr.owner_id?)?;
    let mods = store.registry().find_property(owner.ty, "modifiers")?;
    let index = access::collection_begin(store, &owner, &mods).position(|m| m.slot == ptr.slot)?;
    Some(path::append_index("", &mods, index))
}

fn scene_all_objects(store: &Store, _ptr: &Ptr) -> Vec<Ptr> {
    let object = StructName::new("Object");
    store
        .ids()
        .filter(|&slot| {
            store
                .type_of(slot)
                .is_some_and(|ty| store.registry().is_a(ty, object))
        })
        .filter_map(|slot| store.pointer(slot))
        .collect()
}

fn scene_all_objects_len(store: &Store, ptr: &Ptr) -> usize {
    scene_all_objects(store, ptr).len()
}

pub fn registry() -> Arc<Registry> {
    let mut b = Registry::builder();

    b.define_layout("Object", |l| {
        l.i32("flag")
            .f32_array("loc", 3)
            .i32("mode")
            .i32("draw")
            .i32("pass")
            .i32("prio")
            .f32("weight")
            .reference("data")
            .reference_to("parent", "Object")
            .reference("mod_head")
            .i32_array("layers", 4);
    });
    b.define_layout("Modifier", |l| {
        l.chars("name", 64).i32("flag").reference("next");
    });
    b.define_layout("Vert", |l| {
        l.f32_array("co", 3).i32("flag").f32("weight");
    });
    b.define_layout("Mesh", |l| {
        l.i32("totvert").nested_array("verts", "Vert", 1000);
    });
    b.define_layout("Armature", |l| {
        l.reference("bone_head");
    });
    b.define_layout("Bone", |l| {
        l.chars("name", 64).reference("next").f32("roll");
    });
    b.define_layout("Curve", |l| {
        l.i32("kind").f32("size");
    });
    b.define_layout("Scene", |l| {
        l.ref_array("objects", 8).i32("totobj");
    });

    // The identity base: name, user count and library flag live in the store's ID
    // header, exposed through custom accessors.
    b.define_struct("ID", None, |s| {
        s.flags(StructFlags::IS_ID).name_property("name");
        s.property("name", PropertyType::String, |p| {
            p.display_name("Name")
                .custom_string(id_name_get, Some(id_name_set));
        });
        s.property("users", PropertyType::Int, |p| {
            p.display_name("Users").read_only().custom_int(id_users_get, None);
        });
        s.property("is_library", PropertyType::Boolean, |p| {
            p.display_name("Library")
                .read_only()
                .custom_bool(id_library_get, None);
        });
    });

    b.define_struct("Object", Some("ID"), |s| {
        s.flags(StructFlags::IS_ID);
        s.property("location", PropertyType::Float, |p| {
            p.display_name("Location").animatable().array(3).bind("loc");
        });
        s.property("hide", PropertyType::Boolean, |p| {
            p.display_name("Hide").bind_bit("flag", 0);
        });
        s.property("selectable", PropertyType::Boolean, |p| {
            p.display_name("Selectable").bind_bit_negated("flag", 1);
        });
        s.property("display_mode", PropertyType::Enum, |p| {
            p.display_name("Display Mode")
                .enum_items(&[(0, "BOUNDS", "Bounds"), (1, "WIRE", "Wire"), (2, "SOLID", "Solid")])
                .default_enum(0)
                .bind("mode");
        });
        s.property("draw_options", PropertyType::Enum, |p| {
            p.display_name("Draw Options")
                .enum_items(&[(1, "AXES", "Axes"), (2, "NAME", "Name"), (4, "SHADOW", "Shadow")])
                .enum_flag()
                .bind("draw");
        });
        s.property("pass_index", PropertyType::Int, |p| {
            p.display_name("Pass Index")
                .range_int(0, 100)
                .bind("pass")
                .update(1, Some(pass_update));
        });
        s.property("priority", PropertyType::Int, |p| {
            p.display_name("Priority").range_int(-5, 5).bind("prio");
        });
        s.property("weight", PropertyType::Float, |p| {
            p.display_name("Weight").range_float(0.0, 1.0).bind("weight");
        });
        s.property("clamped", PropertyType::Int, |p| {
            p.display_name("Clamped").range_fn_int(clamped_range);
        });
        s.property("layers", PropertyType::Int, |p| {
            p.display_name("Layers").array(4).range_int(0, 9).bind("layers");
        });
        s.property("note", PropertyType::String, |p| {
            p.display_name("Note");
        });
        s.property("data", PropertyType::Pointer, |p| {
            p.display_name("Data").struct_type("Mesh").owning_user().bind("data");
        });
        s.property("parent", PropertyType::Pointer, |p| {
            p.display_name("Parent").struct_type("Object").user_one().bind("parent");
        });
        // Reaches through the parent reference into its mesh field.
        s.property("parent_data", PropertyType::Pointer, |p| {
            p.display_name("Parent Data")
                .struct_type("Mesh")
                .owning_user()
                .not_exported()
                .bind("parent.data");
        });
        s.property("modifiers", PropertyType::Collection, |p| {
            p.display_name("Modifiers")
                .struct_type("Modifier")
                .bind_list("mod_head", "next");
        });
        s.property("first_modifier", PropertyType::Pointer, |p| {
            p.display_name("First Modifier")
                .struct_type("Modifier")
                .not_exported()
                .bind("mod_head");
        });
    });

    b.define_struct("Modifier", None, |s| {
        s.name_property("name").path(modifier_path);
        s.property("name", PropertyType::String, |p| {
            p.display_name("Name").bind("name");
        });
        s.property("show_expanded", PropertyType::Boolean, |p| {
            p.display_name("Expanded").bind_bit("flag", 0);
        });
        s.property("next", PropertyType::Pointer, |p| {
            p.display_name("Next").struct_type("Modifier").not_exported().bind("next");
        });
    });

    b.define_struct("Mesh", Some("ID"), |s| {
        s.flags(StructFlags::IS_ID);
        s.property("vertex_count", PropertyType::Int, |p| {
            p.display_name("Vertex Count").range_int(0, 1000).bind("totvert");
        });
        s.property("vertices", PropertyType::Collection, |p| {
            p.display_name("Vertices")
                .struct_type("Vert")
                .bind_struct_array("verts", Some("totvert"));
        });
    });

    b.define_struct("Vert", None, |s| {
        s.property("co", PropertyType::Float, |p| {
            p.display_name("Coordinates").array(3).bind("co");
        });
        s.property("flag", PropertyType::Int, |p| {
            p.display_name("Flag").bind("flag");
        });
        s.property("weight", PropertyType::Float, |p| {
            p.display_name("Weight").bind("weight");
        });
        s.property("select", PropertyType::Boolean, |p| {
            p.display_name("Select").bind_bit("flag", 0);
        });
    });

    b.define_struct("Armature", Some("ID"), |s| {
        s.flags(StructFlags::IS_ID);
        s.property("bones", PropertyType::Collection, |p| {
            p.display_name("Bones").struct_type("Bone").bind_list("bone_head", "next");
        });
        s.property("first_bone", PropertyType::Pointer, |p| {
            p.display_name("First Bone")
                .struct_type("Bone")
                .not_exported()
                .bind("bone_head");
        });
    });

    b.define_struct("Bone", None, |s| {
        s.name_property("name");
        s.property("name", PropertyType::String, |p| {
            p.display_name("Name").bind("name");
        });
        s.property("roll", PropertyType::Float, |p| {
            p.display_name("Roll").bind("roll");
        });
        s.property("next", PropertyType::Pointer, |p| {
            p.display_name("Next").struct_type("Bone").not_exported().bind("next");
        });
    });

    b.define_struct("Curve", Some("ID"), |s| {
        s.flags(StructFlags::IS_ID).refine(curve_refine);
        s.property("kind", PropertyType::Int, |p| {
            p.display_name("Kind").range_int(0, 1).bind("kind");
        });
        s.property("size", PropertyType::Float, |p| {
            p.display_name("Size").bind("size");
        });
    });

    b.define_struct("TextCurve", Some("Curve"), |s| {
        s.flags(StructFlags::IS_ID);
        // Shadows the base definition with a read-only one.
        s.property("size", PropertyType::Float, |p| {
            p.display_name("Size").read_only().bind("size");
        });
    });

    b.define_struct("Scene", Some("ID"), |s| {
        s.flags(StructFlags::IS_ID);
        s.property("objects", PropertyType::Collection, |p| {
            p.display_name("Objects")
                .struct_type("Object")
                .bind_ref_array("objects", Some("totobj"));
        });
        s.property("all_objects", PropertyType::Collection, |p| {
            p.display_name("All Objects")
                .read_only()
                .struct_type("Object")
                .custom_collection(scene_all_objects, Some(scene_all_objects_len), None, None);
        });
        s.property("world", PropertyType::Pointer, |p| {
            p.display_name("World").struct_type("ID").never_null();
        });
    });

    b.build().expect("fixture schema is sound")
}

pub fn store() -> Store {
    Store::new(registry())
}

pub fn prop(store: &Store, ptr: &Ptr, identifier: &str) -> Arc<PropertyDef> {
    store
        .registry()
        .find_property(ptr.ty, identifier)
        .expect("declared property")
}

/// Creates a modifier named `name` and appends it to the object's list.
pub fn add_modifier(store: &mut Store, obj: Slot, name: &str) -> Slot {
    let slot = store.create("Modifier").expect("modifier");
    let ptr = store.pointer(slot).expect("alive");
    let name_prop = prop(store, &ptr, "name");
    access::string_set(store, &ptr, &name_prop, name);

    let obj_ptr = store.pointer(obj).expect("alive");
    let head = prop(store, &obj_ptr, "first_modifier");
    match access::pointer_get(store, &obj_ptr, &head) {
        None => {
            access::pointer_set(store, &obj_ptr, &head, Some(slot));
        }
        Some(mut tail) => {
            let next = prop(store, &tail, "next");
            while let Some(n) = access::pointer_get(store, &tail, &next) {
                tail = n;
            }
            access::pointer_set(store, &tail, &next, Some(slot));
        }
    }
    slot
}

/// Creates a bone named `name` and appends it to the armature's list.
pub fn add_bone(store: &mut Store, armature: Slot, name: &str) -> Slot {
    let slot = store.create("Bone").expect("bone");
    let ptr = store.pointer(slot).expect("alive");
    let name_prop = prop(store, &ptr, "name");
    access::string_set(store, &ptr, &name_prop, name);

    let arm_ptr = store.pointer(armature).expect("alive");
    let head = prop(store, &arm_ptr, "first_bone");
    match access::pointer_get(store, &arm_ptr, &head) {
        None => {
            access::pointer_set(store, &arm_ptr, &head, Some(slot));
        }
        Some(mut tail) => {
            let next = prop(store, &tail, "next");
            while let Some(n) = access::pointer_get(store, &tail, &next) {
                tail = n;
            }
            access::pointer_set(store, &tail, &next, Some(slot));
        }
    }
    slot
}

/// Creates a mesh ID block with its vertex count set.
pub fn mesh_with_verts(store: &mut Store, name: &str, count: i32) -> Slot {
    let mesh = store.create_id("Mesh", name).expect("mesh");
    let ptr = store.pointer(mesh).expect("alive");
    let count_prop = prop(store, &ptr, "vertex_count");
    access::int_set(store, &ptr, &count_prop, count);
    mesh
}
