/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

mod common;

use strand_core::access;
use strand_core::meta::error::DefineError;
use strand_core::meta::{CollectionSource, LenSource, PropertyKind, StructName};
use strand_core::registry::{PropertyType, Registry};

#[test]
fn struct_lookup_and_inheritance() {
    let registry = common::registry();

    let object = registry.find_struct("Object").expect("registered").identifier;
    let id = registry.find_struct("ID").expect("registered").identifier;
    let text = registry.find_struct("TextCurve").expect("registered").identifier;
    let curve = registry.find_struct("Curve").expect("registered").identifier;

    assert!(registry.is_a(object, id));
    assert!(registry.is_a(text, curve));
    assert!(registry.is_a(text, id));
    assert!(!registry.is_a(id, object));
    assert!(registry.is_a(object, object));
}

#[test]
fn structs_iterate_in_identifier_order() {
    let registry = common::registry();
    let idents: Vec<String> = registry.structs().map(|d| d.identifier.to_owned_str()).collect();

    let mut sorted = idents.clone();
    sorted.sort();
    assert_eq!(idents, sorted);
    assert!(idents.contains(&"Armature".to_string()));
}

#[test]
fn property_order_pins_name_and_type() {
    let registry = common::registry();
    let object = registry.find_struct("Object").expect("registered").identifier;

    let idents: Vec<String> = registry
        .properties_of(object)
        .iter()
        .map(|p| p.identifier.clone())
        .collect();

    // Base chain first: the ID block's properties lead, with the designated name
    // property pinned ahead of the implicit type identifier.
    assert_eq!(idents[0], "name");
    assert_eq!(idents[1], "type_name");

    // The rest of the struct's own properties follow in display-name order.
    let own = &idents[4..];
    assert_eq!(
        own,
        [
            "clamped",
            "data",
            "display_mode",
            "draw_options",
            "first_modifier",
            "hide",
            "layers",
            "location",
            "modifiers",
            "note",
            "parent",
            "parent_data",
            "pass_index",
            "priority",
            "selectable",
            "weight",
        ]
    );
}

#[test]
fn shadowed_property_resolves_to_most_derived() {
    let registry = common::registry();
    let curve = registry.find_struct("Curve").expect("registered").identifier;
    let text = registry.find_struct("TextCurve").expect("registered").identifier;

    let base = registry.find_property(curve, "size").expect("declared");
    let derived = registry.find_property(text, "size").expect("declared");
    assert!(base.is_editable_flag());
    assert!(!derived.is_editable_flag());

    // Inherited, unshadowed lookup still walks the chain.
    assert!(registry.find_property(text, "kind").is_some());
}

#[test]
fn name_property_resolves_up_the_chain() {
    let registry = common::registry();
    let object = registry.find_struct("Object").expect("registered").identifier;
    let vert = registry.find_struct("Vert").expect("registered").identifier;

    let name = registry.name_property_of(object).expect("designated on ID");
    assert_eq!(name.identifier, "name");
    assert!(registry.name_property_of(vert).is_none());
}

#[test]
fn collection_bindings_compile_to_strategies() {
    let registry = common::registry();

    let scene = registry.find_struct("Scene").expect("registered").identifier;
    let objects = registry.find_property(scene, "objects").expect("declared");
    match &objects.kind {
        PropertyKind::Collection {
            source: CollectionSource::Array { stride, len, deref, .. },
            ..
        } => {
            assert_eq!(*stride, 8);
            assert!(*deref);
            assert!(matches!(len, LenSource::Field(_)));
        }
        other => panic!("unexpected strategy: {other:?}"),
    }

    let mesh = registry.find_struct("Mesh").expect("registered").identifier;
    let vertices = registry.find_property(mesh, "vertices").expect("declared");
    match &vertices.kind {
        PropertyKind::Collection {
            source: CollectionSource::Array { stride, deref, .. },
            ..
        } => {
            // One Vert is co[3] + flag + weight.
            assert_eq!(*stride, 20);
            assert!(!*deref);
        }
        other => panic!("unexpected strategy: {other:?}"),
    }

    let object = registry.find_struct("Object").expect("registered").identifier;
    let modifiers = registry.find_property(object, "modifiers").expect("declared");
    assert!(matches!(
        &modifiers.kind,
        PropertyKind::Collection {
            source: CollectionSource::List { .. },
            ..
        }
    ));
}

#[test]
fn implicit_type_name_reports_refined_type() {
    let mut store = common::store();

    let obj = store.create_id("Object", "Cube").expect("object");
    let ptr = store.pointer(obj).expect("alive");
    let type_name = common::prop(&store, &ptr, "type_name");
    assert_eq!(access::string_get(&store, &ptr, &type_name), "Object");
    // Implicit property is read-only.
    assert!(!access::string_set(&mut store, &ptr, &type_name, "Lie"));

    let curve = store.create_id("Curve", "Title").expect("curve");
    let curve_ptr = store.pointer(curve).expect("alive");
    let kind = common::prop(&store, &curve_ptr, "kind");
    access::int_set(&mut store, &curve_ptr, &kind, 1);

    let refined = store.pointer(curve).expect("alive");
    assert!(refined.ty.eq_str("TextCurve"));
    let type_name = common::prop(&store, &refined, "type_name");
    assert_eq!(access::string_get(&store, &refined, &type_name), "TextCurve");
}

#[test]
fn build_reports_the_complete_error_set() {
    let mut b = Registry::builder();
    b.define_layout("RegTestSolo", |l| {
        l.i32("flag");
    });

    b.define_struct("RegTestSolo", None, |s| {
        s.name_property("missing_name");
        s.property("flag", PropertyType::Int, |p| {
            p.bind("flag");
        });
        // Kind-specific method on the wrong kind.
        s.property("broken", PropertyType::Float, |p| {
            p.range_int(0, 5).bind("flag");
        });
        s.property("ghost", PropertyType::Pointer, |p| {
            p.struct_type("RegTestGhost");
        });
    });
    b.define_struct("RegTestSolo", None, |_| {});
    b.define_struct("RegTestOrphan", Some("RegTestNoBase"), |_| {});

    let err = b.build().expect_err("broken schema");
    let has = |f: &dyn Fn(&DefineError) -> bool| err.errors.iter().any(|e| f(e));

    assert!(has(&|e| matches!(e, DefineError::DuplicateStruct { identifier } if identifier == "RegTestSolo")));
    assert!(has(&|e| matches!(e, DefineError::UnknownBase { base, .. } if base == "RegTestNoBase")));
    assert!(has(&|e| matches!(e, DefineError::UnknownNameProperty { property, .. } if property == "missing_name")));
    assert!(has(&|e| matches!(e, DefineError::UnknownTarget { target, .. } if target == "RegTestGhost")));
    assert!(has(&|e| matches!(e, DefineError::BadDefinition { property, .. } if property == "broken")));

    // `flag` also mismatches the float binding; either way the report names it all.
    assert!(err.errors.len() >= 5, "{err}");
}

#[test]
fn find_property_misses_are_none_not_panics() {
    let registry = common::registry();
    let object = registry.find_struct("Object").expect("registered").identifier;

    assert!(registry.find_property(object, "no_such_property").is_none());
    assert!(registry.find_struct("NoSuchStruct").is_none());
    assert!(StructName::find("NoSuchStructEver").is_none());
}
