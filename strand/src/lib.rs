/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Strand: a reflection kernel for structured content data.
//!
//! Applications declare their native data types once, at startup, as a graph of struct
//! and property descriptors. From then on UI, scripting, serialization and animation
//! code read and write *any* property of *any* instance generically: by descriptor, or
//! by textual path (`"modifiers[2].show_expanded"`).
//!
//! ```no_run
//! use strand::prelude::*;
//!
//! let mut b = Registry::builder();
//! b.define_layout("Lamp", |l| {
//!     l.chars("name", 64).f32("energy");
//! });
//! b.define_struct("Lamp", None, |s| {
//!     s.name_property("name");
//!     s.property("name", PropertyType::String, |p| {
//!         p.bind("name");
//!     });
//!     s.property("energy", PropertyType::Float, |p| {
//!         p.range_float(0.0, 10_000.0).bind("energy");
//!     });
//! });
//! let registry = b.build().expect("schema is sound");
//!
//! let mut store = Store::new(registry);
//! let lamp = store.create("Lamp").expect("known type");
//! let ptr = store.pointer(lamp).expect("alive");
//!
//! let energy = store.registry().find_property(ptr.ty, "energy").expect("declared");
//! strand::access::float_set(&mut store, &ptr, &energy, 5.0);
//! ```
//!
//! This crate is the user-facing facade; the machinery lives in `strand-core`.

pub use strand_core::{access, builtin, meta, obj, path, registry};

pub mod prelude;
