/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Instance storage: the arena-backed store, slots, pointers, and reference visiting.

mod ptr;
mod slot;
mod store;
mod visit;

pub use ptr::Ptr;
pub use slot::{Slot, REF_SIZE};
pub use store::{IdHeader, Store};
pub use visit::{foreach_id, foreach_id_mut, IdRemap, IdVisitor, RefUsage, VisitControl, VisitFlags};
