/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::meta::StructName;
use crate::obj::Slot;

/// Handle to one reflected struct instance: resolved type plus location.
///
/// Cheap, `Copy`, created on demand and never persisted long-term. `ty` is the type in
/// effect *after* refinement. `base` is a byte offset into the instance's block, so a
/// `Ptr` can address a nested struct or an inline array element in the middle of a
/// larger native block; `base == 0` addresses the whole instance.
///
/// `owner_id` is a non-owning back-reference to the root identity block this data hangs
/// off, used for editability (read-only library) checks. It is never dereferenced for
/// storage.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Ptr {
    pub owner_id: Option<Slot>,
    pub ty: StructName,
    pub slot: Slot,
    pub base: u32,
}

impl Ptr {
    /// Whether this handle addresses a whole instance rather than a sub-region.
    ///
    /// Dynamic overrides attach to whole instances only; sub-region handles have no
    /// override storage of their own.
    pub fn is_instance_root(&self) -> bool {
        self.base == 0
    }
}
