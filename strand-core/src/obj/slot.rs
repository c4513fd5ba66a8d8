/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Stable handle to an instance in a [`Store`][crate::obj::Store].
///
/// Generational index: freeing a slot bumps its generation, so stale handles read as dead
/// instead of aliasing a recycled instance. Live generations start at 1; generation 0 is the
/// encoding of "null" inside native byte blocks.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Byte width of an encoded reference field inside a native byte block.
pub const REF_SIZE: u32 = 8;

impl Slot {
    pub fn index(self) -> u32 {
        self.index
    }

    pub(crate) fn encode(value: Option<Slot>) -> [u8; REF_SIZE as usize] {
        let (index, generation) = match value {
            Some(slot) => (slot.index, slot.generation),
            None => (0, 0),
        };

        let mut bytes = [0; 8];
        bytes[..4].copy_from_slice(&index.to_le_bytes());
        bytes[4..].copy_from_slice(&generation.to_le_bytes());
        bytes
    }

    pub(crate) fn decode(bytes: &[u8]) -> Option<Slot> {
        let index = u32::from_le_bytes(bytes[..4].try_into().expect("ref field width"));
        let generation = u32::from_le_bytes(bytes[4..8].try_into().expect("ref field width"));

        (generation != 0).then_some(Slot { index, generation })
    }
}
