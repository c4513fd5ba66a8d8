/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Core runtime of the strand reflection layer.
//!
//! A registry of struct and property descriptors is declared once at startup and
//! frozen; live data lives in a [`Store`][obj::Store] as plain byte blocks addressed by
//! generational slots. The [`access`] module reads and writes any property of any
//! instance through the descriptor graph: compiled field bindings, custom accessors,
//! and a dynamic per-instance override layer, uniformly. [`path`] addresses properties
//! textually; [`obj::foreach_id`] walks ID references generically.
//!
//! # Threading
//!
//! A `Store` is deliberately unsynchronized. The embedding application owns one per
//! data universe and serializes access to it; the registry itself is immutable and
//! freely shared.
//!
//! Most users depend on the `strand` facade crate instead of this one.

mod log;

pub mod access;
pub mod builtin;
pub mod meta;
pub mod obj;
pub mod path;
pub mod registry;
