/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Diagnostic macros used across the kernel.
//!
//! The reflection layer never panics for data-driven conditions; it reports them through
//! these macros and degrades to a zero/empty result. Both delegate to the [`log`] facade
//! under the `strand` target, so embedders pick the sink.

#[macro_export]
macro_rules! strand_warn {
    ($($args:tt)*) => {
        ::log::warn!(target: "strand", $($args)*)
    };
}

#[macro_export]
macro_rules! strand_error {
    ($($args:tt)*) => {
        ::log::error!(target: "strand", $($args)*)
    };
}
