/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use thiserror::Error;

/// A single definition-time schema error.
///
/// These are programmer errors in how a data-type module registered itself. They are
/// accumulated during the build pass and reported as a complete set via [`BuildErrors`];
/// registration never aborts on the first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefineError {
    #[error("struct `{identifier}` is defined twice")]
    DuplicateStruct { identifier: String },

    #[error("property `{strukt}.{identifier}` is defined twice")]
    DuplicateProperty { strukt: String, identifier: String },

    #[error("struct `{strukt}` inherits unknown base `{base}`")]
    UnknownBase { strukt: String, base: String },

    #[error("struct `{strukt}` references unknown layout `{layout}`")]
    UnknownLayout { strukt: String, layout: String },

    #[error("layout `{layout}` has no field `{field}` (bound by `{strukt}.{property}`)")]
    UnknownField {
        strukt: String,
        property: String,
        layout: String,
        field: String,
    },

    #[error("field `{field}` has the wrong shape for `{strukt}.{property}`: {detail}")]
    FieldMismatch {
        strukt: String,
        property: String,
        field: String,
        detail: String,
    },

    #[error("`{strukt}.{property}` was bound but struct `{strukt}` declares no native layout")]
    MissingLayout { strukt: String, property: String },

    #[error("collection `{strukt}.{property}` has no iteration strategy (list/array binding, custom callbacks, or the id-property flag)")]
    CollectionWithoutStrategy { strukt: String, property: String },

    #[error("`{strukt}.{property}`: {detail}")]
    BadDefinition {
        strukt: String,
        property: String,
        detail: String,
    },

    #[error("`{strukt}` names unknown target struct `{target}` for `{property}`")]
    UnknownTarget {
        strukt: String,
        property: String,
        target: String,
    },

    #[error("`{strukt}` designates unknown name property `{property}`")]
    UnknownNameProperty { strukt: String, property: String },

    #[error("layout `{layout}` is part of a size cycle")]
    LayoutCycle { layout: String },

    #[error("layout `{layout}` is defined twice")]
    DuplicateLayout { layout: String },

    #[error("fixed array length {len} of `{strukt}.{property}` exceeds the supported maximum {max}")]
    ArrayTooLong {
        strukt: String,
        property: String,
        len: u32,
        max: u32,
    },
}

/// Complete set of schema errors produced by one registry build.
///
/// The embedding application must treat this as a hard startup failure; the descriptor
/// graph is inconsistent and must not be used.
#[derive(Debug)]
pub struct BuildErrors {
    pub errors: Vec<DefineError>,
}

impl std::error::Error for BuildErrors {}

impl fmt::Display for BuildErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "registry build failed with {} error(s):", self.errors.len())?;
        for err in &self.errors {
            writeln!(f, "  - {err}")?;
        }
        Ok(())
    }
}
