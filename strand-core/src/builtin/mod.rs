/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Dynamic value types carried by the override layer.

mod id_props;
mod value;

pub use id_props::IdProperties;
pub use value::Value;
