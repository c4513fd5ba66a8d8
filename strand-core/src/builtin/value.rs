/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::BTreeMap;
use std::fmt;

use crate::obj::Slot;

/// Dynamically-typed value, the payload of per-instance property overrides.
///
/// This is the uniform currency of the dynamic layer: user-added custom fields, add-on
/// properties with no compiled descriptor, and lazily-created overrides for compiled
/// properties that were never bound to a setter all store one of these.
///
/// Reference variants hold [`Slot`] handles, never owning references; whoever owns the
/// store owns the instances.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    String(String),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    /// Non-owning reference to another instance.
    Ref(Option<Slot>),
    /// Ordered sequence of non-owning instance references; the dynamic collection shape.
    RefArray(Vec<Slot>),
    /// String-keyed nested group, for user-structured custom data.
    Group(BTreeMap<String, Value>),
}

impl Value {
    /// Coercing boolean view; numeric variants read as `!= 0`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i32::from(*b)),
            _ => None,
        }
    }

    /// Float view; `Double` narrows, which is the precision the compiled field would have.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Double(d) => Some(*d as f32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ref_slot(&self) -> Option<Option<Slot>> {
        match self {
            Value::Ref(slot) => Some(*slot),
            _ => None,
        }
    }

    /// Identifier of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::IntArray(_) => "int[]",
            Value::FloatArray(_) => "float[]",
            Value::Ref(_) => "ref",
            Value::RefArray(_) => "ref[]",
            Value::Group(_) => "group",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::IntArray(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::FloatArray(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Ref(_) => write!(f, "<pointer>"),
            Value::RefArray(items) => write!(f, "<{} references>", items.len()),
            Value::Group(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercions() {
        assert_eq!(Value::Int(2).as_bool(), Some(true));
        assert_eq!(Value::Bool(true).as_int(), Some(1));
        assert_eq!(Value::Double(1.5).as_float(), Some(1.5));
        assert_eq!(Value::String("x".into()).as_int(), None);
    }

    #[test]
    fn display_shapes() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::IntArray(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::String("a\"b".into()).to_string(), "\"a\\\"b\"");
        assert_eq!(Value::Ref(None).to_string(), "<pointer>");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let mut group = BTreeMap::new();
        group.insert("weight".to_string(), Value::Float(0.5));
        let value = Value::Group(group);

        let json = serde_json::to_string(&value).expect("serialize");
        let back: Value = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, value);
    }
}
