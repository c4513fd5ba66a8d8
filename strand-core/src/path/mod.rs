/*
 * Copyright (c) strand contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Textual property addressing.
//!
//! A path is dot-separated segments, each a property identifier with at most one
//! bracket suffix: `[3]` for an index, `["key"]` for a name lookup (literal `]` inside
//! the quotes escaped as `\]`). `modifiers[2].show_expanded` walks a collection to its
//! third element, then a property of it.
//!
//! Resolution failure is always a soft "no such path" result. Paths outlive scene
//! edits; a caller restoring a saved target must treat a miss as "gone", never crash.

use std::sync::Arc;

use crate::access;
use crate::meta::{ArrayInfo, PropertyDef, PropertyKind};
use crate::obj::{Ptr, Store};

/// Outcome of a successful resolution: the instance owning the terminal property.
///
/// A trailing bracket on a collection yields the element as `ptr` with the collection
/// property as `prop`; a trailing index on an array property lands in `index`.
#[derive(Clone)]
pub struct ResolvedPath {
    pub ptr: Ptr,
    pub prop: Arc<PropertyDef>,
    pub index: Option<usize>,
}

#[derive(Clone, PartialEq, Debug)]
enum Bracket {
    Index(usize),
    Key(String),
}

#[derive(Clone, PartialEq, Debug)]
struct Segment {
    ident: String,
    bracket: Option<Bracket>,
    /// Byte offset of the segment start in the original path, for truncation.
    start: usize,
}

/// Splits a path into segments; `None` on any grammar violation.
fn tokenize(path: &str) -> Option<Vec<Segment>> {
    let bytes = path.as_bytes();
    let mut segments = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;

        let ident_end = path[pos..]
            .find(['.', '['])
            .map_or(bytes.len(), |i| pos + i);
        if ident_end == pos {
            return None; // empty identifier
        }
        let ident = path[pos..ident_end].to_string();
        pos = ident_end;

        let mut bracket = None;
        if pos < bytes.len() && bytes[pos] == b'[' {
            pos += 1;
            if pos < bytes.len() && bytes[pos] == b'"' {
                pos += 1;
                let (key, consumed) = scan_quoted(&path[pos..])?;
                pos += consumed;
                bracket = Some(Bracket::Key(key));
            } else {
                let end = path[pos..].find(']').map(|i| pos + i)?;
                let index: usize = path[pos..end].parse().ok()?;
                pos = end;
                bracket = Some(Bracket::Index(index));
            }
            if pos >= bytes.len() || bytes[pos] != b']' {
                return None;
            }
            pos += 1;
        }

        segments.push(Segment {
            ident,
            bracket,
            start,
        });

        if pos < bytes.len() {
            if bytes[pos] != b'.' {
                return None;
            }
            pos += 1;
            if pos == bytes.len() {
                return None; // trailing dot
            }
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}

/// Scans a quoted key body up to (not including) the closing quote.
///
/// Only `\]` is an escape; every other byte, backslashes included, is literal. Returns
/// the unescaped key and the bytes consumed including the closing quote.
fn scan_quoted(rest: &str) -> Option<(String, usize)> {
    let bytes = rest.as_bytes();
    let mut key = String::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => return Some((key, pos + 1)),
            b'\\' if pos + 1 < bytes.len() && bytes[pos + 1] == b']' => {
                key.push(']');
                pos += 2;
            }
            _ => {
                let ch = rest[pos..].chars().next()?;
                key.push(ch);
                pos += ch.len_utf8();
            }
        }
    }
    None // unterminated
}

/// Escapes a collection key for embedding in a bracket segment.
fn escape_key(key: &str) -> String {
    key.replace(']', "\\]")
}

/// Looks a property up on `ptr`, static descriptors first, then synthesized
/// descriptors for override-only entries.
fn property_at(store: &Store, ptr: &Ptr, identifier: &str) -> Option<Arc<PropertyDef>> {
    if let Some(prop) = store.registry().lookup_property(ptr.ty, identifier) {
        return Some(prop);
    }
    access::runtime_properties(store, ptr)
        .into_iter()
        .find(|p| p.identifier == identifier)
}

/// Resolves `path` from `root` to its terminal (instance, property) pair.
pub fn resolve(store: &Store, root: &Ptr, path: &str) -> Option<ResolvedPath> {
    let segments = tokenize(path)?;
    let mut current = *root;

    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        let prop = property_at(store, &current, &segment.ident)?;
        let is_last = i == last;

        match &prop.kind {
            PropertyKind::Collection { .. } => {
                let Some(bracket) = &segment.bracket else {
                    // The collection itself, only addressable as a terminal.
                    return is_last.then(|| ResolvedPath {
                        ptr: current,
                        prop,
                        index: None,
                    });
                };
                let element = match bracket {
                    Bracket::Index(index) => {
                        access::collection_lookup_index(store, &current, &prop, *index)?
                    }
                    Bracket::Key(key) => {
                        access::collection_lookup_string(store, &current, &prop, key)?
                    }
                };
                if is_last {
                    return Some(ResolvedPath {
                        ptr: element,
                        prop,
                        index: None,
                    });
                }
                current = element;
            }
            PropertyKind::Pointer { .. } => {
                if segment.bracket.is_some() {
                    return None;
                }
                if is_last {
                    return Some(ResolvedPath {
                        ptr: current,
                        prop,
                        index: None,
                    });
                }
                // Null mid-path is a soft miss.
                current = access::pointer_get(store, &current, &prop)?;
            }
            _ => {
                let index = match &segment.bracket {
                    None => None,
                    Some(Bracket::Index(index)) => {
                        if matches!(prop.array, ArrayInfo::Scalar) {
                            return None;
                        }
                        Some(*index)
                    }
                    Some(Bracket::Key(_)) => return None,
                };
                return is_last.then(|| ResolvedPath {
                    ptr: current,
                    prop,
                    index,
                });
            }
        }
    }
    None
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

/// Appends a property segment to a path prefix.
pub fn append(prefix: &str, prop: &PropertyDef) -> String {
    join(prefix, &prop.identifier)
}

/// Appends a collection element addressed by index.
pub fn append_index(prefix: &str, prop: &PropertyDef, index: usize) -> String {
    join(prefix, &format!("{}[{index}]", prop.identifier))
}

/// Appends a collection element addressed by key.
pub fn append_key(prefix: &str, prop: &PropertyDef, key: &str) -> String {
    join(prefix, &format!("{}[\"{}\"]", prop.identifier, escape_key(key)))
}

/// Strips the last segment (bracket suffix included); `None` for single-segment paths.
///
/// The grammar has no reverse-scan shortcut, so this re-tokenizes from the start and
/// truncates at the remembered boundary.
pub fn back(path: &str) -> Option<String> {
    let segments = tokenize(path)?;
    if segments.len() < 2 {
        return None;
    }
    let boundary = segments.last().expect("non-empty").start;
    Some(path[..boundary - 1].to_string())
}

/// Path fragment addressing `ptr` from its owning ID block.
///
/// An ID root addresses itself with the empty fragment; other instances delegate to
/// their type's path producer, searching up the base chain.
pub fn from_id(store: &Store, ptr: &Ptr) -> Option<String> {
    if ptr.is_instance_root() && ptr.owner_id == Some(ptr.slot) {
        return Some(String::new());
    }

    let mut current = Some(ptr.ty);
    while let Some(ty) = current {
        let def = store.registry().struct_def(ty)?;
        if let Some(path_fn) = def.path {
            return path_fn(store, ptr);
        }
        current = def.base;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_segments_and_brackets() {
        let segs = tokenize("modifiers[2].show_expanded").expect("valid");
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].ident, "modifiers");
        assert_eq!(segs[0].bracket, Some(Bracket::Index(2)));
        assert_eq!(segs[1].ident, "show_expanded");
        assert_eq!(segs[1].bracket, None);
    }

    #[test]
    fn quoted_keys_unescape_brackets() {
        let segs = tokenize(r#"bones["Arm\]L"].name"#).expect("valid");
        assert_eq!(segs[0].bracket, Some(Bracket::Key("Arm]L".to_string())));
        assert_eq!(segs[1].ident, "name");
    }

    #[test]
    fn malformed_paths_are_rejected() {
        assert!(tokenize("").is_none());
        assert!(tokenize("a..b").is_none());
        assert!(tokenize("a[").is_none());
        assert!(tokenize("a[b]").is_none());
        assert!(tokenize(r#"a["unterminated"#).is_none());
        assert!(tokenize("a.").is_none());
        assert!(tokenize("a[1]extra.b").is_none());
    }

    #[test]
    fn back_strips_one_segment() {
        assert_eq!(back("a.b[3].c").as_deref(), Some("a.b[3]"));
        assert_eq!(back("a.b[3]").as_deref(), Some("a"));
        assert_eq!(back("a"), None);
    }

    #[test]
    fn append_escapes_round_trip() {
        let key = "weird]name";
        let escaped = escape_key(key);
        let (scanned, _) = scan_quoted(&format!("{escaped}\"")).expect("scans");
        assert_eq!(scanned, key);
    }
}
