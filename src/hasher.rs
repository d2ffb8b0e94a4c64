//! Canonical fingerprinting for change detection
//!
//! Every channel hash in an [`ElementRecord`](crate::types::ElementRecord) is
//! produced here. Hashing is a two step affair:
//!
//! 1. **Canonicalization**: the value is rendered to a string with all object
//!    keys sorted recursively, so two logically equal values always produce
//!    the same text no matter what order their keys were inserted in.
//! 2. **Rolling hash**: a 32-bit multiplicative hash (seed 5381,
//!    `hash * 33 + code unit`) runs over the UTF-16 code units of the
//!    canonical text and is rendered in base 36.
//!
//! The fingerprint is for cheap change detection only. It is not
//! collision-resistant and carries no version tag: changing the algorithm
//! invalidates every stored fingerprint, and the next diff will report every
//! hashed channel as modified.
//!
//! ## Fixed fingerprints
//!
//! | Input | Canonical text | Fingerprint |
//! |---|---|---|
//! | raw empty string (`hash_str("")`) | *(none)* | [`EMPTY_FINGERPRINT`] (`"45h"`) |
//! | `null` | `null` | `hash_str("null")` |
//! | `{}` | `{}` | `hash_str("{}")` |
//! | `""` as a JSON value | `""` | `hash_str("\"\"")` |
//!
//! ## Examples
//!
//! ```rust
//! use stylesnap::hasher::{hash_value, canonicalize};
//! use serde_json::json;
//!
//! let a = json!({"width": 120, "height": 40});
//! let b = json!({"height": 40, "width": 120});
//!
//! assert_eq!(canonicalize(&a), r#"{"height":40,"width":120}"#);
//! assert_eq!(hash_value(&a), hash_value(&b));
//! ```

use serde_json::Value;
use std::collections::BTreeMap;

/// Seed of the rolling hash
pub const HASH_SEED: u32 = 5381;

/// Fingerprint of the empty string (the untouched seed in base 36)
pub const EMPTY_FINGERPRINT: &str = "45h";

const RADIX_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Render `value` as canonical JSON text with object keys sorted recursively
///
/// Scalars are encoded exactly as `serde_json` encodes them; only the key
/// order of objects is normalized. The result does not depend on whether
/// `serde_json` was built with `preserve_order`.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(key, out);
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_json_string(s, out),
        // null, bool and numbers have a single encoding already
        other => out.push_str(&other.to_string()),
    }
}

fn write_json_string(s: &str, out: &mut String) {
    out.push_str(&Value::String(s.to_owned()).to_string());
}

/// Rolling hash over the UTF-16 code units of `input`, rendered in base 36
pub fn hash_str(input: &str) -> String {
    let hash = input
        .encode_utf16()
        .fold(HASH_SEED, |hash, unit| hash.wrapping_mul(33).wrapping_add(u32::from(unit)));
    to_radix36(hash)
}

/// Fingerprint of a structured value, independent of key insertion order
pub fn hash_value(value: &Value) -> String {
    hash_str(&canonicalize(value))
}

/// Fingerprint of an optional channel payload
///
/// Returns `None` when the feature is absent on the element, so that an
/// absent channel never compares equal to a present-but-empty one.
pub fn hash_channel(value: Option<&Value>) -> Option<String> {
    value.map(hash_value)
}

/// Fingerprint of a variant property mapping
pub fn hash_variant_properties(properties: &BTreeMap<String, String>) -> String {
    let object = properties
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect::<serde_json::Map<_, _>>();
    hash_value(&Value::Object(object))
}

/// Fold an element's own structural payload with its children's structure hashes
///
/// Children are folded in order, so reordering children changes the result,
/// and because each child hash already folds its own subtree any deep change
/// propagates up to every ancestor.
pub fn fold_structure_hash(own: &Value, child_hashes: &[&str]) -> String {
    let children = child_hashes
        .iter()
        .map(|h| Value::String((*h).to_owned()))
        .collect::<Vec<_>>();
    let mut folded = serde_json::Map::new();
    folded.insert("children".to_owned(), Value::Array(children));
    folded.insert("own".to_owned(), own.clone());
    hash_value(&Value::Object(folded))
}

fn to_radix36(mut n: u32) -> String {
    if n == 0 {
        return "0".to_owned();
    }
    let mut digits = Vec::with_capacity(7);
    while n > 0 {
        digits.push(RADIX_DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    digits.iter().rev().map(|&d| d as char).collect()
}
