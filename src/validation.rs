//! Structural validation of untyped element and snapshot payloads
//!
//! Data reaches the engine from two untrusted places: the persisted store and
//! the UI/host layer sending change payloads. Both arrive as JSON, and both
//! are checked here before anything is deserialized into typed records.
//!
//! Invalid data is never partially trusted. On load a failure hands control to
//! the store's purge path; on an inbound payload it becomes
//! [`SnapError::InvalidFormat`] before any side effect.
//!
//! ## Rules
//!
//! An element is valid only if:
//! - it is an object
//! - `id` and `name` are non-empty strings
//! - `kind` is one of the [`ElementKind`] tags
//! - every optional string field (`key`, `description`, `parentName`,
//!   `variantPropertiesHash`, every channel hash) is a string or `null`
//! - `variantProperties` is an object of strings, `childrenIds` an array of
//!   strings, `values` an object, and `modifiedAt`/`updatedAt` integers
//!
//! A snapshot additionally needs an integer `timestamp`, an `elements` array
//! whose members all pass, and unique element ids.

use crate::channel::Channel;
use crate::collections::{HashSet, HashSetExt};
use crate::error::{Result, SnapError};
use crate::types::{ElementKind, Snapshot};
use serde_json::{Map, Value};

const OPTIONAL_STRING_FIELDS: [&str; 4] = ["key", "description", "parentName", "variantPropertiesHash"];

/// Check whether `candidate` is a structurally valid element
pub fn validate_element(candidate: &Value) -> bool {
    check_element(candidate).is_ok()
}

/// Check whether `candidate` is a structurally valid snapshot
pub fn validate_snapshot(candidate: &Value) -> bool {
    check_snapshot(candidate).is_ok()
}

/// Validate and deserialize a snapshot payload
///
/// # Errors
///
/// - [`SnapError::InvalidFormat`] describing the first violation found
pub fn parse_snapshot(candidate: &Value) -> Result<Snapshot> {
    check_snapshot(candidate).map_err(SnapError::InvalidFormat)?;
    let snapshot: Snapshot = serde_json::from_value(candidate.clone())
        .map_err(|e| SnapError::invalid_format(e.to_string()))?;
    Ok(snapshot)
}

fn check_snapshot(candidate: &Value) -> std::result::Result<(), String> {
    let obj = candidate
        .as_object()
        .ok_or_else(|| "snapshot is not an object".to_string())?;

    match obj.get("timestamp") {
        Some(ts) if ts.is_i64() || ts.is_u64() => {}
        _ => return Err("timestamp must be an integer".to_string()),
    }

    let elements = obj
        .get("elements")
        .and_then(Value::as_array)
        .ok_or_else(|| "elements must be an array".to_string())?;

    let mut seen = HashSet::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        check_element(element).map_err(|e| format!("element {}: {}", index, e))?;
        // check_element guarantees a string id
        let id = element.get("id").and_then(Value::as_str).unwrap_or_default();
        if !seen.insert(id) {
            return Err(format!("element {}: duplicate id {}", index, id));
        }
    }
    Ok(())
}

fn check_element(candidate: &Value) -> std::result::Result<(), String> {
    let obj = candidate
        .as_object()
        .ok_or_else(|| "not an object".to_string())?;

    for field in ["id", "name"] {
        match obj.get(field) {
            Some(Value::String(s)) if !s.is_empty() => {}
            _ => return Err(format!("{} must be a non-empty string", field)),
        }
    }

    match obj.get("kind").and_then(Value::as_str) {
        Some(tag) if ElementKind::from_tag(tag).is_some() => {}
        Some(tag) => return Err(format!("unknown kind {}", tag)),
        None => return Err("kind must be a string".to_string()),
    }

    let channel_fields = Channel::ALL.into_iter().map(Channel::hash_field);
    for field in OPTIONAL_STRING_FIELDS.into_iter().chain(channel_fields) {
        optional(obj, field, Value::is_string, "a string")?;
    }

    optional(obj, "variantProperties", is_string_map, "an object of strings")?;
    optional(obj, "childrenIds", is_string_array, "an array of strings")?;
    if obj.get("values").is_some_and(|v| !v.is_object()) {
        return Err("values must be an object".to_string());
    }
    optional(obj, "modifiedAt", is_integer, "an integer")?;
    optional(obj, "updatedAt", is_integer, "an integer")?;

    Ok(())
}

fn optional(
    obj: &Map<String, Value>,
    field: &str,
    check: impl Fn(&Value) -> bool,
    expected: &str,
) -> std::result::Result<(), String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(value) if check(value) => Ok(()),
        Some(_) => Err(format!("{} must be {}", field, expected)),
    }
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

fn is_string_map(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|m| m.values().all(Value::is_string))
}

fn is_string_array(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|a| a.iter().all(Value::is_string))
}
