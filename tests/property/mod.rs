//! Property-based testing for Stylesnap
//!
//! Uses proptest to verify hashing, diffing, normalization and persistence
//! invariants across randomly generated values and snapshots.

use ::stylesnap::*;
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Generate arbitrary JSON, finite floats included
fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        prop::num::f64::NORMAL.prop_map(Value::from),
        (0.0f64..1.0).prop_map(Value::from),
        "[a-zA-Z0-9 #/]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Generate a JSON object as key/value pairs, so insertion order can vary
fn object_pairs_strategy() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map("[a-z]{1,8}", json_strategy(), 1..8)
        .prop_map(|m| m.into_iter().collect())
}

fn kind_strategy() -> impl Strategy<Value = ElementKind> {
    prop::sample::select(ElementKind::ALL.to_vec())
}

fn hash_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[0-9a-z]{1,7}")
}

fn timestamp_strategy() -> impl Strategy<Value = i64> {
    0i64..4_102_444_800_000
}

/// Raw payloads for the channels not covered by `hash_strategy`
///
/// A stored `null` payload reads back as absent, so payloads are never null.
fn channel_values_strategy() -> impl Strategy<Value = Vec<(Channel, Value)>> {
    let channel = prop::sample::select(vec![
        Channel::Appearance,
        Channel::Geometry,
        Channel::Effects,
        Channel::VariableDefinition,
    ]);
    let payload = json_strategy().prop_filter("payload must not be null", |v| !v.is_null());
    prop::collection::btree_map(channel, payload, 0..3).prop_map(|m| m.into_iter().collect())
}

fn variant_properties_strategy() -> impl Strategy<Value = Option<BTreeMap<String, String>>> {
    prop::option::of(prop::collection::btree_map("[A-Z][a-z]{0,7}", "[A-Za-z0-9]{1,8}", 1..4))
}

/// Generate one element with id `id`
fn element_strategy(id: String) -> impl Strategy<Value = ElementRecord> {
    (
        "[A-Za-z][A-Za-z0-9 =/]{0,15}",
        kind_strategy(),
        prop::option::of("[A-Za-z ]{1,10}"),
        prop::option::of("[A-Za-z ]{1,20}"),
        (hash_strategy(), hash_strategy(), hash_strategy()),
        channel_values_strategy(),
        variant_properties_strategy(),
        prop::option::of(prop::collection::vec("[0-9]{1,3}:[0-9]{1,3}", 0..4)),
        (prop::option::of(timestamp_strategy()), prop::option::of(timestamp_strategy())),
    )
        .prop_map(
            move |(
                name,
                kind,
                parent,
                description,
                (fills, layout, typography),
                values,
                variant_properties,
                children,
                (modified_at, updated_at),
            )| {
                let mut element = ElementRecord::new(id.clone(), name, kind);
                element.parent_name = parent;
                element.description = description;
                element.hashes.set(Channel::Fills, fills);
                element.hashes.set(Channel::Layout, layout);
                element.hashes.set(Channel::Typography, typography);
                for (channel, value) in values {
                    element = element.with_value(channel, value);
                }
                if let Some(properties) = variant_properties {
                    element = element.with_variant_properties(properties);
                }
                element.children_ids = children;
                element.modified_at = modified_at;
                element.updated_at = updated_at;
                element
            },
        )
}

/// Generate a snapshot with unique ids drawn from a small id space
fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    (prop::collection::btree_set(0u16..60, 0..25), timestamp_strategy()).prop_flat_map(|(ids, ts)| {
        let elements: Vec<_> = ids
            .into_iter()
            .map(|id| element_strategy(format!("{}:1", id)))
            .collect();
        elements.prop_map(move |elements| Snapshot::new(ts, elements))
    })
}

fn ids<'a>(elements: impl Iterator<Item = &'a ElementRecord>) -> BTreeSet<String> {
    elements.map(|e| e.id.clone()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_hash_is_stable_and_order_independent(pairs in object_pairs_strategy()) {
        let mut forward = Map::new();
        for (k, v) in pairs.iter() {
            forward.insert(k.clone(), v.clone());
        }
        let mut backward = Map::new();
        for (k, v) in pairs.iter().rev() {
            backward.insert(k.clone(), v.clone());
        }
        let forward = Value::Object(forward);
        let backward = Value::Object(backward);

        prop_assert_eq!(hasher::hash_value(&forward), hasher::hash_value(&forward));
        prop_assert_eq!(hasher::canonicalize(&forward), hasher::canonicalize(&backward));
        prop_assert_eq!(hasher::hash_value(&forward), hasher::hash_value(&backward));
    }

    #[test]
    fn prop_hash_is_sensitive_to_leaf_changes(
        pairs in object_pairs_strategy(),
        replacement in any::<i64>(),
    ) {
        let original = Value::Object(pairs.iter().cloned().collect());
        let (key, old) = &pairs[0];
        prop_assume!(old != &Value::from(replacement));

        let mut mutated = original.clone();
        mutated[key.as_str()] = Value::from(replacement);
        prop_assert_ne!(hasher::canonicalize(&original), hasher::canonicalize(&mutated));
        prop_assert_ne!(hasher::hash_value(&original), hasher::hash_value(&mutated));
    }

    #[test]
    fn prop_diff_is_complete_and_disjoint(previous in snapshot_strategy(), current in snapshot_strategy()) {
        let report = diff::diff(&previous, &current);

        let added = ids(report.added.iter());
        let modified = ids(report.modified.iter().map(|m| &m.element));
        let removed = ids(report.removed.iter());
        prop_assert!(added.is_disjoint(&modified));
        prop_assert!(added.is_disjoint(&removed));
        prop_assert!(modified.is_disjoint(&removed));

        let before = ids(previous.elements.iter());
        let after = ids(current.elements.iter());
        prop_assert_eq!(&added, &after.difference(&before).cloned().collect::<BTreeSet<_>>());
        prop_assert_eq!(&removed, &before.difference(&after).cloned().collect::<BTreeSet<_>>());

        for element in &current.elements {
            if let Some(old) = previous.find(&element.id) {
                let differs = old.name != element.name
                    || old.description != element.description
                    || old.kind != element.kind
                    || old.variant_properties_hash != element.variant_properties_hash
                    || old.hashes != element.hashes;
                prop_assert_eq!(modified.contains(&element.id), differs);
            }
        }
        prop_assert_eq!(report.has_changes(), !(added.is_empty() && modified.is_empty() && removed.is_empty()));
    }

    #[test]
    fn prop_diff_with_self_is_empty(snapshot in snapshot_strategy()) {
        prop_assert!(!diff::diff(&snapshot, &snapshot).has_changes());
    }

    #[test]
    fn prop_normalize_is_idempotent(previous in snapshot_strategy(), current in snapshot_strategy()) {
        let once = normalize::normalize(diff::diff(&previous, &current));
        let twice = normalize::normalize(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_persistence_round_trip(snapshot in snapshot_strategy(), cap in 4usize..512) {
        let config = StoreConfig { max_chunk_bytes: cap, ..Default::default() };
        let store = ChunkedStore::new(MemoryBackend::new(), config).unwrap();

        let metadata = store.save(&snapshot).unwrap();
        let payload_len = serde_json::to_string(&snapshot).unwrap().len();
        prop_assert_eq!(metadata.total_length, payload_len);
        if payload_len > cap {
            prop_assert!(metadata.chunk_count >= 2);
        }
        prop_assert_eq!(store.load().unwrap(), Some(snapshot));
    }

    #[test]
    fn prop_serialized_snapshot_validates(snapshot in snapshot_strategy()) {
        let value = serde_json::to_value(&snapshot).unwrap();
        prop_assert!(validation::validate_snapshot(&value));
        for element in value["elements"].as_array().unwrap() {
            prop_assert!(validation::validate_element(element));
        }
        prop_assert_eq!(validation::parse_snapshot(&value).unwrap(), snapshot);
    }
}
