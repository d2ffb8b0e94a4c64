//! Snapshot comparison
//!
//! This module classifies every element of two snapshots as added, removed,
//! or modified, and explains each modification property by property.
//!
//! ## Matching
//!
//! Elements are matched solely by `id`. A rename under the same id is a
//! modification, never an add/remove pair, and so is a change of `kind`:
//! hosts may legitimately repurpose an id and the element must stay tracked.
//!
//! ## What is compared
//!
//! For every id present on both sides:
//! - identity fields: `name`, `description`, `kind`
//! - the variant property fingerprint
//! - every [`Channel`] fingerprint (absent vs absent is unchanged, absent vs
//!   present is changed)
//!
//! Raw channel payloads are only used to render values; they never decide
//! whether something changed.
//!
//! ## Examples
//!
//! ```rust
//! use stylesnap::diff::diff;
//! use stylesnap::types::{ElementKind, ElementRecord, Snapshot};
//!
//! let button = ElementRecord::new("1", "Button", ElementKind::Component);
//! let input = ElementRecord::new("2", "Input", ElementKind::Component);
//!
//! let previous = Snapshot::new(1, vec![button.clone()]);
//! let current = Snapshot::new(2, vec![button, input]);
//!
//! let report = diff(&previous, &current);
//! assert_eq!(report.added.len(), 1);
//! assert!(report.modified.is_empty() && report.removed.is_empty());
//! ```

use crate::channel::Channel;
use crate::collections::index_by_id;
use crate::display::format_channel;
use crate::types::{ChangeReport, ElementRecord, ModifiedElement, PropertyChange, Snapshot};
use rayon::prelude::*;
use tracing::{debug, trace};

/// Compare `previous` against `current`
///
/// `added` and `modified` follow the order of `current`; `removed` follows
/// the order of `previous`.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> ChangeReport {
    let previous_by_id = index_by_id(&previous.elements, |e| e.id.as_str());
    let current_by_id = index_by_id(&current.elements, |e| e.id.as_str());

    enum Outcome {
        Added,
        Modified(Vec<PropertyChange>),
        Unchanged,
    }

    let outcomes = current
        .elements
        .par_iter()
        .map(|element| match previous_by_id.get(element.id.as_str()) {
            None => Outcome::Added,
            Some(old) => {
                let changes = compare_elements(old, element);
                if changes.is_empty() {
                    Outcome::Unchanged
                } else {
                    Outcome::Modified(changes)
                }
            }
        })
        .collect::<Vec<_>>();

    let mut report = ChangeReport::default();
    for (element, outcome) in current.elements.iter().zip(outcomes) {
        match outcome {
            Outcome::Added => report.added.push(element.clone()),
            Outcome::Modified(changes) => {
                trace!(id = %element.id, changes = changes.len(), "element modified");
                report.modified.push(ModifiedElement::new(element.clone(), changes));
            }
            Outcome::Unchanged => {}
        }
    }

    report.removed = previous
        .elements
        .iter()
        .filter(|e| !current_by_id.contains_key(e.id.as_str()))
        .cloned()
        .collect();

    debug!(
        added = report.added.len(),
        modified = report.modified.len(),
        removed = report.removed.len(),
        "computed snapshot diff"
    );

    report
}

/// List every tracked difference between two versions of one element
///
/// An empty result means the element is unchanged.
pub fn compare_elements(old: &ElementRecord, new: &ElementRecord) -> Vec<PropertyChange> {
    let mut changes = Vec::new();

    if old.name != new.name {
        changes.push(change("name", "Name", Some(&old.name), Some(&new.name)));
    }
    if old.description != new.description {
        changes.push(change(
            "description",
            "Description",
            old.description.as_deref(),
            new.description.as_deref(),
        ));
    }
    if old.kind != new.kind {
        changes.push(change(
            "kind",
            "Kind",
            Some(old.kind.label()),
            Some(new.kind.label()),
        ));
    }
    if old.variant_properties_hash != new.variant_properties_hash {
        changes.push(PropertyChange {
            property: "variantProperties".to_string(),
            label: "Variant properties".to_string(),
            old_value: variant_summary(old),
            new_value: variant_summary(new),
        });
    }

    for channel in old.hashes.differing(&new.hashes) {
        changes.push(PropertyChange {
            property: channel.key().to_string(),
            label: channel.label().to_string(),
            old_value: channel_value(channel, old),
            new_value: channel_value(channel, new),
        });
    }

    changes
}

fn change(property: &str, label: &str, old: Option<&str>, new: Option<&str>) -> PropertyChange {
    PropertyChange {
        property: property.to_string(),
        label: label.to_string(),
        old_value: old.map(str::to_string),
        new_value: new.map(str::to_string),
    }
}

fn channel_value(channel: Channel, element: &ElementRecord) -> Option<String> {
    format_channel(channel, element.values.get(channel), element.hashes.get(channel))
}

fn variant_summary(element: &ElementRecord) -> Option<String> {
    match &element.variant_properties {
        Some(props) => Some(
            props
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        None => element.variant_properties_hash.as_ref().map(|h| format!("#{}", h)),
    }
}

/// Stamp `current` with modification times relative to `previous`
///
/// Elements whose tracked fields are unchanged keep the `modified_at` they had
/// in `previous`; added or modified elements get the current snapshot time.
/// `updated_at` is always the current snapshot time.
pub fn reconcile_timestamps(previous: Option<&Snapshot>, mut current: Snapshot) -> Snapshot {
    let observed_at = current.timestamp;
    let previous_by_id = previous.map(|p| index_by_id(&p.elements, |e| e.id.as_str()));

    for element in &mut current.elements {
        let observed: &ElementRecord = element;
        let carried = previous_by_id
            .as_ref()
            .and_then(|map| map.get(observed.id.as_str()).copied())
            .filter(|old| compare_elements(old, observed).is_empty())
            .map(|old| old.modified_at.or(old.updated_at).unwrap_or(observed_at));

        element.modified_at = Some(carried.unwrap_or(observed_at));
        element.updated_at = Some(observed_at);
    }
    current
}
