//! Post-processing of raw change reports
//!
//! Two rules run after diffing and before a report reaches the caller:
//!
//! 1. **Redundant set entries**: a modified `ComponentSet` is dropped when at
//!    least one modified `Component` names it as `parent_name`. The variant
//!    entry already says what changed.
//! 2. **Qualified variant names**: every `Component` with a non-empty
//!    `parent_name` is shown as `"<parent> - <name>"` in all three lists.
//!    Other kinds keep their name even if they carry a parent.
//!
//! Normalization only reshapes the report; nothing is re-hashed or re-compared.
//! It is idempotent through [`ChangeReport::normalized`]: a report that was
//! already normalized is returned as is, so a variant whose raw name happens
//! to start with `"<parent> - "` is still qualified exactly once.

use crate::collections::{HashSet, HashSetExt};
use crate::types::{ChangeReport, ElementKind, ElementRecord};
use tracing::trace;

/// Apply the redundancy filter and display-name qualifier to `report`
pub fn normalize(mut report: ChangeReport) -> ChangeReport {
    if report.normalized {
        return report;
    }

    let mut touched_sets = HashSet::with_capacity(report.modified.len());
    for modified in &report.modified {
        let element = &modified.element;
        if element.kind == ElementKind::Component {
            if let Some(parent) = element.parent_name.as_deref().filter(|p| !p.is_empty()) {
                touched_sets.insert(parent.to_string());
            }
        }
    }

    report.modified.retain(|modified| {
        let element = &modified.element;
        let redundant =
            element.kind == ElementKind::ComponentSet && touched_sets.contains(&element.name);
        if redundant {
            trace!(set = %element.name, "dropping component set covered by variant changes");
        }
        !redundant
    });

    for element in report.added.iter_mut().chain(report.removed.iter_mut()) {
        qualify_name(element);
    }
    for modified in &mut report.modified {
        qualify_name(&mut modified.element);
    }

    report.normalized = true;
    report
}

/// Rewrite a variant's name as `"<parent> - <name>"`
///
/// Prefixes unconditionally; [`normalize`] makes sure it runs once per report.
pub fn qualify_name(element: &mut ElementRecord) {
    if element.kind != ElementKind::Component {
        return;
    }
    let Some(parent) = element.parent_name.as_deref().filter(|p| !p.is_empty()) else {
        return;
    };
    element.name = format!("{} - {}", parent, element.name);
}
