//! Main test module for Stylesnap
//!
//! This module includes all test suites:
//! - Integration tests for realistic design-system workflows
//! - Chaos tests for storage resilience under backend faults
//! - Property-based tests for invariants
//! - Edge cases

pub mod chaos;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::stylesnap::*;
    use serde_json::json;

    #[test]
    fn test_empty_snapshot_round_trip() {
        let tracker = Tracker::new(MemoryBackend::new()).unwrap();
        tracker.commit_snapshot(Snapshot::new(1, vec![])).unwrap();

        let stored = tracker.stored_snapshot().unwrap().unwrap();
        assert!(stored.is_empty());

        let report = tracker.request_diff(&Snapshot::new(2, vec![])).unwrap();
        assert!(!report.has_changes());
    }

    #[test]
    fn test_unicode_names_across_chunk_boundaries() {
        let names = [
            "Кнопка",
            "按钮",
            "ボタン",
            "버튼",
            "Κουμπί",
            "زر",
            "כפתור",
            "🚀🌟💾",
        ];
        let elements = names
            .iter()
            .enumerate()
            .map(|(i, name)| ElementRecord::new(i.to_string(), *name, ElementKind::Component))
            .collect();
        let snapshot = Snapshot::new(1, elements);

        // a cap this small forces splits inside multi-byte names
        let tracker = TrackerBuilder::new()
            .max_chunk_bytes(5)
            .build(MemoryBackend::new())
            .unwrap();
        let committed = tracker.commit_snapshot(snapshot).unwrap();
        assert_eq!(tracker.stored_snapshot().unwrap(), Some(committed));
    }

    #[test]
    fn test_same_id_rename_and_kind_change() {
        let tracker = Tracker::new(MemoryBackend::new()).unwrap();
        tracker
            .commit_snapshot(Snapshot::new(
                1,
                vec![ElementRecord::new("1", "Brand", ElementKind::ColorStyle)],
            ))
            .unwrap();

        let report = tracker
            .request_diff(&Snapshot::new(
                2,
                vec![ElementRecord::new("1", "Brand Color", ElementKind::Variable)],
            ))
            .unwrap();

        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
        let changed: Vec<_> = report.modified[0]
            .changes
            .iter()
            .map(|c| c.property.as_str())
            .collect();
        assert_eq!(changed, vec!["name", "kind"]);
    }

    #[test]
    fn test_payload_with_wrong_types_rejected() {
        let tracker = Tracker::new(MemoryBackend::new()).unwrap();
        let payloads = [
            json!({"timestamp": "now", "elements": []}),
            json!({"timestamp": 1, "elements": {}}),
            json!({"timestamp": 1, "elements": [{"id": "1", "name": "A", "kind": "WIDGET"}]}),
            json!({"timestamp": 1, "elements": [{"id": "1", "name": "A", "kind": "COMPONENT", "fillsHash": 7}]}),
            json!({"timestamp": 1, "elements": [
                {"id": "1", "name": "A", "kind": "COMPONENT"},
                {"id": "1", "name": "B", "kind": "COMPONENT"}
            ]}),
        ];

        for payload in &payloads {
            assert!(
                matches!(tracker.accept_payload(payload), Err(SnapError::InvalidFormat(_))),
                "accepted {}",
                payload
            );
        }
        assert!(tracker.store().backend().is_empty());
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let backend = MemoryBackend::new();
        let first = TrackerBuilder::new().namespace("doc_a").build(&backend).unwrap();
        let second = TrackerBuilder::new().namespace("doc_b").build(&backend).unwrap();

        first
            .commit_snapshot(Snapshot::new(1, vec![ElementRecord::new("1", "A", ElementKind::Component)]))
            .unwrap();
        assert_eq!(second.stored_snapshot().unwrap(), None);

        second.reset().unwrap();
        assert!(first.stored_snapshot().unwrap().is_some());
    }
}

// Re-export test utilities for use in other suites
pub use integration::{DesignSystemGenerator, GeneratorConfig, TrackerTestHarness};
