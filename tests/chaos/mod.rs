//! Chaos testing for the chunked store
//!
//! Injects backend faults (rejected writes, silent truncation, dropped
//! writes) at chosen or random points of a save and checks that the store
//! never serves a partial snapshot and never loses the last good one.

use ::stylesnap::*;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// How a targeted write misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The backend returns an error
    Reject,
    /// The backend stores only the first half of the value
    Truncate,
    /// The backend reports success but stores nothing
    Drop,
}

/// A one-shot fault aimed at the n-th write whose key contains `key_filter`
#[derive(Debug, Clone)]
pub struct FaultPlan {
    pub fault: Fault,
    pub key_filter: String,
    pub nth: usize,
}

/// Backend wrapper that injects faults into writes
pub struct FaultyBackend {
    pub inner: MemoryBackend,
    plan: Mutex<Option<FaultPlan>>,
    sticky: Mutex<Option<String>>,
    matching_writes: AtomicUsize,
    pub injected: AtomicUsize,
}

impl FaultyBackend {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            plan: Mutex::new(None),
            sticky: Mutex::new(None),
            matching_writes: AtomicUsize::new(0),
            injected: AtomicUsize::new(0),
        }
    }

    /// Arm a fault; replaces any pending one
    pub fn arm(&self, plan: FaultPlan) {
        self.matching_writes.store(0, Ordering::SeqCst);
        *self.plan.lock() = Some(plan);
    }

    /// Reject every write whose key contains `key_filter` until disarmed
    pub fn reject_all(&self, key_filter: &str) {
        *self.sticky.lock() = Some(key_filter.to_string());
    }

    pub fn disarm(&self) {
        *self.plan.lock() = None;
        *self.sticky.lock() = None;
    }

    fn fire(&self, key: &str) -> Option<Fault> {
        if let Some(filter) = self.sticky.lock().as_deref() {
            if key.contains(filter) {
                self.injected.fetch_add(1, Ordering::SeqCst);
                return Some(Fault::Reject);
            }
        }
        let mut plan = self.plan.lock();
        let armed = plan.as_ref()?;
        if !key.contains(&armed.key_filter) {
            return None;
        }
        let seen = self.matching_writes.fetch_add(1, Ordering::SeqCst);
        if seen != armed.nth {
            return None;
        }
        let fault = armed.fault;
        *plan = None;
        self.injected.fetch_add(1, Ordering::SeqCst);
        Some(fault)
    }
}

impl KeyValueBackend for FaultyBackend {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        self.inner.get(namespace, key)
    }

    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return self.inner.set(namespace, key, value);
        }
        match self.fire(key) {
            None => self.inner.set(namespace, key, value),
            Some(Fault::Reject) => Err(SnapError::backend(format!("injected failure on {}", key))),
            Some(Fault::Truncate) => {
                let mut cut = value.len() / 2;
                while !value.is_char_boundary(cut) {
                    cut -= 1;
                }
                self.inner.set(namespace, key, &value[..cut])
            }
            Some(Fault::Drop) => Ok(()),
        }
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        self.inner.delete(namespace, key)
    }
}

/// Chaos driver: seeded snapshots and fault placement
pub struct StoreChaosTest {
    pub backend: FaultyBackend,
    pub config: StoreConfig,
    pub rng: StdRng,
}

impl StoreChaosTest {
    pub fn new(seed: u64, max_chunk_bytes: usize) -> Self {
        Self {
            backend: FaultyBackend::new(),
            config: StoreConfig {
                max_chunk_bytes,
                ..Default::default()
            },
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn store(&self) -> ChunkedStore<&FaultyBackend> {
        ChunkedStore::new(&self.backend, self.config.clone()).unwrap()
    }

    pub fn random_snapshot(&mut self, timestamp: i64) -> Snapshot {
        let count = self.rng.random_range(1..40);
        let elements = (0..count)
            .map(|i| {
                let fill = format!("{:x}", self.rng.random::<u32>());
                ElementRecord::new(format!("{}:{}", timestamp, i), format!("Element {}", i), ElementKind::Component)
                    .with_hash(Channel::Fills, fill)
            })
            .collect();
        Snapshot::new(timestamp, elements)
    }

    /// Number of chunks `snapshot` splits into
    pub fn chunk_count(&self, snapshot: &Snapshot) -> usize {
        let payload = serde_json::to_string(snapshot).unwrap();
        storage::split_chunks(&payload, self.config.max_chunk_bytes).len()
    }
}

#[derive(Debug, Default)]
pub struct ChaosReport {
    pub rounds: usize,
    pub failed_saves: usize,
    pub test_passed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_failed_temp_chunk_keeps_previous() {
        let mut chaos = StoreChaosTest::new(1, 64);
        let previous = chaos.random_snapshot(1);
        let next = chaos.random_snapshot(2);
        let chunks = chaos.chunk_count(&next);
        assert!(chunks >= 2);

        let store = chaos.store();
        store.save(&previous).unwrap();

        for k in 0..chunks {
            for fault in [Fault::Reject, Fault::Truncate, Fault::Drop] {
                chaos.backend.arm(FaultPlan {
                    fault,
                    key_filter: "_tmp_chunk_".to_string(),
                    nth: k,
                });
                let result = store.save(&next);
                assert!(
                    matches!(result, Err(SnapError::StorageWriteFailure { .. })),
                    "{:?} on temp chunk {} did not fail the save",
                    fault,
                    k
                );
                assert_eq!(store.load().unwrap().as_ref(), Some(&previous));
                let keys = chaos.backend.inner.keys("design_tracker");
                assert!(keys.iter().all(|key| !key.contains("_tmp_")), "left {:?}", keys);
            }
        }
    }

    #[test]
    fn test_failed_temp_metadata_keeps_previous() {
        let mut chaos = StoreChaosTest::new(2, 128);
        let previous = chaos.random_snapshot(1);
        let next = chaos.random_snapshot(2);
        let store = chaos.store();
        store.save(&previous).unwrap();

        chaos.backend.arm(FaultPlan {
            fault: Fault::Truncate,
            key_filter: "_tmp_meta".to_string(),
            nth: 0,
        });
        assert!(store.save(&next).is_err());
        assert_eq!(store.load().unwrap(), Some(previous));
    }

    #[test]
    fn test_failed_first_save_leaves_nothing() {
        let mut chaos = StoreChaosTest::new(3, 64);
        let snapshot = chaos.random_snapshot(1);
        let store = chaos.store();

        chaos.backend.arm(FaultPlan {
            fault: Fault::Reject,
            key_filter: "_tmp_chunk_".to_string(),
            nth: 1,
        });
        assert!(store.save(&snapshot).is_err());
        assert_eq!(store.load().unwrap(), None);
        assert!(chaos.backend.inner.is_empty());
    }

    #[test]
    fn test_failed_promotion_is_retried() {
        let mut chaos = StoreChaosTest::new(4, 64);
        let previous = chaos.random_snapshot(1);
        let next = chaos.random_snapshot(2);
        let store = chaos.store();
        store.save(&previous).unwrap();

        // committed keys are only written during promotion
        chaos.backend.arm(FaultPlan {
            fault: Fault::Reject,
            key_filter: "snapshot_chunk_".to_string(),
            nth: 1,
        });
        store.save(&next).unwrap();

        assert_eq!(chaos.backend.injected.load(Ordering::SeqCst), 1);
        assert_eq!(store.load().unwrap(), Some(next));
        let keys = chaos.backend.inner.keys("design_tracker");
        assert!(keys.iter().all(|key| !key.contains("_tmp_")));
    }

    #[test]
    fn test_stuck_promotion_reports_pending_commit() {
        let mut chaos = StoreChaosTest::new(5, 64);
        let previous = chaos.random_snapshot(1);
        let next = chaos.random_snapshot(2);
        let tracker = TrackerBuilder::new()
            .max_chunk_bytes(64)
            .build(&chaos.backend)
            .unwrap();
        tracker.commit_snapshot(previous).unwrap();

        chaos.backend.reject_all("snapshot_chunk_");
        let err = tracker.commit_snapshot(next.clone()).unwrap_err();
        assert!(matches!(err, SnapError::CommitPending(_)), "got {:?}", err);
        assert!(err.user_message().contains("next load"));

        // the verified staged copy becomes the baseline once writes succeed
        chaos.backend.disarm();
        let stored = tracker.stored_snapshot().unwrap().unwrap();
        assert_eq!(stored.timestamp, next.timestamp);
        assert_eq!(stored.len(), next.len());
        let keys = chaos.backend.inner.keys("design_tracker");
        assert!(keys.iter().all(|key| !key.contains("_tmp_")));
    }

    #[test]
    #[traced_test]
    fn test_random_fault_rounds() {
        let mut chaos = StoreChaosTest::new(42, 96);
        let mut report = ChaosReport::default();
        let mut last_good: Option<Snapshot> = None;

        for round in 0..50 {
            let snapshot = chaos.random_snapshot(round + 1);
            let chunks = chaos.chunk_count(&snapshot);

            let inject = chaos.rng.random_bool(0.6);
            if inject {
                let fault = match chaos.rng.random_range(0..3) {
                    0 => Fault::Reject,
                    1 => Fault::Truncate,
                    _ => Fault::Drop,
                };
                let nth = chaos.rng.random_range(0..chunks);
                chaos.backend.arm(FaultPlan {
                    fault,
                    key_filter: "_tmp_chunk_".to_string(),
                    nth,
                });
            } else {
                chaos.backend.disarm();
            }

            let store = chaos.store();
            match store.save(&snapshot) {
                Ok(_) => last_good = Some(snapshot),
                Err(e) => {
                    warn!(round, "save failed: {}", e);
                    report.failed_saves += 1;
                }
            }
            assert_eq!(store.load().unwrap(), last_good, "round {}", round);
            report.rounds += 1;
        }

        report.test_passed = report.failed_saves > 0 && last_good.is_some();
        info!(?report, "chaos rounds finished");
        assert!(report.test_passed);
        assert_eq!(
            chaos.backend.injected.load(Ordering::SeqCst),
            report.failed_saves
        );
    }
}
