//! Request identifiers: millisecond timestamps, bumped to stay strictly increasing

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out unique, strictly increasing ids for the life of the process
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Current epoch milliseconds, or one past the previous id if the clock
    /// has not moved on
    pub fn next_id(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let mut id = now;
        // fetch_update never fails when the closure always returns Some
        let _ = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                id = now.max(last + 1);
                Some(id)
            });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_ids_strictly_increase() {
        let ids = IdGenerator::new();
        let mut prev = ids.next_id();
        for _ in 0..1000 {
            let next = ids.next_id();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let ids = Arc::new(IdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..500).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
