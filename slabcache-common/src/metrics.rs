//! # Item-Layer Metrics
//!
//! A small counter bag the item layer increments and decrements as items
//! move through `alloc`/`link`/`unlink`/`delete`. Kept decoupled from the
//! request path: callers record, nothing here blocks or allocates.

use std::sync::atomic::{AtomicU64, Ordering};

/// One of the eight named counters the item layer emits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Total item-layer requests handled (including failures).
    ItemReq,
    /// Requests that failed with an allocation exception (`NoMemory`).
    ItemReqEx,
    /// Items linked into the hash index.
    ItemLink,
    /// Items unlinked from the hash index.
    ItemUnlink,
    /// Items removed via an explicit `delete`.
    ItemRemove,
    /// Items currently linked (live count).
    ItemCurr,
    /// Bytes of key+value currently stored across linked items.
    ItemKeyvalByte,
    /// Bytes of value currently stored across linked items.
    ItemValByte,
}

const COUNTER_COUNT: usize = 8;

impl Counter {
    fn index(self) -> usize {
        match self {
            Counter::ItemReq => 0,
            Counter::ItemReqEx => 1,
            Counter::ItemLink => 2,
            Counter::ItemUnlink => 3,
            Counter::ItemRemove => 4,
            Counter::ItemCurr => 5,
            Counter::ItemKeyvalByte => 6,
            Counter::ItemValByte => 7,
        }
    }
}

/// Thread-safe counter bag for the item layer.
///
/// Uses `AtomicU64` so recording is zero-allocation and cheap; `Relaxed`
/// ordering is sufficient because callers never need cross-counter
/// ordering, only eventual consistency of the snapshot.
#[derive(Debug)]
pub struct Metrics {
    counters: [AtomicU64; COUNTER_COUNT],
}

impl Metrics {
    /// Creates a new, zeroed counter bag.
    pub fn new() -> Self {
        Metrics {
            counters: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Increments a counter by 1.
    pub fn incr(&self, counter: Counter) {
        self.incr_n(counter, 1);
    }

    /// Decrements a counter by 1 (saturating at 0).
    pub fn decr(&self, counter: Counter) {
        self.decr_n(counter, 1);
    }

    /// Increments a counter by `delta`.
    pub fn incr_n(&self, counter: Counter, delta: u64) {
        self.counters[counter.index()].fetch_add(delta, Ordering::Relaxed);
    }

    /// Decrements a counter by `delta`, saturating at 0.
    pub fn decr_n(&self, counter: Counter, delta: u64) {
        self.counters[counter.index()].fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
            Some(v.saturating_sub(delta))
        }).ok();
    }

    /// Reads the current value of a single counter.
    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter.index()].load(Ordering::Relaxed)
    }

    /// Returns a point-in-time snapshot of all eight counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            item_req: self.get(Counter::ItemReq),
            item_req_ex: self.get(Counter::ItemReqEx),
            item_link: self.get(Counter::ItemLink),
            item_unlink: self.get(Counter::ItemUnlink),
            item_remove: self.get(Counter::ItemRemove),
            item_curr: self.get(Counter::ItemCurr),
            item_keyval_byte: self.get(Counter::ItemKeyvalByte),
            item_val_byte: self.get(Counter::ItemValByte),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics::new()
    }
}

/// Snapshot of all item-layer counters at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub item_req: u64,
    pub item_req_ex: u64,
    pub item_link: u64,
    pub item_unlink: u64,
    pub item_remove: u64,
    pub item_curr: u64,
    pub item_keyval_byte: u64,
    pub item_val_byte: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incr_and_decr_round_trip() {
        let metrics = Metrics::new();
        metrics.incr(Counter::ItemLink);
        metrics.incr_n(Counter::ItemLink, 4);
        assert_eq!(metrics.get(Counter::ItemLink), 5);

        metrics.decr(Counter::ItemLink);
        assert_eq!(metrics.get(Counter::ItemLink), 4);
    }

    #[test]
    fn decr_saturates_at_zero() {
        let metrics = Metrics::new();
        metrics.decr_n(Counter::ItemCurr, 10);
        assert_eq!(metrics.get(Counter::ItemCurr), 0);
    }

    #[test]
    fn snapshot_reflects_all_counters() {
        let metrics = Metrics::new();
        metrics.incr(Counter::ItemReq);
        metrics.incr(Counter::ItemReqEx);
        let snap = metrics.snapshot();
        assert_eq!(snap.item_req, 1);
        assert_eq!(snap.item_req_ex, 1);
        assert_eq!(snap.item_link, 0);
    }
}
