//! # Thread-Safe Embedding
//!
//! The item layer's own concurrency model is single-threaded cooperative:
//! no operation blocks, and nothing inside `Store` takes a lock. A single
//! coarse mutex around the whole store is the expected strategy for a
//! multi-threaded embedding, so that's what this provides — not a sharded
//! rewrite. Sharding the hash index would break the whole-table
//! CAS-monotonicity and relink-atomicity guarantees, so `SharedStore`
//! deliberately stays a thin wrapper rather than a per-shard-lock design.

use std::sync::Arc;

use parking_lot::Mutex;
use slabcache_common::ItemResult;

use crate::slab::{ArenaSlab, SlabAllocator};
use crate::store::{ItemHandle, Store, TtlStatus};

/// `Arc<Mutex<Store>>`, cloneable, safe to hand to multiple worker threads.
///
/// Every method takes the lock for the duration of one item-layer
/// operation and releases it before returning — callers never hold the
/// lock across an `.await` or another blocking call, since no method here
/// is `async` and none of `Store`'s operations block.
pub struct SharedStore<S: SlabAllocator = ArenaSlab> {
    inner: Arc<Mutex<Store<S>>>,
}

// Manual `Clone` impl: `Arc::clone` never requires `S: Clone`, but
// `#[derive(Clone)]` would add that bound anyway since it cannot see through
// `Arc`/`Mutex`.
impl<S: SlabAllocator> Clone for SharedStore<S> {
    fn clone(&self) -> Self {
        SharedStore {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SlabAllocator> SharedStore<S> {
    pub fn new(store: Store<S>) -> Self {
        SharedStore {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn alloc(&self, key: &[u8], exptime: u32, vlen: u32) -> ItemResult<ItemHandle> {
        self.inner.lock().alloc(key, exptime, vlen)
    }

    pub fn get(&self, key: &[u8]) -> ItemResult<ItemHandle> {
        self.inner.lock().get(key)
    }

    pub fn set(&self, key: &[u8], value: &[u8], exptime: u32) -> ItemResult<()> {
        self.inner.lock().set(key, value, exptime)
    }

    pub fn cas(&self, key: &[u8], value: &[u8], exptime: u32, expected_cas: u64) -> ItemResult<()> {
        self.inner.lock().cas(key, value, exptime, expected_cas)
    }

    pub fn annex(&self, key: &[u8], val: &[u8], append: bool) -> ItemResult<()> {
        self.inner.lock().annex(key, val, append)
    }

    pub fn update(&self, handle: &ItemHandle, val: &[u8]) -> ItemResult<()> {
        self.inner.lock().update(handle, val)
    }

    pub fn delete(&self, key: &[u8]) -> ItemResult<()> {
        self.inner.lock().delete(key)
    }

    pub fn touch(&self, key: &[u8], exptime: u32) -> ItemResult<()> {
        self.inner.lock().touch(key, exptime)
    }

    pub fn ttl(&self, key: &[u8]) -> TtlStatus {
        self.inner.lock().ttl(key)
    }

    pub fn release(&self, handle: ItemHandle) {
        self.inner.lock().release(handle);
    }

    pub fn purge_expired(&self) -> usize {
        self.inner.lock().purge_expired()
    }

    /// Runs `f` with the value the handle resolves to, under the lock.
    /// Reading a value out of a `SharedStore` always needs this shape
    /// (rather than a borrow escaping the guard) because the returned
    /// reference would otherwise outlive the `MutexGuard` protecting it.
    pub fn with_value<R>(&self, handle: &ItemHandle, f: impl FnOnce(&[u8]) -> R) -> R {
        let guard = self.inner.lock();
        f(guard.resolve(handle).value())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slabcache_common::{Config, Metrics};
    use std::thread;

    fn shared() -> SharedStore<ArenaSlab> {
        SharedStore::new(Store::new(Config::new(), Metrics::new()))
    }

    #[test]
    fn set_and_get_round_trip_through_the_lock() {
        let store = shared();
        store.set(b"k", b"v", 0).unwrap();
        let h = store.get(b"k").unwrap();
        store.with_value(&h, |v| assert_eq!(v, b"v"));
        store.release(h);
    }

    #[test]
    fn concurrent_writers_see_a_consistent_final_state() {
        let store = shared();
        let mut handles = Vec::new();
        for i in 0..8u32 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                let key = format!("k{i}");
                store.set(key.as_bytes(), b"v", 0).unwrap();
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }
}
