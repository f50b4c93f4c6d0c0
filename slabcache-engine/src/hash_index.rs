//! # Hash Index
//!
//! Maps key bytes to the item currently linked under that key. A single,
//! unsharded `HashMap<Box<[u8]>, ItemId, RandomState>` — the item layer's
//! concurrency model is single-threaded cooperative, so there is no
//! contention to shard away.

use ahash::RandomState;
use hashbrown::HashMap;

use crate::item::ItemId;

/// Key → linked-item lookup table.
///
/// Collision strategy is hashbrown's open addressing; chained buckets would
/// work equally well here, nothing above this module cares which.
pub struct HashIndex {
    table: HashMap<Box<[u8]>, ItemId, RandomState>,
}

impl HashIndex {
    /// Creates a table pre-sized to `2^hash_power` buckets.
    pub fn new(hash_power: u8) -> Self {
        let capacity = 1usize << hash_power;
        HashIndex {
            table: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    /// O(1) average lookup.
    pub fn get(&self, key: &[u8]) -> Option<ItemId> {
        self.table.get(key).copied()
    }

    /// Inserts a key → item mapping. Callers must `delete` any existing
    /// entry for this key first — the item layer enforces this by
    /// unlinking the old item before linking the new one.
    pub fn put(&mut self, key: Box<[u8]>, id: ItemId) {
        self.table.insert(key, id);
    }

    /// Removes the mapping for `key`, if any.
    pub fn delete(&mut self, key: &[u8]) -> Option<ItemId> {
        self.table.remove(key)
    }

    /// Iterates every currently-linked item id. Used by the opt-in
    /// `Store::purge_expired` sweep; never consulted by the hot path.
    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.table.values().copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u32) -> ItemId {
        // Constructed only for index-equality checks in this module's
        // tests; `store.rs` exercises real ids produced by the arena.
        crate::item::test_support::make_item_id(0, index, 0)
    }

    #[test]
    fn put_get_delete_round_trip() {
        let mut index = HashIndex::new(4);
        index.put(b"k1".to_vec().into_boxed_slice(), id(1));
        assert_eq!(index.get(b"k1"), Some(id(1)));

        let removed = index.delete(b"k1");
        assert_eq!(removed, Some(id(1)));
        assert_eq!(index.get(b"k1"), None);
    }

    #[test]
    fn missing_key_is_none() {
        let index = HashIndex::new(4);
        assert_eq!(index.get(b"missing"), None);
    }
}
