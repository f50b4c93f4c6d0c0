//! # Slab-Interface Contract
//!
//! The real slab allocator (class sizing policy, eviction strategy, page
//! rebalancing) is an external collaborator; this module defines the
//! contract the item layer depends on ([`SlabAllocator`]) and ships one
//! concrete, in-tree implementation ([`ArenaSlab`]) so the crate is
//! runnable standalone.
//!
//! `ArenaSlab` is a per-class node arena (`slots: Vec<Option<Item>>` +
//! `free: Vec<u32>`, index-based instead of pointer-based) with a FIFO
//! eviction queue rather than a doubly-linked LRU list — the item layer
//! only needs *a* victim when a class is full, not the least-recently-used
//! one; which victim to prefer is a separate, out-of-scope eviction policy.

use std::collections::VecDeque;

use crate::item::{Item, ItemId, HEADER_LEN};

/// Smallest and largest per-item chunk sizes in the default class ladder.
pub const MIN_CHUNK_SIZE: u32 = 96;
pub const DEFAULT_GROWTH_FACTOR: f64 = 1.25;

/// Ordered ladder of slab-class chunk sizes.
///
/// Each size is the FULL chunk size, i.e. it includes [`HEADER_LEN`]; the
/// usable key+cas+value capacity for a class is `size - HEADER_LEN`.
#[derive(Debug, Clone)]
pub struct ClassTable {
    sizes: Vec<u32>,
}

impl ClassTable {
    /// Builds a geometric ladder of chunk sizes from `min` up to `max`,
    /// growing by `factor` each step. Mirrors the growth-factor slab sizing
    /// used by memcached-family allocators.
    pub fn new(min: u32, max: u32, factor: f64) -> Self {
        assert!(min > HEADER_LEN, "min chunk size must exceed header overhead");
        assert!(factor > 1.0, "growth factor must be > 1.0");

        let mut sizes = Vec::new();
        let mut size = min as f64;
        while (size as u32) < max {
            sizes.push(size as u32);
            size *= factor;
        }
        sizes.push(max);
        ClassTable { sizes }
    }

    /// Builds the default ladder, capped by the configured `slab_size`.
    pub fn default_for(slab_size: u32) -> Self {
        ClassTable::new(MIN_CHUNK_SIZE, slab_size.max(MIN_CHUNK_SIZE + 1), DEFAULT_GROWTH_FACTOR)
    }

    /// Smallest class whose full chunk size covers `needed_bytes`, or `None`
    /// if no class is large enough (`OVERSIZED`).
    pub fn class_for_size(&self, needed_bytes: u32) -> Option<u8> {
        self.sizes
            .iter()
            .position(|&size| size >= needed_bytes)
            .map(|idx| idx as u8)
    }

    /// Usable key+cas+value capacity for a class.
    pub fn usable_capacity(&self, class_id: u8) -> usize {
        (self.sizes[class_id as usize] - HEADER_LEN) as usize
    }

    pub fn class_count(&self) -> usize {
        self.sizes.len()
    }
}

/// Per-class storage: a dense item arena, a free-list, and a FIFO of
/// currently-linked slots for eviction candidate selection.
struct ClassArena {
    slots: Vec<Option<Item>>,
    free: Vec<u32>,
    generation: Vec<u32>,
    link_order: VecDeque<u32>,
    /// Mirrors the slab-level refcount the contract requires so the region
    /// backing pinned items is never reported as reclaimable.
    pinned: u64,
    /// Maximum number of slots this class may grow to. `None` means the
    /// class grows without bound (the default); a bounded arena is what
    /// makes `NOMEM` reachable once eviction also fails.
    cap: Option<u32>,
}

impl ClassArena {
    fn new(cap: Option<u32>) -> Self {
        ClassArena {
            slots: Vec::new(),
            free: Vec::new(),
            generation: Vec::new(),
            link_order: VecDeque::new(),
            pinned: 0,
            cap,
        }
    }

    /// Reserves a slot from the free list or by growing the arena. Returns
    /// `None` if the class is at its configured capacity and has no free
    /// slot.
    fn reserve_slot(&mut self) -> Option<u32> {
        if let Some(idx) = self.free.pop() {
            return Some(idx);
        }
        if let Some(cap) = self.cap {
            if self.slots.len() as u32 >= cap {
                return None;
            }
        }
        self.slots.push(None);
        self.generation.push(0);
        Some((self.slots.len() - 1) as u32)
    }
}

/// The slab-interface contract the item layer depends on.
pub trait SlabAllocator {
    fn class_for_size(&self, needed_bytes: u32) -> Option<u8>;
    fn usable_capacity(&self, class_id: u8) -> usize;

    /// Reserves an empty slot for `class_id`, from the free list or by
    /// growing the arena. Returns `None` if the class is at capacity and has
    /// no free slot (caller should consult `eviction_candidate` and retry
    /// after evicting it). The slot holds no item until [`Self::install`]
    /// is called with the returned id.
    fn reserve_slot(&mut self, class_id: u8) -> Option<ItemId>;

    /// Places `item` into a slot previously returned by `reserve_slot`.
    fn install(&mut self, id: ItemId, item: Item);

    /// A linked, unreferenced item in `class_id` eligible for eviction, if
    /// any. Does not remove it — the item layer must `reuse` it (which
    /// unlinks it from the hash index) before the slot is actually freed.
    fn eviction_candidate(&self, class_id: u8) -> Option<ItemId>;

    fn get(&self, id: ItemId) -> Option<&Item>;
    fn get_mut(&mut self, id: ItemId) -> Option<&mut Item>;

    /// Registers a slot as linked (enters the eviction queue).
    fn mark_linked(&mut self, id: ItemId);
    /// Registers a slot as unlinked (leaves the eviction queue).
    fn mark_unlinked(&mut self, id: ItemId);

    /// Removes and returns the item in `id`'s slot, returning the slot to
    /// the class free list and bumping its generation so stale handles stop
    /// resolving.
    fn put_item(&mut self, id: ItemId) -> Option<Item>;

    fn acquire_refcount(&mut self, class_id: u8);
    fn release_refcount(&mut self, class_id: u8);
}

/// Default in-tree [`SlabAllocator`]: one arena per class, FIFO eviction.
pub struct ArenaSlab {
    table: ClassTable,
    classes: Vec<ClassArena>,
}

impl ArenaSlab {
    /// Builds an arena whose classes grow without bound.
    pub fn new(table: ClassTable) -> Self {
        Self::with_capacity(table, None)
    }

    /// Builds an arena whose classes are capped at `max_slots_per_class`
    /// slots each, so `NOMEM` becomes reachable once eviction also fails.
    pub fn with_capacity(table: ClassTable, max_slots_per_class: Option<u32>) -> Self {
        let classes = (0..table.class_count())
            .map(|_| ClassArena::new(max_slots_per_class))
            .collect();
        ArenaSlab { table, classes }
    }

    fn arena(&self, class_id: u8) -> &ClassArena {
        &self.classes[class_id as usize]
    }

    fn arena_mut(&mut self, class_id: u8) -> &mut ClassArena {
        &mut self.classes[class_id as usize]
    }

    fn valid(&self, id: ItemId) -> bool {
        let arena = self.arena(id.class_id);
        arena
            .generation
            .get(id.index as usize)
            .is_some_and(|&gen| gen == id.generation)
    }
}

impl SlabAllocator for ArenaSlab {
    fn class_for_size(&self, needed_bytes: u32) -> Option<u8> {
        self.table.class_for_size(needed_bytes)
    }

    fn usable_capacity(&self, class_id: u8) -> usize {
        self.table.usable_capacity(class_id)
    }

    fn reserve_slot(&mut self, class_id: u8) -> Option<ItemId> {
        let arena = self.arena_mut(class_id);
        let idx = arena.reserve_slot()?;
        Some(ItemId {
            class_id,
            index: idx,
            generation: arena.generation[idx as usize],
        })
    }

    fn install(&mut self, id: ItemId, item: Item) {
        debug_assert!(self.valid(id));
        self.arena_mut(id.class_id).slots[id.index as usize] = Some(item);
    }

    fn eviction_candidate(&self, class_id: u8) -> Option<ItemId> {
        let arena = self.arena(class_id);
        for &idx in arena.link_order.iter() {
            if let Some(item) = &arena.slots[idx as usize] {
                if item.refcount() == 0 {
                    return Some(ItemId {
                        class_id,
                        index: idx,
                        generation: arena.generation[idx as usize],
                    });
                }
            }
        }
        None
    }

    fn get(&self, id: ItemId) -> Option<&Item> {
        if !self.valid(id) {
            return None;
        }
        self.arena(id.class_id).slots[id.index as usize].as_ref()
    }

    fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        if !self.valid(id) {
            return None;
        }
        self.arena_mut(id.class_id).slots[id.index as usize].as_mut()
    }

    fn mark_linked(&mut self, id: ItemId) {
        if !self.valid(id) {
            return;
        }
        self.arena_mut(id.class_id).link_order.push_back(id.index);
    }

    fn mark_unlinked(&mut self, id: ItemId) {
        if !self.valid(id) {
            return;
        }
        let arena = self.arena_mut(id.class_id);
        if let Some(pos) = arena.link_order.iter().position(|&idx| idx == id.index) {
            arena.link_order.remove(pos);
        }
    }

    fn put_item(&mut self, id: ItemId) -> Option<Item> {
        if !self.valid(id) {
            return None;
        }
        let arena = self.arena_mut(id.class_id);
        let item = arena.slots[id.index as usize].take();
        if item.is_some() {
            arena.generation[id.index as usize] = arena.generation[id.index as usize].wrapping_add(1);
            arena.free.push(id.index);
        }
        item
    }

    fn acquire_refcount(&mut self, class_id: u8) {
        self.arena_mut(class_id).pinned += 1;
    }

    fn release_refcount(&mut self, class_id: u8) {
        let arena = self.arena_mut(class_id);
        arena.pinned = arena.pinned.saturating_sub(1);
    }
}
