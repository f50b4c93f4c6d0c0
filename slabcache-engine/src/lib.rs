// slabcache-engine - item layer, hash index, and slab-interface contract
//
// The item layer (`store`) is the core this crate exists to provide; `item`
// and `slab` model the record representation and its backing allocator,
// `hash_index` resolves keys to linked items, and `shared` is the
// thread-safe embedding for callers that need one.

pub mod hash_index;
pub mod item;
pub mod shared;
pub mod slab;
pub mod store;

pub use hash_index::HashIndex;
pub use item::{Item, ItemId, VType, MAX_KEY_LEN};
pub use shared::SharedStore;
pub use slab::{ArenaSlab, ClassTable, SlabAllocator};
pub use store::{ItemHandle, Store, TtlStatus};
