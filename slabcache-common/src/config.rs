//! # Engine Configuration
//!
//! The options the item layer recognizes: whether CAS tokens are embedded,
//! how large the hash index starts out, and the maximum legal chunk offset
//! used for header sanity checks.

/// Recognized configuration for `Store::new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// When true, items embed an 8-byte CAS token and `next_cas` returns
    /// monotonic positive values; when false, `has_cas` is always false and
    /// CAS is always 0.
    pub use_cas: bool,

    /// Hash index is sized to `2^hash_power` buckets at init.
    pub hash_power: u8,

    /// Maximum legal chunk offset within a slab, consumed during header
    /// sanity checks.
    pub slab_size: u32,
}

impl Config {
    /// Default hash power: 2^16 buckets, a reasonable starting size for a
    /// single-process cache without requiring a resize policy.
    pub const DEFAULT_HASH_POWER: u8 = 16;

    /// Default slab size: 1 MiB, matching common memcached-family defaults.
    pub const DEFAULT_SLAB_SIZE: u32 = 1024 * 1024;

    /// Returns a config with CAS enabled and the library's default sizing.
    pub fn new() -> Self {
        Config {
            use_cas: true,
            hash_power: Self::DEFAULT_HASH_POWER,
            slab_size: Self::DEFAULT_SLAB_SIZE,
        }
    }

    /// Returns the number of hash-index buckets implied by `hash_power`.
    pub fn bucket_count(&self) -> usize {
        1usize << self.hash_power
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
