//! # Status Taxonomy
//!
//! The item layer reports failure through a small, closed error enum rather
//! than integer status codes. `OK` is simply `Ok(..)`; everything else maps
//! one-to-one onto the status codes in the item-layer contract.
//!
//! Lookup misses due to lazy expiry collapse into `NotFound` — the expired
//! item is unlinked as a side effect before the error is returned, so the
//! caller never has to special-case "missing" vs. "expired".

use thiserror::Error;

/// Failure modes the item layer can report to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ItemError {
    /// Key not present (or lazily expired) for `get`/`cas`/`annex`/`delete`/`touch`.
    #[error("key not found")]
    NotFound,

    /// Required chunk size exceeds the largest slab class.
    #[error("item exceeds the largest slab class")]
    Oversized,

    /// Slab allocation failed: no free chunk and no evictable victim.
    #[error("no memory available for allocation")]
    NoMemory,

    /// CAS token did not match the item's current CAS; a semantic failure,
    /// not a system error. The prior item is left untouched.
    #[error("cas token mismatch")]
    CasMismatch,
}

/// Result alias used throughout the item layer.
pub type ItemResult<T> = Result<T, ItemError>;
