//! Concurrent cache of partial transactions awaiting cosignatures.
//!
//! The cache is pure storage: it never consults the validator and never
//! decides completeness. Access is split into two modes:
//!
//! - [`PartialCache::view`]: shared read access for many concurrent readers.
//! - [`PartialCache::modifier`]: exclusive write access; at most one
//!   modifier proceeds at a time for a given cache instance.
//!
//! The split is backed by a reader-writer lock, so readers never observe a
//! half-mutated entry. Orchestration code re-fetches state through a fresh
//! view at every decision point instead of trusting stale local copies.

mod cache;

pub use cache::{
    EntrySnapshot, PartialCache, PartialCacheModifier, PartialCacheView, PendingTransaction,
};
