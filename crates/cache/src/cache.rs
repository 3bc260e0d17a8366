//! Cache storage and the view/modifier access handles.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use partialtx_types::{AggregateTransaction, Cosignature, ExtractedAddresses, Hash, SignerKey};
use std::collections::HashMap;
use std::sync::Arc;

/// A partial transaction held in the cache.
///
/// The payload is always the cosignature-stripped form; accepted
/// cosignatures are stored out-of-band in `cosignatures` so the payload's
/// content hash stays stable as cosignatures accumulate.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    /// Content hash of the stripped aggregate; the cache key.
    pub hash: Hash,
    /// The aggregate with its cosignature region removed.
    pub transaction: Arc<AggregateTransaction>,
    /// Accepted cosignatures, pairwise-distinct signers.
    pub cosignatures: Vec<Cosignature>,
    /// Opaque metadata carried through unchanged for downstream consumers.
    pub extracted_addresses: Option<Arc<ExtractedAddresses>>,
}

struct Entry {
    transaction: Arc<AggregateTransaction>,
    cosignatures: Vec<Cosignature>,
    extracted_addresses: Option<Arc<ExtractedAddresses>>,
}

/// Owned snapshot of one cache entry taken under a view.
///
/// Holding a snapshot does not hold the lock; by the time a decision is
/// made from it, the underlying entry may have changed. Callers that mutate
/// must re-check through a modifier.
#[derive(Clone)]
pub struct EntrySnapshot {
    transaction: Arc<AggregateTransaction>,
    cosignatures: Vec<Cosignature>,
}

impl EntrySnapshot {
    /// The stripped aggregate.
    pub fn transaction(&self) -> &Arc<AggregateTransaction> {
        &self.transaction
    }

    /// Accepted cosignatures at snapshot time.
    pub fn cosignatures(&self) -> &[Cosignature] {
        &self.cosignatures
    }

    /// Whether `signer` had already cosigned at snapshot time.
    pub fn has_cosigner(&self, signer: &SignerKey) -> bool {
        self.cosignatures.iter().any(|c| c.signer == *signer)
    }
}

/// Thread-safe storage of [`PendingTransaction`] keyed by aggregate hash.
#[derive(Default)]
pub struct PartialCache {
    entries: RwLock<HashMap<Hash, Entry>>,
}

impl PartialCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire shared read access.
    pub fn view(&self) -> PartialCacheView<'_> {
        PartialCacheView {
            guard: self.entries.read(),
        }
    }

    /// Acquire exclusive write access.
    pub fn modifier(&self) -> PartialCacheModifier<'_> {
        PartialCacheModifier {
            guard: self.entries.write(),
        }
    }
}

/// Shared read handle over the cache.
pub struct PartialCacheView<'a> {
    guard: RwLockReadGuard<'a, HashMap<Hash, Entry>>,
}

impl PartialCacheView<'_> {
    /// Snapshot the entry for `hash`, if present.
    pub fn find(&self, hash: &Hash) -> Option<EntrySnapshot> {
        self.guard.get(hash).map(|entry| EntrySnapshot {
            transaction: Arc::clone(&entry.transaction),
            cosignatures: entry.cosignatures.clone(),
        })
    }

    /// Whether an entry exists for `hash`.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.guard.contains_key(hash)
    }

    /// Number of cached partial transactions.
    pub fn len(&self) -> usize {
        self.guard.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }

    /// All cached hashes, for diagnostics.
    pub fn hashes(&self) -> Vec<Hash> {
        self.guard.keys().copied().collect()
    }
}

/// Exclusive write handle over the cache.
pub struct PartialCacheModifier<'a> {
    guard: RwLockWriteGuard<'a, HashMap<Hash, Entry>>,
}

impl PartialCacheModifier<'_> {
    /// Insert a new partial transaction.
    ///
    /// Returns `false` without mutating if an entry with the same hash
    /// already exists.
    pub fn add_transaction(&mut self, pending: PendingTransaction) -> bool {
        debug_assert!(
            pending.transaction.is_stripped(),
            "cached payload must not carry cosignatures"
        );

        if self.guard.contains_key(&pending.hash) {
            return false;
        }

        tracing::debug!(hash = %pending.hash, "caching partial transaction");
        self.guard.insert(
            pending.hash,
            Entry {
                transaction: pending.transaction,
                cosignatures: pending.cosignatures,
                extracted_addresses: pending.extracted_addresses,
            },
        );
        true
    }

    /// Append a cosignature to the entry for `hash`.
    ///
    /// Returns `false` if no entry exists or the signer already cosigned.
    pub fn add_cosignature(&mut self, hash: &Hash, cosignature: Cosignature) -> bool {
        let Some(entry) = self.guard.get_mut(hash) else {
            return false;
        };
        if entry.cosignatures.iter().any(|c| c.signer == cosignature.signer) {
            return false;
        }

        entry.cosignatures.push(cosignature);
        true
    }

    /// Detach and return the full entry for `hash`.
    pub fn remove(&mut self, hash: &Hash) -> Option<PendingTransaction> {
        self.guard.remove(hash).map(|entry| {
            tracing::debug!(hash = %hash, "removing partial transaction");
            PendingTransaction {
                hash: *hash,
                transaction: entry.transaction,
                cosignatures: entry.cosignatures,
                extracted_addresses: entry.extracted_addresses,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partialtx_test_helpers::{random_cosignature, random_stripped_aggregate};
    use partialtx_types::SignatureLayout;

    fn pending(transaction: AggregateTransaction) -> PendingTransaction {
        let hash = transaction.hash();
        PendingTransaction {
            hash,
            transaction: Arc::new(transaction),
            cosignatures: Vec::new(),
            extracted_addresses: None,
        }
    }

    #[test]
    fn test_add_then_find() {
        let cache = PartialCache::new();
        let tx = pending(random_stripped_aggregate(SignatureLayout::Raw));
        let hash = tx.hash;

        assert!(cache.modifier().add_transaction(tx));

        let view = cache.view();
        let snapshot = view.find(&hash).unwrap();
        assert_eq!(snapshot.cosignatures().len(), 0);
        assert_eq!(view.len(), 1);
        assert!(view.contains(&hash));
    }

    #[test]
    fn test_add_duplicate_hash_rejected() {
        let cache = PartialCache::new();
        let tx = pending(random_stripped_aggregate(SignatureLayout::Raw));
        let duplicate = tx.clone();

        assert!(cache.modifier().add_transaction(tx));
        assert!(!cache.modifier().add_transaction(duplicate));
        assert_eq!(cache.view().len(), 1);
    }

    #[test]
    fn test_add_cosignature_requires_entry() {
        let cache = PartialCache::new();
        let missing = Hash::from_bytes(b"nothing here");

        assert!(!cache.modifier().add_cosignature(&missing, random_cosignature()));
    }

    #[test]
    fn test_add_cosignature_rejects_duplicate_signer() {
        let cache = PartialCache::new();
        let tx = pending(random_stripped_aggregate(SignatureLayout::Raw));
        let hash = tx.hash;
        cache.modifier().add_transaction(tx);

        let cosignature = random_cosignature();
        assert!(cache.modifier().add_cosignature(&hash, cosignature.clone()));
        assert!(!cache.modifier().add_cosignature(&hash, cosignature));

        let view = cache.view();
        assert_eq!(view.find(&hash).unwrap().cosignatures().len(), 1);
    }

    #[test]
    fn test_snapshot_has_cosigner() {
        let cache = PartialCache::new();
        let tx = pending(random_stripped_aggregate(SignatureLayout::Raw));
        let hash = tx.hash;
        cache.modifier().add_transaction(tx);

        let cosignature = random_cosignature();
        let signer = cosignature.signer;
        cache.modifier().add_cosignature(&hash, cosignature);

        let snapshot = cache.view().find(&hash).unwrap();
        assert!(snapshot.has_cosigner(&signer));
        assert!(!snapshot.has_cosigner(&random_cosignature().signer));
    }

    #[test]
    fn test_remove_returns_full_entry() {
        let cache = PartialCache::new();
        let tx = pending(random_stripped_aggregate(SignatureLayout::Extended));
        let hash = tx.hash;
        cache.modifier().add_transaction(tx);
        cache.modifier().add_cosignature(&hash, random_cosignature());
        cache.modifier().add_cosignature(&hash, random_cosignature());

        let removed = cache.modifier().remove(&hash).unwrap();
        assert_eq!(removed.hash, hash);
        assert_eq!(removed.cosignatures.len(), 2);
        assert!(cache.view().is_empty());

        assert!(cache.modifier().remove(&hash).is_none());
    }

    #[test]
    fn test_snapshot_is_stable_across_later_mutation() {
        let cache = PartialCache::new();
        let tx = pending(random_stripped_aggregate(SignatureLayout::Raw));
        let hash = tx.hash;
        cache.modifier().add_transaction(tx);

        let snapshot = cache.view().find(&hash).unwrap();
        cache.modifier().add_cosignature(&hash, random_cosignature());

        // snapshot reflects state at capture time
        assert_eq!(snapshot.cosignatures().len(), 0);
        assert_eq!(cache.view().find(&hash).unwrap().cosignatures().len(), 1);
    }

    #[test]
    fn test_hashes_lists_all_entries() {
        let cache = PartialCache::new();
        let a = pending(random_stripped_aggregate(SignatureLayout::Raw));
        let b = pending(random_stripped_aggregate(SignatureLayout::Raw));
        let (ha, hb) = (a.hash, b.hash);
        cache.modifier().add_transaction(a);
        cache.modifier().add_transaction(b);

        let mut hashes = cache.view().hashes();
        hashes.sort();
        let mut expected = vec![ha, hb];
        expected.sort();
        assert_eq!(hashes, expected);
    }
}
