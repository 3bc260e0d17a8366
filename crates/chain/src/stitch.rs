//! Binary stitching of completed aggregates and splitting of inbound
//! batches.
//!
//! Stitching rebuilds the wire form of a completed aggregate from its
//! stripped payload and accepted cosignature list; the output byte-matches
//! what hashing and broadcast expect. Splitting routes a mixed inbound
//! batch into a single stitched-transaction range and a stream of detached
//! cosignatures.

use std::sync::Arc;

use partialtx_types::{AggregateTransaction, Cosignature, DetachedCosignature, Hash};

/// Rebuild a complete aggregate from a stripped payload and its accepted
/// cosignatures.
///
/// The cosignature region is appended in the aggregate's declared layout,
/// in the order given, and the size field is updated. Stitching then
/// re-stripping reproduces the input byte-for-byte.
pub fn stitch_aggregate(
    stripped: &AggregateTransaction,
    cosignatures: &[Cosignature],
) -> AggregateTransaction {
    AggregateTransaction::from_parts(
        stripped.entity_type(),
        stripped.layout(),
        stripped.network(),
        &stripped.signer(),
        &stripped.signature(),
        stripped.payload(),
        cosignatures,
    )
}

/// One record of an inbound batch: an aggregate hash, optionally the full
/// transaction, and any cosignatures that arrived with it.
#[derive(Debug, Clone)]
pub struct CosignedTransactionInfo {
    /// Hash of the aggregate the record refers to.
    pub hash: Hash,
    /// The full transaction, when the record carries one.
    pub transaction: Option<Arc<AggregateTransaction>>,
    /// Cosignatures accompanying the record.
    pub cosignatures: Vec<Cosignature>,
}

/// Partition a mixed batch into stitched transactions and detached
/// cosignatures.
///
/// Records carrying a transaction are stitched with their cosignatures and
/// forwarded as one merged range, in input order; the range consumer is
/// invoked at most once and only when non-empty. Records without a
/// transaction have each cosignature forwarded individually, keyed by the
/// record's hash. No ordering is guaranteed across the two output streams.
pub fn split_cosigned_infos(
    infos: Vec<CosignedTransactionInfo>,
    transaction_consumer: impl FnOnce(Vec<AggregateTransaction>),
    mut cosignature_consumer: impl FnMut(DetachedCosignature),
) {
    let mut stitched = Vec::new();
    for info in infos {
        match info.transaction {
            Some(transaction) => stitched.push(stitch_aggregate(&transaction, &info.cosignatures)),
            None => {
                for cosignature in info.cosignatures {
                    cosignature_consumer(DetachedCosignature::new(cosignature, info.hash));
                }
            }
        }
    }

    if !stitched.is_empty() {
        transaction_consumer(stitched);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partialtx_test_helpers::{random_cosignature, random_stripped_aggregate};
    use partialtx_types::SignatureLayout;

    fn collect_split(
        infos: Vec<CosignedTransactionInfo>,
    ) -> (Vec<Vec<AggregateTransaction>>, Vec<DetachedCosignature>) {
        let mut ranges = Vec::new();
        let mut detached = Vec::new();
        split_cosigned_infos(
            infos,
            |range| ranges.push(range),
            |cosignature| detached.push(cosignature),
        );
        (ranges, detached)
    }

    #[test]
    fn test_stitch_roundtrip_raw_layout() {
        let stripped = random_stripped_aggregate(SignatureLayout::Raw);
        let cosignatures = vec![random_cosignature(), random_cosignature()];

        let stitched = stitch_aggregate(&stripped, &cosignatures);

        assert_eq!(stitched.cosignatures(), cosignatures);
        assert_eq!(stitched.strip_cosignatures(), stripped);
        assert_eq!(stitched.hash(), stripped.hash());
        assert_eq!(
            stitched.size() as usize,
            stripped.size() as usize
                + cosignatures.len() * SignatureLayout::Raw.cosignature_size()
        );
    }

    #[test]
    fn test_stitch_roundtrip_extended_layout() {
        let stripped = random_stripped_aggregate(SignatureLayout::Extended);
        let cosignatures = vec![random_cosignature(), random_cosignature(), random_cosignature()];

        let stitched = stitch_aggregate(&stripped, &cosignatures);

        assert_eq!(stitched.cosignatures(), cosignatures);
        assert_eq!(stitched.strip_cosignatures(), stripped);
    }

    #[test]
    fn test_stitch_with_no_cosignatures_is_identity() {
        let stripped = random_stripped_aggregate(SignatureLayout::Raw);
        assert_eq!(stitch_aggregate(&stripped, &[]), stripped);
    }

    #[test]
    fn test_split_empty_batch_forwards_nothing() {
        let (ranges, detached) = collect_split(Vec::new());
        assert!(ranges.is_empty());
        assert!(detached.is_empty());
    }

    #[test]
    fn test_split_cosignatures_only() {
        let hash = partialtx_test_helpers::random_hash();
        let cosignatures = vec![random_cosignature(), random_cosignature()];
        let infos = vec![CosignedTransactionInfo {
            hash,
            transaction: None,
            cosignatures: cosignatures.clone(),
        }];

        let (ranges, detached) = collect_split(infos);

        assert!(ranges.is_empty());
        assert_eq!(detached.len(), 2);
        for (forwarded, original) in detached.iter().zip(&cosignatures) {
            assert_eq!(forwarded.cosignature, *original);
            assert_eq!(forwarded.parent_hash, hash);
        }
    }

    #[test]
    fn test_split_transactions_only_produces_single_range() {
        let a = random_stripped_aggregate(SignatureLayout::Raw);
        let b = random_stripped_aggregate(SignatureLayout::Extended);
        let infos = vec![
            CosignedTransactionInfo {
                hash: a.hash(),
                transaction: Some(Arc::new(a.clone())),
                cosignatures: Vec::new(),
            },
            CosignedTransactionInfo {
                hash: b.hash(),
                transaction: Some(Arc::new(b.clone())),
                cosignatures: vec![random_cosignature()],
            },
        ];

        let (ranges, detached) = collect_split(infos);

        assert!(detached.is_empty());
        assert_eq!(ranges.len(), 1);
        // input order preserved; second entry stitched with its cosignature
        assert_eq!(ranges[0][0], a);
        assert_eq!(ranges[0][1].strip_cosignatures(), b);
        assert_eq!(ranges[0][1].cosignatures_count(), 1);
    }

    #[test]
    fn test_split_interleaved() {
        let tx = random_stripped_aggregate(SignatureLayout::Raw);
        let orphan_hash = partialtx_test_helpers::random_hash();
        let infos = vec![
            CosignedTransactionInfo {
                hash: orphan_hash,
                transaction: None,
                cosignatures: vec![random_cosignature()],
            },
            CosignedTransactionInfo {
                hash: tx.hash(),
                transaction: Some(Arc::new(tx.clone())),
                cosignatures: Vec::new(),
            },
            CosignedTransactionInfo {
                hash: orphan_hash,
                transaction: None,
                cosignatures: vec![random_cosignature()],
            },
        ];

        let (ranges, detached) = collect_split(infos);

        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0], vec![tx]);
        assert_eq!(detached.len(), 2);
    }
}
