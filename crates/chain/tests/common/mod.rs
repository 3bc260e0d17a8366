//! Shared harness for updater integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use partialtx_cache::PartialCache;
use partialtx_chain::{
    CompletedTransactionSink, CosignersClassification, CosignersResult, FailedTransactionSink,
    HeightSupplier, PartialValidation, PartialValidator, Updater,
};
use partialtx_dispatch::Dispatch;
use partialtx_dispatch_sync::SyncDispatch;
use partialtx_types::{AggregateTransaction, BlockHeight, Cosignature, Hash, SignerKey};

pub const TEST_HEIGHT: BlockHeight = BlockHeight(7);

/// Configurable validator double.
///
/// Cosigner sets classify as `Failure` when forced, `Ineligible` when any
/// member was marked ineligible, `Success` once the set reaches the
/// required size, and `Missing` otherwise. The default required size is
/// unreachable, so entries never complete unless a test lowers it.
pub struct MockValidator {
    partial_valid: AtomicBool,
    partial_code: AtomicU32,
    cosigners_code: AtomicU32,
    force_failure: AtomicBool,
    required_cosigners: AtomicUsize,
    ineligible: Mutex<HashSet<SignerKey>>,
    partial_calls: AtomicUsize,
    cosigners_calls: AtomicUsize,
}

impl MockValidator {
    pub fn new() -> Self {
        Self {
            partial_valid: AtomicBool::new(true),
            partial_code: AtomicU32::new(0),
            cosigners_code: AtomicU32::new(0),
            force_failure: AtomicBool::new(false),
            required_cosigners: AtomicUsize::new(usize::MAX),
            ineligible: Mutex::new(HashSet::new()),
            partial_calls: AtomicUsize::new(0),
            cosigners_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_partial_invalid(&self, raw_code: u32) {
        self.partial_valid.store(false, Ordering::SeqCst);
        self.partial_code.store(raw_code, Ordering::SeqCst);
    }

    pub fn set_failure(&self, raw_code: u32) {
        self.force_failure.store(true, Ordering::SeqCst);
        self.cosigners_code.store(raw_code, Ordering::SeqCst);
    }

    pub fn set_required_cosigners(&self, count: usize) {
        self.required_cosigners.store(count, Ordering::SeqCst);
    }

    pub fn mark_ineligible(&self, signer: &SignerKey) {
        self.ineligible.lock().unwrap().insert(*signer);
    }

    pub fn partial_calls(&self) -> usize {
        self.partial_calls.load(Ordering::SeqCst)
    }

    pub fn cosigners_calls(&self) -> usize {
        self.cosigners_calls.load(Ordering::SeqCst)
    }
}

impl PartialValidator for MockValidator {
    fn validate_partial(
        &self,
        _transaction: &AggregateTransaction,
        _hash: &Hash,
        _height: BlockHeight,
    ) -> PartialValidation {
        self.partial_calls.fetch_add(1, Ordering::SeqCst);
        PartialValidation {
            raw_code: self.partial_code.load(Ordering::SeqCst),
            is_valid: self.partial_valid.load(Ordering::SeqCst),
        }
    }

    fn validate_cosigners(
        &self,
        _transaction: &AggregateTransaction,
        cosigners: &[Cosignature],
    ) -> CosignersResult {
        self.cosigners_calls.fetch_add(1, Ordering::SeqCst);
        let raw_code = self.cosigners_code.load(Ordering::SeqCst);

        if self.force_failure.load(Ordering::SeqCst) {
            return CosignersResult {
                raw_code,
                classification: CosignersClassification::Failure,
            };
        }

        let ineligible = self.ineligible.lock().unwrap();
        if cosigners.iter().any(|c| ineligible.contains(&c.signer)) {
            return CosignersResult {
                raw_code,
                classification: CosignersClassification::Ineligible,
            };
        }

        let classification =
            if cosigners.len() >= self.required_cosigners.load(Ordering::SeqCst) {
                CosignersClassification::Success
            } else {
                CosignersClassification::Missing
            };
        CosignersResult {
            raw_code,
            classification,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub transaction: AggregateTransaction,
    pub height: BlockHeight,
    pub hash: Hash,
    pub raw_code: u32,
}

/// Updater wired to a mock validator and capturing sinks.
pub struct Harness<D: Dispatch + 'static> {
    pub cache: Arc<PartialCache>,
    pub validator: Arc<MockValidator>,
    pub completed: Arc<Mutex<Vec<AggregateTransaction>>>,
    pub failures: Arc<Mutex<Vec<FailureRecord>>>,
    pub updater: Updater<D>,
}

impl Harness<SyncDispatch> {
    pub fn new() -> Self {
        Self::with_dispatch(SyncDispatch::new())
    }
}

impl<D: Dispatch + 'static> Harness<D> {
    pub fn with_dispatch(dispatch: D) -> Self {
        let cache = Arc::new(PartialCache::new());
        let validator = Arc::new(MockValidator::new());
        let completed = Arc::new(Mutex::new(Vec::new()));
        let failures = Arc::new(Mutex::new(Vec::new()));

        let completed_sink: CompletedTransactionSink = {
            let completed = completed.clone();
            Arc::new(move |transaction: AggregateTransaction| {
                completed.lock().unwrap().push(transaction)
            })
        };
        let failed_sink: FailedTransactionSink = {
            let failures = failures.clone();
            Arc::new(
                move |transaction: &AggregateTransaction,
                      height: BlockHeight,
                      hash: Hash,
                      raw_code: u32| {
                    failures.lock().unwrap().push(FailureRecord {
                        transaction: transaction.clone(),
                        height,
                        hash,
                        raw_code,
                    })
                },
            )
        };
        let height_supplier: HeightSupplier = Arc::new(|| TEST_HEIGHT);

        let updater = Updater::new(
            cache.clone(),
            validator.clone() as Arc<dyn PartialValidator>,
            completed_sink,
            failed_sink,
            height_supplier,
            dispatch,
        );

        Self {
            cache,
            validator,
            completed,
            failures,
            updater,
        }
    }

    pub fn completed_count(&self) -> usize {
        self.completed.lock().unwrap().len()
    }

    pub fn cached_cosigners(&self, hash: &Hash) -> Vec<SignerKey> {
        self.cache
            .view()
            .find(hash)
            .map(|snapshot| snapshot.cosignatures().iter().map(|c| c.signer).collect())
            .unwrap_or_default()
    }
}
