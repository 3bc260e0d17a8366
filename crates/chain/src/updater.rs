//! The update orchestrator for bonded aggregates.
//!
//! [`Updater`] layers decision logic over the cache: it is the only
//! component that calls the validator port, stitches completed aggregates,
//! and classifies outcomes. Public operations return immediately with a
//! single-fulfillment receiver; the mutation runs on a dispatch worker.
//!
//! Same-hash races are resolved by the cache's reader-writer discipline
//! plus the re-read-then-decide structure here: every step re-fetches
//! current state through a fresh view instead of trusting a local copy.

use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver};
use thiserror::Error;
use tracing::debug;

use partialtx_cache::{EntrySnapshot, PartialCache, PendingTransaction};
use partialtx_dispatch::Dispatch;
use partialtx_types::{
    verify_cosignature, AggregateTransaction, Cosignature, DetachedCosignature,
    ExtractedAddresses, Hash, AGGREGATE_BONDED,
};

use crate::stitch::stitch_aggregate;
use crate::validator::{
    CompletedTransactionSink, CosignersClassification, FailedTransactionSink, HeightSupplier,
    PartialValidator,
};

/// Errors returned synchronously, before any work is dispatched.
///
/// These are contract violations by the caller, not business outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdaterError {
    /// The submitted transaction is not a bonded aggregate.
    #[error("transaction type {0:#06x} is not a bonded aggregate")]
    UnsupportedTransactionType(u16),
}

/// How the cache changed in response to a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionUpdateType {
    /// The aggregate was validated and cached.
    New,
    /// The hash was already cached; embedded cosignatures were merged.
    Existing,
    /// Partiality validation failed; nothing was cached.
    Invalid,
}

/// Outcome of the transaction-arrival path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionUpdate {
    /// How the cache changed.
    pub update_type: TransactionUpdateType,
    /// Embedded cosignatures accepted as a side effect.
    pub num_cosignatures_added: usize,
}

/// Outcome of the cosignature-arrival path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CosignatureUpdate {
    /// Accepted; the aggregate is still awaiting cosignatures.
    AddedIncomplete,
    /// Accepted and the aggregate completed; the stitched transaction was
    /// emitted to the completed sink.
    AddedComplete,
    /// The signer already cosigned, or the entry was concurrently
    /// completed or purged.
    Redundant,
    /// No matching pending transaction, or the signer is not currently
    /// entitled to cosign.
    Ineligible,
    /// The cryptographic signature check failed.
    Unverifiable,
    /// The validator reported a hard failure; the entry was purged.
    Error,
}

impl CosignatureUpdate {
    fn is_accepted(self) -> bool {
        matches!(
            self,
            CosignatureUpdate::AddedIncomplete | CosignatureUpdate::AddedComplete
        )
    }
}

/// A bonded aggregate submitted for caching, with its content hash and any
/// opaque metadata extracted upstream.
#[derive(Debug, Clone)]
pub struct TransactionInfo {
    /// The aggregate, possibly carrying embedded cosignatures.
    pub transaction: Arc<AggregateTransaction>,
    /// Content hash of the aggregate (stable under stripping).
    pub hash: Hash,
    /// Opaque metadata carried through the cache unchanged.
    pub extracted_addresses: Option<Arc<ExtractedAddresses>>,
}

impl TransactionInfo {
    /// Wrap an aggregate, deriving its content hash.
    pub fn new(transaction: Arc<AggregateTransaction>) -> Self {
        let hash = transaction.hash();
        Self {
            transaction,
            hash,
            extracted_addresses: None,
        }
    }

    /// Attach extracted-address metadata.
    pub fn with_extracted_addresses(mut self, addresses: Arc<ExtractedAddresses>) -> Self {
        self.extracted_addresses = Some(addresses);
        self
    }
}

struct Inner {
    cache: Arc<PartialCache>,
    validator: Arc<dyn PartialValidator>,
    completed_sink: CompletedTransactionSink,
    failed_sink: FailedTransactionSink,
    height_supplier: HeightSupplier,
}

/// Orchestrator for partial transaction and cosignature updates.
///
/// Cloning is cheap; clones share the cache, validator, and sinks.
/// Dropping every clone does not cancel dispatched work: closures own the
/// sending half of their result channel, so outstanding receivers always
/// resolve once the dispatcher drains.
#[derive(Clone)]
pub struct Updater<D: Dispatch> {
    inner: Arc<Inner>,
    dispatch: D,
}

impl<D: Dispatch + 'static> Updater<D> {
    /// Create an updater over the given cache and collaborators.
    pub fn new(
        cache: Arc<PartialCache>,
        validator: Arc<dyn PartialValidator>,
        completed_sink: CompletedTransactionSink,
        failed_sink: FailedTransactionSink,
        height_supplier: HeightSupplier,
        dispatch: D,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                validator,
                completed_sink,
                failed_sink,
                height_supplier,
            }),
            dispatch,
        }
    }

    /// Submit a bonded aggregate, with or without embedded cosignatures.
    ///
    /// Returns `UnsupportedTransactionType` synchronously for non-bonded
    /// entity types; otherwise the update runs on a dispatch worker and the
    /// outcome is delivered through the receiver.
    pub fn update_transaction(
        &self,
        info: TransactionInfo,
    ) -> Result<Receiver<TransactionUpdate>, UpdaterError> {
        let entity_type = info.transaction.entity_type();
        if entity_type != AGGREGATE_BONDED {
            return Err(UpdaterError::UnsupportedTransactionType(entity_type));
        }

        let inner = Arc::clone(&self.inner);
        let (sender, receiver) = bounded(1);
        self.dispatch.spawn_update(move || {
            let update = update_transaction_impl(&inner, info);
            let _ = sender.send(update);
        });

        Ok(receiver)
    }

    /// Submit a detached cosignature for a pending aggregate.
    ///
    /// The update runs on a dispatch worker; the outcome is delivered
    /// through the receiver.
    pub fn update_cosignature(
        &self,
        cosignature: DetachedCosignature,
    ) -> Receiver<CosignatureUpdate> {
        let inner = Arc::clone(&self.inner);
        let (sender, receiver) = bounded(1);
        self.dispatch.spawn_update(move || {
            let update = update_cosignature_impl(&inner, &cosignature);
            let _ = sender.send(update);
        });

        receiver
    }

    /// Number of updates scheduled but not yet finished.
    pub fn queue_depth(&self) -> usize {
        self.dispatch.update_queue_depth()
    }
}

/// Decode embedded cosignatures into a deduplicated list, skipping signers
/// already recorded against an existing cache entry for the hash.
fn extract_cosignatures(
    inner: &Inner,
    hash: &Hash,
    transaction: &AggregateTransaction,
) -> Vec<Cosignature> {
    let existing = inner.cache.view().find(hash);
    let mut extracted: Vec<Cosignature> = Vec::new();

    for cosignature in transaction.cosignatures() {
        if extracted.iter().any(|c| c.signer == cosignature.signer) {
            continue;
        }
        if let Some(snapshot) = &existing {
            if snapshot.has_cosigner(&cosignature.signer) {
                continue;
            }
        }
        extracted.push(cosignature);
    }

    extracted
}

fn update_transaction_impl(inner: &Inner, info: TransactionInfo) -> TransactionUpdate {
    let hash = info.hash;
    let cosignatures = extract_cosignatures(inner, &hash, &info.transaction);

    if inner.cache.view().contains(&hash) {
        let added = apply_cosignatures(inner, &hash, cosignatures);
        return TransactionUpdate {
            update_type: TransactionUpdateType::Existing,
            num_cosignatures_added: added,
        };
    }

    let stripped = Arc::new(info.transaction.strip_cosignatures());
    let height = (inner.height_supplier)();
    let validation = inner.validator.validate_partial(&stripped, &hash, height);
    if !validation.is_valid {
        debug!(%hash, raw_code = validation.raw_code, "partial validation failed");
        (inner.failed_sink)(&stripped, height, hash, validation.raw_code);
        return TransactionUpdate {
            update_type: TransactionUpdateType::Invalid,
            num_cosignatures_added: 0,
        };
    }

    // A lost insert race is fine: the per-cosignature path below re-reads
    // the cache and merges into whichever entry won.
    let _ = inner.cache.modifier().add_transaction(PendingTransaction {
        hash,
        transaction: stripped,
        cosignatures: Vec::new(),
        extracted_addresses: info.extracted_addresses,
    });

    if cosignatures.is_empty() {
        // 1-of-1 aggregates can already be complete with no cosignatures.
        check_completeness(inner, &hash);
        return TransactionUpdate {
            update_type: TransactionUpdateType::New,
            num_cosignatures_added: 0,
        };
    }

    let added = apply_cosignatures(inner, &hash, cosignatures);
    TransactionUpdate {
        update_type: TransactionUpdateType::New,
        num_cosignatures_added: added,
    }
}

/// Feed each extracted cosignature through the cosignature path and count
/// the accepted ones.
fn apply_cosignatures(inner: &Inner, hash: &Hash, cosignatures: Vec<Cosignature>) -> usize {
    cosignatures
        .into_iter()
        .map(|cosignature| {
            update_cosignature_impl(inner, &DetachedCosignature::new(cosignature, *hash))
        })
        .filter(|update| update.is_accepted())
        .count()
}

struct EligibilityCheck {
    /// Early outcome: `Error` on hard failure, `Ineligible` when the new
    /// cosigner itself is at fault. `None` means the new cosigner was
    /// accepted.
    early_result: Option<CosignatureUpdate>,
    raw_code: u32,
    /// Previously accepted cosigners that are still eligible, captured only
    /// when staleness was detected.
    still_eligible: Option<Vec<Cosignature>>,
}

impl EligibilityCheck {
    fn accepted(raw_code: u32) -> Self {
        Self {
            early_result: None,
            raw_code,
            still_eligible: None,
        }
    }

    fn rejected(result: CosignatureUpdate, raw_code: u32) -> Self {
        Self {
            early_result: Some(result),
            raw_code,
            still_eligible: None,
        }
    }

    fn purge_required(&self) -> bool {
        self.early_result == Some(CosignatureUpdate::Error)
    }
}

/// Classify the new cosigner against the candidate full set, disambiguating
/// an `Ineligible` verdict between the new cosigner and staleness in the
/// previously accepted set.
///
/// The disambiguation re-validates prior cosigners one at a time, which is
/// O(n) validator calls on every ambiguous ineligibility; the cost is
/// uncapped.
fn check_eligibility(
    inner: &Inner,
    snapshot: &EntrySnapshot,
    cosignature: &Cosignature,
) -> EligibilityCheck {
    let transaction = snapshot.transaction();

    let mut candidate = snapshot.cosignatures().to_vec();
    candidate.push(cosignature.clone());
    let result = inner.validator.validate_cosigners(transaction, &candidate);

    match result.classification {
        CosignersClassification::Success | CosignersClassification::Missing => {
            EligibilityCheck::accepted(result.raw_code)
        }
        CosignersClassification::Failure => {
            EligibilityCheck::rejected(CosignatureUpdate::Error, result.raw_code)
        }
        CosignersClassification::Ineligible => {
            if snapshot.cosignatures().is_empty() {
                // No prior cosigners, so only the new one can be at fault.
                return EligibilityCheck::rejected(CosignatureUpdate::Ineligible, result.raw_code);
            }

            // Cheap pass first: the new cosigner in isolation.
            let alone = inner
                .validator
                .validate_cosigners(transaction, std::slice::from_ref(cosignature));
            if alone.classification == CosignersClassification::Ineligible {
                return EligibilityCheck::rejected(CosignatureUpdate::Ineligible, alone.raw_code);
            }

            // The fault lies in the previously accepted set: re-walk it and
            // keep only cosigners that still validate on their own.
            let still_eligible: Vec<Cosignature> = snapshot
                .cosignatures()
                .iter()
                .filter(|prior| {
                    inner
                        .validator
                        .validate_cosigners(transaction, std::slice::from_ref(*prior))
                        .classification
                        != CosignersClassification::Ineligible
                })
                .cloned()
                .collect();

            debug!(
                stale = snapshot.cosignatures().len() - still_eligible.len(),
                "stale cosigners detected"
            );

            EligibilityCheck {
                early_result: None,
                raw_code: result.raw_code,
                still_eligible: Some(still_eligible),
            }
        }
    }
}

/// Rebuild a cache entry with only its still-eligible cosigners, under a
/// single modifier so readers never observe the intermediate state.
fn refresh_stale_entry(inner: &Inner, hash: &Hash, still_eligible: &[Cosignature]) {
    let mut modifier = inner.cache.modifier();
    let Some(removed) = modifier.remove(hash) else {
        return;
    };

    modifier.add_transaction(PendingTransaction {
        hash: *hash,
        transaction: removed.transaction,
        cosignatures: Vec::new(),
        extracted_addresses: removed.extracted_addresses,
    });
    for cosignature in still_eligible {
        modifier.add_cosignature(hash, cosignature.clone());
    }
}

fn update_cosignature_impl(inner: &Inner, detached: &DetachedCosignature) -> CosignatureUpdate {
    let hash = detached.parent_hash;

    let Some(snapshot) = inner.cache.view().find(&hash) else {
        return CosignatureUpdate::Ineligible;
    };
    if snapshot.has_cosigner(detached.signer()) {
        return CosignatureUpdate::Redundant;
    }

    let eligibility = check_eligibility(inner, &snapshot, &detached.cosignature);

    if eligibility.purge_required() {
        if let Some(removed) = inner.cache.modifier().remove(&hash) {
            let height = (inner.height_supplier)();
            (inner.failed_sink)(&removed.transaction, height, hash, eligibility.raw_code);
        }
    } else if let Some(still_eligible) = &eligibility.still_eligible {
        // Repair runs even when the new cosignature later turns out
        // unverifiable, but never alongside a purge.
        refresh_stale_entry(inner, &hash, still_eligible);
    }

    if let Some(result) = eligibility.early_result {
        return result;
    }

    if !verify_cosignature(
        detached.signer(),
        hash.as_bytes(),
        &detached.cosignature.signature,
    ) {
        debug!(%hash, signer = %detached.signer(), "unverifiable cosignature");
        return CosignatureUpdate::Unverifiable;
    }

    if !inner
        .cache
        .modifier()
        .add_cosignature(&hash, detached.cosignature.clone())
    {
        // Lost a race against an identical cosignature, or the entry was
        // concurrently completed or purged.
        return CosignatureUpdate::Redundant;
    }

    check_completeness(inner, &hash)
}

/// Re-fetch the entry and, when its current cosigner set fully satisfies
/// the signing requirement, remove it, stitch it, and emit it downstream.
fn check_completeness(inner: &Inner, hash: &Hash) -> CosignatureUpdate {
    let Some(snapshot) = inner.cache.view().find(hash) else {
        return CosignatureUpdate::Redundant;
    };

    let result = inner
        .validator
        .validate_cosigners(snapshot.transaction(), snapshot.cosignatures());
    if result.classification != CosignersClassification::Success {
        return CosignatureUpdate::AddedIncomplete;
    }

    // The remove arbitrates racing completions: exactly one caller gets
    // the entry and emits the stitched transaction.
    let Some(removed) = inner.cache.modifier().remove(hash) else {
        return CosignatureUpdate::Redundant;
    };

    let stitched = stitch_aggregate(&removed.transaction, &removed.cosignatures);
    debug!(%hash, cosignatures = removed.cosignatures.len(), "aggregate complete");
    (inner.completed_sink)(stitched);
    CosignatureUpdate::AddedComplete
}
