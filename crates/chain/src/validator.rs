//! Validator port and downstream sinks.
//!
//! The engine never judges eligibility itself. Partiality and cosigner
//! decisions are delegated to a [`PartialValidator`] implementation backed
//! by chain state; this crate only interprets the classification it
//! returns. Raw validation codes are opaque here and are forwarded to the
//! failure sink for observability.

use std::sync::Arc;

use partialtx_types::{AggregateTransaction, BlockHeight, Cosignature, Hash};

/// Result of a partiality check on a stripped aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialValidation {
    /// Raw validation code, opaque to the engine.
    pub raw_code: u32,
    /// Whether the aggregate may be cached as a pending partial.
    pub is_valid: bool,
}

/// Classification of a cosigner set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CosignersClassification {
    /// The set exactly satisfies the aggregate's signing requirement.
    Success,
    /// Every cosigner is eligible but the set is not yet sufficient.
    Missing,
    /// At least one cosigner is not currently entitled to cosign.
    Ineligible,
    /// A hard condition unrelated to any individual cosigner; every call
    /// for this aggregate would fail identically.
    Failure,
}

/// Result of validating a cosigner set against an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosignersResult {
    /// Raw validation code, opaque to the engine.
    pub raw_code: u32,
    /// Classification of the set as a whole.
    pub classification: CosignersClassification,
}

/// Port to the chain-state validator.
///
/// Implementations are invoked concurrently from pool workers and must not
/// mutate engine state. Calls may block on external state access.
pub trait PartialValidator: Send + Sync {
    /// Structural and stateful partiality check on a stripped aggregate.
    fn validate_partial(
        &self,
        transaction: &AggregateTransaction,
        hash: &Hash,
        height: BlockHeight,
    ) -> PartialValidation;

    /// Classify a complete candidate cosigner set for an aggregate.
    fn validate_cosigners(
        &self,
        transaction: &AggregateTransaction,
        cosigners: &[Cosignature],
    ) -> CosignersResult;
}

/// Sink invoked exactly once per completed aggregate with the stitched
/// transaction. Thread-safe by contract.
pub type CompletedTransactionSink = Arc<dyn Fn(AggregateTransaction) + Send + Sync>;

/// Sink invoked for invalid partials and hard cosigner failures with the
/// chain height, aggregate hash, and raw validation code. Never invoked for
/// neutral outcomes. Thread-safe by contract.
pub type FailedTransactionSink = Arc<dyn Fn(&AggregateTransaction, BlockHeight, Hash, u32) + Send + Sync>;

/// Supplier of the current chain height, consulted at validation time.
pub type HeightSupplier = Arc<dyn Fn() -> BlockHeight + Send + Sync>;
