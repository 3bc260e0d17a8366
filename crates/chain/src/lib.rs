//! Partial transaction aggregation engine.
//!
//! Orchestrates the lifecycle of bonded aggregate transactions: caching
//! pending partials, accepting cosignatures as they arrive, detecting and
//! repairing stale cosigners when chain state shifts under an entry, and
//! emitting the stitched transaction exactly once on completion.
//!
//! The engine owns no wire format beyond the stitched cosignature region
//! and performs no validation itself; eligibility decisions are delegated
//! to the [`PartialValidator`] port and outcomes flow to the caller through
//! single-fulfillment receivers.

mod stitch;
mod updater;
mod validator;

pub use stitch::{split_cosigned_infos, stitch_aggregate, CosignedTransactionInfo};
pub use updater::{
    CosignatureUpdate, TransactionInfo, TransactionUpdate, TransactionUpdateType, Updater,
    UpdaterError,
};
pub use validator::{
    CompletedTransactionSink, CosignersClassification, CosignersResult, FailedTransactionSink,
    HeightSupplier, PartialValidation, PartialValidator,
};
