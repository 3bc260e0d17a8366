//! Core types for the partial transaction aggregation engine.
//!
//! This crate provides the foundational types used throughout the engine:
//!
//! - **Primitives**: [`Hash`], signer keys and signatures
//! - **Identifiers**: [`BlockHeight`], [`UnresolvedAddress`]
//! - **Wire types**: [`AggregateTransaction`], [`Cosignature`],
//!   [`DetachedCosignature`]
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer.
//!
//! The aggregate transaction wire layout lives here as an owned byte buffer
//! with typed accessors; every offset is derived from declared header fields
//! that are bounds-checked once at construction.

mod aggregate;
mod cosignature;
mod crypto;
mod hash;
mod identifiers;

pub use aggregate::{
    AggregateFormatError, AggregateTransaction, AGGREGATE_BONDED, AGGREGATE_COMPLETE,
    AGGREGATE_HEADER_SIZE,
};
pub use cosignature::{Cosignature, DetachedCosignature, SignatureLayout};
pub use crypto::{verify_cosignature, CosignerKeyPair, Signature, SignatureScheme, SignerKey};
pub use hash::{Hash, HexError};
pub use identifiers::{BlockHeight, ExtractedAddresses, UnresolvedAddress};
