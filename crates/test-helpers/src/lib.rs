//! Shared fixture builders for partial transaction tests.
//!
//! Random builders produce structurally valid wire data with garbage
//! signatures; the `valid_*` builders sign with real ed25519 keys and
//! exercise actual verification paths.

mod fixtures;

pub use fixtures::{
    complete_aggregate, cosign, random_cosignature, random_hash, random_stripped_aggregate,
    valid_cosignature, valid_detached_cosignature,
};
