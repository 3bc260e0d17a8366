//! Cosignature wire layouts.
//!
//! Two layouts are supported, selected by the aggregate's sub-version:
//!
//! | Layout | Version | Encoding | Size |
//! |--------|---------|----------|------|
//! | Raw | 1 | signer ‖ signature | 96 |
//! | Extended | 2 | signer ‖ scheme ‖ signature | 97 |
//!
//! Raw aggregates cannot carry a non-default derivation scheme; decoding a
//! raw cosignature always yields [`SignatureScheme::Ed25519Sha3`].

use crate::crypto::{Signature, SignatureScheme, SignerKey};
use crate::hash::Hash;

/// Binary layout of the trailing cosignature region, selected by the
/// aggregate sub-version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureLayout {
    /// Version 1: signer and signature only.
    Raw,
    /// Version 2: signer, derivation scheme byte, signature.
    Extended,
}

impl SignatureLayout {
    /// Map an aggregate sub-version to its cosignature layout.
    pub fn from_version(version: u8) -> Option<Self> {
        match version {
            1 => Some(SignatureLayout::Raw),
            2 => Some(SignatureLayout::Extended),
            _ => None,
        }
    }

    /// The aggregate sub-version that selects this layout.
    pub fn version(self) -> u8 {
        match self {
            SignatureLayout::Raw => 1,
            SignatureLayout::Extended => 2,
        }
    }

    /// Serialized size of one cosignature in this layout.
    pub const fn cosignature_size(self) -> usize {
        match self {
            SignatureLayout::Raw => SignerKey::BYTES + Signature::BYTES,
            SignatureLayout::Extended => SignerKey::BYTES + 1 + Signature::BYTES,
        }
    }
}

/// A single accepted cosignature: one signer's authorization of a bonded
/// aggregate, signed over the aggregate hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cosignature {
    /// Public key of the cosigner.
    pub signer: SignerKey,
    /// Key derivation scheme of the cosigner account.
    pub scheme: SignatureScheme,
    /// Signature over the parent aggregate hash.
    pub signature: Signature,
}

impl Cosignature {
    /// Append the wire encoding of this cosignature to `out`.
    pub fn write_to(&self, layout: SignatureLayout, out: &mut Vec<u8>) {
        out.extend_from_slice(self.signer.as_bytes());
        if let SignatureLayout::Extended = layout {
            out.push(self.scheme.to_byte());
        }
        out.extend_from_slice(self.signature.as_bytes());
    }

    /// Decode one cosignature from `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than the layout's cosignature size;
    /// callers slice out of a region whose length was validated at
    /// aggregate construction.
    pub fn read_from(layout: SignatureLayout, bytes: &[u8]) -> Self {
        let signer = SignerKey::from_slice(&bytes[..SignerKey::BYTES]);
        let (scheme, signature_offset) = match layout {
            SignatureLayout::Raw => (SignatureScheme::Ed25519Sha3, SignerKey::BYTES),
            SignatureLayout::Extended => (
                SignatureScheme::from_byte(bytes[SignerKey::BYTES]),
                SignerKey::BYTES + 1,
            ),
        };
        let signature =
            Signature::from_slice(&bytes[signature_offset..signature_offset + Signature::BYTES]);

        Self {
            signer,
            scheme,
            signature,
        }
    }
}

/// A cosignature detached from its aggregate, meaningful only relative to
/// the pending transaction whose hash equals `parent_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedCosignature {
    /// The cosignature itself.
    pub cosignature: Cosignature,
    /// Hash of the aggregate this cosignature authorizes.
    pub parent_hash: Hash,
}

impl DetachedCosignature {
    /// Create a detached cosignature.
    pub fn new(cosignature: Cosignature, parent_hash: Hash) -> Self {
        Self {
            cosignature,
            parent_hash,
        }
    }

    /// Public key of the cosigner.
    pub fn signer(&self) -> &SignerKey {
        &self.cosignature.signer
    }
}
