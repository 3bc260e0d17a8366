//! Cosigner keys and signatures.
//!
//! The engine only ever *verifies* cosignatures; signing support exists for
//! fixtures and simulation. All cosignatures are ed25519 over the parent
//! aggregate hash; the [`SignatureScheme`] records how the signing key was
//! derived and is carried through the extended wire layout.

use std::fmt;

/// A cosigner's ed25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignerKey([u8; 32]);

impl SignerKey {
    /// Size of a signer key in bytes.
    pub const BYTES: usize = 32;

    /// Create a signer key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a signer key from a byte slice.
    ///
    /// # Panics
    ///
    /// Panics if the slice length is not exactly 32.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Self(arr)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(self.0);
        write!(f, "SignerKey({}..{})", &hex[..8], &hex[56..])
    }
}

impl fmt::Display for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A raw ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Size of a signature in bytes.
    pub const BYTES: usize = 64;

    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Create a signature from a byte slice.
    ///
    /// # Panics
    ///
    /// Panics if the slice length is not exactly 64.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut arr = [0u8; 64];
        arr.copy_from_slice(bytes);
        Self(arr)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(self.0);
        write!(f, "Signature({}..)", &hex[..8])
    }
}

/// Key derivation scheme for a cosigner account.
///
/// Verification is identical for both schemes; the scheme byte is carried
/// through the extended cosignature layout so downstream consumers can
/// re-derive addresses. The raw layout only represents the default scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureScheme {
    /// SHA3-derived account key (scheme byte 0, the default).
    #[default]
    Ed25519Sha3,
    /// SHA2-derived account key (scheme byte 1).
    Ed25519Sha2,
}

impl SignatureScheme {
    /// Wire encoding of the scheme.
    pub fn to_byte(self) -> u8 {
        match self {
            SignatureScheme::Ed25519Sha3 => 0,
            SignatureScheme::Ed25519Sha2 => 1,
        }
    }

    /// Decode a scheme byte; unknown values fall back to the default scheme.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => SignatureScheme::Ed25519Sha2,
            _ => SignatureScheme::Ed25519Sha3,
        }
    }
}

/// Verify an ed25519 cosignature over `message`.
///
/// Returns `false` for malformed keys as well as for invalid signatures;
/// callers treat both as an unverifiable cosignature.
pub fn verify_cosignature(signer: &SignerKey, message: &[u8], signature: &Signature) -> bool {
    use ed25519_dalek::Verifier;

    let key = match ed25519_dalek::VerifyingKey::from_bytes(signer.as_bytes()) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    key.verify(message, &signature).is_ok()
}

/// An ed25519 key pair for producing cosignatures.
///
/// Used by fixtures and simulation; production nodes receive cosignatures
/// from the network and never sign.
#[derive(Clone)]
pub struct CosignerKeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl CosignerKeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a key pair from a seed (for deterministic tests).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The public signer key.
    pub fn signer_key(&self) -> SignerKey {
        SignerKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let pair = CosignerKeyPair::generate();
        let signature = pair.sign(b"parent hash stand-in");

        assert!(verify_cosignature(
            &pair.signer_key(),
            b"parent hash stand-in",
            &signature
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_message() {
        let pair = CosignerKeyPair::generate();
        let signature = pair.sign(b"message a");

        assert!(!verify_cosignature(&pair.signer_key(), b"message b", &signature));
    }

    #[test]
    fn test_verify_rejects_wrong_signer() {
        let pair = CosignerKeyPair::generate();
        let other = CosignerKeyPair::generate();
        let signature = pair.sign(b"message");

        assert!(!verify_cosignature(&other.signer_key(), b"message", &signature));
    }

    #[test]
    fn test_from_seed_deterministic() {
        let a = CosignerKeyPair::from_seed(&[7u8; 32]);
        let b = CosignerKeyPair::from_seed(&[7u8; 32]);
        assert_eq!(a.signer_key(), b.signer_key());
    }

    #[test]
    fn test_scheme_byte_roundtrip() {
        assert_eq!(
            SignatureScheme::from_byte(SignatureScheme::Ed25519Sha3.to_byte()),
            SignatureScheme::Ed25519Sha3
        );
        assert_eq!(
            SignatureScheme::from_byte(SignatureScheme::Ed25519Sha2.to_byte()),
            SignatureScheme::Ed25519Sha2
        );
        // unknown bytes collapse to the default
        assert_eq!(SignatureScheme::from_byte(0xFF), SignatureScheme::Ed25519Sha3);
    }
}
