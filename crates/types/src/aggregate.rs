//! Bonded aggregate transaction wire type.
//!
//! An aggregate is an owned byte buffer: a fixed 108-byte header, a
//! variable-length payload of embedded transactions (opaque to this engine),
//! and a trailing cosignature region. All accessors compute offsets from the
//! declared header fields; bounds are validated once at construction so the
//! accessors never re-check.
//!
//! ```text
//! offset   0  size u32            total transaction size in bytes
//! offset   4  entity_type u16     AGGREGATE_BONDED / AGGREGATE_COMPLETE
//! offset   6  version u8          1 = raw cosignatures, 2 = extended
//! offset   7  network u8
//! offset   8  signer [32]
//! offset  40  signature [64]
//! offset 104  payload_size u32
//! offset 108  payload             embedded transactions
//! offset 108 + payload_size       cosignature region
//! ```
//!
//! All multi-byte fields are little-endian.

use crate::cosignature::{Cosignature, SignatureLayout};
use crate::crypto::{Signature, SignerKey};
use crate::hash::Hash;

/// Entity type of a bonded aggregate (requires cosignatures before it is
/// eligible for inclusion).
pub const AGGREGATE_BONDED: u16 = 0x4241;

/// Entity type of a complete aggregate (all cosignatures already embedded at
/// submission). Never accepted by the aggregation engine.
pub const AGGREGATE_COMPLETE: u16 = 0x4141;

/// Size of the fixed aggregate header in bytes.
pub const AGGREGATE_HEADER_SIZE: usize = 108;

const OFFSET_SIZE: usize = 0;
const OFFSET_ENTITY_TYPE: usize = 4;
const OFFSET_VERSION: usize = 6;
const OFFSET_NETWORK: usize = 7;
const OFFSET_SIGNER: usize = 8;
const OFFSET_SIGNATURE: usize = 40;
const OFFSET_PAYLOAD_SIZE: usize = 104;

/// Errors detected when validating an aggregate buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateFormatError {
    /// Buffer is shorter than the fixed header.
    #[error("aggregate buffer too small: {actual} bytes, header requires {AGGREGATE_HEADER_SIZE}")]
    BufferTooSmall {
        /// Actual buffer length.
        actual: usize,
    },

    /// Declared size field disagrees with the buffer length.
    #[error("declared size {declared} does not match buffer length {actual}")]
    SizeMismatch {
        /// Size field value.
        declared: u32,
        /// Actual buffer length.
        actual: usize,
    },

    /// Sub-version does not map to a known cosignature layout.
    #[error("unsupported aggregate version {0}")]
    UnsupportedVersion(u8),

    /// Declared payload extends past the end of the buffer.
    #[error("payload size {payload_size} exceeds available {available} bytes")]
    PayloadOverflow {
        /// Declared payload size.
        payload_size: u32,
        /// Bytes available after the header.
        available: usize,
    },

    /// Trailing region is not a whole number of cosignatures.
    #[error("cosignature region of {region_size} bytes is not a multiple of {cosignature_size}")]
    MalformedCosignatureRegion {
        /// Trailing region length.
        region_size: usize,
        /// Per-cosignature size for the declared layout.
        cosignature_size: usize,
    },
}

/// A bonded aggregate transaction as an owned, validated byte buffer.
///
/// Equality is byte equality. Cloning copies the buffer; the engine shares
/// aggregates behind `Arc` instead of cloning on hot paths.
#[derive(Clone, PartialEq, Eq)]
pub struct AggregateTransaction {
    bytes: Vec<u8>,
}

impl AggregateTransaction {
    /// Validate and take ownership of an aggregate buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AggregateFormatError> {
        if bytes.len() < AGGREGATE_HEADER_SIZE {
            return Err(AggregateFormatError::BufferTooSmall {
                actual: bytes.len(),
            });
        }

        let declared = read_u32(&bytes, OFFSET_SIZE);
        if declared as usize != bytes.len() {
            return Err(AggregateFormatError::SizeMismatch {
                declared,
                actual: bytes.len(),
            });
        }

        let version = bytes[OFFSET_VERSION];
        let layout = SignatureLayout::from_version(version)
            .ok_or(AggregateFormatError::UnsupportedVersion(version))?;

        let payload_size = read_u32(&bytes, OFFSET_PAYLOAD_SIZE);
        let available = bytes.len() - AGGREGATE_HEADER_SIZE;
        if payload_size as usize > available {
            return Err(AggregateFormatError::PayloadOverflow {
                payload_size,
                available,
            });
        }

        let region_size = available - payload_size as usize;
        let cosignature_size = layout.cosignature_size();
        if region_size % cosignature_size != 0 {
            return Err(AggregateFormatError::MalformedCosignatureRegion {
                region_size,
                cosignature_size,
            });
        }

        Ok(Self { bytes })
    }

    /// Assemble an aggregate from its parts. The resulting buffer is valid
    /// by construction.
    pub fn from_parts(
        entity_type: u16,
        layout: SignatureLayout,
        network: u8,
        signer: &SignerKey,
        signature: &Signature,
        payload: &[u8],
        cosignatures: &[Cosignature],
    ) -> Self {
        let size = AGGREGATE_HEADER_SIZE
            + payload.len()
            + cosignatures.len() * layout.cosignature_size();

        let mut bytes = Vec::with_capacity(size);
        bytes.extend_from_slice(&(size as u32).to_le_bytes());
        bytes.extend_from_slice(&entity_type.to_le_bytes());
        bytes.push(layout.version());
        bytes.push(network);
        bytes.extend_from_slice(signer.as_bytes());
        bytes.extend_from_slice(signature.as_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload);
        for cosignature in cosignatures {
            cosignature.write_to(layout, &mut bytes);
        }

        Self { bytes }
    }

    /// The raw wire bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total transaction size in bytes (equals the buffer length).
    pub fn size(&self) -> u32 {
        read_u32(&self.bytes, OFFSET_SIZE)
    }

    /// Declared entity type.
    pub fn entity_type(&self) -> u16 {
        u16::from_le_bytes([self.bytes[OFFSET_ENTITY_TYPE], self.bytes[OFFSET_ENTITY_TYPE + 1]])
    }

    /// Aggregate sub-version.
    pub fn version(&self) -> u8 {
        self.bytes[OFFSET_VERSION]
    }

    /// Network identifier byte.
    pub fn network(&self) -> u8 {
        self.bytes[OFFSET_NETWORK]
    }

    /// Cosignature layout selected by the sub-version.
    pub fn layout(&self) -> SignatureLayout {
        // Version was validated at construction.
        match self.bytes[OFFSET_VERSION] {
            1 => SignatureLayout::Raw,
            _ => SignatureLayout::Extended,
        }
    }

    /// Public key of the aggregate's originating signer.
    pub fn signer(&self) -> SignerKey {
        SignerKey::from_slice(&self.bytes[OFFSET_SIGNER..OFFSET_SIGNER + SignerKey::BYTES])
    }

    /// Signature of the originating signer.
    pub fn signature(&self) -> Signature {
        Signature::from_slice(&self.bytes[OFFSET_SIGNATURE..OFFSET_SIGNATURE + Signature::BYTES])
    }

    /// Declared payload size in bytes.
    pub fn payload_size(&self) -> u32 {
        read_u32(&self.bytes, OFFSET_PAYLOAD_SIZE)
    }

    /// The embedded transaction payload (opaque to this engine).
    pub fn payload(&self) -> &[u8] {
        let start = AGGREGATE_HEADER_SIZE;
        &self.bytes[start..start + self.payload_size() as usize]
    }

    fn cosignature_region(&self) -> &[u8] {
        &self.bytes[AGGREGATE_HEADER_SIZE + self.payload_size() as usize..]
    }

    /// Number of cosignatures in the trailing region.
    pub fn cosignatures_count(&self) -> usize {
        self.cosignature_region().len() / self.layout().cosignature_size()
    }

    /// Decode the trailing cosignature region.
    pub fn cosignatures(&self) -> Vec<Cosignature> {
        let layout = self.layout();
        self.cosignature_region()
            .chunks_exact(layout.cosignature_size())
            .map(|chunk| Cosignature::read_from(layout, chunk))
            .collect()
    }

    /// Whether the trailing cosignature region is empty.
    pub fn is_stripped(&self) -> bool {
        self.cosignature_region().is_empty()
    }

    /// Copy of this aggregate with the cosignature region removed and the
    /// size field updated.
    pub fn strip_cosignatures(&self) -> Self {
        if self.is_stripped() {
            return self.clone();
        }

        let truncated = AGGREGATE_HEADER_SIZE + self.payload_size() as usize;
        let mut bytes = self.bytes[..truncated].to_vec();
        bytes[OFFSET_SIZE..OFFSET_SIZE + 4].copy_from_slice(&(truncated as u32).to_le_bytes());
        Self { bytes }
    }

    /// Content hash of the aggregate.
    ///
    /// Covers every header field except the size field plus the payload, so
    /// the hash is identical for an aggregate and its stripped copy.
    pub fn hash(&self) -> Hash {
        let end = AGGREGATE_HEADER_SIZE + self.payload_size() as usize;
        Hash::from_bytes(&self.bytes[OFFSET_ENTITY_TYPE..end])
    }
}

impl std::fmt::Debug for AggregateTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateTransaction")
            .field("size", &self.size())
            .field("entity_type", &format_args!("{:#06x}", self.entity_type()))
            .field("version", &self.version())
            .field("payload_size", &self.payload_size())
            .field("cosignatures", &self.cosignatures_count())
            .finish()
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
