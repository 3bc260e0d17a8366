//! Identifier newtypes.

use std::collections::BTreeSet;
use std::fmt;

/// Height of a block in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockHeight(pub u64);

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An address that has not yet been resolved against chain state.
///
/// Carried through the cache unchanged from first insertion to removal; the
/// engine never inspects the contents.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnresolvedAddress(pub [u8; 25]);

impl UnresolvedAddress {
    /// Size of an address in bytes.
    pub const BYTES: usize = 25;

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 25] {
        &self.0
    }
}

impl fmt::Debug for UnresolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnresolvedAddress({})", hex::encode(self.0))
    }
}

/// Addresses extracted from an aggregate by an upstream collaborator.
pub type ExtractedAddresses = BTreeSet<UnresolvedAddress>;
