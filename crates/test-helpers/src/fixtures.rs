//! Fixture builders.

use partialtx_types::{
    AggregateTransaction, Cosignature, CosignerKeyPair, DetachedCosignature, Hash, Signature,
    SignatureLayout, SignatureScheme, SignerKey, AGGREGATE_BONDED, AGGREGATE_COMPLETE,
};
use rand::RngCore;

const TEST_NETWORK: u8 = 0x90;

/// A random 32-byte hash.
pub fn random_hash() -> Hash {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Hash::from_hash_bytes(&bytes)
}

fn random_payload() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let len = 64 + (rng.next_u32() as usize % 64);
    let mut payload = vec![0u8; len];
    rng.fill_bytes(&mut payload);
    payload
}

fn random_aggregate(
    entity_type: u16,
    layout: SignatureLayout,
    cosignatures: &[Cosignature],
) -> AggregateTransaction {
    let mut rng = rand::thread_rng();
    let mut signer = [0u8; 32];
    let mut signature = [0u8; 64];
    rng.fill_bytes(&mut signer);
    rng.fill_bytes(&mut signature);

    AggregateTransaction::from_parts(
        entity_type,
        layout,
        TEST_NETWORK,
        &SignerKey::from_bytes(signer),
        &Signature::from_bytes(signature),
        &random_payload(),
        cosignatures,
    )
}

/// A random bonded aggregate with no trailing cosignatures.
pub fn random_stripped_aggregate(layout: SignatureLayout) -> AggregateTransaction {
    random_aggregate(AGGREGATE_BONDED, layout, &[])
}

/// A random complete aggregate; the aggregation engine must reject it.
pub fn complete_aggregate(layout: SignatureLayout) -> AggregateTransaction {
    random_aggregate(AGGREGATE_COMPLETE, layout, &[])
}

/// A cosignature with random signer and signature bytes.
///
/// Will not pass ed25519 verification; use [`valid_cosignature`] where the
/// verification path matters.
pub fn random_cosignature() -> Cosignature {
    let mut rng = rand::thread_rng();
    let mut signer = [0u8; 32];
    let mut signature = [0u8; 64];
    rng.fill_bytes(&mut signer);
    rng.fill_bytes(&mut signature);

    Cosignature {
        signer: SignerKey::from_bytes(signer),
        scheme: SignatureScheme::default(),
        signature: Signature::from_bytes(signature),
    }
}

/// Sign `parent_hash` with `keypair`.
pub fn cosign(keypair: &CosignerKeyPair, parent_hash: &Hash) -> Cosignature {
    Cosignature {
        signer: keypair.signer_key(),
        scheme: SignatureScheme::default(),
        signature: keypair.sign(parent_hash.as_bytes()),
    }
}

/// A properly-signed cosignature over `parent_hash` from a fresh keypair.
pub fn valid_cosignature(parent_hash: &Hash) -> Cosignature {
    cosign(&CosignerKeyPair::generate(), parent_hash)
}

/// A properly-signed detached cosignature over `parent_hash`.
pub fn valid_detached_cosignature(parent_hash: &Hash) -> DetachedCosignature {
    DetachedCosignature::new(valid_cosignature(parent_hash), *parent_hash)
}
