//! Ed25519 identity verifier.
//!
//! An address is the hex of the first 20 bytes of `keccak256(public_key)`.
//! Signatures are 64-byte Ed25519 signatures over the exact details bytes.

use crate::ports::outbound::{AccountStore, IdentityVerifier};
use async_trait::async_trait;
use ed25519_dalek::{Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use shared_types::{Account, Address, AddressBinding, StoreError};
use std::sync::Arc;

/// Derives the address of an Ed25519 public key.
pub fn address_for_key(key: &VerifyingKey) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    Address::new(hex::encode(&digest[..20]))
}

/// Address binding for a public key, as stored on the account.
pub fn binding_for_key(key: &VerifyingKey) -> AddressBinding {
    AddressBinding {
        address: address_for_key(key),
        public_key: hex::encode(key.as_bytes()),
    }
}

/// Verifies Ed25519 signatures and resolves addresses through an
/// [`AccountStore`].
pub struct Ed25519IdentityVerifier<A: AccountStore> {
    accounts: Arc<A>,
}

impl<A: AccountStore> Ed25519IdentityVerifier<A> {
    pub fn new(accounts: Arc<A>) -> Self {
        Self { accounts }
    }
}

fn decode_key(public_key: &str) -> Option<VerifyingKey> {
    let bytes: [u8; 32] = hex::decode(public_key).ok()?.try_into().ok()?;
    VerifyingKey::from_bytes(&bytes).ok()
}

fn decode_signature(signature: &str) -> Option<Signature> {
    let bytes: [u8; 64] = hex::decode(signature).ok()?.try_into().ok()?;
    Some(Signature::from_bytes(&bytes))
}

#[async_trait]
impl<A: AccountStore + 'static> IdentityVerifier for Ed25519IdentityVerifier<A> {
    fn verify(&self, payload: &[u8], public_key: &str, signature: &str) -> bool {
        let (Some(key), Some(signature)) = (decode_key(public_key), decode_signature(signature))
        else {
            return false;
        };
        key.verify_strict(payload, &signature).is_ok()
    }

    async fn resolve_address(&self, address: &Address) -> Result<Option<Account>, StoreError> {
        self.accounts.find_by_address(address).await
    }
}
