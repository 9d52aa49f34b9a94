//! # Outbound Ports
//!
//! Account balances rely on the store's atomic increment; there is no
//! account-level lock and no multi-record transaction.

use crate::domain::BankTransaction;
use async_trait::async_trait;
use rust_decimal::Decimal;
use shared_types::{Account, Address, StoreError, Timestamp, UserId};

/// Account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, user_id: &UserId) -> Result<Option<Account>, StoreError>;

    /// Account bound to `address`, current or previous.
    async fn find_by_address(&self, address: &Address) -> Result<Option<Account>, StoreError>;

    /// Atomic `balance += delta`, refreshing `below_target_balance` in the
    /// same write. Returns the account as written, or `None` if it does not
    /// exist. `OutOfRange` if the new balance is not representable.
    async fn increment_balance(
        &self,
        user_id: &UserId,
        delta: Decimal,
        at: Timestamp,
    ) -> Result<Option<Account>, StoreError>;
}

/// Append-only transaction log.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// `Conflict` on a duplicate id.
    async fn insert_transaction(&self, transaction: BankTransaction) -> Result<(), StoreError>;

    /// Newest first.
    async fn transactions_for_participant(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<BankTransaction>, StoreError>;
}

/// Signature checks and address resolution.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// True when `signature` over `payload` verifies with `public_key`.
    /// Both are hex encoded; undecodable input simply fails.
    fn verify(&self, payload: &[u8], public_key: &str, signature: &str) -> bool;

    async fn resolve_address(&self, address: &Address) -> Result<Option<Account>, StoreError>;
}
