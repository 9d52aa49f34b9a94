//! # Inbound Ports
//!
//! Driving APIs used by the mutation engine and the request layer.

use crate::domain::{LockHolder, LockResult};
use async_trait::async_trait;
use shared_types::{Card, CardId, UserId};

/// Exclusive, timeout-bounded lock per card.
#[async_trait]
pub trait CardLockApi: Send + Sync {
    /// Polls until `holder` owns the lock on `card_id`.
    ///
    /// Succeeds immediately when the lock is free, already held by `holder`,
    /// or held for longer than `timeout_ms`. Returns the card with the lock
    /// fields as written.
    ///
    /// # Errors
    /// - `CardNotFound`: no such card
    /// - `Timeout`: attempts exhausted
    async fn acquire(
        &self,
        card_id: &CardId,
        timeout_ms: u64,
        holder: &LockHolder,
    ) -> LockResult<Card>;

    /// Clears the lock regardless of who holds it. Idempotent.
    async fn release(&self, card: &Card) -> LockResult<()>;
}

/// Card lifecycle.
#[async_trait]
pub trait CardDirectoryApi: Send + Sync {
    /// Creates an active, unlocked card owned by `created_by`.
    async fn post_card(&self, created_by: &UserId) -> LockResult<Card>;

    /// Soft-deletes a card. Only the creator may delete.
    async fn delete_card(&self, card_id: &CardId, by: &UserId) -> LockResult<Card>;

    /// Fetches an active card; deleted cards read as missing.
    async fn find_card(&self, card_id: &CardId) -> LockResult<Card>;
}
