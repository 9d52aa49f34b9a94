//! # Outbound Ports
//!
//! Storage the lock manager depends on. Any document or relational store
//! with a single-record conditional update can implement it.

use async_trait::async_trait;
use shared_types::{Card, CardId, CardLock, CardState, StoreError};

/// Persistent card records.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Inserts a new card. `Conflict` if the id is taken.
    async fn insert_card(&self, card: Card) -> Result<(), StoreError>;

    async fn find_card(&self, card_id: &CardId) -> Result<Option<Card>, StoreError>;

    /// Replaces the lock with `new` only if it currently equals `expected`.
    ///
    /// Returns `Ok(false)` when the card is missing or the lock changed.
    async fn compare_and_swap_lock(
        &self,
        card_id: &CardId,
        expected: &CardLock,
        new: CardLock,
    ) -> Result<bool, StoreError>;

    /// Unconditionally resets the lock. No-op for a missing card.
    async fn clear_lock(&self, card_id: &CardId) -> Result<(), StoreError>;

    /// Returns `Ok(false)` when the card is missing.
    async fn set_state(&self, card_id: &CardId, state: CardState) -> Result<bool, StoreError>;
}
