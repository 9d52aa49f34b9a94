//! # Outbound Ports
//!
//! Storage for card state and the mutation log. Implementations need
//! per-record atomicity, unique keys, sorted range reads and one atomic
//! counter; no multi-record transactions are assumed.

use crate::domain::{CardProperty, CollectionItem, CollectionKey, PropertyKey};
use async_trait::async_trait;
use shared_types::{CardId, Group, MutationRecord, StoreError, UserId};

/// Persistent card state and mutation log.
#[async_trait]
pub trait CardStateStore: Send + Sync {
    // === Properties ===

    async fn get_property(&self, key: &PropertyKey) -> Result<Option<CardProperty>, StoreError>;

    async fn upsert_property(&self, property: CardProperty) -> Result<(), StoreError>;

    /// Returns whether a property was removed.
    async fn delete_property(&self, key: &PropertyKey) -> Result<bool, StoreError>;

    async fn list_properties(
        &self,
        card_id: &CardId,
        group: Group,
        scope: &UserId,
    ) -> Result<Vec<CardProperty>, StoreError>;

    // === Collections ===

    async fn get_item(
        &self,
        partition: &CollectionKey,
        key: &str,
    ) -> Result<Option<CollectionItem>, StoreError>;

    /// Items of one partition, ascending by index.
    async fn list_items(&self, partition: &CollectionKey) -> Result<Vec<CollectionItem>, StoreError>;

    /// Every item of every collection in a namespace, grouped by collection
    /// and ascending by index within each.
    async fn list_namespace_items(
        &self,
        card_id: &CardId,
        group: Group,
        scope: &UserId,
    ) -> Result<Vec<CollectionItem>, StoreError>;

    /// `Conflict` when the key or the index is already taken.
    async fn insert_item(&self, item: CollectionItem) -> Result<(), StoreError>;

    /// Replaces value and index of an existing item. `Ok(false)` if missing,
    /// `Conflict` if the new index is taken by a sibling.
    async fn update_item(&self, item: CollectionItem) -> Result<bool, StoreError>;

    async fn delete_item(&self, partition: &CollectionKey, key: &str) -> Result<bool, StoreError>;

    /// Reassigns `1.0, 2.0, …` in current order. Returns the renumbered items.
    async fn renumber_partition(
        &self,
        partition: &CollectionKey,
    ) -> Result<Vec<CollectionItem>, StoreError>;

    // === Mutation log ===

    /// Fetch-and-add on the singleton sequence counter. First value is 1.
    async fn next_sequence(&self) -> Result<u64, StoreError>;

    /// `Conflict` on a duplicate index.
    async fn insert_mutation(&self, record: MutationRecord) -> Result<(), StoreError>;

    /// The record with the highest `at` in `(card, group, scope)`.
    async fn find_last_mutation(
        &self,
        card_id: &CardId,
        group: Group,
        scope: &UserId,
    ) -> Result<Option<MutationRecord>, StoreError>;

    /// Records with `index > after`, ascending, optionally for one card.
    async fn find_mutations_after(
        &self,
        after: u64,
        card_id: Option<&CardId>,
        limit: usize,
    ) -> Result<Vec<MutationRecord>, StoreError>;
}
