//! # Inbound Port - CardMutationApi
//!
//! Driving port used by the request layer and the fan-out gateway.

use crate::domain::{CardStateSnapshot, MutationResult};
use async_trait::async_trait;
use serde_json::Value;
use shared_types::{CardId, MutationPayload, MutationRecord, UserId};

/// Primary API of the mutation engine.
#[async_trait]
pub trait CardMutationApi: Send + Sync {
    /// Applies one payload under the card lock and appends it to the log.
    ///
    /// # Errors
    /// - `CardNotFound`: unknown or deleted card
    /// - `RecordNotFound`: referenced collection item missing
    /// - `InvalidMutation`: payload rejected
    /// - `Lock(Timeout)`: card stayed locked; the whole call may be retried
    async fn apply_mutation(
        &self,
        card_id: &CardId,
        user_id: &UserId,
        mutation: MutationPayload,
    ) -> MutationResult<MutationRecord>;

    /// Same as `apply_mutation`, parsing the payload from raw JSON first.
    async fn apply_mutation_json(
        &self,
        card_id: &CardId,
        user_id: &UserId,
        payload: &Value,
    ) -> MutationResult<MutationRecord>;

    /// Latest mutation id per group and, when `include_initial`, the full
    /// property and collection snapshot. Taken under the card lock.
    async fn populate_card_state(
        &self,
        card_id: &CardId,
        include_initial: bool,
        user: Option<&UserId>,
    ) -> MutationResult<CardStateSnapshot>;

    /// Mutations on any card with `index > after`, ascending, one page.
    async fn find_mutations_after_index(&self, after: u64) -> MutationResult<Vec<MutationRecord>>;

    /// Mutations on one card with `index > after`, ascending, at most `limit`
    /// (capped at the configured page size).
    async fn find_card_mutations_after_index(
        &self,
        card_id: &CardId,
        after: u64,
        limit: usize,
    ) -> MutationResult<Vec<MutationRecord>>;
}
