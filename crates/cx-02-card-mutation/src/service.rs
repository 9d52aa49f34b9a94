//! Card Mutation Engine - lock orchestration, sequencing and the read side.

use crate::apply;
use crate::domain::{CardStateSnapshot, GroupState, MutationConfig, MutationError, MutationResult};
use crate::ports::inbound::CardMutationApi;
use crate::ports::outbound::CardStateStore;
use async_trait::async_trait;
use cx_01_card_lock::{CardLockApi, LockHolder};
use serde_json::Value;
use shared_bus::{EventPublisher, PlatformEvent};
use shared_types::{
    Card, CardId, Group, MutationPayload, MutationRecord, SystemTimeSource, TimeSource, UserId,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The mutation engine.
///
/// Generic over the lock manager and the state store so either can be
/// swapped for a database-backed adapter without touching this code.
pub struct CardMutationEngine<L: CardLockApi, S: CardStateStore> {
    locks: Arc<L>,
    store: Arc<S>,
    time: Arc<dyn TimeSource>,
    publisher: Option<Arc<dyn EventPublisher>>,
    config: MutationConfig,
}

impl<L: CardLockApi, S: CardStateStore> CardMutationEngine<L, S> {
    pub fn new(locks: Arc<L>, store: Arc<S>, config: MutationConfig) -> Self {
        Self::with_time_source(locks, store, config, Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(
        locks: Arc<L>,
        store: Arc<S>,
        config: MutationConfig,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            locks,
            store,
            time,
            publisher: None,
            config,
        }
    }

    /// Fan committed mutations out to `publisher`.
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Runs `op` with the card locked by a fresh holder.
    ///
    /// Deleted cards read as missing. The lock is released whatever `op`
    /// returns; a failed release is logged and left to expire.
    async fn with_card_lock<T, F, Fut>(&self, card_id: &CardId, op: F) -> MutationResult<T>
    where
        F: FnOnce(Card) -> Fut + Send,
        Fut: Future<Output = MutationResult<T>> + Send,
        T: Send,
    {
        let holder = LockHolder::for_operation(&self.config.server_id);
        let card = self
            .locks
            .acquire(card_id, self.config.lock_timeout_ms, &holder)
            .await?;

        let result = if card.is_deleted() {
            Err(MutationError::CardNotFound(card_id.clone()))
        } else {
            op(card.clone()).await
        };

        if let Err(e) = self.locks.release(&card).await {
            warn!(
                card_id = %card_id,
                holder = %holder,
                error = %e,
                "[cx-02] Failed to release card lock, it will expire"
            );
        }
        result
    }

    /// Steps that run under the lock once the payload is known valid.
    async fn commit_locked(
        &self,
        card: &Card,
        user_id: &UserId,
        mutation: MutationPayload,
    ) -> MutationResult<MutationRecord> {
        apply::apply_payload(self.store.as_ref(), &card.id, user_id, &mutation).await?;

        let group = mutation.group();
        let scope = group.scope_for(user_id);
        let now = self.time.now();
        let at = match self
            .store
            .find_last_mutation(&card.id, group, &scope)
            .await?
        {
            Some(last) => now.max(last.at + 1),
            None => now,
        };

        let record = MutationRecord {
            index: self.store.next_sequence().await?,
            mutation_id: Uuid::new_v4().to_string(),
            card_id: card.id.clone(),
            group,
            by: user_id.clone(),
            at,
            mutation,
        };
        self.store.insert_mutation(record.clone()).await?;
        Ok(record)
    }

    async fn group_state(
        &self,
        card_id: &CardId,
        group: Group,
        scope: &UserId,
        include_initial: bool,
    ) -> MutationResult<GroupState> {
        let mutation_id = self
            .store
            .find_last_mutation(card_id, group, scope)
            .await?
            .map(|record| record.mutation_id);

        if !include_initial {
            return Ok(GroupState {
                mutation_id,
                ..Default::default()
            });
        }

        let properties = self.store.list_properties(card_id, group, scope).await?;
        let items = self
            .store
            .list_namespace_items(card_id, group, scope)
            .await?;
        Ok(GroupState::with_initial(mutation_id, properties, items))
    }

    async fn publish(&self, event: PlatformEvent) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(event).await;
        }
    }
}

#[async_trait]
impl<L, S> CardMutationApi for CardMutationEngine<L, S>
where
    L: CardLockApi + 'static,
    S: CardStateStore + 'static,
{
    async fn apply_mutation(
        &self,
        card_id: &CardId,
        user_id: &UserId,
        mutation: MutationPayload,
    ) -> MutationResult<MutationRecord> {
        apply::validate(&mutation)?;
        let kind = mutation.kind();

        let record = self
            .with_card_lock(card_id, |card| async move {
                self.commit_locked(&card, user_id, mutation).await
            })
            .await
            .inspect_err(|e| {
                debug!(card_id = %card_id, kind, error = %e, "[cx-02] Mutation rejected");
            })?;

        info!(
            card_id = %card_id,
            index = record.index,
            kind,
            group = %record.group,
            by = %user_id,
            "[cx-02] Mutation committed"
        );
        self.publish(PlatformEvent::MutationCommitted(record.clone()))
            .await;
        Ok(record)
    }

    async fn apply_mutation_json(
        &self,
        card_id: &CardId,
        user_id: &UserId,
        payload: &Value,
    ) -> MutationResult<MutationRecord> {
        let mutation: MutationPayload = serde_json::from_value(payload.clone())
            .map_err(|e| MutationError::invalid(e.to_string()))?;
        self.apply_mutation(card_id, user_id, mutation).await
    }

    async fn populate_card_state(
        &self,
        card_id: &CardId,
        include_initial: bool,
        user: Option<&UserId>,
    ) -> MutationResult<CardStateSnapshot> {
        self.with_card_lock(card_id, |card| async move {
            let shared = self
                .group_state(&card.id, Group::Shared, &UserId::shared_scope(), include_initial)
                .await?;
            let user = match user {
                Some(user) => Some(
                    self.group_state(&card.id, Group::User, user, include_initial)
                        .await?,
                ),
                None => None,
            };
            Ok(CardStateSnapshot { user, shared })
        })
        .await
    }

    async fn find_mutations_after_index(&self, after: u64) -> MutationResult<Vec<MutationRecord>> {
        Ok(self
            .store
            .find_mutations_after(after, None, self.config.sync_page_limit)
            .await?)
    }

    async fn find_card_mutations_after_index(
        &self,
        card_id: &CardId,
        after: u64,
        limit: usize,
    ) -> MutationResult<Vec<MutationRecord>> {
        let limit = limit.min(self.config.sync_page_limit);
        Ok(self
            .store
            .find_mutations_after(after, Some(card_id), limit)
            .await?)
    }
}
