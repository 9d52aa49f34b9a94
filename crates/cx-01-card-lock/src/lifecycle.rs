//! Card lifecycle: posting and soft deletion.
//!
//! Deletion takes the card lock so it cannot interleave with an in-flight
//! mutation. Deleted cards keep their record but read as missing.

use crate::domain::{LockError, LockHolder, LockResult};
use crate::ports::inbound::{CardDirectoryApi, CardLockApi};
use crate::ports::outbound::CardStore;
use crate::service::CardLockManager;
use async_trait::async_trait;
use shared_bus::{EventPublisher, PlatformEvent};
use shared_types::{Card, CardId, CardState, TimeSource, UserId};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct CardDirectory<S: CardStore> {
    store: Arc<S>,
    locks: Arc<CardLockManager<S>>,
    time: Arc<dyn TimeSource>,
    publisher: Option<Arc<dyn EventPublisher>>,
    server_id: String,
}

impl<S: CardStore + 'static> CardDirectory<S> {
    pub fn new(
        locks: Arc<CardLockManager<S>>,
        time: Arc<dyn TimeSource>,
        server_id: impl Into<String>,
    ) -> Self {
        Self {
            store: locks.store().clone(),
            locks,
            time,
            publisher: None,
            server_id: server_id.into(),
        }
    }

    /// Publish lifecycle events to `publisher` after each change.
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    async fn publish(&self, event: PlatformEvent) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(event).await;
        }
    }

    async fn find_active(&self, card_id: &CardId) -> LockResult<Card> {
        match self.store.find_card(card_id).await? {
            Some(card) if !card.is_deleted() => Ok(card),
            _ => Err(LockError::CardNotFound(card_id.clone())),
        }
    }
}

#[async_trait]
impl<S: CardStore + 'static> CardDirectoryApi for CardDirectory<S> {
    async fn post_card(&self, created_by: &UserId) -> LockResult<Card> {
        let card = Card::new(
            CardId::new(Uuid::new_v4().to_string()),
            created_by.clone(),
            self.time.now(),
        );
        self.store.insert_card(card.clone()).await?;

        info!(card_id = %card.id, created_by = %created_by, "[cx-01] Card posted");
        self.publish(PlatformEvent::CardPosted(card.clone())).await;
        Ok(card)
    }

    async fn delete_card(&self, card_id: &CardId, by: &UserId) -> LockResult<Card> {
        let card = self.find_active(card_id).await?;
        if card.created_by != *by {
            return Err(LockError::NotCreator {
                card_id: card_id.clone(),
                user: by.to_string(),
            });
        }

        let holder = LockHolder::for_operation(&self.server_id);
        let locked = self
            .locks
            .acquire(card_id, self.locks.config().timeout_ms, &holder)
            .await?;
        let result = self.store.set_state(card_id, CardState::Deleted).await;
        if let Err(e) = self.locks.release(&locked).await {
            warn!(card_id = %card_id, error = %e, "[cx-01] Failed to release lock after delete");
        }

        if !result? {
            return Err(LockError::CardNotFound(card_id.clone()));
        }

        info!(card_id = %card_id, by = %by, "[cx-01] Card deleted");
        self.publish(PlatformEvent::CardDeleted {
            card_id: card_id.clone(),
        })
        .await;

        Ok(Card {
            state: CardState::Deleted,
            lock: Default::default(),
            ..card
        })
    }

    async fn find_card(&self, card_id: &CardId) -> LockResult<Card> {
        self.find_active(card_id).await
    }
}
