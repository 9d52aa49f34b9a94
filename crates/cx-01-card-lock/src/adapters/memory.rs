//! In-memory card store.
//!
//! Each operation runs under one write guard, which gives the same
//! single-record atomicity a document store's conditional update does.

use crate::ports::outbound::CardStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Card, CardId, CardLock, CardState, StoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory implementation of [`CardStore`].
#[derive(Default)]
pub struct InMemoryCardStore {
    cards: RwLock<HashMap<CardId, Card>>,
    unavailable: AtomicBool,
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.cards.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.read().is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("card store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CardStore for InMemoryCardStore {
    async fn insert_card(&self, card: Card) -> Result<(), StoreError> {
        self.check_available()?;
        let mut cards = self.cards.write();
        if cards.contains_key(&card.id) {
            return Err(StoreError::Conflict(format!("card {}", card.id)));
        }
        cards.insert(card.id.clone(), card);
        Ok(())
    }

    async fn find_card(&self, card_id: &CardId) -> Result<Option<Card>, StoreError> {
        self.check_available()?;
        Ok(self.cards.read().get(card_id).cloned())
    }

    async fn compare_and_swap_lock(
        &self,
        card_id: &CardId,
        expected: &CardLock,
        new: CardLock,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut cards = self.cards.write();
        match cards.get_mut(card_id) {
            Some(card) if card.lock == *expected => {
                card.lock = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_lock(&self, card_id: &CardId) -> Result<(), StoreError> {
        self.check_available()?;
        if let Some(card) = self.cards.write().get_mut(card_id) {
            card.lock = CardLock::unlocked();
        }
        Ok(())
    }

    async fn set_state(&self, card_id: &CardId, state: CardState) -> Result<bool, StoreError> {
        self.check_available()?;
        match self.cards.write().get_mut(card_id) {
            Some(card) => {
                card.state = state;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
