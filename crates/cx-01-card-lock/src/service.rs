//! Card Lock Manager - polling compare-and-swap lock acquisition.

use crate::domain::{LockConfig, LockError, LockHolder, LockResult};
use crate::ports::inbound::CardLockApi;
use crate::ports::outbound::CardStore;
use async_trait::async_trait;
use shared_types::{Card, CardId, CardLock, SystemTimeSource, TimeSource};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lock manager over a [`CardStore`].
pub struct CardLockManager<S: CardStore> {
    store: Arc<S>,
    time: Arc<dyn TimeSource>,
    config: LockConfig,
}

impl<S: CardStore> CardLockManager<S> {
    pub fn new(store: Arc<S>, config: LockConfig) -> Self {
        Self::with_time_source(store, config, Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(store: Arc<S>, config: LockConfig, time: Arc<dyn TimeSource>) -> Self {
        Self {
            store,
            time,
            config,
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// One read-check-swap round. `Ok(None)` means try again later.
    async fn try_acquire(
        &self,
        card_id: &CardId,
        timeout_ms: u64,
        holder_id: &str,
    ) -> LockResult<Option<Card>> {
        let card = self
            .store
            .find_card(card_id)
            .await?
            .ok_or_else(|| LockError::CardNotFound(card_id.clone()))?;

        let now = self.time.now();
        let observed = &card.lock;
        let reentrant = observed.is_held_by(holder_id);
        let expired = !observed.is_unlocked() && observed.is_expired(now, timeout_ms);

        if !(observed.is_unlocked() || reentrant || expired) {
            return Ok(None);
        }

        if expired && !reentrant {
            warn!(
                card_id = %card_id,
                stale_holder = ?observed.holder,
                held_ms = now.saturating_sub(observed.acquired_at),
                "[cx-01] Breaking expired card lock"
            );
        }

        // acquired_at == 0 encodes "unlocked", so never write it.
        let lock = CardLock::held_by(holder_id, now.max(1));
        if self
            .store
            .compare_and_swap_lock(card_id, observed, lock.clone())
            .await?
        {
            Ok(Some(Card { lock, ..card }))
        } else {
            debug!(card_id = %card_id, "[cx-01] Lost lock race, retrying");
            Ok(None)
        }
    }
}

#[async_trait]
impl<S: CardStore + 'static> CardLockApi for CardLockManager<S> {
    async fn acquire(
        &self,
        card_id: &CardId,
        timeout_ms: u64,
        holder: &LockHolder,
    ) -> LockResult<Card> {
        let holder_id = holder.id();
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if let Some(card) = self.try_acquire(card_id, timeout_ms, &holder_id).await? {
                debug!(card_id = %card_id, holder = %holder_id, attempt, "[cx-01] Card lock acquired");
                return Ok(card);
            }
            if attempt < max_attempts {
                debug!(card_id = %card_id, attempt, "[cx-01] Card locked, waiting");
                tokio::time::sleep(self.config.retry_interval).await;
            }
        }

        warn!(
            card_id = %card_id,
            holder = %holder_id,
            attempts = max_attempts,
            "[cx-01] Gave up acquiring card lock"
        );
        Err(LockError::Timeout {
            card_id: card_id.clone(),
            attempts: max_attempts,
        })
    }

    async fn release(&self, card: &Card) -> LockResult<()> {
        self.store.clear_lock(&card.id).await?;
        debug!(card_id = %card.id, "[cx-01] Card lock released");
        Ok(())
    }
}

impl<S: CardStore> std::fmt::Debug for CardLockManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardLockManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Logs the effective lock settings once at startup.
pub fn log_lock_config(config: &LockConfig) {
    info!(
        timeout_ms = config.timeout_ms,
        retry_interval_ms = config.retry_interval.as_millis() as u64,
        max_attempts = config.max_attempts,
        "[cx-01] Card lock manager configured"
    );
}
