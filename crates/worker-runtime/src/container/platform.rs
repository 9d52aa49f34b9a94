//! # Platform Container
//!
//! Holds one instance of every core service, wired onto the in-memory
//! adapters and sharing a single event bus.
//!
//! ```text
//! InMemoryCardStore ──→ CardLockManager ──┬──→ CardDirectory
//!                                         └──→ CardMutationEngine ←── InMemoryCardStateStore
//! InMemoryAccountStore ──→ Ed25519IdentityVerifier ──→ Bank ←── InMemoryLedgerStore
//!
//! CardDirectory, CardMutationEngine, Bank ──publish──→ InMemoryEventBus
//! ```

use std::sync::Arc;

use tracing::{info, instrument};

use cx_01_card_lock::{CardDirectory, CardLockManager, InMemoryCardStore};
use cx_02_card_mutation::{CardMutationEngine, InMemoryCardStateStore};
use cx_03_value_ledger::{Bank, Ed25519IdentityVerifier, InMemoryAccountStore, InMemoryLedgerStore};
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_types::{SystemTimeSource, TimeSource};

use crate::container::config::PlatformConfig;

/// Lock manager over the in-memory card table.
pub type ConcreteLockManager = CardLockManager<InMemoryCardStore>;

/// Card lifecycle over the in-memory card table.
pub type ConcreteCardDirectory = CardDirectory<InMemoryCardStore>;

/// Mutation engine over the in-memory state tables.
pub type ConcreteMutationEngine = CardMutationEngine<ConcreteLockManager, InMemoryCardStateStore>;

/// Bank over the in-memory account and ledger tables.
pub type ConcreteBank = Bank<
    InMemoryAccountStore,
    InMemoryLedgerStore,
    Ed25519IdentityVerifier<InMemoryAccountStore>,
>;

/// Every service a worker exposes, plus the stores behind them.
pub struct Platform {
    /// Configuration the services were built with.
    pub config: PlatformConfig,

    // =========================================================================
    // CARDS (cx-01, cx-02)
    // =========================================================================
    pub card_store: Arc<InMemoryCardStore>,
    pub locks: Arc<ConcreteLockManager>,
    pub cards: Arc<ConcreteCardDirectory>,
    pub card_state: Arc<InMemoryCardStateStore>,
    pub mutations: Arc<ConcreteMutationEngine>,

    // =========================================================================
    // LEDGER (cx-03)
    // =========================================================================
    pub accounts: Arc<InMemoryAccountStore>,
    pub ledger: Arc<InMemoryLedgerStore>,
    pub bank: Arc<ConcreteBank>,

    // =========================================================================
    // SHARED INFRASTRUCTURE
    // =========================================================================
    /// Notification fan-out for committed changes.
    pub event_bus: Arc<InMemoryEventBus>,
}

impl Platform {
    /// Builds every service against the system clock.
    pub fn new(config: PlatformConfig) -> Self {
        Self::with_time_source(config, Arc::new(SystemTimeSource))
    }

    /// Builds every service against `time`.
    #[instrument(name = "platform_init", skip_all, fields(server_id = %config.server_id))]
    pub fn with_time_source(config: PlatformConfig, time: Arc<dyn TimeSource>) -> Self {
        info!("Initializing Cardex platform container");

        let event_bus = Arc::new(InMemoryEventBus::with_capacity(config.bus.channel_capacity));
        let publisher: Arc<dyn EventPublisher> = event_bus.clone();

        let card_store = Arc::new(InMemoryCardStore::new());
        let locks = Arc::new(CardLockManager::with_time_source(
            card_store.clone(),
            config.lock.clone(),
            time.clone(),
        ));
        let cards = Arc::new(
            CardDirectory::new(locks.clone(), time.clone(), config.server_id.clone())
                .with_publisher(publisher.clone()),
        );
        info!("  [cx-01] Card lock manager and directory initialized");

        let card_state = Arc::new(InMemoryCardStateStore::new());
        let mutations = Arc::new(
            CardMutationEngine::with_time_source(
                locks.clone(),
                card_state.clone(),
                config.mutation.clone(),
                time.clone(),
            )
            .with_publisher(publisher.clone()),
        );
        info!("  [cx-02] Card mutation engine initialized");

        let accounts = Arc::new(InMemoryAccountStore::new());
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let verifier = Arc::new(Ed25519IdentityVerifier::new(accounts.clone()));
        let bank = Arc::new(
            Bank::with_time_source(
                accounts.clone(),
                ledger.clone(),
                verifier,
                config.ledger.clone(),
                time,
            )
            .with_publisher(publisher),
        );
        info!("  [cx-03] Bank initialized");

        Self {
            config,
            card_store,
            locks,
            cards,
            card_state,
            mutations,
            accounts,
            ledger,
            bank,
            event_bus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cx_01_card_lock::CardDirectoryApi;
    use cx_02_card_mutation::CardMutationApi;
    use cx_03_value_ledger::{binding_for_key, BankApi};
    use ed25519_dalek::{Signer, SigningKey};
    use rust_decimal_macros::dec;
    use shared_bus::{EventFilter, PlatformEvent};
    use shared_types::{Account, Group, MockTimeSource, MutationPayload, UserId};

    const NOW: u64 = 1_700_000_000_000;

    fn platform() -> Platform {
        Platform::with_time_source(
            PlatformConfig::with_server_id("worker-test"),
            Arc::new(MockTimeSource::new(NOW)),
        )
    }

    #[test]
    fn test_container_uses_configured_capacity() {
        let mut config = PlatformConfig::with_server_id("worker-test");
        config.bus.channel_capacity = 16;
        let platform = Platform::new(config);
        assert_eq!(platform.event_bus.capacity(), 16);
        assert_eq!(platform.mutations.config().server_id, "worker-test");
    }

    #[tokio::test]
    async fn test_services_share_the_card_table_and_bus() {
        let platform = platform();
        let mut sub = platform.event_bus.subscribe(EventFilter::all());
        let author = UserId::new("author");

        let card = platform.cards.post_card(&author).await.unwrap();
        let record = platform
            .mutations
            .apply_mutation(
                &card.id,
                &author,
                MutationPayload::IncProperty {
                    group: Group::Shared,
                    name: "views".into(),
                    increment_by: 1.0,
                },
            )
            .await
            .unwrap();
        assert_eq!(record.index, 1);
        assert_eq!(platform.card_store.len(), 1);

        assert!(matches!(sub.try_recv(), Ok(Some(PlatformEvent::CardPosted(_)))));
        assert!(matches!(
            sub.try_recv(),
            Ok(Some(PlatformEvent::MutationCommitted(_)))
        ));
    }

    #[tokio::test]
    async fn test_bank_resolves_accounts_from_shared_store() {
        let platform = platform();
        let alice_key = SigningKey::from_bytes(&[1u8; 32]);
        let bob_key = SigningKey::from_bytes(&[2u8; 32]);
        let alice = Account::new(
            UserId::new("alice"),
            binding_for_key(&alice_key.verifying_key()),
            dec!(10),
            0,
        );
        let bob = Account::new(
            UserId::new("bob"),
            binding_for_key(&bob_key.verifying_key()),
            dec!(0),
            0,
        );
        platform.accounts.insert_account(alice.clone()).unwrap();
        platform.accounts.insert_account(bob.clone()).unwrap();

        let details = serde_json::json!({
            "type": "transfer",
            "reason": "subsidy",
            "amount": "4",
            "timestamp": NOW,
            "toRecipients": [{ "address": bob.address.address, "portion": "remainder" }],
        })
        .to_string();
        let signature = hex_signature(&alice_key, &details);

        let result = platform
            .bank
            .perform_transaction(&alice, &alice.address.address, &details, &signature, false)
            .await
            .unwrap();
        assert_eq!(result.updated_balance, dec!(6));
        assert_eq!(platform.ledger.len(), 1);
    }

    fn hex_signature(key: &SigningKey, details: &str) -> String {
        key.sign(details.as_bytes())
            .to_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}
