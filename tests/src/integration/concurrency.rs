//! # Concurrency
//!
//! Several workers sharing one set of stores, the deployment shape the
//! advisory card lock exists for.
//!
//! - Card writes from different workers serialize: no lost increments,
//!   one sequence number per commit, `at` strictly increasing per scope.
//! - A held lock blocks other workers until release or expiry.
//! - Concurrent transfers never create or destroy value.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rust_decimal_macros::dec;
    use serde_json::json;

    use cx_01_card_lock::{
        CardDirectory, CardDirectoryApi, CardLockApi, CardLockManager, CardStore,
        InMemoryCardStore, LockConfig, LockError, LockHolder,
    };
    use cx_02_card_mutation::{
        CardMutationApi, CardMutationEngine, InMemoryCardStateStore, MutationConfig,
    };
    use cx_03_value_ledger::{BankApi, LedgerError};
    use shared_types::{ErrorKind, Group, MockTimeSource, MutationPayload, UserId};

    use crate::integration::fixtures::{
        contended_lock_config, platform, register, remainder, transfer_json, NOW,
    };

    type Engine = CardMutationEngine<CardLockManager<InMemoryCardStore>, InMemoryCardStateStore>;

    /// `n` workers over shared card and state stores, one frozen clock.
    fn cluster(n: usize, time: Arc<MockTimeSource>) -> (Arc<InMemoryCardStore>, Vec<Arc<Engine>>) {
        let cards = Arc::new(InMemoryCardStore::new());
        let state = Arc::new(InMemoryCardStateStore::new());
        let workers = (0..n)
            .map(|i| {
                let locks = Arc::new(CardLockManager::with_time_source(
                    cards.clone(),
                    contended_lock_config(),
                    time.clone(),
                ));
                let config = MutationConfig {
                    server_id: format!("worker-{i}"),
                    ..MutationConfig::default()
                };
                Arc::new(CardMutationEngine::with_time_source(
                    locks,
                    state.clone(),
                    config,
                    time.clone(),
                ))
            })
            .collect();
        (cards, workers)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_workers_serialize_card_writes() {
        let time = Arc::new(MockTimeSource::new(NOW));
        let (cards, workers) = cluster(3, time.clone());
        let directory = CardDirectory::new(
            Arc::new(CardLockManager::with_time_source(
                cards.clone(),
                LockConfig::default(),
                time.clone(),
            )),
            time.clone(),
            "worker-admin",
        );
        let card = directory.post_card(&UserId::new("author")).await.unwrap();

        let tasks = (0..30).map(|i| {
            let engine = workers[i % workers.len()].clone();
            let card_id = card.id.clone();
            tokio::spawn(async move {
                engine
                    .apply_mutation(
                        &card_id,
                        &UserId::new(format!("user-{i}")),
                        MutationPayload::IncProperty {
                            group: Group::Shared,
                            name: "likes".into(),
                            increment_by: 1.0,
                        },
                    )
                    .await
            })
        });
        for result in join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let state = workers[0]
            .populate_card_state(&card.id, true, None)
            .await
            .unwrap();
        assert_eq!(state.shared.properties.unwrap()["likes"], json!(30));

        let log = workers[1]
            .find_card_mutations_after_index(&card.id, 0, 100)
            .await
            .unwrap();
        let indexes: Vec<u64> = log.iter().map(|r| r.index).collect();
        assert_eq!(indexes, (1..=30).collect::<Vec<_>>());
        // Frozen clock: every commit still gets a later `at` than the one before.
        assert!(log.windows(2).all(|w| w[0].at < w[1].at));
        assert_eq!(log[0].at, NOW);

        // Lock is free again.
        assert!(cards
            .find_card(&card.id)
            .await
            .unwrap()
            .unwrap()
            .lock
            .is_unlocked());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_collection_inserts_stay_ordered_and_unique() {
        let time = Arc::new(MockTimeSource::new(NOW));
        let (cards, workers) = cluster(2, time.clone());
        let directory = CardDirectory::new(
            Arc::new(CardLockManager::with_time_source(
                cards.clone(),
                LockConfig::default(),
                time.clone(),
            )),
            time,
            "worker-admin",
        );
        let card = directory.post_card(&UserId::new("author")).await.unwrap();

        workers[0]
            .apply_mutation(
                &card.id,
                &UserId::new("author"),
                MutationPayload::AddRecord {
                    group: Group::Shared,
                    collection_name: "steps".into(),
                    key: "anchor".into(),
                    value: json!({}),
                    before_key: None,
                },
            )
            .await
            .unwrap();

        let tasks = (0..40).map(|i| {
            let engine = workers[i % 2].clone();
            let card_id = card.id.clone();
            tokio::spawn(async move {
                engine
                    .apply_mutation(
                        &card_id,
                        &UserId::new("author"),
                        MutationPayload::AddRecord {
                            group: Group::Shared,
                            collection_name: "steps".into(),
                            key: format!("s{i}"),
                            value: json!({ "n": i }),
                            before_key: Some("anchor".into()),
                        },
                    )
                    .await
            })
        });
        for result in join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let state = workers[1]
            .populate_card_state(&card.id, true, None)
            .await
            .unwrap();
        let steps = &state.shared.collections.unwrap()["steps"];
        assert_eq!(steps.len(), 41);
        assert_eq!(steps.last().unwrap().key, "anchor");
        assert!(steps.windows(2).all(|w| w[0].index < w[1].index));
    }

    #[tokio::test]
    async fn test_held_lock_blocks_other_worker_until_release() {
        let time = Arc::new(MockTimeSource::new(NOW));
        let cards = Arc::new(InMemoryCardStore::new());
        let impatient = LockConfig {
            timeout_ms: 30_000,
            retry_interval: Duration::from_millis(1),
            max_attempts: 5,
        };
        let admin = Arc::new(CardLockManager::with_time_source(
            cards.clone(),
            LockConfig::default(),
            time.clone(),
        ));
        let directory = CardDirectory::new(admin, time.clone(), "worker-admin");
        let card = directory.post_card(&UserId::new("author")).await.unwrap();

        let worker_a =
            CardLockManager::with_time_source(cards.clone(), impatient.clone(), time.clone());
        let worker_b = CardLockManager::with_time_source(cards.clone(), impatient, time.clone());

        let holder_a = LockHolder::for_operation("worker-a");
        let holder_b = LockHolder::for_operation("worker-b");
        let held = worker_a.acquire(&card.id, 30_000, &holder_a).await.unwrap();

        let err = worker_b.acquire(&card.id, 30_000, &holder_b).await.unwrap_err();
        assert!(matches!(err, LockError::Timeout { attempts: 5, .. }));
        assert_eq!(err.kind(), ErrorKind::LockTimeout);

        worker_a.release(&held).await.unwrap();
        let taken = worker_b.acquire(&card.id, 30_000, &holder_b).await.unwrap();
        assert!(taken.lock.is_held_by(&holder_b.id()));
        worker_b.release(&taken).await.unwrap();
    }

    #[tokio::test]
    async fn test_crashed_holder_is_broken_after_timeout() {
        let time = Arc::new(MockTimeSource::new(NOW));
        let cards = Arc::new(InMemoryCardStore::new());
        let locks = Arc::new(CardLockManager::with_time_source(
            cards.clone(),
            LockConfig::for_testing(),
            time.clone(),
        ));
        let directory = CardDirectory::new(locks.clone(), time.clone(), "worker-a");
        let card = directory.post_card(&UserId::new("author")).await.unwrap();

        // Worker A takes the lock and never releases it.
        locks
            .acquire(&card.id, 1_000, &LockHolder::for_operation("worker-a"))
            .await
            .unwrap();

        time.advance(1_001);
        let holder_b = LockHolder::for_operation("worker-b");
        let taken = locks.acquire(&card.id, 1_000, &holder_b).await.unwrap();
        assert!(taken.lock.is_held_by(&holder_b.id()));
        assert_eq!(taken.lock.acquired_at, NOW + 1_001);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_conserve_value() {
        let (platform, _) = platform("worker-a");
        let platform = Arc::new(platform);
        let members: Arc<Vec<_>> = Arc::new(
            (0..5u8)
                .map(|i| register(&platform, &format!("member-{i}"), i + 1, dec!(100)))
                .collect(),
        );
        let total = platform.accounts.total_balance();

        let mut rng = StdRng::seed_from_u64(7);
        let plans: Vec<(usize, usize, usize, u32)> = (0..60)
            .map(|_| {
                let from = rng.gen_range(0..5);
                let a = (from + rng.gen_range(1..5)) % 5;
                let mut b = (from + rng.gen_range(1..5)) % 5;
                if b == a {
                    b = from;
                }
                (from, a, b, rng.gen_range(1..=60))
            })
            .collect();

        let tasks = plans.into_iter().map(|(from, a, b, amount)| {
            let platform = platform.clone();
            let members = members.clone();
            tokio::spawn(async move {
                let sender = &members[from];
                let mut recipients = vec![remainder(&members[a])];
                if b != from {
                    recipients.push(remainder(&members[b]));
                }
                let details = transfer_json("grant", &amount.to_string(), None, recipients);
                platform
                    .bank
                    .perform_transaction(
                        &sender.account,
                        &sender.address(),
                        &details,
                        &sender.sign(&details),
                        false,
                    )
                    .await
            })
        });

        let mut committed = 0;
        for result in join_all(tasks).await {
            match result.unwrap() {
                Ok(_) => committed += 1,
                Err(LedgerError::InsufficientFunds { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert!(committed > 0);
        assert_eq!(platform.accounts.total_balance(), total);
        assert_eq!(platform.ledger.len(), committed);
    }
}
