//! # Integration Test Flows
//!
//! End-to-end paths through one worker:
//!
//! 1. **Post → mutate → sync**: a client builds card state, then catches up
//!    incrementally from the mutation log.
//! 2. **Paid card open**: the bank splits a reader's payment between the
//!    platform and the author, and the open is recorded on the card.
//! 3. **Soft delete**: a deleted card rejects reads and writes.
//! 4. **Fan-out**: every committed change reaches the bus after commit.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    use cx_01_card_lock::CardDirectoryApi;
    use cx_02_card_mutation::CardMutationApi;
    use cx_03_value_ledger::{AccountStore, BankApi, LedgerError};
    use shared_bus::{EventFilter, EventTopic, PlatformEvent};
    use shared_types::{ErrorKind, Group, MutationPayload, UserId};
    use worker_runtime::{Platform, PlatformConfig, WorkerRuntime};

    use crate::integration::fixtures::{
        absolute, fraction, platform, register, remainder, transfer_json, Member, NOW,
    };

    async fn balance(platform: &Platform, member: &Member) -> Decimal {
        platform
            .accounts
            .find_account(member.id())
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    fn add_comment(key: &str, text: &str, before: Option<&str>) -> MutationPayload {
        MutationPayload::AddRecord {
            group: Group::Shared,
            collection_name: "comments".into(),
            key: key.into(),
            value: json!({ "text": text, "likes": 0 }),
            before_key: before.map(Into::into),
        }
    }

    // =========================================================================
    // POST → MUTATE → SYNC
    // =========================================================================

    #[tokio::test]
    async fn test_card_state_and_incremental_sync() {
        let (platform, time) = platform("worker-a");
        let author = UserId::new("author");
        let reader = UserId::new("reader");
        let card = platform.cards.post_card(&author).await.unwrap();

        let engine = &platform.mutations;
        engine
            .apply_mutation(
                &card.id,
                &author,
                MutationPayload::SetProperty {
                    group: Group::Shared,
                    name: "title".into(),
                    value: json!("Tide tables"),
                },
            )
            .await
            .unwrap();
        engine
            .apply_mutation(&card.id, &reader, add_comment("c1", "first", None))
            .await
            .unwrap();
        engine
            .apply_mutation(&card.id, &author, add_comment("c0", "pinned", Some("c1")))
            .await
            .unwrap();
        let checkpoint = engine
            .apply_mutation_json(
                &card.id,
                &reader,
                &json!({
                    "type": "set-property",
                    "group": "user",
                    "name": "bookmarked",
                    "value": true
                }),
            )
            .await
            .unwrap();

        // Full snapshot for the reader.
        let state = engine
            .populate_card_state(&card.id, true, Some(&reader))
            .await
            .unwrap();
        let shared_props = state.shared.properties.as_ref().unwrap();
        assert_eq!(shared_props["title"], json!("Tide tables"));
        let comments = &state.shared.collections.as_ref().unwrap()["comments"];
        let keys: Vec<&str> = comments.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["c0", "c1"]);

        let user_state = state.user.unwrap();
        assert_eq!(user_state.mutation_id.as_deref(), Some(checkpoint.mutation_id.as_str()));
        assert_eq!(user_state.properties.unwrap()["bookmarked"], json!(true));

        // Someone else's user group is invisible to the reader.
        let author_view = engine
            .populate_card_state(&card.id, true, Some(&author))
            .await
            .unwrap();
        assert!(author_view.user.unwrap().properties.unwrap().is_empty());

        // The client caught up to the checkpoint; more edits arrive later.
        time.advance(5);
        engine
            .apply_mutation(
                &card.id,
                &reader,
                MutationPayload::IncRecordField {
                    group: Group::Shared,
                    collection_name: "comments".into(),
                    key: "c0".into(),
                    path: "likes".into(),
                    increment_by: 1.0,
                },
            )
            .await
            .unwrap();
        engine
            .apply_mutation(
                &card.id,
                &author,
                MutationPayload::DeleteRecord {
                    group: Group::Shared,
                    collection_name: "comments".into(),
                    key: "c1".into(),
                },
            )
            .await
            .unwrap();

        let missed = engine
            .find_card_mutations_after_index(&card.id, checkpoint.index, 100)
            .await
            .unwrap();
        assert_eq!(missed.len(), 2);
        assert!(missed.iter().all(|r| r.index > checkpoint.index));
        assert!(missed.windows(2).all(|w| w[0].index < w[1].index));
        assert!(missed.iter().all(|r| r.at >= NOW + 5));

        let everything = engine.find_mutations_after_index(0).await.unwrap();
        assert_eq!(everything.len(), 6);
        let indexes: Vec<u64> = everything.iter().map(|r| r.index).collect();
        assert_eq!(indexes, (1..=6).collect::<Vec<_>>());

        let after = engine
            .populate_card_state(&card.id, true, None)
            .await
            .unwrap();
        let comments = &after.shared.collections.unwrap()["comments"];
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].value["likes"], json!(1));
        assert!(after.user.is_none());
    }

    #[tokio::test]
    async fn test_sync_is_scoped_per_card() {
        let (platform, _) = platform("worker-a");
        let author = UserId::new("author");
        let first = platform.cards.post_card(&author).await.unwrap();
        let second = platform.cards.post_card(&author).await.unwrap();

        for card in [&first, &second, &first] {
            platform
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
        }

        let first_log = platform
            .mutations
            .find_card_mutations_after_index(&first.id, 0, 10)
            .await
            .unwrap();
        let indexes: Vec<u64> = first_log.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![1, 3]);

        let page = platform
            .mutations
            .find_card_mutations_after_index(&first.id, 0, 1)
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    // =========================================================================
    // PAID CARD OPEN
    // =========================================================================

    #[tokio::test]
    async fn test_paid_card_open_splits_and_records() {
        let (platform, _) = platform("worker-a");
        let house = register(&platform, "house", 1, dec!(0));
        let author = register(&platform, "author", 2, dec!(0));
        let reader = register(&platform, "reader", 3, dec!(25));
        let card = platform.cards.post_card(author.id()).await.unwrap();

        let details = transfer_json(
            "card-open",
            "10",
            Some(card.id.as_str()),
            vec![fraction(&house, "0.1"), remainder(&author)],
        );
        let paid = platform
            .bank
            .perform_transaction(
                &reader.account,
                &reader.address(),
                &details,
                &reader.sign(&details),
                false,
            )
            .await
            .unwrap();
        assert_eq!(paid.updated_balance, dec!(15));
        assert_eq!(
            paid.record.details.related_card_id.as_ref(),
            Some(&card.id)
        );

        platform
            .mutations
            .apply_mutation(
                &card.id,
                reader.id(),
                MutationPayload::IncProperty {
                    group: Group::Shared,
                    name: "opens".into(),
                    increment_by: 1.0,
                },
            )
            .await
            .unwrap();

        assert_eq!(balance(&platform, &house).await, dec!(1));
        assert_eq!(balance(&platform, &author).await, dec!(9));
        assert_eq!(balance(&platform, &reader).await, dec!(15));
        assert_eq!(platform.accounts.total_balance(), dec!(25));

        let author_history = platform
            .bank
            .transactions_for_user(author.id(), 10)
            .await
            .unwrap();
        assert_eq!(author_history, vec![paid.record]);
    }

    #[tokio::test]
    async fn test_card_reasons_require_card_and_exact_split() {
        let (platform, _) = platform("worker-a");
        let author = register(&platform, "author", 2, dec!(0));
        let reader = register(&platform, "reader", 3, dec!(25));

        let no_card = transfer_json("card-open", "10", None, vec![remainder(&author)]);
        let err = platform
            .bank
            .perform_transaction(
                &reader.account,
                &reader.address(),
                &no_card,
                &reader.sign(&no_card),
                false,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let short = transfer_json("grant", "10", None, vec![absolute(&author, "7")]);
        let err = platform
            .bank
            .perform_transaction(
                &reader.account,
                &reader.address(),
                &short,
                &reader.sign(&short),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AmountsDoNotAddUp { .. }));
        assert_eq!(platform.accounts.total_balance(), dec!(25));
        assert!(platform.ledger.is_empty());
    }

    // =========================================================================
    // SOFT DELETE
    // =========================================================================

    #[tokio::test]
    async fn test_deleted_card_rejects_reads_and_writes() {
        let (platform, _) = platform("worker-a");
        let author = UserId::new("author");
        let card = platform.cards.post_card(&author).await.unwrap();

        let err = platform
            .cards
            .delete_card(&card.id, &UserId::new("stranger"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        platform.cards.delete_card(&card.id, &author).await.unwrap();

        let err = platform
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
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = platform
            .mutations
            .populate_card_state(&card.id, true, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(
            platform.cards.find_card(&card.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        // The record itself persists.
        assert_eq!(platform.card_store.len(), 1);
    }

    // =========================================================================
    // FAN-OUT
    // =========================================================================

    #[tokio::test]
    async fn test_events_follow_commit_order() {
        let (platform, _) = platform("worker-a");
        let mut stream = platform.event_bus.event_stream(EventFilter::topics(vec![
            EventTopic::Cards,
            EventTopic::Mutations,
        ]));
        let author = UserId::new("author");

        let card = platform.cards.post_card(&author).await.unwrap();
        let record = platform
            .mutations
            .apply_mutation(&card.id, &author, add_comment("c1", "hello", None))
            .await
            .unwrap();
        platform.cards.delete_card(&card.id, &author).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let event = timeout(Duration::from_millis(100), stream.next())
                .await
                .expect("timeout")
                .expect("event");
            seen.push(event);
        }

        assert!(matches!(&seen[0], PlatformEvent::CardPosted(c) if c.id == card.id));
        assert!(matches!(&seen[1], PlatformEvent::MutationCommitted(r) if *r == record));
        assert!(matches!(&seen[2], PlatformEvent::CardDeleted { card_id } if *card_id == card.id));
    }

    #[tokio::test]
    async fn test_runtime_logger_sees_every_commit() {
        let mut runtime =
            WorkerRuntime::new(PlatformConfig::with_server_id("worker-rt")).unwrap();
        runtime.start();
        let platform = runtime.platform();

        let author = UserId::new("author");
        let card = platform.cards.post_card(&author).await.unwrap();
        for i in 0..3 {
            platform
                .mutations
                .apply_mutation(
                    &card.id,
                    &author,
                    MutationPayload::SetProperty {
                        group: Group::Shared,
                        name: format!("p{i}"),
                        value: json!(i),
                    },
                )
                .await
                .unwrap();
        }

        assert_eq!(runtime.shutdown().await, 4);
    }
}
