//! Payload application against the state store.
//!
//! Runs while the caller holds the card lock; nothing here locks.

use crate::domain::fractional::{self, Placement};
use crate::domain::path;
use crate::domain::{
    CardProperty, CollectionItem, CollectionKey, MutationError, MutationResult, PropertyKey,
};
use crate::ports::outbound::CardStateStore;
use shared_types::{CardId, Group, MutationPayload, UserId};
use tracing::warn;

/// Structural checks that need no state. Run before taking the lock.
pub fn validate(payload: &MutationPayload) -> MutationResult<()> {
    fn required(field: &str, value: &str) -> MutationResult<()> {
        if value.is_empty() {
            return Err(MutationError::invalid(format!("{field} must not be empty")));
        }
        Ok(())
    }
    fn finite(increment_by: f64) -> MutationResult<()> {
        if !increment_by.is_finite() {
            return Err(MutationError::invalid("incrementBy must be a finite number"));
        }
        Ok(())
    }

    match payload {
        MutationPayload::SetProperty { name, .. } => required("name", name),
        MutationPayload::IncProperty {
            name, increment_by, ..
        } => {
            required("name", name)?;
            finite(*increment_by)
        }
        MutationPayload::AddRecord {
            collection_name,
            key,
            before_key,
            ..
        }
        | MutationPayload::MoveRecord {
            collection_name,
            key,
            before_key,
            ..
        } => {
            required("collectionName", collection_name)?;
            required("key", key)?;
            before_key
                .as_deref()
                .map_or(Ok(()), |before| required("beforeKey", before))
        }
        MutationPayload::UpdateRecord {
            collection_name,
            key,
            ..
        }
        | MutationPayload::DeleteRecord {
            collection_name,
            key,
            ..
        } => {
            required("collectionName", collection_name)?;
            required("key", key)
        }
        MutationPayload::UpdateRecordField {
            collection_name,
            key,
            path,
            ..
        } => {
            required("collectionName", collection_name)?;
            required("key", key)?;
            path::segments(path).map(|_| ())
        }
        MutationPayload::IncRecordField {
            collection_name,
            key,
            path,
            increment_by,
            ..
        } => {
            required("collectionName", collection_name)?;
            required("key", key)?;
            path::segments(path)?;
            finite(*increment_by)
        }
    }
}

/// Applies `payload` as written by `user_id` to `card_id`'s state.
pub async fn apply_payload<S>(
    store: &S,
    card_id: &CardId,
    user_id: &UserId,
    payload: &MutationPayload,
) -> MutationResult<()>
where
    S: CardStateStore + ?Sized,
{
    let scope = payload.group().scope_for(user_id);
    let property_key = |group: Group, name: &str| PropertyKey {
        card_id: card_id.clone(),
        group,
        scope: scope.clone(),
        name: name.to_string(),
    };
    let partition =
        |group: Group, collection: &str| CollectionKey::new(card_id, group, &scope, collection);

    match payload {
        MutationPayload::SetProperty { group, name, value } => {
            if value.is_null() {
                store.delete_property(&property_key(*group, name)).await?;
            } else {
                store
                    .upsert_property(CardProperty {
                        card_id: card_id.clone(),
                        group: *group,
                        user_id: scope.clone(),
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .await?;
            }
        }

        MutationPayload::IncProperty {
            group,
            name,
            increment_by,
        } => {
            let current = store.get_property(&property_key(*group, name)).await?;
            let next = path::numeric(current.as_ref().map(|p| &p.value)) + increment_by;
            store
                .upsert_property(CardProperty {
                    card_id: card_id.clone(),
                    group: *group,
                    user_id: scope.clone(),
                    name: name.clone(),
                    value: path::number(next)?,
                })
                .await?;
        }

        MutationPayload::AddRecord {
            group,
            collection_name,
            key,
            value,
            before_key,
        } => {
            let partition = partition(*group, collection_name);
            if store.get_item(&partition, key).await?.is_some() {
                return Err(MutationError::invalid(format!(
                    "record {key} already exists in {collection_name}"
                )));
            }
            let index = place_in_partition(store, &partition, key, before_key.as_deref()).await?;
            store
                .insert_item(CollectionItem {
                    card_id: card_id.clone(),
                    group: *group,
                    user_id: scope.clone(),
                    collection_name: collection_name.clone(),
                    key: key.clone(),
                    index,
                    value: value.clone(),
                })
                .await?;
        }

        MutationPayload::UpdateRecord {
            group,
            collection_name,
            key,
            value,
        } => {
            let mut item = existing(store, &partition(*group, collection_name), key).await?;
            item.value = value.clone();
            update(store, item).await?;
        }

        MutationPayload::UpdateRecordField {
            group,
            collection_name,
            key,
            path: field,
            value,
        } => {
            let segments = path::segments(field)?;
            let mut item = existing(store, &partition(*group, collection_name), key).await?;
            if value.is_null() {
                path::unset(&mut item.value, &segments);
            } else {
                path::set(&mut item.value, &segments, value.clone());
            }
            update(store, item).await?;
        }

        MutationPayload::IncRecordField {
            group,
            collection_name,
            key,
            path: field,
            increment_by,
        } => {
            let segments = path::segments(field)?;
            let mut item = existing(store, &partition(*group, collection_name), key).await?;
            let next = path::numeric(path::get(&item.value, &segments)) + increment_by;
            path::set(&mut item.value, &segments, path::number(next)?);
            update(store, item).await?;
        }

        MutationPayload::DeleteRecord {
            group,
            collection_name,
            key,
        } => {
            if !store
                .delete_item(&partition(*group, collection_name), key)
                .await?
            {
                return Err(MutationError::record_not_found(collection_name, key));
            }
        }

        MutationPayload::MoveRecord {
            group,
            collection_name,
            key,
            before_key,
        } => {
            let partition = partition(*group, collection_name);
            let mut item = existing(store, &partition, key).await?;
            if before_key.as_deref() == Some(key.as_str()) {
                return Ok(());
            }
            item.index = place_in_partition(store, &partition, key, before_key.as_deref()).await?;
            update(store, item).await?;
        }
    }
    Ok(())
}

async fn existing<S>(store: &S, partition: &CollectionKey, key: &str) -> MutationResult<CollectionItem>
where
    S: CardStateStore + ?Sized,
{
    store
        .get_item(partition, key)
        .await?
        .ok_or_else(|| MutationError::record_not_found(&partition.collection_name, key))
}

async fn update<S>(store: &S, item: CollectionItem) -> MutationResult<()>
where
    S: CardStateStore + ?Sized,
{
    let (collection, key) = (item.collection_name.clone(), item.key.clone());
    if store.update_item(item).await? {
        Ok(())
    } else {
        Err(MutationError::record_not_found(&collection, &key))
    }
}

/// Index for `key` placed before `before_key`, or appended when `None`.
///
/// The item's own current position is ignored, so the same routine serves
/// insertion and moves. Renumbers the partition once if the gap is gone.
async fn place_in_partition<S>(
    store: &S,
    partition: &CollectionKey,
    key: &str,
    before_key: Option<&str>,
) -> MutationResult<f64>
where
    S: CardStateStore + ?Sized,
{
    for renumbered in [false, true] {
        let siblings: Vec<CollectionItem> = store
            .list_items(partition)
            .await?
            .into_iter()
            .filter(|item| item.key != key)
            .collect();

        let position = match before_key {
            None => None,
            Some(before) => Some(
                siblings
                    .iter()
                    .position(|item| item.key == before)
                    .ok_or_else(|| {
                        MutationError::record_not_found(&partition.collection_name, before)
                    })?,
            ),
        };

        let indices: Vec<f64> = siblings.iter().map(|item| item.index).collect();
        match fractional::place(&indices, position) {
            Placement::Index(index) => return Ok(index),
            Placement::Exhausted if !renumbered => {
                warn!(
                    card_id = %partition.card_id,
                    collection = %partition.collection_name,
                    items = siblings.len(),
                    "[cx-02] Fractional index precision exhausted, renumbering collection"
                );
                store.renumber_partition(partition).await?;
            }
            Placement::Exhausted => break,
        }
    }
    Err(MutationError::invalid(format!(
        "no free index in collection {}",
        partition.collection_name
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCardStateStore;
    use serde_json::{json, Value};

    fn card() -> CardId {
        CardId::new("c1")
    }

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn add(key: &str, before: Option<&str>) -> MutationPayload {
        MutationPayload::AddRecord {
            group: Group::Shared,
            collection_name: "list".into(),
            key: key.into(),
            value: json!({ "name": key }),
            before_key: before.map(String::from),
        }
    }

    async fn keys(store: &InMemoryCardStateStore) -> Vec<String> {
        let partition = CollectionKey::new(&card(), Group::Shared, &UserId::shared_scope(), "list");
        store
            .list_items(&partition)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.key)
            .collect()
    }

    async fn apply(store: &InMemoryCardStateStore, payload: MutationPayload) -> MutationResult<()> {
        validate(&payload)?;
        apply_payload(store, &card(), &alice(), &payload).await
    }

    async fn property(store: &InMemoryCardStateStore, group: Group, name: &str) -> Option<Value> {
        let key = PropertyKey {
            card_id: card(),
            group,
            scope: group.scope_for(&alice()),
            name: name.into(),
        };
        store.get_property(&key).await.unwrap().map(|p| p.value)
    }

    #[tokio::test]
    async fn test_set_property_and_null_deletes() {
        let store = InMemoryCardStateStore::new();
        let set = |value: Value| MutationPayload::SetProperty {
            group: Group::Shared,
            name: "title".into(),
            value,
        };

        apply(&store, set(json!("Hello"))).await.unwrap();
        assert_eq!(property(&store, Group::Shared, "title").await, Some(json!("Hello")));

        apply(&store, set(Value::Null)).await.unwrap();
        assert_eq!(property(&store, Group::Shared, "title").await, None);
    }

    #[tokio::test]
    async fn test_inc_property_defaults_to_zero() {
        let store = InMemoryCardStateStore::new();
        let inc = |by: f64| MutationPayload::IncProperty {
            group: Group::User,
            name: "opens".into(),
            increment_by: by,
        };

        apply(&store, inc(1.0)).await.unwrap();
        apply(&store, inc(2.0)).await.unwrap();
        assert_eq!(property(&store, Group::User, "opens").await, Some(json!(3)));

        // Non-numeric values restart from zero.
        apply(
            &store,
            MutationPayload::SetProperty {
                group: Group::User,
                name: "opens".into(),
                value: json!("many"),
            },
        )
        .await
        .unwrap();
        apply(&store, inc(0.5)).await.unwrap();
        assert_eq!(property(&store, Group::User, "opens").await, Some(json!(0.5)));

        // The user overlay does not leak into shared state.
        assert_eq!(property(&store, Group::Shared, "opens").await, None);
    }

    #[tokio::test]
    async fn test_add_record_ordering() {
        let store = InMemoryCardStateStore::new();
        apply(&store, add("a", None)).await.unwrap();
        apply(&store, add("c", None)).await.unwrap();
        apply(&store, add("b", Some("c"))).await.unwrap();
        apply(&store, add("first", Some("a"))).await.unwrap();

        assert_eq!(keys(&store).await, vec!["first", "a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_add_record_errors() {
        let store = InMemoryCardStateStore::new();
        apply(&store, add("a", None)).await.unwrap();

        let dup = apply(&store, add("a", None)).await.unwrap_err();
        assert!(matches!(dup, MutationError::InvalidMutation(_)));

        let missing = apply(&store, add("b", Some("ghost"))).await.unwrap_err();
        assert_eq!(missing, MutationError::record_not_found("list", "ghost"));
    }

    #[tokio::test]
    async fn test_record_field_updates() {
        let store = InMemoryCardStateStore::new();
        apply(&store, add("a", None)).await.unwrap();

        apply(
            &store,
            MutationPayload::IncRecordField {
                group: Group::Shared,
                collection_name: "list".into(),
                key: "a".into(),
                path: "stats.views".into(),
                increment_by: 2.0,
            },
        )
        .await
        .unwrap();
        apply(
            &store,
            MutationPayload::UpdateRecordField {
                group: Group::Shared,
                collection_name: "list".into(),
                key: "a".into(),
                path: "name".into(),
                value: Value::Null,
            },
        )
        .await
        .unwrap();

        let partition = CollectionKey::new(&card(), Group::Shared, &UserId::shared_scope(), "list");
        let item = store.get_item(&partition, "a").await.unwrap().unwrap();
        assert_eq!(item.value, json!({ "stats": { "views": 2 } }));
        assert_eq!(item.index, 1.0);
    }

    #[tokio::test]
    async fn test_missing_record_not_found() {
        let store = InMemoryCardStateStore::new();
        let cases = vec![
            MutationPayload::UpdateRecord {
                group: Group::Shared,
                collection_name: "list".into(),
                key: "x".into(),
                value: json!(1),
            },
            MutationPayload::IncRecordField {
                group: Group::Shared,
                collection_name: "list".into(),
                key: "x".into(),
                path: "n".into(),
                increment_by: 1.0,
            },
            MutationPayload::DeleteRecord {
                group: Group::Shared,
                collection_name: "list".into(),
                key: "x".into(),
            },
            MutationPayload::MoveRecord {
                group: Group::Shared,
                collection_name: "list".into(),
                key: "x".into(),
                before_key: None,
            },
        ];
        for payload in cases {
            let kind = payload.kind();
            let err = apply(&store, payload).await.unwrap_err();
            assert_eq!(err.kind(), shared_types::ErrorKind::NotFound, "{kind}");
        }
    }

    #[tokio::test]
    async fn test_move_record() {
        let store = InMemoryCardStateStore::new();
        for key in ["a", "b", "c"] {
            apply(&store, add(key, None)).await.unwrap();
        }
        let mv = |key: &str, before: Option<&str>| MutationPayload::MoveRecord {
            group: Group::Shared,
            collection_name: "list".into(),
            key: key.into(),
            before_key: before.map(String::from),
        };

        apply(&store, mv("c", Some("a"))).await.unwrap();
        assert_eq!(keys(&store).await, vec!["c", "a", "b"]);

        apply(&store, mv("c", None)).await.unwrap();
        assert_eq!(keys(&store).await, vec!["a", "b", "c"]);

        // Moving before itself leaves the order alone.
        apply(&store, mv("b", Some("b"))).await.unwrap();
        assert_eq!(keys(&store).await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_exhausted_gap_renumbers() {
        let store = InMemoryCardStateStore::new();
        apply(&store, add("tail", None)).await.unwrap();
        apply(&store, add("head", Some("tail"))).await.unwrap();

        // Keep inserting right before "tail" until the gap is gone many times over.
        let mut expected = vec!["head".to_string()];
        for i in 0..120 {
            let key = format!("k{i}");
            apply(&store, add(&key, Some("tail"))).await.unwrap();
            expected.push(key);
        }
        expected.push("tail".into());

        assert_eq!(keys(&store).await, expected);
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        assert!(validate(&MutationPayload::IncProperty {
            group: Group::Shared,
            name: "n".into(),
            increment_by: f64::INFINITY,
        })
        .is_err());
        assert!(validate(&MutationPayload::UpdateRecordField {
            group: Group::Shared,
            collection_name: "list".into(),
            key: "a".into(),
            path: "a..b".into(),
            value: json!(1),
        })
        .is_err());
        assert!(validate(&add("", None)).is_err());
        assert!(validate(&add("a", Some(""))).is_err());
        assert!(validate(&add("a", Some("b"))).is_ok());
    }
}
