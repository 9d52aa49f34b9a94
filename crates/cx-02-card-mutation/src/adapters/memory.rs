//! In-memory card state store.
//!
//! Single-record operations run under one write guard; the sequence
//! counter is a standalone atomic, matching a store-side fetch-and-add.

use crate::domain::{CardProperty, CollectionItem, CollectionKey, PropertyKey};
use crate::ports::outbound::CardStateStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{CardId, Group, MutationRecord, StoreError, Timestamp, UserId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

type ScopeKey = (CardId, Group, UserId);

#[derive(Default)]
struct Tables {
    properties: HashMap<PropertyKey, CardProperty>,
    partitions: BTreeMap<CollectionKey, HashMap<String, CollectionItem>>,
    mutations: BTreeMap<u64, MutationRecord>,
    /// `(at, index)` of the latest record per scope.
    last_by_scope: HashMap<ScopeKey, (Timestamp, u64)>,
}

/// In-memory implementation of [`CardStateStore`].
#[derive(Default)]
pub struct InMemoryCardStateStore {
    tables: RwLock<Tables>,
    sequence: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryCardStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn mutation_count(&self) -> usize {
        self.tables.read().mutations.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("card state store offline".into()));
        }
        Ok(())
    }
}

fn sorted_by_index(items: impl Iterator<Item = CollectionItem>) -> Vec<CollectionItem> {
    let mut items: Vec<CollectionItem> = items.collect();
    items.sort_by(|a, b| a.index.total_cmp(&b.index));
    items
}

fn index_taken(siblings: &HashMap<String, CollectionItem>, key: &str, index: f64) -> bool {
    siblings
        .values()
        .any(|other| other.key != key && other.index == index)
}

#[async_trait]
impl CardStateStore for InMemoryCardStateStore {
    async fn get_property(&self, key: &PropertyKey) -> Result<Option<CardProperty>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().properties.get(key).cloned())
    }

    async fn upsert_property(&self, property: CardProperty) -> Result<(), StoreError> {
        self.check_available()?;
        self.tables
            .write()
            .properties
            .insert(property.key(), property);
        Ok(())
    }

    async fn delete_property(&self, key: &PropertyKey) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.tables.write().properties.remove(key).is_some())
    }

    async fn list_properties(
        &self,
        card_id: &CardId,
        group: Group,
        scope: &UserId,
    ) -> Result<Vec<CardProperty>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read();
        let mut properties: Vec<CardProperty> = tables
            .properties
            .values()
            .filter(|p| p.card_id == *card_id && p.group == group && p.user_id == *scope)
            .cloned()
            .collect();
        properties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(properties)
    }

    async fn get_item(
        &self,
        partition: &CollectionKey,
        key: &str,
    ) -> Result<Option<CollectionItem>, StoreError> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .partitions
            .get(partition)
            .and_then(|items| items.get(key))
            .cloned())
    }

    async fn list_items(&self, partition: &CollectionKey) -> Result<Vec<CollectionItem>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read();
        Ok(tables
            .partitions
            .get(partition)
            .map(|items| sorted_by_index(items.values().cloned()))
            .unwrap_or_default())
    }

    async fn list_namespace_items(
        &self,
        card_id: &CardId,
        group: Group,
        scope: &UserId,
    ) -> Result<Vec<CollectionItem>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read();
        Ok(tables
            .partitions
            .iter()
            .filter(|(k, _)| k.card_id == *card_id && k.group == group && k.scope == *scope)
            .flat_map(|(_, items)| sorted_by_index(items.values().cloned()))
            .collect())
    }

    async fn insert_item(&self, item: CollectionItem) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write();
        let siblings = tables.partitions.entry(item.partition()).or_default();
        if siblings.contains_key(&item.key) {
            return Err(StoreError::Conflict(format!(
                "item {} in {}",
                item.key, item.collection_name
            )));
        }
        if index_taken(siblings, &item.key, item.index) {
            return Err(StoreError::Conflict(format!(
                "index {} in {}",
                item.index, item.collection_name
            )));
        }
        siblings.insert(item.key.clone(), item);
        Ok(())
    }

    async fn update_item(&self, item: CollectionItem) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write();
        let Some(siblings) = tables.partitions.get_mut(&item.partition()) else {
            return Ok(false);
        };
        if !siblings.contains_key(&item.key) {
            return Ok(false);
        }
        if index_taken(siblings, &item.key, item.index) {
            return Err(StoreError::Conflict(format!(
                "index {} in {}",
                item.index, item.collection_name
            )));
        }
        siblings.insert(item.key.clone(), item);
        Ok(true)
    }

    async fn delete_item(&self, partition: &CollectionKey, key: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write();
        let Some(siblings) = tables.partitions.get_mut(partition) else {
            return Ok(false);
        };
        let removed = siblings.remove(key).is_some();
        if siblings.is_empty() {
            tables.partitions.remove(partition);
        }
        Ok(removed)
    }

    async fn renumber_partition(
        &self,
        partition: &CollectionKey,
    ) -> Result<Vec<CollectionItem>, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write();
        let Some(siblings) = tables.partitions.get_mut(partition) else {
            return Ok(Vec::new());
        };
        let ordered = sorted_by_index(siblings.values().cloned());
        let renumbered: Vec<CollectionItem> = ordered
            .into_iter()
            .zip(crate::domain::fractional::renumbered(siblings.len()))
            .map(|(item, index)| CollectionItem { index, ..item })
            .collect();
        for item in &renumbered {
            siblings.insert(item.key.clone(), item.clone());
        }
        Ok(renumbered)
    }

    async fn next_sequence(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn insert_mutation(&self, record: MutationRecord) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write();
        if tables.mutations.contains_key(&record.index) {
            return Err(StoreError::Conflict(format!("mutation index {}", record.index)));
        }
        let scope = (record.card_id.clone(), record.group, record.scope());
        let latest = tables.last_by_scope.entry(scope).or_insert((0, 0));
        if record.at >= latest.0 {
            *latest = (record.at, record.index);
        }
        tables.mutations.insert(record.index, record);
        Ok(())
    }

    async fn find_last_mutation(
        &self,
        card_id: &CardId,
        group: Group,
        scope: &UserId,
    ) -> Result<Option<MutationRecord>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read();
        let key = (card_id.clone(), group, scope.clone());
        Ok(tables
            .last_by_scope
            .get(&key)
            .and_then(|(_, index)| tables.mutations.get(index))
            .cloned())
    }

    async fn find_mutations_after(
        &self,
        after: u64,
        card_id: Option<&CardId>,
        limit: usize,
    ) -> Result<Vec<MutationRecord>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read();
        Ok(tables
            .mutations
            .range(after.saturating_add(1)..)
            .map(|(_, record)| record)
            .filter(|record| card_id.map_or(true, |id| record.card_id == *id))
            .take(limit)
            .cloned()
            .collect())
    }
}
