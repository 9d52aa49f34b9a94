//! Card state records and the read-side snapshot.
//!
//! Every record is addressed by a compound key
//! `(card, group, scope user, name | collection [, key])`. The scope user is
//! the acting user for `Group::User` and empty for `Group::Shared`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{CardId, Group, UserId};
use std::collections::BTreeMap;

/// Unique key of a card property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    pub card_id: CardId,
    pub group: Group,
    pub scope: UserId,
    pub name: String,
}

/// One collection partition: the unit within which item indices are unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionKey {
    pub card_id: CardId,
    pub group: Group,
    pub scope: UserId,
    pub collection_name: String,
}

impl CollectionKey {
    pub fn new(card_id: &CardId, group: Group, scope: &UserId, collection_name: &str) -> Self {
        Self {
            card_id: card_id.clone(),
            group,
            scope: scope.clone(),
            collection_name: collection_name.to_string(),
        }
    }
}

/// A single scalar piece of card state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProperty {
    pub card_id: CardId,
    pub group: Group,
    pub user_id: UserId,
    pub name: String,
    pub value: Value,
}

impl CardProperty {
    pub fn key(&self) -> PropertyKey {
        PropertyKey {
            card_id: self.card_id.clone(),
            group: self.group,
            scope: self.user_id.clone(),
            name: self.name.clone(),
        }
    }
}

/// An ordered item in a card collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    pub card_id: CardId,
    pub group: Group,
    pub user_id: UserId,
    pub collection_name: String,
    pub key: String,
    pub index: f64,
    pub value: Value,
}

impl CollectionItem {
    pub fn partition(&self) -> CollectionKey {
        CollectionKey::new(&self.card_id, self.group, &self.user_id, &self.collection_name)
    }
}

/// An item as returned in a state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub key: String,
    pub index: f64,
    pub value: Value,
}

impl From<CollectionItem> for CollectionEntry {
    fn from(item: CollectionItem) -> Self {
        Self {
            key: item.key,
            index: item.index,
            value: item.value,
        }
    }
}

/// State of one namespace of a card.
///
/// `properties` and `collections` are only filled when the caller asked for
/// the initial snapshot; incremental clients only need `mutation_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupState {
    pub mutation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<BTreeMap<String, Vec<CollectionEntry>>>,
}

impl GroupState {
    /// Builds a full snapshot from stored records. Items must arrive sorted
    /// by index within each collection.
    pub fn with_initial(
        mutation_id: Option<String>,
        properties: Vec<CardProperty>,
        items: Vec<CollectionItem>,
    ) -> Self {
        let properties = properties.into_iter().map(|p| (p.name, p.value)).collect();
        let mut collections: BTreeMap<String, Vec<CollectionEntry>> = BTreeMap::new();
        for item in items {
            collections
                .entry(item.collection_name.clone())
                .or_default()
                .push(item.into());
        }
        Self {
            mutation_id,
            properties: Some(properties),
            collections: Some(collections),
        }
    }
}

/// Result of `populate_card_state`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardStateSnapshot {
    /// Present only when a user was given.
    pub user: Option<GroupState>,
    pub shared: GroupState,
}
