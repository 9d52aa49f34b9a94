//! # Mutation Records
//!
//! The replayable log entry format shared by the mutation engine (producer)
//! and the event bus (fan-out). Payloads are the only structured external
//! format owned by the core; their JSON shape is:
//!
//! ```json
//! { "type": "add-record", "group": "shared", "collectionName": "comments",
//!   "key": "c-17", "value": { "text": "hi" }, "beforeKey": "c-03" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{CardId, Group, UserId};
use crate::time::Timestamp;

/// One structured edit to a card's state.
///
/// `Value::Null` acts as the delete sentinel for `set-property` and
/// `update-record-field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum MutationPayload {
    SetProperty {
        group: Group,
        name: String,
        value: Value,
    },
    IncProperty {
        group: Group,
        name: String,
        increment_by: f64,
    },
    AddRecord {
        group: Group,
        collection_name: String,
        key: String,
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before_key: Option<String>,
    },
    UpdateRecord {
        group: Group,
        collection_name: String,
        key: String,
        value: Value,
    },
    UpdateRecordField {
        group: Group,
        collection_name: String,
        key: String,
        path: String,
        value: Value,
    },
    IncRecordField {
        group: Group,
        collection_name: String,
        key: String,
        path: String,
        increment_by: f64,
    },
    DeleteRecord {
        group: Group,
        collection_name: String,
        key: String,
    },
    MoveRecord {
        group: Group,
        collection_name: String,
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before_key: Option<String>,
    },
}

impl MutationPayload {
    pub fn group(&self) -> Group {
        match self {
            Self::SetProperty { group, .. }
            | Self::IncProperty { group, .. }
            | Self::AddRecord { group, .. }
            | Self::UpdateRecord { group, .. }
            | Self::UpdateRecordField { group, .. }
            | Self::IncRecordField { group, .. }
            | Self::DeleteRecord { group, .. }
            | Self::MoveRecord { group, .. } => *group,
        }
    }

    /// Wire name of the payload kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetProperty { .. } => "set-property",
            Self::IncProperty { .. } => "inc-property",
            Self::AddRecord { .. } => "add-record",
            Self::UpdateRecord { .. } => "update-record",
            Self::UpdateRecordField { .. } => "update-record-field",
            Self::IncRecordField { .. } => "inc-record-field",
            Self::DeleteRecord { .. } => "delete-record",
            Self::MoveRecord { .. } => "move-record",
        }
    }
}

/// An immutable, committed mutation.
///
/// `index` is globally monotonic across all cards; `at` is strictly
/// increasing within one `(card, group, scope)` partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    pub index: u64,
    pub mutation_id: String,
    pub card_id: CardId,
    pub group: Group,
    pub by: UserId,
    pub at: Timestamp,
    pub mutation: MutationPayload,
}

impl MutationRecord {
    /// Scope user of the partition this record belongs to.
    pub fn scope(&self) -> UserId {
        self.group.scope_for(&self.by)
    }
}
