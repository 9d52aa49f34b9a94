//! # Core Domain Entities
//!
//! Defines the platform entities shared by all subsystems.
//!
//! ## Clusters
//!
//! - **Identity**: `UserId`, `CardId`, `Address`, `AddressBinding`
//! - **Cards**: `Card`, `CardLock`, `CardState`, `Group`
//! - **Accounts**: `Account`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::Timestamp;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Identifier of a user. A user's account shares the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The empty scope used for shared card state.
    pub fn shared_scope() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An account address: lowercase hex of the first 20 bytes of
/// `keccak256(public_key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An address together with the public key it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBinding {
    pub address: Address,
    /// Hex-encoded 32-byte Ed25519 public key.
    pub public_key: String,
}

// =============================================================================
// CLUSTER B: CARDS
// =============================================================================

/// State namespace of a card property or collection.
///
/// `User` scopes the record to the acting user (one private overlay per
/// viewer); `Shared` uses the empty scope (one copy for everybody).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    User,
    Shared,
}

impl Group {
    /// Resolves the partition scope for a record written by `user`.
    pub fn scope_for(self, user: &UserId) -> UserId {
        match self {
            Group::User => user.clone(),
            Group::Shared => UserId::shared_scope(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Group::User => "user",
            Group::Shared => "shared",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory lock stored alongside a card.
///
/// `acquired_at == 0` means unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardLock {
    pub holder: Option<String>,
    pub acquired_at: Timestamp,
}

impl CardLock {
    pub fn unlocked() -> Self {
        Self::default()
    }

    pub fn held_by(holder: impl Into<String>, acquired_at: Timestamp) -> Self {
        Self {
            holder: Some(holder.into()),
            acquired_at,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.acquired_at == 0
    }

    /// True when the lock was taken more than `timeout_ms` before `now`.
    pub fn is_expired(&self, now: Timestamp, timeout_ms: u64) -> bool {
        now.saturating_sub(self.acquired_at) > timeout_ms
    }

    pub fn is_held_by(&self, holder: &str) -> bool {
        !self.is_unlocked() && self.holder.as_deref() == Some(holder)
    }
}

/// Lifecycle state of a card. Deleted cards keep their record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
    #[default]
    Active,
    Deleted,
}

/// A content unit: the unit of locking and mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub lock: CardLock,
    pub created_by: UserId,
    pub created_at: Timestamp,
    pub state: CardState,
}

impl Card {
    pub fn new(id: CardId, created_by: UserId, created_at: Timestamp) -> Self {
        Self {
            id,
            lock: CardLock::unlocked(),
            created_by,
            created_at,
            state: CardState::Active,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.state == CardState::Deleted
    }
}

// =============================================================================
// CLUSTER C: ACCOUNTS
// =============================================================================

/// A user's coin account. Balance is mutated only through the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: UserId,
    /// Current address binding.
    pub address: AddressBinding,
    /// Historical bindings still accepted as originator addresses.
    #[serde(default)]
    pub previous_addresses: Vec<AddressBinding>,
    pub balance: Decimal,
    pub balance_last_updated: Timestamp,
    pub target_balance: Decimal,
    #[serde(default)]
    pub below_target_balance: bool,
}

impl Account {
    pub fn new(id: UserId, address: AddressBinding, balance: Decimal, now: Timestamp) -> Self {
        Self {
            id,
            address,
            previous_addresses: Vec::new(),
            balance,
            balance_last_updated: now,
            target_balance: Decimal::ZERO,
            below_target_balance: false,
        }
    }

    /// Finds the binding for `address` among current and historical ones.
    pub fn binding_for(&self, address: &Address) -> Option<&AddressBinding> {
        std::iter::once(&self.address)
            .chain(self.previous_addresses.iter())
            .find(|binding| &binding.address == address)
    }

    pub fn owns_address(&self, address: &Address) -> bool {
        self.binding_for(address).is_some()
    }

    pub fn is_below_target(&self) -> bool {
        self.balance < self.target_balance
    }
}
