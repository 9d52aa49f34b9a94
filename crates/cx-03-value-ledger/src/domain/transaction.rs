//! The immutable ledger entry.

use super::details::TransactionDetails;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared_types::{Timestamp, UserId};

/// A committed value transfer.
///
/// `participant_user_ids` holds the originator first, then every resolved
/// recipient; it never contains duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransaction {
    pub id: String,
    pub at: Timestamp,
    pub originator_user_id: UserId,
    pub participant_user_ids: Vec<UserId>,
    pub details: TransactionDetails,
    /// Hex Ed25519 signature over the exact details JSON bytes.
    pub signature: String,
}

impl BankTransaction {
    pub fn involves(&self, user_id: &UserId) -> bool {
        self.participant_user_ids.contains(user_id)
    }
}

/// Outcome returned to the originator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub record: BankTransaction,
    /// Originator balance right after the debit.
    pub updated_balance: Decimal,
    pub balance_at: Timestamp,
}
