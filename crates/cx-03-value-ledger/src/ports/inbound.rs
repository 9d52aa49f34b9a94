//! # Inbound Port - BankApi

use crate::domain::{BankTransaction, LedgerResult, TransactionResult};
use async_trait::async_trait;
use shared_types::{Account, Address, UserId};

/// Primary API of the ledger.
#[async_trait]
pub trait BankApi: Send + Sync {
    /// Validates and executes a signed transfer from `account`.
    ///
    /// `address` selects which of the account's key bindings signed
    /// `details_json`. `network_initiated` transfers (interest, subsidies)
    /// skip the balance check.
    async fn perform_transaction(
        &self,
        account: &Account,
        address: &Address,
        details_json: &str,
        signature: &str,
        network_initiated: bool,
    ) -> LedgerResult<TransactionResult>;

    /// Most recent transactions involving `user_id`, newest first.
    async fn transactions_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> LedgerResult<Vec<BankTransaction>>;
}
