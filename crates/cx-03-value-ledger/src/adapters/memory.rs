//! In-memory account and ledger stores.

use crate::domain::BankTransaction;
use crate::ports::outbound::{AccountStore, LedgerStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use shared_types::{Account, Address, AddressBinding, StoreError, Timestamp, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
struct AccountTables {
    accounts: HashMap<UserId, Account>,
    /// Every address ever bound, current or previous.
    by_address: HashMap<Address, UserId>,
}

/// In-memory implementation of [`AccountStore`].
pub struct InMemoryAccountStore {
    tables: RwLock<AccountTables>,
    unavailable: AtomicBool,
    /// Balance increments still allowed before the store starts failing.
    increments_left: AtomicUsize,
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self {
            tables: RwLock::new(AccountTables::default()),
            unavailable: AtomicBool::new(false),
            increments_left: AtomicUsize::new(usize::MAX),
        }
    }
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account. `Conflict` if the id or any address is taken.
    pub fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.accounts.contains_key(&account.id) {
            return Err(StoreError::Conflict(format!("account {}", account.id)));
        }
        let addresses: Vec<Address> = std::iter::once(&account.address)
            .chain(&account.previous_addresses)
            .map(|b| b.address.clone())
            .collect();
        if let Some(taken) = addresses.iter().find(|a| tables.by_address.contains_key(*a)) {
            return Err(StoreError::Conflict(format!("address {taken}")));
        }
        for address in addresses {
            tables.by_address.insert(address, account.id.clone());
        }
        tables.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    /// Makes `binding` the account's current address; the old one moves to
    /// `previous_addresses` and stays valid for signing.
    pub fn rotate_address(&self, user_id: &UserId, binding: AddressBinding) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.by_address.contains_key(&binding.address) {
            return Err(StoreError::Conflict(format!("address {}", binding.address)));
        }
        let account = tables
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("account {user_id}")))?;
        let old = std::mem::replace(&mut account.address, binding.clone());
        account.previous_addresses.push(old);
        tables.by_address.insert(binding.address, user_id.clone());
        Ok(())
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Lets `count` more balance increments succeed, then fails the rest.
    pub fn fail_increments_after(&self, count: usize) {
        self.increments_left.store(count, Ordering::SeqCst);
    }

    /// Sum of all balances.
    pub fn total_balance(&self) -> Decimal {
        self.tables.read().accounts.values().map(|a| a.balance).sum()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("account store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_account(&self, user_id: &UserId) -> Result<Option<Account>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().accounts.get(user_id).cloned())
    }

    async fn find_by_address(&self, address: &Address) -> Result<Option<Account>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read();
        Ok(tables
            .by_address
            .get(address)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn increment_balance(
        &self,
        user_id: &UserId,
        delta: Decimal,
        at: Timestamp,
    ) -> Result<Option<Account>, StoreError> {
        self.check_available()?;
        let allowed = self
            .increments_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(StoreError::Unavailable("balance write failed".into()));
        }

        let mut tables = self.tables.write();
        let Some(account) = tables.accounts.get_mut(user_id) else {
            return Ok(None);
        };
        account.balance = account.balance.checked_add(delta).ok_or_else(|| {
            StoreError::OutOfRange(format!("balance of {user_id} plus {delta}"))
        })?;
        account.balance_last_updated = at;
        account.below_target_balance = account.is_below_target();
        Ok(Some(account.clone()))
    }
}

/// In-memory implementation of [`LedgerStore`].
#[derive(Default)]
pub struct InMemoryLedgerStore {
    transactions: RwLock<Vec<BankTransaction>>,
    ids: RwLock<HashSet<String>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transactions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.read().is_empty()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_transaction(&self, transaction: BankTransaction) -> Result<(), StoreError> {
        if !self.ids.write().insert(transaction.id.clone()) {
            return Err(StoreError::Conflict(format!("transaction {}", transaction.id)));
        }
        self.transactions.write().push(transaction);
        Ok(())
    }

    async fn transactions_for_participant(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<BankTransaction>, StoreError> {
        Ok(self
            .transactions
            .read()
            .iter()
            .rev()
            .filter(|tx| tx.involves(user_id))
            .take(limit)
            .cloned()
            .collect())
    }
}
