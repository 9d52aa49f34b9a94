//! Bank service - transfer validation and commit.

use crate::domain::{
    plan_credits, BankTransaction, Credit, LedgerConfig, LedgerError, LedgerResult, Recipient,
    SplitPlan, TransactionDetails, TransactionResult,
};
use crate::ports::inbound::BankApi;
use crate::ports::outbound::{AccountStore, IdentityVerifier, LedgerStore};
use async_trait::async_trait;
use rust_decimal::Decimal;
use shared_bus::{EventPublisher, PlatformEvent};
use shared_types::{
    Account, Address, StoreError, SystemTimeSource, TimeSource, Timestamp, UserId,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// The Bank.
pub struct Bank<A: AccountStore, L: LedgerStore, V: IdentityVerifier> {
    accounts: Arc<A>,
    ledger: Arc<L>,
    verifier: Arc<V>,
    time: Arc<dyn TimeSource>,
    publisher: Option<Arc<dyn EventPublisher>>,
    config: LedgerConfig,
}

/// A transfer that passed validation and is ready to commit.
struct ValidatedTransfer {
    details: TransactionDetails,
    participants: Vec<UserId>,
    plan: SplitPlan,
}

impl<A, L, V> Bank<A, L, V>
where
    A: AccountStore,
    L: LedgerStore,
    V: IdentityVerifier,
{
    pub fn new(accounts: Arc<A>, ledger: Arc<L>, verifier: Arc<V>, config: LedgerConfig) -> Self {
        Self::with_time_source(accounts, ledger, verifier, config, Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(
        accounts: Arc<A>,
        ledger: Arc<L>,
        verifier: Arc<V>,
        config: LedgerConfig,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            accounts,
            ledger,
            verifier,
            time,
            publisher: None,
            config,
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Validation steps 1 to 7, recipient resolution and the split.
    /// Performs no writes.
    async fn validate(
        &self,
        account: &Account,
        address: &Address,
        details_json: &str,
        signature: &str,
        network_initiated: bool,
        now: Timestamp,
    ) -> LedgerResult<ValidatedTransfer> {
        let binding = account
            .binding_for(address)
            .ok_or_else(|| LedgerError::AddressNotOwned(address.clone()))?;

        if !self
            .verifier
            .verify(details_json.as_bytes(), &binding.public_key, signature)
        {
            return Err(LedgerError::InvalidSignature);
        }

        let details = TransactionDetails::parse(details_json, now, self.config.clock_skew_ms)?;

        let current = self
            .accounts
            .find_account(&account.id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account.id.clone()))?;
        if !network_initiated && current.balance < details.amount {
            return Err(LedgerError::InsufficientFunds {
                balance: current.balance,
                amount: details.amount,
            });
        }
        if current.balance.checked_sub(details.amount).is_none() {
            return Err(LedgerError::BalanceOutOfRange(account.id.clone()));
        }

        let resolved = self.resolve_recipients(account, &details.to_recipients).await?;
        let plan = plan_credits(
            details.amount,
            &resolved
                .iter()
                .map(|(recipient_account, recipient)| (recipient_account.id.clone(), recipient.clone()))
                .collect::<Vec<_>>(),
        )?;
        for ((recipient_account, _), credit) in resolved.iter().zip(&plan.credits) {
            if recipient_account.balance.checked_add(credit.amount).is_none() {
                return Err(LedgerError::BalanceOutOfRange(recipient_account.id.clone()));
            }
        }

        let participants = std::iter::once(account.id.clone())
            .chain(resolved.into_iter().map(|(recipient_account, _)| recipient_account.id))
            .collect();

        Ok(ValidatedTransfer {
            details,
            participants,
            plan,
        })
    }

    /// Maps every recipient address to its account, rejecting repeats of
    /// the originator or of another recipient.
    async fn resolve_recipients(
        &self,
        originator: &Account,
        recipients: &[Recipient],
    ) -> LedgerResult<Vec<(Account, Recipient)>> {
        let mut seen = HashSet::from([originator.id.clone()]);
        let mut resolved = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            let account = self
                .verifier
                .resolve_address(&recipient.address)
                .await?
                .ok_or_else(|| LedgerError::RecipientNotFound(recipient.address.clone()))?;
            if !seen.insert(account.id.clone()) {
                return Err(LedgerError::DuplicateParticipant(account.id));
            }
            resolved.push((account, recipient.clone()));
        }
        Ok(resolved)
    }

    /// Applies a balance delta; the store refreshes the below-target flag in
    /// the same write.
    async fn adjust_balance(
        &self,
        user_id: &UserId,
        delta: Decimal,
        now: Timestamp,
    ) -> LedgerResult<Account> {
        match self.accounts.increment_balance(user_id, delta, now).await {
            Ok(Some(updated)) => Ok(updated),
            Ok(None) => Err(LedgerError::AccountNotFound(user_id.clone())),
            Err(StoreError::OutOfRange(_)) => Err(LedgerError::BalanceOutOfRange(user_id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn credit_all(&self, transaction_id: &str, credits: &[Credit], now: Timestamp) -> LedgerResult<()> {
        for (credited, credit) in credits.iter().enumerate() {
            if let Err(e) = self.adjust_balance(&credit.user_id, credit.amount, now).await {
                let done: Vec<&str> = credits[..credited]
                    .iter()
                    .map(|c| c.user_id.as_str())
                    .collect();
                error!(
                    transaction_id,
                    failed_user = %credit.user_id,
                    credited = ?done,
                    error = %e,
                    "[cx-03] Credit failed after debit, transaction partially committed"
                );
                let source = match e {
                    LedgerError::Store(source) => source,
                    other => StoreError::Unavailable(other.to_string()),
                };
                return Err(LedgerError::PartialCommit {
                    transaction_id: transaction_id.to_string(),
                    credited,
                    source,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<A, L, V> BankApi for Bank<A, L, V>
where
    A: AccountStore + 'static,
    L: LedgerStore + 'static,
    V: IdentityVerifier + 'static,
{
    async fn perform_transaction(
        &self,
        account: &Account,
        address: &Address,
        details_json: &str,
        signature: &str,
        network_initiated: bool,
    ) -> LedgerResult<TransactionResult> {
        let now = self.time.now();
        let transfer = self
            .validate(account, address, details_json, signature, network_initiated, now)
            .await
            .inspect_err(|e| {
                debug!(originator = %account.id, kind = %e.kind(), error = %e, "[cx-03] Transaction rejected");
            })?;

        let ValidatedTransfer {
            details,
            participants,
            plan,
        } = transfer;
        let amount = details.amount;

        let debited = self.adjust_balance(&account.id, -amount, now).await?;

        let record = BankTransaction {
            id: Uuid::new_v4().to_string(),
            at: now,
            originator_user_id: account.id.clone(),
            participant_user_ids: participants,
            details,
            signature: signature.to_string(),
        };
        if let Err(e) = self.ledger.insert_transaction(record.clone()).await {
            error!(
                transaction_id = %record.id,
                originator = %account.id,
                %amount,
                error = %e,
                "[cx-03] Failed to record transaction after debit"
            );
            return Err(LedgerError::PartialCommit {
                transaction_id: record.id,
                credited: 0,
                source: e,
            });
        }

        self.credit_all(&record.id, &plan.credits, now).await?;

        info!(
            transaction_id = %record.id,
            originator = %account.id,
            reason = record.details.reason.as_str(),
            %amount,
            recipients = plan.credits.len(),
            network_initiated,
            "[cx-03] Transaction committed"
        );

        if let Some(publisher) = &self.publisher {
            publisher
                .publish(PlatformEvent::TransactionCommitted {
                    transaction_id: record.id.clone(),
                    originator: account.id.clone(),
                    participants: record.participant_user_ids.clone(),
                    amount,
                    reason: record.details.reason.as_str().to_string(),
                })
                .await;
        }

        Ok(TransactionResult {
            updated_balance: debited.balance,
            balance_at: debited.balance_last_updated,
            record,
        })
    }

    async fn transactions_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> LedgerResult<Vec<BankTransaction>> {
        Ok(self
            .ledger
            .transactions_for_participant(user_id, limit)
            .await?)
    }
}
