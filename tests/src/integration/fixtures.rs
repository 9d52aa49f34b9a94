//! Shared setup for integration flows.

use std::sync::Arc;
use std::time::Duration;

use ed25519_dalek::{Signer, SigningKey};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use cx_01_card_lock::LockConfig;
use cx_03_value_ledger::binding_for_key;
use shared_types::{Account, Address, MockTimeSource, Timestamp, UserId};
use worker_runtime::{Platform, PlatformConfig};

/// Fixed wall clock for every flow.
pub const NOW: Timestamp = 1_718_000_000_000;

/// Lock settings that tolerate heavy contention without slowing tests.
pub fn contended_lock_config() -> LockConfig {
    LockConfig {
        timeout_ms: 30_000,
        retry_interval: Duration::from_millis(1),
        max_attempts: 5_000,
    }
}

/// A worker on a frozen clock.
pub fn platform(server_id: &str) -> (Platform, Arc<MockTimeSource>) {
    let time = Arc::new(MockTimeSource::new(NOW));
    let mut config = PlatformConfig::with_server_id(server_id);
    config.lock = contended_lock_config();
    (Platform::with_time_source(config, time.clone()), time)
}

/// A registered account holder with its signing key.
pub struct Member {
    pub key: SigningKey,
    pub account: Account,
}

impl Member {
    pub fn id(&self) -> &UserId {
        &self.account.id
    }

    pub fn address(&self) -> Address {
        self.account.address.address.clone()
    }

    pub fn sign(&self, details: &str) -> String {
        hex::encode(self.key.sign(details.as_bytes()).to_bytes())
    }
}

/// Registers `name` with `balance` in the platform's account store.
pub fn register(platform: &Platform, name: &str, seed: u8, balance: Decimal) -> Member {
    let key = SigningKey::from_bytes(&[seed; 32]);
    let account = Account::new(
        UserId::new(name),
        binding_for_key(&key.verifying_key()),
        balance,
        0,
    );
    platform
        .accounts
        .insert_account(account.clone())
        .unwrap_or_else(|e| panic!("register {name}: {e}"));
    Member { key, account }
}

/// Transfer details JSON as a client would sign it.
pub fn transfer_json(
    reason: &str,
    amount: &str,
    related_card_id: Option<&str>,
    recipients: Vec<Value>,
) -> String {
    let mut details = json!({
        "type": "transfer",
        "reason": reason,
        "amount": amount,
        "timestamp": NOW,
        "toRecipients": recipients,
    });
    if let Some(card) = related_card_id {
        details["relatedCardId"] = json!(card);
    }
    details.to_string()
}

pub fn remainder(to: &Member) -> Value {
    json!({ "address": to.address(), "portion": "remainder" })
}

pub fn fraction(to: &Member, share: &str) -> Value {
    json!({ "address": to.address(), "portion": "fraction", "amount": share })
}

pub fn absolute(to: &Member, amount: &str) -> Value {
    json!({ "address": to.address(), "portion": "absolute", "amount": amount })
}
