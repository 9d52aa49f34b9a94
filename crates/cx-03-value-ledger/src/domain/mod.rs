//! Domain layer for the ledger.
//!
//! - `details`: transfer details parsing and validation
//! - `split`: credit computation and conservation checks
//! - `transaction`: the immutable ledger entry

pub mod config;
pub mod details;
pub mod errors;
pub mod split;
pub mod transaction;

pub use config::LedgerConfig;
pub use details::{Portion, Reason, Recipient, TransactionDetails, TransactionType};
pub use errors::{LedgerError, LedgerResult};
pub use split::{max_amount, plan_credits, Credit, SplitPlan, MONEY_SCALE};
pub use transaction::{BankTransaction, TransactionResult};
