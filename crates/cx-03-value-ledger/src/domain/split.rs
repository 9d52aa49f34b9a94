//! Credit computation.
//!
//! Pure: takes the transfer amount and the recipients already resolved to
//! users, returns exactly what each one is credited.

use super::details::{Portion, Recipient};
use super::errors::{LedgerError, LedgerResult};
use rust_decimal::{Decimal, RoundingStrategy};
use shared_types::{Address, UserId};

/// One planned credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub user_id: UserId,
    pub address: Address,
    pub portion: Portion,
    pub amount: Decimal,
}

/// Result of splitting a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    /// Credits in recipient order.
    pub credits: Vec<Credit>,
    /// Sum of fraction and absolute shares.
    pub allocated: Decimal,
    pub remainder_count: usize,
}

impl SplitPlan {
    pub fn total(&self) -> Decimal {
        self.credits.iter().map(|c| c.amount).sum()
    }
}

/// Decimal places a transfer amount or credit may carry.
pub const MONEY_SCALE: u32 = 8;

/// Largest amount a single transfer may move.
pub fn max_amount() -> Decimal {
    Decimal::from(1_000_000_000_000_000_000u64)
}

fn overflow() -> LedgerError {
    LedgerError::invalid("recipient amounts overflow")
}

fn check_scale(what: &str, value: Decimal) -> LedgerResult<()> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::invalid(format!(
            "{what} {value} has more than {MONEY_SCALE} decimal places"
        )));
    }
    Ok(())
}

/// Truncates to [`MONEY_SCALE`]; dust left behind goes to the last remainder.
fn to_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero)
}

/// Splits `amount` across `recipients`.
///
/// Every share is held at [`MONEY_SCALE`] decimal places, so sums are exact.
/// Remainder recipients share what fraction and absolute recipients leave;
/// the last one takes the rounding dust so the credits sum to `amount`.
///
/// # Errors
/// - `InvalidDetails`: `amount` or an absolute share is finer than [`MONEY_SCALE`]
/// - `RecipientsExceedAmount`: fraction + absolute shares exceed `amount`
/// - `AmountsDoNotAddUp`: no remainder recipient and the shares miss `amount`
pub fn plan_credits(amount: Decimal, recipients: &[(UserId, Recipient)]) -> LedgerResult<SplitPlan> {
    check_scale("amount", amount)?;

    let mut allocated = Decimal::ZERO;
    let mut remainder_count = 0usize;
    let mut fixed = Vec::with_capacity(recipients.len());

    for (_, recipient) in recipients {
        let share = recipient.amount.unwrap_or(Decimal::ZERO);
        let credit = match recipient.portion {
            Portion::Fraction => to_money(amount.checked_mul(share).ok_or_else(overflow)?),
            Portion::Absolute => {
                check_scale("absolute share", share)?;
                share
            }
            Portion::Remainder => {
                remainder_count += 1;
                Decimal::ZERO
            }
        };
        allocated = allocated.checked_add(credit).ok_or_else(overflow)?;
        fixed.push(credit);
    }

    if allocated > amount {
        return Err(LedgerError::RecipientsExceedAmount { allocated, amount });
    }
    if remainder_count == 0 && allocated != amount {
        return Err(LedgerError::AmountsDoNotAddUp { allocated, amount });
    }

    let left = amount - allocated;
    let remainder_share = if remainder_count > 0 {
        to_money(left / Decimal::from(remainder_count as u64))
    } else {
        Decimal::ZERO
    };

    let mut remainders_seen = 0usize;
    let mut remainder_paid = Decimal::ZERO;
    let credits: Vec<Credit> = recipients
        .iter()
        .zip(fixed)
        .map(|((user_id, recipient), fixed)| {
            let amount = match recipient.portion {
                Portion::Remainder => {
                    remainders_seen += 1;
                    if remainders_seen == remainder_count {
                        left - remainder_paid
                    } else {
                        remainder_paid += remainder_share;
                        remainder_share
                    }
                }
                Portion::Fraction | Portion::Absolute => fixed,
            };
            Credit {
                user_id: user_id.clone(),
                address: recipient.address.clone(),
                portion: recipient.portion,
                amount,
            }
        })
        .collect();

    let plan = SplitPlan {
        credits,
        allocated,
        remainder_count,
    };
    let total = plan.total();
    if total != amount {
        return Err(LedgerError::AmountsDoNotAddUp {
            allocated: total,
            amount,
        });
    }
    Ok(plan)
}
