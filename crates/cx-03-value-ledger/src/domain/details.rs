//! Transfer details: the signed payload of a bank transaction.
//!
//! Wire shape (the exact bytes are what the client signs):
//!
//! ```json
//! {
//!   "type": "transfer",
//!   "reason": "card-open",
//!   "amount": "10",
//!   "relatedCardId": "card-17",
//!   "timestamp": 1718000000000,
//!   "toRecipients": [
//!     { "address": "9f…", "portion": "fraction", "amount": "0.1" },
//!     { "address": "c3…", "portion": "remainder" }
//!   ]
//! }
//! ```

use super::errors::{LedgerError, LedgerResult};
use super::split::{max_amount, MONEY_SCALE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared_types::{Address, CardId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionType {
    Transfer,
}

impl TransactionType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "transfer" => Some(Self::Transfer),
            _ => None,
        }
    }
}

/// Allow-listed transfer reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    CardPromotion,
    CardOpen,
    CardCouponRedemption,
    Interest,
    Subsidy,
    Grant,
}

impl Reason {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "card-promotion" => Some(Self::CardPromotion),
            "card-open" => Some(Self::CardOpen),
            "card-coupon-redemption" => Some(Self::CardCouponRedemption),
            "interest" => Some(Self::Interest),
            "subsidy" => Some(Self::Subsidy),
            "grant" => Some(Self::Grant),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CardPromotion => "card-promotion",
            Self::CardOpen => "card-open",
            Self::CardCouponRedemption => "card-coupon-redemption",
            Self::Interest => "interest",
            Self::Subsidy => "subsidy",
            Self::Grant => "grant",
        }
    }

    /// Reasons that only make sense against a card.
    pub fn requires_card(self) -> bool {
        matches!(self, Self::CardPromotion | Self::CardOpen)
    }
}

/// How a recipient's share is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Portion {
    /// Equal part of whatever the other recipients leave.
    Remainder,
    /// `amount` is a share of the total in `(0, 1]`.
    Fraction,
    /// `amount` is paid exactly.
    Absolute,
}

impl Portion {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "remainder" => Some(Self::Remainder),
            "fraction" => Some(Self::Fraction),
            "absolute" => Some(Self::Absolute),
            _ => None,
        }
    }
}

/// A validated recipient. `amount` is `None` exactly for `Remainder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub address: Address,
    pub portion: Portion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

impl Recipient {
    pub fn remainder(address: impl Into<String>) -> Self {
        Self {
            address: Address::new(address),
            portion: Portion::Remainder,
            amount: None,
        }
    }

    pub fn fraction(address: impl Into<String>, share: Decimal) -> Self {
        Self {
            address: Address::new(address),
            portion: Portion::Fraction,
            amount: Some(share),
        }
    }

    pub fn absolute(address: impl Into<String>, amount: Decimal) -> Self {
        Self {
            address: Address::new(address),
            portion: Portion::Absolute,
            amount: Some(amount),
        }
    }
}

/// Validated transfer details, as stored on the ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub reason: Reason,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_card_id: Option<CardId>,
    pub to_recipients: Vec<Recipient>,
    pub timestamp: Timestamp,
}

/// Lenient first pass: the JSON must parse, field presence is checked later
/// so each failure can say what is missing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDetails {
    #[serde(rename = "type")]
    kind: Option<String>,
    reason: Option<String>,
    amount: Option<Decimal>,
    related_card_id: Option<String>,
    to_recipients: Option<Vec<RawRecipient>>,
    timestamp: Option<Timestamp>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRecipient {
    address: Option<String>,
    portion: Option<String>,
    amount: Option<Decimal>,
}

impl TransactionDetails {
    /// Runs validation steps 3 to 6 over the signed JSON.
    pub fn parse(details_json: &str, now: Timestamp, clock_skew_ms: u64) -> LedgerResult<Self> {
        let raw: RawDetails = serde_json::from_str(details_json)
            .map_err(|e| LedgerError::MalformedDetails(e.to_string()))?;

        let timestamp = raw
            .timestamp
            .ok_or_else(|| LedgerError::invalid("timestamp is required"))?;
        let skew_ms = now.abs_diff(timestamp);
        if skew_ms > clock_skew_ms {
            return Err(LedgerError::StaleTimestamp { timestamp, skew_ms });
        }

        let kind = raw
            .kind
            .as_deref()
            .ok_or_else(|| LedgerError::invalid("type is required"))?;
        let kind = TransactionType::parse(kind)
            .ok_or_else(|| LedgerError::invalid(format!("unsupported type '{kind}'")))?;

        let reason = raw
            .reason
            .as_deref()
            .ok_or_else(|| LedgerError::invalid("reason is required"))?;
        let reason = Reason::parse(reason)
            .ok_or_else(|| LedgerError::invalid(format!("reason '{reason}' is not allowed")))?;

        let amount = raw
            .amount
            .ok_or_else(|| LedgerError::invalid("amount is required"))?;
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid("amount must be positive"));
        }
        check_money("amount", amount)?;

        let related_card_id = raw.related_card_id.filter(|id| !id.is_empty()).map(CardId);
        if reason.requires_card() && related_card_id.is_none() {
            return Err(LedgerError::invalid(format!(
                "relatedCardId is required for {}",
                reason.as_str()
            )));
        }

        let recipients = raw
            .to_recipients
            .ok_or_else(|| LedgerError::invalid("toRecipients is required"))?;
        if recipients.is_empty() {
            return Err(LedgerError::invalid("toRecipients must not be empty"));
        }
        let to_recipients = recipients
            .into_iter()
            .enumerate()
            .map(|(i, r)| validate_recipient(i, r))
            .collect::<LedgerResult<Vec<_>>>()?;

        Ok(Self {
            kind,
            reason,
            amount,
            related_card_id,
            to_recipients,
            timestamp,
        })
    }
}

/// Amounts that move money must fit [`MONEY_SCALE`] and stay under [`max_amount`].
fn check_money(what: &str, value: Decimal) -> LedgerResult<()> {
    if value > max_amount() {
        return Err(LedgerError::invalid(format!(
            "{what} exceeds {}",
            max_amount()
        )));
    }
    if value.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::invalid(format!(
            "{what} has more than {MONEY_SCALE} decimal places"
        )));
    }
    Ok(())
}

fn validate_recipient(position: usize, raw: RawRecipient) -> LedgerResult<Recipient> {
    let address = raw
        .address
        .filter(|a| !a.is_empty())
        .ok_or_else(|| LedgerError::invalid(format!("recipient {position}: address is required")))?;
    let portion = raw.portion.as_deref().and_then(Portion::parse).ok_or_else(|| {
        LedgerError::invalid(format!(
            "recipient {position}: portion must be remainder, fraction or absolute"
        ))
    })?;

    let amount = match portion {
        Portion::Remainder => None,
        Portion::Fraction | Portion::Absolute => {
            let share = raw
                .amount
                .filter(|a| *a > Decimal::ZERO)
                .ok_or_else(|| {
                    LedgerError::invalid(format!(
                        "recipient {position}: a positive amount is required"
                    ))
                })?;
            if portion == Portion::Fraction && share > Decimal::ONE {
                return Err(LedgerError::invalid(format!(
                    "recipient {position}: fraction {share} exceeds 1"
                )));
            }
            if portion == Portion::Absolute {
                check_money(&format!("recipient {position}: amount"), share)?;
            }
            Some(share)
        }
    };

    Ok(Recipient {
        address: Address::new(address),
        portion,
        amount,
    })
}
