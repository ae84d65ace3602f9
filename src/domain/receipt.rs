use super::amount::{Amount, MinorUnits};
use crate::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A claimed transaction submitted for independent verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptClaim {
    pub transaction_reference: String,
    pub claimed_payer: String,
    pub claimed_recipient: String,
    pub claimed_amount: Amount,
}

impl ReceiptClaim {
    pub fn new(
        transaction_reference: impl AsRef<str>,
        claimed_payer: impl AsRef<str>,
        claimed_recipient: impl AsRef<str>,
        claimed_amount: Amount,
    ) -> Result<Self, PaymentError> {
        let fields = [
            transaction_reference.as_ref().trim(),
            claimed_payer.as_ref().trim(),
            claimed_recipient.as_ref().trim(),
        ];
        if fields.iter().any(|f| f.is_empty()) {
            return Err(PaymentError::ClientValidation(
                "Please fill all fields".to_string(),
            ));
        }
        let [transaction_reference, claimed_payer, claimed_recipient] = fields.map(String::from);
        Ok(Self {
            transaction_reference,
            claimed_payer,
            claimed_recipient,
            claimed_amount,
        })
    }
}

/// Outcome of a successful verification.
///
/// `receipt_token` is `None` when the transaction was verified but the
/// notarization service could not mint a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub confirmed_transaction_reference: String,
    pub receipt_token: Option<String>,
    pub reputation_score: f64,
}

/// A notarized receipt as listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub transaction_reference: String,
    pub payer_address: String,
    pub merchant_address: String,
    pub amount: MinorUnits,
    pub receipt_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reputation {
    pub address: String,
    pub score: f64,
}

impl Reputation {
    pub fn tier(&self) -> ReputationTier {
        ReputationTier::from_score(self.score)
    }
}

/// Coarse standing derived from a reputation score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReputationTier {
    Unrated,
    Bronze,
    Silver,
    Gold,
}

impl ReputationTier {
    pub const SILVER_THRESHOLD: f64 = 5.0;
    pub const GOLD_THRESHOLD: f64 = 15.0;

    pub fn from_score(score: f64) -> Self {
        if score >= Self::GOLD_THRESHOLD {
            Self::Gold
        } else if score >= Self::SILVER_THRESHOLD {
            Self::Silver
        } else if score > 0.0 {
            Self::Bronze
        } else {
            // also covers NaN
            Self::Unrated
        }
    }
}

impl fmt::Display for ReputationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unrated => "Unrated",
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
        };
        f.write_str(name)
    }
}
