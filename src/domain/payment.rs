use super::amount::{Amount, MinorUnits};
use super::balance::{OwnerId, VaultBalance};
use crate::error::PaymentError;
use serde::{Deserialize, Serialize};

/// A single payment attempt: who gets paid and how much.
///
/// Built fresh for every submission and dropped once the attempt resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    recipient: String,
    amount: Amount,
}

impl PaymentIntent {
    /// Trims the recipient and rejects it if nothing is left.
    pub fn new(recipient: impl AsRef<str>, amount: Amount) -> Result<Self, PaymentError> {
        let recipient = recipient.as_ref().trim();
        if recipient.is_empty() {
            return Err(PaymentError::ClientValidation(
                "Recipient address must not be empty".to_string(),
            ));
        }
        Ok(Self {
            recipient: recipient.to_string(),
            amount,
        })
    }

    /// Builds an intent from raw user input, the amount given in display units.
    pub fn from_input(recipient: impl AsRef<str>, amount: &str) -> Result<Self, PaymentError> {
        let amount = amount.parse::<Amount>()?;
        Self::new(recipient, amount)
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

/// What the settlement service reports back for an accepted payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub transaction_reference: String,
    pub receipt_token: Option<String>,
    pub reputation_score: f64,
    pub updated_spendable: MinorUnits,
}

/// A settled payment, immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub transaction_reference: String,
    pub recipient_address: String,
    pub amount: Amount,
    pub receipt_token: Option<String>,
    pub reputation_score: f64,
    pub updated_balance: VaultBalance,
}

impl PaymentResult {
    pub fn from_settlement(
        intent: &PaymentIntent,
        owner_id: OwnerId,
        receipt: SettlementReceipt,
    ) -> Self {
        Self {
            transaction_reference: receipt.transaction_reference,
            recipient_address: intent.recipient().to_string(),
            amount: intent.amount(),
            receipt_token: receipt.receipt_token,
            reputation_score: receipt.reputation_score,
            updated_balance: VaultBalance::new(owner_id, receipt.updated_spendable),
        }
    }
}

/// A payment as stored by the remote service.
///
/// `transaction_reference` is `None` for payments the service recorded but never
/// settled on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: u64,
    pub recipient_address: String,
    pub amount: MinorUnits,
    pub transaction_reference: Option<String>,
    pub receipt_token: Option<String>,
}
