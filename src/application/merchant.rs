use crate::domain::amount::MinorUnits;
use crate::domain::invoice::Invoice;
use crate::domain::ports::GatewayRef;
use crate::domain::receipt::{ReceiptRecord, Reputation, ReputationTier};
use crate::error::PaymentError;
use rust_decimal::Decimal;

/// How many receipts a summary shows as recent activity.
pub const RECENT_RECEIPTS: usize = 10;

/// Read-only standing of a merchant: reputation plus the receipts it was paid
/// with, in service order.
#[derive(Debug, Clone, PartialEq)]
pub struct MerchantSummary {
    pub reputation: Reputation,
    pub receipts: Vec<ReceiptRecord>,
}

impl MerchantSummary {
    pub fn tier(&self) -> ReputationTier {
        self.reputation.tier()
    }

    pub fn total_receipts(&self) -> usize {
        self.receipts.len()
    }

    pub fn total_volume(&self) -> MinorUnits {
        MinorUnits(
            self.receipts
                .iter()
                .fold(0u64, |sum, r| sum.saturating_add(r.amount.value())),
        )
    }

    /// Mean receipt amount in display units, zero when there are no receipts.
    pub fn average_ticket(&self) -> Decimal {
        if self.receipts.is_empty() {
            return Decimal::ZERO;
        }
        (self.total_volume().to_display() / Decimal::from(self.receipts.len())).round_dp(6)
    }

    /// The latest `limit` receipts, newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &ReceiptRecord> {
        self.receipts.iter().rev().take(limit)
    }
}

/// Receipt, invoice and reputation lookups by address. Never touches the vault
/// balance.
pub struct MerchantView {
    gateway: GatewayRef,
}

impl MerchantView {
    pub fn new(gateway: GatewayRef) -> Self {
        Self { gateway }
    }

    pub async fn summary(&self, merchant: &str) -> Result<MerchantSummary, PaymentError> {
        let merchant = required(merchant, "Enter merchant address")?;
        let reputation = self.gateway.reputation(merchant).await?;
        let receipts = self.gateway.receipts_by_merchant(merchant).await?;
        tracing::debug!(
            merchant,
            receipts = receipts.len(),
            score = reputation.score,
            "merchant summary loaded"
        );
        Ok(MerchantSummary {
            reputation,
            receipts,
        })
    }

    pub async fn receipts_by_payer(&self, payer: &str) -> Result<Vec<ReceiptRecord>, PaymentError> {
        let payer = required(payer, "Enter a user address")?;
        Ok(self.gateway.receipts_by_payer(payer).await?)
    }

    pub async fn receipts_by_merchant(
        &self,
        merchant: &str,
    ) -> Result<Vec<ReceiptRecord>, PaymentError> {
        let merchant = required(merchant, "Enter merchant address")?;
        Ok(self.gateway.receipts_by_merchant(merchant).await?)
    }

    pub async fn invoices(&self, merchant: &str) -> Result<Vec<Invoice>, PaymentError> {
        let merchant = required(merchant, "Enter merchant address")?;
        Ok(self.gateway.invoices(merchant).await?)
    }
}

fn required<'a>(address: &'a str, message: &str) -> Result<&'a str, PaymentError> {
    let address = address.trim();
    if address.is_empty() {
        Err(PaymentError::ClientValidation(message.to_string()))
    } else {
        Ok(address)
    }
}
