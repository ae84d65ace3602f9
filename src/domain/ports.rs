use super::amount::Amount;
use super::balance::{OwnerId, VaultBalance};
use super::invoice::Invoice;
use super::payment::{PaymentRecord, SettlementReceipt};
use super::receipt::{ReceiptClaim, ReceiptRecord, Reputation, VerificationResult};
use crate::error::GatewayError;
use async_trait::async_trait;
use std::sync::Arc;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Client-side contract with the settlement, ledger query and notarization
/// services.
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn query_balance(&self, owner: OwnerId) -> GatewayResult<VaultBalance>;

    async fn submit_payment(
        &self,
        recipient: &str,
        amount: Amount,
    ) -> GatewayResult<SettlementReceipt>;

    async fn verify_and_notarize(&self, claim: &ReceiptClaim) -> GatewayResult<VerificationResult>;

    /// Payments in the order the service stores them.
    async fn list_payments(&self, owner: OwnerId) -> GatewayResult<Vec<PaymentRecord>>;

    async fn reputation(&self, address: &str) -> GatewayResult<Reputation>;

    /// Receipts where `address` paid, in service order.
    async fn receipts_by_payer(&self, address: &str) -> GatewayResult<Vec<ReceiptRecord>>;

    /// Receipts where `address` was paid, in service order.
    async fn receipts_by_merchant(&self, address: &str) -> GatewayResult<Vec<ReceiptRecord>>;

    async fn invoices(&self, merchant: &str) -> GatewayResult<Vec<Invoice>>;
}

pub type GatewayRef = Arc<dyn RemoteGateway>;
