use crate::domain::amount::{Amount, MinorUnits};
use crate::domain::balance::{OwnerId, VaultBalance};
use crate::domain::invoice::Invoice;
use crate::domain::payment::{PaymentRecord, SettlementReceipt};
use crate::domain::ports::{GatewayResult, RemoteGateway};
use crate::domain::receipt::{ReceiptClaim, ReceiptRecord, Reputation, VerificationResult};
use crate::error::GatewayError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    spendable: u64,
    payments: Vec<StoredPayment>,
    reputation: HashMap<String, f64>,
    receipts: Vec<ReceiptRecord>,
    invoices: Vec<Invoice>,
    minted: u64,
    scripted_failures: VecDeque<GatewayError>,
    scripted_references: VecDeque<String>,
}

impl LedgerState {
    fn credit(&mut self, address: &str) -> f64 {
        let score = self.reputation.entry(address.to_string()).or_insert(0.0);
        *score += 1.0;
        *score
    }
}

struct StoredPayment {
    id: u64,
    recipient: String,
    amount: u64,
    tx_hash: String,
    receipt_token: Option<String>,
    verified: bool,
}

/// Number of calls made to each gateway operation.
#[derive(Default)]
pub struct CallCounts {
    query_balance: AtomicUsize,
    submit_payment: AtomicUsize,
    verify_and_notarize: AtomicUsize,
    list_payments: AtomicUsize,
    reputation: AtomicUsize,
    receipts: AtomicUsize,
    invoices: AtomicUsize,
}

impl CallCounts {
    pub fn query_balance(&self) -> usize {
        self.query_balance.load(Ordering::SeqCst)
    }

    pub fn submit_payment(&self) -> usize {
        self.submit_payment.load(Ordering::SeqCst)
    }

    pub fn verify_and_notarize(&self) -> usize {
        self.verify_and_notarize.load(Ordering::SeqCst)
    }

    pub fn list_payments(&self) -> usize {
        self.list_payments.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.query_balance()
            + self.submit_payment()
            + self.verify_and_notarize()
            + self.list_payments()
            + self.reputation.load(Ordering::SeqCst)
            + self.receipts.load(Ordering::SeqCst)
            + self.invoices.load(Ordering::SeqCst)
    }
}

/// A simulated settlement, ledger and notarization service held in memory.
///
/// Implements the same port as the HTTP gateway so workflows can run without a
/// backend. Failures can be scripted with [`InMemoryGateway::fail_next`].
#[derive(Clone)]
pub struct InMemoryGateway {
    owner: OwnerId,
    fee: u64,
    state: Arc<RwLock<LedgerState>>,
    calls: Arc<CallCounts>,
}

impl InMemoryGateway {
    /// Creates a vault for `owner` holding `spendable` minor units.
    pub fn new(owner: OwnerId, spendable: u64) -> Self {
        Self {
            owner,
            fee: 0,
            state: Arc::new(RwLock::new(LedgerState {
                spendable,
                ..Default::default()
            })),
            calls: Arc::new(CallCounts::default()),
        }
    }

    /// Charges `fee` minor units on top of every settled payment.
    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn vault_address(&self) -> String {
        format!("vault_{}", self.owner)
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    /// Makes the next call, whatever the operation, fail with `error`.
    pub async fn fail_next(&self, error: GatewayError) {
        self.state.write().await.scripted_failures.push_back(error);
    }

    /// Makes the next settled payment report `reference` as its transaction.
    pub async fn script_reference(&self, reference: impl Into<String>) {
        self.state
            .write()
            .await
            .scripted_references
            .push_back(reference.into());
    }

    /// Issues a pending invoice, as a merchant would through the service.
    ///
    /// The first verified receipt to `merchant` for exactly `amount` (and from
    /// `customer`, when one is named) marks it paid.
    pub async fn issue_invoice(
        &self,
        merchant: &str,
        customer: Option<&str>,
        amount: Amount,
        description: Option<&str>,
    ) -> Invoice {
        let mut state = self.state.write().await;
        let invoice = Invoice {
            invoice_id: format!("inv_{:06}", state.invoices.len() + 1),
            merchant_address: merchant.to_string(),
            customer_address: customer.map(str::to_string),
            amount: amount.minor_units(),
            description: description.map(str::to_string),
            status: Invoice::PENDING.to_string(),
            receipt_token: None,
        };
        state.invoices.push(invoice.clone());
        invoice
    }

    /// Replaces the vault balance, as an external deposit would.
    pub async fn set_balance(&self, spendable: u64) {
        self.state.write().await.spendable = spendable;
    }

    async fn scripted_failure(&self) -> GatewayResult<()> {
        match self.state.write().await.scripted_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteGateway for InMemoryGateway {
    async fn query_balance(&self, owner: OwnerId) -> GatewayResult<VaultBalance> {
        self.calls.query_balance.fetch_add(1, Ordering::SeqCst);
        self.scripted_failure().await?;
        if owner != self.owner {
            return Err(GatewayError::RejectedByService(format!(
                "Unknown vault {owner}"
            )));
        }
        let state = self.state.read().await;
        Ok(VaultBalance::new(self.owner, state.spendable))
    }

    async fn submit_payment(
        &self,
        recipient: &str,
        amount: Amount,
    ) -> GatewayResult<SettlementReceipt> {
        self.calls.submit_payment.fetch_add(1, Ordering::SeqCst);
        self.scripted_failure().await?;

        let mut state = self.state.write().await;
        let debit = amount.value().saturating_add(self.fee);
        if debit > state.spendable {
            return Err(GatewayError::RejectedByService(
                "Insufficient funds in vault".to_string(),
            ));
        }
        state.spendable -= debit;
        state.minted += 1;

        let id = state.payments.len() as u64 + 1;
        let tx_hash = state
            .scripted_references
            .pop_front()
            .unwrap_or_else(|| format!("sim_tx_{id:08}"));
        let receipt_token = format!("receipt_{:06}", state.minted);
        state.payments.push(StoredPayment {
            id,
            recipient: recipient.to_string(),
            amount: amount.value(),
            tx_hash: tx_hash.clone(),
            receipt_token: Some(receipt_token.clone()),
            verified: false,
        });

        let reputation_score = state.credit(&self.vault_address());

        Ok(SettlementReceipt {
            transaction_reference: tx_hash,
            receipt_token: Some(receipt_token),
            reputation_score,
            updated_spendable: MinorUnits(state.spendable),
        })
    }

    async fn verify_and_notarize(&self, claim: &ReceiptClaim) -> GatewayResult<VerificationResult> {
        self.calls.verify_and_notarize.fetch_add(1, Ordering::SeqCst);
        self.scripted_failure().await?;

        let vault_address = self.vault_address();
        let mut state = self.state.write().await;
        let payment = state
            .payments
            .iter_mut()
            .find(|p| p.tx_hash == claim.transaction_reference)
            .ok_or_else(|| GatewayError::RejectedByService("Transaction not found".to_string()))?;

        if claim.claimed_payer != vault_address
            || payment.recipient != claim.claimed_recipient
            || payment.amount != claim.claimed_amount.value()
        {
            return Err(GatewayError::RejectedByService(
                "Transaction does not match the claimed payment".to_string(),
            ));
        }

        // A receipt is minted once; later verifications confirm without one.
        let receipt_token = if payment.verified {
            None
        } else {
            payment.verified = true;
            payment.receipt_token.clone()
        };

        if receipt_token.is_some() {
            let record = ReceiptRecord {
                transaction_reference: claim.transaction_reference.clone(),
                payer_address: claim.claimed_payer.clone(),
                merchant_address: claim.claimed_recipient.clone(),
                amount: claim.claimed_amount.minor_units(),
                receipt_token: receipt_token.clone(),
            };
            if let Some(invoice) = state.invoices.iter_mut().find(|inv| {
                inv.status == Invoice::PENDING
                    && inv.merchant_address == record.merchant_address
                    && inv.amount == record.amount
                    && inv
                        .customer_address
                        .as_ref()
                        .is_none_or(|customer| *customer == record.payer_address)
            }) {
                invoice.status = Invoice::PAID.to_string();
                invoice.receipt_token = record.receipt_token.clone();
            }
            state.credit(&record.merchant_address);
            state.receipts.push(record);
        }

        let reputation_score = state.credit(&claim.claimed_payer);

        Ok(VerificationResult {
            confirmed_transaction_reference: claim.transaction_reference.clone(),
            receipt_token,
            reputation_score,
        })
    }

    async fn list_payments(&self, owner: OwnerId) -> GatewayResult<Vec<PaymentRecord>> {
        self.calls.list_payments.fetch_add(1, Ordering::SeqCst);
        self.scripted_failure().await?;
        if owner != self.owner {
            return Ok(Vec::new());
        }
        let state = self.state.read().await;
        Ok(state
            .payments
            .iter()
            .map(|p| PaymentRecord {
                id: p.id,
                recipient_address: p.recipient.clone(),
                amount: MinorUnits(p.amount),
                transaction_reference: Some(p.tx_hash.clone()),
                receipt_token: p.receipt_token.clone(),
            })
            .collect())
    }

    async fn reputation(&self, address: &str) -> GatewayResult<Reputation> {
        self.calls.reputation.fetch_add(1, Ordering::SeqCst);
        self.scripted_failure().await?;
        let state = self.state.read().await;
        Ok(Reputation {
            address: address.to_string(),
            score: state.reputation.get(address).copied().unwrap_or(0.0),
        })
    }

    async fn receipts_by_payer(&self, address: &str) -> GatewayResult<Vec<ReceiptRecord>> {
        self.calls.receipts.fetch_add(1, Ordering::SeqCst);
        self.scripted_failure().await?;
        let state = self.state.read().await;
        Ok(state
            .receipts
            .iter()
            .filter(|r| r.payer_address == address)
            .cloned()
            .collect())
    }

    async fn receipts_by_merchant(&self, address: &str) -> GatewayResult<Vec<ReceiptRecord>> {
        self.calls.receipts.fetch_add(1, Ordering::SeqCst);
        self.scripted_failure().await?;
        let state = self.state.read().await;
        Ok(state
            .receipts
            .iter()
            .filter(|r| r.merchant_address == address)
            .cloned()
            .collect())
    }

    async fn invoices(&self, merchant: &str) -> GatewayResult<Vec<Invoice>> {
        self.calls.invoices.fetch_add(1, Ordering::SeqCst);
        self.scripted_failure().await?;
        let state = self.state.read().await;
        Ok(state
            .invoices
            .iter()
            .filter(|inv| inv.merchant_address == merchant)
            .cloned()
            .collect())
    }
}
