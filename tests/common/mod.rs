#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, Semaphore};
use vaultpay::application::balance::BalanceHolder;
use vaultpay::application::history::PaymentHistory;
use vaultpay::application::payment::PaymentWorkflow;
use vaultpay::domain::amount::Amount;
use vaultpay::domain::balance::{OwnerId, VaultBalance};
use vaultpay::domain::invoice::Invoice;
use vaultpay::domain::payment::{PaymentIntent, PaymentRecord, SettlementReceipt};
use vaultpay::domain::ports::{GatewayResult, RemoteGateway};
use vaultpay::domain::receipt::{ReceiptClaim, ReceiptRecord, Reputation, VerificationResult};
use vaultpay::infrastructure::in_memory::InMemoryGateway;

pub const OWNER: OwnerId = 1;

pub fn intent(recipient: &str, amount: u64) -> PaymentIntent {
    PaymentIntent::new(recipient, Amount::new(amount).unwrap()).unwrap()
}

/// Workflow wired to `gateway`, with the balance already loaded.
pub async fn loaded_workflow<G: RemoteGateway + 'static>(gateway: Arc<G>) -> PaymentWorkflow {
    let holder = Arc::new(BalanceHolder::new(OWNER, gateway.clone()));
    holder.refresh().await.unwrap();
    PaymentWorkflow::new(gateway, holder, Arc::new(PaymentHistory::new()))
}

/// Holds one call at the gateway boundary until released.
pub struct Gate {
    armed: AtomicBool,
    entered: Notify,
    release: Semaphore,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }

    /// The next call through this gate will block.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Waits until the armed call has reached the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.release.add_permits(1);
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.acquire().await.unwrap().forget();
        }
    }
}

/// In-memory service whose calls can be held at chosen points.
///
/// `balance_gate` and `settlement_gate` hold an answer the service has already
/// produced. `submission_gate` holds a payment before the service processes it.
pub struct GatedGateway {
    pub inner: InMemoryGateway,
    pub balance_gate: Gate,
    pub submission_gate: Gate,
    pub settlement_gate: Gate,
}

impl GatedGateway {
    pub fn new(inner: InMemoryGateway) -> Self {
        Self {
            inner,
            balance_gate: Gate::new(),
            submission_gate: Gate::new(),
            settlement_gate: Gate::new(),
        }
    }
}

#[async_trait]
impl RemoteGateway for GatedGateway {
    async fn query_balance(&self, owner: OwnerId) -> GatewayResult<VaultBalance> {
        let answer = self.inner.query_balance(owner).await;
        self.balance_gate.pass().await;
        answer
    }

    async fn submit_payment(
        &self,
        recipient: &str,
        amount: Amount,
    ) -> GatewayResult<SettlementReceipt> {
        self.submission_gate.pass().await;
        let answer = self.inner.submit_payment(recipient, amount).await;
        self.settlement_gate.pass().await;
        answer
    }

    async fn verify_and_notarize(&self, claim: &ReceiptClaim) -> GatewayResult<VerificationResult> {
        self.inner.verify_and_notarize(claim).await
    }

    async fn list_payments(&self, owner: OwnerId) -> GatewayResult<Vec<PaymentRecord>> {
        self.inner.list_payments(owner).await
    }

    async fn reputation(&self, address: &str) -> GatewayResult<Reputation> {
        self.inner.reputation(address).await
    }

    async fn receipts_by_payer(&self, address: &str) -> GatewayResult<Vec<ReceiptRecord>> {
        self.inner.receipts_by_payer(address).await
    }

    async fn receipts_by_merchant(&self, address: &str) -> GatewayResult<Vec<ReceiptRecord>> {
        self.inner.receipts_by_merchant(address).await
    }

    async fn invoices(&self, merchant: &str) -> GatewayResult<Vec<Invoice>> {
        self.inner.invoices(merchant).await
    }
}
