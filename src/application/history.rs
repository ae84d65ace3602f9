use crate::domain::balance::OwnerId;
use crate::domain::payment::{PaymentRecord, PaymentResult};
use crate::domain::ports::GatewayRef;
use crate::error::GatewayError;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Append-only list of payments settled in this session, in arrival order.
#[derive(Default)]
pub struct PaymentHistory {
    entries: RwLock<Vec<PaymentResult>>,
}

impl PaymentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, result: PaymentResult) {
        self.entries.write().await.push(result);
    }

    pub async fn entries(&self) -> Vec<PaymentResult> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn contains(&self, transaction_reference: &str) -> bool {
        self.entries
            .read()
            .await
            .iter()
            .any(|e| e.transaction_reference == transaction_reference)
    }
}

/// Remote payment listing compared against the local session history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Everything the service reports, in service order.
    pub remote: Vec<PaymentRecord>,
    /// Settled on the service but never seen settling locally, e.g. a submission
    /// that came back unreachable.
    pub unknown_locally: Vec<PaymentRecord>,
    /// Stored by the service without a transaction reference.
    pub unsettled: Vec<PaymentRecord>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.unknown_locally.is_empty() && self.unsettled.is_empty()
    }
}

/// Read-only projection over the service's payment listing.
pub struct HistoryView {
    owner: OwnerId,
    gateway: GatewayRef,
}

impl HistoryView {
    pub fn new(owner: OwnerId, gateway: GatewayRef) -> Self {
        Self { owner, gateway }
    }

    /// Payments exactly as the service returns them.
    pub async fn list(&self) -> Result<Vec<PaymentRecord>, GatewayError> {
        self.gateway.list_payments(self.owner).await
    }

    pub async fn reconcile(&self, local: &PaymentHistory) -> Result<Reconciliation, GatewayError> {
        let remote = self.list().await?;
        let known: HashSet<String> = local
            .entries()
            .await
            .into_iter()
            .map(|e| e.transaction_reference)
            .collect();

        let mut unknown_locally = Vec::new();
        let mut unsettled = Vec::new();
        for record in &remote {
            match &record.transaction_reference {
                Some(reference) if !known.contains(reference) => {
                    unknown_locally.push(record.clone())
                }
                Some(_) => {}
                None => unsettled.push(record.clone()),
            }
        }

        tracing::info!(
            owner = self.owner,
            remote = remote.len(),
            unknown_locally = unknown_locally.len(),
            unsettled = unsettled.len(),
            "payment history reconciled"
        );

        Ok(Reconciliation {
            remote,
            unknown_locally,
            unsettled,
        })
    }
}
