use crate::config::GatewayConfig;
use crate::domain::amount::{Amount, MinorUnits};
use crate::domain::balance::{OwnerId, VaultBalance};
use crate::domain::invoice::Invoice;
use crate::domain::payment::{PaymentRecord, SettlementReceipt};
use crate::domain::ports::{GatewayResult, RemoteGateway};
use crate::domain::receipt::{ReceiptClaim, ReceiptRecord, Reputation, VerificationResult};
use crate::error::{GatewayError, PaymentError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Deserialize)]
struct VaultInfoResponse {
    id: OwnerId,
    #[serde(default)]
    vault_address: String,
    on_chain_lovelace: u64,
    #[serde(default)]
    on_chain_ada: Option<f64>,
}

#[derive(Serialize)]
struct PayRequest<'a> {
    merchant_address: &'a str,
    amount_lovelace: u64,
}

#[derive(Deserialize)]
struct PayResponse {
    tx_hash: String,
    #[serde(default)]
    receipt_nft_asset_id: Option<String>,
    reputation_score: f64,
    new_vault_balance_lovelace: u64,
}

#[derive(Serialize)]
struct MintReceiptRequest<'a> {
    tx_hash: &'a str,
    payer_address: &'a str,
    merchant_address: &'a str,
    amount_lovelace: u64,
}

#[derive(Deserialize)]
struct MintReceiptResponse {
    tx_hash: String,
    #[serde(default)]
    nft_asset_id: Option<String>,
    reputation_score: f64,
}

#[derive(Deserialize)]
struct AgentPaymentRow {
    id: u64,
    merchant_address: String,
    amount_lovelace: u64,
    #[serde(default)]
    tx_hash: Option<String>,
    #[serde(default)]
    receipt_nft_asset_id: Option<String>,
}

#[derive(Deserialize)]
struct ReputationResponse {
    address: String,
    score: f64,
}

#[derive(Deserialize)]
struct ReceiptRow {
    tx_hash: String,
    payer_address: String,
    merchant_address: String,
    amount_lovelace: u64,
    #[serde(default)]
    nft_asset_id: Option<String>,
}

impl From<ReceiptRow> for ReceiptRecord {
    fn from(row: ReceiptRow) -> Self {
        Self {
            transaction_reference: row.tx_hash,
            payer_address: row.payer_address,
            merchant_address: row.merchant_address,
            amount: MinorUnits(row.amount_lovelace),
            receipt_token: row.nft_asset_id.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct InvoiceRow {
    invoice_id: String,
    merchant_address: String,
    #[serde(default)]
    customer_address: Option<String>,
    amount_lovelace: u64,
    #[serde(default)]
    description: Option<String>,
    status: String,
    #[serde(default)]
    nft_asset_id: Option<String>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Self {
            invoice_id: row.invoice_id,
            merchant_address: row.merchant_address,
            customer_address: row.customer_address.filter(|a| !a.is_empty()),
            amount: MinorUnits(row.amount_lovelace),
            description: row.description,
            status: row.status,
            receipt_token: row.nft_asset_id.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Gateway speaking JSON over HTTP to the payment backend.
///
/// One request per call, no retries. Outcomes are classified as follows:
/// no response → `Unreachable`, non-2xx → `RejectedByService`, undecodable 2xx
/// body → `MalformedResponse`.
#[derive(Clone)]
pub struct HttpGateway {
    base: Url,
    client: Client,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base: config.api_base.clone(),
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // base is validated as http(s) by GatewayConfig, so it always has segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> GatewayResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        let status = response.status();
        let url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Unreachable(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let reason = rejection_reason(&body).unwrap_or_else(|| format!("service returned {status}"));
            tracing::debug!(url = %url, status = %status, reason = %reason, "request rejected");
            return Err(GatewayError::RejectedByService(reason));
        }

        serde_json::from_slice(&body).map_err(|e| {
            tracing::debug!(url = %url, error = %e, "undecodable response body");
            GatewayError::MalformedResponse(e.to_string())
        })
    }
}

/// Extracts the `detail` field of an error body. FastAPI-style validation errors
/// carry a structured detail, which is passed on as JSON text.
fn rejection_reason(body: &[u8]) -> Option<String> {
    let detail = serde_json::from_slice::<ErrorBody>(body).ok()?.detail?;
    match detail {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text),
        serde_json::Value::String(_) | serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn non_empty(field: &str, value: String) -> GatewayResult<String> {
    if value.trim().is_empty() {
        Err(GatewayError::MalformedResponse(format!("empty {field}")))
    } else {
        Ok(value)
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn query_balance(&self, owner: OwnerId) -> GatewayResult<VaultBalance> {
        let request = self
            .client
            .get(self.endpoint(&["api", "agent", "vault-info"]))
            .query(&[("agent_id", owner)]);
        let info: VaultInfoResponse = self.send(request).await?;

        let balance = VaultBalance::new(info.id, info.on_chain_lovelace);
        if let Some(reported) = info.on_chain_ada {
            let derived = info.on_chain_lovelace as f64 / 1_000_000.0;
            if (derived - reported).abs() > 1e-6 {
                tracing::warn!(
                    vault = %info.vault_address,
                    reported,
                    derived,
                    "service display amount disagrees with lovelace balance"
                );
            }
        }
        Ok(balance)
    }

    async fn submit_payment(
        &self,
        recipient: &str,
        amount: Amount,
    ) -> GatewayResult<SettlementReceipt> {
        let request = self
            .client
            .post(self.endpoint(&["api", "agent", "pay"]))
            .json(&PayRequest {
                merchant_address: recipient,
                amount_lovelace: amount.value(),
            });
        let paid: PayResponse = self.send(request).await?;

        Ok(SettlementReceipt {
            transaction_reference: non_empty("tx_hash", paid.tx_hash)?,
            receipt_token: paid.receipt_nft_asset_id.filter(|t| !t.is_empty()),
            reputation_score: paid.reputation_score,
            updated_spendable: MinorUnits(paid.new_vault_balance_lovelace),
        })
    }

    async fn verify_and_notarize(&self, claim: &ReceiptClaim) -> GatewayResult<VerificationResult> {
        let request = self
            .client
            .post(self.endpoint(&["api", "mint-receipt"]))
            .json(&MintReceiptRequest {
                tx_hash: &claim.transaction_reference,
                payer_address: &claim.claimed_payer,
                merchant_address: &claim.claimed_recipient,
                amount_lovelace: claim.claimed_amount.value(),
            });
        let minted: MintReceiptResponse = self.send(request).await?;

        Ok(VerificationResult {
            confirmed_transaction_reference: non_empty("tx_hash", minted.tx_hash)?,
            receipt_token: minted.nft_asset_id.filter(|t| !t.is_empty()),
            reputation_score: minted.reputation_score,
        })
    }

    async fn list_payments(&self, owner: OwnerId) -> GatewayResult<Vec<PaymentRecord>> {
        let request = self
            .client
            .get(self.endpoint(&["api", "agent", "payments"]))
            .query(&[("agent_id", owner)]);
        let rows: Vec<AgentPaymentRow> = self.send(request).await?;

        Ok(rows
            .into_iter()
            .map(|row| PaymentRecord {
                id: row.id,
                recipient_address: row.merchant_address,
                amount: MinorUnits(row.amount_lovelace),
                transaction_reference: row.tx_hash.filter(|t| !t.is_empty()),
                receipt_token: row.receipt_nft_asset_id.filter(|t| !t.is_empty()),
            })
            .collect())
    }

    async fn reputation(&self, address: &str) -> GatewayResult<Reputation> {
        let request = self.client.get(self.endpoint(&["api", "reputation", address]));
        let reputation: ReputationResponse = self.send(request).await?;
        Ok(Reputation {
            address: reputation.address,
            score: reputation.score,
        })
    }

    async fn receipts_by_payer(&self, address: &str) -> GatewayResult<Vec<ReceiptRecord>> {
        let request = self
            .client
            .get(self.endpoint(&["api", "receipts", "by-user", address]));
        let rows: Vec<ReceiptRow> = self.send(request).await?;
        Ok(rows.into_iter().map(ReceiptRecord::from).collect())
    }

    async fn receipts_by_merchant(&self, address: &str) -> GatewayResult<Vec<ReceiptRecord>> {
        let request = self
            .client
            .get(self.endpoint(&["api", "receipts", "by-merchant", address]));
        let rows: Vec<ReceiptRow> = self.send(request).await?;
        Ok(rows.into_iter().map(ReceiptRecord::from).collect())
    }

    async fn invoices(&self, merchant: &str) -> GatewayResult<Vec<Invoice>> {
        let request = self.client.get(self.endpoint(&["api", "invoices", merchant]));
        let rows: Vec<InvoiceRow> = self.send(request).await?;
        Ok(rows.into_iter().map(Invoice::from).collect())
    }
}
