mod common;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::{OWNER, intent};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use vaultpay::application::balance::BalanceHolder;
use vaultpay::application::history::PaymentHistory;
use vaultpay::application::merchant::MerchantView;
use vaultpay::application::payment::{AttemptState, PaymentWorkflow};
use vaultpay::config::GatewayConfig;
use vaultpay::domain::amount::{Amount, MinorUnits};
use vaultpay::domain::balance::VaultBalance;
use vaultpay::domain::ports::RemoteGateway;
use vaultpay::domain::receipt::{ReceiptClaim, ReputationTier};
use vaultpay::error::GatewayError;
use vaultpay::infrastructure::http::HttpGateway;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn gateway(base: &str, timeout_ms: u64) -> HttpGateway {
    HttpGateway::new(&GatewayConfig::new(base, timeout_ms).unwrap()).unwrap()
}

fn backend() -> Router {
    Router::new()
        .route(
            "/api/agent/vault-info",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let id: u32 = params
                    .get("agent_id")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                Json(json!({
                    "id": id,
                    "name": "Agent",
                    "vault_address": "addr_vault",
                    "on_chain_lovelace": 100_000_000u64,
                    "on_chain_ada": 100.0
                }))
            }),
        )
        .route(
            "/api/agent/pay",
            post(|Json(body): Json<Value>| async move {
                let amount = body["amount_lovelace"].as_u64().unwrap_or(0);
                if amount > 100_000_000 {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"detail": "Insufficient funds in vault"})),
                    );
                }
                // the service reserves a fee on top of the amount
                let remaining = 100_000_000 - amount - 180_000;
                (
                    StatusCode::OK,
                    Json(json!({
                        "agent_id": 1,
                        "vault_address": "addr_vault",
                        "merchant_address": body["merchant_address"],
                        "amount_lovelace": amount,
                        "tx_hash": "tx123",
                        "receipt_nft_asset_id": "nft_tx123",
                        "reputation_score": 3.0,
                        "new_vault_balance_lovelace": remaining,
                        "new_vault_balance_ada": remaining as f64 / 1_000_000.0
                    })),
                )
            }),
        )
        .route(
            "/api/mint-receipt",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "tx_hash": body["tx_hash"],
                    "nft_asset_id": null,
                    "reputation_score": 7.5
                }))
            }),
        )
        .route(
            "/api/agent/payments",
            get(|| async {
                Json(json!([
                    {"id": 1, "merchant_address": "addr_X", "amount_lovelace": 25_000_000u64,
                     "tx_hash": "tx123", "receipt_nft_asset_id": "nft_tx123"},
                    {"id": 2, "merchant_address": "addr_Y", "amount_lovelace": 1_000_000u64,
                     "tx_hash": null}
                ]))
            }),
        )
        .route(
            "/api/reputation/:address",
            get(|Path(address): Path<String>| async move {
                Json(json!({"address": address, "score": 4.0}))
            }),
        )
        .route(
            "/api/receipts/by-user/:address",
            get(|Path(address): Path<String>| async move {
                Json(json!([
                    {"tx_hash": "tx123", "payer_address": address, "merchant_address": "addr_X",
                     "amount_lovelace": 25_000_000u64, "nft_asset_id": "nft_tx123"}
                ]))
            }),
        )
        .route(
            "/api/receipts/by-merchant/:address",
            get(|Path(address): Path<String>| async move {
                Json(json!([
                    {"tx_hash": "tx1", "payer_address": "p1", "merchant_address": address,
                     "amount_lovelace": 1_000_000u64},
                    {"tx_hash": "tx2", "payer_address": "p2", "merchant_address": address,
                     "amount_lovelace": 2_000_000u64, "nft_asset_id": ""}
                ]))
            }),
        )
        .route(
            "/api/invoices/:merchant",
            get(|Path(merchant): Path<String>| async move {
                Json(json!([
                    {"invoice_id": "inv-1", "merchant_address": merchant,
                     "customer_address": null, "amount_lovelace": 5_000_000u64,
                     "description": "coffee", "status": "pending", "nft_asset_id": null}
                ]))
            }),
        )
}

#[tokio::test]
async fn test_http_payment_round_trip() {
    let base = serve(backend()).await;
    let gateway = Arc::new(gateway(&base, 2_000));
    let holder = Arc::new(BalanceHolder::new(OWNER, gateway.clone()));
    assert_eq!(
        holder.refresh().await.unwrap().balance,
        VaultBalance::new(OWNER, 100_000_000)
    );

    let workflow = PaymentWorkflow::new(gateway, holder.clone(), Arc::new(PaymentHistory::new()));
    let attempt = workflow.submit(intent("addr_X", 25_000_000)).await;

    assert_eq!(attempt.state(), AttemptState::Settled);
    assert_eq!(
        holder.get_balance().await,
        Some(VaultBalance::new(OWNER, 74_820_000))
    );
    let entries = workflow.history().entries().await;
    assert_eq!(entries[0].transaction_reference, "tx123");
    assert_eq!(entries[0].receipt_token.as_deref(), Some("nft_tx123"));
}

#[tokio::test]
async fn test_http_rejection_carries_detail() {
    let base = serve(backend()).await;
    let gateway = gateway(&base, 2_000);

    let err = gateway
        .submit_payment("addr_X", Amount::new(500_000_000).unwrap())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GatewayError::RejectedByService("Insufficient funds in vault".to_string())
    );
}

#[tokio::test]
async fn test_http_verification_without_receipt() {
    let base = serve(backend()).await;
    let gateway = gateway(&base, 2_000);
    let claim = ReceiptClaim::new("tx123", "addr_vault", "addr_X", Amount::new(1).unwrap()).unwrap();

    let result = gateway.verify_and_notarize(&claim).await.unwrap();

    assert_eq!(result.confirmed_transaction_reference, "tx123");
    assert_eq!(result.receipt_token, None);
    assert_eq!(result.reputation_score, 7.5);
}

#[tokio::test]
async fn test_http_list_payments_keeps_service_order() {
    let base = serve(backend()).await;
    let gateway = gateway(&base, 2_000);

    let records = gateway.list_payments(OWNER).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].transaction_reference.as_deref(), Some("tx123"));
    assert_eq!(records[0].amount, MinorUnits(25_000_000));
    assert_eq!(records[1].transaction_reference, None);
    assert_eq!(records[1].receipt_token, None);
}

#[tokio::test]
async fn test_http_reputation() {
    let base = serve(backend()).await;
    let gateway = gateway(&base, 2_000);

    let reputation = gateway.reputation("addr_X").await.unwrap();

    assert_eq!(reputation.address, "addr_X");
    assert_eq!(reputation.score, 4.0);
}

#[tokio::test]
async fn test_http_receipt_listings() {
    let base = serve(backend()).await;
    let gateway = gateway(&base, 2_000);

    let paid = gateway.receipts_by_payer("addr_vault").await.unwrap();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].payer_address, "addr_vault");
    assert_eq!(paid[0].amount, MinorUnits(25_000_000));
    assert_eq!(paid[0].receipt_token.as_deref(), Some("nft_tx123"));

    let received = gateway.receipts_by_merchant("shop").await.unwrap();
    let refs: Vec<_> = received.iter().map(|r| r.transaction_reference.as_str()).collect();
    assert_eq!(refs, ["tx1", "tx2"]);
    assert!(received.iter().all(|r| r.merchant_address == "shop"));
    assert!(received.iter().all(|r| r.receipt_token.is_none()));
}

#[tokio::test]
async fn test_http_invoices() {
    let base = serve(backend()).await;
    let invoices = gateway(&base, 2_000).invoices("shop").await.unwrap();

    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].invoice_id, "inv-1");
    assert_eq!(invoices[0].merchant_address, "shop");
    assert_eq!(invoices[0].customer_address, None);
    assert_eq!(invoices[0].amount, MinorUnits(5_000_000));
    assert_eq!(invoices[0].status, "pending");
}

#[tokio::test]
async fn test_http_merchant_summary() {
    let base = serve(backend()).await;
    let view = MerchantView::new(Arc::new(gateway(&base, 2_000)));

    let summary = view.summary("shop").await.unwrap();

    assert_eq!(summary.tier(), ReputationTier::Bronze);
    assert_eq!(summary.total_receipts(), 2);
    assert_eq!(summary.total_volume(), MinorUnits(3_000_000));
    assert_eq!(summary.average_ticket(), Decimal::new(15, 1));
}

#[tokio::test]
async fn test_http_malformed_response() {
    let app = Router::new()
        .route("/api/agent/pay", post(|| async { "payment accepted" }))
        .route(
            "/api/agent/vault-info",
            get(|| async { Json(json!({"id": 1, "balance": "lots"})) }),
        );
    let base = serve(app).await;
    let gateway = gateway(&base, 2_000);

    let paid = gateway
        .submit_payment("addr_X", Amount::new(1).unwrap())
        .await;
    assert!(matches!(paid, Err(GatewayError::MalformedResponse(_))));

    let balance = gateway.query_balance(OWNER).await;
    assert!(matches!(balance, Err(GatewayError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_http_empty_tx_hash_is_malformed() {
    let app = Router::new().route(
        "/api/agent/pay",
        post(|| async {
            Json(json!({
                "tx_hash": "",
                "reputation_score": 0.0,
                "new_vault_balance_lovelace": 0u64
            }))
        }),
    );
    let base = serve(app).await;

    let paid = gateway(&base, 2_000)
        .submit_payment("addr_X", Amount::new(1).unwrap())
        .await;
    assert!(matches!(paid, Err(GatewayError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_http_server_error_without_detail() {
    let app = Router::new().route(
        "/api/agent/vault-info",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = serve(app).await;

    let err = gateway(&base, 2_000).query_balance(OWNER).await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::RejectedByService("service returned 500 Internal Server Error".to_string())
    );
}

#[tokio::test]
async fn test_http_closed_port_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = gateway(&format!("http://{addr}"), 2_000)
        .query_balance(OWNER)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unreachable(_)));
}

#[tokio::test]
async fn test_http_timeout_is_unreachable() {
    let app = Router::new().route(
        "/api/agent/pay",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({}))
        }),
    );
    let base = serve(app).await;

    let err = gateway(&base, 200)
        .submit_payment("addr_X", Amount::new(1).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unreachable(_)));
}
