mod common;

use common::{GatedGateway, OWNER, intent, loaded_workflow};
use std::sync::Arc;
use vaultpay::application::balance::WriteOutcome;
use vaultpay::application::payment::{AttemptState, PaymentOutcome, Rejection};
use vaultpay::domain::balance::VaultBalance;
use vaultpay::domain::ports::RemoteGateway;
use vaultpay::infrastructure::in_memory::InMemoryGateway;

#[tokio::test]
async fn test_stale_refresh_cannot_overwrite_settlement() {
    let gateway = Arc::new(GatedGateway::new(InMemoryGateway::new(OWNER, 100_000_000)));
    let workflow = Arc::new(loaded_workflow(gateway.clone()).await);

    // refresh is answered with 100 ADA but held before reaching the holder
    gateway.balance_gate.arm();
    let refresh = {
        let holder = workflow.balance().clone();
        tokio::spawn(async move { holder.refresh().await })
    };
    gateway.balance_gate.wait_entered().await;

    let attempt = workflow.submit(intent("addr_X", 25_000_000)).await;
    assert_eq!(attempt.state(), AttemptState::Settled);

    gateway.balance_gate.open();
    let refreshed = refresh.await.unwrap().unwrap();

    assert!(matches!(refreshed.outcome, WriteOutcome::Superseded { .. }));
    assert_eq!(refreshed.balance, VaultBalance::new(OWNER, 75_000_000));
    assert_eq!(
        workflow.balance().get_balance().await,
        Some(VaultBalance::new(OWNER, 75_000_000))
    );
}

#[tokio::test]
async fn test_refresh_before_service_processes_payment_cannot_hide_settlement() {
    let gateway = Arc::new(GatedGateway::new(InMemoryGateway::new(OWNER, 100_000_000)));
    let workflow = Arc::new(loaded_workflow(gateway.clone()).await);

    gateway.submission_gate.arm();
    let payment = {
        let workflow = workflow.clone();
        tokio::spawn(async move { workflow.submit(intent("addr_X", 25_000_000)).await })
    };
    gateway.submission_gate.wait_entered().await;

    // the ledger has not seen the payment yet
    let refreshed = workflow.balance().refresh().await.unwrap();
    assert!(refreshed.was_applied());
    assert_eq!(refreshed.balance, VaultBalance::new(OWNER, 100_000_000));

    gateway.submission_gate.open();
    let attempt = payment.await.unwrap();
    assert_eq!(attempt.state(), AttemptState::Settled);

    let remote = gateway.inner.query_balance(OWNER).await.unwrap();
    assert_eq!(remote, VaultBalance::new(OWNER, 75_000_000));
    assert_eq!(workflow.history().len().await, 1);
    assert_eq!(workflow.balance().get_balance().await, Some(remote));
}

#[tokio::test]
async fn test_settlement_beats_refresh_answered_while_in_flight() {
    let gateway = Arc::new(GatedGateway::new(InMemoryGateway::new(OWNER, 100_000_000)));
    let workflow = Arc::new(loaded_workflow(gateway.clone()).await);

    gateway.settlement_gate.arm();
    let payment = {
        let workflow = workflow.clone();
        tokio::spawn(async move { workflow.submit(intent("addr_X", 25_000_000)).await })
    };
    gateway.settlement_gate.wait_entered().await;

    // an external deposit lands while the settlement response is on its way
    gateway.inner.set_balance(90_000_000).await;
    let during = workflow.balance().refresh().await.unwrap();
    assert!(during.was_applied());
    assert_eq!(during.balance, VaultBalance::new(OWNER, 90_000_000));

    gateway.settlement_gate.open();
    let attempt = payment.await.unwrap();
    assert_eq!(attempt.state(), AttemptState::Settled);
    assert_eq!(
        workflow.balance().get_balance().await,
        Some(VaultBalance::new(OWNER, 75_000_000))
    );

    // only a refresh issued after the settlement resolved may replace it
    let after = workflow.balance().refresh().await.unwrap();
    assert!(after.was_applied());
    assert_eq!(after.balance, VaultBalance::new(OWNER, 90_000_000));
}

#[tokio::test]
async fn test_second_submission_rejected_while_in_flight() {
    let gateway = Arc::new(GatedGateway::new(InMemoryGateway::new(OWNER, 100_000_000)));
    let workflow = Arc::new(loaded_workflow(gateway.clone()).await);

    gateway.settlement_gate.arm();
    let first = {
        let workflow = workflow.clone();
        tokio::spawn(async move { workflow.submit(intent("addr_X", 1_000_000)).await })
    };
    gateway.settlement_gate.wait_entered().await;
    assert!(workflow.is_in_flight());

    let duplicate = workflow.submit(intent("addr_X", 1_000_000)).await;
    assert!(matches!(
        duplicate.outcome(),
        Some(PaymentOutcome::Rejected(Rejection::ClientValidation(_)))
    ));
    assert_eq!(gateway.inner.calls().submit_payment(), 1);

    gateway.settlement_gate.open();
    assert_eq!(first.await.unwrap().state(), AttemptState::Settled);
    assert!(!workflow.is_in_flight());

    let next = workflow.submit(intent("addr_X", 1_000_000)).await;
    assert_eq!(next.state(), AttemptState::Settled);
    assert_eq!(gateway.inner.calls().submit_payment(), 2);
}
