use super::balance::BalanceHolder;
use super::history::PaymentHistory;
use crate::domain::payment::{PaymentIntent, PaymentResult};
use crate::domain::ports::GatewayRef;
use crate::error::{GatewayError, PaymentError};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Lifecycle of one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Validating,
    Submitting,
    Settled,
    Rejected,
    Unreachable,
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Rejected | Self::Unreachable)
    }

    pub fn can_transition_to(&self, next: AttemptState) -> bool {
        use AttemptState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Submitting)
                | (Validating, Rejected)
                | (Submitting, Settled)
                | (Submitting, Rejected)
                | (Submitting, Unreachable)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Caught locally; the gateway was never called.
    ClientValidation(String),
    /// The settlement service declined the payment.
    Service(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientValidation(reason) => write!(f, "{reason}"),
            Self::Service(reason) => write!(f, "rejected by service: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Settled(PaymentResult),
    Rejected(Rejection),
    /// No usable answer came back. The payment may or may not have settled.
    Unreachable(GatewayError),
}

impl PaymentOutcome {
    /// Human-readable reason for the terminal state.
    pub fn reason(&self) -> String {
        match self {
            Self::Settled(result) => format!(
                "payment settled: {} ({} minor units to {})",
                result.transaction_reference, result.amount, result.recipient_address
            ),
            Self::Rejected(rejection) => rejection.to_string(),
            Self::Unreachable(cause) => {
                format!("payment status unknown: check history before retrying ({cause})")
            }
        }
    }

    fn state(&self) -> AttemptState {
        match self {
            Self::Settled(_) => AttemptState::Settled,
            Self::Rejected(_) => AttemptState::Rejected,
            Self::Unreachable(_) => AttemptState::Unreachable,
        }
    }
}

/// Record of a single submission. Once terminal it cannot change.
#[derive(Debug, Clone)]
pub struct PaymentAttempt {
    id: u64,
    intent: Option<PaymentIntent>,
    trail: Vec<AttemptState>,
    outcome: Option<PaymentOutcome>,
}

impl PaymentAttempt {
    fn new(id: u64) -> Self {
        Self {
            id,
            intent: None,
            trail: vec![AttemptState::Idle],
            outcome: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn intent(&self) -> Option<&PaymentIntent> {
        self.intent.as_ref()
    }

    pub fn state(&self) -> AttemptState {
        self.trail.last().copied().unwrap_or(AttemptState::Idle)
    }

    /// Every state the attempt passed through, starting at `Idle`.
    pub fn trail(&self) -> &[AttemptState] {
        &self.trail
    }

    pub fn outcome(&self) -> Option<&PaymentOutcome> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<PaymentOutcome> {
        self.outcome
    }

    pub fn reason(&self) -> Option<String> {
        self.outcome.as_ref().map(PaymentOutcome::reason)
    }

    fn advance(&mut self, next: AttemptState) {
        debug_assert!(
            self.state().can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state(),
            next
        );
        tracing::debug!(attempt = self.id, from = ?self.state(), to = ?next, "payment attempt transition");
        self.trail.push(next);
    }

    fn finish(mut self, outcome: PaymentOutcome) -> Self {
        self.advance(outcome.state());
        self.outcome = Some(outcome);
        self
    }
}

/// Releases the in-flight flag when the attempt ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Validates payment intents, submits them once, and applies the authoritative
/// result.
///
/// Shared by interactive commands and the agent batch runner. Only one attempt
/// may be in flight at a time; a second submission meanwhile is rejected locally.
pub struct PaymentWorkflow {
    gateway: GatewayRef,
    balance: Arc<BalanceHolder>,
    history: Arc<PaymentHistory>,
    in_flight: AtomicBool,
    next_attempt: AtomicU64,
}

impl PaymentWorkflow {
    pub fn new(
        gateway: GatewayRef,
        balance: Arc<BalanceHolder>,
        history: Arc<PaymentHistory>,
    ) -> Self {
        Self {
            gateway,
            balance,
            history,
            in_flight: AtomicBool::new(false),
            next_attempt: AtomicU64::new(1),
        }
    }

    pub fn balance(&self) -> &Arc<BalanceHolder> {
        &self.balance
    }

    pub fn history(&self) -> &Arc<PaymentHistory> {
        &self.history
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Submits a validated intent.
    pub async fn submit(&self, intent: PaymentIntent) -> PaymentAttempt {
        self.run(Ok(intent)).await
    }

    /// Builds the intent from raw input (amount in display units) and submits it.
    /// Input errors end the attempt as a client-side rejection.
    pub async fn submit_input(&self, recipient: &str, amount: &str) -> PaymentAttempt {
        self.run(PaymentIntent::from_input(recipient, amount)).await
    }

    async fn run(&self, intent: Result<PaymentIntent, PaymentError>) -> PaymentAttempt {
        let mut attempt = PaymentAttempt::new(self.next_attempt.fetch_add(1, Ordering::SeqCst));

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            attempt.advance(AttemptState::Validating);
            return self.reject_locally(attempt, "A payment is already in flight".to_string());
        }
        let _guard = InFlight(&self.in_flight);

        attempt.advance(AttemptState::Validating);
        let intent = match intent {
            Ok(intent) => intent,
            Err(PaymentError::ClientValidation(reason)) => {
                return self.reject_locally(attempt, reason);
            }
            Err(other) => return self.reject_locally(attempt, other.to_string()),
        };
        attempt.intent = Some(intent.clone());

        if let Err(reason) = self.validate(&intent).await {
            return self.reject_locally(attempt, reason);
        }

        attempt.advance(AttemptState::Submitting);
        let response = self
            .gateway
            .submit_payment(intent.recipient(), intent.amount())
            .await;

        let receipt = match response {
            Ok(receipt) => receipt,
            Err(GatewayError::RejectedByService(reason)) => {
                tracing::info!(attempt = attempt.id, reason = %reason, "payment rejected by service");
                return attempt.finish(PaymentOutcome::Rejected(Rejection::Service(reason)));
            }
            Err(cause) => {
                tracing::warn!(
                    attempt = attempt.id,
                    recipient = intent.recipient(),
                    amount = intent.amount().value(),
                    error = %cause,
                    "payment status unknown"
                );
                return attempt.finish(PaymentOutcome::Unreachable(cause));
            }
        };

        let result = PaymentResult::from_settlement(&intent, self.balance.owner(), receipt);

        // History first: no reader may see the new balance without its entry.
        self.history.append(result.clone()).await;
        self.balance
            .apply_authoritative(result.updated_balance)
            .await;

        tracing::info!(
            attempt = attempt.id,
            tx = %result.transaction_reference,
            amount = result.amount.value(),
            spendable = %result.updated_balance.spendable,
            "payment settled"
        );
        attempt.finish(PaymentOutcome::Settled(result))
    }

    async fn validate(&self, intent: &PaymentIntent) -> Result<(), String> {
        match self.balance.get_balance().await {
            Some(known) if !known.covers(intent.amount().minor_units()) => Err(format!(
                "Insufficient balance: {} minor units requested, {} available",
                intent.amount(),
                known.spendable
            )),
            Some(_) => Ok(()),
            None => {
                tracing::debug!("no balance loaded yet, leaving the funds check to the service");
                Ok(())
            }
        }
    }

    fn reject_locally(&self, attempt: PaymentAttempt, reason: String) -> PaymentAttempt {
        tracing::info!(attempt = attempt.id, reason = %reason, "payment rejected before submission");
        attempt.finish(PaymentOutcome::Rejected(Rejection::ClientValidation(reason)))
    }
}
