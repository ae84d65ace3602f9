use crate::domain::amount::Amount;
use crate::domain::ports::GatewayRef;
use crate::domain::receipt::{ReceiptClaim, VerificationResult};
use crate::error::{GatewayError, PaymentError};

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Verified(VerificationResult),
    /// Caught locally; nothing was sent.
    ClientValidation(String),
    RejectedByService(String),
    Unreachable(String),
    MalformedResponse(String),
}

impl VerificationOutcome {
    pub fn reason(&self) -> String {
        match self {
            Self::Verified(result) => match &result.receipt_token {
                Some(token) => format!(
                    "verified {}, receipt {token}, reputation {}",
                    result.confirmed_transaction_reference, result.reputation_score
                ),
                None => format!(
                    "verified {}, no receipt minted, reputation {}",
                    result.confirmed_transaction_reference, result.reputation_score
                ),
            },
            Self::ClientValidation(reason) => reason.clone(),
            Self::RejectedByService(reason) => format!("rejected by service: {reason}"),
            Self::Unreachable(reason) => {
                format!("verification status unknown: service unreachable ({reason})")
            }
            Self::MalformedResponse(reason) => format!("malformed response: {reason}"),
        }
    }

    pub fn reputation_score(&self) -> Option<f64> {
        match self {
            Self::Verified(result) => Some(result.reputation_score),
            _ => None,
        }
    }
}

impl From<GatewayError> for VerificationOutcome {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::RejectedByService(reason) => Self::RejectedByService(reason),
            GatewayError::Unreachable(reason) => Self::Unreachable(reason),
            GatewayError::MalformedResponse(reason) => Self::MalformedResponse(reason),
        }
    }
}

/// Submits claimed transactions for verification and receipt minting.
///
/// Holds no balance or history; the reputation score is only reported back.
pub struct ReceiptWorkflow {
    gateway: GatewayRef,
}

impl ReceiptWorkflow {
    pub fn new(gateway: GatewayRef) -> Self {
        Self { gateway }
    }

    pub async fn verify(&self, claim: &ReceiptClaim) -> VerificationOutcome {
        match self.gateway.verify_and_notarize(claim).await {
            Ok(result) => {
                tracing::info!(
                    tx = %result.confirmed_transaction_reference,
                    minted = result.receipt_token.is_some(),
                    reputation = result.reputation_score,
                    "transaction verified"
                );
                VerificationOutcome::Verified(result)
            }
            Err(error) => {
                tracing::warn!(tx = %claim.transaction_reference, error = %error, "verification failed");
                error.into()
            }
        }
    }

    /// Validates raw input (amount in display units) before verifying.
    pub async fn verify_input(
        &self,
        transaction_reference: &str,
        payer: &str,
        recipient: &str,
        amount: &str,
    ) -> VerificationOutcome {
        let claim = amount
            .parse::<Amount>()
            .and_then(|amount| ReceiptClaim::new(transaction_reference, payer, recipient, amount));
        match claim {
            Ok(claim) => self.verify(&claim).await,
            Err(PaymentError::ClientValidation(reason)) => VerificationOutcome::ClientValidation(reason),
            Err(other) => VerificationOutcome::ClientValidation(other.to_string()),
        }
    }
}
