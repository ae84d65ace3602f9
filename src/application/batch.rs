use super::payment::{AttemptState, PaymentAttempt, PaymentWorkflow};
use crate::error::Result;
use serde::Deserialize;

/// One row of agent payment instructions; `amount` is in display units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentInstruction {
    pub recipient: String,
    pub amount: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub attempts: Vec<PaymentAttempt>,
    /// Instructions that could not be read, with their reason.
    pub skipped: Vec<String>,
    /// Set when an unknown-status payment stopped the run.
    pub halted: bool,
}

impl BatchReport {
    pub fn count(&self, state: AttemptState) -> usize {
        self.attempts.iter().filter(|a| a.state() == state).count()
    }
}

/// Feeds instructions through the payment workflow one at a time.
///
/// Stops at the first payment whose status is unknown: the held balance can no
/// longer be trusted and resubmitting is unsafe.
pub async fn run_batch<I>(workflow: &PaymentWorkflow, instructions: I) -> BatchReport
where
    I: IntoIterator<Item = Result<PaymentInstruction>>,
{
    let mut report = BatchReport::default();

    for instruction in instructions {
        let instruction = match instruction {
            Ok(instruction) => instruction,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable instruction");
                report.skipped.push(e.to_string());
                continue;
            }
        };

        let attempt = workflow
            .submit_input(&instruction.recipient, &instruction.amount)
            .await;
        let unknown = attempt.state() == AttemptState::Unreachable;
        report.attempts.push(attempt);

        if unknown {
            tracing::error!(
                recipient = %instruction.recipient,
                amount = %instruction.amount,
                "halting batch after payment with unknown status"
            );
            report.halted = true;
            break;
        }
    }

    report
}
