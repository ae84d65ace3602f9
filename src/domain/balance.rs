use super::amount::MinorUnits;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of the vault (agent) whose balance is tracked.
pub type OwnerId = u32;

/// Last known spendable balance of a vault.
///
/// Only the minor-unit amount is held; `display_amount` is computed on demand so
/// it can never drift from the authoritative value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultBalance {
    pub owner_id: OwnerId,
    pub spendable: MinorUnits,
}

impl VaultBalance {
    pub fn new(owner_id: OwnerId, spendable: impl Into<MinorUnits>) -> Self {
        Self {
            owner_id,
            spendable: spendable.into(),
        }
    }

    pub fn display_amount(&self) -> Decimal {
        self.spendable.to_display()
    }

    /// Whether `amount` fits into the spendable balance.
    pub fn covers(&self, amount: MinorUnits) -> bool {
        amount <= self.spendable
    }
}
