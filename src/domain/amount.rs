use crate::error::PaymentError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of minor units in one display unit (lovelace per ADA).
pub const MINOR_UNITS_PER_DISPLAY: u64 = 1_000_000;

/// Scale of the display amount; `display = minor / 10^DISPLAY_SCALE`.
const DISPLAY_SCALE: u32 = 6;

/// A quantity of the settlement asset in its smallest indivisible unit.
///
/// Balances are tracked in minor units only. The display value is always derived
/// from it and never stored on its own.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MinorUnits(pub u64);

impl MinorUnits {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Display amount, `minor / 10^6`.
    pub fn to_display(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), DISPLAY_SCALE)
    }
}

impl From<u64> for MinorUnits {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strictly positive payment amount in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Amount(MinorUnits);

impl Amount {
    pub fn new(value: u64) -> Result<Self, PaymentError> {
        if value > 0 {
            Ok(Self(MinorUnits(value)))
        } else {
            Err(PaymentError::ClientValidation(
                "Amount must be positive".to_string(),
            ))
        }
    }

    /// Converts a display amount into minor units, rounding half away from zero.
    pub fn from_display(value: Decimal) -> Result<Self, PaymentError> {
        if value <= Decimal::ZERO {
            return Err(PaymentError::ClientValidation(
                "Amount must be positive".to_string(),
            ));
        }
        let minor = value
            .checked_mul(Decimal::from(MINOR_UNITS_PER_DISPLAY))
            .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|scaled| scaled.to_u64())
            .ok_or_else(|| PaymentError::ClientValidation("Amount is too large".to_string()))?;
        Self::new(minor)
    }

    pub fn minor_units(&self) -> MinorUnits {
        self.0
    }

    pub fn value(&self) -> u64 {
        self.0.0
    }

    pub fn to_display(&self) -> Decimal {
        self.0.to_display()
    }
}

impl TryFrom<u64> for Amount {
    type Error = PaymentError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0.0
    }
}

impl From<Amount> for MinorUnits {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Parses a display amount such as `"2.5"`.
impl FromStr for Amount {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|_| PaymentError::ClientValidation(format!("Invalid amount: {s:?}")))?;
        Self::from_display(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
