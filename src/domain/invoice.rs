use super::amount::MinorUnits;
use serde::{Deserialize, Serialize};

/// A payment request issued by a merchant.
///
/// `customer_address` is `None` for invoices any payer may settle. `status` is
/// passed through from the service as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub merchant_address: String,
    pub customer_address: Option<String>,
    pub amount: MinorUnits,
    pub description: Option<String>,
    pub status: String,
    pub receipt_token: Option<String>,
}

impl Invoice {
    pub const PENDING: &'static str = "pending";
    pub const PAID: &'static str = "paid";
}
