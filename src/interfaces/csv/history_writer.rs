use crate::domain::invoice::Invoice;
use crate::domain::payment::{PaymentRecord, PaymentResult};
use crate::domain::receipt::ReceiptRecord;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct HistoryRow<'a> {
    transaction_reference: &'a str,
    recipient: &'a str,
    amount_minor: u64,
    amount: Decimal,
    receipt_token: &'a str,
}

#[derive(Serialize)]
struct ReceiptRow<'a> {
    transaction_reference: &'a str,
    payer: &'a str,
    merchant: &'a str,
    amount_minor: u64,
    amount: Decimal,
    receipt_token: &'a str,
}

#[derive(Serialize)]
struct InvoiceRow<'a> {
    invoice_id: &'a str,
    customer: &'a str,
    amount_minor: u64,
    amount: Decimal,
    status: &'a str,
    description: &'a str,
    receipt_token: &'a str,
}

/// Writes payment history, receipts and invoices as CSV, one row per entry.
///
/// Nothing is written for an empty listing, not even the header.
pub struct HistoryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> HistoryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Payments settled in this session.
    pub fn write_results<'a>(
        &mut self,
        results: impl IntoIterator<Item = &'a PaymentResult>,
    ) -> Result<()> {
        for result in results {
            self.writer.serialize(HistoryRow {
                transaction_reference: &result.transaction_reference,
                recipient: &result.recipient_address,
                amount_minor: result.amount.value(),
                amount: result.amount.to_display(),
                receipt_token: result.receipt_token.as_deref().unwrap_or(""),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Payments as listed by the service. Unsettled ones have an empty reference.
    pub fn write_records<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a PaymentRecord>,
    ) -> Result<()> {
        for record in records {
            self.writer.serialize(HistoryRow {
                transaction_reference: record.transaction_reference.as_deref().unwrap_or(""),
                recipient: &record.recipient_address,
                amount_minor: record.amount.value(),
                amount: record.amount.to_display(),
                receipt_token: record.receipt_token.as_deref().unwrap_or(""),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_receipts<'a>(
        &mut self,
        receipts: impl IntoIterator<Item = &'a ReceiptRecord>,
    ) -> Result<()> {
        for receipt in receipts {
            self.writer.serialize(ReceiptRow {
                transaction_reference: &receipt.transaction_reference,
                payer: &receipt.payer_address,
                merchant: &receipt.merchant_address,
                amount_minor: receipt.amount.value(),
                amount: receipt.amount.to_display(),
                receipt_token: receipt.receipt_token.as_deref().unwrap_or(""),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_invoices<'a>(
        &mut self,
        invoices: impl IntoIterator<Item = &'a Invoice>,
    ) -> Result<()> {
        for invoice in invoices {
            self.writer.serialize(InvoiceRow {
                invoice_id: &invoice.invoice_id,
                customer: invoice.customer_address.as_deref().unwrap_or(""),
                amount_minor: invoice.amount.value(),
                amount: invoice.amount.to_display(),
                status: &invoice.status,
                description: invoice.description.as_deref().unwrap_or(""),
                receipt_token: invoice.receipt_token.as_deref().unwrap_or(""),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
