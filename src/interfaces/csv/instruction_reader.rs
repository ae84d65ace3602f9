use crate::application::batch::PaymentInstruction;
use crate::error::{PaymentError, Result};
use std::io::Read;

const RECIPIENT: &str = "recipient";
const AMOUNT: &str = "amount";

/// Reads agent payment instructions from CSV.
///
/// The header must name a `recipient` and an `amount` column, in any order;
/// other columns are ignored. Lines starting with `#` are comments. Amounts stay
/// as written (display units) and are parsed by the payment workflow, so a
/// malformed amount becomes a rejected attempt rather than a skipped line.
pub struct InstructionReader<R: Read> {
    reader: csv::Reader<R>,
    headers: csv::StringRecord,
}

impl<R: Read> InstructionReader<R> {
    /// Fails when the header lacks either required column.
    pub fn new(source: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(source);
        let headers = reader.headers()?.clone();
        for column in [RECIPIENT, AMOUNT] {
            if !headers.iter().any(|h| h.eq_ignore_ascii_case(column)) {
                return Err(PaymentError::ClientValidation(format!(
                    "instruction file has no {column} column"
                )));
            }
        }
        // normalise header case so deserialization matches field names
        let headers = headers.iter().map(str::to_ascii_lowercase).collect();
        Ok(Self { reader, headers })
    }

    /// Yields one entry per data line. A line with a missing or empty recipient
    /// or amount yields an `Err` naming the line, and reading goes on.
    pub fn instructions(self) -> impl Iterator<Item = Result<PaymentInstruction>> {
        let headers = self.headers;
        self.reader
            .into_records()
            .map(move |record| parse(&headers, record?))
    }
}

fn parse(headers: &csv::StringRecord, record: csv::StringRecord) -> Result<PaymentInstruction> {
    let line = record.position().map_or(0, |p| p.line());
    let instruction: PaymentInstruction = record
        .deserialize(Some(headers))
        .map_err(|e| invalid(line, &e.to_string()))?;
    if instruction.recipient.is_empty() {
        return Err(invalid(line, "missing recipient"));
    }
    if instruction.amount.is_empty() {
        return Err(invalid(line, "missing amount"));
    }
    Ok(instruction)
}

fn invalid(line: u64, reason: &str) -> PaymentError {
    PaymentError::ClientValidation(format!("instruction on line {line}: {reason}"))
}
