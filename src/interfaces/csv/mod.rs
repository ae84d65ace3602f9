//! CSV input for agent batches and CSV output for payment history.

pub mod history_writer;
pub mod instruction_reader;
