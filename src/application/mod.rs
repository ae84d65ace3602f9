//! Application layer orchestrating the payment, receipt, history and merchant flows.
//!
//! The workflows talk to the remote services only through the
//! [`RemoteGateway`](crate::domain::ports::RemoteGateway) port. The balance holder
//! is the single writer of the vault balance; everything else reads it.

pub mod balance;
pub mod batch;
pub mod history;
pub mod merchant;
pub mod payment;
pub mod receipt;
