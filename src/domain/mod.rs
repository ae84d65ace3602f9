//! Domain types shared by the workflows and the gateway adapters.

pub mod amount;
pub mod balance;
pub mod invoice;
pub mod payment;
pub mod ports;
pub mod receipt;
