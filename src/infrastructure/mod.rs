//! Adapters implementing the [`RemoteGateway`](crate::domain::ports::RemoteGateway) port.

pub mod http;
pub mod in_memory;
