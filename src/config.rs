use crate::error::{PaymentError, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Where the remote services live and how long to wait for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub api_base: Url,
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Parses and validates the base URL. Only `http` and `https` are accepted.
    pub fn new(api_base: &str, timeout_ms: u64) -> Result<Self> {
        let api_base = Url::parse(api_base.trim())
            .map_err(|e| PaymentError::Config(format!("invalid API base {api_base:?}: {e}")))?;
        if !matches!(api_base.scheme(), "http" | "https") || api_base.cannot_be_a_base() {
            return Err(PaymentError::Config(format!(
                "API base must be an http(s) URL, got {api_base}"
            )));
        }
        if timeout_ms == 0 {
            return Err(PaymentError::Config(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            api_base,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}
