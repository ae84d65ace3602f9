use crate::domain::balance::{OwnerId, VaultBalance};
use crate::domain::ports::GatewayRef;
use crate::error::GatewayError;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

/// Sequence stamp ordering the writes to one holder.
///
/// A refresh is stamped when its query is issued. A settlement is stamped when
/// its response is applied. A refresh whose stamp is older than the held value's
/// is discarded, so only a query issued after the last settlement resolved can
/// replace it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WriteTicket(u64);

impl WriteTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// A newer write already landed; this one was dropped.
    Superseded { held: WriteTicket },
}

/// Result of a successful ledger query.
///
/// `balance` is the value held afterwards. When `outcome` is `Superseded` it is
/// the newer value that won, not the one the ledger answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refreshed {
    pub balance: VaultBalance,
    pub outcome: WriteOutcome,
}

impl Refreshed {
    pub fn was_applied(&self) -> bool {
        self.outcome == WriteOutcome::Applied
    }
}

/// Refresh failed; the held value (if any) was left untouched and may be stale.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("balance may be stale: {cause}")]
pub struct StaleBalance {
    pub previous: Option<VaultBalance>,
    pub cause: GatewayError,
}

#[derive(Debug, Clone, Copy)]
struct Stamped {
    balance: VaultBalance,
    ticket: WriteTicket,
}

/// Single writer of the vault balance.
///
/// The value changes only on a fresh ledger query or on the balance embedded in an
/// authoritative settlement response. Nothing here ever computes a balance locally.
pub struct BalanceHolder {
    owner: OwnerId,
    gateway: GatewayRef,
    current: RwLock<Option<Stamped>>,
    next_sequence: AtomicU64,
}

impl BalanceHolder {
    pub fn new(owner: OwnerId, gateway: GatewayRef) -> Self {
        Self {
            owner,
            gateway,
            current: RwLock::new(None),
            next_sequence: AtomicU64::new(1),
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Last known balance, or `None` if nothing has been loaded yet.
    pub async fn get_balance(&self) -> Option<VaultBalance> {
        self.current.read().await.map(|s| s.balance)
    }

    fn ticket(&self) -> WriteTicket {
        WriteTicket(self.next_sequence.fetch_add(1, Ordering::SeqCst))
    }

    /// Queries the ledger and replaces the held value with the answer, unless a
    /// settlement resolved while the query was in flight.
    pub async fn refresh(&self) -> Result<Refreshed, StaleBalance> {
        let ticket = self.ticket();
        let queried = self.gateway.query_balance(self.owner).await;

        let balance = match queried {
            Ok(balance) if balance.owner_id == self.owner => balance,
            Ok(balance) => {
                return Err(self
                    .stale(GatewayError::MalformedResponse(format!(
                        "balance for vault {} returned for vault {}",
                        balance.owner_id, self.owner
                    )))
                    .await);
            }
            Err(cause) => {
                tracing::warn!(owner = self.owner, error = %cause, "balance refresh failed");
                return Err(self.stale(cause).await);
            }
        };

        let mut current = self.current.write().await;
        let outcome = Self::write_refresh(&mut current, ticket, balance);
        match outcome {
            WriteOutcome::Applied => {
                tracing::debug!(owner = self.owner, spendable = %balance.spendable, "balance refreshed");
            }
            WriteOutcome::Superseded { held } => {
                tracing::info!(
                    owner = self.owner,
                    ticket = ticket.sequence(),
                    held = held.sequence(),
                    answered = %balance.spendable,
                    "discarding refresh issued before the last settlement"
                );
            }
        }
        Ok(Refreshed {
            balance: current.map(|s| s.balance).unwrap_or(balance),
            outcome,
        })
    }

    /// Stores a balance taken verbatim from a successful settlement response.
    ///
    /// Always overwrites. The stamp is drawn here, so every refresh still in
    /// flight is older and will be discarded when it lands.
    pub async fn apply_authoritative(&self, balance: VaultBalance) -> WriteTicket {
        let mut current = self.current.write().await;
        let ticket = self.ticket();
        *current = Some(Stamped { balance, ticket });
        tracing::debug!(
            owner = self.owner,
            ticket = ticket.sequence(),
            spendable = %balance.spendable,
            "authoritative balance applied"
        );
        ticket
    }

    fn write_refresh(
        slot: &mut Option<Stamped>,
        ticket: WriteTicket,
        balance: VaultBalance,
    ) -> WriteOutcome {
        match slot {
            Some(held) if held.ticket > ticket => WriteOutcome::Superseded { held: held.ticket },
            _ => {
                *slot = Some(Stamped { balance, ticket });
                WriteOutcome::Applied
            }
        }
    }

    async fn stale(&self, cause: GatewayError) -> StaleBalance {
        StaleBalance {
            previous: self.get_balance().await,
            cause,
        }
    }
}
