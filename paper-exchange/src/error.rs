//! Error type for the paper-exchange crate.

use thiserror::Error;

/// Failures the simulated exchange can report back to a caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeError {
    /// The pending-limit-order table has no free slot.
    #[error("pending limit order table is full")]
    PendingOrdersExhausted,
    /// `cancel_order` was called with an id that is not currently pending.
    #[error("order not found or not pending")]
    OrderNotPending,
}

/// Result alias for this crate's fallible operations.
pub type ExchangeResult<T> = Result<T, ExchangeError>;
