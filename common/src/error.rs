//! Error kinds shared across the order book, risk and engine crates.

use crate::types::{OrderId, TraderId};
use thiserror::Error;

/// Outcome of an order-submission attempt against the book, risk gate or
/// rate limiter. Mirrors the matching engine's fast-path result codes so a
/// caller can branch on the reason without formatting a string.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// The order pool has no free slots.
    #[error("order pool exhausted")]
    PoolExhausted,

    /// An order id was zero, or referenced an order outside its allocated range.
    #[error("invalid order id: {0}")]
    InvalidOrderId(OrderId),

    /// Price was zero, the reserved invalid sentinel, or outside the configured range.
    #[error("invalid price")]
    InvalidPrice,

    /// Quantity was zero.
    #[error("invalid quantity")]
    InvalidQuantity,

    /// Cancel/modify referenced an order id that is not currently resting.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The trading system is halted; the order was rejected without reaching the book.
    #[error("system halted")]
    SystemHalted,

    /// An order id that is already resting in the book was submitted again.
    #[error("duplicate order id: {0}")]
    DuplicateOrderId(OrderId),

    /// The trader or the global order-entry rate limit was exceeded.
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// The trader has too many active (resting) orders.
    #[error("max active orders exceeded for trader {0}")]
    MaxOrdersExceeded(TraderId),

    /// A pre-trade risk check rejected the order.
    #[error("risk check failed: {0}")]
    RiskRejected(&'static str),

    /// The price-level pool has no free slots for a new price.
    #[error("price level pool exhausted")]
    LevelPoolExhausted,
}

/// Result alias used throughout the order-book and risk hot paths.
pub type OrderResult<T> = Result<T, CoreError>;
