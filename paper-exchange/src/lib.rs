//! Simulated exchange for backtesting and paper trading: pessimistic
//! market/limit fills identical in report shape to a real venue adapter
//! (spec §5), plus an optional queue-position fill model for backtests that
//! need confidence-graded fill timing instead of an all-or-nothing one.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod exchange;
pub mod queue_fill;

pub use error::{ExchangeError, ExchangeResult};
pub use exchange::{Exchange, PaperExchange, DEFAULT_SLIPPAGE_BPS};
pub use queue_fill::{FillConfidence, FillResult, QueueFillDetector, QueueFillDetectorConfig};
