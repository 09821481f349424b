//! Shared types, error kinds and configuration for the HFT core crates.

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(unused)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{CoreError, OrderResult};
pub use types::{FillQty, OrderId, Price, Quantity, Side, SymbolId, Timestamp, TraderId, PRICE_SCALE};
