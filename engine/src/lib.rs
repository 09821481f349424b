//! Strategy interface, execution orchestration, halt/flatten control and
//! account state (spec §2, §6, §9) — the layer that turns a [`Signal`] into
//! a routed order and keeps the system's emergency stop authoritative.
//!
//! Grounded in `services/trading-gateway/src/{strategy,execution_engine,
//! risk_gate,position_manager}.rs` for structure and
//! `original_source/include/strategy/halt_manager.hpp` for the halt state
//! machine's exact semantics. This crate has no opinion on trading
//! strategy content — only the interface a strategy implements and the
//! machinery around it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod execution;
pub mod halt;
pub mod signal;
pub mod strategy;

pub use account::{AccountManager, Position};
pub use execution::{ExecutionEngine, ExecutionError, DEFAULT_LIMIT_TIMEOUT_MS};
pub use halt::{
    HaltManager, HaltReason, HaltState, PoolPressure, PoolPressureThresholds, PositionInfo,
    DEFAULT_POOL_CRITICAL_FRACTION, DEFAULT_POOL_WARNING_FRACTION,
};
pub use signal::{MarketRegime, OrderPreference, Signal, SignalKind, Strength};
pub use strategy::{NoopStrategy, Strategy};
