//! Converts a [`Signal`] into an order intent, consulting risk, rate limits
//! and buying power before it ever reaches an [`Exchange`] (spec §2 step
//! 4-5), grounded in the consult-then-route pattern of
//! `services/trading-gateway/src/{execution_engine,risk_gate}.rs`.
//!
//! Also owns the adaptive order-type timeout policy (spec §5): a resting
//! limit order whose `limit_timeout_ms` elapses is cancelled and
//! re-submitted as a market order on the next [`ExecutionEngine::on_tick`]
//! sweep, rather than via a spawned timer (the trading thread stays
//! single-threaded and cooperative).

use common::{Price, Quantity, Side, SymbolId, TraderId, PRICE_SCALE};
use ipc::ExecutionReport;
use paper_exchange::Exchange;
use risk::{RateLimiter, RejectionReason, RiskManager, SymbolIndex};
use thiserror::Error;

use crate::account::AccountManager;
use crate::signal::{OrderPreference, Signal, SignalKind};

/// Why [`ExecutionEngine::submit`] declined to route a signal.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Trading is halted; no new orders are accepted.
    #[error("trading halted")]
    Halted,
    /// The signal carried no actionable view.
    #[error("signal is not actionable")]
    NoSignal,
    /// An exit signal arrived for a symbol with no open position.
    #[error("exit signal with no open position")]
    FlatPosition,
    /// The pre-trade risk gate rejected the order.
    #[error("risk check failed: {0}")]
    Risk(#[from] common::CoreError),
    /// The order-entry rate limiter rejected the order.
    #[error("rate limited: {0:?}")]
    RateLimited(RejectionReason),
    /// The account lacked sufficient buying power to reserve this order's notional.
    #[error("insufficient buying power")]
    InsufficientBuyingPower,
}

/// A resting limit order awaiting either a fill or its adaptive timeout.
#[derive(Debug, Clone, Copy)]
struct PendingLimit {
    order_id: u64,
    symbol: SymbolId,
    symbol_index: SymbolIndex,
    trader: TraderId,
    side: Side,
    quantity: Quantity,
    submitted_at_ns: u64,
    timeout_ms: u64,
}

/// Default time a resting limit order is given before it is cancelled and
/// resubmitted as a market order (spec §5's adaptive order-type policy).
pub const DEFAULT_LIMIT_TIMEOUT_MS: u64 = 2_000;

/// Orchestrates the signal -> risk -> rate-limit -> account -> exchange
/// pipeline for one trading core instance.
pub struct ExecutionEngine<E: Exchange> {
    risk: RiskManager,
    rate_limiter: RateLimiter,
    account: AccountManager,
    exchange: E,
    pending_limits: Vec<PendingLimit>,
}

impl<E: Exchange> ExecutionEngine<E> {
    /// Build an execution engine wired to `exchange`.
    #[must_use]
    pub fn new(risk: RiskManager, rate_limiter: RateLimiter, account: AccountManager, exchange: E) -> Self {
        Self {
            risk,
            rate_limiter,
            account,
            exchange,
            pending_limits: Vec::new(),
        }
    }

    /// The risk manager, for callers that need to register symbols or read
    /// account-level state.
    pub fn risk(&mut self) -> &mut RiskManager {
        &mut self.risk
    }

    /// The account manager, for position and P&L inspection.
    pub fn account(&self) -> &AccountManager {
        &self.account
    }

    /// Convert `signal` into an order and route it, after every pre-trade
    /// check passes. `touch_bid`/`touch_ask` price the order when the
    /// signal has no explicit limit price.
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &mut self,
        symbol: SymbolId,
        symbol_index: SymbolIndex,
        trader: TraderId,
        signal: &Signal,
        touch_bid: f64,
        touch_ask: f64,
        now_ns: u64,
    ) -> Result<ExecutionReport, ExecutionError> {
        if !signal.is_actionable() {
            return Err(ExecutionError::NoSignal);
        }
        if self.risk.is_halted() {
            return Err(ExecutionError::Halted);
        }

        let side = self.resolve_side(symbol, signal)?;
        let quantity = quantity_from_f64(signal.suggested_quantity);
        let price = signal
            .limit_price
            .unwrap_or_else(|| Price::new(if side == Side::Buy { touch_ask } else { touch_bid }));

        self.risk.check_order(symbol_index, side, quantity, price)?;
        self.rate_limiter
            .allow_order(trader, now_ns)
            .map_err(ExecutionError::RateLimited)?;
        if !self.account.reserve(quantity, price) {
            return Err(ExecutionError::InsufficientBuyingPower);
        }

        let use_market = matches!(signal.order_preference, OrderPreference::Market)
            || (matches!(signal.order_preference, OrderPreference::Either) && signal.limit_price.is_none());

        let report = if use_market {
            self.exchange.send_market_order(
                symbol,
                side,
                quantity.as_f64(),
                touch_bid,
                touch_ask,
                common::Timestamp::from_nanos(now_ns),
            )
        } else {
            let report = self.exchange.send_limit_order(
                symbol,
                side,
                quantity.as_f64(),
                price.as_f64(),
                common::Timestamp::from_nanos(now_ns),
            );
            if report.status() == ipc::OrderStatus::New {
                self.rate_limiter.on_order_added(trader);
                self.pending_limits.push(PendingLimit {
                    order_id: report.order_id(),
                    symbol,
                    symbol_index,
                    trader,
                    side,
                    quantity,
                    submitted_at_ns: now_ns,
                    timeout_ms: DEFAULT_LIMIT_TIMEOUT_MS,
                });
            }
            report
        };

        if report.is_fill() {
            self.risk.on_fill(symbol_index, side, quantity, price);
            self.account.apply_fill(symbol, side, quantity, price);
        }

        Ok(report)
    }

    /// Notify the engine of a fill arriving for a previously-resting limit
    /// order (e.g. via [`Exchange::on_price_update`]), releasing its
    /// rate-limiter slot and applying it to risk/account state.
    pub fn on_limit_fill(&mut self, report: &ExecutionReport) {
        let Some(idx) = self.pending_limits.iter().position(|p| p.order_id == report.order_id()) else {
            return;
        };
        let pending = self.pending_limits.remove(idx);
        self.rate_limiter.on_order_removed(pending.trader);
        if report.is_fill() {
            let price = Price::new(report.filled_price());
            let qty = quantity_from_f64(report.filled_qty());
            self.risk.on_fill(pending.symbol_index, pending.side, qty, price);
            self.account.apply_fill(pending.symbol, pending.side, qty, price);
        }
    }

    /// Sweep resting limit orders for the adaptive timeout policy: any
    /// order older than its `timeout_ms` is cancelled and resubmitted as a
    /// market order at the current touch.
    pub fn on_tick(&mut self, symbol: SymbolId, touch_bid: f64, touch_ask: f64, now_ns: u64) {
        let mut expired = Vec::new();
        self.pending_limits.retain(|p| {
            let elapsed_ms = now_ns.saturating_sub(p.submitted_at_ns) / 1_000_000;
            if p.symbol == symbol && elapsed_ms >= p.timeout_ms {
                expired.push(*p);
                false
            } else {
                true
            }
        });

        for pending in expired {
            self.rate_limiter.on_order_removed(pending.trader);
            self.exchange.cancel_order(pending.order_id, common::Timestamp::from_nanos(now_ns));
            tracing::info!(
                order_id = pending.order_id,
                symbol = ?pending.symbol,
                "limit order timed out, converting to market"
            );
            let report = self.exchange.send_market_order(
                pending.symbol,
                pending.side,
                pending.quantity.as_f64(),
                touch_bid,
                touch_ask,
                common::Timestamp::from_nanos(now_ns),
            );
            if report.is_fill() {
                let price = Price::new(report.filled_price());
                self.risk.on_fill(pending.symbol_index, pending.side, pending.quantity, price);
                self.account.apply_fill(pending.symbol, pending.side, pending.quantity, price);
            }
        }
    }

    fn resolve_side(&self, symbol: SymbolId, signal: &Signal) -> Result<Side, ExecutionError> {
        match signal.kind {
            SignalKind::Buy => Ok(Side::Buy),
            SignalKind::Sell => Ok(Side::Sell),
            SignalKind::Exit => {
                let position = self.account.position(symbol).net_qty;
                if position == 0 {
                    Err(ExecutionError::FlatPosition)
                } else if position > 0 {
                    Ok(Side::Sell)
                } else {
                    Ok(Side::Buy)
                }
            }
            SignalKind::None => Err(ExecutionError::NoSignal),
        }
    }
}

fn quantity_from_f64(v: f64) -> Quantity {
    Quantity((v * f64::from(PRICE_SCALE)).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::{RateLimiterConfig, RiskConfig};
    use common::{Side, SymbolId, TraderId};
    use paper_exchange::{PaperExchange, DEFAULT_SLIPPAGE_BPS};

    fn engine() -> (ExecutionEngine<PaperExchange>, SymbolIndex) {
        let mut risk = RiskManager::new(RiskConfig { initial_capital: 1_000_000, ..RiskConfig::default() });
        let symbol_index = risk.register_symbol("SYM_1", 1_000_000, 1_000_000_000);
        let rate_limiter = RateLimiter::new(RateLimiterConfig {
            orders_per_second: 100,
            max_active_orders: 100,
            global_rate_limit: 100,
            enabled: true,
        });
        let account = AccountManager::new(10_000_000);
        let exchange = PaperExchange::new(16, DEFAULT_SLIPPAGE_BPS, 0.0);
        (ExecutionEngine::new(risk, rate_limiter, account, exchange), symbol_index)
    }

    fn buy_signal() -> Signal {
        Signal {
            kind: SignalKind::Buy,
            strength: crate::signal::Strength::Strong,
            suggested_quantity: 1.0,
            order_preference: OrderPreference::Market,
            limit_price: None,
            reason: "test",
        }
    }

    #[test]
    fn market_buy_signal_routes_to_a_fill() {
        let (mut eng, idx) = engine();
        let report = eng
            .submit(SymbolId(1), idx, TraderId(1), &buy_signal(), 99.0, 100.0, 1_000_000_000)
            .unwrap();
        assert!(report.is_fill());
        assert_eq!(eng.account().position(SymbolId(1)).net_qty, Quantity::from_units(1).0 as i64);
    }

    #[test]
    fn none_signal_is_rejected_before_any_check() {
        let (mut eng, idx) = engine();
        let err = eng
            .submit(SymbolId(1), idx, TraderId(1), &Signal::none(), 99.0, 100.0, 0)
            .unwrap_err();
        assert!(matches!(err, ExecutionError::NoSignal));
    }

    #[test]
    fn halted_engine_rejects_every_signal() {
        let (mut eng, idx) = engine();
        eng.risk().halt();
        let err = eng
            .submit(SymbolId(1), idx, TraderId(1), &buy_signal(), 99.0, 100.0, 0)
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Halted));
    }

    #[test]
    fn exit_signal_with_no_position_is_rejected() {
        let (mut eng, idx) = engine();
        let exit = Signal { kind: SignalKind::Exit, ..buy_signal() };
        let err = eng
            .submit(SymbolId(1), idx, TraderId(1), &exit, 99.0, 100.0, 0)
            .unwrap_err();
        assert!(matches!(err, ExecutionError::FlatPosition));
    }

    #[test]
    fn exit_signal_closes_an_existing_long() {
        let (mut eng, idx) = engine();
        eng.submit(SymbolId(1), idx, TraderId(1), &buy_signal(), 99.0, 100.0, 0).unwrap();
        let exit = Signal { kind: SignalKind::Exit, ..buy_signal() };
        let report = eng.submit(SymbolId(1), idx, TraderId(1), &exit, 99.0, 100.0, 1).unwrap();
        assert_eq!(report.side(), Side::Sell);
    }

    #[test]
    fn limit_order_beyond_timeout_converts_to_market_on_tick() {
        let (mut eng, idx) = engine();
        let limit_signal = Signal {
            order_preference: OrderPreference::Limit,
            limit_price: Some(Price::new(90.0)),
            ..buy_signal()
        };
        let report = eng
            .submit(SymbolId(1), idx, TraderId(1), &limit_signal, 99.0, 100.0, 0)
            .unwrap();
        assert_eq!(report.status(), ipc::OrderStatus::New);
        assert_eq!(eng.pending_limits.len(), 1);

        eng.on_tick(SymbolId(1), 99.0, 100.0, DEFAULT_LIMIT_TIMEOUT_MS * 1_000_000 + 1);
        assert!(eng.pending_limits.is_empty());
    }
}
