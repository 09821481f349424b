//! End-to-end scenario: a drawdown breach halts the risk manager mid-stream,
//! the execution engine refuses further signals, and an operator-triggered
//! `HaltManager` flatten sweep closes out the open position (spec §4.6,
//! §8 scenario 8).

use common::config::{RateLimiterConfig, RiskConfig};
use common::{Price, SymbolId, TraderId};
use engine::{
    AccountManager, ExecutionEngine, ExecutionError, HaltManager, HaltReason, HaltState,
    OrderPreference, PositionInfo, Signal, SignalKind, Strength,
};
use paper_exchange::{PaperExchange, DEFAULT_SLIPPAGE_BPS};
use risk::{RateLimiter, RiskManager};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn buy_signal(qty: f64) -> Signal {
    Signal {
        kind: SignalKind::Buy,
        strength: Strength::Strong,
        suggested_quantity: qty,
        order_preference: OrderPreference::Market,
        limit_price: None,
        reason: "integration test",
    }
}

#[test]
fn drawdown_breach_halts_trading_and_flatten_closes_the_position() {
    let mut risk = RiskManager::new(RiskConfig {
        initial_capital: 100_000,
        max_drawdown_pct: 0.10,
        max_order_size: 1_000_000,
        max_notional_pct: 0.0, // this scenario only exercises the drawdown breaker
        ..RiskConfig::default()
    });
    let symbol = SymbolId(1);
    let symbol_index = risk.register_symbol("SYM_1", 1_000_000, 0);
    let rate_limiter = RateLimiter::new(RateLimiterConfig {
        orders_per_second: 100,
        max_active_orders: 100,
        global_rate_limit: 100,
        enabled: true,
    });
    let account = AccountManager::new(10_000_000);
    let exchange = PaperExchange::new(16, DEFAULT_SLIPPAGE_BPS, 0.0);
    let mut engine = ExecutionEngine::new(risk, rate_limiter, account, exchange);

    let fill = engine
        .submit(symbol, symbol_index, TraderId(1), &buy_signal(10.0), 99.0, 100.0, 0)
        .expect("first order fills before any halt");
    assert!(fill.is_fill());

    engine.risk().update_pnl(5_000); // peak equity now 105,000
    engine.risk().update_pnl(-5_600); // drawdown ~10.1% > 10% threshold
    assert!(engine.risk().is_halted());

    let err = engine
        .submit(symbol, symbol_index, TraderId(1), &buy_signal(1.0), 99.0, 100.0, 1)
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Halted));

    let mut halt_mgr = HaltManager::new(3);
    let flatten_orders = Arc::new(AtomicUsize::new(0));
    let flatten_orders_clone = flatten_orders.clone();
    let position_qty = engine.account().position(symbol).net_qty;

    halt_mgr.set_cancel_all_callback(|| {});
    halt_mgr.set_get_positions_callback(move || {
        vec![PositionInfo { symbol, position: position_qty, last_price: 100.0 }]
    });
    halt_mgr.set_send_order_callback(move |_, _, _, _| {
        flatten_orders_clone.fetch_add(1, Ordering::Relaxed);
        true
    });

    assert!(halt_mgr.halt(HaltReason::MaxLossExceeded, "drawdown breach"));
    assert_eq!(halt_mgr.state(), HaltState::Halted);
    assert_eq!(flatten_orders.load(Ordering::Relaxed), 1);
    assert!(!halt_mgr.can_trade());
}

#[test]
fn insufficient_buying_power_is_rejected_before_reaching_the_exchange() {
    let mut risk = RiskManager::new(RiskConfig { initial_capital: 1_000_000, ..RiskConfig::default() });
    let symbol_index = risk.register_symbol("SYM_1", 1_000_000_000, 1_000_000_000);
    let rate_limiter = RateLimiter::new(RateLimiterConfig {
        orders_per_second: 100,
        max_active_orders: 100,
        global_rate_limit: 100,
        enabled: true,
    });
    let account = AccountManager::new(10); // tiny buying power, nowhere near a $100 notional buy
    let exchange = PaperExchange::new(16, DEFAULT_SLIPPAGE_BPS, 0.0);
    let mut engine = ExecutionEngine::new(risk, rate_limiter, account, exchange);

    let err = engine
        .submit(SymbolId(1), symbol_index, TraderId(1), &buy_signal(1.0), 99.0, 100.0, 0)
        .unwrap_err();
    assert!(matches!(err, ExecutionError::InsufficientBuyingPower));
}

#[test]
fn limit_order_at_the_touch_rejects_past_the_rate_limit() {
    let mut risk = RiskManager::new(RiskConfig { initial_capital: 1_000_000, ..RiskConfig::default() });
    let symbol_index = risk.register_symbol("SYM_1", 1_000_000_000, 1_000_000_000);
    let rate_limiter = RateLimiter::new(RateLimiterConfig {
        orders_per_second: 1,
        max_active_orders: 100,
        global_rate_limit: 100,
        enabled: true,
    });
    let account = AccountManager::new(10_000_000);
    let exchange = PaperExchange::new(16, DEFAULT_SLIPPAGE_BPS, 0.0);
    let mut engine = ExecutionEngine::new(risk, rate_limiter, account, exchange);

    let limit_signal = Signal {
        order_preference: OrderPreference::Limit,
        limit_price: Some(Price::new(99.0)),
        ..buy_signal(1.0)
    };
    engine
        .submit(SymbolId(1), symbol_index, TraderId(7), &limit_signal, 99.0, 100.0, 1_000_000_000)
        .expect("first order within the per-second cap");
    let err = engine
        .submit(SymbolId(1), symbol_index, TraderId(7), &limit_signal, 99.0, 100.0, 1_000_000_000)
        .unwrap_err();
    assert!(matches!(err, ExecutionError::RateLimited(_)));
}
