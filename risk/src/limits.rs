//! Pre-trade risk gate: per-symbol position/notional limits plus
//! account-level daily-loss and drawdown halts (spec §4.4).
//!
//! Symbol registration is cold path (string keyed); [`check_order`] and
//! [`on_fill`] are hot path and only ever touch dense arrays indexed by the
//! [`SymbolIndex`] a caller obtained once at registration time, mirroring
//! `EnhancedRiskManager`'s hybrid design in
//! `original_source/include/risk/enhanced_risk_manager.hpp`.

use common::config::RiskConfig;
use common::{CoreError, OrderResult, Price, Quantity, Side, PRICE_SCALE};
use rustc_hash::FxHashMap;

/// Dense index into the risk manager's per-symbol arrays, returned by
/// [`RiskManager::register_symbol`]. The hot path never looks up a symbol by
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolIndex(pub u32);

/// Per-symbol limits; zero means "no limit" for either field (spec §4.4).
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolRiskLimit {
    /// Maximum absolute net position, 0 = unbounded.
    pub max_position: i64,
    /// Maximum notional exposure, 0 = unbounded.
    pub max_notional: i64,
}

#[derive(Debug, Clone, Copy, Default)]
struct SymbolRiskState {
    position: i64,
    notional: i64,
    last_price: Price,
}

/// Point-in-time snapshot of global risk state, for telemetry/dashboards.
#[derive(Debug, Clone, Copy)]
pub struct RiskState {
    /// Current mark-to-market P&L.
    pub current_pnl: i64,
    /// P&L since the last `new_trading_day()`.
    pub daily_pnl: i64,
    /// Highest equity observed so far (monotone non-decreasing).
    pub peak_equity: i64,
    /// Sum of every symbol's notional exposure.
    pub total_notional: i64,
    /// Current peak-to-trough drawdown, as a fraction of peak equity.
    pub current_drawdown_pct: f64,
    /// True unless a daily-loss or drawdown breach has halted trading.
    pub can_trade: bool,
    /// Whether the daily loss limit has been breached.
    pub daily_limit_breached: bool,
    /// Whether the max-drawdown limit has been breached.
    pub drawdown_breached: bool,
}

/// Pre-trade risk gate and post-fill P&L monitor.
///
/// `check_order` is pure with respect to its inputs and the manager's
/// current state (spec §8's risk-determinism law): calling it twice with the
/// same arguments and no intervening `on_fill`/`update_pnl` yields the same
/// answer.
pub struct RiskManager {
    config: RiskConfig,
    initial_capital: i64,
    current_pnl: i64,
    peak_equity: i64,
    daily_start_pnl: i64,
    total_notional: i64,
    daily_limit_breached: bool,
    drawdown_breached: bool,
    halted: bool,
    limits: Vec<SymbolRiskLimit>,
    states: Vec<SymbolRiskState>,
    symbol_to_index: FxHashMap<String, SymbolIndex>,
    index_to_symbol: Vec<String>,
}

impl RiskManager {
    /// Build a risk manager from `config`, with peak equity seeded at
    /// `config.initial_capital`.
    #[must_use]
    pub fn new(config: RiskConfig) -> Self {
        let initial_capital = config.initial_capital;
        Self {
            config,
            initial_capital,
            current_pnl: 0,
            peak_equity: initial_capital,
            daily_start_pnl: 0,
            total_notional: 0,
            daily_limit_breached: false,
            drawdown_breached: false,
            halted: false,
            limits: Vec::new(),
            states: Vec::new(),
            symbol_to_index: FxHashMap::default(),
            index_to_symbol: Vec::new(),
        }
    }

    /// Register a symbol for hot-path risk checks, or update its limits if
    /// already registered. Cold path: called once per symbol at startup.
    pub fn register_symbol(
        &mut self,
        symbol: &str,
        max_position: i64,
        max_notional: i64,
    ) -> SymbolIndex {
        if let Some(&index) = self.symbol_to_index.get(symbol) {
            self.limits[index.0 as usize] = SymbolRiskLimit { max_position, max_notional };
            return index;
        }
        let index = SymbolIndex(self.states.len() as u32);
        self.symbol_to_index.insert(symbol.to_string(), index);
        self.index_to_symbol.push(symbol.to_string());
        self.states.push(SymbolRiskState::default());
        self.limits.push(SymbolRiskLimit { max_position, max_notional });
        index
    }

    /// Look up a previously registered symbol's index.
    #[must_use]
    pub fn symbol_index(&self, symbol: &str) -> Option<SymbolIndex> {
        self.symbol_to_index.get(symbol).copied()
    }

    /// Number of registered symbols.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.states.len()
    }

    /// The six-step pre-trade check of spec §4.4: halt gate, single-order
    /// size, per-symbol position, per-symbol notional, global notional, in
    /// that order — the first failing step determines the rejection.
    ///
    /// # Errors
    /// `SystemHalted`, or `RiskRejected` with a reason naming the failing
    /// step.
    pub fn check_order(
        &self,
        symbol_index: SymbolIndex,
        side: Side,
        qty: Quantity,
        price: Price,
    ) -> OrderResult<()> {
        if self.halted {
            return Err(CoreError::SystemHalted);
        }
        if qty.0 > self.config.max_order_size {
            return Err(CoreError::RiskRejected("max order size exceeded"));
        }

        let idx = symbol_index.0 as usize;
        if let Some(limit) = self.limits.get(idx) {
            let state = self.states[idx];

            if limit.max_position > 0 {
                let signed_qty = i64::from(qty.0);
                let new_position = match side {
                    Side::Buy => state.position + signed_qty,
                    Side::Sell => state.position - signed_qty,
                };
                if new_position.abs() > limit.max_position {
                    return Err(CoreError::RiskRejected("symbol position limit exceeded"));
                }
            }

            if limit.max_notional > 0 && !price.is_invalid() && price != Price::ZERO {
                let order_notional = order_notional(qty, price);
                if state.notional + order_notional > limit.max_notional {
                    return Err(CoreError::RiskRejected("symbol notional limit exceeded"));
                }
            }
        }

        if self.config.max_notional_pct > 0.0 {
            let max_notional = (self.initial_capital as f64 * self.config.max_notional_pct) as i64;
            let order_notional = order_notional(qty, price);
            if self.total_notional + order_notional > max_notional {
                return Err(CoreError::RiskRejected("global notional limit exceeded"));
            }
        }

        Ok(())
    }

    /// Apply a fill's signed position delta to `symbol_index` and
    /// recompute that symbol's notional, then the global total (spec §4.4).
    /// A fill against an unregistered index is ignored, matching the
    /// original's bounds-checked hot path.
    pub fn on_fill(&mut self, symbol_index: SymbolIndex, side: Side, qty: Quantity, price: Price) {
        let idx = symbol_index.0 as usize;
        let Some(state) = self.states.get_mut(idx) else {
            return;
        };

        let signed_qty = i64::from(qty.0);
        state.position += match side {
            Side::Buy => signed_qty,
            Side::Sell => -signed_qty,
        };
        state.last_price = price;
        state.notional = (state.position.unsigned_abs() as i64 * i64::from(price.0))
            / (i64::from(PRICE_SCALE) * i64::from(PRICE_SCALE));

        self.total_notional = self.states.iter().map(|s| s.notional).sum();
    }

    /// Update equity/drawdown state from a fresh mark-to-market P&L.
    /// Bumps peak equity, and halts on either a daily-loss or a drawdown
    /// breach (spec §4.4's two post-fill circuit breakers).
    pub fn update_pnl(&mut self, current_pnl: i64) {
        self.current_pnl = current_pnl;
        let current_equity = self.initial_capital + self.current_pnl;
        if current_equity > self.peak_equity {
            self.peak_equity = current_equity;
        }

        let daily_pnl = self.current_pnl - self.daily_start_pnl;
        let daily_loss_limit = (self.initial_capital as f64 * self.config.daily_loss_limit_pct) as i64;
        if daily_pnl < -daily_loss_limit {
            if !self.daily_limit_breached {
                tracing::warn!(daily_pnl, daily_loss_limit, "daily loss limit breached, halting");
            }
            self.daily_limit_breached = true;
            self.halted = true;
        }

        if self.peak_equity > 0 {
            let drawdown = (self.peak_equity - current_equity) as f64 / self.peak_equity as f64;
            if drawdown > self.config.max_drawdown_pct {
                if !self.drawdown_breached {
                    tracing::warn!(
                        drawdown_pct = drawdown,
                        limit_pct = self.config.max_drawdown_pct,
                        "max drawdown breached, halting"
                    );
                }
                self.drawdown_breached = true;
                self.halted = true;
            }
        }
    }

    /// Reset the daily P&L baseline to the current P&L and clear the daily
    /// breach flag. Drawdown state (and any halt it caused) survives.
    pub fn new_trading_day(&mut self) {
        self.daily_start_pnl = self.current_pnl;
        self.daily_limit_breached = false;
        if !self.drawdown_breached {
            self.halted = false;
        }
    }

    /// Operator kill switch: halt immediately regardless of P&L state.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    /// Clear the halt and both breach flags. Operator action only.
    pub fn reset_halt(&mut self) {
        self.halted = false;
        self.daily_limit_breached = false;
        self.drawdown_breached = false;
    }

    /// True if a daily-loss or drawdown breach (or an operator `halt()`) is
    /// in effect.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Current net position for a registered symbol, or 0 if unregistered.
    #[must_use]
    pub fn symbol_position(&self, symbol_index: SymbolIndex) -> i64 {
        self.states.get(symbol_index.0 as usize).map_or(0, |s| s.position)
    }

    /// Current notional exposure for a registered symbol, or 0 if unregistered.
    #[must_use]
    pub fn symbol_notional(&self, symbol_index: SymbolIndex) -> i64 {
        self.states.get(symbol_index.0 as usize).map_or(0, |s| s.notional)
    }

    /// Snapshot the full risk state for telemetry.
    #[must_use]
    pub fn state(&self) -> RiskState {
        let current_equity = self.initial_capital + self.current_pnl;
        let current_drawdown_pct = if self.peak_equity > 0 {
            (self.peak_equity - current_equity) as f64 / self.peak_equity as f64
        } else {
            0.0
        };
        RiskState {
            current_pnl: self.current_pnl,
            daily_pnl: self.current_pnl - self.daily_start_pnl,
            peak_equity: self.peak_equity,
            total_notional: self.total_notional,
            current_drawdown_pct,
            can_trade: !self.halted,
            daily_limit_breached: self.daily_limit_breached,
            drawdown_breached: self.drawdown_breached,
        }
    }
}

/// Real (unscaled) notional for `qty @ price`, both of which are fixed-point
/// with [`PRICE_SCALE`] ticks per unit — dividing out the scale from each
/// factor takes `PRICE_SCALE * PRICE_SCALE`, not `PRICE_SCALE` once.
fn order_notional(qty: Quantity, price: Price) -> i64 {
    (i64::from(qty.0) * i64::from(price.0)) / (i64::from(PRICE_SCALE) * i64::from(PRICE_SCALE))
}
