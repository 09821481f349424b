//! Per-account position tracking and buying-power reservation (spec §2's
//! "account state" share), grounded in
//! `services/trading-gateway/src/position_manager.rs`'s average-entry-price
//! bookkeeping, adapted from its `DashMap`-backed async API to a plain,
//! single-threaded map since the trading thread is the only caller (spec
//! §5). No durable persistence — positions reset when the process restarts
//! (Non-goal, spec §9).

use common::{Price, Quantity, Side, SymbolId, PRICE_SCALE};
use rustc_hash::FxHashMap;

/// Net position and realized/unrealized P&L for one symbol.
#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    /// Net quantity; positive is long, negative is short, in quantity ticks.
    pub net_qty: i64,
    /// Volume-weighted average entry price of the current position, in price ticks.
    pub avg_entry_price: i64,
    /// Cumulative realized P&L, in price-tick * quantity-tick units divided by [`PRICE_SCALE`].
    pub realized_pnl: i64,
    /// Mark-to-market unrealized P&L at the last price update.
    pub unrealized_pnl: i64,
    /// Last traded or quoted price used for `unrealized_pnl`.
    pub last_price: i64,
}

/// Tracks net positions and reserves buying power for one trading account.
///
/// `buying_power` decreases when [`Self::reserve`] succeeds and increases
/// again on [`Self::release`] (order cancelled or rejected) or implicitly
/// stays consumed once a fill lands via [`Self::apply_fill`] — mirroring the
/// reference's reserve-then-confirm order-entry flow.
pub struct AccountManager {
    buying_power: i64,
    reserved: i64,
    positions: FxHashMap<SymbolId, Position>,
}

impl AccountManager {
    /// Build an account manager with `initial_buying_power` available and
    /// no open positions.
    #[must_use]
    pub fn new(initial_buying_power: i64) -> Self {
        Self {
            buying_power: initial_buying_power,
            reserved: 0,
            positions: FxHashMap::default(),
        }
    }

    /// Buying power not currently reserved against a working order.
    #[must_use]
    pub const fn available_buying_power(&self) -> i64 {
        self.buying_power - self.reserved
    }

    /// Attempt to reserve `qty @ price`'s notional against available buying
    /// power. Returns `false` (reserving nothing) if insufficient.
    #[must_use]
    pub fn reserve(&mut self, qty: Quantity, price: Price) -> bool {
        let notional = order_notional(qty, price);
        if notional > self.available_buying_power() {
            return false;
        }
        self.reserved += notional;
        true
    }

    /// Release a previously reserved notional, for a cancelled or rejected order.
    pub fn release(&mut self, qty: Quantity, price: Price) {
        let notional = order_notional(qty, price);
        self.reserved = self.reserved.saturating_sub(notional);
    }

    /// Apply a fill to the account: release its reservation, update the
    /// symbol's position and realized P&L, and debit/credit buying power by
    /// the traded notional.
    pub fn apply_fill(&mut self, symbol: SymbolId, side: Side, qty: Quantity, price: Price) {
        self.release(qty, price);

        let signed_qty = match side {
            Side::Buy => i64::from(qty.0),
            Side::Sell => -i64::from(qty.0),
        };
        let px = i64::from(price.0);

        let position = self.positions.entry(symbol).or_default();
        let same_direction = position.net_qty == 0
            || (position.net_qty > 0) == (signed_qty > 0);

        if same_direction {
            let total_notional = position.avg_entry_price * position.net_qty + px * signed_qty;
            position.net_qty += signed_qty;
            if position.net_qty != 0 {
                position.avg_entry_price = total_notional / position.net_qty;
            }
        } else {
            let closed_qty = signed_qty.unsigned_abs().min(position.net_qty.unsigned_abs()) as i64;
            let pnl_per_unit = if position.net_qty > 0 {
                px - position.avg_entry_price
            } else {
                position.avg_entry_price - px
            };
            position.realized_pnl += closed_qty * pnl_per_unit / (i64::from(PRICE_SCALE) * i64::from(PRICE_SCALE));
            position.net_qty += signed_qty;
            if position.net_qty != 0
                && (position.net_qty > 0) != (position.net_qty - signed_qty > 0)
            {
                position.avg_entry_price = px;
            }
        }

        position.last_price = px;
        position.unrealized_pnl = mark_to_market(*position);

        let notional = order_notional(qty, price);
        self.buying_power += match side {
            Side::Sell => notional,
            Side::Buy => -notional,
        };
    }

    /// Mark `symbol` to `price` without a fill, refreshing unrealized P&L.
    pub fn mark_price(&mut self, symbol: SymbolId, price: Price) {
        if let Some(position) = self.positions.get_mut(&symbol) {
            position.last_price = i64::from(price.0);
            position.unrealized_pnl = mark_to_market(*position);
        }
    }

    /// Current position for `symbol`, or the default (flat) position.
    #[must_use]
    pub fn position(&self, symbol: SymbolId) -> Position {
        self.positions.get(&symbol).copied().unwrap_or_default()
    }

    /// Sum of realized + unrealized P&L across every symbol, for feeding
    /// into [`crate::halt::HaltManager`] via the risk manager's `update_pnl`.
    #[must_use]
    pub fn total_pnl(&self) -> i64 {
        self.positions
            .values()
            .map(|p| p.realized_pnl + p.unrealized_pnl)
            .sum()
    }

    /// Every symbol with a non-flat position, for the halt/flatten sweep.
    pub fn open_positions(&self) -> impl Iterator<Item = (SymbolId, Position)> + '_ {
        self.positions
            .iter()
            .filter(|(_, p)| p.net_qty != 0)
            .map(|(&s, &p)| (s, p))
    }
}

fn mark_to_market(position: Position) -> i64 {
    if position.net_qty == 0 {
        return 0;
    }
    let diff = if position.net_qty > 0 {
        position.last_price - position.avg_entry_price
    } else {
        position.avg_entry_price - position.last_price
    };
    position.net_qty.abs() * diff / (i64::from(PRICE_SCALE) * i64::from(PRICE_SCALE))
}

fn order_notional(qty: Quantity, price: Price) -> i64 {
    (i64::from(qty.0) * i64::from(price.0)) / (i64::from(PRICE_SCALE) * i64::from(PRICE_SCALE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_fails_past_available_buying_power() {
        let mut acct = AccountManager::new(100);
        assert!(!acct.reserve(Quantity::from_units(1000), Price::new(1.0)));
    }

    #[test]
    fn reserve_then_release_restores_buying_power() {
        let mut acct = AccountManager::new(1_000_000);
        let qty = Quantity::from_units(10);
        let price = Price::new(1.0);
        assert!(acct.reserve(qty, price));
        let after_reserve = acct.available_buying_power();
        acct.release(qty, price);
        assert!(acct.available_buying_power() > after_reserve);
    }

    #[test]
    fn buying_fill_opens_a_long_position() {
        let mut acct = AccountManager::new(1_000_000);
        let symbol = SymbolId(1);
        acct.apply_fill(symbol, Side::Buy, Quantity::from_units(10), Price::new(100.0));
        let pos = acct.position(symbol);
        assert_eq!(pos.net_qty, Quantity::from_units(10).0 as i64);
    }

    #[test]
    fn closing_a_long_at_a_profit_realizes_pnl() {
        let mut acct = AccountManager::new(10_000_000);
        let symbol = SymbolId(1);
        acct.apply_fill(symbol, Side::Buy, Quantity::from_units(10), Price::new(100.0));
        acct.apply_fill(symbol, Side::Sell, Quantity::from_units(10), Price::new(105.0));
        let pos = acct.position(symbol);
        assert_eq!(pos.net_qty, 0);
        assert!(pos.realized_pnl > 0);
    }

    #[test]
    fn open_positions_excludes_flat_symbols() {
        let mut acct = AccountManager::new(10_000_000);
        let symbol = SymbolId(1);
        acct.apply_fill(symbol, Side::Buy, Quantity::from_units(5), Price::new(100.0));
        acct.apply_fill(symbol, Side::Sell, Quantity::from_units(5), Price::new(100.0));
        assert_eq!(acct.open_positions().count(), 0);
    }
}
