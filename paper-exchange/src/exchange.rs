//! Simulated exchange producing [`ExecutionReport`]s identical in shape to a
//! real venue adapter's, so the engine processes fills without knowing
//! their source (spec §5). Grounded in
//! `original_source/include/exchange/paper_exchange.hpp`.
//!
//! Fill logic is pessimistic: market orders fill at the current bid/ask
//! plus adverse slippage, and limit orders fill only once the market has
//! strictly crossed the limit, at the crossed price (not the limit) plus
//! slippage — never at a price better than what was actually observed.

use common::{FillQty, Side, SymbolId, Timestamp};
use ipc::ExecutionReport;

/// Default adverse slippage applied to every fill, in basis points, used
/// when no [`PaperExchangeConfig`](common::config::PaperExchangeConfig) or
/// shared runtime override is attached.
pub const DEFAULT_SLIPPAGE_BPS: f64 = 5.0;

/// One resting (unfilled) limit order.
#[derive(Debug, Clone, Copy)]
struct PendingLimitOrder {
    symbol: SymbolId,
    order_id: u64,
    side: Side,
    quantity: FillQty,
    limit_price: f64,
    submit_time_ns: u64,
}

/// Exchange-facing order-entry surface. A live venue adapter implements the
/// same trait so the engine's execution path is agnostic to paper vs. real
/// (spec §5, §6).
pub trait Exchange {
    /// Submit a market order; fills immediately against the current
    /// bid/ask.
    fn send_market_order(
        &mut self,
        symbol: SymbolId,
        side: Side,
        quantity: FillQty,
        bid: f64,
        ask: f64,
        timestamp: Timestamp,
    ) -> ExecutionReport;

    /// Submit a limit order; rests until [`Self::on_price_update`] observes
    /// a crossing quote, or it is cancelled.
    ///
    /// A full pending table yields a `Rejected` report rather than an
    /// `Err`, mirroring the reference `send_limit_order`, which always
    /// returns a report.
    fn send_limit_order(
        &mut self,
        symbol: SymbolId,
        side: Side,
        quantity: FillQty,
        limit_price: f64,
        timestamp: Timestamp,
    ) -> ExecutionReport;

    /// Cancel a resting limit order. Returns `None` if it was not found.
    fn cancel_order(&mut self, order_id: u64, timestamp: Timestamp) -> Option<ExecutionReport>;

    /// Re-check every resting limit order for `symbol` against a fresh
    /// quote, firing fills (and the execution callback) for any that have
    /// crossed.
    fn on_price_update(&mut self, symbol: SymbolId, bid: f64, ask: f64, timestamp: Timestamp);
}

/// Simulated exchange with pessimistic fill semantics (spec §5).
///
/// Market orders fill at `ask` (buy) / `bid` (sell) plus adverse slippage.
/// Limit orders rest in a bounded table until the market strictly crosses
/// the limit (`ask < limit` for a buy, `bid > limit` for a sell), then fill
/// at the crossed price (never at the limit itself) plus slippage.
pub struct PaperExchange {
    pending: Vec<Option<PendingLimitOrder>>,
    next_order_id: u64,
    slippage_bps: f64,
    commission_rate: f64,
    total_slippage: f64,
    on_execution: Option<Box<dyn FnMut(&ExecutionReport)>>,
    on_slippage: Option<Box<dyn FnMut(f64)>>,
}

impl PaperExchange {
    /// Build a simulator with `max_pending_orders` resting-limit-order
    /// capacity, using `slippage_bps`/`commission_rate` for fills (spec
    /// §5, mirroring [`common::config::PaperExchangeConfig`]).
    #[must_use]
    pub fn new(max_pending_orders: u32, slippage_bps: f64, commission_rate: f64) -> Self {
        Self {
            pending: vec![None; max_pending_orders as usize],
            next_order_id: 1,
            slippage_bps,
            commission_rate,
            total_slippage: 0.0,
            on_execution: None,
            on_slippage: None,
        }
    }

    /// Register a callback invoked with every [`ExecutionReport`] this
    /// exchange produces.
    pub fn set_execution_callback(&mut self, callback: impl FnMut(&ExecutionReport) + 'static) {
        self.on_execution = Some(Box::new(callback));
    }

    /// Register a callback invoked with the dollar cost of slippage on
    /// every fill, for portfolio-level cost tracking (spec §5).
    pub fn set_slippage_callback(&mut self, callback: impl FnMut(f64) + 'static) {
        self.on_slippage = Some(Box::new(callback));
    }

    /// Number of currently pending (unfilled, uncancelled) limit orders.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.iter().filter(|o| o.is_some()).count()
    }

    /// Cumulative dollar slippage cost charged across every fill so far.
    #[must_use]
    pub const fn total_slippage(&self) -> f64 {
        self.total_slippage
    }

    /// Look up a still-pending limit order by id, for inspection/testing.
    #[must_use]
    pub fn find_order(&self, order_id: u64) -> Option<(SymbolId, Side, FillQty, f64)> {
        self.pending
            .iter()
            .flatten()
            .find(|o| o.order_id == order_id)
            .map(|o| (o.symbol, o.side, o.quantity, o.limit_price))
    }

    fn find_free_slot(&self) -> Option<usize> {
        self.pending.iter().position(Option::is_none)
    }

    fn commission(&self, notional: f64) -> f64 {
        notional * self.commission_rate
    }

    fn apply_adverse_slippage(&mut self, side: Side, base_price: f64, quantity: FillQty) -> f64 {
        let slippage_rate = self.slippage_bps / 10_000.0;
        let slippage_amount = base_price * slippage_rate;
        let signed = match side {
            Side::Buy => slippage_amount,
            Side::Sell => -slippage_amount,
        };
        let cost = slippage_amount * quantity;
        self.total_slippage += cost;
        if let Some(cb) = self.on_slippage.as_mut() {
            cb(cost);
        }
        base_price + signed
    }

    fn emit(&mut self, report: ExecutionReport) -> ExecutionReport {
        if let Some(cb) = self.on_execution.as_mut() {
            cb(&report);
        }
        report
    }
}

impl Exchange for PaperExchange {
    fn send_market_order(
        &mut self,
        symbol: SymbolId,
        side: Side,
        quantity: FillQty,
        bid: f64,
        ask: f64,
        timestamp: Timestamp,
    ) -> ExecutionReport {
        let order_id = self.next_order_id;
        self.next_order_id += 1;

        let base_price = if side == Side::Buy { ask } else { bid };
        let fill_price = self.apply_adverse_slippage(side, base_price, quantity);
        let commission = self.commission(quantity * fill_price);

        let report = ExecutionReport::market_fill_fractional(
            symbol,
            order_id,
            side,
            quantity,
            fill_price,
            commission,
            timestamp.as_nanos(),
        );
        self.emit(report)
    }

    fn send_limit_order(
        &mut self,
        symbol: SymbolId,
        side: Side,
        quantity: FillQty,
        limit_price: f64,
        timestamp: Timestamp,
    ) -> ExecutionReport {
        let order_id = self.next_order_id;
        self.next_order_id += 1;

        let Some(slot) = self.find_free_slot() else {
            let report = ExecutionReport::rejected(
                symbol,
                order_id,
                side,
                ipc::ReportOrderType::Limit,
                "MAX_PENDING_EXCEEDED",
                timestamp.as_nanos(),
            );
            return self.emit(report);
        };

        self.pending[slot] = Some(PendingLimitOrder {
            symbol,
            order_id,
            side,
            quantity,
            limit_price,
            submit_time_ns: timestamp.as_nanos(),
        });

        let report = ExecutionReport::limit_accepted(symbol, order_id, side, timestamp.as_nanos());
        self.emit(report)
    }

    fn cancel_order(&mut self, order_id: u64, timestamp: Timestamp) -> Option<ExecutionReport> {
        let slot = self.pending.iter().position(|o| matches!(o, Some(p) if p.order_id == order_id))?;
        let order = self.pending[slot].take()?;
        let report = ExecutionReport::cancelled(order.symbol, order_id, order.side, 0.0, timestamp.as_nanos());
        Some(self.emit(report))
    }

    fn on_price_update(&mut self, symbol: SymbolId, bid: f64, ask: f64, timestamp: Timestamp) {
        if self.pending_count() == 0 {
            return;
        }

        for slot in 0..self.pending.len() {
            let Some(order) = self.pending[slot] else { continue };
            if order.symbol != symbol {
                continue;
            }

            let crossed_price = match order.side {
                Side::Buy if ask < order.limit_price => Some(ask),
                Side::Sell if bid > order.limit_price => Some(bid),
                _ => None,
            };
            let Some(base_price) = crossed_price else { continue };

            let fill_price = self.apply_adverse_slippage(order.side, base_price, order.quantity);
            let commission = self.commission(order.quantity * fill_price);

            let report = ExecutionReport::limit_fill(
                order.symbol,
                order.order_id,
                order.side,
                order.quantity,
                fill_price,
                order.quantity,
                commission,
                order.submit_time_ns,
                timestamp.as_nanos(),
                true,
            );
            self.pending[slot] = None;
            self.emit(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange() -> PaperExchange {
        PaperExchange::new(8, DEFAULT_SLIPPAGE_BPS, 0.001)
    }

    #[test]
    fn market_buy_fills_at_ask_plus_adverse_slippage() {
        let mut ex = exchange();
        let report = ex.send_market_order(SymbolId(1), Side::Buy, 1.0, 99.0, 100.0, Timestamp(1));
        assert!(report.is_fill());
        assert!(report.filled_price() > 100.0);
        assert_eq!(report.filled_qty(), 1.0);
    }

    #[test]
    fn market_sell_fills_at_bid_minus_adverse_slippage() {
        let mut ex = exchange();
        let report = ex.send_market_order(SymbolId(1), Side::Sell, 1.0, 99.0, 100.0, Timestamp(1));
        assert!(report.filled_price() < 99.0);
    }

    #[test]
    fn limit_order_rests_until_price_crosses() {
        let mut ex = exchange();
        let accept = ex.send_limit_order(SymbolId(1), Side::Buy, 2.0, 100.0, Timestamp(1));
        assert_eq!(accept.status(), ipc::OrderStatus::New);
        assert_eq!(ex.pending_count(), 1);

        // Ask still above our limit: no fill.
        ex.on_price_update(SymbolId(1), 99.0, 100.5, Timestamp(2));
        assert_eq!(ex.pending_count(), 1);

        // Ask drops below our limit: fills at the crossed ask, not 100.0.
        ex.on_price_update(SymbolId(1), 98.0, 99.5, Timestamp(3));
        assert_eq!(ex.pending_count(), 0);
    }

    #[test]
    fn limit_sell_fills_only_when_bid_rises_above_limit() {
        let mut ex = exchange();
        ex.send_limit_order(SymbolId(1), Side::Sell, 1.0, 100.0, Timestamp(1));
        ex.on_price_update(SymbolId(1), 100.0, 100.5, Timestamp(2));
        assert_eq!(ex.pending_count(), 1, "bid == limit, not strictly crossed");
        ex.on_price_update(SymbolId(1), 100.01, 100.5, Timestamp(3));
        assert_eq!(ex.pending_count(), 0);
    }

    #[test]
    fn pending_table_rejects_once_full() {
        let mut ex = PaperExchange::new(1, DEFAULT_SLIPPAGE_BPS, 0.001);
        ex.send_limit_order(SymbolId(1), Side::Buy, 1.0, 100.0, Timestamp(1));
        let rejected = ex.send_limit_order(SymbolId(1), Side::Buy, 1.0, 100.0, Timestamp(2));
        assert_eq!(rejected.status(), ipc::OrderStatus::Rejected);
    }

    #[test]
    fn cancel_removes_pending_order() {
        let mut ex = exchange();
        let accepted = ex.send_limit_order(SymbolId(1), Side::Buy, 1.0, 100.0, Timestamp(1));
        let cancelled = ex.cancel_order(accepted.order_id(), Timestamp(2)).unwrap();
        assert_eq!(cancelled.status(), ipc::OrderStatus::Cancelled);
        assert_eq!(ex.pending_count(), 0);
    }

    #[test]
    fn cancel_unknown_order_returns_none() {
        let mut ex = exchange();
        assert!(ex.cancel_order(999, Timestamp(1)).is_none());
    }

    #[test]
    fn slippage_accumulates_across_fills() {
        let mut ex = exchange();
        ex.send_market_order(SymbolId(1), Side::Buy, 1.0, 99.0, 100.0, Timestamp(1));
        ex.send_market_order(SymbolId(1), Side::Buy, 1.0, 99.0, 100.0, Timestamp(2));
        assert!(ex.total_slippage() > 0.0);
    }
}
