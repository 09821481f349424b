//! The `Strategy` interface strategies implement to participate in the
//! trading loop (spec §1, §6).
//!
//! Only the interface lives in this workspace — no EMA/RSI/Bollinger
//! formulas, no regime-to-strategy mode-selection ladder. Those are the
//! owning trading desk's intellectual property and sit outside this repo,
//! consuming the same trait. [`NoopStrategy`] below exists purely so the
//! execution path has something concrete to drive in tests, grounded in the
//! shape (not the content) of `services/trading-gateway/src/strategy.rs`'s
//! `TradingStrategy` trait.

use common::SymbolId;
use lob::{BookSnapshot, TopOfBook};

use crate::signal::{MarketRegime, Signal};

/// A symbol-scoped trading strategy.
///
/// Implementations are expected to be cheap to call every tick; none of the
/// methods here are `async` since the trading thread is single-threaded and
/// cooperative (spec §5) — a strategy that needs I/O should stage results
/// into its own state from a separate thread and have `generate` read that
/// state.
pub trait Strategy {
    /// Produce this tick's signal for `symbol`, given the current book view,
    /// this strategy's net position, and the prevailing market regime.
    fn generate(
        &mut self,
        symbol: SymbolId,
        snapshot: &BookSnapshot,
        position: i64,
        regime: MarketRegime,
    ) -> Signal;

    /// Notified on every top-of-book update, independent of whether
    /// `generate` is called this tick (e.g. to maintain rolling state).
    fn on_tick(&mut self, top: &TopOfBook);

    /// Clear all accumulated state, as after a halt/reset cycle.
    fn reset(&mut self);

    /// Whether this strategy has enough history to produce a meaningful
    /// signal yet (e.g. warm-up period for a moving average).
    fn ready(&self) -> bool;

    /// Whether this strategy should be consulted at all under `regime`.
    fn suitable_for_regime(&self, regime: MarketRegime) -> bool;

    /// A short identifying name, for logging and the tuning CLI surface.
    fn name(&self) -> &str;
}

/// A strategy that never signals. Exercises the [`Strategy`] trait and the
/// execution path's plumbing without expressing any trading opinion.
#[derive(Debug, Default)]
pub struct NoopStrategy {
    ready: bool,
}

impl NoopStrategy {
    /// Build a strategy that reports `ready` once constructed.
    #[must_use]
    pub const fn new() -> Self {
        Self { ready: true }
    }
}

impl Strategy for NoopStrategy {
    fn generate(
        &mut self,
        _symbol: SymbolId,
        _snapshot: &BookSnapshot,
        _position: i64,
        _regime: MarketRegime,
    ) -> Signal {
        Signal::none()
    }

    fn on_tick(&mut self, _top: &TopOfBook) {}

    fn reset(&mut self) {
        self.ready = true;
    }

    fn ready(&self) -> bool {
        self.ready
    }

    fn suitable_for_regime(&self, _regime: MarketRegime) -> bool {
        true
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Price, SymbolId};
    use lob::TopOfBook;

    #[test]
    fn noop_strategy_never_signals() {
        let mut strat = NoopStrategy::new();
        let top = TopOfBook::new(SymbolId(1));
        let snap = BookSnapshot::from_top_of_book(&top);
        let signal = strat.generate(SymbolId(1), &snap, 0, MarketRegime::Unknown);
        assert!(!signal.is_actionable());
        assert!(strat.ready());
        assert!(strat.suitable_for_regime(MarketRegime::Spike));
    }

    #[test]
    fn reset_leaves_strategy_ready() {
        let mut strat = NoopStrategy::new();
        strat.reset();
        assert!(strat.ready());
    }

    #[test]
    fn limit_price_round_trips_through_signal() {
        let s = Signal {
            limit_price: Some(Price::new(101.25)),
            ..Signal::none()
        };
        assert_eq!(s.limit_price.unwrap().as_f64(), 101.25);
    }
}
