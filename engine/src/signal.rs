//! Strategy output types: [`Signal`], [`Strength`] and [`OrderPreference`]
//! (spec §6).
//!
//! A `Signal` is a plain value, not an order — [`crate::execution::ExecutionEngine`]
//! is the only thing that turns one into an order intent, after consulting
//! risk, rate limits and the account's buying power.

use common::Price;

/// Directional classification of a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// No actionable view; the strategy has nothing to say this tick.
    None,
    /// Open or add to a long.
    Buy,
    /// Open or add to a short.
    Sell,
    /// Close the current position in this symbol.
    Exit,
}

/// How strongly a strategy holds its view, used by the execution engine to
/// scale suggested size and to gate low-conviction signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strength {
    /// No conviction (paired with [`SignalKind::None`]).
    None,
    /// Weak conviction.
    Weak,
    /// Medium conviction.
    Medium,
    /// Strong conviction.
    Strong,
}

/// A strategy's preference for how its signal should be worked, consulted by
/// the adaptive order-type timeout policy (spec §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPreference {
    /// Insist on immediate fill at the current touch.
    Market,
    /// Rest at `limit_price` until it times out or crosses.
    Limit,
    /// Let the execution engine choose, per its own book-pressure heuristic.
    Either,
}

/// The market regime a symbol is currently classified under (spec's
/// `regime_strategy` CLI surface and `RegimeChange` tuner event), passed into
/// [`crate::strategy::Strategy::generate`] so a strategy can decline to act
/// outside the regimes it was designed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketRegime {
    /// No regime classification yet, or the detector is disabled.
    Unknown,
    /// Sustained upward drift.
    TrendingUp,
    /// Sustained downward drift.
    TrendingDown,
    /// Mean-reverting, no sustained drift.
    Ranging,
    /// Elevated realized volatility without a clear direction.
    HighVol,
    /// Unusually quiet.
    LowVol,
    /// A sudden, short-lived dislocation.
    Spike,
}

/// A strategy's recommendation for one symbol on one tick (spec §6).
///
/// Produced by [`crate::strategy::Strategy::generate`]; carries everything
/// the execution engine needs to size and route an order without calling
/// back into the strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    /// Directional classification.
    pub kind: SignalKind,
    /// Conviction level.
    pub strength: Strength,
    /// Suggested order size, in whole units (fractional sizes are valid —
    /// see [`common::FillQty`]). Zero for [`SignalKind::None`].
    pub suggested_quantity: f64,
    /// How the strategy would like this signal worked.
    pub order_preference: OrderPreference,
    /// Limit price to use when `order_preference` is
    /// [`OrderPreference::Limit`] or [`OrderPreference::Either`] picks a
    /// limit order. `None` when the strategy has no price view.
    pub limit_price: Option<Price>,
    /// Short human-readable justification, for logging and post-trade review.
    pub reason: &'static str,
}

impl Signal {
    /// The canonical "nothing to do" signal.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            kind: SignalKind::None,
            strength: Strength::None,
            suggested_quantity: 0.0,
            order_preference: OrderPreference::Either,
            limit_price: None,
            reason: "no signal",
        }
    }

    /// True if this signal calls for an order at all.
    #[must_use]
    pub const fn is_actionable(&self) -> bool {
        !matches!(self.kind, SignalKind::None)
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_signal_is_not_actionable() {
        assert!(!Signal::none().is_actionable());
    }

    #[test]
    fn buy_signal_is_actionable() {
        let s = Signal {
            kind: SignalKind::Buy,
            strength: Strength::Strong,
            suggested_quantity: 1.5,
            order_preference: OrderPreference::Market,
            limit_price: None,
            reason: "breakout",
        };
        assert!(s.is_actionable());
    }

    #[test]
    fn strength_ordering_places_none_lowest() {
        assert!(Strength::None < Strength::Weak);
        assert!(Strength::Weak < Strength::Medium);
        assert!(Strength::Medium < Strength::Strong);
    }
}
