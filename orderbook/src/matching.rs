//! Price-time-priority matching engine composing a plain [`OrderBook`].
//!
//! The book itself never matches (spec §4.1's "naked-cross inputs are
//! accepted but leave the book inconsistent"); this module is the only
//! place crossing orders are resolved, and the only place self-trade
//! prevention and price-improvement are applied.

use crate::book::{BookConfig, OrderBook};
use common::{CoreError, OrderId, OrderResult, Price, Quantity, Side, SymbolId, Timestamp, TraderId};

/// A single match between an incoming aggressor and a resting passive order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trade {
    /// Order id of the incoming (crossing) order.
    pub aggressor_order_id: OrderId,
    /// Order id of the resting order it matched against.
    pub passive_order_id: OrderId,
    /// Trader owning the aggressor order.
    pub aggressor_trader_id: TraderId,
    /// Trader owning the passive order.
    pub passive_trader_id: TraderId,
    /// Fill price: always the passive order's price (price-improvement rule).
    pub price: Price,
    /// Quantity filled in this match.
    pub quantity: Quantity,
    /// Side of the aggressor.
    pub aggressor_side: Side,
    /// Time the match occurred.
    pub timestamp: Timestamp,
}

/// Outcome of [`MatchingEngine::add_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOrderOutcome {
    /// The aggressor's entire quantity filled against the book; no order rests.
    Filled {
        /// Total quantity matched.
        filled: Quantity,
    },
    /// The aggressor filled part or none of its quantity and rests with
    /// `resting` remaining.
    Rested {
        /// Quantity matched before resting.
        filled: Quantity,
        /// Quantity now resting in the book under the submitted id.
        resting: Quantity,
    },
    /// Self-trade prevention fired: the aggressor is cancelled outright and
    /// never rests, regardless of quantity filled before the self-trade was
    /// detected (spec §4.1, `CANCELLED_SELF_TRADE`).
    CancelledSelfTrade {
        /// Quantity matched against other traders before the self-trade was hit.
        filled: Quantity,
    },
}

impl AddOrderOutcome {
    /// Total quantity matched, regardless of outcome variant.
    #[must_use]
    pub const fn filled(&self) -> Quantity {
        match self {
            Self::Filled { filled }
            | Self::Rested { filled, .. }
            | Self::CancelledSelfTrade { filled } => *filled,
        }
    }
}

/// Wraps an [`OrderBook`] with price-time-priority matching, self-trade
/// prevention, and price improvement for the passive side.
pub struct MatchingEngine {
    book: OrderBook,
}

impl MatchingEngine {
    /// Build an empty matching engine for `symbol`.
    #[must_use]
    pub fn new(symbol: SymbolId, config: BookConfig) -> Self {
        Self {
            book: OrderBook::new(symbol, config),
        }
    }

    /// Read-only access to the underlying book (for `TopOfBook` projection,
    /// queries, etc).
    #[must_use]
    pub const fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Cancel a resting order. Delegates straight to the book; matching
    /// adds no additional semantics to cancellation.
    ///
    /// # Errors
    /// See [`OrderBook::cancel_order`].
    pub fn cancel_order(&mut self, id: OrderId) -> OrderResult<crate::order::Order> {
        self.book.cancel_order(id)
    }

    /// Submit an order with price-time-priority matching.
    ///
    /// Walks the opposite side's best level FIFO-first, filling against each
    /// eligible passive order at *its* price (price improvement) until the
    /// aggressor is exhausted, the limit price no longer crosses, or a
    /// same-trader passive order is reached (self-trade prevention, which
    /// cancels the aggressor's remainder outright rather than resting it).
    /// Any quantity left over after matching rests on the book following
    /// ordinary FIFO placement rules.
    ///
    /// `on_trade` is invoked once per match, in matching order, before this
    /// call returns.
    ///
    /// # Errors
    /// `InvalidOrderId`, `DuplicateOrderId`, `InvalidPrice`, `InvalidQuantity`
    /// as validated up front; `PoolExhausted`/`LevelPoolExhausted` if the
    /// unfilled remainder cannot be rested.
    pub fn add_order(
        &mut self,
        id: OrderId,
        trader_id: TraderId,
        side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: Timestamp,
        mut on_trade: impl FnMut(Trade),
    ) -> OrderResult<AddOrderOutcome> {
        if !id.is_valid() {
            return Err(CoreError::InvalidOrderId(id));
        }
        if self.book.contains(id) {
            return Err(CoreError::DuplicateOrderId(id));
        }
        if price.is_invalid() || price == Price::ZERO {
            return Err(CoreError::InvalidPrice);
        }
        if quantity.is_zero() {
            return Err(CoreError::InvalidQuantity);
        }

        let mut remaining = quantity;
        let mut total_filled = Quantity::ZERO;

        loop {
            if remaining.is_zero() {
                break;
            }
            let opposite = side.opposite();
            let Some((level_price, head_index)) = self.book.best_level_head(opposite) else {
                break;
            };
            let crosses = match side {
                Side::Buy => level_price <= price,
                Side::Sell => level_price >= price,
            };
            if !crosses {
                break;
            }

            let passive = *self.book.order_at(head_index);

            if !trader_id.is_anonymous() && passive.trader_id == trader_id {
                return Ok(AddOrderOutcome::CancelledSelfTrade { filled: total_filled });
            }

            let fill_qty = Quantity(remaining.0.min(passive.quantity.0));
            on_trade(Trade {
                aggressor_order_id: id,
                passive_order_id: passive.id,
                aggressor_trader_id: trader_id,
                passive_trader_id: passive.trader_id,
                price: level_price,
                quantity: fill_qty,
                aggressor_side: side,
                timestamp,
            });

            self.book.execute_order(head_index, fill_qty);
            remaining = remaining.saturating_sub(fill_qty);
            total_filled = Quantity(total_filled.0 + fill_qty.0);
        }

        if remaining.is_zero() {
            Ok(AddOrderOutcome::Filled { filled: total_filled })
        } else {
            self.book
                .add_order(id, trader_id, price, remaining, side, timestamp)?;
            Ok(AddOrderOutcome::Rested {
                filled: total_filled,
                resting: remaining,
            })
        }
    }
}
