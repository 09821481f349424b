//! Resting order slots, indexed rather than linked by pointer (spec §9
//! REDESIGN FLAG: intrusive C++ linked lists become slab indices here).

use crate::pool::Slot;
use common::{OrderId, Price, Quantity, Side, SymbolId, Timestamp, TraderId};

/// A resting order. `prev`/`next` are indices into the order pool forming
/// the doubly-linked FIFO chain for the price level it belongs to; `None`
/// marks an end of that chain (or, when the slot is free, the free-list
/// successor via [`Slot`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    /// Public order identifier.
    pub id: OrderId,
    /// Owning trader, used for self-trade prevention.
    pub trader_id: TraderId,
    /// Acceptance time, used to break ties within a price level.
    pub timestamp: Timestamp,
    /// Instrument this order is resting on.
    pub symbol: SymbolId,
    /// Limit price.
    pub price: Price,
    /// Remaining (unfilled) quantity.
    pub quantity: Quantity,
    /// Side of the book.
    pub side: Side,
    /// Previous order at the same price level (index), `None` at the head.
    pub prev: Option<u32>,
    /// Next order at the same price level (index), `None` at the tail.
    pub next: Option<u32>,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            id: OrderId::INVALID,
            trader_id: TraderId::ANONYMOUS,
            timestamp: Timestamp(0),
            symbol: SymbolId(0),
            price: Price::ZERO,
            quantity: Quantity::ZERO,
            side: Side::Buy,
            prev: None,
            next: None,
        }
    }
}

impl Order {
    /// True once the resting quantity has been fully consumed.
    #[must_use]
    pub const fn is_fully_filled(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Reduce the resting quantity by `filled`, floored at zero.
    pub fn reduce_quantity(&mut self, filled: Quantity) {
        self.quantity = self.quantity.saturating_sub(filled);
    }
}

impl Slot for Order {
    fn next_free(&self) -> Option<u32> {
        self.next
    }
    fn set_next_free(&mut self, next: Option<u32>) {
        self.next = next;
    }
}
