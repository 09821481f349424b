//! Price levels, each owning a FIFO chain of order-pool indices plus its
//! own position in the side's sorted level list.

use crate::pool::Slot;
use common::{Price, Quantity};

/// A single price level: a FIFO queue of orders (by index into the order
/// pool) and this level's neighbors in the side's sorted level list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    /// Price this level is resting at.
    pub price: Price,
    /// Sum of all resting order quantities at this price.
    pub total_quantity: Quantity,
    /// First (oldest) order at this price, `None` if empty.
    pub head: Option<u32>,
    /// Last (newest) order at this price, `None` if empty.
    pub tail: Option<u32>,
    /// Previous (better-priced, for the owning side's ordering) level.
    pub prev: Option<u32>,
    /// Next (worse-priced) level.
    pub next: Option<u32>,
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self {
            price: Price::ZERO,
            total_quantity: Quantity::ZERO,
            head: None,
            tail: None,
            prev: None,
            next: None,
        }
    }
}

impl PriceLevel {
    /// True once every order at this price has filled or cancelled.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Credit `qty` to the level's aggregate (an order was added or grown).
    pub fn add_quantity(&mut self, qty: Quantity) {
        self.total_quantity = Quantity(self.total_quantity.0.saturating_add(qty.0));
    }

    /// Debit `qty` from the level's aggregate (a fill or cancel shrank it).
    pub fn reduce_quantity(&mut self, qty: Quantity) {
        self.total_quantity = self.total_quantity.saturating_sub(qty);
    }
}

impl Slot for PriceLevel {
    fn next_free(&self) -> Option<u32> {
        self.next
    }
    fn set_next_free(&mut self, next: Option<u32>) {
        self.next = next;
    }
}
