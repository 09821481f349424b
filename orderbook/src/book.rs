//! The order book proper: pools plus the two sides, addressable by
//! `OrderId` through a dense index array (bounded by `max_orders`, spec §3).
//!
//! `OrderBook` performs no matching; it only places and removes resting
//! orders, maintaining each level's FIFO queue and the side's sorted level
//! chain. [`crate::matching::MatchingEngine`] composes an `OrderBook` and
//! adds price-time-priority matching on top (spec §4.1/§4.2's "plain
//! `OrderBook`... does not match" split).

use crate::book_side::{Ask, Bid, BookSide};
use crate::level::PriceLevel;
use crate::order::Order;
use crate::pool::Pool;
use common::{CoreError, OrderId, OrderResult, Price, Quantity, Side, SymbolId, Timestamp, TraderId};

/// Configuration for one [`OrderBook`] instance.
#[derive(Debug, Clone, Copy)]
pub struct BookConfig {
    /// Maximum number of resting orders.
    pub max_orders: u32,
    /// Maximum number of distinct price levels (shared by both sides).
    pub max_price_levels: u32,
    /// Lowest tick representable in the dense level-index arrays.
    pub base_price: u32,
    /// Width, in ticks, of the dense level-index arrays.
    pub price_range: u32,
}

impl From<&common::config::OrderBookConfig> for BookConfig {
    fn from(cfg: &common::config::OrderBookConfig) -> Self {
        Self {
            max_orders: cfg.max_orders,
            max_price_levels: cfg.max_price_levels,
            base_price: cfg.base_price,
            price_range: cfg.price_range,
        }
    }
}

/// A price-time-ordered book for one symbol: bid side, ask side, and the
/// pools backing both.
pub struct OrderBook {
    symbol: SymbolId,
    max_orders: usize,
    order_pool: Pool<Order>,
    level_pool: Pool<PriceLevel>,
    bids: BookSide<Bid>,
    asks: BookSide<Ask>,
    order_index: Vec<Option<u32>>,
}

impl OrderBook {
    /// Build an empty book for `symbol` with the given pool/range config.
    #[must_use]
    pub fn new(symbol: SymbolId, config: BookConfig) -> Self {
        Self {
            symbol,
            max_orders: config.max_orders as usize,
            order_pool: Pool::new(config.max_orders),
            level_pool: Pool::new(config.max_price_levels),
            bids: BookSide::new(config.base_price, config.price_range),
            asks: BookSide::new(config.base_price, config.price_range),
            order_index: vec![None; config.max_orders as usize + 1],
            // +1: order ids are 1-based, slot 0 is never populated.
        }
    }

    /// Symbol this book is for.
    #[must_use]
    pub const fn symbol(&self) -> SymbolId {
        self.symbol
    }

    fn index_slot(&self, id: OrderId) -> OrderResult<usize> {
        let slot = id.0 as usize;
        if id.is_valid() && slot < self.order_index.len() {
            Ok(slot)
        } else {
            Err(CoreError::InvalidOrderId(id))
        }
    }

    /// Place a resting order in the book. Does not match against the
    /// opposite side; callers that need matching go through
    /// [`crate::matching::MatchingEngine`].
    ///
    /// # Errors
    /// `InvalidOrderId` if the id is zero or out of range, `DuplicateOrderId`
    /// if already resting, `InvalidPrice`/`InvalidQuantity` for zero inputs,
    /// `PoolExhausted`/`LevelPoolExhausted` if a pool has no free slots.
    pub fn add_order(
        &mut self,
        id: OrderId,
        trader_id: TraderId,
        price: Price,
        quantity: Quantity,
        side: Side,
        timestamp: Timestamp,
    ) -> OrderResult<()> {
        let slot = self.index_slot(id)?;
        if self.order_index[slot].is_some() {
            return Err(CoreError::DuplicateOrderId(id));
        }
        if price.is_invalid() || price == Price::ZERO {
            return Err(CoreError::InvalidPrice);
        }
        if quantity.is_zero() {
            return Err(CoreError::InvalidQuantity);
        }

        let level_index = match side {
            Side::Buy => self.bids.find_or_insert_level(&mut self.level_pool, price)?,
            Side::Sell => self.asks.find_or_insert_level(&mut self.level_pool, price)?,
        };

        let order = Order {
            id,
            trader_id,
            timestamp,
            symbol: self.symbol,
            price,
            quantity,
            side,
            prev: None,
            next: None,
        };
        let order_index = self
            .order_pool
            .allocate(order)
            .ok_or(CoreError::PoolExhausted)?;

        self.append_to_level(level_index, order_index);
        self.level_pool.get_mut(level_index).add_quantity(quantity);
        self.order_index[slot] = Some(order_index);
        Ok(())
    }

    fn append_to_level(&mut self, level_index: u32, order_index: u32) {
        let tail = self.level_pool.get(level_index).tail;
        self.order_pool.get_mut(order_index).prev = tail;
        self.order_pool.get_mut(order_index).next = None;
        match tail {
            Some(t) => self.order_pool.get_mut(t).next = Some(order_index),
            None => self.level_pool.get_mut(level_index).head = Some(order_index),
        }
        self.level_pool.get_mut(level_index).tail = Some(order_index);
    }

    fn unlink_from_level(&mut self, order_index: u32) {
        let (prev, next) = {
            let order = self.order_pool.get(order_index);
            (order.prev, order.next)
        };
        let price = self.order_pool.get(order_index).price;
        let side = self.order_pool.get(order_index).side;
        let level_index = match side {
            Side::Buy => self.bids.find_level(price),
            Side::Sell => self.asks.find_level(price),
        };
        let Some(level_index) = level_index else {
            return;
        };

        match prev {
            Some(p) => self.order_pool.get_mut(p).next = next,
            None => self.level_pool.get_mut(level_index).head = next,
        }
        match next {
            Some(n) => self.order_pool.get_mut(n).prev = prev,
            None => self.level_pool.get_mut(level_index).tail = prev,
        }

        match side {
            Side::Buy => self.bids.remove_if_empty(&mut self.level_pool, level_index),
            Side::Sell => self.asks.remove_if_empty(&mut self.level_pool, level_index),
        }
    }

    /// Cancel a resting order, returning a copy of it as it stood before removal.
    ///
    /// # Errors
    /// `InvalidOrderId` if out of range, `OrderNotFound` if not currently resting.
    pub fn cancel_order(&mut self, id: OrderId) -> OrderResult<Order> {
        let slot = self.index_slot(id)?;
        let order_index = self.order_index[slot].ok_or(CoreError::OrderNotFound(id))?;
        let order = *self.order_pool.get(order_index);

        let level_index = match order.side {
            Side::Buy => self.bids.find_level(order.price),
            Side::Sell => self.asks.find_level(order.price),
        };
        if let Some(level_index) = level_index {
            self.level_pool.get_mut(level_index).reduce_quantity(order.quantity);
        }
        self.unlink_from_level(order_index);
        self.order_pool.deallocate(order_index);
        self.order_index[slot] = None;
        Ok(order)
    }

    /// Reduce a resting order's quantity by `by` — a venue-reported
    /// execution or partial cancel applied while reconstructing a book from
    /// a market-data feed, as opposed to a fill produced by this process's
    /// own matching engine. Removes the order entirely if that fully
    /// consumes it.
    ///
    /// # Errors
    /// `InvalidOrderId`/`OrderNotFound` as for [`Self::cancel_order`].
    pub fn reduce_order(&mut self, id: OrderId, by: Quantity) -> OrderResult<()> {
        let slot = self.index_slot(id)?;
        let order_index = self.order_index[slot].ok_or(CoreError::OrderNotFound(id))?;
        self.execute_order(order_index, by);
        Ok(())
    }

    /// Reduce a resting order's quantity by `filled`, removing it entirely
    /// (deallocating the slot and unlinking from its level) if that fully
    /// consumes it. Used by the matching engine during trade execution.
    pub(crate) fn execute_order(&mut self, order_index: u32, filled: Quantity) {
        let price = self.order_pool.get(order_index).price;
        let side = self.order_pool.get(order_index).side;
        self.order_pool.get_mut(order_index).reduce_quantity(filled);

        let level_index = match side {
            Side::Buy => self.bids.find_level(price),
            Side::Sell => self.asks.find_level(price),
        };
        if let Some(level_index) = level_index {
            self.level_pool.get_mut(level_index).reduce_quantity(filled);
        }

        if self.order_pool.get(order_index).is_fully_filled() {
            let id = self.order_pool.get(order_index).id;
            if let Ok(slot) = self.index_slot(id) {
                self.order_index[slot] = None;
            }
            self.unlink_from_level(order_index);
            self.order_pool.deallocate(order_index);
        }
    }

    /// Best (highest) resting bid price.
    #[must_use]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best().map(|idx| self.level_pool.get(idx).price)
    }

    /// Best (lowest) resting ask price.
    #[must_use]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best().map(|idx| self.level_pool.get(idx).price)
    }

    /// Aggregate resting bid quantity at `price`.
    #[must_use]
    pub fn bid_quantity_at(&self, price: Price) -> Option<Quantity> {
        self.bids.quantity_at(&self.level_pool, price)
    }

    /// Aggregate resting ask quantity at `price`.
    #[must_use]
    pub fn ask_quantity_at(&self, price: Price) -> Option<Quantity> {
        self.asks.quantity_at(&self.level_pool, price)
    }

    /// Number of orders currently resting.
    #[must_use]
    pub fn order_count(&self) -> u32 {
        self.order_pool.allocated()
    }

    /// Free order-pool slots remaining, for the halt manager's
    /// warning/critical pool-pressure thresholds (spec §4.1/§4.6).
    #[must_use]
    pub fn free_order_slots(&self) -> u32 {
        self.order_pool.free_count()
    }

    /// Total order-pool capacity, the denominator for pool-pressure ratios.
    #[must_use]
    pub fn order_pool_capacity(&self) -> u32 {
        self.order_pool.capacity()
    }

    pub(crate) fn pools(&self) -> (&Pool<Order>, &Pool<PriceLevel>) {
        (&self.order_pool, &self.level_pool)
    }

    pub(crate) fn bids_side(&self) -> &BookSide<Bid> {
        &self.bids
    }

    pub(crate) fn asks_side(&self) -> &BookSide<Ask> {
        &self.asks
    }

    pub(crate) fn order_pool_mut(&mut self) -> &mut Pool<Order> {
        &mut self.order_pool
    }

    /// True if `id` currently names a resting order.
    #[must_use]
    pub fn contains(&self, id: OrderId) -> bool {
        self.index_slot(id)
            .ok()
            .and_then(|slot| self.order_index[slot])
            .is_some()
    }

    /// Price and pool index of the FIFO head at the best level on `side`,
    /// used by [`crate::matching::MatchingEngine`] to find the next passive
    /// order to cross against.
    #[must_use]
    pub(crate) fn best_level_head(&self, side: Side) -> Option<(Price, u32)> {
        let level_index = match side {
            Side::Buy => self.bids.best(),
            Side::Sell => self.asks.best(),
        }?;
        let level = self.level_pool.get(level_index);
        level.head.map(|head| (level.price, head))
    }

    /// Borrow a live resting order by its pool index.
    #[must_use]
    pub(crate) fn order_at(&self, index: u32) -> &Order {
        self.order_pool.get(index)
    }

    /// Fill `out` with up to `out.len()` best levels on `side` (best first:
    /// descending price for bids, ascending for asks), returning how many
    /// were written. Allocation-free, for the hot-path `TopOfBook`
    /// projection (spec §3/§4.2).
    pub fn top_levels(&self, side: Side, out: &mut [(Price, Quantity)]) -> usize {
        let mut level_index = match side {
            Side::Buy => self.bids.best(),
            Side::Sell => self.asks.best(),
        };
        let mut count = 0;
        while count < out.len() {
            let Some(idx) = level_index else { break };
            let level = self.level_pool.get(idx);
            out[count] = (level.price, level.total_quantity);
            count += 1;
            level_index = level.next;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> OrderBook {
        OrderBook::new(
            SymbolId(1),
            BookConfig {
                max_orders: 64,
                max_price_levels: 64,
                base_price: 0,
                price_range: 1_000_000,
            },
        )
    }

    #[test]
    fn add_order_updates_best_bid() {
        let mut b = book();
        b.add_order(OrderId(1), TraderId(1), Price(100), Quantity(10), Side::Buy, Timestamp(1))
            .unwrap();
        assert_eq!(b.best_bid(), Some(Price(100)));
        assert_eq!(b.bid_quantity_at(Price(100)), Some(Quantity(10)));
    }

    #[test]
    fn cancel_order_removes_level_when_empty() {
        let mut b = book();
        b.add_order(OrderId(1), TraderId(1), Price(100), Quantity(10), Side::Buy, Timestamp(1))
            .unwrap();
        let cancelled = b.cancel_order(OrderId(1)).unwrap();
        assert_eq!(cancelled.quantity, Quantity(10));
        assert_eq!(b.best_bid(), None);
    }

    #[test]
    fn duplicate_order_id_is_rejected() {
        let mut b = book();
        b.add_order(OrderId(1), TraderId(1), Price(100), Quantity(10), Side::Buy, Timestamp(1))
            .unwrap();
        let err = b
            .add_order(OrderId(1), TraderId(1), Price(200), Quantity(5), Side::Buy, Timestamp(2))
            .unwrap_err();
        assert_eq!(err, CoreError::DuplicateOrderId(OrderId(1)));
    }

    #[test]
    fn cancel_unknown_order_is_not_found() {
        let mut b = book();
        assert_eq!(
            b.cancel_order(OrderId(5)).unwrap_err(),
            CoreError::OrderNotFound(OrderId(5))
        );
    }

    #[test]
    fn second_order_at_same_price_joins_fifo_tail() {
        let mut b = book();
        b.add_order(OrderId(1), TraderId(1), Price(100), Quantity(10), Side::Buy, Timestamp(1))
            .unwrap();
        b.add_order(OrderId(2), TraderId(1), Price(100), Quantity(5), Side::Buy, Timestamp(2))
            .unwrap();
        assert_eq!(b.bid_quantity_at(Price(100)), Some(Quantity(15)));
    }
}
