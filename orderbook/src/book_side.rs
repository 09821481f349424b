//! One side (bid or ask) of a book: a dense price→level lookup table plus
//! the sorted doubly-linked list of resident levels.
//!
//! The C++ original expresses "best for this side" via `BidCompare`/`AskCompare`
//! functors passed to a `BookSide<Compare>` template (spec §9's "templated
//! callback polymorphism" flag). Rust has no need for the indirection a
//! functor buys in C++; a zero-sized marker type plus a trait bound gets the
//! same monomorphized, branch-free comparison.

use crate::level::PriceLevel;
use crate::pool::Pool;
use common::{CoreError, Price};

/// Ordering rule for one side of the book: which of two prices is more
/// aggressive (closer to crossing the spread).
pub trait LevelOrder {
    /// True if `a` is strictly better than `b` for this side.
    fn better(a: Price, b: Price) -> bool;
}

/// Bid ordering: higher price is better.
#[derive(Debug, Clone, Copy)]
pub struct Bid;
impl LevelOrder for Bid {
    fn better(a: Price, b: Price) -> bool {
        a > b
    }
}

/// Ask ordering: lower price is better.
#[derive(Debug, Clone, Copy)]
pub struct Ask;
impl LevelOrder for Ask {
    fn better(a: Price, b: Price) -> bool {
        a < b
    }
}

/// One side of an [`OrderBook`](crate::book::OrderBook): a dense array over
/// `price - base_price` (bounded by `price_range`) for O(1) level lookup,
/// plus the head of a sorted doubly-linked chain through the shared level
/// pool for best-price iteration.
pub struct BookSide<C> {
    base_price: u32,
    price_range: u32,
    level_index: Vec<Option<u32>>,
    best: Option<u32>,
    _order: std::marker::PhantomData<C>,
}

impl<C: LevelOrder> BookSide<C> {
    /// Build a side covering `[base_price, base_price + price_range)` ticks.
    #[must_use]
    pub fn new(base_price: u32, price_range: u32) -> Self {
        Self {
            base_price,
            price_range,
            level_index: vec![None; price_range as usize],
            best: None,
            _order: std::marker::PhantomData,
        }
    }

    fn slot(&self, price: Price) -> Option<usize> {
        let offset = price.ticks().checked_sub(self.base_price)?;
        if (offset as u32) < self.price_range {
            Some(offset as usize)
        } else {
            None
        }
    }

    /// Level pool index of the best (most aggressive) resident level.
    #[must_use]
    pub fn best(&self) -> Option<u32> {
        self.best
    }

    /// Level pool index of the next level after `index`, walking away from best.
    #[must_use]
    pub fn next_after(&self, pool: &Pool<PriceLevel>, index: u32) -> Option<u32> {
        pool.get(index).next
    }

    /// Find the existing level at `price`, if any.
    #[must_use]
    pub fn find_level(&self, price: Price) -> Option<u32> {
        self.slot(price).and_then(|s| self.level_index[s])
    }

    /// Aggregate resting quantity at `price`, `None` if no level there.
    #[must_use]
    pub fn quantity_at(&self, pool: &Pool<PriceLevel>, price: Price) -> Option<common::Quantity> {
        self.find_level(price).map(|idx| pool.get(idx).total_quantity)
    }

    /// Find-or-create the level at `price`, splicing it into the sorted
    /// chain in the right position if newly created.
    ///
    /// # Errors
    /// `InvalidPrice` if `price` falls outside the configured range.
    /// `LevelPoolExhausted` if the level pool has no free slots.
    pub fn find_or_insert_level(
        &mut self,
        pool: &mut Pool<PriceLevel>,
        price: Price,
    ) -> Result<u32, CoreError> {
        if let Some(existing) = self.find_level(price) {
            return Ok(existing);
        }
        let slot = self.slot(price).ok_or(CoreError::InvalidPrice)?;
        let new_index = pool
            .allocate(PriceLevel {
                price,
                ..Default::default()
            })
            .ok_or(CoreError::LevelPoolExhausted)?;
        self.splice(pool, new_index, price);
        self.level_index[slot] = Some(new_index);
        Ok(new_index)
    }

    /// Insert `new_index` into the sorted chain by linear scan from `best`.
    /// Spec §4.1 explicitly allows this O(levels) scan on the rare path of
    /// creating a brand new price level.
    fn splice(&mut self, pool: &mut Pool<PriceLevel>, new_index: u32, price: Price) {
        let mut cursor = self.best;
        let mut prev = None;
        while let Some(cur) = cursor {
            if C::better(price, pool.get(cur).price) {
                break;
            }
            prev = Some(cur);
            cursor = pool.get(cur).next;
        }

        pool.get_mut(new_index).prev = prev;
        pool.get_mut(new_index).next = cursor;
        if let Some(p) = prev {
            pool.get_mut(p).next = Some(new_index);
        } else {
            self.best = Some(new_index);
        }
        if let Some(c) = cursor {
            pool.get_mut(c).prev = Some(new_index);
        }
    }

    /// Unlink and free a level once it holds no resting orders.
    pub fn remove_if_empty(&mut self, pool: &mut Pool<PriceLevel>, index: u32) {
        if !pool.get(index).is_empty() {
            return;
        }
        let (prev, next, price) = {
            let level = pool.get(index);
            (level.prev, level.next, level.price)
        };
        match prev {
            Some(p) => pool.get_mut(p).next = next,
            None => self.best = next,
        }
        if let Some(n) = next {
            pool.get_mut(n).prev = prev;
        }
        if let Some(slot) = self.slot(price) {
            self.level_index[slot] = None;
        }
        pool.deallocate(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Pool<PriceLevel> {
        Pool::new(16)
    }

    #[test]
    fn bid_side_orders_highest_price_first() {
        let mut pool = pool();
        let mut side = BookSide::<Bid>::new(0, 1000);
        side.find_or_insert_level(&mut pool, Price(100)).unwrap();
        side.find_or_insert_level(&mut pool, Price(300)).unwrap();
        side.find_or_insert_level(&mut pool, Price(200)).unwrap();

        let best = side.best().unwrap();
        assert_eq!(pool.get(best).price, Price(300));
        let second = pool.get(best).next.unwrap();
        assert_eq!(pool.get(second).price, Price(200));
        let third = pool.get(second).next.unwrap();
        assert_eq!(pool.get(third).price, Price(100));
        assert!(pool.get(third).next.is_none());
    }

    #[test]
    fn ask_side_orders_lowest_price_first() {
        let mut pool = pool();
        let mut side = BookSide::<Ask>::new(0, 1000);
        side.find_or_insert_level(&mut pool, Price(300)).unwrap();
        side.find_or_insert_level(&mut pool, Price(100)).unwrap();
        side.find_or_insert_level(&mut pool, Price(200)).unwrap();

        let best = side.best().unwrap();
        assert_eq!(pool.get(best).price, Price(100));
    }

    #[test]
    fn price_outside_range_is_rejected() {
        let mut pool = pool();
        let mut side = BookSide::<Bid>::new(1000, 100);
        assert_eq!(
            side.find_or_insert_level(&mut pool, Price(5)),
            Err(CoreError::InvalidPrice)
        );
    }

    #[test]
    fn remove_if_empty_relinks_neighbors() {
        let mut pool = pool();
        let mut side = BookSide::<Bid>::new(0, 1000);
        let low = side.find_or_insert_level(&mut pool, Price(100)).unwrap();
        side.find_or_insert_level(&mut pool, Price(200)).unwrap();

        side.remove_if_empty(&mut pool, low);
        let best = side.best().unwrap();
        assert_eq!(pool.get(best).price, Price(200));
        assert!(pool.get(best).next.is_none());
        assert!(side.find_level(Price(100)).is_none());
    }
}
