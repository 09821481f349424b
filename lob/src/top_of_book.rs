//! Compact best-five-levels projection used by strategies on the hot path.
//!
//! `TopOfBook` is never the source of truth — the full [`orderbook::OrderBook`]
//! is — but it is sized to fit in two cache lines and carries the
//! snapshot-then-delta sequencing state a reconnecting feed handler needs
//! (spec §3, §4.2).

use common::{Price, Quantity, Side, SymbolId, Timestamp};
use orderbook::OrderBook;

/// Number of levels carried per side.
pub const DEPTH: usize = 5;

/// Connection/synchronization state for a symbol's projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    /// No snapshot received yet; incoming deltas are discarded.
    Empty,
    /// A snapshot is in flight but not yet applied.
    Building,
    /// Synchronized: a snapshot has been applied and subsequent in-order
    /// deltas are being accepted.
    Ready,
}

/// One level of the projection: price and aggregate resting quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Level {
    /// Price at this level.
    pub price: Price,
    /// Aggregate resting quantity at this level.
    pub quantity: Quantity,
}

/// Best-five-levels-per-side projection of one symbol's book.
#[derive(Debug, Clone)]
pub struct TopOfBook {
    symbol: SymbolId,
    bids: [Level; DEPTH],
    asks: [Level; DEPTH],
    bid_count: usize,
    ask_count: usize,
    sequence: u64,
    last_update: Timestamp,
    state: BookState,
}

impl TopOfBook {
    /// A fresh, unsynchronized projection for `symbol`.
    #[must_use]
    pub const fn new(symbol: SymbolId) -> Self {
        Self {
            symbol,
            bids: [Level { price: Price::ZERO, quantity: Quantity::ZERO }; DEPTH],
            asks: [Level { price: Price::ZERO, quantity: Quantity::ZERO }; DEPTH],
            bid_count: 0,
            ask_count: 0,
            sequence: 0,
            last_update: Timestamp(0),
            state: BookState::Empty,
        }
    }

    /// Symbol this projection covers.
    #[must_use]
    pub const fn symbol(&self) -> SymbolId {
        self.symbol
    }

    /// Current synchronization state.
    #[must_use]
    pub const fn state(&self) -> BookState {
        self.state
    }

    /// Sequence number of the last applied snapshot or delta.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Timestamp of the last applied snapshot or delta.
    #[must_use]
    pub const fn last_update(&self) -> Timestamp {
        self.last_update
    }

    /// Resident bid levels, best first (descending price).
    #[must_use]
    pub fn bids(&self) -> &[Level] {
        &self.bids[..self.bid_count]
    }

    /// Resident ask levels, best first (ascending price).
    #[must_use]
    pub fn asks(&self) -> &[Level] {
        &self.asks[..self.ask_count]
    }

    /// Best bid, if the book is non-empty on that side.
    #[must_use]
    pub fn best_bid(&self) -> Option<Level> {
        self.bids().first().copied()
    }

    /// Best ask, if the book is non-empty on that side.
    #[must_use]
    pub fn best_ask(&self) -> Option<Level> {
        self.asks().first().copied()
    }

    /// Whether an incoming update at `incoming_seq` should be applied to the
    /// book it projects, per the snapshot-then-delta protocol: deltas are
    /// discarded until a snapshot has been applied (state `Ready`), and any
    /// delta at or before the last-applied sequence is a stale duplicate
    /// (spec §4.2).
    #[must_use]
    pub const fn accepts_delta(&self, incoming_seq: u64) -> bool {
        matches!(self.state, BookState::Ready) && incoming_seq > self.sequence
    }

    /// Mark a snapshot at `seq` as the new synchronization point and project
    /// `book`'s current levels. Always accepted — a fresh snapshot resets
    /// synchronization regardless of prior state.
    pub fn apply_snapshot(&mut self, book: &OrderBook, seq: u64, ts: Timestamp) {
        self.state = BookState::Ready;
        self.sequence = seq;
        self.last_update = ts;
        self.project(book);
    }

    /// Record that a gated delta at `seq` was applied to the underlying
    /// book, and refresh the projection from it. Callers must have already
    /// checked [`Self::accepts_delta`].
    pub fn apply_delta(&mut self, book: &OrderBook, seq: u64, ts: Timestamp) {
        self.sequence = seq;
        self.last_update = ts;
        self.project(book);
    }

    /// Refresh the projection from `book` without changing sequencing state
    /// — used by order-level feeds (spec §4.2's per-event "companion
    /// projection"), which have no snapshot/delta sequence numbers of their
    /// own and are always `Ready` once the first event lands.
    pub fn refresh(&mut self, book: &OrderBook, ts: Timestamp) {
        if self.state == BookState::Empty {
            self.state = BookState::Ready;
        }
        self.sequence += 1;
        self.last_update = ts;
        self.project(book);
    }

    /// Apply a direct per-level update from a feed that carries aggregate
    /// quantities but no order ids (spec §4.2's "required for level feeds
    /// that do not expose order IDs") — there is no full `OrderBook` to
    /// project from, so the level is inserted, updated, or removed
    /// directly in the fixed-depth array. `quantity` is the new total at
    /// `price`; zero removes the level. Does not advance `sequence` —
    /// callers gate on their own sequence numbers before calling this.
    pub fn apply_level_update(&mut self, side: Side, price: Price, quantity: Quantity, ts: Timestamp) {
        if self.state == BookState::Empty {
            self.state = BookState::Ready;
        }
        self.last_update = ts;
        match side {
            Side::Buy => Self::upsert_level(&mut self.bids, &mut self.bid_count, price, quantity, |a, b| a > b),
            Side::Sell => Self::upsert_level(&mut self.asks, &mut self.ask_count, price, quantity, |a, b| a < b),
        }
    }

    fn upsert_level(
        levels: &mut [Level; DEPTH],
        count: &mut usize,
        price: Price,
        quantity: Quantity,
        better: impl Fn(Price, Price) -> bool,
    ) {
        let existing = levels[..*count].iter().position(|l| l.price == price);

        if quantity.is_zero() {
            if let Some(idx) = existing {
                for i in idx..*count - 1 {
                    levels[i] = levels[i + 1];
                }
                *count -= 1;
                levels[*count] = Level::default();
            }
            return;
        }

        if let Some(idx) = existing {
            levels[idx].quantity = quantity;
            return;
        }

        let insert_at = levels[..*count].iter().position(|l| better(price, l.price)).unwrap_or(*count);
        if insert_at >= DEPTH {
            return;
        }
        let end = (*count).min(DEPTH - 1);
        for i in (insert_at..end).rev() {
            levels[i + 1] = levels[i];
        }
        levels[insert_at] = Level { price, quantity };
        *count = (*count + 1).min(DEPTH);
    }

    fn project(&mut self, book: &OrderBook) {
        let mut bid_levels = [(Price::ZERO, Quantity::ZERO); DEPTH];
        let mut ask_levels = [(Price::ZERO, Quantity::ZERO); DEPTH];
        self.bid_count = book.top_levels(Side::Buy, &mut bid_levels);
        self.ask_count = book.top_levels(Side::Sell, &mut ask_levels);
        for (i, (price, quantity)) in bid_levels.into_iter().enumerate() {
            self.bids[i] = Level { price, quantity };
        }
        for (i, (price, quantity)) in ask_levels.into_iter().enumerate() {
            self.asks[i] = Level { price, quantity };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, Quantity as Qty, TraderId};
    use orderbook::BookConfig;

    fn cfg() -> BookConfig {
        BookConfig { max_orders: 64, max_price_levels: 64, base_price: 0, price_range: 1_000_000 }
    }

    #[test]
    fn discards_deltas_until_snapshot() {
        let top = TopOfBook::new(SymbolId(1));
        assert_eq!(top.state(), BookState::Empty);
        assert!(!top.accepts_delta(5));
    }

    #[test]
    fn accepts_in_order_deltas_after_snapshot_and_rejects_stale() {
        let mut book = OrderBook::new(SymbolId(1), cfg());
        book.add_order(OrderId(1), TraderId(1), Price(100), Qty(10), Side::Buy, Timestamp(1))
            .unwrap();
        let mut top = TopOfBook::new(SymbolId(1));
        top.apply_snapshot(&book, 10, Timestamp(1));
        assert_eq!(top.state(), BookState::Ready);
        assert_eq!(top.best_bid(), Some(Level { price: Price(100), quantity: Qty(10) }));

        assert!(!top.accepts_delta(10));
        assert!(!top.accepts_delta(9));
        assert!(top.accepts_delta(11));
    }

    #[test]
    fn projects_best_five_levels_in_order() {
        let mut book = OrderBook::new(SymbolId(1), cfg());
        for (i, price) in [100, 200, 50, 300, 10, 150].into_iter().enumerate() {
            book.add_order(
                OrderId(i as u64 + 1),
                TraderId(1),
                Price(price),
                Qty(1),
                Side::Buy,
                Timestamp(1),
            )
            .unwrap();
        }
        let mut top = TopOfBook::new(SymbolId(1));
        top.refresh(&book, Timestamp(2));
        let prices: Vec<u32> = top.bids().iter().map(|l| l.price.ticks()).collect();
        assert_eq!(prices, vec![300, 200, 150, 100, 50]);
    }

    #[test]
    fn apply_level_update_inserts_updates_and_removes_without_an_order_book() {
        let mut top = TopOfBook::new(SymbolId(1));
        top.apply_level_update(Side::Buy, Price(100), Qty(10), Timestamp(1));
        top.apply_level_update(Side::Buy, Price(200), Qty(5), Timestamp(2));
        assert_eq!(top.best_bid(), Some(Level { price: Price(200), quantity: Qty(5) }));
        assert_eq!(top.bids().len(), 2);

        top.apply_level_update(Side::Buy, Price(100), Qty(20), Timestamp(3));
        assert_eq!(top.bids()[1], Level { price: Price(100), quantity: Qty(20) });

        top.apply_level_update(Side::Buy, Price(200), Qty::ZERO, Timestamp(4));
        assert_eq!(top.best_bid(), Some(Level { price: Price(100), quantity: Qty(20) }));
        assert_eq!(top.bids().len(), 1);
    }
}
