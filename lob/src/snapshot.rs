//! Immutable point-in-time views over a book or its [`TopOfBook`] projection.
//!
//! Unlike `TopOfBook`, which is a live, mutated-in-place struct, a
//! [`MarketSnapshot`] is a plain value handed to a strategy for one
//! `generate()` call (spec §6) — cheap to build, cheap to copy, and safe to
//! hold past the next book mutation since it owns its data.

use common::{Price, Quantity, SymbolId, Timestamp};

use crate::top_of_book::{BookState, TopOfBook, DEPTH};

/// One priced level in an enumerated snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotLevel {
    /// Price at this level.
    pub price: Price,
    /// Aggregate resting quantity at this level.
    pub quantity: Quantity,
}

/// An immutable, owned view of a [`TopOfBook`] at the moment it was taken.
///
/// Produced on demand (spec §3's "MarketSnapshot / BookSnapshot... produced
/// on demand from the full book or the TopOfBook"); a strategy consumes one
/// per tick rather than reading the live projection directly, so the
/// projection can keep mutating underneath without invalidating the
/// snapshot a caller is holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookSnapshot {
    /// Symbol this snapshot covers.
    pub symbol: SymbolId,
    /// Best bid, if any.
    pub best_bid: Option<SnapshotLevel>,
    /// Best ask, if any.
    pub best_ask: Option<SnapshotLevel>,
    /// Up to [`DEPTH`] bid levels, best first.
    pub bids: [SnapshotLevel; DEPTH],
    /// Number of valid entries in `bids`.
    pub bid_count: usize,
    /// Up to [`DEPTH`] ask levels, best first.
    pub asks: [SnapshotLevel; DEPTH],
    /// Number of valid entries in `asks`.
    pub ask_count: usize,
    /// Synchronization state of the projection this snapshot was taken from.
    pub state: BookState,
    /// Sequence number of the last applied snapshot or delta.
    pub sequence: u64,
    /// Timestamp of the last applied snapshot or delta.
    pub timestamp: Timestamp,
}

impl BookSnapshot {
    /// Build a snapshot from a live [`TopOfBook`] projection.
    #[must_use]
    pub fn from_top_of_book(top: &TopOfBook) -> Self {
        let mut bids = [SnapshotLevel::default(); DEPTH];
        let mut asks = [SnapshotLevel::default(); DEPTH];
        for (i, l) in top.bids().iter().enumerate() {
            bids[i] = SnapshotLevel { price: l.price, quantity: l.quantity };
        }
        for (i, l) in top.asks().iter().enumerate() {
            asks[i] = SnapshotLevel { price: l.price, quantity: l.quantity };
        }
        Self {
            symbol: top.symbol(),
            best_bid: top.best_bid().map(|l| SnapshotLevel { price: l.price, quantity: l.quantity }),
            best_ask: top.best_ask().map(|l| SnapshotLevel { price: l.price, quantity: l.quantity }),
            bids,
            bid_count: top.bids().len(),
            asks,
            ask_count: top.asks().len(),
            state: top.state(),
            sequence: top.sequence(),
            timestamp: top.last_update(),
        }
    }

    /// Mid price, if both sides are populated.
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid, self.best_ask) {
            (Some(b), Some(a)) => Some((b.price.as_f64() + a.price.as_f64()) / 2.0),
            _ => None,
        }
    }

    /// Whether the projection this snapshot was taken from is synchronized
    /// (spec §4.2's snapshot-then-delta state machine).
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, BookState::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, Side, TraderId};
    use orderbook::{BookConfig, OrderBook};

    #[test]
    fn snapshot_mirrors_top_of_book() {
        let mut book = OrderBook::new(
            SymbolId(1),
            BookConfig { max_orders: 16, max_price_levels: 16, base_price: 0, price_range: 1_000_000 },
        );
        book.add_order(OrderId(1), TraderId(1), Price(100), Quantity(10), Side::Buy, Timestamp(1))
            .unwrap();
        book.add_order(OrderId(2), TraderId(1), Price(200), Quantity(5), Side::Sell, Timestamp(2))
            .unwrap();

        let mut top = TopOfBook::new(SymbolId(1));
        top.refresh(&book, Timestamp(3));

        let snap = BookSnapshot::from_top_of_book(&top);
        assert_eq!(snap.best_bid, Some(SnapshotLevel { price: Price(100), quantity: Quantity(10) }));
        assert_eq!(snap.best_ask, Some(SnapshotLevel { price: Price(200), quantity: Quantity(5) }));
        assert!(snap.is_ready());
        let expected_mid = (Price(100).as_f64() + Price(200).as_f64()) / 2.0;
        assert!((snap.mid_price().unwrap() - expected_mid).abs() < 1e-9);
    }

    #[test]
    fn mid_price_is_none_when_one_side_empty() {
        let top = TopOfBook::new(SymbolId(1));
        let snap = BookSnapshot::from_top_of_book(&top);
        assert_eq!(snap.mid_price(), None);
    }
}
