//! Book reconstruction: turns the canonical events from [`crate::event`]
//! into a live [`OrderBook`] plus [`TopOfBook`] projection per symbol
//! (spec §2 step 1, §4.2). Grounded in
//! `original_source/include/feed/itch_feed_handler.hpp`'s per-symbol book
//! map and replace-message side/symbol recovery.

use std::collections::HashMap;

use common::{OrderId, Side, SymbolId, TraderId};
use lob::TopOfBook;
use orderbook::{BookConfig, OrderBook};

use crate::event::{BookLevelUpdate, FeedCallback, OrderAdd, OrderDelete, OrderExecute, OrderReduce, QuoteUpdate, Trade};

struct SymbolBook {
    book: OrderBook,
    top: TopOfBook,
}

/// Reconstructs one [`OrderBook`]/[`TopOfBook`] pair per symbol from a feed
/// driven through [`FeedCallback`]. Symbols are created lazily on first
/// sight, bounded by `max_symbols` (spec §4.2's dense-but-bounded symbol
/// universe, mirrored from [`common::config::SharedMemoryConfig::max_shared_symbols`]
/// in spirit though this handler is not itself shared-memory resident).
pub struct MarketDataHandler {
    book_config: BookConfig,
    max_symbols: usize,
    books: HashMap<SymbolId, SymbolBook>,
    /// Maps a still-resting order id to the symbol it rests on, so
    /// execute/reduce/delete events (which carry no symbol of their own)
    /// can find the right book, and so an Order Replace's synthesized add
    /// (spec §4.2 Open Question: the wire message carries no side/symbol)
    /// can be routed correctly.
    order_location: HashMap<OrderId, SymbolId>,
    /// Side/symbol of the order most recently removed by
    /// [`Self::on_order_delete`], consumed by the very next
    /// [`Self::on_order_add`] if it carries the binary decoder's sentinel
    /// `SymbolId(0)` — the pairing the decoder uses to signal "this add
    /// completes a replace, recover its identity from the delete that just
    /// preceded it."
    pending_replace: Option<(SymbolId, Side)>,
}

impl MarketDataHandler {
    /// Build a handler that creates per-symbol books on demand, each sized
    /// per `book_config`, up to `max_symbols` distinct symbols.
    #[must_use]
    pub fn new(book_config: BookConfig, max_symbols: usize) -> Self {
        Self {
            book_config,
            max_symbols,
            books: HashMap::new(),
            order_location: HashMap::new(),
            pending_replace: None,
        }
    }

    /// The live top-of-book projection for `symbol`, if it has been seen.
    #[must_use]
    pub fn top_of_book(&self, symbol: SymbolId) -> Option<&TopOfBook> {
        self.books.get(&symbol).map(|s| &s.top)
    }

    /// The reconstructed order book for `symbol`, if it has been seen.
    #[must_use]
    pub fn order_book(&self, symbol: SymbolId) -> Option<&OrderBook> {
        self.books.get(&symbol).map(|s| &s.book)
    }

    /// Number of distinct symbols reconstructed so far.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.books.len()
    }

    fn book_for(&mut self, symbol: SymbolId) -> Option<&mut SymbolBook> {
        if !self.books.contains_key(&symbol) {
            if self.books.len() >= self.max_symbols {
                return None;
            }
            self.books.insert(
                symbol,
                SymbolBook { book: OrderBook::new(symbol, self.book_config), top: TopOfBook::new(symbol) },
            );
        }
        self.books.get_mut(&symbol)
    }
}

impl FeedCallback for MarketDataHandler {
    fn on_order_add(&mut self, event: OrderAdd) {
        let (symbol, side) = if event.symbol == SymbolId(0) {
            let Some(recovered) = self.pending_replace.take() else { return };
            recovered
        } else {
            (event.symbol, event.side)
        };
        let Some(entry) = self.book_for(symbol) else { return };
        if entry
            .book
            .add_order(event.order_id, TraderId::ANONYMOUS, event.price, event.quantity, side, event.timestamp)
            .is_ok()
        {
            self.order_location.insert(event.order_id, symbol);
            entry.top.refresh(&entry.book, event.timestamp);
        }
    }

    fn on_order_execute(&mut self, event: OrderExecute) {
        let Some(&symbol) = self.order_location.get(&event.order_id) else { return };
        let Some(entry) = self.books.get_mut(&symbol) else { return };
        if entry.book.reduce_order(event.order_id, event.quantity).is_ok() {
            if !entry.book.contains(event.order_id) {
                self.order_location.remove(&event.order_id);
            }
            entry.top.refresh(&entry.book, event.timestamp);
        }
    }

    fn on_order_reduce(&mut self, event: OrderReduce) {
        let Some(&symbol) = self.order_location.get(&event.order_id) else { return };
        let Some(entry) = self.books.get_mut(&symbol) else { return };
        if entry.book.reduce_order(event.order_id, event.reduce_by).is_ok() {
            if !entry.book.contains(event.order_id) {
                self.order_location.remove(&event.order_id);
            }
            entry.top.refresh(&entry.book, event.timestamp);
        }
    }

    fn on_order_delete(&mut self, event: OrderDelete) {
        let Some(symbol) = self.order_location.remove(&event.order_id) else { return };
        let Some(entry) = self.books.get_mut(&symbol) else { return };
        if let Ok(order) = entry.book.cancel_order(event.order_id) {
            self.pending_replace = Some((symbol, order.side));
            entry.top.refresh(&entry.book, event.timestamp);
        }
    }

    fn on_trade(&mut self, _event: Trade) {
        // Informational only: book state is already kept current by the
        // execute/reduce events the venue sends alongside each trade.
    }

    fn on_quote(&mut self, event: QuoteUpdate) {
        let Some(entry) = self.book_for(event.symbol) else { return };
        entry
            .top
            .apply_level_update(Side::Buy, event.bid_price, event.bid_size, event.timestamp);
        entry
            .top
            .apply_level_update(Side::Sell, event.ask_price, event.ask_size, event.timestamp);
    }

    fn on_book_level(&mut self, event: BookLevelUpdate) {
        let Some(entry) = self.book_for(event.symbol) else { return };
        entry.top.apply_level_update(event.side, event.price, event.quantity, event.timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Price, Quantity, Timestamp};

    fn config() -> BookConfig {
        BookConfig { max_orders: 64, max_price_levels: 64, base_price: 0, price_range: 1_000_000 }
    }

    #[test]
    fn order_add_creates_book_lazily_and_updates_top() {
        let mut handler = MarketDataHandler::new(config(), 8);
        handler.on_order_add(OrderAdd {
            order_id: OrderId(1),
            symbol: SymbolId(1),
            side: Side::Buy,
            price: Price(100),
            quantity: Quantity(10),
            timestamp: Timestamp(1),
        });
        assert_eq!(handler.symbol_count(), 1);
        let top = handler.top_of_book(SymbolId(1)).unwrap();
        assert_eq!(top.best_bid().unwrap().price, Price(100));
    }

    #[test]
    fn execute_reduces_and_eventually_removes_order() {
        let mut handler = MarketDataHandler::new(config(), 8);
        handler.on_order_add(OrderAdd {
            order_id: OrderId(1),
            symbol: SymbolId(1),
            side: Side::Buy,
            price: Price(100),
            quantity: Quantity(10),
            timestamp: Timestamp(1),
        });
        handler.on_order_execute(OrderExecute {
            order_id: OrderId(1),
            quantity: Quantity(4),
            exec_price: None,
            timestamp: Timestamp(2),
        });
        assert_eq!(handler.order_book(SymbolId(1)).unwrap().bid_quantity_at(Price(100)), Some(Quantity(6)));

        handler.on_order_execute(OrderExecute {
            order_id: OrderId(1),
            quantity: Quantity(6),
            exec_price: None,
            timestamp: Timestamp(3),
        });
        assert!(!handler.order_book(SymbolId(1)).unwrap().contains(OrderId(1)));
        assert_eq!(handler.top_of_book(SymbolId(1)).unwrap().best_bid(), None);
    }

    #[test]
    fn delete_then_sentinel_add_recovers_side_and_symbol_for_replace() {
        let mut handler = MarketDataHandler::new(config(), 8);
        handler.on_order_add(OrderAdd {
            order_id: OrderId(1),
            symbol: SymbolId(2),
            side: Side::Sell,
            price: Price(500),
            quantity: Quantity(10),
            timestamp: Timestamp(1),
        });
        handler.on_order_delete(OrderDelete { order_id: OrderId(1), timestamp: Timestamp(2) });
        handler.on_order_add(OrderAdd {
            order_id: OrderId(2),
            symbol: SymbolId(0),
            side: Side::Buy,
            price: Price(505),
            quantity: Quantity(8),
            timestamp: Timestamp(2),
        });
        let book = handler.order_book(SymbolId(2)).unwrap();
        assert_eq!(book.ask_quantity_at(Price(505)), Some(Quantity(8)));
    }

    #[test]
    fn quote_update_tracks_best_bid_and_ask_without_order_ids() {
        let mut handler = MarketDataHandler::new(config(), 8);
        handler.on_quote(QuoteUpdate {
            symbol: SymbolId(3),
            bid_price: Price(100),
            ask_price: Price(101),
            bid_size: Quantity(20),
            ask_size: Quantity(15),
            timestamp: Timestamp(1),
        });
        let top = handler.top_of_book(SymbolId(3)).unwrap();
        assert_eq!(top.best_bid().unwrap().price, Price(100));
        assert_eq!(top.best_ask().unwrap().price, Price(101));
    }

    #[test]
    fn book_level_update_removes_level_on_zero_quantity() {
        let mut handler = MarketDataHandler::new(config(), 8);
        handler.on_book_level(BookLevelUpdate {
            symbol: SymbolId(4),
            side: Side::Buy,
            price: Price(200),
            quantity: Quantity(7),
            timestamp: Timestamp(1),
        });
        assert_eq!(handler.top_of_book(SymbolId(4)).unwrap().best_bid().unwrap().price, Price(200));

        handler.on_book_level(BookLevelUpdate {
            symbol: SymbolId(4),
            side: Side::Buy,
            price: Price(200),
            quantity: Quantity::ZERO,
            timestamp: Timestamp(2),
        });
        assert_eq!(handler.top_of_book(SymbolId(4)).unwrap().best_bid(), None);
    }

    #[test]
    fn new_symbols_beyond_the_cap_are_dropped() {
        let mut handler = MarketDataHandler::new(config(), 1);
        handler.on_order_add(OrderAdd {
            order_id: OrderId(1),
            symbol: SymbolId(1),
            side: Side::Buy,
            price: Price(100),
            quantity: Quantity(10),
            timestamp: Timestamp(1),
        });
        handler.on_order_add(OrderAdd {
            order_id: OrderId(2),
            symbol: SymbolId(2),
            side: Side::Buy,
            price: Price(100),
            quantity: Quantity(10),
            timestamp: Timestamp(1),
        });
        assert_eq!(handler.symbol_count(), 1);
        assert!(handler.order_book(SymbolId(2)).is_none());
    }
}
