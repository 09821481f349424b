//! Canonical market events and the callback interface that consumes them.
//!
//! Every wire dialect (binary or JSON) is normalized to this set before
//! reaching book reconstruction (spec §2 step 1, §4.2). Grounded in
//! `original_source/include/market_events.hpp`.

use common::{OrderId, Price, Quantity, Side, SymbolId, Timestamp};

/// A new resting order appeared on the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAdd {
    /// Order identifier, unique per venue.
    pub order_id: OrderId,
    /// Symbol the order belongs to.
    pub symbol: SymbolId,
    /// Side of the order.
    pub side: Side,
    /// Limit price.
    pub price: Price,
    /// Initial resting quantity.
    pub quantity: Quantity,
    /// Venue timestamp.
    pub timestamp: Timestamp,
}

/// An order was fully or partially executed (a trade occurred against it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderExecute {
    /// Order identifier.
    pub order_id: OrderId,
    /// Quantity executed in this event.
    pub quantity: Quantity,
    /// Execution price, if the venue supplies one distinct from the resting price.
    pub exec_price: Option<Price>,
    /// Venue timestamp.
    pub timestamp: Timestamp,
}

/// An order's remaining quantity was reduced without a trade (partial cancel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderReduce {
    /// Order identifier.
    pub order_id: OrderId,
    /// Quantity removed.
    pub reduce_by: Quantity,
    /// Venue timestamp.
    pub timestamp: Timestamp,
}

/// An order was removed from the book entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderDelete {
    /// Order identifier.
    pub order_id: OrderId,
    /// Venue timestamp.
    pub timestamp: Timestamp,
}

/// A trade print, for consumers that only need executed prices (not full book state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trade {
    /// Symbol the trade occurred on.
    pub symbol: SymbolId,
    /// Trade price.
    pub price: Price,
    /// Trade quantity.
    pub quantity: Quantity,
    /// Side of the aggressing order.
    pub aggressor_side: Side,
    /// Venue timestamp.
    pub timestamp: Timestamp,
}

/// A best-bid/best-ask quote update (top-of-book-only feeds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteUpdate {
    /// Symbol the quote covers.
    pub symbol: SymbolId,
    /// Best bid price.
    pub bid_price: Price,
    /// Best ask price.
    pub ask_price: Price,
    /// Size resting at the best bid.
    pub bid_size: Quantity,
    /// Size resting at the best ask.
    pub ask_size: Quantity,
    /// Venue timestamp.
    pub timestamp: Timestamp,
}

/// An aggregate level update for feeds that expose quantities but not order
/// ids (spec §4.2's "required for level feeds that do not expose order
/// IDs"). `quantity` is the *new total* at the level; zero means the level
/// is now empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookLevelUpdate {
    /// Symbol the level belongs to.
    pub symbol: SymbolId,
    /// Side of the level.
    pub side: Side,
    /// Price of the level.
    pub price: Price,
    /// New aggregate quantity at this level (0 = level removed).
    pub quantity: Quantity,
    /// Venue timestamp.
    pub timestamp: Timestamp,
}

/// Callback interface a decoder drives as it parses wire messages (spec
/// §4.2). A concrete consumer implements only the events it cares about;
/// defaults are no-ops so a trade-only listener, say, need not implement
/// book-level callbacks.
///
/// Dispatched statically (monomorphized over the concrete `F: FeedCallback`)
/// rather than through a trait object, per spec §9's devirtualization note.
pub trait FeedCallback {
    /// A new order was added to the book.
    fn on_order_add(&mut self, _event: OrderAdd) {}
    /// An order was executed (fully or partially).
    fn on_order_execute(&mut self, _event: OrderExecute) {}
    /// An order's quantity was reduced without a trade.
    fn on_order_reduce(&mut self, _event: OrderReduce) {}
    /// An order was removed from the book.
    fn on_order_delete(&mut self, _event: OrderDelete) {}
    /// A trade print arrived.
    fn on_trade(&mut self, _event: Trade) {}
    /// A top-of-book quote update arrived.
    fn on_quote(&mut self, _event: QuoteUpdate) {}
    /// An aggregate book-level update arrived.
    fn on_book_level(&mut self, _event: BookLevelUpdate) {}
}
