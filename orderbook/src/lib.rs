//! Index-based limit order book and price-time-priority matching engine.
//!
//! [`book::OrderBook`] places and removes resting orders only; it never
//! matches, so a caller that feeds it naked crossing orders (e.g. the
//! market-data reconstruction path mirroring an external venue) gets a
//! transiently crossed book, which is intentional (spec §4.1). Anything that
//! needs price-time-priority matching, self-trade prevention and price
//! improvement goes through [`matching::MatchingEngine`], which composes a
//! book rather than replacing it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod book;
pub mod book_side;
pub mod level;
pub mod matching;
pub mod order;
pub mod pool;

pub use book::{BookConfig, OrderBook};
pub use book_side::{Ask, Bid, BookSide, LevelOrder};
pub use level::PriceLevel;
pub use matching::{AddOrderOutcome, MatchingEngine, Trade};
pub use order::Order;
pub use pool::{Pool, Slot};
