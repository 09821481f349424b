//! Market-data ingest: wire decoders for the binary order-level feed and
//! the JSON top-of-book/trade feed, UDP transport framing, and per-symbol
//! book reconstruction (spec §2 step 1, §4.2).
//!
//! Every decoder normalizes onto the [`event::FeedCallback`] trait so
//! [`handler::MarketDataHandler`] — or a thinner consumer that only wants
//! trade prints — can drive the same callback surface regardless of wire
//! format.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod binary;
pub mod event;
pub mod handler;
pub mod json;
pub mod transport;

pub use binary::BinaryDecoder;
pub use event::{BookLevelUpdate, FeedCallback, OrderAdd, OrderDelete, OrderExecute, OrderReduce, QuoteUpdate, Trade};
pub use handler::MarketDataHandler;
pub use json::JsonDecoder;
pub use transport::{PacketDecoder, PacketHeader, HEADER_LEN};
