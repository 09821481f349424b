//! Top-of-book projection and point-in-time market/book snapshots.
//!
//! [`TopOfBook`] is the live, mutated-in-place best-five-levels view a
//! strategy reads on the hot path (spec §3); [`BookSnapshot`] is the
//! immutable, owned copy handed to a single `Strategy::generate()` call
//! (spec §6) so the live projection can keep moving underneath it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod snapshot;
pub mod top_of_book;

pub use snapshot::{BookSnapshot, SnapshotLevel};
pub use top_of_book::{BookState, Level, TopOfBook, DEPTH};
