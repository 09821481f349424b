//! `ExecutionReport` — the message an exchange (paper or live) emits about an
//! order's fate. Both [`paper-exchange`](../paper_exchange) and any future
//! live-venue adapter produce this same shape so the engine processes fills
//! without knowing their source (spec §4.5, §6).
//!
//! The layout is a fixed 128-byte, cache-line-aligned POD record so it can be
//! written directly into the [`crate::spsc`] ring or the shared event log
//! without serialization.

use common::{Price, Quantity, Side, SymbolId};

const SYMBOL_LEN: usize = 8;
const ASSET_LEN: usize = 8;
const REASON_LEN: usize = 24;

/// What happened to the order. Mirrors FIX `ExecType` (tag 150).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExecType {
    /// Order accepted.
    New = 0,
    /// Partial or full fill.
    Trade = 1,
    /// Order cancelled.
    Cancelled = 2,
    /// Order rejected.
    Rejected = 3,
    /// Order expired (GTD/IOC).
    Expired = 4,
}

/// Current state of the order. Mirrors FIX `OrdStatus` (tag 39).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OrderStatus {
    /// Acknowledged, no fills yet.
    New = 0,
    /// Filled, but not fully.
    PartiallyFilled = 1,
    /// Fully filled.
    Filled = 2,
    /// Cancelled before full fill.
    Cancelled = 3,
    /// Rejected at entry.
    Rejected = 4,
    /// Expired (time-in-force).
    Expired = 5,
}

/// Order type the report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReportOrderType {
    /// Market order.
    Market = 0,
    /// Limit order.
    Limit = 1,
}

fn pack_str<const N: usize>(s: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    let bytes = s.as_bytes();
    let n = bytes.len().min(N - 1);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

fn unpack_str(buf: &[u8]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end]).unwrap_or("")
}

/// A single order-execution event, 128 bytes, 64-byte aligned.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct ExecutionReport {
    symbol: [u8; SYMBOL_LEN],
    order_id: u64,
    filled_qty: f64,
    filled_price: f64,
    commission: f64,
    order_timestamp_ns: u64,
    exec_timestamp_ns: u64,
    exec_type: ExecType,
    status: OrderStatus,
    order_type: ReportOrderType,
    side: Side,
    cum_qty: f64,
    commission_asset: [u8; ASSET_LEN],
    reject_reason: [u8; REASON_LEN],
    _pad: [u8; 28],
}

impl ExecutionReport {
    /// Symbol this report concerns.
    #[must_use]
    pub fn symbol(&self) -> &str {
        unpack_str(&self.symbol)
    }

    /// Internal order id.
    #[must_use]
    pub const fn order_id(&self) -> u64 {
        self.order_id
    }

    /// Quantity filled by this specific execution (zero for non-fill reports).
    #[must_use]
    pub const fn filled_qty(&self) -> f64 {
        self.filled_qty
    }

    /// Execution price (zero for non-fill reports).
    #[must_use]
    pub const fn filled_price(&self) -> f64 {
        self.filled_price
    }

    /// Commission charged by the venue for this execution.
    #[must_use]
    pub const fn commission(&self) -> f64 {
        self.commission
    }

    /// Cumulative filled quantity for the order so far.
    #[must_use]
    pub const fn cum_qty(&self) -> f64 {
        self.cum_qty
    }

    /// What kind of event this is.
    #[must_use]
    pub const fn exec_type(&self) -> ExecType {
        self.exec_type
    }

    /// Current order status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Side of the order.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Reject reason text, if this is a rejection.
    #[must_use]
    pub fn reject_reason(&self) -> &str {
        unpack_str(&self.reject_reason)
    }

    /// True if this report carries a fill.
    #[must_use]
    pub const fn is_fill(&self) -> bool {
        matches!(self.exec_type, ExecType::Trade)
    }

    /// True if the order has reached a terminal state.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }

    /// A full fill report for a market order.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn market_fill(
        symbol: SymbolId,
        order_id: u64,
        side: Side,
        qty: Quantity,
        price: Price,
        commission: f64,
        timestamp_ns: u64,
    ) -> Self {
        Self {
            symbol: pack_str(&symbol.to_string()),
            order_id,
            filled_qty: qty.as_f64(),
            filled_price: price.as_f64(),
            commission,
            order_timestamp_ns: timestamp_ns,
            exec_timestamp_ns: timestamp_ns,
            exec_type: ExecType::Trade,
            status: OrderStatus::Filled,
            order_type: ReportOrderType::Market,
            side,
            cum_qty: qty.as_f64(),
            commission_asset: pack_str("USDT"),
            reject_reason: [0; REASON_LEN],
            _pad: [0; 28],
        }
    }

    /// A full fill report for a market order quoted in fractional units (the
    /// paper-exchange / crypto path, where [`Quantity`]'s integer ticks
    /// can't represent a size like `0.01` BTC — see [`common::FillQty`]).
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn market_fill_fractional(
        symbol: SymbolId,
        order_id: u64,
        side: Side,
        qty: f64,
        price: f64,
        commission: f64,
        timestamp_ns: u64,
    ) -> Self {
        Self {
            symbol: pack_str(&symbol.to_string()),
            order_id,
            filled_qty: qty,
            filled_price: price,
            commission,
            order_timestamp_ns: timestamp_ns,
            exec_timestamp_ns: timestamp_ns,
            exec_type: ExecType::Trade,
            status: OrderStatus::Filled,
            order_type: ReportOrderType::Market,
            side,
            cum_qty: qty,
            commission_asset: pack_str("USDT"),
            reject_reason: [0; REASON_LEN],
            _pad: [0; 28],
        }
    }

    /// A new-order acknowledgement for a resting limit order.
    #[must_use]
    pub fn limit_accepted(symbol: SymbolId, order_id: u64, side: Side, timestamp_ns: u64) -> Self {
        Self {
            symbol: pack_str(&symbol.to_string()),
            order_id,
            filled_qty: 0.0,
            filled_price: 0.0,
            commission: 0.0,
            order_timestamp_ns: timestamp_ns,
            exec_timestamp_ns: timestamp_ns,
            exec_type: ExecType::New,
            status: OrderStatus::New,
            order_type: ReportOrderType::Limit,
            side,
            cum_qty: 0.0,
            commission_asset: [0; ASSET_LEN],
            reject_reason: [0; REASON_LEN],
            _pad: [0; 28],
        }
    }

    /// A fill report for a (possibly partially) filled limit order.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn limit_fill(
        symbol: SymbolId,
        order_id: u64,
        side: Side,
        qty: f64,
        price: f64,
        cum_qty: f64,
        commission: f64,
        order_ts_ns: u64,
        exec_ts_ns: u64,
        fully_filled: bool,
    ) -> Self {
        Self {
            symbol: pack_str(&symbol.to_string()),
            order_id,
            filled_qty: qty,
            filled_price: price,
            commission,
            order_timestamp_ns: order_ts_ns,
            exec_timestamp_ns: exec_ts_ns,
            exec_type: ExecType::Trade,
            status: if fully_filled { OrderStatus::Filled } else { OrderStatus::PartiallyFilled },
            order_type: ReportOrderType::Limit,
            side,
            cum_qty,
            commission_asset: pack_str("USDT"),
            reject_reason: [0; REASON_LEN],
            _pad: [0; 28],
        }
    }

    /// A rejection report.
    #[must_use]
    pub fn rejected(
        symbol: SymbolId,
        order_id: u64,
        side: Side,
        order_type: ReportOrderType,
        reason: &str,
        timestamp_ns: u64,
    ) -> Self {
        Self {
            symbol: pack_str(&symbol.to_string()),
            order_id,
            filled_qty: 0.0,
            filled_price: 0.0,
            commission: 0.0,
            order_timestamp_ns: timestamp_ns,
            exec_timestamp_ns: timestamp_ns,
            exec_type: ExecType::Rejected,
            status: OrderStatus::Rejected,
            order_type,
            side,
            cum_qty: 0.0,
            commission_asset: [0; ASSET_LEN],
            reject_reason: pack_str(reason),
            _pad: [0; 28],
        }
    }

    /// A cancellation report.
    #[must_use]
    pub fn cancelled(symbol: SymbolId, order_id: u64, side: Side, cum_qty: f64, timestamp_ns: u64) -> Self {
        Self {
            symbol: pack_str(&symbol.to_string()),
            order_id,
            filled_qty: 0.0,
            filled_price: 0.0,
            commission: 0.0,
            order_timestamp_ns: timestamp_ns,
            exec_timestamp_ns: timestamp_ns,
            exec_type: ExecType::Cancelled,
            status: OrderStatus::Cancelled,
            order_type: ReportOrderType::Limit,
            side,
            cum_qty,
            commission_asset: [0; ASSET_LEN],
            reject_reason: [0; REASON_LEN],
            _pad: [0; 28],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_cache_line_sized_and_aligned() {
        assert_eq!(std::mem::size_of::<ExecutionReport>(), 128);
        assert_eq!(std::mem::align_of::<ExecutionReport>(), 64);
    }

    #[test]
    fn market_fill_is_final_and_is_fill() {
        let r = ExecutionReport::market_fill(
            SymbolId(1),
            42,
            Side::Buy,
            Quantity::from_units(10),
            Price::new(101.5),
            0.05,
            1_000,
        );
        assert!(r.is_fill());
        assert!(r.is_final());
        assert_eq!(r.order_id(), 42);
        assert_eq!(r.symbol(), "SYM_1");
    }

    #[test]
    fn limit_accepted_is_not_final() {
        let r = ExecutionReport::limit_accepted(SymbolId(2), 7, Side::Sell, 500);
        assert!(!r.is_fill());
        assert!(!r.is_final());
        assert_eq!(r.status(), OrderStatus::New);
    }

    #[test]
    fn rejected_carries_reason_text() {
        let r = ExecutionReport::rejected(
            SymbolId(3),
            1,
            Side::Buy,
            ReportOrderType::Limit,
            "risk limit exceeded",
            1,
        );
        assert_eq!(r.reject_reason(), "risk limit exceeded");
        assert!(r.is_final());
    }
}
