//! Core value types for the trading core.
//!
//! Prices and quantities are fixed-point integers so book state is
//! reproducible bit-for-bit across runs; floating point is confined to the
//! paper-exchange fill path where fractional crypto sizes require it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-point scale: 1 tick = 0.0001 units (4 decimal places).
pub const PRICE_SCALE: u32 = 10_000;

/// Side of an order or a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy / bid.
    Buy,
    /// Sell / ask.
    Sell,
}

impl Side {
    /// The opposite side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// Fixed-point price: 4 decimal places, `u32::MAX` is the invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(pub u32);

impl Price {
    /// Sentinel for "no price" (empty level, unset field).
    pub const INVALID: Self = Self(u32::MAX);

    /// Zero price.
    pub const ZERO: Self = Self(0);

    /// Build a price from a floating-point value, rounding to the nearest tick.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self((value * f64::from(PRICE_SCALE)).round() as u32)
    }

    /// Render as a floating-point value, for external APIs and logging only.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / f64::from(PRICE_SCALE)
    }

    /// Raw tick value.
    #[must_use]
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// True if this is the sentinel invalid price.
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / PRICE_SCALE;
        let frac = self.0 % PRICE_SCALE;
        write!(f, "{whole}.{frac:04}")
    }
}

/// Integer order size for the equity matching path, 4 decimal places of precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quantity(pub u32);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Self = Self(0);

    /// Build from a whole-unit integer count (e.g. 5 shares).
    #[must_use]
    pub const fn from_units(units: u32) -> Self {
        Self(units * PRICE_SCALE)
    }

    /// Render as floating point.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / f64::from(PRICE_SCALE)
    }

    /// True if zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Saturating subtraction, used when reducing a resting order's remaining size.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / PRICE_SCALE;
        let frac = self.0 % PRICE_SCALE;
        write!(f, "{whole}.{frac:04}")
    }
}

/// Fractional fill quantity for the paper-exchange / adapter path, where venues
/// quote sizes like `0.01` BTC that an integer [`Quantity`] cannot hold.
pub type FillQty = f64;

/// Order identifier. Zero is the invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl OrderId {
    /// The invalid sentinel order id.
    pub const INVALID: Self = Self(0);

    /// True if this is a usable (non-zero) id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trader/account identifier. Zero means anonymous (no self-trade prevention applies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraderId(pub u32);

impl TraderId {
    /// Anonymous trader sentinel.
    pub const ANONYMOUS: Self = Self(0);

    /// True if this trader participates in self-trade prevention.
    #[must_use]
    pub const fn is_anonymous(self) -> bool {
        self.0 == 0
    }
}

/// Dense, zero-based symbol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SYM_{}", self.0)
    }
}

/// Nanosecond timestamp since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Nanoseconds elapsed since this process started, from a monotonic
    /// clock rather than wall-clock time — immune to NTP/leap-second
    /// adjustments, which would otherwise make two `now()` calls
    /// non-monotonic across a clock step (spec §3's nanosecond-resolution
    /// monotonic timestamp requirement).
    #[must_use]
    pub fn now() -> Self {
        use std::sync::OnceLock;
        use std::time::Instant;
        static START: OnceLock<Instant> = OnceLock::new();
        let start = START.get_or_init(Instant::now);
        Self(start.elapsed().as_nanos() as u64)
    }

    /// Construct from a raw nanosecond count.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Raw nanoseconds.
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Microseconds, truncated.
    #[must_use]
    pub const fn as_micros(self) -> u64 {
        self.0 / 1_000
    }

    /// Milliseconds, truncated.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0 / 1_000_000
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_round_trips_through_f64() {
        let p = Price::new(101.0);
        assert_eq!(p.ticks(), 1_010_000);
        assert_eq!(p, Price(1_010_000));
        assert!((p.as_f64() - 101.0).abs() < 1e-9);
    }

    #[test]
    fn price_display_matches_fixed_point_scale() {
        assert_eq!(Price(10_100).to_string(), "1.0100");
    }

    #[test]
    fn quantity_from_units() {
        assert_eq!(Quantity::from_units(5), Quantity(50_000));
    }

    #[test]
    fn quantity_saturating_sub_floors_at_zero() {
        assert_eq!(
            Quantity(5).saturating_sub(Quantity(10)),
            Quantity::ZERO
        );
    }

    #[test]
    fn order_id_zero_is_invalid() {
        assert!(!OrderId::INVALID.is_valid());
        assert!(OrderId(1).is_valid());
    }

    #[test]
    fn trader_zero_is_anonymous() {
        assert!(TraderId::ANONYMOUS.is_anonymous());
        assert!(!TraderId(7).is_anonymous());
    }

    #[test]
    fn side_opposite_round_trips() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite().opposite(), Side::Sell);
    }

    #[test]
    fn timestamp_unit_conversions() {
        let ts = Timestamp::from_nanos(1_234_567_890);
        assert_eq!(ts.as_nanos(), 1_234_567_890);
        assert_eq!(ts.as_micros(), 1_234_567);
        assert_eq!(ts.as_millis(), 1_234);
    }

    #[test]
    fn timestamp_serde_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let ts = Timestamp::from_nanos(42);
        let encoded = bincode::serialize(&ts)?;
        let decoded: Timestamp = bincode::deserialize(&encoded)?;
        assert_eq!(ts, decoded);
        Ok(())
    }
}
