//! `TunerEvent` — one audit-log record for the HFT + AI-tuner system: trade
//! events, tuner config changes, market regime transitions, and system
//! events all share this one fixed-size shape so they can sit in the same
//! ring buffer ([`crate::event_log::SharedEventLog`]) without a tag-specific
//! allocation (spec §4.5).
//!
//! The original C++ type overlays these variants in a `union`; safe Rust has
//! no free punning like that, so this module keeps one `payload: [u8; 92]`
//! byte buffer and exposes each variant through typed pack/unpack helpers
//! instead. The on-the-wire shape (offsets, field widths) is unchanged.

use std::time::{SystemTime, UNIX_EPOCH};

/// Width of the `symbol` field, including the null terminator.
pub const EVENT_SYMBOL_LEN: usize = 16;
/// Width of the free-text `reason` field.
pub const EVENT_REASON_LEN: usize = 128;
/// Width of a tuned parameter's name field.
pub const EVENT_PARAM_NAME_LEN: usize = 24;

const PAYLOAD_LEN: usize = 92;

/// Category of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TunerEventType {
    /// Strategy generated a signal.
    Signal = 0,
    /// Order placed.
    Order = 1,
    /// Order executed (filled).
    Fill = 2,
    /// Order cancelled.
    Cancel = 3,
    /// New position opened.
    PositionOpen = 4,
    /// Position closed.
    PositionClose = 5,
    /// Accumulation aggressiveness decision recorded.
    AccumulationDecision = 6,
    /// AI modified a symbol's tuning config.
    ConfigChange = 16,
    /// Trading paused for a symbol.
    PauseSymbol = 17,
    /// Trading resumed for a symbol.
    ResumeSymbol = 18,
    /// Emergency position close triggered.
    EmergencyExit = 19,
    /// Raw AI decision logged.
    AIDecision = 20,
    /// What triggered a tuning pass.
    TuningTrigger = 21,
    /// Tuning pass skipped (rate limit, etc).
    TuningSkipped = 22,
    /// Market regime transition.
    RegimeChange = 32,
    /// External news detected.
    NewsEvent = 33,
    /// Unusual volatility detected.
    VolatilitySpike = 34,
    /// Price threshold crossed.
    PriceAlert = 35,
    /// Process health heartbeat.
    Heartbeat = 48,
    /// Process started.
    ProcessStart = 49,
    /// Process stopped.
    ProcessStop = 50,
    /// Error or warning.
    Error = 51,
    /// Config reloaded from file.
    ConfigReload = 52,
}

impl TunerEventType {
    /// Trade-category events occupy codes `0..16`.
    #[must_use]
    pub const fn is_trade_event(self) -> bool {
        (self as u8) < 16
    }

    /// Tuner-category events occupy codes `16..32`.
    #[must_use]
    pub const fn is_tuner_event(self) -> bool {
        let v = self as u8;
        v >= 16 && v < 32
    }

    /// Market-category events occupy codes `32..48`.
    #[must_use]
    pub const fn is_market_event(self) -> bool {
        let v = self as u8;
        v >= 32 && v < 48
    }

    /// System-category events occupy codes `48..`.
    #[must_use]
    pub const fn is_system_event(self) -> bool {
        (self as u8) >= 48
    }

    /// Short display name, as used in dashboard/log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Signal => "SIGNAL",
            Self::Order => "ORDER",
            Self::Fill => "FILL",
            Self::Cancel => "CANCEL",
            Self::PositionOpen => "POS_OPEN",
            Self::PositionClose => "POS_CLOSE",
            Self::AccumulationDecision => "ACCUMULATION",
            Self::ConfigChange => "CONFIG",
            Self::PauseSymbol => "PAUSE",
            Self::ResumeSymbol => "RESUME",
            Self::EmergencyExit => "EMERGENCY",
            Self::AIDecision => "AI_DECISION",
            Self::TuningTrigger => "TRIGGER",
            Self::TuningSkipped => "SKIP",
            Self::RegimeChange => "REGIME",
            Self::NewsEvent => "NEWS",
            Self::VolatilitySpike => "VOL_SPIKE",
            Self::PriceAlert => "PRICE_ALERT",
            Self::Heartbeat => "HEARTBEAT",
            Self::ProcessStart => "START",
            Self::ProcessStop => "STOP",
            Self::Error => "ERROR",
            Self::ConfigReload => "RELOAD",
        }
    }
}

/// What triggered a tuning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TriggerReason {
    /// No trigger recorded.
    None = 0,
    /// Regular scheduled interval.
    Scheduled = 1,
    /// A symbol hit its loss limit.
    LossThreshold = 2,
    /// Multiple losing trades in a row.
    ConsecutiveLosses = 3,
    /// Good recent performance.
    WinStreak = 4,
    /// ATR/volatility increased significantly.
    VolatilitySpike = 5,
    /// Breaking news detected.
    NewsTriggered = 6,
    /// Operator requested a tuning pass manually.
    ManualRequest = 7,
    /// Initial config on process startup.
    StartupInit = 8,
    /// Market regime changed.
    RegimeChange = 9,
    /// Portfolio-level drawdown alert.
    DrawdownAlert = 10,
}

impl TriggerReason {
    /// Short display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Scheduled => "scheduled",
            Self::LossThreshold => "loss_threshold",
            Self::ConsecutiveLosses => "consecutive_losses",
            Self::WinStreak => "win_streak",
            Self::VolatilitySpike => "volatility_spike",
            Self::NewsTriggered => "news",
            Self::ManualRequest => "manual",
            Self::StartupInit => "startup",
            Self::RegimeChange => "regime_change",
            Self::DrawdownAlert => "drawdown",
        }
    }
}

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    /// Verbose debugging detail.
    Debug = 0,
    /// Normal operation.
    Info = 1,
    /// Potential issue.
    Warning = 2,
    /// Requires attention.
    Critical = 3,
}

/// Side of a trade-category event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum TradeSide {
    /// Sell / ask side.
    Sell = -1,
    /// No side (non-directional event).
    None = 0,
    /// Buy / bid side.
    Buy = 1,
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

fn now_ns() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0)
}

/// One audit-log record, 256 bytes.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TunerEvent {
    timestamp_ns: u64,
    sequence: u32,
    event_type: TunerEventType,
    trigger: TriggerReason,
    severity: Severity,
    _reserved_header: u8,
    symbol: [u8; EVENT_SYMBOL_LEN],
    process_id: u32,
    payload: [u8; PAYLOAD_LEN],
    reason: [u8; EVENT_REASON_LEN],
}

impl TunerEvent {
    fn blank(event_type: TunerEventType, symbol: &str) -> Self {
        Self {
            timestamp_ns: now_ns(),
            sequence: 0,
            event_type,
            trigger: TriggerReason::None,
            severity: Severity::Info,
            _reserved_header: 0,
            symbol: pack_str(symbol),
            process_id: std::process::id(),
            payload: [0; PAYLOAD_LEN],
            reason: [0; EVENT_REASON_LEN],
        }
    }

    fn with_reason(mut self, reason: Option<&str>) -> Self {
        if let Some(r) = reason {
            self.reason = pack_str(r);
        }
        self
    }

    /// Event category.
    #[must_use]
    pub const fn event_type(&self) -> TunerEventType {
        self.event_type
    }

    /// Global ring-buffer sequence number, assigned by `SharedEventLog::log`.
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Set the ring-buffer sequence number. Called once by `SharedEventLog::log`.
    pub fn set_sequence(&mut self, seq: u32) {
        self.sequence = seq;
    }

    /// Severity level.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Symbol this event concerns, or `"*"` for a global event.
    #[must_use]
    pub fn symbol(&self) -> &str {
        unpack_str(&self.symbol)
    }

    /// Free-text description attached to the event.
    #[must_use]
    pub fn reason(&self) -> &str {
        unpack_str(&self.reason)
    }

    /// Nanosecond timestamp the event was created.
    #[must_use]
    pub const fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    /// Originating process id.
    #[must_use]
    pub const fn process_id(&self) -> u32 {
        self.process_id
    }

    // --- trade payload: side(1) order_type(1) fill_type(1) reserved(1)
    // price(8) quantity(8) avg_price(8) pnl_x100(8) position_x100(8)
    // order_id(8) latency_ns(8) = 60 bytes

    /// A strategy-generated signal event.
    #[must_use]
    pub fn make_signal(symbol: &str, side: TradeSide, price: f64, quantity: f64, reason: Option<&str>) -> Self {
        let mut e = Self::blank(TunerEventType::Signal, symbol);
        e.payload[0] = side as u8;
        e.payload[4..12].copy_from_slice(&price.to_le_bytes());
        e.payload[12..20].copy_from_slice(&quantity.to_le_bytes());
        e.with_reason(reason)
    }

    /// An order-fill event, carrying realized P&L in cents.
    #[must_use]
    pub fn make_fill(
        symbol: &str,
        side: TradeSide,
        price: f64,
        quantity: f64,
        pnl_cents: i64,
        reason: Option<&str>,
    ) -> Self {
        let mut e = Self::blank(TunerEventType::Fill, symbol);
        e.payload[0] = side as u8;
        e.payload[4..12].copy_from_slice(&price.to_le_bytes());
        e.payload[12..20].copy_from_slice(&quantity.to_le_bytes());
        e.payload[28..36].copy_from_slice(&pnl_cents.to_le_bytes());
        e.with_reason(reason)
    }

    /// Trade side recorded in a trade-category payload.
    #[must_use]
    pub fn trade_side(&self) -> TradeSide {
        match self.payload[0] as i8 {
            -1 => TradeSide::Sell,
            1 => TradeSide::Buy,
            _ => TradeSide::None,
        }
    }

    /// Price recorded in a trade-category payload.
    #[must_use]
    pub fn trade_price(&self) -> f64 {
        f64::from_le_bytes(self.payload[4..12].try_into().unwrap())
    }

    /// Quantity recorded in a trade-category payload.
    #[must_use]
    pub fn trade_quantity(&self) -> f64 {
        f64::from_le_bytes(self.payload[12..20].try_into().unwrap())
    }

    /// P&L (cents) recorded in a fill payload.
    #[must_use]
    pub fn trade_pnl_x100(&self) -> i64 {
        i64::from_le_bytes(self.payload[28..36].try_into().unwrap())
    }

    // --- config payload: param_name(24) old_value_x100(4) new_value_x100(4)
    // ai_confidence(1) ai_urgency(1) change_source(1) reserved(5) = 40 bytes

    /// An AI/tuner config-change event.
    #[must_use]
    pub fn make_config_change(
        symbol: &str,
        param: &str,
        old_value_x100: i32,
        new_value_x100: i32,
        confidence: u8,
        reason: Option<&str>,
    ) -> Self {
        let mut e = Self::blank(TunerEventType::ConfigChange, symbol);
        e.payload[0..EVENT_PARAM_NAME_LEN].copy_from_slice(&pack_str::<EVENT_PARAM_NAME_LEN>(param));
        let o = EVENT_PARAM_NAME_LEN;
        e.payload[o..o + 4].copy_from_slice(&old_value_x100.to_le_bytes());
        e.payload[o + 4..o + 8].copy_from_slice(&new_value_x100.to_le_bytes());
        e.payload[o + 8] = confidence;
        e.with_reason(reason)
    }

    /// Parameter name recorded in a config-change payload.
    #[must_use]
    pub fn config_param_name(&self) -> &str {
        unpack_str(&self.payload[0..EVENT_PARAM_NAME_LEN])
    }

    /// Old value (x100 fixed point) recorded in a config-change payload.
    #[must_use]
    pub fn config_old_value_x100(&self) -> i32 {
        let o = EVENT_PARAM_NAME_LEN;
        i32::from_le_bytes(self.payload[o..o + 4].try_into().unwrap())
    }

    /// New value (x100 fixed point) recorded in a config-change payload.
    #[must_use]
    pub fn config_new_value_x100(&self) -> i32 {
        let o = EVENT_PARAM_NAME_LEN + 4;
        i32::from_le_bytes(self.payload[o..o + 4].try_into().unwrap())
    }

    // --- error payload: error_code(4) is_recoverable(1) reserved(3) component(24)

    /// A system-error event.
    #[must_use]
    pub fn make_error(component: &str, code: i32, recoverable: bool, reason: &str) -> Self {
        let mut e = Self::blank(TunerEventType::Error, "*");
        e.severity = Severity::Critical;
        e.payload[0..4].copy_from_slice(&code.to_le_bytes());
        e.payload[4] = u8::from(recoverable);
        e.payload[8..8 + 24].copy_from_slice(&pack_str::<24>(component));
        e.with_reason(Some(reason))
    }

    /// Error code recorded in an error payload.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        i32::from_le_bytes(self.payload[0..4].try_into().unwrap())
    }

    /// Component name recorded in an error payload.
    #[must_use]
    pub fn error_component(&self) -> &str {
        unpack_str(&self.payload[8..8 + 24])
    }
}

const _: () = assert!(std::mem::size_of::<TunerEvent>() == 256);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuner_event_is_256_bytes() {
        assert_eq!(std::mem::size_of::<TunerEvent>(), 256);
    }

    #[test]
    fn trade_category_round_trips_through_payload() {
        let e = TunerEvent::make_fill("BTCUSDT", TradeSide::Buy, 65_000.5, 0.01, 1250, Some("tp hit"));
        assert_eq!(e.event_type(), TunerEventType::Fill);
        assert!(e.event_type().is_trade_event());
        assert_eq!(e.symbol(), "BTCUSDT");
        assert_eq!(e.trade_side(), TradeSide::Buy);
        assert!((e.trade_price() - 65_000.5).abs() < 1e-9);
        assert!((e.trade_quantity() - 0.01).abs() < 1e-9);
        assert_eq!(e.trade_pnl_x100(), 1250);
        assert_eq!(e.reason(), "tp hit");
    }

    #[test]
    fn config_change_round_trips_through_payload() {
        let e = TunerEvent::make_config_change("ETHUSDT", "stop_pct", 100, 150, 80, None);
        assert!(e.event_type().is_tuner_event());
        assert_eq!(e.config_param_name(), "stop_pct");
        assert_eq!(e.config_old_value_x100(), 100);
        assert_eq!(e.config_new_value_x100(), 150);
    }

    #[test]
    fn error_event_sets_critical_severity() {
        let e = TunerEvent::make_error("risk_manager", -5, false, "halted on drawdown breach");
        assert_eq!(e.severity(), Severity::Critical);
        assert!(e.event_type().is_system_event());
        assert_eq!(e.error_code(), -5);
        assert_eq!(e.error_component(), "risk_manager");
        assert_eq!(e.reason(), "halted on drawdown breach");
    }
}
