//! Halt/flatten control: a single point of authority for emergency stops
//! (spec §2, §9), grounded directly in
//! `original_source/include/strategy/halt_manager.hpp`.
//!
//! Restructured as safe Rust: the C++ original keeps `std::function`
//! callbacks and a raw `std::atomic<HaltState>`; here the state machine is a
//! plain `AtomicU8` behind typed accessors, and callbacks are `Box<dyn Fn>`
//! registered once at construction (cold path — `halt()` fires rarely
//! enough that dynamic dispatch costs nothing, unlike the matching loop
//! itself, per spec §9's guidance on where dispatch is and isn't free).

use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use common::SymbolId;

/// Why trading was halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Not halted.
    None,
    /// Order pool ran out.
    PoolExhausted,
    /// Order pool below its critical threshold.
    PoolCritical,
    /// A risk limit (daily loss or drawdown) was hit.
    MaxLossExceeded,
    /// An operator pulled the kill switch.
    ManualHalt,
    /// An unexpected internal error.
    SystemError,
    /// Market data or exchange connectivity was lost.
    ConnectionLost,
    /// The exchange itself halted trading.
    ExchangeHalt,
    /// An internal circuit breaker tripped.
    CircuitBreaker,
}

/// Halt/flatten state machine (spec §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HaltState {
    /// Normal trading.
    Running = 0,
    /// Cancel/flatten sequence in progress.
    Halting = 1,
    /// Safe state: orders cancelled, positions flat.
    Halted = 2,
    /// Flatten failed; needs operator intervention.
    Error = 3,
}

impl HaltState {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Running,
            1 => Self::Halting,
            2 => Self::Halted,
            _ => Self::Error,
        }
    }
}

/// Default fraction of free order-pool slots below which [`PoolPressure`]
/// escalates to `Critical` (spec §4.1: "default 1% free"), grounded in
/// `original_source/include/order_pool.hpp`'s `CRITICAL_THRESHOLD_PERCENT`.
pub const DEFAULT_POOL_CRITICAL_FRACTION: f64 = 0.01;
/// Default fraction of free order-pool slots below which [`PoolPressure`]
/// is `Warning` (spec §4.1: "default 10% free").
pub const DEFAULT_POOL_WARNING_FRACTION: f64 = 0.10;

/// Result of comparing a pool's free-slot ratio against its configured
/// warning/critical thresholds (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolPressure {
    /// Free-slot ratio is above the warning threshold.
    Ok,
    /// Free-slot ratio has dropped below the warning threshold but not the
    /// critical one; fires a callback without halting.
    Warning,
    /// Free-slot ratio has dropped below the critical threshold; the caller
    /// must halt with [`HaltReason::PoolCritical`].
    Critical,
}

/// Evaluates a pool's `free / capacity` ratio against warning/critical
/// thresholds, matching the plain ratio comparisons in
/// `original_source/include/order_pool.hpp`'s pressure check.
#[derive(Debug, Clone, Copy)]
pub struct PoolPressureThresholds {
    /// Ratio below which pressure is `Critical` (default
    /// [`DEFAULT_POOL_CRITICAL_FRACTION`]).
    pub critical_fraction: f64,
    /// Ratio below which pressure is `Warning` (default
    /// [`DEFAULT_POOL_WARNING_FRACTION`]).
    pub warning_fraction: f64,
}

impl Default for PoolPressureThresholds {
    fn default() -> Self {
        Self {
            critical_fraction: DEFAULT_POOL_CRITICAL_FRACTION,
            warning_fraction: DEFAULT_POOL_WARNING_FRACTION,
        }
    }
}

impl PoolPressureThresholds {
    /// Classify `free` slots out of `capacity` against these thresholds.
    /// A zero-capacity pool is always `Critical`.
    #[must_use]
    pub fn classify(&self, free: u32, capacity: u32) -> PoolPressure {
        if capacity == 0 {
            return PoolPressure::Critical;
        }
        let ratio = f64::from(free) / f64::from(capacity);
        if ratio <= self.critical_fraction {
            PoolPressure::Critical
        } else if ratio <= self.warning_fraction {
            PoolPressure::Warning
        } else {
            PoolPressure::Ok
        }
    }
}

/// One symbol's position as reported to the flatten sweep.
#[derive(Debug, Clone, Copy)]
pub struct PositionInfo {
    /// Symbol.
    pub symbol: SymbolId,
    /// Net position; sign gives the flattening side.
    pub position: i64,
    /// Last traded price, for logging only.
    pub last_price: f64,
}

/// Single point of control for emergency stops: cancel every resting order,
/// flatten every position with market orders, then refuse new orders until
/// an operator calls [`HaltManager::reset`].
pub struct HaltManager {
    state: AtomicU8,
    reason: AtomicU8,
    flatten_attempts: AtomicU32,
    max_flatten_attempts: u32,
    get_positions: Option<Box<dyn Fn() -> Vec<PositionInfo> + Send + Sync>>,
    cancel_all: Option<Box<dyn Fn() + Send + Sync>>,
    send_order: Option<Box<dyn Fn(SymbolId, common::Side, i64, bool) -> bool + Send + Sync>>,
    pool_warning: Option<Box<dyn Fn(PoolPressure) + Send + Sync>>,
    pool_thresholds: PoolPressureThresholds,
}

impl std::fmt::Debug for HaltManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaltManager")
            .field("state", &self.state())
            .field("reason", &self.reason())
            .field("flatten_attempts", &self.flatten_attempts.load(Ordering::Relaxed))
            .finish()
    }
}

impl HaltManager {
    /// Build a halt manager with no callbacks registered and
    /// `max_flatten_attempts` retry budget.
    #[must_use]
    pub fn new(max_flatten_attempts: u32) -> Self {
        Self {
            state: AtomicU8::new(HaltState::Running as u8),
            reason: AtomicU8::new(HaltReason::None as u8),
            flatten_attempts: AtomicU32::new(0),
            max_flatten_attempts,
            get_positions: None,
            cancel_all: None,
            send_order: None,
            pool_warning: None,
            pool_thresholds: PoolPressureThresholds::default(),
        }
    }

    /// Override the default pool-pressure warning/critical thresholds.
    pub fn set_pool_pressure_thresholds(&mut self, thresholds: PoolPressureThresholds) {
        self.pool_thresholds = thresholds;
    }

    /// Register the callback fired (without halting) when pool pressure
    /// crosses into [`PoolPressure::Warning`].
    pub fn set_pool_warning_callback(&mut self, cb: impl Fn(PoolPressure) + Send + Sync + 'static) {
        self.pool_warning = Some(Box::new(cb));
    }

    /// Check `free`/`capacity` order-pool pressure and act on it (spec
    /// §4.1): fires the warning callback on `Warning`, halts with
    /// [`HaltReason::PoolCritical`] on `Critical`, does nothing on `Ok`.
    /// Callers invoke this after every `add_order` on the hot path.
    pub fn check_pool_pressure(&self, free: u32, capacity: u32) -> PoolPressure {
        let pressure = self.pool_thresholds.classify(free, capacity);
        match pressure {
            PoolPressure::Warning => {
                tracing::warn!(free, capacity, "order pool pressure warning");
                if let Some(cb) = &self.pool_warning {
                    cb(pressure);
                }
            }
            PoolPressure::Critical => {
                self.halt(HaltReason::PoolCritical, "order pool below critical free threshold");
            }
            PoolPressure::Ok => {}
        }
        pressure
    }

    /// Register the callback used to enumerate currently open positions.
    pub fn set_get_positions_callback(
        &mut self,
        cb: impl Fn() -> Vec<PositionInfo> + Send + Sync + 'static,
    ) {
        self.get_positions = Some(Box::new(cb));
    }

    /// Register the callback used to cancel every resting order.
    pub fn set_cancel_all_callback(&mut self, cb: impl Fn() + Send + Sync + 'static) {
        self.cancel_all = Some(Box::new(cb));
    }

    /// Register the callback used to send a flattening order. Returns `true`
    /// on successful submission.
    pub fn set_send_order_callback(
        &mut self,
        cb: impl Fn(SymbolId, common::Side, i64, bool) -> bool + Send + Sync + 'static,
    ) {
        self.send_order = Some(Box::new(cb));
    }

    /// Hot-path check: a single atomic load, safe to call from the trading
    /// loop on every order.
    #[must_use]
    pub fn can_trade(&self) -> bool {
        self.state.load(Ordering::Acquire) == HaltState::Running as u8
    }

    /// True if not in [`HaltState::Running`].
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.state.load(Ordering::Acquire) != HaltState::Running as u8
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> HaltState {
        HaltState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Current halt reason.
    #[must_use]
    pub fn reason(&self) -> HaltReason {
        match self.reason.load(Ordering::Acquire) {
            0 => HaltReason::None,
            1 => HaltReason::PoolExhausted,
            2 => HaltReason::PoolCritical,
            3 => HaltReason::MaxLossExceeded,
            4 => HaltReason::ManualHalt,
            5 => HaltReason::SystemError,
            6 => HaltReason::ConnectionLost,
            7 => HaltReason::ExchangeHalt,
            _ => HaltReason::CircuitBreaker,
        }
    }

    /// Trigger a halt: cancel every resting order, enumerate positions, and
    /// flatten each with a market order. Returns `false` without doing
    /// anything if a halt is already in progress or complete (the atomic
    /// `Running -> Halting` transition only succeeds once).
    pub fn halt(&self, reason: HaltReason, message: &str) -> bool {
        if self
            .state
            .compare_exchange(
                HaltState::Running as u8,
                HaltState::Halting as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            tracing::warn!(?reason, "halt requested but already halting or halted");
            return false;
        }

        self.reason.store(reason as u8, Ordering::Release);
        tracing::warn!(?reason, message, "HALT INITIATED");

        if let Some(cancel_all) = &self.cancel_all {
            cancel_all();
        } else {
            tracing::warn!("halt: no cancel-all callback registered");
        }

        let positions = self.get_positions.as_ref().map_or_else(Vec::new, |cb| cb());
        let all_flattened = self.flatten_positions(&positions);

        if all_flattened {
            self.state.store(HaltState::Halted as u8, Ordering::Release);
            tracing::warn!("HALT COMPLETE: system in safe state");
        } else {
            self.state.store(HaltState::Error as u8, Ordering::Release);
            tracing::error!("HALT ERROR: manual intervention required");
        }
        true
    }

    /// Retry a failed flatten after [`HaltState::Error`]. Bounded by
    /// `max_flatten_attempts`.
    pub fn retry_flatten(&self) -> bool {
        if self.state() != HaltState::Error {
            tracing::warn!("retry_flatten called outside Error state");
            return false;
        }
        if self.flatten_attempts.load(Ordering::Relaxed) >= self.max_flatten_attempts {
            tracing::error!("max flatten attempts reached");
            return false;
        }

        self.state.store(HaltState::Halting as u8, Ordering::Release);
        let positions = self.get_positions.as_ref().map_or_else(Vec::new, |cb| cb());
        let success = self.flatten_positions(&positions);

        self.state.store(
            if success { HaltState::Halted as u8 } else { HaltState::Error as u8 },
            Ordering::Release,
        );
        success
    }

    /// Clear the halt state back to `Running`. Operator-only: callers must
    /// be certain positions are actually flat and the cause addressed.
    pub fn reset(&self) {
        tracing::warn!("halt state reset to Running by operator");
        self.state.store(HaltState::Running as u8, Ordering::Release);
        self.reason.store(HaltReason::None as u8, Ordering::Release);
        self.flatten_attempts.store(0, Ordering::Relaxed);
    }

    fn flatten_positions(&self, positions: &[PositionInfo]) -> bool {
        self.flatten_attempts.fetch_add(1, Ordering::Relaxed);

        if positions.is_empty() {
            return true;
        }
        let Some(send_order) = &self.send_order else {
            tracing::error!("halt: no send-order callback registered, cannot flatten");
            return false;
        };

        let mut all_success = true;
        for pos in positions {
            if pos.position == 0 {
                continue;
            }
            let side = if pos.position > 0 { common::Side::Sell } else { common::Side::Buy };
            let qty = pos.position.abs();
            if send_order(pos.symbol, side, qty, true) {
                tracing::info!(symbol = ?pos.symbol, ?side, qty, "flatten order sent");
            } else {
                tracing::error!(symbol = ?pos.symbol, "flatten order failed");
                all_success = false;
            }
        }
        all_success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn halt_with_no_open_positions_completes_immediately() {
        let mut mgr = HaltManager::new(3);
        mgr.set_cancel_all_callback(|| {});
        mgr.set_get_positions_callback(Vec::new);
        assert!(mgr.halt(HaltReason::ManualHalt, "test"));
        assert_eq!(mgr.state(), HaltState::Halted);
    }

    #[test]
    fn second_halt_call_is_a_no_op() {
        let mut mgr = HaltManager::new(3);
        mgr.set_cancel_all_callback(|| {});
        mgr.set_get_positions_callback(Vec::new);
        assert!(mgr.halt(HaltReason::ManualHalt, ""));
        assert!(!mgr.halt(HaltReason::CircuitBreaker, ""));
    }

    #[test]
    fn halt_flattens_every_open_position() {
        let mut mgr = HaltManager::new(3);
        let sent = Arc::new(AtomicUsize::new(0));
        let sent_clone = sent.clone();
        mgr.set_cancel_all_callback(|| {});
        mgr.set_get_positions_callback(|| {
            vec![
                PositionInfo { symbol: SymbolId(1), position: 100, last_price: 10.0 },
                PositionInfo { symbol: SymbolId(2), position: -50, last_price: 5.0 },
            ]
        });
        mgr.set_send_order_callback(move |_, _, _, _| {
            sent_clone.fetch_add(1, Ordering::Relaxed);
            true
        });
        assert!(mgr.halt(HaltReason::MaxLossExceeded, "drawdown breach"));
        assert_eq!(mgr.state(), HaltState::Halted);
        assert_eq!(sent.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn failed_flatten_enters_error_state_and_can_retry() {
        let mut mgr = HaltManager::new(3);
        let attempt = Arc::new(AtomicUsize::new(0));
        let attempt_clone = attempt.clone();
        mgr.set_cancel_all_callback(|| {});
        mgr.set_get_positions_callback(|| {
            vec![PositionInfo { symbol: SymbolId(1), position: 10, last_price: 1.0 }]
        });
        mgr.set_send_order_callback(move |_, _, _, _| {
            let n = attempt_clone.fetch_add(1, Ordering::Relaxed);
            n >= 1 // fail first attempt, succeed on retry
        });
        assert!(mgr.halt(HaltReason::SystemError, ""));
        assert_eq!(mgr.state(), HaltState::Error);
        assert!(mgr.retry_flatten());
        assert_eq!(mgr.state(), HaltState::Halted);
    }

    #[test]
    fn can_trade_is_false_once_halting() {
        let mut mgr = HaltManager::new(3);
        mgr.set_cancel_all_callback(|| {});
        mgr.set_get_positions_callback(Vec::new);
        mgr.halt(HaltReason::ManualHalt, "");
        assert!(!mgr.can_trade());
        mgr.reset();
        assert!(mgr.can_trade());
    }

    #[test]
    fn pool_pressure_ok_above_warning_threshold() {
        let mgr = HaltManager::new(3);
        assert_eq!(mgr.check_pool_pressure(500, 1000), PoolPressure::Ok);
        assert_eq!(mgr.state(), HaltState::Running);
    }

    #[test]
    fn pool_pressure_warning_fires_callback_without_halting() {
        let mut mgr = HaltManager::new(3);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        mgr.set_pool_warning_callback(move |p| {
            assert_eq!(p, PoolPressure::Warning);
            fired_clone.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(mgr.check_pool_pressure(50, 1000), PoolPressure::Warning);
        assert_eq!(fired.load(Ordering::Relaxed), 1);
        assert_eq!(mgr.state(), HaltState::Running);
    }

    #[test]
    fn pool_pressure_critical_halts_with_pool_critical_reason() {
        let mut mgr = HaltManager::new(3);
        mgr.set_cancel_all_callback(|| {});
        mgr.set_get_positions_callback(Vec::new);
        assert_eq!(mgr.check_pool_pressure(5, 1000), PoolPressure::Critical);
        assert_eq!(mgr.state(), HaltState::Halted);
        assert_eq!(mgr.reason(), HaltReason::PoolCritical);
    }

    #[test]
    fn custom_thresholds_change_classification() {
        let mut mgr = HaltManager::new(3);
        mgr.set_pool_pressure_thresholds(PoolPressureThresholds {
            critical_fraction: 0.20,
            warning_fraction: 0.50,
        });
        assert_eq!(mgr.check_pool_pressure(300, 1000), PoolPressure::Warning);
    }

    #[test]
    fn retry_flatten_respects_max_attempts() {
        let mut mgr = HaltManager::new(1);
        mgr.set_cancel_all_callback(|| {});
        mgr.set_get_positions_callback(|| {
            vec![PositionInfo { symbol: SymbolId(1), position: 1, last_price: 1.0 }]
        });
        mgr.set_send_order_callback(|_, _, _, _| false);
        mgr.halt(HaltReason::SystemError, "");
        assert_eq!(mgr.state(), HaltState::Error);
        assert!(!mgr.retry_flatten(), "max_flatten_attempts is 1, the initial halt used it");
    }
}
