//! Order-entry rate limiting: per-trader and global orders/second caps plus
//! a per-trader active-order ceiling (spec §4.4), grounded in
//! `original_source/include/security/rate_limiter.hpp`.
//!
//! Every counter is a plain atomic in a dense, pre-sized `Vec` indexed by
//! `trader_id` — no locks, no string lookups, matching the book/pool hot
//! path discipline elsewhere in this workspace.

use common::config::RateLimiterConfig;
use common::TraderId;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Upper bound on `trader_id`; ids at or beyond this fall back to "allow"
/// rather than indexing out of bounds, matching the reference's bounds
/// check on `trader < MAX_TRADERS`.
pub const MAX_TRADERS: usize = 10_000;

/// Why [`RateLimiter::allow_order`] rejected an order, for telemetry (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// The global per-second order cap was reached.
    GlobalRateLimitExceeded,
    /// This trader's per-second order cap was reached.
    TraderRateLimitExceeded,
    /// This trader already has `max_active_orders` resting.
    MaxActiveOrdersExceeded,
}

#[derive(Default)]
struct TraderStats {
    orders_this_second: AtomicU32,
    active_orders: AtomicU32,
    last_reset: AtomicU64,
}

impl TraderStats {
    fn new() -> Self {
        Self::default()
    }
}

/// Dense per-trader + global order-entry rate limiter.
pub struct RateLimiter {
    config: RateLimiterConfig,
    traders: Vec<TraderStats>,
    global_orders_this_second: AtomicU32,
    global_last_reset: AtomicU64,
}

impl RateLimiter {
    /// Build a rate limiter from `config`, pre-sizing the per-trader table
    /// to [`MAX_TRADERS`].
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        let mut traders = Vec::with_capacity(MAX_TRADERS);
        traders.resize_with(MAX_TRADERS, TraderStats::new);
        Self {
            config,
            traders,
            global_orders_this_second: AtomicU32::new(0),
            global_last_reset: AtomicU64::new(0),
        }
    }

    /// Check whether a new order from `trader` at `now` is allowed.
    /// Disabled limiters and anonymous traders (id 0) always pass (spec
    /// §4.4, matching the reference's "anonymous orders bypass" note for
    /// market-data replay).
    ///
    /// # Errors
    /// The specific [`RejectionReason`] the order tripped.
    pub fn allow_order(&self, trader: TraderId, now_ns: u64) -> Result<(), RejectionReason> {
        if !self.config.enabled || trader.is_anonymous() {
            return Ok(());
        }

        self.check_global_rate(now_ns)?;

        let idx = trader.0 as usize;
        if idx < MAX_TRADERS {
            self.check_trader_rate(idx, now_ns)?;
        }
        Ok(())
    }

    fn check_global_rate(&self, now_ns: u64) -> Result<(), RejectionReason> {
        let current_second = now_ns / 1_000_000_000;
        let last_second = self.global_last_reset.load(Ordering::Relaxed);
        if current_second > last_second {
            self.global_last_reset.store(current_second, Ordering::Relaxed);
            self.global_orders_this_second.store(0, Ordering::Relaxed);
        }
        let count = self.global_orders_this_second.fetch_add(1, Ordering::Relaxed);
        if count >= self.config.global_rate_limit {
            return Err(RejectionReason::GlobalRateLimitExceeded);
        }
        Ok(())
    }

    fn check_trader_rate(&self, idx: usize, now_ns: u64) -> Result<(), RejectionReason> {
        let stats = &self.traders[idx];
        let current_second = now_ns / 1_000_000_000;
        let last_second = stats.last_reset.load(Ordering::Relaxed);
        if current_second > last_second {
            stats.last_reset.store(current_second, Ordering::Relaxed);
            stats.orders_this_second.store(0, Ordering::Relaxed);
        }

        let count = stats.orders_this_second.fetch_add(1, Ordering::Relaxed);
        if count >= self.config.orders_per_second {
            return Err(RejectionReason::TraderRateLimitExceeded);
        }

        let active = stats.active_orders.load(Ordering::Relaxed);
        if active >= self.config.max_active_orders {
            return Err(RejectionReason::MaxActiveOrdersExceeded);
        }
        Ok(())
    }

    /// Record that an order from `trader` is now resting, for the active-order cap.
    pub fn on_order_added(&self, trader: TraderId) {
        if trader.is_anonymous() {
            return;
        }
        if let Some(stats) = self.traders.get(trader.0 as usize) {
            stats.active_orders.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record that a resting order from `trader` filled or was cancelled.
    pub fn on_order_removed(&self, trader: TraderId) {
        if trader.is_anonymous() {
            return;
        }
        if let Some(stats) = self.traders.get(trader.0 as usize) {
            stats.active_orders.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Current active-order count for `trader`, for telemetry.
    #[must_use]
    pub fn active_orders(&self, trader: TraderId) -> u32 {
        self.traders
            .get(trader.0 as usize)
            .map_or(0, |s| s.active_orders.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(orders_per_second: u32) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            orders_per_second,
            max_active_orders: 10_000,
            global_rate_limit: 100_000,
            enabled: true,
        })
    }

    #[test]
    fn allows_up_to_the_per_second_cap_then_rejects() {
        // Scenario 7 (spec §8): 5 orders/sec/trader.
        let rl = limiter(5);
        let trader = TraderId(1);
        for _ in 0..5 {
            assert!(rl.allow_order(trader, 1_000_000_000).is_ok());
        }
        assert_eq!(
            rl.allow_order(trader, 1_000_000_000).unwrap_err(),
            RejectionReason::TraderRateLimitExceeded
        );
    }

    #[test]
    fn new_second_resets_the_counter() {
        let rl = limiter(5);
        let trader = TraderId(1);
        for _ in 0..5 {
            rl.allow_order(trader, 1_000_000_000).unwrap();
        }
        assert!(rl.allow_order(trader, 2_000_000_000).is_ok());
    }

    #[test]
    fn disabled_limiter_always_allows() {
        let rl = RateLimiter::new(RateLimiterConfig {
            orders_per_second: 1,
            max_active_orders: 1,
            global_rate_limit: 1,
            enabled: false,
        });
        let trader = TraderId(1);
        for _ in 0..10 {
            assert!(rl.allow_order(trader, 0).is_ok());
        }
    }

    #[test]
    fn anonymous_trader_bypasses_every_check() {
        let rl = limiter(1);
        for _ in 0..100 {
            assert!(rl.allow_order(TraderId::ANONYMOUS, 0).is_ok());
        }
    }

    #[test]
    fn active_order_cap_rejects_once_reached() {
        let rl = RateLimiter::new(RateLimiterConfig {
            orders_per_second: 1_000,
            max_active_orders: 2,
            global_rate_limit: 100_000,
            enabled: true,
        });
        let trader = TraderId(7);
        rl.on_order_added(trader);
        rl.on_order_added(trader);
        assert_eq!(
            rl.allow_order(trader, 0).unwrap_err(),
            RejectionReason::MaxActiveOrdersExceeded
        );
        rl.on_order_removed(trader);
        assert!(rl.allow_order(trader, 1_000_000_000).is_ok());
    }
}
