//! Static configuration for the matching engine, risk gate and rate limiter.
//!
//! Loaded once at startup from TOML; nothing here is mutated on the hot
//! path (runtime-tunable values live in the shared-memory config region
//! owned by the `ipc` crate).

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for one trading-core instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Order book pool sizing and price range.
    #[serde(default)]
    pub book: OrderBookConfig,

    /// Pre-trade risk limits.
    #[serde(default)]
    pub risk: RiskConfig,

    /// Order-entry rate limits.
    #[serde(default)]
    pub rate_limiter: RateLimiterConfig,

    /// Paper-exchange simulator defaults.
    #[serde(default)]
    pub paper_exchange: PaperExchangeConfig,

    /// Shared-memory IPC region paths.
    #[serde(default)]
    pub shared_memory: SharedMemoryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            book: OrderBookConfig::default(),
            risk: RiskConfig::default(),
            rate_limiter: RateLimiterConfig::default(),
            paper_exchange: PaperExchangeConfig::default(),
            shared_memory: SharedMemoryConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not parse as valid TOML.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from the path in `ENGINE_CONFIG_PATH`, falling back to defaults
    /// when unset or unreadable.
    #[must_use]
    pub fn from_env() -> Self {
        let path =
            std::env::var("ENGINE_CONFIG_PATH").unwrap_or_else(|_| "engine_config.toml".into());
        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("using default engine config ({path}): {e}");
            Self::default()
        })
    }
}

/// Order book pool sizing, mirroring the pre-allocated arena capacities of
/// the original engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookConfig {
    /// Maximum number of resting orders across all symbols.
    #[serde(default = "default_max_orders")]
    pub max_orders: u32,

    /// Maximum number of distinct price levels across all symbols.
    #[serde(default = "default_max_price_levels")]
    pub max_price_levels: u32,

    /// Width of the dense price-level index array, in ticks.
    #[serde(default = "default_price_range")]
    pub price_range: u32,

    /// Base price used to center the dense price-level index array.
    #[serde(default = "default_base_price")]
    pub base_price: u32,
}

fn default_max_orders() -> u32 {
    1_000_000
}
fn default_max_price_levels() -> u32 {
    100_000
}
fn default_price_range() -> u32 {
    200_000
}
fn default_base_price() -> u32 {
    90_000
}

impl Default for OrderBookConfig {
    fn default() -> Self {
        Self {
            max_orders: default_max_orders(),
            max_price_levels: default_max_price_levels(),
            price_range: default_price_range(),
            base_price: default_base_price(),
        }
    }
}

/// Pre-trade risk limits, mirroring `EnhancedRiskConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Starting capital used to compute equity and drawdown.
    #[serde(default)]
    pub initial_capital: i64,

    /// Daily loss limit as a fraction of initial capital (0.02 = 2%).
    #[serde(default = "default_daily_loss_limit_pct")]
    pub daily_loss_limit_pct: f64,

    /// Maximum peak-to-trough drawdown as a fraction of peak equity.
    #[serde(default = "default_max_drawdown_pct")]
    pub max_drawdown_pct: f64,

    /// Maximum aggregate notional as a fraction of initial capital.
    #[serde(default = "default_max_notional_pct")]
    pub max_notional_pct: f64,

    /// Maximum size for a single order, in quantity units.
    #[serde(default = "default_max_order_size")]
    pub max_order_size: u32,

    /// Maximum total absolute position across all symbols.
    #[serde(default = "default_max_total_position")]
    pub max_total_position: i64,
}

fn default_daily_loss_limit_pct() -> f64 {
    0.02
}
fn default_max_drawdown_pct() -> f64 {
    0.10
}
fn default_max_notional_pct() -> f64 {
    1.0
}
fn default_max_order_size() -> u32 {
    10_000
}
fn default_max_total_position() -> i64 {
    100_000
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            initial_capital: 0,
            daily_loss_limit_pct: default_daily_loss_limit_pct(),
            max_drawdown_pct: default_max_drawdown_pct(),
            max_notional_pct: default_max_notional_pct(),
            max_order_size: default_max_order_size(),
            max_total_position: default_max_total_position(),
        }
    }
}

/// Order-entry rate limits, mirroring `RateLimiter::Config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum new orders accepted per trader per second.
    #[serde(default = "default_orders_per_second")]
    pub orders_per_second: u32,

    /// Maximum concurrently active (resting) orders per trader.
    #[serde(default = "default_max_active_orders")]
    pub max_active_orders: u32,

    /// Maximum new orders accepted across all traders per second.
    #[serde(default = "default_global_rate_limit")]
    pub global_rate_limit: u32,

    /// Master enable/disable switch.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_orders_per_second() -> u32 {
    1_000
}
fn default_max_active_orders() -> u32 {
    10_000
}
fn default_global_rate_limit() -> u32 {
    100_000
}
fn default_true() -> bool {
    true
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            orders_per_second: default_orders_per_second(),
            max_active_orders: default_max_active_orders(),
            global_rate_limit: default_global_rate_limit(),
            enabled: true,
        }
    }
}

/// Paper-exchange simulator defaults, mirroring `PaperExchange`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperExchangeConfig {
    /// Adverse slippage applied to fills, in basis points.
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: f64,

    /// Commission rate applied to each fill notional (0.001 = 10 bps).
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,

    /// Maximum number of concurrently pending limit orders.
    #[serde(default = "default_max_pending_orders")]
    pub max_pending_orders: u32,
}

fn default_slippage_bps() -> f64 {
    5.0
}
fn default_commission_rate() -> f64 {
    0.001
}
fn default_max_pending_orders() -> u32 {
    256
}

impl Default for PaperExchangeConfig {
    fn default() -> Self {
        Self {
            slippage_bps: default_slippage_bps(),
            commission_rate: default_commission_rate(),
            max_pending_orders: default_max_pending_orders(),
        }
    }
}

/// Filesystem paths for the shared-memory IPC regions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedMemoryConfig {
    /// Name of the `SharedConfig` region.
    #[serde(default = "default_config_shm_name")]
    pub config_shm_name: String,

    /// Name of the `SharedEventLog` region.
    #[serde(default = "default_event_log_shm_name")]
    pub event_log_shm_name: String,

    /// Maximum distinct symbols tracked by `SharedSymbolConfigs`.
    #[serde(default = "default_max_shared_symbols")]
    pub max_shared_symbols: u32,

    /// Number of slots in the event log ring buffer.
    #[serde(default = "default_event_log_ring_size")]
    pub event_log_ring_size: u32,
}

fn default_config_shm_name() -> String {
    "/trader_config".to_string()
}
fn default_event_log_shm_name() -> String {
    "/trader_event_log".to_string()
}
fn default_max_shared_symbols() -> u32 {
    32
}
fn default_event_log_ring_size() -> u32 {
    16_384
}

impl Default for SharedMemoryConfig {
    fn default() -> Self {
        Self {
            config_shm_name: default_config_shm_name(),
            event_log_shm_name: default_event_log_shm_name(),
            max_shared_symbols: default_max_shared_symbols(),
            event_log_ring_size: default_event_log_ring_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_original_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.book.max_orders, 1_000_000);
        assert_eq!(cfg.book.max_price_levels, 100_000);
        assert_eq!(cfg.rate_limiter.max_active_orders, 10_000);
        assert_eq!(cfg.shared_memory.event_log_ring_size, 16_384);
    }

    #[test]
    fn toml_round_trip_overrides_only_specified_fields() {
        let toml_src = r#"
            [book]
            max_orders = 500

            [risk]
            initial_capital = 1000000
        "#;
        let cfg: EngineConfig = toml::from_str(toml_src).expect("valid toml");
        assert_eq!(cfg.book.max_orders, 500);
        assert_eq!(cfg.book.max_price_levels, 100_000);
        assert_eq!(cfg.risk.initial_capital, 1_000_000);
        assert_eq!(cfg.risk.daily_loss_limit_pct, 0.02);
    }
}
