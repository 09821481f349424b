//! `SharedSymbolConfigs` — per-symbol tuning parameters an external AI/rule
//! tuner writes and the engine reads on its control loop (spec §4.5).
//!
//! `get_or_create` below reproduces the original's load-count /
//! linear-scan / store-count publish sequence verbatim rather than "fixing"
//! it with a two-phase publish: two concurrent tuners racing to create the
//! same new symbol can both initialize `symbols[count]` and then both store
//! `count + 1`, losing one initialization. This is documented as tolerated
//! (see DESIGN.md) because in practice exactly one process ever writes this
//! page — the HFT engine only reads it.

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU8, Ordering};

use crate::region::{as_page, as_page_mut, SharedRegion};
use memmap2::{Mmap, MmapMut};

/// Symbol name field width, including the null terminator.
pub const SYMBOL_NAME_LEN: usize = 16;
/// Maximum number of symbols this page can hold.
pub const MAX_TUNED_SYMBOLS: usize = 32;

/// `"SYMCFG\0"` read as a little-endian `u64`.
pub const MAGIC: u64 = 0x0053_594D_4346_4700;
/// Page layout version.
pub const VERSION: u32 = 1;

/// Per-symbol tuning parameters, 96 bytes, binary-compatible with the
/// tuner's own wire format.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SymbolTuningConfig {
    symbol: [u8; SYMBOL_NAME_LEN],
    /// 0 = skip this symbol, 1 = trade it.
    pub enabled: u8,
    /// 0 = auto, 1-5 = force a specific regime.
    pub regime_override: u8,
    /// Max EMA deviation in a trending regime, x100 (1% = 100).
    pub ema_dev_trending_x100: i16,
    /// Max EMA deviation in a ranging regime, x100.
    pub ema_dev_ranging_x100: i16,
    /// Max EMA deviation in a high-volatility regime, x100.
    pub ema_dev_highvol_x100: i16,
    /// Base position size, x100 percent of capital.
    pub base_position_x100: i16,
    /// Max position size, x100 percent of capital.
    pub max_position_x100: i16,
    /// Cooldown between trades, milliseconds.
    pub cooldown_ms: i16,
    /// Minimum signal strength required to trade (1=Medium, 2=Strong).
    pub signal_strength: i8,
    _reserved1: i8,
    /// Profit target, x100 percent.
    pub target_pct_x100: i16,
    /// Stop loss, x100 percent.
    pub stop_pct_x100: i16,
    /// Trend-exit pullback threshold, x100 percent.
    pub pullback_pct_x100: i16,
    /// Expected slippage for this symbol, x100 basis points.
    pub slippage_bps_x100: i16,
    /// Commission rate for this symbol, x10000.
    pub commission_x10000: i16,
    /// 0=Auto, 1=MarketOnly, 2=LimitOnly, 3=Adaptive.
    pub order_type_preference: u8,
    /// Bitflags: which global defaults this symbol still inherits.
    pub use_global_flags: u8,
    /// Limit price offset from mid, x100 basis points.
    pub limit_offset_bps_x100: i16,
    /// Adaptive mode: time before converting a resting limit to a market order.
    pub limit_timeout_ms: i16,
    /// Total trades recorded for this symbol.
    pub total_trades: i32,
    /// Winning trades recorded for this symbol.
    pub winning_trades: i32,
    /// Cumulative P&L, cents.
    pub total_pnl_x100: i64,
    /// Timestamp of the last tuner update, nanoseconds.
    pub last_update_ns: i64,
    _reserved: [u8; 24],
}

const _: () = assert!(std::mem::size_of::<SymbolTuningConfig>() == 96);

impl SymbolTuningConfig {
    fn init(&mut self, symbol: &str) {
        *self = Self::zeroed();
        self.set_symbol(symbol);
        self.slippage_bps_x100 = 50;
        self.commission_x10000 = 10;
        self.target_pct_x100 = 150;
        self.stop_pct_x100 = 100;
        self.pullback_pct_x100 = 50;
        self.base_position_x100 = 200;
        self.max_position_x100 = 500;
        self.ema_dev_trending_x100 = 100;
        self.ema_dev_ranging_x100 = 50;
        self.ema_dev_highvol_x100 = 200;
        self.cooldown_ms = 500;
        self.signal_strength = 1;
        self.order_type_preference = 0;
        self.limit_offset_bps_x100 = 200;
        self.limit_timeout_ms = 2_000;
        self.enabled = 1;
        self.use_global_flags = 0x0F;
    }

    const fn zeroed() -> Self {
        Self {
            symbol: [0; SYMBOL_NAME_LEN],
            enabled: 0,
            regime_override: 0,
            ema_dev_trending_x100: 0,
            ema_dev_ranging_x100: 0,
            ema_dev_highvol_x100: 0,
            base_position_x100: 0,
            max_position_x100: 0,
            cooldown_ms: 0,
            signal_strength: 0,
            _reserved1: 0,
            target_pct_x100: 0,
            stop_pct_x100: 0,
            pullback_pct_x100: 0,
            slippage_bps_x100: 0,
            commission_x10000: 0,
            order_type_preference: 0,
            use_global_flags: 0,
            limit_offset_bps_x100: 0,
            limit_timeout_ms: 0,
            total_trades: 0,
            winning_trades: 0,
            total_pnl_x100: 0,
            last_update_ns: 0,
            _reserved: [0; 24],
        }
    }

    fn set_symbol(&mut self, symbol: &str) {
        let mut buf = [0u8; SYMBOL_NAME_LEN];
        let bytes = symbol.as_bytes();
        let n = bytes.len().min(SYMBOL_NAME_LEN - 1);
        buf[..n].copy_from_slice(&bytes[..n]);
        self.symbol = buf;
    }

    /// Symbol name this record belongs to.
    #[must_use]
    pub fn symbol(&self) -> &str {
        let end = self.symbol.iter().position(|&b| b == 0).unwrap_or(self.symbol.len());
        std::str::from_utf8(&self.symbol[..end]).unwrap_or("")
    }

    fn matches(&self, symbol: &str) -> bool {
        self.symbol() == symbol
    }

    /// Win rate as a percentage, `0` if no trades recorded yet.
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.total_trades > 0 {
            100.0 * f64::from(self.winning_trades) / f64::from(self.total_trades)
        } else {
            0.0
        }
    }
}

/// Shared per-symbol tuning page: HFT reads, an external tuner writes.
#[repr(C)]
pub struct SharedSymbolConfigs {
    magic: u64,
    version: u32,
    /// Bumped on every config change.
    pub sequence: AtomicU32,
    /// Bumped on every new symbol registered.
    pub symbol_count: AtomicU32,
    symbols: [SymbolTuningConfig; MAX_TUNED_SYMBOLS],
    /// Last time the tuner wrote anything, nanoseconds.
    pub last_tune_ns: AtomicI64,
    /// Total tuning operations applied.
    pub tune_count: AtomicU32,
    /// Whether the tuner process is currently connected.
    pub tuner_connected: AtomicU8,
}

impl SharedRegion for SharedSymbolConfigs {
    const SIZE: usize = std::mem::size_of::<Self>();
}

impl SharedSymbolConfigs {
    /// Zero-and-default-initialize a freshly created page.
    pub fn init(&mut self) {
        self.magic = MAGIC;
        self.version = VERSION;
        self.sequence.store(0, Ordering::Relaxed);
        self.symbol_count.store(0, Ordering::Relaxed);
        self.symbols = [SymbolTuningConfig::zeroed(); MAX_TUNED_SYMBOLS];
        self.last_tune_ns.store(0, Ordering::Relaxed);
        self.tune_count.store(0, Ordering::Relaxed);
        self.tuner_connected.store(0, Ordering::Relaxed);
    }

    /// True if the page's header matches this build's expected layout.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.magic == MAGIC && self.version == VERSION
    }

    /// Find an existing symbol's config, or register a fresh one with
    /// defaults if there's room. Returns `None` once `MAX_TUNED_SYMBOLS` is
    /// reached.
    pub fn get_or_create(&mut self, symbol: &str) -> Option<&mut SymbolTuningConfig> {
        let count = self.symbol_count.load(Ordering::Relaxed) as usize;
        if let Some(i) = (0..count).find(|&i| self.symbols[i].matches(symbol)) {
            return Some(&mut self.symbols[i]);
        }
        if count < MAX_TUNED_SYMBOLS {
            self.symbols[count].init(symbol);
            self.symbol_count.store(count as u32 + 1, Ordering::Relaxed);
            self.sequence.fetch_add(1, Ordering::Release);
            return Some(&mut self.symbols[count]);
        }
        None
    }

    /// Read-only lookup of an existing symbol's config.
    #[must_use]
    pub fn find(&self, symbol: &str) -> Option<&SymbolTuningConfig> {
        let count = self.symbol_count.load(Ordering::Relaxed) as usize;
        (0..count).map(|i| &self.symbols[i]).find(|cfg| cfg.matches(symbol))
    }

    /// Apply a tuner-supplied config to `symbol`, preserving the running
    /// performance counters (`total_trades`, `winning_trades`,
    /// `total_pnl_x100`) across the overwrite.
    pub fn update(&mut self, symbol: &str, mut new_config: SymbolTuningConfig, now_ns: i64) -> bool {
        let Some(existing) = self.get_or_create(symbol) else { return false };
        new_config.total_trades = existing.total_trades;
        new_config.winning_trades = existing.winning_trades;
        new_config.total_pnl_x100 = existing.total_pnl_x100;
        new_config.last_update_ns = now_ns;
        *existing = new_config;
        self.sequence.fetch_add(1, Ordering::Release);
        true
    }

    /// Record a trade outcome against `symbol`'s running statistics.
    pub fn record_trade(&mut self, symbol: &str, win: bool, pnl: f64) {
        if let Some(cfg) = self.get_or_create(symbol) {
            cfg.total_trades += 1;
            if win {
                cfg.winning_trades += 1;
            }
            cfg.total_pnl_x100 += (pnl * 100.0) as i64;
        }
    }

    /// Map (creating if absent) and default-initialize the page.
    ///
    /// # Errors
    /// Propagates I/O failures from the backing region.
    pub fn create(name: &str) -> std::io::Result<MmapMut> {
        let mut mmap = <Self as SharedRegion>::create(name)?;
        // SAFETY: freshly allocated at `Self::SIZE` bytes by `create`.
        unsafe { as_page_mut::<Self>(&mut mmap) }.init();
        Ok(mmap)
    }

    /// Map an existing page read-only and validate its header.
    ///
    /// # Errors
    /// I/O failure, or [`std::io::ErrorKind::InvalidData`] on header mismatch.
    pub fn open_ro(name: &str) -> std::io::Result<Mmap> {
        let mmap = <Self as SharedRegion>::open_ro(name)?;
        if !unsafe { as_page::<Self>(&mmap) }.is_valid() {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "SharedSymbolConfigs header mismatch"));
        }
        Ok(mmap)
    }

    /// Map an existing page read-write and validate its header.
    ///
    /// # Errors
    /// Same as [`Self::open_ro`].
    pub fn open_rw(name: &str) -> std::io::Result<MmapMut> {
        let mut mmap = <Self as SharedRegion>::open_rw(name)?;
        if !unsafe { as_page_mut::<Self>(&mut mmap) }.is_valid() {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "SharedSymbolConfigs header mismatch"));
        }
        Ok(mmap)
    }
}

/// Borrow a page out of a read-only mapping validated by [`SharedSymbolConfigs::open_ro`].
///
/// # Safety
/// `mmap` must have been produced or validated by one of `SharedSymbolConfigs`'s
/// constructors.
#[must_use]
pub unsafe fn view(mmap: &Mmap) -> &SharedSymbolConfigs {
    unsafe { as_page::<SharedSymbolConfigs>(mmap) }
}

/// Borrow a page out of a read-write mapping. See [`view`] for safety.
///
/// # Safety
/// Same preconditions as [`view`].
#[must_use]
pub unsafe fn view_mut(mmap: &mut MmapMut) -> &mut SharedSymbolConfigs {
    unsafe { as_page_mut::<SharedSymbolConfigs>(mmap) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_registers_then_reuses() {
        let name = format!("/ipc_symbol_configs_test_{}", std::process::id());
        let mut mmap = SharedSymbolConfigs::create(&name).expect("create");
        // SAFETY: freshly created and initialized above.
        let page = unsafe { view_mut(&mut mmap) };

        let cfg = page.get_or_create("BTCUSDT").expect("room for first symbol");
        assert_eq!(cfg.symbol(), "BTCUSDT");
        assert_eq!(cfg.enabled, 1);
        assert_eq!(page.symbol_count.load(Ordering::Relaxed), 1);

        let again = page.get_or_create("BTCUSDT").expect("existing symbol reused");
        assert_eq!(again.symbol(), "BTCUSDT");
        assert_eq!(page.symbol_count.load(Ordering::Relaxed), 1);

        SharedSymbolConfigs::unlink(&name).expect("unlink");
    }

    #[test]
    fn update_preserves_performance_counters() {
        let name = format!("/ipc_symbol_configs_test_update_{}", std::process::id());
        let mut mmap = SharedSymbolConfigs::create(&name).expect("create");
        // SAFETY: freshly created and initialized above.
        let page = unsafe { view_mut(&mut mmap) };

        page.record_trade("ETHUSDT", true, 12.5);
        page.record_trade("ETHUSDT", false, -3.0);

        let mut replacement = *page.find("ETHUSDT").unwrap();
        replacement.enabled = 0;
        page.update("ETHUSDT", replacement, 42);

        let updated = page.find("ETHUSDT").unwrap();
        assert_eq!(updated.enabled, 0);
        assert_eq!(updated.total_trades, 2);
        assert_eq!(updated.winning_trades, 1);
        assert_eq!(updated.last_update_ns, 42);

        SharedSymbolConfigs::unlink(&name).expect("unlink");
    }

    #[test]
    fn rejects_past_capacity() {
        let name = format!("/ipc_symbol_configs_test_full_{}", std::process::id());
        let mut mmap = SharedSymbolConfigs::create(&name).expect("create");
        // SAFETY: freshly created and initialized above.
        let page = unsafe { view_mut(&mut mmap) };
        for i in 0..MAX_TUNED_SYMBOLS {
            assert!(page.get_or_create(&format!("SYM{i}")).is_some());
        }
        assert!(page.get_or_create("OVERFLOW").is_none());

        SharedSymbolConfigs::unlink(&name).expect("unlink");
    }
}
