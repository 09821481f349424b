//! `SharedConfig` — bidirectional, lock-free config exchange between the
//! trading engine and an external dashboard/tuner process (spec §4.5).
//!
//! The dashboard writes tunable parameters and bumps `sequence`; the engine
//! polls `sequence` on its control loop and re-applies config when it
//! changes. The engine, in turn, publishes its own liveness (heartbeat, pid,
//! status) and a few read-only counters the dashboard displays — those
//! fields are never sequenced, since the dashboard only ever reads them.

use crate::error::{IpcError, IpcResult};
use crate::region::{as_page, as_page_mut, SharedRegion};
use memmap2::{Mmap, MmapMut};
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU8, Ordering};

/// `"HFTCFG\0"` read as a little-endian `u64`.
pub const MAGIC: u64 = 0x4846_5443_4649_4700;
/// Page layout version. Bump whenever a field is added, removed, or resized.
pub const VERSION: u32 = 1;

/// HFT-process lifecycle state published in [`SharedConfig::hft_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProcessStatus {
    /// Not running.
    Stopped = 0,
    /// Initializing.
    Starting = 1,
    /// Fully up.
    Running = 2,
    /// Tearing down.
    ShuttingDown = 3,
}

/// Bidirectional tunable-config and heartbeat page (spec §4.5).
#[repr(C)]
pub struct SharedConfig {
    magic: u64,
    version: u32,
    /// Bumped by the dashboard on every write; the engine diffs against its
    /// own last-seen value to detect changes.
    pub sequence: AtomicU32,

    /// Spread multiplier, x10 fixed point (15 = 1.5x).
    pub spread_multiplier_x10: AtomicI32,
    /// Drawdown halt threshold, x100 fixed point (200 = 2%).
    pub drawdown_threshold_x100: AtomicI32,
    /// Consecutive-loss halt threshold.
    pub loss_streak_threshold: AtomicI32,
    /// Base position size, x100 percent of equity.
    pub base_position_pct_x100: AtomicI32,
    /// Max position size, x100 percent of equity.
    pub max_position_pct_x100: AtomicI32,
    /// Profit target, x100 percent.
    pub target_pct_x100: AtomicI32,
    /// Stop-loss, x100 percent.
    pub stop_pct_x100: AtomicI32,

    /// 0 = auto, 1-5 = force a specific strategy mode.
    pub force_mode: AtomicU8,
    /// 0 = paused, 1 = active.
    pub trading_enabled: AtomicU8,

    /// Engine-reported current mode (dashboard reads, never writes).
    pub active_mode: AtomicU8,
    /// Engine-reported count of currently active signals.
    pub active_signals: AtomicU8,
    /// Engine-reported consecutive-loss count.
    pub consecutive_losses: AtomicI32,
    /// Engine-reported consecutive-win count.
    pub consecutive_wins: AtomicI32,

    /// Engine heartbeat, nanoseconds since the UNIX epoch.
    pub heartbeat_ns: AtomicI64,
    /// Engine process id.
    pub pid: AtomicI32,
    /// Engine lifecycle status ([`ProcessStatus`] as a raw byte).
    pub status: AtomicU8,

    build_hash: [u8; 12],
    _pad: [u8; 1],
}

impl SharedRegion for SharedConfig {
    const SIZE: usize = std::mem::size_of::<Self>();
}

impl SharedConfig {
    /// Zero-and-default-initialize a freshly created page.
    pub fn init(&mut self, build_hash: &str) {
        self.magic = MAGIC;
        self.version = VERSION;
        self.sequence.store(0, Ordering::Relaxed);

        self.spread_multiplier_x10.store(15, Ordering::Relaxed);
        self.drawdown_threshold_x100.store(200, Ordering::Relaxed);
        self.loss_streak_threshold.store(2, Ordering::Relaxed);
        self.base_position_pct_x100.store(200, Ordering::Relaxed);
        self.max_position_pct_x100.store(500, Ordering::Relaxed);
        self.target_pct_x100.store(150, Ordering::Relaxed);
        self.stop_pct_x100.store(100, Ordering::Relaxed);
        self.force_mode.store(0, Ordering::Relaxed);
        self.trading_enabled.store(1, Ordering::Relaxed);

        self.active_mode.store(2, Ordering::Relaxed);
        self.active_signals.store(0, Ordering::Relaxed);
        self.consecutive_losses.store(0, Ordering::Relaxed);
        self.consecutive_wins.store(0, Ordering::Relaxed);

        self.heartbeat_ns.store(0, Ordering::Relaxed);
        self.pid.store(0, Ordering::Relaxed);
        self.status.store(ProcessStatus::Stopped as u8, Ordering::Relaxed);

        let mut hash = [0u8; 12];
        let bytes = build_hash.as_bytes();
        let n = bytes.len().min(11);
        hash[..n].copy_from_slice(&bytes[..n]);
        self.build_hash = hash;
    }

    /// True if the page's header matches this build's expected layout.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.magic == MAGIC && self.version == VERSION
    }

    /// Git build hash recorded at `init`, or empty if unset.
    #[must_use]
    pub fn build_hash(&self) -> &str {
        let end = self.build_hash.iter().position(|&b| b == 0).unwrap_or(self.build_hash.len());
        std::str::from_utf8(&self.build_hash[..end]).unwrap_or("")
    }

    /// Spread multiplier as a float.
    #[must_use]
    pub fn spread_multiplier(&self) -> f64 {
        f64::from(self.spread_multiplier_x10.load(Ordering::Relaxed)) / 10.0
    }

    /// Drawdown halt threshold as a fraction (0.02 = 2%).
    #[must_use]
    pub fn drawdown_threshold(&self) -> f64 {
        f64::from(self.drawdown_threshold_x100.load(Ordering::Relaxed)) / 100.0
    }

    /// Dashboard-side setter: store the spread multiplier and bump `sequence`.
    pub fn set_spread_multiplier(&self, val: f64) {
        self.spread_multiplier_x10.store((val * 10.0) as i32, Ordering::Relaxed);
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Dashboard-side setter: store the drawdown threshold and bump `sequence`.
    pub fn set_drawdown_threshold(&self, val: f64) {
        self.drawdown_threshold_x100.store((val * 100.0) as i32, Ordering::Relaxed);
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Dashboard-side setter: pause/resume trading and bump `sequence`.
    pub fn set_trading_enabled(&self, enabled: bool) {
        self.trading_enabled.store(u8::from(enabled), Ordering::Relaxed);
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Whether trading is currently enabled.
    #[must_use]
    pub fn trading_enabled(&self) -> bool {
        self.trading_enabled.load(Ordering::Relaxed) != 0
    }

    /// Engine-side: refresh the heartbeat to `now_ns`.
    pub fn update_heartbeat(&self, now_ns: i64) {
        self.heartbeat_ns.store(now_ns, Ordering::Relaxed);
    }

    /// True if the engine's heartbeat is within `timeout_ns` of `now_ns`.
    #[must_use]
    pub fn is_hft_alive(&self, now_ns: i64, timeout_ns: i64) -> bool {
        let last = self.heartbeat_ns.load(Ordering::Relaxed);
        now_ns.saturating_sub(last) < timeout_ns
    }

    /// Map (creating if absent) and initialize the page with `build_hash`.
    ///
    /// # Errors
    /// Propagates I/O failures from the backing region.
    pub fn create(name: &str, build_hash: &str) -> IpcResult<MmapMut> {
        let mut mmap = <Self as SharedRegion>::create(name)?;
        // SAFETY: the page was just allocated at `Self::SIZE` bytes by `create`.
        let page = unsafe { as_page_mut::<Self>(&mut mmap) };
        page.init(build_hash);
        Ok(mmap)
    }

    /// Map an existing page read-only and validate its header.
    ///
    /// # Errors
    /// I/O failure, or [`IpcError::HeaderMismatch`] if the header doesn't
    /// match this build's magic/version.
    pub fn open_ro(name: &str) -> IpcResult<Mmap> {
        let mmap = <Self as SharedRegion>::open_ro(name)?;
        // SAFETY: size checked by `debug_assert!` in `as_page`; validity
        // checked explicitly below before the mapping is trusted.
        if !unsafe { as_page::<Self>(&mmap) }.is_valid() {
            return Err(IpcError::HeaderMismatch { page: "SharedConfig" });
        }
        Ok(mmap)
    }

    /// Map an existing page read-write and validate its header.
    ///
    /// # Errors
    /// Same as [`Self::open_ro`].
    pub fn open_rw(name: &str) -> IpcResult<MmapMut> {
        let mut mmap = <Self as SharedRegion>::open_rw(name)?;
        // SAFETY: size checked by `debug_assert!` in `as_page_mut`; validity
        // checked explicitly below before the mapping is trusted.
        if !unsafe { as_page_mut::<Self>(&mut mmap) }.is_valid() {
            return Err(IpcError::HeaderMismatch { page: "SharedConfig" });
        }
        Ok(mmap)
    }
}

/// Borrow a page out of a read-only mapping validated by [`SharedConfig::open_ro`].
///
/// # Safety
/// `mmap` must have been produced by [`SharedConfig::create`] or validated by
/// [`SharedConfig::open_ro`]/[`SharedConfig::open_rw`].
#[must_use]
pub unsafe fn view(mmap: &Mmap) -> &SharedConfig {
    unsafe { as_page::<SharedConfig>(mmap) }
}

/// Borrow a page out of a read-write mapping. See [`view`] for safety.
///
/// # Safety
/// Same preconditions as [`view`].
#[must_use]
pub unsafe fn view_mut(mmap: &mut MmapMut) -> &mut SharedConfig {
    unsafe { as_page_mut::<SharedConfig>(mmap) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_sets_magic_version_and_defaults() {
        let name = format!("/ipc_shared_config_test_{}", std::process::id());
        let mut mmap = SharedConfig::create(&name, "deadbeef").expect("create");
        // SAFETY: freshly created and initialized above.
        let cfg = unsafe { view_mut(&mut mmap) };
        assert!(cfg.is_valid());
        assert_eq!(cfg.build_hash(), "deadbeef");
        assert!((cfg.spread_multiplier() - 1.5).abs() < 1e-9);
        assert!(cfg.trading_enabled());

        cfg.set_trading_enabled(false);
        assert!(!cfg.trading_enabled());
        assert_eq!(cfg.sequence.load(Ordering::Relaxed), 1);

        SharedConfig::unlink(&name).expect("unlink");
    }

    #[test]
    fn heartbeat_liveness_window() {
        let name = format!("/ipc_shared_config_test_hb_{}", std::process::id());
        let mut mmap = SharedConfig::create(&name, "deadbeef").expect("create");
        // SAFETY: freshly created and initialized above.
        let cfg = unsafe { view_mut(&mut mmap) };
        cfg.update_heartbeat(1_000_000_000);
        assert!(cfg.is_hft_alive(1_000_000_000 + 4_000_000_000, 5_000_000_000));
        assert!(!cfg.is_hft_alive(1_000_000_000 + 6_000_000_000, 5_000_000_000));

        SharedConfig::unlink(&name).expect("unlink");
    }
}
