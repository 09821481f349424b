//! `SharedPaperConfig` — runtime-tunable knobs for the paper exchange
//! simulator (adverse slippage, simulated latency, fill probability), exposed
//! the same way [`crate::shared_config::SharedConfig`] exposes engine
//! tuning, so a dashboard can dial in realism without restarting the sim
//! (spec §4.3, §4.5).

use crate::error::{IpcError, IpcResult};
use crate::region::{as_page, as_page_mut, SharedRegion};
use memmap2::{Mmap, MmapMut};
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};

/// `"HFTPAPR\0"` read as a little-endian `u64`.
pub const MAGIC: u64 = 0x4846_5450_4150_5200;
/// Page layout version.
pub const VERSION: u32 = 1;

/// Tunable parameters for the paper-exchange fill simulator.
#[repr(C)]
pub struct SharedPaperConfig {
    magic: u64,
    version: u32,
    /// Bumped on every write.
    pub sequence: AtomicU32,

    /// Adverse slippage applied to fills, x10 basis points (50 = 5.0bps).
    pub slippage_bps_x10: AtomicI32,
    /// Commission rate, parts-per-million of notional (1000 = 0.1%).
    pub commission_ppm: AtomicI32,
    /// Simulated exchange-roundtrip latency, nanoseconds.
    pub sim_latency_ns: AtomicU64,
    /// Probability (x1000) that a resting limit order fills once crossed,
    /// for the probabilistic queue-position fill model.
    pub fill_probability_x1000: AtomicU32,
}

impl SharedRegion for SharedPaperConfig {
    const SIZE: usize = std::mem::size_of::<Self>();
}

impl SharedPaperConfig {
    /// Zero-and-default-initialize a freshly created page.
    pub fn init(&mut self) {
        self.magic = MAGIC;
        self.version = VERSION;
        self.sequence.store(0, Ordering::Relaxed);
        self.slippage_bps_x10.store(50, Ordering::Relaxed);
        self.commission_ppm.store(1_000, Ordering::Relaxed);
        self.sim_latency_ns.store(0, Ordering::Relaxed);
        self.fill_probability_x1000.store(1_000, Ordering::Relaxed);
    }

    /// True if the page's header matches this build's expected layout.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.magic == MAGIC && self.version == VERSION
    }

    /// Adverse slippage in basis points.
    #[must_use]
    pub fn slippage_bps(&self) -> f64 {
        f64::from(self.slippage_bps_x10.load(Ordering::Relaxed)) / 10.0
    }

    /// Commission rate as a fraction of notional.
    #[must_use]
    pub fn commission_rate(&self) -> f64 {
        f64::from(self.commission_ppm.load(Ordering::Relaxed)) / 1_000_000.0
    }

    /// Fill probability in `[0.0, 1.0]`.
    #[must_use]
    pub fn fill_probability(&self) -> f64 {
        f64::from(self.fill_probability_x1000.load(Ordering::Relaxed)) / 1000.0
    }

    /// Dashboard-side setter for slippage.
    pub fn set_slippage_bps(&self, val: f64) {
        self.slippage_bps_x10.store((val * 10.0) as i32, Ordering::Relaxed);
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Dashboard-side setter for fill probability.
    pub fn set_fill_probability(&self, val: f64) {
        self.fill_probability_x1000.store((val.clamp(0.0, 1.0) * 1000.0) as u32, Ordering::Relaxed);
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Map (creating if absent) and default-initialize the page.
    ///
    /// # Errors
    /// Propagates I/O failures from the backing region.
    pub fn create(name: &str) -> IpcResult<MmapMut> {
        let mut mmap = <Self as SharedRegion>::create(name)?;
        // SAFETY: freshly allocated at `Self::SIZE` bytes by `create`.
        unsafe { as_page_mut::<Self>(&mut mmap) }.init();
        Ok(mmap)
    }

    /// Map an existing page read-only and validate its header.
    ///
    /// # Errors
    /// I/O failure, or [`IpcError::HeaderMismatch`] on header mismatch.
    pub fn open_ro(name: &str) -> IpcResult<Mmap> {
        let mmap = <Self as SharedRegion>::open_ro(name)?;
        if !unsafe { as_page::<Self>(&mmap) }.is_valid() {
            return Err(IpcError::HeaderMismatch { page: "SharedPaperConfig" });
        }
        Ok(mmap)
    }

    /// Map an existing page read-write and validate its header.
    ///
    /// # Errors
    /// Same as [`Self::open_ro`].
    pub fn open_rw(name: &str) -> IpcResult<MmapMut> {
        let mut mmap = <Self as SharedRegion>::open_rw(name)?;
        if !unsafe { as_page_mut::<Self>(&mut mmap) }.is_valid() {
            return Err(IpcError::HeaderMismatch { page: "SharedPaperConfig" });
        }
        Ok(mmap)
    }
}

/// Borrow a page out of a read-only mapping validated by [`SharedPaperConfig::open_ro`].
///
/// # Safety
/// `mmap` must have been produced or validated by one of `SharedPaperConfig`'s
/// constructors.
#[must_use]
pub unsafe fn view(mmap: &Mmap) -> &SharedPaperConfig {
    unsafe { as_page::<SharedPaperConfig>(mmap) }
}

/// Borrow a page out of a read-write mapping. See [`view`] for safety.
///
/// # Safety
/// Same preconditions as [`view`].
#[must_use]
pub unsafe fn view_mut(mmap: &mut MmapMut) -> &mut SharedPaperConfig {
    unsafe { as_page_mut::<SharedPaperConfig>(mmap) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_paper_exchange_config() {
        let name = format!("/ipc_paper_config_test_{}", std::process::id());
        let mut mmap = SharedPaperConfig::create(&name).expect("create");
        // SAFETY: freshly created and initialized above.
        let cfg = unsafe { view_mut(&mut mmap) };
        assert!(cfg.is_valid());
        assert!((cfg.slippage_bps() - 5.0).abs() < 1e-9);
        assert!((cfg.commission_rate() - 0.001).abs() < 1e-9);
        assert!((cfg.fill_probability() - 1.0).abs() < 1e-9);

        cfg.set_fill_probability(0.75);
        assert!((cfg.fill_probability() - 0.75).abs() < 1e-9);
        assert_eq!(cfg.sequence.load(Ordering::Relaxed), 1);

        SharedPaperConfig::unlink(&name).expect("unlink");
    }
}
