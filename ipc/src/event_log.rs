//! `SharedEventLog` — a lock-free, multi-writer ring buffer of
//! [`TunerEvent`](crate::tuner_event::TunerEvent) records shared across every
//! HFT process (engine, AI tuner, dashboard, web API) for audit logging and
//! analytics (spec §4.5).
//!
//! `log` assigns each event a monotonic sequence via `write_pos.fetch_add`
//! and writes it into `events[pos % RING_SIZE]`; readers re-check the
//! stored event's own `sequence` field against the sequence they expected
//! before trusting it, tolerating the write not being atomic (spec §8's
//! event-log resynchronization law — a slot can be mid-overwrite when read,
//! and the mismatch is how a reader detects that and discards the record
//! rather than trusting torn bytes).

use std::sync::atomic::{AtomicI64, AtomicI8, AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::region::{as_page, as_page_mut, SharedRegion};
use crate::tuner_event::{EVENT_SYMBOL_LEN, TunerEvent, TunerEventType};
use memmap2::{Mmap, MmapMut};

/// Number of slots in the ring buffer (power of two for fast masking).
pub const RING_SIZE: usize = 16_384;
/// Maximum distinct symbols tracked in [`SymbolEventStats`].
pub const MAX_SYMBOLS: usize = 32;

/// `"EVTLOG\0"` read as a little-endian `u64`.
pub const MAGIC: u64 = 0x0045_5654_4C4F_4700;
/// Page layout version.
pub const VERSION: u32 = 1;

fn now_ns() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0)
}

fn pack_symbol(s: &str) -> [u8; EVENT_SYMBOL_LEN] {
    let mut buf = [0u8; EVENT_SYMBOL_LEN];
    let bytes = s.as_bytes();
    let n = bytes.len().min(EVENT_SYMBOL_LEN - 1);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

fn unpack_symbol(buf: &[u8]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end]).unwrap_or("")
}

/// Running per-symbol counters for quick dashboard lookup.
#[repr(C)]
pub struct SymbolEventStats {
    symbol: [u8; EVENT_SYMBOL_LEN],
    /// Signals generated for this symbol.
    pub signal_count: AtomicU32,
    /// Orders placed.
    pub order_count: AtomicU32,
    /// Fills received.
    pub fill_count: AtomicU32,
    /// Cancels processed.
    pub cancel_count: AtomicU32,
    /// Cumulative P&L, cents.
    pub total_pnl_x100: AtomicI64,
    /// Session P&L, cents (reset at the start of each trading day).
    pub session_pnl_x100: AtomicI64,
    /// Winning trades.
    pub winning_trades: AtomicU32,
    /// Losing trades.
    pub losing_trades: AtomicU32,
    /// Config changes applied by the tuner.
    pub config_changes: AtomicU32,
    /// Times trading was paused for this symbol.
    pub pause_count: AtomicU32,
    /// Emergency exits triggered.
    pub emergency_exits: AtomicU32,
    /// Timestamp of the last signal.
    pub last_signal_ns: AtomicU64,
    /// Timestamp of the last fill.
    pub last_fill_ns: AtomicU64,
    /// Timestamp of the last config change.
    pub last_config_ns: AtomicU64,
    /// Current market regime (tuner-assigned code).
    pub current_regime: AtomicI8,
    /// Nonzero if trading is currently paused for this symbol.
    pub is_paused: AtomicI8,
    /// Nonzero if an open position exists.
    pub has_position: AtomicI8,
    _reserved: AtomicI8,
}

impl SymbolEventStats {
    fn init(&mut self, symbol: &str) {
        self.symbol = pack_symbol(symbol);
        self.signal_count.store(0, Ordering::Relaxed);
        self.order_count.store(0, Ordering::Relaxed);
        self.fill_count.store(0, Ordering::Relaxed);
        self.cancel_count.store(0, Ordering::Relaxed);
        self.total_pnl_x100.store(0, Ordering::Relaxed);
        self.session_pnl_x100.store(0, Ordering::Relaxed);
        self.winning_trades.store(0, Ordering::Relaxed);
        self.losing_trades.store(0, Ordering::Relaxed);
        self.config_changes.store(0, Ordering::Relaxed);
        self.pause_count.store(0, Ordering::Relaxed);
        self.emergency_exits.store(0, Ordering::Relaxed);
        self.last_signal_ns.store(0, Ordering::Relaxed);
        self.last_fill_ns.store(0, Ordering::Relaxed);
        self.last_config_ns.store(0, Ordering::Relaxed);
        self.current_regime.store(0, Ordering::Relaxed);
        self.is_paused.store(0, Ordering::Relaxed);
        self.has_position.store(0, Ordering::Relaxed);
    }

    fn matches(&self, symbol: &str) -> bool {
        self.symbol() == symbol
    }

    fn is_empty(&self) -> bool {
        self.symbol[0] == 0
    }

    /// Symbol this record tracks.
    #[must_use]
    pub fn symbol(&self) -> &str {
        unpack_symbol(&self.symbol)
    }

    /// Win rate as a percentage.
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        let wins = self.winning_trades.load(Ordering::Relaxed);
        let losses = self.losing_trades.load(Ordering::Relaxed);
        let total = wins + losses;
        if total > 0 {
            100.0 * f64::from(wins) / f64::from(total)
        } else {
            0.0
        }
    }

    /// Cumulative P&L in dollars.
    #[must_use]
    pub fn total_pnl(&self) -> f64 {
        self.total_pnl_x100.load(Ordering::Relaxed) as f64 / 100.0
    }

    /// Reset the session P&L counter (call at the start of a trading day).
    pub fn reset_session(&self) {
        self.session_pnl_x100.store(0, Ordering::Relaxed);
    }
}

/// Global AI-tuner performance counters.
#[repr(C)]
pub struct TunerStats {
    /// Total AI tuning calls made.
    pub total_decisions: AtomicU32,
    /// Config changes applied.
    pub config_changes: AtomicU32,
    /// Symbols paused by the tuner.
    pub pauses_triggered: AtomicU32,
    /// Emergency exits triggered by the tuner.
    pub emergency_exits: AtomicU32,
    /// Tuning calls skipped (rate-limited).
    pub skipped_calls: AtomicU32,
    /// Sum of API call latencies, milliseconds.
    pub total_latency_ms: AtomicU64,
    /// Total input tokens consumed.
    pub total_tokens_in: AtomicU64,
    /// Total output tokens produced.
    pub total_tokens_out: AtomicU64,
    /// Total estimated API cost, cents.
    pub total_cost_x100: AtomicI64,
    /// Timestamp of the last AI call.
    pub last_decision_ns: AtomicU64,
    /// Timestamp of the last tuning trigger.
    pub last_trigger_ns: AtomicU64,
    /// Portfolio P&L snapshot at the last tuning pass, cents.
    pub pnl_before_tuning_x100: AtomicI64,
    /// P&L improvement since the last tuning pass, cents.
    pub pnl_improvement_x100: AtomicI64,
}

impl TunerStats {
    fn init(&mut self) {
        self.total_decisions.store(0, Ordering::Relaxed);
        self.config_changes.store(0, Ordering::Relaxed);
        self.pauses_triggered.store(0, Ordering::Relaxed);
        self.emergency_exits.store(0, Ordering::Relaxed);
        self.skipped_calls.store(0, Ordering::Relaxed);
        self.total_latency_ms.store(0, Ordering::Relaxed);
        self.total_tokens_in.store(0, Ordering::Relaxed);
        self.total_tokens_out.store(0, Ordering::Relaxed);
        self.total_cost_x100.store(0, Ordering::Relaxed);
        self.last_decision_ns.store(0, Ordering::Relaxed);
        self.last_trigger_ns.store(0, Ordering::Relaxed);
        self.pnl_before_tuning_x100.store(0, Ordering::Relaxed);
        self.pnl_improvement_x100.store(0, Ordering::Relaxed);
    }

    /// Average AI call latency, milliseconds.
    #[must_use]
    pub fn avg_latency_ms(&self) -> f64 {
        let decisions = self.total_decisions.load(Ordering::Relaxed);
        if decisions > 0 {
            self.total_latency_ms.load(Ordering::Relaxed) as f64 / f64::from(decisions)
        } else {
            0.0
        }
    }
}

/// Shared audit-log page: ring buffer of events plus rollup stats.
#[repr(C)]
pub struct SharedEventLog {
    magic: u64,
    version: u32,
    ring_size: u32,
    /// Next write position; never wraps (always increasing).
    pub write_pos: AtomicU64,
    /// Total events ever written.
    pub total_events: AtomicU64,
    events: [TunerEvent; RING_SIZE],
    /// Number of distinct symbols registered in `symbol_stats`.
    pub symbol_count: AtomicU32,
    symbol_stats: [SymbolEventStats; MAX_SYMBOLS],
    /// Global tuner performance counters.
    pub tuner_stats: TunerStats,
    /// Start of the current trading session, nanoseconds.
    pub session_start_ns: AtomicU64,
    /// Session P&L, cents.
    pub session_pnl_x100: AtomicI64,
}

impl SharedRegion for SharedEventLog {
    const SIZE: usize = std::mem::size_of::<Self>();
}

impl SharedEventLog {
    /// Initialize header fields. The ring buffer and per-symbol stats rely
    /// on the backing page already being zero-filled by the OS on first
    /// creation (a zero `TunerEvent`/`SymbolEventStats` slot reads as
    /// empty) rather than being explicitly re-zeroed here.
    pub fn init(&mut self) {
        self.magic = MAGIC;
        self.version = VERSION;
        self.ring_size = RING_SIZE as u32;
        self.write_pos.store(0, Ordering::Relaxed);
        self.total_events.store(0, Ordering::Relaxed);
        self.symbol_count.store(0, Ordering::Relaxed);
        self.session_start_ns.store(now_ns(), Ordering::Relaxed);
        self.session_pnl_x100.store(0, Ordering::Relaxed);
        self.tuner_stats.init();
    }

    /// True if the page's header matches this build's expected layout.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.magic == MAGIC && self.version == VERSION
    }

    /// Append an event, lock-free and safe for multiple concurrent writers.
    /// Assigns the event its sequence number and updates rollup stats.
    pub fn log(&mut self, mut event: TunerEvent) {
        let pos = self.write_pos.fetch_add(1, Ordering::AcqRel);
        event.set_sequence(pos as u32);
        let idx = (pos as usize) & (RING_SIZE - 1);
        self.events[idx] = event;
        self.total_events.fetch_add(1, Ordering::Relaxed);
        self.update_stats(&event);
    }

    /// Look up the event at `seq`, or `None` if it has since been
    /// overwritten by ring-buffer wraparound or a write was observed
    /// mid-flight.
    #[must_use]
    pub fn get_event(&self, seq: u64) -> Option<TunerEvent> {
        let current = self.write_pos.load(Ordering::Acquire);
        if seq >= current || current - seq > RING_SIZE as u64 {
            return None;
        }
        let idx = (seq as usize) & (RING_SIZE - 1);
        let event = self.events[idx];
        if u64::from(event.sequence()) != seq {
            return None;
        }
        Some(event)
    }

    /// Collect every recoverable event with sequence `>= since_seq`, oldest
    /// first, bounded by `max_count`.
    #[must_use]
    pub fn events_since(&self, since_seq: u64, max_count: usize) -> Vec<TunerEvent> {
        let current = self.write_pos.load(Ordering::Acquire);
        if since_seq >= current {
            return Vec::new();
        }
        let start = current.saturating_sub(RING_SIZE as u64).max(since_seq);
        (start..current).filter_map(|seq| self.get_event(seq)).take(max_count).collect()
    }

    /// Collect every recoverable event for `symbol` still in the buffer.
    #[must_use]
    pub fn symbol_events(&self, symbol: &str, max_count: usize) -> Vec<TunerEvent> {
        let current = self.write_pos.load(Ordering::Acquire);
        let start = current.saturating_sub(RING_SIZE as u64);
        (start..current)
            .filter_map(|seq| self.get_event(seq))
            .filter(|e| e.symbol() == symbol)
            .take(max_count)
            .collect()
    }

    /// Current write position, for readers polling for new events.
    #[must_use]
    pub fn current_position(&self) -> u64 {
        self.write_pos.load(Ordering::Acquire)
    }

    /// Find or register per-symbol stats for `symbol`.
    pub fn get_or_create_symbol_stats(&mut self, symbol: &str) -> Option<&mut SymbolEventStats> {
        loop {
            let count = self.symbol_count.load(Ordering::Acquire) as usize;
            if let Some(i) = (0..count).find(|&i| self.symbol_stats[i].matches(symbol)) {
                return Some(&mut self.symbol_stats[i]);
            }
            if count >= MAX_SYMBOLS {
                return None;
            }
            match self.symbol_count.compare_exchange(
                count as u32,
                count as u32 + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.symbol_stats[count].init(symbol);
                    return Some(&mut self.symbol_stats[count]);
                }
                Err(_) => continue,
            }
        }
    }

    /// Read-only lookup of per-symbol stats.
    #[must_use]
    pub fn find_symbol_stats(&self, symbol: &str) -> Option<&SymbolEventStats> {
        let count = self.symbol_count.load(Ordering::Acquire) as usize;
        (0..count).map(|i| &self.symbol_stats[i]).find(|s| s.matches(symbol))
    }

    /// Reset session-scoped stats (call at the start of a trading day).
    pub fn reset_session(&mut self) {
        self.session_start_ns.store(now_ns(), Ordering::Relaxed);
        self.session_pnl_x100.store(0, Ordering::Relaxed);
        let count = self.symbol_count.load(Ordering::Acquire) as usize;
        for stats in &self.symbol_stats[..count] {
            stats.reset_session();
        }
    }

    fn update_stats(&mut self, event: &TunerEvent) {
        let symbol = event.symbol();
        if symbol.is_empty() || symbol == "*" {
            if event.event_type() == TunerEventType::AIDecision {
                self.tuner_stats.total_decisions.fetch_add(1, Ordering::Relaxed);
                self.tuner_stats.last_decision_ns.store(event.timestamp_ns(), Ordering::Relaxed);
            }
            return;
        }
        let Some(stats) = self.get_or_create_symbol_stats(symbol) else { return };
        match event.event_type() {
            TunerEventType::Signal => {
                stats.signal_count.fetch_add(1, Ordering::Relaxed);
                stats.last_signal_ns.store(event.timestamp_ns(), Ordering::Relaxed);
            }
            TunerEventType::Order => {
                stats.order_count.fetch_add(1, Ordering::Relaxed);
            }
            TunerEventType::Fill => {
                stats.fill_count.fetch_add(1, Ordering::Relaxed);
                stats.last_fill_ns.store(event.timestamp_ns(), Ordering::Relaxed);
                let pnl = event.trade_pnl_x100();
                stats.total_pnl_x100.fetch_add(pnl, Ordering::Relaxed);
                stats.session_pnl_x100.fetch_add(pnl, Ordering::Relaxed);
                if pnl > 0 {
                    stats.winning_trades.fetch_add(1, Ordering::Relaxed);
                } else if pnl < 0 {
                    stats.losing_trades.fetch_add(1, Ordering::Relaxed);
                }
            }
            TunerEventType::Cancel => {
                stats.cancel_count.fetch_add(1, Ordering::Relaxed);
            }
            TunerEventType::ConfigChange => {
                stats.config_changes.fetch_add(1, Ordering::Relaxed);
                stats.last_config_ns.store(event.timestamp_ns(), Ordering::Relaxed);
            }
            TunerEventType::PauseSymbol => {
                stats.pause_count.fetch_add(1, Ordering::Relaxed);
                stats.is_paused.store(1, Ordering::Relaxed);
            }
            TunerEventType::ResumeSymbol => {
                stats.is_paused.store(0, Ordering::Relaxed);
            }
            TunerEventType::EmergencyExit => {
                stats.emergency_exits.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Map (creating if absent) and initialize a fresh event log page.
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
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "SharedEventLog header mismatch"));
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
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "SharedEventLog header mismatch"));
        }
        Ok(mmap)
    }
}

/// Borrow a page out of a read-only mapping validated by [`SharedEventLog::open_ro`].
///
/// # Safety
/// `mmap` must have been produced or validated by one of `SharedEventLog`'s
/// constructors.
#[must_use]
pub unsafe fn view(mmap: &Mmap) -> &SharedEventLog {
    unsafe { as_page::<SharedEventLog>(mmap) }
}

/// Borrow a page out of a read-write mapping. See [`view`] for safety.
///
/// # Safety
/// Same preconditions as [`view`].
#[must_use]
pub unsafe fn view_mut(mmap: &mut MmapMut) -> &mut SharedEventLog {
    unsafe { as_page_mut::<SharedEventLog>(mmap) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuner_event::TradeSide;

    #[test]
    fn log_assigns_sequence_and_updates_symbol_stats() {
        let name = format!("/ipc_event_log_test_{}", std::process::id());
        let mut mmap = SharedEventLog::create(&name).expect("create");
        // SAFETY: freshly created and initialized above.
        let log = unsafe { view_mut(&mut mmap) };

        log.log(TunerEvent::make_fill("BTCUSDT", TradeSide::Buy, 65_000.0, 0.01, 500, None));
        log.log(TunerEvent::make_fill("BTCUSDT", TradeSide::Sell, 65_100.0, 0.01, -200, None));

        assert_eq!(log.current_position(), 2);
        let first = log.get_event(0).expect("first event still resident");
        assert_eq!(first.symbol(), "BTCUSDT");

        let stats = log.find_symbol_stats("BTCUSDT").expect("stats registered");
        assert_eq!(stats.fill_count.load(Ordering::Relaxed), 2);
        assert_eq!(stats.winning_trades.load(Ordering::Relaxed), 1);
        assert_eq!(stats.losing_trades.load(Ordering::Relaxed), 1);
        assert_eq!(stats.total_pnl_x100.load(Ordering::Relaxed), 300);

        SharedEventLog::unlink(&name).expect("unlink");
    }

    #[test]
    fn get_event_rejects_overwritten_slots() {
        let name = format!("/ipc_event_log_test_wrap_{}", std::process::id());
        let mut mmap = SharedEventLog::create(&name).expect("create");
        // SAFETY: freshly created and initialized above.
        let log = unsafe { view_mut(&mut mmap) };

        for _ in 0..=RING_SIZE {
            log.log(TunerEvent::make_signal("ETHUSDT", TradeSide::Buy, 1.0, 1.0, None));
        }
        assert!(log.get_event(0).is_none());
        assert!(log.get_event(RING_SIZE as u64).is_some());

        SharedEventLog::unlink(&name).expect("unlink");
    }
}
