//! Shared-memory IPC substrate (spec §4.5, §6) plus the in-process SPSC
//! ring buffer that crosses the feed-ingest thread boundary (spec §5).
//!
//! Three page families are exposed, each a fixed-size `#[repr(C)]` struct
//! implementing [`region::SharedRegion`] and backed by a `memmap2`-mapped
//! file under `/dev/shm`: [`shared_config::SharedConfig`],
//! [`symbol_configs::SharedSymbolConfigs`], and [`event_log::SharedEventLog`].
//! [`paper_config::SharedPaperConfig`] is a fourth, paper-exchange-specific
//! page. [`execution_report::ExecutionReport`] is the wire record written
//! into the fill path, not itself a page.
//!
//! No locks are taken anywhere in this crate: writers bump a `sequence`
//! counter (or, for the event log, reserve a slot via `fetch_add`) and
//! readers detect torn reads by re-checking sequence numbers after the read
//! (spec §4.5, §9's "Atomics in packed structs" flag).

//! `region` and `spsc` use `unsafe` to reinterpret mapped bytes and shared
//! slots as typed pages; every other module in this crate is safe code.
#![warn(missing_docs)]

pub mod error;
pub mod event_log;
pub mod execution_report;
pub mod paper_config;
pub mod region;
pub mod shared_config;
pub mod spsc;
pub mod symbol_configs;
pub mod tuner_event;

pub use error::{IpcError, IpcResult};
pub use event_log::{SharedEventLog, SymbolEventStats, TunerStats};
pub use execution_report::{ExecType, ExecutionReport, OrderStatus, ReportOrderType};
pub use paper_config::SharedPaperConfig;
pub use region::SharedRegion;
pub use shared_config::{ProcessStatus, SharedConfig};
pub use spsc::SpscRingBuffer;
pub use symbol_configs::{SharedSymbolConfigs, SymbolTuningConfig};
pub use tuner_event::{Severity, TradeSide, TriggerReason, TunerEvent, TunerEventType};

/// Well-known shared-memory paths (spec §6). External tools (CLI, dashboard)
/// open these read-only; the trading process is the sole writer of each
/// except `SYMBOL_CONFIGS`, which a tuner process also writes.
pub mod paths {
    /// `SharedConfig` page.
    pub const CONFIG: &str = "/trader_config";
    /// `SharedPaperConfig` page.
    pub const PAPER_CONFIG: &str = "/trader_paper_config";
    /// `SharedEventLog` page.
    pub const EVENT_LOG: &str = "/trader_event_log";
    /// `SharedSymbolConfigs` page.
    pub const SYMBOL_CONFIGS: &str = "/trader_symbol_configs";
}
