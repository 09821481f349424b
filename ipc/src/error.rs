//! Error type for the shared-memory IPC substrate.

use thiserror::Error;

/// Failure modes when mapping or validating a shared-memory page.
#[derive(Debug, Error)]
pub enum IpcError {
    /// Failed to create, open, or map the backing file.
    #[error("shared region I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The page's magic/version header did not match this build's expectations.
    #[error("shared region header mismatch for {page}")]
    HeaderMismatch {
        /// Name of the page type that failed validation, for diagnostics.
        page: &'static str,
    },
}

/// Convenience alias for IPC operations.
pub type IpcResult<T> = Result<T, IpcError>;
