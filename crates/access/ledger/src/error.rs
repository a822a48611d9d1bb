use thiserror::Error;

/// Ledger-related errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("entry not found: {0}")]
    NotFound(String),

    /// The durable sink refused the entry; nothing was appended.
    #[error("ledger write fault: {0}")]
    WriteFault(String),

    /// Capacity eviction could not find the oldest entry.
    #[error("ledger invariant violation: {0}")]
    InvariantViolation(String),

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
