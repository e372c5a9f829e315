//! Engine-level error taxonomy.
//!
//! Per the detector contract, only one failure mode ever reaches the caller as
//! a `Result::Err`: an input table that violates the engine's own boundary
//! invariants. Timeouts, skipped detectors, and best-effort internal failures
//! are not propagated — see `EngineReport::timed_out` and the `tracing::warn!`
//! call sites in each detector instead.

use thiserror::Error;

/// Errors returned by [`crate::analyze`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("transaction table is empty")]
    EmptyTable,

    #[error("transaction table has {actual} rows, exceeding MAX_ROWS ({max})")]
    RowCapExceeded { actual: usize, max: usize },

    #[error("duplicate transaction_id: {0}")]
    DuplicateTransactionId(String),

    #[error("invalid transaction {transaction_id}: {reason}")]
    InvalidTransaction {
        transaction_id: String,
        reason: String,
    },
}
