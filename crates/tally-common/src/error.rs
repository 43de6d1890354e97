//! Error taxonomy for the Tally analytics engine.
//!
//! Four categories with distinct handling contracts:
//! - **Validation** — bad input, rejected before any store access.
//! - **DataAccess** — a sub-aggregation query failed; the affected report
//!   section is defaulted and logged, never propagated to the caller.
//! - **Computation** — degenerate statistical input; the math layer guards
//!   these internally, the variant exists for callers that bypass the guards.
//! - **Fatal** — the snapshot cannot be produced at all; surfaces to the
//!   caller as an explicit failure.
//!
//! Callers never observe panics: every computation ends in either a
//! complete-but-possibly-partial snapshot or a descriptive error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Request validation errors.
    Validation,
    /// External data-source errors.
    DataAccess,
    /// Degenerate statistical input.
    Computation,
    /// Unrecoverable engine errors.
    Fatal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::DataAccess => write!(f, "data_access"),
            ErrorCategory::Computation => write!(f, "computation"),
            ErrorCategory::Fatal => write!(f, "fatal"),
        }
    }
}

/// Failure reported by the external data-access collaborator.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query failed: {0}")]
    QueryFailed(String),
}

/// Unified error type for the analytics engine.
#[derive(Debug, Error)]
pub enum Error {
    // Validation errors (10-19)
    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    // Data-access errors (20-29)
    #[error("data access failed: {0}")]
    Store(#[from] StoreError),

    // Computation errors (30-39)
    #[error("degenerate statistical input: {what}")]
    DegenerateInput { what: String },

    // Fatal errors (40-49)
    #[error("report computation exceeded budget: {elapsed_ms}ms of {budget_ms}ms")]
    Timeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("internal engine error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable error code, grouped by category.
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidDateRange { .. } => 10,
            Error::Store(_) => 20,
            Error::DegenerateInput { .. } => 30,
            Error::Timeout { .. } => 40,
            Error::Internal(_) => 41,
        }
    }

    /// Category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidDateRange { .. } => ErrorCategory::Validation,
            Error::Store(_) => ErrorCategory::DataAccess,
            Error::DegenerateInput { .. } => ErrorCategory::Computation,
            Error::Timeout { .. } | Error::Internal(_) => ErrorCategory::Fatal,
        }
    }

    /// Whether the assembler may recover by defaulting the affected section.
    ///
    /// Only data-access and computation errors are recoverable; validation
    /// and fatal errors abort the snapshot.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::DataAccess | ErrorCategory::Computation
        )
    }
}
