//! Tally analytics common types.
//!
//! This crate provides the foundational types shared across the engine:
//! - Entity identifiers for events, categories, and candidates
//! - Date ranges, bucket granularities, and zero-filled time series
//! - The error taxonomy with category and recoverability accessors
//! - The immutable analytics snapshot model and its domain payloads

pub mod error;
pub mod id;
pub mod snapshot;
pub mod time;

pub use error::{Error, ErrorCategory, Result, StoreError};
pub use id::{CandidateId, CategoryId, EventId};
pub use snapshot::{
    AnalyticsSnapshot, AnomalyRecord, BreakdownEntry, ConfidenceInterval, DomainPayload,
    ForecastPoint, GroupTotals, OverviewReport, OverviewStats, PaymentReport, PaymentStats,
    ReportDomain, SnapshotMetadata, SnapshotStatus, VotingReport, VotingStats,
};
pub use time::{DateRange, Granularity, Scope, TimeSeries};

/// Version of the snapshot schema emitted by this engine.
pub const SCHEMA_VERSION: &str = "1.0.0";
