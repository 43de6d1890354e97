//! Read-only data-access contract.
//!
//! The engine never issues raw storage queries. Everything it needs from
//! the platform reduces to three primitives over timestamped records:
//! count with a filter, group-by with count/sum, and distinct-count of a
//! field. The collaborator implementing [`DataStore`] owns connections,
//! ORM mapping, and caching; this crate only sees the primitives.
//!
//! [`MemoryStore`] is the in-crate implementation over plain vectors, used
//! by the test suite and for embedder dry runs.

pub mod memory;

pub use memory::{
    CandidateRecord, EventRecord, MemoryStore, PaymentRecord, UserRecord, VoteRecord,
};

use tally_common::{DateRange, Granularity, Scope, StoreError};

/// Kind of record a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Vote,
    Payment,
    Event,
    Candidate,
    User,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Vote => write!(f, "vote"),
            RecordKind::Payment => write!(f, "payment"),
            RecordKind::Event => write!(f, "event"),
            RecordKind::Candidate => write!(f, "candidate"),
            RecordKind::User => write!(f, "user"),
        }
    }
}

/// Settlement state of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Settled,
    Failed,
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Settled => "settled",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Pending => "pending",
        }
    }
}

/// Lifecycle phase of an event, judged against the end of the queried range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    /// Still running when the range closes.
    Active,
    /// Finished inside the range.
    Completed,
}

/// Record filter for count queries.
///
/// Fields that do not apply to the queried kind are ignored by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub status: Option<PaymentStatus>,
    pub method: Option<String>,
    /// Restrict payments to those with (true) or without (false) a coupon.
    pub coupon_applied: Option<bool>,
    pub event_phase: Option<EventPhase>,
}

impl Filter {
    /// Match every record of the kind in range and scope.
    pub fn none() -> Self {
        Filter::default()
    }

    pub fn with_status(status: PaymentStatus) -> Self {
        Filter {
            status: Some(status),
            ..Filter::default()
        }
    }

    pub fn with_phase(phase: EventPhase) -> Self {
        Filter {
            event_phase: Some(phase),
            ..Filter::default()
        }
    }
}

/// Grouping key for [`DataStore::grouped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    /// Time bucket of the given width; keys are bucket labels.
    Bucket(Granularity),
    Candidate,
    Category,
    Status,
    Method,
    /// Coupon presence; keys are `redeemed` and `none`.
    Coupon,
}

/// Field summed per group alongside the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SumField {
    /// Ballot credits carried by a vote record.
    VoteCredits,
    /// Payment amount.
    Amount,
    /// Coupon discount on a payment.
    Discount,
}

/// Field whose distinct values are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctField {
    /// Voter identity on vote records.
    VoterIdentity,
}

/// One group-by result row.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: String,
    pub count: u64,
    /// Sum of the requested field; 0 when none was requested.
    pub sum: f64,
}

/// Read-only query primitives provided by the platform's data layer.
///
/// Implementations must be safe to call from multiple threads at once: the
/// assembler fans sub-aggregations out on scoped threads.
pub trait DataStore: Send + Sync {
    /// Count records of `kind` matching `filter` within the range and scope.
    fn count(
        &self,
        kind: RecordKind,
        range: &DateRange,
        scope: &Scope,
        filter: &Filter,
    ) -> Result<u64, StoreError>;

    /// Group records by `group_by`, returning per-group count and the sum of
    /// `sum` when requested.
    fn grouped(
        &self,
        kind: RecordKind,
        range: &DateRange,
        scope: &Scope,
        filter: &Filter,
        group_by: GroupBy,
        sum: Option<SumField>,
    ) -> Result<Vec<GroupRow>, StoreError>;

    /// Count distinct values of `field` within the range and scope.
    fn distinct_count(
        &self,
        kind: RecordKind,
        range: &DateRange,
        scope: &Scope,
        field: DistinctField,
    ) -> Result<u64, StoreError>;
}
