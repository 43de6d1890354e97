//! In-memory [`DataStore`] over plain record vectors.
//!
//! Backs the test suite and embedder dry runs. Supports two fault hooks:
//! per-kind injected query failures and a fixed artificial latency, which
//! the integration tests use to exercise failure isolation and the report
//! budget.

use super::{
    DataStore, DistinctField, EventPhase, Filter, GroupBy, GroupRow, PaymentStatus, RecordKind,
    SumField,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tally_common::{CandidateId, CategoryId, DateRange, EventId, Scope, StoreError};

/// One vote record: a voter spending ballot credits on a candidate.
#[derive(Debug, Clone)]
pub struct VoteRecord {
    pub at: DateTime<Utc>,
    pub event_id: EventId,
    pub category_id: CategoryId,
    pub candidate_id: CandidateId,
    /// Voter identity as the platform records it (IP-derived).
    pub voter_ip: String,
    /// Ballot credits this record carries; one record may weigh several votes.
    pub credits: u32,
}

/// One payment record.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub at: DateTime<Utc>,
    pub event_id: Option<EventId>,
    pub status: PaymentStatus,
    pub method: String,
    pub amount: f64,
    pub coupon_code: Option<String>,
    pub discount: f64,
}

/// One event record; phase is derived from the window boundaries.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: EventId,
    pub starts: DateTime<Utc>,
    pub ends: DateTime<Utc>,
}

/// One registered user.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub created_at: DateTime<Utc>,
}

/// One candidate registration.
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub event_id: EventId,
    pub created_at: DateTime<Utc>,
}

/// In-memory store with fault injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    votes: Vec<VoteRecord>,
    payments: Vec<PaymentRecord>,
    events: Vec<EventRecord>,
    users: Vec<UserRecord>,
    candidates: Vec<CandidateRecord>,
    fail_kinds: HashSet<RecordKind>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn add_vote(&mut self, vote: VoteRecord) -> &mut Self {
        self.votes.push(vote);
        self
    }

    pub fn add_payment(&mut self, payment: PaymentRecord) -> &mut Self {
        self.payments.push(payment);
        self
    }

    pub fn add_event(&mut self, event: EventRecord) -> &mut Self {
        self.events.push(event);
        self
    }

    pub fn add_user(&mut self, user: UserRecord) -> &mut Self {
        self.users.push(user);
        self
    }

    pub fn add_candidate(&mut self, candidate: CandidateRecord) -> &mut Self {
        self.candidates.push(candidate);
        self
    }

    /// Make every query against `kind` fail.
    pub fn fail_kind(&mut self, kind: RecordKind) -> &mut Self {
        self.fail_kinds.insert(kind);
        self
    }

    /// Sleep this long before answering any query.
    pub fn set_latency(&mut self, latency: Duration) -> &mut Self {
        self.latency = Some(latency);
        self
    }

    fn check_faults(&self, kind: RecordKind) -> Result<(), StoreError> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        if self.fail_kinds.contains(&kind) {
            return Err(StoreError::QueryFailed(format!(
                "injected failure for {} queries",
                kind
            )));
        }
        Ok(())
    }

    fn vote_matches(&self, v: &VoteRecord, range: &DateRange, scope: &Scope) -> bool {
        range.contains(v.at)
            && scope.event_id.as_ref().map_or(true, |e| *e == v.event_id)
            && scope
                .category_id
                .as_ref()
                .map_or(true, |c| *c == v.category_id)
    }

    fn payment_matches(
        &self,
        p: &PaymentRecord,
        range: &DateRange,
        scope: &Scope,
        filter: &Filter,
    ) -> bool {
        if !range.contains(p.at) {
            return false;
        }
        if let Some(event_id) = &scope.event_id {
            if p.event_id.as_ref() != Some(event_id) {
                return false;
            }
        }
        if let Some(status) = filter.status {
            if p.status != status {
                return false;
            }
        }
        if let Some(method) = &filter.method {
            if p.method != *method {
                return false;
            }
        }
        if let Some(coupon) = filter.coupon_applied {
            if p.coupon_code.is_some() != coupon {
                return false;
            }
        }
        true
    }

    /// Event phase relative to the queried window: overlapping events are
    /// `Active` if still running when the window closes, `Completed` if they
    /// finished inside it.
    fn event_matches(&self, e: &EventRecord, range: &DateRange, scope: &Scope, filter: &Filter) -> bool {
        if let Some(event_id) = &scope.event_id {
            if *event_id != e.id {
                return false;
            }
        }
        let overlaps = e.starts < range.end && e.ends > range.start;
        if !overlaps {
            return false;
        }
        match filter.event_phase {
            None => true,
            Some(EventPhase::Active) => e.ends >= range.end,
            Some(EventPhase::Completed) => e.ends < range.end,
        }
    }

    fn candidate_matches(&self, c: &CandidateRecord, range: &DateRange, scope: &Scope) -> bool {
        range.contains(c.created_at)
            && scope.event_id.as_ref().map_or(true, |e| *e == c.event_id)
    }
}

impl DataStore for MemoryStore {
    fn count(
        &self,
        kind: RecordKind,
        range: &DateRange,
        scope: &Scope,
        filter: &Filter,
    ) -> Result<u64, StoreError> {
        self.check_faults(kind)?;
        let count = match kind {
            RecordKind::Vote => self
                .votes
                .iter()
                .filter(|v| self.vote_matches(v, range, scope))
                .count(),
            RecordKind::Payment => self
                .payments
                .iter()
                .filter(|p| self.payment_matches(p, range, scope, filter))
                .count(),
            RecordKind::Event => self
                .events
                .iter()
                .filter(|e| self.event_matches(e, range, scope, filter))
                .count(),
            RecordKind::Candidate => self
                .candidates
                .iter()
                .filter(|c| self.candidate_matches(c, range, scope))
                .count(),
            RecordKind::User => self
                .users
                .iter()
                .filter(|u| range.contains(u.created_at))
                .count(),
        };
        Ok(count as u64)
    }

    fn grouped(
        &self,
        kind: RecordKind,
        range: &DateRange,
        scope: &Scope,
        filter: &Filter,
        group_by: GroupBy,
        sum: Option<SumField>,
    ) -> Result<Vec<GroupRow>, StoreError> {
        self.check_faults(kind)?;

        // BTreeMap keeps group keys sorted, so repeated queries over the
        // same data return rows in the same order.
        let mut groups: BTreeMap<String, (u64, f64)> = BTreeMap::new();
        let mut add = |key: String, sum_value: f64| {
            let entry = groups.entry(key).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += sum_value;
        };

        match kind {
            RecordKind::Vote => {
                for v in self.votes.iter().filter(|v| self.vote_matches(v, range, scope)) {
                    let key = match group_by {
                        GroupBy::Bucket(g) => g.label(g.truncate(v.at)),
                        GroupBy::Candidate => v.candidate_id.to_string(),
                        GroupBy::Category => v.category_id.to_string(),
                        _ => {
                            return Err(StoreError::QueryFailed(format!(
                                "unsupported grouping {:?} for vote records",
                                group_by
                            )))
                        }
                    };
                    let sum_value = match sum {
                        Some(SumField::VoteCredits) => f64::from(v.credits),
                        Some(_) => {
                            return Err(StoreError::QueryFailed(
                                "unsupported sum field for vote records".to_string(),
                            ))
                        }
                        None => 0.0,
                    };
                    add(key, sum_value);
                }
            }
            RecordKind::Payment => {
                for p in self
                    .payments
                    .iter()
                    .filter(|p| self.payment_matches(p, range, scope, filter))
                {
                    let key = match group_by {
                        GroupBy::Bucket(g) => g.label(g.truncate(p.at)),
                        GroupBy::Status => p.status.as_str().to_string(),
                        GroupBy::Method => p.method.clone(),
                        GroupBy::Coupon => if p.coupon_code.is_some() {
                            "redeemed"
                        } else {
                            "none"
                        }
                        .to_string(),
                        _ => {
                            return Err(StoreError::QueryFailed(format!(
                                "unsupported grouping {:?} for payment records",
                                group_by
                            )))
                        }
                    };
                    let sum_value = match sum {
                        Some(SumField::Amount) => p.amount,
                        Some(SumField::Discount) => p.discount,
                        Some(SumField::VoteCredits) => {
                            return Err(StoreError::QueryFailed(
                                "unsupported sum field for payment records".to_string(),
                            ))
                        }
                        None => 0.0,
                    };
                    add(key, sum_value);
                }
            }
            _ => {
                return Err(StoreError::QueryFailed(format!(
                    "grouping not supported for {} records",
                    kind
                )))
            }
        }

        Ok(groups
            .into_iter()
            .map(|(key, (count, sum))| GroupRow { key, count, sum })
            .collect())
    }

    fn distinct_count(
        &self,
        kind: RecordKind,
        range: &DateRange,
        scope: &Scope,
        field: DistinctField,
    ) -> Result<u64, StoreError> {
        self.check_faults(kind)?;
        match (kind, field) {
            (RecordKind::Vote, DistinctField::VoterIdentity) => {
                let identities: HashSet<&str> = self
                    .votes
                    .iter()
                    .filter(|v| self.vote_matches(v, range, scope))
                    .map(|v| v.voter_ip.as_str())
                    .collect();
                Ok(identities.len() as u64)
            }
            _ => Err(StoreError::QueryFailed(format!(
                "distinct {:?} not supported for {} records",
                field, kind
            ))),
        }
    }
}
