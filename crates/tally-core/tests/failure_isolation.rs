//! Failure isolation and budget enforcement.
//!
//! A sub-aggregation failure defaults its section inside a `Completed`
//! snapshot; only validation errors and a blown budget fail the whole
//! computation.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tally_core::store::{MemoryStore, PaymentRecord, PaymentStatus, RecordKind, VoteRecord};
use tally_core::{
    DateRange, DomainPayload, EngineConfig, Error, ReportAssembler, ReportDomain, ReportRequest,
    Scope, SnapshotStatus,
};
use tally_common::{CandidateId, CategoryId, EventId};

fn at(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, 0, 0, 0).unwrap()
}

fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    for i in 0..10 {
        store.add_vote(VoteRecord {
            at: at(1 + i % 7),
            event_id: EventId::from("ev-1"),
            category_id: CategoryId::from("cat-1"),
            candidate_id: CandidateId::from("cand-a"),
            voter_ip: format!("10.0.0.{i}"),
            credits: 1,
        });
    }
    store.add_payment(PaymentRecord {
        at: at(2),
        event_id: None,
        status: PaymentStatus::Settled,
        method: "card".to_string(),
        amount: 30.0,
        coupon_code: None,
        discount: 0.0,
    });
    store
}

fn week_request(domain: ReportDomain) -> ReportRequest {
    ReportRequest::new(domain, at(1), at(8)).expect("valid range")
}

#[test]
fn failing_payment_queries_default_the_payment_report() {
    let mut store = seeded_store();
    store.fail_kind(RecordKind::Payment);
    let assembler = ReportAssembler::new(Arc::new(store), EngineConfig::default());

    let snapshot = assembler
        .compute(&week_request(ReportDomain::Payments))
        .unwrap();
    assert_eq!(snapshot.status, SnapshotStatus::Completed);
    assert!(snapshot.error.is_none());

    let report = match &snapshot.data {
        DomainPayload::Payments(r) => r,
        other => panic!("wrong payload: {other:?}"),
    };
    assert_eq!(report.stats.total_payments, 0);
    assert!(report.stats.series.is_empty());
    assert!(report.anomalies.is_empty());
}

#[test]
fn failing_payment_queries_leave_vote_sections_intact() {
    let mut store = seeded_store();
    store.fail_kind(RecordKind::Payment);
    let assembler = ReportAssembler::new(Arc::new(store), EngineConfig::default());

    // Anomalies pull both series; only the payment one is defaulted.
    let snapshot = assembler
        .compute(&week_request(ReportDomain::Anomalies))
        .unwrap();
    assert_eq!(snapshot.status, SnapshotStatus::Completed);

    // Voting is untouched by the payment fault.
    let snapshot = assembler
        .compute(&week_request(ReportDomain::Voting))
        .unwrap();
    let report = match &snapshot.data {
        DomainPayload::Voting(r) => r,
        other => panic!("wrong payload: {other:?}"),
    };
    assert_eq!(report.stats.total_votes, 10);
    assert_eq!(report.stats.series.len(), 7);
}

#[test]
fn failing_vote_queries_default_only_their_overview_inputs() {
    let mut store = seeded_store();
    store.fail_kind(RecordKind::Vote);
    let assembler = ReportAssembler::new(Arc::new(store), EngineConfig::default());

    let snapshot = assembler
        .compute(&week_request(ReportDomain::Overview))
        .unwrap();
    assert_eq!(snapshot.status, SnapshotStatus::Completed);

    let report = match &snapshot.data {
        DomainPayload::Overview(r) => r,
        other => panic!("wrong payload: {other:?}"),
    };
    // The stats task touches vote counts and is defaulted wholesale.
    assert_eq!(report.stats.total_votes, 0);
    assert_eq!(report.stats.total_events, 0);
    // Growth inputs come from independent tasks; both vote counts default
    // to zero, so growth reads 0 rather than poisoning the snapshot.
    assert_eq!(report.vote_growth_pct, 0.0);
    assert_eq!(report.payment_growth_pct, 0.0);
}

#[test]
fn slow_store_blows_the_budget() {
    let mut store = seeded_store();
    store.set_latency(Duration::from_millis(100));
    let config = EngineConfig {
        budget_ms: 20,
        ..EngineConfig::default()
    };
    let assembler = ReportAssembler::new(Arc::new(store), config);

    let err = assembler
        .compute(&week_request(ReportDomain::Voting))
        .unwrap_err();
    match err {
        Error::Timeout { budget_ms, .. } => assert_eq!(budget_ms, 20),
        other => panic!("expected timeout, got {other}"),
    }
    assert!(!err.is_recoverable());
}

#[test]
fn compute_or_failed_wraps_the_timeout() {
    let mut store = seeded_store();
    store.set_latency(Duration::from_millis(100));
    let config = EngineConfig {
        budget_ms: 20,
        ..EngineConfig::default()
    };
    let assembler = ReportAssembler::new(Arc::new(store), config);

    let snapshot = assembler.compute_or_failed(&week_request(ReportDomain::Payments));
    assert_eq!(snapshot.status, SnapshotStatus::Failed);
    assert_eq!(snapshot.domain, ReportDomain::Payments);
    assert_eq!(snapshot.data.domain(), ReportDomain::Payments);
    let message = snapshot.error.expect("failed snapshot carries an error");
    assert!(message.contains("budget"), "unexpected message: {message}");
}

#[test]
fn compute_or_failed_wraps_validation_errors() {
    let assembler = ReportAssembler::new(Arc::new(seeded_store()), EngineConfig::default());
    // Bypass the constructor to hand the assembler an inverted range.
    let request = ReportRequest {
        domain: ReportDomain::Overview,
        range: DateRange {
            start: at(8),
            end: at(1),
        },
        scope: Scope::all(),
        granularity: None,
    };

    assert!(assembler.compute(&request).is_err());

    let snapshot = assembler.compute_or_failed(&request);
    assert_eq!(snapshot.status, SnapshotStatus::Failed);
    assert!(snapshot
        .error
        .expect("failed snapshot carries an error")
        .contains("invalid date range"));
}
