//! The analytics snapshot model.
//!
//! A snapshot is an immutable value computed per request. Recomputing over
//! the same store contents yields an identical payload; only `id`,
//! `computed_at`, and `computation_time_ms` differ. Everything here is
//! plain serde data so snapshots can cross any boundary (HTTP, cache,
//! disk) without this crate knowing about it.

use crate::time::{DateRange, Granularity, TimeSeries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub use tally_math::ConfidenceInterval;

/// Report domain requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportDomain {
    Overview,
    Voting,
    Payments,
    Anomalies,
    Forecasts,
}

impl std::fmt::Display for ReportDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportDomain::Overview => write!(f, "overview"),
            ReportDomain::Voting => write!(f, "voting"),
            ReportDomain::Payments => write!(f, "payments"),
            ReportDomain::Anomalies => write!(f, "anomalies"),
            ReportDomain::Forecasts => write!(f, "forecasts"),
        }
    }
}

/// Terminal state of a snapshot computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    Completed,
    Failed,
}

/// Bucket flagged as an outlier by the anomaly scan.
///
/// Only emitted when the leave-one-out |z| exceeds the 3.0 threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Metric the series belongs to (e.g. "vote_count").
    pub metric: String,
    /// Bucket label of the flagged point.
    pub bucket: String,
    /// Signed z-score of the point against its peers.
    pub z_score: f64,
    /// Observed value in the bucket.
    pub value: f64,
}

/// One forecast period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Period label, continuing the bucket labels of the input series.
    pub period: String,
    /// Predicted value, never negative.
    pub predicted: f64,
}

/// Per-entry share of a grand total, with a Wilson 95% interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    /// Group key: candidate id, category id, payment status, or method.
    pub key: String,
    /// Total for the group over the whole range.
    pub total: f64,
    /// Percentage share of the grand total; 0 when the grand total is 0.
    pub share_pct: f64,
    /// Wilson score interval for the group's proportion.
    pub interval: ConfidenceInterval,
}

/// Aggregated voting figures for one range and scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VotingStats {
    /// Number of vote records.
    pub total_votes: u64,
    /// Distinct voter identities seen in range.
    pub unique_voters: u64,
    /// Ballot-credit-weighted vote total (a record may carry several votes).
    pub weighted_votes: f64,
    pub by_candidate: Vec<BreakdownEntry>,
    pub by_category: Vec<BreakdownEntry>,
    /// Zero-filled vote counts per bucket.
    pub series: TimeSeries,
}

/// Count and sum for one payment status or method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTotals {
    pub key: String,
    pub count: u64,
    pub sum: f64,
}

/// Aggregated payment figures for one range and scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentStats {
    pub total_payments: u64,
    pub by_status: Vec<GroupTotals>,
    pub by_method: Vec<GroupTotals>,
    /// Mean settled transaction value; 0 when nothing settled.
    pub average_value: f64,
    pub coupon_redemptions: u64,
    pub coupon_discount: f64,
    /// failed / total; 0 when there are no payments.
    pub failure_rate: f64,
    /// min(1, 10·failure_rate), capped at 0.9 once the rate exceeds 0.1.
    pub fraud_indicator: f64,
    /// Zero-filled settled amounts per bucket.
    pub series: TimeSeries,
}

/// Cross-cutting entity counts for one range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewStats {
    pub total_events: u64,
    pub active_events: u64,
    pub completed_events: u64,
    pub total_votes: u64,
    pub total_payments: u64,
    pub total_users: u64,
    pub total_candidates: u64,
    /// 50·(active/total) + 50·(completed/total); 0 when there are no events.
    pub health_score: f64,
}

/// Overview domain payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewReport {
    pub stats: OverviewStats,
    /// Vote-count growth vs the preceding equal-length window, in percent.
    pub vote_growth_pct: f64,
    /// Payment-count growth vs the preceding equal-length window, in percent.
    pub payment_growth_pct: f64,
}

/// Voting domain payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VotingReport {
    pub stats: VotingStats,
    /// Two-valued chi-square significance proxy for the leading candidate's
    /// share of the vote (0.05 significant, 1.0 not).
    pub leading_significance: f64,
    /// Max leave-one-out |z| of the bucket series when above threshold.
    pub anomaly_score: f64,
    pub anomalies: Vec<AnomalyRecord>,
}

/// Payments domain payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentReport {
    pub stats: PaymentStats,
    pub anomalies: Vec<AnomalyRecord>,
}

/// Domain-specific payload of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainPayload {
    Overview(OverviewReport),
    Voting(VotingReport),
    Payments(PaymentReport),
    Anomalies(Vec<AnomalyRecord>),
    /// Metric name → forecast points, in deterministic key order.
    Forecasts(BTreeMap<String, Vec<ForecastPoint>>),
}

impl DomainPayload {
    /// The domain this payload belongs to.
    pub fn domain(&self) -> ReportDomain {
        match self {
            DomainPayload::Overview(_) => ReportDomain::Overview,
            DomainPayload::Voting(_) => ReportDomain::Voting,
            DomainPayload::Payments(_) => ReportDomain::Payments,
            DomainPayload::Anomalies(_) => ReportDomain::Anomalies,
            DomainPayload::Forecasts(_) => ReportDomain::Forecasts,
        }
    }
}

/// Bookkeeping attached to every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub computed_at: DateTime<Utc>,
    pub computation_time_ms: u64,
    /// Representative input size: number of buckets examined.
    pub data_points: u64,
}

/// Immutable analytics result for one domain and date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub id: Uuid,
    pub schema_version: String,
    pub domain: ReportDomain,
    /// Bucket granularity the series were computed at.
    pub period: Granularity,
    pub range: DateRange,
    pub data: DomainPayload,
    pub metadata: SnapshotMetadata,
    pub status: SnapshotStatus,
    /// Present only when `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn snapshot_serializes_to_nested_json() {
        let range = DateRange::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 8, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let snapshot = AnalyticsSnapshot {
            id: Uuid::new_v4(),
            schema_version: crate::SCHEMA_VERSION.to_string(),
            domain: ReportDomain::Voting,
            period: Granularity::Day,
            range,
            data: DomainPayload::Voting(VotingReport::default()),
            metadata: SnapshotMetadata {
                computed_at: range.end,
                computation_time_ms: 12,
                data_points: 7,
            },
            status: SnapshotStatus::Completed,
            error: None,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["domain"], "voting");
        assert_eq!(json["status"], "completed");
        assert!(json["data"]["voting"]["stats"]["total_votes"].is_u64());
        assert!(json.get("error").is_none());

        let back: AnalyticsSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn payload_reports_its_domain() {
        let payload = DomainPayload::Anomalies(vec![]);
        assert_eq!(payload.domain(), ReportDomain::Anomalies);
        assert_eq!(payload.domain().to_string(), "anomalies");
    }
}
