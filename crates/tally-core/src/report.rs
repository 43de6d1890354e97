//! Report assembly: fan-out, failure isolation, and the budget.
//!
//! For one requested (domain, range, scope) the assembler:
//! 1. validates the range before touching the store,
//! 2. runs the computation on a worker thread, bounded by the configured
//!    budget (a store that hangs past the deadline leaves a detached worker
//!    behind; the caller gets a timeout either way),
//! 3. inside the worker, fans independent sub-aggregations out on scoped
//!    threads; a failed or panicked task defaults its section and is logged
//!    with a `warn!`, never propagated,
//! 4. feeds the resulting series into the estimators, detector, and
//!    smoother, and stamps the snapshot with timing metadata.
//!
//! Nothing here retries: a failed sub-aggregation is simply missing from
//! the snapshot, and the caller decides whether to recompute.

use crate::aggregate::{growth_pct, Aggregator};
use crate::anomaly::AnomalyDetector;
use crate::config::EngineConfig;
use crate::store::DataStore;
use std::collections::BTreeMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;
use tally_common::{
    AnalyticsSnapshot, AnomalyRecord, DateRange, DomainPayload, Error, ForecastPoint,
    Granularity, OverviewReport, PaymentReport, ReportDomain, Result, Scope, SnapshotMetadata,
    SnapshotStatus, TimeSeries, VotingReport, SCHEMA_VERSION,
};
use tally_math::chi_square_flag;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Series names used in anomaly records and forecast maps.
const METRIC_VOTE_COUNT: &str = "vote_count";
const METRIC_PAYMENT_AMOUNT: &str = "payment_amount";

/// One report computation request.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub domain: ReportDomain,
    pub range: DateRange,
    pub scope: Scope,
    /// Overrides the configured bucket width when set.
    pub granularity: Option<Granularity>,
}

impl ReportRequest {
    /// Build a request, validating the date range up front.
    pub fn new(
        domain: ReportDomain,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self> {
        Ok(ReportRequest {
            domain,
            range: DateRange::new(start, end)?,
            scope: Scope::all(),
            granularity: None,
        })
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = Some(granularity);
        self
    }
}

/// Orchestrates per-domain computation against an injected store.
pub struct ReportAssembler {
    store: Arc<dyn DataStore>,
    config: EngineConfig,
}

impl ReportAssembler {
    pub fn new(store: Arc<dyn DataStore>, config: EngineConfig) -> Self {
        ReportAssembler { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute a snapshot, surfacing validation and fatal errors as `Err`.
    ///
    /// Recoverable sub-aggregation failures never appear here; they default
    /// their section inside an otherwise `Completed` snapshot.
    #[instrument(skip(self, request), fields(domain = %request.domain))]
    pub fn compute(&self, request: &ReportRequest) -> Result<AnalyticsSnapshot> {
        // Requests constructed by hand may carry an unvalidated range.
        let range = DateRange::new(request.range.start, request.range.end)?;
        let started = Instant::now();
        let granularity = request.granularity.unwrap_or(self.config.granularity);

        let (tx, rx) = mpsc::channel();
        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let worker_request = request.clone();
        thread::spawn(move || {
            let result = compute_payload(store.as_ref(), &config, &worker_request, granularity);
            // The receiver is gone if the budget already expired.
            let _ = tx.send(result);
        });

        let budget = self.config.budget();
        let payload = match rx.recv_timeout(budget) {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => return Err(e),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(
                    domain = %request.domain,
                    elapsed_ms,
                    budget_ms = self.config.budget_ms,
                    "report computation exceeded budget"
                );
                return Err(Error::Timeout {
                    elapsed_ms,
                    budget_ms: self.config.budget_ms,
                });
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(Error::Internal(
                    "report worker exited without a result".to_string(),
                ))
            }
        };

        let computation_time_ms = started.elapsed().as_millis() as u64;
        info!(
            domain = %request.domain,
            computation_time_ms,
            "report computed"
        );

        Ok(AnalyticsSnapshot {
            id: Uuid::new_v4(),
            schema_version: SCHEMA_VERSION.to_string(),
            domain: request.domain,
            period: granularity,
            range,
            data: payload,
            metadata: SnapshotMetadata {
                computed_at: chrono::Utc::now(),
                computation_time_ms,
                data_points: range.bucket_count(granularity) as u64,
            },
            status: SnapshotStatus::Completed,
            error: None,
        })
    }

    /// Like [`compute`](Self::compute), but maps every error into a
    /// `Failed` snapshot with an empty payload, so callers that must always
    /// render something never handle an `Err`.
    pub fn compute_or_failed(&self, request: &ReportRequest) -> AnalyticsSnapshot {
        let started = Instant::now();
        let granularity = request.granularity.unwrap_or(self.config.granularity);
        match self.compute(request) {
            Ok(snapshot) => snapshot,
            Err(e) => AnalyticsSnapshot {
                id: Uuid::new_v4(),
                schema_version: SCHEMA_VERSION.to_string(),
                domain: request.domain,
                period: granularity,
                range: request.range,
                data: empty_payload(request.domain),
                metadata: SnapshotMetadata {
                    computed_at: chrono::Utc::now(),
                    computation_time_ms: started.elapsed().as_millis() as u64,
                    data_points: 0,
                },
                status: SnapshotStatus::Failed,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Empty payload for a failed snapshot of the given domain.
fn empty_payload(domain: ReportDomain) -> DomainPayload {
    match domain {
        ReportDomain::Overview => DomainPayload::Overview(OverviewReport::default()),
        ReportDomain::Voting => DomainPayload::Voting(VotingReport::default()),
        ReportDomain::Payments => DomainPayload::Payments(PaymentReport::default()),
        ReportDomain::Anomalies => DomainPayload::Anomalies(Vec::new()),
        ReportDomain::Forecasts => DomainPayload::Forecasts(BTreeMap::new()),
    }
}

/// Join a fan-out task, defaulting its section on error or panic.
fn join_section<T: Default>(section: &str, handle: thread::ScopedJoinHandle<'_, Result<T>>) -> T {
    match handle.join() {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            warn!(section, error = %e, "sub-aggregation failed; defaulting section");
            T::default()
        }
        Err(_) => {
            warn!(section, "sub-aggregation panicked; defaulting section");
            T::default()
        }
    }
}

/// Run the domain computation. Called on the worker thread.
fn compute_payload(
    store: &dyn DataStore,
    config: &EngineConfig,
    request: &ReportRequest,
    granularity: Granularity,
) -> Result<DomainPayload> {
    let agg = Aggregator::new(store, granularity);
    let detector = AnomalyDetector::new(config.anomaly_threshold);
    let range = &request.range;
    let scope = &request.scope;
    debug!(
        domain = %request.domain,
        buckets = range.bucket_count(granularity),
        "computing report payload"
    );

    let payload = match request.domain {
        ReportDomain::Overview => {
            let previous = range.preceding();
            let (stats, votes_now, votes_prev, payments_now, payments_prev) =
                thread::scope(|s| {
                    let stats = s.spawn(|| agg.overview(range, scope));
                    let votes_now = s.spawn(|| agg.vote_count(range, scope));
                    let votes_prev = s.spawn(|| agg.vote_count(&previous, scope));
                    let payments_now = s.spawn(|| agg.payment_count(range, scope));
                    let payments_prev = s.spawn(|| agg.payment_count(&previous, scope));
                    (
                        join_section("overview_stats", stats),
                        join_section("vote_count", votes_now),
                        join_section("vote_count_previous", votes_prev),
                        join_section("payment_count", payments_now),
                        join_section("payment_count_previous", payments_prev),
                    )
                });

            DomainPayload::Overview(OverviewReport {
                stats,
                vote_growth_pct: growth_pct(votes_now as f64, votes_prev as f64),
                payment_growth_pct: growth_pct(payments_now as f64, payments_prev as f64),
            })
        }

        ReportDomain::Voting => {
            let (totals, series) = thread::scope(|s| {
                let totals = s.spawn(|| agg.vote_totals(range, scope));
                let series = s.spawn(|| agg.vote_series(range, scope));
                (
                    join_section("vote_totals", totals),
                    join_section("vote_series", series),
                )
            });

            // Chi-square flag on the leading candidate's weighted share.
            let leading_significance = totals
                .by_candidate
                .first()
                .map(|leader| chi_square_flag(leader.total, totals.weighted_votes))
                .unwrap_or(1.0);

            let anomalies = detector.detect(METRIC_VOTE_COUNT, &series);
            DomainPayload::Voting(VotingReport {
                stats: totals.into_stats(series),
                leading_significance,
                anomaly_score: AnomalyDetector::score(&anomalies),
                anomalies,
            })
        }

        ReportDomain::Payments => {
            let (totals, series) = thread::scope(|s| {
                let totals = s.spawn(|| agg.payment_totals(range, scope));
                let series = s.spawn(|| agg.payment_series(range, scope));
                (
                    join_section("payment_totals", totals),
                    join_section("payment_series", series),
                )
            });

            let anomalies = detector.detect(METRIC_PAYMENT_AMOUNT, &series);
            DomainPayload::Payments(PaymentReport {
                stats: totals.into_stats(series),
                anomalies,
            })
        }

        ReportDomain::Anomalies => {
            let (votes, payments) = fetch_metric_series(&agg, range, scope);
            let mut records: Vec<AnomalyRecord> = detector.detect(METRIC_VOTE_COUNT, &votes);
            records.extend(detector.detect(METRIC_PAYMENT_AMOUNT, &payments));
            DomainPayload::Anomalies(records)
        }

        ReportDomain::Forecasts => {
            let (votes, payments) = fetch_metric_series(&agg, range, scope);
            let smoother = config.smoother();
            let horizon = config.forecast_horizon;
            let labels = future_labels(granularity, range, horizon);

            let mut forecasts = BTreeMap::new();
            forecasts.insert(
                METRIC_VOTE_COUNT.to_string(),
                forecast_points(&smoother.forecast(&votes.values(), horizon), &labels),
            );
            forecasts.insert(
                METRIC_PAYMENT_AMOUNT.to_string(),
                forecast_points(&smoother.forecast(&payments.values(), horizon), &labels),
            );
            DomainPayload::Forecasts(forecasts)
        }
    };

    Ok(payload)
}

/// Fetch the vote-count and settled-amount series on parallel tasks.
fn fetch_metric_series(
    agg: &Aggregator<'_>,
    range: &DateRange,
    scope: &Scope,
) -> (TimeSeries, TimeSeries) {
    thread::scope(|s| {
        let votes = s.spawn(|| agg.vote_series(range, scope));
        let payments = s.spawn(|| agg.payment_series(range, scope));
        (
            join_section("vote_series", votes),
            join_section("payment_series", payments),
        )
    })
}

/// Labels for the `horizon` buckets following the range.
fn future_labels(granularity: Granularity, range: &DateRange, horizon: usize) -> Vec<String> {
    let mut cursor = granularity
        .iter_buckets(range)
        .last()
        .copied()
        .unwrap_or_else(|| granularity.truncate(range.start));
    (0..horizon)
        .map(|_| {
            cursor = granularity.advance(cursor);
            granularity.label(cursor)
        })
        .collect()
}

fn forecast_points(predictions: &[f64], labels: &[String]) -> Vec<ForecastPoint> {
    predictions
        .iter()
        .zip(labels)
        .map(|(predicted, period)| ForecastPoint {
            period: period.clone(),
            predicted: *predicted,
        })
        .collect()
}
