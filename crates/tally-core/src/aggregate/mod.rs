//! Time-bucket aggregation against the data-access collaborator.
//!
//! The aggregator reshapes the store's count/group-by/distinct primitives
//! into the report payload types. Every bucket series it returns is
//! zero-filled over the whole requested range and ascending, so the math
//! layer never sees gaps or unordered input.

mod overview;
mod payments;
mod voting;

pub use overview::health_score;
pub use payments::PaymentTotals;
pub use voting::VoteTotals;

use crate::store::{DataStore, Filter, GroupBy, RecordKind, SumField};
use std::collections::HashMap;
use tally_common::{DateRange, Granularity, Result, Scope, TimeSeries};

/// Growth of a metric vs the preceding window, in percent.
///
/// 0 when there is no previous baseline to compare against.
pub fn growth_pct(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Bucketed aggregation over one store at one granularity.
pub struct Aggregator<'a> {
    store: &'a dyn DataStore,
    granularity: Granularity,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a dyn DataStore, granularity: Granularity) -> Self {
        Aggregator { store, granularity }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub(crate) fn store(&self) -> &'a dyn DataStore {
        self.store
    }

    /// Vote records in range, for growth comparisons.
    pub fn vote_count(&self, range: &DateRange, scope: &Scope) -> Result<u64> {
        Ok(self
            .store
            .count(RecordKind::Vote, range, scope, &Filter::none())?)
    }

    /// Payment records in range, for growth comparisons.
    pub fn payment_count(&self, range: &DateRange, scope: &Scope) -> Result<u64> {
        Ok(self
            .store
            .count(RecordKind::Payment, range, scope, &Filter::none())?)
    }

    /// Zero-filled bucket series for one record kind.
    ///
    /// Buckets carry the group count, or the summed field when `sum` is
    /// given.
    pub(crate) fn bucket_series(
        &self,
        kind: RecordKind,
        range: &DateRange,
        scope: &Scope,
        filter: &Filter,
        sum: Option<SumField>,
    ) -> Result<TimeSeries> {
        let rows = self.store.grouped(
            kind,
            range,
            scope,
            filter,
            GroupBy::Bucket(self.granularity),
            sum,
        )?;

        let observed: HashMap<String, f64> = rows
            .into_iter()
            .map(|row| {
                let value = if sum.is_some() { row.sum } else { row.count as f64 };
                (row.key, value)
            })
            .collect();

        let labels = self
            .granularity
            .iter_buckets(range)
            .into_iter()
            .map(|bucket| self.granularity.label(bucket))
            .collect();

        Ok(TimeSeries::zero_filled(labels, &observed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_against_zero_baseline_is_zero() {
        assert_eq!(growth_pct(150.0, 0.0), 0.0);
    }

    #[test]
    fn growth_matches_percentage_change() {
        assert_eq!(growth_pct(150.0, 100.0), 50.0);
        assert_eq!(growth_pct(75.0, 100.0), -25.0);
        assert_eq!(growth_pct(100.0, 100.0), 0.0);
    }
}
