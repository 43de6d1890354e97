//! Voting aggregation: totals, breakdowns, and the vote bucket series.

use super::Aggregator;
use crate::store::{DistinctField, Filter, GroupBy, GroupRow, RecordKind, SumField};
use tally_common::{BreakdownEntry, DateRange, Result, Scope, TimeSeries, VotingStats};
use tally_math::wilson_interval_95;

/// Voting totals and breakdowns, without the bucket series.
///
/// The assembler fetches totals and series on separate tasks so either can
/// fail (and be defaulted) independently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoteTotals {
    pub total_votes: u64,
    pub unique_voters: u64,
    pub weighted_votes: f64,
    pub by_candidate: Vec<BreakdownEntry>,
    pub by_category: Vec<BreakdownEntry>,
}

impl VoteTotals {
    /// Attach a bucket series to form the full payload stats.
    pub fn into_stats(self, series: TimeSeries) -> VotingStats {
        VotingStats {
            total_votes: self.total_votes,
            unique_voters: self.unique_voters,
            weighted_votes: self.weighted_votes,
            by_candidate: self.by_candidate,
            by_category: self.by_category,
            series,
        }
    }
}

/// Credit-weighted share breakdown from group rows.
///
/// Shares are percentages of the grand total over the whole range; when the
/// grand total is 0 every entry (and the divide) is skipped. Entries are
/// ordered leading-first.
fn breakdown(rows: Vec<GroupRow>) -> Vec<BreakdownEntry> {
    let grand_total: f64 = rows.iter().map(|r| r.sum).sum();
    if grand_total <= 0.0 {
        return Vec::new();
    }

    let mut entries: Vec<BreakdownEntry> = rows
        .into_iter()
        .map(|row| BreakdownEntry {
            share_pct: row.sum / grand_total * 100.0,
            interval: wilson_interval_95(row.sum.round() as u64, grand_total.round() as u64),
            key: row.key,
            total: row.sum,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    entries
}

impl<'a> Aggregator<'a> {
    /// Vote totals, distinct voters, credit-weighted total, and the
    /// per-candidate / per-category breakdowns.
    pub fn vote_totals(&self, range: &DateRange, scope: &Scope) -> Result<VoteTotals> {
        let total_votes = self
            .store()
            .count(RecordKind::Vote, range, scope, &Filter::none())?;
        let unique_voters = self.store().distinct_count(
            RecordKind::Vote,
            range,
            scope,
            DistinctField::VoterIdentity,
        )?;

        let by_candidate_rows = self.store().grouped(
            RecordKind::Vote,
            range,
            scope,
            &Filter::none(),
            GroupBy::Candidate,
            Some(SumField::VoteCredits),
        )?;
        let by_category_rows = self.store().grouped(
            RecordKind::Vote,
            range,
            scope,
            &Filter::none(),
            GroupBy::Category,
            Some(SumField::VoteCredits),
        )?;

        let weighted_votes: f64 = by_candidate_rows.iter().map(|r| r.sum).sum();

        Ok(VoteTotals {
            total_votes,
            unique_voters,
            weighted_votes,
            by_candidate: breakdown(by_candidate_rows),
            by_category: breakdown(by_category_rows),
        })
    }

    /// Zero-filled vote counts per bucket.
    pub fn vote_series(&self, range: &DateRange, scope: &Scope) -> Result<TimeSeries> {
        self.bucket_series(RecordKind::Vote, range, scope, &Filter::none(), None)
    }

    /// Full voting stats in one call, for direct library use.
    pub fn voting(&self, range: &DateRange, scope: &Scope) -> Result<VotingStats> {
        let totals = self.vote_totals(range, scope)?;
        let series = self.vote_series(range, scope)?;
        Ok(totals.into_stats(series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CandidateRecord, EventRecord, MemoryStore, VoteRecord};
    use chrono::{DateTime, TimeZone, Utc};
    use tally_common::{CandidateId, CategoryId, EventId, Granularity};

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap()
    }

    fn vote(d: u32, h: u32, candidate: &str, category: &str, voter: &str, credits: u32) -> VoteRecord {
        VoteRecord {
            at: at(d, h),
            event_id: EventId::from("ev-1"),
            category_id: CategoryId::from(category),
            candidate_id: CandidateId::from(candidate),
            voter_ip: voter.to_string(),
            credits,
        }
    }

    fn store_with_votes() -> MemoryStore {
        let mut store = MemoryStore::new();
        // A: 30 credits, B: 20 credits, spread over the week.
        for i in 0..30 {
            store.add_vote(vote(1 + (i % 7), 10, "cand-a", "cat-1", &format!("10.0.0.{i}"), 1));
        }
        for i in 0..20 {
            store.add_vote(vote(1 + (i % 7), 14, "cand-b", "cat-1", &format!("10.0.1.{i}"), 1));
        }
        store
    }

    fn week() -> DateRange {
        DateRange::new(at(1, 0), at(8, 0)).unwrap()
    }

    #[test]
    fn shares_split_60_40() {
        let store = store_with_votes();
        let agg = Aggregator::new(&store, Granularity::Day);
        let stats = agg.voting(&week(), &Scope::all()).unwrap();

        assert_eq!(stats.total_votes, 50);
        assert_eq!(stats.unique_voters, 50);
        assert_eq!(stats.weighted_votes, 50.0);

        assert_eq!(stats.by_candidate.len(), 2);
        let a = &stats.by_candidate[0];
        let b = &stats.by_candidate[1];
        assert_eq!(a.key, "cand-a");
        assert!((a.share_pct - 60.0).abs() < 1e-9);
        assert_eq!(b.key, "cand-b");
        assert!((b.share_pct - 40.0).abs() < 1e-9);

        // Shares sum to 100 when the grand total is positive.
        let sum: f64 = stats.by_candidate.iter().map(|e| e.share_pct).sum();
        assert!((sum - 100.0).abs() < 1e-9);

        // Wilson interval brackets the observed share.
        assert!(a.interval.contains(0.6));
        assert!(a.interval.lower > 0.4 && a.interval.upper < 0.8);
    }

    #[test]
    fn empty_range_has_no_breakdown_entries() {
        let store = MemoryStore::new();
        let agg = Aggregator::new(&store, Granularity::Day);
        let stats = agg.voting(&week(), &Scope::all()).unwrap();

        assert_eq!(stats.total_votes, 0);
        assert!(stats.by_candidate.is_empty());
        assert!(stats.by_category.is_empty());
        // Series is still zero-filled over every bucket in range.
        assert_eq!(stats.series.len(), 7);
        assert_eq!(stats.series.total(), 0.0);
    }

    #[test]
    fn credits_weight_the_breakdown() {
        let mut store = MemoryStore::new();
        store.add_vote(vote(1, 9, "cand-a", "cat-1", "10.0.0.1", 5));
        store.add_vote(vote(2, 9, "cand-b", "cat-1", "10.0.0.2", 1));

        let agg = Aggregator::new(&store, Granularity::Day);
        let totals = agg.vote_totals(&week(), &Scope::all()).unwrap();

        assert_eq!(totals.total_votes, 2);
        assert_eq!(totals.weighted_votes, 6.0);
        let a = &totals.by_candidate[0];
        assert_eq!(a.key, "cand-a");
        assert!((a.share_pct - 5.0 / 6.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn series_buckets_are_zero_filled_and_ascending() {
        let mut store = MemoryStore::new();
        store.add_vote(vote(2, 9, "cand-a", "cat-1", "10.0.0.1", 1));
        store.add_vote(vote(2, 17, "cand-a", "cat-1", "10.0.0.2", 1));
        store.add_vote(vote(5, 9, "cand-b", "cat-1", "10.0.0.3", 1));

        let agg = Aggregator::new(&store, Granularity::Day);
        let series = agg.vote_series(&week(), &Scope::all()).unwrap();

        assert_eq!(series.len(), 7);
        assert_eq!(series.values(), vec![0.0, 2.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn scope_narrows_to_category() {
        let mut store = MemoryStore::new();
        store.add_vote(vote(1, 9, "cand-a", "cat-1", "10.0.0.1", 1));
        store.add_vote(vote(1, 9, "cand-b", "cat-2", "10.0.0.2", 1));
        store.add_candidate(CandidateRecord {
            id: CandidateId::from("cand-a"),
            event_id: EventId::from("ev-1"),
            created_at: at(1, 0),
        });
        store.add_event(EventRecord {
            id: EventId::from("ev-1"),
            starts: at(1, 0),
            ends: at(8, 0),
        });

        let agg = Aggregator::new(&store, Granularity::Day);
        let totals = agg
            .vote_totals(&week(), &Scope::for_category("cat-2"))
            .unwrap();
        assert_eq!(totals.total_votes, 1);
        assert_eq!(totals.by_candidate[0].key, "cand-b");
    }
}
