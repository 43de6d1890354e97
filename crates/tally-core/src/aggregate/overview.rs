//! Cross-cutting entity counts and the system-health score.

use super::Aggregator;
use crate::store::{EventPhase, Filter, RecordKind};
use tally_common::{DateRange, OverviewStats, Result, Scope};

/// System-health score from event lifecycle counts.
///
/// `50·(active/total) + 50·(completed/total)`, 0 when there are no events.
/// This is the single definition; the report layer must not reimplement it.
pub fn health_score(active: u64, completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    50.0 * (active as f64 / total) + 50.0 * (completed as f64 / total)
}

impl<'a> Aggregator<'a> {
    /// Entity counts in range plus the health score.
    pub fn overview(&self, range: &DateRange, scope: &Scope) -> Result<OverviewStats> {
        let store = self.store();
        let total_events = store.count(RecordKind::Event, range, scope, &Filter::none())?;
        let active_events = store.count(
            RecordKind::Event,
            range,
            scope,
            &Filter::with_phase(EventPhase::Active),
        )?;
        let completed_events = store.count(
            RecordKind::Event,
            range,
            scope,
            &Filter::with_phase(EventPhase::Completed),
        )?;

        Ok(OverviewStats {
            total_events,
            active_events,
            completed_events,
            total_votes: store.count(RecordKind::Vote, range, scope, &Filter::none())?,
            total_payments: store.count(RecordKind::Payment, range, scope, &Filter::none())?,
            total_users: store.count(RecordKind::User, range, scope, &Filter::none())?,
            total_candidates: store.count(RecordKind::Candidate, range, scope, &Filter::none())?,
            health_score: health_score(active_events, completed_events, total_events),
        })
    }
}
