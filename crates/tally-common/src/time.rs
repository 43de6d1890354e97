//! Date ranges, bucket granularities, and time series.
//!
//! All timestamps are UTC. A bucket is identified by its start instant and
//! rendered as a zero-padded label so that lexicographic order on labels is
//! chronological order. The aggregator zero-fills every bucket in a range so
//! downstream math never has to reason about gaps.

use crate::error::{Error, Result};
use crate::id::{CategoryId, EventId};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Create a range, rejecting `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidDateRange { start, end });
        }
        Ok(DateRange { start, end })
    }

    /// Length of the range.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The equal-length window immediately before this one, used for
    /// growth-rate comparisons.
    pub fn preceding(&self) -> DateRange {
        DateRange {
            start: self.start - self.duration(),
            end: self.start,
        }
    }

    /// Whether a timestamp falls inside the range.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Number of buckets of the given granularity covering the range.
    pub fn bucket_count(&self, granularity: Granularity) -> usize {
        granularity.iter_buckets(self).len()
    }
}

/// Optional narrowing of an aggregation to one event and/or category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
}

impl Scope {
    /// Unscoped: every record in range matches.
    pub fn all() -> Self {
        Scope::default()
    }

    /// Scope to a single event.
    pub fn for_event(event_id: impl Into<EventId>) -> Self {
        Scope {
            event_id: Some(event_id.into()),
            category_id: None,
        }
    }

    /// Scope to a single category.
    pub fn for_category(category_id: impl Into<CategoryId>) -> Self {
        Scope {
            event_id: None,
            category_id: Some(category_id.into()),
        }
    }
}

/// Fixed bucket width for time aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hour,
    Day,
    Month,
}

impl Granularity {
    /// Floor a timestamp to the start of its containing bucket.
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let n = ts.naive_utc();
        let floored = match self {
            Granularity::Hour => n
                .date()
                .and_hms_opt(n.hour(), 0, 0)
                .expect("hour-of-day is valid"),
            Granularity::Day => n.date().and_hms_opt(0, 0, 0).expect("midnight is valid"),
            Granularity::Month => NaiveDate::from_ymd_opt(n.year(), n.month(), 1)
                .expect("first of month is valid")
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid"),
        };
        Utc.from_utc_datetime(&floored)
    }

    /// Start of the bucket following the one containing `ts`.
    pub fn advance(&self, bucket_start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Granularity::Hour => bucket_start + Duration::hours(1),
            Granularity::Day => bucket_start + Duration::days(1),
            Granularity::Month => {
                let (year, month) = if bucket_start.month() == 12 {
                    (bucket_start.year() + 1, 1)
                } else {
                    (bucket_start.year(), bucket_start.month() + 1)
                };
                let first = NaiveDate::from_ymd_opt(year, month, 1)
                    .expect("first of month is valid")
                    .and_hms_opt(0, 0, 0)
                    .expect("midnight is valid");
                Utc.from_utc_datetime(&first)
            }
        }
    }

    /// Render the bucket key for a bucket start.
    ///
    /// Labels are zero-padded so lexicographic order matches time order.
    pub fn label(&self, bucket_start: DateTime<Utc>) -> String {
        match self {
            Granularity::Hour => bucket_start.format("%Y-%m-%d %H:00").to_string(),
            Granularity::Day => bucket_start.format("%Y-%m-%d").to_string(),
            Granularity::Month => bucket_start.format("%Y-%m").to_string(),
        }
    }

    /// Every bucket start covering the range, ascending.
    pub fn iter_buckets(&self, range: &DateRange) -> Vec<DateTime<Utc>> {
        let mut buckets = Vec::new();
        let mut cursor = self.truncate(range.start);
        while cursor < range.end {
            buckets.push(cursor);
            cursor = self.advance(cursor);
        }
        buckets
    }
}

/// Ordered series of `(bucket label, value)` pairs.
///
/// Invariants: labels ascend strictly (no duplicates). The aggregator
/// builds series zero-filled over the whole requested range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    points: Vec<(String, f64)>,
}

impl TimeSeries {
    /// Build a series from unordered points, sorting by label.
    ///
    /// Duplicate labels are rejected: two values for one bucket means the
    /// aggregation upstream is broken.
    pub fn new(mut points: Vec<(String, f64)>) -> Result<Self> {
        points.sort_by(|a, b| a.0.cmp(&b.0));
        for pair in points.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(Error::DegenerateInput {
                    what: format!("duplicate bucket key: {}", pair[0].0),
                });
            }
        }
        Ok(TimeSeries { points })
    }

    /// Build a zero-filled series over explicit bucket labels, taking
    /// observed values where present.
    ///
    /// `labels` must already be ascending (as produced by
    /// [`Granularity::iter_buckets`]).
    pub fn zero_filled(labels: Vec<String>, observed: &HashMap<String, f64>) -> Self {
        let points = labels
            .into_iter()
            .map(|label| {
                let value = observed.get(&label).copied().unwrap_or(0.0);
                (label, value)
            })
            .collect();
        TimeSeries { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The `(label, value)` pairs in ascending label order.
    pub fn points(&self) -> &[(String, f64)] {
        &self.points
    }

    /// Values only, in bucket order, for the math layer.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    /// Sum of all values.
    pub fn total(&self) -> f64 {
        self.points.iter().map(|(_, v)| v).sum()
    }
}
