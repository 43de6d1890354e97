//! Outlier detection over bucket series.
//!
//! Each bucket is scored against the population mean/stddev of the other
//! buckets (leave-one-out) and flagged when |z| crosses the threshold.
//!
//! Known limitation: the baseline is still global. One extreme bucket
//! inflates the stddev every *other* bucket is judged against, so in short
//! series a second, milder anomaly can go unflagged.

use tally_common::{AnomalyRecord, TimeSeries};
use tally_math::{peer_z_scores, ANOMALY_Z_THRESHOLD};

/// Global-threshold z-score detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    threshold: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        AnomalyDetector {
            threshold: ANOMALY_Z_THRESHOLD,
        }
    }
}

impl AnomalyDetector {
    /// Detector with an explicit |z| threshold.
    pub fn new(threshold: f64) -> Self {
        AnomalyDetector { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Flag every bucket whose |z| exceeds the threshold.
    ///
    /// Constant and near-constant series yield no records; the zero-stddev
    /// guard in the scoring keeps the math finite.
    pub fn detect(&self, metric: &str, series: &TimeSeries) -> Vec<AnomalyRecord> {
        let values = series.values();
        let scores = peer_z_scores(&values);

        series
            .points()
            .iter()
            .zip(scores)
            .filter(|(_, z)| z.abs() > self.threshold)
            .map(|((bucket, value), z)| AnomalyRecord {
                metric: metric.to_string(),
                bucket: bucket.clone(),
                z_score: z,
                value: *value,
            })
            .collect()
    }

    /// Largest flagged |z|, or 0.0 when nothing was flagged.
    pub fn score(records: &[AnomalyRecord]) -> f64 {
        records
            .iter()
            .map(|r| r.z_score.abs())
            .fold(0.0_f64, f64::max)
    }
}
