//! Proportion and outlier estimators.
//!
//! The voting analytics report proportions from small, sometimes extreme
//! samples (a candidate with 3 of 3 votes), so the confidence interval is
//! the Wilson score interval rather than the normal approximation:
//!
//! centre = (p̂ + z²/2n) / (1 + z²/n)
//! half   = z·sqrt(p̂(1−p̂)/n + z²/4n²) / (1 + z²/n)
//!
//! Outlier scoring uses leave-one-out population z-scores, so a spike is
//! judged against its peers rather than a baseline it contributes to.

use serde::{Deserialize, Serialize};

/// z value for a 95% two-sided confidence level.
pub const Z_95: f64 = 1.96;

/// Chi-square critical value at p = 0.05 for 1 degree of freedom.
pub const CHI_SQUARE_CRITICAL_1DF: f64 = 3.841;

/// z-score magnitude above which a bucket is considered anomalous.
pub const ANOMALY_Z_THRESHOLD: f64 = 3.0;

/// Proxy returned by [`chi_square_flag`] when the statistic is significant.
const SIGNIFICANT_PROXY: f64 = 0.05;

/// Proxy returned by [`chi_square_flag`] when the statistic is not significant.
const NOT_SIGNIFICANT_PROXY: f64 = 1.0;

/// Confidence interval for a binomial proportion.
///
/// Invariant: `0.0 <= lower <= upper <= 1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    /// The degenerate zero interval, used when there is no data.
    pub const ZERO: ConfidenceInterval = ConfidenceInterval {
        lower: 0.0,
        upper: 0.0,
    };

    /// Width of the interval.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Whether a proportion falls inside the interval (inclusive).
    pub fn contains(&self, p: f64) -> bool {
        p >= self.lower && p <= self.upper
    }
}

/// Wilson score interval for `successes` out of `total` trials.
///
/// Returns the zero interval when `total` is 0. The bounds are clamped into
/// [0, 1] so the invariant holds even at extreme proportions.
///
/// # Arguments
/// * `successes` - Number of successes, expected <= total
/// * `total` - Number of trials
/// * `z` - Confidence level as a z value (1.96 for 95%)
pub fn wilson_interval(successes: u64, total: u64, z: f64) -> ConfidenceInterval {
    if total == 0 {
        return ConfidenceInterval::ZERO;
    }

    let n = total as f64;
    let p_hat = (successes.min(total) as f64) / n;
    let z2 = z * z;

    let denom = 1.0 + z2 / n;
    let centre = (p_hat + z2 / (2.0 * n)) / denom;
    let half = z * (p_hat * (1.0 - p_hat) / n + z2 / (4.0 * n * n)).sqrt() / denom;

    ConfidenceInterval {
        lower: (centre - half).clamp(0.0, 1.0),
        upper: (centre + half).clamp(0.0, 1.0),
    }
}

/// Wilson score interval at the 95% confidence level.
pub fn wilson_interval_95(successes: u64, total: u64) -> ConfidenceInterval {
    wilson_interval(successes, total, Z_95)
}

/// Coarse chi-square significance flag for a single observed count against
/// an expected even split of `total`.
///
/// Computes `(observed − total/2)² / (total/2)` and compares it with the
/// 1-df critical value 3.841. Returns 0.05 when significant, 1.0 otherwise.
///
/// This is a two-valued significance proxy, not a p-value from the
/// chi-square CDF; callers should treat it as a flag only.
pub fn chi_square_flag(observed: f64, total: f64) -> f64 {
    if !(total > 0.0) || observed.is_nan() {
        return NOT_SIGNIFICANT_PROXY;
    }
    let expected = total / 2.0;
    let diff = observed - expected;
    let statistic = diff * diff / expected;
    if statistic > CHI_SQUARE_CRITICAL_1DF {
        SIGNIFICANT_PROXY
    } else {
        NOT_SIGNIFICANT_PROXY
    }
}

/// Population mean and standard deviation of a series.
///
/// Returns (0, 0) for an empty series. Uses the population (1/N) variance;
/// the anomaly scan treats the series as the whole population of buckets.
pub fn population_stats(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// z-score of a value against a mean and standard deviation.
///
/// A non-positive (or NaN) stddev is treated as 1.0 so constant series
/// never divide by zero.
pub fn z_score(value: f64, mean: f64, stddev: f64) -> f64 {
    let sd = if stddev > 0.0 { stddev } else { 1.0 };
    (value - mean) / sd
}

/// Per-point z-scores, each computed against the population stats of the
/// remaining points (leave-one-out).
///
/// A point cannot inflate its own baseline: with global stats the largest
/// attainable |z| in an n-point series is bounded near sqrt(n), so a short
/// series could never cross the 3.0 threshold no matter how extreme the
/// spike. Series of length < 2 score 0.0 everywhere.
pub fn peer_z_scores(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return vec![0.0; values.len()];
    }
    let mut rest = Vec::with_capacity(values.len() - 1);
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            rest.clear();
            rest.extend(
                values
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, w)| *w),
            );
            let (mean, stddev) = population_stats(&rest);
            z_score(*v, mean, stddev)
        })
        .collect()
}

/// Anomaly score for a whole series.
///
/// Returns the largest leave-one-out |z| over the series if any point
/// exceeds the 3.0 threshold, else 0.0. Constant series score 0.0,
/// never NaN.
pub fn z_score_anomaly(values: &[f64]) -> f64 {
    let max_abs_z = peer_z_scores(values)
        .iter()
        .map(|z| z.abs())
        .fold(0.0_f64, f64::max);
    if max_abs_z > ANOMALY_Z_THRESHOLD {
        max_abs_z
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn wilson_zero_total_is_zero_interval() {
        assert_eq!(wilson_interval(0, 0, Z_95), ConfidenceInterval::ZERO);
    }

    #[test]
    fn wilson_half_proportion_is_symmetric() {
        let ci = wilson_interval(50, 100, Z_95);
        assert!(approx_eq(ci.lower + ci.upper, 1.0, 1e-9));
        assert!(ci.contains(0.5));
    }

    #[test]
    fn wilson_extreme_proportions_stay_in_unit_interval() {
        let all = wilson_interval(3, 3, Z_95);
        assert!(all.upper <= 1.0);
        assert!(all.lower > 0.0, "all-successes lower bound should be > 0");

        let none = wilson_interval(0, 3, Z_95);
        assert!(none.lower >= 0.0);
        assert!(none.upper < 1.0, "no-successes upper bound should be < 1");
    }

    #[test]
    fn wilson_known_value() {
        // 8/10 at 95%: textbook Wilson bounds ~(0.490, 0.943).
        let ci = wilson_interval(8, 10, Z_95);
        assert!(approx_eq(ci.lower, 0.490, 5e-3), "lower = {}", ci.lower);
        assert!(approx_eq(ci.upper, 0.943, 5e-3), "upper = {}", ci.upper);
    }

    #[test]
    fn chi_square_flags_lopsided_split() {
        // 90 of 100 vs expected 50: statistic = 1600/50 = 32 > 3.841.
        assert_eq!(chi_square_flag(90.0, 100.0), 0.05);
    }

    #[test]
    fn chi_square_passes_near_even_split() {
        // 51 of 100: statistic = 1/50 = 0.02.
        assert_eq!(chi_square_flag(51.0, 100.0), 1.0);
        assert_eq!(chi_square_flag(0.0, 0.0), 1.0);
    }

    #[test]
    fn population_stats_basics() {
        let (mean, sd) = population_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!(approx_eq(mean, 5.0, 1e-12));
        assert!(approx_eq(sd, 2.0, 1e-12));
        assert_eq!(population_stats(&[]), (0.0, 0.0));
    }

    #[test]
    fn z_score_guards_zero_stddev() {
        assert_eq!(z_score(5.0, 5.0, 0.0), 0.0);
        assert_eq!(z_score(8.0, 5.0, 0.0), 3.0);
    }

    #[test]
    fn constant_series_scores_zero() {
        let score = z_score_anomaly(&[7.0, 7.0, 7.0, 7.0]);
        assert_eq!(score, 0.0);
        assert!(!score.is_nan());
    }

    #[test]
    fn spike_scores_positive() {
        // Baseline for the spike is [5,5,5,5]: stddev 0 guards to 1, so
        // z = 495 and the series is clearly anomalous.
        let score = z_score_anomaly(&[5.0, 5.0, 5.0, 5.0, 500.0]);
        assert!(score > ANOMALY_Z_THRESHOLD, "score = {}", score);
    }

    #[test]
    fn mild_variation_scores_zero() {
        assert_eq!(z_score_anomaly(&[10.0, 11.0, 9.0, 10.0, 12.0]), 0.0);
    }

    #[test]
    fn peer_z_scores_short_series() {
        assert_eq!(peer_z_scores(&[]), Vec::<f64>::new());
        assert_eq!(peer_z_scores(&[42.0]), vec![0.0]);
    }
}
