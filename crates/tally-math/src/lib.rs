//! Tally statistical primitives.
//!
//! Pure, deterministic math shared by the analytics engine: proportion
//! confidence intervals, significance flags, z-score anomaly scoring, and
//! Holt-Winters exponential smoothing. No I/O, no logging.

pub mod estimators;
pub mod forecast;

pub use estimators::{
    chi_square_flag, peer_z_scores, population_stats, wilson_interval, wilson_interval_95,
    z_score, z_score_anomaly, ConfidenceInterval, ANOMALY_Z_THRESHOLD, CHI_SQUARE_CRITICAL_1DF,
    Z_95,
};
pub use forecast::HoltWinters;
