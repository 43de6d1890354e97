//! Holt-Winters double exponential smoothing (level + trend, no seasonality).
//!
//! The recurrence for each observed value v after the first two:
//!
//! level' = α·v + (1−α)·(level + trend)
//! trend' = β·(level' − level) + (1−β)·trend
//!
//! seeded with level₀ = v[0], trend₀ = v[1] − v[0]. Forecasts extrapolate
//! the final level linearly: ŷ(i) = level + i·trend, floored at 0 because
//! every forecast metric here is a count or a revenue sum.

/// Default level smoothing factor.
pub const DEFAULT_ALPHA: f64 = 0.5;

/// Default trend smoothing factor.
pub const DEFAULT_BETA: f64 = 0.3;

/// Default number of periods to forecast.
pub const DEFAULT_HORIZON: usize = 3;

/// Double exponential smoother with fixed smoothing factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoltWinters {
    alpha: f64,
    beta: f64,
}

impl Default for HoltWinters {
    fn default() -> Self {
        HoltWinters {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
        }
    }
}

impl HoltWinters {
    /// Create a smoother with explicit factors.
    ///
    /// Returns `None` unless `0 < alpha <= 1` and `0 <= beta <= 1`.
    pub fn new(alpha: f64, beta: f64) -> Option<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return None;
        }
        if !(0.0..=1.0).contains(&beta) {
            return None;
        }
        Some(HoltWinters { alpha, beta })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Run the smoothing recurrence over a series.
    ///
    /// Returns the final `(level, trend)`, or `None` when the series is too
    /// short to seed the trend (length < 2).
    pub fn smooth(&self, values: &[f64]) -> Option<(f64, f64)> {
        if values.len() < 2 {
            return None;
        }
        let mut level = values[0];
        let mut trend = values[1] - values[0];
        for &v in &values[2..] {
            let new_level = self.alpha * v + (1.0 - self.alpha) * (level + trend);
            let new_trend = self.beta * (new_level - level) + (1.0 - self.beta) * trend;
            level = new_level;
            trend = new_trend;
        }
        Some((level, trend))
    }

    /// Forecast `horizon` future values from the end of the series.
    ///
    /// Series shorter than 2 yield an empty forecast rather than an error;
    /// the caller reports "insufficient history" sections as empty. Every
    /// prediction is clamped to be non-negative.
    pub fn forecast(&self, values: &[f64], horizon: usize) -> Vec<f64> {
        let Some((level, trend)) = self.smooth(values) else {
            return Vec::new();
        };
        (1..=horizon)
            .map(|i| (level + i as f64 * trend).max(0.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn constant_series_forecasts_constant() {
        let hw = HoltWinters::default();
        let forecast = hw.forecast(&[10.0, 10.0, 10.0, 10.0], 3);
        assert_eq!(forecast.len(), 3);
        for p in &forecast {
            assert!(approx_eq(*p, 10.0, 1e-9), "predicted {}", p);
            assert!(*p >= 0.0);
        }
    }

    #[test]
    fn short_series_yields_empty_forecast() {
        let hw = HoltWinters::default();
        assert!(hw.forecast(&[], 3).is_empty());
        assert!(hw.forecast(&[42.0], 3).is_empty());
    }

    #[test]
    fn two_points_seed_level_and_trend() {
        // No values beyond the seed: level = v0, trend = v1 - v0.
        let hw = HoltWinters::default();
        let forecast = hw.forecast(&[10.0, 14.0], 3);
        assert_eq!(forecast.len(), 3);
        assert!(approx_eq(forecast[0], 14.0, 1e-12));
        assert!(approx_eq(forecast[1], 18.0, 1e-12));
        assert!(approx_eq(forecast[2], 22.0, 1e-12));
    }

    #[test]
    fn rising_series_forecasts_rising() {
        let hw = HoltWinters::default();
        let forecast = hw.forecast(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert_eq!(forecast.len(), 3);
        assert!(forecast[0] > 50.0);
        assert!(forecast[1] > forecast[0]);
        assert!(forecast[2] > forecast[1]);
    }

    #[test]
    fn falling_series_clamps_at_zero() {
        let hw = HoltWinters::default();
        let forecast = hw.forecast(&[100.0, 60.0, 20.0, 5.0], 5);
        assert_eq!(forecast.len(), 5);
        for p in &forecast {
            assert!(*p >= 0.0, "predicted {}", p);
        }
        assert_eq!(*forecast.last().unwrap(), 0.0);
    }

    #[test]
    fn invalid_factors_rejected() {
        assert!(HoltWinters::new(0.0, 0.3).is_none());
        assert!(HoltWinters::new(1.1, 0.3).is_none());
        assert!(HoltWinters::new(0.5, -0.1).is_none());
        assert!(HoltWinters::new(0.5, 1.1).is_none());
        assert!(HoltWinters::new(1.0, 0.0).is_some());
    }
}
