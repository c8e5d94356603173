//! Analyses: boolean verdicts per group.

use crate::aggregations::nearest_rank;
use crate::context::FunctionContext;
use crate::error::FunctionError;
use crate::function::{execute_analysis, Analysis, Argument, Function, FunctionKind};
use crate::types::{elapsed_millis, elapsed_seconds, GroupedSeries, TimeSeries};

/// `true` when the least-squares slope of the values over time is positive.
/// Fewer than two samples never trend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Trend;

impl Function for Trend {
    fn kind(&self) -> FunctionKind {
        FunctionKind::Trend
    }

    fn execute(&self, groups: &[GroupedSeries], ctx: &FunctionContext) {
        execute_analysis(self, groups, ctx)
    }
}

impl Trend {
    /// Least-squares slope in value units per second; `None` if undefined.
    pub fn slope(series: &TimeSeries) -> Option<f64> {
        let n = series.size();
        if n < 2 {
            return None;
        }
        // Center time on the first sample to keep the sums well conditioned
        let origin = series.timestamps()[0];
        let xs = series
            .timestamps()
            .iter()
            .map(|&t| elapsed_seconds(origin, t));
        let ys = series.values_as_array();

        let mean_x = xs.clone().sum::<f64>() / n as f64;
        let mean_y = ys.iter().sum::<f64>() / n as f64;

        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (x, &y) in xs.zip(ys) {
            sxy += (x - mean_x) * (y - mean_y);
            sxx += (x - mean_x) * (x - mean_x);
        }
        if sxx == 0.0 {
            return None;
        }
        Some(sxy / sxx)
    }
}

impl Analysis for Trend {
    fn analyze(&self, series: &TimeSeries) -> bool {
        Trend::slope(series).is_some_and(|slope| slope > 0.0)
    }
}

/// `true` when any value lies above `Q3 + 1.5 * IQR` (nearest-rank quartiles).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Outlier;

impl Function for Outlier {
    fn kind(&self) -> FunctionKind {
        FunctionKind::Outlier
    }

    fn execute(&self, groups: &[GroupedSeries], ctx: &FunctionContext) {
        execute_analysis(self, groups, ctx)
    }
}

impl Analysis for Outlier {
    fn analyze(&self, series: &TimeSeries) -> bool {
        let values = series.values_as_array();
        if values.is_empty() {
            return false;
        }
        let q1 = nearest_rank(values, 0.25);
        let q3 = nearest_rank(values, 0.75);
        let threshold = q3 + 1.5 * (q3 - q1);
        values.iter().any(|&v| v > threshold)
    }
}

/// Detects bursts: samples are bucketed into consecutive windows of `window_minutes`
/// starting at the first sample, and the verdict is `true` when the sample count grows
/// by more than `threshold` from one window to the next. Windows without samples count
/// as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frequency {
    window_minutes: i64,
    threshold: i64,
}

impl Frequency {
    pub fn new(window_minutes: i64, threshold: i64) -> Result<Self, FunctionError> {
        if window_minutes < 1 {
            return Err(FunctionError::invalid_argument(
                "frequency",
                format!("window must be at least 1 minute, got {}", window_minutes),
            ));
        }
        if threshold < 0 {
            return Err(FunctionError::invalid_argument(
                "frequency",
                format!("threshold must not be negative, got {}", threshold),
            ));
        }
        Ok(Frequency {
            window_minutes,
            threshold,
        })
    }

    /// `(window index, sample count)` for every non-empty window, in window order.
    fn window_counts(&self, series: &TimeSeries) -> Vec<(i128, i64)> {
        let Some(&start) = series.timestamps().first() else {
            return Vec::new();
        };
        let window = i128::from(self.window_minutes) * 60_000;

        let mut counts: Vec<(i128, i64)> = Vec::new();
        for &ts in series.timestamps() {
            let bucket = elapsed_millis(start, ts) / window;
            match counts.last_mut() {
                Some((last, count)) if *last == bucket => *count += 1,
                _ => counts.push((bucket, 1)),
            }
        }
        counts
    }
}

impl Function for Frequency {
    fn kind(&self) -> FunctionKind {
        FunctionKind::Frequency
    }

    fn arguments(&self) -> Vec<Argument> {
        vec![
            Argument::Integer(self.window_minutes),
            Argument::Integer(self.threshold),
        ]
    }

    fn execute(&self, groups: &[GroupedSeries], ctx: &FunctionContext) {
        execute_analysis(self, groups, ctx)
    }
}

impl Analysis for Frequency {
    fn analyze(&self, series: &TimeSeries) -> bool {
        self.window_counts(series).windows(2).any(|pair| {
            let (prev_bucket, prev_count) = pair[0];
            let (bucket, count) = pair[1];
            // A gap means an empty window sits in between; shrinking never triggers
            let previous = if bucket == prev_bucket + 1 { prev_count } else { 0 };
            count - previous > self.threshold
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JoinKey;

    const MINUTE: i64 = 60_000;

    #[test]
    fn test_trend() {
        let rising = TimeSeries::from_points(vec![(0, 1.0), (1000, 2.0), (2000, 2.5), (3000, 4.0)]);
        let falling = TimeSeries::from_points(vec![(0, 4.0), (1000, 3.0), (2000, 1.0)]);
        let flat = TimeSeries::from_points(vec![(0, 2.0), (1000, 2.0)]);

        assert!(Trend.analyze(&rising));
        assert!(!Trend.analyze(&falling));
        assert!(!Trend.analyze(&flat));
        assert!(!Trend.analyze(&TimeSeries::from_values(&[1.0])));
        assert!(!Trend.analyze(&TimeSeries::new()));

        let slope = Trend::slope(&TimeSeries::from_points(vec![(0, 0.0), (2000, 4.0)])).unwrap();
        assert!((slope - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_trend_extreme_timestamps() {
        let straddling = TimeSeries::from_points(vec![(-10, 1.0), (i64::MAX, 2.0)]);
        assert!(Trend.analyze(&straddling));

        let full = TimeSeries::from_points(vec![(i64::MIN, 3.0), (0, 2.0), (i64::MAX, 1.0)]);
        let slope = Trend::slope(&full).unwrap();
        assert!(slope.is_finite());
        assert!(slope < 0.0);
        assert!(!Trend.analyze(&full));
    }

    #[test]
    fn test_outlier() {
        let calm = TimeSeries::from_values(&[10.0, 11.0, 9.0, 10.0, 12.0, 10.0, 11.0, 9.0]);
        let spiky = TimeSeries::from_values(&[10.0, 11.0, 9.0, 10.0, 250.0, 10.0, 11.0, 9.0]);
        assert!(!Outlier.analyze(&calm));
        assert!(Outlier.analyze(&spiky));
        assert!(!Outlier.analyze(&TimeSeries::new()));
    }

    #[test]
    fn test_frequency() {
        let f = Frequency::new(5, 2).unwrap();

        // 1 sample in the first window, 2 in the second: growth of 1 is within threshold
        let steady = TimeSeries::from_points(vec![(0, 1.0), (6 * MINUTE, 1.0), (7 * MINUTE, 1.0)]);
        assert!(!f.analyze(&steady));

        // 1 sample then 4 samples: growth of 3 exceeds threshold
        let burst = TimeSeries::from_points(vec![
            (0, 1.0),
            (5 * MINUTE, 1.0),
            (6 * MINUTE, 1.0),
            (7 * MINUTE, 1.0),
            (8 * MINUTE, 1.0),
        ]);
        assert!(f.analyze(&burst));
        assert_eq!(f.window_counts(&burst), vec![(0, 1), (1, 4)]);

        assert!(!f.analyze(&TimeSeries::new()));
        assert!(Frequency::new(0, 1).is_err());
    }

    #[test]
    fn test_frequency_sparse_samples() {
        // Two samples ~3000 years apart: only the non-empty windows are tracked
        let f = Frequency::new(1, 0).unwrap();
        let sparse = TimeSeries::from_points(vec![(0, 1.0), (100_000_000_000_000, 1.0)]);
        assert_eq!(f.window_counts(&sparse).len(), 2);
        // 1 -> 0 -> 1 across the gap: growth of 1 exceeds a threshold of 0
        assert!(f.analyze(&sparse));
        assert!(!Frequency::new(1, 1).unwrap().analyze(&sparse));

        let full = TimeSeries::from_points(vec![(i64::MIN, 1.0), (i64::MAX, 1.0), (i64::MAX, 1.0)]);
        let widest = Frequency::new(i64::MAX, 1).unwrap();
        assert_eq!(widest.window_counts(&full), vec![(0, 3)]);
        assert!(!widest.analyze(&full));

        let last_bucket = (i128::from(i64::MAX) * 2 + 1) / 60_000;
        let minute = Frequency::new(1, 1).unwrap();
        assert_eq!(minute.window_counts(&full), vec![(0, 1), (last_bucket, 2)]);
        assert!(minute.analyze(&full));
        assert!(Frequency::new(1, -1).is_err());
    }

    #[test]
    fn test_execute_records_verdicts() {
        let ctx = FunctionContext::new();
        let groups = vec![
            GroupedSeries::new("up", TimeSeries::from_values(&[1.0, 2.0, 3.0])),
            GroupedSeries::new("down", TimeSeries::from_values(&[3.0, 2.0, 1.0])),
        ];
        Trend.execute(&groups, &ctx);

        assert_eq!(ctx.analysis(&Trend.id(), &JoinKey::from("up")), Some(true));
        assert_eq!(ctx.analysis(&Trend.id(), &JoinKey::from("down")), Some(false));
    }
}
