//! Aggregations: reduce each group's series to one scalar.
//!
//! Unless stated otherwise an empty series aggregates to `NaN`. The exceptions are
//! [`Max`] (`0`) and [`Count`] (`0`).

use crate::context::FunctionContext;
use crate::error::FunctionError;
use crate::function::{
    execute_aggregation, Aggregation, Argument, Function, FunctionKind, Number,
};
use crate::types::{elapsed_seconds, GroupedSeries, TimeSeries, Value};

macro_rules! aggregation_function {
    ($ty:ident, $kind:expr) => {
        impl Function for $ty {
            fn kind(&self) -> FunctionKind {
                $kind
            }

            fn execute(&self, groups: &[GroupedSeries], ctx: &FunctionContext) {
                execute_aggregation(self, groups, ctx)
            }
        }
    };
}

/// Arithmetic mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Avg;

aggregation_function!(Avg, FunctionKind::Avg);

impl Aggregation for Avg {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        let values = series.values_as_array();
        if values.is_empty() {
            return f64::NAN;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Smallest value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Min;

aggregation_function!(Min, FunctionKind::Min);

impl Aggregation for Min {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        let values = series.values_as_array();
        let Some((&first, rest)) = values.split_first() else {
            return f64::NAN;
        };
        let mut min = first;
        for &v in rest {
            if v < min {
                min = v;
            }
        }
        min
    }
}

/// Largest value of a single series.
///
/// Only the first series argument is considered, and an empty series yields `0`
/// rather than `NaN`; consumers rely on both conventions. `NaN` samples are skipped,
/// so a series without any numeric sample also yields `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Max;

aggregation_function!(Max, FunctionKind::Max);

impl Max {
    /// Computes the maximum of the first series in `args`.
    ///
    /// # Errors
    /// Returns [`FunctionError::InvalidArgument`] if `args` is empty.
    pub fn compute(&self, args: &[&TimeSeries]) -> Result<Value, FunctionError> {
        let series = args.first().ok_or_else(|| {
            FunctionError::invalid_argument("max", "needs at least one time series")
        })?;
        Ok(Self::max_of(series))
    }

    fn max_of(series: &TimeSeries) -> Value {
        let mut samples = series.values_as_array().iter().copied().filter(|v| !v.is_nan());
        // Seeded from the first sample so all-negative series report their true maximum.
        let Some(mut current) = samples.next() else {
            return 0.0;
        };
        for next in samples {
            if next > current {
                current = next;
            }
        }
        current
    }
}

impl Aggregation for Max {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        Self::max_of(series)
    }
}

/// Sum of all values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Sum;

aggregation_function!(Sum, FunctionKind::Sum);

impl Aggregation for Sum {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        if series.is_empty() {
            return f64::NAN;
        }
        series.values_as_array().iter().sum()
    }
}

/// Number of samples. An empty series counts as `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Count;

aggregation_function!(Count, FunctionKind::Count);

impl Aggregation for Count {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        series.size() as f64
    }
}

/// Sample standard deviation (`n - 1` denominator). A single sample deviates by `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StdDev;

aggregation_function!(StdDev, FunctionKind::StdDev);

impl Aggregation for StdDev {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        let values = series.values_as_array();
        match values.len() {
            0 => f64::NAN,
            1 => 0.0,
            n => {
                let mean = values.iter().sum::<f64>() / n as f64;
                let squares: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
                (squares / (n - 1) as f64).sqrt()
            }
        }
    }
}

/// Value of the latest sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Last;

aggregation_function!(Last, FunctionKind::Last);

impl Aggregation for Last {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        series.values_as_array().last().copied().unwrap_or(f64::NAN)
    }
}

/// Value of the earliest sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct First;

aggregation_function!(First, FunctionKind::First);

impl Aggregation for First {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        series.get(0).unwrap_or(f64::NAN)
    }
}

/// Difference between the maximum and the minimum value; never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Range;

aggregation_function!(Range, FunctionKind::Range);

impl Aggregation for Range {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        if series.size() == 0 {
            return f64::NAN;
        }

        let values = series.values_as_array();
        let mut min = values[0];
        let mut max = values[0];
        for &current in &values[1..] {
            if current < min {
                min = current;
            }
            if current > max {
                max = current;
            }
        }
        (max - min).abs()
    }
}

/// Absolute difference between the last and the first value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Difference;

aggregation_function!(Difference, FunctionKind::Difference);

impl Aggregation for Difference {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        SignedDifference.aggregate(series).abs()
    }
}

/// Last value minus first value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SignedDifference;

aggregation_function!(SignedDifference, FunctionKind::SignedDifference);

impl Aggregation for SignedDifference {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        let values = series.values_as_array();
        match (values.first(), values.last()) {
            (Some(first), Some(last)) => last - first,
            _ => f64::NAN,
        }
    }
}

/// Nearest-rank percentile, `p:<quantile>` with `0 < quantile <= 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentile {
    quantile: f64,
}

impl Percentile {
    pub fn new(quantile: f64) -> Result<Self, FunctionError> {
        if !(quantile > 0.0 && quantile <= 1.0) {
            return Err(FunctionError::invalid_argument(
                "p",
                format!("percentile must be in (0, 1], got {}", quantile),
            ));
        }
        Ok(Percentile { quantile })
    }

    pub fn quantile(&self) -> f64 {
        self.quantile
    }
}

impl Function for Percentile {
    fn kind(&self) -> FunctionKind {
        FunctionKind::Percentile
    }

    fn arguments(&self) -> Vec<Argument> {
        vec![Argument::Number(Number::new(self.quantile))]
    }

    fn execute(&self, groups: &[GroupedSeries], ctx: &FunctionContext) {
        execute_aggregation(self, groups, ctx)
    }
}

impl Aggregation for Percentile {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        nearest_rank(series.values_as_array(), self.quantile)
    }
}

/// Nearest-rank quantile of `values`; `NaN` when empty.
pub(crate) fn nearest_rank(values: &[Value], quantile: f64) -> Value {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (quantile * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Trapezoidal integral of the values over time, in value-seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Integral;

aggregation_function!(Integral, FunctionKind::Integral);

impl Aggregation for Integral {
    fn aggregate(&self, series: &TimeSeries) -> Value {
        if series.is_empty() {
            return f64::NAN;
        }
        let ts = series.timestamps();
        let vs = series.values_as_array();
        let mut area = 0.0;
        for i in 1..vs.len() {
            let dt = elapsed_seconds(ts[i - 1], ts[i]);
            area += (vs[i] + vs[i - 1]) * 0.5 * dt;
        }
        area
    }
}
