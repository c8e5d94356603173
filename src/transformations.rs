//! Transformations: derive a new series per group. Inputs are never modified and an
//! empty input always transforms into an empty series.

use crate::context::FunctionContext;
use crate::error::FunctionError;
use crate::function::{
    execute_transformation, Argument, Function, FunctionKind, Number, TimeUnit, Transformation,
};
use crate::types::{elapsed_millis, elapsed_seconds, GroupedSeries, TimeSeries, Timestamp, Value};

use std::collections::HashSet;

macro_rules! transformation_function {
    ($ty:ident, $kind:expr, |$this:ident| $args:expr) => {
        impl Function for $ty {
            fn kind(&self) -> FunctionKind {
                $kind
            }

            fn arguments(&self) -> Vec<Argument> {
                let $this = self;
                $args
            }

            fn execute(&self, groups: &[GroupedSeries], ctx: &FunctionContext) {
                execute_transformation(self, groups, ctx)
            }
        }
    };
    ($ty:ident, $kind:expr) => {
        impl Function for $ty {
            fn kind(&self) -> FunctionKind {
                $kind
            }

            fn execute(&self, groups: &[GroupedSeries], ctx: &FunctionContext) {
                execute_transformation(self, groups, ctx)
            }
        }
    };
}

fn map_values(series: &TimeSeries, f: impl Fn(Value) -> Value) -> TimeSeries {
    let mut out = TimeSeries::with_capacity(series.size());
    for (ts, v) in series.iter() {
        out.push(ts, f(v));
    }
    out
}

/// Adds a constant to every value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Add {
    value: f64,
}

impl Add {
    pub fn new(value: f64) -> Self {
        Add { value }
    }
}

transformation_function!(Add, FunctionKind::Add, |this| vec![Argument::Number(Number::new(this.value))]);

impl Transformation for Add {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        map_values(series, |v| v + self.value)
    }
}

/// Subtracts a constant from every value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subtract {
    value: f64,
}

impl Subtract {
    pub fn new(value: f64) -> Self {
        Subtract { value }
    }
}

transformation_function!(Subtract, FunctionKind::Subtract, |this| vec![Argument::Number(Number::new(this.value))]);

impl Transformation for Subtract {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        map_values(series, |v| v - self.value)
    }
}

/// Multiplies every value by a factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    factor: f64,
}

impl Scale {
    pub fn new(factor: f64) -> Self {
        Scale { factor }
    }
}

transformation_function!(Scale, FunctionKind::Scale, |this| vec![Argument::Number(Number::new(this.factor))]);

impl Transformation for Scale {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        map_values(series, |v| v * self.factor)
    }
}

/// Divides every value by a non-zero divisor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divide {
    divisor: f64,
}

impl Divide {
    pub fn new(divisor: f64) -> Result<Self, FunctionError> {
        if divisor == 0.0 {
            return Err(FunctionError::invalid_argument("divide", "divisor must not be zero"));
        }
        Ok(Divide { divisor })
    }
}

transformation_function!(Divide, FunctionKind::Divide, |this| vec![Argument::Number(Number::new(this.divisor))]);

impl Transformation for Divide {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        map_values(series, |v| v / self.divisor)
    }
}

/// Lossy line simplification: drops inner samples that lie within `tolerance` of the
/// straight line between the last kept sample and the following sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vectorization {
    tolerance: f64,
}

impl Vectorization {
    pub fn new(tolerance: f64) -> Result<Self, FunctionError> {
        if tolerance < 0.0 {
            return Err(FunctionError::invalid_argument(
                "vector",
                format!("tolerance must not be negative, got {}", tolerance),
            ));
        }
        Ok(Vectorization { tolerance })
    }
}

transformation_function!(Vectorization, FunctionKind::Vectorization, |this| vec![
    Argument::Number(Number::new(this.tolerance))
]);

impl Transformation for Vectorization {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        let n = series.size();
        if n <= 2 {
            return series.clone();
        }
        let ts = series.timestamps();
        let vs = series.values_as_array();

        let mut out = TimeSeries::with_capacity(n);
        out.push(ts[0], vs[0]);
        let mut kept = 0;
        for i in 1..n - 1 {
            let next = i + 1;
            let span = elapsed_millis(ts[kept], ts[next]) as f64;
            let expected = if span == 0.0 {
                vs[kept]
            } else {
                let slope = (vs[next] - vs[kept]) / span;
                vs[kept] + slope * elapsed_millis(ts[kept], ts[i]) as f64
            };
            if (vs[i] - expected).abs() > self.tolerance {
                out.push(ts[i], vs[i]);
                kept = i;
            }
        }
        out.push(ts[n - 1], vs[n - 1]);
        out
    }
}

/// Indices of the `n` samples with the largest (`largest == true`) or smallest values.
/// Ties favour the earlier sample. Returned in time order.
fn select_extremes(series: &TimeSeries, n: usize, largest: bool) -> TimeSeries {
    let values = series.values_as_array();
    let mut order: Vec<usize> = (0..values.len()).collect();
    // Stable sort keeps earlier indices first among equal values
    if largest {
        order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    } else {
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    }
    order.truncate(n);
    order.sort_unstable();

    let mut out = TimeSeries::with_capacity(order.len());
    for i in order {
        out.push(series.timestamps()[i], values[i]);
    }
    out
}

fn positive_count(function: &str, n: i64) -> Result<usize, FunctionError> {
    if n < 1 {
        return Err(FunctionError::invalid_argument(
            function,
            format!("count must be at least 1, got {}", n),
        ));
    }
    usize::try_from(n).map_err(|_| FunctionError::invalid_argument(function, "count too large"))
}

/// Keeps the `n` largest values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Top {
    n: usize,
}

impl Top {
    pub fn new(n: i64) -> Result<Self, FunctionError> {
        Ok(Top { n: positive_count("top", n)? })
    }
}

transformation_function!(Top, FunctionKind::Top, |this| vec![Argument::Integer(this.n as i64)]);

impl Transformation for Top {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        select_extremes(series, self.n, true)
    }
}

/// Keeps the `n` smallest values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bottom {
    n: usize,
}

impl Bottom {
    pub fn new(n: i64) -> Result<Self, FunctionError> {
        Ok(Bottom { n: positive_count("bottom", n)? })
    }
}

transformation_function!(Bottom, FunctionKind::Bottom, |this| vec![Argument::Integer(this.n as i64)]);

impl Transformation for Bottom {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        select_extremes(series, self.n, false)
    }
}

/// Trailing time-window moving average: each sample is replaced by the mean of the
/// samples in `(t - window, t]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MovingAverage {
    amount: i64,
    unit: TimeUnit,
}

impl MovingAverage {
    pub fn new(amount: i64, unit: TimeUnit) -> Result<Self, FunctionError> {
        if amount < 1 {
            return Err(FunctionError::invalid_argument(
                "movavg",
                format!("window must be at least 1, got {}", amount),
            ));
        }
        Ok(MovingAverage { amount, unit })
    }

    fn window_millis(&self) -> i64 {
        self.amount.saturating_mul(self.unit.as_millis())
    }
}

transformation_function!(MovingAverage, FunctionKind::MovingAverage, |this| vec![
    Argument::Integer(this.amount),
    Argument::Unit(this.unit),
]);

impl Transformation for MovingAverage {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        let window = i128::from(self.window_millis());
        let ts = series.timestamps();
        let vs = series.values_as_array();

        let mut out = TimeSeries::with_capacity(vs.len());
        let mut start = 0;
        let mut sum = 0.0;
        for i in 0..vs.len() {
            sum += vs[i];
            while elapsed_millis(ts[start], ts[i]) >= window {
                sum -= vs[start];
                start += 1;
            }
            out.push(ts[i], sum / (i - start + 1) as f64);
        }
        out
    }
}

/// Moving average over the last `n` samples, emitted from the `n`-th sample on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleMovingAverage {
    samples: usize,
}

impl SampleMovingAverage {
    pub fn new(samples: i64) -> Result<Self, FunctionError> {
        Ok(SampleMovingAverage {
            samples: positive_count("smovavg", samples)?,
        })
    }
}

transformation_function!(SampleMovingAverage, FunctionKind::SampleMovingAverage, |this| vec![
    Argument::Integer(this.samples as i64)
]);

impl Transformation for SampleMovingAverage {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        let n = self.samples;
        let ts = series.timestamps();
        let vs = series.values_as_array();
        if vs.len() < n {
            return TimeSeries::new();
        }

        let mut out = TimeSeries::with_capacity(vs.len() - n + 1);
        let mut sum: f64 = vs[..n - 1].iter().sum();
        for i in n - 1..vs.len() {
            sum += vs[i];
            out.push(ts[i], sum / n as f64);
            sum -= vs[i + 1 - n];
        }
        out
    }
}

/// Per-second rate between consecutive samples, stamped at the later sample.
fn rates(series: &TimeSeries) -> impl Iterator<Item = (Timestamp, Value)> + '_ {
    let ts = series.timestamps();
    let vs = series.values_as_array();
    (1..vs.len()).filter_map(move |i| {
        if ts[i] == ts[i - 1] {
            return None;
        }
        Some((ts[i], (vs[i] - vs[i - 1]) / elapsed_seconds(ts[i - 1], ts[i])))
    })
}

/// Rate of change per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Derivative;

transformation_function!(Derivative, FunctionKind::Derivative);

impl Transformation for Derivative {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        let mut out = TimeSeries::with_capacity(series.size().saturating_sub(1));
        for (ts, rate) in rates(series) {
            out.push(ts, rate);
        }
        out
    }
}

/// Rate of change per second, keeping only non-negative rates (e.g. counters across resets).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NonNegativeDerivative;

transformation_function!(NonNegativeDerivative, FunctionKind::NonNegativeDerivative);

impl Transformation for NonNegativeDerivative {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        let mut out = TimeSeries::new();
        for (ts, rate) in rates(series).filter(|&(_, rate)| rate >= 0.0) {
            out.push(ts, rate);
        }
        out
    }
}

/// Shifts every timestamp by `amount` units. Negative amounts shift backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeshift {
    amount: i64,
    unit: TimeUnit,
}

impl Timeshift {
    pub fn new(amount: i64, unit: TimeUnit) -> Self {
        Timeshift { amount, unit }
    }
}

transformation_function!(Timeshift, FunctionKind::Timeshift, |this| vec![
    Argument::Integer(this.amount),
    Argument::Unit(this.unit),
]);

impl Transformation for Timeshift {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        let offset = self.amount.saturating_mul(self.unit.as_millis());
        let mut out = TimeSeries::with_capacity(series.size());
        for (ts, v) in series.iter() {
            out.push(ts.saturating_add(offset), v);
        }
        out
    }
}

/// Keeps the first occurrence of every distinct value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Distinct;

transformation_function!(Distinct, FunctionKind::Distinct);

impl Transformation for Distinct {
    fn transform(&self, series: &TimeSeries) -> TimeSeries {
        let mut seen = HashSet::new();
        let mut out = TimeSeries::new();
        for (ts, v) in series.iter() {
            if seen.insert(Number::new(v)) {
                out.push(ts, v);
            }
        }
        out
    }
}
