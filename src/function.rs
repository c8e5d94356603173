//! The function capability contract: identity, categories, arguments and the shared
//! group loops every aggregation, transformation and analysis runs through.

use crate::context::{FunctionContext, FunctionValue};
use crate::error::FunctionError;
use crate::types::{GroupedSeries, TimeSeries, Value};

use std::fmt;

/// Series type tag every built-in function declares.
pub const METRIC_TYPE: &str = "metric";

/// What a function produces per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCategory {
    /// Reduces a series to a scalar.
    Aggregation,
    /// Derives a new series from a series.
    Transformation,
    /// Answers a yes/no question about a series.
    Analysis,
}

/// Closed set of known function kinds. The textual vocabulary lives in
/// [`FunctionKind::query_name`]; the registry builds its lookup table from [`FunctionKind::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunctionKind {
    // Aggregations
    Avg,
    Min,
    Max,
    Sum,
    Count,
    StdDev,
    Last,
    First,
    Range,
    Difference,
    SignedDifference,
    Percentile,
    Integral,
    // Analyses
    Trend,
    Outlier,
    Frequency,
    // Transformations
    Add,
    Subtract,
    Vectorization,
    Bottom,
    Top,
    MovingAverage,
    SampleMovingAverage,
    Scale,
    Divide,
    Derivative,
    NonNegativeDerivative,
    Timeshift,
    Distinct,
}

impl FunctionKind {
    /// Every kind in wire-vocabulary order. Append only.
    pub const ALL: [FunctionKind; 29] = [
        FunctionKind::Avg,
        FunctionKind::Min,
        FunctionKind::Max,
        FunctionKind::Sum,
        FunctionKind::Count,
        FunctionKind::StdDev,
        FunctionKind::Last,
        FunctionKind::First,
        FunctionKind::Range,
        FunctionKind::Difference,
        FunctionKind::SignedDifference,
        FunctionKind::Percentile,
        FunctionKind::Integral,
        FunctionKind::Trend,
        FunctionKind::Add,
        FunctionKind::Subtract,
        FunctionKind::Vectorization,
        FunctionKind::Bottom,
        FunctionKind::Top,
        FunctionKind::MovingAverage,
        FunctionKind::SampleMovingAverage,
        FunctionKind::Scale,
        FunctionKind::Divide,
        FunctionKind::Derivative,
        FunctionKind::NonNegativeDerivative,
        FunctionKind::Timeshift,
        FunctionKind::Distinct,
        FunctionKind::Outlier,
        FunctionKind::Frequency,
    ];

    /// The token used on the query surface.
    pub fn query_name(self) -> &'static str {
        match self {
            FunctionKind::Avg => "avg",
            FunctionKind::Min => "min",
            FunctionKind::Max => "max",
            FunctionKind::Sum => "sum",
            FunctionKind::Count => "count",
            FunctionKind::StdDev => "dev",
            FunctionKind::Last => "last",
            FunctionKind::First => "first",
            FunctionKind::Range => "range",
            FunctionKind::Difference => "diff",
            FunctionKind::SignedDifference => "sdiff",
            FunctionKind::Percentile => "p",
            FunctionKind::Integral => "integral",
            FunctionKind::Trend => "trend",
            FunctionKind::Outlier => "outlier",
            FunctionKind::Frequency => "frequency",
            FunctionKind::Add => "add",
            FunctionKind::Subtract => "sub",
            FunctionKind::Vectorization => "vector",
            FunctionKind::Bottom => "bottom",
            FunctionKind::Top => "top",
            FunctionKind::MovingAverage => "movavg",
            FunctionKind::SampleMovingAverage => "smovavg",
            FunctionKind::Scale => "scale",
            FunctionKind::Divide => "divide",
            FunctionKind::Derivative => "derivative",
            FunctionKind::NonNegativeDerivative => "nnderivative",
            FunctionKind::Timeshift => "timeshift",
            FunctionKind::Distinct => "distinct",
        }
    }

    pub fn category(self) -> FunctionCategory {
        match self {
            FunctionKind::Avg
            | FunctionKind::Min
            | FunctionKind::Max
            | FunctionKind::Sum
            | FunctionKind::Count
            | FunctionKind::StdDev
            | FunctionKind::Last
            | FunctionKind::First
            | FunctionKind::Range
            | FunctionKind::Difference
            | FunctionKind::SignedDifference
            | FunctionKind::Percentile
            | FunctionKind::Integral => FunctionCategory::Aggregation,
            FunctionKind::Trend | FunctionKind::Outlier | FunctionKind::Frequency => {
                FunctionCategory::Analysis
            }
            FunctionKind::Add
            | FunctionKind::Subtract
            | FunctionKind::Vectorization
            | FunctionKind::Bottom
            | FunctionKind::Top
            | FunctionKind::MovingAverage
            | FunctionKind::SampleMovingAverage
            | FunctionKind::Scale
            | FunctionKind::Divide
            | FunctionKind::Derivative
            | FunctionKind::NonNegativeDerivative
            | FunctionKind::Timeshift
            | FunctionKind::Distinct => FunctionCategory::Transformation,
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_name())
    }
}

/// A float argument with structural equality: compared and hashed by its bit pattern.
/// `-0.0` is normalised to `0.0` so both spell the same function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Number(u64);

impl Number {
    pub fn new(value: f64) -> Self {
        let value = if value == 0.0 { 0.0 } else { value };
        Number(value.to_bits())
    }

    pub fn get(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.get(), f)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.get(), f)
    }
}

/// Time units accepted by window and shift arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimeUnit {
    pub fn as_millis(self) -> i64 {
        match self {
            TimeUnit::Millis => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Days => 86_400_000,
            TimeUnit::Weeks => 604_800_000,
        }
    }

    /// Parses a unit name, ignoring case (`MINUTES`, `minutes`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MILLIS" | "MILLISECONDS" => Some(TimeUnit::Millis),
            "SECONDS" => Some(TimeUnit::Seconds),
            "MINUTES" => Some(TimeUnit::Minutes),
            "HOURS" => Some(TimeUnit::Hours),
            "DAYS" => Some(TimeUnit::Days),
            "WEEKS" => Some(TimeUnit::Weeks),
            _ => None,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeUnit::Millis => "MILLIS",
            TimeUnit::Seconds => "SECONDS",
            TimeUnit::Minutes => "MINUTES",
            TimeUnit::Hours => "HOURS",
            TimeUnit::Days => "DAYS",
            TimeUnit::Weeks => "WEEKS",
        };
        f.write_str(name)
    }
}

/// A parsed function argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Argument {
    Number(Number),
    Integer(i64),
    Unit(TimeUnit),
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Number(n) => n.fmt(f),
            Argument::Integer(i) => i.fmt(f),
            Argument::Unit(u) => u.fmt(f),
        }
    }
}

/// Structural identity of a function instance: its kind plus its arguments.
///
/// Used as half of the [`FunctionContext`] key, so two instances with identical
/// configuration address the same result slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId {
    kind: FunctionKind,
    arguments: Vec<Argument>,
}

impl FunctionId {
    pub fn new(kind: FunctionKind, arguments: Vec<Argument>) -> Self {
        FunctionId { kind, arguments }
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.query_name())?;
        for (i, arg) in self.arguments.iter().enumerate() {
            f.write_str(if i == 0 { ":" } else { "," })?;
            arg.fmt(f)?;
        }
        Ok(())
    }
}

/// A named unit of analytics work over a batch of grouped time series.
///
/// Implementations are stateless: everything that distinguishes two instances is
/// captured by [`Function::arguments`], and every result goes into the context.
pub trait Function: fmt::Debug + Send + Sync {
    fn kind(&self) -> FunctionKind;

    /// Arguments the instance was built with, in query order.
    fn arguments(&self) -> Vec<Argument> {
        Vec::new()
    }

    fn query_name(&self) -> &'static str {
        self.kind().query_name()
    }

    fn series_type(&self) -> &'static str {
        METRIC_TYPE
    }

    fn category(&self) -> FunctionCategory {
        self.kind().category()
    }

    /// Whether the function needs a follow-up query. Declared statically.
    fn needs_subquery(&self) -> bool {
        false
    }

    fn subquery(&self) -> Option<&str> {
        None
    }

    fn id(&self) -> FunctionId {
        FunctionId::new(self.kind(), self.arguments())
    }

    /// Processes every group independently and writes one result per group into `ctx`,
    /// keyed by `(self.id(), group.join_key)`.
    fn execute(&self, groups: &[GroupedSeries], ctx: &FunctionContext);
}

impl PartialEq for dyn Function {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for dyn Function {}

/// Reduces a series to one scalar.
pub trait Aggregation: Function {
    fn aggregate(&self, series: &TimeSeries) -> Value;
}

/// Derives a new series; the input is never modified.
pub trait Transformation: Function {
    fn transform(&self, series: &TimeSeries) -> TimeSeries;
}

/// Answers a boolean question about a series.
pub trait Analysis: Function {
    fn analyze(&self, series: &TimeSeries) -> bool;
}

pub(crate) fn execute_aggregation<A: Aggregation + ?Sized>(
    function: &A,
    groups: &[GroupedSeries],
    ctx: &FunctionContext,
) {
    let id = function.id();
    for group in groups {
        let value = function.aggregate(&group.series);
        ctx.add(id.clone(), group.join_key.clone(), FunctionValue::Aggregation(value));
    }
}

pub(crate) fn execute_transformation<T: Transformation + ?Sized>(
    function: &T,
    groups: &[GroupedSeries],
    ctx: &FunctionContext,
) {
    let id = function.id();
    for group in groups {
        let series = function.transform(&group.series);
        ctx.add(id.clone(), group.join_key.clone(), FunctionValue::Transformation(series));
    }
}

pub(crate) fn execute_analysis<A: Analysis + ?Sized>(
    function: &A,
    groups: &[GroupedSeries],
    ctx: &FunctionContext,
) {
    let id = function.id();
    for group in groups {
        let hit = function.analyze(&group.series);
        ctx.add(id.clone(), group.join_key.clone(), FunctionValue::Analysis(hit));
    }
}

/// Positional reader over the raw argument tokens of one function.
pub(crate) struct ArgReader<'a> {
    function: &'static str,
    raw: &'a [&'a str],
}

impl<'a> ArgReader<'a> {
    pub(crate) fn new(kind: FunctionKind, raw: &'a [&'a str]) -> Self {
        ArgReader {
            function: kind.query_name(),
            raw,
        }
    }

    pub(crate) fn expect_len(&self, expected: usize) -> Result<(), FunctionError> {
        if self.raw.len() != expected {
            return Err(self.invalid(format!(
                "expected {} argument(s), got {}",
                expected,
                self.raw.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn number(&self, index: usize) -> Result<f64, FunctionError> {
        let raw = self.token(index)?;
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(self.invalid(format!("'{}' is not a finite number", raw))),
        }
    }

    pub(crate) fn integer(&self, index: usize) -> Result<i64, FunctionError> {
        let raw = self.token(index)?;
        raw.parse::<i64>()
            .map_err(|_| self.invalid(format!("'{}' is not an integer", raw)))
    }

    pub(crate) fn unit(&self, index: usize) -> Result<TimeUnit, FunctionError> {
        let raw = self.token(index)?;
        TimeUnit::parse(raw).ok_or_else(|| self.invalid(format!("'{}' is not a time unit", raw)))
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> FunctionError {
        FunctionError::invalid_argument(self.function, reason)
    }

    fn token(&self, index: usize) -> Result<&'a str, FunctionError> {
        self.raw
            .get(index)
            .map(|s| s.trim())
            .ok_or_else(|| self.invalid(format!("missing argument #{}", index + 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_kinds_have_distinct_query_names() {
        let names: HashSet<&str> = FunctionKind::ALL.iter().map(|k| k.query_name()).collect();
        assert_eq!(names.len(), FunctionKind::ALL.len());
    }

    #[test]
    fn test_number_identity() {
        assert_eq!(Number::new(0.5), Number::new(0.5));
        assert_eq!(Number::new(-0.0), Number::new(0.0));
        assert_ne!(Number::new(0.5), Number::new(0.9));
        assert_eq!(Number::new(2.5).get(), 2.5);
    }

    #[test]
    fn test_time_unit_parse() {
        assert_eq!(TimeUnit::parse("MINUTES"), Some(TimeUnit::Minutes));
        assert_eq!(TimeUnit::parse("days"), Some(TimeUnit::Days));
        assert_eq!(TimeUnit::parse(" millis "), Some(TimeUnit::Millis));
        assert_eq!(TimeUnit::parse("fortnights"), None);
        assert_eq!(TimeUnit::Hours.as_millis(), 3_600_000);
    }

    #[test]
    fn test_function_id_display() {
        let id = FunctionId::new(
            FunctionKind::MovingAverage,
            vec![Argument::Integer(10), Argument::Unit(TimeUnit::Minutes)],
        );
        assert_eq!(id.to_string(), "movavg:10,MINUTES");
        assert_eq!(FunctionId::new(FunctionKind::Max, vec![]).to_string(), "max");
    }

    #[test]
    fn test_arg_reader() {
        let raw = ["0.5", "x", "12", "hours"];
        let reader = ArgReader::new(FunctionKind::Percentile, &raw);
        assert_eq!(reader.number(0).unwrap(), 0.5);
        assert!(reader.number(1).is_err());
        assert_eq!(reader.integer(2).unwrap(), 12);
        assert_eq!(reader.unit(3).unwrap(), TimeUnit::Hours);
        assert!(reader.integer(4).is_err());
        assert!(reader.expect_len(4).is_ok());

        match reader.expect_len(1) {
            Err(FunctionError::InvalidArgument { function, .. }) => assert_eq!(function, "p"),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        let raw = ["NaN", "inf"];
        let reader = ArgReader::new(FunctionKind::Add, &raw);
        assert!(reader.number(0).is_err());
        assert!(reader.number(1).is_err());
    }
}
