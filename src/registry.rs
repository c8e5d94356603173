//! Name → function resolution.
//!
//! Resolution is two steps: the string table maps a query token to a [`FunctionKind`],
//! then [`FunctionKind::build`] constructs a fresh instance from the raw arguments.

use crate::aggregations::{
    Avg, Count, Difference, First, Integral, Last, Max, Min, Percentile, Range,
    SignedDifference, StdDev, Sum,
};
use crate::analyses::{Frequency, Outlier, Trend};
use crate::error::FunctionError;
use crate::function::{ArgReader, Function, FunctionKind, METRIC_TYPE};
use crate::transformations::{
    Add, Bottom, Derivative, Distinct, Divide, MovingAverage, NonNegativeDerivative,
    SampleMovingAverage, Scale, Subtract, Timeshift, Top, Vectorization,
};

use std::collections::HashMap;

impl FunctionKind {
    /// Constructs a new instance of this kind from its raw query arguments.
    ///
    /// # Errors
    /// Returns [`FunctionError::InvalidArgument`] on wrong arity or malformed arguments.
    pub fn build(self, args: &[&str]) -> Result<Box<dyn Function>, FunctionError> {
        let args = ArgReader::new(self, args);
        let function: Box<dyn Function> = match self {
            FunctionKind::Avg => no_args(&args, Avg)?,
            FunctionKind::Min => no_args(&args, Min)?,
            FunctionKind::Max => no_args(&args, Max)?,
            FunctionKind::Sum => no_args(&args, Sum)?,
            FunctionKind::Count => no_args(&args, Count)?,
            FunctionKind::StdDev => no_args(&args, StdDev)?,
            FunctionKind::Last => no_args(&args, Last)?,
            FunctionKind::First => no_args(&args, First)?,
            FunctionKind::Range => no_args(&args, Range)?,
            FunctionKind::Difference => no_args(&args, Difference)?,
            FunctionKind::SignedDifference => no_args(&args, SignedDifference)?,
            FunctionKind::Percentile => {
                args.expect_len(1)?;
                Box::new(Percentile::new(args.number(0)?)?)
            }
            FunctionKind::Integral => no_args(&args, Integral)?,
            FunctionKind::Trend => no_args(&args, Trend)?,
            FunctionKind::Outlier => no_args(&args, Outlier)?,
            FunctionKind::Frequency => {
                args.expect_len(2)?;
                Box::new(Frequency::new(args.integer(0)?, args.integer(1)?)?)
            }
            FunctionKind::Add => {
                args.expect_len(1)?;
                Box::new(Add::new(args.number(0)?))
            }
            FunctionKind::Subtract => {
                args.expect_len(1)?;
                Box::new(Subtract::new(args.number(0)?))
            }
            FunctionKind::Vectorization => {
                args.expect_len(1)?;
                Box::new(Vectorization::new(args.number(0)?)?)
            }
            FunctionKind::Bottom => {
                args.expect_len(1)?;
                Box::new(Bottom::new(args.integer(0)?)?)
            }
            FunctionKind::Top => {
                args.expect_len(1)?;
                Box::new(Top::new(args.integer(0)?)?)
            }
            FunctionKind::MovingAverage => {
                args.expect_len(2)?;
                Box::new(MovingAverage::new(args.integer(0)?, args.unit(1)?)?)
            }
            FunctionKind::SampleMovingAverage => {
                args.expect_len(1)?;
                Box::new(SampleMovingAverage::new(args.integer(0)?)?)
            }
            FunctionKind::Scale => {
                args.expect_len(1)?;
                Box::new(Scale::new(args.number(0)?))
            }
            FunctionKind::Divide => {
                args.expect_len(1)?;
                Box::new(Divide::new(args.number(0)?)?)
            }
            FunctionKind::Derivative => no_args(&args, Derivative)?,
            FunctionKind::NonNegativeDerivative => no_args(&args, NonNegativeDerivative)?,
            FunctionKind::Timeshift => {
                args.expect_len(2)?;
                Box::new(Timeshift::new(args.integer(0)?, args.unit(1)?))
            }
            FunctionKind::Distinct => no_args(&args, Distinct)?,
        };
        Ok(function)
    }
}

fn no_args<F: Function + 'static>(
    args: &ArgReader<'_>,
    function: F,
) -> Result<Box<dyn Function>, FunctionError> {
    args.expect_len(0)?;
    Ok(Box::new(function))
}

/// Lookup table from query tokens to function kinds for one series type.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    series_type: &'static str,
    by_name: HashMap<&'static str, FunctionKind>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::metric()
    }
}

impl FunctionRegistry {
    /// The registry of every built-in function over `"metric"` series.
    pub fn metric() -> Self {
        let by_name = FunctionKind::ALL
            .iter()
            .map(|&kind| (kind.query_name(), kind))
            .collect();
        FunctionRegistry {
            series_type: METRIC_TYPE,
            by_name,
        }
    }

    pub fn series_type(&self) -> &'static str {
        self.series_type
    }

    /// Exact, case-sensitive lookup of a query token.
    pub fn lookup(&self, name: &str) -> Option<FunctionKind> {
        self.by_name.get(name).copied()
    }

    /// Resolves `name` to a newly constructed function.
    ///
    /// Unknown names are a soft error and yield `Ok(None)`; the caller decides how to
    /// report them. Every successful call returns a fresh instance.
    ///
    /// # Errors
    /// Returns [`FunctionError::InvalidArgument`] if `name` is known but `args` do not fit it.
    pub fn resolve(
        &self,
        name: &str,
        args: &[&str],
    ) -> Result<Option<Box<dyn Function>>, FunctionError> {
        match self.lookup(name) {
            Some(kind) => kind.build(args).map(Some),
            None => Ok(None),
        }
    }

    /// Registered query tokens, in vocabulary order.
    pub fn names(&self) -> Vec<&'static str> {
        FunctionKind::ALL
            .iter()
            .map(|kind| kind.query_name())
            .filter(|name| self.by_name.contains_key(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionCategory;

    /// Valid sample arguments per kind. The exhaustive match forces a new kind to be
    /// covered here before the crate compiles.
    fn sample_args(kind: FunctionKind) -> &'static [&'static str] {
        match kind {
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
            | FunctionKind::Integral
            | FunctionKind::Trend
            | FunctionKind::Outlier
            | FunctionKind::Derivative
            | FunctionKind::NonNegativeDerivative
            | FunctionKind::Distinct => &[],
            FunctionKind::Percentile => &["0.5"],
            FunctionKind::Frequency => &["10", "6"],
            FunctionKind::Add | FunctionKind::Subtract | FunctionKind::Scale => &["2"],
            FunctionKind::Divide => &["4"],
            FunctionKind::Vectorization => &["0.01"],
            FunctionKind::Bottom | FunctionKind::Top => &["3"],
            FunctionKind::MovingAverage => &["10", "MINUTES"],
            FunctionKind::SampleMovingAverage => &["5"],
            FunctionKind::Timeshift => &["2", "DAYS"],
        }
    }

    #[test]
    fn test_every_registered_name_resolves() {
        let registry = FunctionRegistry::metric();
        assert_eq!(registry.len(), 29);

        for name in registry.names() {
            let kind = registry.lookup(name).unwrap();
            let function = registry
                .resolve(name, sample_args(kind))
                .unwrap()
                .unwrap_or_else(|| panic!("'{}' did not resolve", name));
            assert_eq!(function.query_name(), name);
            assert_eq!(function.kind(), kind);
            assert_eq!(function.series_type(), "metric");
            assert!(!function.needs_subquery());
            assert_eq!(function.subquery(), None);
        }
    }

    #[test]
    fn test_vocabulary_is_stable() {
        let expected = [
            "avg", "min", "max", "sum", "count", "dev", "last", "first", "range", "diff",
            "sdiff", "p", "integral", "trend", "add", "sub", "vector", "bottom", "top", "movavg",
            "smovavg", "scale", "divide", "derivative", "nnderivative", "timeshift", "distinct",
            "outlier", "frequency",
        ];
        assert_eq!(FunctionRegistry::metric().names(), expected);
    }

    #[test]
    fn test_max_and_range() {
        let registry = FunctionRegistry::default();
        let max = registry.resolve("max", &[]).unwrap().unwrap();
        let range = registry.resolve("range", &[]).unwrap().unwrap();
        assert_eq!(max.query_name(), "max");
        assert_eq!(range.query_name(), "range");
        assert_eq!(max.category(), FunctionCategory::Aggregation);
        assert!(*max != *range);
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let registry = FunctionRegistry::metric();
        assert!(registry.resolve("doesnotexist", &[]).unwrap().is_none());
        // Case-sensitive
        assert!(registry.resolve("MAX", &[]).unwrap().is_none());
        assert!(registry.resolve("", &[]).unwrap().is_none());
        assert_eq!(registry.lookup("fastdtw"), None);
    }

    #[test]
    fn test_each_resolve_builds_a_new_equal_instance() {
        let registry = FunctionRegistry::metric();
        let a = registry.resolve("p", &["0.9"]).unwrap().unwrap();
        let b = registry.resolve("p", &["0.9"]).unwrap().unwrap();
        let c = registry.resolve("p", &["0.5"]).unwrap().unwrap();
        assert!(*a == *b);
        assert!(*a != *c);
        assert_eq!(a.id().to_string(), "p:0.9");
    }

    #[test]
    fn test_invalid_arguments() {
        let registry = FunctionRegistry::metric();
        let cases: &[(&str, &[&str])] = &[
            ("p", &[]),
            ("p", &["abc"]),
            ("p", &["1.5"]),
            ("max", &["1"]),
            ("divide", &["0"]),
            ("movavg", &["10"]),
            ("movavg", &["10", "LIGHTYEARS"]),
            ("top", &["-1"]),
            ("frequency", &["0", "1"]),
        ];
        for (name, args) in cases {
            match registry.resolve(name, args) {
                Err(FunctionError::InvalidArgument { function, .. }) => assert_eq!(function, *name),
                other => panic!("Expected InvalidArgument for {} {:?}, got {:?}", name, args, other),
            }
        }
    }
}
