use std::fmt;

/// Timestamp type (milliseconds since epoch).
pub type Timestamp = i64;

/// Value type.
pub type Value = f64;

/// Milliseconds from `from` to `to`. Exact for any pair of timestamps.
#[inline]
pub fn elapsed_millis(from: Timestamp, to: Timestamp) -> i128 {
    i128::from(to) - i128::from(from)
}

/// Seconds from `from` to `to`.
#[inline]
pub fn elapsed_seconds(from: Timestamp, to: Timestamp) -> f64 {
    elapsed_millis(from, to) as f64 / 1000.0
}

/// A time-ordered series of samples in columnar format.
///
/// Instances are built once per query by the conversion layer and are only ever handed
/// to functions by shared reference, so they stay immutable while functions execute.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<Timestamp>,
    values: Vec<Value>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        TimeSeries {
            timestamps: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Builds a series from arbitrary `(timestamp, value)` pairs.
    /// Points are sorted by timestamp; points sharing a timestamp keep their input order.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (Timestamp, Value)>,
    {
        let mut points: Vec<(Timestamp, Value)> = points.into_iter().collect();
        points.sort_by_key(|&(ts, _)| ts);

        let mut series = TimeSeries::with_capacity(points.len());
        for (ts, value) in points {
            series.timestamps.push(ts);
            series.values.push(value);
        }
        series
    }

    /// Builds a series from values only, using their index as timestamp.
    pub fn from_values(values: &[Value]) -> Self {
        TimeSeries {
            timestamps: (0..values.len() as Timestamp).collect(),
            values: values.to_vec(),
        }
    }

    /// Appends a sample. Assumes `timestamp` is not older than the last sample.
    pub fn push(&mut self, timestamp: Timestamp, value: Value) {
        debug_assert!(self.timestamps.last().map_or(true, |&last| last <= timestamp));
        self.timestamps.push(timestamp);
        self.values.push(value);
    }

    /// Returns the number of samples.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at `index`.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.values.get(index).copied()
    }

    /// Returns the timestamp at `index`.
    pub fn timestamp(&self, index: usize) -> Option<Timestamp> {
        self.timestamps.get(index).copied()
    }

    /// Materialized view over all values in time order.
    pub fn values_as_array(&self) -> &[Value] {
        &self.values
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Iterates `(timestamp, value)` pairs in time order.
    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, Value)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

impl FromIterator<(Timestamp, Value)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (Timestamp, Value)>>(iter: I) -> Self {
        TimeSeries::from_points(iter)
    }
}

/// Identifies the logical group (e.g. a metric identity after grouping) a series belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinKey(String);

impl JoinKey {
    pub fn new(key: impl Into<String>) -> Self {
        JoinKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JoinKey {
    fn from(key: &str) -> Self {
        JoinKey(key.to_string())
    }
}

impl From<String> for JoinKey {
    fn from(key: String) -> Self {
        JoinKey(key)
    }
}

/// One element of the batch handed to a function: a join key and its series.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedSeries {
    pub join_key: JoinKey,
    pub series: TimeSeries,
}

impl GroupedSeries {
    pub fn new(join_key: impl Into<JoinKey>, series: TimeSeries) -> Self {
        GroupedSeries {
            join_key: join_key.into(),
            series,
        }
    }
}
