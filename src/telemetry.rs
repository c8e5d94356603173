use std::sync::Arc;

/// Structured, in-process event hook for observability.
///
/// This crate is a library; emitting logs directly (e.g. `println!`) is not acceptable for
/// production. Instead, callers can provide an implementation that forwards these events to
/// `tracing`, `log`, metrics, or custom sinks.
pub trait AnalyticsEventListener: std::fmt::Debug + Send + Sync + 'static {
    fn on_event(&self, event: AnalyticsEvent);
}

/// Structured events emitted by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsEvent {
    /// A requested function name is not in the registry; its result will be absent.
    UnknownFunction { name: String, series_type: String },
    /// A known function was requested with arguments it cannot accept.
    InvalidArguments { name: String, error: String },
    FunctionEvaluated { function: String, groups: usize },
}

#[derive(Debug)]
pub struct NoopEventListener;

impl AnalyticsEventListener for NoopEventListener {
    #[inline]
    fn on_event(&self, _event: AnalyticsEvent) {}
}

pub fn noop_event_listener() -> Arc<dyn AnalyticsEventListener> {
    Arc::new(NoopEventListener)
}

/// Metrics instrumentation through the `metrics` facade.
///
/// Emitting is effectively a no-op until the host installs a recorder.
pub mod analytics_metrics {
    use ::metrics::{describe_counter, describe_histogram, Unit};
    use std::sync::Once;
    use std::time::Duration;

    // --- metric names ---
    //
    // Counters are exposed as `<name>_total` by the Prometheus exporter.

    pub const FUNCTIONS_RESOLVED: &str = "tsanalytics_functions_resolved";
    pub const UNKNOWN_FUNCTIONS: &str = "tsanalytics_unknown_functions";
    pub const GROUPS_EVALUATED: &str = "tsanalytics_groups_evaluated";
    pub const EVALUATION_DURATION_SECONDS: &str = "tsanalytics_evaluation_duration_seconds";

    #[inline]
    pub fn record_resolved() {
        ::metrics::counter!(FUNCTIONS_RESOLVED).increment(1);
    }

    #[inline]
    pub fn record_unknown_function() {
        ::metrics::counter!(UNKNOWN_FUNCTIONS).increment(1);
    }

    #[inline]
    pub fn record_evaluation(duration: Duration, groups: u64) {
        ::metrics::histogram!(EVALUATION_DURATION_SECONDS).record(duration.as_secs_f64());
        if groups > 0 {
            ::metrics::counter!(GROUPS_EVALUATED).increment(groups);
        }
    }

    /// Registers metric descriptions with the installed recorder. Idempotent.
    pub fn describe_all() {
        static DESCRIBED: Once = Once::new();
        DESCRIBED.call_once(|| {
            describe_counter!(
                FUNCTIONS_RESOLVED,
                Unit::Count,
                "Total number of function names resolved to an instance."
            );
            describe_counter!(
                UNKNOWN_FUNCTIONS,
                Unit::Count,
                "Total number of requested function names missing from the registry."
            );
            describe_counter!(
                GROUPS_EVALUATED,
                Unit::Count,
                "Total number of (function, group) evaluations."
            );
            describe_histogram!(
                EVALUATION_DURATION_SECONDS,
                Unit::Seconds,
                "Time to evaluate a batch of functions over a batch of groups."
            );
        });
    }
}
