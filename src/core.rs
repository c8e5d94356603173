//! Host-facing façade: configuration, name resolution with soft-error reporting, and
//! batch evaluation of functions over grouped series.

use crate::context::{FunctionContext, DEFAULT_CONTEXT_SHARDS};
use crate::error::FunctionError;
use crate::function::Function;
use crate::registry::FunctionRegistry;
use crate::telemetry::{analytics_metrics, noop_event_listener, AnalyticsEvent, AnalyticsEventListener};
use crate::types::GroupedSeries;

use rayon::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

/// Configuration options for the AnalyticsCore
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Whether functions and group chunks are evaluated on the rayon pool
    pub parallel: bool,
    /// Number of groups handed to one function invocation when evaluating in parallel
    pub parallel_chunk_size: usize,
    /// Lock shards of each `FunctionContext` created by the core
    pub context_shards: usize,
    /// Structured event hook for observability (no-op by default).
    pub event_listener: Arc<dyn AnalyticsEventListener>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig {
            parallel: true,
            parallel_chunk_size: 64,
            context_shards: DEFAULT_CONTEXT_SHARDS,
            event_listener: noop_event_listener(),
        }
    }
}

/// File-backed settings. All fields optional; missing ones keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnalyticsFileConfig {
    parallel: Option<bool>,
    parallel_chunk_size: Option<usize>,
    context_shards: Option<usize>,
}

impl AnalyticsConfig {
    /// Parses TOML settings and merges them over the defaults.
    ///
    /// ```toml
    /// parallel = true
    /// parallel_chunk_size = 128
    /// context_shards = 32
    /// ```
    pub fn from_toml_str(raw: &str) -> Result<Self, FunctionError> {
        let file: AnalyticsFileConfig = toml::from_str(raw)?;
        let mut config = AnalyticsConfig::default();
        if let Some(parallel) = file.parallel {
            config.parallel = parallel;
        }
        if let Some(chunk) = file.parallel_chunk_size {
            config.parallel_chunk_size = chunk;
        }
        if let Some(shards) = file.context_shards {
            config.context_shards = shards;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FunctionError> {
        if self.parallel_chunk_size == 0 {
            return Err(FunctionError::ConfigError(
                "parallel_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.context_shards == 0 {
            return Err(FunctionError::ConfigError(
                "context_shards must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A requested function: query token plus raw argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl FunctionRequest {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionRequest {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FunctionRequest {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Entry point for hosts: resolves function names and evaluates them over grouped series.
#[derive(Debug)]
pub struct AnalyticsCore {
    registry: FunctionRegistry,
    config: AnalyticsConfig,
}

impl Default for AnalyticsCore {
    fn default() -> Self {
        AnalyticsCore {
            registry: FunctionRegistry::metric(),
            config: AnalyticsConfig::default(),
        }
    }
}

impl AnalyticsCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a core over the metric registry with the provided configuration.
    ///
    /// # Errors
    /// Returns [`FunctionError::ConfigError`] if the configuration is invalid.
    pub fn with_config(config: AnalyticsConfig) -> Result<Self, FunctionError> {
        config.validate()?;
        analytics_metrics::describe_all();
        Ok(AnalyticsCore {
            registry: FunctionRegistry::metric(),
            config,
        })
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Creates an empty result context sized by the configuration.
    pub fn new_context(&self) -> FunctionContext {
        FunctionContext::with_shards(self.config.context_shards)
    }

    /// Resolves one function. Unknown names are reported through the event listener and
    /// yield `Ok(None)`.
    pub fn resolve(
        &self,
        name: &str,
        args: &[&str],
    ) -> Result<Option<Box<dyn Function>>, FunctionError> {
        let events = &self.config.event_listener;
        match self.registry.resolve(name, args) {
            Ok(Some(function)) => {
                analytics_metrics::record_resolved();
                Ok(Some(function))
            }
            Ok(None) => {
                analytics_metrics::record_unknown_function();
                events.on_event(AnalyticsEvent::UnknownFunction {
                    name: name.to_string(),
                    series_type: self.registry.series_type().to_string(),
                });
                Ok(None)
            }
            Err(e) => {
                events.on_event(AnalyticsEvent::InvalidArguments {
                    name: name.to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Resolves every request, skipping unknown names.
    ///
    /// # Errors
    /// Fails on the first known function with invalid arguments.
    pub fn resolve_all(
        &self,
        requests: &[FunctionRequest],
    ) -> Result<Vec<Box<dyn Function>>, FunctionError> {
        let mut functions = Vec::with_capacity(requests.len());
        for request in requests {
            let args: Vec<&str> = request.args.iter().map(String::as_str).collect();
            if let Some(function) = self.resolve(&request.name, &args)? {
                functions.push(function);
            }
        }
        Ok(functions)
    }

    /// Evaluates `functions` over `groups` into a fresh context.
    pub fn evaluate(&self, functions: &[Box<dyn Function>], groups: &[GroupedSeries]) -> FunctionContext {
        let ctx = self.new_context();
        self.evaluate_into(functions, groups, &ctx);
        ctx
    }

    /// Evaluates `functions` over `groups`, writing into `ctx`.
    ///
    /// With `parallel` enabled, each function runs over chunks of `parallel_chunk_size`
    /// groups on the rayon pool. Every (function, group) pair is evaluated exactly once,
    /// so the resulting context is the same as for sequential evaluation.
    pub fn evaluate_into(
        &self,
        functions: &[Box<dyn Function>],
        groups: &[GroupedSeries],
        ctx: &FunctionContext,
    ) {
        let start = Instant::now();

        if self.config.parallel {
            let chunk_size = self.config.parallel_chunk_size;
            functions.par_iter().for_each(|function| {
                groups
                    .par_chunks(chunk_size)
                    .for_each(|chunk| function.execute(chunk, ctx));
            });
        } else {
            for function in functions {
                function.execute(groups, ctx);
            }
        }

        for function in functions {
            self.config.event_listener.on_event(AnalyticsEvent::FunctionEvaluated {
                function: function.id().to_string(),
                groups: groups.len(),
            });
        }
        analytics_metrics::record_evaluation(
            start.elapsed(),
            (functions.len() * groups.len()) as u64,
        );
    }
}
