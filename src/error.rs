use thiserror::Error;

/// Custom error type for function resolution and execution.
///
/// Unknown function names and empty series are deliberately *not* represented here:
/// the registry signals an unknown name with `Ok(None)`, and every function documents
/// its own fallback value for empty input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    /// The call shape or the arguments of a known function are invalid
    /// (e.g. no series passed to `max`, a percentile outside `(0, 1]`, a zero divisor).
    #[error("Invalid argument for '{function}': {reason}")]
    InvalidArgument { function: String, reason: String },

    #[error("Configuration Error: {0}")]
    ConfigError(String),
}

impl FunctionError {
    pub(crate) fn invalid_argument(function: &str, reason: impl Into<String>) -> Self {
        FunctionError::InvalidArgument {
            function: function.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for FunctionError {
    fn from(err: toml::de::Error) -> Self {
        FunctionError::ConfigError(err.to_string())
    }
}
