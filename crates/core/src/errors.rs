use thiserror::Error;

/// A caller-supplied argument failed a precondition. Always recoverable by
/// correcting the input; never retried automatically.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("validation failed for `{field}`: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}
