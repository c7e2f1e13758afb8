//! Error taxonomy shared by every chart entry point.

use thiserror::Error;

/// Hard failures. Anything that would otherwise produce a partial figure
/// aborts the call with one of these.
#[derive(Debug, Error)]
pub enum PlotError {
    /// Wrong input kind (e.g. a mapping where a single entry is required).
    #[error("type error: {0}")]
    Type(String),

    /// Input of the right kind that violates a structural requirement.
    #[error("value error: {0}")]
    Value(String),

    /// Nested option keys that do not match the data keys.
    #[error("key error: {0}")]
    Key(String),

    /// An embedded lookup table or palette could not be found or parsed.
    #[error("resource `{name}` could not be loaded: {reason}")]
    Resource { name: String, reason: String },

    /// The plotting backend failed while drawing a figure.
    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PlotError {
    pub(crate) fn value(msg: impl Into<String>) -> Self {
        PlotError::Value(msg.into())
    }

    pub(crate) fn type_err(msg: impl Into<String>) -> Self {
        PlotError::Type(msg.into())
    }

    pub(crate) fn key(msg: impl Into<String>) -> Self {
        PlotError::Key(msg.into())
    }
}

impl From<anyhow::Error> for PlotError {
    fn from(e: anyhow::Error) -> Self {
        PlotError::Render(format!("{e:#}"))
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PlotError>;
