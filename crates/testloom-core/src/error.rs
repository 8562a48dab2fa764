//! Error types for Testloom Core
//!
//! Two families live here. `LoomError` covers failures that abort a whole
//! operation (bad configuration, malformed input tables, illegal workflow
//! steps). `GenerationError` and `ExtractionError` are scoped to a single cell
//! or field: callers recover from them locally and they never surface as a
//! `LoomError`.

use thiserror::Error;

/// Result type alias for Testloom operations
pub type Result<T> = std::result::Result<T, LoomError>;

/// Main error type for Testloom operations
#[derive(Error, Debug)]
pub enum LoomError {
    /// Impossible parameter combination, rejected before any work starts
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Dictionary or dataset table missing expected structure
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Workflow step requested from a state that does not allow it
    #[error("Invalid workflow transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    /// CSV errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<LoomError>,
    },
}

/// Failure of a single text generator call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Failure to turn a rule description into a structured rule set
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Rule generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("No JSON object found in model output")]
    NoJsonObject,

    #[error("Invalid rule JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Rule JSON is not an object")]
    NotAnObject,
}

impl LoomError {
    /// Add context to an error
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// True for the two fatal categories that stop a run before any output
    pub fn is_fatal_input(&self) -> bool {
        match self {
            Self::InvalidConfiguration(_) | Self::MalformedInput(_) => true,
            Self::WithContext { source, .. } => source.is_fatal_input(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add lazy context to a Result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.context(f()))
    }
}
