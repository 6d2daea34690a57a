//! Error types for schema-scorer.

use thiserror::Error;

/// Result type for schema-scorer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for schema-scorer operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON document could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded or failed validation.
    #[error("Config error: {0}")]
    Config(String),

    /// Malformed table row, document field or order-type tag.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A required input file or directory does not exist.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// One system event id maps to more than one reference id in a schema.
    #[error("Ambiguous mapping in schema {schema_id}: event {ev_id} maps to both {first} and {second}")]
    AmbiguousMapping {
        /// Schema the conflicting rows belong to
        schema_id: String,
        /// System event id
        ev_id: String,
        /// Reference id seen first
        first: String,
        /// Conflicting reference id
        second: String,
    },

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a missing input error.
    pub fn missing_input(what: impl Into<String>) -> Self {
        Error::MissingInput(what.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Whether the pipeline should skip the unit of work and keep going
    /// (as opposed to reporting the unit as failed).
    pub fn is_skippable(&self) -> bool {
        matches!(self, Error::MissingInput(_))
    }
}
