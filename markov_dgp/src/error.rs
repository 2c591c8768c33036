// src/error.rs
//
// Error taxonomy:
// - ConfigError: rejected before any trajectory is generated
// - GenError:    runtime failures, including internal invariant breaches
//
// Generation is deterministic given a seed, so nothing here is retryable.

use thiserror::Error;

/// Invalid configuration. Always raised before generation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("pattern length must be {expected}, got {actual}")]
    PatternLength { expected: usize, actual: usize },

    #[error("action code {0} is not one of 0 (listen), -1 (open left), 1 (open right)")]
    InvalidActionCode(i64),

    #[error("state code {0} is not one of -1 (left), 1 (right)")]
    InvalidStateCode(i64),

    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl ConfigError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure while generating or exporting a dataset.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An internal contract was breached (e.g. the end marker reached the dynamics).
    /// Aborts the current trajectory.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("io error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl GenError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenError>;
