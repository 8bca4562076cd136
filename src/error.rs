//! Custom error types and handling
//!
//! Grading outcomes (compile errors, timeouts, wrong answers...) are never
//! errors: they are returned as a [`GradingResult`](crate::models::GradingResult).
//! This module only models faults of the grading environment itself.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Engine-wide error type for unrecoverable setup and environment faults
#[derive(Debug, thiserror::Error)]
pub enum GraderError {
    // Environment errors
    #[error("Toolchain not found: {0}")]
    ToolchainMissing(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Workspace error at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Validation errors
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GraderError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ToolchainMissing(_) => "TOOLCHAIN_MISSING",
            Self::Spawn { .. } => "SPAWN_ERROR",
            Self::Workspace { .. } => "WORKSPACE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::InvalidSubmission(_) => "INVALID_SUBMISSION",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the fault lies with the caller's request rather than the host
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidSubmission(_))
    }
}

/// Result type alias using GraderError
pub type GraderResult<T> = Result<T, GraderError>;
