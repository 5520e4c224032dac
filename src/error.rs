//! Error taxonomy for recipe compilation
//!
//! Every fallible operation in this crate returns [`RecipeError`]. Callers branch on
//! [`RecipeError::kind`] instead of matching message text:
//!
//! - [`ErrorKind::Configuration`]: a constructed message failed validation or the
//!   platform configuration cannot serve the request. Fatal, never retried.
//! - [`ErrorKind::Resolution`]: an artifact download URL could not be resolved.
//!   Retry after resolving a fresh URL.
//! - [`ErrorKind::PolicyViolation`]: user input breaks a binding limit. Not
//!   retryable without changing the input.

use std::fmt;
use thiserror::Error;

/// Classification of a [`RecipeError`] for retry and rendering decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Resolution,
    PolicyViolation,
}

/// Artifact whose blobstore URL is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Package,
    Droplet,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Package => write!(f, "package"),
            Artifact::Droplet => write!(f, "droplet"),
        }
    }
}

/// A lifecycle message did not satisfy its schema
///
/// Holds one entry per offending field, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub violations: Vec<FieldViolation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub expected: String,
    pub given: String,
}

impl SchemaError {
    pub fn has_violation(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{} => expected {}, got {}", v.field, v.expected, v.given))
            .collect();
        write!(f, "{{ {} }}", parts.join(", "))
    }
}

impl std::error::Error for SchemaError {}

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("Schema validation failed: {0}")]
    Schema(#[from] SchemaError),

    #[error("Failed to get blobstore download url for {artifact} {guid}")]
    InvalidDownloadUri { artifact: Artifact, guid: String },

    #[error("{0}")]
    IncompatibleBindings(String),

    #[error("Invalid image reference: {0}")]
    InvalidImageReference(String),

    #[error("no compiler defined for requested stack: {key}")]
    NoCompilerDefined { key: String },

    #[error("Invalid rule in security group {guid}: {reason}")]
    InvalidSecurityGroupRule { guid: String, reason: String },
}

impl RecipeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecipeError::InvalidDownloadUri { .. } => ErrorKind::Resolution,
            RecipeError::IncompatibleBindings(_) => ErrorKind::PolicyViolation,
            RecipeError::Schema(_)
            | RecipeError::InvalidImageReference(_)
            | RecipeError::NoCompilerDefined { .. }
            | RecipeError::InvalidSecurityGroupRule { .. } => ErrorKind::Configuration,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Resolution
    }
}

pub type Result<T> = std::result::Result<T, RecipeError>;
