use std::fmt;

use thiserror::Error;

/// Errors that can occur in the recipe-policy crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A policy violation occurred
    #[error("Policy violation: {0}")]
    Violation(#[from] Violation),
    /// The API configuration could not be loaded or is inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// A view could not be encoded as JSON
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A request-terminal failure with details about what failed.
///
/// Violations are never retried by the core. The caller maps
/// [`ViolationKind`] onto its transport (see [`ViolationKind::status_code`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Violation {
    /// The kind of violation that occurred
    pub kind: ViolationKind,
    /// Human-readable message explaining the violation
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// An action requires a principal and none is present.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Unauthenticated, message)
    }

    /// The principal is present but lacks the capability for `action`.
    pub fn forbidden(action: &'static str, message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Forbidden { action }, message)
    }

    /// The object is absent, or present outside the caller's scope.
    pub fn not_found(resource: &'static str) -> Self {
        Self::new(
            ViolationKind::NotFound { resource },
            format!("No {} matches the given query", resource),
        )
    }

    /// A payload field failed validation.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Validation { field }, message)
    }
}

/// The kind of violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Authentication is required but missing
    Unauthenticated,
    /// The principal lacks the capability for a specific action
    Forbidden {
        /// The action that was refused
        action: &'static str,
    },
    /// The object does not exist within the caller's scope
    NotFound {
        /// The kind of object looked up
        resource: &'static str,
    },
    /// A payload was malformed
    Validation {
        /// The offending field
        field: &'static str,
    },
}

impl ViolationKind {
    /// HTTP status a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ViolationKind::Unauthenticated => 401,
            ViolationKind::Forbidden { .. } => 403,
            ViolationKind::NotFound { .. } => 404,
            ViolationKind::Validation { .. } => 400,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Unauthenticated => write!(f, "Unauthenticated"),
            ViolationKind::Forbidden { action } => write!(f, "Forbidden for '{}'", action),
            ViolationKind::NotFound { resource } => write!(f, "{} not found", resource),
            ViolationKind::Validation { field } => write!(f, "Invalid '{}'", field),
        }
    }
}
