//! Error types for the storefront admin.
//!
//! [`StoreError`] covers request errors, object-store errors, validation
//! failures, and configuration problems. Each variant maps to an HTTP status
//! through [`StoreError::status_code`], which the admin API uses when turning
//! an error into a JSON response.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A validation failure, either for a whole form or for individual fields.
///
/// # Examples
///
/// ```
/// use storefront_core::error::ValidationError;
///
/// let err = ValidationError::new("This field is required.", "required");
/// assert_eq!(err.to_string(), "This field is required.");
///
/// let err = ValidationError::new("", "")
///     .with_field_error("unit_price", "Enter a number.");
/// assert_eq!(err.to_string(), "unit_price: Enter a number.");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// The non-field error message, empty when only field errors are present.
    pub message: String,
    /// Short machine-readable code (`"required"`, `"invalid"`, `"min_num"`, ...).
    pub code: String,
    /// Per-field messages keyed by field name.
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    /// Creates a form-level validation error.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            field_errors: BTreeMap::new(),
        }
    }

    /// Creates a validation error from per-field messages.
    pub fn with_field_errors(field_errors: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            message: String::new(),
            code: String::new(),
            field_errors,
        }
    }

    /// Adds a message for a single field.
    #[must_use]
    pub fn with_field_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Returns `true` when neither a message nor any field error is set.
    pub fn is_empty(&self) -> bool {
        self.message.is_empty() && self.field_errors.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.message.is_empty() {
            return write!(f, "{}", self.message);
        }
        let mut first = true;
        for (field, errors) in &self.field_errors {
            for error in errors {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {error}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The error type used across the storefront crates.
#[derive(Error, Debug)]
pub enum StoreError {
    // ── Request errors ───────────────────────────────────────────────

    /// HTTP 400 Bad Request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 404 Not Found (unknown model, route, or action).
    #[error("Not found: {0}")]
    NotFound(String),

    // ── Object store errors ──────────────────────────────────────────

    /// A lookup expected one object and found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// A delete was refused because other objects still reference the target.
    #[error("Cannot delete: {0}")]
    ProtectedError(String),

    /// A generic storage failure.
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ── Validation ───────────────────────────────────────────────────

    /// One or more submitted values failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The admin registrations are inconsistent.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Serialization / IO ───────────────────────────────────────────

    /// A row could not be converted to or from its typed model.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StoreError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `BadRequest`, `ValidationError` -> 400
    /// - `NotFound`, `DoesNotExist` -> 404
    /// - `ProtectedError` -> 409
    /// - everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::ValidationError(_) => 400,
            Self::NotFound(_) | Self::DoesNotExist(_) => 404,
            Self::ProtectedError(_) => 409,
            Self::DatabaseError(_)
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Shorthand for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;
