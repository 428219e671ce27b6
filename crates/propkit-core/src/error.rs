//! Error types for property declaration, assignment and lookup
//!
//! Every failure surfaces to the immediate caller. A failed assignment never
//! leaves a partially updated value behind.

use crate::value::ValueKind;

/// Errors raised by properties and property managers
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    /// Direction code outside `Input`/`Output`/`InOut`
    #[error("direction should be 0 (Input), 1 (Output) or 2 (InOut), got {0}")]
    InvalidDirection(u32),

    /// Property declared without a name
    #[error("an empty property name is not permitted")]
    EmptyName,

    /// A property with the same (case-normalized) name already exists
    #[error("property '{name}' is already declared")]
    DuplicateName { name: String },

    /// No property with this name
    #[error("unknown property: '{name}'")]
    NotFound { name: String },

    /// Stored kind differs from the requested kind
    #[error("property '{name}' holds a {actual} value, not a {expected} value")]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// Text could not be parsed into the declared kind
    #[error("could not set property '{name}': cannot convert \"{text}\" to {kind}: {reason}")]
    TypeConversion {
        name: String,
        text: String,
        kind: ValueKind,
        reason: String,
    },

    /// Parsed value rejected by the attached validator
    #[error("could not set property '{name}': {message}")]
    Validation { name: String, message: String },

    /// Malformed `Name=Value;...` assignment string
    #[error("malformed assignment '{fragment}': expected Name=Value")]
    Syntax { fragment: String },

    /// Declaration index past the end of the manager
    #[error("property ordinal {index} is out of range (have {count})")]
    OrdinalOutOfRange { index: usize, count: usize },
}

impl PropertyError {
    /// Create not-found error for name
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create duplicate-name error for name
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Check whether the error was caused by a rejected value
    ///
    /// Conversion and validation failures leave the stored value unchanged,
    /// so the caller may retry with different text.
    #[inline]
    #[must_use]
    pub fn is_value_error(&self) -> bool {
        matches!(self, Self::TypeConversion { .. } | Self::Validation { .. })
    }
}

/// Result alias for property operations
pub type Result<T, E = PropertyError> = std::result::Result<T, E>;
