//! The dynamic property contract
//!
//! [`Property`] is the object-safe face every stored property presents to a
//! [`PropertyManager`](crate::PropertyManager), GUIs and command lines. The
//! string path (`value` / `set_value`) and the typed path
//! (`typed_value` / `set_typed_value`) must stay consistent: the text form of
//! a value always parses back to the same value.

use std::any::Any;
use std::fmt::Debug;

use crate::direction::Direction;
use crate::error::PropertyError;
use crate::history::PropertyHistory;
use crate::value::{Value, ValueKind};

/// A named, typed, documented configuration value
pub trait Property: Debug + Send + Sync + Any {
    /// Immutable identifier
    fn name(&self) -> &str;

    /// Immutable flow direction
    fn direction(&self) -> Direction;

    /// Free-text documentation
    fn documentation(&self) -> &str;

    /// Replace the documentation (no validation)
    fn set_documentation(&mut self, documentation: String);

    /// Kind tag of the stored value
    fn kind(&self) -> ValueKind;

    /// User-facing type name
    fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    /// Diagnostic for the current value, empty when valid
    fn is_valid(&self) -> String {
        String::new()
    }

    /// Canonical text of the current value
    fn value(&self) -> String;

    /// Canonical text of the construction-time default
    fn default_value(&self) -> String;

    /// Parse, validate and assign
    ///
    /// Returns `true` when the property now differs from its default.
    ///
    /// # Errors
    /// `TypeConversion` when the text does not parse, `Validation` when the
    /// parsed value is rejected. The previous value is kept on error.
    fn set_value(&mut self, text: &str) -> Result<bool, PropertyError>;

    /// Current value as a tagged [`Value`]
    fn typed_value(&self) -> Value;

    /// Validate and assign a tagged value
    ///
    /// # Errors
    /// `TypeMismatch` when the kind differs, `Validation` when rejected.
    fn set_typed_value(&mut self, value: Value) -> Result<bool, PropertyError>;

    /// Legal values when constrained to a finite set
    fn allowed_values(&self) -> Vec<String> {
        Vec::new()
    }

    /// True while the value equals the construction-time default
    fn is_default(&self) -> bool;

    /// Restore the construction-time default
    fn reset(&mut self);

    /// Type of the attached validator, empty when none
    fn validator_type(&self) -> &'static str {
        ""
    }

    /// Snapshot of the current state
    fn create_history(&self) -> PropertyHistory {
        PropertyHistory::new(
            self.name(),
            self.value(),
            self.type_name(),
            self.is_default(),
            self.direction(),
        )
    }

    /// Clone behind a box
    fn clone_box(&self) -> Box<dyn Property>;

    /// Upcast for checked downcasting to the concrete property type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for checked downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn Property> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
