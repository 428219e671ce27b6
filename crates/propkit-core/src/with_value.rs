//! Strongly typed property storage
//!
//! [`PropertyWithValue<T>`] binds one [`PropertyValue`] type to the
//! [`Property`] contract. Assignment is transactional: the candidate is parsed
//! and validated first, and only an accepted value replaces the current one.

use std::any::Any;

use crate::direction::Direction;
use crate::error::PropertyError;
use crate::property::Property;
use crate::validator::SharedValidator;
use crate::value::{PropertyValue, Value, ValueKind};

/// Property holding a value of type `T`
#[derive(Debug, Clone)]
pub struct PropertyWithValue<T: PropertyValue> {
    name: String,
    documentation: String,
    direction: Direction,
    value: T,
    initial: T,
    validator: Option<SharedValidator<T>>,
}

/// Property holding an ordered sequence
pub type ArrayProperty<T> = PropertyWithValue<Vec<T>>;

impl<T: PropertyValue> PropertyWithValue<T> {
    /// Create an input property whose default is `value`
    #[must_use]
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self::with_direction(name, value, Direction::Input)
    }

    /// Create a property with an explicit direction
    #[must_use]
    pub fn with_direction(name: impl Into<String>, value: T, direction: Direction) -> Self {
        Self {
            name: name.into(),
            documentation: String::new(),
            direction,
            initial: value.clone(),
            value,
            validator: None,
        }
    }

    /// Create a property from a raw direction code
    ///
    /// # Errors
    /// `InvalidDirection` when `code` is not 0, 1 or 2
    pub fn with_direction_code(
        name: impl Into<String>,
        value: T,
        code: u32,
    ) -> Result<Self, PropertyError> {
        let direction = Direction::try_from(code)?;
        Ok(Self::with_direction(name, value, direction))
    }

    /// Attach a validator
    #[must_use]
    pub fn with_validator(mut self, validator: SharedValidator<T>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Set documentation
    #[must_use]
    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into();
        self
    }

    /// Borrow the current value
    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Borrow the construction-time default
    #[inline]
    #[must_use]
    pub fn initial(&self) -> &T {
        &self.initial
    }

    /// Attached validator, if any
    #[inline]
    #[must_use]
    pub fn validator(&self) -> Option<&SharedValidator<T>> {
        self.validator.as_ref()
    }

    /// Validate and assign a typed value
    ///
    /// Returns `true` when the property now differs from its default.
    ///
    /// # Errors
    /// `Validation` when the validator rejects `value`; the previous value is kept
    pub fn set(&mut self, value: T) -> Result<bool, PropertyError> {
        if let Some(validator) = &self.validator {
            validator
                .check(&value)
                .map_err(|message| PropertyError::Validation {
                    name: self.name.clone(),
                    message,
                })?;
        }
        self.value = value;
        Ok(!self.is_default())
    }

    fn parse(&self, text: &str) -> Result<T, PropertyError> {
        T::parse_text(text).map_err(|reason| PropertyError::TypeConversion {
            name: self.name.clone(),
            text: text.to_string(),
            kind: T::KIND,
            reason,
        })
    }
}

impl<T: PropertyValue> Property for PropertyWithValue<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn documentation(&self) -> &str {
        &self.documentation
    }

    fn set_documentation(&mut self, documentation: String) {
        self.documentation = documentation;
    }

    fn kind(&self) -> ValueKind {
        T::KIND
    }

    fn is_valid(&self) -> String {
        match &self.validator {
            Some(validator) => validator.check(&self.value).err().unwrap_or_default(),
            None => String::new(),
        }
    }

    fn value(&self) -> String {
        self.value.to_text()
    }

    fn default_value(&self) -> String {
        self.initial.to_text()
    }

    fn set_value(&mut self, text: &str) -> Result<bool, PropertyError> {
        let parsed = self.parse(text)?;
        self.set(parsed)
    }

    fn typed_value(&self) -> Value {
        self.value.clone().into_value()
    }

    fn set_typed_value(&mut self, value: Value) -> Result<bool, PropertyError> {
        let supplied = value.kind();
        let typed = T::from_value(value).ok_or_else(|| PropertyError::TypeMismatch {
            name: self.name.clone(),
            expected: supplied,
            actual: T::KIND,
        })?;
        self.set(typed)
    }

    fn allowed_values(&self) -> Vec<String> {
        self.validator
            .as_ref()
            .map(|v| v.allowed_values())
            .unwrap_or_default()
    }

    fn is_default(&self) -> bool {
        self.value == self.initial
    }

    fn reset(&mut self) {
        self.value = self.initial.clone();
    }

    fn validator_type(&self) -> &'static str {
        self.validator.as_ref().map_or("", |v| v.validator_type())
    }

    fn clone_box(&self) -> Box<dyn Property> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{BoundedValidator, ListValidator};
    use std::sync::Arc;

    #[test]
    fn new_property_is_default() {
        let p = PropertyWithValue::new("BackRun", 0);
        assert!(p.is_default());
        assert_eq!(p.value(), "0");
        assert_eq!(p.direction(), Direction::Input);
        assert_eq!(p.type_name(), "number");
    }

    #[test]
    fn set_value_parses_and_flips_default() {
        let mut p = PropertyWithValue::new("BackRun", 0);
        assert_eq!(p.set_value("42"), Ok(true));
        assert_eq!(*p.get(), 42);
        assert!(!p.is_default());
    }

    #[test]
    fn conversion_failure_keeps_value() {
        let mut p = PropertyWithValue::new("BackRun", 7);
        let err = p.set_value("not-a-number").unwrap_err();
        assert!(matches!(err, PropertyError::TypeConversion { kind: ValueKind::Int, .. }));
        assert_eq!(*p.get(), 7);
        assert!(p.is_default());
    }

    #[test]
    fn validation_failure_keeps_value() {
        let mut p = PropertyWithValue::new("frequency", 60.0)
            .with_validator(Arc::new(BoundedValidator::between(0.0, 120.0)));
        let err = p.set_value("500").unwrap_err();
        assert!(matches!(err, PropertyError::Validation { ref name, .. } if name == "frequency"));
        assert_eq!(*p.get(), 60.0);
        assert!(p.is_valid().is_empty());
    }

    #[test]
    fn invalid_default_is_reported() {
        let p = PropertyWithValue::new("bank", 0)
            .with_validator(Arc::new(BoundedValidator::new().with_lower(1)));
        assert!(!p.is_valid().is_empty());
        assert_eq!(p.validator_type(), "bounded");
    }

    #[test]
    fn setting_default_again_stays_default() {
        let mut p = PropertyWithValue::new("wavelength", 1.5);
        assert_eq!(p.set_value("1.5"), Ok(false));
        assert!(p.is_default());
    }

    #[test]
    fn reset_restores_initial() {
        let mut p = PropertyWithValue::new("Instrument", "POWGEN".to_string());
        p.set_value("NOMAD").unwrap();
        assert!(!p.is_default());
        p.reset();
        assert_eq!(p.value(), "POWGEN");
        assert!(p.is_default());
    }

    #[test]
    fn bad_direction_code_fails() {
        let err = PropertyWithValue::with_direction_code("x", 1, 7).unwrap_err();
        assert_eq!(err, PropertyError::InvalidDirection(7));
        let ok = PropertyWithValue::with_direction_code("x", 1, 2).unwrap();
        assert_eq!(ok.direction(), Direction::InOut);
    }

    #[test]
    fn typed_value_checks_kind() {
        let mut p = PropertyWithValue::new("bank", 1);
        assert_eq!(p.set_typed_value(Value::Int(3)), Ok(true));
        let err = p.set_typed_value(Value::Double(3.0)).unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { .. }));
        assert_eq!(p.typed_value(), Value::Int(3));
    }

    #[test]
    fn allowed_values_come_from_validator() {
        let p = PropertyWithValue::new("Units", "Hz".to_string())
            .with_validator(Arc::new(ListValidator::from_strs(&["Hz", "Angstrom", "A"])));
        assert_eq!(p.allowed_values(), vec!["Hz", "Angstrom", "A"]);
        assert!(PropertyWithValue::new("Free", String::new()).allowed_values().is_empty());
    }

    #[test]
    fn array_property_round_trips() {
        let mut p: ArrayProperty<String> = PropertyWithValue::new(
            "FrequencyLogNames",
            vec!["SpeedRequest1".to_string(), "Speed1".to_string()],
        );
        assert_eq!(p.value(), "SpeedRequest1,Speed1");
        let text = p.value();
        assert_eq!(p.set_value(&text), Ok(false));
        p.set_value("frequency, ,Speed1").unwrap();
        assert_eq!(p.get().len(), 2);
    }

    #[test]
    fn history_reflects_state() {
        let mut p = PropertyWithValue::new("NormRun", 0).with_documentation("Normalization run");
        p.set_value("12").unwrap();
        let history = p.create_history();
        assert_eq!(history.name(), "NormRun");
        assert_eq!(history.value(), "12");
        assert!(!history.is_default());
        assert_eq!(p.documentation(), "Normalization run");
    }
}
