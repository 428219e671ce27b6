//! Ordered collection of uniquely named properties
//!
//! [`PropertyManager`] owns every property declared into it. Enumeration
//! follows declaration order; lookup is by case-insensitive name.
//!
//! A manager is not internally locked. Callers that share one between threads
//! wrap it themselves (the data service hands out `Arc<RwLock<_>>`).

use indexmap::IndexMap;

use crate::error::{PropertyError, Result};
use crate::history::PropertyHistory;
use crate::property::Property;
use crate::value::{PropertyValue, ValueKind};
use crate::with_value::PropertyWithValue;

/// Ordered, uniquely keyed property collection
#[derive(Debug, Clone, Default)]
pub struct PropertyManager {
    /// Keyed by lower-cased name, in declaration order
    properties: IndexMap<String, Box<dyn Property>>,
}

impl PropertyManager {
    /// Create empty manager
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            properties: IndexMap::new(),
        }
    }

    fn key(name: &str) -> String {
        name.to_lowercase()
    }

    /// Take ownership of a property
    ///
    /// # Errors
    /// `EmptyName` for a blank name, `DuplicateName` when a property with the
    /// same case-normalized name exists. The manager is unchanged on error.
    pub fn declare_property<P: Property>(&mut self, property: P) -> Result<()> {
        self.declare_boxed(Box::new(property))
    }

    /// Take ownership of a boxed property
    ///
    /// # Errors
    /// See [`declare_property`](Self::declare_property)
    pub fn declare_boxed(&mut self, property: Box<dyn Property>) -> Result<()> {
        if property.name().trim().is_empty() {
            return Err(PropertyError::EmptyName);
        }
        let key = Self::key(property.name());
        if self.properties.contains_key(&key) {
            tracing::warn!("Rejected duplicate declaration of '{}'", property.name());
            return Err(PropertyError::duplicate(property.name()));
        }
        tracing::debug!(
            "Declared property '{}' ({}) = {}",
            property.name(),
            property.type_name(),
            property.value()
        );
        self.properties.insert(key, property);
        Ok(())
    }

    /// Declare an input property holding `value` as its default
    ///
    /// # Errors
    /// See [`declare_property`](Self::declare_property)
    pub fn declare_value<T: PropertyValue>(
        &mut self,
        name: &str,
        value: T,
        documentation: &str,
    ) -> Result<()> {
        self.declare_property(PropertyWithValue::new(name, value).with_documentation(documentation))
    }

    /// Check whether a property with this name exists
    #[inline]
    #[must_use]
    pub fn exists_property(&self, name: &str) -> bool {
        self.properties.contains_key(&Self::key(name))
    }

    /// Borrow a property by name
    ///
    /// # Errors
    /// `NotFound` when no such property is declared
    pub fn get_property(&self, name: &str) -> Result<&dyn Property> {
        self.properties
            .get(&Self::key(name))
            .map(|p| p.as_ref() as &dyn Property)
            .ok_or_else(|| PropertyError::not_found(name))
    }

    /// Mutably borrow a property by name
    ///
    /// # Errors
    /// `NotFound` when no such property is declared
    pub fn get_property_mut(&mut self, name: &str) -> Result<&mut dyn Property> {
        match self.properties.get_mut(&Self::key(name)) {
            Some(property) => Ok(property.as_mut()),
            None => Err(PropertyError::not_found(name)),
        }
    }

    /// Borrow a property as its concrete typed form
    ///
    /// # Errors
    /// `NotFound` when absent, `TypeMismatch` when it does not hold a `T`
    pub fn get_typed_property<T: PropertyValue>(&self, name: &str) -> Result<&PropertyWithValue<T>> {
        let property = self.get_property(name)?;
        property
            .as_any()
            .downcast_ref::<PropertyWithValue<T>>()
            .ok_or_else(|| Self::mismatch(property, T::KIND))
    }

    /// Read a typed copy of a property's value
    ///
    /// # Errors
    /// `NotFound` when absent, `TypeMismatch` when it does not hold a `T`
    pub fn get_value<T: PropertyValue>(&self, name: &str) -> Result<T> {
        let property = self.get_property(name)?;
        T::from_value(property.typed_value()).ok_or_else(|| Self::mismatch(property, T::KIND))
    }

    fn mismatch(property: &dyn Property, expected: ValueKind) -> PropertyError {
        PropertyError::TypeMismatch {
            name: property.name().to_string(),
            expected,
            actual: property.kind(),
        }
    }

    /// Canonical text of a property's value
    ///
    /// # Errors
    /// `NotFound` when no such property is declared
    pub fn get_property_value(&self, name: &str) -> Result<String> {
        self.get_property(name).map(|p| p.value())
    }

    /// Assign a typed value
    ///
    /// # Errors
    /// `NotFound`, `TypeMismatch` or `Validation`; the previous value is kept
    /// on any error
    pub fn set_property<T: PropertyValue>(&mut self, name: &str, value: T) -> Result<()> {
        let property = self.get_property_mut(name)?;
        property.set_typed_value(value.into_value()).map_err(|e| {
            tracing::warn!("{}", e);
            e
        })?;
        Ok(())
    }

    /// Assign from text
    ///
    /// # Errors
    /// `NotFound`, `TypeConversion` or `Validation`; the previous value is kept
    /// on any error
    pub fn set_property_value(&mut self, name: &str, text: &str) -> Result<()> {
        let property = self.get_property_mut(name)?;
        property.set_value(text).map_err(|e| {
            tracing::warn!("{}", e);
            e
        })?;
        Ok(())
    }

    /// Assign from text by declaration index
    ///
    /// # Errors
    /// `OrdinalOutOfRange` for a bad index, otherwise as
    /// [`set_property_value`](Self::set_property_value)
    pub fn set_property_ordinal(&mut self, index: usize, text: &str) -> Result<()> {
        let count = self.properties.len();
        let (_, property) = self
            .properties
            .get_index_mut(index)
            .ok_or(PropertyError::OrdinalOutOfRange { index, count })?;
        property.set_value(text)?;
        Ok(())
    }

    /// Assign several properties from `Name=Value;Name=Value`
    ///
    /// Either every assignment succeeds or none is kept. A backslash before
    /// `;`, `=` or another backslash makes it literal, which is how
    /// [`as_string`](Self::as_string) writes them.
    ///
    /// # Errors
    /// `Syntax` for a fragment without `=`, otherwise the first failing
    /// assignment's error
    pub fn set_properties(&mut self, assignments: &str) -> Result<()> {
        let mut pairs = Vec::new();
        for fragment in split_unescaped(assignments, ';') {
            if fragment.trim().is_empty() {
                continue;
            }
            let (name, text) =
                split_once_unescaped(fragment, '=').ok_or_else(|| PropertyError::Syntax {
                    fragment: fragment.to_string(),
                })?;
            pairs.push((unescape(name).trim().to_string(), unescape(text)));
        }

        let mut saved: Vec<(String, Box<dyn Property>)> = Vec::with_capacity(pairs.len());
        let outcome = self.apply_assignments(&pairs, &mut saved);
        if outcome.is_err() {
            // Restore in reverse so the oldest snapshot of a repeated name wins
            for (key, original) in saved.into_iter().rev() {
                if let Some(slot) = self.properties.get_mut(&key) {
                    *slot = original;
                }
            }
        }
        outcome
    }

    fn apply_assignments(
        &mut self,
        pairs: &[(String, String)],
        saved: &mut Vec<(String, Box<dyn Property>)>,
    ) -> Result<()> {
        for (name, text) in pairs {
            let key = Self::key(name);
            let property = self
                .properties
                .get_mut(&key)
                .ok_or_else(|| PropertyError::not_found(name.as_str()))?;
            saved.push((key, property.clone_box()));
            property.set_value(text)?;
        }
        Ok(())
    }

    /// Restore a property's construction-time default
    ///
    /// # Errors
    /// `NotFound` when no such property is declared
    pub fn reset_property(&mut self, name: &str) -> Result<()> {
        self.get_property_mut(name)?.reset();
        Ok(())
    }

    /// Remove and return a property, keeping the order of the rest
    ///
    /// # Errors
    /// `NotFound` when no such property is declared
    pub fn remove_property(&mut self, name: &str) -> Result<Box<dyn Property>> {
        self.properties
            .shift_remove(&Self::key(name))
            .ok_or_else(|| PropertyError::not_found(name))
    }

    /// Properties in declaration order
    #[must_use]
    pub fn get_properties(&self) -> Vec<&dyn Property> {
        self.iter().collect()
    }

    /// Iterate properties in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Property> {
        self.properties.values().map(|p| p.as_ref() as &dyn Property)
    }

    /// Number of declared properties
    #[inline]
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Check if no property is declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Check every property, logging each diagnostic
    ///
    /// Returns `true` only when every property reports no error.
    pub fn validate_properties(&self) -> bool {
        let mut all_valid = true;
        for property in self.iter() {
            let message = property.is_valid();
            if !message.is_empty() {
                tracing::warn!("Property '{}' is not valid: {}", property.name(), message);
                all_valid = false;
            }
        }
        all_valid
    }

    /// Name → diagnostic for every invalid property, in declaration order
    #[must_use]
    pub fn validation_errors(&self) -> IndexMap<String, String> {
        self.iter()
            .filter_map(|p| {
                let message = p.is_valid();
                (!message.is_empty()).then(|| (p.name().to_string(), message))
            })
            .collect()
    }

    /// Snapshot of every property, in declaration order
    #[must_use]
    pub fn history(&self) -> Vec<PropertyHistory> {
        self.iter().map(|p| p.create_history()).collect()
    }

    /// Serialize as `Name=Value;Name=Value`
    ///
    /// Properties still at their default are skipped unless
    /// `include_defaults` is set. The output is accepted by
    /// [`set_properties`](Self::set_properties).
    #[must_use]
    pub fn as_string(&self, include_defaults: bool) -> String {
        self.iter()
            .filter(|p| include_defaults || !p.is_default())
            .map(|p| format!("{}={}", escape(p.name(), "\\;="), escape(&p.value(), "\\;")))
            .collect::<Vec<_>>()
            .join(";")
    }
}

fn escape(text: &str, special: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Undo `escape`; a backslash before any other character stays literal
fn unescape(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next_if(|n| matches!(n, '\\' | ';' | '=')) {
                plain.push(next);
                continue;
            }
        }
        plain.push(c);
    }
    plain
}

fn split_unescaped(text: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delimiter {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

fn split_once_unescaped(text: &str, delimiter: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delimiter {
            return Some((&text[..i], &text[i + c.len_utf8()..]));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::BoundedValidator;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn reduction_manager() -> PropertyManager {
        let mut manager = PropertyManager::new();
        manager
            .declare_property(
                PropertyWithValue::new("frequency", 60.0)
                    .with_validator(Arc::new(BoundedValidator::between(0.0, 120.0))),
            )
            .unwrap();
        manager.declare_value("wavelength", 1.5, "").unwrap();
        manager.declare_value("bank", 1, "Detector bank").unwrap();
        manager
            .declare_value("Instrument", "POWGEN".to_string(), "")
            .unwrap();
        manager
    }

    #[test]
    fn declare_then_exists() {
        let manager = reduction_manager();
        assert!(manager.exists_property("frequency"));
        assert!(manager.exists_property("FREQUENCY"));
        assert!(!manager.exists_property("tof_min"));
        assert_eq!(manager.property_count(), 4);
    }

    #[test]
    fn duplicate_is_case_insensitive() {
        let mut manager = reduction_manager();
        let err = manager.declare_value("Bank", 2, "").unwrap_err();
        assert_eq!(err, PropertyError::duplicate("Bank"));
        assert_eq!(manager.property_count(), 4);
        assert_eq!(manager.get_value::<i32>("bank").unwrap(), 1);
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut manager = PropertyManager::new();
        assert_eq!(
            manager.declare_value(" ", 1, ""),
            Err(PropertyError::EmptyName)
        );
        assert!(manager.is_empty());
    }

    #[test]
    fn unknown_names_fail() {
        let mut manager = reduction_manager();
        assert!(matches!(
            manager.get_property("nope"),
            Err(PropertyError::NotFound { .. })
        ));
        assert!(matches!(
            manager.get_property_value("nope"),
            Err(PropertyError::NotFound { .. })
        ));
        assert!(matches!(
            manager.set_property_value("nope", "1"),
            Err(PropertyError::NotFound { .. })
        ));
    }

    #[test]
    fn typed_access_checks_kind() {
        let mut manager = reduction_manager();
        assert_eq!(manager.get_value::<f64>("frequency").unwrap(), 60.0);
        let err = manager.get_value::<i32>("frequency").unwrap_err();
        assert_eq!(
            err,
            PropertyError::TypeMismatch {
                name: "frequency".to_string(),
                expected: ValueKind::Int,
                actual: ValueKind::Double,
            }
        );
        assert!(manager.set_property("bank", 2.5).is_err());
        manager.set_property("bank", 4).unwrap();
        assert_eq!(manager.get_typed_property::<i32>("bank").unwrap().get(), &4);
        assert!(manager.get_typed_property::<String>("bank").is_err());
    }

    #[test]
    fn string_path_round_trip() {
        let mut manager = reduction_manager();
        manager.set_property_value("wavelength", "2.665").unwrap();
        assert_eq!(manager.get_property_value("wavelength").unwrap(), "2.665");
        assert_eq!(manager.get_value::<f64>("wavelength").unwrap(), 2.665);
    }

    #[test]
    fn rejected_value_is_not_stored() {
        let mut manager = reduction_manager();
        let err = manager.set_property_value("frequency", "500").unwrap_err();
        assert!(matches!(err, PropertyError::Validation { .. }));
        assert_eq!(manager.get_property_value("frequency").unwrap(), "60");
    }

    #[test]
    fn properties_keep_declaration_order() {
        let manager = reduction_manager();
        let names: Vec<&str> = manager.get_properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["frequency", "wavelength", "bank", "Instrument"]);
    }

    #[test]
    fn validate_properties_gates_execution() {
        let mut manager = PropertyManager::new();
        manager
            .declare_property(
                PropertyWithValue::new("bank", 0)
                    .with_validator(Arc::new(BoundedValidator::new().with_lower(1))),
            )
            .unwrap();
        assert!(!manager.validate_properties());
        assert_eq!(manager.validation_errors().len(), 1);

        manager.set_property("bank", 3).unwrap();
        assert!(manager.validate_properties());
        assert!(manager.validation_errors().is_empty());
    }

    #[test]
    fn set_properties_applies_all() {
        let mut manager = reduction_manager();
        manager.set_properties("bank=3; Instrument=NOMAD;").unwrap();
        assert_eq!(manager.get_value::<i32>("bank").unwrap(), 3);
        assert_eq!(manager.get_property_value("Instrument").unwrap(), "NOMAD");
    }

    #[test]
    fn set_properties_is_all_or_nothing() {
        let mut manager = reduction_manager();
        let err = manager
            .set_properties("bank=3;wavelength=2.0;frequency=abc")
            .unwrap_err();
        assert!(matches!(err, PropertyError::TypeConversion { .. }));
        assert_eq!(manager.get_value::<i32>("bank").unwrap(), 1);
        assert_eq!(manager.get_value::<f64>("wavelength").unwrap(), 1.5);
        assert!(manager.get_property("bank").unwrap().is_default());
    }

    #[test]
    fn set_properties_rejects_bad_syntax() {
        let mut manager = reduction_manager();
        let err = manager.set_properties("bank=3;wavelength").unwrap_err();
        assert_eq!(
            err,
            PropertyError::Syntax {
                fragment: "wavelength".to_string()
            }
        );
        assert_eq!(manager.get_value::<i32>("bank").unwrap(), 1);
    }

    #[test]
    fn ordinal_assignment() {
        let mut manager = reduction_manager();
        manager.set_property_ordinal(2, "9").unwrap();
        assert_eq!(manager.get_value::<i32>("bank").unwrap(), 9);
        assert_eq!(
            manager.set_property_ordinal(10, "1"),
            Err(PropertyError::OrdinalOutOfRange { index: 10, count: 4 })
        );
    }

    #[test]
    fn as_string_feeds_set_properties() {
        let mut source = reduction_manager();
        source.set_properties("bank=2;Instrument=SNAP").unwrap();
        let text = source.as_string(false);
        assert_eq!(text, "bank=2;Instrument=SNAP");

        let mut target = reduction_manager();
        target.set_properties(&text).unwrap();
        assert_eq!(target.as_string(true), source.as_string(true));
    }

    #[test]
    fn as_string_escapes_delimiters() {
        let mut source = reduction_manager();
        source.declare_value("Title", "a;b".to_string(), "").unwrap();
        source.declare_value("Filter", r"x=1;C:\data\\".to_string(), "").unwrap();
        source.set_property("bank", 3).unwrap();
        let text = source.as_string(true);
        assert!(text.contains(r"Title=a\;b"));

        let mut target = reduction_manager();
        target.declare_value("Title", String::new(), "").unwrap();
        target.declare_value("Filter", String::new(), "").unwrap();
        target.set_properties(&text).unwrap();
        assert_eq!(target.get_property_value("Title").unwrap(), "a;b");
        assert_eq!(target.get_property_value("Filter").unwrap(), r"x=1;C:\data\\");
        assert_eq!(target.as_string(true), text);
    }

    #[test]
    fn unrecognised_backslash_is_literal() {
        let mut manager = reduction_manager();
        manager.set_properties(r"Instrument=C:\data;bank=2").unwrap();
        assert_eq!(manager.get_property_value("Instrument").unwrap(), r"C:\data");
        assert_eq!(manager.get_value::<i32>("bank").unwrap(), 2);
    }

    #[test]
    fn string_array_with_delimiters_survives_as_string() {
        let mut source = PropertyManager::new();
        source
            .declare_value("Names", vec!["a,b".to_string(), " c".to_string()], "")
            .unwrap();
        source.declare_value("Title", "x;y=z".to_string(), "").unwrap();
        let text = source.as_string(true);

        let mut target = PropertyManager::new();
        target.declare_value("Names", Vec::<String>::new(), "").unwrap();
        target.declare_value("Title", String::new(), "").unwrap();
        target.set_properties(&text).unwrap();
        assert_eq!(
            target.get_value::<Vec<String>>("Names").unwrap(),
            vec!["a,b".to_string(), " c".to_string()]
        );
        assert_eq!(target.get_property_value("Title").unwrap(), "x;y=z");
    }

    #[test]
    fn reset_and_remove() {
        let mut manager = reduction_manager();
        manager.set_property("bank", 5).unwrap();
        manager.reset_property("BANK").unwrap();
        assert!(manager.get_property("bank").unwrap().is_default());

        let removed = manager.remove_property("wavelength").unwrap();
        assert_eq!(removed.name(), "wavelength");
        assert!(!manager.exists_property("wavelength"));
        let names: Vec<&str> = manager.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["frequency", "bank", "Instrument"]);
    }

    #[test]
    fn clone_is_independent() {
        let original = reduction_manager();
        let mut copy = original.clone();
        copy.set_property("bank", 8).unwrap();
        assert_eq!(original.get_value::<i32>("bank").unwrap(), 1);
    }

    #[test]
    fn history_in_declaration_order() {
        let mut manager = reduction_manager();
        manager.set_property("bank", 2).unwrap();
        let history = manager.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2].name(), "bank");
        assert!(!history[2].is_default());
        assert!(history[0].is_default());
    }
}
