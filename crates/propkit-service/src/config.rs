//! TOML description of named property managers
//!
//! A registry file lists managers, each with its declared properties:
//!
//! ```toml
//! [[managers]]
//! name = "__pd_reduction_properties"
//!
//! [[managers.properties]]
//! name = "frequency"
//! kind = "double"
//! default = "60"
//! lower = 0.0
//! upper = 120.0
//! ```
//!
//! Defaults are given as text and parsed with the property's own rules.
//! Constraints become validators; a constraint that makes no sense for the
//! declared kind is an error rather than silently ignored.

use std::collections::HashSet;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use propkit_core::{
    ArrayBoundedValidator, ArrayLengthValidator, BoundedValidator, CompositeValidator, Direction,
    ListValidator, MandatoryValidator, Property, PropertyError, PropertyManager, PropertyValue,
    PropertyWithValue, SharedValidator, ValueKind,
};
use serde::{Deserialize, Serialize};

use crate::data_service::{share, PropertyManagerDataService};
use crate::error::{ConfigError, DataServiceError};

/// Registry file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Managers to register, in file order
    #[serde(default)]
    pub managers: Vec<ManagerConfig>,
}

/// One named manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Registry name
    pub name: String,
    /// Declared properties, in declaration order
    #[serde(default)]
    pub properties: Vec<PropertyConfig>,
}

/// One declared property and its constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyConfig {
    /// Property name, unique within the manager
    pub name: String,
    /// Value kind, e.g. `double` or `string_array`
    pub kind: ValueKind,
    /// Default as text; the kind's zero value when absent
    #[serde(default)]
    pub default: Option<String>,
    /// Documentation string
    #[serde(default)]
    pub doc: String,
    /// `input` unless given
    #[serde(default)]
    pub direction: Direction,
    /// Lower bound for numeric kinds (element-wise for arrays)
    #[serde(default)]
    pub lower: Option<f64>,
    /// Upper bound for numeric kinds (element-wise for arrays)
    #[serde(default)]
    pub upper: Option<f64>,
    /// Make both bounds exclusive
    #[serde(default)]
    pub exclusive: bool,
    /// Allowed values as text; empty means unrestricted
    #[serde(default)]
    pub allowed: Vec<String>,
    /// Array kinds only
    #[serde(default)]
    pub min_length: Option<usize>,
    /// Array kinds only
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Reject an empty value
    #[serde(default)]
    pub mandatory: bool,
}

impl RegistryConfig {
    /// Parse registry TOML
    ///
    /// # Errors
    /// `Toml` for malformed input or unknown fields
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a registry file
    ///
    /// # Errors
    /// `Io` when the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        tracing::debug!("Loaded registry config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Build every manager without registering any
    ///
    /// Names are checked here too, so a built set is always registrable.
    ///
    /// # Errors
    /// `Registry` for a blank name, `DuplicateManager` for a name used twice,
    /// otherwise the first manager that fails to build
    pub fn build_managers(&self) -> Result<Vec<(String, PropertyManager)>, ConfigError> {
        let mut seen = HashSet::with_capacity(self.managers.len());
        self.managers
            .iter()
            .map(|m| -> Result<_, ConfigError> {
                if m.name.trim().is_empty() {
                    return Err(ConfigError::Registry(DataServiceError::EmptyName));
                }
                if !seen.insert(m.name.as_str()) {
                    return Err(ConfigError::DuplicateManager(m.name.clone()));
                }
                Ok((m.name.clone(), m.build()?))
            })
            .collect()
    }

    /// Build every manager, then register them all, replacing same-named
    /// entries
    ///
    /// Nothing is registered when any manager fails to build. Returns the
    /// registered names in file order.
    ///
    /// # Errors
    /// As [`build_managers`](Self::build_managers)
    pub fn load_into(&self, service: &PropertyManagerDataService) -> Result<Vec<String>, ConfigError> {
        let built = self.build_managers()?;
        let mut names = Vec::with_capacity(built.len());
        for (name, manager) in built {
            service.add_or_replace(&name, share(manager))?;
            names.push(name);
        }
        tracing::info!("Registered {} property manager(s)", names.len());
        Ok(names)
    }
}

impl ManagerConfig {
    /// Declare every configured property into a fresh manager
    ///
    /// Defaults that fail their own validators are accepted but logged.
    ///
    /// # Errors
    /// `Property` for an unparsable default or a duplicate name, and
    /// `InvalidBound` / `UnsupportedConstraint` for bad constraints
    pub fn build(&self) -> Result<PropertyManager, ConfigError> {
        let mut manager = PropertyManager::new();
        for property in &self.properties {
            let built = property.build(&self.name)?;
            manager
                .declare_boxed(built)
                .map_err(|source| ConfigError::Property {
                    manager: self.name.clone(),
                    source,
                })?;
        }
        for (name, message) in manager.validation_errors() {
            tracing::warn!("Manager '{}': default of '{}' is invalid: {}", self.name, name, message);
        }
        Ok(manager)
    }
}

impl PropertyConfig {
    /// Build the property with its validators
    ///
    /// # Errors
    /// See [`ManagerConfig::build`]
    pub fn build(&self, manager: &str) -> Result<Box<dyn Property>, ConfigError> {
        match self.kind {
            ValueKind::Int => {
                self.scalar_only()?;
                self.reject(self.mandatory, "mandatory")?;
                let mut validators: Vec<SharedValidator<i32>> = Vec::new();
                if let Some(bounds) = self.bounds(int_bound)? {
                    validators.push(Arc::new(bounds));
                }
                self.push_allowed(manager, &mut validators)?;
                self.finish(manager, validators)
            }
            ValueKind::Double => {
                self.scalar_only()?;
                self.reject(self.mandatory, "mandatory")?;
                let mut validators: Vec<SharedValidator<f64>> = Vec::new();
                if let Some(bounds) = self.bounds(double_bound)? {
                    validators.push(Arc::new(bounds));
                }
                self.push_allowed(manager, &mut validators)?;
                self.finish(manager, validators)
            }
            ValueKind::Bool => {
                self.scalar_only()?;
                self.no_bounds()?;
                self.reject(self.mandatory, "mandatory")?;
                let mut validators: Vec<SharedValidator<bool>> = Vec::new();
                self.push_allowed(manager, &mut validators)?;
                self.finish(manager, validators)
            }
            ValueKind::String => {
                self.scalar_only()?;
                self.no_bounds()?;
                let mut validators: Vec<SharedValidator<String>> = Vec::new();
                if self.mandatory {
                    validators.push(Arc::new(MandatoryValidator));
                }
                self.push_allowed(manager, &mut validators)?;
                self.finish(manager, validators)
            }
            ValueKind::IntArray => {
                let mut validators = self.array_validators::<i32>()?;
                if let Some(bounds) = self.bounds(int_bound)? {
                    validators.push(Arc::new(ArrayBoundedValidator::new(bounds)));
                }
                self.finish(manager, validators)
            }
            ValueKind::DoubleArray => {
                let mut validators = self.array_validators::<f64>()?;
                if let Some(bounds) = self.bounds(double_bound)? {
                    validators.push(Arc::new(ArrayBoundedValidator::new(bounds)));
                }
                self.finish(manager, validators)
            }
            ValueKind::StringArray => {
                self.no_bounds()?;
                let validators = self.array_validators::<String>()?;
                self.finish(manager, validators)
            }
        }
    }

    fn reject(&self, present: bool, constraint: &'static str) -> Result<(), ConfigError> {
        if present {
            Err(ConfigError::UnsupportedConstraint {
                property: self.name.clone(),
                constraint,
                kind: self.kind,
            })
        } else {
            Ok(())
        }
    }

    fn scalar_only(&self) -> Result<(), ConfigError> {
        self.reject(self.min_length.is_some(), "min_length")?;
        self.reject(self.max_length.is_some(), "max_length")
    }

    fn no_bounds(&self) -> Result<(), ConfigError> {
        self.reject(self.lower.is_some() || self.upper.is_some(), "lower/upper")?;
        self.reject(self.exclusive, "exclusive")
    }

    fn bounds<T>(
        &self,
        convert: fn(f64) -> Option<T>,
    ) -> Result<Option<BoundedValidator<T>>, ConfigError>
    where
        T: PartialOrd + Display + Copy,
    {
        if self.lower.is_none() && self.upper.is_none() {
            self.reject(self.exclusive, "exclusive")?;
            return Ok(None);
        }
        let checked = |bound: f64| {
            convert(bound).ok_or_else(|| ConfigError::InvalidBound {
                property: self.name.clone(),
                bound,
                kind: self.kind,
            })
        };
        let mut bounds = BoundedValidator::new();
        if let Some(lower) = self.lower {
            bounds = bounds.with_lower(checked(lower)?);
        }
        if let Some(upper) = self.upper {
            bounds = bounds.with_upper(checked(upper)?);
        }
        if self.exclusive {
            bounds = bounds.exclusive();
        }
        Ok(Some(bounds))
    }

    fn push_allowed<T: PropertyValue>(
        &self,
        manager: &str,
        validators: &mut Vec<SharedValidator<T>>,
    ) -> Result<(), ConfigError> {
        if self.allowed.is_empty() {
            return Ok(());
        }
        let values = self
            .allowed
            .iter()
            .map(|text| self.parse::<T>(manager, text))
            .collect::<Result<Vec<T>, _>>()?;
        validators.push(Arc::new(ListValidator::new(values)));
        Ok(())
    }

    fn array_validators<E>(&self) -> Result<Vec<SharedValidator<Vec<E>>>, ConfigError>
    where
        E: Send + Sync + 'static,
        Vec<E>: PropertyValue,
        MandatoryValidator: propkit_core::Validator<Vec<E>>,
    {
        self.reject(!self.allowed.is_empty(), "allowed")?;
        let mut validators: Vec<SharedValidator<Vec<E>>> = Vec::new();
        let length = match (self.min_length, self.max_length) {
            (Some(min), Some(max)) => Some(ArrayLengthValidator::range(min, max)),
            (Some(min), None) => Some(ArrayLengthValidator::at_least(min)),
            (None, Some(max)) => Some(ArrayLengthValidator::at_most(max)),
            (None, None) => None,
        };
        if let Some(length) = length {
            validators.push(Arc::new(length));
        }
        if self.mandatory {
            validators.push(Arc::new(MandatoryValidator));
        }
        Ok(validators)
    }

    fn parse<T: PropertyValue>(&self, manager: &str, text: &str) -> Result<T, ConfigError> {
        T::parse_text(text).map_err(|reason| ConfigError::Property {
            manager: manager.to_string(),
            source: PropertyError::TypeConversion {
                name: self.name.clone(),
                text: text.to_string(),
                kind: T::KIND,
                reason,
            },
        })
    }

    fn finish<T: PropertyValue + Default>(
        &self,
        manager: &str,
        validators: Vec<SharedValidator<T>>,
    ) -> Result<Box<dyn Property>, ConfigError> {
        let value = match &self.default {
            Some(text) => self.parse::<T>(manager, text)?,
            None => T::default(),
        };
        let mut property = PropertyWithValue::with_direction(self.name.as_str(), value, self.direction)
            .with_documentation(self.doc.as_str());
        let validator: Option<SharedValidator<T>> = if validators.len() > 1 {
            let composite = validators
                .into_iter()
                .fold(CompositeValidator::new(), CompositeValidator::with);
            Some(Arc::new(composite))
        } else {
            validators.into_iter().next()
        };
        if let Some(validator) = validator {
            property = property.with_validator(validator);
        }
        Ok(Box::new(property))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn int_bound(bound: f64) -> Option<i32> {
    let integral = bound.trunc() == bound;
    let in_range = bound >= f64::from(i32::MIN) && bound <= f64::from(i32::MAX);
    (integral && in_range).then(|| bound as i32)
}

fn double_bound(bound: f64) -> Option<f64> {
    bound.is_finite().then_some(bound)
}
