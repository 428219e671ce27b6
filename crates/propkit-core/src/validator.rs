//! Validators for property values
//!
//! A validator accepts or rejects a candidate value and, when the legal set is
//! finite, enumerates it. Validators carry only their construction-time
//! parameters, so one instance can be shared by many properties and threads
//! through a [`SharedValidator`].

use std::fmt::{Debug, Display};
use std::sync::Arc;

use crate::value::PropertyValue;

/// Accept/reject policy over candidate values of type `T`
pub trait Validator<T>: Debug + Send + Sync {
    /// Check a candidate value
    ///
    /// # Errors
    /// Returns a diagnostic describing why the value is unacceptable
    fn check(&self, value: &T) -> Result<(), String>;

    /// Legal values when the set is finite, empty otherwise
    fn allowed_values(&self) -> Vec<String> {
        Vec::new()
    }

    /// Short name of the validator type
    fn validator_type(&self) -> &'static str;
}

/// Validator shared between properties
pub type SharedValidator<T> = Arc<dyn Validator<T>>;

/// Numeric range check
///
/// Either bound may be absent. With `exclusive` set the bounds themselves are
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedValidator<T> {
    lower: Option<T>,
    upper: Option<T>,
    exclusive: bool,
}

impl<T> BoundedValidator<T>
where
    T: PartialOrd + Display + Copy,
{
    /// Create validator with no bounds
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            lower: None,
            upper: None,
            exclusive: false,
        }
    }

    /// Create validator with both bounds (inclusive)
    #[inline]
    #[must_use]
    pub fn between(lower: T, upper: T) -> Self {
        Self::new().with_lower(lower).with_upper(upper)
    }

    /// Set lower bound
    #[inline]
    #[must_use]
    pub fn with_lower(mut self, lower: T) -> Self {
        self.lower = Some(lower);
        self
    }

    /// Set upper bound
    #[inline]
    #[must_use]
    pub fn with_upper(mut self, upper: T) -> Self {
        self.upper = Some(upper);
        self
    }

    /// Reject values equal to a bound
    #[inline]
    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Lower bound, if any
    #[inline]
    #[must_use]
    pub fn lower(&self) -> Option<T> {
        self.lower
    }

    /// Upper bound, if any
    #[inline]
    #[must_use]
    pub fn upper(&self) -> Option<T> {
        self.upper
    }

    fn check_scalar(&self, value: T) -> Result<(), String> {
        let incomparable = [self.lower, self.upper]
            .into_iter()
            .flatten()
            .any(|bound| value.partial_cmp(&bound).is_none());
        if incomparable {
            return Err(format!("Selected value {value} cannot be compared with the bounds"));
        }
        if let Some(lower) = self.lower {
            if self.exclusive && value <= lower {
                return Err(format!(
                    "Selected value {value} is <= the lower bound ({lower})"
                ));
            }
            if value < lower {
                return Err(format!("Selected value {value} is < the lower bound ({lower})"));
            }
        }
        if let Some(upper) = self.upper {
            if self.exclusive && value >= upper {
                return Err(format!(
                    "Selected value {value} is >= the upper bound ({upper})"
                ));
            }
            if value > upper {
                return Err(format!("Selected value {value} is > the upper bound ({upper})"));
            }
        }
        Ok(())
    }
}

impl<T> Default for BoundedValidator<T>
where
    T: PartialOrd + Display + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Validator<T> for BoundedValidator<T>
where
    T: PartialOrd + Display + Copy + Debug + Send + Sync,
{
    fn check(&self, value: &T) -> Result<(), String> {
        self.check_scalar(*value)
    }

    fn validator_type(&self) -> &'static str {
        "bounded"
    }
}

/// Element-wise range check for sequences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayBoundedValidator<T> {
    bounds: BoundedValidator<T>,
}

impl<T> ArrayBoundedValidator<T>
where
    T: PartialOrd + Display + Copy,
{
    /// Wrap a scalar bounds check
    #[inline]
    #[must_use]
    pub fn new(bounds: BoundedValidator<T>) -> Self {
        Self { bounds }
    }
}

impl<T> Validator<Vec<T>> for ArrayBoundedValidator<T>
where
    T: PartialOrd + Display + Copy + Debug + Send + Sync,
{
    fn check(&self, value: &Vec<T>) -> Result<(), String> {
        for (index, element) in value.iter().enumerate() {
            self.bounds
                .check_scalar(*element)
                .map_err(|e| format!("At index {index}: {e}"))?;
        }
        Ok(())
    }

    fn validator_type(&self) -> &'static str {
        "arraybounded"
    }
}

/// Sequence length constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayLengthValidator {
    min: Option<usize>,
    max: Option<usize>,
}

impl ArrayLengthValidator {
    /// Require exactly `len` elements
    #[inline]
    #[must_use]
    pub fn exact(len: usize) -> Self {
        Self {
            min: Some(len),
            max: Some(len),
        }
    }

    /// Require between `min` and `max` elements (inclusive)
    #[inline]
    #[must_use]
    pub fn range(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Require at least `min` elements
    #[inline]
    #[must_use]
    pub fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Require at most `max` elements
    #[inline]
    #[must_use]
    pub fn at_most(max: usize) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }
}

impl<E> Validator<Vec<E>> for ArrayLengthValidator
where
    E: Send + Sync,
{
    fn check(&self, value: &Vec<E>) -> Result<(), String> {
        let len = value.len();
        match (self.min, self.max) {
            (Some(min), Some(max)) if min == max && len != min => Err(format!(
                "Incorrect size: expected {min} elements, found {len}"
            )),
            (Some(min), _) if len < min => {
                Err(format!("Array size too short: at least {min} required, found {len}"))
            }
            (_, Some(max)) if len > max => {
                Err(format!("Array size too long: at most {max} allowed, found {len}"))
            }
            _ => Ok(()),
        }
    }

    fn validator_type(&self) -> &'static str {
        "arraylength"
    }
}

/// Candidate must equal one of a fixed set
#[derive(Debug, Clone, PartialEq)]
pub struct ListValidator<T> {
    allowed: Vec<T>,
}

impl<T: PropertyValue> ListValidator<T> {
    /// Create validator from allowed values (declaration order kept)
    #[must_use]
    pub fn new(allowed: impl IntoIterator<Item = T>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Add an allowed value
    pub fn add_allowed(&mut self, value: T) {
        if !self.allowed.contains(&value) {
            self.allowed.push(value);
        }
    }
}

impl ListValidator<String> {
    /// Create string list validator from `&str` values
    #[must_use]
    pub fn from_strs(allowed: &[&str]) -> Self {
        Self::new(allowed.iter().map(|s| (*s).to_string()))
    }
}

impl<T: PropertyValue> Validator<T> for ListValidator<T> {
    fn check(&self, value: &T) -> Result<(), String> {
        if self.allowed.contains(value) {
            Ok(())
        } else {
            Err(format!(
                "The value \"{}\" is not in the list of allowed values",
                value.to_text()
            ))
        }
    }

    fn allowed_values(&self) -> Vec<String> {
        self.allowed.iter().map(PropertyValue::to_text).collect()
    }

    fn validator_type(&self) -> &'static str {
        "list"
    }
}

/// A value must be supplied (non-empty string or sequence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MandatoryValidator;

const MANDATORY_MESSAGE: &str = "A value must be entered for this parameter";

impl Validator<String> for MandatoryValidator {
    fn check(&self, value: &String) -> Result<(), String> {
        if value.is_empty() {
            Err(MANDATORY_MESSAGE.to_string())
        } else {
            Ok(())
        }
    }

    fn validator_type(&self) -> &'static str {
        "mandatory"
    }
}

impl<E> Validator<Vec<E>> for MandatoryValidator
where
    E: Send + Sync,
{
    fn check(&self, value: &Vec<E>) -> Result<(), String> {
        if value.is_empty() {
            Err(MANDATORY_MESSAGE.to_string())
        } else {
            Ok(())
        }
    }

    fn validator_type(&self) -> &'static str {
        "mandatory"
    }
}

/// All member validators must accept
#[derive(Debug)]
pub struct CompositeValidator<T> {
    members: Vec<SharedValidator<T>>,
}

impl<T> CompositeValidator<T> {
    /// Create empty composite (accepts everything)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Add a member validator
    #[must_use]
    pub fn with(mut self, validator: SharedValidator<T>) -> Self {
        self.members.push(validator);
        self
    }

    /// Number of member validators
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if composite has no members
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<T> Default for CompositeValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug> Validator<T> for CompositeValidator<T> {
    fn check(&self, value: &T) -> Result<(), String> {
        self.members.iter().try_for_each(|v| v.check(value))
    }

    fn allowed_values(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|v| v.allowed_values())
            .find(|values| !values.is_empty())
            .unwrap_or_default()
    }

    fn validator_type(&self) -> &'static str {
        "composite"
    }
}
