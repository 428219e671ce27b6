//! propkit core
//!
//! Typed, named, validated configuration values.
//!
//! # Core Concepts
//!
//! - [`Property`]: object-safe contract for one named value (string and typed paths)
//! - [`PropertyWithValue<T>`]: strongly typed storage with an optional validator
//! - [`PropertyManager`]: ordered, case-insensitively keyed collection
//! - [`Validator`]: accept/reject policies ([`BoundedValidator`], [`ListValidator`], ...)
//! - [`PropertyHistory`]: immutable snapshot of a property's state
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use propkit_core::{BoundedValidator, PropertyManager, PropertyWithValue};
//!
//! let mut manager = PropertyManager::new();
//! manager
//!     .declare_property(
//!         PropertyWithValue::new("frequency", 60.0)
//!             .with_validator(Arc::new(BoundedValidator::between(0.0, 120.0))),
//!     )
//!     .unwrap();
//! manager.declare_value("BackRun", 0, "Empty container run").unwrap();
//!
//! manager.set_property_value("frequency", "30").unwrap();
//! assert_eq!(manager.get_value::<f64>("frequency").unwrap(), 30.0);
//! assert!(manager.set_property_value("BackRun", "not-a-number").is_err());
//! assert!(manager.validate_properties());
//! ```

#![warn(unreachable_pub)]

pub mod direction;
pub mod error;
pub mod history;
pub mod manager;
pub mod property;
pub mod validator;
pub mod value;
pub mod with_value;

// Re-exports
pub use direction::Direction;
pub use error::{PropertyError, Result};
pub use history::PropertyHistory;
pub use manager::PropertyManager;
pub use property::Property;
pub use validator::{
    ArrayBoundedValidator, ArrayLengthValidator, BoundedValidator, CompositeValidator,
    ListValidator, MandatoryValidator, SharedValidator, Validator,
};
pub use value::{PropertyValue, Value, ValueKind};
pub use with_value::{ArrayProperty, PropertyWithValue};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for declaring and reading properties
    pub use crate::{
        Direction, Property, PropertyError, PropertyManager, PropertyValue, PropertyWithValue,
        Validator, Value, ValueKind,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
