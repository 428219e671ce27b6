//! Property history snapshots

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::direction::Direction;

/// Immutable record of a property's state at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyHistory {
    name: String,
    value: String,
    type_name: String,
    is_default: bool,
    direction: Direction,
}

impl PropertyHistory {
    /// Create a snapshot
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        type_name: impl Into<String>,
        is_default: bool,
        direction: Direction,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            type_name: type_name.into(),
            is_default,
            direction,
        }
    }

    /// Property name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical text of the value in effect
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Type name of the property
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether the value was still the default
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Property direction
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl Display for PropertyHistory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, Value: {}, Default?: {}, Direction: {}",
            self.name,
            self.value,
            if self.is_default { "Yes" } else { "No" },
            self.direction
        )
    }
}
