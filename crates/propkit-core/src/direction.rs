//! Property direction
//!
//! Whether a value flows into, out of, or both into and out of its owner.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::PropertyError;

/// Flow direction of a property relative to its owning operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum Direction {
    /// Supplied by the caller
    #[default]
    Input = 0,

    /// Produced by the owner
    Output = 1,

    /// Supplied and then updated
    InOut = 2,
}

impl Direction {
    /// Numeric code (0, 1 or 2)
    #[inline]
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Check whether the caller may supply this property
    #[inline]
    #[must_use]
    pub const fn accepts_input(self) -> bool {
        matches!(self, Self::Input | Self::InOut)
    }

    /// Check whether the owner produces this property
    #[inline]
    #[must_use]
    pub const fn produces_output(self) -> bool {
        matches!(self, Self::Output | Self::InOut)
    }
}

impl TryFrom<u32> for Direction {
    type Error = PropertyError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Input),
            1 => Ok(Self::Output),
            2 => Ok(Self::InOut),
            other => Err(PropertyError::InvalidDirection(other)),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Input => "Input",
            Self::Output => "Output",
            Self::InOut => "InOut",
        };
        f.write_str(label)
    }
}
