//! Type identifiers.

use std::fmt;

/// Flag bit marking a "list of" type.
pub const LIST_BIT: u32 = 1 << 16;

/// Flag bit marking an "animation of" type.
pub const ANIMATION_BIT: u32 = 1 << 17;

const VALUE_MASK: u32 = LIST_BIT - 1;

/// Process-local identifier of a registered value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataTypeId(u32);

impl DataTypeId {
    /// The type of generic connector ports. They never hold a value.
    pub const GENERIC: DataTypeId = DataTypeId(0);

    /// Largest number of base value types a registry can hold.
    pub const MAX_VALUE_TYPES: u32 = VALUE_MASK;

    pub(crate) const fn from_value_index(index: u32) -> Self {
        Self(index & VALUE_MASK)
    }

    /// Get the raw id value.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Strip the list and animation bits.
    pub fn value_type(self) -> Self {
        Self(self.0 & VALUE_MASK)
    }

    /// The list form of this type's base value type.
    pub fn vector_of(self) -> Self {
        Self(self.value_type().0 | LIST_BIT)
    }

    /// The animation form of this type's base value type.
    pub fn animation_of(self) -> Self {
        Self(self.value_type().0 | ANIMATION_BIT)
    }

    /// Whether this is a "list of" type.
    pub fn is_vector(self) -> bool {
        self.0 & LIST_BIT != 0
    }

    /// Whether this is an "animation of" type.
    pub fn is_animation(self) -> bool {
        self.0 & ANIMATION_BIT != 0
    }

    /// Whether this is a plain value type.
    pub fn is_single_value(self) -> bool {
        !self.is_generic() && self.0 & (LIST_BIT | ANIMATION_BIT) == 0
    }

    /// Whether this is the generic connector type.
    pub fn is_generic(self) -> bool {
        self == Self::GENERIC
    }
}

impl fmt::Display for DataTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:#x}", self.0)
    }
}
