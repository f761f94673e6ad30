//! Runtime Value Types
//!
//! Everything that flows through a port is stored type-erased. This module
//! gives each concrete value type a small runtime identifier and keeps the
//! function tables needed to create, copy, compare and stringify values
//! without knowing their Rust type at compile time.
//!
//! # Identifiers
//!
//! A [`DataTypeId`] packs three pieces of structure in fixed bit positions:
//!
//! - the base value type (low 16 bits),
//! - a "list of" flag,
//! - an "animation of" flag.
//!
//! Registering a base type `T` also registers `Vec<T>` and [`Animation<T>`],
//! so every base type comes with its list and animation forms.
//!
//! Identifiers are only stable within one process run. Persisted documents
//! refer to types by name (`real`, `real_list`, `point_animation`...) and
//! resolve them back through [`TypeRegistry::id_by_name`].

mod id;
mod registry;
mod value;

pub use id::{DataTypeId, ANIMATION_BIT, LIST_BIT};
pub use registry::{Converter, Copier, TypeRegistry, ValueTrait};
pub use value::{Animation, Color, DataValue, ErasedValue, Point, ValueType};

/// Errors raised by type lookups and value conversions.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// The Rust type was never registered.
    #[error("unknown type {0}")]
    UnknownType(String),

    /// No type with this identifier is registered.
    #[error("unknown type id {0}")]
    UnknownTypeId(DataTypeId),

    /// A value did not have the type it was expected to have.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Name of the expected type.
        expected: String,
        /// Name of the type actually found.
        found: String,
    },

    /// A string could not be parsed as a value of the given type.
    #[error("cannot parse value of type {type_name}: {source}")]
    Parse {
        /// Name of the target type.
        type_name: String,
        /// Underlying decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be turned into its string form.
    #[error("cannot format value of type {type_name}")]
    Format {
        /// Name of the value's type.
        type_name: String,
    },
}
