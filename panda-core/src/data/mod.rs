//! Data Ports
//!
//! A [`BaseData`] is a named, typed value slot owned by an object. Its value
//! is stored type-erased and handled through the function tables of the
//! [`TypeRegistry`](crate::types::TypeRegistry).
//!
//! Every data wraps a node of the propagation graph:
//!
//! - an input data may be linked to a parent data; the link is an edge from
//!   the parent's node, so dirtying the parent dirties the child,
//! - an output data has its owning object as graph input, so dirtying the
//!   object dirties its outputs.
//!
//! Reading a dirty linked data cleans the parent first and then mirrors its
//! value through the registered copier (or a converter when the types
//! differ). Writing is only allowed on unlinked data.

mod base_data;
mod store;

pub use base_data::{BaseData, DataFlags, DataHandle, DataId};
pub use store::DataStore;

use crate::object::ObjectId;
use crate::types::TypeError;

/// Errors raised by data operations.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// No data with this id exists.
    #[error("unknown data {0:?}")]
    UnknownData(DataId),

    /// The value has another type than the one requested.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Name of the expected type.
        expected: String,
        /// Name of the type actually found.
        found: String,
    },

    /// Linked data mirror their parent and cannot be set directly.
    #[error("data {0:?} is linked to a parent and cannot be set")]
    Linked(DataId),

    /// Outputs are written by their object only; read-only data cannot be
    /// set from outside either.
    #[error("data {0:?} is read-only")]
    ReadOnly(DataId),

    /// Only input data can be linked to a parent.
    #[error("data {0:?} is not an input")]
    NotAnInput(DataId),

    /// A data was read before the object producing it was updated.
    #[error("data {data:?} read before its producer {producer:?} was updated")]
    OutOfOrder {
        /// The data that could not be cleaned.
        data: DataId,
        /// The object that should have run first.
        producer: ObjectId,
    },

    /// A registry lookup failed.
    #[error(transparent)]
    Type(#[from] TypeError),
}
