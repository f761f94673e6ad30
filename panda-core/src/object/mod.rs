//! Objects
//!
//! Objects are the nodes of the user-visible graph. Each one owns an ordered
//! list of data ports and implements [`PandaObject::update`], which the
//! scheduler calls once the object's inputs are clean.
//!
//! # Classes and capabilities
//!
//! Objects are created by an [`ObjectFactory`] from a registered
//! [`ObjectClass`]. Instead of a class hierarchy, a class declares the
//! [`Capability`]s its objects have:
//!
//! - [`Capability::Dock`]: holds an ordered list of docked children,
//! - [`Capability::Dockable`]: can be docked into a dock,
//! - [`Capability::Renderer`]: draws something; layers only accept these,
//! - [`Capability::MainThread`]: must only be updated on the main thread.
//!
//! The class also keeps a chain of base class names, used by editors for
//! class-based dispatch.
//!
//! # Generic objects
//!
//! A class can declare a generic connector through
//! [`ObjectSetup::generic`]. Connecting an output to the connector picks a
//! compatible concrete type and creates a new group of ports of that type.

mod builtin;
mod class;
mod dock;
mod generic;
mod list;
mod panda_object;

pub use builtin::{register_builtins, PLACEHOLDER_CLASS};
pub use class::{Creator, ObjectClass, ObjectFactory};
pub use generic::{GenericDefinition, GenericGroup, GenericSpec, TypeFamily, TypeModifier};
pub use list::{ListSignals, ObjectEntry, ObjectsList};
pub use panda_object::{ObjectSetup, PandaObject, UpdateContext};

use crate::graph::{GraphError, NodeId};
use crate::types::TypeError;

/// Identifier of an object. Wraps the id of its propagation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(NodeId);

impl ObjectId {
    pub(crate) fn from_node(node: NodeId) -> Self {
        Self(node)
    }

    /// The propagation node of this object.
    pub fn node(self) -> NodeId {
        self.0
    }
}

/// Something an object class can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Holds an ordered list of docked children.
    Dock,
    /// Can be docked into a dock.
    Dockable,
    /// Draws into a layer.
    Renderer,
    /// Needs the main thread (e.g. a rendering context) to update.
    MainThread,
}

/// Errors raised by object, dock and generic operations.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    /// No object with this id exists.
    #[error("unknown object {0:?}")]
    UnknownObject(ObjectId),

    /// No class with this name is registered.
    #[error("unknown object class {0}")]
    UnknownClass(String),

    /// A class with this name is already registered.
    #[error("object class {0} is already registered")]
    DuplicateClass(String),

    /// The object cannot hold docked children.
    #[error("object {0:?} is not a dock")]
    NotADock(ObjectId),

    /// The object is not docked where it was expected to be.
    #[error("object {dockable:?} is not docked in {dock:?}")]
    NotDocked {
        /// The dock that was named.
        dock: ObjectId,
        /// The object that was expected in it.
        dockable: ObjectId,
    },

    /// The dock refuses this object.
    #[error("dock {dock:?} does not accept {dockable:?}")]
    IncompatibleDockable {
        /// The dock that refused.
        dock: ObjectId,
        /// The refused object.
        dockable: ObjectId,
    },

    /// The object has no generic connector.
    #[error("object {0:?} is not generic")]
    NotGeneric(ObjectId),

    /// No acceptable type family matches the connected type.
    #[error("no compatible type for {type_name}")]
    NoCompatibleType {
        /// Name of the type that was offered.
        type_name: String,
    },

    /// The generic declaration cannot be used.
    #[error("invalid generic declaration: {0}")]
    InvalidGeneric(&'static str),

    /// The generic group index is out of range.
    #[error("object {object:?} has no generic group {group}")]
    UnknownGroup {
        /// The generic object.
        object: ObjectId,
        /// The requested group.
        group: usize,
    },

    /// A registry lookup failed.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// A graph edit failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
