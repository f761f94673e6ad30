//! Data ports.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;
use crate::object::ObjectId;
use crate::types::{DataTypeId, DataValue, ErasedValue};

/// Identifier of a data port. Wraps the id of its propagation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId(NodeId);

impl DataId {
    pub(crate) fn from_node(node: NodeId) -> Self {
        Self(node)
    }

    /// The propagation node of this data.
    pub fn node(self) -> NodeId {
        self.0
    }
}

/// A [`DataId`] that remembers the Rust type of its value.
///
/// Handles are handed out when an object declares its ports, so reading or
/// writing through a handle cannot name the wrong type.
pub struct DataHandle<T> {
    id: DataId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DataHandle<T> {
    pub(crate) fn new(id: DataId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The untyped id.
    pub fn id(self) -> DataId {
        self.id
    }
}

impl<T> Clone for DataHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DataHandle<T> {}

impl<T> PartialEq for DataHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for DataHandle<T> {}

impl<T> fmt::Debug for DataHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DataHandle").field(&self.id).finish()
    }
}

impl<T> From<DataHandle<T>> for DataId {
    fn from(handle: DataHandle<T>) -> Self {
        handle.id
    }
}

/// Role and persistence flags of a data port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataFlags {
    /// Feeds the owning object; may be linked to a parent.
    pub input: bool,
    /// Produced by the owning object.
    pub output: bool,
    /// Saved with the document.
    pub persistent: bool,
    /// Not editable from the UI.
    pub read_only: bool,
    /// Shown by editors.
    pub displayed: bool,
}

impl DataFlags {
    /// Flags of a regular input port.
    pub fn input() -> Self {
        Self {
            input: true,
            persistent: true,
            displayed: true,
            ..Self::default()
        }
    }

    /// Flags of a regular output port.
    pub fn output() -> Self {
        Self {
            output: true,
            read_only: true,
            displayed: true,
            ..Self::default()
        }
    }
}

/// A named, typed value slot owned by an object.
pub struct BaseData {
    id: DataId,
    name: String,
    help: String,
    owner: ObjectId,
    type_id: DataTypeId,
    pub(crate) value: ErasedValue,
    pub(crate) parent: Option<DataId>,
    flags: DataFlags,
    widget: Option<String>,
    widget_data: Option<String>,
}

impl BaseData {
    pub(crate) fn new(
        id: DataId,
        name: impl Into<String>,
        help: impl Into<String>,
        owner: ObjectId,
        type_id: DataTypeId,
        value: ErasedValue,
        flags: DataFlags,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            help: help.into(),
            owner,
            type_id,
            value,
            parent: None,
            flags,
            widget: None,
            widget_data: None,
        }
    }

    pub fn id(&self) -> DataId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    /// The object owning this port.
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub fn type_id(&self) -> DataTypeId {
        self.type_id
    }

    /// The data this one mirrors, if linked.
    pub fn parent(&self) -> Option<DataId> {
        self.parent
    }

    pub fn flags(&self) -> DataFlags {
        self.flags
    }

    pub fn is_input(&self) -> bool {
        self.flags.input
    }

    pub fn is_output(&self) -> bool {
        self.flags.output
    }

    pub fn is_persistent(&self) -> bool {
        self.flags.persistent
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.read_only
    }

    pub fn is_displayed(&self) -> bool {
        self.flags.displayed
    }

    /// Name of the editor widget to use. Opaque to the engine.
    pub fn widget(&self) -> Option<&str> {
        self.widget.as_deref()
    }

    /// Extra configuration for the editor widget. Opaque to the engine.
    pub fn widget_data(&self) -> Option<&str> {
        self.widget_data.as_deref()
    }

    pub fn set_widget(&mut self, widget: impl Into<String>) {
        self.widget = Some(widget.into());
    }

    pub fn set_widget_data(&mut self, widget_data: impl Into<String>) {
        self.widget_data = Some(widget_data.into());
    }

    /// The stored value, type-erased. It may be stale if the data is dirty.
    pub fn value_any(&self) -> &dyn Any {
        &*self.value
    }

    /// The stored value, if it is a `T`. It may be stale if the data is dirty.
    pub fn value_ref<T: DataValue>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub(crate) fn value_mut<T: DataValue>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }
}

impl fmt::Debug for BaseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseData")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("type_id", &self.type_id)
            .field("parent", &self.parent)
            .field("flags", &self.flags)
            .finish()
    }
}
