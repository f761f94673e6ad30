//! The ordered list of objects of a document.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::data::DataId;
use crate::signal::Signal;

use super::class::ObjectClass;
use super::generic::{GenericGroup, GenericState};
use super::panda_object::PandaObject;
use super::ObjectId;

/// An object owned by a document.
pub struct ObjectEntry {
    id: ObjectId,
    index: u32,
    class: Arc<ObjectClass>,
    pub(crate) ports: Vec<DataId>,
    pub(crate) behavior: Box<dyn PandaObject>,
    pub(crate) dockables: Vec<ObjectId>,
    pub(crate) parent_dock: Option<ObjectId>,
    pub(crate) generic: Option<GenericState>,
}

impl ObjectEntry {
    pub(crate) fn new(
        id: ObjectId,
        class: Arc<ObjectClass>,
        ports: Vec<DataId>,
        behavior: Box<dyn PandaObject>,
        generic: Option<GenericState>,
    ) -> Self {
        Self {
            id,
            index: 0,
            class,
            ports,
            behavior,
            dockables: Vec::new(),
            parent_dock: None,
            generic,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The persistent index, unique within the document and never reused.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn class(&self) -> &Arc<ObjectClass> {
        &self.class
    }

    /// The data ports, in declaration order.
    pub fn ports(&self) -> &[DataId] {
        &self.ports
    }

    /// Docked children, in dock order.
    pub fn dockables(&self) -> &[ObjectId] {
        &self.dockables
    }

    /// The dock holding this object, if docked.
    pub fn parent_dock(&self) -> Option<ObjectId> {
        self.parent_dock
    }

    /// The generic groups, empty for non-generic objects.
    pub fn generic_groups(&self) -> &[GenericGroup] {
        self.generic.as_ref().map_or(&[][..], |state| state.groups.as_slice())
    }

    /// The generic connector port, for generic objects.
    pub fn generic_connector(&self) -> Option<DataId> {
        self.generic.as_ref().map(|state| state.connector)
    }

    pub fn behavior(&self) -> &dyn PandaObject {
        &*self.behavior
    }
}

impl fmt::Debug for ObjectEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectEntry")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("class", &self.class.name())
            .field("ports", &self.ports)
            .field("dockables", &self.dockables)
            .field("parent_dock", &self.parent_dock)
            .finish()
    }
}

/// Notifications emitted by an [`ObjectsList`].
#[derive(Debug, Default)]
pub struct ListSignals {
    pub added_object: Signal<ObjectId>,
    pub removed_object: Signal<ObjectId>,
    pub reordered_objects: Signal<()>,
    pub cleared_list: Signal<()>,
}

/// Ordered list of objects.
///
/// The order is the user-visible order (and the save order). Each object
/// also gets a persistent index when added; indices are never reused, not
/// even after [`ObjectsList::clear`], so links saved by index stay
/// unambiguous.
#[derive(Default)]
pub struct ObjectsList {
    objects: IndexMap<ObjectId, ObjectEntry>,
    by_index: HashMap<u32, ObjectId>,
    next_index: u32,
    signals: ListSignals,
}

impl ObjectsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_object(&mut self, mut entry: ObjectEntry) -> ObjectId {
        let id = entry.id;
        entry.index = self.next_index;
        self.next_index += 1;
        self.by_index.insert(entry.index, id);
        self.objects.insert(id, entry);
        self.signals.added_object.emit(&id);
        id
    }

    pub(crate) fn remove_object(&mut self, id: ObjectId) -> Option<ObjectEntry> {
        let entry = self.objects.shift_remove(&id)?;
        self.by_index.remove(&entry.index);
        self.signals.removed_object.emit(&id);
        Some(entry)
    }

    pub(crate) fn clear(&mut self) -> Vec<ObjectEntry> {
        self.by_index.clear();
        let entries = self.objects.drain(..).map(|(_, entry)| entry).collect();
        self.signals.cleared_list.emit(&());
        entries
    }

    /// Move an object to `position`, clamped to the list. Returns the old
    /// position, which is what undoing the move needs.
    pub(crate) fn reinsert_object(&mut self, id: ObjectId, position: usize) -> Option<usize> {
        let old = self.objects.get_index_of(&id)?;
        let position = position.min(self.objects.len() - 1);
        if old != position {
            self.objects.move_index(old, position);
            self.signals.reordered_objects.emit(&());
        }
        Some(old)
    }

    /// The object with a persistent index.
    pub fn find(&self, index: u32) -> Option<ObjectId> {
        self.by_index.get(&index).copied()
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectEntry> {
        self.objects.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut ObjectEntry> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Current position of an object in the list.
    pub fn position(&self, id: ObjectId) -> Option<usize> {
        self.objects.get_index_of(&id)
    }

    /// Object ids in list order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.keys().copied()
    }

    /// Objects in list order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectEntry> {
        self.objects.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ObjectEntry> {
        self.objects.values_mut()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn signals(&self) -> &ListSignals {
        &self.signals
    }
}

impl fmt::Debug for ObjectsList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectsList")
            .field("objects", &self.objects.values().collect::<Vec<_>>())
            .field("next_index", &self.next_index)
            .finish()
    }
}
