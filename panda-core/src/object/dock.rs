//! Docks: objects holding an ordered list of other objects.
//!
//! A docked child feeds its dock the same way an input port does, so a dock
//! is only updated after its children. A dock decides which classes it
//! accepts through [`PandaObject::accepts_dockable`](super::PandaObject).

use crate::document::{Document, DocumentError};
use crate::graph::GraphError;

use super::{Capability, ObjectError, ObjectId};

impl Document {
    /// Dock `dockable` into `dock` at `position`, clamped to the dock.
    ///
    /// An object already docked elsewhere is moved. Returns the position it
    /// was inserted at. Nothing is changed if any check fails.
    pub fn add_dockable(
        &mut self,
        dock: ObjectId,
        dockable: ObjectId,
        position: usize,
    ) -> Result<usize, DocumentError> {
        let dock_entry = self.object_entry(dock)?;
        let child_entry = self.object_entry(dockable)?;
        if !dock_entry.class().has_capability(Capability::Dock) {
            return Err(ObjectError::NotADock(dock).into());
        }
        let accepted = child_entry.class().has_capability(Capability::Dockable)
            && dock_entry.behavior.accepts_dockable(child_entry.class());
        if !accepted {
            return Err(ObjectError::IncompatibleDockable { dock, dockable }.into());
        }
        let previous_dock = child_entry.parent_dock;
        if self.graph.would_create_cycle(dock.node(), dockable.node()) {
            return Err(GraphError::CyclicGraph {
                node: dock.node(),
                input: dockable.node(),
            }
            .into());
        }

        if let Some(previous) = previous_dock {
            self.detach_dockable(previous, dockable)?;
        }
        let dirtied = self.graph.add_input(dock.node(), dockable.node())?;

        let entry = self.object_entry_mut(dock)?;
        let position = position.min(entry.dockables.len());
        entry.dockables.insert(position, dockable);
        self.object_entry_mut(dockable)?.parent_dock = Some(dock);

        tracing::debug!(?dock, ?dockable, position, "docked object");
        self.notify_dirtied(dirtied);
        self.signals.modified_object.emit(&dock);
        Ok(position)
    }

    /// Undock `dockable` from `dock`. Returns its former position.
    pub fn remove_dockable(
        &mut self,
        dock: ObjectId,
        dockable: ObjectId,
    ) -> Result<usize, DocumentError> {
        let position = self.detach_dockable(dock, dockable)?;
        self.signals.modified_object.emit(&dock);
        Ok(position)
    }

    /// Move a docked child to `position`, clamped to the dock. Returns its
    /// former position.
    pub fn reorder_dockable(
        &mut self,
        dock: ObjectId,
        dockable: ObjectId,
        position: usize,
    ) -> Result<usize, DocumentError> {
        let entry = self.object_entry_mut(dock)?;
        let old = entry
            .dockables
            .iter()
            .position(|child| *child == dockable)
            .ok_or(ObjectError::NotDocked { dock, dockable })?;
        entry.dockables.remove(old);
        let position = position.min(entry.dockables.len());
        entry.dockables.insert(position, dockable);

        if old != position {
            let dirtied = self.graph.set_dirty_value(dock.node());
            self.notify_dirtied(dirtied);
            self.signals.modified_object.emit(&dock);
        }
        Ok(old)
    }

    /// Docked children of `dock`, in order.
    pub fn dockables(&self, dock: ObjectId) -> Result<&[ObjectId], ObjectError> {
        Ok(self.object_entry(dock)?.dockables())
    }

    /// The dock holding `object`, if any.
    pub fn parent_dock(&self, object: ObjectId) -> Result<Option<ObjectId>, ObjectError> {
        Ok(self.object_entry(object)?.parent_dock)
    }

    /// Remove the dock relation and its edge, marking the dock dirty.
    pub(crate) fn detach_dockable(
        &mut self,
        dock: ObjectId,
        dockable: ObjectId,
    ) -> Result<usize, DocumentError> {
        let entry = self.object_entry_mut(dock)?;
        let position = entry
            .dockables
            .iter()
            .position(|child| *child == dockable)
            .ok_or(ObjectError::NotDocked { dock, dockable })?;
        entry.dockables.remove(position);
        if let Some(child) = self.objects.get_mut(dockable) {
            child.parent_dock = None;
        }

        self.graph.remove_input(dock.node(), dockable.node())?;
        let dirtied = self.graph.set_dirty_value(dock.node());
        self.notify_dirtied(dirtied);
        tracing::debug!(?dock, ?dockable, "undocked object");
        Ok(position)
    }
}
