//! Documents
//!
//! A [`Document`] owns everything a graph is made of: the propagation
//! arena, the data ports, the ordered object list and the update scheduler.
//! Every edit goes through it, so the invariants between those parts
//! (edges mirror data links and dock relations, dirty objects have dirty
//! outputs, ...) are maintained in one place.
//!
//! # Reading values
//!
//! [`Document::get_value`] is the pull side of the engine: reading a dirty
//! data first runs the objects producing it, then mirrors the parent chain.
//! Writing through [`Document::set_value`] or a [`DataAccessor`] is the push
//! side: it only marks what depends on the data dirty.
//!
//! # Threads
//!
//! A document is `Send` but not shared. Work coming from other threads (for
//! example delayed callbacks) is posted to the document's [`Mailbox`] and
//! run by [`Document::process_posted`] on the thread owning the document.

mod accessor;
mod mailbox;

pub use accessor::DataAccessor;
pub use mailbox::Mailbox;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use indexmap::IndexSet;
use smallvec::SmallVec;

use crate::data::{BaseData, DataError, DataId, DataStore};
use crate::graph::{DataGraph, GraphError, NodeId, NodeKind, NodeUpdater, UpdateError, UpdateState};
use crate::object::{
    Capability, ObjectClass, ObjectEntry, ObjectError, ObjectFactory, ObjectId, ObjectSetup,
    ObjectsList, UpdateContext,
};
use crate::signal::Signal;
use crate::types::{DataValue, TypeError, TypeRegistry};

/// Errors raised by document operations.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Update(#[from] UpdateError),
}

/// Notifications about the objects of a document.
///
/// Structural list changes are signaled by [`ObjectsList::signals`].
#[derive(Debug, Default)]
pub struct DocumentSignals {
    /// Ports, links, docked children or generic groups of an object changed.
    pub modified_object: Signal<ObjectId>,
    /// An object went from clean to dirty.
    pub dirty_object: Signal<ObjectId>,
}

/// Document settings.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Thread allowed to update main-thread objects. Defaults to the thread
    /// building the document.
    pub main_thread: Option<ThreadId>,
    /// Fail an update pass when an input is read before its producer ran.
    /// When off, the stale value is used and a warning is logged.
    pub strict_order: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            main_thread: None,
            strict_order: true,
        }
    }
}

/// Builder for [`Document`].
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    registry: Option<Arc<TypeRegistry>>,
    factory: Option<Arc<ObjectFactory>>,
    config: DocumentConfig,
}

impl DocumentBuilder {
    /// Use a specific type registry instead of the global one.
    pub fn registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a specific object factory instead of the global one.
    pub fn factory(mut self, factory: Arc<ObjectFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn main_thread(mut self, main_thread: ThreadId) -> Self {
        self.config.main_thread = Some(main_thread);
        self
    }

    pub fn strict_order(mut self, strict_order: bool) -> Self {
        self.config.strict_order = strict_order;
        self
    }

    pub fn config(mut self, config: DocumentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Document {
        Document {
            registry: self.registry.unwrap_or_else(TypeRegistry::global),
            factory: self.factory.unwrap_or_else(ObjectFactory::global),
            graph: DataGraph::new(),
            datas: DataStore::new(),
            objects: ObjectsList::new(),
            updater: NodeUpdater::new(),
            signals: DocumentSignals::default(),
            main_thread: self
                .config
                .main_thread
                .unwrap_or_else(|| thread::current().id()),
            strict_order: self.config.strict_order,
            mailbox: Mailbox::default(),
        }
    }
}

/// A graph of objects and their data.
pub struct Document {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) factory: Arc<ObjectFactory>,
    pub(crate) graph: DataGraph,
    pub(crate) datas: DataStore,
    pub(crate) objects: ObjectsList,
    pub(crate) updater: NodeUpdater,
    pub(crate) signals: DocumentSignals,
    main_thread: ThreadId,
    strict_order: bool,
    mailbox: Mailbox,
}

impl Document {
    /// Create an empty document using the global registry and factory.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn factory(&self) -> &Arc<ObjectFactory> {
        &self.factory
    }

    pub fn objects(&self) -> &ObjectsList {
        &self.objects
    }

    pub fn graph(&self) -> &DataGraph {
        &self.graph
    }

    pub fn datas(&self) -> &DataStore {
        &self.datas
    }

    pub fn signals(&self) -> &DocumentSignals {
        &self.signals
    }

    pub fn object(&self, id: ObjectId) -> Option<&ObjectEntry> {
        self.objects.get(id)
    }

    pub fn data(&self, id: DataId) -> Option<&BaseData> {
        self.datas.get(id)
    }

    /// The object with a persistent index.
    pub fn find(&self, index: u32) -> Option<ObjectId> {
        self.objects.find(index)
    }

    /// A port of `object` by name.
    pub fn find_data(&self, object: ObjectId, name: &str) -> Option<DataId> {
        self.objects
            .get(object)?
            .ports()
            .iter()
            .copied()
            .find(|port| self.datas.get(*port).is_some_and(|data| data.name() == name))
    }

    pub fn is_object_dirty(&self, object: ObjectId) -> bool {
        self.graph.is_dirty(object.node())
    }

    pub fn is_data_dirty(&self, data: DataId) -> bool {
        self.graph.is_dirty(data.node())
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    /// Create an object of a registered class and append it to the list.
    ///
    /// If the class fails to set up, nothing it created is kept.
    pub fn create_object(&mut self, class_name: &str) -> Result<ObjectId, DocumentError> {
        let class = self
            .factory
            .class(class_name)
            .ok_or_else(|| ObjectError::UnknownClass(class_name.to_string()))?;
        self.instantiate(class)
    }

    pub(crate) fn instantiate(&mut self, class: Arc<ObjectClass>) -> Result<ObjectId, DocumentError> {
        let id = ObjectId::from_node(self.graph.add_node(NodeKind::Object, true));
        let mut setup = ObjectSetup::new(id, &self.registry, &mut self.graph, &mut self.datas);
        let created = class.create(&mut setup);
        let (ports, generic) = setup.finish();

        let behavior = match created {
            Ok(behavior) => behavior,
            Err(err) => {
                for port in ports {
                    self.graph.remove_node(port.node());
                    self.datas.remove(port);
                }
                self.graph.remove_node(id.node());
                tracing::warn!(class = class.name(), %err, "object setup failed");
                return Err(err.into());
            }
        };

        tracing::debug!(?id, class = class.name(), "created object");
        self.objects
            .add_object(ObjectEntry::new(id, class, ports, behavior, generic));
        Ok(id)
    }

    /// Remove an object, its ports, and its dock relations.
    ///
    /// Data linked to the removed outputs keep their last value and become
    /// dirty; generic groups they were feeding are removed.
    pub fn remove_object(&mut self, id: ObjectId) -> Result<(), DocumentError> {
        let entry = self.object_entry(id)?;
        let ports = entry.ports.clone();
        let dockables = entry.dockables.clone();
        let parent_dock = entry.parent_dock;

        if let Some(dock) = parent_dock {
            self.detach_dockable(dock, id)?;
        }
        for child in dockables {
            self.detach_dockable(id, child)?;
        }

        let orphans: Vec<DataId> = ports
            .iter()
            .flat_map(|port| self.datas.children_of(&self.graph, *port))
            .collect();
        let mut dirtied = Vec::new();
        for port in ports {
            dirtied.extend(self.destroy_data(port));
        }
        self.graph.remove_node(id.node());
        self.updater.forget(id);
        self.objects.remove_object(id);
        tracing::debug!(?id, "removed object");

        self.notify_dirtied(dirtied);
        for orphan in orphans {
            self.drop_generic_group_fed_by(orphan)?;
        }
        Ok(())
    }

    /// Remove every object.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.graph = DataGraph::new();
        self.datas = DataStore::new();
        self.updater.reset();
        tracing::debug!("cleared document");
    }

    /// Move an object to `position` in the list. Returns the old position.
    pub fn reinsert_object(&mut self, id: ObjectId, position: usize) -> Result<usize, DocumentError> {
        self.objects
            .reinsert_object(id, position)
            .ok_or_else(|| ObjectError::UnknownObject(id).into())
    }

    /// Mark an object, its outputs and everything downstream dirty.
    pub fn set_dirty(&mut self, object: ObjectId) -> Result<(), DocumentError> {
        self.object_entry(object)?;
        let dirtied = self.graph.set_dirty_value(object.node());
        self.notify_dirtied(dirtied);
        Ok(())
    }

    /// Drop the cached state of every object and mark them all dirty.
    pub fn reset_objects(&mut self) {
        for entry in self.objects.iter_mut() {
            entry.behavior.reset();
        }
        let ids: Vec<ObjectId> = self.objects.ids().collect();
        let mut dirtied = Vec::new();
        for id in ids {
            dirtied.extend(self.graph.set_dirty_value(id.node()));
        }
        self.updater.reset();
        self.notify_dirtied(dirtied);
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    /// Read a data, bringing it up to date first.
    pub fn get_value<T: DataValue>(&mut self, data: impl Into<DataId>) -> Result<&T, DocumentError> {
        let id = data.into();
        self.ensure_clean(id)?;
        let expected = self.type_name_of::<T>();
        let stored = self.datas.try_get(id)?;
        stored.value_ref::<T>().ok_or_else(|| {
            DataError::TypeMismatch {
                expected,
                found: self.registry.type_name(stored.type_id()),
            }
            .into()
        })
    }

    /// Replace the value of an unlinked input or property.
    pub fn set_value<T: DataValue>(
        &mut self,
        data: impl Into<DataId>,
        value: T,
    ) -> Result<(), DocumentError> {
        let mut accessor = self.accessor::<T>(data)?;
        *accessor = value;
        Ok(())
    }

    /// Edit the value of an unlinked data in place. Dependents are marked
    /// dirty when the accessor is dropped.
    ///
    /// Outputs and read-only data are refused with [`DataError::ReadOnly`].
    pub fn accessor<T: DataValue>(
        &mut self,
        data: impl Into<DataId>,
    ) -> Result<DataAccessor<'_, T>, DocumentError> {
        let id = data.into();
        let stored = self.datas.try_get(id)?;
        if stored.parent().is_some() {
            return Err(DataError::Linked(id).into());
        }
        if stored.is_output() || stored.is_read_only() {
            return Err(DataError::ReadOnly(id).into());
        }
        if !stored.value_any().is::<T>() {
            return Err(DataError::TypeMismatch {
                expected: self.type_name_of::<T>(),
                found: self.registry.type_name(stored.type_id()),
            }
            .into());
        }

        let erased = self.datas.take_value(id)?;
        match erased.downcast::<T>() {
            Ok(value) => Ok(DataAccessor::new(self, id, value)),
            Err(erased) => {
                self.datas.put_value(id, erased);
                Err(DataError::TypeMismatch {
                    expected: self.type_name_of::<T>(),
                    found: self.type_name_of_data(id),
                }
                .into())
            }
        }
    }

    /// Format a data's value with its type's text codec.
    pub fn value_to_string(&mut self, data: DataId) -> Result<String, DocumentError> {
        self.ensure_clean(data)?;
        let stored = self.datas.try_get(data)?;
        let value_trait = self.registry.value_trait(stored.type_id())?;
        Ok(value_trait.format_value(stored.value_any())?)
    }

    /// Parse a value with the data's type codec and store it.
    pub fn set_value_from_string(&mut self, data: DataId, text: &str) -> Result<(), DocumentError> {
        if self.datas.try_get(data)?.is_read_only() {
            return Err(DataError::ReadOnly(data).into());
        }
        self.restore_value(data, text)
    }

    /// Like [`Document::set_value_from_string`], but read-only data may be
    /// restored. Outputs and linked data are still refused.
    pub(crate) fn restore_value(&mut self, data: DataId, text: &str) -> Result<(), DocumentError> {
        let stored = self.datas.try_get(data)?;
        if stored.parent().is_some() {
            return Err(DataError::Linked(data).into());
        }
        if stored.is_output() {
            return Err(DataError::ReadOnly(data).into());
        }
        let value = self.registry.value_trait(stored.type_id())?.parse_value(text)?;
        self.datas.put_value(data, value);
        self.value_changed(data);
        Ok(())
    }

    /// Set the editor widget of a data.
    pub fn set_widget(&mut self, data: DataId, widget: &str) -> Result<(), DocumentError> {
        self.datas.try_get_mut(data)?.set_widget(widget);
        Ok(())
    }

    /// Set the editor widget configuration of a data.
    pub fn set_widget_data(&mut self, data: DataId, widget_data: &str) -> Result<(), DocumentError> {
        self.datas.try_get_mut(data)?.set_widget_data(widget_data);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    /// Link `data` to `parent`, replacing any previous link. Returns the
    /// previous parent.
    pub fn set_parent(&mut self, data: DataId, parent: DataId) -> Result<Option<DataId>, DocumentError> {
        let target = self.datas.try_get(data)?;
        let source = self.datas.try_get(parent)?;
        if !target.is_input() {
            return Err(DataError::NotAnInput(data).into());
        }
        let (from, to) = (source.type_id(), target.type_id());
        if from.is_generic() || to.is_generic() || !self.registry.can_convert(from, to) {
            return Err(DataError::TypeMismatch {
                expected: self.registry.type_name(to),
                found: self.registry.type_name(from),
            }
            .into());
        }
        let owner = target.owner();
        let previous = target.parent();
        if previous == Some(parent) {
            return Ok(previous);
        }
        if self.graph.would_create_cycle(data.node(), parent.node()) {
            return Err(GraphError::CyclicGraph {
                node: data.node(),
                input: parent.node(),
            }
            .into());
        }

        if let Some(old) = previous {
            self.graph.remove_input(data.node(), old.node())?;
        }
        let dirtied = self.graph.add_input(data.node(), parent.node())?;
        if let Some(stored) = self.datas.get_mut(data) {
            stored.parent = Some(parent);
        }

        tracing::debug!(?data, ?parent, "linked data");
        self.notify_dirtied(dirtied);
        self.signals.modified_object.emit(&owner);
        Ok(previous)
    }

    /// Remove the link of `data`. The data keeps its last value. Removing
    /// the link feeding a generic group removes the group.
    ///
    /// Returns the former parent.
    pub fn disconnect(&mut self, data: DataId) -> Result<Option<DataId>, DocumentError> {
        let target = self.datas.try_get(data)?;
        let owner = target.owner();
        let Some(parent) = target.parent() else {
            return Ok(None);
        };

        self.graph.remove_input(data.node(), parent.node())?;
        if let Some(stored) = self.datas.get_mut(data) {
            stored.parent = None;
        }
        let dirtied = self.graph.set_dirty_outputs(data.node());
        tracing::debug!(?data, ?parent, "unlinked data");
        self.notify_dirtied(dirtied);

        if !self.drop_generic_group_fed_by(data)? {
            self.signals.modified_object.emit(&owner);
        }
        Ok(Some(parent))
    }

    /// Connect `source` to `target`.
    ///
    /// On a generic connector this creates a group of ports for the source
    /// type first. Returns the data that was linked.
    pub fn connect(&mut self, target: DataId, source: DataId) -> Result<DataId, DocumentError> {
        let stored = self.datas.try_get(target)?;
        if stored.type_id().is_generic() {
            let owner = stored.owner();
            return self.connect_generic(owner, source);
        }
        self.set_parent(target, source)?;
        Ok(target)
    }

    // ------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------

    /// Run every dirty object `object` depends on, then `object` itself.
    pub fn update_object(&mut self, object: ObjectId) -> Result<(), UpdateError> {
        self.updater.begin_pass();
        self.run_update(object)
    }

    /// Update every dirty object, in list order.
    pub fn update_all(&mut self) -> Result<(), UpdateError> {
        self.updater.begin_pass();
        let ids: Vec<ObjectId> = self.objects.ids().collect();
        for id in ids {
            if self.graph.is_dirty(id.node()) {
                self.run_update(id)?;
            }
        }
        Ok(())
    }

    /// Update `object` within the current pass.
    fn run_update(&mut self, object: ObjectId) -> Result<(), UpdateError> {
        let mut updater = std::mem::take(&mut self.updater);
        let result = updater.update_object(self, object);
        self.updater = updater;
        result
    }

    /// Complete the updates deferred to the main thread. Returns how many
    /// deferred objects are now clean. Does nothing off the main thread.
    pub fn run_deferred(&mut self) -> Result<usize, UpdateError> {
        if !self.on_main_thread() {
            tracing::warn!("deferred updates can only run on the main thread");
            return Ok(0);
        }
        let mut updater = std::mem::take(&mut self.updater);
        let result = updater.run_deferred(self);
        self.updater = updater;
        result
    }

    /// Objects run by the last update, in run order.
    pub fn last_update_pass(&self) -> &[ObjectId] {
        self.updater.last_pass()
    }

    pub fn update_state(&self, object: ObjectId) -> Option<UpdateState> {
        self.updater.state(object)
    }

    /// Objects waiting for [`Document::run_deferred`].
    pub fn deferred_objects(&self) -> Vec<ObjectId> {
        self.updater.deferred().collect()
    }

    pub fn main_thread(&self) -> ThreadId {
        self.main_thread
    }

    // ------------------------------------------------------------------
    // Cross-thread work
    // ------------------------------------------------------------------

    /// A handle other threads can post work to.
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    /// Run the work posted to the mailbox, in posting order. Returns the
    /// number of jobs run.
    pub fn process_posted(&mut self) -> usize {
        let mut count = 0;
        while let Some(job) = self.mailbox.pop() {
            job(self);
            count += 1;
        }
        count
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    pub(crate) fn object_entry(&self, id: ObjectId) -> Result<&ObjectEntry, ObjectError> {
        self.objects.get(id).ok_or(ObjectError::UnknownObject(id))
    }

    pub(crate) fn object_entry_mut(&mut self, id: ObjectId) -> Result<&mut ObjectEntry, ObjectError> {
        self.objects.get_mut(id).ok_or(ObjectError::UnknownObject(id))
    }

    pub(crate) fn on_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }

    pub(crate) fn requires_main_thread(&self, object: ObjectId) -> bool {
        self.objects
            .get(object)
            .is_some_and(|entry| entry.class().has_capability(Capability::MainThread))
    }

    /// Dirty objects `object` directly depends on: producers of its input
    /// ports in port order, then docked children, then other input edges.
    pub(crate) fn dirty_dependencies(&self, object: ObjectId) -> SmallVec<[ObjectId; 8]> {
        let Some(entry) = self.objects.get(object) else {
            return SmallVec::new();
        };
        let mut nodes: IndexSet<NodeId> = entry
            .ports
            .iter()
            .filter(|port| self.datas.get(**port).is_some_and(|data| !data.is_output()))
            .map(|port| port.node())
            .collect();
        nodes.extend(entry.dockables.iter().map(|child| child.node()));
        nodes.extend(self.graph.inputs(object.node()));

        let mut visited = HashSet::new();
        let mut found = Vec::new();
        for node in nodes {
            if !self.graph.is_dirty(node) || !visited.insert(node) {
                continue;
            }
            match self.graph.kind(node) {
                Some(NodeKind::Object) => found.push(node),
                Some(NodeKind::Data) => self.graph.dirty_sources(node, &mut visited, &mut found),
                None => {}
            }
        }
        found.into_iter().map(ObjectId::from_node).collect()
    }

    /// Pull the inputs of `object`, run its update and clean it.
    pub(crate) fn run_object_update(&mut self, object: ObjectId) -> Result<(), UpdateError> {
        let entry = self
            .objects
            .get(object)
            .ok_or(UpdateError::UnknownObject(object))?;
        let (outputs, inputs): (SmallVec<[DataId; 8]>, SmallVec<[DataId; 8]>) = entry
            .ports
            .iter()
            .copied()
            .partition(|port| self.datas.get(*port).is_some_and(BaseData::is_output));

        let pending = self.graph.inputs(object.node()).find(|node| {
            self.graph.kind(*node) == Some(NodeKind::Object) && self.graph.is_dirty(*node)
        });
        if let Some(producer) = pending {
            self.order_violation(object, None, ObjectId::from_node(producer))?;
        }
        for input in inputs {
            match self.datas.clean_data(&mut self.graph, &self.registry, input) {
                Ok(()) => {}
                Err(DataError::OutOfOrder { data, producer }) => {
                    self.order_violation(object, Some(data), producer)?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        let entry = self
            .objects
            .get_mut(object)
            .ok_or(UpdateError::UnknownObject(object))?;
        let groups = entry
            .generic
            .as_ref()
            .map_or(&[][..], |state| state.groups.as_slice());
        let mut ctx = UpdateContext::new(object, &mut self.datas, &mut self.graph, &self.registry, groups);
        entry.behavior.update(&mut ctx);
        let dirtied = ctx.finish();

        self.graph.clean(object.node());
        for output in outputs {
            self.graph.clean(output.node());
        }
        tracing::trace!(?object, "updated object");
        self.notify_dirtied(dirtied);
        Ok(())
    }

    fn order_violation(
        &self,
        object: ObjectId,
        data: Option<DataId>,
        producer: ObjectId,
    ) -> Result<(), UpdateError> {
        if self.strict_order {
            return Err(UpdateError::OutOfOrder {
                object,
                data,
                producer,
            });
        }
        tracing::warn!(?object, ?producer, "reading an input before its producer ran");
        Ok(())
    }

    /// Bring a data clean, running its producers if needed.
    fn ensure_clean(&mut self, id: DataId) -> Result<(), DocumentError> {
        self.datas.try_get(id)?;
        if !self.graph.is_dirty(id.node()) {
            return Ok(());
        }

        let mut producers = Vec::new();
        let mut visited = HashSet::new();
        self.graph.dirty_sources(id.node(), &mut visited, &mut producers);
        if !producers.is_empty() {
            self.updater.begin_pass();
        }
        for producer in producers {
            self.run_update(ObjectId::from_node(producer))?;
        }
        match self.datas.clean_data(&mut self.graph, &self.registry, id) {
            Err(DataError::OutOfOrder { producer, .. }) => Err(UpdateError::Deferred(producer).into()),
            other => other.map_err(Into::into),
        }
    }

    /// Mark the dependents of a data dirty after its value was replaced.
    pub(crate) fn value_changed(&mut self, data: DataId) {
        self.graph.clean(data.node());
        let dirtied = self.graph.set_dirty_outputs(data.node());
        self.notify_dirtied(dirtied);
    }

    /// Forward newly dirty object nodes to the updater and observers.
    pub(crate) fn notify_dirtied(&mut self, nodes: Vec<NodeId>) {
        for node in nodes {
            if self.graph.kind(node) == Some(NodeKind::Object) {
                let id = ObjectId::from_node(node);
                self.updater.clear(id);
                self.signals.dirty_object.emit(&id);
            }
        }
    }

    /// Delete a data node. Data linked to it are unlinked and marked dirty;
    /// the nodes that became dirty are returned.
    pub(crate) fn destroy_data(&mut self, id: DataId) -> Vec<NodeId> {
        let mut dirtied = Vec::new();
        for child in self.datas.children_of(&self.graph, id) {
            if let Some(stored) = self.datas.get_mut(child) {
                stored.parent = None;
            }
            dirtied.extend(self.graph.set_dirty_value(child.node()));
        }
        self.graph.remove_node(id.node());
        self.datas.remove(id);
        dirtied
    }

    /// Remove the generic group whose connection port is `data`, if any.
    fn drop_generic_group_fed_by(&mut self, data: DataId) -> Result<bool, DocumentError> {
        let Some(owner) = self.datas.get(data).map(BaseData::owner) else {
            return Ok(false);
        };
        let group = self
            .objects
            .get(owner)
            .and_then(|entry| entry.generic.as_ref())
            .and_then(|state| state.group_fed_by(data));
        match group {
            Some(group) => {
                self.disconnect_data(owner, group)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn type_name_of<T: 'static>(&self) -> String {
        self.registry.id_of::<T>().map_or_else(
            |_| std::any::type_name::<T>().to_string(),
            |id| self.registry.type_name(id),
        )
    }

    fn type_name_of_data(&self, id: DataId) -> String {
        self.datas
            .get(id)
            .map_or_else(String::new, |data| self.registry.type_name(data.type_id()))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("objects", &self.objects.len())
            .field("datas", &self.datas.len())
            .field("nodes", &self.graph.node_count())
            .field("main_thread", &self.main_thread)
            .finish()
    }
}
